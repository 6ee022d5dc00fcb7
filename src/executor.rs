//! Plan executor.
//!
//! Both entry points are pure functions of a compiled [`Plan`] and one record.
//! A plan is never mutated by evaluation, so one plan may serve any number of
//! records on any number of threads.

pub mod filter;
pub mod projection;

pub use filter::predicate;
pub use projection::project;

use crate::expression::{EvalResult, Plan};
use crate::record::Record;

/// Evaluate the predicate and, when it holds, the projection.
///
/// Returns `Ok(None)` for a filtered-out record.
pub fn execute(plan: &Plan, record: &Record) -> EvalResult<Option<Record>> {
    if !predicate(plan, record)? {
        return Ok(None);
    }
    project(plan, record).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::function::FunctionRegistry;
    use crate::planner::Planner;
    use std::sync::Arc;

    #[test]
    fn test_execute() {
        let planner = Planner::new(
            Arc::new(FunctionRegistry::with_builtins()),
            EngineConfig::default(),
        );
        let plan = planner
            .compile_sql("SELECT upper(level) AS level WHERE code > 499")
            .unwrap();

        let record: Record = [("level", "error"), ("code", "503")].into_iter().collect();
        let out = execute(&plan, &record).unwrap().unwrap();
        assert_eq!(out.get("level"), Some("ERROR"));
        assert_eq!(out.len(), 1);

        let record: Record = [("level", "info"), ("code", "200")].into_iter().collect();
        assert_eq!(execute(&plan, &record).unwrap(), None);

        let record: Record = [("level", "info")].into_iter().collect();
        assert!(execute(&plan, &record).is_err());
    }
}
