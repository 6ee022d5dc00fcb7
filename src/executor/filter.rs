//! Predicate evaluation.

use crate::expression::{EvalResult, Plan, RecordEvaluator};
use crate::record::Record;

/// Whether `record` passes the plan's WHERE clause. A plan without one accepts
/// every record.
pub fn predicate(plan: &Plan, record: &Record) -> EvalResult<bool> {
    match &plan.predicate {
        None => Ok(true),
        Some(root) => RecordEvaluator::new(record, plan.strict_attributes).evaluate_condition(root),
    }
}
