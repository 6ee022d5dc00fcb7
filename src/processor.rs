//! Host-facing processor: compile once, then filter and reshape records.

use crate::config::EngineConfig;
use crate::executor::{predicate, project};
use crate::expression::{CompileResult, EvalError, Plan};
use crate::function::FunctionRegistry;
use crate::planner::Planner;
use crate::record::Record;
use std::sync::Arc;

/// What happened to one record
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Predicate held; carries the projected record
    Kept(Record),
    /// Predicate was false
    Filtered,
    /// Predicate evaluation failed; the record is dropped
    PredicateFailed(EvalError),
    /// Predicate held but projection failed; the input record is passed on
    /// unchanged
    ProjectionFailed { original: Record, error: EvalError },
}

impl Outcome {
    /// The record forwarded downstream, if any
    pub fn into_record(self) -> Option<Record> {
        match self {
            Outcome::Kept(record) => Some(record),
            Outcome::ProjectionFailed { original, .. } => Some(original),
            Outcome::Filtered | Outcome::PredicateFailed(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Outcome::PredicateFailed(_) | Outcome::ProjectionFailed { .. }
        )
    }
}

/// A compiled SELECT statement ready to process records
pub struct SqlProcessor {
    script: String,
    plan: Plan,
}

impl SqlProcessor {
    /// Compile `script` against `registry`
    pub fn new(
        script: &str,
        config: EngineConfig,
        registry: Arc<FunctionRegistry>,
    ) -> CompileResult<Self> {
        let planner = Planner::new(registry, config);
        match planner.compile_sql(script) {
            Ok(plan) => {
                log::debug!(
                    "SQL processor ready: {} output fields, strict attributes: {}",
                    plan.projection.len(),
                    plan.strict_attributes
                );
                Ok(Self {
                    script: script.to_string(),
                    plan,
                })
            }
            Err(e) => {
                log::error!("failed to compile SQL script '{}': {}", script, e);
                Err(e)
            }
        }
    }

    /// Compile with the built-in functions and default configuration
    pub fn with_defaults(script: &str) -> CompileResult<Self> {
        Self::new(
            script,
            EngineConfig::default(),
            Arc::new(FunctionRegistry::with_builtins()),
        )
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    /// Run the plan against one record
    pub fn process(&self, record: &Record) -> Outcome {
        match predicate(&self.plan, record) {
            Ok(false) => Outcome::Filtered,
            Err(error) => {
                log::error!("predicate evaluation failed, record dropped: {}", error);
                Outcome::PredicateFailed(error)
            }
            Ok(true) => match project(&self.plan, record) {
                Ok(projected) => Outcome::Kept(projected),
                Err(error) => {
                    log::error!("projection failed, record passed through: {}", error);
                    Outcome::ProjectionFailed {
                        original: record.clone(),
                        error,
                    }
                }
            },
        }
    }

    /// Process a batch and return the records to forward, in input order
    pub fn process_batch(&self, records: Vec<Record>) -> Vec<Record> {
        let total = records.len();
        let kept: Vec<Record> = records
            .iter()
            .filter_map(|record| self.process(record).into_record())
            .collect();
        log::debug!("processed batch: {} in, {} out", total, kept.len());
        kept
    }
}
