//! Projection evaluation.

use crate::expression::{EvalResult, Plan, RecordEvaluator};
use crate::record::Record;

/// Build the output record: one entry per plan field, in field order, keyed by
/// alias. The first failing field aborts the whole projection.
pub fn project(plan: &Plan, record: &Record) -> EvalResult<Record> {
    let evaluator = RecordEvaluator::new(record, plan.strict_attributes);
    let mut output = Record::with_capacity(plan.projection.len());
    for field in &plan.projection {
        let value = evaluator.evaluate(&field.expr)?;
        output.insert(field.alias.as_str(), value);
    }
    Ok(output)
}
