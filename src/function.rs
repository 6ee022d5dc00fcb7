//! Scalar function extension point.
//!
//! A function call in a statement is bound at plan time to one instance produced
//! by a [`FunctionRegistry`] factory. The instance is configured once through
//! [`Function::init`] and then shared read-only by every record evaluation.

pub mod builtin;
pub mod registry;

pub use registry::{FunctionFactory, FunctionRegistry, RegistryError};

use thiserror::Error;

/// Errors reported by scalar functions, both at bind time and per call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FunctionError {
    #[error("{function} expects {expected} arguments, got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },

    #[error("{function}: invalid parameter: {message}")]
    InvalidParameter { function: String, message: String },

    #[error("{function}: {message}")]
    Failed { function: String, message: String },
}

/// Result type for function operations
pub type FunctionResult<T> = Result<T, FunctionError>;

/// A scalar function usable in projections and conditions.
///
/// `process` takes `&self`: a bound instance is shared by every evaluation of a
/// plan, possibly from several threads at once, so any per-call state has to be
/// synchronized by the implementation itself.
pub trait Function: Send + Sync {
    /// One-time setup with the call's arguments rendered as text (column names,
    /// literal values, or the rendering of nested calls and comparisons).
    fn init(&mut self, params: &[String]) -> FunctionResult<()>;

    /// Compute the result for one record from the resolved argument values.
    fn process(&self, params: &[String]) -> FunctionResult<String>;

    /// Canonical lowercase function name
    fn name(&self) -> &str;
}

/// Check an argument list length against an inclusive range
pub fn check_arity(
    function: &str,
    params: &[String],
    min: usize,
    max: Option<usize>,
) -> FunctionResult<()> {
    let actual = params.len();
    let too_many = max.is_some_and(|max| actual > max);
    if actual < min || too_many {
        let expected = match max {
            Some(max) if max == min => min.to_string(),
            Some(max) => format!("{} to {}", min, max),
            None => format!("at least {}", min),
        };
        return Err(FunctionError::ArgumentCount {
            function: function.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_check_arity() {
        assert!(check_arity("f", &params(&["a"]), 1, Some(1)).is_ok());
        assert!(check_arity("f", &params(&["a", "b"]), 1, None).is_ok());

        let err = check_arity("f", &params(&[]), 1, Some(1)).unwrap_err();
        assert_eq!(err.to_string(), "f expects 1 arguments, got 0");

        let err = check_arity("f", &params(&["a", "b", "c"]), 2, Some(2)).unwrap_err();
        assert_eq!(err.to_string(), "f expects 2 arguments, got 3");

        let err = check_arity("f", &params(&["a"]), 2, Some(3)).unwrap_err();
        assert_eq!(err.to_string(), "f expects 2 to 3 arguments, got 1");

        let err = check_arity("f", &params(&[]), 1, None).unwrap_err();
        assert_eq!(err.to_string(), "f expects at least 1 arguments, got 0");
    }
}
