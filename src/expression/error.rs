//! Error types for plan compilation and record evaluation.
//!
//! The two classes never mix: a [`CompileError`] means no plan exists, an
//! [`EvalError`] concerns a single record and leaves the plan usable.

use crate::expression::operator::CompareOp;
use crate::function::FunctionError;
use thiserror::Error;

/// Errors raised while turning a statement into a plan
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("SQL parse error: {0}")]
    Parse(String),

    #[error("unsupported construct: {0}")]
    Unsupported(String),

    #[error("unsupported function: {0}")]
    UnknownFunction(String),

    #[error("function {name} rejected its parameters: {source}")]
    FunctionInit {
        name: String,
        #[source]
        source: FunctionError,
    },

    #[error("invalid {op} pattern '{pattern}': {source}")]
    InvalidPattern {
        op: CompareOp,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid condition tree: {0}")]
    InvalidCondition(String),
}

/// Errors raised while evaluating a plan against one record
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("attribute {name} not found")]
    MissingAttribute { name: String },

    #[error("non-numeric operand '{value}' in ordering comparison {op}")]
    NonNumericOperand { op: CompareOp, value: String },

    #[error("invalid {op} pattern '{pattern}': {message}")]
    InvalidPattern {
        op: CompareOp,
        pattern: String,
        message: String,
    },

    #[error("function {name} failed: {source}")]
    Function {
        name: String,
        #[source]
        source: FunctionError,
    },

    #[error("malformed condition: {0}")]
    MalformedCondition(String),
}

/// Result type for plan compilation
pub type CompileResult<T> = Result<T, CompileError>;

/// Result type for record evaluation
pub type EvalResult<T> = Result<T, EvalError>;
