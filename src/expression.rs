//! Compiled expression model and its evaluation.
//!
//! This module provides:
//! - The closed expression tree produced by the planner
//! - Comparator tags and LIKE pattern translation
//! - Compile-time and per-record error types
//! - Evaluation of expressions against a record

pub mod error;
pub mod eval;
pub mod expr;
pub mod operator;
pub mod pattern;

pub use error::{CompileError, CompileResult, EvalError, EvalResult};
pub use eval::RecordEvaluator;
pub use expr::{Case, Comparator, Condition, Expression, ExpressionKind, Field, FunctionCall, Plan};
pub use operator::CompareOp;
pub use pattern::{is_zero_value, like_to_regex};
