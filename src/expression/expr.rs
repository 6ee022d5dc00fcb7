//! Compiled expression tree and plan containers.

use crate::expression::error::{CompileError, CompileResult};
use crate::expression::operator::CompareOp;
use crate::function::Function;
use regex::Regex;
use std::fmt;

/// Variant tag of an [`Expression`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpressionKind {
    Attribute,
    Constant,
    FunctionCall,
    Condition,
    Case,
    None,
}

/// Node of a compiled expression tree
#[derive(Debug)]
pub enum Expression {
    /// Named field of the input record
    Attribute(String),

    /// Literal text; SQL NULL is the sentinel `"NULL"`
    Constant(String),

    /// Call of a bound scalar function
    FunctionCall(FunctionCall),

    /// Boolean node
    Condition(Condition),

    /// CASE dispatch
    Case(Case),

    /// No operand; the right side of a truthiness test
    None,
}

impl Expression {
    pub fn attribute(name: impl Into<String>) -> Self {
        Expression::Attribute(name.into())
    }

    pub fn constant(value: impl Into<String>) -> Self {
        Expression::Constant(value.into())
    }

    pub fn kind(&self) -> ExpressionKind {
        match self {
            Expression::Attribute(_) => ExpressionKind::Attribute,
            Expression::Constant(_) => ExpressionKind::Constant,
            Expression::FunctionCall(_) => ExpressionKind::FunctionCall,
            Expression::Condition(_) => ExpressionKind::Condition,
            Expression::Case(_) => ExpressionKind::Case,
            Expression::None => ExpressionKind::None,
        }
    }

    pub fn is_condition(&self) -> bool {
        matches!(self, Expression::Condition(_))
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Attribute(name) => f.write_str(name),
            Expression::Constant(value) => f.write_str(value),
            Expression::FunctionCall(call) => write!(f, "{}", call),
            Expression::Condition(cond) => write!(f, "{}", cond),
            Expression::Case(case) => write!(f, "{}", case),
            Expression::None => Ok(()),
        }
    }
}

/// A function call bound to one function instance at compile time
pub struct FunctionCall {
    pub args: Vec<Expression>,
    pub function: Box<dyn Function>,
}

impl FunctionCall {
    pub fn new(function: Box<dyn Function>, args: Vec<Expression>) -> Self {
        Self { args, function }
    }

    pub fn name(&self) -> &str {
        self.function.name()
    }
}

impl fmt::Debug for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionCall")
            .field("function", &self.function.name())
            .field("args", &self.args)
            .finish()
    }
}

impl fmt::Display for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.function.name())?;
        for arg in &self.args {
            write!(f, "{}", arg)?;
        }
        f.write_str(")")
    }
}

/// Operator tag plus the pattern precompiled from a literal right operand
#[derive(Debug, Clone)]
pub struct Comparator {
    pub op: CompareOp,
    pub pattern: Option<Regex>,
}

impl Comparator {
    pub fn new(op: CompareOp) -> Self {
        Self { op, pattern: None }
    }

    pub fn with_pattern(op: CompareOp, pattern: Regex) -> Self {
        Self {
            op,
            pattern: Some(pattern),
        }
    }
}

/// Boolean node.
///
/// Built only through the checked constructors, which keep the tree shape
/// valid: AND/OR join two conditions, every other operator compares two
/// non-condition operands, and a `None` right operand only appears in the
/// `=`/`!=` zero-value tests.
#[derive(Debug)]
pub struct Condition {
    left: Box<Expression>,
    right: Box<Expression>,
    comparator: Comparator,
}

impl Condition {
    /// Leaf comparison of two operands
    pub fn compare(
        left: Expression,
        comparator: Comparator,
        right: Expression,
    ) -> CompileResult<Self> {
        if comparator.op.is_logical() {
            return Err(CompileError::InvalidCondition(format!(
                "{} requires condition operands",
                comparator.op
            )));
        }
        for operand in [&left, &right] {
            match operand.kind() {
                ExpressionKind::Condition => {
                    return Err(CompileError::InvalidCondition(format!(
                        "a condition cannot be an operand of {}",
                        comparator.op
                    )))
                }
                ExpressionKind::None => {
                    return Err(CompileError::InvalidCondition(format!(
                        "missing operand for {}",
                        comparator.op
                    )))
                }
                _ => {}
            }
        }
        Ok(Self {
            left: Box::new(left),
            right: Box::new(right),
            comparator,
        })
    }

    /// AND / OR of two conditions
    pub fn logical(op: CompareOp, left: Condition, right: Condition) -> CompileResult<Self> {
        if !op.is_logical() {
            return Err(CompileError::InvalidCondition(format!(
                "{} cannot join two conditions",
                op
            )));
        }
        Ok(Self {
            left: Box::new(Expression::Condition(left)),
            right: Box::new(Expression::Condition(right)),
            comparator: Comparator::new(op),
        })
    }

    /// True when `operand` is not the zero value
    pub fn truthy(operand: Expression) -> CompileResult<Self> {
        Self::zero_test(operand, CompareOp::NotEq)
    }

    /// True when `operand` is the zero value
    pub fn falsy(operand: Expression) -> CompileResult<Self> {
        Self::zero_test(operand, CompareOp::Eq)
    }

    fn zero_test(operand: Expression, op: CompareOp) -> CompileResult<Self> {
        match operand.kind() {
            ExpressionKind::Condition | ExpressionKind::None => {
                Err(CompileError::InvalidCondition(format!(
                    "{:?} cannot be tested for a zero value",
                    operand.kind()
                )))
            }
            _ => Ok(Self {
                left: Box::new(operand),
                right: Box::new(Expression::None),
                comparator: Comparator::new(op),
            }),
        }
    }

    pub fn left(&self) -> &Expression {
        &self.left
    }

    pub fn right(&self) -> &Expression {
        &self.right
    }

    pub fn comparator(&self) -> &Comparator {
        &self.comparator
    }

    pub fn op(&self) -> CompareOp {
        self.comparator.op
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.right.as_ref() {
            Expression::None => write!(f, "{} {}", self.left, self.comparator.op),
            right => write!(f, "{} {} {}", self.left, self.comparator.op, right),
        }
    }
}

/// CASE expression: the first branch whose condition holds wins
#[derive(Debug)]
pub struct Case {
    pub branches: Vec<(Condition, Expression)>,
    pub else_expr: Box<Expression>,
}

impl Case {
    pub fn new(branches: Vec<(Condition, Expression)>, else_expr: Expression) -> Self {
        Self {
            branches,
            else_expr: Box::new(else_expr),
        }
    }
}

impl fmt::Display for Case {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CASE")?;
        for (condition, result) in &self.branches {
            write!(f, " WHEN {} THEN {}", condition, result)?;
        }
        write!(f, " ELSE {} END", self.else_expr)
    }
}

/// Output column of a plan
#[derive(Debug)]
pub struct Field {
    pub expr: Expression,
    pub alias: String,
}

impl Field {
    pub fn new(expr: Expression, alias: impl Into<String>) -> Self {
        Self {
            expr,
            alias: alias.into(),
        }
    }
}

/// Compiled statement: output columns plus an optional filter
#[derive(Debug)]
pub struct Plan {
    pub projection: Vec<Field>,
    /// `None` accepts every record
    pub predicate: Option<Condition>,
    /// Whether a missing attribute is an evaluation error
    pub strict_attributes: bool,
}

impl Plan {
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.projection.iter().map(|field| field.alias.as_str())
    }
}
