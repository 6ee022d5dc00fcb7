//! Plan compiler: lowers a parsed SELECT statement into an executable [`Plan`].
//!
//! Parsing is done by `sqlparser` with the MySQL dialect, so double-quoted text
//! is a string literal and REGEXP/RLIKE are comparison operators.
//!
//! Lowering follows two rules. The condition rule handles WHERE clauses and
//! CASE branches and always yields a [`Condition`]. The operand rule handles
//! everything else (projected values, comparison sides, function arguments) and
//! never yields one, except for inline comparisons passed to a function.
//!
//! Everything that cannot be represented is rejected here so that evaluation
//! only ever sees well-formed trees.

use crate::config::EngineConfig;
use crate::expression::pattern::{compile_like, compile_regexp};
use crate::expression::{
    Case, Comparator, CompareOp, CompileError, CompileResult, Condition, Expression, Field,
    FunctionCall, Plan,
};
use crate::function::FunctionRegistry;
use sqlparser::ast::{
    BinaryOperator, Expr, Function, FunctionArg, FunctionArgExpr, GroupByExpr, Ident, Query,
    Select, SelectItem, SetExpr, Statement, TableFactor, UnaryOperator, Value,
};
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;
use std::sync::Arc;

/// Sentinel text standing in for SQL NULL
pub const NULL_SENTINEL: &str = "NULL";

/// Parse `sql` into exactly one query statement
pub fn parse_query(sql: &str) -> CompileResult<Query> {
    let dialect = MySqlDialect {};
    let mut statements =
        Parser::parse_sql(&dialect, sql).map_err(|e| CompileError::Parse(e.to_string()))?;

    if statements.len() != 1 {
        return Err(CompileError::Parse(format!(
            "expected a single statement, found {}",
            statements.len()
        )));
    }
    match statements.remove(0) {
        Statement::Query(query) => Ok(*query),
        other => Err(CompileError::Parse(format!(
            "only SELECT statements are supported, got: {}",
            other
        ))),
    }
}

/// A comparison node split into its sides
struct Comparison<'e> {
    left: &'e Expr,
    op: CompareOp,
    right: &'e Expr,
}

/// Plan compiler bound to a function registry and an engine configuration
pub struct Planner {
    registry: Arc<FunctionRegistry>,
    config: EngineConfig,
}

impl Planner {
    pub fn new(registry: Arc<FunctionRegistry>, config: EngineConfig) -> Self {
        Self { registry, config }
    }

    /// Parse and compile a SELECT statement
    pub fn compile_sql(&self, sql: &str) -> CompileResult<Plan> {
        let query = parse_query(sql)?;
        self.plan(&query)
    }

    /// Compile a parsed SELECT query
    pub fn plan(&self, query: &Query) -> CompileResult<Plan> {
        let select = self.check_clauses(query)?;

        let projection = select
            .projection
            .iter()
            .map(|item| self.lower_select_item(item))
            .collect::<CompileResult<Vec<_>>>()?;
        if projection.is_empty() {
            return Err(CompileError::Unsupported("empty projection list".to_string()));
        }

        let predicate = select
            .selection
            .as_ref()
            .map(|expr| self.lower_condition(expr))
            .transpose()?;

        log::debug!(
            "compiled plan: fields [{}], predicate: {}",
            projection
                .iter()
                .map(|f| f.alias.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            predicate
                .as_ref()
                .map(|p| p.to_string())
                .unwrap_or_else(|| "none".to_string())
        );

        Ok(Plan {
            projection,
            predicate,
            strict_attributes: self.config.strict_attributes,
        })
    }

    /// Reject every clause a per-record filter cannot honor and return the SELECT body
    fn check_clauses<'q>(&self, query: &'q Query) -> CompileResult<&'q Select> {
        let unsupported = |clause: &str| Err(CompileError::Unsupported(clause.to_string()));

        if query.with.is_some() {
            return unsupported("WITH");
        }
        if !query.order_by.is_empty() {
            return unsupported("ORDER BY");
        }
        if query.limit.is_some() {
            return unsupported("LIMIT");
        }
        if query.offset.is_some() {
            return unsupported("OFFSET");
        }
        if query.fetch.is_some() {
            return unsupported("FETCH");
        }

        let select = match query.body.as_ref() {
            SetExpr::Select(select) => select.as_ref(),
            SetExpr::SetOperation { op, .. } => return unsupported(&op.to_string()),
            SetExpr::Values(_) => return unsupported("VALUES"),
            _ => return unsupported("nested query"),
        };

        if select.distinct.is_some() {
            return unsupported("DISTINCT");
        }
        if select.top.is_some() {
            return unsupported("TOP");
        }
        match select.from.as_slice() {
            [] => {}
            // a single named table is accepted and ignored
            [table] => {
                if !table.joins.is_empty() {
                    return unsupported("JOIN");
                }
                if !matches!(table.relation, TableFactor::Table { .. }) {
                    return Err(CompileError::Unsupported(format!("FROM {}", table.relation)));
                }
            }
            _ => return unsupported("JOIN"),
        }
        match &select.group_by {
            GroupByExpr::All => return unsupported("GROUP BY"),
            GroupByExpr::Expressions(exprs) if !exprs.is_empty() => return unsupported("GROUP BY"),
            GroupByExpr::Expressions(_) => {}
        }
        if select.having.is_some() {
            return unsupported("HAVING");
        }
        Ok(select)
    }

    fn lower_select_item(&self, item: &SelectItem) -> CompileResult<Field> {
        let (expr, alias) = match item {
            SelectItem::Wildcard(_) => {
                return Err(CompileError::Unsupported("SELECT *".to_string()))
            }
            SelectItem::QualifiedWildcard(table, _) => {
                return Err(CompileError::Unsupported(format!("SELECT {}.*", table)))
            }
            SelectItem::UnnamedExpr(expr) => (expr, None),
            SelectItem::ExprWithAlias { expr, alias } => (expr, Some(alias.value.clone())),
        };

        let lowered = match expr {
            Expr::Case {
                operand,
                conditions,
                results,
                else_result,
            } => Expression::Case(self.lower_case(
                operand.as_deref(),
                conditions,
                results,
                else_result.as_deref(),
            )?),
            other => self.lower_operand(other)?,
        };
        let alias = alias.unwrap_or_else(|| lowered.to_string());
        Ok(Field::new(lowered, alias))
    }

    fn lower_case(
        &self,
        operand: Option<&Expr>,
        conditions: &[Expr],
        results: &[Expr],
        else_result: Option<&Expr>,
    ) -> CompileResult<Case> {
        let subject = operand
            .map(|expr| match strip_parens(expr) {
                Expr::Identifier(ident) => Ok(ident.value.clone()),
                Expr::CompoundIdentifier(parts) => column_name(parts),
                other => Err(CompileError::Unsupported(format!(
                    "CASE operand must be a column, got {}",
                    describe(other)
                ))),
            })
            .transpose()?;

        let mut branches = Vec::with_capacity(conditions.len());
        for (when, then) in conditions.iter().zip(results) {
            let condition = match &subject {
                // CASE col WHEN literal: equality against the column
                Some(name) => {
                    let when = strip_parens(when);
                    if !is_literal(when) {
                        return Err(CompileError::Unsupported(format!(
                            "CASE {} WHEN {}",
                            name,
                            describe(when)
                        )));
                    }
                    Condition::compare(
                        Expression::attribute(name.as_str()),
                        Comparator::new(CompareOp::Eq),
                        self.lower_operand(when)?,
                    )?
                }
                None => self.lower_condition(when)?,
            };
            branches.push((condition, self.lower_operand(then)?));
        }

        let else_expr = match else_result {
            Some(expr) => self.lower_operand(expr)?,
            None => Expression::constant(NULL_SENTINEL),
        };
        Ok(Case::new(branches, else_expr))
    }

    /// Lower an expression used as a boolean
    fn lower_condition(&self, expr: &Expr) -> CompileResult<Condition> {
        match expr {
            Expr::Nested(inner) => self.lower_condition(inner),
            Expr::BinaryOp {
                left,
                op: BinaryOperator::And,
                right,
            } => Condition::logical(
                CompareOp::And,
                self.lower_condition(left)?,
                self.lower_condition(right)?,
            ),
            Expr::BinaryOp {
                left,
                op: BinaryOperator::Or,
                right,
            } => Condition::logical(
                CompareOp::Or,
                self.lower_condition(left)?,
                self.lower_condition(right)?,
            ),
            Expr::UnaryOp {
                op: UnaryOperator::Not,
                expr: operand,
            } => Condition::falsy(self.lower_operand(operand)?),
            Expr::Identifier(_)
            | Expr::CompoundIdentifier(_)
            | Expr::Value(_)
            | Expr::UnaryOp {
                op: UnaryOperator::Minus,
                ..
            }
            | Expr::Function(_) => Condition::truthy(self.lower_operand(expr)?),
            other => match split_comparison(other)? {
                Some(comparison) => self.lower_comparison(comparison),
                None => Err(CompileError::Unsupported(format!(
                    "{} in condition: {}",
                    describe(other),
                    other
                ))),
            },
        }
    }

    fn lower_comparison(&self, comparison: Comparison<'_>) -> CompileResult<Condition> {
        let Comparison { left, op, right } = comparison;
        let left = self.lower_operand(left)?;
        let right = self.lower_operand(right)?;

        let comparator = match (&right, op.is_pattern()) {
            (Expression::Constant(pattern), true) => {
                let compiled = if op.is_like() {
                    compile_like(pattern)
                } else {
                    compile_regexp(pattern)
                };
                let compiled = compiled.map_err(|source| CompileError::InvalidPattern {
                    op,
                    pattern: pattern.clone(),
                    source,
                })?;
                Comparator::with_pattern(op, compiled)
            }
            _ => Comparator::new(op),
        };

        Condition::compare(left, comparator, right)
    }

    /// Lower a value-producing expression
    fn lower_operand(&self, expr: &Expr) -> CompileResult<Expression> {
        match expr {
            Expr::Nested(inner) => self.lower_operand(inner),
            Expr::Identifier(ident) => Ok(Expression::attribute(ident.value.as_str())),
            // the table qualifier carries no meaning for a single record
            Expr::CompoundIdentifier(parts) => Ok(Expression::attribute(column_name(parts)?)),
            Expr::Value(value) => self.lower_literal(value),
            Expr::UnaryOp {
                op: UnaryOperator::Minus,
                expr: inner,
            } => match inner.as_ref() {
                Expr::Value(Value::Number(digits, _)) => {
                    Ok(Expression::constant(format!("-{}", digits)))
                }
                other => Err(CompileError::Unsupported(format!(
                    "unary minus on {}",
                    describe(other)
                ))),
            },
            Expr::Function(function) => self.lower_function(function),
            other => match describe(other) {
                "comparison" => Err(CompileError::Unsupported(format!(
                    "comparison {} used as a value",
                    other
                ))),
                kind => Err(CompileError::Unsupported(format!("{}: {}", kind, other))),
            },
        }
    }

    fn lower_literal(&self, value: &Value) -> CompileResult<Expression> {
        match value {
            Value::Number(text, _)
            | Value::SingleQuotedString(text)
            | Value::DoubleQuotedString(text) => Ok(Expression::constant(text.as_str())),
            Value::Null => Ok(Expression::constant(NULL_SENTINEL)),
            Value::Boolean(_) => Err(CompileError::Unsupported("boolean literal".to_string())),
            other => Err(CompileError::Unsupported(format!("literal {}", other))),
        }
    }

    /// Function arguments additionally accept inline comparisons
    fn lower_argument(&self, expr: &Expr) -> CompileResult<Expression> {
        let expr = strip_parens(expr);
        match split_comparison(expr)? {
            Some(comparison) => Ok(Expression::Condition(self.lower_comparison(comparison)?)),
            None => self.lower_operand(expr),
        }
    }

    fn lower_function(&self, function: &Function) -> CompileResult<Expression> {
        let name = column_name(&function.name.0)?;
        if function.distinct {
            return Err(CompileError::Unsupported(format!("DISTINCT in {}()", name)));
        }
        if function.over.is_some() {
            return Err(CompileError::Unsupported(format!("window function {}()", name)));
        }

        let args = function
            .args
            .iter()
            .map(|arg| match arg {
                FunctionArg::Unnamed(FunctionArgExpr::Expr(expr)) => self.lower_argument(expr),
                other => Err(CompileError::Unsupported(format!(
                    "{} as function argument",
                    other
                ))),
            })
            .collect::<CompileResult<Vec<_>>>()?;

        let mut bound = self
            .registry
            .resolve(&name)
            .map_err(|_| CompileError::UnknownFunction(name.to_lowercase()))?;

        let params: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
        bound
            .init(&params)
            .map_err(|source| CompileError::FunctionInit {
                name: bound.name().to_string(),
                source,
            })?;

        Ok(Expression::FunctionCall(FunctionCall::new(bound, args)))
    }
}

/// Split `expr` into a [`Comparison`] if it is one of the supported comparators
fn split_comparison(expr: &Expr) -> CompileResult<Option<Comparison<'_>>> {
    let comparison = match expr {
        Expr::BinaryOp { left, op, right } => match op {
            BinaryOperator::Eq
            | BinaryOperator::NotEq
            | BinaryOperator::Lt
            | BinaryOperator::Gt
            | BinaryOperator::LtEq
            | BinaryOperator::GtEq => Comparison {
                left: left.as_ref(),
                op: op
                    .to_string()
                    .to_uppercase()
                    .parse()
                    .map_err(CompileError::Unsupported)?,
                right: right.as_ref(),
            },
            _ => return Ok(None),
        },
        Expr::Like {
            negated,
            expr,
            pattern,
            ..
        } => Comparison {
            left: expr.as_ref(),
            op: if *negated {
                CompareOp::NotLike
            } else {
                CompareOp::Like
            },
            right: pattern.as_ref(),
        },
        Expr::RLike {
            negated,
            expr,
            pattern,
            ..
        } => Comparison {
            left: expr.as_ref(),
            op: if *negated {
                CompareOp::NotRegexp
            } else {
                CompareOp::Regexp
            },
            right: pattern.as_ref(),
        },
        _ => return Ok(None),
    };
    Ok(Some(comparison))
}

fn column_name(parts: &[Ident]) -> CompileResult<String> {
    parts
        .last()
        .map(|ident| ident.value.clone())
        .ok_or_else(|| CompileError::Unsupported("empty identifier".to_string()))
}

fn is_literal(expr: &Expr) -> bool {
    match expr {
        Expr::Value(_) => true,
        Expr::UnaryOp {
            op: UnaryOperator::Minus,
            expr,
        } => matches!(expr.as_ref(), Expr::Value(Value::Number(..))),
        _ => false,
    }
}

/// Short name of an expression's kind for diagnostics
fn describe(expr: &Expr) -> &'static str {
    match expr {
        Expr::Identifier(_) | Expr::CompoundIdentifier(_) => "column",
        Expr::Value(Value::Boolean(_)) => "boolean literal",
        Expr::Value(_) => "literal",
        Expr::BinaryOp {
            op: BinaryOperator::And | BinaryOperator::Or,
            ..
        } => "logical expression",
        Expr::BinaryOp {
            op:
                BinaryOperator::Eq
                | BinaryOperator::NotEq
                | BinaryOperator::Lt
                | BinaryOperator::Gt
                | BinaryOperator::LtEq
                | BinaryOperator::GtEq,
            ..
        }
        | Expr::Like { .. }
        | Expr::RLike { .. } => "comparison",
        Expr::BinaryOp { .. } => "arithmetic expression",
        Expr::UnaryOp {
            op: UnaryOperator::Not,
            ..
        } => "negation",
        Expr::UnaryOp { .. } => "unary operator",
        Expr::Function(_) => "function call",
        Expr::Case { .. } => "CASE expression",
        Expr::InList { .. } => "IN list",
        Expr::InSubquery { .. } => "IN subquery",
        Expr::Between { .. } => "BETWEEN",
        Expr::IsNull(_) | Expr::IsNotNull(_) => "IS NULL test",
        Expr::Subquery(_) | Expr::Exists { .. } => "subquery",
        Expr::Nested(_) => "parenthesized expression",
        _ => "expression",
    }
}

fn strip_parens(expr: &Expr) -> &Expr {
    match expr {
        Expr::Nested(inner) => strip_parens(inner),
        other => other,
    }
}
