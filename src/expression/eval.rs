//! Per-record evaluation of compiled expressions.

use crate::expression::error::{EvalError, EvalResult};
use crate::expression::expr::{Case, Condition, Expression, FunctionCall};
use crate::expression::operator::CompareOp;
use crate::expression::pattern::{compile_like, compile_regexp, is_zero_value};
use crate::record::Record;
use regex::Regex;
use std::borrow::Cow;

/// Evaluates expressions against one record
pub struct RecordEvaluator<'a> {
    record: &'a Record,
    strict: bool,
}

impl<'a> RecordEvaluator<'a> {
    pub fn new(record: &'a Record, strict: bool) -> Self {
        Self { record, strict }
    }

    /// Evaluate an expression to its string value
    pub fn evaluate(&self, expr: &Expression) -> EvalResult<String> {
        match expr {
            Expression::Attribute(name) => self.lookup(name).map(str::to_string),
            Expression::Constant(value) => Ok(value.clone()),
            Expression::FunctionCall(call) => self.evaluate_call(call),
            Expression::Condition(cond) => Ok(self.evaluate_condition(cond)?.to_string()),
            Expression::Case(case) => self.evaluate_case(case),
            Expression::None => Ok(String::new()),
        }
    }

    /// Evaluate a condition tree with short-circuit AND / OR
    pub fn evaluate_condition(&self, cond: &Condition) -> EvalResult<bool> {
        let op = cond.op();
        match op {
            CompareOp::And => {
                if !self.evaluate_branch(cond.left(), op)? {
                    return Ok(false);
                }
                self.evaluate_branch(cond.right(), op)
            }
            CompareOp::Or => {
                if self.evaluate_branch(cond.left(), op)? {
                    return Ok(true);
                }
                self.evaluate_branch(cond.right(), op)
            }
            _ => self.evaluate_comparison(cond),
        }
    }

    fn evaluate_branch(&self, expr: &Expression, op: CompareOp) -> EvalResult<bool> {
        match expr {
            Expression::Condition(cond) => self.evaluate_condition(cond),
            other => Err(EvalError::MalformedCondition(format!(
                "{} operand is a {:?}, not a condition",
                op,
                other.kind()
            ))),
        }
    }

    fn evaluate_comparison(&self, cond: &Condition) -> EvalResult<bool> {
        let op = cond.op();
        let left = self.evaluate(cond.left())?;

        if let Expression::None = cond.right() {
            return match op {
                CompareOp::Eq => Ok(is_zero_value(&left)),
                CompareOp::NotEq => Ok(!is_zero_value(&left)),
                other => Err(EvalError::MalformedCondition(format!(
                    "{} has no right operand",
                    other
                ))),
            };
        }

        let right = self.evaluate(cond.right())?;
        match op {
            CompareOp::Eq => Ok(left == right),
            CompareOp::NotEq => Ok(left != right),
            CompareOp::Lt => Ok(parse_number(op, &left)? < parse_number(op, &right)?),
            CompareOp::Gt => Ok(parse_number(op, &left)? > parse_number(op, &right)?),
            CompareOp::Regexp | CompareOp::NotRegexp | CompareOp::Like | CompareOp::NotLike => {
                let pattern = match &cond.comparator().pattern {
                    Some(pattern) => Cow::Borrowed(pattern),
                    None => Cow::Owned(compile_dynamic(op, &right)?),
                };
                // REGEXP is a substring search; LIKE patterns are anchored
                let matched = pattern.is_match(&left);
                Ok(matched != op.is_negated_pattern())
            }
            CompareOp::And | CompareOp::Or => Err(EvalError::MalformedCondition(format!(
                "{} reached comparison evaluation",
                op
            ))),
        }
    }

    fn evaluate_call(&self, call: &FunctionCall) -> EvalResult<String> {
        let params = call
            .args
            .iter()
            .map(|arg| self.evaluate(arg))
            .collect::<EvalResult<Vec<_>>>()?;
        call.function
            .process(&params)
            .map_err(|source| EvalError::Function {
                name: call.name().to_string(),
                source,
            })
    }

    fn evaluate_case(&self, case: &Case) -> EvalResult<String> {
        for (condition, result) in &case.branches {
            if self.evaluate_condition(condition)? {
                return self.evaluate(result);
            }
        }
        self.evaluate(&case.else_expr)
    }

    /// Look up an attribute; an absent key is an error only in strict mode
    fn lookup(&self, name: &str) -> EvalResult<&'a str> {
        match self.record.get(name) {
            Some(value) => Ok(value),
            None if self.strict => Err(EvalError::MissingAttribute {
                name: name.to_string(),
            }),
            None => Ok(""),
        }
    }
}

fn parse_number(op: CompareOp, value: &str) -> EvalResult<f64> {
    value
        .parse::<f64>()
        .map_err(|_| EvalError::NonNumericOperand {
            op,
            value: value.to_string(),
        })
}

fn compile_dynamic(op: CompareOp, pattern: &str) -> EvalResult<Regex> {
    let compiled = if op.is_like() {
        compile_like(pattern)
    } else {
        compile_regexp(pattern)
    };
    compiled.map_err(|e| EvalError::InvalidPattern {
        op,
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::expr::Comparator;
    use crate::function::{Function, FunctionError, FunctionRegistry, FunctionResult};

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn compare(left: Expression, op: CompareOp, right: Expression) -> Condition {
        Condition::compare(left, Comparator::new(op), right).unwrap()
    }

    fn attr_vs(name: &str, op: CompareOp, value: &str) -> Condition {
        compare(Expression::attribute(name), op, Expression::constant(value))
    }

    /// Fails every call, to prove an operand was never evaluated
    struct Explode;

    impl Function for Explode {
        fn init(&mut self, _params: &[String]) -> FunctionResult<()> {
            Ok(())
        }

        fn process(&self, _params: &[String]) -> FunctionResult<String> {
            Err(FunctionError::Failed {
                function: "explode".to_string(),
                message: "evaluated".to_string(),
            })
        }

        fn name(&self) -> &str {
            "explode"
        }
    }

    fn exploding_condition() -> Condition {
        let call = Expression::FunctionCall(FunctionCall::new(Box::new(Explode), vec![]));
        Condition::truthy(call).unwrap()
    }

    #[test]
    fn test_attribute_lookup() {
        let rec = record(&[("a", "1"), ("empty", "")]);
        let strict = RecordEvaluator::new(&rec, true);
        assert_eq!(strict.evaluate(&Expression::attribute("a")).unwrap(), "1");
        assert_eq!(strict.evaluate(&Expression::attribute("empty")).unwrap(), "");
        assert_eq!(
            strict.evaluate(&Expression::attribute("missing")),
            Err(EvalError::MissingAttribute {
                name: "missing".to_string()
            })
        );

        let lenient = RecordEvaluator::new(&rec, false);
        assert_eq!(lenient.evaluate(&Expression::attribute("missing")).unwrap(), "");
    }

    #[test]
    fn test_zero_value_tests() {
        let rec = record(&[("zero", "0"), ("float", "0.0"), ("empty", ""), ("one", "0.1")]);
        let eval = RecordEvaluator::new(&rec, true);

        for name in ["zero", "float", "empty"] {
            let truthy = Condition::truthy(Expression::attribute(name)).unwrap();
            let falsy = Condition::falsy(Expression::attribute(name)).unwrap();
            assert!(!eval.evaluate_condition(&truthy).unwrap(), "{}", name);
            assert!(eval.evaluate_condition(&falsy).unwrap(), "{}", name);
        }

        let truthy = Condition::truthy(Expression::attribute("one")).unwrap();
        assert!(eval.evaluate_condition(&truthy).unwrap());
    }

    #[test]
    fn test_string_equality() {
        let rec = record(&[("n", "1.0")]);
        let eval = RecordEvaluator::new(&rec, true);
        assert!(!eval
            .evaluate_condition(&attr_vs("n", CompareOp::Eq, "1"))
            .unwrap());
        assert!(eval
            .evaluate_condition(&attr_vs("n", CompareOp::NotEq, "1"))
            .unwrap());
        assert!(eval
            .evaluate_condition(&attr_vs("n", CompareOp::Eq, "1.0"))
            .unwrap());
    }

    #[test]
    fn test_numeric_ordering() {
        let rec = record(&[("n", "10"), ("s", "abc")]);
        let eval = RecordEvaluator::new(&rec, true);
        assert!(eval.evaluate_condition(&attr_vs("n", CompareOp::Gt, "9")).unwrap());
        assert!(!eval.evaluate_condition(&attr_vs("n", CompareOp::Lt, "9")).unwrap());
        assert!(eval.evaluate_condition(&attr_vs("n", CompareOp::Lt, "1e3")).unwrap());

        assert_eq!(
            eval.evaluate_condition(&attr_vs("s", CompareOp::Gt, "1")),
            Err(EvalError::NonNumericOperand {
                op: CompareOp::Gt,
                value: "abc".to_string()
            })
        );
        assert!(matches!(
            eval.evaluate_condition(&attr_vs("n", CompareOp::Lt, "x")),
            Err(EvalError::NonNumericOperand { .. })
        ));
    }

    #[test]
    fn test_dynamic_patterns() {
        let rec = record(&[("msg", "disk error on sda"), ("pat", "err"), ("like", "disk%")]);
        let eval = RecordEvaluator::new(&rec, true);

        let regexp = compare(
            Expression::attribute("msg"),
            CompareOp::Regexp,
            Expression::attribute("pat"),
        );
        assert!(eval.evaluate_condition(&regexp).unwrap());

        let not_regexp = compare(
            Expression::attribute("msg"),
            CompareOp::NotRegexp,
            Expression::attribute("pat"),
        );
        assert!(!eval.evaluate_condition(&not_regexp).unwrap());

        let like = compare(
            Expression::attribute("msg"),
            CompareOp::Like,
            Expression::attribute("like"),
        );
        assert!(eval.evaluate_condition(&like).unwrap());

        let not_like = attr_vs("msg", CompareOp::NotLike, "err");
        assert!(eval.evaluate_condition(&not_like).unwrap());
    }

    #[test]
    fn test_precompiled_pattern_is_used() {
        let rec = record(&[("msg", "abc")]);
        let eval = RecordEvaluator::new(&rec, true);
        // The stored pattern wins over the right operand's text
        let cond = Condition::compare(
            Expression::attribute("msg"),
            Comparator::with_pattern(CompareOp::Regexp, Regex::new("^a").unwrap()),
            Expression::constant("zzz"),
        )
        .unwrap();
        assert!(eval.evaluate_condition(&cond).unwrap());
    }

    #[test]
    fn test_bad_dynamic_pattern() {
        let rec = record(&[("msg", "abc"), ("pat", "(")]);
        let eval = RecordEvaluator::new(&rec, true);
        let cond = compare(
            Expression::attribute("msg"),
            CompareOp::Regexp,
            Expression::attribute("pat"),
        );
        assert!(matches!(
            eval.evaluate_condition(&cond),
            Err(EvalError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_and_short_circuit() {
        let rec = record(&[("a", "0")]);
        let eval = RecordEvaluator::new(&rec, true);

        let left = Condition::truthy(Expression::attribute("a")).unwrap();
        let cond = Condition::logical(CompareOp::And, left, exploding_condition()).unwrap();
        assert_eq!(eval.evaluate_condition(&cond), Ok(false));

        let left = Condition::falsy(Expression::attribute("a")).unwrap();
        let cond = Condition::logical(CompareOp::And, left, exploding_condition()).unwrap();
        assert!(matches!(
            eval.evaluate_condition(&cond),
            Err(EvalError::Function { .. })
        ));
    }

    #[test]
    fn test_or_short_circuit() {
        let rec = record(&[("a", "1")]);
        let eval = RecordEvaluator::new(&rec, true);

        let left = Condition::truthy(Expression::attribute("a")).unwrap();
        let cond = Condition::logical(CompareOp::Or, left, exploding_condition()).unwrap();
        assert_eq!(eval.evaluate_condition(&cond), Ok(true));

        let left = Condition::falsy(Expression::attribute("a")).unwrap();
        let cond = Condition::logical(CompareOp::Or, left, exploding_condition()).unwrap();
        assert!(eval.evaluate_condition(&cond).is_err());
    }

    #[test]
    fn test_function_arguments() {
        let registry = FunctionRegistry::with_builtins();
        let rec = record(&[("a", "x"), ("n", "5")]);
        let eval = RecordEvaluator::new(&rec, true);

        let call = FunctionCall::new(
            registry.resolve("concat").unwrap(),
            vec![
                Expression::attribute("a"),
                Expression::constant(":"),
                Expression::Condition(attr_vs("n", CompareOp::Gt, "3")),
                Expression::constant(":"),
                Expression::Condition(attr_vs("n", CompareOp::Eq, "3")),
            ],
        );
        assert_eq!(
            eval.evaluate(&Expression::FunctionCall(call)).unwrap(),
            "x:true:false"
        );
    }

    #[test]
    fn test_function_failure_names_function() {
        let rec = record(&[]);
        let eval = RecordEvaluator::new(&rec, true);
        let call = Expression::FunctionCall(FunctionCall::new(Box::new(Explode), vec![]));
        let err = eval.evaluate(&call).unwrap_err();
        assert_eq!(err.to_string(), "function explode failed: explode: evaluated");
    }

    #[test]
    fn test_case_dispatch() {
        let case = Case::new(
            vec![
                (attr_vs("status", CompareOp::Eq, "1"), Expression::constant("ok")),
                (attr_vs("status", CompareOp::Eq, "2"), Expression::attribute("status")),
            ],
            Expression::constant("bad"),
        );
        let expr = Expression::Case(case);

        let rec = record(&[("status", "1")]);
        assert_eq!(RecordEvaluator::new(&rec, true).evaluate(&expr).unwrap(), "ok");
        let rec = record(&[("status", "2")]);
        assert_eq!(RecordEvaluator::new(&rec, true).evaluate(&expr).unwrap(), "2");
        let rec = record(&[("status", "3")]);
        assert_eq!(RecordEvaluator::new(&rec, true).evaluate(&expr).unwrap(), "bad");
    }

    #[test]
    fn test_case_branch_error_propagates() {
        let case = Case::new(
            vec![(attr_vs("missing", CompareOp::Eq, "1"), Expression::constant("ok"))],
            Expression::constant("bad"),
        );
        let rec = record(&[]);
        assert!(RecordEvaluator::new(&rec, true)
            .evaluate(&Expression::Case(case))
            .is_err());
    }
}
