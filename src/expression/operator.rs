//! Comparator tags used by condition nodes.

use std::fmt;
use std::str::FromStr;

/// Operator of a condition node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Lt,
    Eq,
    Gt,
    NotEq,
    Regexp,
    NotRegexp,
    Like,
    NotLike,
    And,
    Or,
}

impl CompareOp {
    /// Canonical upper-case operator text
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Eq => "=",
            CompareOp::Gt => ">",
            CompareOp::NotEq => "!=",
            CompareOp::Regexp => "REGEXP",
            CompareOp::NotRegexp => "NOT REGEXP",
            CompareOp::Like => "LIKE",
            CompareOp::NotLike => "NOT LIKE",
            CompareOp::And => "AND",
            CompareOp::Or => "OR",
        }
    }

    /// AND / OR, whose operands are conditions
    pub fn is_logical(&self) -> bool {
        matches!(self, CompareOp::And | CompareOp::Or)
    }

    /// Operators whose right operand is a pattern
    pub fn is_pattern(&self) -> bool {
        matches!(
            self,
            CompareOp::Regexp | CompareOp::NotRegexp | CompareOp::Like | CompareOp::NotLike
        )
    }

    pub fn is_like(&self) -> bool {
        matches!(self, CompareOp::Like | CompareOp::NotLike)
    }

    /// NOT REGEXP / NOT LIKE
    pub fn is_negated_pattern(&self) -> bool {
        matches!(self, CompareOp::NotRegexp | CompareOp::NotLike)
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompareOp {
    type Err = String;

    /// Parse upper-case operator text; `<>` is accepted as `!=`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "<" => Ok(CompareOp::Lt),
            "=" => Ok(CompareOp::Eq),
            ">" => Ok(CompareOp::Gt),
            "!=" | "<>" => Ok(CompareOp::NotEq),
            "REGEXP" => Ok(CompareOp::Regexp),
            "NOT REGEXP" => Ok(CompareOp::NotRegexp),
            "LIKE" => Ok(CompareOp::Like),
            "NOT LIKE" => Ok(CompareOp::NotLike),
            "AND" => Ok(CompareOp::And),
            "OR" => Ok(CompareOp::Or),
            other => Err(format!("comparison operator {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_text() {
        for op in [
            CompareOp::Lt,
            CompareOp::Eq,
            CompareOp::Gt,
            CompareOp::NotEq,
            CompareOp::Regexp,
            CompareOp::NotRegexp,
            CompareOp::Like,
            CompareOp::NotLike,
            CompareOp::And,
            CompareOp::Or,
        ] {
            assert_eq!(op.as_str().parse::<CompareOp>(), Ok(op));
        }
        assert_eq!("<>".parse::<CompareOp>(), Ok(CompareOp::NotEq));
    }

    #[test]
    fn test_unsupported_text() {
        assert!("<=".parse::<CompareOp>().is_err());
        assert!(">=".parse::<CompareOp>().is_err());
        assert!("like".parse::<CompareOp>().is_err());
    }

    #[test]
    fn test_classification() {
        assert!(CompareOp::And.is_logical());
        assert!(!CompareOp::Eq.is_logical());
        assert!(CompareOp::NotLike.is_pattern());
        assert!(CompareOp::NotLike.is_like());
        assert!(!CompareOp::Regexp.is_like());
        assert!(CompareOp::NotRegexp.is_negated_pattern());
        assert!(!CompareOp::Lt.is_pattern());
    }
}
