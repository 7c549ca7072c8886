//! SQL operator types and conversions

use crate::{Error, Result};
use std::fmt::{self, Display};
use std::str::FromStr;

/// Comparison operator allowed inside a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Gt,
    Lt,
    Gte,
    Lte,
    Neq,
    /// `<>`, kept distinct from `!=` so the emitted SQL matches the caller's spelling
    NeqAnsi,
    Like,
    NotLike,
    In,
    NotIn,
}

impl Operator {
    /// Get the string representation of the operator
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Gte => ">=",
            Operator::Lte => "<=",
            Operator::Neq => "!=",
            Operator::NeqAnsi => "<>",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
        }
    }

    /// Whether the operator takes a parenthesised value list
    pub fn is_membership(&self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_uppercase();
        let op = match normalized.as_str() {
            "=" => Operator::Eq,
            ">" => Operator::Gt,
            "<" => Operator::Lt,
            ">=" => Operator::Gte,
            "<=" => Operator::Lte,
            "!=" => Operator::Neq,
            "<>" => Operator::NeqAnsi,
            "LIKE" => Operator::Like,
            "NOT LIKE" => Operator::NotLike,
            "IN" => Operator::In,
            "NOT IN" => Operator::NotIn,
            _ => {
                return Err(Error::UnknownOperator {
                    token: s.to_string(),
                })
            }
        };
        Ok(op)
    }
}

/// Trait for types that can be converted to SQL operators
pub trait IntoOperator {
    fn into_operator(self) -> Result<Operator>;
}

impl IntoOperator for Operator {
    fn into_operator(self) -> Result<Operator> {
        Ok(self)
    }
}

/// Allow string literals for the supported operators, case-insensitively
impl IntoOperator for &str {
    fn into_operator(self) -> Result<Operator> {
        self.parse()
    }
}

/// Logical connector placed between two conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logic {
    And,
    Or,
    Not,
}

impl Logic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Logic::And => "AND",
            Logic::Or => "OR",
            Logic::Not => "NOT",
        }
    }
}

impl Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Logic {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "AND" => Ok(Logic::And),
            "OR" => Ok(Logic::Or),
            "NOT" => Ok(Logic::Not),
            _ => Err(Error::UnknownOperator {
                token: s.to_string(),
            }),
        }
    }
}

/// Convenience module for operator constants
pub mod op {
    use super::Operator;

    pub const EQ: Operator = Operator::Eq;
    pub const GT: Operator = Operator::Gt;
    pub const LT: Operator = Operator::Lt;
    pub const GTE: Operator = Operator::Gte;
    pub const LTE: Operator = Operator::Lte;
    pub const NEQ: Operator = Operator::Neq;
    pub const LIKE: Operator = Operator::Like;
    pub const NOT_LIKE: Operator = Operator::NotLike;
    pub const IN: Operator = Operator::In;
    pub const NOT_IN: Operator = Operator::NotIn;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_strings() {
        assert_eq!(Operator::Gt.as_str(), ">");
        assert_eq!(Operator::NeqAnsi.as_str(), "<>");
        assert_eq!(Operator::NotLike.as_str(), "NOT LIKE");
        assert_eq!(format!("{}", Operator::In), "IN");
    }

    #[test]
    fn test_string_conversion() {
        assert_eq!(">".into_operator().unwrap(), Operator::Gt);
        assert_eq!("like".into_operator().unwrap(), Operator::Like);
        assert_eq!("not in".into_operator().unwrap(), Operator::NotIn);
        assert_eq!(" <= ".into_operator().unwrap(), Operator::Lte);
    }

    #[test]
    fn test_unknown_operator_is_rejected() {
        let err = "ILIKE".into_operator().unwrap_err();
        assert_eq!(
            err,
            Error::UnknownOperator {
                token: "ILIKE".to_string()
            }
        );
    }

    #[test]
    fn test_membership_operators() {
        assert!(op::IN.is_membership());
        assert!(op::NOT_IN.is_membership());
        assert!(!op::EQ.is_membership());
    }

    #[test]
    fn test_logic_parsing() {
        assert_eq!("and".parse::<Logic>().unwrap(), Logic::And);
        assert_eq!("Or".parse::<Logic>().unwrap(), Logic::Or);
        assert!("xor".parse::<Logic>().is_err());
    }
}
