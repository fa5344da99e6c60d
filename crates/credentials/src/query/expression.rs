//! Query expression types and AST nodes.

use std::collections::BTreeSet;

use crate::credential::{CredentialScope, PropertyValue};

/// A parsed query expression (AST node).
///
/// Binary nodes own their operands; trees are built bottom-up and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryExpression {
    Always,
    Never,
    Not(Box<QueryExpression>),
    And(Box<QueryExpression>, Box<QueryExpression>),
    Or(Box<QueryExpression>, Box<QueryExpression>),
    /// Matches candidates compatible with a fully qualified type name.
    InstanceOf(String),
    PropertyEquals {
        property: String,
        value: Literal,
    },
    /// Matches candidates whose scope is one of the listed constants.
    ScopeIn(BTreeSet<CredentialScope>),
}

impl QueryExpression {
    pub fn not(inner: QueryExpression) -> Self {
        Self::Not(Box::new(inner))
    }

    pub fn and(left: QueryExpression, right: QueryExpression) -> Self {
        Self::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: QueryExpression, right: QueryExpression) -> Self {
        Self::Or(Box::new(left), Box::new(right))
    }

    pub fn property_equals(property: impl Into<String>, value: impl Into<Literal>) -> Self {
        Self::PropertyEquals {
            property: property.into(),
            value: value.into(),
        }
    }

    /// Returns true for `And` and `Or` nodes.
    pub fn is_composite(&self) -> bool {
        matches!(self, Self::And(..) | Self::Or(..))
    }

    /// Operands of the left-nested run of this node's operator, leftmost first.
    ///
    /// `a || b || c` parses to `Or(Or(a, b), c)` and yields `[a, b, c]`. A right
    /// operand using the same operator stays a single operand. Any other node
    /// yields itself.
    pub fn chain_operands(&self) -> Vec<&QueryExpression> {
        let mut operands = Vec::new();
        let mut current = self;
        loop {
            match (self, current) {
                (Self::And(..), Self::And(left, right)) | (Self::Or(..), Self::Or(left, right)) => {
                    operands.push(right.as_ref());
                    current = left.as_ref();
                }
                _ => {
                    operands.push(current);
                    break;
                }
            }
        }
        operands.reverse();
        operands
    }
}

/// A literal on the right-hand side of `==`.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(f64),
    Bool(bool),
}

impl Literal {
    /// Compares against a property value of the same kind.
    ///
    /// Values of a different kind never match; there is no coercion between
    /// numbers, strings and booleans.
    pub fn matches(&self, actual: &PropertyValue) -> bool {
        match (self, actual) {
            (Self::String(expected), PropertyValue::String(actual)) => expected == actual,
            (Self::Number(expected), PropertyValue::Number(actual)) => expected == actual,
            (Self::Bool(expected), PropertyValue::Bool(actual)) => expected == actual,
            _ => false,
        }
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_matches_only_same_kind() {
        assert!(Literal::from("bob").matches(&PropertyValue::from("bob")));
        assert!(!Literal::from("bob").matches(&PropertyValue::from("Bob")));
        assert!(Literal::from(42i64).matches(&PropertyValue::from(42.0)));
        assert!(!Literal::from(42i64).matches(&PropertyValue::from("42")));
        assert!(!Literal::from("42").matches(&PropertyValue::from(42i64)));
        assert!(Literal::from(true).matches(&PropertyValue::from(true)));
        assert!(!Literal::from(true).matches(&PropertyValue::from("true")));
    }

    #[test]
    fn chain_operands_follow_the_left_spine() {
        let a = QueryExpression::InstanceOf("a.A".to_string());
        let b = QueryExpression::InstanceOf("b.B".to_string());
        let c = QueryExpression::InstanceOf("c.C".to_string());

        let left_nested =
            QueryExpression::or(QueryExpression::or(a.clone(), b.clone()), c.clone());
        assert_eq!(left_nested.chain_operands(), vec![&a, &b, &c]);

        let right_nested = QueryExpression::or(a.clone(), QueryExpression::or(b.clone(), c.clone()));
        let operands = right_nested.chain_operands();
        assert_eq!(operands.len(), 2);
        assert_eq!(operands[0], &a);

        let mixed = QueryExpression::and(QueryExpression::or(a.clone(), b), c.clone());
        assert_eq!(mixed.chain_operands().len(), 2);
        assert_eq!(a.chain_operands(), vec![&a]);
    }

    #[test]
    fn nan_literal_never_matches() {
        assert!(!Literal::Number(f64::NAN).matches(&PropertyValue::Number(f64::NAN)));
    }
}
