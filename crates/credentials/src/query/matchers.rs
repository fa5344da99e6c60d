//! Constructors for common query expressions.

use std::collections::BTreeSet;

use crate::credential::CredentialScope;

use super::expression::{Literal, QueryExpression};

pub fn always() -> QueryExpression {
    QueryExpression::Always
}

pub fn never() -> QueryExpression {
    QueryExpression::Never
}

pub fn not(matcher: QueryExpression) -> QueryExpression {
    QueryExpression::not(matcher)
}

/// Conjunction of every matcher, folded left. Matches everything when empty.
pub fn all_of(matchers: impl IntoIterator<Item = QueryExpression>) -> QueryExpression {
    matchers
        .into_iter()
        .reduce(QueryExpression::and)
        .unwrap_or(QueryExpression::Always)
}

/// Disjunction of every matcher, folded left. Matches nothing when empty.
pub fn any_of(matchers: impl IntoIterator<Item = QueryExpression>) -> QueryExpression {
    matchers
        .into_iter()
        .reduce(QueryExpression::or)
        .unwrap_or(QueryExpression::Never)
}

pub fn with_id(id: impl Into<String>) -> QueryExpression {
    QueryExpression::property_equals("id", Literal::String(id.into()))
}

pub fn with_username(username: impl Into<String>) -> QueryExpression {
    QueryExpression::property_equals("username", Literal::String(username.into()))
}

pub fn with_property(name: impl Into<String>, value: impl Into<Literal>) -> QueryExpression {
    QueryExpression::property_equals(name, value)
}

pub fn with_scope(scope: CredentialScope) -> QueryExpression {
    QueryExpression::ScopeIn(BTreeSet::from([scope]))
}

pub fn with_scopes(scopes: impl IntoIterator<Item = CredentialScope>) -> QueryExpression {
    QueryExpression::ScopeIn(scopes.into_iter().collect())
}

pub fn instance_of(type_name: impl Into<String>) -> QueryExpression {
    QueryExpression::InstanceOf(type_name.into())
}
