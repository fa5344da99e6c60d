//! Compiled credential matcher.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::QueryConfig;
use crate::credential::CredentialView;
use crate::error::{CredentialsError, Result};

use super::describe::describe_query;
use super::evaluate::{evaluate, filter};
use super::expression::QueryExpression;
use super::parser::{parse_query, parse_query_with_max_depth, QuerySyntaxError};

/// A parsed query ready to be applied to credentials.
///
/// Serializes as its canonical description, so a persisted matcher is an
/// opaque query string. Every constructor guarantees that string parses back.
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialsMatcher {
    expression: QueryExpression,
}

impl CredentialsMatcher {
    /// Compiles raw query text. Empty text matches every credential.
    pub fn compile(raw_query: &str) -> std::result::Result<Self, QuerySyntaxError> {
        parse_query(raw_query).map(Self::new)
    }

    /// Compiles raw query text, enforcing the configured size and depth caps.
    pub fn compile_with_config(raw_query: &str, config: &QueryConfig) -> Result<Self> {
        if raw_query.len() > config.max_length {
            return Err(CredentialsError::QueryTooLong {
                max: config.max_length,
                actual: raw_query.len(),
            });
        }
        Ok(parse_query_with_max_depth(raw_query, config.max_depth).map(Self::new)?)
    }

    fn new(expression: QueryExpression) -> Self {
        Self { expression }
    }

    /// Returns the parsed expression.
    pub fn expression(&self) -> &QueryExpression {
        &self.expression
    }

    pub fn into_expression(self) -> QueryExpression {
        self.expression
    }

    pub fn matches<C: CredentialView + ?Sized>(&self, candidate: &C) -> bool {
        evaluate(&self.expression, candidate)
    }

    /// Keeps the matching candidates in their original order.
    pub fn filter<I>(&self, candidates: I) -> Vec<I::Item>
    where
        I: IntoIterator,
        I::Item: CredentialView,
    {
        filter(candidates, &self.expression)
    }

    /// Returns the first matching candidate.
    pub fn first<I>(&self, candidates: I) -> Option<I::Item>
    where
        I: IntoIterator,
        I::Item: CredentialView,
    {
        candidates
            .into_iter()
            .find(|candidate| self.matches(candidate))
    }

    /// Returns the first matching candidate, or `default` when none match.
    pub fn first_or<I>(&self, candidates: I, default: I::Item) -> I::Item
    where
        I: IntoIterator,
        I::Item: CredentialView,
    {
        self.first(candidates).unwrap_or(default)
    }

    /// Returns the canonical query text.
    pub fn describe(&self) -> String {
        describe_query(&self.expression)
    }
}

impl Default for CredentialsMatcher {
    fn default() -> Self {
        Self::new(QueryExpression::Always)
    }
}

/// Accepts an expression built in code, such as with [`matchers`](super::matchers).
///
/// Property and type names must be query identifiers (`[A-Za-z_$][A-Za-z0-9_$]*`
/// segments joined by `.`) other than `true` and `false`, and no property may be
/// named `instanceof`. Nesting must fit the default parser depth. The check is
/// that the canonical description parses back to the same description.
impl TryFrom<QueryExpression> for CredentialsMatcher {
    type Error = QuerySyntaxError;

    fn try_from(expression: QueryExpression) -> std::result::Result<Self, Self::Error> {
        let described = describe_query(&expression);
        let reparsed = parse_query(&described)?;
        let redescribed = describe_query(&reparsed);
        if redescribed != described {
            return Err(QuerySyntaxError {
                offset: 0,
                expected: described,
                found: redescribed,
            });
        }
        Ok(Self::new(expression))
    }
}

impl fmt::Display for CredentialsMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

impl FromStr for CredentialsMatcher {
    type Err = QuerySyntaxError;

    fn from_str(raw_query: &str) -> std::result::Result<Self, Self::Err> {
        Self::compile(raw_query)
    }
}

impl Serialize for CredentialsMatcher {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.describe())
    }
}

impl<'de> Deserialize<'de> for CredentialsMatcher {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::compile(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::{CredentialRecord, CredentialScope};
    use crate::query::matchers;

    fn store() -> Vec<CredentialRecord> {
        vec![
            CredentialRecord::new("c1", CredentialScope::Global).with_property("username", "bob"),
            CredentialRecord::new("c2", CredentialScope::System).with_property("username", "alice"),
            CredentialRecord::new("c3", CredentialScope::Global).with_property("username", "bob"),
        ]
    }

    #[test]
    fn filter_returns_matches_in_original_order() {
        let matcher = CredentialsMatcher::compile(r#"username == "bob""#).expect("compile");
        let ids: Vec<String> = matcher
            .filter(store())
            .into_iter()
            .map(|credential| credential.id)
            .collect();
        assert_eq!(ids, vec!["c1", "c3"]);
    }

    #[test]
    fn empty_query_matches_everything() {
        let matcher = CredentialsMatcher::compile("").expect("compile");
        assert_eq!(matcher.filter(&store()).len(), 3);
        assert_eq!(matcher, CredentialsMatcher::default());
    }

    #[test]
    fn first_and_first_or() {
        let credentials = store();
        let system = CredentialsMatcher::compile("scope in (SYSTEM)").expect("compile");
        assert_eq!(system.first(&credentials).map(|c| c.id.as_str()), Some("c2"));

        let fallback = CredentialRecord::new("fallback", CredentialScope::User);
        let node = CredentialsMatcher::compile("scope in (NODE)").expect("compile");
        assert_eq!(node.first(&credentials), None);
        assert_eq!(node.first_or(&credentials, &fallback).id, "fallback");
    }

    #[test]
    fn compile_with_config_enforces_length_cap() {
        let config = QueryConfig {
            max_length: 8,
            ..QueryConfig::default()
        };
        assert!(CredentialsMatcher::compile_with_config("true", &config).is_ok());
        let error = CredentialsMatcher::compile_with_config(r#"id == "too-long""#, &config)
            .expect_err("too long");
        assert!(matches!(
            error,
            CredentialsError::QueryTooLong { max: 8, actual: 16 }
        ));
    }

    #[test]
    fn compile_with_config_surfaces_syntax_errors() {
        let error = CredentialsMatcher::compile_with_config("id ==", &QueryConfig::default())
            .expect_err("syntax");
        assert!(matches!(error, CredentialsError::QuerySyntax(_)));
    }

    #[test]
    fn compile_with_config_enforces_depth_cap() {
        let config = QueryConfig {
            max_depth: 2,
            ..QueryConfig::default()
        };
        assert!(CredentialsMatcher::compile_with_config("!(true)", &config).is_ok());
        let error = CredentialsMatcher::compile_with_config("!!(true)", &config)
            .expect_err("too deep");
        assert!(matches!(error, CredentialsError::QuerySyntax(ref syntax) if syntax.expected == "shallower nesting"));
    }

    #[test]
    fn deeply_nested_query_within_length_cap_is_rejected() {
        let config = QueryConfig::default();
        let half = config.max_length / 2 - 2;
        let deep = format!("{}true{}", "(".repeat(half), ")".repeat(half));
        assert!(deep.len() <= config.max_length);
        assert!(matches!(
            CredentialsMatcher::compile_with_config(&deep, &config),
            Err(CredentialsError::QuerySyntax(_))
        ));
    }

    #[test]
    fn built_expressions_with_query_names_are_accepted() {
        let expression = matchers::all_of([
            matchers::instance_of("com.example.ssh.KeyCredentials$Impl"),
            matchers::with_property("key_size", 4096i64),
            matchers::with_property("scope", "GLOBAL"),
            matchers::not(matchers::with_scopes([CredentialScope::Node])),
        ]);
        let matcher = CredentialsMatcher::try_from(expression.clone()).expect("valid");
        assert_eq!(matcher.expression(), &expression);

        let json = serde_json::to_string(&matcher).expect("serialize");
        let restored: CredentialsMatcher = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored, matcher);
    }

    #[test]
    fn built_expressions_with_unparseable_names_are_rejected() {
        for expression in [
            matchers::with_property("user-name", "bob"),
            matchers::with_property("instanceof", "x"),
            matchers::with_property("true", 1.0),
            matchers::with_property("false", true),
            matchers::with_property("", "empty"),
            matchers::with_property("key size", 1.0),
            matchers::instance_of("Foo[]"),
            matchers::instance_of("true"),
            matchers::instance_of("com..Double"),
        ] {
            let described = describe_query(&expression);
            assert!(
                CredentialsMatcher::try_from(expression).is_err(),
                "{described} should be rejected"
            );
        }
    }

    #[test]
    fn built_expressions_nested_too_deeply_are_rejected() {
        let deep = (0..300).fold(matchers::always(), |inner, _| matchers::not(inner));
        assert!(CredentialsMatcher::try_from(deep).is_err());
    }

    #[test]
    fn display_and_from_str_round_trip() {
        let matcher: CredentialsMatcher = "id == \"a\" || !instanceof x.Y".parse().expect("parse");
        assert_eq!(matcher.to_string(), r#"(id == "a" || !(instanceof x.Y))"#);
        let reparsed: CredentialsMatcher = matcher.to_string().parse().expect("reparse");
        assert_eq!(reparsed, matcher);
    }

    #[test]
    fn serializes_as_canonical_query() {
        let matcher = CredentialsMatcher::compile("scope in (USER,GLOBAL) && enabled == true")
            .expect("compile");
        let json = serde_json::to_string(&matcher).expect("serialize");
        assert_eq!(json, r#""(scope in (GLOBAL, USER) && enabled == true)""#);

        let restored: CredentialsMatcher = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored, matcher);
        assert!(serde_json::from_str::<CredentialsMatcher>(r#""id == bob""#).is_err());
    }
}
