//! Recursive-descent query parser.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! or      := and ('||' and)*
//! and     := unary ('&&' unary)*
//! unary   := '!' unary | primary
//! primary := '(' or ')'
//!          | 'true' | 'false'
//!          | 'instanceof' TypeName
//!          | 'scope' 'in' '(' ScopeName (',' ScopeName)* ')'
//!          | Identifier '==' Literal
//! ```
//!
//! Every `(` and `!` opens one nesting level. Input nested deeper than the
//! configured limit is rejected before the recursion can exhaust the stack.

use std::collections::BTreeSet;

use crate::config::DEFAULT_MAX_QUERY_DEPTH;
use crate::credential::CredentialScope;

use super::expression::{Literal, QueryExpression};
use super::lexer::{tokenize, LexError, Operator, Punctuation, Token, TokenKind};

const INSTANCEOF_KEYWORD: &str = "instanceof";
const SCOPE_KEYWORD: &str = "scope";
const IN_KEYWORD: &str = "in";

/// The single error kind for malformed query text, lexical or grammatical.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Query syntax error near byte {offset}: expected {expected}, found {found}")]
pub struct QuerySyntaxError {
    pub offset: usize,
    pub expected: String,
    pub found: String,
}

impl QuerySyntaxError {
    fn new(offset: usize, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self {
            offset,
            expected: expected.into(),
            found: found.into(),
        }
    }
}

impl From<LexError> for QuerySyntaxError {
    fn from(error: LexError) -> Self {
        Self::new(
            error.offset,
            "a valid token",
            format!("{} `{}`", error.reason, error.text),
        )
    }
}

/// Parses query text into an expression.
///
/// Empty or whitespace-only text yields [`QueryExpression::Always`].
pub fn parse_query(input: &str) -> Result<QueryExpression, QuerySyntaxError> {
    parse_query_with_max_depth(input, DEFAULT_MAX_QUERY_DEPTH)
}

/// Parses query text, allowing at most `max_depth` nested `(` and `!`.
pub fn parse_query_with_max_depth(
    input: &str,
    max_depth: usize,
) -> Result<QueryExpression, QuerySyntaxError> {
    QueryParser::parse_with_max_depth(input, max_depth).inspect_err(|error| {
        log::debug!(
            "rejected credential query near byte {}: expected {}",
            error.offset,
            error.expected
        );
    })
}

/// Parses an already tokenized query.
pub fn parse_tokens(tokens: Vec<Token>) -> Result<QueryExpression, QuerySyntaxError> {
    QueryParser::from_tokens(tokens).parse_all()
}

// ---------------------------------------------------------------------------
// Query parser
// ---------------------------------------------------------------------------

pub struct QueryParser {
    tokens: Vec<Token>,
    index: usize,
    input_len: usize,
    depth: usize,
    max_depth: usize,
}

impl QueryParser {
    pub fn parse(input: &str) -> Result<QueryExpression, QuerySyntaxError> {
        Self::parse_with_max_depth(input, DEFAULT_MAX_QUERY_DEPTH)
    }

    pub fn parse_with_max_depth(
        input: &str,
        max_depth: usize,
    ) -> Result<QueryExpression, QuerySyntaxError> {
        let tokens = tokenize(input)?;
        let mut parser = Self::from_tokens(tokens);
        parser.input_len = input.len();
        parser.max_depth = max_depth;
        parser.parse_all()
    }

    fn from_tokens(tokens: Vec<Token>) -> Self {
        let input_len = tokens
            .last()
            .map(|token| token.offset + token.text.len())
            .unwrap_or_default();
        Self {
            tokens,
            index: 0,
            input_len,
            depth: 0,
            max_depth: DEFAULT_MAX_QUERY_DEPTH,
        }
    }

    fn parse_all(mut self) -> Result<QueryExpression, QuerySyntaxError> {
        if self.tokens.is_empty() {
            return Ok(QueryExpression::Always);
        }

        let expression = self.parse_or_expression()?;
        if let Some(token) = self.peek() {
            return Err(QuerySyntaxError::new(
                token.offset,
                format!(
                    "'{}', '{}' or end of query",
                    Operator::And.as_str(),
                    Operator::Or.as_str()
                ),
                token.to_string(),
            ));
        }

        Ok(expression)
    }

    fn parse_or_expression(&mut self) -> Result<QueryExpression, QuerySyntaxError> {
        let mut expression = self.parse_and_expression()?;
        while self.consume_operator(Operator::Or) {
            let right = self.parse_and_expression()?;
            expression = QueryExpression::or(expression, right);
        }
        Ok(expression)
    }

    fn parse_and_expression(&mut self) -> Result<QueryExpression, QuerySyntaxError> {
        let mut expression = self.parse_unary_expression()?;
        while self.consume_operator(Operator::And) {
            let right = self.parse_unary_expression()?;
            expression = QueryExpression::and(expression, right);
        }
        Ok(expression)
    }

    fn parse_unary_expression(&mut self) -> Result<QueryExpression, QuerySyntaxError> {
        if self.peek_is_operator(Operator::Not) {
            let offset = self.current_offset();
            self.index += 1;
            let inner = self.nested(offset, Self::parse_unary_expression)?;
            return Ok(QueryExpression::not(inner));
        }
        self.parse_primary_expression()
    }

    fn parse_primary_expression(&mut self) -> Result<QueryExpression, QuerySyntaxError> {
        let Some(token) = self.next() else {
            return Err(self.error_at_end("an expression"));
        };

        match token.kind {
            TokenKind::Punctuation(Punctuation::LParen) => self.nested(token.offset, |parser| {
                let expression = parser.parse_or_expression()?;
                parser.expect_punctuation(Punctuation::RParen)?;
                Ok(expression)
            }),
            TokenKind::BooleanLiteral(value) if !self.peek_is_operator(Operator::Equals) => {
                Ok(if value {
                    QueryExpression::Always
                } else {
                    QueryExpression::Never
                })
            }
            ref kind if kind.is_literal() => Err(leading_literal_error(&token)),
            TokenKind::Identifier(ref name) if name == INSTANCEOF_KEYWORD => {
                self.parse_instance_of()
            }
            TokenKind::Identifier(ref name)
                if name == SCOPE_KEYWORD && self.peek_is_identifier(IN_KEYWORD) =>
            {
                self.index += 1;
                self.parse_scope_set()
            }
            TokenKind::Identifier(name) => self.parse_comparison(name),
            _ => Err(QuerySyntaxError::new(
                token.offset,
                "an expression",
                token.to_string(),
            )),
        }
    }

    fn parse_instance_of(&mut self) -> Result<QueryExpression, QuerySyntaxError> {
        match self.next() {
            Some(Token {
                kind: TokenKind::Identifier(type_name),
                ..
            }) => Ok(QueryExpression::InstanceOf(type_name)),
            Some(token) => Err(QuerySyntaxError::new(
                token.offset,
                "a type name",
                token.to_string(),
            )),
            None => Err(self.error_at_end("a type name")),
        }
    }

    fn parse_scope_set(&mut self) -> Result<QueryExpression, QuerySyntaxError> {
        self.expect_punctuation(Punctuation::LParen)?;

        let mut scopes = BTreeSet::new();
        loop {
            scopes.insert(self.parse_scope_name()?);
            if self.consume_punctuation(Punctuation::Comma) {
                continue;
            }
            self.expect_punctuation(Punctuation::RParen)?;
            break;
        }

        Ok(QueryExpression::ScopeIn(scopes))
    }

    fn parse_scope_name(&mut self) -> Result<CredentialScope, QuerySyntaxError> {
        const EXPECTED: &str = "a scope name (GLOBAL, SYSTEM, USER or NODE)";
        match self.next() {
            Some(token) => match &token.kind {
                TokenKind::Identifier(name) => CredentialScope::from_name(name)
                    .ok_or_else(|| QuerySyntaxError::new(token.offset, EXPECTED, token.to_string())),
                _ => Err(QuerySyntaxError::new(
                    token.offset,
                    EXPECTED,
                    token.to_string(),
                )),
            },
            None => Err(self.error_at_end(EXPECTED)),
        }
    }

    fn parse_comparison(&mut self, property: String) -> Result<QueryExpression, QuerySyntaxError> {
        if !self.consume_operator(Operator::Equals) {
            let expected = format!("'{}'", Operator::Equals.as_str());
            return Err(match self.peek() {
                Some(token) => QuerySyntaxError::new(token.offset, expected, token.to_string()),
                None => self.error_at_end(&expected),
            });
        }

        let Some(token) = self.next() else {
            return Err(self.error_at_end("a string, number or boolean literal"));
        };
        let value = match token.kind {
            TokenKind::StringLiteral(value) => Literal::String(value),
            TokenKind::NumberLiteral(value) => Literal::Number(value),
            TokenKind::BooleanLiteral(value) => Literal::Bool(value),
            _ => {
                return Err(QuerySyntaxError::new(
                    token.offset,
                    "a string, number or boolean literal",
                    token.to_string(),
                ))
            }
        };

        Ok(QueryExpression::PropertyEquals { property, value })
    }

    /// Runs `parse` one nesting level deeper; `offset` is where the level opens.
    fn nested<T>(
        &mut self,
        offset: usize,
        parse: impl FnOnce(&mut Self) -> Result<T, QuerySyntaxError>,
    ) -> Result<T, QuerySyntaxError> {
        if self.depth >= self.max_depth {
            return Err(QuerySyntaxError::new(
                offset,
                "shallower nesting",
                format!("more than {} nested '(' or '!'", self.max_depth),
            ));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn consume_operator(&mut self, operator: Operator) -> bool {
        self.peek_is_operator(operator) && {
            self.index += 1;
            true
        }
    }

    fn consume_punctuation(&mut self, punctuation: Punctuation) -> bool {
        matches!(
            self.peek().map(|token| &token.kind),
            Some(TokenKind::Punctuation(kind)) if *kind == punctuation
        ) && {
            self.index += 1;
            true
        }
    }

    fn expect_punctuation(&mut self, punctuation: Punctuation) -> Result<(), QuerySyntaxError> {
        if self.consume_punctuation(punctuation) {
            return Ok(());
        }
        let expected = format!("'{}'", punctuation.as_char());
        Err(match self.peek() {
            Some(token) => QuerySyntaxError::new(token.offset, expected, token.to_string()),
            None => self.error_at_end(&expected),
        })
    }

    fn peek_is_operator(&self, operator: Operator) -> bool {
        matches!(
            self.peek().map(|token| &token.kind),
            Some(TokenKind::Operator(kind)) if *kind == operator
        )
    }

    fn peek_is_identifier(&self, keyword: &str) -> bool {
        matches!(
            self.peek().map(|token| &token.kind),
            Some(TokenKind::Identifier(name)) if name == keyword
        )
    }

    fn current_offset(&self) -> usize {
        self.peek().map_or(self.input_len, |token| token.offset)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.index).cloned()?;
        self.index += 1;
        Some(token)
    }

    fn error_at_end(&self, expected: &str) -> QuerySyntaxError {
        QuerySyntaxError::new(self.input_len, expected, "end of query")
    }
}

fn leading_literal_error(token: &Token) -> QuerySyntaxError {
    QuerySyntaxError::new(
        token.offset,
        "a property name, 'instanceof', 'scope' or '('",
        format!("literal {token}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> QueryExpression {
        parse_query(input).expect("parse")
    }

    fn id(value: &str) -> QueryExpression {
        QueryExpression::property_equals("id", value)
    }

    #[test]
    fn empty_query_is_always() {
        assert_eq!(parse(""), QueryExpression::Always);
        assert_eq!(parse("  \n\t "), QueryExpression::Always);
    }

    #[test]
    fn and_binds_tighter_than_or() {
        assert_eq!(
            parse(r#"id == "a" || id == "b" && id == "c""#),
            QueryExpression::or(id("a"), QueryExpression::and(id("b"), id("c")))
        );
    }

    #[test]
    fn binary_operators_are_left_associative() {
        assert_eq!(
            parse(r#"id == "a" || id == "b" || id == "c""#),
            QueryExpression::or(QueryExpression::or(id("a"), id("b")), id("c"))
        );
    }

    #[test]
    fn parentheses_override_precedence() {
        assert_eq!(
            parse(r#"(id == "a" || id == "b") && id == "c""#),
            QueryExpression::and(QueryExpression::or(id("a"), id("b")), id("c"))
        );
    }

    #[test]
    fn not_applies_to_the_following_unary() {
        assert_eq!(
            parse(r#"!id == "a" && !!true"#),
            QueryExpression::and(
                QueryExpression::not(id("a")),
                QueryExpression::not(QueryExpression::not(QueryExpression::Always))
            )
        );
    }

    #[test]
    fn parses_literal_kinds() {
        assert_eq!(
            parse("keySize == 4096"),
            QueryExpression::property_equals("keySize", 4096.0)
        );
        assert_eq!(
            parse("enabled == false"),
            QueryExpression::property_equals("enabled", false)
        );
        assert_eq!(parse("false"), QueryExpression::Never);
    }

    #[test]
    fn parses_instance_of() {
        assert_eq!(
            parse("instanceof com.example.UsernamePasswordCredentials"),
            QueryExpression::InstanceOf("com.example.UsernamePasswordCredentials".to_string())
        );
    }

    #[test]
    fn parses_scope_set() {
        let expected = QueryExpression::ScopeIn(
            [CredentialScope::System, CredentialScope::Global]
                .into_iter()
                .collect(),
        );
        assert_eq!(parse("scope in (SYSTEM, GLOBAL)"), expected);
        assert_eq!(parse("scope in (GLOBAL,SYSTEM,GLOBAL)"), expected);
    }

    #[test]
    fn scope_without_in_is_a_property() {
        assert_eq!(
            parse(r#"scope == "USER""#),
            QueryExpression::property_equals("scope", "USER")
        );
    }

    #[test]
    fn rejects_leading_literals() {
        let error = parse_query(r#""bob" == username"#).expect_err("leading literal");
        assert_eq!(error.offset, 0);
        assert!(parse_query("true == enabled").is_err());
        assert!(parse_query("42 == keySize").is_err());
    }

    #[test]
    fn rejects_literal_after_operator_without_comparison() {
        let error = parse_query(r#"id == "id-1" || "id-2""#).expect_err("dangling literal");
        assert_eq!(error.offset, 16);
    }

    #[test]
    fn rejects_juxtaposed_literals() {
        let error = parse_query("id == \"a\"\n\"b\"").expect_err("juxtaposed");
        assert_eq!(error.offset, 10);
        assert_eq!(error.expected, "'&&', '||' or end of query");
    }

    #[test]
    fn rejects_malformed_number_through_syntax_error() {
        let error = parse_query("id == 4foo").expect_err("malformed number");
        assert_eq!(error.offset, 6);
        assert!(error.found.contains("4foo"));
    }

    #[test]
    fn rejects_unbalanced_parentheses() {
        let error = parse_query(r#"(id == "a""#).expect_err("missing close");
        assert_eq!(error.expected, "')'");
        assert_eq!(error.found, "end of query");
        assert!(parse_query(r#"id == "a")"#).is_err());
        assert!(parse_query("()").is_err());
    }

    #[test]
    fn rejects_identifier_comparison_targets() {
        let error = parse_query("username == bob").expect_err("identifier target");
        assert_eq!(error.expected, "a string, number or boolean literal");
        assert!(parse_query("username").is_err());
    }

    #[test]
    fn rejects_unknown_scope_names() {
        assert!(parse_query("scope in (global)").is_err());
        assert!(parse_query("scope in ()").is_err());
        assert!(parse_query("scope in (GLOBAL").is_err());
    }

    #[test]
    fn rejects_dangling_operators() {
        assert!(parse_query(r#"id == "a" &&"#).is_err());
        assert!(parse_query("!").is_err());
        assert!(parse_query("|| true").is_err());
        assert!(parse_query("instanceof").is_err());
    }

    #[test]
    fn rejects_nesting_past_the_limit() {
        let deep = format!("{}true{}", "(".repeat(1000), ")".repeat(1000));
        let error = parse_query(&deep).expect_err("too deep");
        assert_eq!(error.expected, "shallower nesting");
        assert_eq!(error.offset, DEFAULT_MAX_QUERY_DEPTH);

        let negations = format!("{}true", "!".repeat(4092));
        let error = parse_query(&negations).expect_err("too deep");
        assert_eq!(error.expected, "shallower nesting");
    }

    #[test]
    fn accepts_nesting_up_to_the_limit() {
        let limit = DEFAULT_MAX_QUERY_DEPTH;
        let parens = format!("{}true{}", "(".repeat(limit), ")".repeat(limit));
        assert_eq!(parse(&parens), QueryExpression::Always);

        let mixed = format!("{}true{}", "!(".repeat(limit / 2), ")".repeat(limit / 2));
        assert!(parse_query(&mixed).is_ok());
        let one_more = format!("!{mixed}");
        assert!(parse_query(&one_more).is_err());
    }

    #[test]
    fn custom_depth_limit() {
        assert!(parse_query_with_max_depth("!(true)", 2).is_ok());
        let error = parse_query_with_max_depth("!!(true)", 2).expect_err("too deep");
        assert_eq!(error.offset, 2);
        assert!(parse_query_with_max_depth("true || false && true", 0).is_ok());
    }

    #[test]
    fn long_flat_chains_are_not_nesting() {
        let chain = vec!["true"; 500].join(" || ");
        assert!(chain.len() < 4096);
        assert!(parse_query(&chain).is_ok());
    }

    #[test]
    fn parses_pre_tokenized_input() {
        let tokens = tokenize("enabled == true").expect("tokenize");
        assert_eq!(
            parse_tokens(tokens).expect("parse"),
            QueryExpression::property_equals("enabled", true)
        );
        assert_eq!(parse_tokens(Vec::new()).expect("parse"), QueryExpression::Always);
    }
}
