//! The credential query language.
//!
//! This module provides the boolean matcher language, including:
//! - Expression types (always/never, NOT, AND, OR, instanceof, property and scope tests)
//! - Tokenization and recursive-descent parsing with positioned syntax errors
//! - Evaluation against any [`CredentialView`](crate::CredentialView)
//! - A canonical describer whose output the parser accepts

mod describe;
mod evaluate;
mod expression;
mod lexer;
mod matcher;
pub mod matchers;
mod parser;


// Re-export public types
pub use describe::describe_query;
pub use evaluate::{evaluate, filter};
pub use expression::{Literal, QueryExpression};
pub use lexer::{tokenize, LexError, LexErrorKind, Operator, Punctuation, Token, TokenKind};
pub use matcher::CredentialsMatcher;
pub use parser::{
    parse_query, parse_query_with_max_depth, parse_tokens, QueryParser, QuerySyntaxError,
};
