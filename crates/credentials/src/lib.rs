//! Credential matching and secret encoding.
//!
//! This crate provides the two self-contained subsystems a credentials store
//! leans on:
//! - A small boolean query language for selecting credentials by id, scope,
//!   type and named properties, with a canonical, re-parseable text form
//! - A secret codec that wraps encrypted payloads in a recognizable envelope
//!   while still reading older base64 encodings

pub mod config;
pub mod credential;
pub mod error;
pub mod query;
pub mod secret;

// Re-export main types
pub use config::{load_config, write_config, CredentialsConfig, QueryConfig, SecretsConfig};
pub use credential::{
    CredentialRecord, CredentialScope, CredentialView, PropertyLookupError, PropertyValue,
};
pub use error::{CredentialsError, Result};
pub use query::{
    describe_query, filter, parse_query, CredentialsMatcher, Literal, QueryExpression,
    QuerySyntaxError,
};
pub use secret::{
    AesGcmConfidentialityService, Base64Flavor, ConfidentialityError, ConfidentialityService,
    DecodeError, MasterKey, Secret, SecretBytes, SecretCodec,
};
