//! The credential capability the query evaluator runs against.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Visibility level attached to a credential.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CredentialScope {
    /// Available to everything in the store and its children.
    Global,
    /// Available only to the system itself.
    System,
    /// Available only to the owning user.
    User,
    /// Available only on the node the credential is attached to.
    Node,
}

impl CredentialScope {
    pub const ALL: [CredentialScope; 4] = [Self::Global, Self::System, Self::User, Self::Node];

    /// Returns the canonical constant name used in queries.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Global => "GLOBAL",
            Self::System => "SYSTEM",
            Self::User => "USER",
            Self::Node => "NODE",
        }
    }

    /// Looks up a scope by its exact constant name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|scope| scope.as_str() == name)
    }
}

impl fmt::Display for CredentialScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CredentialScope {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::from_name(value).ok_or_else(|| format!("unknown credential scope: {value}"))
    }
}

/// A property value exposed by a credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Number(f64),
    String(String),
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<u32> for PropertyValue {
    fn from(value: u32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Failure reported by a credential while resolving a property.
///
/// The evaluator treats every lookup failure as an absent property.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to read property '{property}': {reason}")]
pub struct PropertyLookupError {
    pub property: String,
    pub reason: String,
}

impl PropertyLookupError {
    pub fn new(property: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            reason: reason.into(),
        }
    }
}

/// Capabilities a credential exposes to query evaluation.
pub trait CredentialView {
    /// The credential identifier.
    fn id(&self) -> &str;

    /// The visibility scope.
    fn scope(&self) -> CredentialScope;

    /// Returns true if the credential's type, or any of its supertypes,
    /// carries the given fully qualified name.
    fn is_instance_of(&self, type_name: &str) -> bool;

    /// Resolves a named property such as `username`.
    ///
    /// `Ok(None)` means the credential has no such property.
    fn property(&self, name: &str) -> Result<Option<PropertyValue>, PropertyLookupError>;
}

impl<T: CredentialView + ?Sized> CredentialView for &T {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn scope(&self) -> CredentialScope {
        (**self).scope()
    }

    fn is_instance_of(&self, type_name: &str) -> bool {
        (**self).is_instance_of(type_name)
    }

    fn property(&self, name: &str) -> Result<Option<PropertyValue>, PropertyLookupError> {
        (**self).property(name)
    }
}

impl<T: CredentialView + ?Sized> CredentialView for Box<T> {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn scope(&self) -> CredentialScope {
        (**self).scope()
    }

    fn is_instance_of(&self, type_name: &str) -> bool {
        (**self).is_instance_of(type_name)
    }

    fn property(&self, name: &str) -> Result<Option<PropertyValue>, PropertyLookupError> {
        (**self).property(name)
    }
}

/// A credential held as a plain property bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub id: String,
    pub scope: CredentialScope,
    /// Type names this credential is compatible with, most specific first.
    #[serde(default)]
    pub type_names: Vec<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
}

impl CredentialRecord {
    pub fn new(id: impl Into<String>, scope: CredentialScope) -> Self {
        Self {
            id: id.into(),
            scope,
            type_names: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_names.push(type_name.into());
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }
}

impl CredentialView for CredentialRecord {
    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn scope(&self) -> CredentialScope {
        self.scope
    }

    fn is_instance_of(&self, type_name: &str) -> bool {
        self.type_names.iter().any(|candidate| candidate == type_name)
    }

    fn property(&self, name: &str) -> Result<Option<PropertyValue>, PropertyLookupError> {
        Ok(self.properties.get(name).cloned())
    }
}
