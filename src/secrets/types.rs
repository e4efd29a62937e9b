//! Secure types for handling credential material.
//!
//! Secret values travel through the rotator, the publisher and every store
//! adapter. Wrapping them keeps them out of `Debug` output, structured log
//! fields and serialized status documents.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A string wrapper that redacts its contents in Debug, Display, and serialization.
///
/// - Debug output shows `SecretString([REDACTED])`
/// - Display output shows `[REDACTED]`
/// - Serialization outputs `"[REDACTED]"`; deserialization accepts real values
/// - Memory is zeroed when dropped
///
/// The value is only reachable through [`SecretString::expose_secret`].
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl SecretString {
    /// Creates a new SecretString from a string value.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Exposes the underlying value. Never log the result.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    /// Returns the length of the secret without exposing the value.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the secret is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for SecretString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str("[REDACTED]")
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretString)
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString([REDACTED])")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for SecretString {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for SecretString {}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Field map of a secret record. Ordered so updates are written deterministically.
pub type SecretFields = BTreeMap<String, SecretString>;

/// A key-value secret record as seen by the publisher.
///
/// `writable == false` means the backend has marked the record immutable and
/// no field may be changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRecord {
    /// Field name to value
    pub fields: SecretFields,

    /// Whether the record may be updated
    pub writable: bool,
}

impl SecretRecord {
    /// Create a writable record with the given fields.
    pub fn new(fields: SecretFields) -> Self {
        Self { fields, writable: true }
    }

    /// Create an empty writable record.
    pub fn empty() -> Self {
        Self::new(SecretFields::new())
    }

    /// Mark the record as write-protected.
    pub fn immutable(mut self) -> Self {
        self.writable = false;
        self
    }

    /// Add or replace a field (builder style).
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<SecretString>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Look up a field value.
    pub fn field(&self, name: &str) -> Option<&SecretString> {
        self.fields.get(name)
    }
}
