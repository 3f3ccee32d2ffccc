//! core::types
//!
//! Strongly-typed newtypes used throughout the crate: validated branch names,
//! object ids, ref names, and timestamps. Keeping these as distinct types
//! (rather than passing `String` everywhere) pushes validation to the
//! boundary where a value is first constructed, instead of scattering
//! ad-hoc checks through every consumer.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when constructing one of the typed values in this module.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    /// An object id string was not a valid hex OID.
    #[error("invalid object id: {0}")]
    InvalidOid(String),

    /// A ref name violated Git's ref-naming rules.
    #[error("invalid ref name: {0}")]
    InvalidRefName(String),

    /// A branch short name violated Git's ref-naming rules.
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),
}

fn validate_refname_component(s: &str) -> Result<(), String> {
    if s.is_empty() {
        return Err("must not be empty".to_string());
    }
    if s == "." || s == ".." {
        return Err("must not be '.' or '..'".to_string());
    }
    if s.starts_with('.') {
        return Err("must not start with '.'".to_string());
    }
    if s.ends_with(".lock") {
        return Err("must not end with '.lock'".to_string());
    }
    if s.ends_with('/') || s.starts_with('/') {
        return Err("must not start or end with '/'".to_string());
    }
    if s.contains("//") {
        return Err("must not contain '//'".to_string());
    }
    if s.contains("..") {
        return Err("must not contain '..'".to_string());
    }
    if s.contains("@{") {
        return Err("must not contain '@{'".to_string());
    }
    if s == "@" {
        return Err("must not be '@'".to_string());
    }
    if s.contains('\\') {
        return Err("must not contain '\\'".to_string());
    }
    for c in s.chars() {
        if c.is_control() {
            return Err("must not contain control characters".to_string());
        }
        if matches!(c, ' ' | '~' | '^' | ':' | '?' | '*' | '[') {
            return Err(format!("must not contain '{}'", c));
        }
    }
    Ok(())
}

/// A validated branch short name (e.g. `feature/x`, `main`).
///
/// Enforces the subset of `git check-ref-format` rules that apply to a
/// branch's local name (not a fully-qualified ref).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Validate and construct a `BranchName`.
    pub fn new(s: impl Into<String>) -> Result<Self, TypeError> {
        let s = s.into();
        for component in s.split('/') {
            validate_refname_component(component)
                .map_err(|msg| TypeError::InvalidBranchName(format!("{}: {}", s, msg)))?;
        }
        Ok(Self(s))
    }

    /// Borrow as `&str`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner `String`.
    pub fn into_string(self) -> String {
        self.0
    }

    /// The fully-qualified ref for this branch (`refs/heads/<name>`).
    pub fn full_ref(&self) -> String {
        format!("refs/heads/{}", self.0)
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BranchName> for String {
    fn from(value: BranchName) -> Self {
        value.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A validated, fully-qualified Git object id (SHA-1 or SHA-256 hex).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Validate and construct an `Oid` from a hex string.
    ///
    /// Accepts 40-character (SHA-1) or 64-character (SHA-256) lowercase hex.
    /// Uppercase hex is normalized to lowercase.
    pub fn new(s: impl Into<String>) -> Result<Self, TypeError> {
        let s = s.into();
        if s.len() != 40 && s.len() != 64 {
            return Err(TypeError::InvalidOid(s));
        }
        if !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(s));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    /// The all-zeros OID (used as the CAS "ref does not exist" sentinel).
    pub fn zero() -> Self {
        Self("0".repeat(40))
    }

    /// Whether this is the all-zeros OID.
    pub fn is_zero(&self) -> bool {
        self.0.chars().all(|c| c == '0')
    }

    /// Borrow as `&str`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A shortened, display-friendly prefix of the OID.
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Oid> for String {
    fn from(value: Oid) -> Self {
        value.0
    }
}

/// A validated, fully-qualified ref name (e.g. `refs/heads/main`, `refs/tags/v1.0.0`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RefName(String);

impl RefName {
    /// Validate and construct a `RefName`. Must start with `refs/`.
    pub fn new(s: impl Into<String>) -> Result<Self, TypeError> {
        let s = s.into();
        if !s.starts_with("refs/") {
            return Err(TypeError::InvalidRefName(format!(
                "{}: must start with 'refs/'",
                s
            )));
        }
        for component in s.split('/') {
            validate_refname_component(component)
                .map_err(|msg| TypeError::InvalidRefName(format!("{}: {}", s, msg)))?;
        }
        Ok(Self(s))
    }

    /// Build the branch ref for a given branch name (`refs/heads/<name>`).
    pub fn for_branch(name: &BranchName) -> Self {
        Self(name.full_ref())
    }

    /// Build the tag ref for a given tag name (`refs/tags/<name>`).
    pub fn for_tag(name: &str) -> Result<Self, TypeError> {
        Self::new(format!("refs/tags/{}", name))
    }

    /// Borrow as `&str`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is a `refs/heads/...` ref.
    pub fn is_branch_ref(&self) -> bool {
        self.0.starts_with("refs/heads/")
    }

    /// Whether this is a `refs/tags/...` ref.
    pub fn is_tag_ref(&self) -> bool {
        self.0.starts_with("refs/tags/")
    }

    /// Strip a literal prefix, returning the remainder if it matched.
    pub fn strip_prefix(&self, prefix: &str) -> Option<&str> {
        self.0.strip_prefix(prefix)
    }
}

impl fmt::Display for RefName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for RefName {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RefName> for String {
    fn from(value: RefName) -> Self {
        value.0
    }
}

/// A UTC timestamp with RFC3339 `Display`, used for journal and lock bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UtcTimestamp(chrono::DateTime<chrono::Utc>);

impl UtcTimestamp {
    /// Wrap an existing `DateTime<Utc>`.
    pub fn new(dt: chrono::DateTime<chrono::Utc>) -> Self {
        Self(dt)
    }

    /// The wrapped `DateTime<Utc>`.
    pub fn inner(&self) -> chrono::DateTime<chrono::Utc> {
        self.0
    }

    /// The current UTC time.
    pub fn now() -> Self {
        Self(chrono::Utc::now())
    }
}

impl fmt::Display for UtcTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod branch_name {
        use super::*;

        #[test]
        fn accepts_simple_names() {
            assert!(BranchName::new("main").is_ok());
            assert!(BranchName::new("feature/login").is_ok());
            assert!(BranchName::new("release/1.0.0").is_ok());
        }

        #[test]
        fn rejects_empty() {
            assert!(BranchName::new("").is_err());
        }

        #[test]
        fn rejects_dot_components() {
            assert!(BranchName::new(".hidden").is_err());
            assert!(BranchName::new("a/../b").is_err());
            assert!(BranchName::new("a/.").is_err());
        }

        #[test]
        fn rejects_lock_suffix() {
            assert!(BranchName::new("feature.lock").is_err());
        }

        #[test]
        fn rejects_special_chars() {
            assert!(BranchName::new("a b").is_err());
            assert!(BranchName::new("a~b").is_err());
            assert!(BranchName::new("a^b").is_err());
            assert!(BranchName::new("a:b").is_err());
            assert!(BranchName::new("a?b").is_err());
            assert!(BranchName::new("a*b").is_err());
            assert!(BranchName::new("a[b").is_err());
            assert!(BranchName::new("a\\b").is_err());
        }

        #[test]
        fn rejects_at_brace() {
            assert!(BranchName::new("a@{b").is_err());
            assert!(BranchName::new("@").is_err());
        }

        #[test]
        fn full_ref_formats_correctly() {
            let name = BranchName::new("feature/x").unwrap();
            assert_eq!(name.full_ref(), "refs/heads/feature/x");
        }

        #[test]
        fn display_matches_as_str() {
            let name = BranchName::new("main").unwrap();
            assert_eq!(format!("{}", name), "main");
        }

        #[test]
        fn serde_roundtrip() {
            let name = BranchName::new("feature/x").unwrap();
            let json = serde_json::to_string(&name).unwrap();
            assert_eq!(json, "\"feature/x\"");
            let back: BranchName = serde_json::from_str(&json).unwrap();
            assert_eq!(back, name);
        }

        #[test]
        fn serde_rejects_invalid() {
            let result: Result<BranchName, _> = serde_json::from_str("\"a..b\"");
            assert!(result.is_err());
        }
    }

    mod oid {
        use super::*;

        #[test]
        fn accepts_valid_sha1() {
            let s = "a".repeat(40);
            assert!(Oid::new(s).is_ok());
        }

        #[test]
        fn accepts_valid_sha256() {
            let s = "a".repeat(64);
            assert!(Oid::new(s).is_ok());
        }

        #[test]
        fn normalizes_uppercase() {
            let s = "A".repeat(40);
            let oid = Oid::new(s).unwrap();
            assert_eq!(oid.as_str(), "a".repeat(40));
        }

        #[test]
        fn rejects_wrong_length() {
            assert!(Oid::new("abc123").is_err());
        }

        #[test]
        fn rejects_non_hex() {
            let s = "g".repeat(40);
            assert!(Oid::new(s).is_err());
        }

        #[test]
        fn zero_is_all_zeros() {
            let z = Oid::zero();
            assert!(z.is_zero());
            assert_eq!(z.as_str(), "0".repeat(40));
        }

        #[test]
        fn short_truncates() {
            let s = "abcdef0123456789abcdef0123456789abcdef01".to_string();
            let oid = Oid::new(&s[..40]).unwrap();
            assert_eq!(oid.short(7), &s[..7]);
        }

        #[test]
        fn short_caps_at_full_length() {
            let s = "a".repeat(40);
            let oid = Oid::new(s.clone()).unwrap();
            assert_eq!(oid.short(1000), s);
        }
    }

    mod ref_name {
        use super::*;

        #[test]
        fn accepts_heads_and_tags() {
            assert!(RefName::new("refs/heads/main").is_ok());
            assert!(RefName::new("refs/tags/v1.0.0").is_ok());
        }

        #[test]
        fn rejects_missing_refs_prefix() {
            assert!(RefName::new("heads/main").is_err());
        }

        #[test]
        fn for_branch_builds_heads_ref() {
            let name = BranchName::new("feature/x").unwrap();
            let refname = RefName::for_branch(&name);
            assert_eq!(refname.as_str(), "refs/heads/feature/x");
            assert!(refname.is_branch_ref());
            assert!(!refname.is_tag_ref());
        }

        #[test]
        fn for_tag_builds_tags_ref() {
            let refname = RefName::for_tag("v1.0.0").unwrap();
            assert_eq!(refname.as_str(), "refs/tags/v1.0.0");
            assert!(refname.is_tag_ref());
        }

        #[test]
        fn strip_prefix_returns_remainder() {
            let refname = RefName::new("refs/heads/feature/x").unwrap();
            assert_eq!(refname.strip_prefix("refs/heads/"), Some("feature/x"));
            assert_eq!(refname.strip_prefix("refs/tags/"), None);
        }
    }

    mod utc_timestamp {
        use super::*;

        #[test]
        fn display_is_rfc3339() {
            let dt = chrono::DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
                .unwrap()
                .with_timezone(&chrono::Utc);
            let ts = UtcTimestamp::new(dt);
            assert_eq!(format!("{}", ts), "2024-01-01T00:00:00+00:00");
        }

        #[test]
        fn serde_roundtrip() {
            let dt = chrono::DateTime::parse_from_rfc3339("2024-06-15T12:30:00Z")
                .unwrap()
                .with_timezone(&chrono::Utc);
            let ts = UtcTimestamp::new(dt);
            let json = serde_json::to_string(&ts).unwrap();
            let back: UtcTimestamp = serde_json::from_str(&json).unwrap();
            assert_eq!(back, ts);
        }
    }
}
