//! OAuth scope canonicalization
//!
//! A scope string is a space-delimited list of tokens (RFC 6749 §3.3). Two
//! scope strings naming the same set of tokens must land in the same storage
//! slot, so every `Scope` holds the canonical form: tokens deduplicated,
//! sorted byte-wise and joined with single spaces.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A validated, canonical OAuth scope.
///
/// The empty scope is a distinct value used when a request carries no scope
/// at all. It can only be obtained through [`Scope::empty`] or by decoding a
/// persisted empty string; [`Scope::parse`] rejects `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Scope(String);

impl Scope {
    /// Validate `raw` against the scope grammar and canonicalize it.
    pub fn parse(raw: &str) -> Result<Self> {
        if !is_valid(raw) {
            return Err(Error::InvalidScope(raw.to_owned()));
        }
        let mut tokens: Vec<&str> = raw.split(' ').collect();
        tokens.sort_unstable();
        tokens.dedup();
        Ok(Self(tokens.join(" ")))
    }

    /// The scope of a request that asked for no scope.
    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical tokens in sorted order.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.0.split(' ').filter(|t| !t.is_empty())
    }

    /// Whether the scope grants `token`.
    pub fn contains(&self, token: &str) -> bool {
        self.tokens().any(|t| t == token)
    }
}

/// `scope-token = 1*( %x21 / %x23-5B / %x5D-7E )`, separated by single spaces.
fn is_valid(raw: &str) -> bool {
    !raw.is_empty()
        && raw
            .split(' ')
            .all(|token| !token.is_empty() && token.bytes().all(is_scope_byte))
}

fn is_scope_byte(b: u8) -> bool {
    matches!(b, 0x21 | 0x23..=0x5B | 0x5D..=0x7E)
}

impl FromStr for Scope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Decoding from storage: an empty string is the empty scope, anything else
/// must satisfy the grammar.
impl TryFrom<String> for Scope {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        if value.is_empty() {
            Ok(Self::empty())
        } else {
            Self::parse(&value)
        }
    }
}

impl From<Scope> for String {
    fn from(scope: Scope) -> Self {
        scope.0
    }
}

impl AsRef<str> for Scope {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_form_sorts_and_dedups() {
        let scope = Scope::parse("write read write admin").unwrap();
        assert_eq!(scope.as_str(), "admin read write");
    }

    #[test]
    fn canonicalization_is_idempotent() {
        let once = Scope::parse("b a c a").unwrap();
        let twice = Scope::parse(once.as_str()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn permutations_with_duplicates_collide() {
        let inputs = [
            "user:profile user:inference openid",
            "openid user:inference user:profile",
            "user:inference openid user:profile openid",
            "user:profile user:profile user:inference openid user:inference",
        ];
        let expected = Scope::parse(inputs[0]).unwrap();
        for input in &inputs[1..] {
            assert_eq!(Scope::parse(input).unwrap(), expected, "input: {input}");
        }
    }

    #[test]
    fn sort_is_bytewise() {
        // Uppercase sorts before lowercase, punctuation by code point
        let scope = Scope::parse("b B a ! ~").unwrap();
        assert_eq!(scope.as_str(), "! B a b ~");
    }

    #[test]
    fn rejects_empty_string() {
        assert!(matches!(Scope::parse(""), Err(Error::InvalidScope(_))));
    }

    #[test]
    fn rejects_double_space() {
        assert!(matches!(
            Scope::parse("read  write"),
            Err(Error::InvalidScope(_))
        ));
    }

    #[test]
    fn rejects_leading_and_trailing_space() {
        assert!(Scope::parse(" read").is_err());
        assert!(Scope::parse("read ").is_err());
    }

    #[test]
    fn rejects_double_quote_and_backslash() {
        assert!(Scope::parse("read \"write\"").is_err());
        assert!(Scope::parse("read\\write").is_err());
    }

    #[test]
    fn rejects_non_ascii_and_control_characters() {
        assert!(Scope::parse("lecture\u{e9}").is_err());
        assert!(Scope::parse("read\twrite").is_err());
        assert!(Scope::parse("read\nwrite").is_err());
    }

    #[test]
    fn accepts_full_allowed_range() {
        let raw = "!#$%&'()*+,-./0123456789:;<=>?@AZ[]^_`az{|}~";
        let scope = Scope::parse(raw).unwrap();
        assert_eq!(scope.as_str(), raw);
    }

    #[test]
    fn empty_scope_has_no_tokens() {
        let scope = Scope::empty();
        assert!(scope.is_empty());
        assert_eq!(scope.tokens().count(), 0);
        assert!(!scope.contains(""));
    }

    #[test]
    fn contains_checks_tokens() {
        let scope = Scope::parse("read write").unwrap();
        assert!(scope.contains("read"));
        assert!(!scope.contains("rea"));
        assert_eq!(scope.tokens().collect::<Vec<_>>(), vec!["read", "write"]);
    }

    #[test]
    fn deserializes_empty_string_as_empty_scope() {
        let scope: Scope = serde_json::from_str("\"\"").unwrap();
        assert!(scope.is_empty());
    }

    #[test]
    fn deserialization_canonicalizes_and_validates() {
        let scope: Scope = serde_json::from_str("\"write read\"").unwrap();
        assert_eq!(scope.as_str(), "read write");

        let bad = serde_json::from_str::<Scope>("\"read  write\"");
        assert!(bad.is_err());
    }

    #[test]
    fn from_str_matches_parse() {
        let scope: Scope = "write read".parse().unwrap();
        assert_eq!(scope.to_string(), "read write");
    }
}
