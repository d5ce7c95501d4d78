//! Field-mapping validation shared by the token value objects
//!
//! Records arrive from storage backends as loosely typed maps. Every
//! accessor here either returns a validated value or the precise
//! `MissingField` / `InvalidField` error for the offending key.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::scope::Scope;

/// A record as read from a storage backend, keyed by persisted field name.
pub type Fields = serde_json::Map<String, Value>;

pub(crate) fn required<'a>(fields: &'a Fields, key: &'static str) -> Result<&'a Value> {
    fields.get(key).ok_or(Error::MissingField(key))
}

pub(crate) fn non_empty_string(fields: &Fields, key: &'static str) -> Result<String> {
    match required(fields, key)? {
        Value::String(s) => non_empty(key, s.clone()),
        _ => Err(Error::invalid_field(key, "needs to be a non-empty string")),
    }
}

pub(crate) fn non_empty(key: &'static str, value: String) -> Result<String> {
    if value.is_empty() {
        return Err(Error::invalid_field(key, "needs to be a non-empty string"));
    }
    Ok(value)
}

pub(crate) fn scope(fields: &Fields) -> Result<Scope> {
    match required(fields, "scope")? {
        Value::String(s) => Scope::try_from(s.clone()),
        _ => Err(Error::invalid_field("scope", "needs to be a string")),
    }
}

/// Integers may be stored as JSON numbers or as numeric strings (SQL
/// backends commonly hand back text columns).
fn integer(fields: &Fields, key: &'static str) -> Result<Option<u64>> {
    let parsed = match required(fields, key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse::<u64>().ok(),
        _ => None,
    };
    Ok(parsed)
}

pub(crate) fn positive_integer(fields: &Fields, key: &'static str) -> Result<u64> {
    match integer(fields, key)? {
        Some(n) if n > 0 => Ok(n),
        _ => Err(Error::invalid_field(key, "should be a positive integer")),
    }
}

pub(crate) fn non_negative_integer(fields: &Fields, key: &'static str) -> Result<u64> {
    integer(fields, key)?
        .ok_or_else(|| Error::invalid_field(key, "should be a non-negative integer"))
}

pub(crate) fn positive(key: &'static str, value: u64) -> Result<u64> {
    if value == 0 {
        return Err(Error::invalid_field(key, "should be a positive integer"));
    }
    Ok(value)
}

/// Route serde deserialization through `from_fields` so persisted records are
/// validated exactly like freshly constructed ones.
macro_rules! deserialize_from_fields {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl<'de> serde::Deserialize<'de> for $ty {
                fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
                where
                    D: serde::Deserializer<'de>,
                {
                    let fields = <$crate::fields::Fields as serde::Deserialize>::deserialize(deserializer)?;
                    Self::from_fields(&fields).map_err(serde::de::Error::custom)
                }
            }
        )+
    };
}

pub(crate) use deserialize_from_fields;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test fixture must be an object"),
        }
    }

    #[test]
    fn missing_key_names_the_field() {
        let f = fields(json!({}));
        assert!(matches!(
            non_empty_string(&f, "user_id"),
            Err(Error::MissingField("user_id"))
        ));
    }

    #[test]
    fn empty_string_is_invalid() {
        let f = fields(json!({ "user_id": "" }));
        assert!(matches!(
            non_empty_string(&f, "user_id"),
            Err(Error::InvalidField { field: "user_id", .. })
        ));
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let f = fields(json!({ "issue_time": "1700000000", "expires_in": "0" }));
        assert_eq!(positive_integer(&f, "issue_time").unwrap(), 1_700_000_000);
        assert_eq!(non_negative_integer(&f, "expires_in").unwrap(), 0);
    }

    #[test]
    fn zero_and_negative_issue_time_rejected() {
        let zero = fields(json!({ "issue_time": 0 }));
        assert!(positive_integer(&zero, "issue_time").is_err());

        let negative = fields(json!({ "issue_time": -5 }));
        assert!(positive_integer(&negative, "issue_time").is_err());
    }

    #[test]
    fn fractional_and_boolean_integers_rejected() {
        let f = fields(json!({ "expires_in": 1.5, "flag": true }));
        assert!(non_negative_integer(&f, "expires_in").is_err());
        assert!(non_negative_integer(&f, "flag").is_err());
    }

    #[test]
    fn scope_must_be_string() {
        let f = fields(json!({ "scope": 42 }));
        assert!(matches!(
            scope(&f),
            Err(Error::InvalidField { field: "scope", .. })
        ));
    }
}
