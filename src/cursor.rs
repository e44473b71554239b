//! Opaque, URL-safe cursor tokens.
//!
//! A cursor is the base64url encoding of each sort-key value, joined with
//! `.`. Values whose type cannot be told apart from their JSON text carry a
//! type tag (`(date)`, `(json)`) inside the encoded token. When fingerprinting
//! is enabled the ordering digest is appended after a `~`.

use std::fmt;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::Error, ordering::KeysetTuple, value::Value};

const VALUE_DELIMITER: &str = ".";
const FINGERPRINT_DELIMITER: char = '~';
const DATE_TAG: &str = "date";
const JSON_TAG: &str = "json";

/// Opaque pagination token. The empty cursor means "no boundary".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Cursor {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Cursor {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for Cursor {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct CursorCodec {
    fingerprint: Option<String>,
}

impl CursorCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursors carry `fingerprint` and are rejected when it does not match.
    pub fn fingerprinted(fingerprint: impl Into<String>) -> Self {
        Self {
            fingerprint: Some(fingerprint.into()),
        }
    }

    pub fn encode(&self, tuple: Option<&KeysetTuple>) -> Cursor {
        let Some(tuple) = tuple else {
            return Cursor::empty();
        };

        let mut out = tuple
            .values()
            .iter()
            .map(|value| URL_SAFE_NO_PAD.encode(serialize_value(value)))
            .collect::<Vec<_>>()
            .join(VALUE_DELIMITER);

        if let Some(fingerprint) = &self.fingerprint {
            out.push(FINGERPRINT_DELIMITER);
            out.push_str(fingerprint);
        }

        Cursor(out)
    }

    pub fn decode(&self, cursor: &str, arity: usize) -> Result<Option<KeysetTuple>, Error> {
        if cursor.is_empty() {
            return Ok(None);
        }

        let body = match (&self.fingerprint, cursor.split_once(FINGERPRINT_DELIMITER)) {
            (Some(expected), Some((body, found))) => {
                if found != expected {
                    return Err(Error::OrderingMismatch {
                        expected: expected.clone(),
                        found: found.to_string(),
                    });
                }
                body
            }
            (Some(expected), None) => {
                return Err(Error::OrderingMismatch {
                    expected: expected.clone(),
                    found: "none".into(),
                });
            }
            (None, Some(_)) => {
                return Err(Error::invalid_cursor("unexpected ordering fingerprint"));
            }
            (None, None) => cursor,
        };

        let tokens: Vec<&str> = body.split(VALUE_DELIMITER).collect();
        if tokens.len() != arity {
            return Err(Error::invalid_cursor(format!(
                "expected {} values, found {}",
                arity,
                tokens.len()
            )));
        }

        tokens
            .into_iter()
            .map(decode_token)
            .collect::<Result<Vec<_>, _>>()
            .map(|values| Some(KeysetTuple(values)))
    }
}

fn serialize_value(value: &Value) -> String {
    match value {
        Value::Date(date) => format!(
            "({}){}",
            DATE_TAG,
            date.to_rfc3339_opts(SecondsFormat::AutoSi, true)
        ),
        Value::Json(json) => format!("({}){}", JSON_TAG, json),
        scalar => scalar.to_json().to_string(),
    }
}

fn decode_token(token: &str) -> Result<Value, Error> {
    if token.is_empty() {
        return Err(Error::invalid_cursor("empty value token"));
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|e| Error::invalid_cursor(e.to_string()))?;
    let text = String::from_utf8(bytes).map_err(|e| Error::invalid_cursor(e.to_string()))?;

    let Some(tagged) = text.strip_prefix('(') else {
        let json: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| Error::invalid_cursor(e.to_string()))?;
        return match json {
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                Err(Error::invalid_cursor("untagged value must be a scalar"))
            }
            scalar => Ok(Value::from_json(&scalar)),
        };
    };

    let (tag, payload) = tagged
        .split_once(')')
        .ok_or_else(|| Error::invalid_cursor("unterminated type tag"))?;

    match tag {
        DATE_TAG => DateTime::parse_from_rfc3339(payload)
            .map(|d| Value::Date(d.with_timezone(&Utc)))
            .map_err(|e| Error::invalid_cursor(e.to_string())),
        JSON_TAG => serde_json::from_str(payload)
            .map(Value::Json)
            .map_err(|e| Error::invalid_cursor(e.to_string())),
        other => Err(Error::invalid_cursor(format!("unknown type tag `{}`", other))),
    }
}
