//! WBI request signing.
//!
//! The signature (`w_rid`) is the MD5 hex digest of the canonical query
//! string followed directly by the mixin key. Canonical form:
//! null values dropped, keys sorted by byte order, keys and values
//! percent-encoded, and `!'()*` stripped from string values before encoding.

use std::collections::BTreeMap;
use std::fmt;

use md5::{Digest, Md5};

use crate::error::WbiError;

/// Name of the signature parameter appended by the signer.
pub const W_RID: &str = "w_rid";
/// Name of the timestamp parameter every signed call carries.
pub const WTS: &str = "wts";

/// A scalar parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Null,
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl ParamValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Parses a CLI style value: integers and booleans keep their type,
    /// everything else is a string.
    pub fn infer(raw: &str) -> Self {
        if let Ok(n) = raw.parse::<i64>() {
            return Self::Int(n);
        }
        match raw {
            "true" => Self::Bool(true),
            "false" => Self::Bool(false),
            _ => Self::Str(raw.to_string()),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Str(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{n}"),
            // `-0.0` is written as `0`, matching the browser client.
            Self::Float(x) if *x == 0.0 => f.write_str("0"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        Self::Int(value.into())
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Parameters of a request to be signed, kept in canonical key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignatureParams {
    inner: BTreeMap<String, ParamValue>,
}

impl SignatureParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> &mut Self {
        self.inner.insert(key.into(), value.into());
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Adds the `wts` unix-seconds timestamp covered by the signature.
    pub fn with_timestamp(self, unix_secs: i64) -> Self {
        self.with(WTS, unix_secs)
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.inner.get(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Non-null pairs in key order, ready to hand to an HTTP client.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// The canonical string the signature is computed over.
    pub fn canonical_query(&self) -> String {
        self.iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| {
                let value = match v {
                    ParamValue::Str(s) => encode_component(s, true),
                    other => encode_component(&other.to_string(), false),
                };
                format!("{}={}", encode_component(k, false), value)
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl<K, V> FromIterator<(K, V)> for SignatureParams
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

/// Percent-encodes like a browser's `encodeURIComponent`. With `strip`
/// set, the characters `!'()*` are removed instead of kept.
fn encode_component(s: &str, strip: bool) -> String {
    let mut encoded = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' | '~' => encoded.push(c),
            '!' | '\'' | '(' | ')' | '*' => {
                if !strip {
                    encoded.push(c);
                }
            }
            _ => {
                let mut buf = [0; 4];
                for b in c.encode_utf8(&mut buf).bytes() {
                    encoded.push_str(&format!("%{b:02X}"));
                }
            }
        }
    }
    encoded
}

const FLOAT_EXPONENT_ABOVE: f64 = 1e21;
const FLOAT_EXPONENT_BELOW: f64 = 1e-6;

fn validate(params: &SignatureParams) -> Result<(), WbiError> {
    for (key, value) in params.iter() {
        if key.is_empty() {
            return Err(WbiError::SignatureInput("empty parameter name".to_string()));
        }
        if key == W_RID {
            return Err(WbiError::SignatureInput(format!(
                "parameter `{W_RID}` is reserved for the signature"
            )));
        }
        if let ParamValue::Float(x) = value {
            if !x.is_finite() {
                return Err(WbiError::SignatureInput(format!(
                    "parameter `{key}` is not a finite number"
                )));
            }
            // The browser client prints these in exponent notation.
            let magnitude = x.abs();
            if magnitude >= FLOAT_EXPONENT_ABOVE
                || (magnitude != 0.0 && magnitude < FLOAT_EXPONENT_BELOW)
            {
                return Err(WbiError::SignatureInput(format!(
                    "parameter `{key}` is out of the plain decimal range"
                )));
            }
        }
    }
    Ok(())
}

/// Computes the `w_rid` token for `params` under `mixin_key`.
pub fn sign(params: &SignatureParams, mixin_key: &str) -> Result<String, WbiError> {
    validate(params)?;
    let mut hasher = Md5::new();
    hasher.update(params.canonical_query().as_bytes());
    hasher.update(mixin_key.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}
