//! SCPI reply parsing
//!
//! Replies are comma-separated fields. Each field is a quoted string, an
//! integer, a float, or (failing all of those) left as bare text.

use std::fmt;

use serde::Serialize;

use crate::error::DeviceError;

/// Query returning the number of entries in the error queue
pub const ERROR_COUNT_QUERY: &str = ":SYST:ERR:COUNT?";

/// Query popping the oldest error queue entry
pub const ERROR_QUERY: &str = ":SYST:ERR?";

/// One converted reply field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScpiValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl ScpiValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ScpiValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value, integers widened to float
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScpiValue::Int(i) => Some(*i as f64),
            ScpiValue::Float(f) => Some(*f),
            ScpiValue::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScpiValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ScpiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScpiValue::Int(i) => write!(f, "{i}"),
            ScpiValue::Float(v) => write!(f, "{v}"),
            ScpiValue::Str(s) => write!(f, "{s}"),
        }
    }
}

/// A converted reply: one value, or a list when the reply had several fields
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScpiReply {
    Value(ScpiValue),
    List(Vec<ScpiValue>),
}

impl ScpiReply {
    /// All fields as a slice-like vector
    pub fn into_values(self) -> Vec<ScpiValue> {
        match self {
            ScpiReply::Value(v) => vec![v],
            ScpiReply::List(l) => l,
        }
    }
}

impl fmt::Display for ScpiReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScpiReply::Value(v) => write!(f, "{v}"),
            ScpiReply::List(l) => {
                let parts: Vec<String> = l.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", parts.join(","))
            }
        }
    }
}

/// Convert one reply field
///
/// `"text"` → `Str("text")`, `42` → `Int(42)`, `5.402` → `Float(5.402)`,
/// anything else is kept verbatim.
pub fn scpi_convert(field: &str) -> ScpiValue {
    if field.len() >= 2 && field.starts_with('"') && field.ends_with('"') {
        return ScpiValue::Str(field[1..field.len() - 1].to_string());
    }
    if let Ok(i) = field.parse::<i64>() {
        return ScpiValue::Int(i);
    }
    if let Ok(f) = field.parse::<f64>() {
        return ScpiValue::Float(f);
    }
    ScpiValue::Str(field.to_string())
}

/// Split a reply on `,` and convert every field
pub fn parse_reply(reply: &str) -> ScpiReply {
    let mut values: Vec<ScpiValue> = reply.split(',').map(scpi_convert).collect();
    if values.len() == 1 {
        ScpiReply::Value(values.remove(0))
    } else {
        ScpiReply::List(values)
    }
}

/// Parse an error queue entry such as `-113,"Undefined header"`
pub fn parse_error_entry(entry: &str) -> Result<(i32, String), DeviceError> {
    let (code, message) = entry.split_once(',').unwrap_or((entry, ""));
    let code = code.trim().parse::<i32>().map_err(|_| {
        DeviceError::InvalidParameter(format!("malformed error queue entry {entry:?}"))
    })?;
    let message = message.trim().trim_matches('"').to_string();
    Ok((code, message))
}
