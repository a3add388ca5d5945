use std::cmp::Ordering;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::config::ColumnKind;
use crate::error::{Result, SdvgError};

/// A single generated scalar traveling through the row stream.
///
/// The row stream is heterogeneous, so values are a tagged union rather than
/// generics: the CSV and Parquet writers pattern-match on the tag, and the
/// HTTP writer serializes it to JSON. `Timestamp` is always UTC.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    String(String),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
}

/// One generated row: values in the model's column order.
pub type DataRow = Vec<Value>;

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Render for a CSV cell. Nulls are empty cells; floats honor the
    /// configured precision; datetimes use the given chrono layout, or epoch
    /// seconds when the layout is the literal `unix`.
    pub fn to_csv_field(&self, float_precision: usize, datetime_format: &str) -> String {
        match self {
            Value::Null => String::new(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format!("{:.*}", float_precision, f),
            Value::String(s) => s.clone(),
            Value::Uuid(u) => u.to_string(),
            Value::Timestamp(ts) => {
                if datetime_format == "unix" {
                    ts.timestamp().to_string()
                } else {
                    ts.format(datetime_format).to_string()
                }
            }
        }
    }

    /// Render for a `col=value` partition path segment. Nulls render as the
    /// literal `null` so partition directories stay stable across sinks.
    pub fn to_partition_segment(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
            Value::Uuid(u) => u.to_string(),
            Value::Timestamp(ts) => ts.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    /// Total order used to sort enum value lists for deterministic indexing.
    /// Nulls sort first; mixed kinds fall back to tag order (never happens
    /// after coercion, but keeps the comparator total).
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        fn tag(v: &Value) -> u8 {
            match v {
                Value::Null => 0,
                Value::Int(_) => 1,
                Value::Float(_) => 2,
                Value::String(_) => 3,
                Value::Uuid(_) => 4,
                Value::Timestamp(_) => 5,
            }
        }
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Value::Int(a), Value::Float(b)) => {
                (*a as f64).partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (Value::Float(a), Value::Int(b)) => {
                a.partial_cmp(&(*b as f64)).unwrap_or(Ordering::Equal)
            }
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Uuid(a), Value::Uuid(b)) => a.cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            (a, b) => tag(a).cmp(&tag(b)),
        }
    }

    /// Coerce a raw config enum entry to the column's concrete kind.
    ///
    /// Strings holding numbers are accepted for numeric kinds (a YAML author
    /// writing `"111"` means the integer 111), numbers are accepted for
    /// string kinds, and RFC3339 strings or epoch seconds for datetimes.
    pub fn coerce(raw: &serde_json::Value, kind: ColumnKind) -> Result<Value> {
        if raw.is_null() {
            return Ok(Value::Null);
        }
        let fail = || SdvgError::Config {
            message: format!("enum value {} cannot be coerced to {:?}", raw, kind),
        };
        match kind {
            ColumnKind::Integer => match raw {
                serde_json::Value::Number(n) => {
                    n.as_i64().map(Value::Int).ok_or_else(fail)
                }
                serde_json::Value::String(s) => {
                    s.trim().parse::<i64>().map(Value::Int).map_err(|_| fail())
                }
                _ => Err(fail()),
            },
            ColumnKind::Float => match raw {
                serde_json::Value::Number(n) => n.as_f64().map(Value::Float).ok_or_else(fail),
                serde_json::Value::String(s) => {
                    s.trim().parse::<f64>().map(Value::Float).map_err(|_| fail())
                }
                _ => Err(fail()),
            },
            ColumnKind::String => match raw {
                serde_json::Value::String(s) => Ok(Value::String(s.clone())),
                serde_json::Value::Number(n) => Ok(Value::String(n.to_string())),
                serde_json::Value::Bool(b) => Ok(Value::String(b.to_string())),
                _ => Err(fail()),
            },
            ColumnKind::Uuid => match raw {
                serde_json::Value::String(s) => {
                    Uuid::parse_str(s).map(Value::Uuid).map_err(|_| fail())
                }
                _ => Err(fail()),
            },
            ColumnKind::DateTime => match raw {
                serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s)
                    .map(|dt| Value::Timestamp(dt.with_timezone(&Utc)))
                    .map_err(|_| fail()),
                serde_json::Value::Number(n) => n
                    .as_i64()
                    .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
                    .map(Value::Timestamp)
                    .ok_or_else(fail),
                _ => Err(fail()),
            },
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::Uuid(u) => serializer.serialize_str(&u.to_string()),
            Value::Timestamp(ts) => {
                serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Micros, true))
            }
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::String(s) => write!(f, "{}", s),
            Value::Uuid(u) => write!(f, "{}", u),
            Value::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
        }
    }
}
