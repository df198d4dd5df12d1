// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Value type system for vertices and element properties

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::functions::SketchValue;

/// Date formats accepted when parsing date literals
const DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y/%m/%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
const DATE_FORMATS: &[&str] = &["%Y/%m/%d", "%Y-%m-%d"];

/// Class tag of a value, used by schema type definitions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ValueClass {
    String,
    Long,
    Double,
    Boolean,
    Date,
    FreqMap,
    List,
    Set,
    Sketch,
    /// Accepts any value
    Any,
}

impl ValueClass {
    /// Check whether a value is an instance of this class. `Null` matches every class.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) | (ValueClass::Any, _) => true,
            (class, value) => value.class() == Some(*class),
        }
    }
}

impl fmt::Display for ValueClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A vertex identifier or property value
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Long(i64),
    Double(f64),
    String(String),
    Date(NaiveDateTime),
    /// Frequency map of string keys to counts
    FreqMap(BTreeMap<String, i64>),
    List(Vec<Value>),
    Set(BTreeSet<String>),
    /// Opaque sketch; runtime only, never serialized
    #[serde(skip)]
    Sketch(SketchValue),
}

impl Value {
    /// Class of this value, `None` for `Null`
    pub fn class(&self) -> Option<ValueClass> {
        match self {
            Value::Null => None,
            Value::Boolean(_) => Some(ValueClass::Boolean),
            Value::Long(_) => Some(ValueClass::Long),
            Value::Double(_) => Some(ValueClass::Double),
            Value::String(_) => Some(ValueClass::String),
            Value::Date(_) => Some(ValueClass::Date),
            Value::FreqMap(_) => Some(ValueClass::FreqMap),
            Value::List(_) => Some(ValueClass::List),
            Value::Set(_) => Some(ValueClass::Set),
            Value::Sketch(_) => Some(ValueClass::Sketch),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Long(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric view of `Long` and `Double` values
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Long(n) => Some(*n as f64),
            Value::Double(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_freq_map(&self) -> Option<&BTreeMap<String, i64>> {
        match self {
            Value::FreqMap(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_sketch(&self) -> Option<&SketchValue> {
        match self {
            Value::Sketch(s) => Some(s),
            _ => None,
        }
    }

    /// Parse a date literal such as `2000/01/01`, `2000-05-03 07:00:00` or epoch millis
    pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
        let text = text.trim();
        for format in DATE_TIME_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
                return Some(dt);
            }
        }
        for format in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(text, format) {
                return date.and_hms_opt(0, 0, 0);
            }
        }
        text.parse::<i64>()
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|dt| dt.naive_utc())
    }

    /// Coerce a value into a date: dates pass through, strings are parsed,
    /// longs are treated as epoch milliseconds.
    pub fn to_date(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Date(d) => Some(*d),
            Value::String(s) => Self::parse_date(s),
            Value::Long(ms) => DateTime::<Utc>::from_timestamp_millis(*ms).map(|dt| dt.naive_utc()),
            _ => None,
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::Long(_) | Value::Double(_) => 2,
            Value::String(_) => 3,
            Value::Date(_) => 4,
            Value::FreqMap(_) => 5,
            Value::List(_) => 6,
            Value::Set(_) => 7,
            Value::Sketch(_) => 8,
        }
    }

    /// Total ordering used by sorts, range predicates and edge normalisation.
    ///
    /// Longs and doubles compare numerically; values of different kinds
    /// order by kind with `Null` first.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Long(a), Value::Long(b)) => a.cmp(b),
            (Value::Long(_), Value::Double(_))
            | (Value::Double(_), Value::Long(_))
            | (Value::Double(_), Value::Double(_)) => {
                let a = self.as_f64().unwrap_or_default();
                let b = other.as_f64().unwrap_or_default();
                a.total_cmp(&b)
            }
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::FreqMap(a), Value::FreqMap(b)) => a.cmp(b),
            (Value::Set(a), Value::Set(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    let ord = x.compare(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }

    /// Render as a CSV field: `Null` becomes an empty field
    pub fn to_field_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::FreqMap(a), Value::FreqMap(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => a == b,
            (Value::Sketch(a), Value::Sketch(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Boolean(b) => b.hash(state),
            Value::Long(n) => n.hash(state),
            Value::Double(n) => n.to_bits().hash(state),
            Value::String(s) => s.hash(state),
            Value::Date(d) => d.hash(state),
            Value::FreqMap(m) => m.hash(state),
            Value::List(items) => items.hash(state),
            Value::Set(items) => items.hash(state),
            Value::Sketch(s) => s.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Long(n) => write!(f, "{}", n),
            Value::Double(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d %H:%M:%S")),
            Value::FreqMap(m) => {
                let entries: Vec<String> = m.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                write!(f, "{{{}}}", entries.join(", "))
            }
            Value::List(items) => {
                let entries: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", entries.join(", "))
            }
            Value::Set(items) => {
                let entries: Vec<&str> = items.iter().map(|s| s.as_str()).collect();
                write!(f, "{{{}}}", entries.join(", "))
            }
            Value::Sketch(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Long(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Long(n as i64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Double(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(d: NaiveDateTime) -> Self {
        Value::Date(d)
    }
}

impl From<BTreeMap<String, i64>> for Value {
    fn from(m: BTreeMap<String, i64>) -> Self {
        Value::FreqMap(m)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}
