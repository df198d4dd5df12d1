// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Predicates evaluated by element filters and schema validation
//!
//! A predicate is tested against the tuple of values selected from an
//! element. Most predicates are unary; `InDateRangeDual` takes a
//! `(start, end)` pair and the logical combinators pass the tuple through.

use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;

use super::FunctionError;
use crate::storage::Value;

/// A regular expression compiled once when the predicate is built or deserialized
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self, FunctionError> {
        Regex::new(pattern)
            .map(Pattern)
            .map_err(|e| FunctionError::InvalidConfig(format!("bad regex '{}': {}", pattern, e)))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Pattern::new(&text).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for optional date bounds written as date literals
mod date_bound {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => serializer.serialize_some(&dt.format("%Y/%m/%d %H:%M:%S").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        let text: Option<String> = Option::deserialize(deserializer)?;
        match text {
            None => Ok(None),
            Some(text) => Value::parse_date(&text)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid date '{}'", text))),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Built-in predicates
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "class")]
pub enum Predicate {
    IsMoreThan {
        value: Value,
        #[serde(default, rename = "orEqualTo")]
        or_equal_to: bool,
    },
    IsLessThan {
        value: Value,
        #[serde(default, rename = "orEqualTo")]
        or_equal_to: bool,
    },
    IsEqual {
        value: Value,
    },
    IsIn {
        values: Vec<Value>,
    },
    /// True for any non-null value
    Exists,
    IsTrue,
    IsFalse,
    Regex {
        pattern: Pattern,
    },
    StringContains {
        value: String,
        #[serde(default, rename = "ignoreCase")]
        ignore_case: bool,
    },
    InRange {
        #[serde(default)]
        start: Option<Value>,
        #[serde(default)]
        end: Option<Value>,
        #[serde(default = "default_true", rename = "startInclusive")]
        start_inclusive: bool,
        #[serde(default = "default_true", rename = "endInclusive")]
        end_inclusive: bool,
    },
    /// Tests a `(startDate, endDate)` pair against a date range
    InDateRangeDual {
        #[serde(default, with = "date_bound")]
        start: Option<NaiveDateTime>,
        #[serde(default, with = "date_bound")]
        end: Option<NaiveDateTime>,
        #[serde(default = "default_true", rename = "startInclusive")]
        start_inclusive: bool,
        #[serde(default = "default_true", rename = "endInclusive")]
        end_inclusive: bool,
        /// When true the whole interval must lie inside the range, otherwise any overlap passes
        #[serde(default = "default_true", rename = "insideRange")]
        inside_range: bool,
    },
    /// Applies the inner predicate to one entry of a frequency map
    PredicateMap {
        key: String,
        predicate: Box<Predicate>,
    },
    And {
        predicates: Vec<Predicate>,
    },
    Or {
        predicates: Vec<Predicate>,
    },
    Not {
        predicate: Box<Predicate>,
    },
}

impl Predicate {
    pub fn is_more_than(value: impl Into<Value>) -> Self {
        Predicate::IsMoreThan {
            value: value.into(),
            or_equal_to: false,
        }
    }

    pub fn is_less_than(value: impl Into<Value>) -> Self {
        Predicate::IsLessThan {
            value: value.into(),
            or_equal_to: false,
        }
    }

    pub fn is_equal(value: impl Into<Value>) -> Self {
        Predicate::IsEqual {
            value: value.into(),
        }
    }

    pub fn regex(pattern: &str) -> Result<Self, FunctionError> {
        Ok(Predicate::Regex {
            pattern: Pattern::new(pattern)?,
        })
    }

    pub fn predicate_map(key: impl Into<String>, predicate: Predicate) -> Self {
        Predicate::PredicateMap {
            key: key.into(),
            predicate: Box::new(predicate),
        }
    }

    /// Date range with default inclusivity, bounds given as date literals
    pub fn in_date_range_dual(start: &str, end: &str) -> Result<Self, FunctionError> {
        let parse = |text: &str| {
            Value::parse_date(text)
                .ok_or_else(|| FunctionError::InvalidConfig(format!("invalid date '{}'", text)))
        };
        Ok(Predicate::InDateRangeDual {
            start: Some(parse(start)?),
            end: Some(parse(end)?),
            start_inclusive: true,
            end_inclusive: true,
            inside_range: true,
        })
    }

    /// Number of selected values this predicate expects, `None` when it forwards the tuple
    pub fn arity(&self) -> Option<usize> {
        match self {
            Predicate::InDateRangeDual { .. } => Some(2),
            Predicate::And { .. } | Predicate::Or { .. } | Predicate::Not { .. } => None,
            _ => Some(1),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Predicate::IsMoreThan { .. } => "IsMoreThan",
            Predicate::IsLessThan { .. } => "IsLessThan",
            Predicate::IsEqual { .. } => "IsEqual",
            Predicate::IsIn { .. } => "IsIn",
            Predicate::Exists => "Exists",
            Predicate::IsTrue => "IsTrue",
            Predicate::IsFalse => "IsFalse",
            Predicate::Regex { .. } => "Regex",
            Predicate::StringContains { .. } => "StringContains",
            Predicate::InRange { .. } => "InRange",
            Predicate::InDateRangeDual { .. } => "InDateRangeDual",
            Predicate::PredicateMap { .. } => "PredicateMap",
            Predicate::And { .. } => "And",
            Predicate::Or { .. } => "Or",
            Predicate::Not { .. } => "Not",
        }
    }

    /// Test the selected values
    pub fn test(&self, inputs: &[Value]) -> Result<bool, FunctionError> {
        if let Some(expected) = self.arity() {
            FunctionError::check_arity(self.name(), expected, inputs)?;
        }

        match self {
            Predicate::IsMoreThan { value, or_equal_to } => {
                Ok(match compare(self.name(), &inputs[0], value)? {
                    Some(Ordering::Greater) => true,
                    Some(Ordering::Equal) => *or_equal_to,
                    _ => false,
                })
            }
            Predicate::IsLessThan { value, or_equal_to } => {
                Ok(match compare(self.name(), &inputs[0], value)? {
                    Some(Ordering::Less) => true,
                    Some(Ordering::Equal) => *or_equal_to,
                    _ => false,
                })
            }
            Predicate::IsEqual { value } => Ok(&inputs[0] == value),
            Predicate::IsIn { values } => Ok(values.contains(&inputs[0])),
            Predicate::Exists => Ok(!inputs[0].is_null()),
            Predicate::IsTrue => Ok(inputs[0].as_bool() == Some(true)),
            Predicate::IsFalse => Ok(inputs[0].as_bool() == Some(false)),
            Predicate::Regex { pattern } => Ok(inputs[0]
                .as_str()
                .map(|s| pattern.is_match(s))
                .unwrap_or(false)),
            Predicate::StringContains { value, ignore_case } => Ok(match inputs[0].as_str() {
                Some(s) if *ignore_case => s.to_lowercase().contains(&value.to_lowercase()),
                Some(s) => s.contains(value.as_str()),
                None => false,
            }),
            Predicate::InRange {
                start,
                end,
                start_inclusive,
                end_inclusive,
            } => {
                let input = &inputs[0];
                if input.is_null() {
                    return Ok(false);
                }
                let after_start = match start {
                    Some(start) => match compare(self.name(), input, start)? {
                        Some(Ordering::Greater) => true,
                        Some(Ordering::Equal) => *start_inclusive,
                        _ => false,
                    },
                    None => true,
                };
                let before_end = match end {
                    Some(end) => match compare(self.name(), input, end)? {
                        Some(Ordering::Less) => true,
                        Some(Ordering::Equal) => *end_inclusive,
                        _ => false,
                    },
                    None => true,
                };
                Ok(after_start && before_end)
            }
            Predicate::InDateRangeDual {
                start,
                end,
                start_inclusive,
                end_inclusive,
                inside_range,
            } => {
                let (Some(from), Some(to)) = (inputs[0].to_date(), inputs[1].to_date()) else {
                    return Ok(false);
                };
                let not_before = |date: NaiveDateTime| match start {
                    Some(bound) if *start_inclusive => date >= *bound,
                    Some(bound) => date > *bound,
                    None => true,
                };
                let not_after = |date: NaiveDateTime| match end {
                    Some(bound) if *end_inclusive => date <= *bound,
                    Some(bound) => date < *bound,
                    None => true,
                };
                if *inside_range {
                    Ok(not_before(from) && not_after(to))
                } else {
                    Ok(not_after(from) && not_before(to))
                }
            }
            Predicate::PredicateMap { key, predicate } => match &inputs[0] {
                Value::Null => Ok(false),
                Value::FreqMap(map) => {
                    let entry = map.get(key).map(|n| Value::Long(*n)).unwrap_or(Value::Null);
                    predicate.test(std::slice::from_ref(&entry))
                }
                other => Err(FunctionError::invalid_input(
                    self.name(),
                    format!("expected a frequency map, got {}", other),
                )),
            },
            Predicate::And { predicates } => {
                for predicate in predicates {
                    if !predicate.test(inputs)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Or { predicates } => {
                for predicate in predicates {
                    if predicate.test(inputs)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Predicate::Not { predicate } => Ok(!predicate.test(inputs)?),
        }
    }
}

/// Compare an input with a configured value. `None` when the input is null.
fn compare(function: &str, input: &Value, value: &Value) -> Result<Option<Ordering>, FunctionError> {
    if input.is_null() {
        return Ok(None);
    }
    let comparable = matches!(
        (input, value),
        (Value::Long(_) | Value::Double(_), Value::Long(_) | Value::Double(_))
    ) || input.class() == value.class();
    if !comparable {
        return Err(FunctionError::invalid_input(
            function,
            format!("cannot compare {} with {}", input, value),
        ));
    }
    Ok(Some(input.compare(value)))
}
