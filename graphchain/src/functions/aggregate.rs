// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Aggregate functions used to merge property values of matching elements

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use super::FunctionError;
use crate::storage::Value;

/// Merges two property values into one
pub trait BinaryOperator: Debug + Send + Sync {
    fn apply(&self, state: Value, input: Value) -> Result<Value, FunctionError>;
}

/// Built-in aggregate functions
///
/// Every aggregator treats null as absent: `apply(null, b) == b` and
/// `apply(a, null) == a`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "class")]
pub enum AggregateFunction {
    Sum,
    Max,
    Min,
    And,
    Or,
    /// Keeps the first value seen
    First,
    /// Keeps the latest value seen
    Last,
    /// Sums counts key by key
    FreqMapMerge,
    /// Appends lists, unions sets
    CollectionConcat,
    StringConcat {
        #[serde(default = "default_separator")]
        separator: String,
    },
    /// Delegates to the sketch's own union
    SketchUnion,
    /// A caller-registered aggregator looked up by name
    Custom {
        name: String,
    },
}

fn default_separator() -> String {
    ",".to_string()
}

impl AggregateFunction {
    pub fn name(&self) -> &str {
        match self {
            AggregateFunction::Sum => "Sum",
            AggregateFunction::Max => "Max",
            AggregateFunction::Min => "Min",
            AggregateFunction::And => "And",
            AggregateFunction::Or => "Or",
            AggregateFunction::First => "First",
            AggregateFunction::Last => "Last",
            AggregateFunction::FreqMapMerge => "FreqMapMerge",
            AggregateFunction::CollectionConcat => "CollectionConcat",
            AggregateFunction::StringConcat { .. } => "StringConcat",
            AggregateFunction::SketchUnion => "SketchUnion",
            AggregateFunction::Custom { name } => name,
        }
    }

    fn mismatch(&self, state: &Value, input: &Value) -> FunctionError {
        FunctionError::invalid_input(
            self.name(),
            format!("unsupported operands {:?} and {:?}", state, input),
        )
    }
}

impl BinaryOperator for AggregateFunction {
    fn apply(&self, state: Value, input: Value) -> Result<Value, FunctionError> {
        if state.is_null() {
            return Ok(input);
        }
        if input.is_null() {
            return Ok(state);
        }

        match self {
            AggregateFunction::Sum => match (&state, &input) {
                (Value::Long(a), Value::Long(b)) => a
                    .checked_add(*b)
                    .map(Value::Long)
                    .ok_or_else(|| FunctionError::invalid_input(self.name(), "long overflow")),
                (Value::Long(_) | Value::Double(_), Value::Long(_) | Value::Double(_)) => Ok(
                    Value::Double(state.as_f64().unwrap_or_default() + input.as_f64().unwrap_or_default()),
                ),
                _ => Err(self.mismatch(&state, &input)),
            },
            AggregateFunction::Max | AggregateFunction::Min => {
                let comparable = matches!(
                    (&state, &input),
                    (Value::Long(_) | Value::Double(_), Value::Long(_) | Value::Double(_))
                ) || state.class() == input.class();
                if !comparable {
                    return Err(self.mismatch(&state, &input));
                }
                let keep_input = match self {
                    AggregateFunction::Max => input.compare(&state).is_gt(),
                    _ => input.compare(&state).is_lt(),
                };
                Ok(if keep_input { input } else { state })
            }
            AggregateFunction::And | AggregateFunction::Or => match (&state, &input) {
                (Value::Boolean(a), Value::Boolean(b)) => Ok(Value::Boolean(
                    if matches!(self, AggregateFunction::And) {
                        *a && *b
                    } else {
                        *a || *b
                    },
                )),
                _ => Err(self.mismatch(&state, &input)),
            },
            AggregateFunction::First => Ok(state),
            AggregateFunction::Last => Ok(input),
            AggregateFunction::FreqMapMerge => match (state, input) {
                (Value::FreqMap(mut merged), Value::FreqMap(other)) => {
                    for (key, count) in other {
                        let slot = merged.entry(key).or_insert(0);
                        *slot = slot
                            .checked_add(count)
                            .ok_or_else(|| FunctionError::invalid_input(self.name(), "long overflow"))?;
                    }
                    Ok(Value::FreqMap(merged))
                }
                (state, input) => Err(self.mismatch(&state, &input)),
            },
            AggregateFunction::CollectionConcat => match (state, input) {
                (Value::List(mut items), Value::List(other)) => {
                    items.extend(other);
                    Ok(Value::List(items))
                }
                (Value::Set(mut items), Value::Set(other)) => {
                    items.extend(other);
                    Ok(Value::Set(items))
                }
                (state, input) => Err(self.mismatch(&state, &input)),
            },
            AggregateFunction::StringConcat { separator } => match (&state, &input) {
                (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}{}", a, separator, b))),
                _ => Err(self.mismatch(&state, &input)),
            },
            AggregateFunction::SketchUnion => match (&state, &input) {
                (Value::Sketch(a), Value::Sketch(b)) => a.union(b).map(Value::Sketch),
                _ => Err(self.mismatch(&state, &input)),
            },
            AggregateFunction::Custom { name } => Err(FunctionError::Unknown {
                kind: "unresolved aggregator",
                name: name.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn freq(entries: &[(&str, i64)]) -> Value {
        Value::FreqMap(entries.iter().map(|(k, v)| (k.to_string(), *v)).collect::<BTreeMap<_, _>>())
    }

    #[test]
    fn freq_map_merge_rejects_overflow() {
        let merge = AggregateFunction::FreqMapMerge;
        assert_eq!(
            merge.apply(freq(&[("BUS", 2)]), freq(&[("BUS", 3), ("CAR", 1)])).unwrap(),
            freq(&[("BUS", 5), ("CAR", 1)])
        );
        let err = merge.apply(freq(&[("BUS", i64::MAX)]), freq(&[("BUS", 1)])).unwrap_err();
        assert!(err.to_string().contains("long overflow"));
    }

    #[test]
    fn and_follows_null_rules() {
        let and = AggregateFunction::And;
        assert_eq!(and.apply(true.into(), true.into()).unwrap(), Value::Boolean(true));
        assert_eq!(and.apply(true.into(), false.into()).unwrap(), Value::Boolean(false));
        assert_eq!(and.apply(false.into(), Value::Null).unwrap(), Value::Boolean(false));
        assert_eq!(and.apply(true.into(), Value::Null).unwrap(), Value::Boolean(true));
        assert_eq!(and.apply(Value::Null, Value::Null).unwrap(), Value::Null);
        assert!(and.apply("test".into(), 3.into()).is_err());
        assert!(and.apply(0.into(), 0.into()).is_err());
    }

    #[test]
    fn sum_is_commutative_and_associative() {
        let sum = AggregateFunction::Sum;
        let (a, b, c) = (Value::Long(3), Value::Long(11), Value::Long(-4));
        let left = sum.apply(sum.apply(a.clone(), b.clone()).unwrap(), c.clone()).unwrap();
        let right = sum.apply(a.clone(), sum.apply(b.clone(), c).unwrap()).unwrap();
        assert_eq!(left, right);
        assert_eq!(sum.apply(a.clone(), b.clone()).unwrap(), sum.apply(b, a).unwrap());
        assert!(sum.apply(Value::Long(i64::MAX), Value::Long(1)).is_err());
    }

    #[test]
    fn freq_map_merge_sums_per_key() {
        let merge = AggregateFunction::FreqMapMerge;
        let ab = merge.apply(freq(&[("BUS", 2), ("CAR", 1)]), freq(&[("BUS", 5)])).unwrap();
        let ba = merge.apply(freq(&[("BUS", 5)]), freq(&[("BUS", 2), ("CAR", 1)])).unwrap();
        assert_eq!(ab, freq(&[("BUS", 7), ("CAR", 1)]));
        assert_eq!(ab, ba);
    }

    #[test]
    fn min_and_max_pick_extremes() {
        let a = Value::Date(Value::parse_date("2000-05-03 07:00:00").unwrap());
        let b = Value::Date(Value::parse_date("2000-05-03 08:00:00").unwrap());
        assert_eq!(AggregateFunction::Min.apply(b.clone(), a.clone()).unwrap(), a);
        assert_eq!(AggregateFunction::Max.apply(a, b.clone()).unwrap(), b);
        assert!(AggregateFunction::Max.apply(Value::Long(1), "x".into()).is_err());
    }
}
