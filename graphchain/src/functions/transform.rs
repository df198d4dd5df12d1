// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transform functions applied by element transformers

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use super::FunctionError;
use crate::storage::Value;

/// A pure function over selected property values
pub trait TransformFunction: Debug + Send + Sync {
    fn apply(&self, inputs: &[Value]) -> Result<Value, FunctionError>;
}

/// Built-in transform functions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "class")]
pub enum Function {
    Identity,
    /// Returns null for any input
    ToNull,
    FirstItem,
    /// Last item of a list; null lists and null items give null
    LastItem,
    /// Extracts one count from a frequency map
    FreqMapExtractor {
        key: String,
    },
    ToString,
    ToLong,
    Size,
    Concat {
        #[serde(default = "default_separator")]
        separator: String,
    },
    DefaultIfNull {
        default: Value,
    },
    /// A caller-registered function looked up by name
    Custom {
        name: String,
    },
}

fn default_separator() -> String {
    ",".to_string()
}

impl Function {
    pub fn freq_map_extractor(key: impl Into<String>) -> Self {
        Function::FreqMapExtractor { key: key.into() }
    }

    pub fn name(&self) -> &str {
        match self {
            Function::Identity => "Identity",
            Function::ToNull => "ToNull",
            Function::FirstItem => "FirstItem",
            Function::LastItem => "LastItem",
            Function::FreqMapExtractor { .. } => "FreqMapExtractor",
            Function::ToString => "ToString",
            Function::ToLong => "ToLong",
            Function::Size => "Size",
            Function::Concat { .. } => "Concat",
            Function::DefaultIfNull { .. } => "DefaultIfNull",
            Function::Custom { name } => name,
        }
    }

    fn arity(&self) -> Option<usize> {
        match self {
            Function::Concat { .. } => Some(2),
            Function::Custom { .. } | Function::ToNull => None,
            _ => Some(1),
        }
    }
}

impl TransformFunction for Function {
    fn apply(&self, inputs: &[Value]) -> Result<Value, FunctionError> {
        if let Some(expected) = self.arity() {
            FunctionError::check_arity(self.name(), expected, inputs)?;
        }

        match self {
            Function::Identity => Ok(inputs[0].clone()),
            Function::ToNull => Ok(Value::Null),
            Function::FirstItem | Function::LastItem => match &inputs[0] {
                Value::Null => Ok(Value::Null),
                Value::List(items) => {
                    let item = if matches!(self, Function::FirstItem) {
                        items.first()
                    } else {
                        items.last()
                    };
                    Ok(item.cloned().unwrap_or(Value::Null))
                }
                other => Err(FunctionError::invalid_input(
                    self.name(),
                    format!("expected a list, got {}", other),
                )),
            },
            Function::FreqMapExtractor { key } => match &inputs[0] {
                Value::Null => Ok(Value::Null),
                Value::FreqMap(map) => Ok(map.get(key).map(|n| Value::Long(*n)).unwrap_or(Value::Null)),
                other => Err(FunctionError::invalid_input(
                    self.name(),
                    format!("expected a frequency map, got {}", other),
                )),
            },
            Function::ToString => match &inputs[0] {
                Value::Null => Ok(Value::Null),
                other => Ok(Value::String(other.to_string())),
            },
            Function::ToLong => match &inputs[0] {
                Value::Null => Ok(Value::Null),
                Value::Long(n) => Ok(Value::Long(*n)),
                Value::Double(n) => Ok(Value::Long(*n as i64)),
                Value::String(s) => s.trim().parse::<i64>().map(Value::Long).map_err(|e| {
                    FunctionError::invalid_input(self.name(), format!("'{}': {}", s, e))
                }),
                other => Err(FunctionError::invalid_input(
                    self.name(),
                    format!("cannot convert {} to a long", other),
                )),
            },
            Function::Size => {
                let size = match &inputs[0] {
                    Value::Null => 0,
                    Value::List(items) => items.len(),
                    Value::Set(items) => items.len(),
                    Value::FreqMap(map) => map.len(),
                    Value::String(s) => s.chars().count(),
                    other => {
                        return Err(FunctionError::invalid_input(
                            self.name(),
                            format!("{} has no size", other),
                        ))
                    }
                };
                Ok(Value::Long(size as i64))
            }
            Function::Concat { separator } => match (&inputs[0], &inputs[1]) {
                (Value::Null, Value::Null) => Ok(Value::Null),
                (Value::Null, other) | (other, Value::Null) => Ok(Value::String(other.to_string())),
                (a, b) => Ok(Value::String(format!("{}{}{}", a, separator, b))),
            },
            Function::DefaultIfNull { default } => match &inputs[0] {
                Value::Null => Ok(default.clone()),
                other => Ok(other.clone()),
            },
            Function::Custom { name } => Err(FunctionError::Unknown {
                kind: "unresolved function",
                name: name.clone(),
            }),
        }
    }
}
