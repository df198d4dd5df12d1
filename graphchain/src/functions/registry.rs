// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Registry of caller-supplied functions
//!
//! Schemas, views and operations refer to custom functions by name. Names
//! are resolved once when a graph is built or an operation is bound, so
//! element processing never performs a lookup.

use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

use super::{AggregateFunction, BinaryOperator, Function, FunctionError, TransformFunction};
use crate::generator::ElementGenerator;

/// Named custom aggregators, transforms and element generators
#[derive(Default, Clone)]
pub struct FunctionRegistry {
    aggregators: HashMap<String, Arc<dyn BinaryOperator>>,
    functions: HashMap<String, Arc<dyn TransformFunction>>,
    generators: HashMap<String, Arc<dyn ElementGenerator>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_aggregator(&mut self, name: impl Into<String>, operator: Arc<dyn BinaryOperator>) {
        let name = name.into();
        debug!("Registering aggregator '{}'", name);
        self.aggregators.insert(name, operator);
    }

    pub fn register_function(&mut self, name: impl Into<String>, function: Arc<dyn TransformFunction>) {
        let name = name.into();
        debug!("Registering transform function '{}'", name);
        self.functions.insert(name, function);
    }

    pub fn register_generator(&mut self, name: impl Into<String>, generator: Arc<dyn ElementGenerator>) {
        let name = name.into();
        debug!("Registering element generator '{}'", name);
        self.generators.insert(name, generator);
    }

    /// Resolve an aggregate function to an executable operator
    pub fn resolve_aggregator(
        &self,
        function: &AggregateFunction,
    ) -> Result<Arc<dyn BinaryOperator>, FunctionError> {
        match function {
            AggregateFunction::Custom { name } => {
                self.aggregators
                    .get(name)
                    .cloned()
                    .ok_or_else(|| FunctionError::Unknown {
                        kind: "aggregator",
                        name: name.clone(),
                    })
            }
            builtin => Ok(Arc::new(builtin.clone())),
        }
    }

    /// Resolve a transform function to an executable function
    pub fn resolve_function(&self, function: &Function) -> Result<Arc<dyn TransformFunction>, FunctionError> {
        match function {
            Function::Custom { name } => self.functions.get(name).cloned().ok_or_else(|| FunctionError::Unknown {
                kind: "function",
                name: name.clone(),
            }),
            builtin => Ok(Arc::new(builtin.clone())),
        }
    }

    pub fn generator(&self, name: &str) -> Result<Arc<dyn ElementGenerator>, FunctionError> {
        self.generators.get(name).cloned().ok_or_else(|| FunctionError::Unknown {
            kind: "element generator",
            name: name.to_string(),
        })
    }

    pub fn has_generator(&self, name: &str) -> bool {
        self.generators.contains_key(name)
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = |map: Vec<&String>| {
            let mut names: Vec<String> = map.into_iter().cloned().collect();
            names.sort();
            names
        };
        f.debug_struct("FunctionRegistry")
            .field("aggregators", &names(self.aggregators.keys().collect()))
            .field("functions", &names(self.functions.keys().collect()))
            .field("generators", &names(self.generators.keys().collect()))
            .finish()
    }
}
