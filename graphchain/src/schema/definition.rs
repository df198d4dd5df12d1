// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Schema definitions for element groups and property types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::functions::{AggregateFunction, BinaryOperator, Predicate};
use crate::storage::{DirectedType, ValueClass};

fn default_true() -> bool {
    true
}

/// A named property type: value class, aggregator and validators
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TypeDefinition {
    pub class: ValueClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate_function: Option<AggregateFunction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validate_functions: Vec<Predicate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TypeDefinition {
    pub fn new(class: ValueClass) -> Self {
        Self {
            class,
            aggregate_function: None,
            validate_functions: Vec::new(),
            description: None,
        }
    }

    pub fn aggregated_by(mut self, function: AggregateFunction) -> Self {
        self.aggregate_function = Some(function);
        self
    }

    pub fn validated_by(mut self, predicate: Predicate) -> Self {
        self.validate_functions.push(predicate);
        self
    }
}

/// Definition of an entity or edge group
///
/// Entities set `vertex`; edges set `source`, `destination` and optionally
/// `directed`. Each property maps to a type name declared in the schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ElementDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default)]
    pub directed: DirectedType,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    /// Properties whose values keep elements apart during aggregation
    #[serde(default)]
    pub group_by: Vec<String>,
    /// When false, elements of this group are stored without merging
    #[serde(default = "default_true")]
    pub aggregate: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub read_auths: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub write_auths: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ElementDefinition {
    pub fn entity(vertex_type: impl Into<String>) -> Self {
        Self {
            vertex: Some(vertex_type.into()),
            aggregate: true,
            ..Default::default()
        }
    }

    pub fn edge(source_type: impl Into<String>, destination_type: impl Into<String>, directed: DirectedType) -> Self {
        Self {
            source: Some(source_type.into()),
            destination: Some(destination_type.into()),
            directed,
            aggregate: true,
            ..Default::default()
        }
    }

    pub fn property(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.properties.insert(name.into(), type_name.into());
        self
    }

    pub fn group_by<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn read_auths<I, S>(mut self, auths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.read_auths = auths.into_iter().map(Into::into).collect();
        self
    }

    pub fn write_auths<I, S>(mut self, auths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.write_auths = auths.into_iter().map(Into::into).collect();
        self
    }
}

/// Whether a group holds entities or edges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    Entity,
    Edge,
}

/// A property with its type resolved and its aggregator instantiated
#[derive(Debug, Clone)]
pub struct ResolvedProperty {
    pub type_name: String,
    pub class: ValueClass,
    pub aggregator: Option<Arc<dyn BinaryOperator>>,
    pub validators: Vec<Predicate>,
}

/// A group after schema validation
#[derive(Debug, Clone)]
pub struct ResolvedGroup {
    pub name: String,
    pub kind: GroupKind,
    pub identifier_classes: Vec<ValueClass>,
    pub identifier_validators: Vec<Vec<Predicate>>,
    pub directed: DirectedType,
    pub properties: BTreeMap<String, ResolvedProperty>,
    pub group_by: Vec<String>,
    pub aggregate: bool,
    pub read_auths: Vec<String>,
    pub write_auths: Vec<String>,
}

impl ResolvedGroup {
    pub fn aggregator(&self, property: &str) -> Option<&Arc<dyn BinaryOperator>> {
        self.properties.get(property).and_then(|p| p.aggregator.as_ref())
    }

    pub fn has_property(&self, property: &str) -> bool {
        self.properties.contains_key(property)
    }
}
