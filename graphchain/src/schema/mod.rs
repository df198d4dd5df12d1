// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Schema registry
//!
//! A schema declares the entity and edge groups of a graph, the property
//! types of each group and how properties aggregate. It is loaded from one or
//! more JSON documents, merged, then validated once against a
//! [`FunctionRegistry`]. Validation resolves every type reference and
//! aggregator so element processing never looks anything up by name.

pub mod definition;

pub use definition::{
    ElementDefinition, GroupKind, ResolvedGroup, ResolvedProperty, TypeDefinition,
};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::functions::{BinaryOperator, FunctionError, FunctionRegistry, Predicate};
use crate::storage::{Element, IdentifierType, Value};
use crate::user::User;

/// Error type for schema loading, validation and element checks
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to parse schema: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to read schema file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Group '{0}' is defined more than once")]
    DuplicateGroup(String),

    #[error("Group '{group}' references unknown type '{type_name}'")]
    UnknownType { group: String, type_name: String },

    #[error("Unknown group '{0}'")]
    UnknownGroup(String),

    #[error("Invalid definition for group '{group}': {message}")]
    InvalidDefinition { group: String, message: String },

    #[error("Failed to resolve function: {0}")]
    Function(#[from] FunctionError),

    #[error("Invalid element of group '{group}': {message}")]
    InvalidElement { group: String, message: String },

    #[error("Schema has not been validated")]
    NotValidated,
}

/// Graph schema: groups and the property types they use
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub entities: BTreeMap<String, ElementDefinition>,
    #[serde(default)]
    pub edges: BTreeMap<String, ElementDefinition>,
    #[serde(default)]
    pub types: BTreeMap<String, TypeDefinition>,
    #[serde(skip)]
    resolved: Option<BTreeMap<String, ResolvedGroup>>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Load and merge several schema files
    pub fn from_json_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self, SchemaError> {
        paths.iter().try_fold(Schema::new(), |schema, path| {
            schema.merge(Schema::from_json_file(path)?)
        })
    }

    pub fn entity(mut self, group: impl Into<String>, definition: ElementDefinition) -> Self {
        self.entities.insert(group.into(), definition);
        self.resolved = None;
        self
    }

    pub fn edge(mut self, group: impl Into<String>, definition: ElementDefinition) -> Self {
        self.edges.insert(group.into(), definition);
        self.resolved = None;
        self
    }

    pub fn type_definition(mut self, name: impl Into<String>, definition: TypeDefinition) -> Self {
        self.types.insert(name.into(), definition);
        self.resolved = None;
        self
    }

    /// Combine two schemas. Identical redefinitions are allowed; conflicting ones are not.
    pub fn merge(mut self, other: Schema) -> Result<Schema, SchemaError> {
        for (group, definition) in other.entities {
            merge_entry(&mut self.entities, group, definition, |g| SchemaError::DuplicateGroup(g.clone()))?;
        }
        for (group, definition) in other.edges {
            merge_entry(&mut self.edges, group, definition, |g| SchemaError::DuplicateGroup(g.clone()))?;
        }
        for (name, definition) in other.types {
            merge_entry(&mut self.types, name, definition, |name| SchemaError::InvalidDefinition {
                group: name.clone(),
                message: format!("type '{}' is defined differently in two schemas", name),
            })?;
        }
        self.resolved = None;
        Ok(self)
    }

    /// Resolve types and aggregators, checking the schema is consistent
    pub fn validate(mut self, registry: &FunctionRegistry) -> Result<Schema, SchemaError> {
        let mut resolved = BTreeMap::new();
        for (group, definition) in &self.entities {
            if self.edges.contains_key(group) {
                return Err(SchemaError::DuplicateGroup(group.clone()));
            }
            let vertex = definition.vertex.as_deref().ok_or_else(|| SchemaError::InvalidDefinition {
                group: group.clone(),
                message: "entity definitions need a vertex type".to_string(),
            })?;
            let identifiers = [vertex];
            let group_def = self.resolve_group(group, GroupKind::Entity, definition, &identifiers, registry)?;
            resolved.insert(group.clone(), group_def);
        }
        for (group, definition) in &self.edges {
            let (source, destination) = match (definition.source.as_deref(), definition.destination.as_deref()) {
                (Some(s), Some(d)) => (s, d),
                _ => {
                    return Err(SchemaError::InvalidDefinition {
                        group: group.clone(),
                        message: "edge definitions need source and destination types".to_string(),
                    })
                }
            };
            let identifiers = [source, destination];
            let group_def = self.resolve_group(group, GroupKind::Edge, definition, &identifiers, registry)?;
            resolved.insert(group.clone(), group_def);
        }
        info!(
            "Validated schema with {} entity group(s), {} edge group(s) and {} type(s)",
            self.entities.len(),
            self.edges.len(),
            self.types.len()
        );
        self.resolved = Some(resolved);
        Ok(self)
    }

    fn resolve_group(
        &self,
        group: &str,
        kind: GroupKind,
        definition: &ElementDefinition,
        identifiers: &[&str],
        registry: &FunctionRegistry,
    ) -> Result<ResolvedGroup, SchemaError> {
        let mut identifier_classes = Vec::new();
        let mut identifier_validators = Vec::new();
        for type_name in identifiers {
            let type_def = self.type_def(group, type_name)?;
            identifier_classes.push(type_def.class);
            identifier_validators.push(type_def.validate_functions.clone());
        }

        let mut properties = BTreeMap::new();
        for (name, type_name) in &definition.properties {
            if IdentifierType::from_name(name).is_some() {
                return Err(SchemaError::InvalidDefinition {
                    group: group.to_string(),
                    message: format!("property name '{}' is reserved", name),
                });
            }
            let type_def = self.type_def(group, type_name)?;
            let aggregator = type_def
                .aggregate_function
                .as_ref()
                .map(|function| registry.resolve_aggregator(function))
                .transpose()?;
            if definition.aggregate && aggregator.is_none() && !definition.group_by.contains(name) {
                return Err(SchemaError::InvalidDefinition {
                    group: group.to_string(),
                    message: format!(
                        "property '{}' (type '{}') has no aggregate function but the group aggregates",
                        name, type_name
                    ),
                });
            }
            properties.insert(
                name.clone(),
                ResolvedProperty {
                    type_name: type_name.clone(),
                    class: type_def.class,
                    aggregator,
                    validators: type_def.validate_functions.clone(),
                },
            );
        }

        for name in &definition.group_by {
            if !properties.contains_key(name) {
                return Err(SchemaError::InvalidDefinition {
                    group: group.to_string(),
                    message: format!("groupBy property '{}' is not declared", name),
                });
            }
        }
        debug!("Resolved {:?} group '{}' with {} properties", kind, group, properties.len());

        Ok(ResolvedGroup {
            name: group.to_string(),
            kind,
            identifier_classes,
            identifier_validators,
            directed: definition.directed,
            properties,
            group_by: definition.group_by.clone(),
            aggregate: definition.aggregate,
            read_auths: definition.read_auths.clone(),
            write_auths: definition.write_auths.clone(),
        })
    }

    fn type_def(&self, group: &str, type_name: &str) -> Result<&TypeDefinition, SchemaError> {
        self.types.get(type_name).ok_or_else(|| SchemaError::UnknownType {
            group: group.to_string(),
            type_name: type_name.to_string(),
        })
    }

    pub fn is_validated(&self) -> bool {
        self.resolved.is_some()
    }

    /// Resolved definition of a group; `None` for unknown groups or an unvalidated schema
    pub fn group(&self, group: &str) -> Option<&ResolvedGroup> {
        self.resolved.as_ref().and_then(|groups| groups.get(group))
    }

    /// Declared definition of a group
    pub fn element(&self, group: &str) -> Option<&ElementDefinition> {
        self.entities.get(group).or_else(|| self.edges.get(group))
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.entities.contains_key(group) || self.edges.contains_key(group)
    }

    pub fn is_entity(&self, group: &str) -> bool {
        self.entities.contains_key(group)
    }

    pub fn is_edge(&self, group: &str) -> bool {
        self.edges.contains_key(group)
    }

    pub fn entity_groups(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    pub fn edge_groups(&self) -> impl Iterator<Item = &str> {
        self.edges.keys().map(String::as_str)
    }

    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.entity_groups().chain(self.edge_groups())
    }

    /// Aggregator of a property, resolved during validation
    pub fn aggregator(&self, group: &str, property: &str) -> Option<&Arc<dyn BinaryOperator>> {
        self.group(group).and_then(|g| g.aggregator(property))
    }

    pub fn is_readable(&self, group: &str, user: &User) -> bool {
        self.element(group).map(|d| user.has_all(&d.read_auths)).unwrap_or(false)
    }

    pub fn is_writable(&self, group: &str, user: &User) -> bool {
        self.element(group).map(|d| user.has_all(&d.write_auths)).unwrap_or(false)
    }

    /// Check an element against its group definition
    pub fn validate_element(&self, element: &Element) -> Result<(), SchemaError> {
        let resolved = self.resolved.as_ref().ok_or(SchemaError::NotValidated)?;
        let group = element.group();
        let definition = resolved
            .get(group)
            .ok_or_else(|| SchemaError::UnknownGroup(group.to_string()))?;
        let invalid = |message: String| SchemaError::InvalidElement {
            group: group.to_string(),
            message,
        };

        let identifiers: Vec<&Value> = match (element, definition.kind) {
            (Element::Entity(entity), GroupKind::Entity) => vec![&entity.vertex],
            (Element::Edge(edge), GroupKind::Edge) => {
                if !definition.directed.accepts(edge.directed) {
                    return Err(invalid(format!(
                        "edge directed={} does not match {:?}",
                        edge.directed, definition.directed
                    )));
                }
                vec![&edge.source, &edge.destination]
            }
            (_, kind) => return Err(invalid(format!("element is not an {:?}", kind).to_lowercase())),
        };
        for ((value, class), validators) in identifiers
            .iter()
            .zip(&definition.identifier_classes)
            .zip(&definition.identifier_validators)
        {
            if value.is_null() || !class.accepts(value) {
                return Err(invalid(format!("identifier {} is not a valid {}", value, class)));
            }
            run_validators(validators, value).map_err(|m| invalid(format!("identifier {}: {}", value, m)))?;
        }

        for (name, value) in element.properties() {
            let property = definition
                .properties
                .get(name)
                .ok_or_else(|| invalid(format!("undeclared property '{}'", name)))?;
            if !property.class.accepts(value) {
                return Err(invalid(format!(
                    "property '{}' expects {} but was {}",
                    name, property.class, value
                )));
            }
            if !value.is_null() {
                run_validators(&property.validators, value)
                    .map_err(|m| invalid(format!("property '{}': {}", name, m)))?;
            }
        }
        Ok(())
    }
}

fn run_validators(validators: &[Predicate], value: &Value) -> Result<(), String> {
    for predicate in validators {
        match predicate.test(std::slice::from_ref(value)) {
            Ok(true) => {}
            Ok(false) => return Err(format!("failed {}", predicate.name())),
            Err(e) => return Err(e.to_string()),
        }
    }
    Ok(())
}

fn merge_entry<T: PartialEq>(
    map: &mut BTreeMap<String, T>,
    key: String,
    value: T,
    conflict: impl Fn(&String) -> SchemaError,
) -> Result<(), SchemaError> {
    match map.get(&key) {
        Some(existing) if *existing != value => Err(conflict(&key)),
        Some(_) => Ok(()),
        None => {
            map.insert(key, value);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::AggregateFunction;
    use crate::storage::{DirectedType, Edge, Entity, ValueClass};

    fn road_schema() -> Schema {
        Schema::new()
            .type_definition("junction", TypeDefinition::new(ValueClass::String))
            .type_definition(
                "count",
                TypeDefinition::new(ValueClass::Long)
                    .aggregated_by(AggregateFunction::Sum)
                    .validated_by(Predicate::is_more_than(-1i64)),
            )
            .type_definition("date", TypeDefinition::new(ValueClass::Date).aggregated_by(AggregateFunction::Min))
            .entity(
                "JunctionUse",
                ElementDefinition::entity("junction")
                    .property("count", "count")
                    .property("startDate", "date")
                    .group_by(["startDate"])
                    .read_auths(["public"]),
            )
            .edge(
                "RoadUse",
                ElementDefinition::edge("junction", "junction", DirectedType::Directed).property("count", "count"),
            )
    }

    #[test]
    fn validates_and_resolves_aggregators() {
        let schema = road_schema().validate(&FunctionRegistry::new()).unwrap();
        assert!(schema.is_validated());
        let sum = schema.aggregator("JunctionUse", "count").unwrap();
        assert_eq!(sum.apply(Value::Long(2), Value::Long(3)).unwrap(), Value::Long(5));
        assert_eq!(schema.groups().collect::<Vec<_>>(), vec!["JunctionUse", "RoadUse"]);
    }

    #[test]
    fn rejects_unknown_types_and_missing_aggregators() {
        let schema = road_schema().entity("Bad", ElementDefinition::entity("nope"));
        assert!(matches!(
            schema.validate(&FunctionRegistry::new()),
            Err(SchemaError::UnknownType { .. })
        ));

        let schema = road_schema()
            .type_definition("label", TypeDefinition::new(ValueClass::String))
            .entity("Labelled", ElementDefinition::entity("junction").property("label", "label"));
        assert!(matches!(
            schema.validate(&FunctionRegistry::new()),
            Err(SchemaError::InvalidDefinition { .. })
        ));
    }

    #[test]
    fn non_aggregating_groups_need_no_aggregators() {
        let mut definition = ElementDefinition::entity("junction").property("label", "label");
        definition.aggregate = false;
        let schema = road_schema()
            .type_definition("label", TypeDefinition::new(ValueClass::String))
            .entity("Labelled", definition);
        assert!(schema.validate(&FunctionRegistry::new()).is_ok());
    }

    #[test]
    fn validates_elements() {
        let schema = road_schema().validate(&FunctionRegistry::new()).unwrap();
        let good: Element = Entity::new("JunctionUse", "M32:2").with_property("count", 3i64).into();
        assert!(schema.validate_element(&good).is_ok());

        let negative: Element = Entity::new("JunctionUse", "M32:2").with_property("count", -3i64).into();
        assert!(schema.validate_element(&negative).is_err());

        let wrong_type: Element = Entity::new("JunctionUse", "M32:2").with_property("count", "three").into();
        assert!(schema.validate_element(&wrong_type).is_err());

        let undirected: Element = Edge::new("RoadUse", "A", "B", false).into();
        assert!(schema.validate_element(&undirected).is_err());

        let unknown: Element = Entity::new("Nope", "x").into();
        assert!(matches!(schema.validate_element(&unknown), Err(SchemaError::UnknownGroup(_))));
    }

    #[test]
    fn merges_and_detects_conflicts() {
        let a = Schema::from_json(r#"{"types": {"s": {"class": "String"}}, "entities": {"A": {"vertex": "s"}}}"#).unwrap();
        let b = Schema::from_json(r#"{"types": {"s": {"class": "String"}}, "entities": {"B": {"vertex": "s"}}}"#).unwrap();
        let merged = a.clone().merge(b).unwrap();
        assert_eq!(merged.entities.len(), 2);

        let conflict = Schema::from_json(r#"{"types": {"s": {"class": "Long"}}}"#).unwrap();
        assert!(a.merge(conflict).is_err());
    }

    #[test]
    fn auths_gate_groups() {
        let schema = road_schema();
        assert!(!schema.is_readable("JunctionUse", &User::new("anon")));
        assert!(schema.is_readable("JunctionUse", &User::with_auths("u", ["public"])));
        assert!(schema.is_readable("RoadUse", &User::new("anon")));
        assert!(!schema.is_readable("Missing", &User::new("anon")));
        assert!(schema.is_writable("JunctionUse", &User::new("anon")));
    }
}
