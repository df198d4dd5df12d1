// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Element filters and transformers

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::functions::{Function, FunctionError, FunctionRegistry, Predicate, TransformFunction};
use crate::storage::{Element, Value};

fn select(element: &Element, selection: &[String]) -> Vec<Value> {
    selection.iter().map(|name| element.selection(name)).collect()
}

/// A predicate applied to selected identifiers or properties
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilterComponent {
    pub selection: Vec<String>,
    pub predicate: Predicate,
}

/// Conjunction of predicates over element selections
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ElementFilter {
    #[serde(default)]
    pub components: Vec<FilterComponent>,
}

impl ElementFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a predicate over the named selections
    pub fn with<I, S>(mut self, selection: I, predicate: Predicate) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.components.push(FilterComponent {
            selection: selection.into_iter().map(Into::into).collect(),
            predicate,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Append another filter's components after this one's
    pub fn and(mut self, other: ElementFilter) -> Self {
        self.components.extend(other.components);
        self
    }

    pub fn test(&self, element: &Element) -> Result<bool, FunctionError> {
        for component in &self.components {
            if !component.predicate.test(&select(element, &component.selection))? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// A function over selected values whose output is written to the projection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransformComponent {
    pub selection: Vec<String>,
    pub function: Function,
    pub projection: Vec<String>,
}

/// Ordered list of transform components
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ElementTransformer {
    #[serde(default)]
    pub components: Vec<TransformComponent>,
}

impl ElementTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<I, S, P, Q>(mut self, selection: I, function: Function, projection: P) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        P: IntoIterator<Item = Q>,
        Q: Into<String>,
    {
        self.components.push(TransformComponent {
            selection: selection.into_iter().map(Into::into).collect(),
            function,
            projection: projection.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn and(mut self, other: ElementTransformer) -> Self {
        self.components.extend(other.components);
        self
    }

    /// Resolve custom functions so applying the transformer needs no lookups
    pub fn resolve(&self, registry: &FunctionRegistry) -> Result<ResolvedTransformer, FunctionError> {
        let mut steps = Vec::with_capacity(self.components.len());
        for component in &self.components {
            if component.projection.is_empty() {
                return Err(FunctionError::InvalidConfig(format!(
                    "transform {} has no projection",
                    component.function.name()
                )));
            }
            steps.push(ResolvedTransform {
                selection: component.selection.clone(),
                function: registry.resolve_function(&component.function)?,
                projection: component.projection.clone(),
            });
        }
        Ok(ResolvedTransformer { steps })
    }

    /// Property names written by this transformer
    pub fn projections(&self) -> impl Iterator<Item = &str> {
        self.components
            .iter()
            .flat_map(|c| c.projection.iter().map(String::as_str))
    }
}

#[derive(Debug, Clone)]
struct ResolvedTransform {
    selection: Vec<String>,
    function: Arc<dyn TransformFunction>,
    projection: Vec<String>,
}

/// Transformer with its functions resolved
#[derive(Debug, Clone, Default)]
pub struct ResolvedTransformer {
    steps: Vec<ResolvedTransform>,
}

impl ResolvedTransformer {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn apply(&self, element: &mut Element) -> Result<(), FunctionError> {
        for step in &self.steps {
            let output = step.function.apply(&select(element, &step.selection))?;
            match (step.projection.as_slice(), output) {
                ([name], value) => element.set_property(name.clone(), value),
                (names, Value::List(values)) if names.len() == values.len() => {
                    for (name, value) in names.iter().zip(values) {
                        element.set_property(name.clone(), value);
                    }
                }
                (names, other) => {
                    return Err(FunctionError::InvalidInput {
                        function: format!("{:?}", step.function),
                        message: format!("cannot project {} onto {} properties", other, names.len()),
                    })
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Entity;
    use std::collections::BTreeMap;

    fn junction() -> Element {
        let mut counts = BTreeMap::new();
        counts.insert("BUS".to_string(), 1200i64);
        counts.insert("CAR".to_string(), 40i64);
        Entity::new("JunctionUse", "M32:2")
            .with_property("countByVehicleType", counts)
            .with_property("count", 1240i64)
            .into()
    }

    #[test]
    fn filter_requires_every_component() {
        let filter = ElementFilter::new()
            .with(["countByVehicleType"], Predicate::predicate_map("BUS", Predicate::is_more_than(1000i64)))
            .with(["VERTEX"], Predicate::regex("^M32").unwrap());
        assert!(filter.test(&junction()).unwrap());

        let stricter = filter.and(ElementFilter::new().with(["count"], Predicate::is_more_than(5000i64)));
        assert!(!stricter.test(&junction()).unwrap());
    }

    #[test]
    fn transformer_projects_outputs() {
        let transformer = ElementTransformer::new()
            .with(["countByVehicleType"], Function::freq_map_extractor("BUS"), ["busCount"])
            .resolve(&FunctionRegistry::new())
            .unwrap();
        let mut element = junction();
        transformer.apply(&mut element).unwrap();
        assert_eq!(element.property("busCount"), Some(&Value::Long(1200)));
    }

    #[test]
    fn transformer_needs_projection_and_known_functions() {
        let no_projection = ElementTransformer::new().with(["count"], Function::Identity, Vec::<String>::new());
        assert!(no_projection.resolve(&FunctionRegistry::new()).is_err());

        let custom = ElementTransformer::new().with(
            ["count"],
            Function::Custom {
                name: "double".to_string(),
            },
            ["twice"],
        );
        assert!(matches!(
            custom.resolve(&FunctionRegistry::new()),
            Err(FunctionError::Unknown { .. })
        ));
    }
}
