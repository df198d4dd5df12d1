// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Views: per-group filtering, query-time aggregation and transformation
//!
//! A [`View`] is the declarative form carried by operations. Binding it
//! against a schema and a user produces a [`ResolvedView`]: the included
//! groups, each with its filters, resolved transform functions and the
//! aggregators needed for query-time grouping. Binding happens before any
//! store is touched, so configuration errors surface first.

pub mod engine;
pub mod filter;

pub use engine::{ElementStream, ViewEngine};
pub use filter::{ElementFilter, ElementTransformer, FilterComponent, ResolvedTransformer, TransformComponent};

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::error::{Access, GraphError};
use crate::functions::{BinaryOperator, FunctionRegistry};
use crate::schema::{Schema, SchemaError};
use crate::storage::ValueClass;
use crate::user::User;

/// Per-group view settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ViewElementDefinition {
    /// `Some` enables query-time aggregation keeping these properties apart
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_aggregation_filter: Option<ElementFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_aggregation_filter: Option<ElementFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformer: Option<ElementTransformer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_transform_filter: Option<ElementFilter>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub transient_properties: BTreeMap<String, ValueClass>,
    /// Whitelist of properties to return
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_properties: Vec<String>,
}

impl ViewElementDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group_by<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by = Some(properties.into_iter().map(Into::into).collect());
        self
    }

    pub fn pre_aggregation_filter(mut self, filter: ElementFilter) -> Self {
        self.pre_aggregation_filter = Some(filter);
        self
    }

    pub fn post_aggregation_filter(mut self, filter: ElementFilter) -> Self {
        self.post_aggregation_filter = Some(filter);
        self
    }

    pub fn transient_property(mut self, name: impl Into<String>, class: ValueClass) -> Self {
        self.transient_properties.insert(name.into(), class);
        self
    }

    pub fn transformer(mut self, transformer: ElementTransformer) -> Self {
        self.transformer = Some(transformer);
        self
    }

    pub fn post_transform_filter(mut self, filter: ElementFilter) -> Self {
        self.post_transform_filter = Some(filter);
        self
    }

    pub fn properties<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.properties = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn exclude_properties<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_properties = names.into_iter().map(Into::into).collect();
        self
    }

    /// Layer this group definition over the global one; group settings win
    fn merged_over(&self, global: &ViewElementDefinition) -> ViewElementDefinition {
        fn concat<T: Clone>(first: &Option<T>, second: &Option<T>, join: impl Fn(T, T) -> T) -> Option<T> {
            match (first, second) {
                (Some(a), Some(b)) => Some(join(a.clone(), b.clone())),
                (Some(a), None) => Some(a.clone()),
                (None, b) => b.clone(),
            }
        }
        let mut transient = global.transient_properties.clone();
        transient.extend(self.transient_properties.clone());
        let mut exclude = global.exclude_properties.clone();
        exclude.extend(self.exclude_properties.iter().cloned());
        ViewElementDefinition {
            group_by: self.group_by.clone().or_else(|| global.group_by.clone()),
            pre_aggregation_filter: concat(&global.pre_aggregation_filter, &self.pre_aggregation_filter, ElementFilter::and),
            post_aggregation_filter: concat(
                &global.post_aggregation_filter,
                &self.post_aggregation_filter,
                ElementFilter::and,
            ),
            transformer: concat(&global.transformer, &self.transformer, ElementTransformer::and),
            post_transform_filter: concat(&global.post_transform_filter, &self.post_transform_filter, ElementFilter::and),
            transient_properties: transient,
            properties: self.properties.clone().or_else(|| global.properties.clone()),
            exclude_properties: exclude,
        }
    }
}

/// Which groups a query returns and how each is processed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct View {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub entities: BTreeMap<String, ViewElementDefinition>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub edges: BTreeMap<String, ViewElementDefinition>,
    /// Settings applied to every included group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_elements: Option<ViewElementDefinition>,
    #[serde(default)]
    pub all_entities: bool,
    #[serde(default)]
    pub all_edges: bool,
}

impl View {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every group in the schema, unmodified
    pub fn all() -> Self {
        Self::default()
    }

    pub fn entity(mut self, group: impl Into<String>, definition: ViewElementDefinition) -> Self {
        self.entities.insert(group.into(), definition);
        self
    }

    pub fn edge(mut self, group: impl Into<String>, definition: ViewElementDefinition) -> Self {
        self.edges.insert(group.into(), definition);
        self
    }

    pub fn global(mut self, definition: ViewElementDefinition) -> Self {
        self.global_elements = Some(definition);
        self
    }

    pub fn all_entities(mut self) -> Self {
        self.all_entities = true;
        self
    }

    pub fn all_edges(mut self) -> Self {
        self.all_edges = true;
        self
    }

    /// True when no group is named and no `all_*` flag is set
    pub fn is_unrestricted(&self) -> bool {
        self.entities.is_empty() && self.edges.is_empty() && !self.all_entities && !self.all_edges
    }

    /// Bind against a schema for a user.
    ///
    /// Groups named explicitly must be readable by the user; groups pulled in
    /// implicitly (unrestricted view or `all_*` flags) are silently skipped
    /// when unreadable.
    pub fn resolve(
        &self,
        schema: &Schema,
        registry: &FunctionRegistry,
        user: &User,
        position: usize,
    ) -> Result<ResolvedView, GraphError> {
        let mut included: Vec<(&str, Option<&ViewElementDefinition>)> = Vec::new();
        let unrestricted = self.is_unrestricted();

        for (groups, all, is_kind) in [
            (&self.entities, self.all_entities, Schema::is_entity as fn(&Schema, &str) -> bool),
            (&self.edges, self.all_edges, Schema::is_edge),
        ] {
            for (group, definition) in groups {
                if !is_kind(schema, group) {
                    return Err(GraphError::Schema(SchemaError::UnknownGroup(group.clone())));
                }
                if !schema.is_readable(group, user) {
                    return Err(GraphError::Authorization {
                        position,
                        user: user.user_id.clone(),
                        group: group.clone(),
                        access: Access::Read,
                    });
                }
                included.push((group.as_str(), Some(definition)));
            }
            if all || unrestricted {
                let implicit: Vec<&str> = schema
                    .groups()
                    .filter(|g| is_kind(schema, *g) && !groups.contains_key(*g))
                    .collect();
                for group in implicit {
                    if schema.is_readable(group, user) {
                        included.push((group, None));
                    } else {
                        debug!("Skipping unreadable group '{}' for user '{}'", group, user.user_id);
                    }
                }
            }
        }

        let empty = ViewElementDefinition::default();
        let global = self.global_elements.as_ref().unwrap_or(&empty);
        let mut groups = BTreeMap::new();
        for (group, definition) in included {
            let merged = definition.unwrap_or(&empty).merged_over(global);
            groups.insert(group.to_string(), resolve_group(schema, registry, group, merged)?);
        }
        Ok(ResolvedView { groups })
    }
}

fn resolve_group(
    schema: &Schema,
    registry: &FunctionRegistry,
    group: &str,
    definition: ViewElementDefinition,
) -> Result<ResolvedGroupView, GraphError> {
    let resolved = schema
        .group(group)
        .ok_or_else(|| GraphError::Schema(SchemaError::UnknownGroup(group.to_string())))?;
    let invalid = |message: String| GraphError::InvalidOperation(format!("view of group '{}': {}", group, message));

    for name in definition.transient_properties.keys() {
        if resolved.has_property(name) {
            return Err(invalid(format!("transient property '{}' clashes with a schema property", name)));
        }
    }

    let mut aggregators = BTreeMap::new();
    if let Some(columns) = &definition.group_by {
        for column in columns {
            if !resolved.has_property(column) {
                return Err(invalid(format!("groupBy property '{}' is not declared", column)));
            }
        }
        for name in resolved.properties.keys().filter(|p| !columns.contains(*p)) {
            let aggregator = resolved
                .aggregator(name)
                .ok_or_else(|| invalid(format!("property '{}' has no aggregator", name)))?;
            aggregators.insert(name.clone(), Arc::clone(aggregator));
        }
    }

    let transformer = match &definition.transformer {
        Some(t) => t.resolve(registry)?,
        None => ResolvedTransformer::default(),
    };

    Ok(ResolvedGroupView {
        group_by: definition.group_by,
        aggregators,
        pre_aggregation_filter: definition.pre_aggregation_filter.filter(|f| !f.is_empty()),
        post_aggregation_filter: definition.post_aggregation_filter.filter(|f| !f.is_empty()),
        transformer,
        post_transform_filter: definition.post_transform_filter.filter(|f| !f.is_empty()),
        transient_properties: definition.transient_properties,
        properties: definition.properties.map(|p| p.into_iter().collect()),
        exclude_properties: definition.exclude_properties.into_iter().collect(),
    })
}

/// One group's view after binding
#[derive(Debug, Clone)]
pub struct ResolvedGroupView {
    pub group_by: Option<Vec<String>>,
    pub aggregators: BTreeMap<String, Arc<dyn BinaryOperator>>,
    pub pre_aggregation_filter: Option<ElementFilter>,
    pub post_aggregation_filter: Option<ElementFilter>,
    pub transformer: ResolvedTransformer,
    pub post_transform_filter: Option<ElementFilter>,
    pub transient_properties: BTreeMap<String, ValueClass>,
    pub properties: Option<BTreeSet<String>>,
    pub exclude_properties: BTreeSet<String>,
}

impl ResolvedGroupView {
    pub fn aggregates(&self) -> bool {
        self.group_by.is_some()
    }
}

/// A view bound to a schema and user
#[derive(Debug, Clone, Default)]
pub struct ResolvedView {
    groups: BTreeMap<String, ResolvedGroupView>,
}

impl ResolvedView {
    pub fn group(&self, group: &str) -> Option<&ResolvedGroupView> {
        self.groups.get(group)
    }

    pub fn groups(&self) -> BTreeSet<String> {
        self.groups.keys().cloned().collect()
    }

    pub fn contains(&self, group: &str) -> bool {
        self.groups.contains_key(group)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
