// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Graph entry point
//!
//! A [`Graph`] ties a validated schema, a store and the function registry
//! together. It is assembled once through [`GraphBuilder`] and is immutable
//! afterwards; share it behind an `Arc` to run chains from several threads.

use log::info;
use std::path::Path;
use std::sync::Arc;

use crate::config::{GraphConfig, StoreProperties};
use crate::error::GraphError;
use crate::exec::{Context, Executor, Output};
use crate::functions::{BinaryOperator, FunctionRegistry, TransformFunction};
use crate::generator::ElementGenerator;
use crate::plan::OperationChain;
use crate::schema::{Schema, SchemaError};
use crate::storage::{create_store, Store, StoreStats};
use crate::user::User;

#[derive(Debug)]
pub struct Graph {
    config: GraphConfig,
    executor: Executor,
}

impl Graph {
    pub fn builder() -> GraphBuilder {
        GraphBuilder::default()
    }

    pub fn graph_id(&self) -> &str {
        &self.config.graph_id
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn schema(&self) -> &Arc<Schema> {
        self.executor.store().schema()
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        self.executor.store()
    }

    pub fn stats(&self) -> StoreStats {
        self.store().stats()
    }

    /// Run a chain on behalf of `user` with a fresh context
    pub fn execute(&self, chain: &OperationChain, user: &User) -> Result<Output, GraphError> {
        self.execute_with(chain, &Context::new(user.clone()))
    }

    /// Run a chain with a caller-owned context, e.g. to inspect ForEach
    /// failures afterwards
    pub fn execute_with(&self, chain: &OperationChain, ctx: &Context) -> Result<Output, GraphError> {
        self.executor.execute(chain, ctx)
    }
}

/// Assembles a [`Graph`], validating everything in `build`
#[derive(Default)]
pub struct GraphBuilder {
    config: Option<GraphConfig>,
    schemas: Vec<Schema>,
    store_properties: Option<StoreProperties>,
    registry: FunctionRegistry,
}

impl GraphBuilder {
    pub fn config(mut self, config: GraphConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Add a schema; several schemas are merged in the order given
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schemas.push(schema);
        self
    }

    pub fn schema_files<P: AsRef<Path>>(mut self, paths: &[P]) -> Result<Self, SchemaError> {
        self.schemas.push(Schema::from_json_files(paths)?);
        Ok(self)
    }

    pub fn store_properties(mut self, properties: StoreProperties) -> Self {
        self.store_properties = Some(properties);
        self
    }

    pub fn register_aggregator(mut self, name: impl Into<String>, operator: Arc<dyn BinaryOperator>) -> Self {
        self.registry.register_aggregator(name, operator);
        self
    }

    pub fn register_function(mut self, name: impl Into<String>, function: Arc<dyn TransformFunction>) -> Self {
        self.registry.register_function(name, function);
        self
    }

    pub fn register_generator(mut self, name: impl Into<String>, generator: Arc<dyn ElementGenerator>) -> Self {
        self.registry.register_generator(name, generator);
        self
    }

    pub fn build(self) -> Result<Graph, GraphError> {
        let config = self.config.unwrap_or_default();
        let properties = self.store_properties.unwrap_or_default();
        properties.validate()?;

        let mut schemas = self.schemas.into_iter();
        let first = schemas
            .next()
            .ok_or_else(|| GraphError::InvalidOperation("a graph needs a schema".to_string()))?;
        let merged = schemas.try_fold(first, Schema::merge)?;
        let schema = Arc::new(merged.validate(&self.registry)?);

        let store = create_store(schema.clone(), properties)?;
        info!(
            "Graph '{}' ready: {} entity group(s), {} edge group(s), {} store",
            config.graph_id,
            schema.entity_groups().count(),
            schema.edge_groups().count(),
            store.properties().store_type
        );
        Ok(Graph {
            config,
            executor: Executor::new(store, Arc::new(self.registry)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::plan::{AddElements, GetAllElements, Operation};
    use crate::schema::{ElementDefinition, TypeDefinition};
    use crate::storage::{Entity, Value, ValueClass};

    fn schema() -> Schema {
        Schema::new()
            .type_definition("vertex", TypeDefinition::new(ValueClass::String))
            .entity("Road", ElementDefinition::entity("vertex"))
    }

    #[test]
    fn builds_and_executes() {
        let graph = Graph::builder()
            .config(GraphConfig::new("roads"))
            .schema(schema())
            .build()
            .unwrap();
        assert_eq!(graph.graph_id(), "roads");

        let user = User::new("user01");
        let add = OperationChain::of(AddElements::new().input([Entity::new("Road", "M5")])).unwrap();
        assert!(graph.execute(&add, &user).unwrap().is_void());

        let count = OperationChain::builder()
            .first(GetAllElements::new())
            .then(Operation::Count)
            .build()
            .unwrap();
        assert_eq!(graph.execute(&count, &user).unwrap().into_values().unwrap(), vec![Value::Long(1)]);
        assert_eq!(graph.stats().open_cursors, 0);
    }

    #[test]
    fn requires_a_schema() {
        assert!(Graph::builder().build().is_err());
    }

    #[test]
    fn rejects_bad_store_properties() {
        let result = Graph::builder()
            .schema(schema())
            .store_properties(StoreProperties {
                page_size: 0,
                ..Default::default()
            })
            .build();
        assert!(matches!(result, Err(GraphError::Config(ConfigError::Invalid(_)))));
    }

    #[test]
    fn merges_schemas() {
        let edges = Schema::new()
            .type_definition("vertex", TypeDefinition::new(ValueClass::String))
            .edge(
                "RoadUse",
                ElementDefinition::edge("vertex", "vertex", crate::storage::DirectedType::Directed),
            );
        let graph = Graph::builder().schema(schema()).schema(edges).build().unwrap();
        assert!(graph.schema().is_entity("Road"));
        assert!(graph.schema().is_edge("RoadUse"));
    }
}
