// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! graphchain - typed graph operation chains over a pluggable element store
//!
//! A graph is described by a [`Schema`] of entity and edge groups whose
//! properties aggregate on ingest. Callers query it by building an
//! [`OperationChain`]: a type-checked sequence of operations such as
//! `GetAdjacentIds`, `GetElements`, `Sort` and `ToCsv`, each consuming the
//! previous operation's lazy output. Views scope what every seeded
//! operation sees (filters, query-time aggregation, transforms, projection).
//!
//! ```text
//! OperationChain ──▶ Executor ──bind──▶ views / generators / sub-chains
//!                        │
//!                        └─run──▶ stage ─▶ stage ─▶ ... ─▶ ResultCursor
//!                                   ▲
//!                                 Store (paged, leased cursors)
//! ```
//!
//! # Module Organization
//!
//! - [`storage`] - values, elements, the `Store` trait and the memory store
//! - [`schema`] - group definitions, type definitions and validation
//! - [`functions`] - predicates, transforms, aggregators and sketches
//! - [`view`] - per-operation views and the view pipeline
//! - [`plan`] - operations and the chain builder
//! - [`exec`] - the executor and result cursors
//! - [`generator`] - records, element generators and CSV output

pub mod config;
pub mod error;
pub mod exec;
pub mod functions;
pub mod generator;
pub mod graph;
pub mod plan;
pub mod schema;
pub mod storage;
pub mod user;
pub mod view;

pub use config::{ConfigError, GraphConfig, StoreProperties, StoreType};
pub use error::{Access, GraphError, GraphResult};
pub use exec::{Context, ForEachFailure, Item, Output, ResultCursor};
pub use functions::{AggregateFunction, Function, FunctionError, FunctionRegistry, Predicate, SketchValue};
pub use generator::{records_from_csv, CsvGenerator, ElementGenerator, Record};
pub use graph::{Graph, GraphBuilder};
pub use plan::{Operation, OperationChain, OperationChainBuilder};
pub use schema::{ElementDefinition, Schema, SchemaError, TypeDefinition};
pub use storage::{
    DirectedType, Edge, EdgeSeed, Element, ElementId, Entity, EntitySeed, Store, StoreError, StoreStats, Value,
    ValueClass,
};
pub use user::User;
pub use view::{ElementFilter, ElementTransformer, View, ViewElementDefinition};
