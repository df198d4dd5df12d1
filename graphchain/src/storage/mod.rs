// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Graph data model and storage
//!
//! This module provides:
//! - Value type system for vertices and properties
//! - Entities, edges and the seeds used to look them up
//! - The pluggable `Store` trait with paged, leased cursors
//! - An in-memory store that aggregates elements on ingest

pub mod element;
pub mod memory;
pub mod store;
pub mod value;

pub use element::{
    DirectedType, Edge, EdgeSeed, Element, ElementId, Entity, EntitySeed, IdentifierType, MatchedVertex,
    Properties,
};
pub use memory::MemoryStore;
pub use store::{
    create_store, CursorLease, GetAllOptions, IncludeIncomingOutgoing, ResourceTracker, SeedMatching, SeedOptions,
    Store, StoreCursor, StoreError, StoreStats,
};
pub use value::{Value, ValueClass};
