// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Store abstraction used by the executor
//!
//! A store ingests elements (aggregating them as the schema says) and hands
//! back lazy cursors over the elements matching a set of seeds. Every cursor
//! holds a lease on the store's resource tracker; the lease is returned when
//! the cursor is exhausted, closed or dropped.

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;

use super::memory::MemoryStore;
use super::{DirectedType, Element, ElementId};
use crate::config::{StoreProperties, StoreType};
use crate::functions::FunctionError;
use crate::schema::Schema;

/// Error type for store operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to aggregate property '{property}' of group '{group}': {source}")]
    Aggregation {
        group: String,
        property: String,
        #[source]
        source: FunctionError,
    },

    #[error("Group '{group}' has no aggregator for property '{property}'")]
    MissingAggregator { group: String, property: String },

    #[error("Unknown group '{0}'")]
    UnknownGroup(String),

    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Which edges to return for an entity seed, by the end that matched
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncludeIncomingOutgoing {
    #[default]
    Either,
    /// Directed edges whose destination is the seed
    Incoming,
    /// Directed edges whose source is the seed
    Outgoing,
}

/// How seeds are matched against stored elements
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeedMatching {
    /// Entities and edges touching the seed
    #[default]
    Related,
    /// Only elements whose id equals the seed
    Equal,
}

/// Options for seeded lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeedOptions {
    pub directed_type: DirectedType,
    pub include_incoming_outgoing: IncludeIncomingOutgoing,
    pub seed_matching: SeedMatching,
}

impl SeedOptions {
    pub fn accepts_direction(&self, directed: bool) -> bool {
        self.directed_type.accepts(directed)
    }
}

/// Options for full scans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GetAllOptions {
    pub directed_type: DirectedType,
}

/// Resource accounting snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreStats {
    /// Cursors handed out and not yet released
    pub open_cursors: usize,
    /// Cursors released so far
    pub released_cursors: usize,
    /// Pages read from the backend
    pub pages_fetched: usize,
}

/// Counts cursor leases and page reads
#[derive(Debug, Default)]
pub struct ResourceTracker {
    opened: AtomicUsize,
    released: AtomicUsize,
    pages: AtomicUsize,
}

impl ResourceTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Hand out a lease for a newly opened cursor
    pub fn lease(self: &Arc<Self>) -> CursorLease {
        self.opened.fetch_add(1, Ordering::SeqCst);
        CursorLease {
            tracker: Arc::clone(self),
            released: false,
        }
    }

    pub fn record_page(&self) {
        self.pages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> StoreStats {
        let opened = self.opened.load(Ordering::SeqCst);
        let released = self.released.load(Ordering::SeqCst);
        StoreStats {
            open_cursors: opened.saturating_sub(released),
            released_cursors: released,
            pages_fetched: self.pages.load(Ordering::Relaxed),
        }
    }
}

/// Lease held by an open cursor; released at most once
#[derive(Debug)]
pub struct CursorLease {
    tracker: Arc<ResourceTracker>,
    released: bool,
}

impl CursorLease {
    pub fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.tracker.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for CursorLease {
    fn drop(&mut self) {
        self.release();
    }
}

type ElementIter = Box<dyn Iterator<Item = Result<Element, StoreError>> + Send>;

/// Lazy stream of elements read from a store
pub struct StoreCursor {
    inner: Option<ElementIter>,
    lease: Option<CursorLease>,
}

impl StoreCursor {
    pub fn new<I>(iter: I, lease: Option<CursorLease>) -> Self
    where
        I: Iterator<Item = Result<Element, StoreError>> + Send + 'static,
    {
        Self {
            inner: Some(Box::new(iter)),
            lease,
        }
    }

    pub fn empty() -> Self {
        Self {
            inner: None,
            lease: None,
        }
    }

    /// Drop the underlying iterator and release the lease
    pub fn close(&mut self) {
        self.inner = None;
        if let Some(lease) = self.lease.as_mut() {
            lease.release();
        }
    }
}

impl Iterator for StoreCursor {
    type Item = Result<Element, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.inner.as_mut()?.next();
        if next.is_none() {
            self.close();
        }
        next
    }
}

impl Debug for StoreCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreCursor")
            .field("open", &self.inner.is_some())
            .finish()
    }
}

/// Backend holding the graph's elements
pub trait Store: Send + Sync + Debug {
    fn schema(&self) -> &Arc<Schema>;

    fn properties(&self) -> &StoreProperties;

    /// Ingest elements, aggregating per the schema; returns the number received
    fn add(&self, elements: Vec<Element>) -> Result<usize, StoreError>;

    /// Elements related to the seeds, restricted to `groups`
    fn get(
        &self,
        seeds: &[ElementId],
        options: &SeedOptions,
        groups: &BTreeSet<String>,
    ) -> Result<StoreCursor, StoreError>;

    /// Every element of `groups`, in insertion order
    fn get_all(&self, options: &GetAllOptions, groups: &BTreeSet<String>) -> Result<StoreCursor, StoreError>;

    fn stats(&self) -> StoreStats;
}

/// Create a store for the configured backend
pub fn create_store(schema: Arc<Schema>, properties: StoreProperties) -> Result<Arc<dyn Store>, StoreError> {
    debug!("Creating {} store (page size {})", properties.store_type, properties.page_size);
    match properties.store_type {
        StoreType::Memory => Ok(Arc::new(MemoryStore::new(schema, properties))),
    }
}
