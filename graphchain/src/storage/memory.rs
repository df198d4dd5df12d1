// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory store
//!
//! Elements live in an insertion-ordered vector behind a `parking_lot`
//! read/write lock. Ingest merges elements sharing group, identity and the
//! schema's groupBy values. Reads resolve candidate positions under one read
//! lock, then clone elements a page at a time, taking the lock per page.

use log::{debug, trace};
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use super::store::{
    GetAllOptions, IncludeIncomingOutgoing, ResourceTracker, SeedMatching, SeedOptions, Store, StoreCursor,
    StoreError, StoreStats,
};
use super::{Element, ElementId, MatchedVertex, Value};
use crate::config::StoreProperties;
use crate::schema::Schema;

/// Aggregation key: group, identifiers and groupBy values
type ElementKey = (String, Vec<Value>, Vec<Value>);

/// A stored position plus the end of an edge that matched a seed
type Candidate = (usize, Option<MatchedVertex>);

#[derive(Debug, Default)]
struct MemoryGraph {
    elements: Vec<Element>,
    keys: HashMap<ElementKey, usize>,
    vertex_index: HashMap<Value, Vec<usize>>,
}

impl MemoryGraph {
    fn insert(&mut self, element: Element, key: Option<ElementKey>) {
        let position = self.elements.len();
        match &element {
            Element::Entity(entity) => self.index(entity.vertex.clone(), position),
            Element::Edge(edge) => {
                self.index(edge.source.clone(), position);
                if edge.destination != edge.source {
                    self.index(edge.destination.clone(), position);
                }
            }
        }
        if let Some(key) = key {
            self.keys.insert(key, position);
        }
        self.elements.push(element);
    }

    fn index(&mut self, vertex: Value, position: usize) {
        self.vertex_index.entry(vertex).or_default().push(position);
    }

    fn positions(&self, vertex: &Value) -> &[usize] {
        self.vertex_index.get(vertex).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// In-memory [`Store`] with ingest aggregation and paged reads
#[derive(Debug)]
pub struct MemoryStore {
    schema: Arc<Schema>,
    properties: StoreProperties,
    graph: Arc<RwLock<MemoryGraph>>,
    tracker: Arc<ResourceTracker>,
}

impl MemoryStore {
    pub fn new(schema: Arc<Schema>, properties: StoreProperties) -> Self {
        Self {
            schema,
            properties,
            graph: Arc::new(RwLock::new(MemoryGraph::default())),
            tracker: ResourceTracker::new(),
        }
    }

    /// Number of stored elements after aggregation
    pub fn len(&self) -> usize {
        self.graph.read().elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn aggregation_key(&self, element: &Element) -> Result<Option<ElementKey>, StoreError> {
        let group = self
            .schema
            .group(element.group())
            .ok_or_else(|| StoreError::UnknownGroup(element.group().to_string()))?;
        if !group.aggregate {
            return Ok(None);
        }
        let (name, identity) = element.identity_key();
        let group_by = group.group_by.iter().map(|p| element.selection(p)).collect();
        Ok(Some((name, identity, group_by)))
    }

    /// Merge `incoming` into `existing`; on error `existing` is unchanged
    fn merge_into(&self, existing: &mut Element, incoming: Element) -> Result<(), StoreError> {
        let group = existing.group().to_string();
        let incoming_props = match incoming {
            Element::Entity(e) => e.properties,
            Element::Edge(e) => e.properties,
        };
        let mut merged_props = Vec::with_capacity(incoming_props.len());
        for (property, value) in incoming_props {
            let merged = match existing.property(&property).filter(|current| !current.is_null()) {
                None => value,
                Some(current) => {
                    let aggregator =
                        self.schema
                            .aggregator(&group, &property)
                            .ok_or_else(|| StoreError::MissingAggregator {
                                group: group.clone(),
                                property: property.clone(),
                            })?;
                    aggregator
                        .apply(current.clone(), value)
                        .map_err(|source| StoreError::Aggregation {
                            group: group.clone(),
                            property: property.clone(),
                            source,
                        })?
                }
            };
            merged_props.push((property, merged));
        }
        for (property, merged) in merged_props {
            existing.set_property(property, merged);
        }
        Ok(())
    }

    fn cursor(&self, candidates: Vec<Candidate>) -> StoreCursor {
        let pages = PagedElements {
            graph: Arc::clone(&self.graph),
            tracker: Arc::clone(&self.tracker),
            candidates,
            next: 0,
            page_size: self.properties.page_size.max(1),
            buffer: VecDeque::new(),
        };
        StoreCursor::new(pages, Some(self.tracker.lease()))
    }
}

fn seed_candidates(
    graph: &MemoryGraph,
    seed: &ElementId,
    options: &SeedOptions,
    groups: &BTreeSet<String>,
    out: &mut Vec<Candidate>,
) {
    let mut seen = HashSet::new();
    match seed {
        ElementId::Entity(seed) => {
            for &position in graph.positions(&seed.vertex) {
                if !seen.insert(position) {
                    continue;
                }
                match &graph.elements[position] {
                    Element::Entity(entity) => {
                        if groups.contains(&entity.group) {
                            out.push((position, None));
                        }
                    }
                    Element::Edge(edge) => {
                        if options.seed_matching == SeedMatching::Equal
                            || !groups.contains(&edge.group)
                            || !options.accepts_direction(edge.directed)
                        {
                            continue;
                        }
                        let is_source = edge.source == seed.vertex;
                        let passes = !edge.directed
                            || match options.include_incoming_outgoing {
                                IncludeIncomingOutgoing::Either => true,
                                IncludeIncomingOutgoing::Outgoing => is_source,
                                IncludeIncomingOutgoing::Incoming => edge.destination == seed.vertex,
                            };
                        if passes {
                            let matched = if is_source {
                                MatchedVertex::Source
                            } else {
                                MatchedVertex::Destination
                            };
                            out.push((position, Some(matched)));
                        }
                    }
                }
            }
        }
        ElementId::Edge(seed) => {
            for &position in graph.positions(&seed.source) {
                if let Element::Edge(edge) = &graph.elements[position] {
                    if groups.contains(&edge.group)
                        && options.accepts_direction(edge.directed)
                        && seed.matches(edge)
                        && seen.insert(position)
                    {
                        let matched = if edge.source == seed.source {
                            MatchedVertex::Source
                        } else {
                            MatchedVertex::Destination
                        };
                        out.push((position, Some(matched)));
                    }
                }
            }
            if options.seed_matching == SeedMatching::Related {
                for vertex in [&seed.source, &seed.destination] {
                    for &position in graph.positions(vertex) {
                        if let Element::Entity(entity) = &graph.elements[position] {
                            if groups.contains(&entity.group) && seen.insert(position) {
                                out.push((position, None));
                            }
                        }
                    }
                }
            }
        }
    }
}

impl Store for MemoryStore {
    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn properties(&self) -> &StoreProperties {
        &self.properties
    }

    fn add(&self, elements: Vec<Element>) -> Result<usize, StoreError> {
        let count = elements.len();
        let mut graph = self.graph.write();
        for mut element in elements {
            if let Element::Edge(edge) = &mut element {
                edge.matched_vertex = None;
                edge.normalise();
            }
            let key = self.aggregation_key(&element)?;
            let existing = key.as_ref().and_then(|k| graph.keys.get(k).copied());
            match existing {
                Some(position) => self.merge_into(&mut graph.elements[position], element)?,
                None => graph.insert(element, key),
            }
        }
        debug!("Added {} element(s); store now holds {}", count, graph.elements.len());
        Ok(count)
    }

    fn get(
        &self,
        seeds: &[ElementId],
        options: &SeedOptions,
        groups: &BTreeSet<String>,
    ) -> Result<StoreCursor, StoreError> {
        let candidates = {
            let graph = self.graph.read();
            let mut candidates = Vec::new();
            for seed in seeds {
                seed_candidates(&graph, seed, options, groups, &mut candidates);
            }
            candidates
        };
        trace!("{} seed(s) matched {} element(s)", seeds.len(), candidates.len());
        Ok(self.cursor(candidates))
    }

    fn get_all(&self, options: &GetAllOptions, groups: &BTreeSet<String>) -> Result<StoreCursor, StoreError> {
        let candidates = {
            let graph = self.graph.read();
            graph
                .elements
                .iter()
                .enumerate()
                .filter(|(_, element)| groups.contains(element.group()))
                .filter(|(_, element)| match element {
                    Element::Edge(edge) => options.directed_type.accepts(edge.directed),
                    Element::Entity(_) => true,
                })
                .map(|(position, _)| (position, None))
                .collect::<Vec<_>>()
        };
        Ok(self.cursor(candidates))
    }

    fn stats(&self) -> StoreStats {
        self.tracker.stats()
    }
}

/// Iterator cloning candidates out of the graph one page at a time
struct PagedElements {
    graph: Arc<RwLock<MemoryGraph>>,
    tracker: Arc<ResourceTracker>,
    candidates: Vec<Candidate>,
    next: usize,
    page_size: usize,
    buffer: VecDeque<Element>,
}

impl PagedElements {
    fn fetch_page(&mut self) {
        let end = (self.next + self.page_size).min(self.candidates.len());
        let graph = self.graph.read();
        for &(position, matched) in &self.candidates[self.next..end] {
            if let Some(element) = graph.elements.get(position) {
                let mut element = element.clone();
                if let Element::Edge(edge) = &mut element {
                    edge.matched_vertex = matched;
                }
                self.buffer.push_back(element);
            }
        }
        self.next = end;
        self.tracker.record_page();
    }
}

impl Iterator for PagedElements {
    type Item = Result<Element, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && self.next < self.candidates.len() {
            self.fetch_page();
        }
        self.buffer.pop_front().map(Ok)
    }
}
