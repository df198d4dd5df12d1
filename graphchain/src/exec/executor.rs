// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Operation chain executor
//!
//! Execution happens in two phases. Binding resolves every view, generator
//! and ForEach sub-chain against the schema without touching the store, so a
//! bad chain fails before any data moves. Running then wires the operations
//! into one lazy pipeline: each stage wraps the previous stage's stream.
//! Stages that must see their whole input (ToSet, Sort, Count, parallel
//! ForEach) materialise on first pull.

use log::{debug, info, warn};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap, HashSet};
use std::sync::Arc;

use super::{Context, ForEachFailure, Item, ItemStream, Output, ResultCursor};
use crate::error::{Access, GraphError};
use crate::functions::FunctionRegistry;
use crate::generator::ElementGenerator;
use crate::plan::{
    AddElements, EdgeVertices, ElementPropertyComparator, FailurePolicy, ForEach, Operation, OperationChain, Sort,
    ToCsv, ToVertices, UseMatchedVertex,
};
use crate::storage::{
    EdgeSeed, Element, ElementId, EntitySeed, GetAllOptions, MatchedVertex, SeedMatching, SeedOptions, Store,
    StoreCursor, Value,
};
use crate::view::{ElementStream, ResolvedView, View, ViewEngine};

/// An operation with its view, generator or sub-chain resolved
#[derive(Clone)]
struct BoundStep {
    position: usize,
    operation: Arc<Operation>,
    view: Option<Arc<ResolvedView>>,
    generator: Option<Arc<dyn ElementGenerator>>,
    sub_chain: Option<Arc<Vec<BoundStep>>>,
}

impl BoundStep {
    fn name(&self) -> &'static str {
        self.operation.name()
    }

    fn view(&self) -> Result<Arc<ResolvedView>, GraphError> {
        self.view
            .clone()
            .ok_or_else(|| GraphError::InvalidOperation(format!("{} has no bound view", self.name())))
    }
}

/// Runs operation chains against a store
#[derive(Clone)]
pub struct Executor {
    store: Arc<dyn Store>,
    registry: Arc<FunctionRegistry>,
}

impl Executor {
    pub fn new(store: Arc<dyn Store>, registry: Arc<FunctionRegistry>) -> Self {
        Self { store, registry }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Bind and run a chain. The returned cursor is lazy: most of the work
    /// happens as the caller pulls results.
    pub fn execute(&self, chain: &OperationChain, ctx: &Context) -> Result<Output, GraphError> {
        info!(
            "Job {} started: {} operation(s) for user '{}'",
            ctx.job_id(),
            chain.len(),
            ctx.user().user_id
        );
        let steps = self.bind(chain.operations(), ctx)?;
        let output = match self.run(&steps, None, ctx)? {
            Some(stream) => {
                info!("Job {} pipeline ready: output {}", ctx.job_id(), chain.output_kind());
                Output::Items(ResultCursor::new(stream))
            }
            None => {
                info!("Job {} finished with no output", ctx.job_id());
                Output::Void
            }
        };
        Ok(output)
    }

    fn bind(&self, operations: &[Operation], ctx: &Context) -> Result<Vec<BoundStep>, GraphError> {
        operations
            .iter()
            .enumerate()
            .map(|(position, operation)| self.bind_step(position, operation, ctx))
            .collect()
    }

    fn bind_step(&self, position: usize, operation: &Operation, ctx: &Context) -> Result<BoundStep, GraphError> {
        let name = operation.name();
        let resolve = |view: &View| {
            view.resolve(self.store.schema(), &self.registry, ctx.user(), position)
                .map(Arc::new)
                .map_err(|e| e.at(position, name))
        };
        let mut step = BoundStep {
            position,
            operation: Arc::new(operation.clone()),
            view: None,
            generator: None,
            sub_chain: None,
        };
        match operation {
            Operation::GetElements(op) => step.view = Some(resolve(&op.view)?),
            Operation::GetAllElements(op) => step.view = Some(resolve(&op.view)?),
            Operation::GetAdjacentIds(op) => step.view = Some(resolve(&op.view)?),
            Operation::GenerateElements(op) => {
                let generator = self
                    .registry
                    .generator(&op.generator)
                    .map_err(|e| GraphError::from(e).at(position, name))?;
                step.generator = Some(generator);
            }
            Operation::ForEach(op) => {
                let sub_chain = self
                    .bind(op.operation.operations(), ctx)
                    .map_err(|e| for_each_error(position, e))?;
                step.sub_chain = Some(Arc::new(sub_chain));
            }
            _ => {}
        }
        debug!("Bound operation {} ({})", position, name);
        Ok(step)
    }

    /// Wire bound steps into a pipeline. `input` replaces the head
    /// operation's own input (ForEach iterations pass their item this way).
    fn run(
        &self,
        steps: &[BoundStep],
        input: Option<ItemStream>,
        ctx: &Context,
    ) -> Result<Option<ItemStream>, GraphError> {
        let mut stream = input;
        for step in steps {
            let position = step.position;
            let name = step.name();
            debug!("Job {} stage {} ({})", ctx.job_id(), position, name);
            let input = stream.take().unwrap_or_else(|| own_input(&step.operation));
            stream = self
                .stage(step, input, ctx)
                .map_err(|e| e.at(position, name))?
                .map(|out| -> ItemStream { Box::new(out.map(move |r| r.map_err(|e| e.at(position, name)))) });
        }
        Ok(stream)
    }

    fn stage(&self, step: &BoundStep, input: ItemStream, ctx: &Context) -> Result<Option<ItemStream>, GraphError> {
        let stream: ItemStream = match step.operation.as_ref() {
            Operation::GetElements(op) => {
                let view = step.view()?;
                let options = SeedOptions {
                    directed_type: op.directed_type,
                    include_incoming_outgoing: op.include_incoming_outgoing,
                    seed_matching: op.seed_matching,
                };
                let elements = self.seeded(input, view.groups(), options);
                into_items(ViewEngine::apply(view, elements))
            }
            Operation::GetAllElements(op) => {
                let view = step.view()?;
                let options = GetAllOptions {
                    directed_type: op.directed_type,
                };
                let cursor = self.store.get_all(&options, &view.groups())?;
                into_items(ViewEngine::apply(view, from_cursor(cursor)))
            }
            Operation::GetAdjacentIds(op) => {
                let view = step.view()?;
                let schema = self.store.schema();
                let groups: BTreeSet<String> = view.groups().into_iter().filter(|g| schema.is_edge(g)).collect();
                let options = SeedOptions {
                    directed_type: op.directed_type,
                    include_incoming_outgoing: op.include_incoming_outgoing,
                    seed_matching: SeedMatching::Related,
                };
                let edges = ViewEngine::apply(view, self.seeded(input, groups, options));
                Box::new(edges.filter_map(|result| match result {
                    Ok(Element::Edge(edge)) => Some(Ok(Item::Id(EntitySeed::new(edge.adjacent().clone()).into()))),
                    Ok(Element::Entity(_)) => None,
                    Err(e) => Some(Err(e)),
                }))
            }
            Operation::AddElements(op) => {
                self.add_elements(step.position, op, input, ctx)?;
                return Ok(None);
            }
            Operation::GenerateElements(_) => {
                let generator = step
                    .generator
                    .clone()
                    .ok_or_else(|| GraphError::InvalidOperation("GenerateElements has no bound generator".to_string()))?;
                Box::new(input.flat_map(move |item| generate(generator.as_ref(), item)))
            }
            Operation::ToSet => deferred(move || {
                let mut seen = HashSet::new();
                let mut items = Vec::new();
                for item in input {
                    let item = item?;
                    if seen.insert(item.clone()) {
                        items.push(item);
                    }
                }
                Ok(items)
            }),
            Operation::ToList => input,
            Operation::ToSingletonList => Box::new(input.take(1)),
            Operation::Limit(op) if op.truncate => Box::new(input.take(op.result_limit)),
            Operation::Limit(op) => Box::new(StrictLimit {
                input: Some(input),
                limit: op.result_limit,
                seen: 0,
            }),
            Operation::ToVertices(op) => to_vertices(op, input),
            Operation::ToEntitySeeds(_) => Box::new(input.map(|item| item.and_then(to_entity_seed))),
            Operation::ToCsv(op) => to_csv(op, input)?,
            Operation::Sort(op) => {
                let sort = op.clone();
                let max_sort_size = self.store.properties().max_sort_size;
                deferred(move || sort_elements(&sort, input, max_sort_size))
            }
            Operation::Count => deferred(move || {
                let mut count: i64 = 0;
                for item in input {
                    item?;
                    count += 1;
                }
                Ok(vec![Item::Value(Value::Long(count))])
            }),
            Operation::DiscardOutput => {
                for item in input {
                    item?;
                }
                return Ok(None);
            }
            Operation::ForEach(op) => self.for_each(step, op, input, ctx)?,
        };
        Ok(Some(stream))
    }

    /// Elements for a stream of seeds, fetched a page of seeds at a time
    fn seeded(&self, input: ItemStream, groups: BTreeSet<String>, options: SeedOptions) -> ElementStream {
        Box::new(SeedBatches {
            input,
            store: self.store.clone(),
            options,
            groups,
            batch_size: self.store.properties().page_size.max(1),
            current: None,
            input_done: false,
        })
    }

    fn add_elements(
        &self,
        position: usize,
        op: &AddElements,
        input: ItemStream,
        ctx: &Context,
    ) -> Result<(), GraphError> {
        let schema = self.store.schema();
        let page_size = self.store.properties().page_size.max(1);
        let mut batch = Vec::with_capacity(page_size);
        let mut added = 0;
        let mut skipped = 0;

        for item in input {
            let element = expect_element(item?)?;
            if op.validate {
                if let Err(e) = schema.validate_element(&element) {
                    if op.skip_invalid_elements {
                        warn!("Skipping invalid element {}: {}", element, e);
                        skipped += 1;
                        continue;
                    }
                    return Err(e.into());
                }
            }
            if schema.has_group(element.group()) && !schema.is_writable(element.group(), ctx.user()) {
                return Err(GraphError::Authorization {
                    position,
                    user: ctx.user().user_id.clone(),
                    group: element.group().to_string(),
                    access: Access::Write,
                });
            }
            batch.push(element);
            if batch.len() >= page_size {
                added += self.store.add(std::mem::take(&mut batch))?;
            }
        }
        if !batch.is_empty() {
            added += self.store.add(batch)?;
        }
        debug!("Added {} element(s), skipped {} invalid", added, skipped);
        Ok(())
    }

    fn for_each(
        &self,
        step: &BoundStep,
        op: &ForEach,
        input: ItemStream,
        ctx: &Context,
    ) -> Result<ItemStream, GraphError> {
        let sub_chain = step
            .sub_chain
            .clone()
            .ok_or_else(|| GraphError::InvalidOperation("ForEach has no bound sub-chain".to_string()))?;
        let position = step.position;
        let policy = op.failure_policy;
        let executor = self.clone();
        let ctx = ctx.clone();

        if !op.parallel {
            return Ok(Box::new(ForEachIter {
                executor,
                sub_chain,
                input: Some(input),
                ctx,
                position,
                policy,
                iteration: 0,
                current: Vec::new().into_iter(),
            }));
        }

        Ok(deferred(move || {
            let items: Vec<Item> = input.collect::<Result<_, _>>()?;
            debug!("ForEach {} running {} iteration(s) in parallel", position, items.len());
            let results: Vec<Result<Vec<Item>, GraphError>> = items
                .into_par_iter()
                .map(|item| executor.iteration(&sub_chain, item, &ctx))
                .collect();
            let mut output = Vec::new();
            for (iteration, result) in results.into_iter().enumerate() {
                match result {
                    Ok(items) => output.extend(items),
                    Err(e) => iteration_failed(&ctx, policy, position, iteration, e)?,
                }
            }
            Ok(output)
        }))
    }

    /// One ForEach iteration: the item is the sub-chain's head input
    fn iteration(&self, sub_chain: &[BoundStep], item: Item, ctx: &Context) -> Result<Vec<Item>, GraphError> {
        let input: ItemStream = Box::new(std::iter::once(Ok(item)));
        match self.run(sub_chain, Some(input), ctx)? {
            Some(stream) => stream.collect(),
            None => Ok(Vec::new()),
        }
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor").field("store", &self.store).finish()
    }
}

fn for_each_error(position: usize, error: GraphError) -> GraphError {
    GraphError::OperationExecution {
        position,
        operation: "ForEach".to_string(),
        source: Box::new(error),
    }
}

fn iteration_failed(
    ctx: &Context,
    policy: FailurePolicy,
    position: usize,
    iteration: usize,
    error: GraphError,
) -> Result<(), GraphError> {
    match policy {
        FailurePolicy::FailFast => Err(for_each_error(position, error)),
        FailurePolicy::Continue => {
            warn!("ForEach {} iteration {} failed: {}", position, iteration, error);
            ctx.record_failure(ForEachFailure {
                position,
                iteration,
                error,
            });
            Ok(())
        }
    }
}

/// Input an operation carries itself, used when nothing flows into it
fn own_input(operation: &Operation) -> ItemStream {
    fn items<T: Clone + Into<Item>>(input: &[T]) -> ItemStream {
        let items: Vec<Result<Item, GraphError>> = input.iter().cloned().map(|i| Ok(i.into())).collect();
        Box::new(items.into_iter())
    }
    match operation {
        Operation::GetElements(op) => items(&op.input),
        Operation::GetAdjacentIds(op) => items(&op.input),
        Operation::AddElements(op) => items(&op.input),
        Operation::GenerateElements(op) => items(&op.input),
        Operation::ToVertices(op) => items(&op.input),
        Operation::ToEntitySeeds(op) => items(&op.input),
        Operation::ToCsv(op) => items(&op.input),
        Operation::Sort(op) => items(&op.input),
        Operation::ForEach(op) => items(&op.input),
        _ => Box::new(std::iter::empty()),
    }
}

fn into_items(elements: ElementStream) -> ItemStream {
    Box::new(elements.map(|r| r.map(Item::Element)))
}

fn from_cursor(cursor: StoreCursor) -> ElementStream {
    Box::new(cursor.map(|r| r.map_err(GraphError::from)))
}

fn expect_element(item: Item) -> Result<Element, GraphError> {
    match item {
        Item::Element(element) => Ok(element),
        other => Err(GraphError::InvalidOperation(format!("expected an element, got {}", other))),
    }
}

fn expect_id(item: Item) -> Result<ElementId, GraphError> {
    match item {
        Item::Id(id) => Ok(id),
        Item::Element(element) => Ok(element.id()),
        other => Err(GraphError::InvalidOperation(format!("expected an element id, got {}", other))),
    }
}

fn generate(generator: &dyn ElementGenerator, item: Result<Item, GraphError>) -> Vec<Result<Item, GraphError>> {
    let record = match item {
        Ok(Item::Record(record)) => record,
        Ok(other) => {
            return vec![Err(GraphError::InvalidOperation(format!("expected a record, got {}", other)))];
        }
        Err(e) => return vec![Err(e)],
    };
    match generator.generate(&record) {
        Ok(elements) => elements.into_iter().map(|e| Ok(Item::Element(e))).collect(),
        Err(e) => vec![Err(e.into())],
    }
}

fn to_entity_seed(item: Item) -> Result<Item, GraphError> {
    match item {
        Item::Value(vertex) => Ok(Item::Id(EntitySeed::new(vertex).into())),
        Item::Id(id) => Ok(Item::Id(id)),
        Item::Element(element) => Ok(Item::Id(element.id())),
        Item::Record(record) => Err(GraphError::InvalidOperation(format!(
            "cannot make an entity seed from record {}",
            record
        ))),
    }
}

fn to_vertices(op: &ToVertices, input: ItemStream) -> ItemStream {
    let edge_vertices = op.edge_vertices;
    let use_matched = op.use_matched_vertex;
    Box::new(input.flat_map(move |item| {
        match item.and_then(expect_id) {
            Ok(id) => vertices_of(id, edge_vertices, use_matched)
                .into_iter()
                .map(|v| Ok(Item::Value(v)))
                .collect::<Vec<_>>(),
            Err(e) => vec![Err(e)],
        }
    }))
}

fn vertices_of(id: ElementId, edge_vertices: EdgeVertices, use_matched: UseMatchedVertex) -> Vec<Value> {
    let seed = match id {
        ElementId::Entity(seed) => return vec![seed.vertex],
        ElementId::Edge(seed) => seed,
    };
    let matched = seed.matched_vertex;
    let EdgeSeed {
        source, destination, ..
    } = seed;
    match (use_matched, matched) {
        (UseMatchedVertex::Equal, Some(MatchedVertex::Source))
        | (UseMatchedVertex::Opposite, Some(MatchedVertex::Destination)) => vec![source],
        (UseMatchedVertex::Equal, Some(MatchedVertex::Destination))
        | (UseMatchedVertex::Opposite, Some(MatchedVertex::Source)) => vec![destination],
        _ => match edge_vertices {
            EdgeVertices::None => Vec::new(),
            EdgeVertices::Source => vec![source],
            EdgeVertices::Destination => vec![destination],
            EdgeVertices::Both => vec![source, destination],
        },
    }
}

fn to_csv(op: &ToCsv, input: ItemStream) -> Result<ItemStream, GraphError> {
    let generator = op.generator.clone();
    let header = if op.include_header {
        Some(generator.header()?)
    } else {
        None
    };
    let rows = input.map(move |item| {
        let element = expect_element(item?)?;
        Ok(Item::Value(Value::String(generator.row(&element)?)))
    });
    Ok(Box::new(
        header
            .into_iter()
            .map(|h| Ok(Item::Value(Value::String(h))))
            .chain(rows),
    ))
}

/// Property a comparator sorts on, `None` when the element is outside its
/// groups or has no value
fn sort_key<'a>(comparator: &ElementPropertyComparator, element: &'a Element) -> Option<&'a Value> {
    if !comparator.groups.is_empty() && !comparator.groups.contains(element.group()) {
        return None;
    }
    element.property(&comparator.property).filter(|v| !v.is_null())
}

/// Missing keys sort last whatever the direction
fn compare_elements(comparators: &[ElementPropertyComparator], a: &Element, b: &Element) -> Ordering {
    for comparator in comparators {
        let ordering = match (sort_key(comparator, a), sort_key(comparator, b)) {
            (Some(x), Some(y)) if comparator.reverse => y.compare(x),
            (Some(x), Some(y)) => x.compare(y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Heap entry; arrival order breaks ties so the sort is stable
struct Ranked {
    element: Element,
    seq: usize,
    comparators: Arc<Vec<ElementPropertyComparator>>,
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_elements(&self.comparators, &self.element, &other.element).then(self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

fn sort_elements(sort: &Sort, input: ItemStream, max_sort_size: usize) -> Result<Vec<Item>, GraphError> {
    let comparators = Arc::new(sort.comparators.clone());
    let mut seen: HashSet<Element> = HashSet::new();
    let mut elements = input.map(|item| item.and_then(expect_element)).filter(|element| match element {
        Ok(e) if sort.deduplicate => seen.insert(e.clone()),
        _ => true,
    });

    let sorted: Vec<Element> = match sort.result_limit {
        Some(limit) => {
            // Max-heap of the best `limit` so far; the worst sits on top.
            let mut heap = BinaryHeap::with_capacity(limit.saturating_add(1).min(max_sort_size));
            for (seq, element) in elements.by_ref().enumerate() {
                heap.push(Ranked {
                    element: element?,
                    seq,
                    comparators: comparators.clone(),
                });
                if heap.len() > limit {
                    heap.pop();
                }
            }
            heap.into_sorted_vec().into_iter().map(|r| r.element).collect()
        }
        None => {
            let mut buffer = Vec::new();
            for element in elements.by_ref() {
                if buffer.len() >= max_sort_size {
                    return Err(GraphError::LimitExceeded { limit: max_sort_size });
                }
                buffer.push(element?);
            }
            buffer.sort_by(|a, b| compare_elements(&comparators, a, b));
            buffer
        }
    };
    Ok(sorted.into_iter().map(Item::Element).collect())
}

/// Iterator computed in one go on first pull
struct Deferred<F> {
    compute: Option<F>,
    items: std::vec::IntoIter<Item>,
}

impl<F> Iterator for Deferred<F>
where
    F: FnOnce() -> Result<Vec<Item>, GraphError>,
{
    type Item = Result<Item, GraphError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(compute) = self.compute.take() {
            match compute() {
                Ok(items) => self.items = items.into_iter(),
                Err(e) => return Some(Err(e)),
            }
        }
        self.items.next().map(Ok)
    }
}

fn deferred<F>(compute: F) -> ItemStream
where
    F: FnOnce() -> Result<Vec<Item>, GraphError> + Send + 'static,
{
    Box::new(Deferred {
        compute: Some(compute),
        items: Vec::new().into_iter(),
    })
}

/// Limit that fails instead of truncating
struct StrictLimit {
    input: Option<ItemStream>,
    limit: usize,
    seen: usize,
}

impl Iterator for StrictLimit {
    type Item = Result<Item, GraphError>;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.input.as_mut()?.next();
        match next {
            Some(Ok(item)) => {
                self.seen += 1;
                if self.seen > self.limit {
                    self.input = None;
                    return Some(Err(GraphError::LimitExceeded { limit: self.limit }));
                }
                Some(Ok(item))
            }
            other => other,
        }
    }
}

/// Seed stream turned into store lookups, one page of seeds per call
struct SeedBatches {
    input: ItemStream,
    store: Arc<dyn Store>,
    options: SeedOptions,
    groups: BTreeSet<String>,
    batch_size: usize,
    current: Option<StoreCursor>,
    input_done: bool,
}

impl Iterator for SeedBatches {
    type Item = Result<Element, GraphError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(cursor) = self.current.as_mut() {
                match cursor.next() {
                    Some(result) => return Some(result.map_err(GraphError::from)),
                    None => self.current = None,
                }
            }
            if self.input_done {
                return None;
            }

            let mut batch = Vec::with_capacity(self.batch_size);
            while batch.len() < self.batch_size {
                match self.input.next() {
                    Some(Ok(item)) => match expect_id(item) {
                        Ok(id) => batch.push(id),
                        Err(e) => return Some(Err(e)),
                    },
                    Some(Err(e)) => return Some(Err(e)),
                    None => {
                        self.input_done = true;
                        break;
                    }
                }
            }
            if batch.is_empty() {
                return None;
            }
            debug!("Fetching elements for {} seed(s)", batch.len());
            match self.store.get(&batch, &self.options, &self.groups) {
                Ok(cursor) => self.current = Some(cursor),
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

/// Sequential ForEach: runs one iteration per outer item as output is pulled
struct ForEachIter {
    executor: Executor,
    sub_chain: Arc<Vec<BoundStep>>,
    input: Option<ItemStream>,
    ctx: Context,
    position: usize,
    policy: FailurePolicy,
    iteration: usize,
    current: std::vec::IntoIter<Item>,
}

impl Iterator for ForEachIter {
    type Item = Result<Item, GraphError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.current.next() {
                return Some(Ok(item));
            }
            let item = match self.input.as_mut()?.next() {
                Some(Ok(item)) => item,
                Some(Err(e)) => {
                    self.input = None;
                    return Some(Err(e));
                }
                None => {
                    self.input = None;
                    return None;
                }
            };
            let iteration = self.iteration;
            self.iteration += 1;
            match self.executor.iteration(&self.sub_chain, item, &self.ctx) {
                Ok(items) => self.current = items.into_iter(),
                Err(e) => {
                    if let Err(e) = iteration_failed(&self.ctx, self.policy, self.position, iteration, e) {
                        self.input = None;
                        return Some(Err(e));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreProperties;
    use crate::functions::{AggregateFunction, FunctionError};
    use crate::generator::{CsvGenerator, Record};
    use crate::plan::{GenerateElements, GetAdjacentIds, GetAllElements, GetElements, Limit, ToEntitySeeds};
    use crate::schema::{ElementDefinition, Schema, TypeDefinition};
    use crate::storage::{create_store, DirectedType, Edge, Entity, ValueClass};
    use crate::user::User;
    use crate::view::View;

    fn executor(page_size: usize) -> Executor {
        let mut registry = FunctionRegistry::new();
        registry.register_generator(
            "road",
            Arc::new(|record: &Record| -> Result<Vec<Element>, FunctionError> {
                let count: i64 = record
                    .require("count")?
                    .parse()
                    .map_err(|_| FunctionError::Generator("bad count".to_string()))?;
                Ok(vec![Edge::new("Road", record.require("from")?, record.require("to")?, true)
                    .with_property("count", count)
                    .into()])
            }),
        );
        let schema = Schema::new()
            .type_definition("vertex", TypeDefinition::new(ValueClass::String))
            .type_definition("count", TypeDefinition::new(ValueClass::Long).aggregated_by(AggregateFunction::Sum))
            .entity("Junction", ElementDefinition::entity("vertex").property("count", "count"))
            .edge(
                "Road",
                ElementDefinition::edge("vertex", "vertex", DirectedType::Directed).property("count", "count"),
            )
            .entity(
                "Secret",
                ElementDefinition::entity("vertex").read_auths(["private"]).write_auths(["private"]),
            )
            .validate(&registry)
            .unwrap();
        let store = create_store(
            Arc::new(schema),
            StoreProperties {
                page_size,
                ..Default::default()
            },
        )
        .unwrap();
        Executor::new(store, Arc::new(registry))
    }

    fn ctx() -> Context {
        Context::new(User::new("tester"))
    }

    fn load(executor: &Executor, elements: Vec<Element>) {
        let chain = OperationChain::of(AddElements::new().input(elements)).unwrap();
        assert!(executor.execute(&chain, &ctx()).unwrap().is_void());
    }

    fn roads() -> Vec<Element> {
        vec![
            Edge::new("Road", "A", "B", true).with_property("count", 5i64).into(),
            Edge::new("Road", "B", "C", true).with_property("count", 9i64).into(),
            Edge::new("Road", "A", "C", true).with_property("count", 1i64).into(),
            Entity::new("Junction", "A").with_property("count", 3i64).into(),
        ]
    }

    #[test]
    fn adjacent_ids_follow_direction() {
        let executor = executor(1);
        load(&executor, roads());
        let chain = OperationChain::builder()
            .first(
                GetAdjacentIds::new()
                    .input([EntitySeed::new("A")])
                    .in_out_type(crate::storage::IncludeIncomingOutgoing::Outgoing),
            )
            .then(Operation::ToSet)
            .build()
            .unwrap();
        let items = executor.execute(&chain, &ctx()).unwrap().into_items().unwrap();
        assert_eq!(
            items,
            vec![Item::from(EntitySeed::new("B")), Item::from(EntitySeed::new("C"))]
        );
    }

    #[test]
    fn sort_keeps_top_results() {
        let executor = executor(2);
        load(&executor, roads());
        let chain = OperationChain::builder()
            .first(GetAllElements::new())
            .then(
                Sort::new(vec![ElementPropertyComparator::new(["Road"], "count").reverse(true)])
                    .result_limit(2),
            )
            .then(Operation::Count)
            .build()
            .unwrap();
        let counts = executor.execute(&chain, &ctx()).unwrap().into_values().unwrap();
        assert_eq!(counts, vec![Value::Long(2)]);

        let chain = OperationChain::builder()
            .first(GetAllElements::new())
            .then(Sort::new(vec![ElementPropertyComparator::new(["Road"], "count")]))
            .build()
            .unwrap();
        let sorted = executor.execute(&chain, &ctx()).unwrap().into_elements().unwrap();
        let counts: Vec<Value> = sorted.iter().map(|e| e.selection("count")).collect();
        // The Junction entity is outside the comparator's groups.
        assert_eq!(
            counts,
            vec![Value::Long(1), Value::Long(5), Value::Long(9), Value::Long(3)]
        );
    }

    #[test]
    fn sort_removes_duplicates_before_limiting() {
        let duplicate: Element = Entity::new("Junction", "X").with_property("count", 7i64).into();
        let other: Element = Entity::new("Junction", "Y").with_property("count", 2i64).into();
        let sort = Sort::new(vec![ElementPropertyComparator::new(["Junction"], "count").reverse(true)])
            .result_limit(2)
            .deduplicate(true);
        let input: ItemStream = Box::new(
            vec![duplicate.clone(), duplicate.clone(), other.clone()]
                .into_iter()
                .map(|e| Ok(Item::Element(e))),
        );
        let sorted = sort_elements(&sort, input, 10).unwrap();
        assert_eq!(sorted, vec![Item::Element(duplicate), Item::Element(other)]);
    }

    #[test]
    fn unbounded_sort_respects_max_size() {
        let sort = Sort::new(vec![]);
        let input: ItemStream = Box::new(
            (0..5).map(|i| Ok(Item::Element(Entity::new("Junction", format!("J{}", i)).into()))),
        );
        assert!(matches!(
            sort_elements(&sort, input, 3),
            Err(GraphError::LimitExceeded { limit: 3 })
        ));
    }

    #[test]
    fn strict_limit_fails_on_extra_items() {
        let executor = executor(10);
        load(&executor, roads());
        let chain = OperationChain::builder()
            .first(GetAllElements::new())
            .then(Limit::new(2).truncate(false))
            .build()
            .unwrap();
        let mut cursor = executor.execute(&chain, &ctx()).unwrap().into_cursor().unwrap();
        assert!(cursor.next().unwrap().is_ok());
        assert!(cursor.next().unwrap().is_ok());
        let err = cursor.next().unwrap().unwrap_err();
        assert_eq!(err.position(), Some(1));
        assert!(matches!(err.root_cause(), GraphError::LimitExceeded { limit: 2 }));
        assert!(cursor.next().is_none());
    }

    #[test]
    fn generates_and_writes_elements() {
        let executor = executor(10);
        let records = vec![
            Record::from_pairs([("from", "A"), ("to", "B"), ("count", "2")]),
            Record::from_pairs([("from", "A"), ("to", "B"), ("count", "3")]),
        ];
        let chain = OperationChain::builder()
            .first(GenerateElements::new("road").input(records))
            .then(AddElements::new())
            .then(GetAllElements::new())
            .build()
            .unwrap();
        let elements = executor.execute(&chain, &ctx()).unwrap().into_elements().unwrap();
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].selection("count"), Value::Long(5));
    }

    #[test]
    fn unknown_generator_fails_at_bind_time() {
        let executor = executor(10);
        let chain = OperationChain::of(GenerateElements::new("missing")).unwrap();
        let err = executor.execute(&chain, &ctx()).unwrap_err();
        assert_eq!(err.position(), Some(0));
        assert_eq!(executor.store().stats().open_cursors, 0);
    }

    #[test]
    fn writes_need_write_auths() {
        let executor = executor(10);
        let chain = OperationChain::of(AddElements::new().input([Entity::new("Secret", "s")])).unwrap();
        match executor.execute(&chain, &ctx()) {
            Err(GraphError::Authorization { position, access, .. }) => {
                assert_eq!(position, 0);
                assert_eq!(access, Access::Write);
            }
            other => panic!("unexpected {:?}", other.map(|o| o.is_void())),
        }
        let privileged = Context::new(User::with_auths("admin", ["private"]));
        assert!(executor.execute(&chain, &privileged).is_ok());
    }

    #[test]
    fn invalid_elements_can_be_skipped() {
        let executor = executor(10);
        let bad: Element = Entity::new("Junction", 12i64).into();
        let good: Element = Entity::new("Junction", "J").into();
        let strict = OperationChain::of(AddElements::new().input([bad.clone(), good.clone()])).unwrap();
        assert!(executor.execute(&strict, &ctx()).is_err());

        let lenient = OperationChain::builder()
            .first(AddElements::new().input([bad, good]).skip_invalid_elements(true))
            .then(GetAllElements::new())
            .then(Operation::Count)
            .build()
            .unwrap();
        let count = executor.execute(&lenient, &ctx()).unwrap().into_values().unwrap();
        assert_eq!(count, vec![Value::Long(1)]);
    }

    #[test]
    fn to_vertices_honours_matched_vertex() {
        let executor = executor(10);
        load(&executor, roads());
        let chain = OperationChain::builder()
            .first(GetElements::new().input([EntitySeed::new("C")]).view(View::new().edge("Road", Default::default())))
            .then(ToVertices::new().use_matched_vertex(UseMatchedVertex::Opposite))
            .then(Operation::ToSet)
            .build()
            .unwrap();
        let vertices = executor.execute(&chain, &ctx()).unwrap().into_values().unwrap();
        assert_eq!(vertices, vec![Value::from("B"), Value::from("A")]);
    }

    #[test]
    fn execute_returns_before_reading_the_store() {
        let executor = executor(1);
        load(&executor, roads());
        let chain = OperationChain::of(GetAllElements::new()).unwrap();
        let output = executor.execute(&chain, &ctx()).unwrap();
        assert_eq!(executor.store().stats().pages_fetched, 0);

        assert_eq!(output.into_elements().unwrap().len(), 4);
        assert_eq!(executor.store().stats().pages_fetched, 4);
    }

    #[test]
    fn entity_seeds_from_values() {
        let executor = executor(10);
        load(&executor, roads());
        let chain = OperationChain::builder()
            .first(ToEntitySeeds::new().input([Value::from("A")]))
            .then(GetElements::new().view(View::new().entity("Junction", Default::default())))
            .build()
            .unwrap();
        let elements = executor.execute(&chain, &ctx()).unwrap().into_elements().unwrap();
        assert_eq!(elements, vec![Element::from(Entity::new("Junction", "A").with_property("count", 3i64))]);
    }

    #[test]
    fn csv_output_starts_with_header() {
        let executor = executor(10);
        load(&executor, roads());
        let chain = OperationChain::builder()
            .first(GetAllElements::new().view(View::new().entity("Junction", Default::default())))
            .then(ToCsv::new(CsvGenerator::new().vertex("Junction").property("count", "Count")))
            .build()
            .unwrap();
        let lines = executor.execute(&chain, &ctx()).unwrap().into_strings().unwrap();
        assert_eq!(lines, vec!["Junction,Count".to_string(), "A,3".to_string()]);
    }

    #[test]
    fn seeds_are_fetched_in_pages() {
        let executor = executor(1);
        load(&executor, roads());
        let chain = OperationChain::builder()
            .first(GetElements::new().input([EntitySeed::new("A"), EntitySeed::new("B"), EntitySeed::new("Z")]))
            .then(Operation::DiscardOutput)
            .build()
            .unwrap();
        let before = executor.store().stats();
        assert!(executor.execute(&chain, &ctx()).unwrap().is_void());
        let after = executor.store().stats();
        assert_eq!(after.released_cursors - before.released_cursors, 3);
        assert_eq!(after.open_cursors, 0);
    }
}
