// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Operations and the kinds of data they consume and produce

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::OperationChain;
use crate::exec::Item;
use crate::generator::{CsvGenerator, Record};
use crate::storage::{DirectedType, Element, ElementId, IncludeIncomingOutgoing, SeedMatching, Value};
use crate::view::View;

/// Kind of item stream an operation consumes or produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum IoKind {
    /// No stream
    #[default]
    Void,
    Records,
    Elements,
    ElementIds,
    /// Arbitrary values
    Objects,
    Strings,
    /// Unknown until run time; pass-through operations take and give this
    Any,
}

impl IoKind {
    /// Whether an operation expecting `self` can consume a stream of `found`
    pub fn accepts(&self, found: IoKind) -> bool {
        match (self, found) {
            (IoKind::Void, _) => true,
            (_, IoKind::Any) => true,
            (_, IoKind::Void) => false,
            (IoKind::Any, _) | (IoKind::Objects, _) => true,
            (IoKind::ElementIds, IoKind::Elements) => true,
            (expected, found) => *expected == found,
        }
    }
}

impl fmt::Display for IoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IoKind::Void => "Void",
            IoKind::Records => "Records",
            IoKind::Elements => "Elements",
            IoKind::ElementIds => "ElementIds",
            IoKind::Objects => "Objects",
            IoKind::Strings => "Strings",
            IoKind::Any => "Any",
        };
        write!(f, "{}", name)
    }
}

fn default_true() -> bool {
    true
}

/// Elements related to the input seeds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GetElements {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input: Vec<ElementId>,
    #[serde(default)]
    pub view: View,
    #[serde(default)]
    pub directed_type: DirectedType,
    #[serde(default, rename = "includeIncomingOutGoing")]
    pub include_incoming_outgoing: IncludeIncomingOutgoing,
    #[serde(default)]
    pub seed_matching: SeedMatching,
}

impl GetElements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input<I, T>(mut self, seeds: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ElementId>,
    {
        self.input = seeds.into_iter().map(Into::into).collect();
        self
    }

    pub fn view(mut self, view: View) -> Self {
        self.view = view;
        self
    }

    pub fn directed_type(mut self, directed_type: DirectedType) -> Self {
        self.directed_type = directed_type;
        self
    }

    pub fn in_out_type(mut self, include: IncludeIncomingOutgoing) -> Self {
        self.include_incoming_outgoing = include;
        self
    }

    pub fn seed_matching(mut self, seed_matching: SeedMatching) -> Self {
        self.seed_matching = seed_matching;
        self
    }
}

/// Every element in the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GetAllElements {
    #[serde(default)]
    pub view: View,
    #[serde(default)]
    pub directed_type: DirectedType,
}

impl GetAllElements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(mut self, view: View) -> Self {
        self.view = view;
        self
    }

    pub fn directed_type(mut self, directed_type: DirectedType) -> Self {
        self.directed_type = directed_type;
        self
    }
}

/// Vertices one hop away from the input seeds, along edges in the view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GetAdjacentIds {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input: Vec<ElementId>,
    #[serde(default)]
    pub view: View,
    #[serde(default)]
    pub directed_type: DirectedType,
    #[serde(default, rename = "includeIncomingOutGoing")]
    pub include_incoming_outgoing: IncludeIncomingOutgoing,
}

impl GetAdjacentIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input<I, T>(mut self, seeds: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ElementId>,
    {
        self.input = seeds.into_iter().map(Into::into).collect();
        self
    }

    pub fn view(mut self, view: View) -> Self {
        self.view = view;
        self
    }

    pub fn directed_type(mut self, directed_type: DirectedType) -> Self {
        self.directed_type = directed_type;
        self
    }

    pub fn in_out_type(mut self, include: IncludeIncomingOutgoing) -> Self {
        self.include_incoming_outgoing = include;
        self
    }
}

/// Ingest elements into the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddElements {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input: Vec<Element>,
    #[serde(default = "default_true")]
    pub validate: bool,
    #[serde(default)]
    pub skip_invalid_elements: bool,
}

impl Default for AddElements {
    fn default() -> Self {
        Self {
            input: Vec::new(),
            validate: true,
            skip_invalid_elements: false,
        }
    }
}

impl AddElements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input<I, T>(mut self, elements: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Element>,
    {
        self.input = elements.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    pub fn skip_invalid_elements(mut self, skip: bool) -> Self {
        self.skip_invalid_elements = skip;
        self
    }
}

/// Turn records into elements with a registered generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerateElements {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input: Vec<Record>,
    /// Name the generator was registered under
    pub generator: String,
}

impl GenerateElements {
    pub fn new(generator: impl Into<String>) -> Self {
        Self {
            input: Vec::new(),
            generator: generator.into(),
        }
    }

    pub fn input(mut self, records: Vec<Record>) -> Self {
        self.input = records;
        self
    }
}

/// Cap the number of results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Limit {
    pub result_limit: usize,
    /// When false, exceeding the limit is an error instead of a cut
    #[serde(default = "default_true")]
    pub truncate: bool,
}

impl Limit {
    pub fn new(result_limit: usize) -> Self {
        Self {
            result_limit,
            truncate: true,
        }
    }

    pub fn truncate(mut self, truncate: bool) -> Self {
        self.truncate = truncate;
        self
    }
}

/// Which ends of an edge id become vertices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeVertices {
    None,
    Source,
    Destination,
    #[default]
    Both,
}

/// Whether to use the matched end of an edge instead of fixed ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UseMatchedVertex {
    #[default]
    Ignore,
    Equal,
    Opposite,
}

/// Convert element ids to their vertex values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ToVertices {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input: Vec<ElementId>,
    #[serde(default)]
    pub edge_vertices: EdgeVertices,
    #[serde(default)]
    pub use_matched_vertex: UseMatchedVertex,
}

impl ToVertices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn edge_vertices(mut self, edge_vertices: EdgeVertices) -> Self {
        self.edge_vertices = edge_vertices;
        self
    }

    pub fn use_matched_vertex(mut self, use_matched_vertex: UseMatchedVertex) -> Self {
        self.use_matched_vertex = use_matched_vertex;
        self
    }
}

/// Wrap values as entity seeds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ToEntitySeeds {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input: Vec<Value>,
}

impl ToEntitySeeds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input<I, T>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        self.input = values.into_iter().map(Into::into).collect();
        self
    }
}

/// Format elements as CSV lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToCsv {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input: Vec<Element>,
    pub generator: CsvGenerator,
    #[serde(default = "default_true")]
    pub include_header: bool,
}

impl ToCsv {
    pub fn new(generator: CsvGenerator) -> Self {
        Self {
            input: Vec::new(),
            generator,
            include_header: true,
        }
    }

    pub fn include_header(mut self, include_header: bool) -> Self {
        self.include_header = include_header;
        self
    }
}

/// Orders elements by one property of the listed groups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementPropertyComparator {
    pub groups: BTreeSet<String>,
    pub property: String,
    #[serde(default)]
    pub reverse: bool,
}

impl ElementPropertyComparator {
    pub fn new<I, S>(groups: I, property: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            groups: groups.into_iter().map(Into::into).collect(),
            property: property.into(),
            reverse: false,
        }
    }

    pub fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }
}

/// Sort elements, optionally keeping only the top results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Sort {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input: Vec<Element>,
    pub comparators: Vec<ElementPropertyComparator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_limit: Option<usize>,
    #[serde(default)]
    pub deduplicate: bool,
}

impl Sort {
    pub fn new(comparators: Vec<ElementPropertyComparator>) -> Self {
        Self {
            comparators,
            ..Default::default()
        }
    }

    pub fn result_limit(mut self, limit: usize) -> Self {
        self.result_limit = Some(limit);
        self
    }

    pub fn deduplicate(mut self, deduplicate: bool) -> Self {
        self.deduplicate = deduplicate;
        self
    }
}

/// What ForEach does when one iteration fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailurePolicy {
    /// Abort the whole operation at the first failure
    #[default]
    FailFast,
    /// Record the failure in the execution context and carry on
    Continue,
}

/// Run a sub-chain once per input item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForEach {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input: Vec<Item>,
    pub operation: OperationChain,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    /// Evaluate iterations on the rayon pool; output order is kept
    #[serde(default)]
    pub parallel: bool,
}

impl ForEach {
    pub fn new(operation: OperationChain) -> Self {
        Self {
            input: Vec::new(),
            operation,
            failure_policy: FailurePolicy::default(),
            parallel: false,
        }
    }

    pub fn input<I, T>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Item>,
    {
        self.input = items.into_iter().map(Into::into).collect();
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// A single step of an operation chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "class")]
pub enum Operation {
    GetElements(GetElements),
    GetAllElements(GetAllElements),
    GetAdjacentIds(GetAdjacentIds),
    AddElements(AddElements),
    GenerateElements(GenerateElements),
    ToSet,
    ToList,
    ToSingletonList,
    Limit(Limit),
    ToVertices(ToVertices),
    ToEntitySeeds(ToEntitySeeds),
    ToCsv(ToCsv),
    Sort(Sort),
    Count,
    DiscardOutput,
    ForEach(ForEach),
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::GetElements(_) => "GetElements",
            Operation::GetAllElements(_) => "GetAllElements",
            Operation::GetAdjacentIds(_) => "GetAdjacentIds",
            Operation::AddElements(_) => "AddElements",
            Operation::GenerateElements(_) => "GenerateElements",
            Operation::ToSet => "ToSet",
            Operation::ToList => "ToList",
            Operation::ToSingletonList => "ToSingletonList",
            Operation::Limit(_) => "Limit",
            Operation::ToVertices(_) => "ToVertices",
            Operation::ToEntitySeeds(_) => "ToEntitySeeds",
            Operation::ToCsv(_) => "ToCsv",
            Operation::Sort(_) => "Sort",
            Operation::Count => "Count",
            Operation::DiscardOutput => "DiscardOutput",
            Operation::ForEach(_) => "ForEach",
        }
    }

    /// Kind of stream this operation consumes
    pub fn input_kind(&self) -> IoKind {
        match self {
            Operation::GetElements(_) | Operation::GetAdjacentIds(_) | Operation::ToVertices(_) => IoKind::ElementIds,
            Operation::GetAllElements(_) => IoKind::Void,
            Operation::AddElements(_) | Operation::ToCsv(_) | Operation::Sort(_) => IoKind::Elements,
            Operation::GenerateElements(_) => IoKind::Records,
            Operation::ToEntitySeeds(_) => IoKind::Objects,
            Operation::ToSet
            | Operation::ToList
            | Operation::ToSingletonList
            | Operation::Limit(_)
            | Operation::Count
            | Operation::DiscardOutput
            | Operation::ForEach(_) => IoKind::Any,
        }
    }

    /// Kind of stream produced when fed a stream of `input`
    pub fn output_kind(&self, input: IoKind) -> IoKind {
        match self {
            Operation::GetElements(_)
            | Operation::GetAllElements(_)
            | Operation::GenerateElements(_)
            | Operation::Sort(_) => IoKind::Elements,
            Operation::GetAdjacentIds(_) | Operation::ToEntitySeeds(_) => IoKind::ElementIds,
            Operation::AddElements(_) | Operation::DiscardOutput => IoKind::Void,
            Operation::ToSet | Operation::ToList | Operation::ToSingletonList | Operation::Limit(_) => input,
            Operation::ToVertices(_) | Operation::Count => IoKind::Objects,
            Operation::ToCsv(_) => IoKind::Strings,
            Operation::ForEach(for_each) => for_each.operation.output_kind(),
        }
    }

    /// Kind of this operation's own input when it heads a chain
    ///
    /// Pass-through heads stay `Any`: as the head of a ForEach sub-chain they
    /// receive the outer item, whose kind is only known at run time.
    pub fn head_kind(&self) -> IoKind {
        match self {
            Operation::ForEach(for_each) => common_kind(for_each.input.iter().map(Item::kind)),
            other => other.input_kind(),
        }
    }
}

/// Single kind shared by all items, `Objects` when mixed, `Void` when empty
fn common_kind(mut kinds: impl Iterator<Item = IoKind>) -> IoKind {
    let Some(first) = kinds.next() else {
        return IoKind::Void;
    };
    if kinds.all(|k| k == first) {
        first
    } else {
        IoKind::Objects
    }
}

macro_rules! impl_into_operation {
    ($($op:ident),* $(,)?) => {
        $(
            impl From<$op> for Operation {
                fn from(op: $op) -> Self {
                    Operation::$op(op)
                }
            }
        )*
    };
}

impl_into_operation!(
    GetElements,
    GetAllElements,
    GetAdjacentIds,
    AddElements,
    GenerateElements,
    Limit,
    ToVertices,
    ToEntitySeeds,
    ToCsv,
    Sort,
    ForEach,
);
