// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Graph elements (entities and edges) and the ids used to seed queries

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::Value;

/// Property map of an element, ordered by name
pub type Properties = BTreeMap<String, Value>;

/// Which end of an edge matched a query seed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MatchedVertex {
    Source,
    Destination,
}

/// Directedness filter for edges and edge seeds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DirectedType {
    #[default]
    Either,
    Directed,
    Undirected,
}

impl DirectedType {
    pub fn accepts(&self, directed: bool) -> bool {
        match self {
            DirectedType::Either => true,
            DirectedType::Directed => directed,
            DirectedType::Undirected => !directed,
        }
    }
}

/// Identifier keywords that can be selected alongside property names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentifierType {
    Group,
    Vertex,
    Source,
    Destination,
    Directed,
    MatchedVertex,
    AdjacentMatchedVertex,
}

impl IdentifierType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "GROUP" => Some(IdentifierType::Group),
            "VERTEX" => Some(IdentifierType::Vertex),
            "SOURCE" => Some(IdentifierType::Source),
            "DESTINATION" => Some(IdentifierType::Destination),
            "DIRECTED" => Some(IdentifierType::Directed),
            "MATCHED_VERTEX" => Some(IdentifierType::MatchedVertex),
            "ADJACENT_MATCHED_VERTEX" => Some(IdentifierType::AdjacentMatchedVertex),
            _ => None,
        }
    }
}

/// An entity: properties attached to a single vertex
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Entity {
    pub group: String,
    pub vertex: Value,
    #[serde(default)]
    pub properties: Properties,
}

impl Entity {
    pub fn new(group: impl Into<String>, vertex: impl Into<Value>) -> Self {
        Self {
            group: group.into(),
            vertex: vertex.into(),
            properties: Properties::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }
}

/// An edge between two vertices
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Edge {
    pub group: String,
    pub source: Value,
    pub destination: Value,
    pub directed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_vertex: Option<MatchedVertex>,
    #[serde(default)]
    pub properties: Properties,
}

impl Edge {
    /// Create an edge; undirected edges are stored with `source <= destination`
    pub fn new(
        group: impl Into<String>,
        source: impl Into<Value>,
        destination: impl Into<Value>,
        directed: bool,
    ) -> Self {
        let mut edge = Self {
            group: group.into(),
            source: source.into(),
            destination: destination.into(),
            directed,
            matched_vertex: None,
            properties: Properties::new(),
        };
        edge.normalise();
        edge
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Order the vertices of an undirected edge
    pub fn normalise(&mut self) {
        if !self.directed && self.source.compare(&self.destination).is_gt() {
            std::mem::swap(&mut self.source, &mut self.destination);
        }
    }

    /// Vertex at the matched end, or the source when nothing matched
    pub fn matched(&self) -> &Value {
        match self.matched_vertex {
            Some(MatchedVertex::Destination) => &self.destination,
            _ => &self.source,
        }
    }

    /// Vertex opposite the matched end
    pub fn adjacent(&self) -> &Value {
        match self.matched_vertex {
            Some(MatchedVertex::Destination) => &self.source,
            _ => &self.destination,
        }
    }
}

/// A graph element
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Element {
    Entity(Entity),
    Edge(Edge),
}

impl Element {
    pub fn group(&self) -> &str {
        match self {
            Element::Entity(e) => &e.group,
            Element::Edge(e) => &e.group,
        }
    }

    pub fn is_entity(&self) -> bool {
        matches!(self, Element::Entity(_))
    }

    pub fn properties(&self) -> &Properties {
        match self {
            Element::Entity(e) => &e.properties,
            Element::Edge(e) => &e.properties,
        }
    }

    pub fn properties_mut(&mut self) -> &mut Properties {
        match self {
            Element::Entity(e) => &mut e.properties,
            Element::Edge(e) => &mut e.properties,
        }
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties().get(name)
    }

    pub fn set_property(&mut self, name: impl Into<String>, value: Value) {
        self.properties_mut().insert(name.into(), value);
    }

    /// Value of an identifier, `Null` when the element has no such identifier
    pub fn identifier(&self, identifier: IdentifierType) -> Value {
        match (self, identifier) {
            (_, IdentifierType::Group) => Value::String(self.group().to_string()),
            (Element::Entity(e), IdentifierType::Vertex) => e.vertex.clone(),
            (Element::Edge(e), IdentifierType::Source) => e.source.clone(),
            (Element::Edge(e), IdentifierType::Destination) => e.destination.clone(),
            (Element::Edge(e), IdentifierType::Directed) => Value::Boolean(e.directed),
            (Element::Edge(e), IdentifierType::MatchedVertex) => e.matched().clone(),
            (Element::Edge(e), IdentifierType::AdjacentMatchedVertex) => e.adjacent().clone(),
            _ => Value::Null,
        }
    }

    /// Resolve a selection: an identifier keyword or a property name
    pub fn selection(&self, name: &str) -> Value {
        match IdentifierType::from_name(name) {
            Some(identifier) => self.identifier(identifier),
            None => self.property(name).cloned().unwrap_or(Value::Null),
        }
    }

    /// Id of this element, used when it is passed to a seeded operation
    pub fn id(&self) -> ElementId {
        match self {
            Element::Entity(e) => ElementId::Entity(EntitySeed::new(e.vertex.clone())),
            Element::Edge(e) => ElementId::Edge(EdgeSeed {
                source: e.source.clone(),
                destination: e.destination.clone(),
                directed: if e.directed {
                    DirectedType::Directed
                } else {
                    DirectedType::Undirected
                },
                matched_vertex: e.matched_vertex,
            }),
        }
    }

    /// Identity without properties: group plus vertex or edge ends
    pub fn identity_key(&self) -> (String, Vec<Value>) {
        match self {
            Element::Entity(e) => (e.group.clone(), vec![e.vertex.clone()]),
            Element::Edge(e) => (
                e.group.clone(),
                vec![e.source.clone(), e.destination.clone(), Value::Boolean(e.directed)],
            ),
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let props: Vec<String> = self
            .properties()
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        match self {
            Element::Entity(e) => write!(f, "Entity[group={}, vertex={}, properties={{{}}}]", e.group, e.vertex, props.join(", ")),
            Element::Edge(e) => write!(
                f,
                "Edge[group={}, source={}, destination={}, directed={}, properties={{{}}}]",
                e.group,
                e.source,
                e.destination,
                e.directed,
                props.join(", ")
            ),
        }
    }
}

impl From<Entity> for Element {
    fn from(e: Entity) -> Self {
        Element::Entity(e)
    }
}

impl From<Edge> for Element {
    fn from(e: Edge) -> Self {
        Element::Edge(e)
    }
}

/// Seed for a single vertex
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct EntitySeed {
    pub vertex: Value,
}

impl EntitySeed {
    pub fn new(vertex: impl Into<Value>) -> Self {
        Self { vertex: vertex.into() }
    }
}

/// Seed for an edge between two vertices
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct EdgeSeed {
    pub source: Value,
    pub destination: Value,
    #[serde(default)]
    pub directed: DirectedType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_vertex: Option<MatchedVertex>,
}

impl EdgeSeed {
    pub fn new(source: impl Into<Value>, destination: impl Into<Value>, directed: DirectedType) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            directed,
            matched_vertex: None,
        }
    }

    /// Whether an edge has the same ends and compatible directedness
    pub fn matches(&self, edge: &Edge) -> bool {
        if !self.directed.accepts(edge.directed) {
            return false;
        }
        let same = self.source == edge.source && self.destination == edge.destination;
        let reversed = self.source == edge.destination && self.destination == edge.source;
        same || (!edge.directed && reversed)
    }
}

/// An element id: what seeded operations take as input
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ElementId {
    Entity(EntitySeed),
    Edge(EdgeSeed),
}

impl ElementId {
    /// Vertices this id touches
    pub fn vertices(&self) -> Vec<&Value> {
        match self {
            ElementId::Entity(seed) => vec![&seed.vertex],
            ElementId::Edge(seed) => vec![&seed.source, &seed.destination],
        }
    }
}

impl From<EntitySeed> for ElementId {
    fn from(seed: EntitySeed) -> Self {
        ElementId::Entity(seed)
    }
}

impl From<EdgeSeed> for ElementId {
    fn from(seed: EdgeSeed) -> Self {
        ElementId::Edge(seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undirected_edges_are_normalised() {
        let edge = Edge::new("road", "B", "A", false);
        assert_eq!(edge.source, Value::from("A"));
        assert_eq!(edge.destination, Value::from("B"));

        let directed = Edge::new("road", "B", "A", true);
        assert_eq!(directed.source, Value::from("B"));
    }

    #[test]
    fn edge_seed_matches_either_orientation_for_undirected() {
        let edge = Edge::new("road", "A", "B", false);
        assert!(EdgeSeed::new("B", "A", DirectedType::Undirected).matches(&edge));
        assert!(EdgeSeed::new("A", "B", DirectedType::Either).matches(&edge));
        assert!(!EdgeSeed::new("A", "B", DirectedType::Directed).matches(&edge));

        let directed = Edge::new("road", "A", "B", true);
        assert!(!EdgeSeed::new("B", "A", DirectedType::Either).matches(&directed));
    }

    #[test]
    fn selection_resolves_identifiers_and_properties() {
        let element: Element = Entity::new("JunctionUse", "M32:2").with_property("count", 4i64).into();
        assert_eq!(element.selection("VERTEX"), Value::from("M32:2"));
        assert_eq!(element.selection("GROUP"), Value::from("JunctionUse"));
        assert_eq!(element.selection("count"), Value::Long(4));
        assert_eq!(element.selection("missing"), Value::Null);
        assert_eq!(element.selection("SOURCE"), Value::Null);
    }

    #[test]
    fn matched_vertex_picks_ends() {
        let mut edge = Edge::new("road", "A", "B", true);
        edge.matched_vertex = Some(MatchedVertex::Destination);
        assert_eq!(edge.matched(), &Value::from("B"));
        assert_eq!(edge.adjacent(), &Value::from("A"));
    }
}
