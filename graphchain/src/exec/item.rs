// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Items flowing between operations

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::generator::Record;
use crate::plan::IoKind;
use crate::storage::{Element, ElementId, EntitySeed, Value};

/// One value in an operation's output stream
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Item {
    Element(Element),
    Id(ElementId),
    Value(Value),
    Record(Record),
}

impl Item {
    /// Kind of stream this item belongs to
    pub fn kind(&self) -> IoKind {
        match self {
            Item::Element(_) => IoKind::Elements,
            Item::Id(_) => IoKind::ElementIds,
            Item::Value(Value::String(_)) => IoKind::Strings,
            Item::Value(_) => IoKind::Objects,
            Item::Record(_) => IoKind::Records,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Item::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn into_element(self) -> Option<Element> {
        match self {
            Item::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Element id of this item; elements yield their own id
    pub fn into_id(self) -> Option<ElementId> {
        match self {
            Item::Id(id) => Some(id),
            Item::Element(e) => Some(e.id()),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Item::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Item::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }

    pub fn into_record(self) -> Option<Record> {
        match self {
            Item::Record(r) => Some(r),
            _ => None,
        }
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Item::Element(e) => write!(f, "{}", e),
            Item::Id(ElementId::Entity(seed)) => write!(f, "EntitySeed[vertex={}]", seed.vertex),
            Item::Id(ElementId::Edge(seed)) => write!(
                f,
                "EdgeSeed[source={}, destination={}, directed={:?}]",
                seed.source, seed.destination, seed.directed
            ),
            Item::Value(v) => write!(f, "{}", v),
            Item::Record(r) => write!(f, "{}", r),
        }
    }
}

impl From<Element> for Item {
    fn from(e: Element) -> Self {
        Item::Element(e)
    }
}

impl From<ElementId> for Item {
    fn from(id: ElementId) -> Self {
        Item::Id(id)
    }
}

impl From<EntitySeed> for Item {
    fn from(seed: EntitySeed) -> Self {
        Item::Id(ElementId::Entity(seed))
    }
}

impl From<Value> for Item {
    fn from(v: Value) -> Self {
        Item::Value(v)
    }
}

impl From<Record> for Item {
    fn from(r: Record) -> Self {
        Item::Record(r)
    }
}
