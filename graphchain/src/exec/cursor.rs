// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Result cursors handed back to callers
//!
//! A cursor owns the whole lazy pipeline behind a chain's output. Dropping
//! the pipeline drops every store cursor inside it, which returns their
//! leases; `close`, exhaustion and `Drop` all do this exactly once.

use log::debug;

use super::Item;
use crate::error::GraphError;
use crate::storage::{Element, Value};

/// Lazy stream of items between operations
pub type ItemStream = Box<dyn Iterator<Item = Result<Item, GraphError>> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    Open,
    Exhausted,
    Closed { reported: bool },
}

/// Finite, non-restartable iterator over a chain's results
pub struct ResultCursor {
    stream: Option<ItemStream>,
    state: CursorState,
}

impl ResultCursor {
    pub fn new(stream: ItemStream) -> Self {
        Self {
            stream: Some(stream),
            state: CursorState::Open,
        }
    }

    /// Release backend resources. Closing twice is a no-op.
    pub fn close(&mut self) {
        if matches!(self.state, CursorState::Closed { .. }) {
            return;
        }
        if self.stream.take().is_some() {
            debug!("Result cursor closed early");
        }
        self.state = CursorState::Closed { reported: false };
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, CursorState::Closed { .. })
    }

    /// Collect every remaining item, stopping at the first error
    pub fn collect_items(self) -> Result<Vec<Item>, GraphError> {
        self.collect()
    }

    pub fn into_elements(self) -> Result<Vec<Element>, GraphError> {
        self.map(|item| {
            item.and_then(|item| {
                item.into_element()
                    .ok_or_else(|| GraphError::InvalidOperation("result is not an element".to_string()))
            })
        })
        .collect()
    }

    pub fn into_values(self) -> Result<Vec<Value>, GraphError> {
        self.map(|item| {
            item.and_then(|item| {
                item.into_value()
                    .ok_or_else(|| GraphError::InvalidOperation("result is not a value".to_string()))
            })
        })
        .collect()
    }

    pub fn into_strings(self) -> Result<Vec<String>, GraphError> {
        self.map(|item| {
            item.and_then(|item| match item {
                Item::Value(Value::String(s)) => Ok(s),
                other => Err(GraphError::InvalidOperation(format!("result {} is not a string", other))),
            })
        })
        .collect()
    }
}

impl Iterator for ResultCursor {
    type Item = Result<Item, GraphError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.state {
            CursorState::Open => {
                let next = self.stream.as_mut().and_then(|s| s.next());
                if next.is_none() {
                    self.stream = None;
                    self.state = CursorState::Exhausted;
                }
                next
            }
            CursorState::Exhausted => None,
            CursorState::Closed { reported: false } => {
                self.state = CursorState::Closed { reported: true };
                Some(Err(GraphError::IteratorClosed))
            }
            CursorState::Closed { reported: true } => None,
        }
    }
}

impl std::fmt::Debug for ResultCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCursor").field("state", &self.state).finish()
    }
}

/// What executing a chain produced
#[derive(Debug)]
pub enum Output {
    /// The last operation produced nothing (e.g. `AddElements`)
    Void,
    Items(ResultCursor),
}

impl Output {
    pub fn is_void(&self) -> bool {
        matches!(self, Output::Void)
    }

    pub fn into_cursor(self) -> Option<ResultCursor> {
        match self {
            Output::Void => None,
            Output::Items(cursor) => Some(cursor),
        }
    }

    pub fn into_items(self) -> Result<Vec<Item>, GraphError> {
        match self {
            Output::Void => Ok(Vec::new()),
            Output::Items(cursor) => cursor.collect_items(),
        }
    }

    pub fn into_elements(self) -> Result<Vec<Element>, GraphError> {
        match self {
            Output::Void => Ok(Vec::new()),
            Output::Items(cursor) => cursor.into_elements(),
        }
    }

    pub fn into_values(self) -> Result<Vec<Value>, GraphError> {
        match self {
            Output::Void => Ok(Vec::new()),
            Output::Items(cursor) => cursor.into_values(),
        }
    }

    pub fn into_strings(self) -> Result<Vec<String>, GraphError> {
        match self {
            Output::Void => Ok(Vec::new()),
            Output::Items(cursor) => cursor.into_strings(),
        }
    }
}
