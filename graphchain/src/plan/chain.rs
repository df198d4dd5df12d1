// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Type-checked operation chains

use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{IoKind, Operation};
use crate::error::GraphError;

/// Serialized form of a chain; converted through the builder on load
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChainDef {
    operations: Vec<Operation>,
}

/// An ordered, type-checked sequence of operations
///
/// Chains are only produced by [`OperationChainBuilder::build`] (or by
/// deserialization, which goes through the builder), so every adjacent pair
/// of operations is known to be compatible. Execution never mutates a chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ChainDef", into = "ChainDef")]
pub struct OperationChain {
    operations: Vec<Operation>,
    output: IoKind,
}

impl OperationChain {
    pub fn builder() -> OperationChainBuilder {
        OperationChainBuilder::default()
    }

    /// Chain of a single operation
    pub fn of(operation: impl Into<Operation>) -> Result<Self, GraphError> {
        Self::builder().first(operation).build()
    }

    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        serde_json::from_str(json).map_err(|e| GraphError::InvalidOperation(format!("failed to parse chain: {}", e)))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, GraphError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| GraphError::InvalidOperation(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String, GraphError> {
        serde_json::to_string_pretty(self).map_err(|e| GraphError::InvalidOperation(e.to_string()))
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn first(&self) -> Option<&Operation> {
        self.operations.first()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Kind of stream the last operation produces
    pub fn output_kind(&self) -> IoKind {
        self.output
    }
}

impl TryFrom<ChainDef> for OperationChain {
    type Error = GraphError;

    fn try_from(def: ChainDef) -> Result<Self, Self::Error> {
        def.operations
            .into_iter()
            .fold(OperationChain::builder(), |builder, operation| builder.then(operation))
            .build()
    }
}

impl From<OperationChain> for ChainDef {
    fn from(chain: OperationChain) -> Self {
        ChainDef {
            operations: chain.operations,
        }
    }
}

/// Incremental chain builder
///
/// Each call to [`then`](Self::then) checks the new operation's input kind
/// against the previous operation's output kind. The first mismatch is
/// remembered and returned by [`build`](Self::build).
#[derive(Debug, Default)]
pub struct OperationChainBuilder {
    operations: Vec<Operation>,
    output: IoKind,
    error: Option<GraphError>,
}

impl OperationChainBuilder {
    pub fn first(self, operation: impl Into<Operation>) -> Self {
        self.then(operation)
    }

    pub fn then(mut self, operation: impl Into<Operation>) -> Self {
        let operation = operation.into();
        let position = self.operations.len();
        if self.error.is_none() {
            let found = if position == 0 { operation.head_kind() } else { self.output };
            if let Err(e) = check(position, &operation, found) {
                debug!("Rejected {} at position {}: {}", operation.name(), position, e);
                self.error = Some(e);
            }
            self.output = operation.output_kind(found);
        }
        self.operations.push(operation);
        self
    }

    pub fn build(self) -> Result<OperationChain, GraphError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        if self.operations.is_empty() {
            return Err(GraphError::InvalidOperation("an operation chain needs at least one operation".to_string()));
        }
        Ok(OperationChain {
            operations: self.operations,
            output: self.output,
        })
    }
}

fn check(position: usize, operation: &Operation, found: IoKind) -> Result<(), GraphError> {
    let mismatch = |expected: IoKind, found: IoKind| GraphError::TypeMismatch {
        position,
        operation: operation.name().to_string(),
        expected,
        found,
    };
    // Heads read their own input, which always fits.
    if position > 0 && !operation.input_kind().accepts(found) {
        return Err(mismatch(operation.input_kind(), found));
    }
    if let Operation::ForEach(for_each) = operation {
        // Each outer item becomes the head input of the sub-chain.
        if let Some(head) = for_each.operation.first() {
            if found != IoKind::Void && !head.input_kind().accepts(found) {
                return Err(mismatch(head.input_kind(), found));
            }
        }
    }
    Ok(())
}
