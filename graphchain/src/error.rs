// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Top-level error type for chain building and execution
//!
//! Component errors (schema, store, functions, configuration) convert into
//! [`GraphError`] with `?`. Errors raised while an operation runs are wrapped
//! once in [`GraphError::OperationExecution`] carrying the zero-based chain
//! position of the operation that produced them.

use thiserror::Error;

use crate::config::ConfigError;
use crate::functions::FunctionError;
use crate::plan::IoKind;
use crate::schema::SchemaError;
use crate::storage::StoreError;

/// Kind of access that was refused to a user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

impl std::fmt::Display for Access {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Access::Read => write!(f, "read"),
            Access::Write => write!(f, "write"),
        }
    }
}

/// Errors surfaced by graph construction, chain building and execution
#[derive(Error, Debug)]
pub enum GraphError {
    /// An operation's input kind cannot accept its predecessor's output kind
    #[error(
        "Type mismatch at operation {position} ({operation}): expected input {expected}, found {found}"
    )]
    TypeMismatch {
        position: usize,
        operation: String,
        expected: IoKind,
        found: IoKind,
    },

    /// The user lacks the auths required for a group
    #[error("User '{user}' is not authorised to {access} group '{group}' (operation {position})")]
    Authorization {
        position: usize,
        user: String,
        group: String,
        access: Access,
    },

    /// A failure raised while an operation was running
    #[error("Operation {position} ({operation}) failed: {source}")]
    OperationExecution {
        position: usize,
        operation: String,
        #[source]
        source: Box<GraphError>,
    },

    /// A result cursor was read after it was closed
    #[error("Result iterator has been closed")]
    IteratorClosed,

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Function error: {0}")]
    Function(#[from] FunctionError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Limit of {limit} results exceeded")]
    LimitExceeded { limit: usize },
}

impl GraphError {
    /// Attach a chain position to an error raised inside an operation.
    ///
    /// Errors that already identify their stage are returned unchanged so a
    /// failure keeps the position where it originated as it flows downstream.
    pub fn at(self, position: usize, operation: &str) -> GraphError {
        match self {
            e @ GraphError::OperationExecution { .. }
            | e @ GraphError::TypeMismatch { .. }
            | e @ GraphError::Authorization { .. }
            | e @ GraphError::IteratorClosed => e,
            other => GraphError::OperationExecution {
                position,
                operation: operation.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Chain position of the failing operation, when known
    pub fn position(&self) -> Option<usize> {
        match self {
            GraphError::TypeMismatch { position, .. }
            | GraphError::Authorization { position, .. }
            | GraphError::OperationExecution { position, .. } => Some(*position),
            _ => None,
        }
    }

    /// Innermost error, skipping positional wrappers
    pub fn root_cause(&self) -> &GraphError {
        match self {
            GraphError::OperationExecution { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Result alias used throughout the crate
pub type GraphResult<T> = Result<T, GraphError>;
