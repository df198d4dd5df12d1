// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Property functions used by schemas and views
//!
//! This module provides:
//! - Predicates for element filters
//! - Transform functions for element transformers
//! - Aggregate (binary) operators used to merge properties
//! - The opaque sketch value wrapper
//! - A registry for caller-supplied functions, resolved by name once

pub mod aggregate;
pub mod predicate;
pub mod registry;
pub mod sketch;
pub mod transform;

pub use aggregate::{AggregateFunction, BinaryOperator};
pub use predicate::{Pattern, Predicate};
pub use registry::FunctionRegistry;
pub use sketch::{Sketch, SketchValue};
pub use transform::{Function, TransformFunction};

use thiserror::Error;

/// Errors raised by predicates, transforms, aggregators and generators
#[derive(Error, Debug)]
pub enum FunctionError {
    #[error("Invalid input for {function}: {message}")]
    InvalidInput { function: String, message: String },

    #[error("{function} expects {expected} input(s), got {actual}")]
    Arity {
        function: String,
        expected: usize,
        actual: usize,
    },

    #[error("Unknown {kind} '{name}'")]
    Unknown { kind: &'static str, name: String },

    #[error("Invalid function configuration: {0}")]
    InvalidConfig(String),

    #[error("Element generator failed: {0}")]
    Generator(String),
}

impl FunctionError {
    pub(crate) fn invalid_input(function: &str, message: impl Into<String>) -> Self {
        FunctionError::InvalidInput {
            function: function.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn check_arity(
        function: &str,
        expected: usize,
        inputs: &[crate::storage::Value],
    ) -> Result<(), FunctionError> {
        if inputs.len() != expected {
            return Err(FunctionError::Arity {
                function: function.to_string(),
                expected,
                actual: inputs.len(),
            });
        }
        Ok(())
    }
}
