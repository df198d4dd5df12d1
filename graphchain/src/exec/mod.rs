// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Operation chain execution
//!
//! This module provides the executor that binds a chain against the schema
//! and runs it as a lazy pipeline, the items that flow between operations,
//! and the cursors that hand results back to callers.

pub mod context;
pub mod cursor;
pub mod executor;
pub mod item;

// Re-export the main types for convenience
pub use context::{Context, ForEachFailure};
pub use cursor::{ItemStream, Output, ResultCursor};
pub use executor::Executor;
pub use item::Item;
