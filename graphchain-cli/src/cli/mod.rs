// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! CLI module for graphchain
//!
//! Provides schema and chain validation, and one-off chain execution over
//! an in-memory graph.

pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{Cli, Commands};
pub use handlers::{handle_run, handle_validate, handle_version};
