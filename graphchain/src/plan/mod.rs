// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Operation chain planning
//!
//! This module provides the operation catalogue, the input/output kind
//! lattice used to type-check chains, and the chain builder.

pub mod chain;
pub mod operation;

pub use chain::{OperationChain, OperationChainBuilder};
pub use operation::{
    AddElements, EdgeVertices, ElementPropertyComparator, FailurePolicy, ForEach, GenerateElements, GetAdjacentIds,
    GetAllElements, GetElements, IoKind, Limit, Operation, Sort, ToCsv, ToEntitySeeds, ToVertices, UseMatchedVertex,
};
