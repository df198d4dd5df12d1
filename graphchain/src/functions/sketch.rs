// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Opaque sketch values
//!
//! Frequency, sampling and cardinality sketches come from external
//! libraries. The engine only stores them and merges them through
//! [`Sketch::union`]; it never looks inside.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::FunctionError;

/// A mergeable probabilistic summary
pub trait Sketch: fmt::Debug + Send + Sync {
    /// Short name of the sketch family, e.g. `longs-frequency`
    fn kind(&self) -> &str;

    /// Merge two sketches of the same family into a new sketch
    fn union(&self, other: &dyn Sketch) -> Result<Arc<dyn Sketch>, FunctionError>;

    /// Downcast support for callers that know the concrete type
    fn as_any(&self) -> &dyn Any;

    /// Human readable description used when printing elements
    fn summary(&self) -> String {
        format!("<{} sketch>", self.kind())
    }
}

/// Shared handle to a sketch stored as a property value
#[derive(Clone)]
pub struct SketchValue(Arc<dyn Sketch>);

impl SketchValue {
    pub fn new<S: Sketch + 'static>(sketch: S) -> Self {
        SketchValue(Arc::new(sketch))
    }

    pub fn from_arc(sketch: Arc<dyn Sketch>) -> Self {
        SketchValue(sketch)
    }

    pub fn kind(&self) -> &str {
        self.0.kind()
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    /// Merge with another sketch, refusing to mix sketch families
    pub fn union(&self, other: &SketchValue) -> Result<SketchValue, FunctionError> {
        if self.kind() != other.kind() {
            return Err(FunctionError::invalid_input(
                "SketchUnion",
                format!("cannot merge {} with {}", self.kind(), other.kind()),
            ));
        }
        self.0.union(other.0.as_ref()).map(SketchValue)
    }

    fn addr(&self) -> *const () {
        Arc::as_ptr(&self.0) as *const ()
    }
}

impl fmt::Debug for SketchValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for SketchValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.summary())
    }
}

// Identity semantics: two handles are equal when they share the sketch.
impl PartialEq for SketchValue {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for SketchValue {}

impl Hash for SketchValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}
