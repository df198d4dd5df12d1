// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Per-execution context

use parking_lot::Mutex;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::GraphError;
use crate::user::User;

/// A ForEach iteration that failed under `FailurePolicy::Continue`
#[derive(Debug)]
pub struct ForEachFailure {
    /// Chain position of the ForEach operation
    pub position: usize,
    /// Zero-based index of the outer item
    pub iteration: usize,
    pub error: GraphError,
}

#[derive(Debug)]
struct ContextInner {
    job_id: Uuid,
    user: User,
    failures: Mutex<Vec<ForEachFailure>>,
}

/// Identity and bookkeeping for one chain execution
///
/// Cloning is cheap; clones share the failure log. Result streams keep a
/// clone so iterations that run after `execute` returns can still record
/// failures.
#[derive(Debug, Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    pub fn new(user: User) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                job_id: Uuid::new_v4(),
                user,
                failures: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn job_id(&self) -> Uuid {
        self.inner.job_id
    }

    pub fn user(&self) -> &User {
        &self.inner.user
    }

    pub(crate) fn record_failure(&self, failure: ForEachFailure) {
        self.inner.failures.lock().push(failure);
    }

    pub fn failure_count(&self) -> usize {
        self.inner.failures.lock().len()
    }

    /// Iterations of failed ForEach runs, in the order they were recorded
    pub fn failed_iterations(&self) -> Vec<usize> {
        self.inner.failures.lock().iter().map(|f| f.iteration).collect()
    }

    /// Remove and return the recorded failures
    pub fn take_failures(&self) -> Vec<ForEachFailure> {
        std::mem::take(&mut *self.inner.failures.lock())
    }
}
