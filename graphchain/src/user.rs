// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! User identity threaded through chain execution

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Identity and data auths of the caller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    #[serde(default)]
    pub data_auths: BTreeSet<String>,
}

impl User {
    pub const UNKNOWN_USER_ID: &'static str = "UNKNOWN";

    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            data_auths: BTreeSet::new(),
        }
    }

    pub fn with_auths<I, S>(user_id: impl Into<String>, auths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            user_id: user_id.into(),
            data_auths: auths.into_iter().map(Into::into).collect(),
        }
    }

    pub fn unknown() -> Self {
        Self::new(Self::UNKNOWN_USER_ID)
    }

    /// True when the user holds every listed auth
    pub fn has_all(&self, auths: &[String]) -> bool {
        auths.iter().all(|auth| self.data_auths.contains(auth))
    }
}
