// Copyright the Airport authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Transaction registry: backs `create_transaction`/`get_transaction_status`
//! and the `TransactionManager` hook the DML pipeline joins without
//! itself committing.

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::AirportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Active,
    Committed,
    Aborted,
}

/// Host-supplied participant in a DDL/DML transaction. The DML pipeline
/// only reads the transaction id and hands it to the callback; actually
/// committing or aborting is this trait's job.
#[async_trait]
pub trait TransactionManager: Send + Sync {
    async fn begin(&self) -> Result<String, AirportError>;
    async fn commit(&self, id: &str) -> Result<(), AirportError>;
    async fn rollback(&self, id: &str) -> Result<(), AirportError>;
}

/// Reader-writer-backed registry of transaction ids to their status,
/// shared process-wide.
pub struct TransactionRegistry {
    statuses: DashMap<String, TransactionStatus>,
}

impl Default for TransactionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self { statuses: DashMap::new() }
    }

    /// Generates a new transaction id and records it as `Active`.
    #[must_use]
    pub fn create(&self) -> String {
        let id = Uuid::new_v4().to_string();
        self.statuses.insert(id.clone(), TransactionStatus::Active);
        id
    }

    /// Returns `{Status, Exists}` for the given transaction id.
    #[must_use]
    pub fn status(&self, id: &str) -> (Option<TransactionStatus>, bool) {
        match self.statuses.get(id) {
            Some(status) => (Some(*status), true),
            None => (None, false),
        }
    }

    pub fn mark_committed(&self, id: &str) {
        if let Some(mut entry) = self.statuses.get_mut(id) {
            *entry = TransactionStatus::Committed;
        }
    }

    pub fn mark_aborted(&self, id: &str) {
        if let Some(mut entry) = self.statuses.get_mut(id) {
            *entry = TransactionStatus::Aborted;
        }
    }
}
