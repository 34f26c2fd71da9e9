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

//! Request context propagation.
//!
//! The `airport-catalog`, `airport-operation` and `airport-transaction-id`
//! headers are parsed once per request and made available to every handler
//! through a `tokio::task_local!`.

use std::future::Future;
use std::sync::{Arc, OnceLock};

use http::HeaderMap;

use crate::auth::AuthIdentity;

/// The DoExchange verb subtype carried by the `airport-operation` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AirportOperation {
    Insert,
    Update,
    Delete,
    ScalarFunction,
    TableFunctionInOut,
}

impl AirportOperation {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "insert" => Some(Self::Insert),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            "scalar_function" => Some(Self::ScalarFunction),
            "table_function_in_out" => Some(Self::TableFunctionInOut),
            _ => None,
        }
    }
}

/// Per-request state threaded through every handler via task-local scoping.
pub struct RequestContext {
    catalog_name: Option<String>,
    operation: Option<AirportOperation>,
    transaction_id: Option<String>,
    identity: OnceLock<AuthIdentity>,
}

tokio::task_local! {
    static REQUEST_CONTEXT: Arc<RequestContext>;
}

impl RequestContext {
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let catalog_name = headers
            .get("airport-catalog")
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_owned);

        let operation = headers
            .get("airport-operation")
            .and_then(|v| v.to_str().ok())
            .and_then(AirportOperation::parse);

        let transaction_id = headers
            .get("airport-transaction-id")
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_owned);

        Self { catalog_name, operation, transaction_id, identity: OnceLock::new() }
    }

    #[must_use]
    pub fn catalog_name(&self) -> Option<&str> {
        self.catalog_name.as_deref()
    }

    #[must_use]
    pub fn operation(&self) -> Option<AirportOperation> {
        self.operation
    }

    #[must_use]
    pub fn transaction_id(&self) -> Option<&str> {
        self.transaction_id.as_deref()
    }

    pub fn set_identity(&self, identity: AuthIdentity) {
        // Best-effort: the interceptor is the only writer, so a lost race
        // here means the identity was already recorded for this request.
        let _ = self.identity.set(identity);
    }

    #[must_use]
    pub fn identity(&self) -> Option<&AuthIdentity> {
        self.identity.get()
    }

    /// Returns the context for the current request, if called from within
    /// a `scope`d future; `None` outside of request handling (e.g. tests
    /// that build their own context explicitly should prefer `scope`).
    #[must_use]
    pub fn current() -> Option<Arc<RequestContext>> {
        REQUEST_CONTEXT.try_with(Arc::clone).ok()
    }

    /// Runs `f` with `self` installed as the current request context.
    pub async fn scope<F>(self: Arc<Self>, f: F) -> F::Output
    where
        F: Future,
    {
        REQUEST_CONTEXT.scope(self, f).await
    }
}
