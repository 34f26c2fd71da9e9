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

//! Routes a request to the catalog named by the `airport-catalog` header,
//! empty meaning the default catalog. Backed by `dashmap` for lock-free
//! concurrent reads.

use std::sync::Arc;

use dashmap::DashMap;

use crate::catalog::Catalog;
use crate::error::AirportError;

/// The key under which the default (empty-named) catalog is stored.
const DEFAULT_CATALOG_KEY: &str = "";

pub struct CatalogRegistry {
    catalogs: DashMap<String, Arc<dyn Catalog>>,
}

impl CatalogRegistry {
    /// Builds a registry whose default catalog is `default`.
    #[must_use]
    pub fn new(default: Arc<dyn Catalog>) -> Self {
        let catalogs = DashMap::new();
        catalogs.insert(DEFAULT_CATALOG_KEY.to_string(), default);
        Self { catalogs }
    }

    /// Registers `catalog` under `name`. Fails with `AlreadyExists` if a
    /// catalog with that name is already registered.
    pub fn add_catalog(&self, name: &str, catalog: Arc<dyn Catalog>) -> Result<(), AirportError> {
        if self.catalogs.contains_key(name) {
            return Err(AirportError::already_exists("catalog", name));
        }
        self.catalogs.insert(name.to_string(), catalog);
        Ok(())
    }

    /// Removes a named catalog. Fails with `NotFound` if absent.
    pub fn remove_catalog(&self, name: &str) -> Result<(), AirportError> {
        if self.catalogs.remove(name).is_none() {
            return Err(AirportError::not_found("catalog", name));
        }
        Ok(())
    }

    /// Resolves `name` (empty string = default) to a registered catalog.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Catalog>, AirportError> {
        self.catalogs
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| AirportError::not_found("catalog", name))
    }
}
