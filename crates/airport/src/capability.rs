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

//! Given a table, figures out which optional capabilities it implements
//! and exposes a single place the DML pipeline asks "how do I write to
//! this table" instead of scattering `as_updatable`/`as_updatable_batch`
//! checks across handlers.

use crate::catalog::{
    DeletableBatchTable, DeletableTable, DynamicSchemaTable, StatisticsTable, Table, TableRef,
    UpdatableBatchTable, UpdatableTable,
};
use crate::error::AirportError;

/// The update path selected for a table, after applying the "batch wins"
/// precedence rule.
pub enum UpdatePlan<'a> {
    Batch(&'a dyn UpdatableBatchTable),
    RowIds(&'a dyn UpdatableTable),
    Unsupported,
}

/// The delete path selected for a table, mirroring `UpdatePlan`.
pub enum DeletePlan<'a> {
    Batch(&'a dyn DeletableBatchTable),
    RowIds(&'a dyn DeletableTable),
    Unsupported,
}

/// Picks the UPDATE capability to drive, preferring the batch form.
#[must_use]
pub fn update_plan(table: &dyn Table) -> UpdatePlan<'_> {
    if let Some(batch) = table.as_updatable_batch() {
        UpdatePlan::Batch(batch)
    } else if let Some(row_ids) = table.as_updatable() {
        UpdatePlan::RowIds(row_ids)
    } else {
        UpdatePlan::Unsupported
    }
}

/// Picks the DELETE capability to drive, preferring the batch form.
#[must_use]
pub fn delete_plan(table: &dyn Table) -> DeletePlan<'_> {
    if let Some(batch) = table.as_deletable_batch() {
        DeletePlan::Batch(batch)
    } else if let Some(row_ids) = table.as_deletable() {
        DeletePlan::RowIds(row_ids)
    } else {
        DeletePlan::Unsupported
    }
}

/// Returns the requested table's `InsertableTable` narrowing, or a stable
/// `FailedPrecondition` when absent.
pub fn require_insertable(
    table: &dyn Table,
    table_name: &str,
) -> Result<&dyn crate::catalog::InsertableTable, AirportError> {
    table
        .as_insertable()
        .ok_or_else(|| AirportError::capability_missing(table_name, "INSERT"))
}

pub fn require_update(table: &dyn Table, table_name: &str) -> Result<UpdatePlan<'_>, AirportError> {
    match update_plan(table) {
        UpdatePlan::Unsupported => Err(AirportError::capability_missing(table_name, "UPDATE")),
        plan => Ok(plan),
    }
}

pub fn require_delete(table: &dyn Table, table_name: &str) -> Result<DeletePlan<'_>, AirportError> {
    match delete_plan(table) {
        DeletePlan::Unsupported => Err(AirportError::capability_missing(table_name, "DELETE")),
        plan => Ok(plan),
    }
}

pub fn require_statistics(
    table: &dyn Table,
    table_name: &str,
) -> Result<&dyn StatisticsTable, AirportError> {
    table
        .as_statistics_table()
        .ok_or_else(|| AirportError::Unimplemented {
            what: format!("column_statistics on table `{table_name}`"),
        })
}

#[must_use]
pub fn as_dynamic_schema_table(table: &dyn Table) -> Option<&dyn DynamicSchemaTable> {
    table.as_dynamic_schema_table()
}

#[must_use]
pub fn as_table_ref(table: &dyn Table) -> Option<&dyn TableRef> {
    table.as_table_ref()
}

pub fn require_dynamic_table(
    table: &dyn Table,
    table_name: &str,
) -> Result<&dyn crate::catalog::DynamicTable, AirportError> {
    table
        .as_dynamic_table()
        .ok_or_else(|| AirportError::capability_missing(table_name, "column DDL"))
}
