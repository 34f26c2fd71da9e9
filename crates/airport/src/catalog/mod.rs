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

//! The trait surface a host process implements to plug a catalog of
//! schemas, tables and functions into the protocol engine.
//!
//! Capability traits (`InsertableTable`, `UpdatableTable`, ...) are kept as
//! independent sub-traits of `Table` rather than one monolithic interface
//! with default "unsupported" methods, so that `dyn Table` objects can be
//! narrowed to the capabilities they actually implement (the capability
//! dispatcher does the narrowing in `crate::capability`).

pub mod function;

use std::pin::Pin;
use std::sync::Arc;

use arrow::array::ArrayRef;
use arrow::record_batch::RecordBatch;
use arrow_schema::{DataType, SchemaRef};
use async_trait::async_trait;
use futures::Stream;

use crate::error::AirportError;
pub use function::{ScalarFunction, Signature, TableFunction, TableFunctionInOut};

/// A stream of record batches, as returned by any `Scan` or DML callback.
/// Boxed and pinned so trait objects can return it without an associated
/// stream type per implementation.
pub type RecordBatchStream =
    Pin<Box<dyn Stream<Item = Result<RecordBatch, AirportError>> + Send>>;

/// `{Unit, Value}` time-travel point threaded through a ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimePoint {
    /// Seconds since the epoch (`ts` in the wire ticket).
    Timestamp(i64),
    /// Nanoseconds since the epoch (`ts_ns` in the wire ticket).
    TimestampNanos(i64),
}

impl TimePoint {
    /// Builds a `TimePoint` from a ticket's optional `ts`/`ts_ns` fields,
    /// enforcing exclusivity and non-negativity invariants *before* any
    /// catalog lookup happens.
    pub fn from_ticket_fields(
        ts: Option<i64>,
        ts_ns: Option<i64>,
    ) -> Result<Option<Self>, AirportError> {
        match (ts, ts_ns) {
            (Some(_), Some(_)) => Err(AirportError::TimePointConflict),
            (Some(value), None) => {
                if value < 0 {
                    return Err(AirportError::NegativeTimestamp { value });
                }
                Ok(Some(TimePoint::Timestamp(value)))
            }
            (None, Some(value)) => {
                if value < 0 {
                    return Err(AirportError::NegativeTimestamp { value });
                }
                Ok(Some(TimePoint::TimestampNanos(value)))
            }
            (None, None) => Ok(None),
        }
    }
}

/// Options recognized by `Table::scan`.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Empty = all columns.
    pub columns: Vec<String>,
    /// Opaque predicate bytes; implementations MAY ignore.
    pub filter: Option<Vec<u8>>,
    /// `None`/`<= 0` = no limit.
    pub limit: Option<i64>,
    /// `0` = implementation default.
    pub batch_size: usize,
    pub time_point: Option<TimePoint>,
}

/// Options accompanying an INSERT/UPDATE/DELETE.
#[derive(Debug, Clone, Default)]
pub struct DmlOptions {
    pub returning: bool,
    pub returning_columns: Vec<String>,
    pub transaction_id: Option<String>,
}

/// Result of a DML callback. `returning_data` ownership transfers to the
/// DML pipeline once the callback returns.
pub struct DmlResult {
    pub affected_rows: i64,
    pub returning_data: Option<RecordBatchStream>,
}

impl DmlResult {
    #[must_use]
    pub fn affected(affected_rows: i64) -> Self {
        Self { affected_rows, returning_data: None }
    }

    #[must_use]
    pub fn with_returning(affected_rows: i64, returning_data: RecordBatchStream) -> Self {
        Self { affected_rows, returning_data: Some(returning_data) }
    }
}

/// Column-level planner statistics. Every field is optional; absence
/// means "unknown" on the wire.
#[derive(Debug, Clone, Default)]
pub struct ColumnStatistics {
    pub has_null: Option<bool>,
    pub has_not_null: Option<bool>,
    pub distinct_count: Option<u64>,
    pub min: Option<rmpv::Value>,
    pub max: Option<rmpv::Value>,
    pub max_string_length: Option<u64>,
    pub contains_unicode: Option<bool>,
}

/// Identifies the rowid pseudocolumn in `schema`: a column literally named
/// `rowid`, else the first column carrying field metadata `is_rowid=true`,
/// else `None`.
#[must_use]
pub fn find_rowid_column(schema: Option<&arrow_schema::Schema>) -> Option<usize> {
    let schema = schema?;
    if let Some(idx) = schema.index_of("rowid").ok() {
        return Some(idx);
    }
    schema.fields().iter().position(|f| {
        f.metadata().get("is_rowid").map(String::as_str) == Some("true")
    })
}

/// Root catalog object. `Send + Sync` so it can be shared across
/// concurrently-running requests without additional synchronization on the
/// engine's part; implementations own their own interior mutability.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn schemas(&self) -> Result<Vec<Arc<dyn Schema>>, AirportError>;
    async fn schema(&self, name: &str) -> Result<Option<Arc<dyn Schema>>, AirportError>;

    /// Capability narrowing for `DynamicCatalog`, same pattern as `Table`'s
    /// `as_insertable` et al.
    fn as_dynamic(&self) -> Option<&dyn DynamicCatalog> {
        None
    }
}

/// Extension: catalogs that support runtime schema creation/deletion.
#[async_trait]
pub trait DynamicCatalog: Catalog {
    async fn create_schema(
        &self,
        name: &str,
        comment: Option<&str>,
    ) -> Result<Arc<dyn Schema>, AirportError>;

    async fn drop_schema(&self, name: &str) -> Result<(), AirportError>;
}

/// Extension: catalogs that report their own name for multi-catalog
/// routing. An empty name denotes the default catalog.
pub trait Named {
    fn catalog_name(&self) -> &str;
}

#[async_trait]
pub trait Schema: Send + Sync {
    fn name(&self) -> &str;
    fn comment(&self) -> Option<&str> {
        None
    }

    async fn tables(&self) -> Result<Vec<Arc<dyn Table>>, AirportError>;
    async fn table(&self, name: &str) -> Result<Option<Arc<dyn Table>>, AirportError>;

    async fn scalar_functions(&self) -> Result<Vec<Arc<dyn ScalarFunction>>, AirportError> {
        Ok(Vec::new())
    }
    async fn table_functions(&self) -> Result<Vec<Arc<dyn TableFunction>>, AirportError> {
        Ok(Vec::new())
    }
    async fn table_functions_in_out(&self) -> Result<Vec<Arc<dyn TableFunctionInOut>>, AirportError> {
        Ok(Vec::new())
    }

    /// Capability narrowing for `DynamicSchema`.
    fn as_dynamic(&self) -> Option<&dyn DynamicSchema> {
        None
    }
}

/// Extension: schemas that support runtime table DDL.
#[async_trait]
pub trait DynamicSchema: Schema {
    async fn create_table(
        &self,
        name: &str,
        schema: SchemaRef,
        comment: Option<&str>,
    ) -> Result<Arc<dyn Table>, AirportError>;

    async fn drop_table(&self, name: &str) -> Result<(), AirportError>;

    async fn rename_table(&self, old_name: &str, new_name: &str) -> Result<(), AirportError>;
}

/// A schema-qualified object DuckDB scans.
#[async_trait]
pub trait Table: Send + Sync {
    fn name(&self) -> &str;
    fn comment(&self) -> Option<&str> {
        None
    }

    /// Full or projected Arrow schema. `columns` is a hint; DuckDB performs
    /// client-side projection regardless, so implementations MAY return the
    /// full schema.
    fn arrow_schema(&self, columns_hint: &[String]) -> Result<SchemaRef, AirportError>;

    async fn scan(&self, options: ScanOptions) -> Result<RecordBatchStream, AirportError>;

    // Capability narrowing: each optional capability is detected by asking
    // the table to hand back a reference to itself through the matching
    // accessor. A concrete table that implements e.g. `InsertableTable`
    // overrides `as_insertable` to return `Some(self)`; everything else
    // stays the default `None`. This is the "interface narrowing" the
    // capability dispatcher drives, without scattered type checks in
    // handlers.
    fn as_insertable(&self) -> Option<&dyn InsertableTable> {
        None
    }
    fn as_updatable(&self) -> Option<&dyn UpdatableTable> {
        None
    }
    fn as_updatable_batch(&self) -> Option<&dyn UpdatableBatchTable> {
        None
    }
    fn as_deletable(&self) -> Option<&dyn DeletableTable> {
        None
    }
    fn as_deletable_batch(&self) -> Option<&dyn DeletableBatchTable> {
        None
    }
    fn as_dynamic_schema_table(&self) -> Option<&dyn DynamicSchemaTable> {
        None
    }
    fn as_statistics_table(&self) -> Option<&dyn StatisticsTable> {
        None
    }
    fn as_table_ref(&self) -> Option<&dyn TableRef> {
        None
    }
    fn as_dynamic_table(&self) -> Option<&dyn DynamicTable> {
        None
    }
}

/// Column/field-level DDL (`add_column`, `remove_column`, `rename_column`,
/// `change_column_type`, `set_not_null`, `drop_not_null`, `set_default`,
/// `add_field`, `rename_field`). Kept as one capability trait with an
/// operation enum rather than nine traits, since these are treated as a
/// single DDL surface routed through the same capability dispatcher check.
#[async_trait]
pub trait DynamicTable: Send + Sync {
    async fn alter(&self, operation: AlterTableOperation) -> Result<(), AirportError>;
}

#[derive(Debug, Clone)]
pub enum AlterTableOperation {
    AddColumn { field: arrow_schema::Field, if_not_exists: bool },
    RemoveColumn { name: String, if_exists: bool },
    RenameColumn { old_name: String, new_name: String },
    ChangeColumnType { name: String, new_type: DataType },
    SetNotNull { name: String },
    DropNotNull { name: String },
    SetDefault { name: String, default: Option<rmpv::Value> },
    AddField { column: String, field: arrow_schema::Field },
    RenameField { column: String, old_name: String, new_name: String },
}

#[async_trait]
pub trait InsertableTable: Send + Sync {
    async fn insert(
        &self,
        input: RecordBatchStream,
        options: DmlOptions,
    ) -> Result<DmlResult, AirportError>;
}

#[async_trait]
pub trait UpdatableTable: Send + Sync {
    async fn update(
        &self,
        row_ids: Vec<i64>,
        input: RecordBatchStream,
        options: DmlOptions,
    ) -> Result<DmlResult, AirportError>;
}

/// Takes precedence over `UpdatableTable` when a table implements both.
#[async_trait]
pub trait UpdatableBatchTable: Send + Sync {
    async fn update_batch(
        &self,
        input: RecordBatchStream,
        options: DmlOptions,
    ) -> Result<DmlResult, AirportError>;
}

#[async_trait]
pub trait DeletableTable: Send + Sync {
    async fn delete(&self, row_ids: Vec<i64>, options: DmlOptions) -> Result<DmlResult, AirportError>;
}

#[async_trait]
pub trait DeletableBatchTable: Send + Sync {
    async fn delete_batch(
        &self,
        input: RecordBatchStream,
        options: DmlOptions,
    ) -> Result<DmlResult, AirportError>;
}

/// Request passed to `DynamicSchemaTable::schema_for_request`.
#[derive(Debug, Clone, Default)]
pub struct SchemaRequest {
    pub time_point: Option<TimePoint>,
}

/// Tables whose Arrow schema depends on a `TimePoint` (time-travel).
#[async_trait]
pub trait DynamicSchemaTable: Send + Sync {
    async fn schema_for_request(&self, request: SchemaRequest) -> Result<SchemaRef, AirportError>;
}

#[async_trait]
pub trait StatisticsTable: Send + Sync {
    async fn column_statistics(
        &self,
        column_name: &str,
        column_type: &arrow_schema::DataType,
    ) -> Result<ColumnStatistics, AirportError>;
}

/// A single server-side function-call invocation a `TableRef` table is
/// exposed as (e.g. `read_csv(url, header := true)`).
#[derive(Debug, Clone)]
pub struct FunctionCall {
    pub function_name: String,
    pub parameters: Vec<ArrayRef>,
    pub named_parameters: Vec<(String, ArrayRef)>,
}

/// Request passed to `TableRef::function_calls`.
#[derive(Debug, Clone, Default)]
pub struct TableRefRequest {
    pub columns: Vec<String>,
}

/// Tables exposed as one or more server-side DuckDB function invocations
/// instead of a `Scan` callback.
#[async_trait]
pub trait TableRef: Send + Sync {
    async fn function_calls(
        &self,
        request: TableRefRequest,
    ) -> Result<Vec<FunctionCall>, AirportError>;
}
