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

//! An in-memory reference catalog exercising every capability the
//! integration tests drive: batch-path DML, row-id-path DML, RETURNING,
//! time-travel via a dynamic schema table, a scalar function, and a
//! table-valued function.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use airport::catalog::{
    find_rowid_column, Catalog, DeletableBatchTable, DeletableTable, DmlOptions, DmlResult,
    DynamicSchemaTable, InsertableTable, RecordBatchStream, ScalarFunction, ScanOptions, Schema,
    SchemaRequest, Signature, Table, TableFunction, UpdatableBatchTable, UpdatableTable,
};
use airport::error::AirportError;
use arrow::array::{Array, ArrayRef, BooleanArray, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use arrow_schema::{DataType, Field, Schema as ArrowSchema, SchemaRef};
use async_trait::async_trait;
use futures::StreamExt;

/// Which UPDATE/DELETE capability a [`MemoryTable`] exposes. Both modes
/// share the same storage/projection logic; only the capability-narrowing
/// accessors differ, mirroring the precedence rule under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Batch,
    RowId,
}

fn full_schema(user_schema: &SchemaRef) -> SchemaRef {
    let mut fields = vec![Field::new("rowid", DataType::Int64, false).with_metadata(
        HashMap::from([("is_rowid".to_string(), "true".to_string())]),
    )];
    fields.extend(user_schema.fields().iter().map(|f| f.as_ref().clone()));
    Arc::new(ArrowSchema::new(fields))
}

fn project_columns(batch: &RecordBatch, names: &[String]) -> Result<RecordBatch, AirportError> {
    if names.is_empty() {
        return Ok(batch.clone());
    }
    let schema = batch.schema();
    let mut fields = Vec::with_capacity(names.len());
    let mut columns = Vec::with_capacity(names.len());
    for name in names {
        let idx = schema
            .index_of(name)
            .map_err(|_| AirportError::not_found("column", name.clone()))?;
        fields.push(schema.field(idx).clone());
        columns.push(Arc::clone(batch.column(idx)));
    }
    RecordBatch::try_new(Arc::new(ArrowSchema::new(fields)), columns)
        .map_err(|e| AirportError::internal(format!("failed to project returning columns: {e}")))
}

fn retain_rows_not_in(
    rows: &[RecordBatch],
    rowid_idx: usize,
    exclude: &HashSet<i64>,
) -> Result<Vec<RecordBatch>, AirportError> {
    let mut out = Vec::with_capacity(rows.len());
    for batch in rows {
        let ids = batch
            .column(rowid_idx)
            .as_any()
            .downcast_ref::<Int64Array>()
            .ok_or_else(|| AirportError::TypeMismatch {
                expected: "Int64".to_string(),
                actual: batch.column(rowid_idx).data_type().to_string(),
            })?;
        let mask: BooleanArray = ids.iter().map(|v| Some(!exclude.contains(&v.unwrap_or_default()))).collect();
        let filtered = arrow::compute::filter_record_batch(batch, &mask)
            .map_err(|e| AirportError::internal(format!("failed to filter rows: {e}")))?;
        if filtered.num_rows() > 0 {
            out.push(filtered);
        }
    }
    Ok(out)
}

/// A growable in-memory table. Row storage is the full schema (`rowid` +
/// user columns); insert input is the user schema alone.
pub struct MemoryTable {
    name: String,
    user_schema: SchemaRef,
    schema: SchemaRef,
    rows: Mutex<Vec<RecordBatch>>,
    next_rowid: AtomicI64,
    mode: WriteMode,
}

impl MemoryTable {
    #[must_use]
    pub fn new(name: impl Into<String>, user_schema: SchemaRef, mode: WriteMode) -> Arc<Self> {
        let schema = full_schema(&user_schema);
        Arc::new(Self {
            name: name.into(),
            user_schema,
            schema,
            rows: Mutex::new(Vec::new()),
            next_rowid: AtomicI64::new(1),
            mode,
        })
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().iter().map(RecordBatch::num_rows).sum()
    }
}

#[async_trait]
impl Table for MemoryTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn arrow_schema(&self, _columns_hint: &[String]) -> Result<SchemaRef, AirportError> {
        Ok(Arc::clone(&self.schema))
    }

    async fn scan(&self, options: ScanOptions) -> Result<RecordBatchStream, AirportError> {
        let mut rows = self.rows.lock().unwrap().clone();
        if let Some(limit) = options.limit {
            if limit >= 0 {
                let mut remaining = limit as usize;
                let mut limited = Vec::new();
                for batch in rows {
                    if remaining == 0 {
                        break;
                    }
                    if batch.num_rows() <= remaining {
                        remaining -= batch.num_rows();
                        limited.push(batch);
                    } else {
                        limited.push(batch.slice(0, remaining));
                        remaining = 0;
                    }
                }
                rows = limited;
            }
        }
        Ok(Box::pin(futures::stream::iter(rows.into_iter().map(Ok))))
    }

    fn as_insertable(&self) -> Option<&dyn InsertableTable> {
        Some(self)
    }

    fn as_updatable(&self) -> Option<&dyn UpdatableTable> {
        matches!(self.mode, WriteMode::RowId).then_some(self as &dyn UpdatableTable)
    }

    fn as_updatable_batch(&self) -> Option<&dyn UpdatableBatchTable> {
        matches!(self.mode, WriteMode::Batch).then_some(self as &dyn UpdatableBatchTable)
    }

    fn as_deletable(&self) -> Option<&dyn DeletableTable> {
        matches!(self.mode, WriteMode::RowId).then_some(self as &dyn DeletableTable)
    }

    fn as_deletable_batch(&self) -> Option<&dyn DeletableBatchTable> {
        matches!(self.mode, WriteMode::Batch).then_some(self as &dyn DeletableBatchTable)
    }
}

#[async_trait]
impl InsertableTable for MemoryTable {
    async fn insert(
        &self,
        mut input: RecordBatchStream,
        options: DmlOptions,
    ) -> Result<DmlResult, AirportError> {
        let mut affected = 0i64;
        let mut returned = Vec::new();

        while let Some(batch) = input.next().await {
            let batch = batch?;
            if batch.num_columns() != self.user_schema.fields().len() {
                return Err(AirportError::SchemaMismatch {
                    expected: self.user_schema.to_string(),
                    actual: batch.schema().to_string(),
                });
            }
            let n = batch.num_rows();
            let start = self.next_rowid.fetch_add(n as i64, Ordering::SeqCst);
            let rowids = Int64Array::from_iter_values(start..start + n as i64);

            let mut columns: Vec<ArrayRef> = vec![Arc::new(rowids)];
            columns.extend(batch.columns().iter().cloned());
            let full = RecordBatch::try_new(Arc::clone(&self.schema), columns)
                .map_err(|e| AirportError::internal(format!("failed to build inserted batch: {e}")))?;

            self.rows.lock().unwrap().push(full.clone());
            affected += n as i64;

            if options.returning {
                returned.push(project_columns(&full, &options.returning_columns)?);
            }
        }

        if options.returning {
            let stream: RecordBatchStream = Box::pin(futures::stream::iter(returned.into_iter().map(Ok)));
            Ok(DmlResult::with_returning(affected, stream))
        } else {
            Ok(DmlResult::affected(affected))
        }
    }
}

#[async_trait]
impl UpdatableBatchTable for MemoryTable {
    async fn update_batch(
        &self,
        mut input: RecordBatchStream,
        options: DmlOptions,
    ) -> Result<DmlResult, AirportError> {
        let mut affected = 0i64;
        let mut returned = Vec::new();
        let mut replacements = Vec::new();

        while let Some(batch) = input.next().await {
            let batch = batch?;
            let idx = find_rowid_column(Some(batch.schema().as_ref()))
                .ok_or(AirportError::RowIdMissing { operation: "UPDATE" })?;
            let ids = batch
                .column(idx)
                .as_any()
                .downcast_ref::<Int64Array>()
                .ok_or_else(|| AirportError::TypeMismatch {
                    expected: "Int64".to_string(),
                    actual: batch.column(idx).data_type().to_string(),
                })?;
            let exclude: HashSet<i64> = ids.iter().map(|v| v.unwrap_or_default()).collect();

            affected += batch.num_rows() as i64;
            if options.returning {
                returned.push(project_columns(&batch, &options.returning_columns)?);
            }
            replacements.push((exclude, batch));
        }

        {
            let mut rows = self.rows.lock().unwrap();
            for (exclude, replacement) in replacements {
                *rows = retain_rows_not_in(&rows, 0, &exclude)?;
                rows.push(replacement);
            }
        }

        if options.returning {
            let stream: RecordBatchStream = Box::pin(futures::stream::iter(returned.into_iter().map(Ok)));
            Ok(DmlResult::with_returning(affected, stream))
        } else {
            Ok(DmlResult::affected(affected))
        }
    }
}

#[async_trait]
impl DeletableBatchTable for MemoryTable {
    async fn delete_batch(
        &self,
        mut input: RecordBatchStream,
        _options: DmlOptions,
    ) -> Result<DmlResult, AirportError> {
        let mut exclude = HashSet::new();
        let mut affected = 0i64;

        while let Some(batch) = input.next().await {
            let batch = batch?;
            let idx = find_rowid_column(Some(batch.schema().as_ref()))
                .ok_or(AirportError::RowIdMissing { operation: "DELETE" })?;
            let ids = batch
                .column(idx)
                .as_any()
                .downcast_ref::<Int64Array>()
                .ok_or_else(|| AirportError::TypeMismatch {
                    expected: "Int64".to_string(),
                    actual: batch.column(idx).data_type().to_string(),
                })?;
            for v in ids.iter().flatten() {
                exclude.insert(v);
                affected += 1;
            }
        }

        let mut rows = self.rows.lock().unwrap();
        *rows = retain_rows_not_in(&rows, 0, &exclude)?;

        Ok(DmlResult::affected(affected))
    }
}

#[async_trait]
impl UpdatableTable for MemoryTable {
    async fn update(
        &self,
        row_ids: Vec<i64>,
        mut input: RecordBatchStream,
        options: DmlOptions,
    ) -> Result<DmlResult, AirportError> {
        let mut stripped_batches = Vec::new();
        while let Some(batch) = input.next().await {
            stripped_batches.push(batch?);
        }

        let mut offset = 0usize;
        let mut returned = Vec::new();
        let mut replacements = Vec::new();

        for batch in stripped_batches {
            let n = batch.num_rows();
            let ids = Int64Array::from_iter_values(row_ids[offset..offset + n].iter().copied());
            offset += n;

            let mut columns: Vec<ArrayRef> = vec![Arc::new(ids)];
            columns.extend(batch.columns().iter().cloned());
            let full = RecordBatch::try_new(Arc::clone(&self.schema), columns)
                .map_err(|e| AirportError::internal(format!("failed to rebuild updated batch: {e}")))?;

            if options.returning {
                returned.push(project_columns(&full, &options.returning_columns)?);
            }

            let exclude: HashSet<i64> = row_ids[offset - n..offset].iter().copied().collect();
            replacements.push((exclude, full));
        }

        {
            let mut rows = self.rows.lock().unwrap();
            for (exclude, replacement) in replacements {
                *rows = retain_rows_not_in(&rows, 0, &exclude)?;
                rows.push(replacement);
            }
        }

        let affected = row_ids.len() as i64;
        if options.returning {
            let stream: RecordBatchStream = Box::pin(futures::stream::iter(returned.into_iter().map(Ok)));
            Ok(DmlResult::with_returning(affected, stream))
        } else {
            Ok(DmlResult::affected(affected))
        }
    }
}

#[async_trait]
impl DeletableTable for MemoryTable {
    async fn delete(&self, row_ids: Vec<i64>, _options: DmlOptions) -> Result<DmlResult, AirportError> {
        let exclude: HashSet<i64> = row_ids.iter().copied().collect();
        let mut rows = self.rows.lock().unwrap();
        *rows = retain_rows_not_in(&rows, 0, &exclude)?;
        Ok(DmlResult::affected(row_ids.len() as i64))
    }
}

/// A table whose Arrow schema (and data) depends on whether the request
/// carries a `TimePoint`: with no time point, the "current" two-column
/// schema; with one, the narrower "historical" schema.
pub struct HistoryTable {
    current_schema: SchemaRef,
    historical_schema: SchemaRef,
}

impl HistoryTable {
    #[must_use]
    pub fn new() -> Arc<Self> {
        let historical_schema =
            Arc::new(ArrowSchema::new(vec![Field::new("id", DataType::Int64, false), Field::new("name", DataType::Utf8, true)]));
        let current_schema = Arc::new(ArrowSchema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("name", DataType::Utf8, true),
            Field::new("retired", DataType::Boolean, false),
        ]));
        Arc::new(Self { current_schema, historical_schema })
    }
}

#[async_trait]
impl Table for HistoryTable {
    fn name(&self) -> &str {
        "history"
    }

    fn arrow_schema(&self, _columns_hint: &[String]) -> Result<SchemaRef, AirportError> {
        Ok(Arc::clone(&self.current_schema))
    }

    async fn scan(&self, options: ScanOptions) -> Result<RecordBatchStream, AirportError> {
        let batch = if options.time_point.is_some() {
            RecordBatch::try_new(
                Arc::clone(&self.historical_schema),
                vec![
                    Arc::new(Int64Array::from(vec![1, 2])) as ArrayRef,
                    Arc::new(StringArray::from(vec!["old-a", "old-b"])) as ArrayRef,
                ],
            )
        } else {
            RecordBatch::try_new(
                Arc::clone(&self.current_schema),
                vec![
                    Arc::new(Int64Array::from(vec![1, 2])) as ArrayRef,
                    Arc::new(StringArray::from(vec!["new-a", "new-b"])) as ArrayRef,
                    Arc::new(BooleanArray::from(vec![false, false])) as ArrayRef,
                ],
            )
        }
        .map_err(|e| AirportError::internal(format!("failed to build history batch: {e}")))?;

        Ok(Box::pin(futures::stream::once(async move { Ok(batch) })))
    }

    fn as_dynamic_schema_table(&self) -> Option<&dyn DynamicSchemaTable> {
        Some(self)
    }
}

#[async_trait]
impl DynamicSchemaTable for HistoryTable {
    async fn schema_for_request(&self, request: SchemaRequest) -> Result<SchemaRef, AirportError> {
        Ok(if request.time_point.is_some() {
            Arc::clone(&self.historical_schema)
        } else {
            Arc::clone(&self.current_schema)
        })
    }
}

/// `double(x) -> x * 2`, exercised by the scalar-function scenario.
struct DoubleFunction {
    signature: Signature,
}

impl DoubleFunction {
    fn new() -> Self {
        Self { signature: Signature::scalar(vec![DataType::Int64], DataType::Int64) }
    }
}

#[async_trait]
impl ScalarFunction for DoubleFunction {
    fn name(&self) -> &str {
        "double"
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    async fn execute(&self, batch: RecordBatch) -> Result<ArrayRef, AirportError> {
        let input = batch
            .column(0)
            .as_any()
            .downcast_ref::<Int64Array>()
            .ok_or_else(|| AirportError::TypeMismatch {
                expected: "Int64".to_string(),
                actual: batch.column(0).data_type().to_string(),
            })?;
        let out: Int64Array = input.iter().map(|v| v.map(|x| x * 2)).collect();
        Ok(Arc::new(out))
    }
}

fn scalar_i64(params: &[ArrayRef], index: usize) -> Result<i64, AirportError> {
    let array = params
        .get(index)
        .ok_or_else(|| AirportError::malformed(format!("missing parameter {index}")))?;
    let array = array.as_any().downcast_ref::<Int64Array>().ok_or_else(|| AirportError::TypeMismatch {
        expected: "Int64".to_string(),
        actual: array.data_type().to_string(),
    })?;
    Ok(array.value(0))
}

/// `generate_range(start, stop, column_count) -> column_count` columns of
/// `[start, stop)`, one row per value. The output schema depends on the
/// `column_count` parameter, exercising table-function schema negotiation.
struct GenerateRangeFunction {
    signature: Signature,
}

impl GenerateRangeFunction {
    fn new() -> Self {
        Self {
            signature: Signature::table(vec![DataType::Int64, DataType::Int64, DataType::Int64]),
        }
    }

    fn output_schema(column_count: i64) -> SchemaRef {
        let fields = (0..column_count)
            .map(|i| Field::new(format!("c{i}"), DataType::Int64, false))
            .collect::<Vec<_>>();
        Arc::new(ArrowSchema::new(fields))
    }
}

#[async_trait]
impl TableFunction for GenerateRangeFunction {
    fn name(&self) -> &str {
        "generate_range"
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    async fn schema_for_parameters(&self, params: &[ArrayRef]) -> Result<SchemaRef, AirportError> {
        Ok(Self::output_schema(scalar_i64(params, 2)?))
    }

    async fn execute(
        &self,
        params: Vec<ArrayRef>,
        _options: ScanOptions,
    ) -> Result<RecordBatchStream, AirportError> {
        let start = scalar_i64(&params, 0)?;
        let stop = scalar_i64(&params, 1)?;
        let column_count = scalar_i64(&params, 2)?;

        let values: Vec<i64> = (start..stop).collect();
        let schema = Self::output_schema(column_count);
        let columns: Vec<ArrayRef> =
            (0..column_count).map(|_| Arc::new(Int64Array::from(values.clone())) as ArrayRef).collect();
        let batch = RecordBatch::try_new(schema, columns)
            .map_err(|e| AirportError::internal(format!("failed to build generated batch: {e}")))?;

        Ok(Box::pin(futures::stream::once(async move { Ok(batch) })))
    }
}

pub struct MemorySchema {
    name: String,
    tables: HashMap<String, Arc<dyn Table>>,
    functions: Vec<Arc<dyn ScalarFunction>>,
    table_functions: Vec<Arc<dyn TableFunction>>,
}

#[async_trait]
impl Schema for MemorySchema {
    fn name(&self) -> &str {
        &self.name
    }

    async fn tables(&self) -> Result<Vec<Arc<dyn Table>>, AirportError> {
        Ok(self.tables.values().cloned().collect())
    }

    async fn table(&self, name: &str) -> Result<Option<Arc<dyn Table>>, AirportError> {
        Ok(self.tables.get(name).cloned())
    }

    async fn scalar_functions(&self) -> Result<Vec<Arc<dyn ScalarFunction>>, AirportError> {
        Ok(self.functions.clone())
    }

    async fn table_functions(&self) -> Result<Vec<Arc<dyn TableFunction>>, AirportError> {
        Ok(self.table_functions.clone())
    }
}

pub struct MemoryCatalog {
    schemas: HashMap<String, Arc<dyn Schema>>,
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn schemas(&self) -> Result<Vec<Arc<dyn Schema>>, AirportError> {
        Ok(self.schemas.values().cloned().collect())
    }

    async fn schema(&self, name: &str) -> Result<Option<Arc<dyn Schema>>, AirportError> {
        Ok(self.schemas.get(name).cloned())
    }
}

/// Builds the catalog every scenario test shares: a `main` schema holding
/// `events` (batch DML), `legacy_events` (row-id DML), `history`
/// (time-travel), the `double` scalar function, and the `generate_range`
/// table function.
#[must_use]
pub fn build() -> (Arc<MemoryCatalog>, Arc<MemoryTable>, Arc<MemoryTable>) {
    let user_schema = Arc::new(ArrowSchema::new(vec![
        Field::new("name", DataType::Utf8, true),
        Field::new("amount", DataType::Int64, true),
    ]));

    let events = MemoryTable::new("events", Arc::clone(&user_schema), WriteMode::Batch);
    let legacy_events = MemoryTable::new("legacy_events", user_schema, WriteMode::RowId);
    let history = HistoryTable::new();

    let mut tables: HashMap<String, Arc<dyn Table>> = HashMap::new();
    tables.insert(events.name().to_string(), Arc::clone(&events) as Arc<dyn Table>);
    tables.insert(legacy_events.name().to_string(), Arc::clone(&legacy_events) as Arc<dyn Table>);
    tables.insert(history.name().to_string(), history as Arc<dyn Table>);

    let schema = MemorySchema {
        name: "main".to_string(),
        tables,
        functions: vec![Arc::new(DoubleFunction::new())],
        table_functions: vec![Arc::new(GenerateRangeFunction::new())],
    };

    let mut schemas: HashMap<String, Arc<dyn Schema>> = HashMap::new();
    schemas.insert("main".to_string(), Arc::new(schema));

    (Arc::new(MemoryCatalog { schemas }), events, legacy_events)
}
