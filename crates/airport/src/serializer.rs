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

//! Projects the catalog interface tree into Flight-SQL-shaped record
//! batches and emits ZStandard-compressed Arrow IPC, the wire shape
//! `list_schemas` and `list_tables` reply with.
//!
//! Ordering is always lexicographic on names so repeated calls against an
//! unchanged catalog produce byte-identical envelopes.

use std::sync::Arc;

use arrow::array::{ArrayRef, StringArray, StringBuilder};
use arrow::record_batch::RecordBatch;
use arrow_ipc::writer::StreamWriter;
use arrow_schema::{DataType, Field, Schema as ArrowSchema, SchemaRef};

use crate::catalog::{Catalog, Schema, Table};
use crate::envelope::zstd_frame;
use crate::error::AirportError;

fn schemas_record_schema() -> SchemaRef {
    Arc::new(ArrowSchema::new(vec![
        Field::new("schema_name", DataType::Utf8, false),
        Field::new("comment", DataType::Utf8, true),
    ]))
}

fn tables_record_schema() -> SchemaRef {
    Arc::new(ArrowSchema::new(vec![
        Field::new("schema_name", DataType::Utf8, false),
        Field::new("table_name", DataType::Utf8, false),
        Field::new("comment", DataType::Utf8, true),
        // IPC-encoded Arrow schema for the table.
        Field::new("table_schema", DataType::Binary, false),
    ]))
}

fn columns_record_schema() -> SchemaRef {
    Arc::new(ArrowSchema::new(vec![
        Field::new("schema_name", DataType::Utf8, false),
        Field::new("table_name", DataType::Utf8, false),
        Field::new("column_name", DataType::Utf8, false),
        Field::new("column_type", DataType::Utf8, false),
        Field::new("ordinal_position", DataType::Int32, false),
    ]))
}

/// Encodes a single `RecordBatch` as a zstd-framed Arrow IPC stream.
fn frame_batch(batch: &RecordBatch) -> Result<Vec<u8>, AirportError> {
    let mut buf = Vec::new();
    {
        let mut writer = StreamWriter::try_new(&mut buf, &batch.schema())
            .map_err(|e| AirportError::internal(format!("failed to start IPC stream: {e}")))?;
        writer
            .write(batch)
            .map_err(|e| AirportError::internal(format!("failed to write IPC batch: {e}")))?;
        writer
            .finish()
            .map_err(|e| AirportError::internal(format!("failed to finish IPC stream: {e}")))?;
    }
    zstd_frame(&buf)
}

/// Walks `catalog.schemas()` into a `{schema_name, comment}` batch.
pub async fn list_schemas(catalog: &dyn Catalog) -> Result<Vec<u8>, AirportError> {
    let mut schemas = catalog.schemas().await?;
    schemas.sort_by(|a, b| a.name().cmp(b.name()));

    let mut names = StringBuilder::new();
    let mut comments = StringBuilder::new();
    for schema in &schemas {
        names.append_value(schema.name());
        match schema.comment() {
            Some(c) => comments.append_value(c),
            None => comments.append_null(),
        }
    }

    let batch = RecordBatch::try_new(
        schemas_record_schema(),
        vec![
            Arc::new(names.finish()) as ArrayRef,
            Arc::new(comments.finish()) as ArrayRef,
        ],
    )
    .map_err(|e| AirportError::internal(format!("failed to build schemas batch: {e}")))?;

    frame_batch(&batch)
}

/// Walks `schema.tables()` into a `{schema_name, table_name, comment,
/// table_schema}` batch.
pub async fn list_tables(schema: &dyn Schema) -> Result<Vec<u8>, AirportError> {
    let mut tables = schema.tables().await?;
    tables.sort_by(|a, b| a.name().cmp(b.name()));

    let mut schema_names = StringBuilder::new();
    let mut table_names = StringBuilder::new();
    let mut comments = StringBuilder::new();
    let mut table_schemas: Vec<Option<Vec<u8>>> = Vec::with_capacity(tables.len());

    for table in &tables {
        schema_names.append_value(schema.name());
        table_names.append_value(table.name());
        match table.comment() {
            Some(c) => comments.append_value(c),
            None => comments.append_null(),
        }
        let arrow_schema = table.arrow_schema(&[])?;
        table_schemas.push(Some(encode_schema_ipc(&arrow_schema)?));
    }

    let table_schema_array = arrow::array::BinaryArray::from(
        table_schemas.iter().map(|s| s.as_deref()).collect::<Vec<_>>(),
    );

    let batch = RecordBatch::try_new(
        tables_record_schema(),
        vec![
            Arc::new(schema_names.finish()) as ArrayRef,
            Arc::new(table_names.finish()) as ArrayRef,
            Arc::new(comments.finish()) as ArrayRef,
            Arc::new(table_schema_array) as ArrayRef,
        ],
    )
    .map_err(|e| AirportError::internal(format!("failed to build tables batch: {e}")))?;

    frame_batch(&batch)
}

/// Walks every table in `schema` into a `{schema_name, table_name,
/// column_name, column_type, ordinal_position}` batch.
pub async fn list_columns(schema: &dyn Schema) -> Result<Vec<u8>, AirportError> {
    let mut tables = schema.tables().await?;
    tables.sort_by(|a, b| a.name().cmp(b.name()));

    let mut schema_names = Vec::new();
    let mut table_names = Vec::new();
    let mut column_names = Vec::new();
    let mut column_types = Vec::new();
    let mut ordinals = Vec::new();

    for table in &tables {
        let arrow_schema = table.arrow_schema(&[])?;
        for (idx, field) in arrow_schema.fields().iter().enumerate() {
            schema_names.push(schema.name().to_string());
            table_names.push(table.name().to_string());
            column_names.push(field.name().clone());
            column_types.push(format!("{}", field.data_type()));
            ordinals.push(idx as i32);
        }
    }

    let batch = RecordBatch::try_new(
        columns_record_schema(),
        vec![
            Arc::new(StringArray::from(schema_names)) as ArrayRef,
            Arc::new(StringArray::from(table_names)) as ArrayRef,
            Arc::new(StringArray::from(column_names)) as ArrayRef,
            Arc::new(StringArray::from(column_types)) as ArrayRef,
            Arc::new(arrow::array::Int32Array::from(ordinals)) as ArrayRef,
        ],
    )
    .map_err(|e| AirportError::internal(format!("failed to build columns batch: {e}")))?;

    frame_batch(&batch)
}

/// Encodes an Arrow schema as a standalone IPC stream (used for the
/// `table_schema` blob column and for `table_function_flight_info`
/// replies).
pub fn encode_schema_ipc(schema: &ArrowSchema) -> Result<Vec<u8>, AirportError> {
    let mut buf = Vec::new();
    {
        let writer = StreamWriter::try_new(&mut buf, schema)
            .map_err(|e| AirportError::internal(format!("failed to start schema IPC: {e}")))?;
        writer
            .finish()
            .map_err(|e| AirportError::internal(format!("failed to finish schema IPC: {e}")))?;
    }
    Ok(buf)
}

/// Decodes an IPC-encoded Arrow schema (as carried by `create_table`'s
/// `schema` field and `add_column`'s `column` field).
pub fn decode_schema_ipc(bytes: &[u8]) -> Result<SchemaRef, AirportError> {
    let reader = arrow_ipc::reader::StreamReader::try_new(bytes, None)
        .map_err(|e| AirportError::malformed(format!("invalid IPC schema: {e}")))?;
    Ok(reader.schema())
}
