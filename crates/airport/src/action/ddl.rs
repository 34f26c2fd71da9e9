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

//! DDL action handlers: `create_schema`/`drop_schema`/`create_table`/
//! `drop_table`/`rename_table` and the column/field-level DDL actions,
//! all routed through the Capability Dispatcher to `DynamicCatalog`,
//! `DynamicSchema` or `DynamicTable`.

use arrow_schema::{DataType, Field};
use serde::Deserialize;

use super::{encode_reply, resolve_schema, resolve_table, OnConflict};
use crate::capability::require_dynamic_table;
use crate::catalog::{AlterTableOperation, Catalog};
use crate::envelope::decode_action_body;
use crate::error::AirportError;
use crate::serializer::decode_schema_ipc;

#[derive(Debug, Deserialize)]
struct CreateSchemaRequest {
    schema_name: String,
    comment: Option<String>,
    #[serde(default)]
    if_not_exists: bool,
}

#[derive(Debug, serde::Serialize)]
struct CreateSchemaReply {
    schema_name: String,
}

pub(super) async fn create_schema(catalog: &dyn Catalog, body: &[u8]) -> Result<Vec<u8>, AirportError> {
    let req: CreateSchemaRequest = decode_action_body(body)?;
    let dynamic = catalog
        .as_dynamic()
        .ok_or_else(|| AirportError::capability_missing("catalog", "CreateSchema"))?;

    if catalog.schema(&req.schema_name).await?.is_some() {
        // `if_not_exists` is the wire-level stand-in for
        // `on_conflict=ignore`, which `create_schema`'s wire shape lacks.
        if req.if_not_exists {
            return encode_reply(&CreateSchemaReply { schema_name: req.schema_name });
        }
        return Err(AirportError::already_exists("schema", req.schema_name));
    }

    dynamic.create_schema(&req.schema_name, req.comment.as_deref()).await?;
    encode_reply(&CreateSchemaReply { schema_name: req.schema_name })
}

#[derive(Debug, Deserialize)]
struct DropSchemaRequest {
    schema_name: String,
    #[serde(default)]
    if_exists: bool,
}

pub(super) async fn drop_schema(catalog: &dyn Catalog, body: &[u8]) -> Result<Vec<u8>, AirportError> {
    let req: DropSchemaRequest = decode_action_body(body)?;
    let dynamic = catalog
        .as_dynamic()
        .ok_or_else(|| AirportError::capability_missing("catalog", "DropSchema"))?;

    match dynamic.drop_schema(&req.schema_name).await {
        Ok(()) => encode_reply(&()),
        Err(AirportError::NotFound { .. }) if req.if_exists => encode_reply(&()),
        Err(e) => Err(e),
    }
}

#[derive(Debug, Deserialize)]
struct CreateTableRequest {
    schema_name: String,
    table_name: String,
    schema: Vec<u8>,
    comment: Option<String>,
    #[serde(default)]
    on_conflict: OnConflict,
}

#[derive(Debug, serde::Serialize)]
struct CreateTableReply {
    table_name: String,
}

pub(super) async fn create_table(catalog: &dyn Catalog, body: &[u8]) -> Result<Vec<u8>, AirportError> {
    let req: CreateTableRequest = decode_action_body(body)?;
    let schema = resolve_schema(catalog, &req.schema_name).await?;
    let dynamic = schema
        .as_dynamic()
        .ok_or_else(|| AirportError::capability_missing(req.schema_name.as_str(), "CreateTable"))?;

    let existing = schema.table(&req.table_name).await?;
    if let Some(_existing) = existing {
        match req.on_conflict {
            OnConflict::Error => {
                return Err(AirportError::already_exists("table", req.table_name))
            }
            OnConflict::Ignore => {
                return encode_reply(&CreateTableReply { table_name: req.table_name })
            }
            OnConflict::Replace => {
                dynamic.drop_table(&req.table_name).await?;
            }
        }
    }

    let arrow_schema = decode_schema_ipc(&req.schema)?;
    dynamic
        .create_table(&req.table_name, arrow_schema, req.comment.as_deref())
        .await?;
    encode_reply(&CreateTableReply { table_name: req.table_name })
}

#[derive(Debug, Deserialize)]
struct DropTableRequest {
    schema_name: String,
    table_name: String,
    #[serde(default)]
    if_exists: bool,
}

pub(super) async fn drop_table(catalog: &dyn Catalog, body: &[u8]) -> Result<Vec<u8>, AirportError> {
    let req: DropTableRequest = decode_action_body(body)?;
    let schema = resolve_schema(catalog, &req.schema_name).await?;
    let dynamic = schema
        .as_dynamic()
        .ok_or_else(|| AirportError::capability_missing(req.schema_name.as_str(), "DropTable"))?;

    match dynamic.drop_table(&req.table_name).await {
        Ok(()) => encode_reply(&()),
        Err(AirportError::NotFound { .. }) if req.if_exists => encode_reply(&()),
        Err(e) => Err(e),
    }
}

#[derive(Debug, Deserialize)]
struct RenameTableRequest {
    schema_name: String,
    table_name: String,
    new_table_name: String,
}

pub(super) async fn rename_table(catalog: &dyn Catalog, body: &[u8]) -> Result<Vec<u8>, AirportError> {
    let req: RenameTableRequest = decode_action_body(body)?;
    let schema = resolve_schema(catalog, &req.schema_name).await?;
    let dynamic = schema
        .as_dynamic()
        .ok_or_else(|| AirportError::capability_missing(req.schema_name.as_str(), "RenameTable"))?;
    dynamic.rename_table(&req.table_name, &req.new_table_name).await?;
    encode_reply(&())
}

async fn alter(
    catalog: &dyn Catalog,
    schema_name: &str,
    table_name: &str,
    operation: AlterTableOperation,
) -> Result<Vec<u8>, AirportError> {
    let table = resolve_table(catalog, schema_name, table_name).await?;
    let dynamic_table = require_dynamic_table(table.as_ref(), table_name)?;
    dynamic_table.alter(operation).await?;
    encode_reply(&())
}

#[derive(Debug, Deserialize)]
struct AddColumnRequest {
    schema_name: String,
    table_name: String,
    column: Vec<u8>,
    #[serde(default)]
    if_column_not_exists: bool,
}

pub(super) async fn add_column(catalog: &dyn Catalog, body: &[u8]) -> Result<Vec<u8>, AirportError> {
    let req: AddColumnRequest = decode_action_body(body)?;
    let field_schema = decode_schema_ipc(&req.column)?;
    let field = field_schema
        .fields()
        .first()
        .ok_or_else(|| AirportError::malformed("add_column requires exactly one field"))?
        .as_ref()
        .clone();
    alter(
        catalog,
        &req.schema_name,
        &req.table_name,
        AlterTableOperation::AddColumn { field, if_not_exists: req.if_column_not_exists },
    )
    .await
}

#[derive(Debug, Deserialize)]
struct RemoveColumnRequest {
    schema_name: String,
    table_name: String,
    column_name: String,
    #[serde(default)]
    if_exists: bool,
}

pub(super) async fn remove_column(catalog: &dyn Catalog, body: &[u8]) -> Result<Vec<u8>, AirportError> {
    let req: RemoveColumnRequest = decode_action_body(body)?;
    alter(
        catalog,
        &req.schema_name,
        &req.table_name,
        AlterTableOperation::RemoveColumn { name: req.column_name, if_exists: req.if_exists },
    )
    .await
}

#[derive(Debug, Deserialize)]
struct RenameColumnRequest {
    schema_name: String,
    table_name: String,
    old_name: String,
    new_name: String,
}

pub(super) async fn rename_column(catalog: &dyn Catalog, body: &[u8]) -> Result<Vec<u8>, AirportError> {
    let req: RenameColumnRequest = decode_action_body(body)?;
    alter(
        catalog,
        &req.schema_name,
        &req.table_name,
        AlterTableOperation::RenameColumn { old_name: req.old_name, new_name: req.new_name },
    )
    .await
}

#[derive(Debug, Deserialize)]
struct ChangeColumnTypeRequest {
    schema_name: String,
    table_name: String,
    column_name: String,
    new_type: Vec<u8>,
}

pub(super) async fn change_column_type(
    catalog: &dyn Catalog,
    body: &[u8],
) -> Result<Vec<u8>, AirportError> {
    let req: ChangeColumnTypeRequest = decode_action_body(body)?;
    let field_schema = decode_schema_ipc(&req.new_type)?;
    let new_type: DataType = field_schema
        .fields()
        .first()
        .map(|f: &std::sync::Arc<Field>| f.data_type().clone())
        .ok_or_else(|| AirportError::malformed("change_column_type requires a field"))?;
    alter(
        catalog,
        &req.schema_name,
        &req.table_name,
        AlterTableOperation::ChangeColumnType { name: req.column_name, new_type },
    )
    .await
}

#[derive(Debug, Deserialize)]
struct NotNullRequest {
    schema_name: String,
    table_name: String,
    column_name: String,
}

pub(super) async fn set_not_null(catalog: &dyn Catalog, body: &[u8]) -> Result<Vec<u8>, AirportError> {
    let req: NotNullRequest = decode_action_body(body)?;
    alter(
        catalog,
        &req.schema_name,
        &req.table_name,
        AlterTableOperation::SetNotNull { name: req.column_name },
    )
    .await
}

pub(super) async fn drop_not_null(catalog: &dyn Catalog, body: &[u8]) -> Result<Vec<u8>, AirportError> {
    let req: NotNullRequest = decode_action_body(body)?;
    alter(
        catalog,
        &req.schema_name,
        &req.table_name,
        AlterTableOperation::DropNotNull { name: req.column_name },
    )
    .await
}

#[derive(Debug, Deserialize)]
struct SetDefaultRequest {
    schema_name: String,
    table_name: String,
    column_name: String,
    default: Option<rmpv::Value>,
}

pub(super) async fn set_default(catalog: &dyn Catalog, body: &[u8]) -> Result<Vec<u8>, AirportError> {
    let req: SetDefaultRequest = decode_action_body(body)?;
    alter(
        catalog,
        &req.schema_name,
        &req.table_name,
        AlterTableOperation::SetDefault { name: req.column_name, default: req.default },
    )
    .await
}

#[derive(Debug, Deserialize)]
struct AddFieldRequest {
    schema_name: String,
    table_name: String,
    column_name: String,
    field: Vec<u8>,
}

pub(super) async fn add_field(catalog: &dyn Catalog, body: &[u8]) -> Result<Vec<u8>, AirportError> {
    let req: AddFieldRequest = decode_action_body(body)?;
    let field_schema = decode_schema_ipc(&req.field)?;
    let field = field_schema
        .fields()
        .first()
        .ok_or_else(|| AirportError::malformed("add_field requires exactly one field"))?
        .as_ref()
        .clone();
    alter(
        catalog,
        &req.schema_name,
        &req.table_name,
        AlterTableOperation::AddField { column: req.column_name, field },
    )
    .await
}

#[derive(Debug, Deserialize)]
struct RenameFieldRequest {
    schema_name: String,
    table_name: String,
    column_name: String,
    old_name: String,
    new_name: String,
}

pub(super) async fn rename_field(catalog: &dyn Catalog, body: &[u8]) -> Result<Vec<u8>, AirportError> {
    let req: RenameFieldRequest = decode_action_body(body)?;
    alter(
        catalog,
        &req.schema_name,
        &req.table_name,
        AlterTableOperation::RenameField {
            column: req.column_name,
            old_name: req.old_name,
            new_name: req.new_name,
        },
    )
    .await
}
