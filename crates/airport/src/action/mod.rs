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

//! Maps Airport action names to handlers. Each handler decodes its
//! MessagePack body with the envelope codec, runs, then encodes its
//! reply the same way.

mod ddl;
mod statistics;
pub(crate) mod table_function;
mod transaction;

use crate::catalog::Catalog;
use crate::envelope::{decode_action_body, encode_action_body};
use crate::error::AirportError;
use crate::router::CatalogRegistry;
use crate::transaction::TransactionRegistry;

/// DDL conflict policy carried by `create_schema`/`create_table` bodies.
/// Defaults to `Error`.
#[derive(Debug, Clone, Copy, Default, serde::Deserialize, serde::Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OnConflict {
    #[default]
    Error,
    Ignore,
    Replace,
}

/// Dispatches one `DoAction` request. Returns the MessagePack- or
/// zstd-framed reply body; `None` means "no reply body" (some actions are
/// fire-and-forget).
pub async fn dispatch(
    registry: &CatalogRegistry,
    transactions: &TransactionRegistry,
    catalog_name: &str,
    action_type: &str,
    body: &[u8],
) -> Result<Vec<u8>, AirportError> {
    let catalog = registry.resolve(catalog_name)?;

    match action_type {
        "list_schemas" => crate::serializer::list_schemas(catalog.as_ref()).await,
        "list_tables" => {
            let req: ListTablesRequest = decode_action_body(body)?;
            let schema = resolve_schema(catalog.as_ref(), &req.schema_name).await?;
            crate::serializer::list_tables(schema.as_ref()).await
        }
        "create_schema" => ddl::create_schema(catalog.as_ref(), body).await,
        "drop_schema" => ddl::drop_schema(catalog.as_ref(), body).await,
        "create_table" => ddl::create_table(catalog.as_ref(), body).await,
        "drop_table" => ddl::drop_table(catalog.as_ref(), body).await,
        "rename_table" => ddl::rename_table(catalog.as_ref(), body).await,
        "add_column" => ddl::add_column(catalog.as_ref(), body).await,
        "remove_column" => ddl::remove_column(catalog.as_ref(), body).await,
        "rename_column" => ddl::rename_column(catalog.as_ref(), body).await,
        "change_column_type" => ddl::change_column_type(catalog.as_ref(), body).await,
        "set_not_null" => ddl::set_not_null(catalog.as_ref(), body).await,
        "drop_not_null" => ddl::drop_not_null(catalog.as_ref(), body).await,
        "set_default" => ddl::set_default(catalog.as_ref(), body).await,
        "add_field" => ddl::add_field(catalog.as_ref(), body).await,
        "rename_field" => ddl::rename_field(catalog.as_ref(), body).await,
        "table_function_flight_info" => {
            table_function::flight_info(catalog.as_ref(), body).await
        }
        "endpoints" => table_function::endpoints(catalog.as_ref(), body).await,
        "create_transaction" => transaction::create_transaction(transactions),
        "get_transaction_status" => transaction::get_transaction_status(transactions, body),
        "column_statistics" => statistics::column_statistics(catalog.as_ref(), body).await,
        other => Err(AirportError::UnknownAction { action: other.to_string() }),
    }
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct ListTablesRequest {
    pub schema_name: String,
}

/// Shared by every DDL/statistics handler: resolves `schema_name` to a
/// `Schema`, surfacing a stable `NotFound`. A missing schema/table lookup
/// is a normal outcome, not a handler error for existence checks, but
/// action handlers DO need to fail the request when the named object is
/// absent.
pub(crate) async fn resolve_schema(
    catalog: &dyn Catalog,
    schema_name: &str,
) -> Result<std::sync::Arc<dyn crate::catalog::Schema>, AirportError> {
    catalog
        .schema(schema_name)
        .await?
        .ok_or_else(|| AirportError::not_found("schema", schema_name))
}

pub(crate) async fn resolve_table(
    catalog: &dyn Catalog,
    schema_name: &str,
    table_name: &str,
) -> Result<std::sync::Arc<dyn crate::catalog::Table>, AirportError> {
    let schema = resolve_schema(catalog, schema_name).await?;
    schema
        .table(table_name)
        .await?
        .ok_or_else(|| AirportError::not_found("table", table_name))
}

pub(crate) fn encode_reply<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, AirportError> {
    encode_action_body(value)
}
