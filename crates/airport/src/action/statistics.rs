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

//! `column_statistics` action handler. The wire protocol calls this once
//! per column; a table without `StatisticsTable` returns `Unimplemented`
//! so DuckDB falls back to planner defaults, rather than a hard failure.

use arrow_schema::DataType;
use serde::{Deserialize, Serialize};

use super::{encode_reply, resolve_table};
use crate::capability::require_statistics;
use crate::catalog::Catalog;
use crate::envelope::decode_action_body;
use crate::error::AirportError;

#[derive(Debug, Deserialize)]
struct ColumnStatisticsRequest {
    schema_name: String,
    table_name: String,
    column_name: String,
    column_type: String,
}

#[derive(Debug, Serialize, Default)]
struct ColumnStatisticsReply {
    has_null: Option<bool>,
    has_not_null: Option<bool>,
    distinct_count: Option<u64>,
    min: Option<rmpv::Value>,
    max: Option<rmpv::Value>,
    max_string_length: Option<u64>,
    contains_unicode: Option<bool>,
}

pub(super) async fn column_statistics(
    catalog: &dyn Catalog,
    body: &[u8],
) -> Result<Vec<u8>, AirportError> {
    let req: ColumnStatisticsRequest = decode_action_body(body)?;
    let table = resolve_table(catalog, &req.schema_name, &req.table_name).await?;
    let statistics_table = require_statistics(table.as_ref(), &req.table_name)?;

    // The wire carries the column type as a display string; we
    // don't need a real type for dispatch here since the callback takes
    // the name too, but we still parse it into a `DataType` best-effort so
    // the callback always receives a real Arrow type, falling back to
    // `Utf8` rather than failing the whole statistics call.
    let column_type = parse_simple_type(&req.column_type).unwrap_or(DataType::Utf8);

    let stats = statistics_table
        .column_statistics(&req.column_name, &column_type)
        .await?;

    encode_reply(&ColumnStatisticsReply {
        has_null: stats.has_null,
        has_not_null: stats.has_not_null,
        distinct_count: stats.distinct_count,
        min: stats.min,
        max: stats.max,
        max_string_length: stats.max_string_length,
        contains_unicode: stats.contains_unicode,
    })
}

fn parse_simple_type(raw: &str) -> Option<DataType> {
    match raw {
        "Int64" | "BIGINT" => Some(DataType::Int64),
        "Int32" | "INTEGER" => Some(DataType::Int32),
        "Utf8" | "VARCHAR" => Some(DataType::Utf8),
        "Boolean" | "BOOLEAN" => Some(DataType::Boolean),
        "Float64" | "DOUBLE" => Some(DataType::Float64),
        _ => None,
    }
}
