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

//! `GetSchema`: schema-only discovery, same descriptor shape as
//! `GetFlightInfo` but without the ticket/endpoint bookkeeping.

use arrow_flight::{FlightDescriptor, SchemaAsIpc, SchemaResult};
use arrow_ipc::writer::IpcWriteOptions;

use crate::capability::as_dynamic_schema_table;
use crate::catalog::{Catalog, SchemaRequest};
use crate::error::AirportError;

pub(super) async fn handle(
    catalog: &dyn Catalog,
    descriptor: FlightDescriptor,
) -> Result<SchemaResult, AirportError> {
    let (schema_name, table_name) = match descriptor.path.as_slice() {
        [schema, table] => (schema.as_str(), table.as_str()),
        _ => {
            return Err(AirportError::malformed(
                "flight descriptor path must be [schema_name, table_name]",
            ))
        }
    };

    let schema = catalog
        .schema(schema_name)
        .await?
        .ok_or_else(|| AirportError::not_found("schema", schema_name))?;
    let table = schema
        .table(table_name)
        .await?
        .ok_or_else(|| AirportError::not_found("table", table_name))?;

    let arrow_schema = match as_dynamic_schema_table(table.as_ref()) {
        Some(dynamic) => dynamic.schema_for_request(SchemaRequest::default()).await?,
        None => table.arrow_schema(&[])?,
    };

    SchemaAsIpc::new(&arrow_schema, &IpcWriteOptions::default())
        .try_into()
        .map_err(|e: arrow_schema::ArrowError| {
            AirportError::internal(format!("failed to encode schema: {e}"))
        })
}
