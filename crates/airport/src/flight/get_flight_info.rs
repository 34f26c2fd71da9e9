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

//! `GetFlightInfo`: table discovery. A descriptor's `path` is
//! `[schema_name, table_name]`; the reply's endpoint carries the ticket a
//! following `DoGet` decodes.

use arrow_flight::{FlightDescriptor, FlightEndpoint, FlightInfo, Ticket as WireTicket};

use crate::capability::as_dynamic_schema_table;
use crate::catalog::{Catalog, SchemaRequest};
use crate::envelope::Ticket;
use crate::error::AirportError;
use crate::serializer::encode_schema_ipc;

fn split_path(descriptor: &FlightDescriptor) -> Result<(&str, &str), AirportError> {
    match descriptor.path.as_slice() {
        [schema, table] => Ok((schema.as_str(), table.as_str())),
        _ => Err(AirportError::malformed(
            "flight descriptor path must be [schema_name, table_name]",
        )),
    }
}

pub(super) async fn handle(
    catalog: &dyn Catalog,
    descriptor: FlightDescriptor,
) -> Result<FlightInfo, AirportError> {
    let (schema_name, table_name) = split_path(&descriptor)?;

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

    let ticket_bytes = Ticket::new(schema_name, table_name).encode()?;
    let endpoint = FlightEndpoint::new().with_ticket(WireTicket::new(ticket_bytes));

    let info = FlightInfo::new()
        .try_with_schema(&arrow_schema)
        .map_err(|e| AirportError::internal(format!("failed to encode schema: {e}")))?
        .with_descriptor(descriptor)
        .with_endpoint(endpoint)
        .with_total_records(-1)
        .with_total_bytes(-1);

    Ok(info)
}
