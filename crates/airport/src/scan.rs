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

//! `DoGet`: ticket parsing, capability-aware `Scan` invocation (or, for a
//! ticket minted by `table_function_flight_info`, table-function
//! execution), IPC streaming with backpressure.
//!
//! Cancellation is handled by Rust's own drop semantics rather than an
//! explicit polled `ctx.Done()`: the stream returned here is driven by
//! tonic's response body; once the client disconnects, tonic stops polling
//! it, the `async_stream::stream!` generator is dropped mid-yield, and
//! every `Arc`/stream it held is released on that unwind. This gives the
//! "stop within one batch after cancel" property by construction, not by a
//! manual check at each loop head.

use arrow_flight::encode::FlightDataEncoderBuilder;
use arrow_flight::error::FlightError;
use arrow_flight::FlightData;
use futures::StreamExt;
use tonic::Status;

use arrow_schema::SchemaRef;

use crate::action::table_function::params_to_arrays;
use crate::catalog::{Catalog, ScanOptions, TimePoint};
use crate::envelope::Ticket;
use crate::error::AirportError;

pub type FlightDataStream =
    std::pin::Pin<Box<dyn futures::Stream<Item = Result<FlightData, Status>> + Send>>;

/// Resolves a ticket to a table or table function and runs its scan
/// callback, returning an IPC-framed stream of `FlightData` ready to hand
/// back from `DoGet`.
pub async fn do_get(catalog: &dyn Catalog, ticket_bytes: &[u8]) -> Result<FlightDataStream, AirportError> {
    let ticket = Ticket::decode(ticket_bytes)?;

    // Time-point exclusivity/non-negativity is checked before any catalog
    // lookup.
    let time_point = TimePoint::from_ticket_fields(ticket.ts, ticket.ts_ns)?;

    let schema = catalog
        .schema(&ticket.schema)
        .await?
        .ok_or_else(|| AirportError::not_found("schema", ticket.schema.clone()))?;

    let columns = ticket.columns.clone().unwrap_or_default();

    let (arrow_schema, reader) = match schema.table(&ticket.table).await? {
        Some(table) => {
            let arrow_schema: SchemaRef = match crate::capability::as_dynamic_schema_table(table.as_ref()) {
                Some(dynamic) => {
                    dynamic
                        .schema_for_request(crate::catalog::SchemaRequest { time_point: time_point.clone() })
                        .await?
                }
                None => table.arrow_schema(&columns)?,
            };
            let options = ScanOptions { columns, filter: None, limit: None, batch_size: 0, time_point };
            let reader = table.scan(options).await?;
            (arrow_schema, reader)
        }
        None => {
            let functions = schema.table_functions().await?;
            let function = functions
                .into_iter()
                .find(|f| f.name() == ticket.table)
                .ok_or_else(|| AirportError::not_found("table", ticket.table.clone()))?;

            let param_values: Vec<rmpv::Value> = match ticket.parameters.as_deref() {
                Some(bytes) if !bytes.is_empty() => rmp_serde::from_slice(bytes).map_err(|e| {
                    AirportError::malformed(format!("invalid ticket parameters: {e}"))
                })?,
                _ => Vec::new(),
            };
            let params = params_to_arrays(&param_values)?;

            let arrow_schema = function.schema_for_parameters(&params).await?;
            let options = ScanOptions { columns, filter: None, limit: None, batch_size: 0, time_point };
            let reader = function.execute(params, options).await?;
            (arrow_schema, reader)
        }
    };

    // The schema emitted on the wire must equal the scan's own schema; we
    // hand the encoder the schema we just negotiated and every batch the
    // callback yields must match it or the encoder itself will surface the
    // mismatch as a stream error.
    let batches = reader.map(|item| item.map_err(|e| FlightError::from_external_error(Box::new(e))));

    let encoder = FlightDataEncoderBuilder::new()
        .with_schema(arrow_schema)
        .build(batches)
        .map(|item| item.map_err(flight_error_to_status));

    Ok(Box::pin(encoder))
}

fn flight_error_to_status(err: FlightError) -> Status {
    match err {
        FlightError::Arrow(e) => Status::internal(format!("arrow error: {e}")),
        FlightError::NotYetImplemented(msg) => Status::unimplemented(msg),
        FlightError::Tonic(status) => status,
        FlightError::ProtocolError(msg) => Status::invalid_argument(msg),
        FlightError::DecodeError(msg) => Status::invalid_argument(msg),
        FlightError::ExternalError(source) => Status::internal(source.to_string()),
        other => Status::internal(other.to_string()),
    }
}
