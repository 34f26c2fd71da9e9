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

//! `DoExchange` INSERT/UPDATE/DELETE, rowid extraction,
//! batch-vs-row-id capability selection, RETURNING bidirectional
//! streaming, and the final `total_changed` metadata frame.

mod delete;
mod insert;
mod update;

use arrow::array::{Array, Int64Array};
use arrow::record_batch::RecordBatch;
use arrow_flight::decode::FlightRecordBatchStream;
use arrow_flight::encode::FlightDataEncoderBuilder;
use arrow_flight::error::FlightError;
use arrow_flight::FlightData;
use futures::{Stream, StreamExt, TryStreamExt};
use serde::Serialize;
use tonic::Status;

use crate::catalog::{find_rowid_column, Catalog, DmlOptions, DmlResult, RecordBatchStream};
use crate::error::AirportError;
use crate::request::AirportOperation;

pub type DmlOutputStream =
    std::pin::Pin<Box<dyn Stream<Item = Result<FlightData, Status>> + Send>>;

/// Turns the client's incoming `FlightData` stream into our internal
/// `RecordBatchStream`, mapping decode errors into `AirportError`. Generic
/// over the input stream type so callers can splice a peeked first message
/// (read off to recover the `FlightDescriptor`) back onto the remainder of
/// the `Streaming<FlightData>` before decoding.
fn decode_input<S>(input: S) -> RecordBatchStream
where
    S: Stream<Item = Result<FlightData, Status>> + Send + 'static,
{
    let decoded = FlightRecordBatchStream::new_from_flight_data(input.map_err(FlightError::Tonic))
        .map_err(|e| AirportError::malformed(format!("failed to decode input stream: {e}")));
    Box::pin(decoded)
}

#[derive(Serialize)]
struct TotalChanged {
    total_changed: i64,
}

/// The final metadata-only frame every DML path emits last.
fn total_changed_frame(total: i64) -> Result<FlightData, AirportError> {
    let payload = crate::envelope::encode_action_body(&TotalChanged { total_changed: total })?;
    Ok(FlightData {
        flight_descriptor: None,
        data_header: bytes::Bytes::new(),
        data_body: bytes::Bytes::new(),
        app_metadata: payload.into(),
    })
}

/// Encodes `returning_data`'s batches, then appends the final
/// `total_changed` frame. The producer (the callback's `ReturningData`
/// stream) completes before that final frame is ever yielded, so the
/// final frame always arrives strictly after all RETURNING batches.
fn finish_with_total_changed(
    returning_data: Option<RecordBatchStream>,
    affected_rows: i64,
) -> DmlOutputStream {
    let body = async_stream::stream! {
        if let Some(returning_data) = returning_data {
            let mapped = returning_data
                .map(|item| item.map_err(|e: AirportError| FlightError::from_external_error(Box::new(e))));
            let mut encoder = FlightDataEncoderBuilder::new().build(mapped);
            while let Some(item) = encoder.next().await {
                match item {
                    Ok(data) => yield Ok(data),
                    Err(e) => {
                        yield Err(flight_error_to_status(e));
                        return;
                    }
                }
            }
        }

        match total_changed_frame(affected_rows) {
            Ok(frame) => yield Ok(frame),
            Err(e) => yield Err(Status::from(e)),
        }
    };

    Box::pin(body)
}

fn flight_error_to_status(err: FlightError) -> Status {
    match err {
        FlightError::Arrow(e) => Status::internal(format!("arrow error: {e}")),
        FlightError::Tonic(status) => status,
        FlightError::ProtocolError(msg) | FlightError::DecodeError(msg) => {
            Status::invalid_argument(msg)
        }
        FlightError::ExternalError(source) => Status::internal(source.to_string()),
        other => Status::internal(other.to_string()),
    }
}

/// Strips the rowid column from `batches`, returning the collected rowids
/// alongside a stream replaying the stripped batches. Used by the
/// row-id-list UPDATE/DELETE paths, which need the full `Vec<i64>` before
/// invoking the callback and therefore cannot stay lazily streaming the
/// way the batch paths do.
async fn extract_rowids(
    mut batches: RecordBatchStream,
) -> Result<(Vec<i64>, RecordBatchStream), AirportError> {
    let mut row_ids = Vec::new();
    let mut stripped = Vec::new();
    let mut rowid_index = None;

    while let Some(batch) = batches.next().await {
        let batch = batch?;
        let idx = match rowid_index {
            Some(idx) => idx,
            None => {
                let idx = find_rowid_column(Some(batch.schema().as_ref()))
                    .ok_or(AirportError::RowIdMissing { operation: "UPDATE/DELETE" })?;
                rowid_index = Some(idx);
                idx
            }
        };

        let id_array = batch
            .column(idx)
            .as_any()
            .downcast_ref::<Int64Array>()
            .ok_or_else(|| AirportError::TypeMismatch {
                expected: "Int64".to_string(),
                actual: batch.column(idx).data_type().to_string(),
            })?;
        row_ids.extend(id_array.iter().map(|v| v.unwrap_or_default()));

        stripped.push(strip_column(&batch, idx)?);
    }

    let stream: RecordBatchStream = Box::pin(futures::stream::iter(stripped.into_iter().map(Ok)));
    Ok((row_ids, stream))
}

fn strip_column(batch: &RecordBatch, index: usize) -> Result<RecordBatch, AirportError> {
    let schema = batch.schema();
    let fields: Vec<_> = schema
        .fields()
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .map(|(_, f)| f.clone())
        .collect();
    let columns: Vec<_> = batch
        .columns()
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .map(|(_, c)| c.clone())
        .collect();
    let new_schema = std::sync::Arc::new(arrow_schema::Schema::new(fields));
    RecordBatch::try_new(new_schema, columns)
        .map_err(|e| AirportError::internal(format!("failed to strip rowid column: {e}")))
}

/// Dispatches a `DoExchange` request by `airport-operation`, running the
/// selected DML path to completion and returning its output stream.
pub async fn do_exchange<S>(
    catalog: &dyn Catalog,
    operation: AirportOperation,
    schema_name: &str,
    table_name: &str,
    input: S,
    options: DmlOptions,
) -> Result<DmlOutputStream, AirportError>
where
    S: Stream<Item = Result<FlightData, Status>> + Send + 'static,
{
    let schema = catalog
        .schema(schema_name)
        .await?
        .ok_or_else(|| AirportError::not_found("schema", schema_name))?;
    let table = schema
        .table(table_name)
        .await?
        .ok_or_else(|| AirportError::not_found("table", table_name))?;

    let reader = decode_input(input);

    let result: DmlResult = match operation {
        AirportOperation::Insert => insert::insert(table.as_ref(), reader, options, table_name).await?,
        AirportOperation::Update => update::update(table.as_ref(), reader, options, table_name).await?,
        AirportOperation::Delete => delete::delete(table.as_ref(), reader, options, table_name).await?,
        other => {
            return Err(AirportError::malformed(format!(
                "airport-operation `{other:?}` is not a DML verb"
            )))
        }
    };

    Ok(finish_with_total_changed(result.returning_data, result.affected_rows))
}
