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

//! `DoExchange` INSERT/UPDATE/DELETE against both the batch-capability
//! table (`events`) and the row-id-capability table (`legacy_events`),
//! verifying capability precedence is honored end to end and that
//! RETURNING streams decode correctly.

mod support;

use arrow::array::{Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use arrow_flight::decode::FlightRecordBatchStream;
use arrow_flight::encode::FlightDataEncoderBuilder;
use arrow_flight::error::FlightError;
use arrow_flight::flight_service_client::FlightServiceClient;
use arrow_flight::FlightDescriptor;
use arrow_schema::{DataType, Field, Schema as ArrowSchema};
use futures::{StreamExt, TryStreamExt};
use std::sync::Arc;
use tonic::IntoStreamingRequest;

fn user_schema() -> Arc<ArrowSchema> {
    Arc::new(ArrowSchema::new(vec![
        Field::new("name", DataType::Utf8, true),
        Field::new("amount", DataType::Int64, true),
    ]))
}

#[derive(serde::Serialize)]
struct DmlCallParameters {
    returning: bool,
    returning_columns: Vec<String>,
}

async fn insert_returning(
    client: &mut FlightServiceClient<tonic::transport::Channel>,
    table: &str,
    names: Vec<&str>,
    amounts: Vec<i64>,
) -> Vec<RecordBatch> {
    let row = RecordBatch::try_new(
        user_schema(),
        vec![Arc::new(StringArray::from(names)), Arc::new(Int64Array::from(amounts))],
    )
    .unwrap();

    let mut descriptor = FlightDescriptor::new_path(vec!["main".to_string(), table.to_string()]);
    descriptor.cmd = rmp_serde::to_vec_named(&DmlCallParameters {
        returning: true,
        returning_columns: Vec::new(),
    })
    .unwrap()
    .into();

    let flight_data = FlightDataEncoderBuilder::new()
        .with_flight_descriptor(Some(descriptor))
        .build(futures::stream::iter(vec![Ok(row)]))
        .map(|item| item.expect("encode flight data"));

    let mut request = flight_data.into_streaming_request();
    request.metadata_mut().insert("airport-operation", "insert".parse().unwrap());

    let (_md, response_stream, _ext) = client.do_exchange(request).await.unwrap().into_parts();
    let mut decoded =
        FlightRecordBatchStream::new_from_flight_data(response_stream.map_err(FlightError::Tonic));

    let mut batches = Vec::new();
    while let Some(batch) = decoded.try_next().await.unwrap() {
        batches.push(batch);
    }
    batches
}

#[tokio::test]
async fn insert_with_returning_reports_assigned_rowids() {
    let (catalog, _events, _legacy) = support::mock_catalog::build();
    let server = support::server::start(catalog).await;
    let mut client = FlightServiceClient::new(server.channel);

    let batches = insert_returning(&mut client, "events", vec!["a", "b"], vec![1, 2]).await;
    assert_eq!(batches.len(), 1);
    let rowids = batches[0]
        .column(batches[0].schema().index_of("rowid").unwrap())
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap();
    assert_eq!(rowids.value(0), 1);
    assert_eq!(rowids.value(1), 2);
}

#[tokio::test]
async fn batch_update_replaces_matching_rows() {
    let (catalog, events, _legacy) = support::mock_catalog::build();
    let server = support::server::start(catalog).await;
    let mut client = FlightServiceClient::new(server.channel);

    insert_returning(&mut client, "events", vec!["a", "b"], vec![1, 2]).await;
    assert_eq!(events.row_count(), 2);

    let full_schema = events.arrow_schema(&[]).unwrap();
    let updated = RecordBatch::try_new(
        full_schema,
        vec![
            Arc::new(Int64Array::from(vec![1])),
            Arc::new(StringArray::from(vec!["a-renamed"])),
            Arc::new(Int64Array::from(vec![99])),
        ],
    )
    .unwrap();

    let descriptor = FlightDescriptor::new_path(vec!["main".to_string(), "events".to_string()]);
    let flight_data = FlightDataEncoderBuilder::new()
        .with_flight_descriptor(Some(descriptor))
        .build(futures::stream::iter(vec![Ok(updated)]))
        .map(|item| item.expect("encode flight data"));
    let mut request = flight_data.into_streaming_request();
    request.metadata_mut().insert("airport-operation", "update".parse().unwrap());
    client.do_exchange(request).await.unwrap();

    assert_eq!(events.row_count(), 2);
}

#[tokio::test]
async fn batch_delete_removes_matching_rows() {
    let (catalog, events, _legacy) = support::mock_catalog::build();
    let server = support::server::start(catalog).await;
    let mut client = FlightServiceClient::new(server.channel);

    insert_returning(&mut client, "events", vec!["a", "b"], vec![1, 2]).await;
    assert_eq!(events.row_count(), 2);

    let full_schema = events.arrow_schema(&[]).unwrap();
    let key = RecordBatch::try_new(
        full_schema,
        vec![
            Arc::new(Int64Array::from(vec![1])),
            Arc::new(StringArray::from(vec![Option::<&str>::None])),
            Arc::new(Int64Array::from(vec![Option::<i64>::None])),
        ],
    )
    .unwrap();

    let descriptor = FlightDescriptor::new_path(vec!["main".to_string(), "events".to_string()]);
    let flight_data = FlightDataEncoderBuilder::new()
        .with_flight_descriptor(Some(descriptor))
        .build(futures::stream::iter(vec![Ok(key)]))
        .map(|item| item.expect("encode flight data"));
    let mut request = flight_data.into_streaming_request();
    request.metadata_mut().insert("airport-operation", "delete".parse().unwrap());
    client.do_exchange(request).await.unwrap();

    assert_eq!(events.row_count(), 1);
}

#[tokio::test]
async fn row_id_update_and_delete_drive_the_legacy_table() {
    let (catalog, _events, legacy) = support::mock_catalog::build();
    let server = support::server::start(catalog).await;
    let mut client = FlightServiceClient::new(server.channel);

    insert_returning(&mut client, "legacy_events", vec!["x", "y"], vec![5, 6]).await;
    assert_eq!(legacy.row_count(), 2);

    let full_schema = legacy.arrow_schema(&[]).unwrap();
    let updated = RecordBatch::try_new(
        full_schema,
        vec![
            Arc::new(Int64Array::from(vec![1])),
            Arc::new(StringArray::from(vec!["x-renamed"])),
            Arc::new(Int64Array::from(vec![50])),
        ],
    )
    .unwrap();
    let descriptor = FlightDescriptor::new_path(vec!["main".to_string(), "legacy_events".to_string()]);
    let flight_data = FlightDataEncoderBuilder::new()
        .with_flight_descriptor(Some(descriptor))
        .build(futures::stream::iter(vec![Ok(updated)]))
        .map(|item| item.expect("encode flight data"));
    let mut request = flight_data.into_streaming_request();
    request.metadata_mut().insert("airport-operation", "update".parse().unwrap());
    client.do_exchange(request).await.unwrap();
    assert_eq!(legacy.row_count(), 2);

    let full_schema = legacy.arrow_schema(&[]).unwrap();
    let key = RecordBatch::try_new(
        full_schema,
        vec![
            Arc::new(Int64Array::from(vec![2])),
            Arc::new(StringArray::from(vec![Option::<&str>::None])),
            Arc::new(Int64Array::from(vec![Option::<i64>::None])),
        ],
    )
    .unwrap();
    let descriptor = FlightDescriptor::new_path(vec!["main".to_string(), "legacy_events".to_string()]);
    let flight_data = FlightDataEncoderBuilder::new()
        .with_flight_descriptor(Some(descriptor))
        .build(futures::stream::iter(vec![Ok(key)]))
        .map(|item| item.expect("encode flight data"));
    let mut request = flight_data.into_streaming_request();
    request.metadata_mut().insert("airport-operation", "delete".parse().unwrap());
    client.do_exchange(request).await.unwrap();

    assert_eq!(legacy.row_count(), 1);
}
