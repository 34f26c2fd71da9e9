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

//! `DoExchange` scalar-function vectorized execution and in/out
//! table-function pipelined streaming. The third leg, table-function
//! `SchemaForParameters` → DoGet discovery, lives in
//! `crate::action::table_function` since it rides the `DoAction`/`DoGet`
//! path rather than `DoExchange`.

mod scalar;
mod table_inout;

use arrow_flight::decode::FlightRecordBatchStream;
use arrow_flight::encode::FlightDataEncoderBuilder;
use arrow_flight::error::FlightError;
use arrow_flight::FlightData;
use futures::{Stream, StreamExt, TryStreamExt};
use serde::Deserialize;
use tonic::Status;

use crate::catalog::{RecordBatchStream, Schema};
use crate::error::AirportError;
use crate::request::AirportOperation;

pub type FunctionOutputStream =
    std::pin::Pin<Box<dyn Stream<Item = Result<FlightData, Status>> + Send>>;

/// Scalar parameters accompanying a `TableFunctionInOut` call, carried in
/// the first `DoExchange` message's `FlightDescriptor.cmd` (mirrors the
/// shape of `table_function_flight_info`'s request).
#[derive(Debug, Deserialize, Default)]
pub struct FunctionCallParameters {
    #[serde(default)]
    pub parameters: Vec<rmpv::Value>,
}

fn decode_input<S>(input: S) -> RecordBatchStream
where
    S: Stream<Item = Result<FlightData, Status>> + Send + 'static,
{
    let decoded = FlightRecordBatchStream::new_from_flight_data(input.map_err(FlightError::Tonic))
        .map_err(|e| AirportError::malformed(format!("failed to decode input stream: {e}")));
    Box::pin(decoded)
}

fn encode_output(batches: RecordBatchStream) -> FunctionOutputStream {
    let mapped =
        batches.map(|item| item.map_err(|e: AirportError| FlightError::from_external_error(Box::new(e))));
    let encoder = FlightDataEncoderBuilder::new()
        .build(mapped)
        .map(|item| item.map_err(flight_error_to_status));
    Box::pin(encoder)
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

/// Dispatches a `DoExchange` call carrying `airport-operation: scalar_function`
/// or `airport-operation: table_function_in_out` to the matching callback.
pub async fn do_exchange<S>(
    schema: &dyn Schema,
    operation: AirportOperation,
    function_name: &str,
    descriptor_body: &[u8],
    input: S,
) -> Result<FunctionOutputStream, AirportError>
where
    S: Stream<Item = Result<FlightData, Status>> + Send + 'static,
{
    match operation {
        AirportOperation::ScalarFunction => {
            let reader = decode_input(input);
            let out = scalar::execute(schema, function_name, reader).await?;
            Ok(encode_output(out))
        }
        AirportOperation::TableFunctionInOut => {
            let params: FunctionCallParameters = if descriptor_body.is_empty() {
                FunctionCallParameters::default()
            } else {
                crate::envelope::decode_action_body(descriptor_body)?
            };
            let reader = decode_input(input);
            let out =
                table_inout::execute(schema, function_name, &params.parameters, reader).await?;
            Ok(encode_output(out))
        }
        other => Err(AirportError::malformed(format!(
            "airport-operation `{other:?}` is not a function call"
        ))),
    }
}
