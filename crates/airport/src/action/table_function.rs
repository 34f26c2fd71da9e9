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

//! `table_function_flight_info` and `endpoints` action handlers: schema
//! negotiation for table-valued functions, and time-travel ticket
//! discovery.

use arrow::array::ArrayRef;
use serde::{Deserialize, Serialize};

use super::{encode_reply, resolve_schema};
use crate::catalog::{Catalog, TimePoint};
use crate::envelope::{decode_action_body, Ticket};
use crate::error::AirportError;
use crate::serializer::encode_schema_ipc;

#[derive(Debug, Deserialize)]
struct TableFunctionFlightInfoRequest {
    schema_name: String,
    function_name: String,
    /// MessagePack-encoded scalar parameters; the concrete decoding into
    /// Arrow arrays is function-specific and left to the callback, so we
    /// only thread the raw values through as opaque JSON-ish MessagePack.
    #[serde(default)]
    parameters: Vec<rmpv::Value>,
}

#[derive(Debug, Serialize)]
struct TableFunctionFlightInfoReply {
    schema: Vec<u8>,
    ticket: Vec<u8>,
}

/// `rmpv::Value`s carrying scalar parameters are not Arrow arrays; we build
/// one-element arrays out of them so the same `execute(params: Vec<ArrayRef>)`
/// signature works whether the call came through `DoExchange` (batch input)
/// or a `DoAction`/`DoGet` discovery path (one scalar per parameter).
pub(crate) fn params_to_arrays(parameters: &[rmpv::Value]) -> Result<Vec<ArrayRef>, AirportError> {
    use arrow::array::{BooleanArray, Float64Array, Int64Array, StringArray};

    parameters
        .iter()
        .map(|value| -> Result<ArrayRef, AirportError> {
            Ok(match value {
                rmpv::Value::Integer(i) => {
                    let v = i
                        .as_i64()
                        .ok_or_else(|| AirportError::malformed("parameter integer out of range"))?;
                    std::sync::Arc::new(Int64Array::from(vec![v]))
                }
                rmpv::Value::F64(f) => std::sync::Arc::new(Float64Array::from(vec![*f])),
                rmpv::Value::F32(f) => std::sync::Arc::new(Float64Array::from(vec![f64::from(*f)])),
                rmpv::Value::Boolean(b) => std::sync::Arc::new(BooleanArray::from(vec![*b])),
                rmpv::Value::String(s) => {
                    let s = s
                        .as_str()
                        .ok_or_else(|| AirportError::malformed("parameter string is not valid utf8"))?;
                    std::sync::Arc::new(StringArray::from(vec![s.to_string()]))
                }
                other => {
                    return Err(AirportError::malformed(format!(
                        "unsupported table function parameter: {other:?}"
                    )))
                }
            })
        })
        .collect()
}

pub(super) async fn flight_info(catalog: &dyn Catalog, body: &[u8]) -> Result<Vec<u8>, AirportError> {
    let req: TableFunctionFlightInfoRequest = decode_action_body(body)?;
    let schema = resolve_schema(catalog, &req.schema_name).await?;

    let functions = schema.table_functions().await?;
    let function = functions
        .into_iter()
        .find(|f| f.name() == req.function_name)
        .ok_or_else(|| AirportError::not_found("table function", req.function_name.clone()))?;

    let params = params_to_arrays(&req.parameters)?;
    let output_schema = function.schema_for_parameters(&params).await?;
    let schema_bytes = encode_schema_ipc(&output_schema)?;

    let parameters = rmp_serde::to_vec(&req.parameters)
        .map_err(|e| AirportError::internal(format!("failed to encode ticket parameters: {e}")))?;

    let ticket = Ticket {
        schema: req.schema_name,
        table: req.function_name,
        ts: None,
        ts_ns: None,
        columns: None,
        parameters: Some(parameters),
    };

    encode_reply(&TableFunctionFlightInfoReply {
        schema: schema_bytes,
        ticket: ticket.encode()?,
    })
}

#[derive(Debug, Deserialize)]
struct EndpointsRequest {
    schema_name: String,
    table_name: String,
    ts: Option<i64>,
    ts_ns: Option<i64>,
}

#[derive(Debug, Serialize)]
struct EndpointsReply {
    ticket: Vec<u8>,
}

/// Time-travel discovery: validates the requested `TimePoint` and hands
/// back the ticket a subsequent `DoGet` will use.
pub(super) async fn endpoints(catalog: &dyn Catalog, body: &[u8]) -> Result<Vec<u8>, AirportError> {
    let req: EndpointsRequest = decode_action_body(body)?;
    // Exclusivity/non-negativity must be enforced before any catalog lookup.
    TimePoint::from_ticket_fields(req.ts, req.ts_ns)?;

    resolve_schema(catalog, &req.schema_name).await?;

    let ticket = Ticket {
        schema: req.schema_name,
        table: req.table_name,
        ts: req.ts,
        ts_ns: req.ts_ns,
        columns: None,
        parameters: None,
    };
    encode_reply(&EndpointsReply { ticket: ticket.encode()? })
}
