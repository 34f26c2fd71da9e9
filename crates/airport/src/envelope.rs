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

//! MessagePack action bodies, opaque ticket bytes, and ZStandard-framed
//! Arrow IPC catalog payloads.

use serde::{Deserialize, Serialize};

use crate::error::AirportError;

/// A balanced ZStandard level; re-used for every catalog-discovery payload.
const ZSTD_LEVEL: i32 = 3;

/// Decodes a MessagePack action body into `T`, surfacing malformed input as
/// `InvalidArgument`.
pub fn decode_action_body<T>(body: &[u8]) -> Result<T, AirportError>
where
    T: for<'de> Deserialize<'de>,
{
    rmp_serde::from_slice(body)
        .map_err(|e| AirportError::malformed(format!("invalid action body: {e}")))
}

/// Encodes `T` as a MessagePack action reply.
pub fn encode_action_body<T>(value: &T) -> Result<Vec<u8>, AirportError>
where
    T: Serialize,
{
    rmp_serde::to_vec_named(value)
        .map_err(|e| AirportError::internal(format!("failed to encode action reply: {e}")))
}

/// The opaque ticket carried between `GetFlightInfo` and `DoGet`.
///
/// Exactly zero or one of `ts`/`ts_ns` may be present; that invariant is
/// enforced by `TimePoint::from_ticket`, not by this struct, so the ticket
/// itself stays a faithful wire mirror. `table` doubles as a function name
/// when the ticket was minted by `table_function_flight_info`, in which
/// case `parameters` carries the MessagePack-encoded call arguments the
/// eventual `DoGet` needs to re-run `TableFunction::execute`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ticket {
    pub schema: String,
    pub table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ts: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ts_ns: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<u8>>,
}

impl Ticket {
    #[must_use]
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            ts: None,
            ts_ns: None,
            columns: None,
            parameters: None,
        }
    }

    /// Parses ticket bytes off the wire. Bit-exact round-trip with `encode`
    /// is verified by `tests::ticket_roundtrip`.
    pub fn decode(bytes: &[u8]) -> Result<Self, AirportError> {
        rmp_serde::from_slice(bytes)
            .map_err(|e| AirportError::malformed(format!("invalid ticket: {e}")))
    }

    pub fn encode(&self) -> Result<Vec<u8>, AirportError> {
        rmp_serde::to_vec_named(self)
            .map_err(|e| AirportError::internal(format!("failed to encode ticket: {e}")))
    }
}

/// Compresses `data` and wraps it as the MessagePack array
/// `[uncompressed_length, compressed_bytes]`, so clients can pre-allocate
/// before decompressing.
pub fn zstd_frame(data: &[u8]) -> Result<Vec<u8>, AirportError> {
    let compressed = zstd::bulk::compress(data, ZSTD_LEVEL)
        .map_err(|e| AirportError::internal(format!("zstd compression failed: {e}")))?;

    let envelope = rmpv::Value::Array(vec![
        rmpv::Value::from(data.len() as u32),
        rmpv::Value::Binary(compressed),
    ]);

    let mut out = Vec::new();
    rmpv::encode::write_value(&mut out, &envelope)
        .map_err(|e| AirportError::internal(format!("failed to encode envelope: {e}")))?;
    Ok(out)
}

/// Inverse of `zstd_frame`: unwraps the envelope and decompresses.
pub fn zstd_unframe(bytes: &[u8]) -> Result<Vec<u8>, AirportError> {
    let value = rmpv::decode::read_value(&mut &bytes[..])
        .map_err(|e| AirportError::malformed(format!("invalid envelope: {e}")))?;

    let rmpv::Value::Array(items) = value else {
        return Err(AirportError::malformed("envelope is not an array"));
    };
    let [uncompressed_len, data] = items.as_slice() else {
        return Err(AirportError::malformed("envelope must have exactly 2 elements"));
    };

    let uncompressed_len = uncompressed_len
        .as_u64()
        .ok_or_else(|| AirportError::malformed("envelope length is not a uint"))?
        as usize;
    let data = data
        .as_slice()
        .ok_or_else(|| AirportError::malformed("envelope payload is not bytes"))?;

    let out = zstd::bulk::decompress(data, uncompressed_len)
        .map_err(|e| AirportError::malformed(format!("zstd decompression failed: {e}")))?;
    Ok(out)
}
