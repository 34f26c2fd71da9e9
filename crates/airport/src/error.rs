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

//! Error taxonomy for the protocol engine, and the single conversion point
//! into `tonic::Status`.

use snafu::Snafu;
use tonic::Status;

/// The Airport error kinds, one variant per kind.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AirportError {
    #[snafu(display("malformed request envelope: {reason}"))]
    MalformedEnvelope { reason: String },

    #[snafu(display("unknown action `{action}`"))]
    UnknownAction { action: String },

    #[snafu(display("{what} `{name}` not found"))]
    NotFound { what: &'static str, name: String },

    #[snafu(display("{what} `{name}` already exists"))]
    AlreadyExists { what: &'static str, name: String },

    #[snafu(display("table `{table}` does not support {capability}"))]
    CapabilityMissing { table: String, capability: String },

    #[snafu(display("schema mismatch: expected {expected}, got {actual}"))]
    SchemaMismatch { expected: String, actual: String },

    #[snafu(display("type mismatch: expected {expected}, got {actual}"))]
    TypeMismatch { expected: String, actual: String },

    #[snafu(display("{operation} requires a rowid column in the input schema"))]
    RowIdMissing { operation: &'static str },

    #[snafu(display("ticket carries both `ts` and `ts_ns`; at most one is allowed"))]
    TimePointConflict,

    #[snafu(display("negative timestamp in ticket: {value}"))]
    NegativeTimestamp { value: i64 },

    #[snafu(display("unauthenticated: {reason}"))]
    Unauthenticated { reason: String },

    #[snafu(display("request cancelled"))]
    Cancelled,

    #[snafu(display("deadline exceeded"))]
    DeadlineExceeded,

    #[snafu(display("{source}"))]
    UserCallback { source: Box<dyn std::error::Error + Send + Sync> },

    #[snafu(display("internal panic in handler: {message}"))]
    InternalPanic { message: String },

    #[snafu(display("{what} is not implemented by this server"))]
    Unimplemented { what: String },

    #[snafu(display("{reason}"))]
    Internal { reason: String },
}

impl AirportError {
    /// Builds a `UserCallback` error from any boxed source error.
    pub fn user_callback<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        AirportError::UserCallback { source: Box::new(source) }
    }

    pub fn not_found(what: &'static str, name: impl Into<String>) -> Self {
        AirportError::NotFound { what, name: name.into() }
    }

    pub fn already_exists(what: &'static str, name: impl Into<String>) -> Self {
        AirportError::AlreadyExists { what, name: name.into() }
    }

    pub fn capability_missing(table: impl Into<String>, capability: impl Into<String>) -> Self {
        AirportError::CapabilityMissing { table: table.into(), capability: capability.into() }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        AirportError::MalformedEnvelope { reason: reason.into() }
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        AirportError::Internal { reason: reason.into() }
    }
}

/// Maps each error kind to its Flight status.
impl From<AirportError> for Status {
    fn from(err: AirportError) -> Self {
        match err {
            AirportError::MalformedEnvelope { .. }
            | AirportError::SchemaMismatch { .. }
            | AirportError::TypeMismatch { .. }
            | AirportError::RowIdMissing { .. }
            | AirportError::TimePointConflict
            | AirportError::NegativeTimestamp { .. } => {
                Status::invalid_argument(err.to_string())
            }
            AirportError::UnknownAction { .. } => Status::unimplemented(err.to_string()),
            AirportError::NotFound { .. } => Status::not_found(err.to_string()),
            AirportError::AlreadyExists { .. } => Status::already_exists(err.to_string()),
            AirportError::CapabilityMissing { .. } => {
                Status::failed_precondition(err.to_string())
            }
            AirportError::Unauthenticated { .. } => Status::unauthenticated(err.to_string()),
            AirportError::Cancelled => Status::cancelled(err.to_string()),
            AirportError::DeadlineExceeded => Status::deadline_exceeded(err.to_string()),
            AirportError::Unimplemented { .. } => Status::unimplemented(err.to_string()),
            AirportError::UserCallback { ref source } => {
                Status::internal(format!("user callback failed: {source}"))
            }
            AirportError::InternalPanic { .. } | AirportError::Internal { .. } => {
                Status::internal(err.to_string())
            }
        }
    }
}

pub type Result<T, E = AirportError> = std::result::Result<T, E>;
