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

//! `Handshake` is not part of the Airport wire protocol (auth happens via
//! the `authorization` header on every call, not a dedicated handshake
//! RPC), so this simply declines it.

use arrow_flight::HandshakeResponse;
use futures::stream::BoxStream;
use tonic::{Request, Response, Status, Streaming};

use super::AirportService;

pub(super) async fn handle(
    _request: Request<Streaming<arrow_flight::HandshakeRequest>>,
) -> Result<Response<BoxStream<'static, Result<HandshakeResponse, Status>>>, Status> {
    Err(Status::unimplemented(
        "handshake is not used; authenticate with an `authorization: Bearer <token>` header on each call",
    ))
}

#[allow(dead_code)]
fn _type_check(_: &AirportService) {}
