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

//! `DoExchange`: the single bidirectional entry point the DML pipeline and
//! the function pipeline both ride, dispatched by the
//! `airport-operation` header the request-context middleware already
//! parsed. The first message on the client's stream carries the
//! `FlightDescriptor` identifying what to operate on; we peek it off, then
//! splice it back onto the stream so the decoder still sees every batch.

use arrow_flight::FlightData;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::Deserialize;
use tonic::{Request, Response, Status, Streaming};

use super::AirportService;
use crate::catalog::DmlOptions;
use crate::request::{AirportOperation, RequestContext};

/// `returning`/`returning_columns` travel in the first message's
/// `FlightDescriptor.cmd` (same MessagePack-envelope convention the
/// Function Pipeline uses for its own call parameters).
#[derive(Debug, Deserialize, Default)]
struct DmlCallParameters {
    #[serde(default)]
    returning: bool,
    #[serde(default)]
    returning_columns: Vec<String>,
}

fn split_path(path: &[String]) -> Result<(&str, &str), Status> {
    match path {
        [schema, name] => Ok((schema.as_str(), name.as_str())),
        _ => Err(Status::invalid_argument(
            "flight descriptor path must be [schema_name, table_or_function_name]",
        )),
    }
}

pub(super) async fn handle(
    service: &AirportService,
    request: Request<Streaming<FlightData>>,
) -> Result<Response<BoxStream<'static, Result<FlightData, Status>>>, Status> {
    let operation = RequestContext::current()
        .and_then(|ctx| ctx.operation())
        .ok_or_else(|| {
            Status::invalid_argument("missing or unrecognized airport-operation header")
        })?;

    let mut incoming = request.into_inner();
    let first = incoming
        .next()
        .await
        .transpose()?
        .ok_or_else(|| Status::invalid_argument("empty do_exchange stream"))?;
    let descriptor = first
        .flight_descriptor
        .clone()
        .ok_or_else(|| Status::invalid_argument("first do_exchange message must carry a descriptor"))?;
    let (schema_name, name) = split_path(&descriptor.path)?;
    let schema_name = schema_name.to_string();
    let name = name.to_string();
    let cmd = descriptor.cmd.clone();

    let spliced = futures::stream::once(async move { Ok(first) }).chain(incoming);

    let catalog_name = AirportService::current_catalog_name();

    match operation {
        AirportOperation::Insert | AirportOperation::Update | AirportOperation::Delete => {
            let params: DmlCallParameters = if cmd.is_empty() {
                DmlCallParameters::default()
            } else {
                crate::envelope::decode_action_body(&cmd).map_err(Status::from)?
            };
            let transaction_id =
                RequestContext::current().and_then(|ctx| ctx.transaction_id().map(str::to_owned));
            let options = DmlOptions {
                returning: params.returning,
                returning_columns: params.returning_columns,
                transaction_id,
            };

            let catalog = service.registry.resolve(&catalog_name)?;
            let stream = crate::recovery::guard(crate::dml::do_exchange(
                catalog.as_ref(),
                operation,
                &schema_name,
                &name,
                spliced,
                options,
            ))
            .await
            .map_err(Status::from)?;
            Ok(Response::new(stream))
        }
        AirportOperation::ScalarFunction | AirportOperation::TableFunctionInOut => {
            let catalog = service.registry.resolve(&catalog_name)?;
            let schema = catalog
                .schema(&schema_name)
                .await
                .map_err(Status::from)?
                .ok_or_else(|| {
                    Status::from(crate::error::AirportError::not_found("schema", schema_name.clone()))
                })?;

            let stream = crate::recovery::guard(crate::function::do_exchange(
                schema.as_ref(),
                operation,
                &name,
                &cmd,
                spliced,
            ))
            .await
            .map_err(Status::from)?;
            Ok(Response::new(stream))
        }
    }
}
