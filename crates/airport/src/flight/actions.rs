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

//! `DoAction`/`ListActions`: thin transport glue around
//! `crate::action::dispatch`.

use arrow_flight::{Action, ActionType};
use futures::stream::BoxStream;
use tonic::{Request, Response, Status};

use super::AirportService;

/// Every action name the action router recognizes, reported back to
/// clients that call `ListActions`.
const ACTION_NAMES: &[&str] = &[
    "list_schemas",
    "list_tables",
    "create_schema",
    "drop_schema",
    "create_table",
    "drop_table",
    "rename_table",
    "add_column",
    "remove_column",
    "rename_column",
    "change_column_type",
    "set_not_null",
    "drop_not_null",
    "set_default",
    "add_field",
    "rename_field",
    "table_function_flight_info",
    "endpoints",
    "create_transaction",
    "get_transaction_status",
    "column_statistics",
];

pub(super) fn list() -> BoxStream<'static, Result<ActionType, Status>> {
    let types = ACTION_NAMES
        .iter()
        .map(|name| Ok(ActionType { r#type: (*name).to_string(), description: String::new() }))
        .collect::<Vec<_>>();
    Box::pin(futures::stream::iter(types))
}

pub(super) async fn do_action(
    service: &AirportService,
    request: Request<Action>,
) -> Result<Response<BoxStream<'static, Result<arrow_flight::Result, Status>>>, Status> {
    let catalog_name = AirportService::current_catalog_name();
    let action = request.into_inner();

    let reply = crate::recovery::guard(crate::action::dispatch(
        &service.registry,
        &service.transactions,
        &catalog_name,
        &action.r#type,
        &action.body,
    ))
    .await
    .map_err(Status::from)?;

    let body: BoxStream<'static, Result<arrow_flight::Result, Status>> = Box::pin(futures::stream::once(
        async move { Ok(arrow_flight::Result { body: reply.into() }) },
    ));
    Ok(Response::new(body))
}
