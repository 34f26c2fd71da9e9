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

//! The `FlightService` implementation tying every component together: the
//! gRPC transport hands requests here, the request context set up by
//! `middleware::RequestContextLayer` tells us which catalog/operation to
//! route to, and each Flight verb delegates to its owning component.

mod actions;
mod do_exchange;
mod get_flight_info;
mod get_schema;
mod handshake;
pub mod middleware;

use std::sync::Arc;

use arrow_flight::flight_service_server::FlightService;
use arrow_flight::{
    Action, ActionType, Criteria, Empty, FlightData, FlightDescriptor, FlightInfo,
    HandshakeRequest, HandshakeResponse, PollInfo, PutResult, SchemaResult, Ticket,
};
use futures::stream::BoxStream;
use tonic::{Request, Response, Status, Streaming};

use crate::router::CatalogRegistry;
use crate::transaction::TransactionRegistry;

/// The protocol engine's `FlightService` implementation. Holds the two
/// pieces of process-wide state this engine permits (multi-catalog
/// registry, transaction registry); everything else is reached through
/// the `Catalog`/`Schema`/`Table` trait objects those registries resolve to.
pub struct AirportService {
    pub(crate) registry: Arc<CatalogRegistry>,
    pub(crate) transactions: Arc<TransactionRegistry>,
}

impl AirportService {
    #[must_use]
    pub fn new(registry: Arc<CatalogRegistry>, transactions: Arc<TransactionRegistry>) -> Self {
        Self { registry, transactions }
    }

    /// The `airport-catalog` header value for the current request, or the
    /// default catalog key when absent.
    fn current_catalog_name() -> String {
        crate::request::RequestContext::current()
            .and_then(|ctx| ctx.catalog_name().map(str::to_owned))
            .unwrap_or_default()
    }
}

#[tonic::async_trait]
impl FlightService for AirportService {
    type HandshakeStream = BoxStream<'static, Result<HandshakeResponse, Status>>;
    type ListFlightsStream = BoxStream<'static, Result<FlightInfo, Status>>;
    type DoGetStream = BoxStream<'static, Result<FlightData, Status>>;
    type DoPutStream = BoxStream<'static, Result<PutResult, Status>>;
    type DoActionStream = BoxStream<'static, Result<arrow_flight::Result, Status>>;
    type ListActionsStream = BoxStream<'static, Result<ActionType, Status>>;
    type DoExchangeStream = BoxStream<'static, Result<FlightData, Status>>;

    async fn handshake(
        &self,
        request: Request<Streaming<HandshakeRequest>>,
    ) -> Result<Response<Self::HandshakeStream>, Status> {
        handshake::handle(request).await
    }

    async fn list_flights(
        &self,
        _request: Request<Criteria>,
    ) -> Result<Response<Self::ListFlightsStream>, Status> {
        Err(Status::unimplemented("list_flights is not implemented"))
    }

    async fn get_flight_info(
        &self,
        request: Request<FlightDescriptor>,
    ) -> Result<Response<FlightInfo>, Status> {
        let catalog_name = Self::current_catalog_name();
        let catalog = self.registry.resolve(&catalog_name)?;
        get_flight_info::handle(catalog.as_ref(), request.into_inner())
            .await
            .map(Response::new)
            .map_err(Status::from)
    }

    async fn poll_flight_info(
        &self,
        _request: Request<FlightDescriptor>,
    ) -> Result<Response<PollInfo>, Status> {
        Err(Status::unimplemented("poll_flight_info is not implemented"))
    }

    async fn get_schema(
        &self,
        request: Request<FlightDescriptor>,
    ) -> Result<Response<SchemaResult>, Status> {
        let catalog_name = Self::current_catalog_name();
        let catalog = self.registry.resolve(&catalog_name)?;
        get_schema::handle(catalog.as_ref(), request.into_inner())
            .await
            .map(Response::new)
            .map_err(Status::from)
    }

    async fn do_get(
        &self,
        request: Request<Ticket>,
    ) -> Result<Response<Self::DoGetStream>, Status> {
        let catalog_name = Self::current_catalog_name();
        let catalog = self.registry.resolve(&catalog_name)?;
        let stream = crate::recovery::guard(crate::scan::do_get(
            catalog.as_ref(),
            &request.into_inner().ticket,
        ))
        .await
        .map_err(Status::from)?;
        Ok(Response::new(stream))
    }

    async fn do_put(
        &self,
        _request: Request<Streaming<FlightData>>,
    ) -> Result<Response<Self::DoPutStream>, Status> {
        // DML rides DoExchange exclusively (header-selected verb dispatch
        // assumes the bidirectional RETURNING path); DoPut is not part of
        // this protocol's write surface.
        Err(Status::unimplemented("writes use DoExchange, not DoPut"))
    }

    async fn do_exchange(
        &self,
        request: Request<Streaming<FlightData>>,
    ) -> Result<Response<Self::DoExchangeStream>, Status> {
        do_exchange::handle(self, request).await
    }

    async fn do_action(
        &self,
        request: Request<Action>,
    ) -> Result<Response<Self::DoActionStream>, Status> {
        actions::do_action(self, request).await
    }

    async fn list_actions(
        &self,
        _request: Request<Empty>,
    ) -> Result<Response<Self::ListActionsStream>, Status> {
        Ok(Response::new(actions::list()))
    }
}
