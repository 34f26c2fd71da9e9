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
#![allow(clippy::missing_errors_doc)]

//! Flight RPC protocol engine for the DuckDB "Airport" extension.
//!
//! This crate is a library: a host process implements [`catalog::Catalog`]
//! and friends, hands it to [`AirportServiceBuilder`], and gets back a
//! `tonic` [`FlightServiceServer`] ready to `.serve()`. Everything else —
//! envelope codec, capability dispatch, DML/function pipelines, auth and
//! request-context propagation — lives behind that one entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use arrow_flight::flight_service_server::FlightServiceServer;
use secrecy::ExposeSecret;
use snafu::prelude::*;
use tonic::transport::{Identity, Server, ServerTlsConfig};
use tower::ServiceBuilder;

pub mod action;
pub mod auth;
pub mod capability;
pub mod catalog;
pub mod dml;
pub mod envelope;
pub mod error;
mod flight;
pub mod function;
mod recovery;
pub mod request;
pub mod router;
pub mod scan;
pub mod serializer;
pub mod transaction;

pub use auth::{AuthIdentity, Authenticator};
pub use error::AirportError;
pub use flight::AirportService;
pub use router::CatalogRegistry;
pub use transaction::{TransactionManager, TransactionRegistry};

/// TLS identity for the Flight server: a cert/key pair held as secrets.
pub struct TlsIdentity {
    pub cert: secrecy::SecretString,
    pub key: secrecy::SecretString,
}

/// Ambient configuration for [`AirportServiceBuilder::serve`]: bind
/// address, optional TLS, and the default scan batch size tables MAY
/// consult through `ScanOptions::batch_size` (0 means implementation
/// default).
pub struct AirportConfig {
    pub bind_address: SocketAddr,
    pub tls: Option<TlsIdentity>,
    pub default_batch_size: usize,
}

impl AirportConfig {
    #[must_use]
    pub fn new(bind_address: SocketAddr) -> Self {
        Self { bind_address, tls: None, default_batch_size: 0 }
    }

    #[must_use]
    pub fn with_tls(mut self, tls: TlsIdentity) -> Self {
        self.tls = Some(tls);
        self
    }

    #[must_use]
    pub fn with_default_batch_size(mut self, batch_size: usize) -> Self {
        self.default_batch_size = batch_size;
        self
    }
}

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("unable to configure TLS on the Flight server: {source}"))]
    ConfigureTls { source: tonic::transport::Error },

    #[snafu(display("unable to start Flight server: {source}"))]
    StartFlightServer { source: tonic::transport::Error },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Fluent builder tying a [`catalog::Catalog`] (or several, keyed by name)
/// together with an optional [`Authenticator`] and [`TransactionManager`]
/// into a ready-to-serve [`FlightServiceServer`].
pub struct AirportServiceBuilder {
    registry: CatalogRegistry,
    transactions: TransactionRegistry,
    authenticator: Option<Arc<dyn Authenticator>>,
}

impl AirportServiceBuilder {
    /// Starts a builder whose default (empty-named) catalog is
    /// `default_catalog`.
    #[must_use]
    pub fn new(default_catalog: Arc<dyn catalog::Catalog>) -> Self {
        Self {
            registry: CatalogRegistry::new(default_catalog),
            transactions: TransactionRegistry::new(),
            authenticator: None,
        }
    }

    /// Registers an additional catalog under `name` in the multi-catalog
    /// router. Panics on a duplicate name, since that is a host-process
    /// wiring mistake, not a runtime condition.
    #[must_use]
    pub fn with_catalog(self, name: impl Into<String>, catalog: Arc<dyn catalog::Catalog>) -> Self {
        let name = name.into();
        self.registry
            .add_catalog(&name, catalog)
            .unwrap_or_else(|e| panic!("failed to register catalog `{name}`: {e}"));
        self
    }

    #[must_use]
    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    /// Builds the `FlightService` implementation without wrapping it in a
    /// server, for tests that drive it directly or embed it in a larger
    /// `tonic` service.
    #[must_use]
    pub fn build(self) -> FlightServiceServer<AirportService> {
        FlightServiceServer::new(AirportService::new(
            Arc::new(self.registry),
            Arc::new(self.transactions),
        ))
    }

    /// Builds the service and serves it at `config.bind_address`, with
    /// request-context propagation outermost, then auth.
    pub async fn serve(self, config: AirportConfig) -> Result<()> {
        let authenticator = self.authenticator.clone();
        let svc = self.build();

        tracing::info!("Airport Flight server listening on {}", config.bind_address);

        let mut server = Server::builder();

        if let Some(tls) = &config.tls {
            let server_tls_config = ServerTlsConfig::new().identity(Identity::from_pem(
                tls.cert.expose_secret(),
                tls.key.expose_secret(),
            ));
            server = server.tls_config(server_tls_config).context(ConfigureTlsSnafu)?;
        }

        let auth_layer = ServiceBuilder::new().layer(auth::AuthLayer::new(authenticator)).into_inner();

        server
            .layer(flight::middleware::RequestContextLayer)
            .layer(auth_layer)
            .add_service(svc)
            .serve(config.bind_address)
            .await
            .context(StartFlightServerSnafu)?;

        Ok(())
    }
}
