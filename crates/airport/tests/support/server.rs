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

//! Loopback Flight server bootstrap shared by every scenario test: binds
//! `AirportServiceBuilder`'s `FlightServiceServer` to an OS-assigned port,
//! spawns it, and hands back a connected channel.

use std::net::{Ipv4Addr, SocketAddr, TcpListener};
use std::sync::Arc;
use std::time::Duration;

use airport::catalog::Catalog;
use airport::AirportServiceBuilder;
use tokio::task::JoinHandle;
use tonic::transport::{Channel, Server};

pub struct TestServer {
    pub addr: SocketAddr,
    pub channel: Channel,
    _handle: JoinHandle<()>,
}

/// Starts a server fronting `catalog` and returns a ready-to-use channel.
pub async fn start(catalog: Arc<dyn Catalog>) -> TestServer {
    let addr = free_loopback_addr();
    let svc = AirportServiceBuilder::new(catalog).build();

    let handle = tokio::spawn(async move {
        Server::builder()
            .add_service(svc)
            .serve(addr)
            .await
            .expect("test flight server exited unexpectedly");
    });

    wait_until_listening(addr).await;
    let channel = connect(addr).await;

    TestServer { addr, channel, _handle: handle }
}

fn free_loopback_addr() -> SocketAddr {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).expect("failed to reserve a test port");
    listener.local_addr().expect("listener has no local address")
}

async fn wait_until_listening(addr: SocketAddr) {
    for _ in 0..50 {
        if tokio::net::TcpStream::connect(addr).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("test flight server never started listening on {addr}");
}

async fn connect(addr: SocketAddr) -> Channel {
    Channel::from_shared(format!("http://{addr}"))
        .expect("invalid test server uri")
        .connect()
        .await
        .expect("failed to connect to test flight server")
}
