// HTTP implementation of the cloud transport capability set.

use async_trait::async_trait;
use serde_json::Value;
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::connection::Connection;
use crate::credential::Credential;
use crate::endpoints::EndpointSet;
use crate::envelope::{Envelope, validate_single};
use crate::error::Error;
use crate::executor::execute;
use crate::ops::CloudTransport;
use crate::transport::TransportConfig;

/// HTTP transport backend for the registry.
///
/// Constructed by [`probe`](HttpTransport::probe), which resolves the
/// host and derives the endpoint set exactly once; the set is read-only
/// for the life of the value. Capability calls that receive no
/// connection use a transport-internal shared client.
pub struct HttpTransport {
    endpoints: EndpointSet,
    config: TransportConfig,
    shared: reqwest::Client,
}

impl HttpTransport {
    /// Resolve the registry host and build the transport.
    ///
    /// The one-time probe step: fails with [`Error::Unreachable`] when
    /// the host does not resolve, before any capability is reachable.
    pub async fn probe(host: &str, port: u16, config: TransportConfig) -> Result<Self, Error> {
        let endpoints = EndpointSet::resolve(host, port).await?;
        let shared = config.build_client()?;
        info!(base = %endpoints.base(), "registry endpoint probed");
        Ok(Self {
            endpoints,
            config,
            shared,
        })
    }

    /// The derived endpoint set.
    pub fn endpoints(&self) -> &EndpointSet {
        &self.endpoints
    }

    fn client<'a>(&'a self, conn: Option<&'a Connection>) -> &'a reqwest::Client {
        conn.and_then(Connection::client).unwrap_or(&self.shared)
    }
}

#[async_trait]
impl CloudTransport for HttpTransport {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn connect(&self) -> Result<Connection, Error> {
        // Preflight TCP connect so an unreachable registry surfaces here
        // rather than on the first poll tick. The probe socket is dropped;
        // the connection's own pool re-establishes and then keeps alive.
        let target = (self.endpoints.host(), self.endpoints.port());
        TcpStream::connect(target)
            .await
            .map_err(|e| Error::Unreachable {
                host: format!("{}:{}", target.0, target.1),
                reason: e.to_string(),
            })?;

        let client = self.config.build_client()?;
        debug!(host = target.0, port = target.1, "registry connection opened");
        Ok(Connection::with_client(client))
    }

    async fn close(&self, conn: &Connection) {
        conn.close();
    }

    async fn create_node(
        &self,
        conn: Option<&Connection>,
        record: &Value,
    ) -> Result<Envelope, Error> {
        execute(
            self.client(conn),
            "POST",
            self.endpoints.devices(),
            Some(record),
            None,
        )
        .await
    }

    async fn sign_in(
        &self,
        conn: Option<&Connection>,
        credential: &Credential,
    ) -> Result<Envelope, Error> {
        let raw = execute(
            self.client(conn),
            "GET",
            self.endpoints.device(credential.uuid()),
            None,
            Some(credential),
        )
        .await?;
        validate_single(&raw)
    }

    async fn remove_node(
        &self,
        conn: Option<&Connection>,
        credential: &Credential,
    ) -> Result<Envelope, Error> {
        execute(
            self.client(conn),
            "DELETE",
            self.endpoints.device(credential.uuid()),
            None,
            Some(credential),
        )
        .await
    }

    async fn push_schema(
        &self,
        conn: Option<&Connection>,
        credential: &Credential,
        schema: &Value,
    ) -> Result<Envelope, Error> {
        execute(
            self.client(conn),
            "PUT",
            self.endpoints.device(credential.uuid()),
            Some(schema),
            Some(credential),
        )
        .await
    }

    async fn push_data(
        &self,
        conn: Option<&Connection>,
        credential: &Credential,
        sample: &Value,
    ) -> Result<Envelope, Error> {
        execute(
            self.client(conn),
            "POST",
            self.endpoints.data(credential.uuid()),
            Some(sample),
            Some(credential),
        )
        .await
    }

    async fn fetch(
        &self,
        conn: Option<&Connection>,
        credential: &Credential,
    ) -> Result<Envelope, Error> {
        let raw = execute(
            self.client(conn),
            "GET",
            self.endpoints.device(credential.uuid()),
            None,
            Some(credential),
        )
        .await?;
        validate_single(&raw)
    }

    async fn set_data(
        &self,
        conn: Option<&Connection>,
        credential: &Credential,
        values: &Value,
    ) -> Result<Envelope, Error> {
        execute(
            self.client(conn),
            "PUT",
            self.endpoints.device(credential.uuid()),
            Some(values),
            Some(credential),
        )
        .await
    }
}
