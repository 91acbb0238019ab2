// Session facade over a cloud transport.
//
// Owns the transport instance and the cancellation root for every watch
// registered through it. Probing builds the session; shutdown cancels
// the watches and invalidates the session for further calls.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::info;

use meshgate_proto::{
    CloudTransport, Connection, Credential, Envelope, HttpTransport, TransportConfig,
};

use crate::error::CoreError;
use crate::watch::{self, TICK_INTERVAL, WatchCallback, WatchHandle};

/// Parameters for probing a registry session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Registry host (bare name or with explicit scheme).
    pub host: String,
    pub port: u16,
    /// Poll cadence for watches registered on this session.
    pub tick: Duration,
}

impl SessionConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            tick: TICK_INTERVAL,
        }
    }
}

/// The device manager's handle on the cloud.
///
/// Exposes the full capability set of the underlying transport plus
/// watch registration. All watches registered here are children of the
/// session's shutdown root, so [`shutdown`](Session::shutdown) sweeps
/// them in one cancellation.
pub struct Session {
    transport: Arc<dyn CloudTransport>,
    tick: Duration,
    closed: CancellationToken,
}

impl Session {
    /// Resolve the registry host and open a session over HTTP.
    ///
    /// The one-time probe step — the only way to reach any capability.
    pub async fn probe(config: SessionConfig) -> Result<Self, CoreError> {
        let transport =
            HttpTransport::probe(&config.host, config.port, TransportConfig::default()).await?;
        Ok(Self::from_transport(Arc::new(transport), config.tick))
    }

    /// Wrap an already-built transport backend.
    pub fn from_transport(transport: Arc<dyn CloudTransport>, tick: Duration) -> Self {
        Self {
            transport,
            tick,
            closed: CancellationToken::new(),
        }
    }

    /// Short name of the transport backend in use.
    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    fn ensure_open(&self) -> Result<(), CoreError> {
        if self.closed.is_cancelled() {
            return Err(CoreError::SessionClosed);
        }
        Ok(())
    }

    // ── Connection lifecycle ─────────────────────────────────────────

    /// Open a caller-owned connection for reuse across capability calls
    /// and watch ticks.
    pub async fn connect(&self) -> Result<Connection, CoreError> {
        self.ensure_open()?;
        Ok(self.transport.connect().await?)
    }

    /// Release a connection. Watches on it observe the hang-up and tear
    /// themselves down.
    pub async fn close(&self, conn: &Connection) {
        self.transport.close(conn).await;
    }

    // ── Capability delegation ────────────────────────────────────────

    pub async fn create_node(
        &self,
        conn: Option<&Connection>,
        record: &Value,
    ) -> Result<Envelope, CoreError> {
        self.ensure_open()?;
        Ok(self.transport.create_node(conn, record).await?)
    }

    pub async fn sign_in(
        &self,
        conn: Option<&Connection>,
        credential: &Credential,
    ) -> Result<Envelope, CoreError> {
        self.ensure_open()?;
        Ok(self.transport.sign_in(conn, credential).await?)
    }

    pub async fn remove_node(
        &self,
        conn: Option<&Connection>,
        credential: &Credential,
    ) -> Result<Envelope, CoreError> {
        self.ensure_open()?;
        Ok(self.transport.remove_node(conn, credential).await?)
    }

    pub async fn push_schema(
        &self,
        conn: Option<&Connection>,
        credential: &Credential,
        schema: &Value,
    ) -> Result<Envelope, CoreError> {
        self.ensure_open()?;
        Ok(self.transport.push_schema(conn, credential, schema).await?)
    }

    pub async fn push_data(
        &self,
        conn: Option<&Connection>,
        credential: &Credential,
        sample: &Value,
    ) -> Result<Envelope, CoreError> {
        self.ensure_open()?;
        Ok(self.transport.push_data(conn, credential, sample).await?)
    }

    pub async fn fetch(
        &self,
        conn: Option<&Connection>,
        credential: &Credential,
    ) -> Result<Envelope, CoreError> {
        self.ensure_open()?;
        Ok(self.transport.fetch(conn, credential).await?)
    }

    pub async fn set_data(
        &self,
        conn: Option<&Connection>,
        credential: &Credential,
        values: &Value,
    ) -> Result<Envelope, CoreError> {
        self.ensure_open()?;
        Ok(self.transport.set_data(conn, credential, values).await?)
    }

    // ── Watches ──────────────────────────────────────────────────────

    /// Register a recurring poll for one device, delivering each decoded
    /// record to `deliver`.
    ///
    /// Registrations are never deduplicated: watching the same device
    /// twice yields two independent subscriptions, each with its own
    /// timer and handle.
    pub fn watch(
        &self,
        conn: Connection,
        credential: Credential,
        deliver: impl FnMut(Value) + Send + 'static,
    ) -> Result<WatchHandle, CoreError> {
        self.ensure_open()?;
        let cancel = self.closed.child_token();
        let callback: WatchCallback = Box::new(deliver);
        Ok(watch::spawn(
            Arc::clone(&self.transport),
            conn,
            credential,
            self.tick,
            cancel,
            callback,
        ))
    }

    // ── Shutdown ─────────────────────────────────────────────────────

    /// Tear the session down: every live watch is cancelled and all
    /// subsequent capability calls fail with
    /// [`CoreError::SessionClosed`]. Idempotent.
    pub fn shutdown(&self) {
        if !self.closed.is_cancelled() {
            info!(transport = self.transport.name(), "session shut down");
        }
        self.closed.cancel();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::mpsc;

    use meshgate_proto::{Envelope, Error, validate_single};

    use super::*;

    const UUID: &str = "11111111-1111-1111-1111-111111111111";
    const TOKEN: &str = "0123456789012345678901234567890123456789";

    /// Minimal always-healthy backend for facade tests.
    struct FixedTransport;

    #[async_trait]
    impl CloudTransport for FixedTransport {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn connect(&self) -> Result<Connection, Error> {
            Ok(Connection::new())
        }

        async fn close(&self, conn: &Connection) {
            conn.close();
        }

        async fn create_node(
            &self,
            _conn: Option<&Connection>,
            record: &Value,
        ) -> Result<Envelope, Error> {
            Ok(Envelope::new(serde_json::to_vec(record).unwrap()))
        }

        async fn sign_in(
            &self,
            _conn: Option<&Connection>,
            credential: &Credential,
        ) -> Result<Envelope, Error> {
            let wrapped = json!({ "devices": [{ "uuid": credential.uuid() }] });
            validate_single(&Envelope::new(serde_json::to_vec(&wrapped).unwrap()))
        }

        async fn remove_node(
            &self,
            _conn: Option<&Connection>,
            _credential: &Credential,
        ) -> Result<Envelope, Error> {
            Ok(Envelope::default())
        }

        async fn push_schema(
            &self,
            _conn: Option<&Connection>,
            _credential: &Credential,
            _schema: &Value,
        ) -> Result<Envelope, Error> {
            Ok(Envelope::default())
        }

        async fn push_data(
            &self,
            _conn: Option<&Connection>,
            _credential: &Credential,
            _sample: &Value,
        ) -> Result<Envelope, Error> {
            Ok(Envelope::default())
        }

        async fn fetch(
            &self,
            _conn: Option<&Connection>,
            _credential: &Credential,
        ) -> Result<Envelope, Error> {
            let wrapped = json!({ "devices": [{ "temp": 21 }] });
            validate_single(&Envelope::new(serde_json::to_vec(&wrapped).unwrap()))
        }

        async fn set_data(
            &self,
            _conn: Option<&Connection>,
            _credential: &Credential,
            _values: &Value,
        ) -> Result<Envelope, Error> {
            Ok(Envelope::default())
        }
    }

    fn session() -> Session {
        Session::from_transport(Arc::new(FixedTransport), TICK_INTERVAL)
    }

    fn credential() -> Credential {
        Credential::new(UUID, TOKEN).unwrap()
    }

    #[tokio::test]
    async fn sign_in_returns_the_bare_record() {
        let session = session();
        let record = session.sign_in(None, &credential()).await.unwrap();
        assert_eq!(record.to_value().unwrap(), json!({ "uuid": UUID }));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_sweeps_watches_and_closes_the_session() {
        let session = session();
        let conn = session.connect().await.unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = session
            .watch(conn, credential(), move |payload| {
                let _ = tx.send(payload);
            })
            .unwrap();

        assert_eq!(rx.recv().await.unwrap(), json!({ "temp": 21 }));

        session.shutdown();
        session.shutdown(); // idempotent
        handle.join().await;

        assert!(matches!(
            session.fetch(None, &credential()).await,
            Err(CoreError::SessionClosed)
        ));
        assert!(matches!(
            session.connect().await,
            Err(CoreError::SessionClosed)
        ));
        assert!(session.watch(Connection::new(), credential(), |_| ()).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn watching_the_same_device_twice_is_permitted() {
        let session = session();
        let conn_a = session.connect().await.unwrap();
        let conn_b = session.connect().await.unwrap();

        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();

        let a = session
            .watch(conn_a, credential(), move |p| {
                let _ = tx_a.send(p);
            })
            .unwrap();
        let b = session
            .watch(conn_b, credential(), move |p| {
                let _ = tx_b.send(p);
            })
            .unwrap();

        rx_a.recv().await.unwrap();
        rx_b.recv().await.unwrap();

        session.shutdown();
        a.join().await;
        b.join().await;
    }
}
