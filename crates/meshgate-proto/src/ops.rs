use async_trait::async_trait;
use serde_json::Value;

use crate::connection::Connection;
use crate::credential::Credential;
use crate::envelope::Envelope;
use crate::error::Error;

/// The capability set every cloud transport backend provides.
///
/// Device-management logic depends only on this trait, so a non-HTTP
/// backend (e.g. a socket-stream variant) can be substituted without
/// changing callers. Probing — host resolution and endpoint derivation —
/// is the constructor of each concrete implementation, which is why it
/// does not appear here: no capability is reachable on an unprobed
/// transport.
///
/// Uniform calling convention: every operation takes an optional
/// caller-owned [`Connection`] (reused verbatim when present, a shared
/// transport-internal client otherwise) and returns the response body as
/// an [`Envelope`] or an [`Error`] kind. `sign_in` and `fetch` return the
/// body already normalized through the envelope codec — the bare device
/// record, not the registry's wrapper.
#[async_trait]
pub trait CloudTransport: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Open a dedicated connection to the registry.
    ///
    /// The returned handle is owned by the caller; exchanges made with
    /// it reuse its established socket, and only the caller decides when
    /// it goes away.
    async fn connect(&self) -> Result<Connection, Error>;

    /// Release a connection handle. Signals hang-up to anything watching
    /// the connection; permitted to leave pooled sockets open for reuse.
    async fn close(&self, conn: &Connection);

    /// Create the device's record in the registry. Unauthenticated —
    /// this is how a device first obtains its credential.
    async fn create_node(
        &self,
        conn: Option<&Connection>,
        record: &Value,
    ) -> Result<Envelope, Error>;

    /// Verify the credential against the registry and return the
    /// device's own record (envelope-normalized).
    async fn sign_in(
        &self,
        conn: Option<&Connection>,
        credential: &Credential,
    ) -> Result<Envelope, Error>;

    /// Delete the device's record from the registry.
    async fn remove_node(
        &self,
        conn: Option<&Connection>,
        credential: &Credential,
    ) -> Result<Envelope, Error>;

    /// Replace the device's schema on its registry record.
    async fn push_schema(
        &self,
        conn: Option<&Connection>,
        credential: &Credential,
        schema: &Value,
    ) -> Result<Envelope, Error>;

    /// Append a telemetry sample to the device's data collection.
    async fn push_data(
        &self,
        conn: Option<&Connection>,
        credential: &Credential,
        sample: &Value,
    ) -> Result<Envelope, Error>;

    /// Read the device's record (envelope-normalized). This is the
    /// operation a watch drives on every tick.
    async fn fetch(
        &self,
        conn: Option<&Connection>,
        credential: &Credential,
    ) -> Result<Envelope, Error>;

    /// Update data values on the device's registry record.
    async fn set_data(
        &self,
        conn: Option<&Connection>,
        credential: &Credential,
        values: &Value,
    ) -> Result<Envelope, Error>;
}
