//! Cloud transport layer for the meshgate gateway.
//!
//! The gateway keeps a local device registered with a Meshblu-style cloud
//! device registry: it creates and removes the device's cloud record, pushes
//! schema and telemetry, and polls the record for configuration updates. This
//! crate owns everything on the wire side of that job:
//!
//! - **[`CloudTransport`]** — the capability set any transport backend must
//!   provide (create-node, sign-in, remove-node, push-schema, push-data,
//!   fetch, set-data, connect/close). Device-management logic depends only on
//!   the trait object, so a non-HTTP backend can be substituted without
//!   touching callers.
//! - **[`HttpTransport`]** — the HTTP implementation. Built by
//!   [`HttpTransport::probe`], which resolves the cloud host and derives the
//!   endpoint set exactly once; every capability reads from that set.
//! - **[`Envelope`]** and [`validate_single`] — the registry wraps a
//!   single-device result in a one-element `"devices"` array; the codec
//!   normalizes that wrapper into the bare record once, centrally.
//! - **[`Connection`]** — a caller-owned connection handle. Exchanges made
//!   through it reuse its pooled socket and never close it; a hang-up signal
//!   lets long-lived watchers tear down when the peer goes away.
//! - **[`Error`]** — the closed outcome taxonomy every caller branches on.

pub mod connection;
pub mod credential;
pub mod endpoints;
pub mod envelope;
pub mod error;
pub mod executor;
pub mod http;
pub mod ops;
pub mod transport;

pub use connection::Connection;
pub use credential::{Credential, DEVICE_TOKEN_LEN, DEVICE_UUID_LEN};
pub use endpoints::EndpointSet;
pub use envelope::{Envelope, validate_single};
pub use error::Error;
pub use http::HttpTransport;
pub use ops::CloudTransport;
pub use transport::TransportConfig;
