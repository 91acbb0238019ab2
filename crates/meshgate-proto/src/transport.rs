// Shared client construction for the HTTP transport.
//
// The exchange timeout and redirect limit are fixed operational policy:
// they bound the worst-case latency of a single poll tick and are not
// exposed to callers of the capability set.

use std::time::Duration;

use reqwest::redirect;

use crate::error::Error;

/// Bounded timeout applied to every exchange.
pub const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(30);

/// At most one redirect is followed per exchange.
pub const MAX_REDIRECTS: usize = 1;

const USER_AGENT: &str = concat!("meshgate/", env!("CARGO_PKG_VERSION"));

/// Configuration for building the HTTP clients behind the transport.
///
/// Only the timeout is adjustable, and only so tests can shrink it;
/// production construction uses [`TransportConfig::default`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: EXCHANGE_TIMEOUT,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` with the fixed exchange policy applied.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(Error::Transport)
    }
}
