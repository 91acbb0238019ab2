use tokio_util::sync::CancellationToken;

/// A caller-owned connection to the registry.
///
/// For the HTTP backend this wraps a dedicated `reqwest::Client` whose
/// keep-alive pool holds the established socket, so every exchange made
/// through the same handle reuses that socket instead of opening a new
/// one. The executor never closes a supplied connection — its lifetime
/// belongs to whoever called `connect`, because a watch shares one
/// handle across all of its ticks.
///
/// The hang-up token is the connection's validity signal: [`close`]
/// cancels it, and a watch observing the cancellation tears itself down.
/// Non-HTTP backends mint bare handles with [`Connection::new`] and get
/// the same hang-up semantics.
///
/// [`close`]: Connection::close
#[derive(Debug, Default, Clone)]
pub struct Connection {
    client: Option<reqwest::Client>,
    hangup: CancellationToken,
}

impl Connection {
    /// A bare handle carrying only the hang-up signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle carrying a dedicated HTTP client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client: Some(client),
            hangup: CancellationToken::new(),
        }
    }

    /// The client carrying this connection's socket pool, if any.
    pub fn client(&self) -> Option<&reqwest::Client> {
        self.client.as_ref()
    }

    /// Signal hang-up. Idempotent; pooled sockets are released when the
    /// last clone of the handle drops.
    pub fn close(&self) {
        self.hangup.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.hangup.is_cancelled()
    }

    /// Resolves when the connection is closed or reports hang-up.
    pub async fn closed(&self) {
        self.hangup.cancelled().await;
    }
}
