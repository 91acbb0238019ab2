//! Session lifecycle and watch scheduling between `meshgate-proto` and
//! the device manager.
//!
//! - **[`Session`]** — facade owning an `Arc<dyn CloudTransport>` plus the
//!   cancellation root for every watch registered through it.
//!   [`Session::probe`] resolves the registry host and is the only way to
//!   obtain a session; [`Session::shutdown`] cancels all live watches and
//!   invalidates the session for further capability calls.
//! - **[`WatchHandle`]** — cancellable subscription handle for one
//!   device's recurring poll. Each watch runs as its own cooperative task:
//!   a tick fetches the device record, normalizes it, and delivers it to
//!   the registered callback. Tick failures are logged and retried next
//!   tick; only a connection-level failure (or hang-up) tears the watch
//!   down.

pub mod error;
pub mod session;
pub mod watch;

pub use error::CoreError;
pub use session::{Session, SessionConfig};
pub use watch::{TICK_INTERVAL, WatchHandle};
