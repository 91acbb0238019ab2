// Async watch scheduler.
//
// One tokio task per registered device: fetch on a fixed cadence,
// deliver the decoded record to the callback, retry failures on the
// next tick. Only hang-up of the underlying connection, a
// connection-level fetch failure, or explicit cancellation ends the
// watch. Within one watch, ticks are strictly sequential — the loop
// awaits the exchange and the callback before re-arming its timer.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use meshgate_proto::{CloudTransport, Connection, Credential};

/// Fixed poll cadence for registered watches.
pub const TICK_INTERVAL: Duration = Duration::from_secs(10);

/// Callback receiving one decoded device record per successful tick.
pub type WatchCallback = Box<dyn FnMut(Value) + Send>;

/// Cancellable handle for one device's watch subscription.
///
/// Dropping the handle does NOT cancel the watch — the poll task keeps
/// running until [`cancel`](WatchHandle::cancel) is called, the owning
/// session shuts down, or the connection goes away. Cancellation is
/// idempotent and safe to invoke from within the watch's own callback.
#[derive(Debug)]
pub struct WatchHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl WatchHandle {
    /// Unregister the watch. No further ticks are issued, even one
    /// already due.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Whether the poll task has fully wound down.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the poll task to wind down.
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

/// Spawn the poll task for one device.
///
/// `cancel` is owned by the caller (the session hands out child tokens of
/// its shutdown root, so session shutdown sweeps every watch). The task
/// exits on cancellation, on connection hang-up, or on a
/// connection-fatal fetch error; any other tick failure is logged and
/// the next tick stays scheduled.
pub(crate) fn spawn(
    transport: Arc<dyn CloudTransport>,
    conn: Connection,
    credential: Credential,
    tick: Duration,
    cancel: CancellationToken,
    mut deliver: WatchCallback,
) -> WatchHandle {
    let token = cancel.clone();

    let task = tokio::spawn(async move {
        let device = credential.uuid().to_owned();
        let mut timer = tokio::time::interval(tick);
        // A late tick pushes the schedule back instead of bursting, so
        // ticks stay sequential even after a slow exchange.
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        timer.tick().await; // consume the immediate first tick

        debug!(%device, period_secs = tick.as_secs(), "watch registered");

        loop {
            tokio::select! {
                biased;
                () = token.cancelled() => {
                    debug!(%device, "watch cancelled");
                    break;
                }
                () = conn.closed() => {
                    debug!(%device, "connection hung up, tearing down watch");
                    break;
                }
                _ = timer.tick() => {
                    match transport.fetch(Some(&conn), &credential).await {
                        Ok(record) => match record.to_value() {
                            Ok(payload) => deliver(payload),
                            Err(e) => warn!(%device, error = %e, "discarding undecodable record"),
                        },
                        Err(e) if e.is_connection_fatal() => {
                            warn!(%device, error = %e, "connection failed, tearing down watch");
                            conn.close();
                            break;
                        }
                        Err(e) => {
                            warn!(%device, error = %e, "poll failed, retrying next tick");
                        }
                    }
                }
            }
        }
    });

    WatchHandle { cancel, task }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tokio::sync::mpsc;

    use meshgate_proto::{Envelope, Error, validate_single};

    use super::*;

    const UUID: &str = "11111111-1111-1111-1111-111111111111";
    const TOKEN: &str = "0123456789012345678901234567890123456789";

    /// Scripted transport: `fetch` pops queued outcomes, then repeats
    /// `steady` (a raw wrapped body) once the queue is drained.
    struct StubTransport {
        script: Mutex<VecDeque<Result<String, Error>>>,
        steady: Option<String>,
        fetches: AtomicUsize,
    }

    impl StubTransport {
        fn steady(body: &str) -> Self {
            Self {
                script: Mutex::new(VecDeque::new()),
                steady: Some(body.to_owned()),
                fetches: AtomicUsize::new(0),
            }
        }

        fn scripted(outcomes: Vec<Result<String, Error>>) -> Self {
            Self {
                script: Mutex::new(outcomes.into()),
                steady: None,
                fetches: AtomicUsize::new(0),
            }
        }

        fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CloudTransport for StubTransport {
        fn name(&self) -> &'static str {
            "stub"
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
            _record: &Value,
        ) -> Result<Envelope, Error> {
            unimplemented!("not exercised by watch tests")
        }

        async fn sign_in(
            &self,
            _conn: Option<&Connection>,
            _credential: &Credential,
        ) -> Result<Envelope, Error> {
            unimplemented!("not exercised by watch tests")
        }

        async fn remove_node(
            &self,
            _conn: Option<&Connection>,
            _credential: &Credential,
        ) -> Result<Envelope, Error> {
            unimplemented!("not exercised by watch tests")
        }

        async fn push_schema(
            &self,
            _conn: Option<&Connection>,
            _credential: &Credential,
            _schema: &Value,
        ) -> Result<Envelope, Error> {
            unimplemented!("not exercised by watch tests")
        }

        async fn push_data(
            &self,
            _conn: Option<&Connection>,
            _credential: &Credential,
            _sample: &Value,
        ) -> Result<Envelope, Error> {
            unimplemented!("not exercised by watch tests")
        }

        async fn fetch(
            &self,
            _conn: Option<&Connection>,
            _credential: &Credential,
        ) -> Result<Envelope, Error> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let next = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .or_else(|| self.steady.clone().map(Ok))
                .unwrap_or(Err(Error::Remote { status: 599 }));
            let raw = next?;
            validate_single(&Envelope::new(raw.into_bytes()))
        }

        async fn set_data(
            &self,
            _conn: Option<&Connection>,
            _credential: &Credential,
            _values: &Value,
        ) -> Result<Envelope, Error> {
            unimplemented!("not exercised by watch tests")
        }
    }

    fn credential() -> Credential {
        Credential::new(UUID, TOKEN).unwrap()
    }

    fn start(
        stub: Arc<StubTransport>,
        conn: &Connection,
    ) -> (WatchHandle, mpsc::UnboundedReceiver<Value>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = spawn(
            stub,
            conn.clone(),
            credential(),
            TICK_INTERVAL,
            CancellationToken::new(),
            Box::new(move |payload| {
                let _ = tx.send(payload);
            }),
        );
        (handle, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn every_tick_delivers_the_decoded_record() {
        let stub = Arc::new(StubTransport::steady(r#"{"devices":[{"temp":21}]}"#));
        let conn = Connection::new();
        let (handle, mut rx) = start(Arc::clone(&stub), &conn);

        for _ in 0..3 {
            let payload = rx.recv().await.unwrap();
            assert_eq!(payload, json!({"temp": 21}));
        }
        assert_eq!(stub.fetch_count(), 3);
        assert!(!handle.is_finished());

        handle.cancel();
        handle.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn tick_failures_do_not_tear_down_the_watch() {
        let stub = Arc::new(StubTransport::scripted(vec![
            Err(Error::Remote { status: 500 }),
            Err(Error::Remote { status: 500 }),
            Err(Error::Remote { status: 500 }),
            Ok(r#"{"devices":[{"temp":21}]}"#.to_owned()),
        ]));
        let conn = Connection::new();
        let (handle, mut rx) = start(Arc::clone(&stub), &conn);

        // Exactly one delivery: the fourth tick's success.
        let payload = rx.recv().await.unwrap();
        assert_eq!(payload, json!({"temp": 21}));
        assert_eq!(stub.fetch_count(), 4);
        assert!(!handle.is_finished(), "watch must stay active throughout");

        // Post-script failures keep being retried, never delivered.
        tokio::time::sleep(TICK_INTERVAL * 3).await;
        assert!(rx.try_recv().is_err());
        assert!(!handle.is_finished());

        handle.cancel();
        handle.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_records_are_skipped_not_fatal() {
        let stub = Arc::new(StubTransport::scripted(vec![
            Ok(r#"{"devices":[]}"#.to_owned()),
            Ok(r#"{"devices":[{"temp":22}]}"#.to_owned()),
        ]));
        let conn = Connection::new();
        let (handle, mut rx) = start(Arc::clone(&stub), &conn);

        let payload = rx.recv().await.unwrap();
        assert_eq!(payload, json!({"temp": 22}));
        assert_eq!(stub.fetch_count(), 2);

        handle.cancel();
        handle.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn hang_up_tears_down_and_stops_ticking() {
        let stub = Arc::new(StubTransport::steady(r#"{"devices":[{"temp":21}]}"#));
        let conn = Connection::new();
        let (handle, mut rx) = start(Arc::clone(&stub), &conn);

        rx.recv().await.unwrap();
        let fetched = stub.fetch_count();

        conn.close();
        handle.join().await;

        // No further ticks, even ones that were already due.
        tokio::time::sleep(TICK_INTERVAL * 5).await;
        assert_eq!(stub.fetch_count(), fetched);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn connection_fatal_fetch_error_is_terminal() {
        let stub = Arc::new(StubTransport::scripted(vec![Err(Error::Unreachable {
            host: "registry:3000".into(),
            reason: "connection refused".into(),
        })]));
        let conn = Connection::new();
        let (handle, mut rx) = start(Arc::clone(&stub), &conn);

        handle.join().await;
        assert_eq!(stub.fetch_count(), 1);
        assert!(rx.try_recv().is_err());
        assert!(conn.is_closed(), "teardown releases the connection state");
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_is_idempotent_and_safe_inside_the_callback() {
        let stub = Arc::new(StubTransport::steady(r#"{"devices":[{"temp":21}]}"#));
        let conn = Connection::new();
        let cancel = CancellationToken::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let inner = cancel.clone();
        let handle = spawn(
            Arc::clone(&stub) as Arc<dyn CloudTransport>,
            conn.clone(),
            credential(),
            TICK_INTERVAL,
            cancel,
            Box::new(move |payload| {
                let _ = tx.send(payload);
                // Unregister from within the tick being delivered.
                inner.cancel();
                inner.cancel();
            }),
        );

        rx.recv().await.unwrap();
        handle.cancel(); // third cancel, still fine
        handle.join().await;

        assert_eq!(stub.fetch_count(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_registrations_poll_independently() {
        let stub = Arc::new(StubTransport::steady(r#"{"devices":[{"temp":21}]}"#));
        let conn_a = Connection::new();
        let conn_b = Connection::new();

        let (handle_a, mut rx_a) = start(Arc::clone(&stub), &conn_a);
        let (handle_b, mut rx_b) = start(Arc::clone(&stub), &conn_b);

        rx_a.recv().await.unwrap();
        rx_b.recv().await.unwrap();
        assert_eq!(stub.fetch_count(), 2);

        // Tearing one down leaves the other ticking.
        handle_a.cancel();
        handle_a.join().await;
        rx_b.recv().await.unwrap();

        handle_b.cancel();
        handle_b.join().await;
    }
}
