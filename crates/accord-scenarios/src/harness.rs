//! The scenario controller for host-role scenarios.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use accord_core::{Check, CheckLedger, EngineFactory, StartError};
use accord_http::{RPC_PATH, SessionRegistry, TransportState, router, serve};

use crate::scenario::ScenarioUrls;

/// How long `stop` waits for the server task to wind down before aborting
/// it outright.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

struct RunningServer {
    url: String,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<std::io::Result<()>>,
}

/// Owns the start/stop lifecycle of one host-role scenario run.
///
/// Each harness has its own listener, session registry and check ledger;
/// two concurrent runs share nothing. `stop` is idempotent and always
/// leaves zero live sessions and zero bound ports, including when `start`
/// was never called.
pub struct ServerHarness {
    expected: &'static [&'static str],
    ledger: Arc<Mutex<CheckLedger>>,
    registry: Arc<SessionRegistry>,
    factory: Arc<dyn EngineFactory>,
    running: Mutex<Option<RunningServer>>,
}

impl ServerHarness {
    pub fn new(
        expected: &'static [&'static str],
        ledger: Arc<Mutex<CheckLedger>>,
        factory: Arc<dyn EngineFactory>,
    ) -> Self {
        Self {
            expected,
            ledger,
            registry: Arc::new(SessionRegistry::new()),
            factory,
            running: Mutex::new(None),
        }
    }

    /// The shared ledger scenario engines append into.
    pub fn ledger(&self) -> Arc<Mutex<CheckLedger>> {
        self.ledger.clone()
    }

    pub fn registry(&self) -> Arc<SessionRegistry> {
        self.registry.clone()
    }

    /// Bind an ephemeral port and start serving the transport adapter.
    ///
    /// A bind failure releases nothing because nothing was acquired yet; a
    /// local-address failure drops (and thereby releases) the listener
    /// before the error propagates. Calling `start` on an already running
    /// harness returns the existing URL.
    pub async fn start(&self) -> Result<ScenarioUrls, StartError> {
        if let Some(running) = self.running.lock().as_ref() {
            return Ok(ScenarioUrls {
                server_url: running.url.clone(),
            });
        }

        let listener = TcpListener::bind(("127.0.0.1", 0))
            .await
            .map_err(StartError::Bind)?;
        let addr = listener.local_addr().map_err(StartError::LocalAddr)?;

        let state = Arc::new(
            TransportState::new(self.registry.clone(), self.factory.clone())
                .with_ledger(self.ledger.clone()),
        );
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(serve(listener, router(state), shutdown_rx));

        let url = format!("http://{addr}{RPC_PATH}");
        tracing::info!(%url, "scenario endpoint listening");
        *self.running.lock() = Some(RunningServer {
            url: url.clone(),
            shutdown,
            task,
        });
        Ok(ScenarioUrls { server_url: url })
    }

    /// Tear everything down: terminate all sessions, close the listener.
    ///
    /// Draining first ends open push streams, which unblocks graceful
    /// shutdown; a server task that still does not finish within
    /// [`SHUTDOWN_TIMEOUT`] is aborted.
    pub async fn stop(&self) {
        let running = self.running.lock().take();
        self.registry.drain();

        if let Some(running) = running {
            let _ = running.shutdown.send(true);
            let mut task = running.task;
            if tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut task)
                .await
                .is_err()
            {
                tracing::warn!("server task did not shut down in time, aborting");
                task.abort();
            }
        }
    }

    pub fn append(&self, check: Check) -> bool {
        self.ledger.lock().append(check)
    }

    /// The finalized ledger: observed checks plus a synthesized FAILURE for
    /// every declared id that was never observed.
    pub fn checks(&self) -> Vec<Check> {
        self.ledger.lock().finalized(self.expected)
    }

    pub fn live_sessions(&self) -> usize {
        self.registry.live_sessions()
    }
}
