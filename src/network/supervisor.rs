//! Per-server connection supervisor.
//!
//! A [`Supervisor`] owns one econ console. It logs in, raises the console
//! log level so join lines are emitted, and reads lines until the
//! connection drops. Ban commands produced by spawned checks come back over
//! an mpsc channel and are written by the same loop, so the stream has a
//! single owner.
//!
//! A lost connection is retried every `delay`. Time spent waiting adds up
//! across consecutive failures; once it exceeds `give_up_after` the
//! supervisor stops. A successful login resets the budget.

use super::enforce::{self, BanPolicy};
use crate::checker::VpnChecker;
use crate::config::{ReconnectConfig, ServerEntry};
use crate::metrics;
use crate::telemetry::spans;
use econ_proto::{Command, EconStream, JoinEvent, ProtocolError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, warn};

/// Console command that makes the server log player joins.
const OUTPUT_LEVEL: &str = "ec_output_level 2";
/// Pending ban commands per connection.
const BAN_QUEUE: usize = 64;

/// Why a session stopped reading.
enum SessionEnd {
    Shutdown,
    Lost(String),
}

pub struct Supervisor {
    server: ServerEntry,
    checker: Arc<VpnChecker>,
    policy: Arc<BanPolicy>,
    delay: Duration,
    give_up_after: Duration,
    connect_timeout: Duration,
    shutdown: CancellationToken,
}

impl Supervisor {
    pub fn new(
        server: ServerEntry,
        checker: Arc<VpnChecker>,
        policy: Arc<BanPolicy>,
        shutdown: CancellationToken,
    ) -> Self {
        let reconnect = ReconnectConfig::default();
        Self {
            server,
            checker,
            policy,
            delay: reconnect.delay(),
            give_up_after: reconnect.timeout(),
            connect_timeout: reconnect.connect_timeout(),
            shutdown,
        }
    }

    pub fn reconnect(self, config: &ReconnectConfig) -> Self {
        self.retry_every(config.delay(), config.timeout())
            .connect_timeout(config.connect_timeout())
    }

    pub fn retry_every(mut self, delay: Duration, give_up_after: Duration) -> Self {
        self.delay = delay;
        self.give_up_after = give_up_after;
        self
    }

    pub fn connect_timeout(mut self, limit: Duration) -> Self {
        self.connect_timeout = limit;
        self
    }

    /// Run on its own task inside the server's span.
    pub fn spawn(self) -> JoinHandle<()> {
        let span = spans::server(&self.server.address);
        tokio::spawn(self.run().instrument(span))
    }

    /// Supervise the console until shutdown, a rejected password, or the
    /// reconnect budget runs out.
    pub async fn run(self) {
        let mut waited = Duration::ZERO;

        loop {
            match self.connect().await {
                Ok(Some(stream)) => {
                    info!(peer = %stream.peer_addr(), "connected to server");
                    waited = Duration::ZERO;
                    match self.session(stream).await {
                        SessionEnd::Shutdown => {
                            info!("closing connection");
                            return;
                        }
                        SessionEnd::Lost(reason) => warn!(%reason, "lost connection"),
                    }
                }
                Ok(None) => {
                    info!("shutdown during connect");
                    return;
                }
                Err(ProtocolError::WrongPassword(reply)) => {
                    error!(%reply, "server rejected the password, not retrying");
                    return;
                }
                Err(e) => warn!(error = %e, code = e.error_code(), "could not connect"),
            }

            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    info!("closing connection");
                    return;
                }
                _ = tokio::time::sleep(self.delay) => {}
            }

            waited += self.delay;
            if waited > self.give_up_after {
                error!(
                    waited_secs = waited.as_secs(),
                    "exceeded reconnect timeout, stopping"
                );
                return;
            }
            info!(waited_secs = waited.as_secs(), "reconnecting");
        }
    }

    /// Log in, or `None` if shutdown came first.
    async fn connect(&self) -> Result<Option<EconStream>, ProtocolError> {
        debug!("dialing");
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Ok(None),
            res = EconStream::connect(
                &self.server.address,
                &self.server.password,
                self.connect_timeout,
            ) => res.map(Some),
        }
    }

    async fn session(&self, mut stream: EconStream) -> SessionEnd {
        if let Err(e) = stream.send(&Command::raw(OUTPUT_LEVEL)).await {
            return SessionEnd::Lost(e.to_string());
        }
        debug!(command = OUTPUT_LEVEL, "log level set");

        metrics::server_connected();
        let end = self.pump(&mut stream).await;
        metrics::server_disconnected();
        end
    }

    async fn pump(&self, stream: &mut EconStream) -> SessionEnd {
        let (bans_tx, mut bans_rx) = mpsc::channel::<Command>(BAN_QUEUE);

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return SessionEnd::Shutdown,
                Some(command) = bans_rx.recv() => {
                    if let Err(e) = stream.send(&command).await {
                        return SessionEnd::Lost(e.to_string());
                    }
                    debug!(%command, "command sent");
                }
                line = stream.read_line() => match line {
                    Ok(Some(line)) => self.on_line(&line, &bans_tx),
                    Ok(None) => return SessionEnd::Lost("closed by server".to_string()),
                    Err(e) => return SessionEnd::Lost(e.to_string()),
                },
            }
        }
    }

    fn on_line(&self, line: &str, bans: &mpsc::Sender<Command>) {
        let Some(join) = JoinEvent::parse(line) else {
            return;
        };
        info!(
            client_id = join.client_id,
            ip = %join.ip,
            flavor = ?join.flavor,
            "player joined"
        );
        metrics::record_join();
        enforce::spawn_check(
            Arc::clone(&self.checker),
            Arc::clone(&self.policy),
            join,
            bans.clone(),
        );
    }
}
