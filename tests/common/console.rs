//! Fake econ console.
//!
//! Speaks just enough of the console protocol to log a client in, then
//! relays lines in both directions: the test pushes log lines, and every
//! command the daemon writes is captured.

use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;

pub struct FakeConsole {
    addr: SocketAddr,
    received: mpsc::UnboundedReceiver<String>,
    outgoing: mpsc::UnboundedSender<String>,
}

impl FakeConsole {
    /// Listen on a random local port. Connections are served one at a time.
    pub async fn start(password: &'static str) -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (received_tx, received) = mpsc::unbounded_channel();
        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<String>();

        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let (rd, mut wr) = socket.into_split();
                let mut lines = BufReader::new(rd).lines();

                if wr.write_all(b"Enter password:\n").await.is_err() {
                    continue;
                }
                match lines.next_line().await {
                    Ok(Some(pw)) if pw == password => {}
                    _ => {
                        let _ = wr.write_all(b"Wrong password, remaining tries: 2\n").await;
                        continue;
                    }
                }
                if wr
                    .write_all(b"Authentication successful. External console access granted.\n")
                    .await
                    .is_err()
                {
                    continue;
                }

                loop {
                    tokio::select! {
                        line = lines.next_line() => match line {
                            Ok(Some(line)) => {
                                if received_tx.send(line).is_err() {
                                    return;
                                }
                            }
                            _ => break,
                        },
                        Some(line) = outgoing_rx.recv() => {
                            if wr.write_all(format!("{line}\n").as_bytes()).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        });

        Ok(Self {
            addr,
            received,
            outgoing,
        })
    }

    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    /// Emit one server log line.
    pub fn log(&self, line: &str) -> anyhow::Result<()> {
        self.outgoing
            .send(line.to_string())
            .map_err(|_| anyhow::anyhow!("console task stopped"))
    }

    /// Next command written by the client.
    pub async fn next_command(&mut self, limit: Duration) -> anyhow::Result<String> {
        match timeout(limit, self.received.recv()).await {
            Ok(Some(line)) => Ok(line),
            Ok(None) => anyhow::bail!("console task stopped"),
            Err(_) => anyhow::bail!("no command within {limit:?}"),
        }
    }

    /// Whether any command arrives within `limit`.
    pub async fn is_quiet_for(&mut self, limit: Duration) -> bool {
        timeout(limit, self.received.recv()).await.is_err()
    }
}
