//! Authenticated econ connection.
//!
//! The server greets with `Enter password:`, the client answers with the
//! password line, and the server confirms with
//! `Authentication successful. External console access granted.` or rejects
//! with `Wrong password, remaining tries: N`. Afterwards the server streams
//! its log and accepts one command per line.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::{debug, trace};

use crate::command::Command;
use crate::error::{ProtocolError, Result};
use crate::line::LineCodec;

const PASSWORD_PROMPT: &str = "enter password";
const AUTH_OK: &str = "authentication successful";
const AUTH_WRONG: &str = "wrong password";

/// An authenticated console connection.
pub struct EconStream {
    framed: Framed<TcpStream, LineCodec>,
    peer: SocketAddr,
}

impl EconStream {
    /// Dial `addr` and log in with `password`.
    ///
    /// `limit` bounds each phase (TCP connect, prompt, authentication)
    /// separately.
    pub async fn connect(addr: &str, password: &str, limit: Duration) -> Result<Self> {
        let socket = timeout(limit, TcpStream::connect(addr))
            .await
            .map_err(|_| ProtocolError::Timeout("connect"))??;
        let peer = socket.peer_addr()?;
        let mut framed = Framed::new(socket, LineCodec::new());

        timeout(limit, wait_for(&mut framed, |l| l.contains(PASSWORD_PROMPT)))
            .await
            .map_err(|_| ProtocolError::Timeout("password prompt"))??;
        trace!(%peer, "password prompt received");

        framed.send(password.to_string()).await?;

        let reply = timeout(
            limit,
            wait_for(&mut framed, |l| l.contains(AUTH_OK) || l.contains(AUTH_WRONG)),
        )
        .await
        .map_err(|_| ProtocolError::Timeout("authentication"))??;

        if reply.to_ascii_lowercase().contains(AUTH_WRONG) {
            return Err(ProtocolError::WrongPassword(reply));
        }

        debug!(%peer, "econ authenticated");
        Ok(Self { framed, peer })
    }

    /// Remote address of the console.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Next log line; `Ok(None)` once the server closes the connection.
    pub async fn read_line(&mut self) -> Result<Option<String>> {
        self.framed.next().await.transpose()
    }

    /// Send a console command.
    pub async fn send(&mut self, command: &Command) -> Result<()> {
        self.framed.send(command.to_string()).await
    }
}

/// Read lines until one matches `accept` (compared lowercase), returning the
/// original line.
async fn wait_for<F>(framed: &mut Framed<TcpStream, LineCodec>, accept: F) -> Result<String>
where
    F: Fn(&str) -> bool,
{
    while let Some(line) = framed.next().await {
        let line = line?;
        if accept(&line.to_ascii_lowercase()) {
            return Ok(line);
        }
        trace!(line = %line, "ignoring pre-auth line");
    }
    Err(ProtocolError::Closed)
}
