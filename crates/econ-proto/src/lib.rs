//! # econ-proto
//!
//! Building blocks for talking to a Teeworlds/DDNet external console
//! ("econ"): a newline-delimited text protocol where the server asks for a
//! password, then streams its log output and accepts console commands.
//!
//! ## Features
//!
//! - [`LineCodec`]: tokio-util codec for newline-terminated console lines
//! - [`EconStream`]: authenticated TCP connection yielding log lines
//! - [`JoinEvent`]: recognises player-join log lines for the common server flavours
//! - [`Command`]: console commands rendered to their wire form
//!
//! ## Quick Start
//!
//! ```rust
//! use econ_proto::{Command, JoinEvent};
//!
//! let line = "[server]: player is ready. ClientID=3 addr=<{1.2.3.4:8303}>";
//! let join = JoinEvent::parse(line).expect("join line");
//! assert_eq!(join.client_id, 3);
//!
//! let ban = Command::ban(join.ip.to_string(), 5, "VPN");
//! assert_eq!(ban.to_string(), "ban 1.2.3.4 5 VPN");
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod command;
pub mod error;
pub mod event;
pub mod line;
pub mod transport;

pub use command::Command;
pub use error::{ProtocolError, Result};
pub use event::{JoinEvent, LogFlavor};
pub use line::LineCodec;
pub use transport::EconStream;

/// Maximum console line length accepted from a server.
pub const MAX_LINE_LEN: usize = 4096;
