//! Console commands sent to the server.

use std::fmt;

/// A command line understood by the econ console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `ban <target> <minutes> <reason>`; target is a client id or an address.
    Ban {
        /// Client id or IP address.
        target: String,
        /// Ban length in minutes.
        minutes: u64,
        /// Message shown to the banned player.
        reason: String,
    },
    /// Any other console command, sent verbatim.
    Raw(String),
}

impl Command {
    /// Build a ban command. Line breaks in the reason are replaced by spaces.
    pub fn ban(target: impl Into<String>, minutes: u64, reason: impl Into<String>) -> Self {
        let reason: String = reason.into();
        Self::Ban {
            target: target.into(),
            minutes,
            reason: reason.replace(['\r', '\n'], " "),
        }
    }

    /// Build a raw command.
    pub fn raw(line: impl Into<String>) -> Self {
        Self::Raw(line.into())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ban {
                target,
                minutes,
                reason,
            } => write!(f, "ban {} {} {}", target, minutes, reason),
            Self::Raw(line) => f.write_str(line),
        }
    }
}
