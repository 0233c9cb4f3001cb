//! Player-join detection in econ log output.
//!
//! Servers announce joins differently depending on the mod:
//!
//! | Flavor  | Example                                                                 |
//! |---------|-------------------------------------------------------------------------|
//! | DDNet   | `player has entered the game. ClientID=0 addr=<{1.2.3.4:8303}>`         |
//! | zCatch  | `id=0 addr=1.2.3.4:8303 version=1796 name='foo' clan='' country=-1`     |
//! | Vanilla | `player is ready. ClientID=0 addr=1.2.3.4:8303`                         |

use regex::Regex;
use std::sync::LazyLock;

static DDNET_JOIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)player has entered the game\. ClientID=(\d+) addr=[^\d]{0,2}(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})[^\d]{0,2}",
    )
    .expect("ddnet join pattern is valid")
});

static ZCATCH_JOIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)id=(\d+) addr=([a-fA-F0-9.:\[\]]+):(\d+) version=(\d+) name='(.{0,20})' clan='(.{0,16})' country=([-\d]+)$",
    )
    .expect("zcatch join pattern is valid")
});

static VANILLA_JOIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)player is ready\. ClientID=(\d+) addr=[^\d]{0,2}(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})[^\d]{0,2}",
    )
    .expect("vanilla join pattern is valid")
});

/// Server log format a join line was recognised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFlavor {
    /// DDNet and derivatives.
    Ddnet,
    /// zCatch verbose join line.
    ZCatch,
    /// Teeworlds 0.6/0.7 vanilla.
    Vanilla,
}

/// A player joined the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinEvent {
    /// Server-side client slot.
    pub client_id: u32,
    /// Address exactly as logged, without port or brackets. Not validated.
    pub ip: String,
    /// Which log format matched.
    pub flavor: LogFlavor,
}

impl JoinEvent {
    /// Try to extract a join event from a console log line.
    ///
    /// Returns `None` for every line that is not a join announcement.
    pub fn parse(line: &str) -> Option<Self> {
        let (caps, flavor) = if let Some(c) = DDNET_JOIN.captures(line) {
            (c, LogFlavor::Ddnet)
        } else if let Some(c) = ZCATCH_JOIN.captures(line) {
            (c, LogFlavor::ZCatch)
        } else if let Some(c) = VANILLA_JOIN.captures(line) {
            (c, LogFlavor::Vanilla)
        } else {
            return None;
        };

        let client_id = caps.get(1)?.as_str().parse().ok()?;
        let ip = caps
            .get(2)?
            .as_str()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();

        Some(Self {
            client_id,
            ip,
            flavor,
        })
    }
}
