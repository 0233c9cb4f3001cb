//! Join enforcement.
//!
//! Each join line spawns one [`check_join`] task. The task runs the verdict
//! pipeline and, for VPN addresses, hands a ban command back to the
//! connection that saw the join.

use crate::checker::{Verdict, VpnChecker};
use crate::config::BanConfig;
use crate::error::CheckError;
use crate::metrics;
use crate::telemetry::spans;
use econ_proto::{Command, JoinEvent};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{Instrument, debug, error, info, warn};

/// Ban length and fallback message applied to every server.
#[derive(Debug, Clone)]
pub struct BanPolicy {
    minutes: u64,
    default_reason: String,
}

impl BanPolicy {
    pub fn new(minutes: u64, default_reason: impl Into<String>) -> Self {
        Self {
            minutes: minutes.max(1),
            default_reason: default_reason.into(),
        }
    }

    pub fn minutes(&self) -> u64 {
        self.minutes
    }

    /// Console command for `verdict`, if it calls for a ban.
    pub fn ban_for(&self, verdict: &Verdict) -> Option<Command> {
        if !verdict.is_vpn {
            return None;
        }
        let reason = if verdict.reason.trim().is_empty() {
            self.default_reason.as_str()
        } else {
            verdict.reason.as_str()
        };
        Some(Command::ban(verdict.ip.to_string(), self.minutes, reason))
    }
}

impl From<&BanConfig> for BanPolicy {
    fn from(config: &BanConfig) -> Self {
        Self::new(config.minutes(), config.reason.clone())
    }
}

/// Spawn the check for one join without blocking the read loop.
pub fn spawn_check(
    checker: Arc<VpnChecker>,
    policy: Arc<BanPolicy>,
    join: JoinEvent,
    bans: mpsc::Sender<Command>,
) {
    let span = spans::check(join.client_id, &join.ip);
    tokio::spawn(check_join(checker, policy, join, bans).instrument(span));
}

/// Check one joined player and queue a ban when the verdict says VPN.
///
/// Returns the command that was queued, if any.
pub async fn check_join(
    checker: Arc<VpnChecker>,
    policy: Arc<BanPolicy>,
    join: JoinEvent,
    bans: mpsc::Sender<Command>,
) -> Option<Command> {
    let verdict = match checker.is_vpn(&join.ip).await {
        Ok(verdict) => verdict,
        Err(CheckError::Cancelled) => {
            debug!("check cancelled by shutdown");
            return None;
        }
        Err(e @ CheckError::InvalidAddress(_)) => {
            warn!(error = %e, code = e.error_code(), "join carried an unusable address");
            return None;
        }
        Err(e) => {
            error!(error = %e, code = e.error_code(), "check failed, player not banned");
            return None;
        }
    };

    let Some(command) = policy.ban_for(&verdict) else {
        debug!(source = verdict.source.as_str(), "player allowed");
        return None;
    };

    info!(
        source = verdict.source.as_str(),
        minutes = policy.minutes(),
        "banning VPN player"
    );
    if bans.send(command.clone()).await.is_err() {
        warn!("connection closed before the ban could be sent");
        return None;
    }
    metrics::record_ban();
    Some(command)
}
