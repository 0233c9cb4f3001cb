//! vpnsentry - VPN and proxy ban daemon for Teeworlds servers.
//!
//! Watches econ consoles for player joins, asks the range cache and online
//! reputation providers whether the address belongs to a VPN, and bans the
//! ones that do.

mod checker;
mod cli;
mod config;
mod error;
mod http;
mod lists;
mod metrics;
mod network;
mod providers;
mod security;
mod store;
mod telemetry;

use crate::checker::VpnChecker;
use crate::cli::{Cli, Commands};
use crate::config::Config;
use crate::network::{BanPolicy, Supervisor};
use crate::store::{NoopWhitelist, RangeStore, RedbRangeStore, RedbWhitelist, WhitelistStore};
use anyhow::Context;
use clap::Parser;
use futures_util::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// How often expired whitelist entries are deleted.
const PRUNE_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut config = load_config(&cli.config)?;
    if cli.offline {
        config.checker.offline = true;
    }

    let action = cli.action();
    if let Err(errors) = config::validate(&config, matches!(action, Commands::Run)) {
        for e in &errors {
            error!(error = %e, code = e.error_code(), "Invalid configuration");
        }
        anyhow::bail!(
            "{} configuration error(s) in {}",
            errors.len(),
            cli.config.display()
        );
    }

    let ranges = Arc::new(
        RedbRangeStore::new(&config.storage.range_db)
            .with_context(|| format!("opening range cache {}", config.storage.range_db))?,
    );

    match action {
        Commands::Add { files } => {
            import_lists(ranges.as_ref(), &files, ListKind::Ban).await?;
        }
        Commands::Remove { files } => {
            import_lists(ranges.as_ref(), &files, ListKind::Allow).await?;
        }
        Commands::Run => run(config, ranges).await?,
    }

    Ok(())
}

fn init_tracing(json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Load the config file; a missing file means all defaults.
fn load_config(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        warn!(path = %path.display(), "Config file not found, using defaults");
        return Ok(Config::default());
    }
    Config::load(path).map_err(|e| {
        error!(path = %path.display(), error = %e, code = e.error_code(), "Failed to load config");
        anyhow::Error::new(e)
    })
}

#[derive(Debug, Clone, Copy)]
enum ListKind {
    Ban,
    Allow,
}

async fn import_lists(
    store: &dyn RangeStore,
    files: &[PathBuf],
    kind: ListKind,
) -> anyhow::Result<usize> {
    let mut total = 0;
    for path in files {
        let applied = match kind {
            ListKind::Ban => lists::import_blacklist(store, path).await,
            ListKind::Allow => lists::import_whitelist(store, path).await,
        }
        .with_context(|| format!("importing {}", path.display()))?;
        total += applied;
    }
    Ok(total)
}

async fn run(config: Config, ranges: Arc<RedbRangeStore>) -> anyhow::Result<()> {
    info!(
        servers = config.servers.len(),
        offline = config.checker.offline,
        "Starting vpnsentry"
    );

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    let blacklists: Vec<PathBuf> = config.storage.blacklists.iter().map(PathBuf::from).collect();
    let whitelists: Vec<PathBuf> = config.storage.whitelists.iter().map(PathBuf::from).collect();
    import_lists(ranges.as_ref(), &blacklists, ListKind::Ban).await?;
    import_lists(ranges.as_ref(), &whitelists, ListKind::Allow).await?;
    info!(ranges = ranges.len()?, "Range cache ready");

    let offline = config.checker.offline;
    if offline && ranges.is_empty()? {
        warn!("Offline with an empty range cache; no join will be banned");
    }
    let whitelist: Arc<dyn WhitelistStore> = if offline {
        Arc::new(NoopWhitelist)
    } else {
        let whitelist = Arc::new(
            RedbWhitelist::new(&config.storage.whitelist_db, config.storage.whitelist_ttl())
                .with_context(|| format!("opening whitelist {}", config.storage.whitelist_db))?,
        );
        spawn_prune_task(Arc::clone(&whitelist), shutdown.clone());
        whitelist
    };

    let providers = if offline {
        Vec::new()
    } else {
        let client = providers::http_client(config.providers.request_timeout());
        providers::build_providers(&config.providers, &client)
    };
    if !offline && config.providers.enabled_count() == 0 {
        warn!("No reputation provider configured; uncached addresses will never be banned");
    }

    let checker = Arc::new(
        VpnChecker::new(ranges, whitelist, providers)
            .offline(offline)
            .threshold(config.checker.ban_threshold)
            .lookup_timeout(config.checker.lookup_timeout())
            .shutdown(shutdown.clone()),
    );
    info!(providers = checker.provider_count(), "Checker ready");

    // Convention: metrics.port = 0 disables the HTTP endpoint.
    if config.metrics.port == 0 {
        info!("Metrics disabled");
    } else {
        metrics::init();
        tokio::spawn(http::run_http_server(config.metrics.port, shutdown.clone()));
        info!(port = config.metrics.port, "Prometheus HTTP server started");
    }

    let policy = Arc::new(BanPolicy::from(&config.ban));
    let handles: Vec<_> = config
        .servers
        .iter()
        .map(|server| {
            Supervisor::new(
                server.clone(),
                Arc::clone(&checker),
                Arc::clone(&policy),
                shutdown.clone(),
            )
            .reconnect(&config.reconnect)
            .spawn()
        })
        .collect();

    for result in join_all(handles).await {
        if let Err(e) = result {
            error!(error = %e, "Server supervisor panicked");
        }
    }

    // Stop the background tasks once no server is left.
    shutdown.cancel();
    info!("All servers stopped, exiting");
    Ok(())
}

fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Received shutdown signal");
        shutdown.cancel();
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            warn!(error = %e, "Cannot listen for SIGTERM, only SIGINT will stop the daemon");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

/// Delete expired whitelist entries every hour until shutdown.
fn spawn_prune_task(whitelist: Arc<RedbWhitelist>, shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PRUNE_INTERVAL);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {}
            }
            match whitelist.prune() {
                Ok(removed) if removed > 0 => {
                    info!(removed, "Expired whitelist entries pruned");
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, code = e.error_code(), "Failed to prune whitelist"),
            }
        }
    });
}
