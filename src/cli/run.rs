use super::config::{default_config_path, EscrowConfig, LoggingConfig};
use escrowgate::http::router;
use escrowgate::ledger::SandboxLedger;
use escrowgate::EscrowService;
use std::fs::OpenOptions;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Run the approval service
///
/// ## Configuration Loading
///
/// Configuration comes from `--config` if given, otherwise from the default
/// path. A missing file is not an error: the service starts from defaults
/// so it can be configured through environment variables alone. Environment
/// overrides are applied next, then `--bind`.
///
/// Runs until ctrl-c.
pub async fn execute(
    config_path: Option<String>,
    bind: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = config_path
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);

    let config = prepare_config(&config_path, bind)?;
    init_logging(&config.logging)?;

    info!(config = %config_path.display(), "escrowgate starting");

    let listener = TcpListener::bind(&config.server.bind).await?;
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
        }
        info!("Shutdown signal received");
    };

    serve(&config, listener, shutdown).await
}

/// Write a default config file
pub fn init_config(
    treasury: String,
    path: Option<String>,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = path.map(PathBuf::from).unwrap_or_else(default_config_path);
    if path.exists() && !force {
        return Err(format!(
            "config file already exists: {} (use --force to overwrite)",
            path.display()
        )
        .into());
    }

    EscrowConfig::create_default(&path, &treasury)?;
    println!("📝 Created: {}", path.display());
    println!("   Add approver addresses under [approvers] before running.");
    Ok(())
}

/// Load, override and validate the configuration.
pub fn prepare_config(
    config_path: &Path,
    bind: Option<String>,
) -> Result<EscrowConfig, Box<dyn std::error::Error>> {
    let mut config = if config_path.exists() {
        EscrowConfig::load(config_path)?
    } else {
        EscrowConfig::new("")
    };

    config.apply_env()?;
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    config.validate()?;
    Ok(config)
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_logging(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&logging.level))?;

    let installed = match &logging.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => tracing_subscriber::fmt().with_env_filter(filter).try_init(),
    };

    // Already installed when embedded in tests
    if installed.is_err() {
        warn!("tracing subscriber already installed");
    }
    Ok(())
}

/// Serve the API on `listener` until `shutdown` resolves.
pub async fn serve<F>(
    config: &EscrowConfig,
    listener: TcpListener,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error>>
where
    F: Future<Output = ()>,
{
    let ledger = Arc::new(SandboxLedger::new(config.sandbox_config()));
    let service = Arc::new(EscrowService::new(ledger, config.service_settings()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = tokio::spawn(sweep_challenges(
        Arc::clone(&service),
        config.auth.challenge_ttl,
        shutdown_rx,
    ));

    info!(
        listen_addr = %listener.local_addr()?,
        treasury = %config.treasury.address,
        approvers = config.approvers.addresses.len(),
        required_signatures = config.approvers.required_signatures,
        "escrowgate listening"
    );

    let server = axum::serve(listener, router(service));

    let result = tokio::select! {
        result = server => result,
        _ = shutdown => Ok(()),
    };

    let _ = shutdown_tx.send(true);
    let _ = sweeper.await;

    if let Err(e) = &result {
        error!(error = %e, "Server error");
    }
    info!("escrowgate shutdown complete");
    Ok(result?)
}

/// Drop expired challenges once per challenge lifetime.
async fn sweep_challenges(
    service: Arc<EscrowService<SandboxLedger>>,
    every: std::time::Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => match service.purge_expired_challenges() {
                Ok(0) => {}
                Ok(purged) => info!(purged, "expired challenges purged"),
                Err(e) => warn!(error = %e, "challenge sweep failed"),
            },
            _ = shutdown.changed() => break,
        }
    }
}
