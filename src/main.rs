//! commons-relay server binary.

use clap::Parser;
use tracing::info;

use commons_relay::config::{self, RelayConfig};
use commons_relay::logging;
use commons_relay::media::select::DEFAULT_MAX_MEDIA_BYTES;
use commons_relay::server::bind;
use commons_relay::server::startup::{run_server_with_config, ServerConfig};

#[derive(Debug, Parser)]
#[command(
    name = "commons-relay",
    version,
    about = "Relay random or time-matched media files from Wikimedia Commons"
)]
struct Cli {
    /// Listening port (overrides the PORT environment variable)
    #[arg(long)]
    port: Option<u16>,

    /// Bind mode: loopback, all, or an explicit address
    #[arg(long)]
    bind: Option<String>,

    /// Enable the extended variant (category expansion + 5 MiB size cap)
    #[arg(long)]
    extended: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging_from_env()?;

    let mut relay_config = config::load_config()?;
    if let Some(port) = cli.port {
        relay_config.port = port;
    }
    if let Some(bind) = &cli.bind {
        relay_config.bind = bind::parse_bind_mode(bind);
    }
    if cli.extended && relay_config.max_media_bytes.is_none() {
        relay_config.max_media_bytes = Some(DEFAULT_MAX_MEDIA_BYTES);
    }

    run_server(relay_config).await
}

/// Run the relay server until a shutdown signal arrives.
async fn run_server(relay_config: RelayConfig) -> Result<(), Box<dyn std::error::Error>> {
    let resolved = bind::resolve_bind_with_metadata(&relay_config.bind, relay_config.port)?;

    info!("commons-relay v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Bind mode: {} -> http://{}",
        bind::bind_mode_display_name(&resolved.mode),
        resolved.address
    );
    info!("Listening on {}", resolved.description);
    info!("Upstream API: {}", relay_config.api_base_url);
    match relay_config.max_media_bytes {
        Some(max) => info!("Extended variant: category expansion on, size cap {max} bytes"),
        None => info!("Base variant: no size cap, no category expansion"),
    }

    let handle = run_server_with_config(ServerConfig {
        relay_config,
        bind_address: resolved.address,
    })
    .await?;

    let reason = await_shutdown_trigger().await;
    info!("Shutdown signal received ({})", reason);
    handle.shutdown().await;
    info!("Relay shut down");
    Ok(())
}

/// Initialize logging based on the COMMONS_RELAY_DEV environment variable.
fn init_logging_from_env() -> Result<(), Box<dyn std::error::Error>> {
    let log_config = if std::env::var("COMMONS_RELAY_DEV")
        .map(|v| !v.is_empty() && v != "0" && v.to_lowercase() != "false")
        .unwrap_or(false)
    {
        logging::LogConfig::development()
    } else {
        logging::LogConfig::production()
    };
    logging::init_logging(log_config)?;
    Ok(())
}

/// Wait for either Ctrl+C or SIGTERM (Unix only) and return a label for logging.
#[cfg(unix)]
async fn await_shutdown_trigger() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};
    use tracing::warn;

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => "ctrl-c",
                _ = sigterm.recv() => "SIGTERM",
            }
        }
        Err(e) => {
            warn!(
                "Failed to install SIGTERM handler: {}; falling back to Ctrl+C only",
                e
            );
            match tokio::signal::ctrl_c().await {
                Ok(()) => "ctrl-c",
                Err(e) => {
                    panic!("Failed to install Ctrl+C handler: {}", e);
                }
            }
        }
    }
}

/// On non-Unix platforms, only Ctrl+C is available.
#[cfg(not(unix))]
async fn await_shutdown_trigger() -> &'static str {
    match tokio::signal::ctrl_c().await {
        Ok(()) => "ctrl-c",
        Err(e) => {
            panic!("Failed to install Ctrl+C handler: {}", e);
        }
    }
}
