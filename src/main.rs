//! # srv-discover - Command Line Entry Point
//!
//! Resolves an SRV name once and prints the chosen endpoint:
//!
//! ```text
//! srv-discover <config.yaml>
//! srv-discover <service> <protocol> <domain>
//! ```
//!
//! When the configuration sets `refresh_interval` (or `SRV_DISCOVERY_REFRESH_INTERVAL`
//! is exported) the records are refreshed in the background and a new choice is printed
//! every interval until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

use srv_discovery::{init_logging, DiscoveryConfig, DiscoveryError, DiscoveryResult, DiscoverySession};

const USAGE: &str = "usage: srv-discover <config.yaml> | srv-discover <service> <protocol> <domain>";

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let config = match load_config(&args).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(config).await {
        error!(error = %e, "srv-discover failed");
        std::process::exit(1);
    }
}

async fn load_config(args: &[String]) -> DiscoveryResult<DiscoveryConfig> {
    match args {
        [path] => DiscoveryConfig::load_from_file(path).await,
        [service, protocol, domain] => {
            let mut config = DiscoveryConfig::new(service.as_str(), protocol.as_str(), domain.as_str());
            config.apply_env_overrides()?;
            config.validate()?;
            Ok(config)
        }
        _ => Err(DiscoveryError::config(format!(
            "expected 1 or 3 arguments, got {}",
            args.len()
        ))),
    }
}

async fn run(config: DiscoveryConfig) -> DiscoveryResult<()> {
    let session = Arc::new(DiscoverySession::from_config(&config)?);
    info!(
        service = %config.service,
        protocol = %config.protocol,
        domain = %config.domain,
        "🔍 Resolving SRV records"
    );

    session.refresh().await?;
    print_choice(&session).await;

    if let Some(interval) = config.refresh_interval {
        watch(session, interval).await?;
    }

    Ok(())
}

async fn print_choice(session: &DiscoverySession) {
    let endpoint = session.choose().await;
    if endpoint.is_empty() {
        warn!("No healthy server available");
        println!("No server available");
    } else {
        println!("Target: {}", endpoint.target);
        println!("Port: {}", endpoint.port);
    }
}

/// Refresh in the background and print a choice every interval until Ctrl-C
async fn watch(session: Arc<DiscoverySession>, interval: Duration) -> DiscoveryResult<()> {
    let handle = session.refresh_async(interval)?;
    let mut ticker = tokio::time::interval(interval);
    // The immediate first tick would repeat the choice printed above
    ticker.tick().await;

    info!(interval = ?interval, "👀 Watching for changes, press Ctrl-C to stop");

    loop {
        tokio::select! {
            result = signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!(error = %e, "Failed to listen for Ctrl-C");
                }
                info!("📡 Received Ctrl-C, stopping");
                break;
            }
            _ = ticker.tick() => {
                for e in session.take_errors() {
                    warn!(error = %e, "Background refresh failed");
                }
                print_choice(&session).await;
            }
        }
    }

    handle.shutdown().await?;
    let stats = session.stats();
    info!(
        selections = stats.total_selections,
        servers = stats.total_servers,
        "✅ Stopped"
    );
    Ok(())
}
