mod cli;

use clap::Parser;
use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use meshgate_core::Session;

use crate::cli::Cli;

#[derive(Debug, Error)]
enum GatewayError {
    #[error(transparent)]
    Config(#[from] meshgate_config::ConfigError),

    #[error(transparent)]
    Core(#[from] meshgate_core::CoreError),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        error!("{err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), GatewayError> {
    let mut config = meshgate_config::load_from(&cli.config)?;

    // CLI flag overrides take priority over the file.
    if let Some(host) = cli.host {
        config.cloud.host = host;
    }
    if let Some(port) = cli.port {
        config.cloud.port = port;
    }
    if let Some(protocol) = cli.protocol {
        config.protocol = protocol;
    }
    config.validate()?;

    let credential = config.credential()?;

    let session = Session::probe(config.session()).await?;
    info!(
        transport = session.transport_name(),
        host = %config.cloud.host,
        port = config.cloud.port,
        "registry session open"
    );

    let conn = session.connect().await?;

    let record = session.sign_in(Some(&conn), &credential).await?;
    match record.to_value() {
        Ok(device) => info!(%device, "signed in to registry"),
        Err(e) => warn!(error = %e, "signed in, but the record did not decode"),
    }

    // Relay boundary: the device manager consumes these updates and
    // forwards them to the local device. Until one is wired in, the
    // gateway logs each decoded record.
    let watch = session.watch(conn.clone(), credential, |payload| {
        info!(%payload, "configuration update received");
    })?;

    wait_for_shutdown().await;

    session.shutdown();
    session.close(&conn).await;
    watch.join().await;
    info!("exiting");

    Ok(())
}

/// Block until SIGINT or SIGTERM.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM, falling back to ctrl-c only");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("interrupt received"),
            _ = term.recv() => info!("termination requested"),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("interrupt received");
    }
}
