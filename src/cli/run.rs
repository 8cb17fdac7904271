//! Handler for the `run` command.

use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

use crate::app::App;
use crate::cli::RunArgs;
use crate::config::Config;
use crate::error::Result;

/// Execute the run command.
pub async fn execute(args: &RunArgs) -> Result<()> {
    let mut config = Config::load(&args.config)?;

    if let Some(ref level) = args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.format = "json".to_string();
    }
    if args.no_restore {
        config.snapshot.restore_on_start = false;
    }

    config.init_logging();
    info!(
        config = %args.config.display(),
        registry = %config.registry.display(),
        ws_url = %config.feed.ws_url,
        "kingmaker starting"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => info!("Ctrl-C received"),
            Err(e) => error!(error = %e, "Failed to listen for Ctrl-C"),
        }
        let _ = shutdown_tx.send(true);
    });

    let result = App::run_with_shutdown(config, shutdown_rx).await;
    match &result {
        Ok(()) => info!("kingmaker stopped"),
        Err(e) => error!(error = %e, "Fatal error"),
    }
    result
}
