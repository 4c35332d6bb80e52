//! rgd - Azure Resource Manager template deployment tool
//!
//! Deploys gallery, local and remote templates into resource groups,
//! filling in template parameters from files, inline objects and flags.

use clap::Parser;
use rgdeploy::cli::Cli;
use rgdeploy::config::{load_config, load_config_no_validation};
use rgdeploy::utils::cancel::cancellation_pair;
use rgdeploy::Result;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging(cli.debug, cli.log_json);

    if let Err(e) = run(cli).await {
        error!("Error: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    info!("Starting rgd");

    let config = if cli.command.needs_validated_config() {
        load_config().await?
    } else {
        load_config_no_validation().await?
    };

    let (handle, cancel) = cancellation_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupt received, cancelling");
            handle.cancel();
        }
    });

    cli.execute(config, cancel).await
}

fn init_logging(debug: bool, json: bool) {
    let filter = if debug {
        EnvFilter::new("rgdeploy=debug,rgd=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "rgdeploy=info".into())
    };

    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}
