use anyhow::{Context, Result};
use clap::Parser;
use price_relay_core::{load_config, run, TwelveDataClient};
use price_relay_openoracle::OpenOracleSubmitter;
use std::path::PathBuf;
use tracing::{debug, error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// The configuration of the oracle price relay (TOML).
    #[clap(short, long, value_parser, default_value = "config.toml")]
    config: PathBuf,

    /// Log level (e.g., trace, debug, info, warn, error).
    #[clap(long, value_parser, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // --- Setup Logging ---
    let log_level = args
        .log_level
        .parse::<Level>()
        .context("Invalid log level specified")?;
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Setting default tracing subscriber failed")?;

    info!("Starting oracle price relay...");
    debug!(?args, "Parsed command line arguments");

    // --- Load Configuration ---
    let config = match load_config(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "unable to read configuration");
            return Err(e).with_context(|| format!("Invalid configuration in {:?}", args.config));
        }
    };
    info!(symbol = %config.symbol, frequency = ?config.update_frequency, path = %args.config.display(), "Loaded configuration");
    debug!(?config, "Effective configuration");

    // --- Initialize Components ---
    info!(url = %config.twelvedata_url, mic_code = ?config.mic_code, "Initializing Twelve Data client");
    let source = TwelveDataClient::new(&config.twelvedata_url, config.mic_code.clone())
        .context("Failed to initialize Twelve Data client")?;

    info!(node = %config.node_addr, "Initializing oracle submitter");
    let submitter = OpenOracleSubmitter::new(
        &config.node_addr,
        &config.wallet_mnemonic,
        &config.ethereum_private_key,
    )
    .context("Failed to initialize oracle submitter")?;

    // --- Start Relay ---
    // Only returns when the configuration is rejected.
    match run(config, source, submitter).await {
        Ok(never) => match never {},
        Err(e) => {
            error!(error = %e, "Relay refused to start");
            Err(e).context("Relay failed")
        }
    }
}
