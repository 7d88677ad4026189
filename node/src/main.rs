use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgMatches, Command};
use parking_lot::RwLock;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use waves_rewards::{FeatureOracle, FeatureRegistry, RewardLedger};
use waves_rpc::{start_server, AppState};
use waves_types::FeatureId;

mod chain;
mod node_config;

use node_config::{NetworkProfile, NodeConfig};

fn cli() -> Command {
    Command::new("waves-node")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Waves block reward node")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path"),
        )
        .arg(
            Arg::new("network")
                .long("network")
                .value_name("PROFILE")
                .value_parser(value_parser!(NetworkProfile))
                .default_value("mainnet")
                .help("Select network profile (mainnet, testnet). Can also be set via WAVES_NETWORK"),
        )
        .arg(
            Arg::new("rpc-addr")
                .long("rpc-addr")
                .value_name("ADDR")
                .help("Override the RPC listen address"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .value_parser(["trace", "debug", "info", "warn", "error"])
                .help("Override the log level"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .value_parser(["pretty", "json"])
                .help("Select log output format"),
        )
        .arg(
            Arg::new("chain-file")
                .long("chain-file")
                .value_name("FILE")
                .help("JSON block header history to replay at startup"),
        )
}

fn load_config_with_overrides(matches: &ArgMatches) -> Result<NodeConfig> {
    let profile = std::env::var("WAVES_NETWORK")
        .ok()
        .and_then(|value| NetworkProfile::from_env(&value))
        .or_else(|| matches.get_one::<NetworkProfile>("network").copied())
        .unwrap_or(NetworkProfile::Mainnet);
    let config_path = matches.get_one::<String>("config").map(Path::new);

    let mut config = NodeConfig::load(profile, config_path)?;
    apply_overrides(matches, &mut config);
    config.validate()?;

    Ok(config)
}

fn apply_overrides(matches: &ArgMatches, config: &mut NodeConfig) {
    if let Some(rpc_addr) = matches.get_one::<String>("rpc-addr") {
        config.rpc_addr = rpc_addr.clone();
    }

    if let Some(log_level) = matches.get_one::<String>("log-level") {
        config.log_level = log_level.clone();
    }

    if let Some(log_format) = matches.get_one::<String>("log-format") {
        config.log_format = log_format.clone();
    }

    if let Some(chain_file) = matches.get_one::<String>("chain-file") {
        config.chain_file = Some(chain_file.into());
    }
}

fn init_logging(config: &NodeConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()?;
    }

    Ok(())
}

fn build_ledger(config: &NodeConfig) -> Result<RewardLedger> {
    let features = FeatureRegistry::from_activations(&config.features)
        .context("invalid feature activation list")?;

    for feature in features.iter() {
        info!(
            target: "node",
            feature = %feature.id,
            height = ?feature.activation_height,
            "feature activation configured"
        );
    }
    if features.activation_height(FeatureId::BLOCK_REWARD).is_none() {
        warn!(target: "node", "BlockReward is not activated; blocks will carry no reward");
    }

    let mut ledger = RewardLedger::new(config.rewards.clone(), features)
        .context("failed to initialise reward ledger")?;

    if let Some(path) = &config.chain_file {
        let headers = chain::load_headers(path)?;
        chain::import_headers(&mut ledger, &headers)?;
    }

    Ok(ledger)
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    let config = load_config_with_overrides(&matches)?;
    init_logging(&config)?;

    info!(
        target: "node",
        node_id = %config.node_id,
        network = %config.network,
        rpc_addr = %config.rpc_addr,
        "starting waves node"
    );

    let ledger = Arc::new(RwLock::new(build_ledger(&config)?));
    let state = AppState::new(ledger, config.node_id.clone());

    tokio::select! {
        result = start_server(state, &config.rpc_addr) => result,
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for shutdown signal")?;
            info!(target: "node", "shutdown signal received");
            Ok(())
        }
    }
}
