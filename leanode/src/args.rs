use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "leanode", version, about = "a lean post-quantum consensus node")]
pub struct LeanodeArgs {
    #[command(subcommand)]
    pub command: LeanodeCommand,
}

#[derive(Subcommand)]
pub enum LeanodeCommand {
    /// Run a node.
    Node(NodeOptions),
    /// Print the deterministic devnet validator pubkeys for a registry of
    /// the given size, in `genesis_validators` format.
    GenerateKeys {
        #[arg(long)]
        count: u64,
    },
}

#[derive(Args)]
pub struct NodeOptions {
    /// Directory with config.yaml, validators.yaml and nodes.yaml.
    #[arg(long)]
    pub config_dir: PathBuf,

    /// This node's name in validators.yaml.
    #[arg(long)]
    pub node_id: String,

    /// Replaces GENESIS_TIME from config.yaml.
    #[arg(long)]
    pub override_genesis_time: Option<u64>,

    /// Directory for network keys. Consumed by the transport.
    #[arg(long)]
    pub network_dir: Option<PathBuf>,

    /// Directory for the chain database.
    #[arg(long)]
    pub data_dir: PathBuf,

    /// Port for the metrics endpoint. Reserved for the metrics service.
    #[arg(long)]
    pub metrics_port: Option<u16>,
}
