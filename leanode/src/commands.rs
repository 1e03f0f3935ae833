use std::{collections::BTreeMap, sync::Arc};

use anyhow::Result;
use bytesize::ByteSize;
use database::{Database, DatabaseMode};
use futures::{channel::mpsc, StreamExt as _};
use genesis::GenesisConfig;
use log::{debug, info};

use node::{runtime, Executor, NodeToNetwork, Storage};
use types::config::Config;

use crate::args::{LeanodeArgs, LeanodeCommand, NodeOptions};

const DATABASE_MAX_SIZE: ByteSize = ByteSize::gib(16);
const CHANNEL_CAPACITY: usize = 1024;

pub fn run(args: LeanodeArgs) -> Result<()> {
    match args.command {
        LeanodeCommand::Node(options) => run_node(options),
        LeanodeCommand::GenerateKeys { count } => generate_keys(count),
    }
}

fn generate_keys(count: u64) -> Result<()> {
    println!("genesis_validators:");

    for index in 0..count {
        println!("  - \"{}\"", pqsig::devnet::public_key(index)?);
    }

    Ok(())
}

fn run_node(options: NodeOptions) -> Result<()> {
    let NodeOptions {
        config_dir,
        node_id,
        override_genesis_time,
        network_dir,
        data_dir,
        metrics_port,
    } = options;

    let mut genesis_config = GenesisConfig::load(&config_dir)?;

    if let Some(genesis_time) = override_genesis_time {
        genesis_config.genesis_time = genesis_time;
    }

    let genesis_spec = genesis_config.into_spec()?;
    let genesis_time = genesis_spec.genesis_time;

    let assignments = genesis::load_validator_assignments(&config_dir)?;
    let own_validators = genesis::own_validators(&assignments, &node_id)?;
    let bootnodes = genesis::load_bootnodes(&config_dir).unwrap_or_default();

    info!(
        "node {node_id}: {} of {} validators, {} bootnodes",
        own_validators.len(),
        genesis_spec.num_validators(),
        bootnodes.len(),
    );

    if let Some(port) = metrics_port {
        debug!("metrics port {port} is reserved for the metrics service");
    }

    if let Some(directory) = network_dir {
        debug!("network keys in {directory:?} are consumed by the transport");
    }

    let signers = own_validators
        .iter()
        .map(|index| Ok((*index, pqsig::devnet::secret_key(*index)?)))
        .collect::<Result<BTreeMap<_, _>>>()?;

    let storage = Storage::new(Database::persistent(
        "chain",
        data_dir.join("chain"),
        DATABASE_MAX_SIZE,
        DatabaseMode::ReadWrite,
    )?);

    let config = Arc::new(Config::mainnet());

    let executor = Executor::new(config.clone(), &genesis_spec, signers, storage)?;

    let (to_node_tx, to_node_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (to_network_tx, mut to_network_rx) = mpsc::channel(CHANNEL_CAPACITY);

    // The node is a single-threaded cooperative reactor; heavy work stays
    // inside the executor.
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(async move {
            // The transport bridge owns the far ends of the channels. Until
            // one is attached, published messages are logged and dropped.
            let _transport_tx = to_node_tx;

            tokio::spawn(async move {
                while let Some(message) = to_network_rx.next().await {
                    match message {
                        NodeToNetwork::Publish(gossip) => debug!(
                            "publishing {} message ({} bytes)",
                            gossip.topic.as_str(),
                            gossip.data.len(),
                        ),
                        NodeToNetwork::RequestBlocksByRoot(roots) => {
                            debug!("requesting {} blocks by root", roots.len());
                        }
                        NodeToNetwork::BlocksByRootResponse { request_id, blocks } => debug!(
                            "responding to request {request_id} with {} blocks",
                            blocks.len(),
                        ),
                    }
                }
            });

            runtime::run(executor, config, genesis_time, to_node_rx, to_network_tx).await
        })
}
