//! The reactor: a single-threaded select loop over the tick stream and the
//! network channels. The executor never suspends; all waiting happens here.

use std::sync::Arc;

use anyhow::Result;
use futures::{
    channel::mpsc::{Receiver, Sender},
    StreamExt as _,
};
use log::{debug, info};

use types::{config::Config, primitives::UnixSeconds};

use crate::{
    executor::Executor,
    gossip::GossipTopic,
    messages::{NetworkToNode, NodeToNetwork},
};

/// Drives the executor until shutdown or a fatal error. Inbound gossip is
/// drained before the pending tick so duties run on the freshest view.
pub async fn run(
    mut executor: Executor,
    config: Arc<Config>,
    genesis_time: UnixSeconds,
    mut from_network: Receiver<NetworkToNode>,
    mut to_network: Sender<NodeToNetwork>,
) -> Result<()> {
    let mut ticks = Box::pin(clock::ticks(&config, genesis_time)?);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!("node started (genesis_time: {genesis_time})");

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                info!("shutting down");
                break;
            }

            message = from_network.next() => {
                let Some(message) = message else {
                    info!("network channel closed, shutting down");
                    break;
                };

                let outbound = match message {
                    NetworkToNode::Gossip(gossip) => match gossip.topic {
                        GossipTopic::Block => executor.on_gossip_block(&gossip.data)?,
                        GossipTopic::Vote => {
                            executor.on_gossip_vote(&gossip.data);
                            vec![]
                        }
                    },
                    NetworkToNode::RequestedBlock(data) => {
                        executor.on_requested_block(&data)?
                    }
                    NetworkToNode::BlocksByRootRequest { request_id, roots } => {
                        executor.on_blocks_by_root_request(request_id, &roots)?
                    }
                };

                for message in outbound {
                    message.send(&mut to_network).await;
                }
            }

            tick = ticks.next() => {
                let Some(tick) = tick else { break };
                let tick = tick?;

                if tick.is_start_of_slot() {
                    debug!("slot {} started", tick.slot);
                }

                for message in executor.on_tick(tick)? {
                    message.send(&mut to_network).await;
                }
            }
        }
    }

    Ok(())
}
