pub use crate::{
    executor::Executor,
    gossip::{GossipMessage, GossipTopic},
    messages::{NetworkToNode, NodeToNetwork},
    storage::Storage,
};

pub mod runtime;

mod executor;
mod gossip;
mod messages;
mod storage;
