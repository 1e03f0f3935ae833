//! The message contract with the gossip transport.
//!
//! Two topics, each carrying raw SSZ bytes with no extra framing. The
//! stable integer IDs are what the transport bridge keys its subscriptions
//! by.

use anyhow::Result;
use ssz::SszWrite as _;
use types::containers::{SignedBlock, SignedVote};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GossipTopic {
    Block,
    Vote,
}

impl GossipTopic {
    #[must_use]
    pub const fn id(self) -> u64 {
        match self {
            Self::Block => 0,
            Self::Vote => 1,
        }
    }

    #[must_use]
    pub const fn from_id(id: u64) -> Option<Self> {
        match id {
            0 => Some(Self::Block),
            1 => Some(Self::Vote),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::Vote => "vote",
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct GossipMessage {
    pub topic: GossipTopic,
    pub data: Vec<u8>,
}

impl GossipMessage {
    pub fn block(block: &SignedBlock) -> Result<Self> {
        Ok(Self {
            topic: GossipTopic::Block,
            data: block.to_ssz()?,
        })
    }

    pub fn vote(vote: &SignedVote) -> Result<Self> {
        Ok(Self {
            topic: GossipTopic::Vote,
            data: vote.to_ssz()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_ids_are_stable() {
        assert_eq!(GossipTopic::Block.id(), 0);
        assert_eq!(GossipTopic::Vote.id(), 1);
        assert_eq!(GossipTopic::from_id(0), Some(GossipTopic::Block));
        assert_eq!(GossipTopic::from_id(1), Some(GossipTopic::Vote));
        assert_eq!(GossipTopic::from_id(2), None);
    }
}
