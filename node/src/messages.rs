use core::time::Duration;

use futures::channel::mpsc::Sender;
use log::{debug, warn};

use types::primitives::H256;

use crate::gossip::GossipMessage;

/// Congestion on a bounded channel is transient: sends retry with
/// exponential backoff before the message is dropped and logged.
const SEND_ATTEMPTS: usize = 5;
const INITIAL_BACKOFF: Duration = Duration::from_millis(10);

pub enum NetworkToNode {
    Gossip(GossipMessage),
    /// A block delivered in response to [`NodeToNetwork::RequestBlocksByRoot`].
    RequestedBlock(Vec<u8>),
    /// A peer asks for blocks it is missing.
    BlocksByRootRequest { request_id: u64, roots: Vec<H256> },
}

impl NetworkToNode {
    pub async fn send(self, tx: &mut Sender<Self>) {
        send_with_backoff(self, tx, "node").await;
    }
}

pub enum NodeToNetwork {
    Publish(GossipMessage),
    /// Ask peers for blocks whose parents are missing locally.
    RequestBlocksByRoot(Vec<H256>),
    /// Answer to [`NetworkToNode::BlocksByRootRequest`], SSZ-encoded blocks.
    BlocksByRootResponse {
        request_id: u64,
        blocks: Vec<Vec<u8>>,
    },
}

impl NodeToNetwork {
    pub async fn send(self, tx: &mut Sender<Self>) {
        send_with_backoff(self, tx, "network").await;
    }
}

async fn send_with_backoff<T>(message: T, tx: &mut Sender<T>, receiver: &'static str) {
    let mut message = message;
    let mut backoff = INITIAL_BACKOFF;

    for attempt in 1..=SEND_ATTEMPTS {
        match tx.try_send(message) {
            Ok(()) => return,
            Err(error) => {
                if error.is_disconnected() {
                    debug!("send to {receiver} failed because the channel was closed");
                    return;
                }

                message = error.into_inner();
            }
        }

        if attempt < SEND_ATTEMPTS {
            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }
    }

    warn!("dropping message to {receiver} after {SEND_ATTEMPTS} attempts on a full channel");
}

#[cfg(test)]
mod tests {
    use futures::{channel::mpsc, StreamExt as _};

    use crate::gossip::GossipTopic;

    use super::*;

    fn message(byte: u8) -> NodeToNetwork {
        NodeToNetwork::Publish(GossipMessage {
            topic: GossipTopic::Vote,
            data: vec![byte],
        })
    }

    fn payload(message: NodeToNetwork) -> Vec<u8> {
        match message {
            NodeToNetwork::Publish(gossip) => gossip.data,
            _ => panic!("the tests only send gossip"),
        }
    }

    // `mpsc::channel(0)` still grants the sender one guaranteed slot.
    #[tokio::test(start_paused = true)]
    async fn congested_sends_drop_after_bounded_retries() {
        let (mut tx, mut rx) = mpsc::channel(0);

        message(1).send(&mut tx).await;
        message(2).send(&mut tx).await;

        let received = rx.next().await.expect("the first message was sent");
        assert_eq!(payload(received), [1]);

        assert!(
            rx.try_next().is_err(),
            "the second message should have been dropped after its retries",
        );
    }

    #[tokio::test(start_paused = true)]
    async fn congested_sends_recover_once_capacity_frees() {
        let (mut tx, mut rx) = mpsc::channel(0);

        message(1).send(&mut tx).await;

        let sender = tokio::spawn(async move {
            message(2).send(&mut tx).await;
            drop(tx);
        });

        // Draining the first message frees the slot for a later attempt.
        let received = rx.next().await.expect("the first message was sent");
        assert_eq!(payload(received), [1]);

        sender.await.expect("the sending task does not panic");

        let received = rx.next().await.expect("the retry should have succeeded");
        assert_eq!(payload(received), [2]);
    }
}
