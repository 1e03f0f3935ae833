//! The single-writer core of the node.
//!
//! The executor owns the fork-choice store, the storage layer and the
//! signing keys. The async reactor drives it with ticks and gossip; every
//! method here runs to completion without suspending. Protocol violations
//! in incoming messages are logged and dropped; only local invariant
//! violations (a failed own-block application, a finalized reorg) escape
//! as errors and take the node down.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use anyhow::{Context as _, Error as AnyhowError, Result};
use log::{debug, info, warn};

use clock::{Tick, TickKind};
use fork_choice_store::{ProtoBlock, Store};
use genesis::GenesisSpec;
use helper_functions::{misc, signing};
use pqsig::{PublicKeyBytes, SecretKey};
use ssz::{SszHash as _, SszRead as _, SszWrite as _};
use transition_functions::{process_block_for_proposal, state_transition, StateRootPolicy};
use types::{
    config::Config,
    containers::{AttestationData, Block, BlockBody, Checkpoint, SignedBlock, SignedVote},
    primitives::{Slot, ValidatorIndex, H256},
};

use crate::{gossip::GossipMessage, messages::NodeToNetwork, storage::Storage};

enum IngestOutcome {
    Accepted,
    AlreadyKnown,
    MissingParent,
    Invalid,
}

pub struct Executor {
    config: Arc<Config>,
    validator_pubkeys: Arc<Vec<PublicKeyBytes>>,
    signers: BTreeMap<ValidatorIndex, SecretKey>,
    store: Store,
    storage: Storage,
    /// The freshest verified vote per validator, pending inclusion in a
    /// proposal. Pruned as votes land on chain or fall behind finality.
    vote_pool: BTreeMap<ValidatorIndex, SignedVote>,
    /// Blocks waiting for their parents, keyed by the missing parent root.
    delayed_blocks: HashMap<H256, Vec<SignedBlock>>,
}

impl Executor {
    /// Sets up the executor at genesis, or at the last finalized block
    /// after a restart.
    pub fn new(
        config: Arc<Config>,
        genesis_spec: &GenesisSpec,
        mut signers: BTreeMap<ValidatorIndex, SecretKey>,
        storage: Storage,
    ) -> Result<Self> {
        // Epoch high-water marks survive restarts so a key never signs the
        // same epoch twice.
        for (validator_id, signer) in &mut signers {
            if let Some(epoch) = storage.last_signed_epoch(*validator_id)? {
                signer.restore_last_signed_epoch(epoch);
            }
        }

        let genesis_state = genesis_spec.state();
        let mut store = Store::for_genesis(&genesis_state);

        match storage.finalized_checkpoint()? {
            Some(finalized) if finalized.slot > 0 => {
                let block = storage
                    .block(finalized.root)?
                    .context("the finalized block must be in storage")?;
                let state = storage
                    .state(finalized.root)?
                    .context("the finalized state must be in storage")?;

                let anchor = ProtoBlock {
                    slot: block.message.slot,
                    block_root: finalized.root,
                    parent_root: block.message.parent_root,
                    state_root: block.message.state_root,
                    timely: true,
                };

                info!(
                    "resuming from finalized checkpoint at slot {} ({:?})",
                    finalized.slot, finalized.root,
                );

                store = Store::new(anchor, finalized, finalized);
                storage.put_state(finalized.root, &state)?;
            }
            _ => {
                storage.put_state(store.head(), &genesis_state)?;
                storage.put_finalized_checkpoint(store.finalized_checkpoint())?;
            }
        }

        Ok(Self {
            config,
            validator_pubkeys: Arc::new(genesis_spec.validator_pubkeys.clone()),
            signers,
            store,
            storage,
            vote_pool: BTreeMap::new(),
            delayed_blocks: HashMap::new(),
        })
    }

    #[must_use]
    pub fn head(&self) -> H256 {
        self.store.head()
    }

    #[must_use]
    pub fn justified_checkpoint(&self) -> Checkpoint {
        self.store.justified_checkpoint()
    }

    #[must_use]
    pub fn finalized_checkpoint(&self) -> Checkpoint {
        self.store.finalized_checkpoint()
    }

    #[must_use]
    pub const fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Handles one interval tick and returns the messages to publish.
    pub fn on_tick(&mut self, tick: Tick) -> Result<Vec<NodeToNetwork>> {
        self.store.on_tick(tick.slot, tick.interval());

        let messages = match tick.kind {
            TickKind::Propose => self.propose(tick.slot)?,
            TickKind::Attest => self.attest(tick.slot)?,
            TickKind::Aggregate => vec![],
        };

        Ok(messages.into_iter().map(NodeToNetwork::Publish).collect())
    }

    /// Ingests a block received from gossip. Invalid blocks are dropped;
    /// an error is a local invariant violation and fatal. A block with a
    /// missing parent is parked and its parent requested from peers.
    pub fn on_gossip_block(&mut self, data: &[u8]) -> Result<Vec<NodeToNetwork>> {
        let signed_block = match SignedBlock::from_ssz(data) {
            Ok(block) => block,
            Err(error) => {
                warn!("malformed block from gossip: {error}");
                return Ok(vec![]);
            }
        };

        let parent_root = signed_block.message.parent_root;

        match self.ingest_block(&signed_block, false)? {
            IngestOutcome::MissingParent => {
                self.delay_block(signed_block);
                Ok(vec![NodeToNetwork::RequestBlocksByRoot(vec![parent_root])])
            }
            _ => Ok(vec![]),
        }
    }

    /// Ingests a block a peer sent in response to a by-root request.
    pub fn on_requested_block(&mut self, data: &[u8]) -> Result<Vec<NodeToNetwork>> {
        self.on_gossip_block(data)
    }

    /// Serves a peer's by-root request from storage, up to
    /// `MAX_REQUEST_BLOCKS` blocks.
    pub fn on_blocks_by_root_request(
        &self,
        request_id: u64,
        roots: &[H256],
    ) -> Result<Vec<NodeToNetwork>> {
        let limit = usize::try_from(self.config.max_request_blocks)
            .expect("the request limit fits in usize");

        let mut blocks = vec![];

        for root in roots.iter().take(limit) {
            if let Some(signed_block) = self.storage.block(*root)? {
                blocks.push(signed_block.to_ssz()?);
            }
        }

        Ok(vec![NodeToNetwork::BlocksByRootResponse { request_id, blocks }])
    }

    /// Ingests a vote received from gossip.
    pub fn on_gossip_vote(&mut self, data: &[u8]) {
        let signed_vote = match SignedVote::from_ssz(data) {
            Ok(vote) => vote,
            Err(error) => {
                warn!("malformed vote from gossip: {error}");
                return;
            }
        };

        self.ingest_vote(signed_vote, true);
    }

    fn propose(&mut self, slot: Slot) -> Result<Vec<GossipMessage>> {
        let num_validators = self.validator_pubkeys.len() as u64;
        let proposer = misc::proposer_index(num_validators, slot);

        if !self.signers.contains_key(&proposer) {
            return Ok(vec![]);
        }

        let head_root = self.store.head();
        let head_state = self
            .storage
            .state(head_root)?
            .context("the head state must be in storage")?;

        let attestations = self
            .vote_pool
            .values()
            .filter(|vote| vote.data.slot < slot)
            .cloned()
            .collect::<Vec<_>>();

        let mut state = head_state;
        let mut block = Block {
            slot,
            proposer_index: proposer,
            parent_root: head_root,
            state_root: types::consts::ZERO_HASH,
            body: BlockBody {
                attestations: attestations
                    .try_into()
                    .expect("the pool holds at most one vote per validator"),
            },
        };

        if let Err(error) = process_block_for_proposal(&mut state, &mut block) {
            warn!("failed to build a block for slot {slot}: {error}");
            return Ok(vec![]);
        }

        let epoch = match signing::signature_epoch(slot) {
            Ok(epoch) => epoch,
            Err(error) => {
                warn!("cannot propose at slot {slot}: {error}");
                return Ok(vec![]);
            }
        };

        let signer = self
            .signers
            .get_mut(&proposer)
            .expect("the proposer was checked to be local");

        let signature = match signer.sign(signing::block_signing_root(&block), epoch) {
            Ok(signature) => signature,
            Err(error) => {
                warn!("dropping proposal for slot {slot}: {error}");
                return Ok(vec![]);
            }
        };

        self.storage.put_last_signed_epoch(proposer, epoch)?;

        let signed_block = SignedBlock {
            message: block,
            signature,
        };

        match self.ingest_block(&signed_block, true)? {
            IngestOutcome::Accepted => {}
            _ => {
                warn!("own block for slot {slot} was not accepted");
                return Ok(vec![]);
            }
        }

        info!(
            "proposed block at slot {slot} ({:?})",
            signed_block.message.hash_tree_root(),
        );

        Ok(vec![GossipMessage::block(&signed_block)?])
    }

    fn attest(&mut self, slot: Slot) -> Result<Vec<GossipMessage>> {
        if self.signers.is_empty() {
            return Ok(vec![]);
        }

        let head_root = self.store.head();
        let head_block = *self
            .store
            .block(head_root)
            .expect("the head always points at a known block");
        let head_state = self
            .storage
            .state(head_root)?
            .context("the head state must be in storage")?;

        let finalized = self.store.finalized_checkpoint();

        // The vote target is the nearest justifiable ancestor of the head.
        let mut target_block = head_block;

        while !misc::is_justifiable_slot(finalized.slot, target_block.slot)
            .map_err(AnyhowError::new)?
        {
            target_block = *self
                .store
                .block(target_block.parent_root)
                .context("ancestors of the head down to finality are known")?;
        }

        let data = AttestationData {
            slot,
            head: Checkpoint {
                root: head_block.block_root,
                slot: head_block.slot,
            },
            target: Checkpoint {
                root: target_block.block_root,
                slot: target_block.slot,
            },
            source: head_state.latest_justified,
        };

        let epoch = match signing::signature_epoch(slot) {
            Ok(epoch) => epoch,
            Err(error) => {
                warn!("cannot attest at slot {slot}: {error}");
                return Ok(vec![]);
            }
        };

        let mut votes = vec![];

        for (validator_id, signer) in &mut self.signers {
            let signature = match signer.sign(signing::vote_signing_root(&data), epoch) {
                Ok(signature) => signature,
                Err(error) => {
                    // Typically the proposer, whose epoch went to its block.
                    debug!("validator {validator_id} skips attesting at slot {slot}: {error}");
                    continue;
                }
            };

            self.storage.put_last_signed_epoch(*validator_id, epoch)?;

            votes.push(SignedVote {
                validator_id: *validator_id,
                data,
                signature,
            });
        }

        let messages = votes.iter().map(GossipMessage::vote).collect::<Result<_>>()?;

        // Own votes go through the same ingestion path as gossiped ones,
        // minus the signature check.
        for vote in votes {
            self.ingest_vote(vote, false);
        }

        Ok(messages)
    }

    fn ingest_block(&mut self, signed_block: &SignedBlock, trusted: bool) -> Result<IngestOutcome> {
        let block = &signed_block.message;
        let block_root = block.hash_tree_root();

        if self.store.contains_block(block_root) {
            return Ok(IngestOutcome::AlreadyKnown);
        }

        let Some(parent_state) = self.storage.state(block.parent_root)? else {
            debug!(
                "dropping block {block_root:?} at slot {} with unknown parent {:?}",
                block.slot, block.parent_root,
            );
            return Ok(IngestOutcome::MissingParent);
        };

        let (pubkeys, policy) = if trusted {
            (None, StateRootPolicy::Trust)
        } else {
            (Some(self.validator_pubkeys.as_slice()), StateRootPolicy::Verify)
        };

        let mut state = parent_state;

        if let Err(error) = state_transition(&mut state, signed_block, pubkeys, policy) {
            warn!("rejecting block {block_root:?} at slot {}: {error}", block.slot);
            return Ok(IngestOutcome::Invalid);
        }

        // A block is timely if it arrives before the attest interval of its
        // own slot.
        let timely = block.slot > self.store.current_slot()
            || (block.slot == self.store.current_slot() && self.store.current_interval() < 1);

        self.storage.put_block(block_root, signed_block)?;
        self.storage.put_state(block_root, &state)?;

        let finalized_before = self.store.finalized_checkpoint();

        self.store
            .on_block(block_root, block, &state, timely)
            .map_err(AnyhowError::new)?;

        let finalized_after = self.store.finalized_checkpoint();

        if finalized_after != finalized_before {
            self.storage.put_finalized_checkpoint(finalized_after)?;
            self.prune_pending(finalized_after);

            info!(
                "finalized slot {} ({:?})",
                finalized_after.slot, finalized_after.root,
            );
        }

        // Votes carried by the block count for fork choice and leave the
        // pending pool.
        for vote in block.body.attestations.iter() {
            self.store.on_attestation(vote.validator_id, vote.data);

            if let Some(pending) = self.vote_pool.get(&vote.validator_id) {
                if pending.data == vote.data {
                    self.vote_pool.remove(&vote.validator_id);
                }
            }
        }

        debug!("accepted block at slot {} ({block_root:?})", block.slot);

        // Children that were waiting for this block can be applied now.
        if let Some(delayed) = self.delayed_blocks.remove(&block_root) {
            for child in delayed {
                self.ingest_block(&child, false)?;
            }
        }

        Ok(IngestOutcome::Accepted)
    }

    fn delay_block(&mut self, signed_block: SignedBlock) {
        let waiting = self
            .delayed_blocks
            .entry(signed_block.message.parent_root)
            .or_default();

        if !waiting.contains(&signed_block) {
            waiting.push(signed_block);
        }
    }

    fn ingest_vote(&mut self, signed_vote: SignedVote, verify: bool) {
        let data = signed_vote.data;
        let num_validators = self.validator_pubkeys.len() as u64;

        if signed_vote.validator_id >= num_validators {
            warn!("dropping vote from out-of-range validator {}", signed_vote.validator_id);
            return;
        }

        if !(data.source.slot <= data.target.slot && data.target.slot <= data.slot) {
            warn!("dropping vote with inconsistent checkpoints: {data:?}");
            return;
        }

        if verify {
            let pubkey = self.validator_pubkeys[signed_vote.validator_id as usize];

            let epoch = match signing::signature_epoch(data.slot) {
                Ok(epoch) => epoch,
                Err(error) => {
                    warn!("dropping vote: {error}");
                    return;
                }
            };

            if let Err(error) =
                pubkey.verify(signing::vote_signing_root(&data), epoch, &signed_vote.signature)
            {
                warn!(
                    "dropping vote with a bad signature from validator {}: {error}",
                    signed_vote.validator_id,
                );
                return;
            }
        }

        self.store.on_attestation(signed_vote.validator_id, data);

        match self.vote_pool.get(&signed_vote.validator_id) {
            Some(pending) if pending.data.slot >= data.slot => {}
            _ => {
                self.vote_pool.insert(signed_vote.validator_id, signed_vote);
            }
        }
    }

    fn prune_pending(&mut self, finalized: Checkpoint) {
        self.vote_pool
            .retain(|_, vote| vote.data.target.slot > finalized.slot);

        self.delayed_blocks.retain(|_, blocks| {
            blocks.retain(|block| block.message.slot > finalized.slot);
            !blocks.is_empty()
        });
    }
}
