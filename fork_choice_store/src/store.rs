use std::collections::{BTreeSet, HashMap};

use log::debug;
use ssz::SszHash as _;
use types::{
    containers::{AttestationData, Block, Checkpoint},
    primitives::{Slot, ValidatorIndex, H256},
    state::State,
};

use crate::{
    error::Error,
    misc::{ProtoBlock, VoteRecord},
};

/// The fork-choice store: an in-memory DAG of [`ProtoBlock`]s plus the
/// latest known vote per validator, from which the canonical head is
/// selected. Justification and finalization are mirrored from post-states
/// produced by the state transition, never decided here.
pub struct Store {
    blocks: HashMap<H256, ProtoBlock>,
    children: HashMap<H256, BTreeSet<H256>>,
    latest_known_votes: HashMap<ValidatorIndex, VoteRecord>,
    latest_justified: Checkpoint,
    latest_finalized: Checkpoint,
    head: H256,
    current_slot: Slot,
    current_interval: u64,
}

impl Store {
    #[must_use]
    pub fn new(anchor: ProtoBlock, justified: Checkpoint, finalized: Checkpoint) -> Self {
        let mut blocks = HashMap::new();
        blocks.insert(anchor.block_root, anchor);

        Self {
            blocks,
            children: HashMap::new(),
            latest_known_votes: HashMap::new(),
            latest_justified: justified,
            latest_finalized: finalized,
            head: anchor.block_root,
            current_slot: anchor.slot,
            current_interval: 0,
        }
    }

    /// Anchors a store at genesis. The genesis block root is the root of
    /// the genesis header with the genesis state root filled in, which is
    /// exactly what the first block will carry as its parent root.
    #[must_use]
    pub fn for_genesis(genesis_state: &State) -> Self {
        let state_root = genesis_state.hash_tree_root();

        let mut header = genesis_state.latest_block_header;
        header.state_root = state_root;

        let anchor_root = header.hash_tree_root();

        let checkpoint = Checkpoint {
            root: anchor_root,
            slot: 0,
        };

        let anchor = ProtoBlock {
            slot: 0,
            block_root: anchor_root,
            parent_root: H256::zero(),
            state_root,
            timely: true,
        };

        Self::new(anchor, checkpoint, checkpoint)
    }

    #[must_use]
    pub const fn head(&self) -> H256 {
        self.head
    }

    #[must_use]
    pub const fn justified_checkpoint(&self) -> Checkpoint {
        self.latest_justified
    }

    #[must_use]
    pub const fn finalized_checkpoint(&self) -> Checkpoint {
        self.latest_finalized
    }

    #[must_use]
    pub const fn current_slot(&self) -> Slot {
        self.current_slot
    }

    #[must_use]
    pub const fn current_interval(&self) -> u64 {
        self.current_interval
    }

    #[must_use]
    pub fn contains_block(&self, block_root: H256) -> bool {
        self.blocks.contains_key(&block_root)
    }

    #[must_use]
    pub fn block(&self, block_root: H256) -> Option<&ProtoBlock> {
        self.blocks.get(&block_root)
    }

    #[must_use]
    pub fn head_block(&self) -> &ProtoBlock {
        self.blocks
            .get(&self.head)
            .expect("the head always points at a known block")
    }

    /// Advances the store clock. Votes cast in earlier slots become
    /// eligible for weight regardless of timeliness, so the head may move.
    pub fn on_tick(&mut self, slot: Slot, interval: u64) {
        if slot < self.current_slot {
            return;
        }

        let slot_advanced = slot > self.current_slot;

        self.current_slot = slot;
        self.current_interval = interval;

        if slot_advanced {
            self.update_head();
        }
    }

    /// Inserts a block whose post-state the state transition has already
    /// produced. The parent must be known; gossip is expected to deliver
    /// parents first and the caller to queue orphans.
    pub fn on_block(
        &mut self,
        block_root: H256,
        block: &Block,
        post_state: &State,
        timely: bool,
    ) -> Result<(), Error> {
        if self.blocks.contains_key(&block_root) {
            return Ok(());
        }

        if !self.blocks.contains_key(&block.parent_root) {
            return Err(Error::UnknownParent {
                block_root,
                parent_root: block.parent_root,
            });
        }

        self.blocks.insert(
            block_root,
            ProtoBlock {
                slot: block.slot,
                block_root,
                parent_root: block.parent_root,
                state_root: block.state_root,
                timely,
            },
        );

        self.children
            .entry(block.parent_root)
            .or_default()
            .insert(block_root);

        self.update_checkpoints(post_state)?;
        self.update_head();

        Ok(())
    }

    /// Records a vote. Only a strictly higher target slot replaces a
    /// validator's previous vote.
    pub fn on_attestation(&mut self, validator_id: ValidatorIndex, data: AttestationData) {
        let replace = self
            .latest_known_votes
            .get(&validator_id)
            .map_or(true, |known| data.target.slot > known.target_slot);

        if !replace {
            return;
        }

        self.latest_known_votes.insert(
            validator_id,
            VoteRecord {
                head: data.head,
                target_slot: data.target.slot,
                slot: data.slot,
            },
        );

        self.update_head();
    }

    /// Checkpoints move monotonically by slot; when two branches disagree
    /// at the same slot the canonical one wins. A finalized checkpoint that
    /// leaves the chain of the previous one is a fatal inconsistency.
    fn update_checkpoints(&mut self, post_state: &State) -> Result<(), Error> {
        if post_state.latest_justified.slot > self.latest_justified.slot {
            self.latest_justified = post_state.latest_justified;
        }

        if post_state.latest_finalized.slot > self.latest_finalized.slot {
            if !self.is_descendant(post_state.latest_finalized.root, self.latest_finalized.root) {
                return Err(Error::FinalizedRegression {
                    old: self.latest_finalized,
                    new: post_state.latest_finalized,
                });
            }

            debug!(
                "finalized checkpoint advanced to {:?}",
                post_state.latest_finalized,
            );

            self.latest_finalized = post_state.latest_finalized;
        }

        Ok(())
    }

    /// Walks down from the latest justified block, at each step taking the
    /// child with the most eligible votes among its descendants, breaking
    /// ties toward the greater block root.
    fn update_head(&mut self) {
        let mut current = self.latest_justified.root;

        while let Some(children) = self.children.get(&current) {
            let best = children
                .iter()
                .copied()
                .max_by_key(|child| (self.weight(*child), *child));

            match best {
                Some(child) => current = child,
                None => break,
            }
        }

        self.head = current;
    }

    fn weight(&self, subtree_root: H256) -> usize {
        self.latest_known_votes
            .values()
            .filter(|record| self.vote_is_eligible(record))
            .filter(|record| self.is_descendant(record.head.root, subtree_root))
            .count()
    }

    /// A vote cast in the current slot counts only if the block it points
    /// at was timely; older votes always count.
    fn vote_is_eligible(&self, record: &VoteRecord) -> bool {
        if record.slot < self.current_slot {
            return true;
        }

        self.blocks
            .get(&record.head.root)
            .is_some_and(|block| block.timely)
    }

    fn is_descendant(&self, descendant: H256, ancestor: H256) -> bool {
        let Some(ancestor_block) = self.blocks.get(&ancestor) else {
            return false;
        };

        let mut current = descendant;

        loop {
            if current == ancestor {
                return true;
            }

            match self.blocks.get(&current) {
                Some(block) if block.slot > ancestor_block.slot => current = block.parent_root,
                _ => return false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use types::containers::{BlockBody, ChainConfig};

    use super::*;

    fn genesis_state(num_validators: u64) -> State {
        State {
            config: ChainConfig {
                num_validators,
                genesis_time: 0,
            },
            ..State::default()
        }
    }

    fn block(slot: Slot, parent_root: H256, state_root: H256) -> (H256, Block) {
        let block = Block {
            slot,
            proposer_index: 0,
            parent_root,
            state_root,
            body: BlockBody::default(),
        };

        (block.hash_tree_root(), block)
    }

    fn checkpoint(root: H256, slot: Slot) -> Checkpoint {
        Checkpoint { root, slot }
    }

    fn vote_for(root: H256, slot: Slot) -> AttestationData {
        AttestationData {
            slot,
            head: checkpoint(root, slot),
            target: checkpoint(root, slot),
            source: Checkpoint::default(),
        }
    }

    /// Two siblings, equal weight: the greater root wins.
    #[test]
    fn sibling_ties_break_toward_the_greater_root() {
        let state = genesis_state(2);
        let mut store = Store::for_genesis(&state);
        let anchor = store.head();

        let (root_a, block_a) = block(1, anchor, H256::repeat_byte(0x01));
        let (root_b, block_b) = block(1, anchor, H256::repeat_byte(0x02));

        store
            .on_block(root_a, &block_a, &state, true)
            .expect("the parent is the anchor");
        store
            .on_block(root_b, &block_b, &state, true)
            .expect("the parent is the anchor");

        assert_eq!(store.head(), root_a.max(root_b));
    }

    #[test]
    fn votes_outweigh_the_tie_break() {
        let state = genesis_state(2);
        let mut store = Store::for_genesis(&state);
        let anchor = store.head();

        let (root_a, block_a) = block(1, anchor, H256::repeat_byte(0x01));
        let (root_b, block_b) = block(1, anchor, H256::repeat_byte(0x02));

        let lesser = root_a.min(root_b);

        store
            .on_block(root_a, &block_a, &state, true)
            .expect("the parent is the anchor");
        store
            .on_block(root_b, &block_b, &state, true)
            .expect("the parent is the anchor");

        store.on_tick(2, 0);
        store.on_attestation(0, vote_for(lesser, 1));

        assert_eq!(store.head(), lesser);
    }

    #[test]
    fn blocks_without_a_known_parent_are_rejected() {
        let state = genesis_state(2);
        let mut store = Store::for_genesis(&state);

        let (root, orphan) = block(1, H256::repeat_byte(0x77), H256::zero());

        assert_eq!(
            store.on_block(root, &orphan, &state, true),
            Err(Error::UnknownParent {
                block_root: root,
                parent_root: H256::repeat_byte(0x77),
            }),
        );
    }

    #[test]
    fn votes_only_advance_with_strictly_newer_targets() {
        let state = genesis_state(2);
        let mut store = Store::for_genesis(&state);
        let anchor = store.head();

        let (root_a, block_a) = block(1, anchor, H256::repeat_byte(0x01));
        let (root_b, block_b) = block(2, root_a, H256::repeat_byte(0x02));
        let (root_c, block_c) = block(2, root_a, H256::repeat_byte(0x03));

        store
            .on_block(root_a, &block_a, &state, true)
            .expect("the parent is the anchor");
        store
            .on_block(root_b, &block_b, &state, true)
            .expect("the parent is known");
        store
            .on_block(root_c, &block_c, &state, true)
            .expect("the parent is known");

        store.on_tick(3, 0);

        let lesser = root_b.min(root_c);
        let greater = root_b.max(root_c);

        store.on_attestation(0, vote_for(lesser, 2));
        assert_eq!(store.head(), lesser);

        // An equal target slot does not replace the previous vote.
        store.on_attestation(0, vote_for(greater, 2));
        assert_eq!(store.head(), lesser);
    }

    /// A vote cast in the current slot for an untimely block only gains
    /// weight once the slot turns over.
    #[test]
    fn untimely_blocks_receive_their_votes_a_slot_late() {
        let state = genesis_state(2);
        let mut store = Store::for_genesis(&state);
        let anchor = store.head();

        let (root_a, block_a) = block(1, anchor, H256::repeat_byte(0x01));
        let (root_b, block_b) = block(1, anchor, H256::repeat_byte(0x02));

        let greater = root_a.max(root_b);
        let lesser = root_a.min(root_b);

        store.on_tick(1, 0);

        // Only the greater sibling arrived on time.
        store
            .on_block(root_a, &block_a, &state, root_a == greater)
            .expect("the parent is the anchor");
        store
            .on_block(root_b, &block_b, &state, root_b == greater)
            .expect("the parent is the anchor");

        store.on_attestation(0, vote_for(lesser, 1));

        assert_eq!(
            store.head(),
            greater,
            "a same-slot vote for an untimely block carries no weight",
        );

        store.on_tick(2, 0);

        assert_eq!(
            store.head(),
            lesser,
            "the vote becomes eligible once the slot advances",
        );
    }

    #[test]
    fn checkpoints_mirror_post_states_monotonically() {
        let state = genesis_state(2);
        let mut store = Store::for_genesis(&state);
        let anchor = store.head();

        let (root_a, block_a) = block(1, anchor, H256::repeat_byte(0x01));

        let mut justifying_state = genesis_state(2);
        justifying_state.latest_justified = checkpoint(root_a, 1);
        justifying_state.latest_finalized = checkpoint(anchor, 0);

        store
            .on_block(root_a, &block_a, &justifying_state, true)
            .expect("the parent is the anchor");

        assert_eq!(store.justified_checkpoint(), checkpoint(root_a, 1));
        assert_eq!(store.finalized_checkpoint(), checkpoint(anchor, 0));

        // An older justification does not regress the store.
        let (root_b, block_b) = block(2, root_a, H256::repeat_byte(0x02));
        let stale_state = genesis_state(2);

        store
            .on_block(root_b, &block_b, &stale_state, true)
            .expect("the parent is known");

        assert_eq!(store.justified_checkpoint(), checkpoint(root_a, 1));
    }

    #[test]
    fn finalization_cannot_switch_branches() {
        let state = genesis_state(2);
        let mut store = Store::for_genesis(&state);
        let anchor = store.head();

        let (root_a, block_a) = block(1, anchor, H256::repeat_byte(0x01));
        let (root_b, block_b) = block(1, anchor, H256::repeat_byte(0x02));

        let mut finalizing_a = genesis_state(2);
        finalizing_a.latest_justified = checkpoint(root_a, 1);
        finalizing_a.latest_finalized = checkpoint(root_a, 1);

        store
            .on_block(root_a, &block_a, &finalizing_a, true)
            .expect("the parent is the anchor");

        let (root_c, block_c) = block(2, root_b, H256::repeat_byte(0x03));

        store
            .on_block(root_b, &block_b, &state, true)
            .expect("the parent is the anchor");

        let mut finalizing_b = genesis_state(2);
        finalizing_b.latest_justified = checkpoint(root_b, 2);
        finalizing_b.latest_finalized = checkpoint(root_b, 2);

        assert_eq!(
            store.on_block(root_c, &block_c, &finalizing_b, true),
            Err(Error::FinalizedRegression {
                old: checkpoint(root_a, 1),
                new: checkpoint(root_b, 2),
            }),
        );
    }
}
