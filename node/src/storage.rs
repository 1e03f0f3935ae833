//! Blocks and post-states by block root, plus the finalized anchor record
//! used for crash recovery. Writes go through [`database::Database`], which
//! commits before returning.

use anyhow::Result;
use database::Database;
use ssz::{SszRead as _, SszWrite as _};
use types::{
    containers::{Checkpoint, SignedBlock},
    primitives::{ValidatorIndex, H256},
    state::State,
};

const BLOCK_PREFIX: &[u8] = b"blk:";
const STATE_PREFIX: &[u8] = b"ste:";
const EPOCH_PREFIX: &[u8] = b"sig:";
const FINALIZED_KEY: &[u8] = b"finalized";

pub struct Storage {
    database: Database,
}

impl Storage {
    #[must_use]
    pub const fn new(database: Database) -> Self {
        Self { database }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Database::in_memory())
    }

    pub fn has_block(&self, block_root: H256) -> Result<bool> {
        self.database.contains_key(key(BLOCK_PREFIX, block_root))
    }

    pub fn put_block(&self, block_root: H256, block: &SignedBlock) -> Result<()> {
        self.database.put(key(BLOCK_PREFIX, block_root), block.to_ssz()?)
    }

    pub fn block(&self, block_root: H256) -> Result<Option<SignedBlock>> {
        self.database
            .get(key(BLOCK_PREFIX, block_root))?
            .map(|bytes| SignedBlock::from_ssz(bytes).map_err(Into::into))
            .transpose()
    }

    pub fn put_state(&self, block_root: H256, state: &State) -> Result<()> {
        self.database.put(key(STATE_PREFIX, block_root), state.to_ssz()?)
    }

    pub fn state(&self, block_root: H256) -> Result<Option<State>> {
        self.database
            .get(key(STATE_PREFIX, block_root))?
            .map(|bytes| State::from_ssz(bytes).map_err(Into::into))
            .transpose()
    }

    pub fn put_finalized_checkpoint(&self, checkpoint: Checkpoint) -> Result<()> {
        self.database.put(FINALIZED_KEY, checkpoint.to_ssz()?)
    }

    pub fn finalized_checkpoint(&self) -> Result<Option<Checkpoint>> {
        self.database
            .get(FINALIZED_KEY)?
            .map(|bytes| Checkpoint::from_ssz(bytes).map_err(Into::into))
            .transpose()
    }

    /// The high-water mark of the stateful signature scheme. Persisted on
    /// every signature so a restart cannot reuse an epoch.
    pub fn put_last_signed_epoch(&self, validator: ValidatorIndex, epoch: u32) -> Result<()> {
        self.database
            .put(epoch_key(validator), epoch.to_le_bytes())
    }

    pub fn last_signed_epoch(&self, validator: ValidatorIndex) -> Result<Option<u32>> {
        self.database
            .get(epoch_key(validator))?
            .map(|bytes| {
                let bytes = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| anyhow::anyhow!("stored epoch record is malformed"))?;
                Ok(u32::from_le_bytes(bytes))
            })
            .transpose()
    }
}

fn epoch_key(validator: ValidatorIndex) -> Vec<u8> {
    let mut key = Vec::with_capacity(EPOCH_PREFIX.len() + 8);
    key.extend_from_slice(EPOCH_PREFIX);
    key.extend_from_slice(&validator.to_le_bytes());
    key
}

fn key(prefix: &[u8], root: H256) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + 32);
    key.extend_from_slice(prefix);
    key.extend_from_slice(root.as_bytes());
    key
}

#[cfg(test)]
mod tests {
    use types::containers::{Block, ChainConfig};

    use super::*;

    #[test]
    fn blocks_states_and_the_finalized_anchor_round_trip() -> Result<()> {
        let storage = Storage::in_memory();
        let root = H256::repeat_byte(0x01);

        assert!(!storage.has_block(root)?);
        assert_eq!(storage.block(root)?, None);

        let block = SignedBlock {
            message: Block {
                slot: 3,
                proposer_index: 1,
                parent_root: H256::repeat_byte(0x02),
                state_root: H256::repeat_byte(0x03),
                body: Default::default(),
            },
            signature: Default::default(),
        };

        let state = State {
            config: ChainConfig {
                num_validators: 2,
                genesis_time: 9,
            },
            slot: 3,
            ..State::default()
        };

        let checkpoint = Checkpoint { root, slot: 3 };

        storage.put_block(root, &block)?;
        storage.put_state(root, &state)?;
        storage.put_finalized_checkpoint(checkpoint)?;

        assert!(storage.has_block(root)?);
        assert_eq!(storage.block(root)?, Some(block));
        assert_eq!(storage.state(root)?, Some(state));
        assert_eq!(storage.finalized_checkpoint()?, Some(checkpoint));

        Ok(())
    }
}
