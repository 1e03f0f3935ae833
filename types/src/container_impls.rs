//! Hand-written SSZ impls for the protocol containers.
//!
//! The encoding is the standard one: fixed-size fields inline, 4-byte
//! little-endian offsets for variable-size fields, tree-hash roots formed
//! from the balanced tree of field roots.

use pqsig::Signature;
use ssz::{
    merkleize_container, read_offset, subslice, write_offset, ContiguousList, ReadError, Size,
    SszHash, SszRead, SszSize, SszWrite, WriteError, H256,
};

use crate::{
    containers::{
        AttestationData, Block, BlockBody, BlockHeader, ChainConfig, Checkpoint, SignedBlock,
        SignedVote,
    },
    state::State,
};

const CHECKPOINT_SIZE: usize = 40;
const BLOCK_HEADER_SIZE: usize = 112;
const ATTESTATION_DATA_SIZE: usize = 8 + 3 * CHECKPOINT_SIZE;
const CHAIN_CONFIG_SIZE: usize = 16;

const SIGNED_VOTE_FIXED_PART: usize = 8 + ATTESTATION_DATA_SIZE + 4;
const BLOCK_BODY_FIXED_PART: usize = 4;
const BLOCK_FIXED_PART: usize = 8 + 8 + 32 + 32 + 4;
const SIGNED_BLOCK_FIXED_PART: usize = 4 + 4;
const STATE_FIXED_PART: usize =
    CHAIN_CONFIG_SIZE + 8 + BLOCK_HEADER_SIZE + 2 * CHECKPOINT_SIZE + 4 * 4;

impl SszSize for ChainConfig {
    const SIZE: Size = Size::Fixed {
        size: CHAIN_CONFIG_SIZE,
    };
}

impl SszRead for ChainConfig {
    fn from_ssz_unchecked(bytes: &[u8]) -> Result<Self, ReadError> {
        Ok(Self {
            num_validators: u64::from_ssz_unchecked(&bytes[0..8])?,
            genesis_time: u64::from_ssz_unchecked(&bytes[8..16])?,
        })
    }
}

impl SszWrite for ChainConfig {
    fn write_fixed(&self, bytes: &mut [u8]) {
        self.num_validators.write_fixed(&mut bytes[0..8]);
        self.genesis_time.write_fixed(&mut bytes[8..16]);
    }
}

impl SszHash for ChainConfig {
    type PackingFactor = typenum::U1;

    fn hash_tree_root(&self) -> H256 {
        merkleize_container([
            self.num_validators.hash_tree_root(),
            self.genesis_time.hash_tree_root(),
        ])
    }
}

impl SszSize for Checkpoint {
    const SIZE: Size = Size::Fixed {
        size: CHECKPOINT_SIZE,
    };
}

impl SszRead for Checkpoint {
    fn from_ssz_unchecked(bytes: &[u8]) -> Result<Self, ReadError> {
        Ok(Self {
            root: H256::from_ssz_unchecked(&bytes[0..32])?,
            slot: u64::from_ssz_unchecked(&bytes[32..40])?,
        })
    }
}

impl SszWrite for Checkpoint {
    fn write_fixed(&self, bytes: &mut [u8]) {
        self.root.write_fixed(&mut bytes[0..32]);
        self.slot.write_fixed(&mut bytes[32..40]);
    }
}

impl SszHash for Checkpoint {
    type PackingFactor = typenum::U1;

    fn hash_tree_root(&self) -> H256 {
        merkleize_container([self.root, self.slot.hash_tree_root()])
    }
}

impl SszSize for BlockHeader {
    const SIZE: Size = Size::Fixed {
        size: BLOCK_HEADER_SIZE,
    };
}

impl SszRead for BlockHeader {
    fn from_ssz_unchecked(bytes: &[u8]) -> Result<Self, ReadError> {
        Ok(Self {
            slot: u64::from_ssz_unchecked(&bytes[0..8])?,
            proposer_index: u64::from_ssz_unchecked(&bytes[8..16])?,
            parent_root: H256::from_ssz_unchecked(&bytes[16..48])?,
            state_root: H256::from_ssz_unchecked(&bytes[48..80])?,
            body_root: H256::from_ssz_unchecked(&bytes[80..112])?,
        })
    }
}

impl SszWrite for BlockHeader {
    fn write_fixed(&self, bytes: &mut [u8]) {
        self.slot.write_fixed(&mut bytes[0..8]);
        self.proposer_index.write_fixed(&mut bytes[8..16]);
        self.parent_root.write_fixed(&mut bytes[16..48]);
        self.state_root.write_fixed(&mut bytes[48..80]);
        self.body_root.write_fixed(&mut bytes[80..112]);
    }
}

impl SszHash for BlockHeader {
    type PackingFactor = typenum::U1;

    fn hash_tree_root(&self) -> H256 {
        merkleize_container([
            self.slot.hash_tree_root(),
            self.proposer_index.hash_tree_root(),
            self.parent_root,
            self.state_root,
            self.body_root,
        ])
    }
}

impl SszSize for AttestationData {
    const SIZE: Size = Size::Fixed {
        size: ATTESTATION_DATA_SIZE,
    };
}

impl SszRead for AttestationData {
    fn from_ssz_unchecked(bytes: &[u8]) -> Result<Self, ReadError> {
        Ok(Self {
            slot: u64::from_ssz_unchecked(&bytes[0..8])?,
            head: Checkpoint::from_ssz_unchecked(&bytes[8..48])?,
            target: Checkpoint::from_ssz_unchecked(&bytes[48..88])?,
            source: Checkpoint::from_ssz_unchecked(&bytes[88..128])?,
        })
    }
}

impl SszWrite for AttestationData {
    fn write_fixed(&self, bytes: &mut [u8]) {
        self.slot.write_fixed(&mut bytes[0..8]);
        self.head.write_fixed(&mut bytes[8..48]);
        self.target.write_fixed(&mut bytes[48..88]);
        self.source.write_fixed(&mut bytes[88..128]);
    }
}

impl SszHash for AttestationData {
    type PackingFactor = typenum::U1;

    fn hash_tree_root(&self) -> H256 {
        merkleize_container([
            self.slot.hash_tree_root(),
            self.head.hash_tree_root(),
            self.target.hash_tree_root(),
            self.source.hash_tree_root(),
        ])
    }
}

impl SszSize for SignedVote {
    const SIZE: Size = Size::Variable {
        minimum_size: SIGNED_VOTE_FIXED_PART,
    };
}

impl SszRead for SignedVote {
    fn from_ssz_unchecked(bytes: &[u8]) -> Result<Self, ReadError> {
        let validator_id = u64::from_ssz(subslice(bytes, 0..8)?)?;
        let data = AttestationData::from_ssz(subslice(bytes, 8..8 + ATTESTATION_DATA_SIZE)?)?;

        let signature_offset = read_offset(bytes, 8 + ATTESTATION_DATA_SIZE)?;

        if signature_offset != SIGNED_VOTE_FIXED_PART {
            return Err(ReadError::ContainerFirstOffsetMismatch {
                expected: SIGNED_VOTE_FIXED_PART,
                actual: signature_offset,
            });
        }

        let signature = Signature::from_ssz(subslice(bytes, signature_offset..bytes.len())?)?;

        Ok(Self {
            validator_id,
            data,
            signature,
        })
    }
}

impl SszWrite for SignedVote {
    fn write_variable(&self, bytes: &mut Vec<u8>) -> Result<(), WriteError> {
        let start = bytes.len();

        bytes.resize(start + SIGNED_VOTE_FIXED_PART, 0);

        self.validator_id.write_fixed(&mut bytes[start..start + 8]);
        self.data
            .write_fixed(&mut bytes[start + 8..start + 8 + ATTESTATION_DATA_SIZE]);

        let offset = bytes.len() - start;
        write_offset(bytes, start + 8 + ATTESTATION_DATA_SIZE, offset)?;
        self.signature.write_variable(bytes)?;

        Ok(())
    }
}

impl SszHash for SignedVote {
    type PackingFactor = typenum::U1;

    fn hash_tree_root(&self) -> H256 {
        merkleize_container([
            self.validator_id.hash_tree_root(),
            self.data.hash_tree_root(),
            self.signature.hash_tree_root(),
        ])
    }
}

impl SszSize for BlockBody {
    const SIZE: Size = Size::Variable {
        minimum_size: BLOCK_BODY_FIXED_PART,
    };
}

impl SszRead for BlockBody {
    fn from_ssz_unchecked(bytes: &[u8]) -> Result<Self, ReadError> {
        let attestations_offset = read_offset(bytes, 0)?;

        if attestations_offset != BLOCK_BODY_FIXED_PART {
            return Err(ReadError::ContainerFirstOffsetMismatch {
                expected: BLOCK_BODY_FIXED_PART,
                actual: attestations_offset,
            });
        }

        let attestations =
            ContiguousList::from_ssz(subslice(bytes, attestations_offset..bytes.len())?)?;

        Ok(Self { attestations })
    }
}

impl SszWrite for BlockBody {
    fn write_variable(&self, bytes: &mut Vec<u8>) -> Result<(), WriteError> {
        let start = bytes.len();

        bytes.resize(start + BLOCK_BODY_FIXED_PART, 0);

        let offset = bytes.len() - start;
        write_offset(bytes, start, offset)?;
        self.attestations.write_variable(bytes)?;

        Ok(())
    }
}

impl SszHash for BlockBody {
    type PackingFactor = typenum::U1;

    fn hash_tree_root(&self) -> H256 {
        merkleize_container([self.attestations.hash_tree_root()])
    }
}

impl SszSize for Block {
    const SIZE: Size = Size::Variable {
        minimum_size: BLOCK_FIXED_PART,
    };
}

impl SszRead for Block {
    fn from_ssz_unchecked(bytes: &[u8]) -> Result<Self, ReadError> {
        let slot = u64::from_ssz(subslice(bytes, 0..8)?)?;
        let proposer_index = u64::from_ssz(subslice(bytes, 8..16)?)?;
        let parent_root = H256::from_ssz(subslice(bytes, 16..48)?)?;
        let state_root = H256::from_ssz(subslice(bytes, 48..80)?)?;

        let body_offset = read_offset(bytes, 80)?;

        if body_offset != BLOCK_FIXED_PART {
            return Err(ReadError::ContainerFirstOffsetMismatch {
                expected: BLOCK_FIXED_PART,
                actual: body_offset,
            });
        }

        let body = BlockBody::from_ssz(subslice(bytes, body_offset..bytes.len())?)?;

        Ok(Self {
            slot,
            proposer_index,
            parent_root,
            state_root,
            body,
        })
    }
}

impl SszWrite for Block {
    fn write_variable(&self, bytes: &mut Vec<u8>) -> Result<(), WriteError> {
        let start = bytes.len();

        bytes.resize(start + BLOCK_FIXED_PART, 0);

        self.slot.write_fixed(&mut bytes[start..start + 8]);
        self.proposer_index
            .write_fixed(&mut bytes[start + 8..start + 16]);
        self.parent_root
            .write_fixed(&mut bytes[start + 16..start + 48]);
        self.state_root
            .write_fixed(&mut bytes[start + 48..start + 80]);

        let offset = bytes.len() - start;
        write_offset(bytes, start + 80, offset)?;
        self.body.write_variable(bytes)?;

        Ok(())
    }
}

impl SszHash for Block {
    type PackingFactor = typenum::U1;

    fn hash_tree_root(&self) -> H256 {
        merkleize_container([
            self.slot.hash_tree_root(),
            self.proposer_index.hash_tree_root(),
            self.parent_root,
            self.state_root,
            self.body.hash_tree_root(),
        ])
    }
}

impl SszSize for SignedBlock {
    const SIZE: Size = Size::Variable {
        minimum_size: SIGNED_BLOCK_FIXED_PART,
    };
}

impl SszRead for SignedBlock {
    fn from_ssz_unchecked(bytes: &[u8]) -> Result<Self, ReadError> {
        let message_offset = read_offset(bytes, 0)?;
        let signature_offset = read_offset(bytes, 4)?;

        if message_offset != SIGNED_BLOCK_FIXED_PART {
            return Err(ReadError::ContainerFirstOffsetMismatch {
                expected: SIGNED_BLOCK_FIXED_PART,
                actual: message_offset,
            });
        }

        if signature_offset < message_offset {
            return Err(ReadError::OffsetsNotIncreasing {
                previous: message_offset,
                next: signature_offset,
            });
        }

        let message = Block::from_ssz(subslice(bytes, message_offset..signature_offset)?)?;
        let signature = Signature::from_ssz(subslice(bytes, signature_offset..bytes.len())?)?;

        Ok(Self { message, signature })
    }
}

impl SszWrite for SignedBlock {
    fn write_variable(&self, bytes: &mut Vec<u8>) -> Result<(), WriteError> {
        let start = bytes.len();

        bytes.resize(start + SIGNED_BLOCK_FIXED_PART, 0);

        let offset = bytes.len() - start;
        write_offset(bytes, start, offset)?;
        self.message.write_variable(bytes)?;

        let offset = bytes.len() - start;
        write_offset(bytes, start + 4, offset)?;
        self.signature.write_variable(bytes)?;

        Ok(())
    }
}

impl SszHash for SignedBlock {
    type PackingFactor = typenum::U1;

    fn hash_tree_root(&self) -> H256 {
        merkleize_container([
            self.message.hash_tree_root(),
            self.signature.hash_tree_root(),
        ])
    }
}

impl SszSize for State {
    const SIZE: Size = Size::Variable {
        minimum_size: STATE_FIXED_PART,
    };
}

impl SszRead for State {
    fn from_ssz_unchecked(bytes: &[u8]) -> Result<Self, ReadError> {
        let config = ChainConfig::from_ssz(subslice(bytes, 0..16)?)?;
        let slot = u64::from_ssz(subslice(bytes, 16..24)?)?;
        let latest_block_header = BlockHeader::from_ssz(subslice(bytes, 24..136)?)?;
        let latest_justified = Checkpoint::from_ssz(subslice(bytes, 136..176)?)?;
        let latest_finalized = Checkpoint::from_ssz(subslice(bytes, 176..216)?)?;

        let offsets = [
            read_offset(bytes, 216)?,
            read_offset(bytes, 220)?,
            read_offset(bytes, 224)?,
            read_offset(bytes, 228)?,
        ];

        if offsets[0] != STATE_FIXED_PART {
            return Err(ReadError::ContainerFirstOffsetMismatch {
                expected: STATE_FIXED_PART,
                actual: offsets[0],
            });
        }

        for pair in offsets.windows(2) {
            if pair[1] < pair[0] {
                return Err(ReadError::OffsetsNotIncreasing {
                    previous: pair[0],
                    next: pair[1],
                });
            }
        }

        Ok(Self {
            config,
            slot,
            latest_block_header,
            latest_justified,
            latest_finalized,
            historical_block_hashes: ContiguousList::from_ssz(subslice(
                bytes,
                offsets[0]..offsets[1],
            )?)?,
            justified_slots: ssz::BitList::from_ssz(subslice(bytes, offsets[1]..offsets[2])?)?,
            justifications_roots: ContiguousList::from_ssz(subslice(
                bytes,
                offsets[2]..offsets[3],
            )?)?,
            justifications_validators: ssz::BitList::from_ssz(subslice(
                bytes,
                offsets[3]..bytes.len(),
            )?)?,
        })
    }
}

impl SszWrite for State {
    fn write_variable(&self, bytes: &mut Vec<u8>) -> Result<(), WriteError> {
        let start = bytes.len();

        bytes.resize(start + STATE_FIXED_PART, 0);

        self.config.write_fixed(&mut bytes[start..start + 16]);
        self.slot.write_fixed(&mut bytes[start + 16..start + 24]);
        self.latest_block_header
            .write_fixed(&mut bytes[start + 24..start + 136]);
        self.latest_justified
            .write_fixed(&mut bytes[start + 136..start + 176]);
        self.latest_finalized
            .write_fixed(&mut bytes[start + 176..start + 216]);

        let offset = bytes.len() - start;
        write_offset(bytes, start + 216, offset)?;
        self.historical_block_hashes.write_variable(bytes)?;

        let offset = bytes.len() - start;
        write_offset(bytes, start + 220, offset)?;
        self.justified_slots.write_variable(bytes)?;

        let offset = bytes.len() - start;
        write_offset(bytes, start + 224, offset)?;
        self.justifications_roots.write_variable(bytes)?;

        let offset = bytes.len() - start;
        write_offset(bytes, start + 228, offset)?;
        self.justifications_validators.write_variable(bytes)?;

        Ok(())
    }
}

impl SszHash for State {
    type PackingFactor = typenum::U1;

    fn hash_tree_root(&self) -> H256 {
        merkleize_container([
            self.config.hash_tree_root(),
            self.slot.hash_tree_root(),
            self.latest_block_header.hash_tree_root(),
            self.latest_justified.hash_tree_root(),
            self.latest_finalized.hash_tree_root(),
            self.historical_block_hashes.hash_tree_root(),
            self.justified_slots.hash_tree_root(),
            self.justifications_roots.hash_tree_root(),
            self.justifications_validators.hash_tree_root(),
        ])
    }
}
