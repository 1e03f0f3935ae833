//! Tree-hash and round-trip tests against reference vectors.
//!
//! The expected roots were produced by `scripts/gen_vectors.py`, an
//! independent hashlib-only implementation of the hashing rules. The
//! all-default genesis root for 4096 validators is also the value other
//! clients on the network agree on, so these vectors anchor the whole
//! container layout.

use hex_literal::hex;
use pqsig::SecretKey;
use ssz::{SszHash as _, SszRead as _, SszWrite as _, H256};

use hashing::ZERO_HASHES;

use crate::{
    containers::{
        AttestationData, Block, BlockBody, BlockHeader, ChainConfig, Checkpoint, SignedBlock,
        SignedVote,
    },
    state::State,
};

fn genesis_state(num_validators: u64) -> State {
    State {
        config: ChainConfig {
            num_validators,
            genesis_time: 0,
        },
        ..State::default()
    }
}

fn sample_attestation_data() -> AttestationData {
    AttestationData {
        slot: 7,
        head: Checkpoint {
            root: H256::repeat_byte(0xaa),
            slot: 7,
        },
        target: Checkpoint {
            root: H256::repeat_byte(0xbb),
            slot: 6,
        },
        source: Checkpoint {
            root: H256::repeat_byte(0x01),
            slot: 3,
        },
    }
}

fn sample_block() -> Block {
    Block {
        slot: 1,
        proposer_index: 1,
        parent_root: H256::repeat_byte(0xaa),
        state_root: H256::zero(),
        body: BlockBody::default(),
    }
}

#[test]
fn zeroed_fixed_containers_hash_to_zero_subtrees() {
    assert_eq!(Checkpoint::default().hash_tree_root(), ZERO_HASHES[1]);
    assert_eq!(BlockHeader::default().hash_tree_root(), ZERO_HASHES[3]);
}

#[test]
fn checkpoint_root_matches_the_reference_vector() {
    let checkpoint = Checkpoint {
        root: H256::repeat_byte(0x01),
        slot: 5,
    };

    assert_eq!(
        checkpoint.hash_tree_root(),
        H256(hex!(
            "644fd7e0aacdc1fce278db70a606ba562eb7f8be1a1d3c3aa5e3f4f0b682e248"
        )),
    );
}

#[test]
fn block_header_root_matches_the_reference_vector() {
    let header = BlockHeader {
        slot: 1,
        proposer_index: 1,
        parent_root: H256::repeat_byte(0xaa),
        state_root: H256::zero(),
        body_root: H256::repeat_byte(0xbb),
    };

    assert_eq!(
        header.hash_tree_root(),
        H256(hex!(
            "2f1ca47ff05b19656408fee3914b0a8d2fcbbdd7e4b668c900b15ed0ab679379"
        )),
    );
}

#[test]
fn attestation_data_root_matches_the_reference_vector() {
    assert_eq!(
        sample_attestation_data().hash_tree_root(),
        H256(hex!(
            "66153b481d4554587ee33dc6516b5c5697b396cc79e5cb57f16c17b1339d08cd"
        )),
    );
}

#[test]
fn chain_config_root_matches_the_reference_vector() {
    let config = ChainConfig {
        num_validators: 3,
        genesis_time: 0,
    };

    assert_eq!(
        config.hash_tree_root(),
        H256(hex!(
            "e7b4bb67551dde9589c1553dfda37a942a18caf184f9cc1629d25cf5c60be416"
        )),
    );
}

#[test]
fn empty_body_and_block_roots_match_the_reference_vectors() {
    assert_eq!(
        BlockBody::default().hash_tree_root(),
        H256(hex!(
            "dba9671bac9513c9482f1416a53aabd2c6ce90d5a5f865ce5a55c775325c9136"
        )),
    );

    assert_eq!(
        sample_block().hash_tree_root(),
        H256(hex!(
            "0522e5d5f1f33f82f2b628eec42aea6d1ea04327cc57ae53a5827d1e3ac21fdb"
        )),
    );
}

#[test]
fn default_signature_root_uses_the_container_layout() {
    // A flat hash of the encoding would not produce this; the signature
    // must merkleize as (auth_path, rho, hashes).
    assert_eq!(
        pqsig::Signature::default().hash_tree_root(),
        H256(hex!(
            "94299c3f0ca415054ff6ea087d3f55f9745976772ffbf546aad33f5a6e1d28b1"
        )),
    );
}

#[test]
fn genesis_state_roots_match_the_reference_vectors() {
    assert_eq!(
        genesis_state(2).hash_tree_root(),
        H256(hex!(
            "b070ac56f6a7b3f352293d013f5f8bdf133fa8396de141cff82d6c23adda2af3"
        )),
        "the two-validator genesis root diverged from the stored vector",
    );

    assert_eq!(
        genesis_state(3).hash_tree_root(),
        H256(hex!(
            "e3fe60856bdaeb290e769675d97d4006f3354c5c53ed7129f4379e0bc55f2db1"
        )),
        "the three-validator genesis root diverged from the stored vector",
    );

    // The cross-client interop value.
    assert_eq!(
        genesis_state(4096).hash_tree_root(),
        H256(hex!(
            "933fc69092f542e467681ac6cf9dae4a616ba5ea9c3c61f93cbcaf0be3548e01"
        )),
        "the 4096-validator genesis root diverged from the stored vector",
    );
}

#[test]
fn fixed_containers_round_trip() {
    let checkpoint = Checkpoint {
        root: H256::repeat_byte(0x17),
        slot: 42,
    };

    let bytes = checkpoint.to_ssz().expect("checkpoints are encodable");
    assert_eq!(bytes.len(), 40);
    assert_eq!(
        Checkpoint::from_ssz(bytes).expect("encoding round-trips"),
        checkpoint,
    );

    let data = sample_attestation_data();
    let bytes = data.to_ssz().expect("attestation data is encodable");
    assert_eq!(bytes.len(), 128);
    assert_eq!(
        AttestationData::from_ssz(bytes).expect("encoding round-trips"),
        data,
    );
}

#[test]
fn signed_containers_round_trip_with_real_signatures() {
    let mut secret_key =
        SecretKey::generate(H256::repeat_byte(0x33), 0, 8).expect("the window is aligned");

    let data = sample_attestation_data();
    let vote = SignedVote {
        validator_id: 1,
        data,
        signature: secret_key
            .sign(data.hash_tree_root(), 2)
            .expect("epoch 2 is in the window"),
    };

    let bytes = vote.to_ssz().expect("votes are encodable");
    assert_eq!(
        SignedVote::from_ssz(bytes).expect("encoding round-trips"),
        vote,
    );

    let block = sample_block();
    let signed_block = SignedBlock {
        signature: secret_key
            .sign(block.hash_tree_root(), 3)
            .expect("epoch 3 is in the window"),
        message: block,
    };

    let bytes = signed_block.to_ssz().expect("blocks are encodable");
    assert_eq!(
        SignedBlock::from_ssz(bytes).expect("encoding round-trips"),
        signed_block,
    );
}

#[test]
fn states_round_trip() {
    let mut state = genesis_state(3);

    state.slot = 2;
    state
        .historical_block_hashes
        .push(H256::repeat_byte(0x44))
        .expect("the history limit is 2^18");
    state
        .justified_slots
        .push(true)
        .expect("the history limit is 2^18");

    let mut justifications = state.justifications();
    let mut tally = ssz::BitList::with_length(3);
    tally.set(0, true);
    justifications.insert(H256::repeat_byte(0x44), tally);
    state.set_justifications(justifications);

    let bytes = state.to_ssz().expect("states are encodable");
    assert_eq!(State::from_ssz(bytes).expect("encoding round-trips"), state);
}

#[test]
fn state_decoding_rejects_misaligned_offsets() {
    let state = genesis_state(2);
    let mut bytes = state.to_ssz().expect("states are encodable");

    // Corrupt the first variable-part offset.
    bytes[216] = 0xff;

    assert!(State::from_ssz(bytes).is_err());
}
