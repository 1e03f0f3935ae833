use ethereum_types::H256;
use sha2::{Digest as _, Sha256};
use ssz::{ByteVector, ContiguousList};

use crate::{
    chains,
    consts::{CHAIN_LENGTH, NUM_CHAINS, PARAMETER_BYTES, RAND_BYTES},
    error::Error,
    public_key_bytes::PublicKeyBytes,
    signature::Signature,
};

/// A signing key covering `num_active_epochs` epochs starting at
/// `activation_epoch`. Holds the full merkle tree over its one-time keys so
/// signing is a lookup, and the last-used-epoch high-water mark that keeps
/// the stateful scheme from reusing an epoch.
#[derive(Clone)]
pub struct SecretKey {
    seed: H256,
    parameter: [u8; PARAMETER_BYTES],
    activation_epoch: u32,
    num_active_epochs: u32,
    // tree[0] holds the leaves padded to a power of two, the last level the root.
    tree: Vec<Vec<H256>>,
    last_signed_epoch: Option<u32>,
}

impl SecretKey {
    /// Derives the key material for the window and builds the merkle tree
    /// over its one-time public keys.
    ///
    /// The activation epoch must be aligned to the padded window size so
    /// that verifiers can recover the leaf position from the epoch alone.
    pub fn generate(
        seed: H256,
        activation_epoch: u32,
        num_active_epochs: u32,
    ) -> Result<Self, Error> {
        let padded = u64::from(num_active_epochs.max(1)).next_power_of_two();

        if num_active_epochs == 0 || u64::from(activation_epoch) % padded != 0 {
            return Err(Error::EpochOutsideWindow {
                epoch: activation_epoch,
                activation_epoch,
                num_active_epochs,
            });
        }

        let parameter = derive_parameter(seed);

        let mut leaves = (0..num_active_epochs)
            .map(|offset| {
                let epoch = activation_epoch + offset;

                let chain_ends = (0..NUM_CHAINS)
                    .map(|chain| {
                        let start = chain_start(seed, epoch, chain);
                        chains::advance_chain(&parameter, epoch, chain, 0, CHAIN_LENGTH, start)
                    })
                    .collect::<Vec<_>>();

                chains::leaf_hash(&parameter, epoch, &chain_ends)
            })
            .collect::<Vec<_>>();

        leaves.resize(padded as usize, H256::zero());

        let mut tree = vec![leaves];

        while tree.last().expect("tree starts with the leaf level").len() > 1 {
            let level = tree
                .last()
                .expect("tree starts with the leaf level")
                .chunks_exact(2)
                .map(|pair| hashing::hash_256_256(pair[0], pair[1]))
                .collect();

            tree.push(level);
        }

        Ok(Self {
            seed,
            parameter,
            activation_epoch,
            num_active_epochs,
            tree,
            last_signed_epoch: None,
        })
    }

    #[must_use]
    pub fn to_public_key(&self) -> PublicKeyBytes {
        let root = self.tree.last().expect("the tree always has a root")[0];
        PublicKeyBytes::new(root, self.parameter)
    }

    #[must_use]
    pub const fn activation_epoch(&self) -> u32 {
        self.activation_epoch
    }

    #[must_use]
    pub const fn num_active_epochs(&self) -> u32 {
        self.num_active_epochs
    }

    #[must_use]
    pub const fn last_signed_epoch(&self) -> Option<u32> {
        self.last_signed_epoch
    }

    /// Restores the high-water mark persisted by the caller. Keeps the
    /// higher of the two values so a stale file cannot unlock an epoch.
    pub fn restore_last_signed_epoch(&mut self, epoch: u32) {
        self.last_signed_epoch = Some(self.last_signed_epoch.map_or(epoch, |last| last.max(epoch)));
    }

    /// Signs `message_root` at `epoch` and advances the high-water mark.
    ///
    /// Fails if the epoch is outside the key's window or not strictly above
    /// the last epoch signed at.
    pub fn sign(&mut self, message_root: H256, epoch: u32) -> Result<Signature, Error> {
        let in_window = self.activation_epoch <= epoch
            && u64::from(epoch) < u64::from(self.activation_epoch) + u64::from(self.num_active_epochs);

        if !in_window {
            return Err(Error::EpochOutsideWindow {
                epoch,
                activation_epoch: self.activation_epoch,
                num_active_epochs: self.num_active_epochs,
            });
        }

        if let Some(last_signed) = self.last_signed_epoch {
            if epoch <= last_signed {
                return Err(Error::EpochAlreadyUsed {
                    last_signed,
                    requested: epoch,
                });
            }
        }

        let rho = derive_rho(self.seed, epoch, message_root);
        let steps = chains::digest_steps(&rho, message_root);

        let hashes = (0..NUM_CHAINS)
            .map(|chain| {
                let start = chain_start(self.seed, epoch, chain);
                chains::advance_chain(&self.parameter, epoch, chain, 0, steps[chain], start)
            })
            .collect::<Vec<_>>();

        let mut auth_path = Vec::with_capacity(self.tree.len() - 1);
        let mut index = (epoch - self.activation_epoch) as usize;

        for level in &self.tree[..self.tree.len() - 1] {
            auth_path.push(level[index ^ 1]);
            index >>= 1;
        }

        self.last_signed_epoch = Some(epoch);

        Ok(Signature {
            auth_path: ContiguousList::try_from(auth_path)
                .expect("a key lifetime of 2³² epochs bounds the path to 32 nodes"),
            rho: ByteVector::try_from(rho.as_slice())
                .expect("the randomizer is always 28 bytes"),
            hashes: ContiguousList::try_from(hashes)
                .expect("the chain count is far below the list limit"),
        })
    }
}

fn derive_parameter(seed: H256) -> [u8; PARAMETER_BYTES] {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(b"param");

    hasher.finalize()[..PARAMETER_BYTES]
        .try_into()
        .expect("a SHA-256 digest is longer than the parameter")
}

fn chain_start(seed: H256, epoch: u32, chain: usize) -> H256 {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(b"chain");
    hasher.update(epoch.to_le_bytes());
    hasher.update((chain as u32).to_le_bytes());
    H256::from_slice(hasher.finalize().as_slice())
}

fn derive_rho(seed: H256, epoch: u32, message_root: H256) -> [u8; RAND_BYTES] {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(b"rho");
    hasher.update(epoch.to_le_bytes());
    hasher.update(message_root.as_bytes());

    hasher.finalize()[..RAND_BYTES]
        .try_into()
        .expect("a SHA-256 digest is longer than the randomizer")
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use crate::consts::PUBLIC_KEY_BYTES;

    use super::*;

    fn key() -> SecretKey {
        SecretKey::generate(H256::repeat_byte(0x42), 0, 8).expect("the window is aligned")
    }

    #[test]
    fn public_keys_are_52_bytes_and_deterministic() {
        let public_key = key().to_public_key();

        assert_eq!(public_key.as_ref().len(), PUBLIC_KEY_BYTES);
        assert_eq!(public_key, key().to_public_key());
    }

    #[test]
    fn signatures_verify_at_their_epoch() -> Result<(), Error> {
        let mut secret_key = key();
        let public_key = secret_key.to_public_key();
        let message_root = H256::repeat_byte(0x0f);

        let signature = secret_key.sign(message_root, 3)?;

        public_key.verify(message_root, 3, &signature)
    }

    #[test_case(2; "earlier epoch")]
    #[test_case(4; "later epoch")]
    fn signatures_do_not_rebind_to_other_epochs(other_epoch: u32) {
        let mut secret_key = key();
        let public_key = secret_key.to_public_key();
        let message_root = H256::repeat_byte(0x0f);

        let signature = secret_key
            .sign(message_root, 3)
            .expect("epoch 3 is in the window");

        assert!(public_key.verify(message_root, other_epoch, &signature).is_err());
    }

    #[test]
    fn tampered_messages_do_not_verify() {
        let mut secret_key = key();
        let public_key = secret_key.to_public_key();

        let signature = secret_key
            .sign(H256::repeat_byte(0x0f), 3)
            .expect("epoch 3 is in the window");

        assert_eq!(
            public_key.verify(H256::repeat_byte(0x10), 3, &signature),
            Err(Error::RootMismatch),
        );
    }

    #[test]
    fn epochs_cannot_be_reused_or_rewound() {
        let mut secret_key = key();
        let message_root = H256::zero();

        secret_key
            .sign(message_root, 3)
            .expect("epoch 3 is in the window");

        assert_eq!(
            secret_key.sign(message_root, 3),
            Err(Error::EpochAlreadyUsed {
                last_signed: 3,
                requested: 3,
            }),
        );

        assert_eq!(
            secret_key.sign(message_root, 1),
            Err(Error::EpochAlreadyUsed {
                last_signed: 3,
                requested: 1,
            }),
        );

        secret_key
            .sign(message_root, 4)
            .expect("epoch 4 is past the high-water mark");
    }

    #[test]
    fn restored_high_water_mark_never_goes_backwards() {
        let mut secret_key = key();

        secret_key.restore_last_signed_epoch(5);
        secret_key.restore_last_signed_epoch(2);

        assert_eq!(secret_key.last_signed_epoch(), Some(5));
        assert!(secret_key.sign(H256::zero(), 5).is_err());
    }

    #[test]
    fn epochs_outside_the_window_are_rejected() {
        let mut secret_key = key();

        assert_eq!(
            secret_key.sign(H256::zero(), 8),
            Err(Error::EpochOutsideWindow {
                epoch: 8,
                activation_epoch: 0,
                num_active_epochs: 8,
            }),
        );
    }

    #[test]
    fn signatures_survive_the_wire_encoding() {
        use ssz::SszWrite as _;

        let mut secret_key = key();
        let public_key = secret_key.to_public_key();
        let message_root = H256::repeat_byte(0x77);

        let signature = secret_key
            .sign(message_root, 0)
            .expect("epoch 0 is in the window");

        let bytes = signature.to_ssz().expect("signatures are encodable");

        public_key
            .verify_bytes(message_root, 0, &bytes)
            .expect("decoded signatures verify");
    }
}
