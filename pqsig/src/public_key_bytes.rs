use core::{
    fmt::{Debug, Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use derive_more::{AsRef, From};
use ethereum_types::H256;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use ssz::{ReadError, Size, SszHash, SszRead, SszSize, SszWrite};

use crate::{
    consts::{PARAMETER_BYTES, PUBLIC_KEY_BYTES},
    error::Error,
    signature::Signature,
};

/// The 52-byte serialized form of a public key: the merkle root over the
/// key's one-time public keys followed by the public parameter.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, AsRef, From)]
#[as_ref(forward)]
pub struct PublicKeyBytes([u8; PUBLIC_KEY_BYTES]);

// `Default` is not derivable for arrays this long.
impl Default for PublicKeyBytes {
    fn default() -> Self {
        Self([0; PUBLIC_KEY_BYTES])
    }
}

impl TryFrom<&[u8]> for PublicKeyBytes {
    type Error = Error;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let bytes = slice
            .try_into()
            .map_err(|_| Error::InvalidPublicKeyLength {
                expected: PUBLIC_KEY_BYTES,
                actual: slice.len(),
            })?;

        Ok(Self(bytes))
    }
}

impl Debug for PublicKeyBytes {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        write!(formatter, "PublicKeyBytes({self})")
    }
}

impl Display for PublicKeyBytes {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        write!(formatter, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for PublicKeyBytes {
    type Err = Error;

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        let digits = string.strip_prefix("0x").unwrap_or(string);
        let bytes = hex::decode(digits).map_err(|_| Error::InvalidPublicKeyLength {
            expected: PUBLIC_KEY_BYTES,
            actual: digits.len() / 2,
        })?;

        bytes.as_slice().try_into()
    }
}

impl Serialize for PublicKeyBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PublicKeyBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let string = String::deserialize(deserializer)?;
        string.parse().map_err(D::Error::custom)
    }
}

impl SszSize for PublicKeyBytes {
    const SIZE: Size = Size::Fixed {
        size: PUBLIC_KEY_BYTES,
    };
}

impl SszRead for PublicKeyBytes {
    fn from_ssz_unchecked(bytes: &[u8]) -> Result<Self, ReadError> {
        let mut public_key = Self::default();
        public_key.0.copy_from_slice(bytes);
        Ok(public_key)
    }
}

impl SszWrite for PublicKeyBytes {
    fn write_fixed(&self, bytes: &mut [u8]) {
        bytes.copy_from_slice(&self.0);
    }
}

impl SszHash for PublicKeyBytes {
    type PackingFactor = typenum::U1;

    fn hash_tree_root(&self) -> H256 {
        ssz::merkleize_bytes(self.0, ssz::depth_for_bytes(PUBLIC_KEY_BYTES as u64))
    }
}

impl PublicKeyBytes {
    #[must_use]
    pub fn root(self) -> H256 {
        H256::from_slice(&self.0[..32])
    }

    #[must_use]
    pub fn parameter(self) -> [u8; PARAMETER_BYTES] {
        self.0[32..]
            .try_into()
            .expect("the tail of a 52-byte key is 20 bytes")
    }

    #[must_use]
    pub const fn new(root: H256, parameter: [u8; PARAMETER_BYTES]) -> Self {
        let mut bytes = [0; PUBLIC_KEY_BYTES];
        let root = root.0;

        let mut index = 0;
        while index < 32 {
            bytes[index] = root[index];
            index += 1;
        }

        let mut index = 0;
        while index < PARAMETER_BYTES {
            bytes[32 + index] = parameter[index];
            index += 1;
        }

        Self(bytes)
    }

    /// Verifies `signature` over `message_root` at `epoch`.
    ///
    /// The epoch binds the signature to one leaf of the key; the same
    /// signature presented at any other epoch fails.
    pub fn verify(
        self,
        message_root: H256,
        epoch: u32,
        signature: &Signature,
    ) -> Result<(), Error> {
        signature.verify_against(self, message_root, epoch)
    }

    /// Verifies a wire-encoded signature, the form gossip carries.
    pub fn verify_bytes(
        self,
        message_root: H256,
        epoch: u32,
        signature_bytes: &[u8],
    ) -> Result<(), Error> {
        let signature =
            Signature::from_ssz(signature_bytes).map_err(|_| Error::InvalidSignatureBytes)?;
        self.verify(message_root, epoch, &signature)
    }
}
