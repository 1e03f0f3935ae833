use thiserror::Error;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum Error {
    #[error("epoch {requested} was already used (last signed epoch: {last_signed})")]
    EpochAlreadyUsed { last_signed: u32, requested: u32 },
    #[error(
        "epoch {epoch} is outside the key's window \
         (activation_epoch: {activation_epoch}, num_active_epochs: {num_active_epochs})"
    )]
    EpochOutsideWindow {
        epoch: u32,
        activation_epoch: u32,
        num_active_epochs: u32,
    },
    #[error("signature carries {actual} hash digests, expected {expected}")]
    WrongChainCount { expected: usize, actual: usize },
    #[error("authentication path has {actual} nodes, expected {expected}")]
    WrongPathLength { expected: usize, actual: usize },
    #[error("signature does not verify against the public key root")]
    RootMismatch,
    #[error("public key must be {expected} bytes, found {actual}")]
    InvalidPublicKeyLength { expected: usize, actual: usize },
    #[error("signature bytes are not a valid signature container")]
    InvalidSignatureBytes,
}
