//! The post-quantum signature contract: a stateful hash-based scheme in the
//! Generalized XMSS shape. A key covers a window of epochs; every epoch may
//! sign at most one message. Container layout, key/sign/verify surface and
//! the last-used-epoch guard are the normative parts; the chain construction
//! itself is a self-contained Winternitz instantiation over SHA-256.

pub use crate::{
    error::Error,
    public_key_bytes::PublicKeyBytes,
    secret_key::SecretKey,
    signature::Signature,
};

pub mod consts;
pub mod devnet;

mod chains;
mod error;
mod public_key_bytes;
mod secret_key;
mod signature;
