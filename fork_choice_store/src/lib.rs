pub use crate::{
    error::Error,
    misc::{ProtoBlock, VoteRecord},
    store::Store,
};

mod error;
mod misc;
mod store;
