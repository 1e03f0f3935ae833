use thiserror::Error;

use types::{containers::Checkpoint, primitives::H256};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum Error {
    #[error("block {block_root:?} has unknown parent {parent_root:?}")]
    UnknownParent { block_root: H256, parent_root: H256 },
    #[error(
        "finalized checkpoint would regress or switch branches \
         (old: {old:?}, new: {new:?})"
    )]
    FinalizedRegression { old: Checkpoint, new: Checkpoint },
}
