use core::fmt::{Display, Formatter, Result as FmtResult};

use thiserror::Error;

use types::primitives::Slot;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum Error {
    #[error("candidate slot {candidate} precedes finalized slot {finalized}")]
    CandidateBeforeFinalized { finalized: Slot, candidate: Slot },
    #[error("slot {slot} does not fit in a signature epoch")]
    SlotNotAnEpoch { slot: Slot },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SignatureKind {
    Block,
    Vote,
}

impl Display for SignatureKind {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        match self {
            Self::Block => formatter.write_str("block"),
            Self::Vote => formatter.write_str("vote"),
        }
    }
}
