use core::time::Duration;

use thiserror::Error;

use crate::{InstantLike, SystemTimeLike};

pub type Timespec = Duration;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct FakeInstant(pub Timespec);

impl InstantLike for FakeInstant {
    fn checked_add(self, duration: Duration) -> Option<Self> {
        self.0.checked_add(duration).map(Self)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct FakeSystemTime(pub Timespec);

#[derive(Debug, Error)]
#[error("fake time went backwards")]
pub struct FakeTimeError;

impl SystemTimeLike for FakeSystemTime {
    type Error = FakeTimeError;

    const UNIX_EPOCH: Self = Self(Duration::ZERO);

    fn duration_since(self, earlier: Self) -> Result<Duration, Self::Error> {
        self.0.checked_sub(earlier.0).ok_or(FakeTimeError)
    }
}
