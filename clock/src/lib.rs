//! A [`Stream`]-based timer for the lean chain.
//!
//! Slots split into three equal intervals (propose, attest, aggregate) and
//! the stream yields one [`Tick`] at the start of each. Built on
//! [`tokio::time::Interval`], which may produce items late but does not let
//! delays accumulate.
//!
//! [`Interval`]: tokio::time::Interval

use core::{error::Error, time::Duration};
use std::time::{Instant, SystemTime, SystemTimeError};

use anyhow::Result;
use enum_iterator::Sequence;
use futures::stream::{Stream, StreamExt as _};
use strum::AsRefStr;
use thiserror::Error as ThisError;
use tokio_stream::wrappers::IntervalStream;
use types::{
    config::Config,
    consts::{GENESIS_SLOT, INTERVALS_PER_SLOT},
    primitives::{Slot, UnixSeconds},
};

#[cfg(test)]
mod fake_time;

pub trait InstantLike: Sized {
    fn checked_add(self, duration: Duration) -> Option<Self>;
}

pub trait SystemTimeLike: Copy {
    type Error: Error + Send + Sync + 'static;

    const UNIX_EPOCH: Self;

    fn duration_since(self, earlier: Self) -> Result<Duration, Self::Error>;
}

impl InstantLike for Instant {
    fn checked_add(self, duration: Duration) -> Option<Self> {
        Self::checked_add(&self, duration)
    }
}

impl SystemTimeLike for SystemTime {
    type Error = SystemTimeError;

    const UNIX_EPOCH: Self = Self::UNIX_EPOCH;

    fn duration_since(self, earlier: Self) -> Result<Duration, Self::Error> {
        Self::duration_since(&self, earlier)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Tick {
    pub slot: Slot,
    pub kind: TickKind,
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Sequence, AsRefStr)]
pub enum TickKind {
    Propose,
    Attest,
    Aggregate,
}

impl Tick {
    #[must_use]
    pub const fn new(slot: Slot, kind: TickKind) -> Self {
        Self { slot, kind }
    }

    #[must_use]
    pub const fn start_of_slot(slot: Slot) -> Self {
        Self::new(slot, TickKind::Propose)
    }

    /// The interval index within the slot: 0 = propose, 1 = attest,
    /// 2 = aggregate.
    #[must_use]
    pub const fn interval(self) -> u64 {
        self.kind as u64
    }

    #[must_use]
    pub const fn is_start_of_slot(self) -> bool {
        matches!(self.kind, TickKind::Propose)
    }

    pub fn at_time(config: &Config, time: UnixSeconds, genesis_time: UnixSeconds) -> Result<Self> {
        Self::from_duration(config, Duration::from_secs(time), genesis_time)
    }

    pub fn current(config: &Config, genesis_time: UnixSeconds) -> Result<Self> {
        let duration_since_unix_epoch = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH)?;
        Self::from_duration(config, duration_since_unix_epoch, genesis_time)
    }

    fn from_duration(
        config: &Config,
        duration_since_unix_epoch: Duration,
        genesis_time: UnixSeconds,
    ) -> Result<Self> {
        let since_genesis =
            duration_since_unix_epoch.saturating_sub(Duration::from_secs(genesis_time));

        let seconds_per_slot = config.seconds_per_slot.get();
        let slots_since_genesis = since_genesis.as_secs() / seconds_per_slot;

        let into_slot =
            since_genesis - Duration::from_secs(slots_since_genesis * seconds_per_slot);

        // `Duration` does not implement `Div<Duration>` or `Rem<Duration>`,
        // so the interval is computed on nanoseconds. Slot durations that
        // do not divide into whole intervals leave the last interval the
        // remainder, hence the clamp.
        let interval = into_slot.as_nanos() / tick_duration(config).as_nanos();
        let interval = usize::try_from(interval)?.min(INTERVALS_PER_SLOT as usize - 1);

        let kind = enum_iterator::all::<TickKind>()
            .nth(interval)
            .expect("the interval index is clamped to the tick kinds");

        Ok(Self::new(GENESIS_SLOT + slots_since_genesis, kind))
    }

    fn next(self) -> Result<Self> {
        let Self { slot, kind } = self;

        let next_slot = match kind.next() {
            Some(_) => slot,
            None => slot.checked_add(1).ok_or(ClockError::RanOutOfSlots)?,
        };

        let next_kind = enum_iterator::next_cycle(&kind);

        Ok(Self::new(next_slot, next_kind))
    }
}

#[derive(Debug, ThisError)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub enum ClockError {
    #[error("time of next tick overflowed")]
    NextInstantOverflow,
    #[error("ran out of slots")]
    RanOutOfSlots,
}

/// A stream of interval ticks starting at the next one, or at genesis when
/// genesis is still ahead.
pub fn ticks(
    config: &Config,
    genesis_time: UnixSeconds,
) -> Result<impl Stream<Item = Result<Tick>>> {
    // The `Instant` and `SystemTime` obtained here are assumed to
    // correspond to the same point in time. The error is negligible
    // compared to clock differences between nodes.
    let now_instant = Instant::now();
    let now_system_time = SystemTime::now();

    let (mut next_tick, next_instant) =
        next_tick_with_instant(config, now_instant, now_system_time, genesis_time)?;

    let interval = tokio::time::interval_at(next_instant.into(), tick_duration(config));

    Ok(IntervalStream::new(interval).map(move |_| {
        let current_tick = next_tick;
        next_tick = current_tick.next()?;
        Ok(current_tick)
    }))
}

fn next_tick_with_instant<I: InstantLike, S: SystemTimeLike>(
    config: &Config,
    now_instant: I,
    now_system_time: S,
    genesis_time: UnixSeconds,
) -> Result<(Tick, I)> {
    let unix_epoch_to_now = now_system_time.duration_since(S::UNIX_EPOCH)?;
    let unix_epoch_to_genesis = Duration::from_secs(genesis_time);

    // Some platforms do not support `Instant`s before a platform-dependent
    // epoch, so `Duration`s are never subtracted from `Instant`s. The
    // `InstantLike` trait conveniently prevents it.

    let next_tick;
    let now_to_next_tick;

    if unix_epoch_to_now <= unix_epoch_to_genesis {
        next_tick = Tick::start_of_slot(GENESIS_SLOT);
        now_to_next_tick = unix_epoch_to_genesis - unix_epoch_to_now;
    } else {
        let seconds_per_slot = config.seconds_per_slot.get();

        let genesis_to_now = unix_epoch_to_now - unix_epoch_to_genesis;
        let slots_since_genesis = genesis_to_now.as_secs() / seconds_per_slot;
        let current_slot_to_now =
            genesis_to_now - Duration::from_secs(slots_since_genesis * seconds_per_slot);

        // The next tick is the first interval boundary at or after now.
        let nanos_per_tick = tick_duration(config).as_nanos();
        let ticks_into_slot = current_slot_to_now.as_nanos().div_ceil(nanos_per_tick);

        let mut tick = Tick::start_of_slot(GENESIS_SLOT + slots_since_genesis);

        for _ in 0..ticks_into_slot {
            tick = tick.next()?;
        }

        let slot_start_to_tick = nanos_per_tick * ticks_into_slot;

        next_tick = tick;
        now_to_next_tick = Duration::from_nanos(
            (slot_start_to_tick - current_slot_to_now.as_nanos())
                .try_into()
                .expect("the gap until the next tick is under one interval"),
        );
    }

    let next_instant = now_instant
        .checked_add(now_to_next_tick)
        .ok_or(ClockError::NextInstantOverflow)?;

    Ok((next_tick, next_instant))
}

fn tick_duration(config: &Config) -> Duration {
    config.slot_duration() / INTERVALS_PER_SLOT as u32
}

#[cfg(test)]
mod tests {
    use core::{num::NonZeroU64, ops::Add as _};

    use futures::future::FutureExt as _;
    use nonzero_ext::nonzero;
    use test_case::test_case;

    use crate::fake_time::{FakeInstant, FakeSystemTime, Timespec};

    use super::*;

    fn config_with_seconds_per_slot(seconds_per_slot: NonZeroU64) -> Config {
        Config {
            seconds_per_slot,
            ..Config::mainnet()
        }
    }

    /// Three-second slots make every interval an exact second.
    fn three_second_config() -> Config {
        config_with_seconds_per_slot(nonzero!(3_u64))
    }

    #[test]
    fn a_slot_has_exactly_three_interval_ticks() {
        assert_eq!(TickKind::CARDINALITY as u64, INTERVALS_PER_SLOT);
        assert_eq!(Tick::start_of_slot(0).interval(), 0);
        assert_eq!(Tick::new(0, TickKind::Attest).interval(), 1);
        assert_eq!(Tick::new(0, TickKind::Aggregate).interval(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_produces_one_tick_per_interval() -> Result<()> {
        let genesis_time = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)?
            .as_secs()
            .add(1);

        let mut ticks = ticks(&three_second_config(), genesis_time)?;
        let mut next_tick = || ticks.next().now_or_never().flatten().transpose();

        assert_eq!(next_tick()?, None);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(next_tick()?, Some(Tick::new(0, TickKind::Propose)));
        assert_eq!(next_tick()?, None);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(next_tick()?, Some(Tick::new(0, TickKind::Attest)));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(next_tick()?, Some(Tick::new(0, TickKind::Aggregate)));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(next_tick()?, Some(Tick::new(1, TickKind::Propose)));
        assert_eq!(next_tick()?, None);

        Ok(())
    }

    #[test_case(-7 => Tick::new(0, TickKind::Propose);   "before genesis")]
    #[test_case( 0 => Tick::new(0, TickKind::Propose);   "at genesis")]
    #[test_case( 1 => Tick::new(0, TickKind::Attest);    "second interval")]
    #[test_case( 2 => Tick::new(0, TickKind::Aggregate); "third interval")]
    #[test_case( 3 => Tick::new(1, TickKind::Propose);   "next slot")]
    #[test_case( 7 => Tick::new(2, TickKind::Attest);    "a later slot")]
    fn tick_at_time_with_three_second_slots(offset: i64) -> Tick {
        tick_at_time_relative_to_genesis(&three_second_config(), offset)
    }

    // Mainnet intervals are a third of 4 seconds, so second boundaries land
    // inside intervals.
    #[test_case( 0 => Tick::new(0, TickKind::Propose);   "at genesis")]
    #[test_case( 1 => Tick::new(0, TickKind::Propose);   "still proposing")]
    #[test_case( 2 => Tick::new(0, TickKind::Attest);    "attest interval")]
    #[test_case( 3 => Tick::new(0, TickKind::Aggregate); "aggregate interval")]
    #[test_case( 4 => Tick::new(1, TickKind::Propose);   "next slot")]
    #[test_case( 8 => Tick::new(2, TickKind::Propose);   "two slots in")]
    fn tick_at_time_with_mainnet_config(offset: i64) -> Tick {
        tick_at_time_relative_to_genesis(&Config::mainnet(), offset)
    }

    #[test_case(100 => (777, Tick::new(0, TickKind::Propose));   "long before genesis")]
    #[test_case(777 => (777, Tick::new(0, TickKind::Propose));   "at genesis")]
    #[test_case(778 => (778, Tick::new(0, TickKind::Attest));    "one second after genesis")]
    #[test_case(779 => (779, Tick::new(0, TickKind::Aggregate)); "two seconds after genesis")]
    #[test_case(780 => (780, Tick::new(1, TickKind::Propose));   "one slot after genesis")]
    #[test_case(781 => (781, Tick::new(1, TickKind::Attest));    "one slot and a second")]
    fn next_tick_with_three_second_slots(time: UnixSeconds) -> (UnixSeconds, Tick) {
        let genesis_time = 777;
        let timespec = Timespec::from_secs(time);

        let (actual_tick, actual_instant) = next_tick_with_instant(
            &three_second_config(),
            FakeInstant(timespec),
            FakeSystemTime(timespec),
            genesis_time,
        )
        .expect("fake time is after the Unix epoch");

        assert_eq!(actual_instant.0.subsec_nanos(), 0);

        (actual_instant.0.as_secs(), actual_tick)
    }

    fn tick_at_time_relative_to_genesis(config: &Config, offset: i64) -> Tick {
        let genesis_time: UnixSeconds = 1_000_000;

        let time = genesis_time
            .checked_add_signed(offset)
            .expect("offset is small");

        Tick::at_time(config, time, genesis_time).expect("time arithmetic does not overflow")
    }
}
