//! Configuration variables customizable at runtime.
//!
//! Collection limits are compile-time (see [`crate::preset`]); what varies
//! between networks is timing.

use core::{num::NonZeroU64, time::Duration};
use std::borrow::Cow;

use nonzero_ext::nonzero;
use serde::{Deserialize, Serialize};

use crate::consts::INTERVALS_PER_SLOT;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Config {
    pub config_name: Cow<'static, str>,
    pub seconds_per_slot: NonZeroU64,
    pub max_request_blocks: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self::mainnet()
    }
}

impl Config {
    #[must_use]
    pub const fn mainnet() -> Self {
        Self {
            config_name: Cow::Borrowed("mainnet"),
            seconds_per_slot: nonzero!(4_u64),
            max_request_blocks: 1024,
        }
    }

    /// One-second slots for tests and local devnets.
    #[must_use]
    pub const fn minimal() -> Self {
        Self {
            config_name: Cow::Borrowed("minimal"),
            seconds_per_slot: nonzero!(1_u64),
            max_request_blocks: 1024,
        }
    }

    #[must_use]
    pub const fn slot_duration(&self) -> Duration {
        Duration::from_secs(self.seconds_per_slot.get())
    }

    #[must_use]
    pub fn interval_duration(&self) -> Duration {
        self.slot_duration() / INTERVALS_PER_SLOT as u32
    }
}
