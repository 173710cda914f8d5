// Licensed under the Apache-2.0 license

//! Clock sources and time helpers
//!
//! All deadlines in this crate are absolute readings of the monotonic clock.
//! Wall-clock time is only exposed through [`unix_time`].

use crate::error::PalResult;
use core::cmp::Ordering;
use nix::time::{clock_gettime, ClockId};

const NANOS_PER_SEC: u32 = 1_000_000_000;
const NANOS_PER_MILLI: u32 = 1_000_000;

/// Monotonic clock reading split into seconds and nanoseconds.
///
/// Field order matters: the derived ordering compares `secs` first and
/// `nanos` second, which is the deadline order used by the timer list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timespec {
    secs: i64,
    nanos: u32,
}

impl Timespec {
    /// Builds a normalized timespec; excess nanoseconds carry into seconds.
    pub const fn new(secs: i64, nanos: u32) -> Self {
        Self {
            secs: secs + (nanos / NANOS_PER_SEC) as i64,
            nanos: nanos % NANOS_PER_SEC,
        }
    }

    pub const fn from_millis(millis: u64) -> Self {
        Self::new(
            (millis / 1000) as i64,
            ((millis % 1000) as u32) * NANOS_PER_MILLI,
        )
    }

    /// Current reading of `CLOCK_MONOTONIC`.
    pub fn now() -> PalResult<Self> {
        read_clock(ClockId::CLOCK_MONOTONIC)
    }

    pub const fn secs(&self) -> i64 {
        self.secs
    }

    pub const fn subsec_nanos(&self) -> u32 {
        self.nanos
    }

    pub fn as_millis(&self) -> u64 {
        (self.secs.max(0) as u64) * 1000 + (self.nanos / NANOS_PER_MILLI) as u64
    }

    /// Returns `self + millis`, saturating at the far end of the clock range.
    pub fn add_millis(&self, millis: u64) -> Self {
        let extra_secs = i64::try_from(millis / 1000).unwrap_or(i64::MAX);
        let nanos = self.nanos + ((millis % 1000) as u32) * NANOS_PER_MILLI;
        let secs = self
            .secs
            .saturating_add(extra_secs)
            .saturating_add((nanos / NANOS_PER_SEC) as i64);
        Self {
            secs,
            nanos: nanos % NANOS_PER_SEC,
        }
    }

    /// Time remaining from `earlier` until `self`, zero if already passed.
    pub fn saturating_duration_since(&self, earlier: Timespec) -> std::time::Duration {
        if *self <= earlier {
            return std::time::Duration::ZERO;
        }
        let (secs, nanos) = if self.nanos >= earlier.nanos {
            (self.secs - earlier.secs, self.nanos - earlier.nanos)
        } else {
            (
                self.secs - earlier.secs - 1,
                self.nanos + NANOS_PER_SEC - earlier.nanos,
            )
        };
        std::time::Duration::new(secs as u64, nanos)
    }
}

/// Orders two deadlines: seconds first, then nanoseconds.
pub fn compare(a: &Timespec, b: &Timespec) -> Ordering {
    a.secs.cmp(&b.secs).then(a.nanos.cmp(&b.nanos))
}

fn read_clock(clock: ClockId) -> PalResult<Timespec> {
    let ts = clock_gettime(clock)?;
    Ok(Timespec::new(ts.tv_sec(), ts.tv_nsec() as u32))
}

/// Seconds since the Unix epoch.
pub fn unix_time() -> PalResult<u64> {
    let now = read_clock(ClockId::CLOCK_REALTIME)?;
    Ok(now.secs().max(0) as u64)
}

/// Milliseconds on the monotonic clock, i.e. time since boot.
pub fn system_time_ms() -> PalResult<u64> {
    Ok(Timespec::now()?.as_millis())
}

/// How long a blocking call may wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Fail immediately if the operation cannot complete.
    NoWait,
    /// Block until the operation completes.
    Infinite,
    /// Block for at most this many milliseconds.
    Millis(u32),
}

impl Timeout {
    pub const NO_WAIT_MS: u32 = 0;
    pub const INFINITE_MS: u32 = u32::MAX;

    /// Decodes the raw millisecond form where `0` means no wait and
    /// `u32::MAX` means wait forever.
    pub const fn from_millis(millis: u32) -> Self {
        match millis {
            Self::NO_WAIT_MS => Timeout::NoWait,
            Self::INFINITE_MS => Timeout::Infinite,
            ms => Timeout::Millis(ms),
        }
    }

    /// Absolute monotonic deadline, `None` for [`Timeout::Infinite`].
    pub fn deadline(&self) -> PalResult<Option<Timespec>> {
        match self {
            Timeout::Infinite => Ok(None),
            Timeout::NoWait => Ok(Some(Timespec::now()?)),
            Timeout::Millis(ms) => Ok(Some(Timespec::now()?.add_millis(*ms as u64))),
        }
    }
}

impl From<u32> for Timeout {
    fn from(millis: u32) -> Self {
        Timeout::from_millis(millis)
    }
}
