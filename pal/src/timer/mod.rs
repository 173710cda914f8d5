// Licensed under the Apache-2.0 license

//! Software timers driven by one background thread per [`TimerService`].
//!
//! Armed timers are kept in a list sorted by absolute monotonic deadline. The
//! service thread sleeps until the earliest deadline (or indefinitely while
//! nothing is armed), fires every due timer in deadline order and re-arms
//! periodic timers at `previous deadline + period`, so a periodic timer does
//! not accumulate drift from callback latency.
//!
//! Callbacks run on the service thread, one at a time, with no engine lock
//! held. A callback that blocks delays every other timer of its service.
//!
//! ```no_run
//! use pal_os::timer::{TimerKind, TimerService};
//!
//! let service = TimerService::new();
//! service.init()?;
//! let heartbeat = service.create("heartbeat", TimerKind::Periodic, 500, true, || {
//!     log::info!("tick");
//! })?;
//! pal_os::thread::sleep(2_000);
//! heartbeat.stop()?;
//! service.deinit()?;
//! # Ok::<(), pal_os::PalError>(())
//! ```

mod engine;
pub(crate) mod list;

use core::fmt;

pub use engine::{Timer, TimerService, TimerServiceConfig};

/// Identity of a timer within its service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(pub(crate) u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Fires once per start, then becomes inactive.
    OneShot,
    /// Fires every period until stopped.
    Periodic,
}
