// Licensed under the Apache-2.0 license

//! Event groups: a bitmask of flags threads can set, clear and wait on.

use crate::error::{PalError, PalResult};
use crate::sync::{Condvar, Mutex};
use crate::time::Timeout;

/// How [`Signal::wait`] matches the requested mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    /// Any requested bit is enough.
    Any,
    /// Every requested bit must be set.
    All,
}

impl WaitMode {
    fn matched(self, bits: usize, mask: usize) -> Option<usize> {
        let received = bits & mask;
        let satisfied = match self {
            WaitMode::Any => received != 0,
            WaitMode::All => received == mask,
        };
        satisfied.then_some(received)
    }
}

pub struct Signal {
    bits: Mutex<usize>,
    changed: Condvar,
}

impl Signal {
    pub fn new() -> Self {
        Self {
            bits: Mutex::new(0),
            changed: Condvar::new(),
        }
    }

    /// Sets the bits in `mask` and wakes every waiter.
    pub fn set(&self, mask: usize) -> PalResult<()> {
        *self.bits.lock()? |= mask;
        self.changed.notify_all();
        Ok(())
    }

    pub fn clear(&self, mask: usize) -> PalResult<()> {
        *self.bits.lock()? &= !mask;
        Ok(())
    }

    /// Current value of the whole bitmask.
    pub fn bits(&self) -> PalResult<usize> {
        Ok(*self.bits.lock()?)
    }

    /// Waits until the bits in `mask` satisfy `mode`.
    ///
    /// Returns the requested bits that were set. With `clear_on_exit` those
    /// bits are cleared before returning. Fails with [`PalError::Timeout`]
    /// when `timeout` elapses first; [`Timeout::NoWait`] only polls.
    pub fn wait(
        &self,
        mask: usize,
        mode: WaitMode,
        clear_on_exit: bool,
        timeout: impl Into<Timeout>,
    ) -> PalResult<usize> {
        if mask == 0 {
            return Err(PalError::InvalidParameter);
        }
        let deadline = timeout.into().deadline()?;
        let mut bits = self.bits.lock()?;
        let mut expired = false;
        loop {
            if let Some(received) = mode.matched(*bits, mask) {
                if clear_on_exit {
                    *bits &= !received;
                }
                return Ok(received);
            }
            if expired {
                return Err(PalError::Timeout);
            }
            (bits, expired) = self.changed.wait_until(bits, deadline)?;
        }
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}
