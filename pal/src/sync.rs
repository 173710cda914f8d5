// Licensed under the Apache-2.0 license

//! Synchronization primitives abstraction

use crate::error::{PalError, PalResult};
use crate::time::{Timeout, Timespec};
use std::sync as std_sync;
use std::thread::ThreadId;

pub use std_sync::MutexGuard;

/// Mutex abstraction
pub struct Mutex<T> {
    inner: std_sync::Mutex<T>,
}

impl<T> Mutex<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: std_sync::Mutex::new(value),
        }
    }

    pub fn lock(&self) -> PalResult<MutexGuard<'_, T>> {
        self.inner
            .lock()
            .map_err(|_| PalError::ResourceUnavailable)
    }

    pub fn into_inner(self) -> PalResult<T> {
        self.inner
            .into_inner()
            .map_err(|_| PalError::ResourceUnavailable)
    }
}

impl<T: Default> Default for Mutex<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Condition variable abstraction
pub struct Condvar {
    inner: std_sync::Condvar,
}

impl Default for Condvar {
    fn default() -> Self {
        Self::new()
    }
}

impl Condvar {
    pub fn new() -> Self {
        Self {
            inner: std_sync::Condvar::new(),
        }
    }

    pub fn wait<'a, T>(&self, guard: MutexGuard<'a, T>) -> PalResult<MutexGuard<'a, T>> {
        self.inner
            .wait(guard)
            .map_err(|_| PalError::ResourceUnavailable)
    }

    /// Waits until notified or until the absolute monotonic `deadline`.
    ///
    /// `None` waits without a bound. The returned flag is `true` when the
    /// deadline had passed on return. Spurious wakeups are possible, so
    /// callers loop on their own predicate and pass the same deadline again.
    pub fn wait_until<'a, T>(
        &self,
        guard: MutexGuard<'a, T>,
        deadline: Option<Timespec>,
    ) -> PalResult<(MutexGuard<'a, T>, bool)> {
        let Some(deadline) = deadline else {
            return Ok((self.wait(guard)?, false));
        };
        let remaining = deadline.saturating_duration_since(Timespec::now()?);
        if remaining.is_zero() {
            return Ok((guard, true));
        }
        let (guard, _) = self
            .inner
            .wait_timeout(guard, remaining)
            .map_err(|_| PalError::ResourceUnavailable)?;
        let expired = Timespec::now()? >= deadline;
        Ok((guard, expired))
    }

    pub fn notify_one(&self) {
        self.inner.notify_one();
    }

    pub fn notify_all(&self) {
        self.inner.notify_all();
    }
}

#[derive(Debug, Default)]
struct Ownership {
    owner: Option<ThreadId>,
    depth: u32,
}

/// Lock-style mutex with timeouts and optional recursion.
///
/// Unlike [`Mutex`] this does not guard data; it is locked and unlocked
/// explicitly, and only the owning thread may unlock it. A recursive mutex
/// must be unlocked as many times as it was locked.
pub struct TimedMutex {
    recursive: bool,
    state: Mutex<Ownership>,
    released: Condvar,
}

impl TimedMutex {
    pub fn new(recursive: bool) -> Self {
        Self {
            recursive,
            state: Mutex::new(Ownership::default()),
            released: Condvar::new(),
        }
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    /// Acquires the mutex, waiting at most `timeout`.
    ///
    /// A non-recursive mutex relocked by its owner fails with
    /// [`PalError::WouldBlock`] instead of deadlocking.
    pub fn lock(&self, timeout: impl Into<Timeout>) -> PalResult<()> {
        let me = std::thread::current().id();
        let deadline = timeout.into().deadline()?;
        let mut state = self.state.lock()?;
        loop {
            match state.owner {
                None => {
                    state.owner = Some(me);
                    state.depth = 1;
                    return Ok(());
                }
                Some(owner) if owner == me => {
                    if !self.recursive {
                        return Err(PalError::WouldBlock);
                    }
                    state.depth = state.depth.checked_add(1).ok_or(PalError::WouldBlock)?;
                    return Ok(());
                }
                Some(_) => {
                    let (next, expired) = self.released.wait_until(state, deadline)?;
                    state = next;
                    if expired && state.owner.is_some() {
                        return Err(PalError::Timeout);
                    }
                }
            }
        }
    }

    pub fn try_lock(&self) -> PalResult<()> {
        self.lock(Timeout::NoWait)
    }

    /// Releases one level of ownership held by the calling thread.
    pub fn unlock(&self) -> PalResult<()> {
        let me = std::thread::current().id();
        let mut state = self.state.lock()?;
        if state.owner != Some(me) {
            return Err(PalError::PermissionDenied);
        }
        state.depth -= 1;
        if state.depth == 0 {
            state.owner = None;
            drop(state);
            self.released.notify_one();
        }
        Ok(())
    }

    /// Locks and returns a guard that unlocks on drop.
    pub fn guard(&self, timeout: impl Into<Timeout>) -> PalResult<TimedMutexGuard<'_>> {
        self.lock(timeout)?;
        Ok(TimedMutexGuard { mutex: self })
    }

    pub fn is_locked(&self) -> PalResult<bool> {
        Ok(self.state.lock()?.owner.is_some())
    }
}

pub struct TimedMutexGuard<'a> {
    mutex: &'a TimedMutex,
}

impl Drop for TimedMutexGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.mutex.unlock() {
            log::warn!("failed to release timed mutex: {}", e);
        }
    }
}
