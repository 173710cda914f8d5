// Licensed under the Apache-2.0 license

//! Timer service state, background thread and per-timer operations.

use crate::error::{PalError, PalResult};
use crate::sync::{Condvar, Mutex, MutexGuard};
use crate::thread::{self, ThreadBuilder, ThreadHandle};
use crate::time::Timespec;
use core::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::ThreadId;

use super::list::{Entry, TimerList};
use super::{TimerId, TimerKind};

type Callback = Box<dyn FnMut() + Send + 'static>;

/// Shared body of a timer.
///
/// `started` and `period_ms` are only written with the service lock held;
/// they are atomics so `is_active` and the accessors can read them without it.
pub(crate) struct TimerCell {
    id: TimerId,
    name: String,
    kind: TimerKind,
    period_ms: AtomicU64,
    started: AtomicBool,
    callback: Mutex<Callback>,
}

impl TimerCell {
    fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    fn set_started(&self, started: bool) {
        self.started.store(started, Ordering::Release);
    }

    fn period_ms(&self) -> u64 {
        self.period_ms.load(Ordering::Acquire)
    }

    fn fire(&self) {
        let mut callback = match self.callback.lock() {
            Ok(callback) => callback,
            Err(e) => {
                log::warn!("{} '{}': callback unavailable: {}", self.id, self.name, e);
                return;
            }
        };
        if catch_unwind(AssertUnwindSafe(&mut *callback)).is_err() {
            log::warn!("{} '{}': callback panicked", self.id, self.name);
        }
    }
}

struct EngineState {
    list: TimerList,
    shutdown: bool,
    /// Timer whose callback is running right now.
    firing: Option<TimerId>,
    engine_thread: Option<ThreadId>,
}

impl EngineState {
    /// Empties the list and marks every live timer in it as stopped.
    fn disarm_all(&mut self) -> usize {
        let mut disarmed = 0;
        for entry in self.list.drain() {
            if let Some(cell) = entry.cell.upgrade() {
                cell.set_started(false);
                disarmed += 1;
            }
        }
        disarmed
    }
}

struct EngineShared {
    state: Mutex<EngineState>,
    /// Signalled on every list mutation and on shutdown.
    wake: Condvar,
    /// Signalled after each callback returns.
    idle: Condvar,
    next_id: AtomicU64,
}

impl EngineShared {
    fn run(&self) {
        if let Err(e) = self.run_loop() {
            log::error!("timer thread stopped: {}", e);
            if let Ok(mut state) = self.state.lock() {
                state.firing = None;
                state.engine_thread = None;
            }
            self.idle.notify_all();
        }
    }

    fn run_loop(&self) -> PalResult<()> {
        let mut state = self.state.lock()?;
        state.engine_thread = Some(thread::current_id());
        log::debug!("timer thread running");

        loop {
            if state.shutdown {
                break;
            }

            let Some(expiry) = state.list.head().map(|e| e.expiry) else {
                state = self.wake.wait(state)?;
                continue;
            };

            if expiry > Timespec::now()? {
                // The head may change while we sleep, so always re-evaluate.
                let (next, _) = self.wake.wait_until(state, Some(expiry))?;
                state = next;
                continue;
            }

            let Some(entry) = state.list.pop_head() else {
                continue;
            };
            let Some(cell) = entry.cell.upgrade() else {
                log::trace!("{} released while armed, skipping", entry.id);
                continue;
            };

            if cell.kind == TimerKind::OneShot {
                cell.set_started(false);
            }
            state.firing = Some(cell.id);
            drop(state);

            log::trace!("{} '{}' fired", cell.id, cell.name);
            cell.fire();

            state = self.state.lock()?;
            state.firing = None;
            // Stopped or restarted from inside its own callback: leave it be.
            if cell.kind == TimerKind::Periodic
                && cell.is_started()
                && !state.list.contains(cell.id)
            {
                let next = entry.expiry.add_millis(cell.period_ms());
                state
                    .list
                    .insert_sorted(Entry::new(cell.id, next, Arc::downgrade(&cell)));
            }
            self.idle.notify_all();
        }

        state.engine_thread = None;
        log::debug!("timer thread exiting");
        Ok(())
    }
}

/// Settings for the background thread of a [`TimerService`].
#[derive(Debug, Clone)]
pub struct TimerServiceConfig {
    pub thread_name: String,
    pub stack_size: usize,
}

impl Default for TimerServiceConfig {
    fn default() -> Self {
        Self {
            thread_name: "pal-timer".to_string(),
            stack_size: thread::DEFAULT_STACK_SIZE,
        }
    }
}

/// One timer engine: the sorted list, its lock and the thread that fires it.
///
/// Services are independent of each other; a process may run several.
/// Dropping the service shuts its thread down.
pub struct TimerService {
    shared: Arc<EngineShared>,
    config: TimerServiceConfig,
    thread: Mutex<Option<ThreadHandle>>,
}

impl TimerService {
    pub fn new() -> Self {
        Self::with_config(TimerServiceConfig::default())
    }

    pub fn with_config(config: TimerServiceConfig) -> Self {
        Self {
            shared: Arc::new(EngineShared {
                state: Mutex::new(EngineState {
                    list: TimerList::new(),
                    shutdown: false,
                    firing: None,
                    engine_thread: None,
                }),
                wake: Condvar::new(),
                idle: Condvar::new(),
                next_id: AtomicU64::new(1),
            }),
            config,
            thread: Mutex::new(None),
        }
    }

    /// Starts the background thread. Calling it on a running service is a
    /// no-op; calling it while a [`deinit`](Self::deinit) is still joining
    /// the thread fails with [`PalError::ResourceUnavailable`].
    pub fn init(&self) -> PalResult<()> {
        let mut slot = self.thread.lock()?;
        if slot.is_some() {
            return Ok(());
        }
        if self.shared.state.lock()?.shutdown {
            return Err(PalError::ResourceUnavailable);
        }

        let shared = Arc::clone(&self.shared);
        let handle = ThreadBuilder::new()
            .name(self.config.thread_name.as_str())
            .stack_size(self.config.stack_size)
            .spawn(move || shared.run())
            .map_err(|e| {
                log::error!("failed to start timer thread: {}", e);
                PalError::ResourceUnavailable
            })?;
        *slot = Some(handle);
        log::debug!("timer service '{}' started", self.config.thread_name);
        Ok(())
    }

    /// Stops the background thread and disarms every timer.
    ///
    /// Nothing fires after this returns. Safe to call when the service was
    /// never started or is already stopped; [`init`](Self::init) may be
    /// called again afterwards. Calling it from a timer callback fails with
    /// [`PalError::PermissionDenied`] since the thread cannot join itself.
    pub fn deinit(&self) -> PalResult<()> {
        // Checked before taking the slot lock so a callback cannot block
        // behind a deinit that is joining its thread.
        if self.shared.state.lock()?.engine_thread == Some(thread::current_id()) {
            return Err(PalError::PermissionDenied);
        }
        // The slot is released before joining: callbacks still running may
        // call `is_running` or `init`, which need it.
        let mut handle = {
            let mut slot = self.thread.lock()?;
            let Some(handle) = slot.take() else {
                return Ok(());
            };
            self.shared.state.lock()?.shutdown = true;
            handle
        };
        self.shared.wake.notify_all();
        if let Err(e) = handle.join() {
            log::warn!("timer thread exited abnormally: {}", e);
        }

        let mut state = self.shared.state.lock()?;
        let disarmed = state.disarm_all();
        state.shutdown = false;
        state.firing = None;
        state.engine_thread = None;
        drop(state);
        self.shared.idle.notify_all();

        log::debug!(
            "timer service '{}' stopped, {} timer(s) disarmed",
            self.config.thread_name,
            disarmed
        );
        Ok(())
    }

    /// Shutdown path for a service released by one of its own callbacks.
    ///
    /// The thread cannot be joined from itself, so it is told to stop and
    /// left to exit once the running callback returns.
    fn detach(&self) -> PalResult<()> {
        let mut state = self.shared.state.lock()?;
        state.shutdown = true;
        let disarmed = state.disarm_all();
        drop(state);
        self.shared.wake.notify_all();
        drop(self.thread.lock()?.take());

        log::debug!(
            "timer service '{}' detached from its thread, {} timer(s) disarmed",
            self.config.thread_name,
            disarmed
        );
        Ok(())
    }

    pub fn is_running(&self) -> PalResult<bool> {
        Ok(self.thread.lock()?.is_some())
    }

    /// Creates a timer that calls `callback` every time it expires.
    ///
    /// `period_ms` must be nonzero. With `auto_start` the timer is armed
    /// before this returns. Anything the callback needs is captured by the
    /// closure.
    pub fn create<F>(
        &self,
        name: &str,
        kind: TimerKind,
        period_ms: u64,
        auto_start: bool,
        callback: F,
    ) -> PalResult<Timer>
    where
        F: FnMut() + Send + 'static,
    {
        if period_ms == 0 {
            return Err(PalError::InvalidParameter);
        }

        let id = TimerId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        let timer = Timer {
            cell: Arc::new(TimerCell {
                id,
                name: name.to_string(),
                kind,
                period_ms: AtomicU64::new(period_ms),
                started: AtomicBool::new(false),
                callback: Mutex::new(Box::new(callback) as Callback),
            }),
            shared: Arc::clone(&self.shared),
        };
        log::trace!("{} '{}' created ({:?}, {} ms)", id, name, kind, period_ms);

        if auto_start {
            timer.start()?;
        }
        Ok(timer)
    }

    /// Ids of the armed timers, earliest deadline first.
    pub fn armed_timers(&self) -> PalResult<Vec<TimerId>> {
        Ok(self.shared.state.lock()?.list.ids())
    }

    pub fn armed_count(&self) -> PalResult<usize> {
        Ok(self.shared.state.lock()?.list.len())
    }
}

impl Default for TimerService {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TimerService {
    fn drop(&mut self) {
        let result = match self.deinit() {
            Err(PalError::PermissionDenied) => self.detach(),
            other => other,
        };
        if let Err(e) = result {
            log::warn!("timer service shutdown failed: {}", e);
        }
    }
}

/// Handle to a timer created by [`TimerService::create`].
///
/// The handle owns the timer; dropping it stops the timer.
pub struct Timer {
    cell: Arc<TimerCell>,
    shared: Arc<EngineShared>,
}

impl Timer {
    pub fn id(&self) -> TimerId {
        self.cell.id
    }

    pub fn name(&self) -> &str {
        &self.cell.name
    }

    pub fn kind(&self) -> TimerKind {
        self.cell.kind
    }

    pub fn period_ms(&self) -> u64 {
        self.cell.period_ms()
    }

    /// Arms the timer to expire one period from now. Starting an active
    /// timer leaves its deadline unchanged.
    pub fn start(&self) -> PalResult<()> {
        let mut state = self.shared.state.lock()?;
        self.arm(&mut state)?;
        drop(state);
        self.shared.wake.notify_all();
        Ok(())
    }

    /// Disarms the timer.
    ///
    /// No expiry of this timer begins after `stop` returns. When called off
    /// the timer thread it also waits for a callback of this timer that is
    /// already running.
    pub fn stop(&self) -> PalResult<()> {
        let mut state = self.shared.state.lock()?;
        self.disarm(&mut state);
        self.shared.wake.notify_all();

        let me = thread::current_id();
        while state.firing == Some(self.cell.id) && state.engine_thread != Some(me) {
            state = self.shared.idle.wait(state)?;
        }
        Ok(())
    }

    /// Re-arms the timer one period from now, whether or not it was active.
    pub fn restart(&self) -> PalResult<()> {
        let mut state = self.shared.state.lock()?;
        self.disarm(&mut state);
        self.arm(&mut state)?;
        drop(state);
        self.shared.wake.notify_all();
        Ok(())
    }

    /// Sets a new nonzero period and restarts the timer with it.
    pub fn change_period(&self, period_ms: u64) -> PalResult<()> {
        if period_ms == 0 {
            return Err(PalError::InvalidParameter);
        }
        let mut state = self.shared.state.lock()?;
        self.cell.period_ms.store(period_ms, Ordering::Release);
        self.disarm(&mut state);
        self.arm(&mut state)?;
        drop(state);
        self.shared.wake.notify_all();
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.cell.is_started()
    }

    /// Stops and releases the timer.
    pub fn delete(self) -> PalResult<()> {
        self.stop()
    }

    fn arm(&self, state: &mut MutexGuard<'_, EngineState>) -> PalResult<()> {
        if self.cell.is_started() {
            return Ok(());
        }
        let expiry = Timespec::now()?.add_millis(self.cell.period_ms());
        state.list.insert_sorted(Entry::new(
            self.cell.id,
            expiry,
            Arc::downgrade(&self.cell),
        ));
        self.cell.set_started(true);
        Ok(())
    }

    fn disarm(&self, state: &mut MutexGuard<'_, EngineState>) {
        state.list.remove(self.cell.id);
        self.cell.set_started(false);
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("id", &self.cell.id)
            .field("name", &self.cell.name)
            .field("kind", &self.cell.kind)
            .field("period_ms", &self.period_ms())
            .field("active", &self.is_active())
            .finish()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("{} '{}': stop on drop failed: {}", self.cell.id, self.cell.name, e);
        }
    }
}
