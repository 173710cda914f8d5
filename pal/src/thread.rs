// Licensed under the Apache-2.0 license

//! Thread abstraction

use crate::error::{PalError, PalResult};
use std::thread as std_thread;

/// Scheduling hint recorded with the thread.
///
/// POSIX hosts run every PAL thread under the default policy, so the value is
/// kept for introspection only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ThreadPriority {
    Low,
    #[default]
    Normal,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    Running,
    Stopped,
    Terminated,
}

/// Handle to a spawned PAL thread
pub struct ThreadHandle {
    inner: Option<std_thread::JoinHandle<()>>,
    name: Option<String>,
    priority: ThreadPriority,
    stack_size: usize,
    state: ThreadState,
}

impl ThreadHandle {
    /// Waits for the thread to finish. Joining twice is a no-op.
    pub fn join(&mut self) -> PalResult<()> {
        let result = match self.inner.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| PalError::Other("Thread join failed")),
            None => Ok(()),
        };
        self.state = ThreadState::Terminated;
        result
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn priority(&self) -> ThreadPriority {
        self.priority
    }

    /// Stack size the thread was created with, after clamping.
    pub fn stack_size(&self) -> usize {
        self.stack_size
    }

    pub fn state(&self) -> ThreadState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.inner.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Peak stack usage in bytes. Not tracked on POSIX hosts, always zero.
    pub fn stack_watermark(&self) -> usize {
        0
    }

    pub fn id(&self) -> Option<std_thread::ThreadId> {
        self.inner.as_ref().map(|h| h.thread().id())
    }
}

/// Thread builder
pub struct ThreadBuilder {
    name: Option<String>,
    stack_size: Option<usize>,
    priority: ThreadPriority,
}

impl ThreadBuilder {
    pub fn new() -> Self {
        Self {
            name: None,
            stack_size: None,
            priority: ThreadPriority::default(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Requested stack size in bytes. Sizes below the platform minimum are
    /// raised to it; zero is rejected at spawn.
    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self
    }

    pub fn priority(mut self, priority: ThreadPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn spawn<F>(self, f: F) -> PalResult<ThreadHandle>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut builder = std_thread::Builder::new();

        if let Some(name) = &self.name {
            builder = builder.name(name.clone());
        }

        let stack_size = match self.stack_size {
            Some(0) => return Err(PalError::InvalidParameter),
            Some(size) => size.max(libc::PTHREAD_STACK_MIN),
            None => DEFAULT_STACK_SIZE,
        };
        builder = builder.stack_size(stack_size);

        let handle = builder
            .spawn(f)
            .map_err(|_| PalError::ResourceUnavailable)?;

        log::trace!(
            "spawned thread {:?} ({} bytes, {:?})",
            self.name,
            stack_size,
            self.priority
        );

        Ok(ThreadHandle {
            inner: Some(handle),
            name: self.name,
            priority: self.priority,
            stack_size,
            state: ThreadState::Running,
        })
    }
}

impl Default for ThreadBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub const DEFAULT_STACK_SIZE: usize = 64 * 1024;

/// Spawn a thread with default settings
pub fn spawn<F>(f: F) -> PalResult<ThreadHandle>
where
    F: FnOnce() + Send + 'static,
{
    ThreadBuilder::new().spawn(f)
}

/// Suspends the calling thread for `millis` milliseconds.
pub fn sleep(millis: u64) {
    std_thread::sleep(std::time::Duration::from_millis(millis));
}

pub fn current_id() -> std_thread::ThreadId {
    std_thread::current().id()
}

pub fn yield_now() {
    std_thread::yield_now();
}
