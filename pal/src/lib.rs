// Licensed under the Apache-2.0 license

//! Platform Abstraction Layer (PAL) for POSIX hosts
//!
//! A uniform interface over the OS services firmware-style applications rely
//! on: locks, queues, event groups, threads, software timers, time, file
//! storage and sockets.
//!
//! The centrepiece is [`timer::TimerService`], a timer engine that keeps every
//! armed timer in a deadline-sorted list and fires them from a single
//! background thread.

pub mod error;
pub mod fs;
pub mod queue;
pub mod signal;
pub mod socket;
pub mod sync;
pub mod thread;
pub mod time;
pub mod timer;

// Re-export core types
pub use error::{PalError, PalResult};
pub use fs::{FileSystem, OpenMode};
pub use queue::Queue;
pub use signal::{Signal, WaitMode};
pub use socket::{Protocol, Socket, SocketType};
pub use sync::{Condvar, Mutex, TimedMutex};
pub use thread::{ThreadBuilder, ThreadHandle, ThreadPriority, ThreadState};
pub use time::{Timeout, Timespec};
pub use timer::{Timer, TimerId, TimerKind, TimerService, TimerServiceConfig};

use std::path::PathBuf;

/// PAL configuration
#[derive(Debug, Clone)]
pub struct PalConfig {
    /// Directory backing [`FileSystem`], relative to the working directory
    /// unless absolute.
    pub fs_root: PathBuf,
    pub timer: TimerServiceConfig,
}

impl Default for PalConfig {
    fn default() -> Self {
        Self {
            fs_root: PathBuf::from("fs"),
            timer: TimerServiceConfig::default(),
        }
    }
}

/// Services brought up by [`init`].
pub struct Platform {
    pub timers: TimerService,
    pub fs: FileSystem,
}

impl Platform {
    /// Stops the timer thread. File storage is left on disk.
    pub fn shutdown(self) -> PalResult<()> {
        self.timers.deinit()
    }
}

/// Initialize the PAL with configuration
pub fn init(config: PalConfig) -> PalResult<Platform> {
    let fs = FileSystem::init(config.fs_root)?;
    let timers = TimerService::with_config(config.timer);
    timers.init()?;
    log::debug!("PAL {} initialized", version());
    Ok(Platform { timers, fs })
}

/// Get PAL version information
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
