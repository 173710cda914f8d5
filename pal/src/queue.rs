// Licensed under the Apache-2.0 license

//! Bounded FIFO queue for passing items between threads.

use crate::error::{PalError, PalResult};
use crate::sync::{Condvar, Mutex};
use crate::time::Timeout;
use std::collections::VecDeque;

pub struct Queue<T> {
    capacity: usize,
    items: Mutex<VecDeque<T>>,
    not_full: Condvar,
    not_empty: Condvar,
}

impl<T> Queue<T> {
    /// Creates a queue holding at most `capacity` items.
    pub fn new(capacity: usize) -> PalResult<Self> {
        if capacity == 0 {
            return Err(PalError::InvalidParameter);
        }
        Ok(Self {
            capacity,
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends `item`, waiting up to `timeout` for a free slot.
    ///
    /// On [`PalError::Timeout`] the item is dropped.
    pub fn send(&self, item: T, timeout: impl Into<Timeout>) -> PalResult<()> {
        let deadline = timeout.into().deadline()?;
        let mut items = self.items.lock()?;
        let mut expired = false;
        while items.len() >= self.capacity {
            if expired {
                return Err(PalError::Timeout);
            }
            (items, expired) = self.not_full.wait_until(items, deadline)?;
        }
        items.push_back(item);
        drop(items);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Removes the oldest item, waiting up to `timeout` for one to arrive.
    pub fn receive(&self, timeout: impl Into<Timeout>) -> PalResult<T> {
        let deadline = timeout.into().deadline()?;
        let mut items = self.items.lock()?;
        let mut expired = false;
        loop {
            if let Some(item) = items.pop_front() {
                drop(items);
                self.not_full.notify_one();
                return Ok(item);
            }
            if expired {
                return Err(PalError::Timeout);
            }
            (items, expired) = self.not_empty.wait_until(items, deadline)?;
        }
    }

    /// Discards every queued item.
    pub fn reset(&self) -> PalResult<()> {
        self.items.lock()?.clear();
        self.not_full.notify_all();
        Ok(())
    }

    pub fn len(&self) -> PalResult<usize> {
        Ok(self.items.lock()?.len())
    }

    pub fn is_empty(&self) -> PalResult<bool> {
        Ok(self.len()? == 0)
    }

    pub fn free_slots(&self) -> PalResult<usize> {
        Ok(self.capacity - self.len()?)
    }
}
