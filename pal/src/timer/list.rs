// Licensed under the Apache-2.0 license

//! Deadline-ordered index of armed timers.
//!
//! The list never owns a timer. Each entry pairs the timer's id with a weak
//! reference to its shared cell, so a handle dropped by its owner can never
//! be kept alive (or fired) by the engine.

use crate::time::{compare, Timespec};
use core::cmp::Ordering;
use std::sync::Weak;

use super::engine::TimerCell;
use super::TimerId;

pub(crate) struct Entry {
    pub(crate) id: TimerId,
    pub(crate) expiry: Timespec,
    pub(crate) cell: Weak<TimerCell>,
}

impl Entry {
    pub(crate) fn new(id: TimerId, expiry: Timespec, cell: Weak<TimerCell>) -> Self {
        Self { id, expiry, cell }
    }
}

/// Armed timers sorted ascending by expiry.
///
/// Equal deadlines keep insertion order, so timers armed for the same instant
/// fire first-in first-out.
#[derive(Default)]
pub(crate) struct TimerList {
    entries: Vec<Entry>,
}

impl TimerList {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Inserts after every entry due at or before `entry.expiry`.
    pub(crate) fn insert_sorted(&mut self, entry: Entry) {
        let pos = self
            .entries
            .partition_point(|e| compare(&e.expiry, &entry.expiry) != Ordering::Greater);
        self.entries.insert(pos, entry);
    }

    /// Removes the entry for `id`. Returns `false` if it was not listed.
    pub(crate) fn remove(&mut self, id: TimerId) -> bool {
        match self.entries.iter().position(|e| e.id == id) {
            Some(pos) => {
                self.entries.remove(pos);
                true
            }
            None => false,
        }
    }

    pub(crate) fn contains(&self, id: TimerId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    pub(crate) fn head(&self) -> Option<&Entry> {
        self.entries.first()
    }

    pub(crate) fn pop_head(&mut self) -> Option<Entry> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0))
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn ids(&self) -> Vec<TimerId> {
        self.entries.iter().map(|e| e.id).collect()
    }

    pub(crate) fn drain(&mut self) -> impl Iterator<Item = Entry> + '_ {
        self.entries.drain(..)
    }
}
