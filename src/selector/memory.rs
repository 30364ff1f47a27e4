//! Transient per-selector state used by the rotating strategies

use std::collections::VecDeque;

/// Cursor for round-robin traversal plus the ids of recent random picks.
///
/// Both are cleared whenever the filter changes.
#[derive(Debug, Clone, Default)]
pub struct SelectionMemory {
    rotate_cursor: i64,
    recent_random_ids: VecDeque<i64>,
    capacity: usize,
}

impl SelectionMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            rotate_cursor: 0,
            recent_random_ids: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Last id returned by rotation; 0 means "before the first row"
    pub fn rotate_cursor(&self) -> i64 {
        self.rotate_cursor
    }

    pub fn set_rotate_cursor(&mut self, id: i64) {
        self.rotate_cursor = id;
    }

    /// Ids of recent random picks, oldest first
    pub fn recent_random_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.recent_random_ids.iter().copied()
    }

    /// Remember a random pick, evicting the oldest beyond capacity
    pub fn remember_random(&mut self, id: i64) {
        if self.capacity == 0 {
            return;
        }
        self.recent_random_ids.push_back(id);
        while self.recent_random_ids.len() > self.capacity {
            self.recent_random_ids.pop_front();
        }
    }

    pub fn forget_random(&mut self) {
        self.recent_random_ids.clear();
    }

    pub fn clear(&mut self) {
        self.rotate_cursor = 0;
        self.recent_random_ids.clear();
    }

    pub fn is_clear(&self) -> bool {
        self.rotate_cursor == 0 && self.recent_random_ids.is_empty()
    }
}
