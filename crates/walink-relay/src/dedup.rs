// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded set of recently seen message ids.

use std::collections::{HashSet, VecDeque};

/// Remembers the last `capacity` ids; the oldest is evicted first.
#[derive(Debug)]
pub struct DedupSet {
    capacity: usize,
    order: VecDeque<String>,
    seen: HashSet<String>,
}

impl DedupSet {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Record `id`. Returns `false` if it was already present.
    pub fn insert(&mut self, id: &str) -> bool {
        if self.seen.contains(id) {
            return false;
        }
        if self.order.len() == self.capacity
            && let Some(oldest) = self.order.pop_front()
        {
            self.seen.remove(&oldest);
        }
        self.order.push_back(id.to_string());
        self.seen.insert(id.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
