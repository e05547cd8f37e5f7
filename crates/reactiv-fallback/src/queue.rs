// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The durable delivery backlog.
//!
//! `DeliveryQueue` is plain in-memory state; the owning system wraps it in a
//! mutex and persists a [`QueueSnapshot`] after every mutation. Items move
//! `pending -> processing -> completed | failed`, with failed attempts below
//! the cap going back to the end of `pending`.

use std::collections::VecDeque;

use chrono::Utc;
use reactiv_core::{
    ChannelKind, DeliveryRequest, Priority, QueueItem, QueueSnapshot, QueueStats, QueueStatus,
};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct DeliveryQueue {
    pending: VecDeque<QueueItem>,
    processing: Vec<QueueItem>,
    completed: VecDeque<QueueItem>,
    failed: VecDeque<QueueItem>,
    max_attempts: u32,
    history_limit: usize,
}

impl DeliveryQueue {
    pub fn new(max_attempts: u32, history_limit: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            processing: Vec::new(),
            completed: VecDeque::new(),
            failed: VecDeque::new(),
            max_attempts: max_attempts.max(1),
            history_limit,
        }
    }

    /// Rebuilds a queue from a persisted snapshot.
    ///
    /// Items caught in `processing` by a crash go back to the front of
    /// `pending` in their original order, ahead of everything else.
    pub fn from_snapshot(snapshot: QueueSnapshot, max_attempts: u32, history_limit: usize) -> Self {
        let mut queue = Self::new(max_attempts, history_limit);

        let recovered = snapshot.processing.len();
        for mut item in snapshot.processing.into_iter().rev() {
            item.status = QueueStatus::Pending;
            queue.pending.push_front(item);
        }
        if recovered > 0 {
            warn!(recovered, "returned interrupted queue items to pending");
        }

        queue.pending.extend(snapshot.pending.into_iter().map(|mut item| {
            item.status = QueueStatus::Pending;
            item
        }));
        queue.completed = snapshot.completed.into();
        queue.failed = snapshot.failed.into();
        queue.trim_history();
        queue
    }

    /// Adds a request to the backlog and returns the new item's id.
    ///
    /// High priority items go ahead of every normal item. Within a tier,
    /// requests the producer marked high come first, and arrival order is
    /// kept among equals.
    pub fn enqueue(&mut self, request: DeliveryRequest, priority: Priority) -> String {
        let item = QueueItem::new(request, priority, self.max_attempts);
        let id = item.id.clone();
        let key = rank(&item);
        let at = self
            .pending
            .iter()
            .position(|queued| rank(queued) > key)
            .unwrap_or(self.pending.len());
        debug!(queue_id = %id, request_id = item.request.id(), %priority, position = at, "enqueued");
        self.pending.insert(at, item);
        id
    }

    /// Moves up to `max` items from the front of `pending` into `processing`
    /// and returns copies of them.
    pub fn take_batch(&mut self, max: usize) -> Vec<QueueItem> {
        let count = max.min(self.pending.len());
        let now = Utc::now();
        let mut batch = Vec::with_capacity(count);
        for mut item in self.pending.drain(..count) {
            item.status = QueueStatus::Processing;
            item.updated_at = now;
            batch.push(item.clone());
            self.processing.push(item);
        }
        batch
    }

    /// Marks a processing item as delivered. Returns false for unknown ids.
    pub fn complete(&mut self, id: &str, channel: ChannelKind) -> bool {
        let Some(mut item) = self.take_processing(id) else {
            return false;
        };
        item.status = QueueStatus::Completed;
        item.attempts = item.attempts.saturating_add(1);
        item.delivered_via = Some(channel);
        item.last_error = None;
        item.updated_at = Utc::now();
        self.completed.push_back(item);
        self.trim_history();
        true
    }

    /// Records a failed attempt for a processing item.
    ///
    /// Below the item's cap it goes to the back of `pending`; at the cap it
    /// is moved to `failed`. Returns the item's new status, or `None` for an
    /// unknown id.
    pub fn fail(&mut self, id: &str, error: impl Into<String>) -> Option<QueueStatus> {
        let mut item = self.take_processing(id)?;
        item.attempts = item.attempts.saturating_add(1);
        item.last_error = Some(error.into());
        item.updated_at = Utc::now();

        if item.is_exhausted() {
            warn!(
                queue_id = %item.id,
                request_id = item.request.id(),
                attempts = item.attempts,
                "queue item exhausted its attempts"
            );
            item.status = QueueStatus::Failed;
            self.failed.push_back(item);
            self.trim_history();
            Some(QueueStatus::Failed)
        } else {
            item.status = QueueStatus::Pending;
            self.pending.push_back(item);
            Some(QueueStatus::Pending)
        }
    }

    fn take_processing(&mut self, id: &str) -> Option<QueueItem> {
        let index = self.processing.iter().position(|item| item.id == id)?;
        Some(self.processing.remove(index))
    }

    fn trim_history(&mut self) {
        while self.completed.len() > self.history_limit {
            self.completed.pop_front();
        }
        while self.failed.len() > self.history_limit {
            self.failed.pop_front();
        }
    }

    /// Looks up an item in any state.
    pub fn find(&self, id: &str) -> Option<&QueueItem> {
        self.pending
            .iter()
            .chain(self.processing.iter())
            .chain(self.completed.iter())
            .chain(self.failed.iter())
            .find(|item| item.id == id)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            pending: self.pending.len(),
            processing: self.processing.len(),
            completed: self.completed.len(),
            failed: self.failed.len(),
        }
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            pending: self.pending.iter().cloned().collect(),
            processing: self.processing.clone(),
            completed: self.completed.iter().cloned().collect(),
            failed: self.failed.iter().cloned().collect(),
        }
    }
}

/// Drain order inside `pending`; lower goes first.
fn rank(item: &QueueItem) -> u8 {
    match (item.priority, item.request.priority()) {
        (Priority::High, Priority::High) => 0,
        (Priority::High, Priority::Normal) => 1,
        (Priority::Normal, Priority::High) => 2,
        (Priority::Normal, Priority::Normal) => 3,
    }
}
