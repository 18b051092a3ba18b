//! Per-run bookkeeping of identifier states.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

/// Counts for progress display and interrupt summaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerStats {
    pub total: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    pub queued: usize,
}

/// Outcome of recording a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Try again; this is re-attempt number `n`.
    Retry(u32),
    /// Local budget exhausted; the identifier joined the failed queue.
    Queued,
    /// Local budget exhausted and it was already queued.
    AlreadyQueued,
}

/// Identifier sets and counters of one run.
///
/// An identifier is in at most one of `processing`, `completed` and
/// `failed`; it leaves `processing` before entering either of the others.
#[derive(Debug, Default)]
pub struct Tracker {
    total_pending: usize,
    processing: HashSet<String>,
    completed: HashSet<String>,
    failed: HashSet<String>,
    failed_order: Vec<String>,
    failed_queue: Vec<String>,
    reattempts: HashMap<String, u32>,
    global_retries: HashMap<String, u32>,
    started: HashMap<String, Instant>,
}

impl Tracker {
    pub fn new(total_pending: usize) -> Self {
        Self {
            total_pending,
            ..Default::default()
        }
    }

    pub fn total_pending(&self) -> usize {
        self.total_pending
    }

    /// Mark `id` as in flight.
    pub fn start(&mut self, id: &str) {
        self.processing.insert(id.to_string());
        self.started
            .entry(id.to_string())
            .or_insert_with(Instant::now);
    }

    /// Local re-attempts made for `id` in the current pass.
    pub fn reattempts(&self, id: &str) -> u32 {
        self.reattempts.get(id).copied().unwrap_or(0)
    }

    /// Global retry passes `id` has been through.
    pub fn global_retries(&self, id: &str) -> u32 {
        self.global_retries.get(id).copied().unwrap_or(0)
    }

    /// Record a failed attempt for `id` with a budget of `max_reattempts`.
    ///
    /// When the budget is used up the counter is reset, the identifier
    /// leaves `processing` and is pushed onto the failed queue unless it is
    /// already there.
    pub fn record_failure(&mut self, id: &str, max_reattempts: u32) -> AttemptOutcome {
        let used = self.reattempts(id);
        if used < max_reattempts {
            let next = used + 1;
            self.reattempts.insert(id.to_string(), next);
            return AttemptOutcome::Retry(next);
        }

        self.reattempts.remove(id);
        self.processing.remove(id);
        if self.failed_queue.iter().any(|queued| queued == id) {
            AttemptOutcome::AlreadyQueued
        } else {
            self.failed_queue.push(id.to_string());
            AttemptOutcome::Queued
        }
    }

    /// Mark `id` as done. Returns how long it took since it first started.
    pub fn complete(&mut self, id: &str) -> Option<Duration> {
        self.processing.remove(id);
        self.reattempts.remove(id);
        self.completed.insert(id.to_string());
        self.started.remove(id).map(|t| t.elapsed())
    }

    /// Mark `id` as permanently failed without further retries.
    pub fn fail(&mut self, id: &str) {
        self.processing.remove(id);
        self.reattempts.remove(id);
        self.started.remove(id);
        self.failed_queue.retain(|queued| queued != id);
        if self.failed.insert(id.to_string()) {
            self.failed_order.push(id.to_string());
        }
    }

    pub fn failed_queue_len(&self) -> usize {
        self.failed_queue.len()
    }

    /// Drain the failed queue for a new global pass, bumping each
    /// identifier's global retry counter.
    pub fn take_failed_queue(&mut self) -> Vec<String> {
        let queue = std::mem::take(&mut self.failed_queue);
        for id in &queue {
            *self.global_retries.entry(id.clone()).or_insert(0) += 1;
        }
        queue
    }

    /// Move everything still queued into the permanently failed set.
    pub fn fail_queued(&mut self) {
        for id in std::mem::take(&mut self.failed_queue) {
            self.fail(&id);
        }
    }

    /// Permanently failed identifiers in the order they failed.
    pub fn failed_ids(&self) -> &[String] {
        &self.failed_order
    }

    pub fn is_completed(&self, id: &str) -> bool {
        self.completed.contains(id)
    }

    /// Every pending identifier is either completed or permanently failed.
    pub fn is_complete(&self) -> bool {
        self.completed.len() + self.failed.len() >= self.total_pending
    }

    pub fn stats(&self) -> TrackerStats {
        TrackerStats {
            total: self.total_pending,
            processing: self.processing.len(),
            completed: self.completed.len(),
            failed: self.failed.len(),
            queued: self.failed_queue.len(),
        }
    }
}
