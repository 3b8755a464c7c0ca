//! The render job queue.
//!
//! An in-memory FIFO with an exact-match pending index: no two pending jobs
//! for the same `(template, id, args)` tuple may exist at once. Jobs leave
//! the pending index when drained for dispatch; in-flight protection beyond
//! that point is carried by the one-time secret, not the queue.

use std::collections::VecDeque;
use std::sync::Mutex;

use dashmap::DashMap;
use metrics::{counter, gauge};

use super::templates::RawId;
use crate::cache::lock::mutex_lock;

const SOURCE: &str = "application::queue";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderJob {
    /// Template name, pre-canonicalization (`date_archive`, not
    /// `date_archive_202403`).
    pub template: String,
    pub id: RawId,
    /// Caller-supplied extra positional args, merged into the dispatch
    /// payload and part of the dedup identity.
    pub extra: Vec<String>,
}

impl RenderJob {
    pub fn new(template: impl Into<String>, id: RawId) -> Self {
        Self {
            template: template.into(),
            id,
            extra: Vec::new(),
        }
    }
}

pub struct RenderQueue {
    queue: Mutex<VecDeque<RenderJob>>,
    pending: DashMap<RenderJob, ()>,
}

impl RenderQueue {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            pending: DashMap::new(),
        }
    }

    pub fn is_scheduled(&self, job: &RenderJob) -> bool {
        self.pending.contains_key(job)
    }

    /// Enqueues unless an identical job is already pending. Returns whether
    /// the job was accepted.
    pub fn push(&self, job: RenderJob) -> bool {
        if self.pending.insert(job.clone(), ()).is_some() {
            counter!("specchio_schedule_dedup_total").increment(1);
            return false;
        }

        let mut queue = mutex_lock(&self.queue, SOURCE, "push");
        queue.push_back(job);
        gauge!("specchio_render_queue_len").set(queue.len() as f64);
        true
    }

    /// Removes up to `limit` jobs in FIFO order. Drained jobs are no longer
    /// pending and may be scheduled again.
    pub fn drain(&self, limit: usize) -> Vec<RenderJob> {
        let jobs: Vec<RenderJob> = {
            let mut queue = mutex_lock(&self.queue, SOURCE, "drain");
            let count = limit.min(queue.len());
            let jobs = queue.drain(..count).collect();
            gauge!("specchio_render_queue_len").set(queue.len() as f64);
            jobs
        };

        for job in &jobs {
            self.pending.remove(job);
        }

        jobs
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.queue, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RenderQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_rejects_identical_pending_job() {
        let queue = RenderQueue::new();
        let job = RenderJob::new("post", RawId::Int(7));

        assert!(queue.push(job.clone()));
        assert!(queue.is_scheduled(&job));
        assert!(!queue.push(job.clone()));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn jobs_with_different_args_are_distinct() {
        let queue = RenderQueue::new();
        let plain = RenderJob::new("post", RawId::Int(7));
        let mut with_args = plain.clone();
        with_args.extra.push("locale=nb".to_string());

        assert!(queue.push(plain));
        assert!(queue.push(with_args));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn drain_preserves_fifo_order_and_releases_pending() {
        let queue = RenderQueue::new();
        let first = RenderJob::new("frontpage", RawId::Int(0));
        let second = RenderJob::new("post", RawId::Int(7));

        queue.push(first.clone());
        queue.push(second.clone());

        let drained = queue.drain(10);
        assert_eq!(drained, vec![first.clone(), second]);
        assert!(queue.is_empty());

        // Drained jobs are schedulable again.
        assert!(!queue.is_scheduled(&first));
        assert!(queue.push(first));
    }

    #[test]
    fn drain_respects_limit() {
        let queue = RenderQueue::new();
        queue.push(RenderJob::new("post", RawId::Int(1)));
        queue.push(RenderJob::new("post", RawId::Int(2)));
        queue.push(RenderJob::new("post", RawId::Int(3)));

        assert_eq!(queue.drain(2).len(), 2);
        assert_eq!(queue.len(), 1);
    }
}
