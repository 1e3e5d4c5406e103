//! In-memory job registry.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;

use super::{Job, JobResult, JobStatus};

/// Jobs by id, for the lifetime of the process.
///
/// Every mutation happens under the write lock, so readers always get a
/// whole snapshot.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<String, Job>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<Job> {
        self.jobs
            .read()
            .ok()
            .and_then(|guard| guard.get(id).cloned())
    }

    /// Insert `job` unless an active job already holds its id.
    ///
    /// On conflict the existing job is returned and nothing changes. A
    /// finished job with the same id is replaced.
    pub fn insert_if_idle(&self, job: Job) -> Result<(), Job> {
        let Ok(mut guard) = self.jobs.write() else {
            return Err(job);
        };
        if let Some(existing) = guard.get(&job.id) {
            if existing.status.is_active() {
                return Err(existing.clone());
            }
        }
        guard.insert(job.id.clone(), job);
        Ok(())
    }

    /// Apply `f` to the job and bump `updated_at`. Returns false if unknown.
    pub fn update<F>(&self, id: &str, f: F) -> bool
    where
        F: FnOnce(&mut Job),
    {
        let Ok(mut guard) = self.jobs.write() else {
            return false;
        };
        match guard.get_mut(id) {
            Some(job) => {
                f(job);
                job.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    pub fn mark_running(&self, id: &str) {
        self.update(id, |job| job.status = JobStatus::Running);
    }

    pub fn set_total(&self, id: &str, total: usize) {
        self.update(id, |job| job.total = total);
    }

    pub fn set_progress(&self, id: &str, progress: usize, total: usize) {
        self.update(id, |job| {
            job.progress = progress;
            job.total = total;
        });
    }

    pub fn complete(&self, id: &str, result: JobResult) {
        self.update(id, |job| {
            job.status = JobStatus::Completed;
            job.result = Some(result);
            job.error = None;
        });
    }

    pub fn fail(&self, id: &str, message: impl Into<String>) {
        let message = message.into();
        self.update(id, |job| {
            job.status = JobStatus::Error;
            job.error = Some(message);
        });
    }

    /// All jobs, oldest first.
    pub fn list(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self
            .jobs
            .read()
            .map(|guard| guard.values().cloned().collect())
            .unwrap_or_default();
        jobs.sort_by_key(|j| j.created_at);
        jobs
    }

    pub fn active_count(&self) -> usize {
        self.jobs
            .read()
            .map(|guard| guard.values().filter(|j| j.status.is_active()).count())
            .unwrap_or(0)
    }
}
