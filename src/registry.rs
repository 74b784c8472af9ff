//! JobRegistry - in-memory ownership of Job and JobExecution records
//!
//! The registry is the single owner of job records and their append-only
//! execution history. It lives inside the scheduler actor, so access is
//! already serialized and the maps need no locking. Job names are unique
//! within the registry; dependencies resolve against them.

use std::collections::HashMap;

use tracing::debug;

use crate::domain::{Job, JobExecution, JobStatus};

/// Owns all Job and JobExecution records
#[derive(Default)]
pub struct JobRegistry {
    jobs: HashMap<String, Job>,
    history: HashMap<String, Vec<JobExecution>>,
}

impl JobRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a name is already taken by a different job
    pub fn name_taken(&self, name: &str, excluding_id: Option<&str>) -> bool {
        self.jobs
            .values()
            .any(|j| j.name == name && excluding_id != Some(j.id.as_str()))
    }

    /// Insert a new job
    pub fn insert(&mut self, job: Job) {
        debug!(job_id = %job.id, name = %job.name, "JobRegistry::insert: called");
        self.history.entry(job.id.clone()).or_default();
        self.jobs.insert(job.id.clone(), job);
    }

    /// Look up a job by id
    pub fn get(&self, id: &str) -> Option<&Job> {
        self.jobs.get(id)
    }

    /// Mutable lookup by id
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Job> {
        self.jobs.get_mut(id)
    }

    /// Look up a job by its unique name
    pub fn get_by_name(&self, name: &str) -> Option<&Job> {
        self.jobs.values().find(|j| j.name == name)
    }

    /// Whether a job exists
    pub fn contains(&self, id: &str) -> bool {
        self.jobs.contains_key(id)
    }

    /// Remove a job and its history
    pub fn remove(&mut self, id: &str) -> Option<Job> {
        debug!(job_id = %id, "JobRegistry::remove: called");
        self.history.remove(id);
        self.jobs.remove(id)
    }

    /// Snapshot of all jobs, oldest first
    pub fn list(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.values().cloned().collect();
        jobs.sort_by_key(|j| j.created_at);
        jobs
    }

    /// Number of registered jobs
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Whether the registry holds no jobs
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Count of jobs with the given status
    pub fn count_by_status(&self, status: JobStatus) -> usize {
        self.jobs.values().filter(|j| j.status == status).count()
    }

    /// Whether every named dependency resolves to a Completed job
    ///
    /// A dependency that names no job counts as unmet: the gate stays
    /// closed until a job with that name completes.
    pub fn dependencies_met(&self, job: &Job) -> bool {
        job.dependencies.iter().all(|name| {
            self.get_by_name(name)
                .map(|dep| dep.status == JobStatus::Completed)
                .unwrap_or(false)
        })
    }

    /// Name of the first unmet dependency, if any
    pub fn first_unmet_dependency<'a>(&self, job: &'a Job) -> Option<&'a String> {
        job.dependencies.iter().find(|name| {
            self.get_by_name(name)
                .map(|dep| dep.status != JobStatus::Completed)
                .unwrap_or(true)
        })
    }

    /// Append an execution to a job's history
    pub fn record_execution(&mut self, execution: JobExecution) {
        debug!(
            job_id = %execution.job_id,
            execution_id = %execution.id,
            "JobRegistry::record_execution: called"
        );
        self.history.entry(execution.job_id.clone()).or_default().push(execution);
    }

    /// Execution history for a job, oldest first
    pub fn history(&self, job_id: &str) -> Option<&[JobExecution]> {
        self.history.get(job_id).map(|v| v.as_slice())
    }

    /// Mutable lookup of one execution in a job's history
    pub fn execution_mut(&mut self, job_id: &str, exec_id: &str) -> Option<&mut JobExecution> {
        self.history
            .get_mut(job_id)?
            .iter_mut()
            .find(|e| e.id == exec_id)
    }

    /// Iterate every execution across all jobs
    pub fn all_executions(&self) -> impl Iterator<Item = &JobExecution> {
        self.history.values().flatten()
    }
}
