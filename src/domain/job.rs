//! Job record type
//!
//! A Job is a user-defined unit of recurring work. The scheduler decides
//! when it becomes eligible, queues it by priority, and retries failed
//! attempts up to `max_retries`.

use serde::{Deserialize, Serialize};

use super::id::generate_id;
use super::now_ms;
use super::priority::Priority;

/// Lifecycle status of a Job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Scheduled and waiting for its next trigger
    #[default]
    Active,
    /// Suspended by the user, no trigger installed
    Paused,
    /// An attempt is in flight
    Running,
    /// Last attempt succeeded
    Completed,
    /// Retries exhausted, requires explicit re-activation
    Failed,
}

impl JobStatus {
    /// Terminal failure is sticky until toggled back to Active
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Paused => write!(f, "paused"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A recurring unit of work tracked by the registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique identifier
    pub id: String,

    /// Human-readable name, unique within the registry; dependencies
    /// reference jobs by this name
    pub name: String,

    /// Recurrence expression, resolved against the fixed cadence table
    pub schedule: String,

    /// Opaque executable reference handed to the JobExecutor
    pub command: String,

    /// Dispatch priority
    pub priority: Priority,

    /// Maximum automatic retries after a failed attempt
    pub max_retries: u32,

    /// Names of jobs that must be Completed before this one may run
    pub dependencies: Vec<String>,

    /// Optional free-form description
    pub description: Option<String>,

    /// Current lifecycle status
    pub status: JobStatus,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Start of the most recent attempt (Unix milliseconds)
    pub last_run: Option<i64>,

    /// Anticipated next trigger firing (Unix milliseconds)
    pub next_run: Option<i64>,

    /// Failures since the last success, in [0, max_retries]
    pub retry_count: u32,
}

impl Job {
    /// Create a new Active Job with generated ID and default policy
    pub fn new(name: impl Into<String>, schedule: impl Into<String>, command: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: generate_id("job", &name),
            name,
            schedule: schedule.into(),
            command: command.into(),
            priority: Priority::default(),
            max_retries: 3,
            dependencies: Vec::new(),
            description: None,
            status: JobStatus::Active,
            created_at: now_ms(),
            last_run: None,
            next_run: None,
            retry_count: 0,
        }
    }

    /// Build a Job from a creation spec
    pub fn from_spec(spec: JobSpec) -> Self {
        let mut job = Self::new(spec.name, spec.schedule, spec.command);
        job.priority = spec.priority;
        job.max_retries = spec.max_retries;
        job.dependencies = spec.dependencies;
        job.description = spec.description;
        job
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the retry limit
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Add a dependency by job name
    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(name.into());
        self
    }

    /// Update the status
    pub fn set_status(&mut self, status: JobStatus) {
        self.status = status;
    }

    /// Whether the job is waiting on its schedule
    pub fn is_active(&self) -> bool {
        self.status == JobStatus::Active
    }

    /// Whether an attempt is currently in flight
    pub fn is_running(&self) -> bool {
        self.status == JobStatus::Running
    }
}

/// Parameters for creating a Job
///
/// Used both by the library API and by the `jobs` section of the config
/// file, so every policy field carries a serde default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    pub name: String,
    pub schedule: String,
    pub command: String,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default)]
    pub dependencies: Vec<String>,

    #[serde(default)]
    pub description: Option<String>,
}

fn default_max_retries() -> u32 {
    3
}

impl JobSpec {
    /// Minimal shape for tests and programmatic creation
    pub fn new(name: impl Into<String>, schedule: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schedule: schedule.into(),
            command: command.into(),
            priority: Priority::default(),
            max_retries: default_max_retries(),
            dependencies: Vec::new(),
            description: None,
        }
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the retry limit
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Add a dependency by job name
    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(name.into());
        self
    }
}

/// Partial update for an existing Job
///
/// Absent fields leave the job untouched. Status is not patchable here;
/// lifecycle transitions go through toggle/run-now.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobPatch {
    pub name: Option<String>,
    pub schedule: Option<String>,
    pub command: Option<String>,
    pub priority: Option<Priority>,
    pub max_retries: Option<u32>,
    pub dependencies: Option<Vec<String>>,
    pub description: Option<String>,
}

impl JobPatch {
    /// Apply the patch in place
    pub fn apply(&self, job: &mut Job) {
        if let Some(name) = &self.name {
            job.name = name.clone();
        }
        if let Some(schedule) = &self.schedule {
            job.schedule = schedule.clone();
        }
        if let Some(command) = &self.command {
            job.command = command.clone();
        }
        if let Some(priority) = self.priority {
            job.priority = priority;
        }
        if let Some(max_retries) = self.max_retries {
            job.max_retries = max_retries;
        }
        if let Some(dependencies) = &self.dependencies {
            job.dependencies = dependencies.clone();
        }
        if let Some(description) = &self.description {
            job.description = Some(description.clone());
        }
    }
}
