//! Jobs and the read model exposed to callers.
//!
//! A [`Job`]'s state is a tagged union: the source bytes live only in
//! `Pending`, the result lives only in `Done`. There is no way to reach a
//! result for a job that is not finished, or a source for one that is.
//!
//! ```text
//! Pending(source) ──▶ Processing ──▶ Done(output)
//!                                └─▶ Error(reason)
//! ```
//!
//! Transitions only move forward; `Done` and `Error` are terminal.

use crate::imaging::{TransformConfig, TransformOutput};
use crate::types::SourceImage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, unique job token. Ordered by arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub(crate) u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// Discriminant of [`JobState`], for display and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Done,
    Error,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Done => "done",
            Self::Error => "error",
        })
    }
}

#[derive(Debug, Clone)]
pub enum JobState {
    Pending(SourceImage),
    Processing,
    Done(TransformOutput),
    Error(String),
}

impl JobState {
    pub fn status(&self) -> JobStatus {
        match self {
            Self::Pending(_) => JobStatus::Pending,
            Self::Processing => JobStatus::Processing,
            Self::Done(_) => JobStatus::Done,
            Self::Error(_) => JobStatus::Error,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub file_name: String,
    pub original_size: u64,
    /// Snapshot taken at enqueue time.
    pub config: TransformConfig,
    state: JobState,
}

impl Job {
    pub(crate) fn new(id: JobId, source: SourceImage, config: TransformConfig) -> Self {
        Self {
            id,
            file_name: source.file_name.clone(),
            original_size: source.size(),
            config,
            state: JobState::Pending(source),
        }
    }

    pub fn status(&self) -> JobStatus {
        self.state.status()
    }

    pub fn output(&self) -> Option<&TransformOutput> {
        match &self.state {
            JobState::Done(output) => Some(output),
            _ => None,
        }
    }

    /// `Pending → Processing`, handing the source to the caller.
    ///
    /// Returns `None` (and leaves the job alone) unless it is pending.
    pub(crate) fn start(&mut self) -> Option<SourceImage> {
        if !matches!(self.state, JobState::Pending(_)) {
            return None;
        }
        match std::mem::replace(&mut self.state, JobState::Processing) {
            JobState::Pending(source) => Some(source),
            _ => None,
        }
    }

    /// `Processing → Done | Error`. Ignored from any other state.
    pub(crate) fn finish(&mut self, outcome: Result<TransformOutput, String>) -> bool {
        if !matches!(self.state, JobState::Processing) {
            return false;
        }
        self.state = match outcome {
            Ok(output) => JobState::Done(output),
            Err(reason) => JobState::Error(reason),
        };
        true
    }

    pub fn record(&self) -> JobRecord {
        let output = self.output();
        JobRecord {
            id: self.id,
            file_name: self.file_name.clone(),
            status: self.status(),
            original_size: self.original_size,
            output_size: output.map(|o| o.size()),
            output_width: output.map(|o| o.width),
            output_height: output.map(|o| o.height),
            output_file_name: output.map(|o| o.file_name.clone()),
            savings_ratio: output.map(|o| o.savings_ratio),
            error: match &self.state {
                JobState::Error(reason) => Some(reason.clone()),
                _ => None,
            },
        }
    }
}

/// What the UI shows for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub file_name: String,
    pub status: JobStatus,
    pub original_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub savings_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
