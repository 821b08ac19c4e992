//! Checkpoints for resumable operations.

use crate::clock::Clock;
use crate::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque snapshot an operation can be resumed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint<D = Value> {
    pub data: D,
    pub timestamp: Timestamp,
    pub stage: String,
}

impl<D> Checkpoint<D> {
    pub fn new(data: D, stage: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            data,
            timestamp,
            stage: stage.into(),
        }
    }

    /// Snapshot `data` at `stage`, stamped from `clock`.
    pub fn capture(clock: &impl Clock, stage: impl Into<String>, data: D) -> Self {
        Self::new(data, stage, clock.now())
    }
}

/// A checkpoint plus the tools allowed to resume from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeCapability<D = Value> {
    pub checkpoint: Checkpoint<D>,
    #[serde(alias = "resumable_operations")]
    pub resumable_operations: Vec<String>,
}

impl<D> ResumeCapability<D> {
    pub fn new(checkpoint: Checkpoint<D>, resumable_operations: Vec<String>) -> Self {
        Self {
            checkpoint,
            resumable_operations,
        }
    }

    pub fn can_resume(&self, tool_name: &str) -> bool {
        self.resumable_operations.iter().any(|op| op == tool_name)
    }
}
