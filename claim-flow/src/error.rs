use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The completion service could not produce a value conforming to the requested schema.
///
/// Network failures, quota errors and malformed responses all collapse into this one kind.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("completion failed: {message}")]
pub struct CompletionError {
    pub message: String,
}

impl CompletionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Workflow step that produced a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Triage,
    Recommend,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Triage => "triage",
            Stage::Recommend => "recommend",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A workflow step failed because its completion call failed
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{stage} step failed: {cause}")]
pub struct StepError {
    pub stage: Stage,
    pub cause: CompletionError,
}

impl StepError {
    pub fn new(stage: Stage, cause: CompletionError) -> Self {
        Self { stage, cause }
    }
}

/// Submitted claim data violates a required-field constraint
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("policy number must not be empty")]
    EmptyPolicyNumber,

    #[error("claimant name must not be empty")]
    EmptyClaimantName,
}
