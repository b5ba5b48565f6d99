//! Completion stubs for exercising the workflow without a model.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use crate::{completion::StructuredCompletion, error::CompletionError, schema::Schema};

/// A prompt received by a stub
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub schema: &'static str,
    pub prompt: String,
}

#[derive(Default)]
struct CallLog(Mutex<Vec<RecordedCall>>);

impl CallLog {
    fn record(&self, schema: &Schema, prompt: &str) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                schema: schema.name,
                prompt: prompt.to_string(),
            });
    }

    fn snapshot(&self) -> Vec<RecordedCall> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// Replays a fixed sequence of raw replies and failures, one per call.
///
/// Raw replies go through [`Schema::parse_response`], so malformed replies fail exactly like
/// they would from a real model.
#[derive(Default)]
pub struct ScriptedCompletion {
    replies: Mutex<VecDeque<Result<String, String>>>,
    log: CallLog,
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw reply
    pub fn reply(self, raw: impl Into<String>) -> Self {
        self.push(Ok(raw.into()))
    }

    /// Queue a JSON reply
    pub fn reply_json(self, value: Value) -> Self {
        self.push(Ok(value.to_string()))
    }

    /// Queue a transport-level failure
    pub fn fail(self, message: impl Into<String>) -> Self {
        self.push(Err(message.into()))
    }

    fn push(self, reply: Result<String, String>) -> Self {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.log.snapshot()
    }

    pub fn call_count(&self) -> usize {
        self.calls().len()
    }

    /// Number of calls made with the named schema
    pub fn calls_for(&self, schema: &Schema) -> usize {
        self.calls().iter().filter(|c| c.schema == schema.name).count()
    }
}

#[async_trait]
impl StructuredCompletion for ScriptedCompletion {
    async fn complete(&self, schema: &Schema, prompt: &str) -> Result<Value, CompletionError> {
        self.log.record(schema, prompt);
        let next = self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match next {
            Some(Ok(raw)) => schema.parse_response(&raw),
            Some(Err(message)) => Err(CompletionError::new(message)),
            None => Err(CompletionError::new("no scripted reply left")),
        }
    }
}

/// Deterministic stand-in for the model that applies the triage and settlement rules to the
/// rendered prompt. Identical prompts always produce identical replies.
#[derive(Default)]
pub struct RuleBasedCompletion {
    log: CallLog,
}

impl RuleBasedCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.log.snapshot()
    }

    fn triage(prompt: &str) -> Value {
        let claim = section_after(prompt, "Claim Data:").to_lowercase();
        if claim.contains("injur") || claim.contains("dispute") {
            json!({"decision": "REJECT", "reason": "Claim mentions injury or a disputed fault and needs manual review."})
        } else {
            json!({"decision": "PROCEED", "reason": "Simple property damage claim; claimant not at fault."})
        }
    }

    fn recommend(prompt: &str) -> Value {
        let triage = section_after(prompt, "- Triage Decision:");
        if triage.contains("\"REJECT\"") {
            return json!({"decision": "DENY", "payout": 0.0, "reason": "Claim was rejected at triage."});
        }
        let estimate = section_after(prompt, "Estimated Damage Cost: $")
            .split_whitespace()
            .next()
            .and_then(|n| n.parse::<f64>().ok())
            .unwrap_or(0.0);
        json!({
            "decision": "APPROVE",
            "payout": estimate,
            "reason": "Approved: property damage from the described incident, paid at the estimated repair cost.",
        })
    }
}

fn section_after<'a>(prompt: &'a str, marker: &str) -> &'a str {
    prompt
        .rfind(marker)
        .map(|idx| &prompt[idx + marker.len()..])
        .unwrap_or("")
}

#[async_trait]
impl StructuredCompletion for RuleBasedCompletion {
    async fn complete(&self, schema: &Schema, prompt: &str) -> Result<Value, CompletionError> {
        self.log.record(schema, prompt);
        let reply = match schema.name {
            "TriageResult" => Self::triage(prompt),
            "Recommendation" => Self::recommend(prompt),
            other => {
                return Err(CompletionError::new(format!("no rule for schema {other}")));
            }
        };
        schema.parse_response(&reply.to_string())
    }
}
