//! Two-step claim workflow: LLM triage followed by an LLM settlement recommendation.
//!
//! ```no_run
//! # async fn demo(claim: claim_flow::ClaimData) -> Result<(), claim_flow::CompletionError> {
//! use std::sync::Arc;
//! use claim_flow::{ClaimWorkflow, OpenRouterCompletion};
//!
//! let workflow = ClaimWorkflow::new(Arc::new(OpenRouterCompletion::from_env()?));
//! let state = workflow.run(claim).await;
//! println!("{} -> {:?}", state.status, state.recommendation);
//! # Ok(())
//! # }
//! ```

pub mod claim;
pub mod completion;
pub mod engine;
pub mod error;
pub mod estimator;
#[cfg(feature = "rig")]
pub mod llm;
pub mod schema;
pub mod state;
pub mod steps;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used types
pub use claim::ClaimData;
pub use completion::{RetryPolicy, StructuredCompletion, complete_as};
pub use engine::{ClaimWorkflow, ClaimWorkflowBuilder, RejectPolicy};
pub use error::{CompletionError, Stage, StepError, ValidationError};
pub use estimator::{DamageEstimator, FixedDamageEstimator, UniformDamageEstimator};
#[cfg(feature = "rig")]
pub use llm::OpenRouterCompletion;
pub use schema::{Field, FieldKind, Schema};
pub use state::{
    Recommendation, RecommendationDecision, TriageDecision, TriageResult, WorkflowState,
    WorkflowStatus,
};
