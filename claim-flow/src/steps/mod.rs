//! The two workflow steps
pub mod recommend;
pub mod triage;

pub use recommend::RecommendStep;
pub use triage::TriageStep;
