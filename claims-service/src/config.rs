use anyhow::{Context, Result, anyhow};
use claim_flow::{RejectPolicy, llm::DEFAULT_MODEL};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_WORKFLOW_TIMEOUT_SECS: u64 = 120;

/// Configuration for the claims service, read from the environment
#[derive(Clone)]
pub struct ServiceConfig {
    pub openrouter_api_key: String,
    pub completion_model: String,
    pub completion_max_attempts: u32,
    /// `None` selects the in-memory store
    pub database_url: Option<String>,
    pub bind_addr: String,
    pub workflow_timeout: Duration,
    pub reject_policy: RejectPolicy,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let openrouter_api_key =
            var("OPENROUTER_API_KEY").ok_or_else(|| anyhow!("OPENROUTER_API_KEY not set"))?;

        Ok(Self {
            openrouter_api_key,
            completion_model: var("COMPLETION_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            completion_max_attempts: parse_or(
                var("COMPLETION_MAX_ATTEMPTS"),
                "COMPLETION_MAX_ATTEMPTS",
                DEFAULT_MAX_ATTEMPTS,
            )?,
            database_url: var("DATABASE_URL"),
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            workflow_timeout: Duration::from_secs(parse_or(
                var("WORKFLOW_TIMEOUT_SECS"),
                "WORKFLOW_TIMEOUT_SECS",
                DEFAULT_WORKFLOW_TIMEOUT_SECS,
            )?),
            reject_policy: match var("TRIAGE_REJECT_POLICY") {
                Some(value) => value
                    .parse()
                    .map_err(|e: String| anyhow!(e))
                    .context("invalid TRIAGE_REJECT_POLICY")?,
                None => RejectPolicy::default(),
            },
        })
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid {key}: '{raw}'")),
        None => Ok(default),
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("openrouter_api_key", &"<redacted>")
            .field("completion_model", &self.completion_model)
            .field("completion_max_attempts", &self.completion_max_attempts)
            .field("database_url", &self.database_url.as_ref().map(|_| "<redacted>"))
            .field("bind_addr", &self.bind_addr)
            .field("workflow_timeout", &self.workflow_timeout)
            .field("reject_policy", &self.reject_policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ServiceConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServiceConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[("OPENROUTER_API_KEY", "sk-test")]).unwrap();
        assert_eq!(config.completion_model, DEFAULT_MODEL);
        assert_eq!(config.completion_max_attempts, 3);
        assert_eq!(config.database_url, None);
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.workflow_timeout, Duration::from_secs(120));
        assert_eq!(config.reject_policy, RejectPolicy::Stop);
    }

    #[test]
    fn test_missing_api_key_is_an_error() {
        assert!(config(&[]).is_err());
        assert!(config(&[("OPENROUTER_API_KEY", "  ")]).is_err());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("OPENROUTER_API_KEY", "sk-test"),
            ("COMPLETION_MODEL", "google/gemini-flash-1.5"),
            ("COMPLETION_MAX_ATTEMPTS", "5"),
            ("DATABASE_URL", "postgres://localhost/claims"),
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("WORKFLOW_TIMEOUT_SECS", "30"),
            ("TRIAGE_REJECT_POLICY", "recommend"),
        ])
        .unwrap();
        assert_eq!(config.completion_model, "google/gemini-flash-1.5");
        assert_eq!(config.completion_max_attempts, 5);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/claims"));
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.workflow_timeout, Duration::from_secs(30));
        assert_eq!(config.reject_policy, RejectPolicy::Recommend);
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(config(&[("OPENROUTER_API_KEY", "k"), ("WORKFLOW_TIMEOUT_SECS", "soon")]).is_err());
        assert!(config(&[("OPENROUTER_API_KEY", "k"), ("TRIAGE_REJECT_POLICY", "retry")]).is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = config(&[
            ("OPENROUTER_API_KEY", "sk-secret"),
            ("DATABASE_URL", "postgres://user:pw@db/claims"),
        ])
        .unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(!debug.contains("pw@db"));
    }
}
