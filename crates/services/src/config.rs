use std::time::Duration;

use study_core::AggregationPolicy;
use tracing::warn;

pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 4 * 1024 * 1024;
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_USER_ID: &str = "anonymous";

/// Runtime knobs for study set generation and progress reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyConfig {
    /// Upper bound on decoded upload size.
    pub max_document_bytes: usize,
    /// Budget for one generation call.
    pub generation_timeout: Duration,
    pub policy: AggregationPolicy,
    /// Owner recorded on progress rows.
    pub user_id: String,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
            policy: AggregationPolicy::default(),
            user_id: DEFAULT_USER_ID.to_owned(),
        }
    }
}

impl StudyConfig {
    /// Reads `STUDY_*` variables, keeping defaults for anything unset or
    /// unparsable.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let max_document_bytes = env_parsed("STUDY_MAX_DOCUMENT_BYTES")
            .unwrap_or(defaults.max_document_bytes);
        let generation_timeout = env_parsed("STUDY_GENERATION_TIMEOUT_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.generation_timeout);
        let policy = env_parsed("STUDY_PROGRESS_POLICY").unwrap_or(defaults.policy);
        let user_id = env_string("STUDY_USER_ID").unwrap_or(defaults.user_id);

        Self {
            max_document_bytes,
            generation_timeout,
            policy,
            user_id,
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn env_parsed<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env_string(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(key, value = %raw, error = %err, "ignoring invalid setting");
            None
        }
    }
}
