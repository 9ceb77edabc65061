//! Configuration loading and representation.

use tracing::warn;

use payorflow_batch::MAX_PAYORS_PER_FILE;

/// Environment variable overriding [`EnrolmentConfig::max_payors_per_file`].
pub const MAX_PAYORS_ENV: &str = "PAYORFLOW_MAX_PAYORS_PER_FILE";

/// Enrolment pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrolmentConfig {
    /// Upper bound of records accepted in one import file.
    pub max_payors_per_file: usize,
    /// Name prefix of background execution threads.
    pub executor_thread_name: String,
}

impl Default for EnrolmentConfig {
    fn default() -> Self {
        Self {
            max_payors_per_file: MAX_PAYORS_PER_FILE,
            executor_thread_name: "payor-enrolment".to_string(),
        }
    }
}

impl EnrolmentConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (tests pass a closure over a map).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(raw) = lookup(MAX_PAYORS_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(max) if max > 0 => config.max_payors_per_file = max,
                _ => warn!(
                    value = %raw,
                    default = config.max_payors_per_file,
                    "ignoring invalid {MAX_PAYORS_ENV}"
                ),
            }
        }
        config
    }

    pub fn with_max_payors_per_file(mut self, max: usize) -> Self {
        self.max_payors_per_file = max;
        self
    }

    pub fn with_executor_thread_name(mut self, name: impl Into<String>) -> Self {
        self.executor_thread_name = name.into();
        self
    }
}
