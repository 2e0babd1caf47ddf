use std::time::Duration;

use time::ext::NumericalStdDuration as _;

pub const DEFAULT_NAMESPACE: &str = "default";

/// Bounds of a polling run.
///
/// The total wait is roughly `max_attempts * attempt_delay`; a slow probe is
/// only bounded by `probe_timeout` when one is set, otherwise by the
/// transport's own timeout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollConfig {
    pub max_attempts: u32,
    pub attempt_delay: Duration,
    pub probe_timeout: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 60,
            attempt_delay: 2.std_seconds(),
            probe_timeout: None,
        }
    }
}

impl PollConfig {
    /// At least one attempt is always made.
    pub fn with_max_attempts(self, max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..self
        }
    }

    pub fn with_attempt_delay(self, attempt_delay: Duration) -> Self {
        Self {
            attempt_delay,
            ..self
        }
    }

    pub fn with_probe_timeout(self, probe_timeout: impl Into<Option<Duration>>) -> Self {
        Self {
            probe_timeout: probe_timeout.into(),
            ..self
        }
    }
}

/// Suite-wide settings shared by every scenario of a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestContext {
    /// API endpoint; `None` means the ambient client configuration.
    pub host: Option<String>,
    /// Namespace all resources of the run are created in.
    pub namespace: String,
    /// Deployment environment tag, only used to decide whether a scenario applies.
    pub provider: Option<String>,
}

impl Default for TestContext {
    fn default() -> Self {
        Self {
            host: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
            provider: None,
        }
    }
}

impl TestContext {
    pub fn new(namespace: impl ToString) -> Self {
        Self {
            namespace: namespace.to_string(),
            ..Self::default()
        }
    }

    pub fn with_host(self, host: impl Into<Option<String>>) -> Self {
        Self {
            host: host.into(),
            ..self
        }
    }

    pub fn with_provider(self, provider: impl Into<Option<String>>) -> Self {
        Self {
            provider: provider.into(),
            ..self
        }
    }

    pub fn is_provider(&self, provider: &str) -> bool {
        self.provider.as_deref() == Some(provider)
    }
}
