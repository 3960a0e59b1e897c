use crate::store::DEFAULT_NAMESPACE;
use std::time::Duration;

const DEFAULT_LOG_FILTER: &str = "attendd=info";
const DEFAULT_INSIGHT_TIMEOUT_MS: u64 = 15_000;

/// Process configuration loaded from environment variables.
///
/// | Env Var                      | Default        |
/// |------------------------------|----------------|
/// | `ATTENDD_LOG`                | `attendd=info` |
/// | `ATTENDD_NAMESPACE`          | `smartattend`  |
/// | `ATTENDD_INSIGHT_URL`        | unset          |
/// | `ATTENDD_INSIGHT_API_KEY`    | unset          |
/// | `ATTENDD_INSIGHT_TIMEOUT_MS` | `15000`        |
#[derive(Debug, Clone)]
pub struct Config {
    pub log_filter: String,
    /// Prefix of every collection key in the store.
    pub namespace: String,
    /// Insight endpoint; `None` disables the gateway.
    pub insight_url: Option<String>,
    pub insight_api_key: Option<String>,
    pub insight_timeout: Duration,
    /// Problems found while loading, logged once tracing is up.
    pub warnings: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            insight_url: None,
            insight_api_key: None,
            insight_timeout: Duration::from_millis(DEFAULT_INSIGHT_TIMEOUT_MS),
            warnings: Vec::new(),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(non_empty_var)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let mut warnings = Vec::new();

        let insight_timeout = match lookup("ATTENDD_INSIGHT_TIMEOUT_MS") {
            None => defaults.insight_timeout,
            Some(raw) => match raw.parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => {
                    warnings.push(format!(
                        "ignoring invalid ATTENDD_INSIGHT_TIMEOUT_MS={:?}, using {}",
                        raw, DEFAULT_INSIGHT_TIMEOUT_MS
                    ));
                    defaults.insight_timeout
                }
            },
        };

        Self {
            log_filter: lookup("ATTENDD_LOG").unwrap_or(defaults.log_filter),
            namespace: lookup("ATTENDD_NAMESPACE").unwrap_or(defaults.namespace),
            insight_url: lookup("ATTENDD_INSIGHT_URL"),
            insight_api_key: lookup("ATTENDD_INSIGHT_API_KEY"),
            insight_timeout,
            warnings,
        }
    }
}
