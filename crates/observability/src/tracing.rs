//! Structured log output.
//!
//! JSON lines by default so session and gate events (`identity_id`,
//! `tenant_id`, `phase`, `destination`) stay machine-readable. `RUST_LOG` drives
//! filtering; `SAHARA_LOG_FORMAT=pretty` switches to human-readable output
//! for local runs.

use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Filter used when `RUST_LOG` is unset or invalid.
    pub default_filter: String,
    pub format: LogFormat,
    pub with_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_filter: "info".to_string(),
            format: LogFormat::Json,
            with_target: false,
        }
    }
}

impl LogConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(format) = lookup("SAHARA_LOG_FORMAT") {
            match format.trim().to_ascii_lowercase().as_str() {
                "json" => config.format = LogFormat::Json,
                "pretty" => config.format = LogFormat::Pretty,
                // No subscriber yet, so stderr is the only channel.
                other => eprintln!("ignoring unknown SAHARA_LOG_FORMAT {other:?}; using json"),
            }
        }
        if let Some(flag) = lookup("SAHARA_LOG_TARGET") {
            config.with_target = matches!(flag.trim(), "1" | "true" | "yes");
        }
        config
    }

    pub fn with_default_filter(mut self, filter: impl Into<String>) -> Self {
        self.default_filter = filter.into();
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_filter))
    }
}

/// Install the global subscriber. Returns `false` if one was already set.
pub fn init_with(config: &LogConfig) -> bool {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(config.filter())
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(config.with_target);

    match config.format {
        LogFormat::Json => builder.json().try_init().is_ok(),
        LogFormat::Pretty => builder.pretty().try_init().is_ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| v.to_string())
    }

    #[test]
    fn defaults_to_json_at_info() {
        let config = LogConfig::from_lookup(lookup(&[]));
        assert_eq!(config, LogConfig::default());
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.default_filter, "info");
    }

    #[test]
    fn env_selects_pretty_output_and_targets() {
        let config = LogConfig::from_lookup(lookup(&[("SAHARA_LOG_FORMAT", "Pretty"), ("SAHARA_LOG_TARGET", "true")]));
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.with_target);
    }

    #[test]
    fn unknown_format_keeps_json() {
        let config = LogConfig::from_lookup(lookup(&[("SAHARA_LOG_FORMAT", "xml")]));
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn second_install_is_a_noop() {
        let config = LogConfig::default().with_default_filter("debug");
        init_with(&config);
        assert!(!init_with(&config));
    }
}
