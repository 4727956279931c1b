//! Configuration presets for common scenarios

use super::{Config, DisplayConfig, Fields, Format};

impl Config {
    /// Create configuration from environment variables
    ///
    /// | Variable | Effect |
    /// |---|---|
    /// | `KEYTURN_LOG`, then `RUST_LOG` | level filter |
    /// | `KEYTURN_LOG_FORMAT` | `pretty`, `compact` or `json` |
    /// | `KEYTURN_LOG_COLORS` | `0`/`false` disables colours |
    /// | `KEYTURN_SERVICE`, `KEYTURN_ENV`, `KEYTURN_VERSION` | global fields |
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`Config::from_env`] with a custom variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(level) = lookup("KEYTURN_LOG").or_else(|| lookup("RUST_LOG")) {
            config.level = level;
        }

        if let Some(format) = lookup("KEYTURN_LOG_FORMAT") {
            config.format = Format::parse_lossy(&format);
        }

        if let Some(colors) = lookup("KEYTURN_LOG_COLORS") {
            config.display.colors = !matches!(colors.trim(), "0" | "false" | "no");
        }

        config.fields = Fields {
            service: lookup("KEYTURN_SERVICE"),
            env: lookup("KEYTURN_ENV"),
            version: lookup("KEYTURN_VERSION"),
        };

        config
    }

    /// Development configuration (pretty, debug level)
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            format: Format::Pretty,
            display: DisplayConfig {
                colors: true,
                source: true,
                ..DisplayConfig::default()
            },
            ..Self::default()
        }
    }

    /// Production configuration (JSON, info level)
    #[must_use]
    pub fn production() -> Self {
        Self {
            level: "info".to_string(),
            format: Format::Json,
            display: DisplayConfig {
                colors: false,
                source: false,
                ..DisplayConfig::default()
            },
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn keyturn_log_wins_over_rust_log() {
        let config = Config::from_lookup(lookup(&[("KEYTURN_LOG", "debug"), ("RUST_LOG", "warn")]));
        assert_eq!(config.level, "debug");

        let config = Config::from_lookup(lookup(&[("RUST_LOG", "warn")]));
        assert_eq!(config.level, "warn");

        let config = Config::from_lookup(lookup(&[]));
        assert_eq!(config, Config::default());
    }

    #[rstest]
    #[case("json", Format::Json)]
    #[case("PRETTY", Format::Pretty)]
    #[case("compact", Format::Compact)]
    #[case("logfmt", Format::Compact)]
    fn format_from_env(#[case] raw: &str, #[case] expected: Format) {
        let config = Config::from_lookup(lookup(&[("KEYTURN_LOG_FORMAT", raw)]));
        assert_eq!(config.format, expected);
    }

    #[test]
    fn global_fields_from_env() {
        let config = Config::from_lookup(lookup(&[
            ("KEYTURN_SERVICE", "rotation"),
            ("KEYTURN_ENV", "prod"),
            ("KEYTURN_LOG_COLORS", "0"),
        ]));
        assert_eq!(config.fields.service.as_deref(), Some("rotation"));
        assert_eq!(config.fields.env.as_deref(), Some("prod"));
        assert!(config.fields.version.is_none());
        assert!(!config.display.colors);
    }

    #[test]
    fn presets() {
        assert_eq!(Config::production().format, Format::Json);
        assert!(!Config::production().display.colors);
        assert_eq!(Config::development().level, "debug");
        assert!(Config::development().display.source);
    }
}
