//! Logger builder implementation

use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

use crate::config::{Config, Format};
use crate::error::{LogError, LogResult};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Logger builder
#[derive(Debug)]
pub struct LoggerBuilder {
    config: Config,
}

/// Guard that keeps the logger's root span entered
///
/// Drop it at shutdown; global fields stop being attached afterwards.
#[derive(Debug)]
pub struct LoggerGuard {
    _root_span: Option<tracing::span::EnteredSpan>,
}

impl LoggerBuilder {
    /// Create builder from config
    #[must_use]
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Parse the level filter without installing anything
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Filter`] when the directive is invalid.
    pub fn filter(&self) -> LogResult<EnvFilter> {
        EnvFilter::try_new(&self.config.level)
            .map_err(|e| LogError::Filter(format!("{}: {e}", self.config.level)))
    }

    /// Build and install the global subscriber
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Filter string cannot be parsed
    /// - A global subscriber is already installed
    pub fn build(self) -> LogResult<LoggerGuard> {
        let filter = self.filter()?;
        let layer = fmt_layer(&self.config).with_filter(filter);

        tracing_subscriber::registry()
            .with(layer)
            .try_init()
            .map_err(|e| LogError::Init(e.to_string()))?;

        let fields = &self.config.fields;
        let root_span = (!fields.is_empty()).then(|| {
            tracing::info_span!(
                "app",
                service = fields.service.as_deref().unwrap_or(""),
                env = fields.env.as_deref().unwrap_or(""),
                version = fields.version.as_deref().unwrap_or(""),
            )
            .entered()
        });

        Ok(LoggerGuard {
            _root_span: root_span,
        })
    }
}

/// Formatting layer for the configured format and display options
fn fmt_layer(config: &Config) -> BoxedLayer {
    let display = &config.display;

    macro_rules! finish {
        ($layer:expr) => {
            if display.time {
                $layer.boxed()
            } else {
                $layer.without_time().boxed()
            }
        };
    }

    match config.format {
        Format::Pretty => finish!(
            fmt::layer()
                .pretty()
                .with_ansi(display.colors)
                .with_target(display.target)
                .with_file(display.source)
                .with_line_number(display.source)
        ),
        Format::Compact => finish!(
            fmt::layer()
                .compact()
                .with_ansi(display.colors)
                .with_target(display.target)
                .with_file(display.source)
                .with_line_number(display.source)
        ),
        Format::Json => finish!(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_current_span(true)
                .with_span_list(false)
                .with_target(display.target)
                .with_file(display.source)
                .with_line_number(display.source)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_filter_is_reported() {
        let builder = LoggerBuilder::from_config(Config {
            level: "keyturn=notalevel".to_string(),
            ..Config::default()
        });
        assert!(matches!(builder.filter(), Err(LogError::Filter(_))));
        assert!(matches!(builder.build(), Err(LogError::Filter(_))));
    }

    #[test]
    fn every_format_builds_a_layer() {
        for format in [Format::Pretty, Format::Compact, Format::Json] {
            let config = Config {
                format,
                ..Config::default()
            };
            let _layer = fmt_layer(&config);
        }
    }
}
