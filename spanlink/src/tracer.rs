//! Tracer configuration and entry point.
//!
//! A [`Tracer`] is created once per process and hands out one
//! [`TraceContext`] per logical unit of work.

use std::borrow::Cow;
use std::env;
use std::sync::Arc;

use crate::context::TraceContext;
use crate::reporter::{NoopReporter, SpanReporter};

const DEFAULT_SERVICE_NAME: &str = "unknown-service";

/// Tracer configuration.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct Config {
    /// Name identifying this process on every reported span.
    pub service_name: Cow<'static, str>,

    /// Sample flag attached to traces this process roots.
    ///
    /// The flag is carried and propagated verbatim; acting on it is the
    /// reporter pipeline's concern.
    pub sample: bool,
}

impl Default for Config {
    /// Create the default configuration, honoring the `SPANLINK_SERVICE_NAME`
    /// and `SPANLINK_SAMPLE` environment variables.
    fn default() -> Self {
        let mut config = Config {
            service_name: Cow::Borrowed(DEFAULT_SERVICE_NAME),
            sample: true,
        };

        if let Ok(name) = env::var("SPANLINK_SERVICE_NAME") {
            if !name.is_empty() {
                config.service_name = Cow::Owned(name);
            }
        }

        if let Ok(sample) = env::var("SPANLINK_SAMPLE") {
            match sample.as_str() {
                "1" | "true" => config.sample = true,
                "0" | "false" => config.sample = false,
                other => {
                    tracing::warn!(
                        name: "Config.InvalidSampleFlag",
                        value = other,
                        "SPANLINK_SAMPLE must be one of 0, 1, true, false; keeping default"
                    );
                }
            }
        }

        config
    }
}

impl Config {
    /// Set the service name.
    pub fn with_service_name(mut self, service_name: impl Into<Cow<'static, str>>) -> Self {
        self.service_name = service_name.into();
        self
    }

    /// Set the sample flag for locally rooted traces.
    pub fn with_sample(mut self, sample: bool) -> Self {
        self.sample = sample;
        self
    }
}

/// Creates trace contexts and carries the process-wide configuration and
/// reporter. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Tracer {
    config: Config,
    reporter: Arc<dyn SpanReporter>,
}

impl Tracer {
    /// Create a tracer with the default [`Config`] and the given reporter.
    pub fn new(reporter: impl SpanReporter + 'static) -> Self {
        Tracer::builder().with_reporter(reporter).build()
    }

    /// Start building a tracer.
    pub fn builder() -> TracerBuilder {
        TracerBuilder::default()
    }

    /// The active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Create the trace context for one new logical unit of work.
    pub fn new_context(&self) -> TraceContext {
        TraceContext::new(
            self.config.service_name.clone(),
            self.config.sample,
            self.reporter.clone(),
        )
    }
}

/// Builder for [`Tracer`].
#[derive(Debug, Default)]
pub struct TracerBuilder {
    config: Option<Config>,
    reporter: Option<Arc<dyn SpanReporter>>,
}

impl TracerBuilder {
    /// Use the given configuration instead of [`Config::default`].
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Report finished spans to `reporter`. Defaults to [`NoopReporter`].
    pub fn with_reporter(mut self, reporter: impl SpanReporter + 'static) -> Self {
        self.reporter = Some(Arc::new(reporter));
        self
    }

    /// Build the tracer.
    pub fn build(self) -> Tracer {
        Tracer {
            config: self.config.unwrap_or_default(),
            reporter: self.reporter.unwrap_or_else(|| Arc::new(NoopReporter)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::InMemoryReporter;

    #[test]
    fn default_config_reads_environment() {
        temp_env::with_vars(
            [
                ("SPANLINK_SERVICE_NAME", Some("checkout")),
                ("SPANLINK_SAMPLE", Some("0")),
            ],
            || {
                let config = Config::default();
                assert_eq!(config.service_name, "checkout");
                assert!(!config.sample);
            },
        );
    }

    #[test]
    fn invalid_sample_env_keeps_default() {
        temp_env::with_var("SPANLINK_SAMPLE", Some("maybe"), || {
            assert!(Config::default().sample);
        });
    }

    #[test]
    fn default_config_without_environment() {
        temp_env::with_vars(
            [
                ("SPANLINK_SERVICE_NAME", None::<&str>),
                ("SPANLINK_SAMPLE", None),
            ],
            || {
                let config = Config::default();
                assert_eq!(config.service_name, DEFAULT_SERVICE_NAME);
                assert!(config.sample);
            },
        );
    }

    #[test]
    fn builder_applies_config_and_reporter() {
        let reporter = InMemoryReporter::new();
        let tracer = Tracer::builder()
            .with_config(
                Config::default()
                    .with_service_name("billing")
                    .with_sample(false),
            )
            .with_reporter(reporter.clone())
            .build();

        let mut cx = tracer.new_context();
        assert!(!cx.sampled());
        cx.create_entry_span("/pay", &crate::ContextCarrier::new());
        cx.stop_span().unwrap();

        let spans = reporter.finished_spans();
        assert_eq!(spans[0].service, "billing");
        assert!(!spans[0].sampled);
    }
}
