//! Distributed tracing setup
//!
//! Spans are exported over OTLP/HTTP with a ratio sampler. When tracing is
//! disabled the global no-op provider stays installed, so instrumented code
//! runs unchanged either way.

use opentelemetry::global;
use opentelemetry::propagation::TextMapCompositePropagator;
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::propagation::{BaggagePropagator, TraceContextPropagator};
use opentelemetry_sdk::trace::{Sampler, SdkTracerProvider};

use super::config::TracerConfig;
use super::constants::APP_NAME;
use super::error::StartupError;

/// Installed tracer provider, flushed on [`Telemetry::shutdown`]
pub struct Telemetry {
    provider: Option<SdkTracerProvider>,
}

impl Telemetry {
    /// Install the global tracer provider and propagators.
    ///
    /// Must run outside of an async runtime: the exporter uses a blocking
    /// HTTP client.
    pub fn init(config: &TracerConfig) -> Result<Self, StartupError> {
        global::set_text_map_propagator(TextMapCompositePropagator::new(vec![
            Box::new(TraceContextPropagator::new()),
            Box::new(BaggagePropagator::new()),
        ]));

        if !config.enabled {
            tracing::debug!("Tracer disabled");
            return Ok(Self { provider: None });
        }

        let exporter = SpanExporter::builder()
            .with_http()
            .with_endpoint(config.endpoint.as_str())
            .build()
            .map_err(|e| StartupError::Tracer(e.to_string()))?;

        let provider = SdkTracerProvider::builder()
            .with_sampler(Sampler::TraceIdRatioBased(config.ratio))
            .with_batch_exporter(exporter)
            .with_resource(Resource::builder().with_service_name(APP_NAME).build())
            .build();

        global::set_tracer_provider(provider.clone());

        tracing::debug!(
            endpoint = %config.endpoint,
            ratio = config.ratio,
            "Tracer initialized"
        );

        Ok(Self {
            provider: Some(provider),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    /// Flush pending spans and stop the exporter. Failures are logged.
    pub fn shutdown(self) {
        if let Some(provider) = self.provider {
            if let Err(e) = provider.shutdown() {
                tracing::warn!(error = %e, "Error shutting down tracer provider");
            } else {
                tracing::debug!("Tracer provider shut down");
            }
        }
    }
}
