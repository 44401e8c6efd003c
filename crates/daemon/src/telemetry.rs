//! Telemetry setup for OpenTelemetry integration

use anyhow::Result;
use tracing_subscriber::{Layer, Registry};

/// Layer exporting spans over OTLP (boxed so the cfg branches agree)
pub type TelemetryLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Build the OpenTelemetry layer if enabled
///
/// Runs before the subscriber is installed, so it reports through its return
/// value and the caller logs afterwards.
///
/// # Environment Variables
///
/// - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (e.g., http://localhost:4317)
/// - `OTEL_SERVICE_NAME`: Service name (default: waitroom)
///
/// # Example
///
/// ```text
/// OTEL_EXPORTER_OTLP_ENDPOINT=http://localhost:4317 \
/// OTEL_SERVICE_NAME=waitroom-dev \
///     ./waitroom
/// ```
pub fn init_layer() -> Result<Option<TelemetryLayer>> {
    let Ok(endpoint) = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") else {
        return Ok(None);
    };

    build_layer(&endpoint).map(Some)
}

#[cfg(not(feature = "telemetry"))]
fn build_layer(endpoint: &str) -> Result<TelemetryLayer> {
    anyhow::bail!(
        "OTEL_EXPORTER_OTLP_ENDPOINT={} set but feature 'telemetry' not enabled (rebuild with --features telemetry)",
        endpoint
    )
}

#[cfg(feature = "telemetry")]
fn build_layer(endpoint: &str) -> Result<TelemetryLayer> {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry_otlp::WithExportConfig;

    let service_name =
        std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "waitroom".to_string());

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let provider = opentelemetry_sdk::trace::TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .build();
    let tracer = provider.tracer(service_name);
    opentelemetry::global::set_tracer_provider(provider);

    Ok(Box::new(tracing_opentelemetry::layer().with_tracer(tracer)))
}
