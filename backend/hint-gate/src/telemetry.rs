use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::{SdkTracerProvider, Tracer};
use opentelemetry_sdk::Resource;

/// Builds the OTLP span pipeline when `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
/// The provider is returned so the caller can flush it on exit.
pub fn init_telemetry() -> Option<(SdkTracerProvider, Tracer)> {
    // Export spans only when a collector is configured
    let otlp_endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok()?;

    let exporter = match opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(otlp_endpoint)
        .build()
    {
        Ok(exporter) => exporter,
        Err(e) => {
            eprintln!("WARNING: OTLP exporter disabled: {}", e);
            return None;
        }
    };

    let resource = Resource::builder_empty()
        .with_service_name("hint-gate")
        .with_attributes(vec![KeyValue::new(
            "service.version",
            env!("CARGO_PKG_VERSION"),
        )])
        .build();

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource)
        .build();

    let tracer = provider.tracer("hint-gate");

    opentelemetry::global::set_tracer_provider(provider.clone());

    Some((provider, tracer))
}

/// Flushes spans still queued in the batch exporter. Returns whether the
/// provider shut down cleanly.
pub fn shutdown_telemetry(provider: &SdkTracerProvider) -> bool {
    tracing::info!("Shutting down OpenTelemetry");
    match provider.shutdown() {
        Ok(()) => true,
        Err(e) => {
            eprintln!("WARNING: failed to flush traces on shutdown: {}", e);
            false
        }
    }
}
