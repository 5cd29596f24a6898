use thiserror::Error;

/// Failure while setting up the export pipeline.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid collector endpoint {endpoint:?}")]
    Endpoint {
        endpoint: String,
        #[source]
        source: tonic::transport::Error,
    },

    #[error("failed to connect to collector at {endpoint}")]
    Connect {
        endpoint: String,
        #[source]
        source: tonic::transport::Error,
    },

    #[error("failed to build metric exporter")]
    MetricExporter(#[source] opentelemetry_otlp::ExporterBuildError),

    #[error("failed to build span exporter")]
    SpanExporter(#[source] opentelemetry_otlp::ExporterBuildError),
}
