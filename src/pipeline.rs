use crate::{error::Error, observer, ticker, widget::Widget};
use opentelemetry::{
    global,
    metrics::{Meter, MeterProvider},
};
use opentelemetry_otlp::{MetricExporter, SpanExporter, WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::{
    error::OTelSdkResult,
    metrics::{PeriodicReader, SdkMeterProvider},
    propagation::TraceContextPropagator,
    trace::{BatchSpanProcessor, Sampler, SdkTracerProvider},
};
use std::time::Duration;
use tonic::transport::{Channel, Endpoint};

/// Settings for the export pipeline and the counter loop.
#[derive(Debug, Clone)]
pub struct Config {
    endpoint: String,
    collect_interval: Option<Duration>,
    traces: bool,
    meter_name: &'static str,
    tick_interval: Duration,
    connect_timeout: Duration,
    shutdown_timeout: Duration,
}

impl Config {
    pub fn new() -> Self {
        Self {
            endpoint: "http://otel:4317".to_owned(),
            collect_interval: Some(Duration::from_secs(2)),
            traces: true,
            meter_name: "dtucker.co.uk/bugz",
            tick_interval: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(5),
            shutdown_timeout: Duration::from_secs(1),
        }
    }

    /// Collector address, including the scheme.
    ///
    /// Default is `http://otel:4317`.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Period between metric collections. `None` keeps the SDK default.
    ///
    /// Default is 2s.
    pub fn collect_interval(mut self, interval: Option<Duration>) -> Self {
        self.collect_interval = interval;
        self
    }

    /// Whether to install a trace exporter alongside the metric exporter.
    ///
    /// Default is `true`.
    pub fn traces(mut self, enabled: bool) -> Self {
        self.traces = enabled;
        self
    }

    /// Name of the meter the `widget` gauge is registered on.
    pub fn meter_name(mut self, name: &'static str) -> Self {
        self.meter_name = name;
        self
    }

    /// Interval between counter increments.
    ///
    /// Default is 1s.
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Upper bound on dialing the collector.
    ///
    /// Default is 5s.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Upper bound on each teardown step.
    ///
    /// Default is 1s.
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Installed trace and metric providers.
pub struct Pipeline {
    meter_provider: SdkMeterProvider,
    tracer_provider: Option<SdkTracerProvider>,
    shutdown_timeout: Duration,
}

impl Pipeline {
    /// Connect to the collector and install the global providers.
    pub async fn install(config: &Config) -> Result<Self, Error> {
        let channel = connect(config).await?;

        let tracer_provider = if config.traces {
            let exporter = SpanExporter::builder()
                .with_tonic()
                .with_channel(channel.clone())
                .build()
                .map_err(Error::SpanExporter)?;

            let provider = SdkTracerProvider::builder()
                .with_sampler(Sampler::AlwaysOn)
                .with_span_processor(BatchSpanProcessor::builder(exporter).build())
                .build();

            global::set_tracer_provider(provider.clone());
            global::set_text_map_propagator(TraceContextPropagator::new());

            Some(provider)
        } else {
            None
        };

        let exporter = MetricExporter::builder()
            .with_tonic()
            .with_channel(channel)
            .with_timeout(config.shutdown_timeout)
            .build()
            .map_err(Error::MetricExporter)?;

        let mut reader = PeriodicReader::builder(exporter);
        if let Some(interval) = config.collect_interval {
            reader = reader.with_interval(interval);
        }

        let meter_provider = SdkMeterProvider::builder()
            .with_reader(reader.build())
            .build();
        global::set_meter_provider(meter_provider.clone());

        tracing::debug!(
            endpoint = %config.endpoint,
            traces = config.traces,
            "export pipeline installed"
        );

        Ok(Self {
            meter_provider,
            tracer_provider,
            shutdown_timeout: config.shutdown_timeout,
        })
    }

    /// A meter from the installed provider.
    pub fn meter(&self, name: &'static str) -> Meter {
        self.meter_provider.meter(name)
    }

    /// Flush and shut down, metrics first.
    ///
    /// Each provider gets at most `shutdown_timeout`. Failures and timeouts
    /// are logged; the remaining steps still run.
    pub async fn shutdown(self) {
        let timeout = self.shutdown_timeout;

        let meter_provider = self.meter_provider;
        bounded_shutdown("meter", timeout, move || {
            meter_provider.shutdown_with_timeout(timeout)
        })
        .await;

        if let Some(tracer_provider) = self.tracer_provider {
            bounded_shutdown("tracer", timeout, move || {
                tracer_provider.shutdown_with_timeout(timeout)
            })
            .await;
        }
    }
}

// Not every SDK shutdown step honours its timeout; overruns are abandoned.
async fn bounded_shutdown<F>(provider: &'static str, timeout: Duration, shutdown: F)
where
    F: FnOnce() -> OTelSdkResult + Send + 'static,
{
    match tokio::time::timeout(timeout, tokio::task::spawn_blocking(shutdown)).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(err))) => tracing::warn!(provider, %err, "failed to shut down provider"),
        Ok(Err(err)) => tracing::warn!(provider, %err, "provider shutdown panicked"),
        Err(_) => tracing::warn!(provider, ?timeout, "provider shutdown timed out"),
    }
}

async fn connect(config: &Config) -> Result<Channel, Error> {
    let endpoint =
        Endpoint::from_shared(config.endpoint.clone()).map_err(|source| Error::Endpoint {
            endpoint: config.endpoint.clone(),
            source,
        })?;

    endpoint
        .connect_timeout(config.connect_timeout)
        .connect()
        .await
        .map_err(|source| Error::Connect {
            endpoint: config.endpoint.clone(),
            source,
        })
}

/// Export the widget gauge until `shutdown` resolves.
///
/// Setup errors are returned before the counter loop starts.
pub async fn run<F>(config: Config, widget: Widget, shutdown: F) -> Result<(), Error>
where
    F: Future<Output = ()>,
{
    let pipeline = Pipeline::install(&config).await?;
    let _gauge = observer::register(&pipeline.meter(config.meter_name), widget.clone());

    tracing::info!("Running. Press CTRL+C to stop");
    let ticker = ticker::Builder::new()
        .tick_interval(config.tick_interval)
        .spawn(widget);

    shutdown.await;

    tracing::info!("shutting down");
    let timeout = config.shutdown_timeout;
    if let Err(err) = tokio::task::spawn_blocking(move || ticker.stop(timeout)).await {
        tracing::warn!(%err, "counter loop stop panicked");
    }
    pipeline.shutdown().await;
    tracing::info!("shutdown complete");

    Ok(())
}
