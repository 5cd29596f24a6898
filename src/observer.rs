use crate::widget::Widget;
use opentelemetry::metrics::{AsyncInstrument, Meter, ObservableGauge};

/// Name of the reported metric.
pub const WIDGET_METRIC: &str = "widget";

/// Description attached to the reported metric.
pub const WIDGET_DESCRIPTION: &str = "a widget";

/// Source of the value reported on each collection.
///
/// Implementations run on the export pipeline's collection thread and must
/// return without blocking.
pub trait Observe: Send + Sync + 'static {
    fn observe(&self) -> i64;
}

impl Observe for Widget {
    fn observe(&self) -> i64 {
        self.get()
    }
}

impl<F> Observe for F
where
    F: Fn() -> i64 + Send + Sync + 'static,
{
    fn observe(&self) -> i64 {
        self()
    }
}

/// Report the current value of `source` to `instrument`.
pub fn report<O: Observe + ?Sized>(source: &O, instrument: &dyn AsyncInstrument<i64>) {
    instrument.observe(source.observe(), &[]);
}

/// Register `source` as the callback for the `widget` gauge on `meter`.
pub fn register<O: Observe>(meter: &Meter, source: O) -> ObservableGauge<i64> {
    meter
        .i64_observable_gauge(WIDGET_METRIC)
        .with_description(WIDGET_DESCRIPTION)
        .with_callback(move |instrument| report(&source, instrument))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticker;
    use opentelemetry::{KeyValue, metrics::MeterProvider};
    use opentelemetry_sdk::metrics::{
        InMemoryMetricExporter, PeriodicReader, SdkMeterProvider,
        data::{AggregatedMetrics, MetricData},
    };
    use std::{sync::Mutex, thread::sleep, time::Duration};

    #[derive(Default)]
    struct Recorded {
        observations: Mutex<Vec<(i64, usize)>>,
    }

    impl Recorded {
        fn values(&self) -> Vec<i64> {
            self.observations
                .lock()
                .unwrap()
                .iter()
                .map(|(value, _)| *value)
                .collect()
        }
    }

    impl AsyncInstrument<i64> for Recorded {
        fn observe(&self, measurement: i64, attributes: &[KeyValue]) {
            self.observations
                .lock()
                .unwrap()
                .push((measurement, attributes.len()));
        }
    }

    #[test]
    fn reports_current_value_without_attributes() {
        let widget = Widget::new();
        widget.increment();
        widget.increment();

        let recorded = Recorded::default();
        report(&widget, &recorded);

        assert_eq!(*recorded.observations.lock().unwrap(), vec![(2, 0)]);
        // reading doesn't change the counter
        assert_eq!(widget.get(), 2);
    }

    #[test]
    fn closures_are_sources() {
        let recorded = Recorded::default();
        report(&|| 42, &recorded);

        assert_eq!(recorded.values(), vec![42]);
    }

    #[test]
    fn observations_are_monotonic_while_ticking() {
        let widget = Widget::new();
        let ticker = ticker::Builder::new()
            .tick_interval(Duration::from_millis(5))
            .spawn(widget.clone());

        let recorded = Recorded::default();
        for _ in 0..20 {
            report(&widget, &recorded);
            // never ahead of the counter
            assert!(*recorded.values().last().unwrap() <= widget.get());
            sleep(Duration::from_millis(3));
        }

        assert!(ticker.stop(Duration::from_secs(1)));

        let values = recorded.values();
        assert!(values.windows(2).all(|pair| pair[0] <= pair[1]), "{values:?}");
    }

    #[test]
    fn collected_by_sdk_reader() {
        let exporter = InMemoryMetricExporter::default();
        let provider = SdkMeterProvider::builder()
            .with_reader(PeriodicReader::builder(exporter.clone()).build())
            .build();
        let meter = provider.meter("otlp-widget-test");

        let widget = Widget::new();
        for _ in 0..3 {
            widget.increment();
        }

        let _gauge = register(&meter, widget.clone());
        provider.force_flush().unwrap();

        let exported = exporter.get_finished_metrics().unwrap();
        let metric = exported
            .iter()
            .flat_map(|resource| resource.scope_metrics())
            .flat_map(|scope| scope.metrics())
            .find(|metric| metric.name() == WIDGET_METRIC)
            .expect("widget metric was not exported");

        assert_eq!(metric.description(), WIDGET_DESCRIPTION);

        let AggregatedMetrics::I64(MetricData::Gauge(gauge)) = metric.data() else {
            panic!("widget is not an i64 gauge");
        };
        let values: Vec<i64> = gauge.data_points().map(|point| point.value()).collect();
        assert_eq!(values, vec![widget.get()]);
    }
}
