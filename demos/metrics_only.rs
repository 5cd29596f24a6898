use otlp_widget::{Config, Widget};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = Config::new()
        .traces(false)
        .collect_interval(None)
        .meter_name("widget-demo");

    let interrupted = async {
        tokio::signal::ctrl_c().await.ok();
    };

    otlp_widget::run(config, Widget::new(), interrupted)
        .await
        .unwrap();
}
