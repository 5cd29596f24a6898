use otlp_widget::{Config, Widget};
use std::{process::ExitCode, time::Duration};

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            tracing::error!(%err, "failed to start runtime");
            return ExitCode::FAILURE;
        }
    };

    let interrupted = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "failed to listen for interrupt");
        }
    };

    let result = runtime.block_on(otlp_widget::run(Config::default(), Widget::new(), interrupted));

    // abandoned shutdown steps would otherwise hold the process open
    runtime.shutdown_timeout(Duration::from_secs(1));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("failed to initialize export pipeline: {err}");
            ExitCode::FAILURE
        }
    }
}
