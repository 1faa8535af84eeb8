use envconfig::Envconfig;
use tokio::signal;
use tracing::level_filters::LevelFilter;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use log_generator::config::Config;
use log_generator::payload::LogGenerator;
use log_generator::runner::{run, RunOptions};
use log_generator::sink::{HttpSink, LogSink, PrintSink};

async fn shutdown() {
    let mut term = signal::unix::signal(signal::unix::SignalKind::terminate())
        .expect("failed to register SIGTERM handler");

    let mut interrupt = signal::unix::signal(signal::unix::SignalKind::interrupt())
        .expect("failed to register SIGINT handler");

    tokio::select! {
        _ = term.recv() => {},
        _ = interrupt.recv() => {},
    };

    info!("Shutting down gracefully...");
}

fn setup_tracing() {
    let log_layer = tracing_subscriber::fmt::layer().with_filter(
        EnvFilter::builder()
            .with_default_directive(LevelFilter::INFO.into())
            .from_env_lossy(),
    );
    tracing_subscriber::registry().with(log_layer).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_tracing();

    let config = Config::init_from_env()?;

    let sink: Box<dyn LogSink + Send + Sync> = if config.print_sink {
        Box::new(PrintSink {})
    } else {
        Box::new(HttpSink::new(
            config.target_url.clone(),
            config.request_timeout(),
        )?)
    };

    info!(
        service = %config.service_name,
        interval_ms = config.interval_ms,
        batch_size = config.batch_size,
        "starting log generator"
    );

    let mut generator = LogGenerator::new(config.service_name.clone());
    let options = RunOptions {
        interval: config.interval(),
        batch_size: config.batch_size,
        max_records: config.max_records,
    };
    run(&mut generator, sink.as_ref(), options, shutdown()).await;

    Ok(())
}
