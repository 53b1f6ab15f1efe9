use clap::Parser;
use eyre::{Result, WrapErr};
use prometheus::Registry;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;
use userop_tracker::bundler::BundlerClient;
use userop_tracker::guardian::GuardianClient;
use userop_tracker::intake::Intake;
use userop_tracker::metrics::TrackerMetrics;
use userop_tracker::queue::work_queue;
use userop_tracker::rate_gate::RateGate;
use userop_tracker::server::router;
use userop_tracker::settings::Settings;
use userop_tracker::worker::PollWorker;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; settings may come from the real environment.
    let _ = dotenvy::dotenv();
    let settings = Settings::parse();
    init_tracing(settings.log_json);

    let metrics = TrackerMetrics::new(Registry::new()).wrap_err("registering metrics")?;
    let bundler = BundlerClient::new(settings.bundler_url.clone(), settings.request_timeout())
        .wrap_err("building bundler client")?;
    let guardian = GuardianClient::new(settings.guardian_url.clone(), settings.request_timeout())
        .wrap_err("building guardian client")?;

    let (sender, queue) = work_queue();
    let gate = RateGate::new();

    // The single consumer: polls the bundler and reports mined operations.
    let worker = PollWorker::new(
        queue,
        gate.clone(),
        bundler,
        guardian,
        settings.poll_config(),
        metrics.clone(),
    );
    let worker_handle = tokio::spawn(worker.run());

    let app = router(Intake::new(sender, gate), metrics);
    let listener = TcpListener::bind(settings.listen_addr)
        .await
        .wrap_err_with(|| format!("binding {}", settings.listen_addr))?;
    info!(addr = %settings.listen_addr, bundler = %settings.bundler_url, guardian = %settings.guardian_url, "Listening");

    axum::serve(listener, app).await.wrap_err("http server failed")?;
    worker_handle.await.wrap_err("poll worker panicked")?;
    Ok(())
}
