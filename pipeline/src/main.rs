mod capture;
mod controller;
mod detector;
mod filter;
mod frame;
mod notify;
mod preview;
mod recognizer;
mod storage;

use controller::slot::FixedSlot;
use controller::{PipelineController, PipelineSettings};
use notify::NotificationClient;
use platewatch_common::config::Config;
use preview::Preview;
use recognizer::tesseract::TesseractRecognizer;
use std::path::PathBuf;
use storage::ArtifactStore;
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    info!(
        source = config.capture.source,
        frame_skip = config.sampling.frame_skip,
        detector = config.detector.kind,
        min_area = config.detector.min_area,
        "starting platewatch pipeline"
    );

    let store = match ArtifactStore::open(&config.storage) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to prepare artifact directories");
            std::process::exit(1);
        }
    };

    let detector = match detector::from_config(&config.detector) {
        Ok(d) => d,
        Err(e) => {
            error!(error = %e, "failed to build region detector");
            std::process::exit(1);
        }
    };

    // Recognition still runs without it; every region is then skipped.
    recognizer::tesseract::check_available(&config.recognizer).await;
    let recognizer = TesseractRecognizer::new(&config.recognizer);

    let source = match capture::open(&config.capture).await {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to open capture source");
            std::process::exit(1);
        }
    };

    let notifier = NotificationClient::new(&config.notify);
    info!(addr = notifier.addr(), enabled = config.notify.enabled, "plate notifications");

    let mut controller = PipelineController::new(
        source,
        detector,
        Box::new(recognizer),
        store,
        notifier,
        Box::new(FixedSlot(config.notify.slot)),
        PipelineSettings::from_config(&config),
    );
    if config.preview.enabled {
        info!(path = config.preview.path.display().to_string(), "preview enabled");
        controller = controller.with_preview(Preview::new(&config.preview.path));
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping after the current frame");
            let _ = shutdown_tx.send(true);
        }
    });

    match controller.run(shutdown_rx).await {
        Ok(summary) => info!(
            frames_captured = summary.frames_captured,
            frames_processed = summary.frames_processed,
            records = summary.records_persisted,
            persist_failures = summary.persist_failures,
            notifications = summary.notifications_sent,
            reason = ?summary.stop_reason,
            state = %controller.state(),
            "camera feed closed"
        ),
        Err(e) => {
            error!(error = %e, "pipeline failed to run");
            std::process::exit(1);
        }
    }
}
