use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

use roomguard_connectors::{DeliveryTracker, MqttTransport};
use roomguard_core::{FusionScorer, MemoryStore, Normalizer, SystemTime, TrendEvaluator};
use roomguard_ml::build_overlay;
use roomguard_service::{pipeline, Config, Pipeline, PublishingSink};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // RUST_LOG wins over --log-level
    env_logger::Builder::new()
        .parse_filters(&config.log_level)
        .parse_default_env()
        .init();

    info!("RoomGuard {} starting up", roomguard_service::VERSION);
    let settings = config.settings()?;

    let (transport, event_loop, events) =
        MqttTransport::connect(&settings.mqtt).context("failed to create MQTT client")?;
    let transport = Arc::new(transport);
    let cancel = CancellationToken::new();

    let tracker = Arc::new(
        DeliveryTracker::new(transport.clone(), settings.delivery).with_failure_callback(
            |topic, payload| {
                warn!("giving up on {topic} ({} bytes) after exhausting retries", payload.len());
            },
        ),
    );
    let retry_task = tracker.spawn(cancel.clone());
    let event_task = tokio::spawn(event_loop.run(cancel.clone()));

    let overlay = build_overlay(settings.model_dir.as_deref());
    let pipeline = Pipeline::new(
        Normalizer::new(Arc::new(SystemTime)),
        Arc::new(MemoryStore::new(settings.store)),
        TrendEvaluator::new(settings.trend).with_overlay(overlay.clone()),
        FusionScorer::new(settings.fusion).with_overlay(overlay),
        Arc::new(PublishingSink::new(tracker.clone())),
    )
    .with_incident_window(settings.incident_window_secs);

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("interrupt received"),
            Err(err) => error!("cannot listen for interrupt: {err}"),
        }
        shutdown.cancel();
    });

    let result = pipeline::run(&pipeline, &tracker, events, cancel.clone()).await;

    cancel.cancel();
    if let Err(err) = transport.disconnect().await {
        warn!("mqtt disconnect failed: {err}");
    }
    let tasks = vec![("retry", retry_task), ("mqtt", event_task)];
    let failed = pipeline::join_background(tasks).await;
    if failed > 0 {
        warn!("{failed} background task(s) ended abnormally");
    }

    let stats = tracker.stats();
    info!(
        "delivery: {} published, {} acknowledged, {} failed, {} pending (reliability {:.3})",
        stats.published, stats.acknowledged, stats.failed, stats.pending, stats.reliability
    );

    result.context("dispatch loop failed")
}
