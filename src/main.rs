use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use appointment_dm::config;
use appointment_dm::speech::ConsoleSpeech;
use appointment_dm::{Orchestrator, Reactor};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    let config = config::from_env()?;
    let lexicon = config.lexicon().context("could not load lexicon")?;
    tracing::info!(phrases = lexicon.len(), ?config, "Appointment dialogue booting...");

    // Kernel channel; the collaborator is the only producer
    let (tx, rx) = mpsc::channel(64);
    let speech = ConsoleSpeech::spawn(tx, config.no_input_timeout(), config.tts_command.clone());

    let shutdown = CancellationToken::new();
    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        ctrl_c.cancel();
    });

    let reactor = Reactor::new(config, Arc::new(lexicon));
    let orchestrator = Orchestrator::new(reactor, speech, rx, shutdown);
    let reactor = orchestrator.run().await?;

    let summary = serde_json::to_string(&reactor.telemetry.snapshot())?;
    tracing::info!(%summary, dropped = reactor.telemetry.dropped(), "Session summary");
    Ok(())
}
