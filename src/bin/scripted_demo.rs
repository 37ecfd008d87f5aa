//! Plays the reference conversation against the scripted collaborator and
//! prints what the system said.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use appointment_dm::config::DialogueConfig;
use appointment_dm::grammar::Lexicon;
use appointment_dm::kernel::event::Event;
use appointment_dm::kernel::machine::DialogueState;
use appointment_dm::speech::{ScriptLine, ScriptedSpeech};
use appointment_dm::{Orchestrator, Reactor};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    let (tx, rx) = mpsc::channel(64);
    let script = [
        ScriptLine::Silence,
        ScriptLine::say("bob"),
        ScriptLine::say("vlad"),
        ScriptLine::say("monday"),
        ScriptLine::say("no"),
        ScriptLine::say("10"),
        ScriptLine::say("yes"),
    ];
    let speech = ScriptedSpeech::new(tx.clone(), script);
    let transcript = speech.transcript();

    let shutdown = CancellationToken::new();
    let reactor = Reactor::new(DialogueConfig::default(), Arc::new(Lexicon::builtin()));
    let orchestrator = Orchestrator::new(reactor, speech, rx, shutdown.clone());
    let mut states = orchestrator.subscribe();
    let handle = tokio::spawn(orchestrator.run());

    // Press the button once the engine is up
    states
        .wait_for(|s| *s == DialogueState::WaitToStart)
        .await
        .context("orchestrator stopped before the engine was ready")?;
    tx.send(Event::UserTrigger).await.context("orchestrator gone")?;

    tokio::time::timeout(Duration::from_secs(5), states.wait_for(|s| *s == DialogueState::Completed))
        .await
        .context("conversation did not complete in time")?
        .context("orchestrator stopped early")?;
    shutdown.cancel();

    let reactor = handle.await??;
    if let Ok(lines) = transcript.lock() {
        for line in lines.iter() {
            println!("SYSTEM: {line}");
        }
    }
    println!("Collected: {:?}", reactor.context.appointment());
    println!("Telemetry: {:?}", reactor.telemetry.snapshot());
    Ok(())
}
