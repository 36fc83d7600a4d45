//! Application entry point — voice-agent.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Resolve [`AgentConfig`] from the environment (`.env` honoured).
//! 3. Create the tokio runtime (multi-thread, 2 workers).
//! 4. Arm the interrupt signal (Ctrl-C → watch channel).
//! 5. Build the service adapters and the speech resource.
//! 6. Run the session loop — blocks until it ends, then logs the summary.

use std::sync::Arc;

use voice_agent::audio::MicRecorder;
use voice_agent::config::{AgentConfig, InputMode};
use voice_agent::llm::ChatClient;
use voice_agent::session::{Session, StdinReader};
use voice_agent::speech::SpeechOutput;
use voice_agent::stt::WhisperHttpClient;

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("voice-agent starting up");

    // 2. Configuration
    let config = AgentConfig::from_env()?;

    // 3. Tokio runtime (capture and playback block on the worker pool)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    // 4. Interrupt signal — raised once, observed by the session loop.
    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
    rt.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Interrupted by user. Finishing up.");
            let _ = stop_tx.send(true);
        }
    });

    // 5. Adapters
    let completion = Box::new(ChatClient::from_config(&config));
    let speech = match config.input_mode {
        InputMode::Voice => SpeechOutput::with_engine(
            config.synth_failure_policy,
            config.voice_rate,
            config.voice_volume,
        ),
        InputMode::Text => SpeechOutput::muted(),
    };

    let mut session = Session::new(
        config.clone(),
        completion,
        Box::new(StdinReader::new()),
        speech,
        stop_rx,
    );
    if config.input_mode == InputMode::Voice {
        session = session.with_voice(
            Arc::new(MicRecorder::new(config.sample_rate, config.record_seconds)),
            Box::new(WhisperHttpClient::from_config(&config)),
        );
    }

    // 6. Run
    let summary = rt.block_on(session.run());
    log::info!(
        "Session ended ({}) after {} turn(s). Goodbye.",
        summary.reason,
        summary.turns
    );

    Ok(())
}
