//! Terminal front-end for the companion.
//!
//! Presentation is deliberately thin: a line-based prompt feeding the
//! dispatch loop, with `/voice`, `/tts` and `/quit` commands.

use anyhow::Result;
use calc_companion::ai::client::DisabledClient;
use calc_companion::ai::{AiClient, GeminiClient};
use calc_companion::config::CompanionConfig;
use calc_companion::dispatch::{Collaborators, Dispatcher, Presenter};
use calc_companion::speech::capture::{Microphone, Transcriber};
use calc_companion::speech::{CommandMicrophone, CommandSpeaker, Speaker, WhisperTranscriber};
use calc_companion::transcript::{Speaker as TurnSpeaker, Turn};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::thread;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

struct TerminalPresenter;

impl Presenter for TerminalPresenter {
    fn append_turn(&mut self, turn: &Turn) {
        let who = match turn.speaker {
            TurnSpeaker::User => "You",
            TurnSpeaker::Assistant => "CALC",
        };
        println!("{who}: {}", turn.text);
        let _ = io::stdout().flush();
    }

    fn set_listening_indicator(&mut self, visible: bool) {
        if visible {
            println!("[Listening...]");
        }
    }

    fn set_tts_button_label(&mut self, label: &str) {
        println!("[{label}]");
    }
}

fn build_collaborators(config: &CompanionConfig) -> Collaborators {
    let ai: Box<dyn AiClient> = match GeminiClient::new(config.ai.clone()) {
        Ok(client) => Box::new(client),
        Err(e) => {
            // Reported once; text chat stays up and renders the fault.
            eprintln!("AI model unavailable: {e}");
            Box::new(DisabledClient::new(format!("AI model unavailable: {e}")))
        }
    };

    let (microphone, transcriber): (Option<Arc<dyn Microphone>>, Option<Arc<dyn Transcriber>>) =
        match &config.speech.record_command {
            Some(command) => {
                match WhisperTranscriber::new(
                    config.speech.whisper_api_key.clone(),
                    config.speech.whisper_model.clone(),
                ) {
                    Ok(transcriber) => (
                        Some(Arc::new(CommandMicrophone::new(command.clone()))),
                        Some(Arc::new(transcriber)),
                    ),
                    Err(e) => {
                        eprintln!("Voice input unavailable: {}", e.user_message());
                        (None, None)
                    }
                }
            }
            None => {
                info!("no record command configured, voice input disabled");
                (None, None)
            }
        };

    let speaker: Option<Arc<dyn Speaker>> = match &config.tts.speak_command {
        Some(command) => Some(Arc::new(CommandSpeaker::new(command.clone()))),
        None => {
            info!("no speak command configured, speech synthesis disabled");
            None
        }
    };

    Collaborators {
        presenter: Box::new(TerminalPresenter),
        ai,
        microphone,
        transcriber,
        speaker,
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "calc_companion=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = CompanionConfig::from_env();
    if let Err(e) = config.validate() {
        warn!(error = %e, "configuration incomplete, continuing with features disabled");
    }

    let collaborators = build_collaborators(&config);
    let (dispatcher, handle) = Dispatcher::new(config, collaborators);

    let loop_thread = thread::spawn(move || dispatcher.run());

    println!("Hi, I'm CALC. Ask me about algebra!");
    println!("Commands: /voice  /tts  /quit");

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };
        match line.trim() {
            "/quit" => break,
            "/voice" => {
                let _ = handle.start_voice();
            }
            "/tts" => {
                let _ = handle.toggle_tts();
            }
            "" => {}
            text => {
                let _ = handle.submit_text(text);
            }
        }
    }

    let _ = handle.shutdown();
    let _ = loop_thread.join();
    Ok(())
}
