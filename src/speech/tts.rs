//! Speech synthesis workers.
//!
//! Synthesis is best-effort: a failed or interrupted playback never
//! surfaces in the transcript (the text has already been shown), it is
//! only visible in debug logs.

use crate::dispatch::workers::WorkerSet;
use crate::{CompanionError, Result};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Speech synthesis engine.
///
/// `say` blocks until audible playback completes and is called from
/// worker threads; `stop` is called from the shutdown path.
pub trait Speaker: Send + Sync {
    fn say(&self, text: &str) -> Result<()>;
    fn stop(&self);
}

/// Speaks text by running an external synthesizer command (e.g.
/// `espeak` or `say`) with the text as the final argument.
pub struct CommandSpeaker {
    command: String,
    stopped: AtomicBool,
}

impl CommandSpeaker {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            stopped: AtomicBool::new(false),
        }
    }
}

impl Speaker for CommandSpeaker {
    fn say(&self, text: &str) -> Result<()> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(CompanionError::SynthesisError(
                "speaker is stopped".to_string(),
            ));
        }

        let argv = shell_words::split(&self.command)
            .map_err(|e| CompanionError::SynthesisError(format!("bad speak command: {e}")))?;
        let (program, args) = argv.split_first().ok_or_else(|| {
            CompanionError::SynthesisError("empty speak command".to_string())
        })?;

        let mut child = Command::new(program)
            .args(args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| CompanionError::SynthesisError(e.to_string()))?;

        loop {
            if self.stopped.load(Ordering::Acquire) {
                let _ = child.kill();
                let _ = child.wait();
                return Ok(());
            }
            match child.try_wait() {
                Ok(Some(status)) if status.success() => return Ok(()),
                Ok(Some(status)) => {
                    return Err(CompanionError::SynthesisError(format!(
                        "synthesizer exited with {status}"
                    )));
                }
                Ok(None) => thread::sleep(Duration::from_millis(25)),
                Err(e) => {
                    let _ = child.kill();
                    return Err(CompanionError::SynthesisError(e.to_string()));
                }
            }
        }
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }
}

/// Spawn a synthesis worker for one response text. All faults are
/// swallowed.
pub fn spawn_speak(workers: &WorkerSet, speaker: Arc<dyn Speaker>, text: String) {
    workers.spawn("tts-worker", move || {
        if let Err(e) = speaker.say(&text) {
            // Deliberately invisible to the user; see the error design.
            debug!(error = %e, "synthesis failed, swallowing");
        }
    });
}
