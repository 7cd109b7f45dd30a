//! Phrase recording through an external recorder command.
//!
//! The command (e.g. `arecord -q -f S16_LE -r 16000 -d 5 -t wav`) writes
//! WAV bytes to stdout. The recorder is expected to stop on its own
//! within the phrase limit; a hard deadline kills it if it does not.

use super::capture::{AudioClip, CaptureError, CaptureLimits, Microphone};
use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Extra slack on top of the configured limits before the recorder is
/// killed.
const DEADLINE_SLACK: Duration = Duration::from_secs(1);

pub struct CommandMicrophone {
    command: String,
}

impl CommandMicrophone {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Microphone for CommandMicrophone {
    fn listen(&self, limits: &CaptureLimits) -> Result<AudioClip, CaptureError> {
        let argv = shell_words::split(&self.command)
            .map_err(|e| CaptureError::Other(format!("bad recorder command: {e}")))?;
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| CaptureError::Other("empty recorder command".to_string()))?;

        debug!(recorder = %program, "starting recorder");

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| CaptureError::Other(format!("recorder failed to start: {e}")))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| CaptureError::Other("recorder has no stdout".to_string()))?;

        // Drain stdout on a side thread so a full pipe never stalls the
        // recorder.
        let reader = thread::spawn(move || {
            let mut wav = Vec::new();
            let _ = stdout.read_to_end(&mut wav);
            wav
        });

        let deadline = Instant::now() + limits.deadline() + DEADLINE_SLACK;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    debug!(%status, "recorder finished");
                    break;
                }
                Ok(None) => {
                    if Instant::now() >= deadline {
                        warn!("recorder exceeded deadline, killing it");
                        let _ = child.kill();
                        let _ = child.wait();
                        break;
                    }
                    thread::sleep(Duration::from_millis(25));
                }
                Err(e) => {
                    let _ = child.kill();
                    return Err(CaptureError::Other(format!("recorder wait failed: {e}")));
                }
            }
        }

        let wav = reader
            .join()
            .map_err(|_| CaptureError::Other("recorder output reader panicked".to_string()))?;

        if wav.is_empty() {
            return Err(CaptureError::Other("recorder produced no audio".to_string()));
        }

        Ok(AudioClip::new(wav))
    }
}
