//! One voice-capture cycle: record, transcribe, report.
//!
//! At most one capture runs at any time, enforced by an atomic
//! check-and-set on entry. A scope guard clears the flag and reports the
//! end of the cycle on every exit path, including panic unwind.

use crate::config::SpeechConfig;
use crate::dispatch::channel::{OutcomeSender, WorkerEvent};
use crate::dispatch::workers::WorkerSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Raw captured audio handed from the microphone to the transcriber.
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// WAV-encoded bytes.
    pub wav: Vec<u8>,
}

impl AudioClip {
    pub fn new(wav: Vec<u8>) -> Self {
        Self { wav }
    }

    pub fn is_empty(&self) -> bool {
        self.wav.is_empty()
    }
}

/// Distinguished capture faults, each with its own user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// Speech was recorded but could not be understood.
    Unintelligible,

    /// The transcription service could not be reached.
    ServiceUnavailable,

    /// Anything else (device fault, recorder missing, timeout).
    Other(String),
}

impl CaptureError {
    pub fn user_message(&self) -> String {
        match self {
            CaptureError::Unintelligible => "Sorry, I couldn't understand that.".to_string(),
            CaptureError::ServiceUnavailable => {
                "Speech recognition service unavailable.".to_string()
            }
            CaptureError::Other(cause) => format!("Voice input error: {cause}"),
        }
    }
}

/// Timing bounds for one capture cycle.
#[derive(Debug, Clone, Copy)]
pub struct CaptureLimits {
    /// Ambient-noise adjustment interval before listening.
    pub ambient_adjust: Duration,

    /// Maximum wait for speech to start.
    pub wait_for_speech: Duration,

    /// Maximum phrase length.
    pub max_phrase: Duration,
}

impl From<&SpeechConfig> for CaptureLimits {
    fn from(config: &SpeechConfig) -> Self {
        Self {
            ambient_adjust: config.ambient_adjust,
            wait_for_speech: config.wait_for_speech,
            max_phrase: config.max_phrase,
        }
    }
}

impl CaptureLimits {
    /// Upper bound on the whole listen step.
    pub fn deadline(&self) -> Duration {
        self.ambient_adjust + self.wait_for_speech + self.max_phrase
    }
}

/// Records one phrase of audio.
pub trait Microphone: Send + Sync {
    fn listen(&self, limits: &CaptureLimits) -> Result<AudioClip, CaptureError>;
}

/// Turns captured audio into text.
pub trait Transcriber: Send + Sync {
    fn transcribe(&self, clip: &AudioClip) -> Result<String, CaptureError>;
}

/// Clears the capture flag and reports the cycle end unconditionally.
struct CaptureGuard {
    flag: Arc<AtomicBool>,
    outcomes: OutcomeSender,
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
        self.outcomes.push(WorkerEvent::CaptureEnded);
    }
}

/// Try to start a capture cycle. Returns `false` (a silent no-op) when a
/// cycle is already running, or when the worker thread could not be
/// started; in the latter case the flag has already been released again
/// and `CaptureEnded` queued.
pub fn spawn_capture(
    workers: &WorkerSet,
    microphone: Arc<dyn Microphone>,
    transcriber: Arc<dyn Transcriber>,
    limits: CaptureLimits,
    flag: Arc<AtomicBool>,
    outcomes: OutcomeSender,
) -> bool {
    if flag
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_err()
    {
        debug!("capture already in progress, ignoring start request");
        return false;
    }

    // Built before the spawn: if the thread is refused the closure is
    // dropped unrun, and the guard's drop still releases the flag and
    // reports the cycle end.
    let guard = CaptureGuard {
        flag,
        outcomes: outcomes.clone(),
    };

    workers.spawn("speech-worker", move || {
        let _guard = guard;

        debug!(deadline_ms = limits.deadline().as_millis() as u64, "capture started");

        let clip = match microphone.listen(&limits) {
            Ok(clip) => clip,
            Err(e) => {
                warn!(error = ?e, "listen failed");
                outcomes.push(WorkerEvent::Notice(e.user_message()));
                return;
            }
        };

        match transcriber.transcribe(&clip) {
            Ok(text) => {
                let text = text.trim().to_string();
                if text.is_empty() {
                    debug!("transcription empty, dropping");
                } else {
                    debug!(chars = text.len(), "transcription complete");
                    outcomes.push(WorkerEvent::Transcribed(text));
                }
            }
            Err(e) => {
                warn!(error = ?e, "transcription failed");
                outcomes.push(WorkerEvent::Notice(e.user_message()));
            }
        }
    })
}
