//! Voice capture and speech synthesis workers.

pub mod capture;
pub mod mic;
pub mod tts;
pub mod whisper;

pub use capture::{
    spawn_capture, AudioClip, CaptureError, CaptureLimits, Microphone, Transcriber,
};
pub use mic::CommandMicrophone;
pub use tts::{spawn_speak, CommandSpeaker, Speaker};
pub use whisper::WhisperTranscriber;
