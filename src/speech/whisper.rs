//! Transcription through the OpenAI Whisper API.

use super::capture::{AudioClip, CaptureError, Transcriber};
use std::time::Duration;
use tracing::{debug, error};

const TRANSCRIPTION_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Transcribes WAV clips via the hosted Whisper endpoint.
pub struct WhisperTranscriber {
    client: reqwest::blocking::Client,
    api_key: String,
    model: String,
}

impl WhisperTranscriber {
    /// Create a new transcriber.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, CaptureError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(CaptureError::Other(
                "transcription API key required".to_string(),
            ));
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CaptureError::Other(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            model: model.into(),
        })
    }
}

impl Transcriber for WhisperTranscriber {
    fn transcribe(&self, clip: &AudioClip) -> Result<String, CaptureError> {
        debug!(audio_bytes = clip.wav.len(), "starting transcription");

        let form = reqwest::blocking::multipart::Form::new()
            .part(
                "file",
                reqwest::blocking::multipart::Part::bytes(clip.wav.clone())
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| CaptureError::Other(e.to_string()))?,
            )
            .text("model", self.model.clone());

        let response = self
            .client
            .post(TRANSCRIPTION_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .map_err(|e| {
                error!(error = %e, "transcription request failed");
                CaptureError::ServiceUnavailable
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            error!(status = %status, body = %body, "transcription API error");
            return Err(CaptureError::ServiceUnavailable);
        }

        let result: WhisperResponse = response.json().map_err(|e| {
            error!(error = %e, "failed to parse transcription response");
            CaptureError::ServiceUnavailable
        })?;

        if result.text.trim().is_empty() {
            return Err(CaptureError::Unintelligible);
        }

        debug!(transcript = %result.text, "transcription complete");
        Ok(result.text)
    }
}
