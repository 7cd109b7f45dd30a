//! Configuration for the companion
//!
//! Provides centralized configuration for the AI client, speech capture
//! and speech synthesis, plus the dispatch loop timing knobs.

use std::time::Duration;

/// Configuration for the remote AI client.
#[derive(Clone, Debug)]
pub struct AiConfig {
    /// API key for the Gemini endpoint.
    pub api_key: String,

    /// Model identifier.
    pub model: String,

    /// Sampling temperature.
    pub temperature: f32,

    /// Nucleus sampling threshold.
    pub top_p: f32,

    /// Top-k sampling cutoff.
    pub top_k: u32,

    /// Maximum tokens in a single response.
    pub max_output_tokens: u32,

    /// Fixed system instruction sent with every request.
    pub system_instruction: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-1.5-flash".to_string(),
            temperature: 0.7,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 8192,
            system_instruction: crate::ai::SYSTEM_PROMPT.to_string(),
        }
    }
}

impl AiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }
}

/// Configuration for voice capture.
#[derive(Clone, Debug)]
pub struct SpeechConfig {
    /// Command line used to record one phrase of audio (WAV on stdout).
    /// Voice input is disabled when unset.
    pub record_command: Option<String>,

    /// API key for the transcription service.
    pub whisper_api_key: String,

    /// Transcription model identifier.
    pub whisper_model: String,

    /// Ambient-noise adjustment interval before listening starts.
    pub ambient_adjust: Duration,

    /// Maximum wait for speech to start.
    pub wait_for_speech: Duration,

    /// Maximum length of a captured phrase.
    pub max_phrase: Duration,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            record_command: None,
            whisper_api_key: String::new(),
            whisper_model: "whisper-1".to_string(),
            ambient_adjust: Duration::from_secs(1),
            wait_for_speech: Duration::from_secs(5),
            max_phrase: Duration::from_secs(5),
        }
    }
}

impl SpeechConfig {
    pub fn with_record_command(mut self, command: impl Into<String>) -> Self {
        self.record_command = Some(command.into());
        self
    }
}

/// Configuration for speech synthesis.
#[derive(Clone, Debug)]
pub struct TtsConfig {
    /// Command line used to speak a text argument. Synthesis is disabled
    /// when unset.
    pub speak_command: Option<String>,

    /// Whether synthesis starts enabled.
    pub enabled_at_start: bool,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            speak_command: None,
            enabled_at_start: true,
        }
    }
}

impl TtsConfig {
    pub fn with_speak_command(mut self, command: impl Into<String>) -> Self {
        self.speak_command = Some(command.into());
        self
    }
}

/// Configuration for the complete companion.
#[derive(Clone, Debug)]
pub struct CompanionConfig {
    pub ai: AiConfig,
    pub speech: SpeechConfig,
    pub tts: TtsConfig,

    /// Fallback drain interval for the dispatch loop.
    pub drain_interval: Duration,

    /// How long shutdown waits for outstanding workers before abandoning
    /// them.
    pub shutdown_grace: Duration,
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            ai: AiConfig::default(),
            speech: SpeechConfig::default(),
            tts: TtsConfig::default(),
            drain_interval: Duration::from_millis(100),
            shutdown_grace: Duration::from_millis(250),
        }
    }
}

impl CompanionConfig {
    /// Build a configuration from the process environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            config.ai.api_key = key;
        }
        if let Ok(model) = std::env::var("GEMINI_MODEL") {
            config.ai.model = model;
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.speech.whisper_api_key = key;
        }
        if let Ok(cmd) = std::env::var("CALC_RECORD_COMMAND") {
            config.speech.record_command = Some(cmd);
        }
        if let Ok(cmd) = std::env::var("CALC_SPEAK_COMMAND") {
            config.tts.speak_command = Some(cmd);
        }
        config
    }

    pub fn with_ai(mut self, ai: AiConfig) -> Self {
        self.ai = ai;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.ai.api_key.is_empty() {
            return Err("AI API key is required".to_string());
        }
        if self.speech.record_command.is_some() && self.speech.whisper_api_key.is_empty() {
            return Err("transcription API key is required for voice input".to_string());
        }
        if self.drain_interval.is_zero() {
            return Err("drain interval must be non-zero".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CompanionConfig::default();
        assert_eq!(config.ai.model, "gemini-1.5-flash");
        assert_eq!(config.speech.wait_for_speech, Duration::from_secs(5));
        assert_eq!(config.speech.max_phrase, Duration::from_secs(5));
        assert_eq!(config.drain_interval, Duration::from_millis(100));
        assert!(config.tts.enabled_at_start);
    }

    #[test]
    fn test_validate_requires_api_key() {
        let config = CompanionConfig::default();
        assert!(config.validate().is_err());

        let config = config.with_ai(AiConfig::new("key"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_voice_needs_transcription_key() {
        let mut config = CompanionConfig::default().with_ai(AiConfig::new("key"));
        config.speech = SpeechConfig::default().with_record_command("arecord -q");
        assert!(config.validate().is_err());

        config.speech.whisper_api_key = "key".to_string();
        assert!(config.validate().is_ok());
    }
}
