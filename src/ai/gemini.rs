//! Gemini `generateContent` client over blocking HTTP.

use crate::ai::client::{AiClient, ChatMessage, Role};
use crate::config::AiConfig;
use crate::{CompanionError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Request timeout for one generation call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    system_instruction: Content,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Debug)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Serialize, Debug)]
struct Part {
    text: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
    response_mime_type: String,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize, Debug)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Remote AI client for the Gemini API.
pub struct GeminiClient {
    client: reqwest::blocking::Client,
    config: AiConfig,
}

impl GeminiClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or the HTTP client
    /// cannot be constructed.
    pub fn new(config: AiConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(CompanionError::ConfigError(
                "Gemini API key required".to_string(),
            ));
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CompanionError::AiError(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", API_BASE, self.config.model)
    }
}

impl AiClient for GeminiClient {
    fn generate(&self, history: &[ChatMessage]) -> Result<String> {
        let request = build_request(&self.config, history);
        tracing::debug!(model = %self.config.model, turns = history.len(), "sending generation request");

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.config.api_key.as_str())])
            .json(&request)
            .send()
            .map_err(|e| {
                tracing::error!(error = %e, "Gemini request failed");
                CompanionError::AiError(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Gemini API error");
            return Err(CompanionError::AiError(format!(
                "Gemini API error {status}: {body}"
            )));
        }

        let parsed: GenerateResponse = response.json().map_err(|e| {
            tracing::error!(error = %e, "failed to parse Gemini response");
            CompanionError::AiError(e.to_string())
        })?;

        extract_text(parsed)
    }
}

fn build_request(config: &AiConfig, history: &[ChatMessage]) -> GenerateRequest {
    let contents = history
        .iter()
        .map(|m| Content {
            role: Some(
                match m.role {
                    Role::User => "user",
                    Role::Model => "model",
                }
                .to_string(),
            ),
            parts: vec![Part {
                text: m.text.clone(),
            }],
        })
        .collect();

    GenerateRequest {
        contents,
        system_instruction: Content {
            role: None,
            parts: vec![Part {
                text: config.system_instruction.clone(),
            }],
        },
        generation_config: GenerationConfig {
            temperature: config.temperature,
            top_p: config.top_p,
            top_k: config.top_k,
            max_output_tokens: config.max_output_tokens,
            response_mime_type: "text/plain".to_string(),
        },
    }
}

fn extract_text(response: GenerateResponse) -> Result<String> {
    let text: String = response
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .map(|p| p.text.as_str())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(CompanionError::AiError(
            "empty response from model".to_string(),
        ));
    }

    Ok(text)
}
