//! Speech-to-text client for field dictation.
//!
//! Staff can dictate a field value instead of typing it; the audio goes to
//! a hosted transcription endpoint and the first alternative's transcript
//! comes back. The engine itself is an external collaborator — this is a
//! thin wrapper that surfaces its result or error, nothing more.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rosterload::speech::SpeechClient;
//!
//! let client = SpeechClient::from_env()?;
//! let transcript = client.transcribe(audio_bytes, "audio/webm").await?;
//! ```

use serde::Deserialize;
use std::env;
use thiserror::Error;

/// Speech-to-text errors.
#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("Missing API key: {0}")]
    MissingApiKey(String),

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Transcription rejected: {0}")]
    ApiError(String),

    #[error("Invalid transcription response: {0}")]
    InvalidResponse(String),
}

const DEFAULT_ENDPOINT: &str = "https://api.deepgram.com/v1/listen";

/// Transcription service client.
#[derive(Clone)]
pub struct SpeechClient {
    api_key: String,
    endpoint: String,
}

// Response shape: results.channels[0].alternatives[0].transcript

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    results: TranscriptionResults,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResults {
    channels: Vec<Channel>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    #[serde(default)]
    transcript: String,
}

impl SpeechClient {
    /// Create a client with an explicit API key.
    pub fn new(api_key: String) -> Self {
        Self { api_key, endpoint: DEFAULT_ENDPOINT.to_string() }
    }

    /// Create a client from `SPEECH_API_KEY` (honoring a `.env` file);
    /// `SPEECH_API_URL` overrides the default endpoint.
    pub fn from_env() -> Result<Self, SpeechError> {
        let _ = dotenvy::dotenv();

        let api_key = env::var("SPEECH_API_KEY")
            .map_err(|_| SpeechError::MissingApiKey("SPEECH_API_KEY not set".to_string()))?;

        let mut client = Self::new(api_key);
        if let Ok(endpoint) = env::var("SPEECH_API_URL") {
            client.endpoint = endpoint;
        }
        Ok(client)
    }

    /// Override the endpoint.
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    /// Transcribe one audio clip; returns the transcript text.
    ///
    /// No retry: dictation is interactive, the user just speaks again.
    pub async fn transcribe(
        &self,
        audio: Vec<u8>,
        content_type: &str,
    ) -> Result<String, SpeechError> {
        let client = reqwest::Client::new();

        let response = client
            .post(&self.endpoint)
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", content_type)
            .body(audio)
            .send()
            .await
            .map_err(|e| SpeechError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SpeechError::RequestFailed(e.to_string()))?;

        if !status.is_success() {
            return Err(SpeechError::ApiError(format!("HTTP {status}: {body}")));
        }

        extract_transcript(&body)
    }
}

/// Pull the first alternative's transcript out of a response body.
fn extract_transcript(body: &str) -> Result<String, SpeechError> {
    let response: TranscriptionResponse =
        serde_json::from_str(body).map_err(|e| SpeechError::InvalidResponse(e.to_string()))?;

    response
        .results
        .channels
        .first()
        .and_then(|channel| channel.alternatives.first())
        .map(|alt| alt.transcript.trim().to_string())
        .ok_or_else(|| SpeechError::InvalidResponse("no transcription alternatives".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_transcript() {
        let body = r#"{
            "results": {
                "channels": [
                    { "alternatives": [ { "transcript": " seventh grade " } ] }
                ]
            }
        }"#;
        assert_eq!(extract_transcript(body).unwrap(), "seventh grade");
    }

    #[test]
    fn test_missing_alternatives() {
        let body = r#"{ "results": { "channels": [] } }"#;
        let err = extract_transcript(body).unwrap_err();
        assert!(matches!(err, SpeechError::InvalidResponse(_)));
    }

    #[test]
    fn test_garbage_body() {
        let err = extract_transcript("<html>nope</html>").unwrap_err();
        assert!(matches!(err, SpeechError::InvalidResponse(_)));
    }
}
