//! Text-to-speech over the hosted speech service.

use std::future::Future;

use serde::Serialize;
use tracing::debug;

use super::SpeechError;
use crate::config;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Seam to the speech service: text in, encoded audio bytes out.
pub trait SpeechSynthesis {
    fn synthesize(
        &self,
        text: &str,
        voice: &str,
    ) -> impl Future<Output = Result<Vec<u8>, SpeechError>>;
}

pub struct HttpSpeechClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpSpeechClient {
    pub fn new(base_url: &str, api_key: &str, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
            timeout_secs,
        }
    }

    /// Client configured from the environment (`DOSEWISE_SPEECH_URL`,
    /// `OPENAI_API_KEY`).
    pub fn from_env() -> Self {
        Self::new(
            &config::speech_base_url(),
            &config::api_key(),
            DEFAULT_TIMEOUT_SECS,
        )
    }
}

/// Request body for the /v1/audio/speech endpoint.
#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: String,
    voice: &'a str,
    input: &'a str,
}

impl SpeechSynthesis for HttpSpeechClient {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, SpeechError> {
        let url = format!("{}/v1/audio/speech", self.base_url);
        let body = SpeechRequest {
            model: config::speech_model(),
            voice,
            input: text,
        };

        debug!(voice, chars = text.len(), "Issuing speech synthesis request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    SpeechError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    SpeechError::Timeout(self.timeout_secs)
                } else {
                    SpeechError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpeechError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SpeechError::Connection(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
