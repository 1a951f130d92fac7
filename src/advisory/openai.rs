//! HTTP client for the hosted reasoning service (OpenAI responses
//! endpoint). Cohort calls use the fast model with web search enabled;
//! the final synthesis uses the deep model without tools.

use serde::Serialize;
use serde_json::json;
use tracing::debug;

use super::extract::StructuredResponse;
use super::orchestrator::Reasoning;
use super::types::{AskOptions, ModelTier};
use super::AdvisoryError;
use crate::config;

const DEFAULT_TIMEOUT_SECS: u64 = 120;

pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl OpenAiClient {
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

    /// Client configured from the environment (`DOSEWISE_REASONING_URL`,
    /// `OPENAI_API_KEY`).
    pub fn from_env() -> Self {
        Self::new(
            &config::reasoning_base_url(),
            &config::api_key(),
            DEFAULT_TIMEOUT_SECS,
        )
    }

    fn model_for(&self, tier: ModelTier) -> String {
        match tier {
            ModelTier::Fast => config::fast_model(),
            ModelTier::Deep => config::deep_model(),
        }
    }
}

/// Request body for the /v1/responses endpoint.
#[derive(Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<serde_json::Value>>,
}

impl Reasoning for OpenAiClient {
    async fn ask(
        &self,
        prompt: &str,
        opts: &AskOptions,
    ) -> Result<StructuredResponse, AdvisoryError> {
        let url = format!("{}/v1/responses", self.base_url);
        let model = self.model_for(opts.tier);
        let tools = opts
            .allow_external_research
            .then(|| vec![json!({"type": "web_search_preview"})]);
        let body = ResponsesRequest {
            model: &model,
            input: prompt,
            tools,
        };

        debug!(%model, research = opts.allow_external_research, "Issuing reasoning request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    AdvisoryError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    AdvisoryError::Timeout(self.timeout_secs)
                } else {
                    AdvisoryError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdvisoryError::Http {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<StructuredResponse>()
            .await
            .map_err(|e| AdvisoryError::ResponseParsing(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisory::extract::extract_content;
    use httpmock::prelude::*;

    #[test]
    fn constructor_trims_trailing_slash() {
        let client = OpenAiClient::new("https://api.openai.com/", "sk-test", 60);
        assert_eq!(client.base_url, "https://api.openai.com");
        assert_eq!(client.timeout_secs, 60);
    }

    #[tokio::test]
    async fn cohort_request_carries_search_tool_and_fast_model() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/responses")
                    .header("authorization", "Bearer sk-test")
                    .json_body_partial(
                        r#"{"model": "gpt-4o-mini", "tools": [{"type": "web_search_preview"}]}"#,
                    );
                then.status(200)
                    .json_body(serde_json::json!({"output_text": "cohort advice"}));
            })
            .await;

        let client = OpenAiClient::new(&server.base_url(), "sk-test", 60);
        let resp = client.ask("prompt", &AskOptions::cohort()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(extract_content(&resp), "cohort advice");
    }

    #[tokio::test]
    async fn final_request_uses_deep_model_without_tools() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                // Exact body match also proves no "tools" key is sent.
                when.method(POST)
                    .path("/v1/responses")
                    .json_body(serde_json::json!({"model": "o4-mini", "input": "prompt"}));
                then.status(200)
                    .json_body(serde_json::json!({"output_text": "final advice"}));
            })
            .await;

        let client = OpenAiClient::new(&server.base_url(), "sk-test", 60);
        let resp = client
            .ask("prompt", &AskOptions::final_synthesis())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(extract_content(&resp), "final advice");
    }

    #[tokio::test]
    async fn non_success_status_maps_to_http_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/responses");
                then.status(429).body("rate limited");
            })
            .await;

        let client = OpenAiClient::new(&server.base_url(), "sk-test", 60);
        let err = client
            .ask("prompt", &AskOptions::cohort())
            .await
            .unwrap_err();

        match err {
            AdvisoryError::Http { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_maps_to_parsing_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/responses");
                then.status(200).body("not json");
            })
            .await;

        let client = OpenAiClient::new(&server.base_url(), "sk-test", 60);
        let err = client
            .ask("prompt", &AskOptions::cohort())
            .await
            .unwrap_err();

        assert!(matches!(err, AdvisoryError::ResponseParsing(_)));
    }
}
