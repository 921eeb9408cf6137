use std::time::Duration;

use reqwest::Client;

use super::keyring::{self, SecretKind};
use super::report::SummaryGenerator;
use super::{SyncError, SyncResult};

pub const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_MODEL: &str = "claude-haiku-4-5-20251001";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 600;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Summary generator backed by the Anthropic Messages API.
#[derive(Clone)]
pub struct AnthropicClient {
    api_key: String,
    endpoint: String,
    model: String,
    http: Client,
}

impl AnthropicClient {
    pub fn new(api_key: &str) -> SyncResult<Self> {
        Self::with_endpoint(api_key, DEFAULT_ENDPOINT, DEFAULT_MODEL)
    }

    pub fn with_endpoint(api_key: &str, endpoint: &str, model: &str) -> SyncResult<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| SyncError::Request {
                operation: "build HTTP client",
                source,
            })?;
        Ok(Self {
            api_key: api_key.to_string(),
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            http,
        })
    }

    async fn messages(&self, body: serde_json::Value) -> SyncResult<reqwest::Response> {
        self.http
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| SyncError::Generator(format!("API request failed: {}", e)))
    }

    /// Verify the API key with a minimal request.
    pub async fn test_api_key(&self) -> SyncResult<()> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": 4,
            "messages": [
                { "role": "user", "content": "Reply with OK" }
            ]
        });

        let resp = self.messages(body).await?;
        if resp.status().is_success() {
            Ok(())
        } else if resp.status().as_u16() == 401 {
            Err(SyncError::Generator("Invalid API key".to_string()))
        } else {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            Err(SyncError::Generator(format!("API error {}: {}", status, text)))
        }
    }
}

impl SummaryGenerator for AnthropicClient {
    async fn summarize(&self, system: &str, prompt: &str) -> SyncResult<String> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "system": system,
            "messages": [
                { "role": "user", "content": prompt }
            ]
        });

        let resp = self.messages(body).await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(SyncError::Generator(format!("API error {}: {}", status, text)));
        }

        let api_resp: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| SyncError::Generator(format!("Failed to parse API response: {}", e)))?;

        // Concatenate every text block; the model may split long answers.
        let text: String = api_resp["content"]
            .as_array()
            .map(|blocks| {
                blocks
                    .iter()
                    .filter_map(|block| block["text"].as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(SyncError::Generator("No text in API response".to_string()));
        }
        Ok(text)
    }
}

/// Store the Anthropic API key in the system keyring.
pub async fn store_api_key(key: &str) -> SyncResult<()> {
    keyring::store_secret(SecretKind::AnthropicKey, key).await
}

/// The Anthropic API key from `ANTHROPIC_API_KEY` or the system keyring.
pub async fn load_api_key() -> SyncResult<Option<String>> {
    keyring::resolve_secret(SecretKind::AnthropicKey).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> AnthropicClient {
        AnthropicClient::with_endpoint(
            "test-key",
            &format!("{}/v1/messages", server.uri()),
            DEFAULT_MODEL,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn summarize_returns_joined_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", API_VERSION))
            .and(body_partial_json(serde_json::json!({
                "system": "be brief",
                "messages": [ { "role": "user", "content": "summarize" } ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [
                    { "type": "text", "text": "You finished " },
                    { "type": "text", "text": "three tasks." }
                ]
            })))
            .mount(&server)
            .await;

        let text = client(&server).summarize("be brief", "summarize").await.unwrap();
        assert_eq!(text, "You finished three tasks.");
    }

    #[tokio::test]
    async fn api_error_is_generator_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(529).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = client(&server).summarize("s", "p").await.unwrap_err();
        match err {
            SyncError::Generator(msg) => assert!(msg.contains("overloaded")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn empty_content_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "content": [] })),
            )
            .mount(&server)
            .await;

        assert!(client(&server).summarize("s", "p").await.is_err());
    }

    #[tokio::test]
    async fn test_api_key_reports_invalid_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client(&server).test_api_key().await.unwrap_err();
        assert_eq!(err.to_string(), "report generation failed: Invalid API key");
    }
}
