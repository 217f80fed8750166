//! Content generation against a remote endpoint.
//!
//! A [`ContentRequester`] builds a style-annotated prompt, posts it as
//! `{ "prompt": ... }` to the configured endpoint under a bounded wait, and
//! normalizes whatever comes back into structured sections or cleaned text.

pub mod cleanup;
pub mod extract;
pub mod prompt;

use formscribe_shared::{ApiConfig, FormscribeError, GenerationRequest, GenerationResult, Result};
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

pub use cleanup::clean_markdown;
pub use extract::{content_at_path, extract_json, normalize_response};
pub use prompt::{JSON_INSTRUCTION, build_prompt};

/// User-Agent string for generation requests.
const USER_AGENT: &str = concat!("formscribe/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// ContentRequester
// ---------------------------------------------------------------------------

/// Issues generation calls for one endpoint configuration.
#[derive(Debug, Clone)]
pub struct ContentRequester {
    client: Client,
    api: ApiConfig,
}

impl ContentRequester {
    pub fn new(api: ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FormscribeError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, api })
    }

    pub fn api(&self) -> &ApiConfig {
        &self.api
    }

    /// One generation call. The response must arrive within the configured
    /// timeout; a late response is dropped and the call reports a timeout.
    #[instrument(skip_all, fields(id = %request.id, style = %request.style))]
    pub async fn request(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        let prompt = build_prompt(
            &request.source_text,
            request.style,
            request.format.expects_json(),
        );
        debug!(chars = prompt.len(), "prompt built");

        let body = match tokio::time::timeout(self.api.timeout(), self.send(&prompt)).await {
            Ok(Ok(body)) => body,
            Ok(Err(e)) => {
                warn!(error = %e, "generation request failed");
                return Err(e);
            }
            Err(_) => {
                warn!(timeout_ms = self.api.timeout_ms, "generation request timed out");
                return Err(FormscribeError::Timeout {
                    after_ms: self.api.timeout_ms,
                });
            }
        };

        let mut result = normalize_response(&body, &self.api.response_path, request.format);
        if let Some(sections) = &request.sections {
            result.restrict_to(sections);
        }
        info!(structured = result.is_structured(), "generation complete");
        Ok(result)
    }

    async fn send(&self, prompt: &str) -> Result<Value> {
        let mut builder = self.client.post(&self.api.url);
        for (name, value) in &self.api.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .json(&json!({ "prompt": prompt }))
            .send()
            .await
            .map_err(|e| FormscribeError::Network(format!("{}: {e}", self.api.url)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FormscribeError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| FormscribeError::Network(format!("failed to read body: {e}")))?;
        serde_json::from_str(&text)
            .map_err(|e| FormscribeError::parse(format!("response body is not JSON: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use formscribe_shared::{
        ResponseFormat, SectionKey, SectionValue, StyleOption,
    };
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn api_for(server: &MockServer) -> ApiConfig {
        ApiConfig {
            url: format!("{}/generate", server.uri()),
            headers: BTreeMap::from([
                ("Content-Type".to_string(), "application/json".to_string()),
                ("X-Api-Key".to_string(), "secret".to_string()),
            ]),
            timeout_ms: 2_000,
            ..ApiConfig::default()
        }
    }

    #[tokio::test]
    async fn posts_prompt_and_follows_response_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .and(header("x-api-key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": {"answer": {
                    "acceptanceCriteria": ["Users can log in", "Errors are shown"],
                    "estimation": "3 days"
                }}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let requester = ContentRequester::new(api_for(&server)).unwrap();
        let request = GenerationRequest::new("Add SSO login").with_style(StyleOption::Detailed);
        let result = requester.request(&request).await.unwrap();

        let GenerationResult::Structured(content) = result else {
            panic!("expected structured result");
        };
        assert_eq!(
            content.get(SectionKey::Estimation),
            Some(&SectionValue::Text("3 days".into()))
        );

        let received = server.received_requests().await.unwrap();
        let sent: Value = received[0].body_json().unwrap();
        let prompt = sent["prompt"].as_str().unwrap();
        assert!(prompt.starts_with("Add SSO login"));
        assert!(prompt.contains(JSON_INSTRUCTION));
        assert!(prompt.ends_with(StyleOption::Detailed.instruction()));
    }

    #[tokio::test]
    async fn chat_completion_body_with_fenced_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "```json\n{\"testCases\":[\"a\"]}\n```"}}]
            })))
            .mount(&server)
            .await;

        let requester = ContentRequester::new(api_for(&server)).unwrap();
        let result = requester
            .request(&GenerationRequest::new("story"))
            .await
            .unwrap();
        let GenerationResult::Structured(content) = result else {
            panic!("expected structured result");
        };
        assert_eq!(
            content.get(SectionKey::TestCases),
            Some(&SectionValue::Items(vec!["a".into()]))
        );
    }

    #[tokio::test]
    async fn text_format_returns_cleaned_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "output": "### Test Cases\n- valid login\n- invalid login"
            })))
            .mount(&server)
            .await;

        let requester = ContentRequester::new(api_for(&server)).unwrap();
        let request = GenerationRequest::new("story").with_format(ResponseFormat::Text);
        let result = requester.request(&request).await.unwrap();
        assert_eq!(
            result,
            GenerationResult::Text("## Test Cases\n• valid login\n• invalid login".into())
        );

        let received = server.received_requests().await.unwrap();
        let sent: Value = received[0].body_json().unwrap();
        assert!(!sent["prompt"].as_str().unwrap().contains("valid JSON format"));
    }

    #[tokio::test]
    async fn requested_sections_restrict_the_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": {"answer": {"dependencies": "none", "estimation": "2d"}}
            })))
            .mount(&server)
            .await;

        let requester = ContentRequester::new(api_for(&server)).unwrap();
        let request = GenerationRequest::new("story").with_sections([SectionKey::Estimation]);
        let GenerationResult::Structured(content) = requester.request(&request).await.unwrap() else {
            panic!("expected structured result");
        };
        assert_eq!(content.len(), 1);
        assert!(content.get(SectionKey::Dependencies).is_none());
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let requester = ContentRequester::new(api_for(&server)).unwrap();
        let err = requester
            .request(&GenerationRequest::new("story"))
            .await
            .unwrap_err();
        assert!(matches!(err, FormscribeError::Status { status: 500, .. }));
        assert_eq!(err.to_string(), "network response was not ok: 500 Internal Server Error");
    }

    #[tokio::test]
    async fn slow_endpoint_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"output": "too late"}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let mut api = api_for(&server);
        api.timeout_ms = 50;
        let requester = ContentRequester::new(api).unwrap();
        let err = requester
            .request(&GenerationRequest::new("story"))
            .await
            .unwrap_err();
        assert!(matches!(err, FormscribeError::Timeout { after_ms: 50 }));
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_network_error() {
        let api = ApiConfig {
            url: "http://127.0.0.1:1/generate".into(),
            timeout_ms: 2_000,
            ..ApiConfig::default()
        };
        let requester = ContentRequester::new(api).unwrap();
        let err = requester
            .request(&GenerationRequest::new("story"))
            .await
            .unwrap_err();
        assert!(matches!(err, FormscribeError::Network(_)));
    }

    #[tokio::test]
    async fn non_json_body_is_a_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let requester = ContentRequester::new(api_for(&server)).unwrap();
        let err = requester
            .request(&GenerationRequest::new("story"))
            .await
            .unwrap_err();
        assert!(matches!(err, FormscribeError::Parse { .. }));
    }
}
