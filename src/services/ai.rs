use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tokio::time::timeout;

use crate::models::interaction::Interaction;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("ai request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("ai request timed out after {0:?}")]
    Timeout(Duration),
    #[error("unexpected ai response: {0}")]
    Malformed(String),
}

/// Boolean evaluation of a natural-language prompt against an
/// interaction. Used by prompt conditions and AI-prompt views.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn matches(&self, prompt: &str, interaction: &Interaction) -> Result<bool, AiError>;
}

/// Drafts a reply for human approval.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn draft_reply(
        &self,
        interaction: &Interaction,
        tone: Option<&str>,
        instructions: Option<&str>,
    ) -> Result<String, AiError>;
}

/// HTTP client for the AI service. One struct implements both traits;
/// classification and generation are separate endpoints of the same
/// service.
pub struct HttpAiService {
    client: Client,
    base_url: String,
    api_key: String,
    request_timeout: Duration,
}

impl HttpAiService {
    pub fn new(client: Client, base_url: &str, api_key: &str, request_timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            request_timeout,
        }
    }

    fn interaction_context(interaction: &Interaction) -> serde_json::Value {
        json!({
            "platform": interaction.platform.as_str(),
            "kind": interaction.kind.as_str(),
            "author_handle": interaction.author_handle,
            "author_follower_count": interaction.author_follower_count,
            "author_is_verified": interaction.author_is_verified,
            "like_count": interaction.like_count,
        })
    }
}

#[derive(Deserialize)]
struct ClassifyResponse {
    matches: bool,
}

#[derive(Deserialize)]
struct GenerateResponseBody {
    text: String,
}

#[async_trait]
impl Classifier for HttpAiService {
    async fn matches(&self, prompt: &str, interaction: &Interaction) -> Result<bool, AiError> {
        let request = self
            .client
            .post(format!("{}/v1/classify", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "prompt": prompt,
                "content": interaction.content,
                "context": Self::interaction_context(interaction),
            }))
            .send();

        let response = timeout(self.request_timeout, request)
            .await
            .map_err(|_| AiError::Timeout(self.request_timeout))??
            .error_for_status()?;

        let body: ClassifyResponse = response
            .json()
            .await
            .map_err(|e| AiError::Malformed(e.to_string()))?;
        Ok(body.matches)
    }
}

#[async_trait]
impl ResponseGenerator for HttpAiService {
    async fn draft_reply(
        &self,
        interaction: &Interaction,
        tone: Option<&str>,
        instructions: Option<&str>,
    ) -> Result<String, AiError> {
        let request = self
            .client
            .post(format!("{}/v1/generate", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "content": interaction.content,
                "tone": tone,
                "instructions": instructions,
                "context": Self::interaction_context(interaction),
            }))
            .send();

        let response = timeout(self.request_timeout, request)
            .await
            .map_err(|_| AiError::Timeout(self.request_timeout))??
            .error_for_status()?;

        let body: GenerateResponseBody = response
            .json()
            .await
            .map_err(|e| AiError::Malformed(e.to_string()))?;
        if body.text.trim().is_empty() {
            return Err(AiError::Malformed("empty draft".into()));
        }
        Ok(body.text)
    }
}

#[cfg(test)]
pub mod mock {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// Scripted classifier: prompts map to fixed verdicts, unknown
    /// prompts default to `false`. Records every call.
    #[derive(Default)]
    pub struct MockClassifier {
        pub verdicts: HashMap<String, bool>,
        pub fail_all: bool,
        pub calls: Mutex<Vec<String>>,
    }

    impl MockClassifier {
        pub fn with_verdicts(verdicts: &[(&str, bool)]) -> Self {
            Self {
                verdicts: verdicts
                    .iter()
                    .map(|(k, v)| (k.to_string(), *v))
                    .collect(),
                ..Default::default()
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Classifier for MockClassifier {
        async fn matches(&self, prompt: &str, _: &Interaction) -> Result<bool, AiError> {
            self.calls.lock().unwrap().push(prompt.to_string());
            if self.fail_all {
                return Err(AiError::Timeout(Duration::from_millis(1)));
            }
            Ok(self.verdicts.get(prompt).copied().unwrap_or(false))
        }
    }

    #[derive(Default)]
    pub struct MockGenerator {
        pub draft: Option<String>,
        pub fail: bool,
        pub calls: Mutex<Vec<(Option<String>, Option<String>)>>,
    }

    #[async_trait]
    impl ResponseGenerator for MockGenerator {
        async fn draft_reply(
            &self,
            _: &Interaction,
            tone: Option<&str>,
            instructions: Option<&str>,
        ) -> Result<String, AiError> {
            self.calls
                .lock()
                .unwrap()
                .push((tone.map(String::from), instructions.map(String::from)));
            if self.fail {
                return Err(AiError::Malformed("mock failure".into()));
            }
            Ok(self
                .draft
                .clone()
                .unwrap_or_else(|| "Thanks for reaching out!".into()))
        }
    }
}
