use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use thiserror::Error;
use tokio::time::timeout;

use crate::models::interaction::Interaction;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("platform request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("platform request timed out after {0:?}")]
    Timeout(Duration),
    #[error("platform rejected the call ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Outbound side effects on the originating social platform, routed
/// through the internal platform gateway. Every call is irreversible
/// from the engine's point of view.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Publish `text` as a reply to the interaction.
    async fn publish_reply(&self, interaction: &Interaction, text: &str)
        -> Result<(), PlatformError>;

    /// Remove the comment from the platform.
    async fn delete_comment(&self, interaction: &Interaction) -> Result<(), PlatformError>;

    /// Block the interaction's author.
    async fn block_author(&self, interaction: &Interaction) -> Result<(), PlatformError>;
}

pub struct HttpPlatformClient {
    client: Client,
    base_url: String,
    request_timeout: Duration,
}

impl HttpPlatformClient {
    pub fn new(client: Client, base_url: &str, request_timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout,
        }
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<(), PlatformError> {
        let request = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(&body)
            .send();

        let response = timeout(self.request_timeout, request)
            .await
            .map_err(|_| PlatformError::Timeout(self.request_timeout))??;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(PlatformError::Rejected { status, message });
        }
        Ok(())
    }
}

#[async_trait]
impl PlatformClient for HttpPlatformClient {
    async fn publish_reply(
        &self,
        interaction: &Interaction,
        text: &str,
    ) -> Result<(), PlatformError> {
        let path = format!("/platforms/{}/reply", interaction.platform.as_str());
        self.post(
            &path,
            json!({
                "kind": interaction.kind.as_str(),
                "external_id": interaction.external_id,
                "text": text,
            }),
        )
        .await
    }

    async fn delete_comment(&self, interaction: &Interaction) -> Result<(), PlatformError> {
        let path = format!("/platforms/{}/comments/delete", interaction.platform.as_str());
        self.post(&path, json!({ "external_id": interaction.external_id }))
            .await
    }

    async fn block_author(&self, interaction: &Interaction) -> Result<(), PlatformError> {
        let path = format!("/platforms/{}/authors/block", interaction.platform.as_str());
        self.post(
            &path,
            json!({
                "author_handle": interaction.author_handle,
                "external_id": interaction.external_id,
            }),
        )
        .await
    }
}

#[cfg(test)]
pub mod mock {
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum PlatformCall {
        Reply { external_id: String, text: String },
        DeleteComment { external_id: String },
        BlockAuthor { author_handle: String },
    }

    /// Records every outbound platform call; optionally fails them all.
    #[derive(Default)]
    pub struct MockPlatformClient {
        pub fail_all: bool,
        pub calls: Mutex<Vec<PlatformCall>>,
    }

    impl MockPlatformClient {
        pub fn failing() -> Self {
            Self {
                fail_all: true,
                ..Default::default()
            }
        }

        pub fn recorded(&self) -> Vec<PlatformCall> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: PlatformCall) -> Result<(), PlatformError> {
            if self.fail_all {
                return Err(PlatformError::Rejected {
                    status: 502,
                    message: "mock failure".into(),
                });
            }
            self.calls.lock().unwrap().push(call);
            Ok(())
        }
    }

    #[async_trait]
    impl PlatformClient for MockPlatformClient {
        async fn publish_reply(
            &self,
            interaction: &Interaction,
            text: &str,
        ) -> Result<(), PlatformError> {
            self.record(PlatformCall::Reply {
                external_id: interaction.external_id.clone(),
                text: text.to_string(),
            })
        }

        async fn delete_comment(&self, interaction: &Interaction) -> Result<(), PlatformError> {
            self.record(PlatformCall::DeleteComment {
                external_id: interaction.external_id.clone(),
            })
        }

        async fn block_author(&self, interaction: &Interaction) -> Result<(), PlatformError> {
            self.record(PlatformCall::BlockAuthor {
                author_handle: interaction.author_handle.clone(),
            })
        }
    }
}
