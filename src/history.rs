use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::feedback::FeedbackSink;

/// Client for the chat-history service's feedback endpoint. Persistence is
/// best-effort: callers decide what to do with a failure, this client never
/// retries.
#[derive(Clone)]
pub struct HistoryClient {
    client: Client,
    base_url: String,
}

impl HistoryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl FeedbackSink for HistoryClient {
    async fn persist_feedback(&self, message_id: &str, value: &str) -> Result<()> {
        #[derive(Serialize)]
        struct FeedbackReq<'a> {
            message_id: &'a str,
            message_feedback: &'a str,
        }

        let url = format!("{}/history/message_feedback", self.base_url);
        self.client
            .post(url)
            .json(&FeedbackReq {
                message_id,
                message_feedback: value,
            })
            .send()
            .await
            .context("failed to call history message_feedback endpoint")?
            .error_for_status()
            .context("history message_feedback returned non-success status")?;

        Ok(())
    }
}
