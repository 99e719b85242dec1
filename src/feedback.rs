use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{FeedbackState, ReasonTag, WIRE_NEUTRAL, WIRE_POSITIVE};

/// Destination for persisted feedback values. Production uses the history
/// service client; tests use a recording stub.
#[async_trait]
pub trait FeedbackSink: Send + Sync {
    async fn persist_feedback(&self, message_id: &str, value: &str) -> Result<()>;
}

/// Process-wide feedback cache keyed by message id, shared across every
/// rendered answer so a re-render reflects the latest known state without
/// another fetch.
#[derive(Clone, Default)]
pub struct FeedbackStore {
    states: Arc<Mutex<HashMap<String, FeedbackState>>>,
}

impl FeedbackStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, message_id: &str) -> Option<FeedbackState> {
        self.states
            .lock()
            .ok()
            .and_then(|map| map.get(message_id).cloned())
    }

    fn set(&self, message_id: &str, state: FeedbackState) {
        if let Ok(mut map) = self.states.lock() {
            map.insert(message_id.to_string(), state);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DislikeOutcome {
    /// State moved to negative and the capture dialog should open.
    CaptureOpened,
    /// Existing feedback was cleared back to neutral.
    ResetToNeutral,
    /// No message id, nothing happened.
    Ignored,
}

/// Per-answer feedback state machine. Local state and the shared cache commit
/// immediately on every transition; persistence is best-effort and never
/// rolled back or retried on failure.
pub struct FeedbackTracker {
    message_id: Option<String>,
    state: FeedbackState,
    capture_open: bool,
    store: FeedbackStore,
    sink: Arc<dyn FeedbackSink>,
}

impl FeedbackTracker {
    /// The cache wins over the record's persisted value so a re-rendered
    /// answer shows transitions made since it was last fetched.
    pub fn new(
        message_id: Option<String>,
        persisted: Option<&str>,
        store: FeedbackStore,
        sink: Arc<dyn FeedbackSink>,
    ) -> Self {
        let state = match &message_id {
            Some(id) => store
                .get(id)
                .unwrap_or_else(|| FeedbackState::from_persisted(persisted)),
            None => FeedbackState::Unset,
        };

        Self {
            message_id,
            state,
            capture_open: false,
            store,
            sink,
        }
    }

    pub fn state(&self) -> &FeedbackState {
        &self.state
    }

    pub fn capture_open(&self) -> bool {
        self.capture_open
    }

    pub async fn like_clicked(&mut self) -> Result<()> {
        let Some(id) = self.message_id.clone() else {
            return Ok(());
        };

        let (next, value) = if matches!(self.state, FeedbackState::Positive) {
            (FeedbackState::Neutral, WIRE_NEUTRAL)
        } else {
            (FeedbackState::Positive, WIRE_POSITIVE)
        };

        self.commit(&id, next);
        self.sink.persist_feedback(&id, value).await
    }

    pub async fn dislike_clicked(&mut self) -> Result<DislikeOutcome> {
        let Some(id) = self.message_id.clone() else {
            return Ok(DislikeOutcome::Ignored);
        };

        match self.state {
            FeedbackState::Unset | FeedbackState::Neutral => {
                self.capture_open = true;
                self.commit(
                    &id,
                    FeedbackState::Negative {
                        reasons: vec![],
                        free_text: None,
                    },
                );
                Ok(DislikeOutcome::CaptureOpened)
            }
            FeedbackState::Positive | FeedbackState::Negative { .. } => {
                self.capture_open = false;
                self.commit(&id, FeedbackState::Neutral);
                self.sink.persist_feedback(&id, WIRE_NEUTRAL).await?;
                Ok(DislikeOutcome::ResetToNeutral)
            }
        }
    }

    /// Local-only draft edit; nothing is persisted or cached until submit.
    pub fn reason_toggled(&mut self, tag: ReasonTag, selected: bool) {
        if self.message_id.is_none() || !self.capture_open {
            return;
        }
        if let FeedbackState::Negative { reasons, .. } = &mut self.state {
            if selected {
                if !reasons.contains(&tag) {
                    reasons.push(tag);
                }
            } else {
                reasons.retain(|existing| existing != &tag);
            }
        }
    }

    /// Local-only draft edit; nothing is persisted or cached until submit.
    pub fn free_text_changed(&mut self, text: &str) {
        if self.message_id.is_none() || !self.capture_open {
            return;
        }
        if let FeedbackState::Negative { free_text, .. } = &mut self.state {
            *free_text = Some(text.to_string());
        }
    }

    /// Persist the composite value (free text, then reason tokens, comma
    /// joined, empty parts dropped). The capture closes once the call
    /// settles, whether it succeeded or not.
    pub async fn submit(&mut self) -> Result<()> {
        let Some(id) = self.message_id.clone() else {
            return Ok(());
        };
        if !self.capture_open {
            return Ok(());
        }
        let FeedbackState::Negative { reasons, free_text } = self.state.clone() else {
            self.capture_open = false;
            return Ok(());
        };

        let mut parts: Vec<String> = Vec::new();
        if let Some(text) = free_text.as_deref() {
            if !text.is_empty() {
                parts.push(text.to_string());
            }
        }
        parts.extend(reasons.iter().map(|tag| tag.as_str().to_string()));
        let value = parts.join(",");

        self.commit(&id, FeedbackState::Negative { reasons, free_text });
        let outcome = self.sink.persist_feedback(&id, &value).await;
        self.capture_open = false;
        outcome
    }

    /// Cancel an in-progress capture: the draft is discarded and the answer
    /// goes back to neutral.
    pub async fn dismiss(&mut self) -> Result<()> {
        let Some(id) = self.message_id.clone() else {
            return Ok(());
        };
        if !self.capture_open {
            return Ok(());
        }

        self.capture_open = false;
        self.commit(&id, FeedbackState::Neutral);
        self.sink.persist_feedback(&id, WIRE_NEUTRAL).await
    }

    pub fn submit_enabled(&self, report_panel: bool) -> bool {
        match &self.state {
            FeedbackState::Negative { reasons, free_text } => {
                if report_panel {
                    !reasons.is_empty()
                } else {
                    free_text
                        .as_deref()
                        .map(|text| !text.trim().is_empty())
                        .unwrap_or(false)
                }
            }
            _ => false,
        }
    }

    fn commit(&mut self, id: &str, next: FeedbackState) {
        self.state = next;
        self.store.set(id, self.state.clone());
    }
}
