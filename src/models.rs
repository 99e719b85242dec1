use anyhow::{Context, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};

pub const WIRE_POSITIVE: &str = "positive";
pub const WIRE_NEUTRAL: &str = "neutral";
pub const WIRE_NEGATIVE: &str = "negative";

/// A source document reference backing part of an answer. Two citations are
/// the same entity iff their `url` matches; everything else is display data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub url: Option<String>,
    pub filepath: Option<String>,
    pub chunk_id: Option<String>,
    pub part_index: Option<i64>,
    pub reindex_id: Option<String>,
}

/// Answer record as delivered by the chat-history collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRecord {
    #[serde(default)]
    pub message_id: Option<String>,
    pub answer: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
    #[serde(default)]
    pub generated_chart: Option<String>,
    #[serde(default)]
    pub feedback: Option<String>,
}

/// Base64 image data extracted from an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartPayload {
    pub base64: String,
}

impl ChartPayload {
    pub fn decode(&self) -> Result<Vec<u8>> {
        let compact: String = self
            .base64
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        base64::engine::general_purpose::STANDARD
            .decode(compact)
            .context("chart payload is not valid base64")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedAnswer {
    pub display_text: String,
    pub ordered_citations: Vec<Citation>,
    pub chart: Option<ChartPayload>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasonTag {
    HateSpeech,
    Violent,
    Sexual,
    Manipulative,
    #[serde(rename = "other")]
    OtherHarmful,
}

impl ReasonTag {
    pub fn as_str(self) -> &'static str {
        match self {
            ReasonTag::HateSpeech => "hatespeech",
            ReasonTag::Violent => "violent",
            ReasonTag::Sexual => "sexual",
            ReasonTag::Manipulative => "manipulative",
            ReasonTag::OtherHarmful => "other",
        }
    }

    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "hatespeech" => Some(ReasonTag::HateSpeech),
            "violent" => Some(ReasonTag::Violent),
            "sexual" => Some(ReasonTag::Sexual),
            "manipulative" => Some(ReasonTag::Manipulative),
            "other" => Some(ReasonTag::OtherHarmful),
            _ => None,
        }
    }
}

/// Authoritative feedback value for one answer. `reasons` keeps selection
/// order and never holds duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedbackState {
    Unset,
    Neutral,
    Positive,
    Negative {
        #[serde(default)]
        reasons: Vec<ReasonTag>,
        #[serde(default)]
        free_text: Option<String>,
    },
}

impl FeedbackState {
    /// Reconstruct a state from the persisted wire value. The comma check
    /// runs before the simple-token match, so free text containing a comma
    /// also reloads as negative (wire-compatible with the stored format).
    pub fn from_persisted(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return FeedbackState::Unset;
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return FeedbackState::Unset;
        }

        let tokens: Vec<&str> = trimmed.split(',').collect();
        if tokens.len() > 1 {
            let mut reasons = Vec::new();
            let mut leftover = Vec::new();
            for token in &tokens {
                match ReasonTag::from_wire(token.trim()) {
                    Some(tag) if !reasons.contains(&tag) => reasons.push(tag),
                    Some(_) => {}
                    None => leftover.push(*token),
                }
            }
            let free_text = if leftover.is_empty() {
                None
            } else {
                Some(leftover.join(","))
            };
            return FeedbackState::Negative { reasons, free_text };
        }

        match trimmed {
            WIRE_POSITIVE => FeedbackState::Positive,
            WIRE_NEUTRAL => FeedbackState::Neutral,
            WIRE_NEGATIVE => FeedbackState::Negative {
                reasons: vec![],
                free_text: None,
            },
            other => match ReasonTag::from_wire(other) {
                Some(tag) => FeedbackState::Negative {
                    reasons: vec![tag],
                    free_text: None,
                },
                None => FeedbackState::Neutral,
            },
        }
    }
}

/// One user-interface event applied to an answer's feedback panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FeedbackEvent {
    Like,
    Dislike,
    ReasonToggled { tag: ReasonTag, selected: bool },
    FreeTextChanged { text: String },
    ReportPanelOpened,
    Submit,
    Dismiss,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackSnapshot {
    pub state: FeedbackState,
    pub capture_open: bool,
    pub report_panel_open: bool,
    pub submit_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitationDisplay {
    pub label: String,
    pub full_label: String,
    pub download_name: String,
    pub citation: Citation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedAnswer {
    pub message_id: Option<String>,
    pub display_text: String,
    pub citations: Vec<CitationDisplay>,
    pub chart: Option<ChartPayload>,
    pub reference_label: Option<String>,
    pub feedback: Option<FeedbackSnapshot>,
}
