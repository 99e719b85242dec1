use std::sync::Arc;

use anyhow::Result;

use crate::citations::{display_label, download_filename};
use crate::feedback::{DislikeOutcome, FeedbackSink, FeedbackStore, FeedbackTracker};
use crate::models::{
    AnswerRecord, Citation, CitationDisplay, FeedbackSnapshot, ParsedAnswer, ReasonTag,
    RenderedAnswer,
};
use crate::parser::parse_answer;

/// Composition root for one displayed answer: parsed text and citations on
/// one side, the feedback tracker on the other, plus the transient flags the
/// surrounding interface needs (reference accordion, report panel).
pub struct AnswerView {
    message_id: Option<String>,
    parsed: ParsedAnswer,
    feedback: Option<FeedbackTracker>,
    ref_accordion_open: bool,
    report_panel_open: bool,
}

impl AnswerView {
    pub fn new(
        record: &AnswerRecord,
        feedback_enabled: bool,
        store: FeedbackStore,
        sink: Arc<dyn FeedbackSink>,
    ) -> Self {
        let parsed = parse_answer(
            &record.answer,
            &record.citations,
            record.generated_chart.as_deref(),
        );

        let feedback = (feedback_enabled && record.message_id.is_some()).then(|| {
            FeedbackTracker::new(
                record.message_id.clone(),
                record.feedback.as_deref(),
                store,
                sink,
            )
        });

        Self {
            message_id: record.message_id.clone(),
            parsed,
            feedback,
            ref_accordion_open: true,
            report_panel_open: false,
        }
    }

    pub fn parsed(&self) -> &ParsedAnswer {
        &self.parsed
    }

    pub fn has_feedback(&self) -> bool {
        self.feedback.is_some()
    }

    /// Citation behind reference marker `k` (1-based), for the navigation
    /// collaborator when the user clicks a reference.
    pub fn citation(&self, marker: usize) -> Option<&Citation> {
        marker
            .checked_sub(1)
            .and_then(|index| self.parsed.ordered_citations.get(index))
    }

    pub fn citation_displays(&self) -> Vec<CitationDisplay> {
        self.parsed
            .ordered_citations
            .iter()
            .enumerate()
            .map(|(index, citation)| CitationDisplay {
                label: display_label(citation, index + 1, true),
                full_label: display_label(citation, index + 1, false),
                download_name: download_filename(citation),
                citation: citation.clone(),
            })
            .collect()
    }

    pub fn reference_label(&self) -> Option<String> {
        match self.parsed.ordered_citations.len() {
            0 => None,
            1 => Some("1 reference".to_string()),
            n => Some(format!("{n} references")),
        }
    }

    pub fn ref_accordion_open(&self) -> bool {
        self.ref_accordion_open
    }

    pub fn toggle_references(&mut self) {
        self.ref_accordion_open = !self.ref_accordion_open;
    }

    pub async fn like_clicked(&mut self) -> Result<()> {
        match &mut self.feedback {
            Some(tracker) => tracker.like_clicked().await,
            None => Ok(()),
        }
    }

    pub async fn dislike_clicked(&mut self) -> Result<()> {
        let Some(tracker) = &mut self.feedback else {
            return Ok(());
        };
        if tracker.dislike_clicked().await? == DislikeOutcome::CaptureOpened {
            self.report_panel_open = false;
        }
        Ok(())
    }

    pub fn reason_toggled(&mut self, tag: ReasonTag, selected: bool) {
        if let Some(tracker) = &mut self.feedback {
            tracker.reason_toggled(tag, selected);
        }
    }

    pub fn free_text_changed(&mut self, text: &str) {
        if let Some(tracker) = &mut self.feedback {
            tracker.free_text_changed(text);
        }
    }

    pub fn open_report_panel(&mut self) {
        if self
            .feedback
            .as_ref()
            .map(|tracker| tracker.capture_open())
            .unwrap_or(false)
        {
            self.report_panel_open = true;
        }
    }

    pub fn submit_enabled(&self) -> bool {
        self.feedback
            .as_ref()
            .map(|tracker| tracker.submit_enabled(self.report_panel_open))
            .unwrap_or(false)
    }

    pub async fn submit(&mut self) -> Result<()> {
        let Some(tracker) = &mut self.feedback else {
            return Ok(());
        };
        let outcome = tracker.submit().await;
        self.report_panel_open = false;
        outcome
    }

    pub async fn dismiss(&mut self) -> Result<()> {
        let Some(tracker) = &mut self.feedback else {
            return Ok(());
        };
        let outcome = tracker.dismiss().await;
        self.report_panel_open = false;
        outcome
    }

    pub fn snapshot(&self) -> Option<FeedbackSnapshot> {
        let tracker = self.feedback.as_ref()?;
        Some(FeedbackSnapshot {
            state: tracker.state().clone(),
            capture_open: tracker.capture_open(),
            report_panel_open: self.report_panel_open,
            submit_enabled: tracker.submit_enabled(self.report_panel_open),
        })
    }

    pub fn render(&self) -> RenderedAnswer {
        RenderedAnswer {
            message_id: self.message_id.clone(),
            display_text: self.parsed.display_text.clone(),
            citations: self.citation_displays(),
            chart: self.parsed.chart.clone(),
            reference_label: self.reference_label(),
            feedback: self.snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeedbackState;
    use async_trait::async_trait;

    struct NullSink;

    #[async_trait]
    impl FeedbackSink for NullSink {
        async fn persist_feedback(&self, _message_id: &str, _value: &str) -> Result<()> {
            Ok(())
        }
    }

    fn record() -> AnswerRecord {
        AnswerRecord {
            message_id: Some("m1".to_string()),
            answer: "Sales rose [doc1] and margins held [doc2].".to_string(),
            citations: vec![
                Citation {
                    url: Some("https://example.com/reports/q3.pdf".to_string()),
                    filepath: Some("reports/q3.pdf".to_string()),
                    chunk_id: Some("0".to_string()),
                    part_index: None,
                    reindex_id: None,
                },
                Citation {
                    url: Some("https://example.com/reports/q4.pdf".to_string()),
                    filepath: Some("reports/q4.pdf".to_string()),
                    chunk_id: Some("2".to_string()),
                    part_index: None,
                    reindex_id: None,
                },
            ],
            generated_chart: None,
            feedback: None,
        }
    }

    fn view(feedback_enabled: bool) -> AnswerView {
        AnswerView::new(
            &record(),
            feedback_enabled,
            FeedbackStore::new(),
            Arc::new(NullSink),
        )
    }

    #[test]
    fn render_carries_labels_and_marker_targets() {
        let view = view(true);
        let rendered = view.render();

        assert_eq!(
            rendered.display_text,
            "Sales rose  ^1^  and margins held  ^2^ ."
        );
        assert_eq!(rendered.reference_label.as_deref(), Some("2 references"));
        assert_eq!(rendered.citations[0].label, "reports/q3.pdf - Part 1");
        assert_eq!(rendered.citations[1].download_name, "q4.pdf");
        assert_eq!(
            view.citation(2).and_then(|c| c.url.as_deref()),
            Some("https://example.com/reports/q4.pdf")
        );
        assert!(view.citation(3).is_none());
    }

    #[tokio::test]
    async fn dislike_opens_a_fresh_capture_dialog() {
        let mut view = view(true);

        view.dislike_clicked().await.unwrap();

        let snapshot = view.snapshot().unwrap();
        assert!(snapshot.capture_open);
        assert!(!snapshot.report_panel_open);
        assert!(!snapshot.submit_enabled);
    }

    #[tokio::test]
    async fn report_panel_gates_submit_on_reasons() {
        let mut view = view(true);

        view.dislike_clicked().await.unwrap();
        view.free_text_changed("some text");
        assert!(view.submit_enabled());

        view.open_report_panel();
        assert!(!view.submit_enabled());
        view.reason_toggled(ReasonTag::HateSpeech, true);
        assert!(view.submit_enabled());

        view.submit().await.unwrap();
        let snapshot = view.snapshot().unwrap();
        assert!(!snapshot.capture_open);
        assert!(!snapshot.report_panel_open);
    }

    #[tokio::test]
    async fn dismiss_resets_to_neutral_and_closes_everything() {
        let mut view = view(true);

        view.dislike_clicked().await.unwrap();
        view.open_report_panel();
        view.dismiss().await.unwrap();

        let snapshot = view.snapshot().unwrap();
        assert_eq!(snapshot.state, FeedbackState::Neutral);
        assert!(!snapshot.capture_open);
        assert!(!snapshot.report_panel_open);
    }

    #[test]
    fn disabled_feedback_renders_without_a_panel() {
        let view = view(false);
        assert!(!view.has_feedback());
        assert!(view.render().feedback.is_none());
    }

    #[test]
    fn accordion_toggle_flips_the_flag() {
        let mut view = view(true);
        assert!(view.ref_accordion_open());
        view.toggle_references();
        assert!(!view.ref_accordion_open());
    }
}
