use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::post;
use axum::Router;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::feedback::{FeedbackSink, FeedbackStore};
use crate::models::{AnswerRecord, FeedbackEvent, FeedbackSnapshot, RenderedAnswer};
use crate::view::AnswerView;

#[derive(Clone)]
struct AppState {
    config: AppConfig,
    store: FeedbackStore,
    sink: Arc<dyn FeedbackSink>,
    // One lock over all panels: feedback events arrive serialized from the
    // interface, and transitions must not interleave for the same answer.
    views: Arc<Mutex<HashMap<String, AnswerView>>>,
}

pub async fn run_server(
    config: AppConfig,
    store: FeedbackStore,
    sink: Arc<dyn FeedbackSink>,
) -> Result<()> {
    let state = AppState {
        config: config.clone(),
        store,
        sink,
        views: Arc::new(Mutex::new(HashMap::new())),
    };

    let app = Router::new()
        .route("/api/answer", post(render_answer))
        .route(
            "/api/answer/:message_id/feedback",
            post(apply_feedback).get(get_feedback),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = config.bind_addr.parse()?;
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn render_answer(
    State(state): State<AppState>,
    Json(record): Json<AnswerRecord>,
) -> Result<Json<RenderedAnswer>, ApiError> {
    let view = AnswerView::new(
        &record,
        state.config.feedback_enabled,
        state.store.clone(),
        state.sink.clone(),
    );
    let rendered = view.render();

    if view.has_feedback() {
        if let Some(message_id) = record.message_id {
            state.views.lock().await.insert(message_id, view);
        }
    }

    Ok(Json(rendered))
}

async fn apply_feedback(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
    Json(event): Json<FeedbackEvent>,
) -> Result<Json<FeedbackSnapshot>, ApiError> {
    let mut views = state.views.lock().await;
    let view = views
        .get_mut(&message_id)
        .ok_or_else(|| ApiError::not_found(format!("answer not found: {}", message_id)))?;

    match event {
        FeedbackEvent::Like => view.like_clicked().await?,
        FeedbackEvent::Dislike => view.dislike_clicked().await?,
        FeedbackEvent::ReasonToggled { tag, selected } => view.reason_toggled(tag, selected),
        FeedbackEvent::FreeTextChanged { text } => view.free_text_changed(&text),
        FeedbackEvent::ReportPanelOpened => view.open_report_panel(),
        FeedbackEvent::Submit => {
            if !view.submit_enabled() {
                return Err(ApiError::bad_request(
                    "submit requires a selected reason or non-empty feedback text".to_string(),
                ));
            }
            view.submit().await?;
        }
        FeedbackEvent::Dismiss => view.dismiss().await?,
    }

    let snapshot = view
        .snapshot()
        .ok_or_else(|| ApiError::bad_request("feedback is not enabled".to_string()))?;
    Ok(Json(snapshot))
}

async fn get_feedback(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
) -> Result<Json<FeedbackSnapshot>, ApiError> {
    let views = state.views.lock().await;
    let snapshot = views
        .get(&message_id)
        .and_then(|view| view.snapshot())
        .ok_or_else(|| ApiError::not_found(format!("answer not found: {}", message_id)))?;
    Ok(Json(snapshot))
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(message: String) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message,
        }
    }

    fn bad_request(message: String) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: value.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}
