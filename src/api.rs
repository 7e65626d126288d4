use crate::openai::{self, ChatOptions};
use crate::prompts;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub llm: openai::Client,
}

/// Longest accepted article, in characters. Larger bodies get a 400
/// instead of being forwarded upstream.
pub const MAX_TEXT_CHARS: usize = 100_000;

const ANALYZE_OPTS: ChatOptions = ChatOptions {
    temperature: 0.5,
    max_tokens: 1500,
    json_response: true,
};

const SUMMARIZE_OPTS: ChatOptions = ChatOptions {
    temperature: 0.5,
    max_tokens: 800,
    json_response: false,
};

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/analyze", post(analyze))
        .route("/summarize", post(summarize))
        .route("/health", get(health))
        .with_state(Arc::new(state))
}

// -------------------------------------------------------------------
// Handlers

async fn analyze(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let text = article_text(&body)?;
    tracing::debug!("received text (first 300 chars): {}", preview(&text));

    let content = state
        .llm
        .chat(prompts::ANALYZE_SYSTEM, &prompts::analyze_user(&text), ANALYZE_OPTS)
        .await
        .map_err(ApiError::upstream)?;
    tracing::debug!("model response: {}", content);

    // Strict decode only. The model is asked for a JSON object via
    // response_format; anything that does not parse goes back to the
    // caller untouched in the error envelope.
    match serde_json::from_str::<Value>(&content) {
        Ok(report) => Ok(Json(report)),
        Err(err) => {
            tracing::error!("failed to parse model response: {}", err);
            Err(ApiError::parsing(content))
        }
    }
}

async fn summarize(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<SummaryResponse>, ApiError> {
    let text = article_text(&body)?;
    tracing::debug!("received text (first 300 chars): {}", preview(&text));

    let summary = state
        .llm
        .chat(prompts::SUMMARIZE_SYSTEM, &text, SUMMARIZE_OPTS)
        .await
        .map_err(ApiError::upstream)?;

    Ok(Json(SummaryResponse { summary }))
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

// -------------------------------------------------------------------
// Request decoding

#[derive(Deserialize, Default)]
struct ArticleRequest {
    #[serde(default)]
    text: String,
}

/// Lenient extraction of the `text` field: a missing field, a non-JSON
/// body, or a body of the wrong shape all degrade to the empty string.
/// Only oversize input is an error.
fn article_text(body: &[u8]) -> Result<String, ApiError> {
    let text = serde_json::from_slice::<ArticleRequest>(body)
        .unwrap_or_default()
        .text;
    if text.chars().count() > MAX_TEXT_CHARS {
        return Err(ApiError::bad_request(format!(
            "text exceeds {} characters",
            MAX_TEXT_CHARS
        )));
    }
    Ok(text)
}

fn preview(text: &str) -> &str {
    match text.char_indices().nth(300) {
        Some((i, _)) => &text[..i],
        None => text,
    }
}

// -------------------------------------------------------------------
// Response DTOs

#[derive(Serialize)]
struct SummaryResponse {
    summary: String,
}

/// Report shape the analysis prompt asks the model to emit. The handler
/// relays the model's JSON as-is without validating against this; the
/// types pin down the expected fields for tests and callers.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub final_score: u8,
    pub categories: BTreeMap<String, CategoryScore>,
    pub penalties: Vec<Penalty>,
    pub flagged_phrases: Vec<FlaggedPhrase>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryScore {
    pub score: u8,
    pub explanation: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Penalty {
    #[serde(rename = "type")]
    pub kind: String,
    pub count: u32,
    pub points_lost: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FlaggedPhrase {
    pub text: String,
    pub explanation: PhraseExplanation,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PhraseExplanation {
    pub why: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub fix: String,
}

// -------------------------------------------------------------------
// Errors

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: Value,
}

impl ApiError {
    fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, json!({"error": msg.into()}))
    }

    fn upstream(e: impl std::fmt::Display) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({"error": e.to_string()}),
        )
    }

    /// The model's reply did not decode; hand the caller the raw text so
    /// nothing is lost.
    fn parsing(raw: String) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({"error": "Parsing error", "raw": raw}),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn article_text_reads_text_field() {
        let text = article_text(br#"{"text": "The sky is blue."}"#).unwrap();
        assert_eq!(text, "The sky is blue.");
    }

    #[test]
    fn article_text_defaults_on_missing_field() {
        assert_eq!(article_text(br#"{}"#).unwrap(), "");
        assert_eq!(article_text(br#"{"other": 1}"#).unwrap(), "");
    }

    #[test]
    fn article_text_defaults_on_invalid_json() {
        assert_eq!(article_text(b"not json at all").unwrap(), "");
        assert_eq!(article_text(b"").unwrap(), "");
    }

    #[test]
    fn article_text_rejects_oversized_input() {
        let body =
            serde_json::to_vec(&json!({"text": "a".repeat(MAX_TEXT_CHARS + 1)})).unwrap();
        let err = article_text(&body).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn article_text_accepts_input_at_the_limit() {
        let body = serde_json::to_vec(&json!({"text": "a".repeat(MAX_TEXT_CHARS)})).unwrap();
        assert!(article_text(&body).is_ok());
    }

    #[test]
    fn preview_caps_at_300_chars() {
        let text = "x".repeat(1000);
        assert_eq!(preview(&text).len(), 300);
    }

    #[test]
    fn preview_respects_char_boundaries() {
        // 3-byte chars; a byte-index cut would panic or split a char.
        let text = "あ".repeat(400);
        assert_eq!(preview(&text).chars().count(), 300);
    }

    #[test]
    fn preview_returns_short_text_whole() {
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn analysis_report_decodes_the_documented_shape() {
        let raw = json!({
            "final_score": 72,
            "categories": {
                "FactualAccuracy": {"score": 80, "explanation": "Mostly sourced."},
                "Objectivity": {"score": 60, "explanation": "Leans one way."},
                "SourceQuality": {"score": 75, "explanation": "Named outlets."},
                "Language": {"score": 70, "explanation": "Some loaded terms."}
            },
            "penalties": [
                {"type": "loaded language", "count": 2, "points_lost": 4}
            ],
            "flagged_phrases": [
                {
                    "text": "a shocking betrayal",
                    "explanation": {
                        "why": "Emotionally charged wording.",
                        "type": "loaded language",
                        "fix": "a reversal of the earlier position"
                    }
                }
            ]
        });
        let report: AnalysisReport = serde_json::from_value(raw).unwrap();
        assert_eq!(report.final_score, 72);
        assert_eq!(report.categories.len(), 4);
        assert_eq!(report.penalties[0].kind, "loaded language");
        assert!(!report.flagged_phrases[0].explanation.fix.is_empty());
    }
}
