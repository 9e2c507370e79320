//! Session analysis endpoint
//!
//! Decodes the request into per-modality inputs and hands it to the
//! orchestrator. Each modality is either raw content for its classifier or a
//! precomputed `*_scores` map, never both.

use axum::{extract::State, routing::post, Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use wba_common::ModalityWeights;

use crate::classifiers::ModalityInput;
use crate::fusion::RawDistribution;
use crate::orchestrator::{AnalysisResponse, SessionInput};
use crate::{ApiError, ApiResult, AppState};

/// POST /analyze_session body
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyzeRequest {
    pub user_id: Option<String>,
    pub text: Option<String>,
    pub audio_base64: Option<String>,
    pub audio_filename: Option<String>,
    pub image_base64: Option<String>,
    pub text_scores: Option<RawDistribution>,
    pub audio_scores: Option<RawDistribution>,
    pub face_scores: Option<RawDistribution>,
    pub weights: Option<ModalityWeights>,
    pub seed: Option<u64>,
}

impl AnalyzeRequest {
    /// Validate and convert into orchestrator input
    pub fn into_session_input(self) -> ApiResult<SessionInput> {
        if let Some(weights) = &self.weights {
            weights.validate()?;
        }

        let text = self
            .text
            .filter(|t| !t.trim().is_empty())
            .map(ModalityInput::Text);
        let text = pick("text", text, self.text_scores)?;

        let audio = decode_base64("audio_base64", self.audio_base64.as_deref())?.map(|bytes| {
            ModalityInput::Audio {
                bytes,
                file_name: self.audio_filename,
            }
        });
        let audio = pick("audio", audio, self.audio_scores)?;

        let face = decode_base64("image_base64", self.image_base64.as_deref())?
            .map(|bytes| ModalityInput::Image { bytes });
        let face = pick("face", face, self.face_scores)?;

        Ok(SessionInput {
            user_id: self.user_id,
            text,
            audio,
            face,
            weights: self.weights,
            seed: self.seed,
        })
    }
}

/// Raw content or precomputed scores for one modality
fn pick(
    modality: &str,
    content: Option<ModalityInput>,
    scores: Option<RawDistribution>,
) -> ApiResult<Option<ModalityInput>> {
    match (content, scores) {
        (Some(_), Some(_)) => Err(ApiError::BadRequest(format!(
            "{} content and {}_scores are mutually exclusive",
            modality, modality
        ))),
        (Some(content), None) => Ok(Some(content)),
        (None, scores) => Ok(scores.map(ModalityInput::Scores)),
    }
}

/// Decode a base64 payload; empty input is treated as not submitted
///
/// Accepts a `data:<mime>;base64,` prefix as produced by browser file readers.
fn decode_base64(field: &str, value: Option<&str>) -> ApiResult<Option<Vec<u8>>> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    let payload = match value.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => value,
    };

    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| ApiError::BadRequest(format!("{} is not valid base64: {}", field, e)))?;

    Ok(if bytes.is_empty() { None } else { Some(bytes) })
}

/// POST /analyze_session
pub async fn analyze_session(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> ApiResult<Json<AnalysisResponse>> {
    let input = request.into_session_input()?;
    let response = state.orchestrator.analyze(input).await?;
    Ok(Json(response))
}

pub fn analyze_routes() -> Router<AppState> {
    Router::new().route("/analyze_session", post(analyze_session))
}
