// HTTP Classifier Client
//
// Posts modality payloads to a remote inference endpoint and accepts the
// response shapes emitted by common hosted emotion models:
//   {"joy": 0.9, ...}                        flat map
//   [{"label": "joy", "score": 0.9}, ...]    label list
//   [[{"label": "joy", "score": 0.9}, ...]]  batched label list (first batch)
//   [{"box": [...], "emotions": {...}}, ...] face detections (first face)
// An empty face list means no face was detected and yields an empty map.

use super::{ClassifierError, EmotionClassifier, ModalityInput};
use crate::fusion::RawDistribution;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use wba_common::config::ClassifierEndpoint;
use wba_common::Modality;

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct FaceDetection {
    emotions: RawDistribution,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClassifierResponse {
    Batched(Vec<Vec<LabelScore>>),
    Labels(Vec<LabelScore>),
    Faces(Vec<FaceDetection>),
    Flat(RawDistribution),
}

impl ClassifierResponse {
    fn into_raw(self) -> RawDistribution {
        match self {
            ClassifierResponse::Batched(batches) => batches
                .into_iter()
                .next()
                .map(labels_to_raw)
                .unwrap_or_default(),
            ClassifierResponse::Labels(labels) => labels_to_raw(labels),
            ClassifierResponse::Faces(faces) => faces
                .into_iter()
                .next()
                .map(|face| face.emotions)
                .unwrap_or_default(),
            ClassifierResponse::Flat(map) => map,
        }
    }
}

fn labels_to_raw(labels: Vec<LabelScore>) -> RawDistribution {
    labels
        .into_iter()
        .map(|entry| (entry.label, entry.score))
        .collect()
}

/// Decode a classifier response body into a raw distribution
pub fn parse_response(body: &[u8]) -> Result<RawDistribution, ClassifierError> {
    serde_json::from_slice::<ClassifierResponse>(body)
        .map(ClassifierResponse::into_raw)
        .map_err(|e| ClassifierError::Decode(e.to_string()))
}

/// Content type for an audio clip, from its file extension
fn audio_content_type(file_name: Option<&str>) -> &'static str {
    let extension = file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("flac") => "audio/flac",
        Some("ogg") | Some("oga") => "audio/ogg",
        Some("webm") => "audio/webm",
        Some("m4a") => "audio/mp4",
        _ => "application/octet-stream",
    }
}

/// Content type for an image, sniffed from its magic bytes
fn image_content_type(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if bytes.starts_with(b"RIFF") && bytes.get(8..12) == Some(b"WEBP".as_slice()) {
        "image/webp"
    } else {
        "application/octet-stream"
    }
}

/// Classifier backed by a remote inference endpoint
pub struct HttpClassifier {
    name: String,
    modality: Modality,
    url: String,
    api_token: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpClassifier {
    pub fn new(modality: Modality, endpoint: &ClassifierEndpoint) -> Result<Self, ClassifierError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("wba-analyzer/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            name: format!("http-{}", modality),
            modality,
            url: endpoint.url.clone(),
            api_token: endpoint
                .api_token
                .clone()
                .filter(|token| !token.trim().is_empty()),
            timeout: Duration::from_millis(endpoint.timeout_ms),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn build_request(&self, input: &ModalityInput) -> Result<reqwest::RequestBuilder, ClassifierError> {
        let request = self.client.post(&self.url);
        let request = match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let request = match (self.modality, input) {
            (Modality::Text, ModalityInput::Text(text)) => {
                request.json(&serde_json::json!({ "inputs": text }))
            }
            (Modality::Audio, ModalityInput::Audio { bytes, file_name }) => request
                .header(CONTENT_TYPE, audio_content_type(file_name.as_deref()))
                .body(bytes.clone()),
            (Modality::Face, ModalityInput::Image { bytes }) => request
                .header(CONTENT_TYPE, image_content_type(bytes))
                .body(bytes.clone()),
            (_, other) => {
                return Err(ClassifierError::Unsupported {
                    classifier: self.name.clone(),
                    input: other.kind(),
                })
            }
        };

        Ok(request)
    }
}

#[async_trait]
impl EmotionClassifier for HttpClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn modality(&self) -> Modality {
        self.modality
    }

    fn is_available(&self) -> bool {
        !self.url.trim().is_empty()
    }

    fn timeout(&self) -> Option<Duration> {
        Some(self.timeout)
    }

    async fn predict(&self, input: &ModalityInput) -> Result<RawDistribution, ClassifierError> {
        if !self.is_available() {
            return Err(ClassifierError::Unavailable(self.name.clone()));
        }

        let request = self.build_request(input)?;
        debug!("{} -> POST {} ({} input)", self.name, self.url, input.kind());

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(ClassifierError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).chars().take(200).collect(),
            });
        }

        let raw = parse_response(&body)?;
        debug!("{} returned {} labels", self.name, raw.len());
        Ok(raw)
    }
}
