//! HTTP classifier client tests against a local stub inference server

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use wba_analyzer::classifiers::{
    ClassifierError, ClassifierSet, EmotionClassifier, HttpClassifier, ModalityInput,
};
use wba_analyzer::db::{NewSession, SessionRecord, SessionStore};
use wba_analyzer::orchestrator::ModalityStatus;
use wba_analyzer::{SessionInput, SessionOrchestrator};
use wba_common::config::ClassifierEndpoint;
use wba_common::{Emotion, Modality};

async fn text_model(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        == Some("Bearer secret-token");
    if !authorized {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "unauthorized"})));
    }

    let text = body["inputs"].as_str().unwrap_or_default();
    let scores = if text.contains("angry") {
        json!([[{"label": "anger", "score": 0.7}, {"label": "neutral", "score": 0.3}]])
    } else {
        json!([[{"label": "joy", "score": 0.6}, {"label": "neutral", "score": 0.4}]])
    };
    (StatusCode::OK, Json(scores))
}

async fn audio_model(headers: HeaderMap, body: Bytes) -> (StatusCode, Json<Value>) {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if content_type != "audio/wav" || body.is_empty() {
        return (StatusCode::UNSUPPORTED_MEDIA_TYPE, Json(json!({"error": content_type})));
    }
    (
        StatusCode::OK,
        Json(json!([{"label": "neu", "score": 0.5}, {"label": "sad", "score": 0.5}])),
    )
}

async fn no_face() -> Json<Value> {
    Json(json!([]))
}

async fn broken() -> (StatusCode, &'static str) {
    (StatusCode::SERVICE_UNAVAILABLE, "model is loading")
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({"happy": 1.0}))
}

async fn garbage() -> &'static str {
    "<html>oops</html>"
}

/// Start the stub server and return its base URL
async fn start_stub_server() -> String {
    let app = Router::new()
        .route("/text", post(text_model))
        .route("/audio", post(audio_model))
        .route("/face", post(no_face))
        .route("/broken", post(broken))
        .route("/slow", post(slow))
        .route("/garbage", post(garbage));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

fn endpoint(base: &str, path: &str, timeout_ms: u64) -> ClassifierEndpoint {
    ClassifierEndpoint {
        url: format!("{}{}", base, path),
        api_token: Some("secret-token".to_string()),
        timeout_ms,
    }
}

struct NullStore;

#[async_trait::async_trait]
impl SessionStore for NullStore {
    async fn save(&self, _session: &NewSession) -> wba_common::Result<i64> {
        Ok(7)
    }

    async fn history(&self, _user_id: &str, _limit: u32) -> wba_common::Result<Vec<SessionRecord>> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_text_classifier_sends_json_with_token() {
    let base = start_stub_server().await;
    let classifier = HttpClassifier::new(Modality::Text, &endpoint(&base, "/text", 2000)).unwrap();

    let raw = classifier
        .predict(&ModalityInput::Text("I am angry".to_string()))
        .await
        .unwrap();

    assert_eq!(raw["anger"].as_f64(), Some(0.7));
    assert_eq!(raw["neutral"].as_f64(), Some(0.3));
}

#[tokio::test]
async fn test_missing_token_surfaces_status() {
    let base = start_stub_server().await;
    let mut unauthenticated = endpoint(&base, "/text", 2000);
    unauthenticated.api_token = None;
    let classifier = HttpClassifier::new(Modality::Text, &unauthenticated).unwrap();

    let err = classifier
        .predict(&ModalityInput::Text("hello".to_string()))
        .await
        .unwrap_err();

    assert!(matches!(err, ClassifierError::Status { status: 401, .. }));
}

#[tokio::test]
async fn test_audio_classifier_sends_bytes_with_content_type() {
    let base = start_stub_server().await;
    let classifier = HttpClassifier::new(Modality::Audio, &endpoint(&base, "/audio", 2000)).unwrap();

    let raw = classifier
        .predict(&ModalityInput::Audio {
            bytes: b"RIFF....WAVE".to_vec(),
            file_name: Some("note.wav".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(raw["neu"].as_f64(), Some(0.5));
}

#[tokio::test]
async fn test_no_face_detected_is_empty() {
    let base = start_stub_server().await;
    let classifier = HttpClassifier::new(Modality::Face, &endpoint(&base, "/face", 2000)).unwrap();

    let raw = classifier
        .predict(&ModalityInput::Image { bytes: vec![0xFF, 0xD8, 0xFF, 0xE0] })
        .await
        .unwrap();

    assert!(raw.is_empty());
}

#[tokio::test]
async fn test_error_status_and_bad_body() {
    let base = start_stub_server().await;

    let broken = HttpClassifier::new(Modality::Text, &endpoint(&base, "/broken", 2000)).unwrap();
    let err = broken
        .predict(&ModalityInput::Text("x".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClassifierError::Status { status: 503, ref body } if body == "model is loading"
    ));

    let garbage = HttpClassifier::new(Modality::Text, &endpoint(&base, "/garbage", 2000)).unwrap();
    let err = garbage
        .predict(&ModalityInput::Text("x".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, ClassifierError::Decode(_)));
}

#[tokio::test]
async fn test_orchestrator_with_http_classifiers() {
    let base = start_stub_server().await;
    let classifiers = ClassifierSet::new()
        .with(Arc::new(
            HttpClassifier::new(Modality::Text, &endpoint(&base, "/text", 2000)).unwrap(),
        ))
        .with(Arc::new(
            HttpClassifier::new(Modality::Audio, &endpoint(&base, "/slow", 100)).unwrap(),
        ))
        .with(Arc::new(
            HttpClassifier::new(Modality::Face, &endpoint(&base, "/face", 2000)).unwrap(),
        ));
    let orchestrator = SessionOrchestrator::new(classifiers, Arc::new(NullStore));

    let response = orchestrator
        .analyze(SessionInput {
            text: Some(ModalityInput::Text("lovely".to_string())),
            audio: Some(ModalityInput::Audio {
                bytes: vec![1, 2, 3],
                file_name: None,
            }),
            face: Some(ModalityInput::Image { bytes: vec![0x89, b'P', b'N', b'G'] }),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(response.modalities.text.status, ModalityStatus::Present);
    assert_eq!(response.modalities.audio.status, ModalityStatus::Failed);
    assert_eq!(response.modalities.face.status, ModalityStatus::Absent);
    assert_eq!(response.dominant_emotion, Some(Emotion::Happy));
    // 0.6 * 100 + 0.4 * 60
    assert_eq!(response.wellbeing_score, 84.0);
    assert_eq!(response.session_id, Some(7));
}
