// Session Orchestrator - One Analysis Call End to End
//
// gather (concurrent, isolated per modality) -> fuse -> score -> recommend -> persist once
//
// Holds no decision logic of its own: every number comes from the fusion module.
// A modality that fails, times out, or carries malformed scores is reported and
// left out of fusion. Malformed includes negative values and a recognized mass
// above 1, so the scores reaching the engine always stay in range.

use crate::classifiers::{ClassifierError, ClassifierSet, EmotionClassifier, ModalityInput};
use crate::db::{NewSession, SessionStore};
use crate::fusion::{
    fuse_normalized, normalize, recommend, score, EngineResult, RawDistribution,
    ScoreBand, SynonymTable, NO_SIGNAL_RECOMMENDATION,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;
use wba_common::{Emotion, EmotionDistribution, Modality, ModalityWeights};

/// Slack allowed above a total probability mass of 1 for rounded classifier output
const MASS_TOLERANCE: f64 = 1e-6;

/// User id recorded when the caller doesn't supply one
pub const DEFAULT_USER_ID: &str = "default_user";

/// Everything submitted for one analysis call
#[derive(Debug, Clone, Default)]
pub struct SessionInput {
    pub user_id: Option<String>,
    pub text: Option<ModalityInput>,
    pub audio: Option<ModalityInput>,
    pub face: Option<ModalityInput>,
    /// Overrides the deployment's weights for this call
    pub weights: Option<ModalityWeights>,
    /// Makes the recommendation choice reproducible
    pub seed: Option<u64>,
}

impl SessionInput {
    fn input_for(&self, modality: Modality) -> Option<&ModalityInput> {
        match modality {
            Modality::Text => self.text.as_ref(),
            Modality::Audio => self.audio.as_ref(),
            Modality::Face => self.face.as_ref(),
        }
    }

    fn text_snippet(&self) -> Option<String> {
        match &self.text {
            Some(ModalityInput::Text(text)) => Some(text.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModalityStatus {
    /// Contributed to fusion
    Present,
    /// Not submitted, no classifier, nothing detected, or no recognized label
    Absent,
    /// Classifier error, timeout, or malformed scores (negative or summing above 1)
    Failed,
}

/// Per-modality outcome of the gather step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModalityReport {
    pub status: ModalityStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution: Option<EmotionDistribution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ModalityReport {
    fn present(distribution: EmotionDistribution) -> Self {
        Self {
            status: ModalityStatus::Present,
            distribution: Some(distribution),
            error: None,
        }
    }

    fn absent(reason: Option<String>) -> Self {
        Self {
            status: ModalityStatus::Absent,
            distribution: None,
            error: reason,
        }
    }

    fn failed(reason: String) -> Self {
        Self {
            status: ModalityStatus::Failed,
            distribution: None,
            error: Some(reason),
        }
    }

    pub fn is_present(&self) -> bool {
        self.status == ModalityStatus::Present
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModalityReports {
    pub text: ModalityReport,
    pub audio: ModalityReport,
    pub face: ModalityReport,
}

impl ModalityReports {
    pub fn get(&self, modality: Modality) -> &ModalityReport {
        match modality {
            Modality::Text => &self.text,
            Modality::Audio => &self.audio,
            Modality::Face => &self.face,
        }
    }
}

/// Result of one analysis call
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResponse {
    pub request_id: Uuid,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub fused_distribution: EmotionDistribution,
    /// None when no modality produced a signal
    pub dominant_emotion: Option<Emotion>,
    pub wellbeing_score: f64,
    pub band: Option<ScoreBand>,
    pub recommendation: String,
    pub has_signal: bool,
    pub modalities: ModalityReports,
    /// None when the record could not be persisted
    pub session_id: Option<i64>,
    pub processing_time_ms: f64,
}

/// Runs analysis calls against injected classifiers and a session store
pub struct SessionOrchestrator {
    classifiers: ClassifierSet,
    store: Arc<dyn SessionStore>,
    synonyms: SynonymTable,
    default_weights: ModalityWeights,
    last_error: Option<Arc<RwLock<Option<String>>>>,
}

impl SessionOrchestrator {
    pub fn new(classifiers: ClassifierSet, store: Arc<dyn SessionStore>) -> Self {
        Self {
            classifiers,
            store,
            synonyms: SynonymTable::default(),
            default_weights: ModalityWeights::default(),
            last_error: None,
        }
    }

    pub fn with_synonyms(mut self, synonyms: SynonymTable) -> Self {
        self.synonyms = synonyms;
        self
    }

    pub fn with_default_weights(mut self, weights: ModalityWeights) -> Self {
        self.default_weights = weights;
        self
    }

    /// Slot that receives persistence failures (surfaced on /health)
    pub fn with_last_error(mut self, slot: Arc<RwLock<Option<String>>>) -> Self {
        self.last_error = Some(slot);
        self
    }

    pub fn classifiers(&self) -> &ClassifierSet {
        &self.classifiers
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn default_weights(&self) -> &ModalityWeights {
        &self.default_weights
    }

    /// Analyze one session and persist its record
    pub async fn analyze(&self, input: SessionInput) -> EngineResult<AnalysisResponse> {
        let request_id = Uuid::new_v4();
        let user_id = input
            .user_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_USER_ID.to_string());

        let span = tracing::info_span!("analyze_session", %request_id, user_id = %user_id);
        self.run(request_id, user_id, input).instrument(span).await
    }

    async fn run(
        &self,
        request_id: Uuid,
        user_id: String,
        input: SessionInput,
    ) -> EngineResult<AnalysisResponse> {
        let start = Instant::now();

        let (text, audio, face) = tokio::join!(
            self.gather(Modality::Text, input.input_for(Modality::Text)),
            self.gather(Modality::Audio, input.input_for(Modality::Audio)),
            self.gather(Modality::Face, input.input_for(Modality::Face)),
        );
        let modalities = ModalityReports { text, audio, face };

        let present: Vec<(Modality, EmotionDistribution)> = Modality::ALL
            .into_iter()
            .filter_map(|m| modalities.get(m).distribution.map(|d| (m, d)))
            .collect();

        let weights = input.weights.unwrap_or(self.default_weights);
        let fused = fuse_normalized(&present, &weights);
        let dominant_emotion = fused.dominant();

        let (wellbeing_score, band, recommendation) = match dominant_emotion {
            Some(emotion) => {
                let wellbeing_score = score(&fused);
                let band = ScoreBand::from_score(wellbeing_score)?;
                let recommendation = recommend(emotion, wellbeing_score, input.seed)?;
                (wellbeing_score, Some(band), recommendation)
            }
            None => {
                info!("No modality produced a signal");
                (0.0, None, NO_SIGNAL_RECOMMENDATION.to_string())
            }
        };

        let timestamp = wba_common::time::now();
        let record = NewSession {
            user_id: user_id.clone(),
            timestamp,
            wellbeing_score,
            dominant_emotion,
            recommendation: recommendation.clone(),
            text_snippet: input.text_snippet(),
        };
        let session_id = self.persist(&record).await;

        let processing_time_ms = wba_common::time::elapsed_ms(start);
        info!(
            "Session analyzed: score={:.2} dominant={} present={} in {:.1}ms",
            wellbeing_score,
            dominant_emotion.map(Emotion::as_str).unwrap_or("none"),
            present.len(),
            processing_time_ms
        );

        Ok(AnalysisResponse {
            request_id,
            user_id,
            timestamp,
            fused_distribution: fused,
            dominant_emotion,
            wellbeing_score,
            band,
            recommendation,
            has_signal: dominant_emotion.is_some(),
            modalities,
            session_id,
            processing_time_ms,
        })
    }

    /// Produce one modality's report; never fails the session
    async fn gather(&self, modality: Modality, input: Option<&ModalityInput>) -> ModalityReport {
        let Some(input) = input else {
            return ModalityReport::absent(None);
        };

        let raw = match input {
            ModalityInput::Scores(raw) => raw.clone(),
            other => {
                let Some(classifier) = self.classifiers.get(modality) else {
                    debug!("No {} classifier configured, treating modality as absent", modality);
                    return ModalityReport::absent(Some(format!(
                        "no {} classifier configured",
                        modality
                    )));
                };
                match predict(classifier.as_ref(), other).await {
                    Ok(raw) => raw,
                    Err(e) => {
                        warn!("{} classifier '{}' failed: {}", modality, classifier.name(), e);
                        return ModalityReport::failed(e.to_string());
                    }
                }
            }
        };

        if raw.is_empty() {
            debug!("{} produced no labels, treating modality as absent", modality);
            return ModalityReport::absent(None);
        }

        match normalize(&raw, &self.synonyms).map_err(|e| e.for_modality(modality)) {
            Ok(distribution) if distribution.is_zero() => {
                debug!("{} carried no recognized emotion labels, treating as absent", modality);
                ModalityReport::absent(Some("no recognized emotion labels".to_string()))
            }
            Ok(distribution) if distribution.total() > 1.0 + MASS_TOLERANCE => {
                let reason = format!(
                    "{} scores sum to {:.4}, expected at most 1",
                    modality,
                    distribution.total()
                );
                warn!("Discarding {} modality: {}", modality, reason);
                ModalityReport::failed(reason)
            }
            Ok(distribution) => {
                debug!("{} distribution: {:?}", modality, distribution);
                ModalityReport::present(distribution)
            }
            Err(e) => {
                warn!("Discarding {} modality: {}", modality, e);
                ModalityReport::failed(e.to_string())
            }
        }
    }

    /// Save the record; a failure is logged and remembered, not returned
    async fn persist(&self, record: &NewSession) -> Option<i64> {
        match self.store.save(record).await {
            Ok(id) => {
                debug!("Session persisted with id {}", id);
                Some(id)
            }
            Err(e) => {
                let message = format!("Failed to persist session: {}", e);
                error!("{}", message);
                if let Some(slot) = &self.last_error {
                    *slot.write().await = Some(message);
                }
                None
            }
        }
    }
}

/// Call a classifier under its own time limit
async fn predict(
    classifier: &dyn EmotionClassifier,
    input: &ModalityInput,
) -> Result<RawDistribution, ClassifierError> {
    if !classifier.is_available() {
        return Err(ClassifierError::Unavailable(classifier.name().to_string()));
    }

    match classifier.timeout() {
        Some(limit) => tokio::time::timeout(limit, classifier.predict(input))
            .await
            .unwrap_or_else(|_| Err(ClassifierError::Timeout(limit.as_millis() as u64))),
        None => classifier.predict(input).await,
    }
}
