// Emotion Classifiers - Per-Modality Prediction Sources
//
// Each modality is served by an injected classifier. The orchestrator never
// knows how predictions are produced, only that it gets label -> score maps.
// A classifier failure removes that modality from fusion; it never aborts a session.

use crate::fusion::RawDistribution;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use wba_common::config::ClassifiersConfig;
use wba_common::Modality;

pub mod http_client;

pub use http_client::HttpClassifier;

/// Input for one modality of an analysis request
#[derive(Debug, Clone, PartialEq)]
pub enum ModalityInput {
    /// Free text for the text classifier
    Text(String),
    /// Encoded audio clip; the file name hints at the container format
    Audio {
        bytes: Vec<u8>,
        file_name: Option<String>,
    },
    /// Encoded still image for the facial-expression classifier
    Image { bytes: Vec<u8> },
    /// Distribution already produced by a client-side classifier
    Scores(RawDistribution),
}

impl ModalityInput {
    pub fn kind(&self) -> &'static str {
        match self {
            ModalityInput::Text(_) => "text",
            ModalityInput::Audio { .. } => "audio",
            ModalityInput::Image { .. } => "image",
            ModalityInput::Scores(_) => "scores",
        }
    }
}

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Classifier unavailable: {0}")]
    Unavailable(String),

    #[error("Classifier {classifier} cannot handle {input} input")]
    Unsupported {
        classifier: String,
        input: &'static str,
    },

    #[error("Classifier timed out after {0} ms")]
    Timeout(u64),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Classifier returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode classifier response: {0}")]
    Decode(String),
}

/// A per-modality emotion classifier
#[async_trait]
pub trait EmotionClassifier: Send + Sync {
    /// Identifier for logs and health output
    fn name(&self) -> &str;

    /// Modality this classifier serves
    fn modality(&self) -> Modality;

    /// Whether the classifier can currently serve requests
    fn is_available(&self) -> bool {
        true
    }

    /// Upper bound the orchestrator places on a single prediction
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Predict a label -> score map for the input
    async fn predict(&self, input: &ModalityInput) -> Result<RawDistribution, ClassifierError>;
}

/// Classifiers owned by the orchestrator, at most one per modality
#[derive(Clone, Default)]
pub struct ClassifierSet {
    text: Option<Arc<dyn EmotionClassifier>>,
    audio: Option<Arc<dyn EmotionClassifier>>,
    face: Option<Arc<dyn EmotionClassifier>>,
}

impl ClassifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a classifier under the modality it reports
    pub fn with(mut self, classifier: Arc<dyn EmotionClassifier>) -> Self {
        match classifier.modality() {
            Modality::Text => self.text = Some(classifier),
            Modality::Audio => self.audio = Some(classifier),
            Modality::Face => self.face = Some(classifier),
        }
        self
    }

    pub fn get(&self, modality: Modality) -> Option<&Arc<dyn EmotionClassifier>> {
        match modality {
            Modality::Text => self.text.as_ref(),
            Modality::Audio => self.audio.as_ref(),
            Modality::Face => self.face.as_ref(),
        }
    }

    /// HTTP classifiers for every configured endpoint
    pub fn from_config(config: &ClassifiersConfig) -> Result<Self, ClassifierError> {
        let mut set = Self::new();
        for (modality, endpoint) in [
            (Modality::Text, &config.text),
            (Modality::Audio, &config.audio),
            (Modality::Face, &config.face),
        ] {
            if let Some(endpoint) = endpoint {
                set = set.with(Arc::new(HttpClassifier::new(modality, endpoint)?));
            }
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::raw_distribution;

    struct FixedClassifier(Modality);

    #[async_trait]
    impl EmotionClassifier for FixedClassifier {
        fn name(&self) -> &str {
            "fixed"
        }

        fn modality(&self) -> Modality {
            self.0
        }

        async fn predict(&self, _input: &ModalityInput) -> Result<RawDistribution, ClassifierError> {
            Ok(raw_distribution([("neutral", 1.0)]))
        }
    }

    #[test]
    fn test_trait_defaults() {
        let classifier = FixedClassifier(Modality::Text);
        assert!(classifier.is_available());
        assert!(classifier.timeout().is_none());
    }

    #[test]
    fn test_set_registers_by_modality() {
        let set = ClassifierSet::new()
            .with(Arc::new(FixedClassifier(Modality::Face)))
            .with(Arc::new(FixedClassifier(Modality::Text)));

        assert!(set.get(Modality::Text).is_some());
        assert!(set.get(Modality::Audio).is_none());
        assert_eq!(set.get(Modality::Face).map(|c| c.modality()), Some(Modality::Face));
    }

    #[test]
    fn test_empty_config_yields_empty_set() {
        let set = ClassifierSet::from_config(&ClassifiersConfig::default()).unwrap();
        for modality in Modality::ALL {
            assert!(set.get(modality).is_none());
        }
    }

    #[test]
    fn test_input_kinds() {
        assert_eq!(ModalityInput::Text("hi".into()).kind(), "text");
        assert_eq!(ModalityInput::Image { bytes: vec![] }.kind(), "image");
        assert_eq!(ModalityInput::Scores(RawDistribution::new()).kind(), "scores");
    }
}
