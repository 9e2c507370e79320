// Fusion Module - Multi-Modal Emotion Fusion and Scoring
//
// Normalizer -> Fuser -> Scorer -> Recommender
// Every function here is pure and synchronous: no I/O, no shared state.

pub mod fuser;
pub mod normalizer;
pub mod recommender;
pub mod scorer;

use std::collections::HashMap;
use thiserror::Error;
use wba_common::Modality;

pub use fuser::{fuse, fuse_normalized};
pub use normalizer::{normalize, SynonymTable};
pub use recommender::{recommend, recommend_with_rng, ScoreBand, NO_SIGNAL_RECOMMENDATION};
pub use scorer::{base_score, score};

/// Classifier output before normalization: label -> score
///
/// Values are kept as JSON so that a non-numeric score is observable and can
/// be rejected instead of silently dropped during deserialization.
pub type RawDistribution = HashMap<String, serde_json::Value>;

/// Build a raw distribution from numeric (label, score) pairs
pub fn raw_distribution<I, K>(pairs: I) -> RawDistribution
where
    I: IntoIterator<Item = (K, f64)>,
    K: Into<String>,
{
    pairs
        .into_iter()
        .map(|(label, score)| (label.into(), serde_json::Value::from(score)))
        .collect()
}

/// Errors raised by the fusion engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// A raw distribution carried a value that is not a non-negative number
    #[error("Invalid {} input for label '{label}': {reason}", modality_name(.modality))]
    InvalidModalityInput {
        modality: Option<Modality>,
        label: String,
        reason: String,
    },

    /// Score passed to the recommender lies outside [0, 100]
    #[error("Score out of range [0, 100]: {0}")]
    ScoreOutOfRange(f64),
}

impl EngineError {
    /// Attach the modality the failing input came from
    pub fn for_modality(self, source: Modality) -> Self {
        match self {
            EngineError::InvalidModalityInput { label, reason, .. } => {
                EngineError::InvalidModalityInput {
                    modality: Some(source),
                    label,
                    reason,
                }
            }
            other => other,
        }
    }
}

fn modality_name(modality: &Option<Modality>) -> &'static str {
    modality.map(Modality::as_str).unwrap_or("modality")
}

pub type EngineResult<T> = Result<T, EngineError>;
