//! Canonical emotion labels, emotion distributions and input modalities
//!
//! The label set is closed: every distribution carries exactly one value per
//! canonical label, in the fixed order given by [`Emotion::ALL`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Canonical emotion label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happy,
    Sad,
    Angry,
    Fear,
    Disgust,
    Surprise,
    Neutral,
}

impl Emotion {
    /// All labels in canonical order. Tie-breaks on dominant emotion follow this order.
    pub const ALL: [Emotion; 7] = [
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Angry,
        Emotion::Fear,
        Emotion::Disgust,
        Emotion::Surprise,
        Emotion::Neutral,
    ];

    /// Lowercase wire name
    pub const fn as_str(self) -> &'static str {
        match self {
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Angry => "angry",
            Emotion::Fear => "fear",
            Emotion::Disgust => "disgust",
            Emotion::Surprise => "surprise",
            Emotion::Neutral => "neutral",
        }
    }

    /// Match a canonical label case-insensitively (no synonym resolution)
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|e| e.as_str().eq_ignore_ascii_case(label.trim()))
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown emotion label: {}", s)))
    }
}

/// One value per canonical label
///
/// Serializes as a JSON object keyed by label. Values are not required to sum
/// to 1; the all-zero distribution is the "no signal" sentinel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionDistribution {
    pub happy: f64,
    pub sad: f64,
    pub angry: f64,
    pub fear: f64,
    pub disgust: f64,
    pub surprise: f64,
    pub neutral: f64,
}

impl EmotionDistribution {
    /// The all-zero "no signal" distribution
    pub const fn zero() -> Self {
        Self {
            happy: 0.0,
            sad: 0.0,
            angry: 0.0,
            fear: 0.0,
            disgust: 0.0,
            surprise: 0.0,
            neutral: 0.0,
        }
    }

    /// Distribution with all mass on a single label
    pub fn single(emotion: Emotion) -> Self {
        Self::zero().with(emotion, 1.0)
    }

    /// Build from (label, value) pairs; unspecified labels are zero, later pairs overwrite earlier ones
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Emotion, f64)>,
    {
        pairs
            .into_iter()
            .fold(Self::zero(), |dist, (emotion, value)| dist.with(emotion, value))
    }

    /// Copy of this distribution with one label replaced
    pub fn with(mut self, emotion: Emotion, value: f64) -> Self {
        *self.slot_mut(emotion) = value;
        self
    }

    pub fn get(&self, emotion: Emotion) -> f64 {
        match emotion {
            Emotion::Happy => self.happy,
            Emotion::Sad => self.sad,
            Emotion::Angry => self.angry,
            Emotion::Fear => self.fear,
            Emotion::Disgust => self.disgust,
            Emotion::Surprise => self.surprise,
            Emotion::Neutral => self.neutral,
        }
    }

    fn slot_mut(&mut self, emotion: Emotion) -> &mut f64 {
        match emotion {
            Emotion::Happy => &mut self.happy,
            Emotion::Sad => &mut self.sad,
            Emotion::Angry => &mut self.angry,
            Emotion::Fear => &mut self.fear,
            Emotion::Disgust => &mut self.disgust,
            Emotion::Surprise => &mut self.surprise,
            Emotion::Neutral => &mut self.neutral,
        }
    }

    /// (label, value) pairs in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (Emotion, f64)> + '_ {
        Emotion::ALL.into_iter().map(move |e| (e, self.get(e)))
    }

    /// Sum of all values
    pub fn total(&self) -> f64 {
        self.iter().map(|(_, v)| v).sum()
    }

    /// True for the "no signal" sentinel
    pub fn is_zero(&self) -> bool {
        self.iter().all(|(_, v)| v == 0.0)
    }

    /// Label with the highest value
    ///
    /// Ties go to the label that comes first in [`Emotion::ALL`]. Returns `None`
    /// for the all-zero sentinel, which has no dominant emotion.
    pub fn dominant(&self) -> Option<Emotion> {
        if self.is_zero() {
            return None;
        }

        let mut best: Option<(Emotion, f64)> = None;
        for (emotion, value) in self.iter() {
            match best {
                Some((_, best_value)) if value <= best_value => {}
                _ => best = Some((emotion, value)),
            }
        }
        best.map(|(emotion, _)| emotion)
    }
}

/// Independent input channel analyzed by its own classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Audio,
    Face,
}

impl Modality {
    pub const ALL: [Modality; 3] = [Modality::Text, Modality::Audio, Modality::Face];

    pub const fn as_str(self) -> &'static str {
        match self {
            Modality::Text => "text",
            Modality::Audio => "audio",
            Modality::Face => "face",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-modality fusion weights
///
/// Weights need not sum to 1; only the weights of modalities that are present
/// in a given analysis enter the fusion denominator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModalityWeights {
    pub text: f64,
    pub audio: f64,
    pub face: f64,
}

impl Default for ModalityWeights {
    fn default() -> Self {
        Self {
            text: 0.33,
            audio: 0.33,
            face: 0.34,
        }
    }
}

impl ModalityWeights {
    pub fn get(&self, modality: Modality) -> f64 {
        match modality {
            Modality::Text => self.text,
            Modality::Audio => self.audio,
            Modality::Face => self.face,
        }
    }

    /// Reject negative or non-finite weights
    pub fn validate(&self) -> crate::Result<()> {
        for modality in Modality::ALL {
            let weight = self.get(modality);
            if !weight.is_finite() || weight < 0.0 {
                return Err(Error::InvalidInput(format!(
                    "Weight for {} must be a non-negative number, got {}",
                    modality, weight
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_order() {
        let names: Vec<&str> = Emotion::ALL.iter().map(|e| e.as_str()).collect();
        assert_eq!(
            names,
            vec!["happy", "sad", "angry", "fear", "disgust", "surprise", "neutral"]
        );
    }

    #[test]
    fn test_from_label_is_case_insensitive() {
        assert_eq!(Emotion::from_label("HAPPY"), Some(Emotion::Happy));
        assert_eq!(Emotion::from_label("Neutral"), Some(Emotion::Neutral));
        assert_eq!(Emotion::from_label("joy"), None);
        assert!("excited".parse::<Emotion>().is_err());
    }

    #[test]
    fn test_zero_has_no_dominant() {
        let dist = EmotionDistribution::zero();
        assert!(dist.is_zero());
        assert_eq!(dist.total(), 0.0);
        assert_eq!(dist.dominant(), None);
    }

    #[test]
    fn test_dominant_picks_maximum() {
        let dist = EmotionDistribution::from_pairs([
            (Emotion::Sad, 0.2),
            (Emotion::Fear, 0.5),
            (Emotion::Neutral, 0.3),
        ]);
        assert_eq!(dist.dominant(), Some(Emotion::Fear));
    }

    #[test]
    fn test_dominant_tie_goes_to_canonical_order() {
        let dist = EmotionDistribution::from_pairs([
            (Emotion::Neutral, 0.5),
            (Emotion::Sad, 0.5),
        ]);
        assert_eq!(dist.dominant(), Some(Emotion::Sad));

        let uniform = EmotionDistribution::from_pairs(Emotion::ALL.map(|e| (e, 1.0 / 7.0)));
        assert_eq!(uniform.dominant(), Some(Emotion::Happy));
    }

    #[test]
    fn test_serializes_keyed_by_label() {
        let dist = EmotionDistribution::single(Emotion::Surprise);
        let json = serde_json::to_value(dist).unwrap();
        assert_eq!(json["surprise"], 1.0);
        assert_eq!(json["happy"], 0.0);
        assert_eq!(json.as_object().unwrap().len(), 7);
    }

    #[test]
    fn test_deserialize_fills_missing_labels() {
        let dist: EmotionDistribution = serde_json::from_str(r#"{"happy": 0.4}"#).unwrap();
        assert_eq!(dist.get(Emotion::Happy), 0.4);
        assert_eq!(dist.get(Emotion::Disgust), 0.0);
    }

    #[test]
    fn test_default_weights() {
        let weights = ModalityWeights::default();
        assert_eq!(weights.get(Modality::Text), 0.33);
        assert_eq!(weights.get(Modality::Audio), 0.33);
        assert_eq!(weights.get(Modality::Face), 0.34);
        assert!(weights.validate().is_ok());
    }

    #[test]
    fn test_weights_reject_negative_and_nan() {
        let negative = ModalityWeights { audio: -0.1, ..Default::default() };
        assert!(matches!(negative.validate(), Err(Error::InvalidInput(_))));

        let nan = ModalityWeights { face: f64::NAN, ..Default::default() };
        assert!(nan.validate().is_err());

        let zero = ModalityWeights { text: 0.0, audio: 0.0, face: 0.0 };
        assert!(zero.validate().is_ok());
    }

    #[test]
    fn test_modality_names() {
        assert_eq!(Modality::Face.to_string(), "face");
        let parsed: Modality = serde_json::from_str("\"audio\"").unwrap();
        assert_eq!(parsed, Modality::Audio);
    }
}
