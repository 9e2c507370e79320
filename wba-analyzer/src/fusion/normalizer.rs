// Label Normalizer - Foreign Vocabulary -> Canonical Emotion Labels
//
// Classifiers emit their own label vocabularies ("joy", "hap", "Sadness", ...).
// Exact canonical labels are copied through; other keys go through the synonym
// table. Anything still unrecognized is dropped and never influences the score.

use super::{EngineError, EngineResult, RawDistribution};
use std::collections::HashMap;
use wba_common::{Emotion, EmotionDistribution};

/// Alias -> canonical label lookup, keyed case-insensitively
#[derive(Debug, Clone, PartialEq)]
pub struct SynonymTable {
    aliases: HashMap<String, Emotion>,
}

impl Default for SynonymTable {
    /// Built-in aliases for the text, speech and facial classifiers in common use
    fn default() -> Self {
        Self::empty()
            .with_synonym("joy", Emotion::Happy)
            .with_synonym("happiness", Emotion::Happy)
            .with_synonym("hap", Emotion::Happy)
            .with_synonym("sadness", Emotion::Sad)
            .with_synonym("anger", Emotion::Angry)
            .with_synonym("ang", Emotion::Angry)
            .with_synonym("fearful", Emotion::Fear)
            .with_synonym("disgusted", Emotion::Disgust)
            .with_synonym("surprised", Emotion::Surprise)
            .with_synonym("neu", Emotion::Neutral)
    }
}

impl SynonymTable {
    /// Table with no aliases (only exact canonical labels are recognized)
    pub fn empty() -> Self {
        Self {
            aliases: HashMap::new(),
        }
    }

    /// Add or replace an alias
    pub fn with_synonym(mut self, alias: impl AsRef<str>, emotion: Emotion) -> Self {
        self.insert(alias, emotion);
        self
    }

    pub fn insert(&mut self, alias: impl AsRef<str>, emotion: Emotion) {
        self.aliases
            .insert(alias.as_ref().trim().to_lowercase(), emotion);
    }

    /// Merge configured aliases over this table
    pub fn extend<I, K>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, Emotion)>,
        K: AsRef<str>,
    {
        for (alias, emotion) in entries {
            self.insert(alias, emotion);
        }
    }

    pub fn resolve(&self, label: &str) -> Option<Emotion> {
        self.aliases.get(&label.trim().to_lowercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

/// How a raw key was recognized; exact canonical keys outrank synonyms
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MatchKind {
    Synonym,
    Canonical,
}

/// Map a raw classifier output onto the 7 canonical labels
///
/// - keys are matched case-insensitively
/// - when several keys land on the same label, an exact canonical key wins over
///   a synonym, and within the same kind the larger value wins
/// - unknown keys are dropped
/// - every value must be a non-negative JSON number, otherwise `InvalidModalityInput`
///
/// No clamping or renormalization is applied.
pub fn normalize(raw: &RawDistribution, synonyms: &SynonymTable) -> EngineResult<EmotionDistribution> {
    let mut resolved: [Option<(MatchKind, f64)>; 7] = [None; 7];

    for (label, value) in raw {
        let value = value
            .as_f64()
            .ok_or_else(|| EngineError::InvalidModalityInput {
                modality: None,
                label: label.clone(),
                reason: format!("expected a number, got {}", value),
            })?;
        if value < 0.0 {
            return Err(EngineError::InvalidModalityInput {
                modality: None,
                label: label.clone(),
                reason: format!("negative score {}", value),
            });
        }

        let matched = match Emotion::from_label(label) {
            Some(emotion) => Some((emotion, MatchKind::Canonical)),
            None => synonyms
                .resolve(label)
                .map(|emotion| (emotion, MatchKind::Synonym)),
        };

        let Some((emotion, kind)) = matched else {
            continue;
        };

        let slot = &mut resolved[emotion as usize];
        *slot = match *slot {
            Some((held_kind, held_value))
                if held_kind > kind || (held_kind == kind && held_value >= value) =>
            {
                Some((held_kind, held_value))
            }
            _ => Some((kind, value)),
        };
    }

    Ok(EmotionDistribution::from_pairs(Emotion::ALL.into_iter().filter_map(
        |emotion| resolved[emotion as usize].map(|(_, value)| (emotion, value)),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::raw_distribution;
    use serde_json::json;

    fn to_raw(dist: &EmotionDistribution) -> RawDistribution {
        raw_distribution(dist.iter().map(|(e, v)| (e.as_str(), v)))
    }

    #[test]
    fn test_negative_score_is_rejected() {
        for raw in [
            raw_distribution([("happy", -0.5), ("neutral", 0.5)]),
            // Unknown keys are validated too
            raw_distribution([("excited", -0.1), ("happy", 1.0)]),
        ] {
            let err = normalize(&raw, &SynonymTable::default()).unwrap_err();
            assert!(
                matches!(&err, EngineError::InvalidModalityInput { reason, .. } if reason.contains("negative score")),
                "unexpected error: {:?}",
                err
            );
        }
    }

    #[test]
    fn test_zero_scores_are_accepted() {
        let raw = raw_distribution([("happy", 0.0), ("neutral", 1.0)]);
        let dist = normalize(&raw, &SynonymTable::default()).unwrap();
        assert_eq!(dist.get(Emotion::Neutral), 1.0);
    }

    #[test]
    fn test_empty_input_yields_zero_distribution() {
        let dist = normalize(&RawDistribution::new(), &SynonymTable::default()).unwrap();
        assert!(dist.is_zero());
    }

    #[test]
    fn test_synonyms_map_to_canonical_labels() {
        let raw = raw_distribution([("joy", 0.9), ("sadness", 0.1)]);
        let dist = normalize(&raw, &SynonymTable::default()).unwrap();

        assert_eq!(dist.get(Emotion::Happy), 0.9);
        assert_eq!(dist.get(Emotion::Sad), 0.1);
        assert_eq!(dist.get(Emotion::Neutral), 0.0);
    }

    #[test]
    fn test_speech_model_abbreviations() {
        let raw = raw_distribution([("neu", 0.5), ("hap", 0.3), ("ang", 0.15), ("sad", 0.05)]);
        let dist = normalize(&raw, &SynonymTable::default()).unwrap();

        assert_eq!(dist.get(Emotion::Neutral), 0.5);
        assert_eq!(dist.get(Emotion::Happy), 0.3);
        assert_eq!(dist.get(Emotion::Angry), 0.15);
        assert_eq!(dist.get(Emotion::Sad), 0.05);
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let raw = raw_distribution([("JOY", 0.6), ("Neutral", 0.4)]);
        let dist = normalize(&raw, &SynonymTable::default()).unwrap();

        assert_eq!(dist.get(Emotion::Happy), 0.6);
        assert_eq!(dist.get(Emotion::Neutral), 0.4);
    }

    #[test]
    fn test_unknown_labels_are_dropped() {
        let raw = raw_distribution([("excited", 0.7), ("happy", 0.3)]);
        let dist = normalize(&raw, &SynonymTable::default()).unwrap();

        assert_eq!(dist.get(Emotion::Happy), 0.3);
        assert!((dist.total() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_canonical_key_wins_over_synonym() {
        let raw = raw_distribution([("joy", 0.8), ("happy", 0.2)]);
        let dist = normalize(&raw, &SynonymTable::default()).unwrap();
        assert_eq!(dist.get(Emotion::Happy), 0.2);
    }

    #[test]
    fn test_same_kind_collision_keeps_larger_value() {
        let raw = raw_distribution([("joy", 0.4), ("hap", 0.6)]);
        let dist = normalize(&raw, &SynonymTable::default()).unwrap();
        assert_eq!(dist.get(Emotion::Happy), 0.6);

        let raw = raw_distribution([("Happy", 0.1), ("HAPPY", 0.7)]);
        let dist = normalize(&raw, &SynonymTable::default()).unwrap();
        assert_eq!(dist.get(Emotion::Happy), 0.7);
    }

    #[test]
    fn test_non_numeric_value_is_rejected() {
        let mut raw = raw_distribution([("happy", 0.5)]);
        raw.insert("sad".to_string(), json!("high"));

        let err = normalize(&raw, &SynonymTable::default()).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidModalityInput { ref label, modality: None, .. } if label == "sad"
        ));
    }

    #[test]
    fn test_error_payload_under_unknown_key_is_rejected() {
        let mut raw = RawDistribution::new();
        raw.insert("error".to_string(), json!("Model not loaded"));
        assert!(normalize(&raw, &SynonymTable::default()).is_err());
    }

    #[test]
    fn test_values_are_not_clamped_or_renormalized() {
        let raw = raw_distribution([("happy", 2.0), ("sad", 0.5)]);
        let dist = normalize(&raw, &SynonymTable::default()).unwrap();
        assert_eq!(dist.get(Emotion::Happy), 2.0);
        assert_eq!(dist.total(), 2.5);
    }

    #[test]
    fn test_idempotent_on_canonical_output() {
        let raw = raw_distribution([
            ("joy", 0.35),
            ("fear", 0.25),
            ("surprised", 0.2),
            ("boredom", 0.1),
            ("neutral", 0.1),
        ]);
        let synonyms = SynonymTable::default();

        let once = normalize(&raw, &synonyms).unwrap();
        let twice = normalize(&to_raw(&once), &synonyms).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_table_is_extensible() {
        let mut synonyms = SynonymTable::default();
        synonyms.extend([("Cheerful", Emotion::Happy), ("scared", Emotion::Fear)]);

        let raw = raw_distribution([("cheerful", 0.7), ("SCARED", 0.3)]);
        let dist = normalize(&raw, &synonyms).unwrap();
        assert_eq!(dist.get(Emotion::Happy), 0.7);
        assert_eq!(dist.get(Emotion::Fear), 0.3);
    }

    #[test]
    fn test_empty_table_only_accepts_canonical_labels() {
        let synonyms = SynonymTable::empty();
        assert!(synonyms.is_empty());

        let raw = raw_distribution([("joy", 0.9), ("sad", 0.1)]);
        let dist = normalize(&raw, &synonyms).unwrap();
        assert_eq!(dist.get(Emotion::Happy), 0.0);
        assert_eq!(dist.get(Emotion::Sad), 0.1);
    }

    #[test]
    fn test_synonym_cannot_redirect_canonical_label() {
        let synonyms = SynonymTable::default().with_synonym("sad", Emotion::Happy);
        let raw = raw_distribution([("sad", 1.0)]);
        let dist = normalize(&raw, &synonyms).unwrap();
        assert_eq!(dist.get(Emotion::Sad), 1.0);
        assert_eq!(dist.get(Emotion::Happy), 0.0);
    }
}
