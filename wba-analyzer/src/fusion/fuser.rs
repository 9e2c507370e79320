// Fusion Engine - Presence-Aware Weighted Averaging
//
// Only present modalities enter the denominator, so a missing modality never
// drags the fused probabilities toward zero or toward a phantom reading.
// No present weight at all yields the all-zero "no signal" sentinel.

use super::normalizer::{normalize, SynonymTable};
use super::{EngineResult, RawDistribution};
use wba_common::{Emotion, EmotionDistribution, Modality, ModalityWeights};

/// Fuse already-normalized distributions
///
/// Each modality should appear at most once in `present`. The result is
/// `sum(weight_m * dist_m) / sum(weight_m)` over the present modalities, or the
/// all-zero distribution when that weight sum is zero.
pub fn fuse_normalized(
    present: &[(Modality, EmotionDistribution)],
    weights: &ModalityWeights,
) -> EmotionDistribution {
    // Weights are rescaled by the largest present weight so huge finite
    // weights cannot overflow the denominator
    let max_weight = present
        .iter()
        .map(|(modality, _)| weights.get(*modality))
        .fold(0.0_f64, f64::max);
    if max_weight <= 0.0 {
        return EmotionDistribution::zero();
    }

    let effective_total_weight: f64 = present
        .iter()
        .map(|(modality, _)| weights.get(*modality) / max_weight)
        .sum();

    // Share first, then scale: a lone modality gets share 1.0 exactly and is reproduced bit for bit
    present
        .iter()
        .fold(EmotionDistribution::zero(), |fused, (modality, dist)| {
            let share = weights.get(*modality) / max_weight / effective_total_weight;
            if share == 0.0 {
                return fused;
            }
            Emotion::ALL.into_iter().fold(fused, |acc, emotion| {
                acc.with(emotion, acc.get(emotion) + share * dist.get(emotion))
            })
        })
}

/// Normalize and fuse up to three raw classifier outputs
///
/// A modality is present when it is `Some` and non-empty; an empty map (e.g.
/// "no face detected") counts as absent rather than as a distribution of zeros.
/// `weights` defaults to `{text: 0.33, audio: 0.33, face: 0.34}`.
pub fn fuse(
    text: Option<&RawDistribution>,
    audio: Option<&RawDistribution>,
    face: Option<&RawDistribution>,
    weights: Option<&ModalityWeights>,
    synonyms: &SynonymTable,
) -> EngineResult<EmotionDistribution> {
    let weights = weights.copied().unwrap_or_default();

    let mut present = Vec::with_capacity(3);
    for (modality, raw) in [
        (Modality::Text, text),
        (Modality::Audio, audio),
        (Modality::Face, face),
    ] {
        let Some(raw) = raw.filter(|raw| !raw.is_empty()) else {
            continue;
        };
        let dist = normalize(raw, synonyms).map_err(|e| e.for_modality(modality))?;
        present.push((modality, dist));
    }

    Ok(fuse_normalized(&present, &weights))
}
