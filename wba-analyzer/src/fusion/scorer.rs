// Wellbeing Scorer - Fused Distribution -> 0..100 Score
//
// Linear: score = sum(fused[e] * base_score(e)), rounded to 2 decimals.
// The all-zero sentinel scores 0.0, which callers must read as "insufficient
// data" rather than "worst mood".

use wba_common::{Emotion, EmotionDistribution};

/// Points contributed by a label carrying the full probability mass
///
/// Exhaustive over the closed label set, so there is no fallback entry.
pub const fn base_score(emotion: Emotion) -> f64 {
    match emotion {
        Emotion::Happy => 100.0,
        Emotion::Neutral => 60.0,
        Emotion::Surprise => 60.0,
        Emotion::Sad => 20.0,
        Emotion::Angry => 10.0,
        Emotion::Fear => 10.0,
        Emotion::Disgust => 10.0,
    }
}

/// Wellbeing score for a fused distribution
pub fn score(fused: &EmotionDistribution) -> f64 {
    let raw: f64 = fused
        .iter()
        .map(|(emotion, probability)| probability * base_score(emotion))
        .sum();
    round2(raw)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
