// Recommendation Selector - Score Band + Dominant Emotion -> Advice
//
// Bands partition [0, 100]: [0,30) [30,55) [55,80) [80,100].
// Template choice within a band is uniform over an injected RNG, so a fixed
// seed reproduces the same message.

use super::{EngineError, EngineResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use wba_common::Emotion;

/// Returned instead of a banded recommendation when no modality produced a signal
pub const NO_SIGNAL_RECOMMENDATION: &str = "There isn't enough signal to read your mood right now. \
     Add a short note or a voice clip and check in again.";

const EMOTION_PLACEHOLDER: &str = "{emotion}";

const HIGH_STRESS: &[&str] = &[
    "Your stress levels seem high ({emotion}). Stop everything for 5 minutes. Close your eyes and breathe.",
    "It looks like you're struggling. A 10-minute walk outside can reduce cortisol by 20%. Please take a break.",
    "Productivity requires energy, and you're running on empty. Go drink a full glass of water and stretch.",
    "Detected high tension. Try the '4-7-8 Breathing Method': Inhale for 4s, hold for 7s, exhale for 8s.",
];

const TIRED_MODERATE: &[&str] = &[
    "You might be getting mentally tired. Switch to 'Passive Work' (emails, organizing) for the next 30 mins.",
    "Energy is dipping. A quick 15-minute power nap or a coffee break could reset your focus.",
    "I sense some {emotion}. Playing some lofi beats or instrumental music might help smooth the workflow.",
    "Don't push too hard. The Pomodoro technique (25m work / 5m break) is perfect for this energy level.",
];

const GOOD_FLOW: &[&str] = &[
    "Your energy is steady. It's a good time for routine tasks or organizing your day.",
    "You are in a stable mood. Try tackling that one task you've been putting off.",
    "Good balance. Maintain this rhythm by staying hydrated.",
    "Feeling {emotion} is okay. Channel it into steady progress.",
];

const PEAK_STATE: &[&str] = &[
    "You're in a great state! This is your 'Golden Hour'. Block distractions and do Deep Work.",
    "Excellent mood detected! Use this high energy to brainstorm creative solutions or solve complex problems.",
    "You are firing on all cylinders. Challenge yourself with the hardest item on your todo list right now.",
    "Peak performance detected! Keep riding this wave \u{1F30A}.",
];

/// Wellbeing score band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    /// [0, 30)
    HighStress,
    /// [30, 55)
    TiredModerate,
    /// [55, 80)
    GoodFlow,
    /// [80, 100]
    PeakState,
}

impl ScoreBand {
    /// Band containing `score`; first match wins, out-of-range (or NaN) is an error
    pub fn from_score(score: f64) -> EngineResult<Self> {
        if !(0.0..=100.0).contains(&score) {
            return Err(EngineError::ScoreOutOfRange(score));
        }

        Ok(if score < 30.0 {
            ScoreBand::HighStress
        } else if score < 55.0 {
            ScoreBand::TiredModerate
        } else if score < 80.0 {
            ScoreBand::GoodFlow
        } else {
            ScoreBand::PeakState
        })
    }

    /// Message templates owned by this band
    pub fn templates(self) -> &'static [&'static str] {
        match self {
            ScoreBand::HighStress => HIGH_STRESS,
            ScoreBand::TiredModerate => TIRED_MODERATE,
            ScoreBand::GoodFlow => GOOD_FLOW,
            ScoreBand::PeakState => PEAK_STATE,
        }
    }
}

/// Pick a recommendation using the caller's RNG
pub fn recommend_with_rng<R>(emotion: Emotion, score: f64, rng: &mut R) -> EngineResult<String>
where
    R: Rng + ?Sized,
{
    let templates = ScoreBand::from_score(score)?.templates();
    let template = templates[rng.gen_range(0..templates.len())];
    Ok(template.replace(EMOTION_PLACEHOLDER, emotion.as_str()))
}

/// Pick a recommendation; `Some(seed)` makes the choice reproducible
pub fn recommend(emotion: Emotion, score: f64, seed: Option<u64>) -> EngineResult<String> {
    match seed {
        Some(seed) => recommend_with_rng(emotion, score, &mut StdRng::seed_from_u64(seed)),
        None => recommend_with_rng(emotion, score, &mut rand::thread_rng()),
    }
}
