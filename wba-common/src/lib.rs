//! # Wellbeing Assistant Common Library
//!
//! Shared code for the wellbeing assistant services including:
//! - Canonical emotion labels and distributions
//! - Modality identifiers
//! - Configuration loading and root folder resolution
//! - Common error types
//! - Time helpers

pub mod config;
pub mod emotion;
pub mod error;
pub mod time;

pub use emotion::{Emotion, EmotionDistribution, Modality, ModalityWeights};
pub use error::{Error, Result};
