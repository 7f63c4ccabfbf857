//! Verdict from the model's scalar output

use serde::{Deserialize, Serialize};

use super::PredictionError;

/// Probabilities strictly above this are classified as cancer
pub const CANCER_THRESHOLD: f32 = 0.5;

pub const CANCER_SUGGESTION: &str = "Segera periksa ke dokter!";
pub const NON_CANCER_SUGGESTION: &str = "Anda sehat!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Diagnosis {
    Cancer,
    NonCancer,
}

impl Diagnosis {
    pub fn suggestion(&self) -> &'static str {
        match self {
            Diagnosis::Cancer => CANCER_SUGGESTION,
            Diagnosis::NonCancer => NON_CANCER_SUGGESTION,
        }
    }
}

/// Outcome of one classification
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub probability: f32,
    pub diagnosis: Diagnosis,
}

impl Verdict {
    /// Threshold the probability. Exactly 0.5 is `NonCancer`.
    pub fn from_probability(probability: f32) -> Result<Self, PredictionError> {
        if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
            return Err(PredictionError::ProbabilityOutOfRange(probability));
        }

        let diagnosis = if probability > CANCER_THRESHOLD {
            Diagnosis::Cancer
        } else {
            Diagnosis::NonCancer
        };

        Ok(Self { probability, diagnosis })
    }

    pub fn suggestion(&self) -> &'static str {
        self.diagnosis.suggestion()
    }
}
