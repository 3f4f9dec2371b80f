//! Subjective calibration of the aerobic/anaerobic split
//!
//! Post-effort answers about breathing, muscle strain and perceived exertion
//! are folded into a normalised score that sets the anaerobic baseline. The
//! first calibration replaces the profile value outright; later ones blend
//! toward the new target.

use crate::coefficients::QuestionnaireCoefficients;
use crate::energy_system::EnergySystemModel;
use crate::error::{Result, StaminaError};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use tracing::info;

pub const BREATH_SCALE: RangeInclusive<i32> = 1..=5;
pub const MUSCLE_SCALE: RangeInclusive<i32> = 1..=5;
/// Borg CR10 perceived exertion
pub const RPE_SCALE: RangeInclusive<i32> = 0..=10;

/// One set of questionnaire answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionnaireAnswers {
    /// Replace the baseline instead of blending toward it
    pub first_time: bool,
    /// Breathlessness, 1 (easy) to 5 (gasping)
    pub breath: i32,
    /// Muscle strain, 1 (fresh) to 5 (burning)
    pub muscle: i32,
    /// Rating of perceived exertion, 0 to 10
    pub rpe: i32,
}

impl QuestionnaireAnswers {
    pub fn validate(&self) -> Result<()> {
        check("breath", self.breath, BREATH_SCALE)?;
        check("muscle", self.muscle, MUSCLE_SCALE)?;
        check("rpe", self.rpe, RPE_SCALE)
    }

    /// Weighted score in [0,1]
    pub fn score(&self, coefficients: &QuestionnaireCoefficients) -> f64 {
        let weights = coefficients.breath_weight + coefficients.muscle_weight + coefficients.rpe_weight;
        if weights <= 0.0 {
            return 0.0;
        }
        let weighted = coefficients.breath_weight * normalise(self.breath, BREATH_SCALE)
            + coefficients.muscle_weight * normalise(self.muscle, MUSCLE_SCALE)
            + coefficients.rpe_weight * normalise(self.rpe, RPE_SCALE);
        (weighted / weights).clamp(0.0, 1.0)
    }
}

fn check(question: &str, value: i32, scale: RangeInclusive<i32>) -> Result<()> {
    if scale.contains(&value) {
        Ok(())
    } else {
        Err(StaminaError::InvalidAnswer {
            question: question.to_string(),
            value,
        })
    }
}

fn normalise(value: i32, scale: RangeInclusive<i32>) -> f64 {
    let (low, high) = (*scale.start() as f64, *scale.end() as f64);
    (value as f64 - low) / (high - low)
}

/// Effect of one calibration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationOutcome {
    pub score: f64,
    pub previous_baseline: f64,
    pub anaerobic_baseline: f64,
    pub anaerobic_fraction: f64,
}

pub struct QuestionnaireCalibrator;

impl QuestionnaireCalibrator {
    /// Apply answers to the energy system's split
    ///
    /// Invalid answers are rejected before anything changes.
    pub fn calibrate(
        answers: &QuestionnaireAnswers,
        system: &mut EnergySystemModel,
        coefficients: &QuestionnaireCoefficients,
    ) -> Result<CalibrationOutcome> {
        answers.validate()?;

        let score = answers.score(coefficients);
        let target = score * coefficients.max_anaerobic_split;
        let previous_baseline = system.anaerobic_baseline();
        let baseline = if answers.first_time {
            target
        } else {
            previous_baseline + coefficients.blend_rate * (target - previous_baseline)
        };
        system.shift_anaerobic_baseline(baseline);

        info!(
            score,
            previous_baseline,
            baseline = system.anaerobic_baseline(),
            first_time = answers.first_time,
            "Questionnaire calibration applied"
        );

        Ok(CalibrationOutcome {
            score,
            previous_baseline,
            anaerobic_baseline: system.anaerobic_baseline(),
            anaerobic_fraction: system.anaerobic_fraction(),
        })
    }
}
