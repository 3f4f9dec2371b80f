//! Pluggable physiology coefficient table
//!
//! Every empirical constant used by the ingest, expenditure, kinetics and
//! prediction layers lives here so the state machine logic stays independent
//! of the exact curves chosen. The table is serde-serialisable and can be
//! loaded from TOML through [`crate::config::EngineConfig`].
//!
//! # Groups
//!
//! - **ingest**: heart rate quality gating and R-R artifact filtering
//! - **expenditure**: workload physics, efficiency and BMR
//! - **kinetics**: stamina, capacity, split and lactate rates
//! - **prediction**: solver budgets and projection horizons
//! - **questionnaire**: subjective answer weights

use crate::error::{Result, StaminaError};
use crate::models::{ExerciseType, SportType};
use serde::{Deserialize, Serialize};

/// Complete coefficient table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysiologyCoefficients {
    pub ingest: IngestCoefficients,
    pub expenditure: ExpenditureCoefficients,
    pub kinetics: KineticsCoefficients,
    pub prediction: PredictionCoefficients,
    pub questionnaire: QuestionnaireCoefficients,
}

impl PhysiologyCoefficients {
    /// Check that every coefficient is usable by the integrators and solvers
    pub fn validate(&self) -> Result<()> {
        self.ingest.validate()?;
        self.expenditure.validate()?;
        self.kinetics.validate()?;
        self.prediction.validate()?;
        self.questionnaire.validate()
    }
}

fn ensure(condition: bool, message: &str) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(StaminaError::Configuration(message.to_string()))
    }
}

/// Heart rate gating and R-R filtering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestCoefficients {
    /// Minimum device quality flag for a sample to drive intensity
    pub min_heart_rate_quality: u8,
    /// Plausible heart rate range in bpm
    pub min_valid_hr: u16,
    pub max_valid_hr: u16,
    /// Trailing R-R buffer length in beats
    pub rr_buffer_len: usize,
    /// Buffered beats required before R-R replaces the point sample
    pub rr_min_beats: usize,
    /// Max relative deviation from the buffer median before a beat is an artifact
    pub rr_artifact_tolerance: f64,
    /// Age in seconds after which buffered R-R beats are discarded
    pub rr_stale_secs: i64,
    /// Consecutive rejected beats that reset the buffer around the new rhythm
    pub rr_max_consecutive_artifacts: usize,
    /// Max heart rate offsets per sport, relative to running
    pub max_hr_offsets: MaxHrOffsets,
}

impl Default for IngestCoefficients {
    fn default() -> Self {
        Self {
            min_heart_rate_quality: 2,
            min_valid_hr: 20,
            max_valid_hr: 250,
            rr_buffer_len: 32,
            rr_min_beats: 3,
            rr_artifact_tolerance: 0.20,
            rr_stale_secs: 10,
            rr_max_consecutive_artifacts: 3,
            max_hr_offsets: MaxHrOffsets::default(),
        }
    }
}

impl IngestCoefficients {
    fn validate(&self) -> Result<()> {
        ensure(
            self.min_valid_hr < self.max_valid_hr,
            "min_valid_hr must be below max_valid_hr",
        )?;
        ensure(self.rr_buffer_len >= 2, "rr_buffer_len must be at least 2")?;
        ensure(
            self.rr_min_beats >= 1 && self.rr_min_beats <= self.rr_buffer_len,
            "rr_min_beats must be within 1..=rr_buffer_len",
        )?;
        ensure(
            self.rr_artifact_tolerance > 0.0 && self.rr_artifact_tolerance < 1.0,
            "rr_artifact_tolerance must be in (0, 1)",
        )?;
        ensure(self.rr_stale_secs > 0, "rr_stale_secs must be positive")?;
        ensure(
            self.rr_max_consecutive_artifacts >= 1,
            "rr_max_consecutive_artifacts must be at least 1",
        )
    }
}

/// Sport-specific max heart rate offsets in bpm relative to running
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaxHrOffsets {
    pub running: f64,
    pub cycling: f64,
    pub swimming: f64,
    pub other: f64,
}

impl Default for MaxHrOffsets {
    fn default() -> Self {
        Self {
            running: 0.0,
            cycling: -5.0,
            swimming: -10.0,
            other: -3.0,
        }
    }
}

impl MaxHrOffsets {
    pub fn offset(&self, sport: SportType) -> f64 {
        match sport {
            SportType::Running => self.running,
            SportType::Cycling => self.cycling,
            SportType::Swimming => self.swimming,
            SportType::Other => self.other,
        }
    }
}

/// BMR estimation equation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BmrFormula {
    /// Mifflin-St Jeor (weight, height, age, gender)
    MifflinStJeor,
    /// Katch-McArdle (lean body mass from body fat fraction)
    KatchMcArdle,
}

/// Workload physics for one exercise type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseProfile {
    /// Locomotion cost as a fraction of body weight force (rolling resistance for bikes)
    pub locomotion_coefficient: f64,
    /// Aerodynamic drag coefficient
    pub drag_coefficient: f64,
    /// Frontal area used when the sample reports none (m²)
    pub default_front_area_m2: f64,
    /// Equipment mass moved with the athlete (kg)
    pub equipment_mass_kg: f64,
    /// Speed treated as 100 % HRR when no personal pace fit exists (km/h)
    pub default_max_speed_kmph: f64,
}

/// Per exercise type workload physics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExerciseTable {
    pub run: ExerciseProfile,
    pub walk: ExerciseProfile,
    pub bike: ExerciseProfile,
    pub other: ExerciseProfile,
}

impl Default for ExerciseTable {
    fn default() -> Self {
        Self {
            run: ExerciseProfile {
                locomotion_coefficient: 0.099,
                drag_coefficient: 0.9,
                default_front_area_m2: 0.45,
                equipment_mass_kg: 0.5,
                default_max_speed_kmph: 20.0,
            },
            walk: ExerciseProfile {
                locomotion_coefficient: 0.045,
                drag_coefficient: 0.9,
                default_front_area_m2: 0.45,
                equipment_mass_kg: 0.5,
                default_max_speed_kmph: 8.0,
            },
            bike: ExerciseProfile {
                locomotion_coefficient: 0.004,
                drag_coefficient: 0.88,
                default_front_area_m2: 0.40,
                equipment_mass_kg: 9.0,
                default_max_speed_kmph: 45.0,
            },
            other: ExerciseProfile {
                locomotion_coefficient: 0.05,
                drag_coefficient: 0.9,
                default_front_area_m2: 0.45,
                equipment_mass_kg: 0.0,
                default_max_speed_kmph: 15.0,
            },
        }
    }
}

impl ExerciseTable {
    pub fn get(&self, exercise: ExerciseType) -> &ExerciseProfile {
        match exercise {
            ExerciseType::Run => &self.run,
            ExerciseType::Walk => &self.walk,
            ExerciseType::Bike => &self.bike,
            ExerciseType::Other => &self.other,
        }
    }

    fn profiles(&self) -> [&ExerciseProfile; 4] {
        [&self.run, &self.walk, &self.bike, &self.other]
    }
}

/// Calorie accounting coefficients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpenditureCoefficients {
    pub exercise: ExerciseTable,
    pub bmr_formula: BmrFormula,
    /// Gross mechanical efficiency at the reference muscle fraction
    pub base_efficiency: f64,
    /// Efficiency change per unit of muscle fraction above the reference
    pub muscle_efficiency_gain: f64,
    pub reference_muscle_fraction: f64,
    pub min_efficiency: f64,
    pub max_efficiency: f64,
    /// Resting oxygen uptake (ml/kg/min)
    pub vo2_rest: f64,
    pub kcal_per_litre_o2: f64,
    /// Activity workload older than this falls back to heart rate
    pub workload_stale_secs: i64,
    /// Longest interval integrated at the held exercise rate
    pub max_integration_gap_secs: i64,
}

impl Default for ExpenditureCoefficients {
    fn default() -> Self {
        Self {
            exercise: ExerciseTable::default(),
            bmr_formula: BmrFormula::MifflinStJeor,
            base_efficiency: 0.22,
            muscle_efficiency_gain: 0.10,
            reference_muscle_fraction: 0.40,
            min_efficiency: 0.15,
            max_efficiency: 0.30,
            vo2_rest: 3.5,
            kcal_per_litre_o2: 5.0,
            workload_stale_secs: 10,
            max_integration_gap_secs: 60,
        }
    }
}

impl ExpenditureCoefficients {
    fn validate(&self) -> Result<()> {
        ensure(
            self.min_efficiency > 0.0 && self.min_efficiency <= self.max_efficiency,
            "efficiency bounds must satisfy 0 < min <= max",
        )?;
        ensure(self.max_efficiency <= 1.0, "max_efficiency must be <= 1")?;
        ensure(self.vo2_rest > 0.0, "vo2_rest must be positive")?;
        ensure(self.kcal_per_litre_o2 > 0.0, "kcal_per_litre_o2 must be positive")?;
        ensure(
            self.workload_stale_secs >= 0 && self.max_integration_gap_secs > 0,
            "staleness and gap limits must be non-negative",
        )?;
        for profile in self.exercise.profiles() {
            ensure(
                profile.locomotion_coefficient >= 0.0
                    && profile.drag_coefficient >= 0.0
                    && profile.default_front_area_m2 >= 0.0
                    && profile.equipment_mass_kg >= 0.0,
                "exercise coefficients must be non-negative",
            )?;
            ensure(
                profile.default_max_speed_kmph > 0.0,
                "default_max_speed_kmph must be positive",
            )?;
        }
        Ok(())
    }
}

/// Depletion and recovery kinetics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KineticsCoefficients {
    /// Recovery ceiling as a fraction of the current aerobic threshold
    pub recovery_ratio: f64,
    /// Stamina regained per hour at complete rest
    pub recovery_per_hour: f64,
    /// Stamina drained per hour at the aerobic threshold
    pub aerobic_drain_per_hour: f64,
    /// Additional stamina drained per hour at 100 % HRR overdraft
    pub overdraft_drain_per_hour: f64,
    /// Curvature of the overdraft drain
    pub overdraft_exponent: f64,
    /// Fraction of aerobic capacity lost when stamina reaches zero
    pub capacity_decay: f64,
    /// Time constant for base capacity regeneration while recovering
    pub capacity_recovery_tau_secs: f64,
    /// Time constant of the aerobic/anaerobic split response
    pub split_tau_secs: f64,
    /// Resting blood lactate (mmol/L)
    pub lactate_baseline: f64,
    pub lactate_max: f64,
    /// Lactate produced per minute at 100 % HRR overdraft (mmol/L/min)
    pub lactate_accumulation_per_min: f64,
    /// First-order lactate clearance rate at dilution grade 0 (1/min)
    pub lactate_clearance_per_min: f64,
    /// Relative clearance gain per dilution grade
    pub clearance_grade_step: f64,
    /// Highest lactate dilution grade
    pub max_dilution_grade: u8,
    /// Accumulated lactate before the live dilution grade is derived (mmol/L)
    pub dilution_epsilon: f64,
    /// Longest internal integration step
    pub max_step_secs: f64,
}

impl Default for KineticsCoefficients {
    fn default() -> Self {
        Self {
            recovery_ratio: 0.75,
            recovery_per_hour: 0.30,
            aerobic_drain_per_hour: 0.01,
            overdraft_drain_per_hour: 2.0,
            overdraft_exponent: 1.5,
            capacity_decay: 0.35,
            capacity_recovery_tau_secs: 900.0,
            split_tau_secs: 20.0,
            lactate_baseline: 1.0,
            lactate_max: 25.0,
            lactate_accumulation_per_min: 1.0,
            lactate_clearance_per_min: 0.06,
            clearance_grade_step: 0.15,
            max_dilution_grade: 5,
            dilution_epsilon: 0.5,
            max_step_secs: 5.0,
        }
    }
}

impl KineticsCoefficients {
    fn validate(&self) -> Result<()> {
        ensure(
            self.recovery_ratio > 0.0 && self.recovery_ratio < 1.0,
            "recovery_ratio must be in (0, 1)",
        )?;
        ensure(
            self.recovery_per_hour >= 0.0
                && self.aerobic_drain_per_hour >= 0.0
                && self.overdraft_drain_per_hour >= 0.0,
            "stamina rates must be non-negative",
        )?;
        ensure(self.overdraft_exponent > 0.0, "overdraft_exponent must be positive")?;
        ensure(
            (0.0..1.0).contains(&self.capacity_decay),
            "capacity_decay must be in [0, 1)",
        )?;
        ensure(
            self.capacity_recovery_tau_secs > 0.0 && self.split_tau_secs > 0.0,
            "time constants must be positive",
        )?;
        ensure(
            self.lactate_baseline >= 0.0 && self.lactate_max > self.lactate_baseline,
            "lactate_max must exceed lactate_baseline",
        )?;
        ensure(
            self.lactate_accumulation_per_min >= 0.0 && self.lactate_clearance_per_min > 0.0,
            "lactate rates must be positive",
        )?;
        ensure(self.max_dilution_grade > 0, "max_dilution_grade must be positive")?;
        ensure(self.max_step_secs > 0.0, "max_step_secs must be positive")
    }
}

/// Forecast solver budgets and horizons
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionCoefficients {
    /// Points in the "last window" pace fit
    pub window_points: usize,
    /// Points required before a pace fit is trusted
    pub min_fit_points: usize,
    /// Slowest speed considered moving (km/h)
    pub min_speed_kmph: f64,
    /// Bisection iteration budget
    pub solver_max_iterations: u32,
    /// Bisection bracket width considered converged
    pub solver_tolerance: f64,
    /// Time by which the stamina-left pace exhausts current stamina
    pub horizon_secs: f64,
    /// Cap on distance/time projections
    pub max_projection_secs: f64,
    /// Integration step for forward simulation
    pub simulation_step_secs: f64,
    /// Minimum age of the pace predictions before they are refreshed
    pub refresh_interval_secs: i64,
    /// Minimum age of the distance projections before they are refreshed
    pub distance_refresh_interval_secs: i64,
}

impl Default for PredictionCoefficients {
    fn default() -> Self {
        Self {
            window_points: 60,
            min_fit_points: 5,
            min_speed_kmph: 1.0,
            solver_max_iterations: 40,
            solver_tolerance: 1e-4,
            horizon_secs: 1800.0,
            max_projection_secs: 6.0 * 3600.0,
            simulation_step_secs: 10.0,
            refresh_interval_secs: 5,
            distance_refresh_interval_secs: 15,
        }
    }
}

impl PredictionCoefficients {
    fn validate(&self) -> Result<()> {
        ensure(self.window_points >= 2, "window_points must be at least 2")?;
        ensure(
            self.min_fit_points >= 2 && self.min_fit_points <= self.window_points,
            "min_fit_points must be within 2..=window_points",
        )?;
        ensure(self.min_speed_kmph > 0.0, "min_speed_kmph must be positive")?;
        ensure(
            self.solver_max_iterations > 0 && self.solver_tolerance > 0.0,
            "solver budget must be positive",
        )?;
        ensure(
            self.horizon_secs > 0.0
                && self.max_projection_secs >= self.horizon_secs
                && self.simulation_step_secs > 0.0,
            "projection horizons must be positive and ordered",
        )?;
        ensure(
            self.refresh_interval_secs >= 0 && self.distance_refresh_interval_secs >= 0,
            "refresh intervals must be non-negative",
        )
    }
}

/// Subjective questionnaire weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionnaireCoefficients {
    pub breath_weight: f64,
    pub muscle_weight: f64,
    pub rpe_weight: f64,
    /// Anaerobic baseline reached when every answer is maximal
    pub max_anaerobic_split: f64,
    /// Blend factor for repeat calibrations
    pub blend_rate: f64,
}

impl Default for QuestionnaireCoefficients {
    fn default() -> Self {
        Self {
            breath_weight: 0.3,
            muscle_weight: 0.4,
            rpe_weight: 0.3,
            max_anaerobic_split: 0.6,
            blend_rate: 0.5,
        }
    }
}

impl QuestionnaireCoefficients {
    fn validate(&self) -> Result<()> {
        ensure(
            self.breath_weight >= 0.0 && self.muscle_weight >= 0.0 && self.rpe_weight >= 0.0,
            "questionnaire weights must be non-negative",
        )?;
        ensure(
            self.breath_weight + self.muscle_weight + self.rpe_weight > 0.0,
            "at least one questionnaire weight must be positive",
        )?;
        ensure(
            (0.0..=1.0).contains(&self.max_anaerobic_split),
            "max_anaerobic_split must be in [0, 1]",
        )?;
        ensure(
            self.blend_rate > 0.0 && self.blend_rate <= 1.0,
            "blend_rate must be in (0, 1]",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(PhysiologyCoefficients::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_kinetics_rejected() {
        let mut coefficients = PhysiologyCoefficients::default();
        coefficients.kinetics.recovery_ratio = 1.5;
        assert!(coefficients.validate().is_err());

        let mut coefficients = PhysiologyCoefficients::default();
        coefficients.kinetics.lactate_max = 0.5;
        assert!(coefficients.validate().is_err());
    }

    #[test]
    fn test_invalid_prediction_budget_rejected() {
        let mut coefficients = PhysiologyCoefficients::default();
        coefficients.prediction.solver_max_iterations = 0;
        let err = coefficients.validate().unwrap_err();
        assert_eq!(err.status_code(), 4);
    }

    #[test]
    fn test_invalid_rr_ageing_rejected() {
        let mut coefficients = PhysiologyCoefficients::default();
        coefficients.ingest.rr_stale_secs = 0;
        assert!(coefficients.validate().is_err());

        let mut coefficients = PhysiologyCoefficients::default();
        coefficients.ingest.rr_max_consecutive_artifacts = 0;
        assert!(coefficients.validate().is_err());
    }

    #[test]
    fn test_exercise_lookup() {
        let table = ExerciseTable::default();
        assert!(table.get(ExerciseType::Bike).equipment_mass_kg > 5.0);
        assert!(
            table.get(ExerciseType::Run).locomotion_coefficient
                > table.get(ExerciseType::Walk).locomotion_coefficient
        );
    }

    #[test]
    fn test_max_hr_offsets() {
        let offsets = MaxHrOffsets::default();
        assert_eq!(offsets.offset(SportType::Running), 0.0);
        assert!(offsets.offset(SportType::Cycling) < 0.0);
    }
}
