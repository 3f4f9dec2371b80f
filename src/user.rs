//! Per-user engine facade
//!
//! A [`User`] owns one athlete's profile, coefficient table and every model
//! derived from the two telemetry streams. Each accepted sample moves the
//! whole state forward to its timestamp; a rejected sample leaves the state
//! exactly as it was. All readers are plain borrows and never recompute.

use crate::activity::{ActivityIngest, ActivityReading};
use crate::coefficients::PhysiologyCoefficients;
use crate::energy::{BurnSource, EnergyExpenditureModel};
use crate::energy_system::{EnergySystemModel, ExertionRegime};
use crate::error::{Result, StaminaError, Stream};
use crate::heart_rate::{HeartRateIngest, HeartRateReading};
use crate::models::{ActivitySample, ExerciseType, HeartRateSample};
use crate::prediction::{BurnPoint, PacePrediction, PredictiveEnduranceModel};
use crate::profile::{UserProfile, UserProfileParams};
use crate::questionnaire::{CalibrationOutcome, QuestionnaireAnswers, QuestionnaireCalibrator};
use crate::timeline::SessionTimeline;
use crate::zones::{HrrZone, HrrZoneCalculator, ZoneHeartRate};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One athlete's stamina engine
#[derive(Debug, Clone)]
pub struct User {
    profile: UserProfile,
    coefficients: PhysiologyCoefficients,
    timeline: SessionTimeline,
    heart_rate: HeartRateIngest,
    activity: ActivityIngest,
    expenditure: EnergyExpenditureModel,
    energy_system: EnergySystemModel,
    prediction: PredictiveEnduranceModel,
    exercise: ExerciseType,
    heart_d_time: Option<i64>,
    stamina_d_time: Option<i64>,
    physic_d_time: Option<i64>,
}

impl Default for User {
    fn default() -> Self {
        Self::new()
    }
}

impl User {
    /// User with the default profile and coefficients
    pub fn new() -> Self {
        Self::build(UserProfile::default(), PhysiologyCoefficients::default())
    }

    /// User with explicit profile parameters; out-of-range values are clamped
    pub fn with_profile(params: UserProfileParams) -> Self {
        Self::build(UserProfile::from_params(params), PhysiologyCoefficients::default())
    }

    /// User with explicit profile and a custom coefficient table
    pub fn with_coefficients(
        params: UserProfileParams,
        coefficients: PhysiologyCoefficients,
    ) -> Result<Self> {
        coefficients.validate()?;
        Ok(Self::build(UserProfile::from_params(params), coefficients))
    }

    fn build(profile: UserProfile, coefficients: PhysiologyCoefficients) -> Self {
        let energy_system = EnergySystemModel::new(&profile, &coefficients.kinetics);
        Self {
            profile,
            coefficients,
            timeline: SessionTimeline::new(),
            heart_rate: HeartRateIngest::new(),
            activity: ActivityIngest::new(),
            expenditure: EnergyExpenditureModel::new(),
            energy_system,
            prediction: PredictiveEnduranceModel::new(),
            exercise: ExerciseType::Run,
            heart_d_time: None,
            stamina_d_time: None,
            physic_d_time: None,
        }
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn coefficients(&self) -> &PhysiologyCoefficients {
        &self.coefficients
    }

    pub fn heart_rate(&self) -> &HeartRateIngest {
        &self.heart_rate
    }

    pub fn activity(&self) -> &ActivityIngest {
        &self.activity
    }

    pub fn energy_system(&self) -> &EnergySystemModel {
        &self.energy_system
    }

    pub fn prediction(&self) -> &PredictiveEnduranceModel {
        &self.prediction
    }

    /// Exercise type of the most recent activity sample
    pub fn exercise(&self) -> ExerciseType {
        self.exercise
    }

    /// Last accepted timestamp on either stream
    pub fn last_time(&self) -> Option<i64> {
        self.timeline.last()
    }

    // ---------------------------------------------------------------------
    // Updates
    // ---------------------------------------------------------------------

    /// Ingest a heart rate sample
    pub fn update_heart_rate(&mut self, sample: HeartRateSample) -> Result<HeartRateReading> {
        let time = sample.time;
        self.timeline
            .check(Stream::HeartRate, time, self.heart_rate.last_time())
            .map_err(log_rejection)?;
        let reading = self
            .heart_rate
            .update(sample, self.exercise, &self.profile, &self.coefficients.ingest)
            .map_err(log_rejection)?;

        self.advance_models(time);
        if reading.is_reliable() {
            self.heart_d_time = Some(time);
        }
        self.retarget(time);
        self.timeline.advance(time);
        self.refresh_predictions(time);

        debug!(
            time,
            heart_rate = reading.heart_rate,
            intensity = reading.intensity,
            from_rr = reading.from_rr,
            stamina = self.energy_system.stamina(),
            "Heart rate sample accepted"
        );
        Ok(reading)
    }

    /// Ingest a physical activity sample
    pub fn update_physical_status(&mut self, sample: ActivitySample) -> Result<ActivityReading> {
        let time = sample.time;
        self.timeline
            .check(Stream::Activity, time, self.activity.last_time())
            .map_err(log_rejection)?;
        let reading = self
            .activity
            .update(sample, &self.profile, &self.coefficients.expenditure)
            .map_err(log_rejection)?;

        self.advance_models(time);
        self.exercise = reading.exercise;
        self.physic_d_time = Some(time);
        self.prediction.record_activity(
            &reading,
            &self.coefficients.prediction,
            self.coefficients.expenditure.max_integration_gap_secs,
        );
        self.retarget(time);

        if let Some(intensity) = self.fresh_heart_rate_intensity(time) {
            self.prediction.record_burn(
                BurnPoint {
                    time,
                    speed_kmph: reading.speed_kmph,
                    intensity,
                    kcal_per_min: self.expenditure.burn_rate_kcal_per_min(),
                },
                &self.coefficients.prediction,
            );
        }

        self.timeline.advance(time);
        self.refresh_predictions(time);

        debug!(
            time,
            speed_kmph = reading.speed_kmph,
            workload_w = reading.workload_w,
            total_kcal = self.expenditure.session_total_kcal(),
            "Activity sample accepted"
        );
        Ok(reading)
    }

    /// Replace the profile, keeping accumulated session state
    pub fn update_profile(&mut self, params: UserProfileParams) {
        self.profile = UserProfile::from_params(params);
        self.energy_system
            .apply_profile(&self.profile, &self.coefficients.kinetics);
        if let Some(time) = self.timeline.last() {
            self.retarget(time);
        }
    }

    /// Recalibrate the aerobic/anaerobic split from questionnaire answers
    pub fn update_aerobic_anaerobic_by_questionnaire(
        &mut self,
        answers: QuestionnaireAnswers,
    ) -> Result<CalibrationOutcome> {
        QuestionnaireCalibrator::calibrate(
            &answers,
            &mut self.energy_system,
            &self.coefficients.questionnaire,
        )
        .map_err(log_rejection)
    }

    fn advance_models(&mut self, time: i64) {
        self.expenditure
            .advance(time, &self.coefficients.expenditure);
        self.energy_system.advance(
            time,
            self.coefficients.expenditure.max_integration_gap_secs,
            &self.coefficients.kinetics,
        );
        self.stamina_d_time = Some(time);
    }

    fn fresh_heart_rate_intensity(&self, time: i64) -> Option<f64> {
        let reading = self.heart_rate.last_reliable()?;
        if time - reading.time > self.coefficients.expenditure.workload_stale_secs {
            return None;
        }
        reading.intensity
    }

    fn fresh_activity(&self, time: i64) -> Option<&ActivityReading> {
        self.activity
            .last_reading()
            .filter(|r| time - r.time <= self.coefficients.expenditure.workload_stale_secs)
    }

    /// Choose the burn source and intensity held until the next sample
    fn retarget(&mut self, time: i64) {
        let hr_intensity = self.fresh_heart_rate_intensity(time);
        let activity = self.fresh_activity(time).cloned();

        // a stationary estimate carries no workload, so fresh heart rate wins
        let source = match (&activity, hr_intensity) {
            (Some(reading), Some(intensity)) if reading.workload_w <= 0.0 => {
                BurnSource::HeartRate(intensity)
            }
            (Some(reading), _) => BurnSource::Workload(reading.workload_w),
            (None, Some(intensity)) => BurnSource::HeartRate(intensity),
            (None, None) => BurnSource::Idle,
        };
        let intensity = hr_intensity
            .or_else(|| {
                activity.as_ref().map(|reading| {
                    let exercise = self.coefficients.expenditure.exercise.get(reading.exercise);
                    reading.speed_kmph / exercise.default_max_speed_kmph
                })
            })
            .unwrap_or(0.0);

        self.expenditure
            .set_source(source, &self.profile, &self.coefficients.expenditure);
        self.energy_system.set_intensity(intensity);
    }

    fn refresh_predictions(&mut self, time: i64) {
        let default_max_speed = self
            .coefficients
            .expenditure
            .exercise
            .get(self.exercise)
            .default_max_speed_kmph;
        self.prediction.refresh(
            time,
            &self.energy_system,
            &self.coefficients.kinetics,
            &self.coefficients.prediction,
            default_max_speed,
        );
    }

    // ---------------------------------------------------------------------
    // Readers
    // ---------------------------------------------------------------------

    pub fn session_total_kcal(&self) -> f64 {
        self.expenditure.session_total_kcal()
    }

    pub fn session_exercise_kcal(&self) -> f64 {
        self.expenditure.session_exercise_kcal()
    }

    pub fn session_bmr_kcal(&self) -> f64 {
        self.expenditure.session_bmr_kcal()
    }

    /// Current burn rate (kcal/min)
    pub fn burn_rate_kcal_per_min(&self) -> f64 {
        self.expenditure.burn_rate_kcal_per_min()
    }

    pub fn stamina(&self) -> f64 {
        self.energy_system.stamina()
    }

    pub fn aerobic_fraction(&self) -> f64 {
        self.energy_system.aerobic_fraction()
    }

    pub fn anaerobic_fraction(&self) -> f64 {
        self.energy_system.anaerobic_fraction()
    }

    /// Current aerobic threshold (fraction of HRR)
    pub fn aerobic_capacity(&self) -> f64 {
        self.energy_system.threshold(&self.coefficients.kinetics)
    }

    pub fn aerobic_total_capacity(&self) -> f64 {
        self.energy_system.total_capacity()
    }

    /// Blood lactate (mmol/L)
    pub fn lactate(&self) -> f64 {
        self.energy_system.lactate()
    }

    pub fn la_dilution_grade(&self) -> u8 {
        self.energy_system.dilution_grade(&self.coefficients.kinetics)
    }

    pub fn regime(&self) -> ExertionRegime {
        self.energy_system.regime(&self.coefficients.kinetics)
    }

    /// Training band of the intensity currently held
    pub fn zone(&self) -> HrrZone {
        self.energy_system.zone()
    }

    pub fn intensity(&self) -> f64 {
        self.energy_system.intensity()
    }

    /// Whole-session pace prediction
    pub fn avg_prediction(&self) -> &PacePrediction {
        self.prediction.session()
    }

    /// Last-window pace prediction
    pub fn last_prediction(&self) -> &PacePrediction {
        self.prediction.last_window()
    }

    pub fn predicted_avg_pace_max_conti_burn(&self) -> f64 {
        self.avg_prediction().max_conti_pace_min_per_km
    }

    pub fn predicted_avg_pace_max_burn_with_stamina_left(&self) -> f64 {
        self.avg_prediction().stamina_left_pace_min_per_km
    }

    pub fn predicted_last_pace_max_conti_burn(&self) -> f64 {
        self.last_prediction().max_conti_pace_min_per_km
    }

    pub fn predicted_last_pace_max_burn_with_stamina_left(&self) -> f64 {
        self.last_prediction().stamina_left_pace_min_per_km
    }

    pub fn predicted_avg_pace_max_conti_dist_km(&self) -> f64 {
        self.avg_prediction().max_conti_dist_km
    }

    pub fn predicted_avg_pace_time_secs_for_max_conti_dist(&self) -> f64 {
        self.avg_prediction().max_conti_time_secs
    }

    pub fn predicted_avg_pace_max_dist_km_with_stamina_left(&self) -> f64 {
        self.avg_prediction().stamina_left_dist_km
    }

    pub fn predicted_last_pace_max_conti_dist_km(&self) -> f64 {
        self.last_prediction().max_conti_dist_km
    }

    pub fn predicted_last_pace_time_secs_for_max_conti_dist(&self) -> f64 {
        self.last_prediction().max_conti_time_secs
    }

    pub fn predicted_last_pace_max_dist_km_with_stamina_left(&self) -> f64 {
        self.last_prediction().stamina_left_dist_km
    }

    pub fn predicted_pseudo_vdot(&self) -> f64 {
        self.prediction.pseudo_vdot()
    }

    pub fn session_vdot(&self) -> f64 {
        self.prediction.session_vdot()
    }

    /// Last time intensity was derived from a reliable heart rate sample
    pub fn heart_d_time(&self) -> Option<i64> {
        self.heart_d_time
    }

    /// Last time the energy system was advanced
    pub fn stamina_d_time(&self) -> Option<i64> {
        self.stamina_d_time
    }

    /// Last time an activity sample was accepted
    pub fn physic_d_time(&self) -> Option<i64> {
        self.physic_d_time
    }

    pub fn predicted_burn_time(&self) -> Option<i64> {
        self.prediction.burn_time()
    }

    pub fn predicted_dist_time(&self) -> Option<i64> {
        self.prediction.dist_time()
    }

    /// Heart rate at an HRR cut point
    /// Heart rate at a cut point, against the max used for the current exercise
    pub fn hr_at(&self, zone: HrrZone) -> u16 {
        HrrZoneCalculator::hr_at_for(
            &self.profile,
            zone,
            self.exercise,
            &self.coefficients.ingest.max_hr_offsets,
        )
    }

    pub fn zone_table(&self) -> Vec<ZoneHeartRate> {
        HrrZoneCalculator::zone_table_for(
            &self.profile,
            self.exercise,
            &self.coefficients.ingest.max_hr_offsets,
        )
    }

    /// Every reader in one serialisable value
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            session_total_kcal: self.session_total_kcal(),
            session_exercise_kcal: self.session_exercise_kcal(),
            session_bmr_kcal: self.session_bmr_kcal(),
            burn_rate_kcal_per_min: self.burn_rate_kcal_per_min(),
            stamina: self.stamina(),
            aerobic_fraction: self.aerobic_fraction(),
            anaerobic_fraction: self.anaerobic_fraction(),
            aerobic_capacity: self.aerobic_capacity(),
            aerobic_total_capacity: self.aerobic_total_capacity(),
            lactate: self.lactate(),
            la_dilution_grade: self.la_dilution_grade(),
            regime: self.regime(),
            zone: self.zone(),
            avg: *self.avg_prediction(),
            last: *self.last_prediction(),
            pseudo_vdot: self.predicted_pseudo_vdot(),
            session_vdot: self.session_vdot(),
            session_distance_km: self.prediction.session_distance_km(),
            active_secs: self.prediction.active_secs(),
            heart_d_time: self.heart_d_time,
            stamina_d_time: self.stamina_d_time,
            physic_d_time: self.physic_d_time,
            predicted_burn_time: self.predicted_burn_time(),
            predicted_dist_time: self.predicted_dist_time(),
            zones: self.zone_table(),
        }
    }
}

fn log_rejection(error: StaminaError) -> StaminaError {
    debug!(status = error.status_code(), %error, "Update rejected");
    error
}

/// Point-in-time copy of every reader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub session_total_kcal: f64,
    pub session_exercise_kcal: f64,
    pub session_bmr_kcal: f64,
    pub burn_rate_kcal_per_min: f64,
    pub stamina: f64,
    pub aerobic_fraction: f64,
    pub anaerobic_fraction: f64,
    pub aerobic_capacity: f64,
    pub aerobic_total_capacity: f64,
    pub lactate: f64,
    pub la_dilution_grade: u8,
    pub regime: ExertionRegime,
    pub zone: HrrZone,
    pub avg: PacePrediction,
    pub last: PacePrediction,
    pub pseudo_vdot: f64,
    pub session_vdot: f64,
    pub session_distance_km: f64,
    pub active_secs: f64,
    pub heart_d_time: Option<i64>,
    pub stamina_d_time: Option<i64>,
    pub physic_d_time: Option<i64>,
    pub predicted_burn_time: Option<i64>,
    pub predicted_dist_time: Option<i64>,
    pub zones: Vec<ZoneHeartRate>,
}
