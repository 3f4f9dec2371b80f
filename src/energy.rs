//! Caloric expenditure accounting
//!
//! Exercise calories come from mechanical workload divided by gross
//! efficiency while activity data is fresh, and from heart rate reserve
//! otherwise. Basal calories accrue continuously from the chosen BMR equation.
//! Integration is left-rectangle: each interval is charged at the rate that
//! was in effect before the sample closing it arrived.

use crate::coefficients::{BmrFormula, ExpenditureCoefficients};
use crate::models::Gender;
use crate::profile::UserProfile;
use serde::{Deserialize, Serialize};

/// Joules per kilocalorie
pub const JOULES_PER_KCAL: f64 = 4184.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// What drives the exercise burn rate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BurnSource {
    /// Mechanical workload in watts
    Workload(f64),
    /// Fraction of heart rate reserve
    HeartRate(f64),
    Idle,
}

/// Calories charged by one [`EnergyExpenditureModel::advance`] call
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExpenditureStep {
    pub exercise_kcal: f64,
    pub bmr_kcal: f64,
    pub elapsed_secs: i64,
}

/// Gross mechanical efficiency from body composition
pub fn mechanical_efficiency(profile: &UserProfile, coefficients: &ExpenditureCoefficients) -> f64 {
    let muscle = profile.body_composition().muscle;
    let efficiency = coefficients.base_efficiency
        + coefficients.muscle_efficiency_gain * (muscle - coefficients.reference_muscle_fraction);
    efficiency.clamp(coefficients.min_efficiency, coefficients.max_efficiency)
}

/// Basal metabolic rate in kcal/day
pub fn bmr_kcal_per_day(profile: &UserProfile, formula: BmrFormula) -> f64 {
    match formula {
        BmrFormula::MifflinStJeor => {
            let base = 10.0 * profile.weight_kg() + 6.25 * profile.height_cm()
                - 5.0 * f64::from(profile.age());
            match profile.gender() {
                Gender::Male => base + 5.0,
                Gender::Female => base - 161.0,
            }
        }
        BmrFormula::KatchMcArdle => 370.0 + 21.6 * profile.lean_mass_kg(),
    }
    .max(0.0)
}

/// Exercise burn rate in kcal/s for a burn source
pub fn exercise_kcal_per_sec(
    source: BurnSource,
    profile: &UserProfile,
    coefficients: &ExpenditureCoefficients,
) -> f64 {
    match source {
        BurnSource::Workload(watts) => {
            watts.max(0.0) / mechanical_efficiency(profile, coefficients) / JOULES_PER_KCAL
        }
        BurnSource::HeartRate(intensity) => {
            // ml O2/kg/min above rest
            let vo2_net = intensity.clamp(0.0, 1.0)
                * (profile.estimated_vo2max() - coefficients.vo2_rest).max(0.0);
            let litres_per_min = vo2_net * profile.weight_kg() / 1000.0;
            litres_per_min * coefficients.kcal_per_litre_o2 / 60.0
        }
        BurnSource::Idle => 0.0,
    }
}

/// Running calorie totals for one session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnergyExpenditureModel {
    exercise_kcal: f64,
    bmr_kcal: f64,
    last_time: Option<i64>,
    source: Option<BurnSource>,
    exercise_rate: f64,
    bmr_rate: f64,
}

impl EnergyExpenditureModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_total_kcal(&self) -> f64 {
        self.exercise_kcal + self.bmr_kcal
    }

    pub fn session_exercise_kcal(&self) -> f64 {
        self.exercise_kcal
    }

    pub fn session_bmr_kcal(&self) -> f64 {
        self.bmr_kcal
    }

    pub fn source(&self) -> Option<BurnSource> {
        self.source
    }

    /// Burn rate currently held (exercise + basal), kcal/min
    pub fn burn_rate_kcal_per_min(&self) -> f64 {
        (self.exercise_rate + self.bmr_rate) * 60.0
    }

    /// Exercise-only burn rate currently held, kcal/min
    pub fn exercise_rate_kcal_per_min(&self) -> f64 {
        self.exercise_rate * 60.0
    }

    /// Charge the interval since the previous call at the held rates
    ///
    /// Exercise calories stop after `max_integration_gap_secs`; basal calories
    /// cover the whole interval. Calls at or before the last time charge nothing.
    pub fn advance(&mut self, now: i64, coefficients: &ExpenditureCoefficients) -> ExpenditureStep {
        let Some(last) = self.last_time else {
            self.last_time = Some(now);
            return ExpenditureStep::default();
        };
        if now <= last {
            return ExpenditureStep::default();
        }

        let elapsed_secs = now - last;
        let exercise_secs = elapsed_secs.min(coefficients.max_integration_gap_secs);
        let step = ExpenditureStep {
            exercise_kcal: self.exercise_rate * exercise_secs as f64,
            bmr_kcal: self.bmr_rate * elapsed_secs as f64,
            elapsed_secs,
        };

        self.exercise_kcal += step.exercise_kcal;
        self.bmr_kcal += step.bmr_kcal;
        self.last_time = Some(now);
        step
    }

    /// Switch the held rates for the next interval
    pub fn set_source(
        &mut self,
        source: BurnSource,
        profile: &UserProfile,
        coefficients: &ExpenditureCoefficients,
    ) {
        self.source = Some(source);
        self.exercise_rate = exercise_kcal_per_sec(source, profile, coefficients);
        self.bmr_rate = bmr_kcal_per_day(profile, coefficients.bmr_formula) / SECONDS_PER_DAY;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::UserProfileParams;

    fn profile(gender: Gender) -> UserProfile {
        UserProfile::from_params(UserProfileParams {
            age: 30,
            gender,
            weight_kg: 70.0,
            height_cm: 175.0,
            ..Default::default()
        })
    }

    #[test]
    fn test_mifflin_st_jeor() {
        // 700 + 1093.75 - 150 = 1643.75, then +5 male or -161 female
        let male = bmr_kcal_per_day(&profile(Gender::Male), BmrFormula::MifflinStJeor);
        let female = bmr_kcal_per_day(&profile(Gender::Female), BmrFormula::MifflinStJeor);
        assert!((male - 1648.75).abs() < 1e-9);
        assert!((female - 1482.75).abs() < 1e-9);
    }

    #[test]
    fn test_katch_mcardle() {
        let bmr = bmr_kcal_per_day(&profile(Gender::Male), BmrFormula::KatchMcArdle);
        // lean mass 57.4 kg
        assert!((bmr - (370.0 + 21.6 * 57.4)).abs() < 1e-9);
    }

    #[test]
    fn test_efficiency_clamped() {
        let coefficients = ExpenditureCoefficients::default();
        let efficiency = mechanical_efficiency(&profile(Gender::Male), &coefficients);
        assert!((efficiency - 0.222).abs() < 1e-9);

        let mut composition = crate::profile::BodyComposition::default();
        composition.muscle = 1.0;
        composition.fat = 0.0;
        composition.bone = 0.0;
        composition.water = 0.0;
        let muscular = UserProfile::from_params(UserProfileParams {
            body_composition: composition,
            ..Default::default()
        });
        assert!(mechanical_efficiency(&muscular, &coefficients) <= coefficients.max_efficiency);
    }

    #[test]
    fn test_workload_rate() {
        let coefficients = ExpenditureCoefficients::default();
        let rate = exercise_kcal_per_sec(BurnSource::Workload(222.0), &profile(Gender::Male), &coefficients);
        // 222 W at 22.2 % efficiency = 1000 W metabolic
        assert!((rate - 1000.0 / JOULES_PER_KCAL).abs() < 1e-9);
    }

    #[test]
    fn test_heart_rate_rate_scales_with_intensity() {
        let coefficients = ExpenditureCoefficients::default();
        let profile = profile(Gender::Male);
        let low = exercise_kcal_per_sec(BurnSource::HeartRate(0.3), &profile, &coefficients);
        let high = exercise_kcal_per_sec(BurnSource::HeartRate(0.8), &profile, &coefficients);
        assert!(high > low && low > 0.0);
        assert_eq!(exercise_kcal_per_sec(BurnSource::Idle, &profile, &coefficients), 0.0);
    }

    #[test]
    fn test_left_rectangle_integration() {
        let coefficients = ExpenditureCoefficients::default();
        let profile = profile(Gender::Male);
        let mut model = EnergyExpenditureModel::new();

        model.advance(0, &coefficients);
        model.set_source(BurnSource::Workload(222.0), &profile, &coefficients);
        let step = model.advance(10, &coefficients);

        assert!((step.exercise_kcal - 10_000.0 / JOULES_PER_KCAL).abs() < 1e-9);
        assert!(step.bmr_kcal > 0.0);
        assert!((model.session_total_kcal() - step.exercise_kcal - step.bmr_kcal).abs() < 1e-12);
    }

    #[test]
    fn test_gap_caps_exercise_but_not_bmr() {
        let coefficients = ExpenditureCoefficients::default();
        let profile = profile(Gender::Male);
        let mut model = EnergyExpenditureModel::new();

        model.advance(0, &coefficients);
        model.set_source(BurnSource::Workload(222.0), &profile, &coefficients);
        let step = model.advance(600, &coefficients);

        let expected_exercise =
            coefficients.max_integration_gap_secs as f64 * 1000.0 / JOULES_PER_KCAL;
        assert!((step.exercise_kcal - expected_exercise).abs() < 1e-9);
        assert!((step.bmr_kcal - 600.0 * 1648.75 / SECONDS_PER_DAY).abs() < 1e-9);
    }

    #[test]
    fn test_stale_advance_charges_nothing() {
        let coefficients = ExpenditureCoefficients::default();
        let mut model = EnergyExpenditureModel::new();
        model.advance(10, &coefficients);
        model.set_source(BurnSource::HeartRate(0.5), &UserProfile::default(), &coefficients);
        let before = model.session_total_kcal();
        assert_eq!(model.advance(10, &coefficients), ExpenditureStep::default());
        assert_eq!(model.session_total_kcal(), before);
    }
}
