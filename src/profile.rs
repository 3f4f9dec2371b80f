//! Static biometric configuration of one athlete
//!
//! Profiles never fail to construct: out-of-range inputs are clamped to the
//! nearest valid bound and reported through `tracing` so the engine always
//! operates on physically meaningful state.

use crate::coefficients::MaxHrOffsets;
use crate::models::{ExerciseType, Gender, SportType};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const MIN_AGE: u8 = 10;
pub const MAX_AGE: u8 = 100;
pub const MAX_LA_DILUTION_GRADE: u8 = 5;
const MAX_HISTORY_LEN: usize = 86_400;

/// Body composition fractions of total mass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyComposition {
    pub fat: f64,
    pub muscle: f64,
    pub bone: f64,
    pub water: f64,
}

impl Default for BodyComposition {
    fn default() -> Self {
        Self {
            fat: 0.18,
            muscle: 0.42,
            bone: 0.15,
            water: 0.25,
        }
    }
}

impl BodyComposition {
    pub fn total(&self) -> f64 {
        self.fat + self.muscle + self.bone + self.water
    }

    /// Clamp each fraction into [0,1] and scale down when the sum exceeds 1
    fn normalized(self) -> Self {
        let clamp = |name: &str, value: f64| clamp_fraction(name, value);
        let mut composition = Self {
            fat: clamp("fat", self.fat),
            muscle: clamp("muscle", self.muscle),
            bone: clamp("bone", self.bone),
            water: clamp("water", self.water),
        };

        let total = composition.total();
        if total > 1.05 {
            warn!(total, "Body composition exceeds 100%, scaling down");
            composition.fat /= total;
            composition.muscle /= total;
            composition.bone /= total;
            composition.water /= total;
        }
        composition
    }
}

/// Raw profile parameters as supplied by a host, before clamping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfileParams {
    pub age: i32,
    pub gender: Gender,
    /// Weight in kilograms
    pub weight_kg: f64,
    /// Height in centimeters
    pub height_cm: f64,
    pub bio_max_hr: i32,
    pub bio_max_hr_sport: SportType,
    pub bio_rest_hr: i32,
    pub body_composition: BodyComposition,
    /// Samples retained per ingest stream
    pub max_history_len: i64,
    /// Fresh aerobic threshold as a fraction of HRR
    pub aerobic_total_capacity: f64,
    /// Aerobic threshold at session start (<= total)
    pub aerobic_capacity: f64,
    pub la_dilution_grade: i32,
    /// Baseline anaerobic share of energy supply
    pub anaerobic_fraction: f64,
}

impl Default for UserProfileParams {
    fn default() -> Self {
        Self {
            age: 30,
            gender: Gender::Male,
            weight_kg: 70.0,
            height_cm: 175.0,
            bio_max_hr: 190,
            bio_max_hr_sport: SportType::Running,
            bio_rest_hr: 60,
            body_composition: BodyComposition::default(),
            max_history_len: 3600,
            aerobic_total_capacity: 0.75,
            aerobic_capacity: 0.75,
            la_dilution_grade: 2,
            anaerobic_fraction: 0.10,
        }
    }
}

/// Validated athlete profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    age: u8,
    gender: Gender,
    weight_kg: f64,
    height_cm: f64,
    bio_max_hr: u16,
    bio_max_hr_sport: SportType,
    bio_rest_hr: u16,
    body_composition: BodyComposition,
    max_history_len: usize,
    aerobic_total_capacity: f64,
    aerobic_capacity: f64,
    la_dilution_grade: u8,
    anaerobic_fraction: f64,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self::from_params(UserProfileParams::default())
    }
}

impl UserProfile {
    /// Build a profile, clamping every field into its valid range
    pub fn from_params(params: UserProfileParams) -> Self {
        let age = clamp_i64("age", params.age as i64, MIN_AGE as i64, MAX_AGE as i64) as u8;
        let weight_kg = clamp_f64("weight_kg", params.weight_kg, 20.0, 300.0);
        let height_cm = clamp_f64("height_cm", params.height_cm, 100.0, 250.0);
        let bio_rest_hr = clamp_i64("bio_rest_hr", params.bio_rest_hr as i64, 30, 120) as u16;
        let bio_max_hr = clamp_i64(
            "bio_max_hr",
            params.bio_max_hr as i64,
            bio_rest_hr as i64 + 20,
            230,
        ) as u16;
        let max_history_len =
            clamp_i64("max_history_len", params.max_history_len, 1, MAX_HISTORY_LEN as i64) as usize;
        let aerobic_total_capacity =
            clamp_fraction("aerobic_total_capacity", params.aerobic_total_capacity);
        let aerobic_capacity = clamp_f64(
            "aerobic_capacity",
            params.aerobic_capacity,
            0.0,
            aerobic_total_capacity,
        );
        let la_dilution_grade = clamp_i64(
            "la_dilution_grade",
            params.la_dilution_grade as i64,
            0,
            MAX_LA_DILUTION_GRADE as i64,
        ) as u8;

        Self {
            age,
            gender: params.gender,
            weight_kg,
            height_cm,
            bio_max_hr,
            bio_max_hr_sport: params.bio_max_hr_sport,
            bio_rest_hr,
            body_composition: params.body_composition.normalized(),
            max_history_len,
            aerobic_total_capacity,
            aerobic_capacity,
            la_dilution_grade,
            anaerobic_fraction: clamp_fraction("anaerobic_fraction", params.anaerobic_fraction),
        }
    }

    /// Raw parameters equivalent to this profile
    pub fn to_params(&self) -> UserProfileParams {
        UserProfileParams {
            age: self.age as i32,
            gender: self.gender,
            weight_kg: self.weight_kg,
            height_cm: self.height_cm,
            bio_max_hr: self.bio_max_hr as i32,
            bio_max_hr_sport: self.bio_max_hr_sport,
            bio_rest_hr: self.bio_rest_hr as i32,
            body_composition: self.body_composition,
            max_history_len: self.max_history_len as i64,
            aerobic_total_capacity: self.aerobic_total_capacity,
            aerobic_capacity: self.aerobic_capacity,
            la_dilution_grade: self.la_dilution_grade as i32,
            anaerobic_fraction: self.anaerobic_fraction,
        }
    }

    pub fn age(&self) -> u8 {
        self.age
    }

    pub fn gender(&self) -> Gender {
        self.gender
    }

    pub fn weight_kg(&self) -> f64 {
        self.weight_kg
    }

    pub fn height_cm(&self) -> f64 {
        self.height_cm
    }

    pub fn bio_max_hr(&self) -> u16 {
        self.bio_max_hr
    }

    pub fn bio_max_hr_sport(&self) -> SportType {
        self.bio_max_hr_sport
    }

    pub fn bio_rest_hr(&self) -> u16 {
        self.bio_rest_hr
    }

    pub fn body_composition(&self) -> &BodyComposition {
        &self.body_composition
    }

    pub fn max_history_len(&self) -> usize {
        self.max_history_len
    }

    pub fn aerobic_total_capacity(&self) -> f64 {
        self.aerobic_total_capacity
    }

    pub fn aerobic_capacity(&self) -> f64 {
        self.aerobic_capacity
    }

    pub fn la_dilution_grade(&self) -> u8 {
        self.la_dilution_grade
    }

    pub fn anaerobic_fraction(&self) -> f64 {
        self.anaerobic_fraction
    }

    /// Heart rate reserve in bpm
    pub fn hr_reserve(&self) -> f64 {
        f64::from(self.bio_max_hr) - f64::from(self.bio_rest_hr)
    }

    /// Max heart rate expected for an exercise type, adjusted from the sport it was measured in
    pub fn effective_max_hr(&self, exercise: ExerciseType, offsets: &MaxHrOffsets) -> f64 {
        let adjusted = f64::from(self.bio_max_hr) - offsets.offset(self.bio_max_hr_sport)
            + offsets.offset(exercise.sport());
        adjusted.max(f64::from(self.bio_rest_hr) + 1.0)
    }

    /// Lean body mass in kilograms
    pub fn lean_mass_kg(&self) -> f64 {
        self.weight_kg * (1.0 - self.body_composition.fat)
    }

    /// Resting VO2max estimate (Uth et al.): 15.3 × HRmax / HRrest, ml/kg/min
    pub fn estimated_vo2max(&self) -> f64 {
        15.3 * f64::from(self.bio_max_hr) / f64::from(self.bio_rest_hr)
    }
}

fn clamp_f64(field: &str, value: f64, min: f64, max: f64) -> f64 {
    if !value.is_finite() {
        warn!(field, "Non-finite profile value, using lower bound");
        return min;
    }
    let clamped = value.clamp(min, max);
    if clamped != value {
        warn!(field, value, clamped, "Profile value out of range, clamped");
    }
    clamped
}

fn clamp_fraction(field: &str, value: f64) -> f64 {
    clamp_f64(field, value, 0.0, 1.0)
}

fn clamp_i64(field: &str, value: i64, min: i64, max: i64) -> i64 {
    let clamped = value.clamp(min, max);
    if clamped != value {
        warn!(field, value, clamped, "Profile value out of range, clamped");
    }
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_is_valid() {
        let profile = UserProfile::default();
        assert_eq!(profile.age(), 30);
        assert_eq!(profile.bio_rest_hr(), 60);
        assert_eq!(profile.bio_max_hr(), 190);
        assert!((profile.body_composition().total() - 1.0).abs() < 1e-9);
        assert!(profile.aerobic_capacity() <= profile.aerobic_total_capacity());
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let params = UserProfileParams {
            age: 150,
            weight_kg: -5.0,
            height_cm: f64::NAN,
            bio_rest_hr: 10,
            bio_max_hr: 400,
            aerobic_total_capacity: 1.4,
            aerobic_capacity: 2.0,
            la_dilution_grade: 9,
            anaerobic_fraction: -0.3,
            max_history_len: 0,
            ..Default::default()
        };
        let profile = UserProfile::from_params(params);

        assert_eq!(profile.age(), MAX_AGE);
        assert_eq!(profile.weight_kg(), 20.0);
        assert_eq!(profile.height_cm(), 100.0);
        assert_eq!(profile.bio_rest_hr(), 30);
        assert_eq!(profile.bio_max_hr(), 230);
        assert_eq!(profile.aerobic_total_capacity(), 1.0);
        assert_eq!(profile.aerobic_capacity(), 1.0);
        assert_eq!(profile.la_dilution_grade(), MAX_LA_DILUTION_GRADE);
        assert_eq!(profile.anaerobic_fraction(), 0.0);
        assert_eq!(profile.max_history_len(), 1);
    }

    #[test]
    fn test_max_hr_kept_above_rest_hr() {
        let params = UserProfileParams {
            bio_rest_hr: 80,
            bio_max_hr: 70,
            ..Default::default()
        };
        let profile = UserProfile::from_params(params);
        assert_eq!(profile.bio_max_hr(), 100);
        assert!(profile.hr_reserve() > 0.0);
    }

    #[test]
    fn test_body_composition_scaled_when_oversized() {
        let params = UserProfileParams {
            body_composition: BodyComposition {
                fat: 0.5,
                muscle: 0.5,
                bone: 0.5,
                water: 0.5,
            },
            ..Default::default()
        };
        let profile = UserProfile::from_params(params);
        assert!((profile.body_composition().total() - 1.0).abs() < 1e-9);
        assert!((profile.body_composition().fat - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_effective_max_hr_by_sport() {
        let profile = UserProfile::default();
        let offsets = MaxHrOffsets::default();
        assert_eq!(profile.effective_max_hr(ExerciseType::Run, &offsets), 190.0);
        assert_eq!(profile.effective_max_hr(ExerciseType::Bike, &offsets), 185.0);
    }

    #[test]
    fn test_params_round_trip() {
        let profile = UserProfile::default();
        assert_eq!(UserProfile::from_params(profile.to_params()), profile);
    }

    #[test]
    fn test_derived_physiology() {
        let profile = UserProfile::default();
        assert!((profile.lean_mass_kg() - 57.4).abs() < 1e-9);
        assert!((profile.estimated_vo2max() - 48.45).abs() < 1e-9);
    }
}
