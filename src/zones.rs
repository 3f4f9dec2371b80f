use crate::coefficients::MaxHrOffsets;
use crate::models::ExerciseType;
use crate::profile::UserProfile;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Heart-rate-reserve cut points exposed as convenience queries
///
/// Percentage variants are plain Karvonen fractions; lettered variants are the
/// upper bounds of named training bands (D recovery, E easy, M marathon,
/// T threshold, A aerobic capacity, I interval).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HrrZone {
    Hrr0,
    Hrr50,
    Hrr60,
    Hrr70,
    Hrr80,
    Hrr90,
    Hrr100,
    RecoveryUp59,
    EasyUp74,
    MarathonUp84,
    ThresholdUp88,
    AerobicCapacityUp95,
    IntervalUp100,
}

impl HrrZone {
    /// Every cut point, in exposure order
    pub const ALL: [HrrZone; 13] = [
        HrrZone::Hrr0,
        HrrZone::Hrr50,
        HrrZone::Hrr60,
        HrrZone::Hrr70,
        HrrZone::Hrr80,
        HrrZone::Hrr90,
        HrrZone::Hrr100,
        HrrZone::RecoveryUp59,
        HrrZone::EasyUp74,
        HrrZone::MarathonUp84,
        HrrZone::ThresholdUp88,
        HrrZone::AerobicCapacityUp95,
        HrrZone::IntervalUp100,
    ];

    /// Named training bands, ordered by upper bound
    pub const BANDS: [HrrZone; 6] = [
        HrrZone::RecoveryUp59,
        HrrZone::EasyUp74,
        HrrZone::MarathonUp84,
        HrrZone::ThresholdUp88,
        HrrZone::AerobicCapacityUp95,
        HrrZone::IntervalUp100,
    ];

    /// Fraction of heart rate reserve
    pub fn fraction(&self) -> Decimal {
        match self {
            HrrZone::Hrr0 => dec!(0.00),
            HrrZone::Hrr50 => dec!(0.50),
            HrrZone::Hrr60 => dec!(0.60),
            HrrZone::Hrr70 => dec!(0.70),
            HrrZone::Hrr80 => dec!(0.80),
            HrrZone::Hrr90 => dec!(0.90),
            HrrZone::Hrr100 => dec!(1.00),
            HrrZone::RecoveryUp59 => dec!(0.59),
            HrrZone::EasyUp74 => dec!(0.74),
            HrrZone::MarathonUp84 => dec!(0.84),
            HrrZone::ThresholdUp88 => dec!(0.88),
            HrrZone::AerobicCapacityUp95 => dec!(0.95),
            HrrZone::IntervalUp100 => dec!(1.00),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HrrZone::Hrr0 => "HRR 0%",
            HrrZone::Hrr50 => "HRR 50%",
            HrrZone::Hrr60 => "HRR 60%",
            HrrZone::Hrr70 => "HRR 70%",
            HrrZone::Hrr80 => "HRR 80%",
            HrrZone::Hrr90 => "HRR 90%",
            HrrZone::Hrr100 => "HRR 100%",
            HrrZone::RecoveryUp59 => "D (<=59%)",
            HrrZone::EasyUp74 => "E (<=74%)",
            HrrZone::MarathonUp84 => "M (<=84%)",
            HrrZone::ThresholdUp88 => "T (<=88%)",
            HrrZone::AerobicCapacityUp95 => "A (<=95%)",
            HrrZone::IntervalUp100 => "I (<=100%)",
        }
    }

    /// Training band containing an intensity (fraction of HRR)
    pub fn classify(intensity: f64) -> HrrZone {
        let intensity = Decimal::from_f64(intensity.clamp(0.0, 1.0)).unwrap_or(Decimal::ZERO);
        Self::BANDS
            .iter()
            .copied()
            .find(|band| intensity <= band.fraction())
            .unwrap_or(HrrZone::IntervalUp100)
    }
}

/// One row of a zone table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneHeartRate {
    pub zone: HrrZone,
    pub fraction: Decimal,
    pub heart_rate: u16,
}

/// Karvonen heart-rate-reserve calculator
///
/// Pure functions of the profile; results must be recomputed whenever the
/// profile's max or rest heart rate changes. The `_for` variants use the max
/// heart rate adjusted to an exercise type, the same max that intensity is
/// measured against while that exercise is active.
pub struct HrrZoneCalculator;

impl HrrZoneCalculator {
    /// Heart rate at a fraction of HRR: rest + pct × (max − rest)
    pub fn hr_at_fraction(profile: &UserProfile, fraction: Decimal) -> u16 {
        Self::karvonen(profile.bio_rest_hr(), Decimal::from(profile.bio_max_hr()), fraction)
    }

    /// Heart rate at a named cut point
    pub fn hr_at(profile: &UserProfile, zone: HrrZone) -> u16 {
        Self::hr_at_fraction(profile, zone.fraction())
    }

    /// Heart rate at a named cut point for an exercise type
    pub fn hr_at_for(
        profile: &UserProfile,
        zone: HrrZone,
        exercise: ExerciseType,
        offsets: &MaxHrOffsets,
    ) -> u16 {
        Self::karvonen(
            profile.bio_rest_hr(),
            Self::exercise_max(profile, exercise, offsets),
            zone.fraction(),
        )
    }

    /// Every cut point for a profile
    pub fn zone_table(profile: &UserProfile) -> Vec<ZoneHeartRate> {
        Self::table(profile.bio_rest_hr(), Decimal::from(profile.bio_max_hr()))
    }

    /// Every cut point for a profile during one exercise type
    pub fn zone_table_for(
        profile: &UserProfile,
        exercise: ExerciseType,
        offsets: &MaxHrOffsets,
    ) -> Vec<ZoneHeartRate> {
        Self::table(profile.bio_rest_hr(), Self::exercise_max(profile, exercise, offsets))
    }

    fn exercise_max(profile: &UserProfile, exercise: ExerciseType, offsets: &MaxHrOffsets) -> Decimal {
        Decimal::from_f64(profile.effective_max_hr(exercise, offsets))
            .unwrap_or_else(|| Decimal::from(profile.bio_max_hr()))
    }

    fn table(rest: u16, max: Decimal) -> Vec<ZoneHeartRate> {
        HrrZone::ALL
            .iter()
            .map(|zone| ZoneHeartRate {
                zone: *zone,
                fraction: zone.fraction(),
                heart_rate: Self::karvonen(rest, max, zone.fraction()),
            })
            .collect()
    }

    fn karvonen(rest_hr: u16, max: Decimal, fraction: Decimal) -> u16 {
        let rest = Decimal::from(rest_hr);
        let fraction = fraction.clamp(Decimal::ZERO, Decimal::ONE);

        let hr = rest + fraction * (max - rest);
        hr.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_u16()
            .unwrap_or(rest_hr)
    }

    /// Fraction of HRR for a heart rate, clamped to [0,1]
    pub fn hrr_fraction(heart_rate: f64, rest_hr: f64, max_hr: f64) -> f64 {
        let reserve = max_hr - rest_hr;
        if reserve <= 0.0 {
            return 0.0;
        }
        ((heart_rate - rest_hr) / reserve).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::UserProfileParams;

    fn profile(rest: i32, max: i32) -> UserProfile {
        UserProfile::from_params(UserProfileParams {
            bio_rest_hr: rest,
            bio_max_hr: max,
            ..Default::default()
        })
    }

    #[test]
    fn test_karvonen_reference_points() {
        let profile = profile(60, 180);
        assert_eq!(HrrZoneCalculator::hr_at(&profile, HrrZone::Hrr0), 60);
        assert_eq!(HrrZoneCalculator::hr_at(&profile, HrrZone::Hrr50), 120);
        assert_eq!(HrrZoneCalculator::hr_at(&profile, HrrZone::Hrr100), 180);
        assert_eq!(HrrZoneCalculator::hr_at(&profile, HrrZone::IntervalUp100), 180);
    }

    #[test]
    fn test_named_bands() {
        let profile = profile(60, 180);
        // 60 + 0.59 × 120 = 130.8 -> 131
        assert_eq!(HrrZoneCalculator::hr_at(&profile, HrrZone::RecoveryUp59), 131);
        // 60 + 0.74 × 120 = 148.8 -> 149
        assert_eq!(HrrZoneCalculator::hr_at(&profile, HrrZone::EasyUp74), 149);
        // 60 + 0.88 × 120 = 165.6 -> 166
        assert_eq!(HrrZoneCalculator::hr_at(&profile, HrrZone::ThresholdUp88), 166);
    }

    #[test]
    fn test_midpoint_rounds_away_from_zero() {
        // 50 + 0.5 × 141 = 120.5 -> 121
        let profile = profile(50, 191);
        assert_eq!(HrrZoneCalculator::hr_at(&profile, HrrZone::Hrr50), 121);
    }

    #[test]
    fn test_zone_table_monotone_in_fraction() {
        let profile = profile(48, 201);
        let mut table = HrrZoneCalculator::zone_table(&profile);
        assert_eq!(table.len(), 13);

        table.sort_by(|a, b| a.fraction.cmp(&b.fraction));
        for pair in table.windows(2) {
            assert!(pair[0].heart_rate <= pair[1].heart_rate);
        }
    }

    #[test]
    fn test_exercise_table_uses_adjusted_max() {
        let profile = profile(60, 180);
        let offsets = MaxHrOffsets::default();
        let bike = HrrZoneCalculator::zone_table_for(&profile, ExerciseType::Bike, &offsets);
        let run = HrrZoneCalculator::zone_table_for(&profile, ExerciseType::Run, &offsets);

        assert_eq!(bike.last().map(|row| row.heart_rate), Some(175));
        assert_eq!(run, HrrZoneCalculator::zone_table(&profile));
        // 60 + 0.5 × 115 = 117.5 -> 118
        assert_eq!(
            HrrZoneCalculator::hr_at_for(&profile, HrrZone::Hrr50, ExerciseType::Bike, &offsets),
            118
        );

        // the band a bike heart rate classifies into contains it in the bike table
        let fraction = HrrZoneCalculator::hrr_fraction(150.0, 60.0, 175.0);
        let zone = HrrZone::classify(fraction);
        assert!(HrrZoneCalculator::hr_at_for(&profile, zone, ExerciseType::Bike, &offsets) >= 150);
    }

    #[test]
    fn test_classify_intensity() {
        assert_eq!(HrrZone::classify(0.2), HrrZone::RecoveryUp59);
        assert_eq!(HrrZone::classify(0.5), HrrZone::RecoveryUp59);
        assert_eq!(HrrZone::classify(0.7), HrrZone::EasyUp74);
        assert_eq!(HrrZone::classify(0.86), HrrZone::ThresholdUp88);
        assert_eq!(HrrZone::classify(0.97), HrrZone::IntervalUp100);
        assert_eq!(HrrZone::classify(3.0), HrrZone::IntervalUp100);
    }

    #[test]
    fn test_hrr_fraction() {
        assert_eq!(HrrZoneCalculator::hrr_fraction(120.0, 60.0, 180.0), 0.5);
        assert_eq!(HrrZoneCalculator::hrr_fraction(40.0, 60.0, 180.0), 0.0);
        assert_eq!(HrrZoneCalculator::hrr_fraction(200.0, 60.0, 180.0), 1.0);
        assert_eq!(HrrZoneCalculator::hrr_fraction(100.0, 60.0, 60.0), 0.0);
    }
}
