//! Physical activity ingestion and mechanical workload
//!
//! Each accepted sample yields a workload in watts: the measured power when a
//! meter reports one, otherwise an estimate from locomotion cost, gravity on
//! the slope and aerodynamic drag at the local air density.

use crate::coefficients::{ExerciseProfile, ExpenditureCoefficients};
use crate::error::{Result, StaminaError, Stream};
use crate::models::{ActivitySample, ExerciseType};
use crate::profile::UserProfile;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Standard gravity (m/s²)
pub const GRAVITY: f64 = 9.80665;

const SEA_LEVEL_PRESSURE_PA: f64 = 101_325.0;
const DRY_AIR_GAS_CONSTANT: f64 = 287.05;

/// Outcome of one accepted activity sample
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityReading {
    pub time: i64,
    pub exercise: ExerciseType,
    /// Cumulative distance after clamping (km)
    pub distance_km: f64,
    pub speed_kmph: f64,
    /// Mechanical workload (W)
    pub workload_w: f64,
    /// Whether the workload came from a power meter
    pub measured: bool,
}

/// Breakdown of an estimated workload
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkloadEstimate {
    pub locomotion_w: f64,
    pub gravity_w: f64,
    pub drag_w: f64,
}

impl WorkloadEstimate {
    /// Net workload, never negative
    pub fn total(&self) -> f64 {
        (self.locomotion_w + self.gravity_w + self.drag_w).max(0.0)
    }
}

/// Air density (kg/m³) from altitude and temperature via the barometric formula
pub fn air_density(altitude_m: f64, air_temp_c: f64) -> f64 {
    let altitude = altitude_m.clamp(-500.0, 9000.0);
    let temperature_k = air_temp_c.clamp(-60.0, 60.0) + 273.15;
    let pressure = SEA_LEVEL_PRESSURE_PA * (1.0 - 2.255_77e-5 * altitude).powf(5.255_88);
    pressure / (DRY_AIR_GAS_CONSTANT * temperature_k)
}

/// Estimate mechanical workload for an athlete of the given body mass
pub fn estimate_workload(
    sample: &ActivitySample,
    body_mass_kg: f64,
    exercise: &ExerciseProfile,
) -> WorkloadEstimate {
    let mass = body_mass_kg + exercise.equipment_mass_kg;
    let speed = sample.speed_kmph.max(0.0) / 3.6;
    let relative_air = speed + sample.wind_speed_kmph / 3.6;
    let front_area = if sample.front_area_m2 > 0.0 {
        sample.front_area_m2
    } else {
        exercise.default_front_area_m2
    };
    let rho = air_density(sample.altitude_m, sample.air_temp_c);

    WorkloadEstimate {
        locomotion_w: exercise.locomotion_coefficient * mass * GRAVITY * speed,
        gravity_w: mass * GRAVITY * speed * sample.slope_grade_pct / 100.0,
        drag_w: 0.5
            * rho
            * exercise.drag_coefficient
            * front_area
            * relative_air
            * relative_air.abs()
            * speed,
    }
}

/// Activity stream state
#[derive(Debug, Clone, Default)]
pub struct ActivityIngest {
    history: VecDeque<ActivitySample>,
    last_time: Option<i64>,
    last_reading: Option<ActivityReading>,
}

impl ActivityIngest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_time(&self) -> Option<i64> {
        self.last_time
    }

    pub fn last_reading(&self) -> Option<&ActivityReading> {
        self.last_reading.as_ref()
    }

    pub fn history(&self) -> &VecDeque<ActivitySample> {
        &self.history
    }

    /// Cumulative session distance (km)
    pub fn distance_km(&self) -> f64 {
        self.last_reading.as_ref().map_or(0.0, |r| r.distance_km)
    }

    /// Ingest one sample
    ///
    /// Rejects out-of-order timestamps and non-finite fields without touching
    /// state. Negative speed, distance and power clamp to zero; a cumulative
    /// distance below the previous one is held at the previous value.
    pub fn update(
        &mut self,
        sample: ActivitySample,
        profile: &UserProfile,
        coefficients: &ExpenditureCoefficients,
    ) -> Result<ActivityReading> {
        if let Some(last) = self.last_time {
            if sample.time <= last {
                return Err(StaminaError::OutOfOrder {
                    stream: Stream::Activity,
                    time: sample.time,
                    last,
                });
            }
        }
        Self::validate(&sample)?;

        let mut sample = sample;
        sample.speed_kmph = sample.speed_kmph.max(0.0);
        sample.power_w = sample.power_w.max(0.0);
        sample.distance_km = sample.distance_km.max(0.0);

        let previous_distance = self.distance_km();
        if sample.distance_km < previous_distance {
            warn!(
                time = sample.time,
                distance_km = sample.distance_km,
                previous_distance,
                "Cumulative distance went backwards, holding previous value"
            );
            sample.distance_km = previous_distance;
        }

        let (workload_w, measured) = if sample.power_w > 0.0 {
            (sample.power_w, true)
        } else {
            let exercise = coefficients.exercise.get(sample.exercise);
            (estimate_workload(&sample, profile.weight_kg(), exercise).total(), false)
        };

        let reading = ActivityReading {
            time: sample.time,
            exercise: sample.exercise,
            distance_km: sample.distance_km,
            speed_kmph: sample.speed_kmph,
            workload_w,
            measured,
        };

        debug!(
            time = reading.time,
            speed_kmph = reading.speed_kmph,
            workload_w = reading.workload_w,
            measured,
            "Activity sample accepted"
        );

        self.last_time = Some(sample.time);
        self.last_reading = Some(reading.clone());
        self.history.push_back(sample);
        while self.history.len() > profile.max_history_len() {
            self.history.pop_front();
        }

        Ok(reading)
    }

    fn validate(sample: &ActivitySample) -> Result<()> {
        for (field, value) in sample.numeric_fields() {
            if !value.is_finite() {
                return Err(StaminaError::invalid_sample(
                    field,
                    format!("non-finite value {}", value),
                ));
            }
        }
        Ok(())
    }
}
