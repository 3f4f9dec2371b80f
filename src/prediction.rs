//! Forward-looking pace, distance and endurance predictions
//!
//! Two linear pace→intensity fits are maintained from moving samples that
//! carry both a speed and a heart-rate intensity: one over the whole session
//! (running sums) and one over the most recent window. For each fit the model
//! solves for
//!
//! - the fastest pace holdable at the current aerobic threshold, and
//! - the pace that exhausts the current stamina exactly at the prediction
//!   horizon,
//!
//! then projects distance and time to exhaustion by simulating a clone of the
//! energy system at those intensities. Solvers are plain bisection with a
//! fixed iteration budget; when a bracket holds no root the closer bound is
//! reported with `converged = false`.

use crate::activity::ActivityReading;
use crate::coefficients::{KineticsCoefficients, PredictionCoefficients};
use crate::energy_system::EnergySystemModel;
use crate::vdot;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

/// One moving sample pairing speed with physiological cost
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BurnPoint {
    pub time: i64,
    pub speed_kmph: f64,
    /// Fraction of heart rate reserve
    pub intensity: f64,
    pub kcal_per_min: f64,
}

/// Result of a bisection search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverResult {
    pub value: f64,
    pub converged: bool,
    pub iterations: u32,
}

/// Find a root of a monotone function on `[lo, hi]`
///
/// Returns the bound with the smaller residual (not converged) when both ends
/// share a sign.
pub fn bisect<F>(mut f: F, lo: f64, hi: f64, max_iterations: u32, tolerance: f64) -> SolverResult
where
    F: FnMut(f64) -> f64,
{
    let (mut lo, mut hi) = (lo.min(hi), lo.max(hi));
    let mut f_lo = f(lo);
    let f_hi = f(hi);

    if f_lo == 0.0 {
        return SolverResult { value: lo, converged: true, iterations: 0 };
    }
    if f_hi == 0.0 {
        return SolverResult { value: hi, converged: true, iterations: 0 };
    }
    if f_lo.signum() == f_hi.signum() || !f_lo.is_finite() || !f_hi.is_finite() {
        let value = if f_lo.abs() <= f_hi.abs() { lo } else { hi };
        return SolverResult { value, converged: false, iterations: 0 };
    }

    for iteration in 1..=max_iterations {
        let mid = 0.5 * (lo + hi);
        let f_mid = f(mid);
        if f_mid == 0.0 || 0.5 * (hi - lo) < tolerance {
            return SolverResult { value: mid, converged: true, iterations: iteration };
        }
        if f_mid.signum() == f_lo.signum() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }

    SolverResult {
        value: 0.5 * (lo + hi),
        converged: false,
        iterations: max_iterations,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct RegressionSums {
    n: usize,
    sum_x: f64,
    sum_y: f64,
    sum_xx: f64,
    sum_xy: f64,
}

impl RegressionSums {
    fn add(&mut self, x: f64, y: f64) {
        self.n += 1;
        self.sum_x += x;
        self.sum_y += y;
        self.sum_xx += x * x;
        self.sum_xy += x * y;
    }

    /// Least-squares `(intercept, slope)`
    fn fit(&self, min_points: usize) -> Option<(f64, f64)> {
        if self.n < min_points {
            return None;
        }
        let n = self.n as f64;
        let denominator = n * self.sum_xx - self.sum_x * self.sum_x;
        if denominator.abs() <= 1e-4 {
            return None;
        }
        let slope = (n * self.sum_xy - self.sum_x * self.sum_y) / denominator;
        let intercept = (self.sum_y - slope * self.sum_x) / n;
        Some((intercept, slope))
    }
}

/// Linear pace→intensity relation: `intensity = intercept + slope × speed`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaceFit {
    pub intercept: f64,
    pub slope: f64,
    pub points: usize,
    /// True when the fit is the `speed / default_max_speed` fallback
    pub fallback: bool,
}

impl PaceFit {
    pub fn fallback(default_max_speed_kmph: f64) -> Self {
        Self {
            intercept: 0.0,
            slope: 1.0 / default_max_speed_kmph,
            points: 0,
            fallback: true,
        }
    }

    fn from_sums(sums: &RegressionSums, min_points: usize, default_max_speed_kmph: f64) -> Self {
        match sums.fit(min_points) {
            Some((intercept, slope)) if slope > 0.0 => Self {
                intercept,
                slope,
                points: sums.n,
                fallback: false,
            },
            _ => Self::fallback(default_max_speed_kmph),
        }
    }

    pub fn intensity_at(&self, speed_kmph: f64) -> f64 {
        self.intercept + self.slope * speed_kmph
    }

    /// Speed producing an intensity, never negative
    pub fn speed_at(&self, intensity: f64) -> f64 {
        ((intensity - self.intercept) / self.slope).max(0.0)
    }
}

/// Predictions derived from one pace fit
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PacePrediction {
    /// Fastest speed holdable at the aerobic threshold (km/h)
    pub max_conti_speed_kmph: f64,
    /// Its pace (min/km), 0 when no moving speed is predicted
    pub max_conti_pace_min_per_km: f64,
    pub max_conti_dist_km: f64,
    /// Time the max-continuous pace can be held (s), capped at the projection limit
    pub max_conti_time_secs: f64,
    /// Intensity exhausting current stamina at the horizon
    pub stamina_left_intensity: f64,
    pub stamina_left_speed_kmph: f64,
    pub stamina_left_pace_min_per_km: f64,
    pub stamina_left_dist_km: f64,
    pub stamina_left_time_secs: f64,
    /// Whether both pace solvers converged
    pub converged: bool,
}

/// Pace and distance forecasting state
#[derive(Debug, Clone, Default)]
pub struct PredictiveEnduranceModel {
    window: VecDeque<BurnPoint>,
    session_sums: RegressionSums,
    session: PacePrediction,
    last_window: PacePrediction,
    threshold_intensity: f64,
    pseudo_vdot: f64,
    session_vdot: f64,
    burn_time: Option<i64>,
    dist_time: Option<i64>,
    start_distance_km: Option<f64>,
    session_distance_km: f64,
    active_secs: f64,
    last_activity: Option<(i64, f64)>,
}

pub fn pace_min_per_km(speed_kmph: f64, min_speed_kmph: f64) -> f64 {
    if speed_kmph >= min_speed_kmph {
        60.0 / speed_kmph
    } else {
        0.0
    }
}

impl PredictiveEnduranceModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whole-session prediction ("avg" pace)
    pub fn session(&self) -> &PacePrediction {
        &self.session
    }

    /// Last-window prediction ("last" pace)
    pub fn last_window(&self) -> &PacePrediction {
        &self.last_window
    }

    pub fn pseudo_vdot(&self) -> f64 {
        self.pseudo_vdot
    }

    pub fn session_vdot(&self) -> f64 {
        self.session_vdot
    }

    /// When pace predictions were last refreshed
    pub fn burn_time(&self) -> Option<i64> {
        self.burn_time
    }

    /// When distance projections were last refreshed
    pub fn dist_time(&self) -> Option<i64> {
        self.dist_time
    }

    pub fn session_distance_km(&self) -> f64 {
        self.session_distance_km
    }

    /// Seconds spent moving faster than the minimum speed
    pub fn active_secs(&self) -> f64 {
        self.active_secs
    }

    pub fn window(&self) -> &VecDeque<BurnPoint> {
        &self.window
    }

    pub fn session_fit(&self, coefficients: &PredictionCoefficients, default_max_speed_kmph: f64) -> PaceFit {
        PaceFit::from_sums(&self.session_sums, coefficients.min_fit_points, default_max_speed_kmph)
    }

    pub fn window_fit(&self, coefficients: &PredictionCoefficients, default_max_speed_kmph: f64) -> PaceFit {
        let mut sums = RegressionSums::default();
        for point in &self.window {
            sums.add(point.speed_kmph, point.intensity);
        }
        PaceFit::from_sums(&sums, coefficients.min_fit_points, default_max_speed_kmph)
    }

    /// Track session distance and moving time from an accepted activity sample
    pub fn record_activity(
        &mut self,
        reading: &ActivityReading,
        coefficients: &PredictionCoefficients,
        max_gap_secs: i64,
    ) {
        if let Some((time, speed)) = self.last_activity {
            if speed >= coefficients.min_speed_kmph {
                self.active_secs += (reading.time - time).clamp(0, max_gap_secs) as f64;
            }
        }
        let start = *self.start_distance_km.get_or_insert(reading.distance_km);
        self.session_distance_km = (reading.distance_km - start).max(0.0);
        self.last_activity = Some((reading.time, reading.speed_kmph));
    }

    /// Add a point to both pace fits; slow or idle points are ignored
    pub fn record_burn(&mut self, point: BurnPoint, coefficients: &PredictionCoefficients) -> bool {
        if point.speed_kmph < coefficients.min_speed_kmph || point.intensity <= 0.0 {
            return false;
        }
        self.session_sums.add(point.speed_kmph, point.intensity);
        self.window.push_back(point);
        while self.window.len() > coefficients.window_points {
            self.window.pop_front();
        }
        true
    }

    /// Refresh whatever is older than its interval; returns whether anything changed
    pub fn refresh(
        &mut self,
        now: i64,
        system: &EnergySystemModel,
        kinetics: &KineticsCoefficients,
        coefficients: &PredictionCoefficients,
        default_max_speed_kmph: f64,
    ) -> bool {
        let pace_due = self
            .burn_time
            .map_or(true, |t| now - t >= coefficients.refresh_interval_secs);
        let dist_due = self
            .dist_time
            .map_or(true, |t| now - t >= coefficients.distance_refresh_interval_secs);
        if !pace_due && !dist_due {
            return false;
        }

        let session_fit = self.session_fit(coefficients, default_max_speed_kmph);
        let window_fit = self.window_fit(coefficients, default_max_speed_kmph);

        if pace_due {
            self.threshold_intensity = system.threshold(kinetics);
            self.session = solve_paces(&session_fit, &self.session, system, kinetics, coefficients);
            self.last_window =
                solve_paces(&window_fit, &self.last_window, system, kinetics, coefficients);
            self.session_vdot = vdot::vdot(self.session_distance_km * 1000.0, self.active_secs / 60.0)
                .unwrap_or(0.0);
            self.burn_time = Some(now);
        }

        if dist_due {
            let threshold = self.threshold_intensity;
            project_distances(&mut self.session, threshold, system, kinetics, coefficients);
            project_distances(&mut self.last_window, threshold, system, kinetics, coefficients);
            self.pseudo_vdot = if self.last_activity.is_some() {
                vdot::vdot_from_speed(
                    self.last_window.stamina_left_speed_kmph,
                    self.last_window.stamina_left_time_secs,
                )
                .unwrap_or(0.0)
            } else {
                0.0
            };
            self.dist_time = Some(now);
        }

        debug!(
            now,
            pace_due,
            dist_due,
            avg_pace = self.session.max_conti_pace_min_per_km,
            last_pace = self.last_window.max_conti_pace_min_per_km,
            converged = self.session.converged && self.last_window.converged,
            "Predictions refreshed"
        );
        true
    }
}

/// Solve both paces; projected times carry over from `previous` until the
/// next distance refresh, with distances rescaled to the new speeds
fn solve_paces(
    fit: &PaceFit,
    previous: &PacePrediction,
    system: &EnergySystemModel,
    kinetics: &KineticsCoefficients,
    coefficients: &PredictionCoefficients,
) -> PacePrediction {
    let threshold = system.threshold(kinetics);
    let top_speed = fit.speed_at(1.0).max(coefficients.min_speed_kmph);

    let max_conti = bisect(
        |speed| fit.intensity_at(speed) - threshold,
        0.0,
        top_speed,
        coefficients.solver_max_iterations,
        coefficients.solver_tolerance,
    );

    // Exhaustion time minus horizon; positive while stamina outlasts it
    let horizon = coefficients.horizon_secs;
    let step = coefficients.simulation_step_secs;
    let stamina_left = bisect(
        |intensity| match system.time_to_exhaustion(intensity, step, horizon + step, kinetics) {
            Some(secs) => secs - horizon,
            None => step,
        },
        threshold,
        1.0,
        coefficients.solver_max_iterations,
        coefficients.solver_tolerance,
    );

    let max_conti_speed = max_conti.value;
    let stamina_left_speed = fit.speed_at(stamina_left.value);

    PacePrediction {
        max_conti_speed_kmph: max_conti_speed,
        max_conti_pace_min_per_km: pace_min_per_km(max_conti_speed, coefficients.min_speed_kmph),
        stamina_left_intensity: stamina_left.value,
        stamina_left_speed_kmph: stamina_left_speed,
        stamina_left_pace_min_per_km: pace_min_per_km(stamina_left_speed, coefficients.min_speed_kmph),
        max_conti_time_secs: previous.max_conti_time_secs,
        max_conti_dist_km: max_conti_speed * previous.max_conti_time_secs / 3600.0,
        stamina_left_time_secs: previous.stamina_left_time_secs,
        stamina_left_dist_km: stamina_left_speed * previous.stamina_left_time_secs / 3600.0,
        converged: max_conti.converged && stamina_left.converged,
    }
}

fn project_distances(
    prediction: &mut PacePrediction,
    threshold: f64,
    system: &EnergySystemModel,
    kinetics: &KineticsCoefficients,
    coefficients: &PredictionCoefficients,
) {
    let step = coefficients.simulation_step_secs;
    let cap = coefficients.max_projection_secs;

    prediction.max_conti_time_secs = system
        .time_to_exhaustion(threshold, step, cap, kinetics)
        .unwrap_or(cap);
    prediction.max_conti_dist_km =
        prediction.max_conti_speed_kmph * prediction.max_conti_time_secs / 3600.0;

    prediction.stamina_left_time_secs = system
        .time_to_exhaustion(prediction.stamina_left_intensity, step, cap, kinetics)
        .unwrap_or(cap);
    prediction.stamina_left_dist_km =
        prediction.stamina_left_speed_kmph * prediction.stamina_left_time_secs / 3600.0;
}
