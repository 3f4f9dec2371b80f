//! Daniels–Gilbert VDOT
//!
//! VDOT is the VO2max implied by holding a velocity for a duration:
//! oxygen cost of the velocity divided by the fraction of VO2max sustainable
//! for that long.

/// Shortest effort the fraction-of-max curve is trusted for (minutes)
pub const MIN_DURATION_MIN: f64 = 3.5;

/// Oxygen cost of running at a velocity (m/min), ml/kg/min
pub fn oxygen_cost(velocity_m_per_min: f64) -> f64 {
    -4.60 + 0.182_258 * velocity_m_per_min + 0.000_104 * velocity_m_per_min.powi(2)
}

/// Fraction of VO2max sustainable for a duration (minutes)
pub fn fraction_of_max(duration_min: f64) -> f64 {
    0.8 + 0.189_439_3 * (-0.012_778 * duration_min).exp()
        + 0.298_955_8 * (-0.193_260_5 * duration_min).exp()
}

/// VDOT for covering a distance in a duration
pub fn vdot(distance_m: f64, duration_min: f64) -> Option<f64> {
    if !(distance_m > 0.0 && duration_min >= MIN_DURATION_MIN) {
        return None;
    }
    let cost = oxygen_cost(distance_m / duration_min);
    if cost <= 0.0 {
        return None;
    }
    Some(cost / fraction_of_max(duration_min))
}

/// VDOT for holding a speed (km/h) for a duration (s)
pub fn vdot_from_speed(speed_kmph: f64, duration_secs: f64) -> Option<f64> {
    let duration_min = duration_secs / 60.0;
    vdot(speed_kmph * 1000.0 / 60.0 * duration_min, duration_min)
}
