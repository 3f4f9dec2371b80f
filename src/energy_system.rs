//! Aerobic/anaerobic energy system kinetics
//!
//! The model tracks remaining stamina, the aerobic threshold (as a fraction of
//! heart rate reserve), the aerobic/anaerobic supply split and blood lactate.
//! Intensity relative to the current threshold selects one of three regimes:
//!
//! - **Recovering** below `threshold × recovery_ratio`: stamina and base
//!   capacity regenerate, the split and lactate relax toward baseline
//! - **AerobicSteady** up to the threshold: stamina drains slowly
//! - **AnaerobicOverdraft** above the threshold: stamina drains fast and
//!   lactate accumulates
//!
//! The threshold itself sinks as stamina is spent. Exponential terms are
//! integrated exactly per sub-step so long steps stay stable.

use crate::coefficients::KineticsCoefficients;
use crate::profile::UserProfile;
use crate::zones::HrrZone;
use serde::{Deserialize, Serialize};
use tracing::trace;

const SECONDS_PER_HOUR: f64 = 3600.0;
const SECONDS_PER_MINUTE: f64 = 60.0;
const EPSILON: f64 = 1e-9;

/// Energy supply regime for an intensity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExertionRegime {
    Recovering,
    AerobicSteady,
    AnaerobicOverdraft,
}

impl std::fmt::Display for ExertionRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExertionRegime::Recovering => write!(f, "recovering"),
            ExertionRegime::AerobicSteady => write!(f, "aerobic steady"),
            ExertionRegime::AnaerobicOverdraft => write!(f, "anaerobic overdraft"),
        }
    }
}

/// Per-user energy system state
#[derive(Debug, Clone, PartialEq)]
pub struct EnergySystemModel {
    stamina: f64,
    base_capacity: f64,
    total_capacity: f64,
    anaerobic_baseline: f64,
    anaerobic: f64,
    lactate: f64,
    accumulated_lactate: f64,
    cleared_lactate: f64,
    profile_grade: u8,
    intensity: f64,
    last_time: Option<i64>,
}

impl EnergySystemModel {
    /// Fresh state from profile capacities
    pub fn new(profile: &UserProfile, kinetics: &KineticsCoefficients) -> Self {
        Self {
            stamina: 1.0,
            base_capacity: profile.aerobic_capacity(),
            total_capacity: profile.aerobic_total_capacity(),
            anaerobic_baseline: profile.anaerobic_fraction(),
            anaerobic: profile.anaerobic_fraction(),
            lactate: kinetics.lactate_baseline,
            accumulated_lactate: 0.0,
            cleared_lactate: 0.0,
            profile_grade: profile.la_dilution_grade().min(kinetics.max_dilution_grade),
            intensity: 0.0,
            last_time: None,
        }
    }

    /// Re-read static capacities after a profile change, keeping dynamic state
    pub fn apply_profile(&mut self, profile: &UserProfile, kinetics: &KineticsCoefficients) {
        self.total_capacity = profile.aerobic_total_capacity();
        self.base_capacity = self.base_capacity.min(self.total_capacity);
        self.profile_grade = profile.la_dilution_grade().min(kinetics.max_dilution_grade);
    }

    /// Remaining stamina fraction
    pub fn stamina(&self) -> f64 {
        self.stamina
    }

    pub fn anaerobic_fraction(&self) -> f64 {
        self.anaerobic
    }

    pub fn aerobic_fraction(&self) -> f64 {
        1.0 - self.anaerobic
    }

    pub fn anaerobic_baseline(&self) -> f64 {
        self.anaerobic_baseline
    }

    /// Fresh aerobic threshold (fraction of HRR)
    pub fn total_capacity(&self) -> f64 {
        self.total_capacity
    }

    /// Aerobic threshold before stamina fatigue
    pub fn base_capacity(&self) -> f64 {
        self.base_capacity
    }

    /// Current aerobic threshold (fraction of HRR)
    pub fn threshold(&self, kinetics: &KineticsCoefficients) -> f64 {
        self.base_capacity * (1.0 - kinetics.capacity_decay * (1.0 - self.stamina))
    }

    /// Blood lactate (mmol/L)
    pub fn lactate(&self) -> f64 {
        self.lactate
    }

    /// Lactate dilution grade, derived from the clearance ratio once enough lactate has been produced
    pub fn dilution_grade(&self, kinetics: &KineticsCoefficients) -> u8 {
        if self.accumulated_lactate <= kinetics.dilution_epsilon {
            return self.profile_grade;
        }
        let ratio = (self.cleared_lactate / self.accumulated_lactate).clamp(0.0, 1.0);
        (f64::from(kinetics.max_dilution_grade) * ratio).round() as u8
    }

    /// Intensity held until the next sample
    pub fn intensity(&self) -> f64 {
        self.intensity
    }

    pub fn last_time(&self) -> Option<i64> {
        self.last_time
    }

    pub fn regime(&self, kinetics: &KineticsCoefficients) -> ExertionRegime {
        self.regime_at(self.intensity, kinetics)
    }

    /// Regime an intensity would fall into under the current threshold
    pub fn regime_at(&self, intensity: f64, kinetics: &KineticsCoefficients) -> ExertionRegime {
        let threshold = self.threshold(kinetics);
        if intensity < threshold * kinetics.recovery_ratio {
            ExertionRegime::Recovering
        } else if intensity <= threshold {
            ExertionRegime::AerobicSteady
        } else {
            ExertionRegime::AnaerobicOverdraft
        }
    }

    /// Training band of the held intensity
    pub fn zone(&self) -> HrrZone {
        HrrZone::classify(self.intensity)
    }

    pub fn set_intensity(&mut self, intensity: f64) {
        self.intensity = intensity.clamp(0.0, 1.0);
    }

    /// Integrate from the last update to `now` at the held intensity
    ///
    /// Only the first `max_gap_secs` are spent at the held intensity; the rest
    /// of a longer gap is treated as rest.
    pub fn advance(&mut self, now: i64, max_gap_secs: i64, kinetics: &KineticsCoefficients) {
        let Some(last) = self.last_time else {
            self.last_time = Some(now);
            return;
        };
        if now <= last {
            return;
        }

        let elapsed = now - last;
        let active = elapsed.min(max_gap_secs);
        self.integrate(self.intensity, active as f64, kinetics);
        if elapsed > active {
            self.integrate(0.0, (elapsed - active) as f64, kinetics);
        }
        self.last_time = Some(now);

        trace!(
            now,
            stamina = self.stamina,
            anaerobic = self.anaerobic,
            lactate = self.lactate,
            "Energy system advanced"
        );
    }

    /// Integrate a constant intensity over a duration using bounded sub-steps
    pub fn integrate(&mut self, intensity: f64, duration_secs: f64, kinetics: &KineticsCoefficients) {
        let intensity = intensity.clamp(0.0, 1.0);
        let mut remaining = duration_secs.max(0.0);
        while remaining > EPSILON {
            let dt = remaining.min(kinetics.max_step_secs);
            self.step(intensity, dt, kinetics);
            remaining -= dt;
        }
    }

    /// Seconds until stamina is exhausted at a constant intensity, `None` if it
    /// lasts beyond `max_secs`
    pub fn time_to_exhaustion(
        &self,
        intensity: f64,
        step_secs: f64,
        max_secs: f64,
        kinetics: &KineticsCoefficients,
    ) -> Option<f64> {
        if self.stamina <= 0.0 {
            return Some(0.0);
        }
        let mut trial = self.clone();
        let mut elapsed = 0.0;
        while elapsed < max_secs {
            let dt = step_secs.min(max_secs - elapsed);
            trial.integrate(intensity, dt, kinetics);
            elapsed += dt;
            if trial.stamina <= 0.0 {
                return Some(elapsed);
            }
        }
        None
    }

    /// Move the anaerobic baseline, shifting the live split by the same amount
    pub fn shift_anaerobic_baseline(&mut self, baseline: f64) -> f64 {
        let baseline = baseline.clamp(0.0, 1.0);
        let delta = baseline - self.anaerobic_baseline;
        self.anaerobic_baseline = baseline;
        self.anaerobic = (self.anaerobic + delta).clamp(0.0, 1.0);
        delta
    }

    fn step(&mut self, intensity: f64, dt: f64, kinetics: &KineticsCoefficients) {
        let threshold = self.threshold(kinetics);
        let recovery_ceiling = threshold * kinetics.recovery_ratio;
        let regime = self.regime_at(intensity, kinetics);

        let overdraft = if regime == ExertionRegime::AnaerobicOverdraft {
            let headroom = 1.0 - threshold;
            if headroom > EPSILON {
                ((intensity - threshold) / headroom).clamp(0.0, 1.0)
            } else {
                1.0
            }
        } else {
            0.0
        };

        // Stamina
        let stamina_rate_per_hour = match regime {
            ExertionRegime::Recovering => {
                kinetics.recovery_per_hour * (1.0 - intensity / recovery_ceiling)
            }
            ExertionRegime::AerobicSteady => {
                let band = threshold - recovery_ceiling;
                let depth = if band > EPSILON {
                    ((intensity - recovery_ceiling) / band).clamp(0.0, 1.0)
                } else {
                    1.0
                };
                -kinetics.aerobic_drain_per_hour * depth
            }
            ExertionRegime::AnaerobicOverdraft => {
                -(kinetics.aerobic_drain_per_hour
                    + kinetics.overdraft_drain_per_hour * overdraft.powf(kinetics.overdraft_exponent))
            }
        };
        self.stamina = (self.stamina + stamina_rate_per_hour * dt / SECONDS_PER_HOUR).clamp(0.0, 1.0);

        // Base capacity regenerates only while recovering
        if regime == ExertionRegime::Recovering {
            let relax = 1.0 - (-dt / kinetics.capacity_recovery_tau_secs).exp();
            self.base_capacity += (self.total_capacity - self.base_capacity) * relax;
        }

        // Supply split
        let target = if regime == ExertionRegime::AnaerobicOverdraft {
            self.anaerobic_baseline + (1.0 - self.anaerobic_baseline) * overdraft
        } else {
            self.anaerobic_baseline
        };
        let decay = (-dt / kinetics.split_tau_secs).exp();
        self.anaerobic = (target + (self.anaerobic - target) * decay).clamp(0.0, 1.0);

        // Lactate
        let grade = f64::from(self.dilution_grade(kinetics));
        let clearance =
            kinetics.lactate_clearance_per_min * (1.0 + grade * kinetics.clearance_grade_step)
                / SECONDS_PER_MINUTE;
        let source = kinetics.lactate_accumulation_per_min * overdraft / SECONDS_PER_MINUTE;
        let equilibrium = kinetics.lactate_baseline + source / clearance;
        let previous = self.lactate;
        let next = equilibrium + (previous - equilibrium) * (-clearance * dt).exp();
        self.lactate = next.clamp(0.0, kinetics.lactate_max);

        let produced = source * dt;
        self.accumulated_lactate += produced;
        self.cleared_lactate += (produced - (self.lactate - previous)).max(0.0);
    }
}
