//! Heart rate ingestion and intensity estimation
//!
//! Turns raw heart rate samples into a fraction of heart rate reserve. Samples
//! below the quality gate (or with an implausible rate) are kept in the
//! history but never drive intensity. When a sample carries beat-to-beat
//! intervals and enough clean ones are buffered, the heart rate used for
//! intensity is derived from them instead of the device's point estimate.
//! Buffered beats expire after `rr_stale_secs` of sample time, and a run of
//! rejected beats resets the buffer so a sustained rhythm change is followed.

use crate::coefficients::IngestCoefficients;
use crate::error::{Result, StaminaError, Stream};
use crate::models::{ExerciseType, HeartRateSample};
use crate::profile::UserProfile;
use crate::zones::HrrZoneCalculator;
use statrs::statistics::{Data, Median, Statistics};
use std::collections::VecDeque;
use tracing::{debug, trace};

const MIN_RR_MS: u16 = 300;
const MAX_RR_MS: u16 = 2000;

/// Outcome of one accepted heart rate sample
#[derive(Debug, Clone, PartialEq)]
pub struct HeartRateReading {
    pub time: i64,
    /// Heart rate used for intensity (bpm), R-R derived when available
    pub heart_rate: f64,
    /// Fraction of heart rate reserve, `None` for unreliable samples
    pub intensity: Option<f64>,
    pub from_rr: bool,
}

impl HeartRateReading {
    pub fn is_reliable(&self) -> bool {
        self.intensity.is_some()
    }
}

/// Heart rate stream state
#[derive(Debug, Clone, Default)]
pub struct HeartRateIngest {
    history: VecDeque<HeartRateSample>,
    rr_buffer: VecDeque<f64>,
    /// Time of the last sample that carried R-R intervals
    last_rr_time: Option<i64>,
    /// Consecutive beats rejected as artifacts
    rr_rejections: usize,
    last_time: Option<i64>,
    last_reliable: Option<HeartRateReading>,
}

impl HeartRateIngest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timestamp of the last accepted sample, reliable or not
    pub fn last_time(&self) -> Option<i64> {
        self.last_time
    }

    /// Most recent sample that passed the quality gate
    pub fn last_reliable(&self) -> Option<&HeartRateReading> {
        self.last_reliable.as_ref()
    }

    pub fn history(&self) -> &VecDeque<HeartRateSample> {
        &self.history
    }

    /// Buffered clean R-R intervals in milliseconds
    pub fn rr_intervals(&self) -> impl Iterator<Item = f64> + '_ {
        self.rr_buffer.iter().copied()
    }

    /// Root mean square of successive R-R differences, ms
    pub fn rmssd_ms(&self) -> Option<f64> {
        if self.rr_buffer.len() < 2 {
            return None;
        }
        let squared: Vec<f64> = self
            .rr_buffer
            .iter()
            .zip(self.rr_buffer.iter().skip(1))
            .map(|(a, b)| (b - a).powi(2))
            .collect();
        Some(squared.iter().mean().sqrt())
    }

    /// Ingest one sample
    ///
    /// Fails with [`StaminaError::OutOfOrder`] when the sample is not newer
    /// than the last one on this stream; nothing is mutated in that case.
    pub fn update(
        &mut self,
        sample: HeartRateSample,
        exercise: ExerciseType,
        profile: &UserProfile,
        coefficients: &IngestCoefficients,
    ) -> Result<HeartRateReading> {
        if let Some(last) = self.last_time {
            if sample.time <= last {
                return Err(StaminaError::OutOfOrder {
                    stream: Stream::HeartRate,
                    time: sample.time,
                    last,
                });
            }
        }

        let plausible = (coefficients.min_valid_hr..=coefficients.max_valid_hr)
            .contains(&sample.heart_rate);
        let reliable = plausible && sample.quality >= coefficients.min_heart_rate_quality;

        let mut reading = HeartRateReading {
            time: sample.time,
            heart_rate: f64::from(sample.heart_rate),
            intensity: None,
            from_rr: false,
        };

        if reliable {
            if sample.rr_present().next().is_some() {
                if let Some(last_rr) = self.last_rr_time {
                    if sample.time - last_rr > coefficients.rr_stale_secs {
                        debug!(time = sample.time, last_rr, "R-R buffer stale, cleared");
                        self.clear_rr();
                    }
                }
                for rr in sample.rr_present() {
                    self.push_rr(rr, coefficients);
                }
                self.last_rr_time = Some(sample.time);

                if self.rr_buffer.len() >= coefficients.rr_min_beats {
                    let mean_rr = self.rr_buffer.iter().mean();
                    if mean_rr > 0.0 {
                        reading.heart_rate = 60_000.0 / mean_rr;
                        reading.from_rr = true;
                    }
                }
            }

            let max_hr = profile.effective_max_hr(exercise, &coefficients.max_hr_offsets);
            reading.intensity = Some(HrrZoneCalculator::hrr_fraction(
                reading.heart_rate,
                f64::from(profile.bio_rest_hr()),
                max_hr,
            ));
            self.last_reliable = Some(reading.clone());
        } else {
            debug!(
                time = sample.time,
                heart_rate = sample.heart_rate,
                quality = sample.quality,
                "Heart rate sample below quality gate, kept for history only"
            );
        }

        self.last_time = Some(sample.time);
        self.history.push_back(sample);
        while self.history.len() > profile.max_history_len() {
            self.history.pop_front();
        }

        Ok(reading)
    }

    fn push_rr(&mut self, rr: u16, coefficients: &IngestCoefficients) {
        if !(MIN_RR_MS..=MAX_RR_MS).contains(&rr) {
            trace!(rr, "R-R interval outside physiological range");
            return;
        }
        let rr = f64::from(rr);

        if self.rr_buffer.len() >= coefficients.rr_min_beats {
            let median = Data::new(self.rr_buffer.iter().copied().collect::<Vec<f64>>()).median();
            if (rr - median).abs() > coefficients.rr_artifact_tolerance * median {
                self.rr_rejections += 1;
                if self.rr_rejections < coefficients.rr_max_consecutive_artifacts {
                    trace!(rr, median, "R-R artifact rejected");
                    return;
                }
                debug!(rr, median, "Sustained R-R rhythm change, buffer reset");
                self.clear_rr();
            } else {
                self.rr_rejections = 0;
            }
        }

        self.rr_buffer.push_back(rr);
        while self.rr_buffer.len() > coefficients.rr_buffer_len {
            self.rr_buffer.pop_front();
        }
    }

    fn clear_rr(&mut self) {
        self.rr_buffer.clear();
        self.rr_rejections = 0;
    }
}
