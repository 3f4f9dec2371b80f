//! Session replay from CSV
//!
//! A replay file interleaves both telemetry streams, one event per row. The
//! `kind` column selects the stream (`hr` or `activity`); every other column
//! is optional and only read for the stream it belongs to.
//!
//! ```text
//! kind,time,heart_rate,quality,rr1,distance_km,speed_kmph,exercise,slope_grade_pct
//! hr,0,128,3,468,,,,
//! activity,0,,,,0.0,10.8,run,1.5
//! ```

use crate::error::{Result, StaminaError};
use crate::logging::log_error;
use crate::models::{ActivitySample, ExerciseType, HeartRateSample, SensorPosition, RR_SLOTS};
use crate::user::{MetricsSnapshot, User};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum EventKind {
    Hr,
    Activity,
}

#[derive(Debug, Deserialize)]
struct ReplayRow {
    kind: EventKind,
    time: i64,
    #[serde(default)]
    heart_rate: Option<u16>,
    #[serde(default)]
    quality: Option<u8>,
    #[serde(default)]
    position: Option<i32>,
    #[serde(default)]
    device_brand: Option<i32>,
    #[serde(default)]
    rr1: Option<u16>,
    #[serde(default)]
    rr2: Option<u16>,
    #[serde(default)]
    rr3: Option<u16>,
    #[serde(default)]
    rr4: Option<u16>,
    #[serde(default)]
    rr5: Option<u16>,
    #[serde(default)]
    rr6: Option<u16>,
    #[serde(default)]
    distance_km: Option<f64>,
    #[serde(default)]
    speed_kmph: Option<f64>,
    #[serde(default)]
    exercise: Option<ExerciseType>,
    #[serde(default)]
    front_area_m2: Option<f64>,
    #[serde(default)]
    slope_grade_pct: Option<f64>,
    #[serde(default)]
    wind_speed_kmph: Option<f64>,
    #[serde(default)]
    air_temp_c: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    altitude_m: Option<f64>,
    #[serde(default)]
    power_w: Option<f64>,
    #[serde(default)]
    cadence: Option<f64>,
}

impl ReplayRow {
    fn into_event(self, line: usize) -> Result<ReplayEvent> {
        match self.kind {
            EventKind::Hr => {
                let heart_rate = self.heart_rate.ok_or_else(|| {
                    StaminaError::invalid_sample("heart_rate", format!("missing on row {}", line))
                })?;
                let rr: [u16; RR_SLOTS] = [self.rr1, self.rr2, self.rr3, self.rr4, self.rr5, self.rr6]
                    .map(|rr| rr.unwrap_or(0));
                let mut sample = HeartRateSample::new(self.time, heart_rate, self.quality.unwrap_or(3))
                    .with_rr_intervals(&rr);
                sample.position = self.position.map_or(SensorPosition::Chest, SensorPosition::from_code);
                sample.device_brand = self.device_brand.unwrap_or(0);
                Ok(ReplayEvent::HeartRate(sample))
            }
            EventKind::Activity => {
                let speed = self.speed_kmph.ok_or_else(|| {
                    StaminaError::invalid_sample("speed_kmph", format!("missing on row {}", line))
                })?;
                let mut sample = ActivitySample::new(
                    self.time,
                    self.distance_km.unwrap_or(0.0),
                    speed,
                    self.exercise.unwrap_or(ExerciseType::Run),
                );
                sample.front_area_m2 = self.front_area_m2.unwrap_or(0.0);
                sample.slope_grade_pct = self.slope_grade_pct.unwrap_or(0.0);
                sample.wind_speed_kmph = self.wind_speed_kmph.unwrap_or(0.0);
                sample.air_temp_c = self.air_temp_c.unwrap_or(sample.air_temp_c);
                sample.longitude = self.longitude.unwrap_or(0.0);
                sample.latitude = self.latitude.unwrap_or(0.0);
                sample.altitude_m = self.altitude_m.unwrap_or(0.0);
                sample.power_w = self.power_w.unwrap_or(0.0);
                sample.cadence = self.cadence.unwrap_or(0.0);
                Ok(ReplayEvent::Activity(sample))
            }
        }
    }
}

/// One telemetry event
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayEvent {
    HeartRate(HeartRateSample),
    Activity(ActivitySample),
}

impl ReplayEvent {
    pub fn time(&self) -> i64 {
        match self {
            ReplayEvent::HeartRate(sample) => sample.time,
            ReplayEvent::Activity(sample) => sample.time,
        }
    }
}

/// Engine state sampled during a replay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TracePoint {
    pub time: i64,
    pub stamina: f64,
    pub anaerobic_fraction: f64,
    pub lactate: f64,
    pub total_kcal: f64,
    pub intensity: f64,
}

/// Outcome of a replay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplaySummary {
    pub events: usize,
    pub accepted_heart_rate: usize,
    pub accepted_activity: usize,
    pub rejected_out_of_order: usize,
    pub rejected_invalid: usize,
    pub first_time: Option<i64>,
    pub last_time: Option<i64>,
    pub trace: Vec<TracePoint>,
    pub metrics: MetricsSnapshot,
}

impl ReplaySummary {
    pub fn accepted(&self) -> usize {
        self.accepted_heart_rate + self.accepted_activity
    }

    pub fn rejected(&self) -> usize {
        self.rejected_out_of_order + self.rejected_invalid
    }
}

/// Parsed replay file
#[derive(Debug, Clone, Default)]
pub struct SessionReplay {
    events: Vec<ReplayEvent>,
}

impl SessionReplay {
    pub fn new(events: Vec<ReplayEvent>) -> Self {
        Self { events }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        let replay = Self::from_reader(file)?;
        info!(
            path = %path.as_ref().display(),
            events = replay.events.len(),
            "Replay loaded"
        );
        Ok(replay)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut events = Vec::new();
        for (index, row) in csv_reader.deserialize::<ReplayRow>().enumerate() {
            // header is line 1
            events.push(row?.into_event(index + 2)?);
        }
        Ok(Self { events })
    }

    pub fn events(&self) -> &[ReplayEvent] {
        &self.events
    }

    /// Feed every event to the user in file order
    pub fn run(&self, user: &mut User) -> ReplaySummary {
        self.run_traced(user, None)
    }

    /// Replay, recording a trace point whenever `interval_secs` has elapsed
    pub fn run_traced(&self, user: &mut User, interval_secs: Option<i64>) -> ReplaySummary {
        let mut summary = ReplaySummary {
            events: self.events.len(),
            accepted_heart_rate: 0,
            accepted_activity: 0,
            rejected_out_of_order: 0,
            rejected_invalid: 0,
            first_time: None,
            last_time: None,
            trace: Vec::new(),
            metrics: user.snapshot(),
        };
        let mut next_trace: Option<i64> = None;

        for event in &self.events {
            let result = match event {
                ReplayEvent::HeartRate(sample) => user.update_heart_rate(sample.clone()).map(|_| true),
                ReplayEvent::Activity(sample) => user.update_physical_status(sample.clone()).map(|_| false),
            };

            match result {
                Ok(heart_rate) => {
                    if heart_rate {
                        summary.accepted_heart_rate += 1;
                    } else {
                        summary.accepted_activity += 1;
                    }
                    let time = event.time();
                    summary.first_time.get_or_insert(time);
                    summary.last_time = Some(time);

                    if let Some(interval) = interval_secs {
                        if next_trace.map_or(true, |next| time >= next) {
                            summary.trace.push(TracePoint {
                                time,
                                stamina: user.stamina(),
                                anaerobic_fraction: user.anaerobic_fraction(),
                                lactate: user.lactate(),
                                total_kcal: user.session_total_kcal(),
                                intensity: user.intensity(),
                            });
                            next_trace = Some(time + interval.max(1));
                        }
                    }
                }
                Err(StaminaError::OutOfOrder { .. }) => summary.rejected_out_of_order += 1,
                Err(error) => {
                    log_error(&error, "Replay event rejected");
                    summary.rejected_invalid += 1;
                }
            }
        }

        summary.metrics = user.snapshot();
        info!(
            accepted = summary.accepted(),
            rejected = summary.rejected(),
            stamina = summary.metrics.stamina,
            total_kcal = summary.metrics.session_total_kcal,
            "Replay finished"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SESSION: &str = "\
kind,time,heart_rate,quality,rr1,rr2,distance_km,speed_kmph,exercise,slope_grade_pct
hr,0,120,3,,,,,,
activity,0,,,,,0.0,10.0,run,0
hr,1,125,3,480,482,,,,
activity,1,,,,,0.003,10.0,run,0
hr,1,126,3,,,,,,
activity,2,,,,,0.006,10.0,bike,2.5
";

    #[test]
    fn test_parse_mixed_streams() {
        let replay = SessionReplay::from_reader(SESSION.as_bytes()).unwrap();
        assert_eq!(replay.events().len(), 6);

        match &replay.events()[2] {
            ReplayEvent::HeartRate(sample) => {
                assert_eq!(sample.heart_rate, 125);
                assert_eq!(sample.rr_intervals_ms[..2], [480, 482]);
            }
            other => panic!("unexpected event {:?}", other),
        }
        match &replay.events()[5] {
            ReplayEvent::Activity(sample) => {
                assert_eq!(sample.exercise, ExerciseType::Bike);
                assert_eq!(sample.slope_grade_pct, 2.5);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_run_counts_rejections() {
        let replay = SessionReplay::from_reader(SESSION.as_bytes()).unwrap();
        let mut user = User::new();
        let summary = replay.run(&mut user);

        assert_eq!(summary.accepted(), 5);
        assert_eq!(summary.rejected_out_of_order, 1);
        assert_eq!(summary.first_time, Some(0));
        assert_eq!(summary.last_time, Some(2));
        assert!(summary.metrics.session_total_kcal > 0.0);
    }

    #[test]
    fn test_missing_heart_rate_is_an_error() {
        let csv = "kind,time,heart_rate\nhr,0,\n";
        let err = SessionReplay::from_reader(csv.as_bytes()).unwrap_err();
        assert_eq!(err.status_code(), 2);
    }

    #[test]
    fn test_trace_interval() {
        let mut events = Vec::new();
        for t in 0..100 {
            events.push(ReplayEvent::HeartRate(HeartRateSample::new(t, 140, 3)));
        }
        let summary = SessionReplay::new(events).run_traced(&mut User::new(), Some(30));
        let times: Vec<i64> = summary.trace.iter().map(|p| p.time).collect();
        assert_eq!(times, vec![0, 30, 60, 90]);
    }
}
