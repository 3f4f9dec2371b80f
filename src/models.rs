use serde::{Deserialize, Serialize};

/// Biological sex used by anthropometric BMR equations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Female,
    Male,
}

impl Gender {
    /// Host encoding: 0 = female, anything else = male
    pub fn from_code(code: i32) -> Self {
        if code == 0 {
            Gender::Female
        } else {
            Gender::Male
        }
    }
}

/// Sport a biological max heart rate was measured under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SportType {
    Running,
    Cycling,
    Swimming,
    Other,
}

impl SportType {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => SportType::Running,
            1 => SportType::Cycling,
            2 => SportType::Swimming,
            _ => SportType::Other,
        }
    }
}

/// Exercise type tag carried by activity samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseType {
    Run,
    Walk,
    Bike,
    Other,
}

impl ExerciseType {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => ExerciseType::Run,
            1 => ExerciseType::Walk,
            2 => ExerciseType::Bike,
            _ => ExerciseType::Other,
        }
    }

    /// Sport family used for max heart rate offsets
    pub fn sport(&self) -> SportType {
        match self {
            ExerciseType::Run | ExerciseType::Walk => SportType::Running,
            ExerciseType::Bike => SportType::Cycling,
            ExerciseType::Other => SportType::Other,
        }
    }
}

impl std::str::FromStr for ExerciseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "run" | "running" => Ok(ExerciseType::Run),
            "walk" | "walking" | "hike" => Ok(ExerciseType::Walk),
            "bike" | "cycling" | "ride" => Ok(ExerciseType::Bike),
            "other" => Ok(ExerciseType::Other),
            _ => Err(format!("Invalid exercise type: {}", s)),
        }
    }
}

/// Where the heart rate sensor is worn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorPosition {
    Chest,
    Wrist,
    Arm,
    Unknown,
}

impl SensorPosition {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => SensorPosition::Chest,
            1 => SensorPosition::Wrist,
            2 => SensorPosition::Arm,
            _ => SensorPosition::Unknown,
        }
    }
}

/// Number of beat-to-beat interval slots per heart rate sample
pub const RR_SLOTS: usize = 6;

/// One heart rate reading from an optical or ECG sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartRateSample {
    /// Seconds since session start (or epoch)
    pub time: i64,

    /// Heart rate in beats per minute
    pub heart_rate: u16,

    /// Reading reliability reported by the device (higher is better)
    pub quality: u8,

    /// Sensor position
    pub position: SensorPosition,

    /// Opaque device brand identifier
    pub device_brand: i32,

    /// Beat-to-beat intervals in milliseconds, 0 = absent
    pub rr_intervals_ms: [u16; RR_SLOTS],
}

impl HeartRateSample {
    /// Sample with no R-R data
    pub fn new(time: i64, heart_rate: u16, quality: u8) -> Self {
        Self {
            time,
            heart_rate,
            quality,
            position: SensorPosition::Chest,
            device_brand: 0,
            rr_intervals_ms: [0; RR_SLOTS],
        }
    }

    pub fn with_rr_intervals(mut self, rr: &[u16]) -> Self {
        for (slot, value) in self.rr_intervals_ms.iter_mut().zip(rr.iter()) {
            *slot = *value;
        }
        self
    }

    /// Present (non-zero) R-R intervals
    pub fn rr_present(&self) -> impl Iterator<Item = u16> + '_ {
        self.rr_intervals_ms.iter().copied().filter(|rr| *rr > 0)
    }
}

/// One physical-activity reading from GPS, speed or power sensors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySample {
    /// Seconds since session start (or epoch)
    pub time: i64,

    /// Cumulative session distance in kilometers
    pub distance_km: f64,

    /// Instantaneous speed in km/h
    pub speed_kmph: f64,

    /// Exercise type, selects the workload formula coefficients
    pub exercise: ExerciseType,

    /// Frontal area in m², 0 = use the exercise default
    pub front_area_m2: f64,

    /// Slope grade in percent (5.0 = 5 % uphill)
    pub slope_grade_pct: f64,

    /// Wind speed in km/h, positive = headwind
    pub wind_speed_kmph: f64,

    /// Air temperature in °C
    pub air_temp_c: f64,

    pub longitude: f64,
    pub latitude: f64,

    /// Altitude in meters above sea level
    pub altitude_m: f64,

    /// Measured power in watts, 0 = not measured
    pub power_w: f64,

    /// Cadence (steps or revolutions per minute), 0 = not measured
    pub cadence: f64,
}

impl ActivitySample {
    /// Flat, windless sample at 15 °C with no power meter
    pub fn new(time: i64, distance_km: f64, speed_kmph: f64, exercise: ExerciseType) -> Self {
        Self {
            time,
            distance_km,
            speed_kmph,
            exercise,
            front_area_m2: 0.0,
            slope_grade_pct: 0.0,
            wind_speed_kmph: 0.0,
            air_temp_c: 15.0,
            longitude: 0.0,
            latitude: 0.0,
            altitude_m: 0.0,
            power_w: 0.0,
            cadence: 0.0,
        }
    }

    pub fn with_power(mut self, power_w: f64) -> Self {
        self.power_w = power_w;
        self
    }

    pub fn with_slope(mut self, slope_grade_pct: f64) -> Self {
        self.slope_grade_pct = slope_grade_pct;
        self
    }

    pub fn with_wind(mut self, wind_speed_kmph: f64) -> Self {
        self.wind_speed_kmph = wind_speed_kmph;
        self
    }

    /// Named numeric fields, used for finiteness validation
    pub(crate) fn numeric_fields(&self) -> [(&'static str, f64); 12] {
        [
            ("distance_km", self.distance_km),
            ("speed_kmph", self.speed_kmph),
            ("front_area_m2", self.front_area_m2),
            ("slope_grade_pct", self.slope_grade_pct),
            ("wind_speed_kmph", self.wind_speed_kmph),
            ("air_temp_c", self.air_temp_c),
            ("longitude", self.longitude),
            ("latitude", self.latitude),
            ("altitude_m", self.altitude_m),
            ("power_w", self.power_w),
            ("cadence", self.cadence),
            ("time", self.time as f64),
        ]
    }
}
