use crate::error::{Result, StaminaError, Stream};

/// Merged session clock shared by the heart rate and activity streams
///
/// A stream sample is accepted only when it is strictly newer than the last
/// sample of its own stream and not older than the last sample of any stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionTimeline {
    last: Option<i64>,
}

impl SessionTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last accepted timestamp across both streams
    pub fn last(&self) -> Option<i64> {
        self.last
    }

    /// Check a timestamp against both ordering rules without mutating anything
    pub fn check(&self, stream: Stream, time: i64, stream_last: Option<i64>) -> Result<()> {
        if let Some(last) = stream_last {
            if time <= last {
                return Err(StaminaError::OutOfOrder { stream, time, last });
            }
        }
        if let Some(last) = self.last {
            if time < last {
                return Err(StaminaError::OutOfOrder { stream, time, last });
            }
        }
        Ok(())
    }

    pub fn advance(&mut self, time: i64) {
        self.last = Some(self.last.map_or(time, |last| last.max(time)));
    }
}
