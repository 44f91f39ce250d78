//! CF-convention time axes: numeric offsets with a `"<unit> since <epoch>"`
//! units attribute.

use chrono::{Duration, NaiveDate, NaiveDateTime};

const EPOCH_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeStep {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeStep {
    fn millis(&self) -> f64 {
        match self {
            TimeStep::Seconds => 1_000.0,
            TimeStep::Minutes => 60_000.0,
            TimeStep::Hours => 3_600_000.0,
            TimeStep::Days => 86_400_000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeUnits {
    pub step: TimeStep,
    pub epoch: NaiveDateTime,
}

impl TimeUnits {
    /// Parses e.g. `"hours since 1900-01-01 00:00:00"` or `"days since 2000-1-1"`.
    /// Offsets are decoded on the proleptic Gregorian calendar.
    pub fn parse(units: &str) -> Option<Self> {
        let (step, epoch) = units.trim().split_once(" since ")?;
        let step = match step.trim().to_lowercase().as_str() {
            "seconds" | "second" | "secs" | "sec" | "s" => TimeStep::Seconds,
            "minutes" | "minute" | "mins" | "min" => TimeStep::Minutes,
            "hours" | "hour" | "hrs" | "hr" | "h" => TimeStep::Hours,
            "days" | "day" | "d" => TimeStep::Days,
            _ => return None,
        };
        Some(TimeUnits {
            step,
            epoch: parse_epoch(epoch)?,
        })
    }

    pub fn decode(&self, offset: f64) -> Option<NaiveDateTime> {
        let millis = (offset * self.step.millis()).round();
        if !millis.is_finite() || millis.abs() > i64::MAX as f64 {
            return None;
        }
        self.epoch
            .checked_add_signed(Duration::try_milliseconds(millis as i64)?)
    }

    /// Decodes every offset, failing if any one is out of range.
    pub fn decode_all(&self, offsets: &[f64]) -> Option<Vec<NaiveDateTime>> {
        offsets.iter().map(|o| self.decode(*o)).collect()
    }
}

fn parse_epoch(text: &str) -> Option<NaiveDateTime> {
    let text = text
        .trim()
        .trim_end_matches(" UTC")
        .trim_end_matches('Z')
        .trim_end_matches(" +00:00");
    EPOCH_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

// -- Tests -------------------------------------------------------------------
