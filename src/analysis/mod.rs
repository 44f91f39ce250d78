//! Resolution, coverage, consistency and quality analyzers.
//!
//! Every analyzer takes a read-only [`DatasetHandle`](crate::dataset::DatasetHandle)
//! and returns a plain value; none of them fail. A missing axis is an
//! [`Verdict::Undefined`] outcome, not an error.

pub mod coverage;
pub mod quality;
pub mod spatial;
pub mod tabular;
pub mod temporal;

use serde::{Deserialize, Serialize, Serializer};

pub use coverage::{check_date_coverage, check_spatial_bounds, BoundingBox, DatePeriod};
pub use quality::{analyze_quality, OutlierMethod, QualityOptions, VariableQuality};
pub use spatial::{analyze_spatial, SpatialSummary};
pub use tabular::{analyze_table, TableSummary};
pub use temporal::{analyze_temporal, ResolutionPolicy, TemporalSummary};

/// Relative tolerance used when comparing coordinate steps.
pub const RELATIVE_TOLERANCE: f64 = 1e-5;
/// Absolute tolerance used when comparing coordinate steps.
pub const ABSOLUTE_TOLERANCE: f64 = 1e-8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Outcome of a consistency check.
pub enum Verdict {
    Consistent,
    Inconsistent,
    /// The axis the check needs is absent or too short.
    #[default]
    Undefined,
}

impl Verdict {
    pub fn from_bool(consistent: bool) -> Self {
        if consistent {
            Verdict::Consistent
        } else {
            Verdict::Inconsistent
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Verdict::Consistent => Some(true),
            Verdict::Inconsistent => Some(false),
            Verdict::Undefined => None,
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Consistent => f.write_str("true"),
            Verdict::Inconsistent => f.write_str("false"),
            Verdict::Undefined => f.write_str("undefined"),
        }
    }
}

// Serialised as `true`, `false` or `null` so the field is always present.
impl Serialize for Verdict {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_bool().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Verdict {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<bool>::deserialize(deserializer)?;
        Ok(value.map_or(Verdict::Undefined, Verdict::from_bool))
    }
}

/// `|a - b| <= atol + rtol * |b|`, the same test as numpy's `allclose`.
pub fn is_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= ABSOLUTE_TOLERANCE + RELATIVE_TOLERANCE * b.abs()
}

/// True when every value is close to `target`. NaN is never close.
pub fn all_close(values: &[f64], target: f64) -> bool {
    values.iter().all(|v| is_close(*v, target))
}

/// Differences between neighbouring samples.
pub fn adjacent_differences(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

// -- Tests -------------------------------------------------------------------
