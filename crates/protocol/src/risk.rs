use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Aggregated risk of a tree node.
///
/// On the wire the two sentinels keep the numeric encoding the panels expect:
/// `-1` for [`RiskLevel::NotCalculated`] and `-2` for [`RiskLevel::NotSupported`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum RiskLevel {
    /// Aggregation has not reached this node in the current pass.
    #[default]
    NotCalculated,
    /// The scoring service declined the content (or no descendant was supported).
    NotSupported,
    Value(f64),
}

impl RiskLevel {
    pub const NOT_CALCULATED: f64 = -1.0;
    pub const NOT_SUPPORTED: f64 = -2.0;

    #[must_use]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::NotCalculated => Self::NOT_CALCULATED,
            Self::NotSupported => Self::NOT_SUPPORTED,
            Self::Value(value) => value,
        }
    }

    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn from_f64(raw: f64) -> Self {
        if raw == Self::NOT_CALCULATED {
            Self::NotCalculated
        } else if raw == Self::NOT_SUPPORTED {
            Self::NotSupported
        } else {
            Self::Value(raw)
        }
    }

    #[must_use]
    pub fn value(self) -> Option<f64> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_supported(self) -> bool {
        !matches!(self, Self::NotSupported)
    }
}

impl Serialize for RiskLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for RiskLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        f64::deserialize(deserializer).map(Self::from_f64)
    }
}

/// Rule used to roll file risk up through the directory levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AggregationPolicy {
    #[default]
    Average,
    Median,
    Maximum,
}

impl AggregationPolicy {
    pub const ALL: [Self; 3] = [Self::Average, Self::Median, Self::Maximum];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Average => "Average",
            Self::Median => "Median",
            Self::Maximum => "Maximum",
        }
    }
}

impl fmt::Display for AggregationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePolicyError(pub String);

impl fmt::Display for ParsePolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown aggregation policy '{}' (expected average|median|maximum)",
            self.0
        )
    }
}

impl std::error::Error for ParsePolicyError {}

impl FromStr for AggregationPolicy {
    type Err = ParsePolicyError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "average" | "avg" | "mean" => Ok(Self::Average),
            "median" => Ok(Self::Median),
            "maximum" | "max" => Ok(Self::Maximum),
            _ => Err(ParsePolicyError(raw.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_round_trip_through_numbers() {
        assert_eq!(serde_json::to_string(&RiskLevel::NotSupported).unwrap(), "-2.0");
        assert_eq!(
            serde_json::from_str::<RiskLevel>("-1").unwrap(),
            RiskLevel::NotCalculated
        );
        assert_eq!(
            serde_json::from_str::<RiskLevel>("3.5").unwrap(),
            RiskLevel::Value(3.5)
        );
    }

    #[test]
    fn policy_parses_loosely() {
        assert_eq!("Median".parse(), Ok(AggregationPolicy::Median));
        assert_eq!(" max ".parse(), Ok(AggregationPolicy::Maximum));
        assert_eq!("avg".parse(), Ok(AggregationPolicy::Average));
        assert!("mode".parse::<AggregationPolicy>().is_err());
    }

    #[test]
    fn policy_serializes_with_panel_names() {
        assert_eq!(
            serde_json::to_string(&AggregationPolicy::Maximum).unwrap(),
            "\"Maximum\""
        );
    }
}
