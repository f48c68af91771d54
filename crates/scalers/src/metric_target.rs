//! Metric target resolution and construction
//!
//! The controller accepts two target types for external metrics: `Value` compares the raw
//! reading against the target, `AverageValue` divides it across the current replicas first.
//! `Utilization` only exists for resource metrics and is rejected at scaler setup.

use crate::config::ScalerConfig;
use crate::error::ScalerError;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Metric target type as written in a scaler configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricTargetType {
    Utilization,
    Value,
    AverageValue,
}

impl MetricTargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricTargetType::Utilization => "Utilization",
            MetricTargetType::Value => "Value",
            MetricTargetType::AverageValue => "AverageValue",
        }
    }
}

impl fmt::Display for MetricTargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricTargetType {
    type Err = ScalerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Utilization" => Ok(MetricTargetType::Utilization),
            "Value" => Ok(MetricTargetType::Value),
            "AverageValue" => Ok(MetricTargetType::AverageValue),
            other => Err(ScalerError::InvalidMetadata {
                key: "metricType".to_string(),
                message: format!(
                    "unknown metric type '{}', expected 'Value', 'AverageValue' or 'Utilization'",
                    other
                ),
            }),
        }
    }
}

/// Target type accepted for external metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExternalTargetType {
    Value,
    AverageValue,
}

impl From<ExternalTargetType> for MetricTargetType {
    fn from(target_type: ExternalTargetType) -> Self {
        match target_type {
            ExternalTargetType::Value => MetricTargetType::Value,
            ExternalTargetType::AverageValue => MetricTargetType::AverageValue,
        }
    }
}

impl fmt::Display for ExternalTargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        MetricTargetType::from(*self).fmt(f)
    }
}

/// Integer quantity in decimal SI notation, serialized as a string the way the
/// controller expects quantities on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quantity(i64);

impl Quantity {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Reported metric target. Exactly one payload exists and it always matches the type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum MetricTarget {
    Value {
        value: Quantity,
    },
    AverageValue {
        #[serde(rename = "averageValue")]
        average_value: Quantity,
    },
}

impl MetricTarget {
    pub fn target_type(&self) -> ExternalTargetType {
        match self {
            MetricTarget::Value { .. } => ExternalTargetType::Value,
            MetricTarget::AverageValue { .. } => ExternalTargetType::AverageValue,
        }
    }

    pub fn value(&self) -> Option<Quantity> {
        match self {
            MetricTarget::Value { value } => Some(*value),
            MetricTarget::AverageValue { .. } => None,
        }
    }

    pub fn average_value(&self) -> Option<Quantity> {
        match self {
            MetricTarget::AverageValue { average_value } => Some(*average_value),
            MetricTarget::Value { .. } => None,
        }
    }
}

/// Resolve the configured metric type, defaulting to `AverageValue` when unset
pub fn get_metric_target_type(config: &ScalerConfig) -> Result<ExternalTargetType, ScalerError> {
    match config.metric_type {
        None | Some(MetricTargetType::AverageValue) => Ok(ExternalTargetType::AverageValue),
        Some(MetricTargetType::Value) => Ok(ExternalTargetType::Value),
        Some(MetricTargetType::Utilization) => Err(ScalerError::UnsupportedMetricType {
            metric_type: MetricTargetType::Utilization,
        }),
    }
}

/// Wrap a reading into the metric target for the resolved type
pub fn get_metric_target(metric_type: ExternalTargetType, metric_value: i64) -> MetricTarget {
    let quantity = Quantity::new(metric_value);
    match metric_type {
        ExternalTargetType::AverageValue => MetricTarget::AverageValue {
            average_value: quantity,
        },
        ExternalTargetType::Value => MetricTarget::Value { value: quantity },
    }
}
