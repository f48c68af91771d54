use crate::metric_target::MetricTargetType;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScalerError {
    #[error("'{metric_type}' metric type is unsupported for external metrics, allowed values are 'Value' or 'AverageValue'")]
    UnsupportedMetricType { metric_type: MetricTargetType },

    #[error("Malformed metric name '{metric_name}': {reason}")]
    MalformedMetricName { metric_name: String, reason: String },

    #[error("No {key} given in trigger metadata")]
    MissingMetadata { key: String },

    #[error("Invalid value for {key}: {message}")]
    InvalidMetadata { key: String, message: String },
}

impl ScalerError {
    pub(crate) fn malformed(metric_name: &str, reason: impl Into<String>) -> Self {
        ScalerError::MalformedMetricName {
            metric_name: metric_name.to_string(),
            reason: reason.into(),
        }
    }
}
