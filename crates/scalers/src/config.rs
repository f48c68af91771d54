//! Scaler configuration handed to every backend scaler

use crate::error::ScalerError;
use crate::metric_target::MetricTargetType;
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Configuration for one scaler instance, already validated by the controller
#[derive(Debug, Clone, Default)]
pub struct ScalerConfig {
    /// Name of the scaled object the trigger belongs to
    pub scalable_object_name: String,

    /// Namespace of the scaled object
    pub scalable_object_namespace: String,

    /// Raw trigger metadata (`blobContainerName`, `blobPrefix`, ...)
    pub trigger_metadata: HashMap<String, String>,

    /// Environment of the scale target's containers, used for `*FromEnv` lookups
    pub resolved_env: HashMap<String, String>,

    /// Parameters resolved from trigger authentication
    pub auth_params: HashMap<String, String>,

    /// Timeout applied to outbound HTTP calls
    pub global_http_timeout: Option<Duration>,

    /// Position of this scaler among the scaled object's triggers
    pub scaler_index: usize,

    /// Configured metric target type, `None` when unset
    pub metric_type: Option<MetricTargetType>,
}

impl ScalerConfig {
    /// Trimmed trigger metadata value, `None` when absent or blank
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.trigger_metadata
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn required_metadata(&self, key: &str) -> Result<&str, ScalerError> {
        self.metadata(key).ok_or_else(|| ScalerError::MissingMetadata {
            key: key.to_string(),
        })
    }

    /// Parse a metadata value, falling back to `default` when it is not set
    pub fn parse_metadata<T>(&self, key: &str, default: T) -> Result<T, ScalerError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.metadata(key) {
            Some(raw) => raw.parse().map_err(|e: T::Err| ScalerError::InvalidMetadata {
                key: key.to_string(),
                message: e.to_string(),
            }),
            None => {
                debug!(key = %key, "Metadata not set, using default");
                Ok(default)
            }
        }
    }

    /// Resolve `<key>FromEnv` against the scale target's environment
    pub fn metadata_from_env(&self, key: &str) -> Option<&str> {
        let env_name = self.metadata(&format!("{}FromEnv", key))?;
        self.resolved_env
            .get(env_name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Look up a value in auth params first, then through `<key>FromEnv`
    pub fn auth_param_or_env(&self, auth_key: &str, metadata_key: &str) -> Option<&str> {
        self.auth_params
            .get(auth_key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
            .or_else(|| self.metadata_from_env(metadata_key))
    }
}
