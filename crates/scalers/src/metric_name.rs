//! Indexed metric names
//!
//! A scaled workload may carry several scalers watching equivalent backends (two triggers
//! on the same container with different prefixes, say). Each reported metric name is
//! prefixed with `s<scalerIndex>-` so the controller can tell them apart and so a name can
//! be traced back to the trigger that produced it.

use crate::error::ScalerError;
use once_cell::sync::Lazy;
use regex::Regex;

static METRIC_NAME_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[/.:%]").unwrap());

/// Prefix a metric name with the scaler index, e.g. `s0-azure-blob-images`
pub fn generate_metric_name_with_index(scaler_index: usize, metric_name: &str) -> String {
    format!("s{}-{}", scaler_index, metric_name)
}

/// Strip the `s<scalerIndex>-` prefix, checking it belongs to `scaler_index`
pub fn remove_index_from_metric_name(
    scaler_index: usize,
    metric_name: &str,
) -> Result<&str, ScalerError> {
    let (index_prefix, base_name) = metric_name
        .split_once('-')
        .ok_or_else(|| ScalerError::malformed(metric_name, "metric name without index prefix"))?;

    let digits = index_prefix
        .strip_prefix('s')
        .ok_or_else(|| ScalerError::malformed(metric_name, "index prefix must start with 's'"))?;

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ScalerError::malformed(
            metric_name,
            "index prefix is not a scaler index",
        ));
    }

    match digits.parse::<usize>() {
        Ok(index) if index == scaler_index => {}
        _ => {
            return Err(ScalerError::malformed(
                metric_name,
                format!("metric name contains incorrect index prefix, expected s{}", scaler_index),
            ))
        }
    }

    if base_name.is_empty() {
        return Err(ScalerError::malformed(metric_name, "empty metric name after index prefix"));
    }

    Ok(base_name)
}

/// Replace characters the metrics API does not accept in names with `-`
pub fn normalize_metric_name(name: &str) -> String {
    METRIC_NAME_SEPARATORS.replace_all(name, "-").into_owned()
}
