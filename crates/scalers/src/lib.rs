//! Shared scaler helpers - translate scaler configuration into external metric terms
//!
//! Every backend scaler reports its reading to the cluster autoscaling controller as an
//! external metric. This crate holds the pieces all of them share: resolving the
//! configured metric target type, wrapping a reading into a metric target, and the
//! `s<index>-<name>` metric naming scheme that keeps several scalers on one workload apart.

pub mod config;
pub mod error;
pub mod metric_name;
pub mod metric_target;

pub use config::ScalerConfig;
pub use error::ScalerError;
pub use metric_name::{
    generate_metric_name_with_index, normalize_metric_name, remove_index_from_metric_name,
};
pub use metric_target::{
    get_metric_target, get_metric_target_type, ExternalTargetType, MetricTarget,
    MetricTargetType, Quantity,
};
