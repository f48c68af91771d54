use scalers::{
    generate_metric_name_with_index, get_metric_target, get_metric_target_type,
    remove_index_from_metric_name, ExternalTargetType, MetricTargetType, ScalerConfig,
    ScalerError,
};
use serde_json::json;

#[test]
fn test_every_supported_preference_resolves() {
    let cases = [
        (None, ExternalTargetType::AverageValue),
        (
            Some(MetricTargetType::AverageValue),
            ExternalTargetType::AverageValue,
        ),
        (Some(MetricTargetType::Value), ExternalTargetType::Value),
    ];

    for (metric_type, expected) in cases {
        let config = ScalerConfig {
            metric_type,
            ..Default::default()
        };
        assert_eq!(get_metric_target_type(&config).unwrap(), expected);
    }
}

#[test]
fn test_utilization_error_names_alternatives() {
    let config = ScalerConfig {
        metric_type: Some(MetricTargetType::Utilization),
        ..Default::default()
    };

    let err = get_metric_target_type(&config).unwrap_err();
    assert!(matches!(err, ScalerError::UnsupportedMetricType { .. }));

    let message = err.to_string();
    assert!(message.contains("'Utilization'"));
    assert!(message.contains("'Value' or 'AverageValue'"));
}

#[test]
fn test_metric_target_wire_shape() {
    let average = get_metric_target(ExternalTargetType::AverageValue, 10);
    assert_eq!(
        serde_json::to_value(average).unwrap(),
        json!({"type": "AverageValue", "averageValue": "10"})
    );

    let value = get_metric_target(ExternalTargetType::Value, 20);
    assert_eq!(
        serde_json::to_value(value).unwrap(),
        json!({"type": "Value", "value": "20"})
    );
}

#[test]
fn test_index_prefix_matches_only_its_own_index() {
    for index in [0usize, 1, 9, 10, 123] {
        let name = generate_metric_name_with_index(index, "azure-blob-my-container");
        assert_eq!(
            remove_index_from_metric_name(index, &name).unwrap(),
            "azure-blob-my-container"
        );

        for other in [0usize, 1, 9, 10, 123] {
            if other != index {
                assert!(
                    remove_index_from_metric_name(other, &name).is_err(),
                    "index {} must not accept {}",
                    other,
                    name
                );
            }
        }
    }
}

#[test]
fn test_malformed_names_are_rejected() {
    for name in ["metricName", "0-metricName", "x0-metricName", "s0x-metricName"] {
        let err = remove_index_from_metric_name(0, name).unwrap_err();
        assert!(
            matches!(err, ScalerError::MalformedMetricName { .. }),
            "expected malformed name error for {}",
            name
        );
    }
}
