//! KEDA `ScaledObject` custom resource.
//!
//! Only the fields minikeda sets are modelled; KEDA fills in the rest.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ManifestError;
use crate::workload::WorkloadSpec;

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, PartialEq, JsonSchema)]
#[kube(
    group = "keda.sh",
    version = "v1alpha1",
    kind = "ScaledObject",
    plural = "scaledobjects",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ScaledObjectSpec {
    pub scale_target_ref: ScaleTargetRef,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_replica_count: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_replica_count: Option<i32>,

    pub triggers: Vec<ScaleTrigger>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct ScaleTargetRef {
    pub name: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct ScaleTrigger {
    #[serde(rename = "type")]
    pub trigger_type: String,

    pub metadata: BTreeMap<String, String>,
}

/// Autoscaling parameters for a workload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalingSpec {
    /// KEDA scaler type, e.g. `cpu` or `memory`.
    pub trigger: String,

    /// Target value passed to the scaler as `metadata.value`.
    pub threshold: u32,

    pub min_replicas: Option<i32>,
    pub max_replicas: Option<i32>,
}

impl Default for ScalingSpec {
    fn default() -> Self {
        Self {
            trigger: "cpu".to_string(),
            threshold: 50,
            min_replicas: None,
            max_replicas: None,
        }
    }
}

impl ScalingSpec {
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.trigger.trim().is_empty() {
            return Err(ManifestError::InvalidScaling(
                "trigger type cannot be empty".to_string(),
            ));
        }
        if self.threshold == 0 {
            return Err(ManifestError::InvalidScaling(
                "threshold must be greater than zero".to_string(),
            ));
        }
        if let Some(min) = self.min_replicas {
            if min < 0 {
                return Err(ManifestError::InvalidScaling(format!(
                    "min replicas must be non-negative, got {min}"
                )));
            }
        }
        if let Some(max) = self.max_replicas {
            if max < 1 {
                return Err(ManifestError::InvalidScaling(format!(
                    "max replicas must be at least 1, got {max}"
                )));
            }
        }
        if let (Some(min), Some(max)) = (self.min_replicas, self.max_replicas) {
            if min > max {
                return Err(ManifestError::InvalidScaling(format!(
                    "min replicas {min} exceeds max replicas {max}"
                )));
            }
        }
        Ok(())
    }
}

/// Name of the ScaledObject attached to a workload.
pub fn scaled_object_name(workload: &str) -> String {
    format!("{workload}-scaledobject")
}

/// Build the ScaledObject that autoscales the workload's deployment.
pub fn build_scaled_object(
    spec: &WorkloadSpec,
    scaling: &ScalingSpec,
) -> Result<ScaledObject, ManifestError> {
    spec.validate()?;
    scaling.validate()?;

    let trigger = ScaleTrigger {
        trigger_type: scaling.trigger.clone(),
        metadata: BTreeMap::from([("value".to_string(), scaling.threshold.to_string())]),
    };

    Ok(ScaledObject {
        metadata: ObjectMeta {
            name: Some(scaled_object_name(&spec.name)),
            namespace: Some(spec.namespace.clone()),
            ..Default::default()
        },
        spec: ScaledObjectSpec {
            scale_target_ref: ScaleTargetRef {
                name: spec.name.clone(),
            },
            min_replica_count: scaling.min_replicas,
            max_replica_count: scaling.max_replicas,
            triggers: vec![trigger],
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::Resource;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn scaled_object_targets_deployment() {
        let spec = WorkloadSpec::new("example-deployment", "nginx:latest");
        let so = build_scaled_object(&spec, &ScalingSpec::default()).unwrap();
        let value = serde_json::to_value(&so).unwrap();

        assert_eq!(
            value,
            json!({
                "apiVersion": "keda.sh/v1alpha1",
                "kind": "ScaledObject",
                "metadata": {
                    "name": "example-deployment-scaledobject",
                    "namespace": "default"
                },
                "spec": {
                    "scaleTargetRef": { "name": "example-deployment" },
                    "triggers": [{ "type": "cpu", "metadata": { "value": "50" } }]
                }
            })
        );
    }

    #[test]
    fn replica_bounds_are_serialized_when_set() {
        let spec = WorkloadSpec::new("web", "nginx");
        let scaling = ScalingSpec {
            min_replicas: Some(1),
            max_replicas: Some(5),
            ..ScalingSpec::default()
        };
        let value = serde_json::to_value(build_scaled_object(&spec, &scaling).unwrap()).unwrap();
        assert_eq!(value["spec"]["minReplicaCount"], 1);
        assert_eq!(value["spec"]["maxReplicaCount"], 5);
    }

    #[test]
    fn resource_metadata_matches_keda_crd() {
        assert_eq!(ScaledObject::group(&()), "keda.sh");
        assert_eq!(ScaledObject::version(&()), "v1alpha1");
        assert_eq!(ScaledObject::plural(&()), "scaledobjects");
    }

    #[test]
    fn zero_threshold_is_rejected() {
        let spec = WorkloadSpec::new("web", "nginx");
        let scaling = ScalingSpec {
            threshold: 0,
            ..ScalingSpec::default()
        };
        assert!(matches!(
            build_scaled_object(&spec, &scaling),
            Err(ManifestError::InvalidScaling(_))
        ));
    }

    #[rstest]
    #[case(None, Some(0))]
    #[case(None, Some(-2))]
    #[case(Some(-1), None)]
    #[case(Some(4), Some(2))]
    fn bad_replica_bounds_are_rejected(#[case] min: Option<i32>, #[case] max: Option<i32>) {
        let scaling = ScalingSpec {
            min_replicas: min,
            max_replicas: max,
            ..ScalingSpec::default()
        };
        assert!(matches!(
            scaling.validate(),
            Err(ManifestError::InvalidScaling(_))
        ));
    }

    #[rstest]
    #[case(Some(0), Some(1))]
    #[case(None, Some(10))]
    #[case(Some(2), None)]
    fn sane_replica_bounds_are_accepted(#[case] min: Option<i32>, #[case] max: Option<i32>) {
        let scaling = ScalingSpec {
            min_replicas: min,
            max_replicas: max,
            ..ScalingSpec::default()
        };
        assert_eq!(scaling.validate(), Ok(()));
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let scaling = ScalingSpec {
            min_replicas: Some(4),
            max_replicas: Some(2),
            ..ScalingSpec::default()
        };
        assert!(scaling.validate().is_err());
    }
}
