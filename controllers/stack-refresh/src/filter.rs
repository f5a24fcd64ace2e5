//! Target-pod predicate.
//!
//! Decides whether a watched pod belongs to the IDE server deployment this
//! controller cares about. This is the only relevance gate; phase and
//! readiness are evaluated downstream by the controller.

use crate::snapshot::PodSnapshot;

/// Identity label OpenShift deployment configs stamp onto their pods.
pub const DEPLOYMENT_LABEL: &str = "deploymentconfig";

/// Returns true iff the snapshot carries `deploymentconfig == app_name`.
pub fn is_app_pod(snapshot: &PodSnapshot, app_name: &str) -> bool {
    snapshot
        .labels
        .get(DEPLOYMENT_LABEL)
        .is_some_and(|v| v == app_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::PodPhase;
    use std::collections::BTreeMap;

    fn snapshot_with_labels(labels: &[(&str, &str)]) -> PodSnapshot {
        PodSnapshot {
            namespace: "eclipse-che".to_string(),
            name: "che-1-abcde".to_string(),
            labels: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            phase: PodPhase::Pending,
            pod_ip: None,
            containers: Vec::new(),
        }
    }

    #[test]
    fn test_matching_label() {
        let snap = snapshot_with_labels(&[("deploymentconfig", "che"), ("app", "che")]);
        assert!(is_app_pod(&snap, "che"));
    }

    #[test]
    fn test_wrong_value() {
        let snap = snapshot_with_labels(&[("deploymentconfig", "keycloak")]);
        assert!(!is_app_pod(&snap, "che"));
    }

    #[test]
    fn test_missing_label() {
        let snap = snapshot_with_labels(&[("app", "che")]);
        assert!(!is_app_pod(&snap, "che"));
    }

    #[test]
    fn test_no_labels_at_all() {
        let mut snap = snapshot_with_labels(&[]);
        snap.labels = BTreeMap::new();
        assert!(!is_app_pod(&snap, "che"));
    }

    #[test]
    fn test_does_not_gate_on_readiness() {
        // Filter relevance only; a pending pod of the right app still matches.
        let snap = snapshot_with_labels(&[("deploymentconfig", "che")]);
        assert_eq!(snap.phase, PodPhase::Pending);
        assert!(is_app_pod(&snap, "che"));
    }
}
