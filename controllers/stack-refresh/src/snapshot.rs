//! Point-in-time views of watched pods.
//!
//! The controller never holds full `Pod` objects: the watch feeder reduces
//! each event to a `PodSnapshot` carrying only the fields the refresh
//! decision needs. Snapshots are immutable; newer events supersede older
//! ones in the cache.

use k8s_openapi::api::core::v1::Pod;
use std::collections::BTreeMap;

/// Pod lifecycle phase as reported by the kubelet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodPhase {
    /// Accepted but not all containers started
    Pending,
    /// Bound to a node, all containers created
    Running,
    /// All containers terminated successfully
    Succeeded,
    /// All containers terminated, at least one failed
    Failed,
    /// Phase could not be obtained
    Unknown,
}

impl PodPhase {
    fn parse(phase: Option<&str>) -> Self {
        match phase {
            Some("Pending") => Self::Pending,
            Some("Running") => Self::Running,
            Some("Succeeded") => Self::Succeeded,
            Some("Failed") => Self::Failed,
            _ => Self::Unknown,
        }
    }
}

/// Ready flag of one container inside a pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerState {
    /// Container name as declared in the pod spec
    pub name: String,
    /// Whether the container passes its readiness check
    pub ready: bool,
}

/// Immutable point-in-time view of one watched pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodSnapshot {
    /// Pod namespace
    pub namespace: String,
    /// Pod name
    pub name: String,
    /// Labels attached to the pod
    pub labels: BTreeMap<String, String>,
    /// Lifecycle phase
    pub phase: PodPhase,
    /// Pod IP; only meaningful once the phase is Running
    pub pod_ip: Option<String>,
    /// Per-container ready flags, in status order
    pub containers: Vec<ContainerState>,
}

impl PodSnapshot {
    /// Cache/queue key for this pod: `namespace/name`.
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// Whether the named container reports ready.
    pub fn container_ready(&self, name: &str) -> bool {
        self.containers.iter().any(|c| c.name == name && c.ready)
    }
}

impl From<&Pod> for PodSnapshot {
    fn from(pod: &Pod) -> Self {
        let status = pod.status.as_ref();
        let containers = status
            .and_then(|s| s.container_statuses.as_ref())
            .map(|statuses| {
                statuses
                    .iter()
                    .map(|c| ContainerState {
                        name: c.name.clone(),
                        ready: c.ready,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            namespace: pod.metadata.namespace.clone().unwrap_or_default(),
            name: pod.metadata.name.clone().unwrap_or_default(),
            labels: pod.metadata.labels.clone().unwrap_or_default(),
            phase: PodPhase::parse(status.and_then(|s| s.phase.as_deref())),
            pod_ip: status.and_then(|s| s.pod_ip.clone()),
            containers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{ContainerStatus, PodStatus};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn pod_with_status(phase: &str, ready: bool) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some("che-1-abcde".to_string()),
                namespace: Some("eclipse-che".to_string()),
                labels: Some(
                    [("deploymentconfig".to_string(), "che".to_string())]
                        .into_iter()
                        .collect(),
                ),
                ..Default::default()
            },
            status: Some(PodStatus {
                phase: Some(phase.to_string()),
                pod_ip: Some("10.1.2.3".to_string()),
                container_statuses: Some(vec![ContainerStatus {
                    name: "che".to_string(),
                    ready,
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_snapshot_from_running_pod() {
        let snap = PodSnapshot::from(&pod_with_status("Running", true));
        assert_eq!(snap.key(), "eclipse-che/che-1-abcde");
        assert_eq!(snap.phase, PodPhase::Running);
        assert_eq!(snap.pod_ip.as_deref(), Some("10.1.2.3"));
        assert!(snap.container_ready("che"));
    }

    #[test]
    fn test_container_ready_requires_matching_name() {
        let snap = PodSnapshot::from(&pod_with_status("Running", true));
        assert!(!snap.container_ready("sidecar"));
    }

    #[test]
    fn test_unknown_phase_for_missing_status() {
        let pod = Pod::default();
        let snap = PodSnapshot::from(&pod);
        assert_eq!(snap.phase, PodPhase::Unknown);
        assert!(snap.containers.is_empty());
        assert!(snap.pod_ip.is_none());
    }
}
