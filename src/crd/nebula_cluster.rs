//! NebulaCluster CRD
//!
//! Declarative description of a NebulaGraph cluster: one sub-spec per
//! service role (graphd, metad, storaged), cluster-wide scheduling
//! defaults, TLS certificate references, and feature flags.

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::{
    Affinity, Container, EnvVar, Probe, ResourceRequirements, Toleration, Volume,
    VolumeResourceRequirements,
};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// NebulaCluster CRD
// =============================================================================

/// NebulaCluster describes a complete NebulaGraph deployment: the graphd
/// query gateway, the metad coordination service, and the storaged
/// storage service, each rolled out as its own replicated workload.
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "apps.nebula-graph.io",
    version = "v1alpha1",
    kind = "NebulaCluster",
    plural = "nebulaclusters",
    shortname = "nc",
    status = "NebulaClusterStatus",
    printcolumn = r#"{"name": "Graphd", "type": "integer", "jsonPath": ".status.graphd.workload.readyReplicas"}"#,
    printcolumn = r#"{"name": "Metad", "type": "integer", "jsonPath": ".status.metad.workload.readyReplicas"}"#,
    printcolumn = r#"{"name": "Storaged", "type": "integer", "jsonPath": ".status.storaged.workload.readyReplicas"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#,
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct NebulaClusterSpec {
    /// Query gateway role
    pub graphd: ComponentSpec,

    /// Metadata/coordination role
    pub metad: ComponentSpec,

    /// Storage role
    pub storaged: StoragedSpec,

    /// Node selector applied to every role unless overridden per role
    #[serde(default)]
    pub node_selector: BTreeMap<String, String>,

    /// Affinity applied to a role when it declares none of its own
    #[serde(default)]
    pub affinity: Option<Affinity>,

    /// Tolerations applied to a role when it declares none of its own
    #[serde(default)]
    pub tolerations: Vec<Toleration>,

    /// TLS certificate bundle; SSL can only be enabled when this is set
    #[serde(default)]
    pub ssl_certs: Option<SslCertsSpec>,

    /// Reclaim persistent volumes when the cluster is deleted
    #[serde(default)]
    pub enable_pv_reclaim: Option<bool>,

    /// Enable backup/restore tooling for this cluster
    #[serde(default)]
    pub enable_br: Option<bool>,

    /// Log rotation settings; rotation is enabled iff this is set
    #[serde(default)]
    pub log_rotate: Option<LogRotate>,
}

// =============================================================================
// Role Sub-Specs
// =============================================================================

/// Desired state shared by every role: replica count, image, runtime
/// configuration, compute resources, and pod-level overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    /// Desired replica count
    #[serde(default)]
    pub replicas: Option<i32>,

    /// Container image repository; falls back to the role default
    #[serde(default)]
    pub image: Option<String>,

    /// Image tag appended to the repository when set
    #[serde(default)]
    pub version: Option<String>,

    /// Free-form runtime configuration, rendered into the role's config file.
    /// User keys override the role's built-in defaults.
    #[serde(default)]
    pub config: BTreeMap<String, String>,

    /// Compute resource requests/limits for the primary container
    #[serde(default)]
    pub resources: Option<ResourceRequirements>,

    /// Optional persistent volume claim for log storage
    #[serde(default)]
    pub log_volume_claim: Option<StorageClaim>,

    /// Pod-level overrides
    #[serde(default)]
    pub pod: PodOverrides,

    /// Per-role service override; replaces type/clusterIP/annotations of
    /// the generated service but never its selector
    #[serde(default)]
    pub service: Option<ServiceSpec>,
}

/// Desired state of the storaged role: the shared component fields plus
/// data volume claims and storage-specific feature flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoragedSpec {
    #[serde(flatten)]
    pub base: ComponentSpec,

    /// Persistent volume claims for data storage, one generated volume and
    /// mount per entry
    #[serde(default)]
    pub data_volume_claims: Vec<StorageClaim>,

    /// Rebalance partitions automatically after scaling
    #[serde(default)]
    pub enable_auto_balance: Option<bool>,

    /// Force rolling updates even while partitions are unbalanced
    #[serde(default)]
    pub enable_force_update: Option<bool>,
}

/// Pod-level overrides applied to a role's pod template
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PodOverrides {
    /// Extra environment variables for the primary container
    #[serde(default)]
    pub env_vars: Vec<EnvVar>,

    /// Extra labels merged into the pod template labels
    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    /// Annotations set on the pod template
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,

    /// Node selector merged over the cluster-wide selector; role keys win
    #[serde(default)]
    pub node_selector: BTreeMap<String, String>,

    /// Affinity for this role; falls back to the cluster-wide affinity
    #[serde(default)]
    pub affinity: Option<Affinity>,

    /// Tolerations for this role; fall back to the cluster-wide tolerations
    #[serde(default)]
    pub tolerations: Vec<Toleration>,

    /// Init containers prepended to the pod
    #[serde(default)]
    pub init_containers: Vec<Container>,

    /// Sidecar containers appended after the primary container
    #[serde(default)]
    pub sidecar_containers: Vec<Container>,

    /// Extra volumes for sidecar containers
    #[serde(default)]
    pub sidecar_volumes: Vec<Volume>,

    /// Readiness probe for the primary container
    #[serde(default)]
    pub readiness_probe: Option<Probe>,
}

/// A single persistent volume claim request
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageClaim {
    /// Storage resources; the `storage` request must be a valid quantity
    #[serde(default)]
    pub resources: VolumeResourceRequirements,

    /// Storage class for the claim; empty means the platform default
    #[serde(default)]
    pub storage_class_name: Option<String>,
}

/// References to the secrets holding the cluster's TLS material
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SslCertsSpec {
    /// Secret holding the server certificate and key
    pub server_secret: String,

    /// Key of the server certificate within the server secret
    pub server_public_key: String,

    /// Key of the server private key within the server secret
    pub server_private_key: String,

    /// Secret holding the CA certificate
    pub ca_secret: String,

    /// Key of the CA certificate within the CA secret
    pub ca_public_key: String,

    /// Skip server certificate verification on client connections
    #[serde(default)]
    pub insecure_skip_verify: Option<bool>,
}

/// Per-role override of the generated service
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    /// Service type (ClusterIP, NodePort, LoadBalancer)
    #[serde(default, rename = "type")]
    pub type_: Option<String>,

    /// Explicit cluster IP; `None` is headless
    #[serde(default)]
    pub cluster_ip: Option<String>,

    /// Annotations set on the generated service
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

/// Log rotation settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogRotate {
    /// Number of rotated files to keep
    #[serde(default = "default_log_rotate_count")]
    pub rotate: i32,

    /// Rotate once a log file exceeds this size (e.g. "100M")
    #[serde(default = "default_log_rotate_size")]
    pub size: String,
}

// =============================================================================
// Status
// =============================================================================

/// Observed state of the cluster, one slot per role
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NebulaClusterStatus {
    /// Observed state of the graphd role
    #[serde(default)]
    pub graphd: ComponentStatus,

    /// Observed state of the metad role
    #[serde(default)]
    pub metad: ComponentStatus,

    /// Observed state of the storaged role
    #[serde(default)]
    pub storaged: ComponentStatus,

    /// Conditions
    #[serde(default)]
    pub conditions: Vec<ClusterCondition>,
}

/// Observed state of one role
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentStatus {
    /// Observed workload state
    #[serde(default)]
    pub workload: WorkloadStatus,
}

/// Observed state of a role's workload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadStatus {
    /// Number of replicas that currently pass their readiness probe
    #[serde(default)]
    pub ready_replicas: i32,

    /// Revision identifier of the currently rolled-out pod template
    #[serde(default)]
    pub update_revision: String,
}

/// Condition for cluster status
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCondition {
    /// Type of condition
    pub r#type: String,
    /// Status: True, False, Unknown
    pub status: ConditionStatus,
    /// Last transition time
    #[serde(default)]
    #[schemars(with = "Option<String>")]
    pub last_transition_time: Option<DateTime<Utc>>,
    /// Machine-readable reason
    #[serde(default)]
    pub reason: Option<String>,
    /// Human-readable message
    #[serde(default)]
    pub message: Option<String>,
}

/// Condition status values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

// =============================================================================
// Default Value Functions
// =============================================================================

fn default_log_rotate_count() -> i32 {
    5
}

fn default_log_rotate_size() -> String {
    "100M".to_string()
}

// =============================================================================
// Implementations
// =============================================================================

impl NebulaClusterStatus {
    /// Set a condition, replacing an existing one of the same type
    pub fn set_condition(&mut self, condition: ClusterCondition) {
        if let Some(existing) = self
            .conditions
            .iter_mut()
            .find(|c| c.r#type == condition.r#type)
        {
            *existing = condition;
        } else {
            self.conditions.push(condition);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_rotate_defaults() {
        let rotate: LogRotate = serde_json::from_str("{}").unwrap();
        assert_eq!(rotate.rotate, 5);
        assert_eq!(rotate.size, "100M");
    }

    #[test]
    fn test_storaged_spec_flattens_component_fields() {
        let spec: StoragedSpec = serde_json::from_str(
            r#"{"replicas": 3, "dataVolumeClaims": [{"resources": {"requests": {"storage": "10Gi"}}}]}"#,
        )
        .unwrap();
        assert_eq!(spec.base.replicas, Some(3));
        assert_eq!(spec.data_volume_claims.len(), 1);
    }

    #[test]
    fn test_set_condition_replaces_same_type() {
        let mut status = NebulaClusterStatus::default();
        status.set_condition(ClusterCondition {
            r#type: "Ready".into(),
            status: ConditionStatus::False,
            last_transition_time: None,
            reason: None,
            message: None,
        });
        status.set_condition(ClusterCondition {
            r#type: "Ready".into(),
            status: ConditionStatus::True,
            last_transition_time: None,
            reason: Some("WorkloadsReady".into()),
            message: None,
        });
        assert_eq!(status.conditions.len(), 1);
        assert_eq!(status.conditions[0].status, ConditionStatus::True);
    }
}
