//! Component contract
//!
//! One polymorphic contract satisfied by the three cluster roles. A
//! component is a borrowing view over a [`NebulaCluster`]: it owns no
//! state of its own, and every accessor recomputes its answer from the
//! cluster spec/status snapshot it was projected from. The shared
//! generation algorithms in [`generate`](super::generate) are
//! parameterized over this trait.

use crate::cluster::{generate, label::Label, naming};
use crate::crd::{
    ComponentSpec, ComponentStatus, NebulaCluster, NebulaClusterStatus, ServiceSpec, StorageClaim,
};
use crate::error::{Error, Result};
use k8s_openapi::api::core::v1::{
    Affinity, ConfigMap, Container, ContainerPort, EnvVar, PersistentVolumeClaim, Probe,
    ResourceRequirements, Service, Toleration, Volume, VolumeMount, VolumeResourceRequirements,
};
use kube::core::{DynamicObject, GroupVersionKind};
use std::collections::BTreeMap;
use std::str::FromStr;

// =============================================================================
// Port Names
// =============================================================================

pub const PORT_NAME_THRIFT: &str = "thrift";
pub const PORT_NAME_HTTP: &str = "http";
pub const PORT_NAME_HTTP2: &str = "http2";
pub const PORT_NAME_ADMIN: &str = "admin";

// =============================================================================
// Per-Role Constant Tables
// =============================================================================

const GRAPHD_PORTS: &[(&str, i32)] = &[
    (PORT_NAME_THRIFT, 9669),
    (PORT_NAME_HTTP, 19669),
    (PORT_NAME_HTTP2, 19670),
];

const METAD_PORTS: &[(&str, i32)] = &[
    (PORT_NAME_THRIFT, 9559),
    (PORT_NAME_HTTP, 19559),
    (PORT_NAME_HTTP2, 19560),
];

const STORAGED_PORTS: &[(&str, i32)] = &[
    (PORT_NAME_THRIFT, 9779),
    (PORT_NAME_HTTP, 19779),
    (PORT_NAME_HTTP2, 19780),
    (PORT_NAME_ADMIN, 9778),
];

const GRAPHD_CONFIG: &[(&str, &str)] = &[
    ("daemonize", "false"),
    ("pid_file", "pids/nebula-graphd.pid"),
    ("log_dir", "logs"),
    ("minloglevel", "0"),
    ("v", "0"),
    ("port", "9669"),
    ("ws_ip", "0.0.0.0"),
    ("ws_http_port", "19669"),
];

const METAD_CONFIG: &[(&str, &str)] = &[
    ("daemonize", "false"),
    ("pid_file", "pids/nebula-metad.pid"),
    ("log_dir", "logs"),
    ("minloglevel", "0"),
    ("v", "0"),
    ("port", "9559"),
    ("ws_ip", "0.0.0.0"),
    ("ws_http_port", "19559"),
    ("data_path", "data/meta"),
];

const STORAGED_CONFIG: &[(&str, &str)] = &[
    ("daemonize", "false"),
    ("pid_file", "pids/nebula-storaged.pid"),
    ("log_dir", "logs"),
    ("minloglevel", "0"),
    ("v", "0"),
    ("port", "9779"),
    ("ws_ip", "0.0.0.0"),
    ("ws_http_port", "19779"),
    ("data_path", "data/storage"),
];

// =============================================================================
// Component Type
// =============================================================================

/// The three cooperating service roles of a cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    /// Query/compute gateway
    Graphd,
    /// Metadata/coordination service
    Metad,
    /// Storage service
    Storaged,
}

impl ComponentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentType::Graphd => "graphd",
            ComponentType::Metad => "metad",
            ComponentType::Storaged => "storaged",
        }
    }

    /// Default image repository for the role
    pub fn default_image(&self) -> &'static str {
        match self {
            ComponentType::Graphd => "vesoft/nebula-graphd",
            ComponentType::Metad => "vesoft/nebula-metad",
            ComponentType::Storaged => "vesoft/nebula-storaged",
        }
    }

    /// Fixed named port table for the role
    pub fn default_ports(&self) -> &'static [(&'static str, i32)] {
        match self {
            ComponentType::Graphd => GRAPHD_PORTS,
            ComponentType::Metad => METAD_PORTS,
            ComponentType::Storaged => STORAGED_PORTS,
        }
    }

    /// Built-in configuration parameters for the role, overridable by
    /// user-supplied config keys
    pub fn default_config(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            ComponentType::Graphd => GRAPHD_CONFIG,
            ComponentType::Metad => METAD_CONFIG,
            ComponentType::Storaged => STORAGED_CONFIG,
        }
    }

    /// Key of the role's entry in its generated ConfigMap
    pub fn config_file_key(&self) -> String {
        format!("nebula-{}.conf", self.as_str())
    }
}

impl std::fmt::Display for ComponentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "graphd" => Ok(ComponentType::Graphd),
            "metad" => Ok(ComponentType::Metad),
            "storaged" => Ok(ComponentType::Storaged),
            other => Err(Error::UnsupportedComponent {
                name: other.to_string(),
            }),
        }
    }
}

// =============================================================================
// Component Contract
// =============================================================================

/// Per-role view over a [`NebulaCluster`], used to generate that role's
/// runtime objects.
///
/// The required methods bind a role to its slot in the cluster spec and
/// status; everything else is derived. Implementations must stay pure:
/// calling any method twice against an unchanged cluster yields
/// structurally identical results, which is what lets the reconciler diff
/// generated objects against live ones.
pub trait ClusterComponent {
    /// The cluster this component projects
    fn cluster(&self) -> &NebulaCluster;

    /// Role tag of this component
    fn component_type(&self) -> ComponentType;

    /// The role's sub-spec within the cluster spec
    fn base_spec(&self) -> &ComponentSpec;

    /// The role's slot within the cluster status, if status exists yet
    fn component_status(&self) -> Option<&ComponentStatus>;

    /// Whether this role serves TLS. Requires both the role's own config
    /// flag and the cluster-wide certificate bundle.
    fn is_ssl_enabled(&self) -> bool;

    /// Write the observed workload state into the role's status slot
    fn update_status(&self, status: &mut NebulaClusterStatus, component: ComponentStatus);

    /// Data volume claims configured for this role. Stateless roles report
    /// none and generate no data volumes or mounts.
    fn data_volume_claims(&self) -> &[StorageClaim] {
        &[]
    }

    // -------------------------------------------------------------------------
    // Identity
    // -------------------------------------------------------------------------

    /// Canonical name of every object generated for this role
    fn name(&self) -> String {
        naming::component_name(self.cluster().cluster_name(), self.component_type().as_str())
    }

    /// Namespace all generated objects live in
    fn namespace(&self) -> String {
        self.cluster()
            .metadata
            .namespace
            .clone()
            .unwrap_or_else(|| "default".to_string())
    }

    // -------------------------------------------------------------------------
    // Desired State
    // -------------------------------------------------------------------------

    /// Desired replica count
    fn replicas(&self) -> i32 {
        self.base_spec().replicas.unwrap_or(1)
    }

    /// Image reference, composed from the role default repository when the
    /// spec leaves the image unset
    fn image(&self) -> String {
        let spec = self.base_spec();
        let image = spec
            .image
            .as_deref()
            .filter(|image| !image.is_empty())
            .unwrap_or_else(|| self.component_type().default_image());
        match spec.version.as_deref().filter(|version| !version.is_empty()) {
            Some(version) => format!("{image}:{version}"),
            None => image.to_string(),
        }
    }

    /// User-supplied runtime configuration
    fn config(&self) -> &BTreeMap<String, String> {
        &self.base_spec().config
    }

    /// ConfigMap key holding this role's rendered configuration
    fn config_map_key(&self) -> String {
        self.component_type().config_file_key()
    }

    /// Compute resources for the primary container, empty when unset
    fn resources(&self) -> ResourceRequirements {
        self.base_spec().resources.clone().unwrap_or_default()
    }

    fn pod_env_vars(&self) -> &[EnvVar] {
        &self.base_spec().pod.env_vars
    }

    fn pod_labels(&self) -> &BTreeMap<String, String> {
        &self.base_spec().pod.labels
    }

    fn pod_annotations(&self) -> &BTreeMap<String, String> {
        &self.base_spec().pod.annotations
    }

    /// Node selector: cluster-wide keys merged with role keys, role wins
    fn node_selector(&self) -> BTreeMap<String, String> {
        generate::merge_string_maps(
            &self.cluster().spec.node_selector,
            &self.base_spec().pod.node_selector,
        )
    }

    /// Role affinity, falling back to the cluster-wide affinity
    fn affinity(&self) -> Option<&Affinity> {
        self.base_spec()
            .pod
            .affinity
            .as_ref()
            .or(self.cluster().spec.affinity.as_ref())
    }

    /// Role tolerations, falling back to the cluster-wide tolerations
    fn tolerations(&self) -> &[Toleration] {
        let tolerations = &self.base_spec().pod.tolerations;
        if tolerations.is_empty() {
            &self.cluster().spec.tolerations
        } else {
            tolerations
        }
    }

    fn init_containers(&self) -> &[Container] {
        &self.base_spec().pod.init_containers
    }

    fn sidecar_containers(&self) -> &[Container] {
        &self.base_spec().pod.sidecar_containers
    }

    fn sidecar_volumes(&self) -> &[Volume] {
        &self.base_spec().pod.sidecar_volumes
    }

    fn readiness_probe(&self) -> Option<&Probe> {
        self.base_spec().pod.readiness_probe.as_ref()
    }

    /// Per-role service override, if any
    fn service_spec(&self) -> Option<&ServiceSpec> {
        self.base_spec().service.as_ref()
    }

    // -------------------------------------------------------------------------
    // Storage
    // -------------------------------------------------------------------------

    fn log_volume_claim(&self) -> Option<&StorageClaim> {
        self.base_spec().log_volume_claim.as_ref()
    }

    /// Storage class of the log claim; empty strings read as unset
    fn log_storage_class(&self) -> Option<String> {
        let claim = self.log_volume_claim()?;
        claim
            .storage_class_name
            .as_deref()
            .filter(|class| !class.is_empty())
            .map(str::to_string)
    }

    /// Total storage requested across all data claims, aggregated
    /// left-to-right from the first claim's value
    fn data_storage_resources(&self) -> Result<Option<VolumeResourceRequirements>> {
        let mut claims = self.data_volume_claims().iter();
        let first = match claims.next() {
            Some(claim) => claim,
            None => return Ok(None),
        };

        let mut total = parse_claim_bytes(first)?;
        for claim in claims {
            total += parse_claim_bytes(claim)?;
        }
        Ok(Some(super::quantity::storage_requirements(total)))
    }

    // -------------------------------------------------------------------------
    // Networking
    // -------------------------------------------------------------------------

    /// Whether the role's service is headless. Every role here needs
    /// stable per-replica identity, so this defaults to true.
    fn is_headless_service(&self) -> bool {
        true
    }

    fn service_name(&self) -> String {
        naming::service_name(&self.name(), self.is_headless_service())
    }

    fn service_fqdn(&self) -> String {
        naming::service_fqdn(&self.service_name(), &self.namespace())
    }

    fn pod_name(&self, ordinal: i32) -> String {
        naming::pod_name(&self.name(), ordinal)
    }

    fn pod_fqdn(&self, ordinal: i32) -> String {
        naming::pod_fqdn(
            &self.pod_name(ordinal),
            &self.service_fqdn(),
            self.is_headless_service(),
        )
    }

    /// The role's fixed named port table as container ports
    fn container_ports(&self) -> Vec<ContainerPort> {
        self.component_type()
            .default_ports()
            .iter()
            .map(|(name, port)| ContainerPort {
                name: Some((*name).to_string()),
                container_port: *port,
                ..Default::default()
            })
            .collect()
    }

    /// Number of the named port, 0 when the role does not declare it
    fn port(&self, port_name: &str) -> i32 {
        self.container_ports()
            .iter()
            .find(|port| port.name.as_deref() == Some(port_name))
            .map(|port| port.container_port)
            .unwrap_or(0)
    }

    /// Service-level `host:port` address for the named port
    fn conn_address(&self, port_name: &str) -> String {
        naming::join_host_port(&self.service_fqdn(), self.port(port_name))
    }

    /// Per-replica `host:port` addresses for the named port, one per
    /// ordinal in ascending order
    fn endpoints(&self, port_name: &str) -> Vec<String> {
        naming::conn_addresses(&self.conn_address(port_name), &self.name(), self.replicas())
    }

    // -------------------------------------------------------------------------
    // Observed State
    // -------------------------------------------------------------------------

    /// A role is ready iff every desired replica reports ready
    fn is_ready(&self) -> bool {
        self.component_status()
            .is_some_and(|status| status.workload.ready_replicas == self.replicas())
    }

    /// Revision identifier of the currently rolled-out pod template
    fn update_revision(&self) -> String {
        self.component_status()
            .map(|status| status.workload.update_revision.clone())
            .unwrap_or_default()
    }

    // -------------------------------------------------------------------------
    // Generation
    // -------------------------------------------------------------------------

    /// Label set stamped on every object generated for this role
    fn generate_labels(&self) -> BTreeMap<String, String> {
        Label::new()
            .cluster(self.cluster().cluster_name())
            .component(self.component_type().as_str())
            .into_map()
    }

    fn generate_volume_mounts(&self) -> Vec<VolumeMount> {
        generate::generate_volume_mounts(self)
    }

    fn generate_volumes(&self) -> Vec<Volume> {
        generate::generate_volumes(self)
    }

    fn generate_volume_claims(&self) -> Result<Vec<PersistentVolumeClaim>> {
        generate::generate_volume_claims(self)
    }

    fn generate_workload(
        &self,
        gvk: &GroupVersionKind,
        config_map: &ConfigMap,
        enable_even_pods_spread: bool,
    ) -> Result<DynamicObject> {
        generate::generate_workload(self, gvk, config_map, enable_even_pods_spread)
    }

    fn generate_service(&self) -> Service {
        generate::generate_service(self)
    }

    fn generate_config_map(&self) -> ConfigMap {
        generate::generate_config_map(self)
    }
}

fn parse_claim_bytes(claim: &StorageClaim) -> Result<u128> {
    let quantity = claim
        .resources
        .requests
        .as_ref()
        .and_then(|requests| requests.get(super::quantity::STORAGE_RESOURCE))
        .ok_or_else(|| Error::CapacityParse {
            value: "<missing storage request>".to_string(),
        })?;
    super::quantity::parse_quantity(&quantity.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_component_type_round_trip() {
        for component_type in [
            ComponentType::Graphd,
            ComponentType::Metad,
            ComponentType::Storaged,
        ] {
            let parsed: ComponentType = component_type.as_str().parse().unwrap();
            assert_eq!(parsed, component_type);
        }
    }

    #[test]
    fn test_unknown_component_type_rejected() {
        assert_matches!(
            "indexd".parse::<ComponentType>(),
            Err(Error::UnsupportedComponent { name }) if name == "indexd"
        );
    }

    #[test]
    fn test_default_port_tables() {
        let storaged = ComponentType::Storaged.default_ports();
        assert_eq!(storaged, STORAGED_PORTS);
        assert!(storaged.contains(&(PORT_NAME_THRIFT, 9779)));
        assert!(storaged.contains(&(PORT_NAME_ADMIN, 9778)));

        assert!(ComponentType::Graphd
            .default_ports()
            .contains(&(PORT_NAME_THRIFT, 9669)));
        assert!(ComponentType::Metad
            .default_ports()
            .contains(&(PORT_NAME_THRIFT, 9559)));
    }

    #[test]
    fn test_config_file_key() {
        assert_eq!(
            ComponentType::Storaged.config_file_key(),
            "nebula-storaged.conf"
        );
    }
}
