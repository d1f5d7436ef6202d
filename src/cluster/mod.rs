//! Cluster component layer
//!
//! Maps a [`NebulaCluster`] onto the runtime objects the platform needs:
//! one workload, service, and config bundle per role, plus the storage
//! role's volume claims.
//!
//! - [`naming`]: canonical object/pod/DNS names
//! - [`quantity`]: storage size parsing and aggregation
//! - [`label`]: operator-managed label sets
//! - [`component`]: the polymorphic role contract
//! - [`generate`]: shared object generation algorithms
//!
//! The facade methods on [`NebulaCluster`] resolve roles to their
//! component views and answer cluster-wide questions (SSL agreement,
//! feature flags, ownership).

pub mod component;
pub mod generate;
pub mod graphd;
pub mod label;
pub mod metad;
pub mod naming;
pub mod quantity;
pub mod storaged;

pub use component::{ClusterComponent, ComponentType};
pub use graphd::GraphdComponent;
pub use metad::MetadComponent;
pub use storaged::StoragedComponent;

use crate::crd::NebulaCluster;
use crate::error::Result;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::Resource;
use std::collections::BTreeMap;

use graphd::ENABLE_GRAPH_SSL_KEY;
use metad::ENABLE_META_SSL_KEY;

const ENABLE_SSL_KEY: &str = "enable_ssl";

fn config_flag(config: &BTreeMap<String, String>, key: &str) -> bool {
    config.get(key).map(String::as_str) == Some("true")
}

// =============================================================================
// Cluster Facade
// =============================================================================

impl NebulaCluster {
    /// Name of this cluster
    pub fn cluster_name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or("unknown")
    }

    /// View of the graphd role
    pub fn graphd_component(&self) -> GraphdComponent<'_> {
        GraphdComponent::new(self)
    }

    /// View of the metad role
    pub fn metad_component(&self) -> MetadComponent<'_> {
        MetadComponent::new(self)
    }

    /// View of the storaged role
    pub fn storaged_component(&self) -> StoragedComponent<'_> {
        StoragedComponent::new(self)
    }

    /// Resolve a role tag to its component view
    pub fn component_by_type(
        &self,
        component_type: ComponentType,
    ) -> Box<dyn ClusterComponent + '_> {
        match component_type {
            ComponentType::Graphd => Box::new(self.graphd_component()),
            ComponentType::Metad => Box::new(self.metad_component()),
            ComponentType::Storaged => Box::new(self.storaged_component()),
        }
    }

    /// Resolve a role tag given as a string; unknown tags are rejected
    pub fn component_by_name(&self, name: &str) -> Result<Box<dyn ClusterComponent + '_>> {
        Ok(self.component_by_type(name.parse()?))
    }

    /// Address graph clients use to reach the metad thrift endpoint
    pub fn get_metad_thrift_conn_address(&self) -> String {
        self.metad_component()
            .conn_address(component::PORT_NAME_THRIFT)
    }

    pub fn get_graphd_endpoints(&self, port_name: &str) -> Vec<String> {
        self.graphd_component().endpoints(port_name)
    }

    pub fn get_metad_endpoints(&self, port_name: &str) -> Vec<String> {
        self.metad_component().endpoints(port_name)
    }

    pub fn get_storaged_endpoints(&self, port_name: &str) -> Vec<String> {
        self.storaged_component().endpoints(port_name)
    }

    /// Owner reference stamped on every generated object so the platform
    /// garbage-collects them with the cluster
    pub fn generate_owner_references(&self) -> Vec<OwnerReference> {
        self.controller_owner_ref(&()).into_iter().collect()
    }

    /// A cluster is ready iff every role is ready
    pub fn is_ready(&self) -> bool {
        self.graphd_component().is_ready()
            && self.metad_component().is_ready()
            && self.storaged_component().is_ready()
    }

    // -------------------------------------------------------------------------
    // Feature Flags
    // -------------------------------------------------------------------------

    pub fn is_pv_reclaim_enabled(&self) -> bool {
        self.spec.enable_pv_reclaim.unwrap_or(false)
    }

    pub fn is_auto_balance_enabled(&self) -> bool {
        self.spec.storaged.enable_auto_balance.unwrap_or(false)
    }

    pub fn is_force_update_enabled(&self) -> bool {
        self.spec.storaged.enable_force_update.unwrap_or(false)
    }

    pub fn is_br_enabled(&self) -> bool {
        self.spec.enable_br.unwrap_or(false)
    }

    pub fn is_log_rotate_enabled(&self) -> bool {
        self.spec.log_rotate.is_some()
    }

    pub fn insecure_skip_verify(&self) -> bool {
        self.spec
            .ssl_certs
            .as_ref()
            .and_then(|certs| certs.insecure_skip_verify)
            .unwrap_or(false)
    }

    // -------------------------------------------------------------------------
    // Cluster-Wide SSL
    // -------------------------------------------------------------------------

    /// Whether graphd serves its client listener over TLS
    pub fn is_graphd_ssl_enabled(&self) -> bool {
        config_flag(&self.spec.graphd.config, ENABLE_GRAPH_SSL_KEY)
    }

    /// Whether all three roles agree on TLS for metadata traffic.
    /// An absent key reads as disabled.
    pub fn is_metad_ssl_enabled(&self) -> bool {
        config_flag(&self.spec.graphd.config, ENABLE_META_SSL_KEY)
            && config_flag(&self.spec.metad.config, ENABLE_META_SSL_KEY)
            && config_flag(&self.spec.storaged.base.config, ENABLE_META_SSL_KEY)
    }

    /// Whether all three roles agree on TLS for every connection
    pub fn is_cluster_ssl_enabled(&self) -> bool {
        config_flag(&self.spec.graphd.config, ENABLE_SSL_KEY)
            && config_flag(&self.spec.metad.config, ENABLE_SSL_KEY)
            && config_flag(&self.spec.storaged.base.config, ENABLE_SSL_KEY)
    }
}

// =============================================================================
// Test Fixtures
// =============================================================================
