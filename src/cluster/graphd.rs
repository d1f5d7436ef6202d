//! Graphd component - the query/compute gateway role

use crate::cluster::component::{ClusterComponent, ComponentType};
use crate::crd::{ComponentSpec, ComponentStatus, NebulaCluster, NebulaClusterStatus};

/// Config keys that switch graphd's client-facing listener to TLS
pub const ENABLE_GRAPH_SSL_KEY: &str = "enable_graph_ssl";
pub const ENABLE_SSL_KEY: &str = "enable_ssl";

/// View of a cluster's graphd role
#[derive(Debug, Clone, Copy)]
pub struct GraphdComponent<'a> {
    cluster: &'a NebulaCluster,
}

impl<'a> GraphdComponent<'a> {
    pub(crate) fn new(cluster: &'a NebulaCluster) -> Self {
        Self { cluster }
    }
}

impl ClusterComponent for GraphdComponent<'_> {
    fn cluster(&self) -> &NebulaCluster {
        self.cluster
    }

    fn component_type(&self) -> ComponentType {
        ComponentType::Graphd
    }

    fn base_spec(&self) -> &ComponentSpec {
        &self.cluster.spec.graphd
    }

    fn component_status(&self) -> Option<&ComponentStatus> {
        self.cluster.status.as_ref().map(|status| &status.graphd)
    }

    fn is_ssl_enabled(&self) -> bool {
        let config = &self.cluster.spec.graphd.config;
        (config.get(ENABLE_GRAPH_SSL_KEY).map(String::as_str) == Some("true")
            || config.get(ENABLE_SSL_KEY).map(String::as_str) == Some("true"))
            && self.cluster.spec.ssl_certs.is_some()
    }

    fn update_status(&self, status: &mut NebulaClusterStatus, component: ComponentStatus) {
        status.graphd = component;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::tests::test_cluster;
    use crate::crd::WorkloadStatus;

    #[test]
    fn test_identity_and_addresses() {
        let cluster = test_cluster();
        let graphd = cluster.graphd_component();

        assert_eq!(graphd.name(), "nebula-graphd");
        assert_eq!(graphd.service_name(), "nebula-graphd-headless");
        assert_eq!(graphd.image(), "vesoft/nebula-graphd:v3.6.0");
        assert_eq!(graphd.port("thrift"), 9669);
        assert_eq!(
            graphd.conn_address("thrift"),
            "nebula-graphd-headless.default.svc.cluster.local:9669"
        );
    }

    #[test]
    fn test_readiness_requires_all_replicas() {
        let mut cluster = test_cluster();
        cluster.spec.graphd.replicas = Some(3);

        let mut status = NebulaClusterStatus::default();
        status.graphd.workload = WorkloadStatus {
            ready_replicas: 2,
            update_revision: "rev-1".to_string(),
        };
        cluster.status = Some(status);
        assert!(!cluster.graphd_component().is_ready());

        if let Some(status) = cluster.status.as_mut() {
            status.graphd.workload.ready_replicas = 3;
        }
        assert!(cluster.graphd_component().is_ready());
    }

    #[test]
    fn test_update_status_writes_own_slot() {
        let cluster = test_cluster();
        let mut status = NebulaClusterStatus::default();

        cluster.graphd_component().update_status(
            &mut status,
            ComponentStatus {
                workload: WorkloadStatus {
                    ready_replicas: 2,
                    update_revision: "rev-7".to_string(),
                },
            },
        );

        assert_eq!(status.graphd.workload.ready_replicas, 2);
        assert_eq!(status.graphd.workload.update_revision, "rev-7");
        assert_eq!(status.metad, ComponentStatus::default());
        assert_eq!(status.storaged, ComponentStatus::default());
    }

    #[test]
    fn test_stateless_role_has_no_data_claims() {
        let cluster = test_cluster();
        let graphd = cluster.graphd_component();
        assert!(graphd.data_volume_claims().is_empty());
        assert!(graphd.data_storage_resources().unwrap().is_none());
    }
}
