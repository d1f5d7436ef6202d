//! Metad component - the metadata/coordination role

use crate::cluster::component::{ClusterComponent, ComponentType};
use crate::crd::{ComponentSpec, ComponentStatus, NebulaCluster, NebulaClusterStatus};

/// Config keys that switch intra-cluster metadata traffic to TLS
pub const ENABLE_META_SSL_KEY: &str = "enable_meta_ssl";
pub const ENABLE_SSL_KEY: &str = "enable_ssl";

/// View of a cluster's metad role
#[derive(Debug, Clone, Copy)]
pub struct MetadComponent<'a> {
    cluster: &'a NebulaCluster,
}

impl<'a> MetadComponent<'a> {
    pub(crate) fn new(cluster: &'a NebulaCluster) -> Self {
        Self { cluster }
    }
}

impl ClusterComponent for MetadComponent<'_> {
    fn cluster(&self) -> &NebulaCluster {
        self.cluster
    }

    fn component_type(&self) -> ComponentType {
        ComponentType::Metad
    }

    fn base_spec(&self) -> &ComponentSpec {
        &self.cluster.spec.metad
    }

    fn component_status(&self) -> Option<&ComponentStatus> {
        self.cluster.status.as_ref().map(|status| &status.metad)
    }

    fn is_ssl_enabled(&self) -> bool {
        let config = &self.cluster.spec.metad.config;
        (config.get(ENABLE_META_SSL_KEY).map(String::as_str) == Some("true")
            || config.get(ENABLE_SSL_KEY).map(String::as_str) == Some("true"))
            && self.cluster.spec.ssl_certs.is_some()
    }

    fn update_status(&self, status: &mut NebulaClusterStatus, component: ComponentStatus) {
        status.metad = component;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::tests::{test_cluster, test_ssl_certs};

    #[test]
    fn test_endpoints_match_pod_fqdns() {
        let mut cluster = test_cluster();
        cluster.spec.metad.replicas = Some(3);
        let metad = cluster.metad_component();

        let endpoints = metad.endpoints("thrift");
        assert_eq!(endpoints.len(), 3);
        for (ordinal, endpoint) in endpoints.iter().enumerate() {
            let expected = format!(
                "nebula-metad-{ordinal}.nebula-metad-headless.default.svc.cluster.local:9559"
            );
            assert_eq!(endpoint, &expected);
        }
    }

    #[test]
    fn test_ssl_requires_cert_bundle() {
        let mut cluster = test_cluster();
        cluster
            .spec
            .metad
            .config
            .insert(ENABLE_META_SSL_KEY.to_string(), "true".to_string());

        // flag alone is not enough
        assert!(!cluster.metad_component().is_ssl_enabled());

        cluster.spec.ssl_certs = Some(test_ssl_certs());
        assert!(cluster.metad_component().is_ssl_enabled());
    }

    #[test]
    fn test_unknown_port_reads_zero() {
        let cluster = test_cluster();
        assert_eq!(cluster.metad_component().port("admin"), 0);
    }
}
