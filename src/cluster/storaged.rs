//! Storaged component - the storage role
//!
//! The only stateful role: it carries the cluster's data volume claims,
//! so its generated workload mounts one volume per configured claim in
//! addition to the optional log volume and the TLS material.

use crate::cluster::component::{ClusterComponent, ComponentType};
use crate::crd::{ComponentSpec, ComponentStatus, NebulaCluster, NebulaClusterStatus, StorageClaim};

/// Config keys that switch storaged's intra-cluster traffic to TLS
pub const ENABLE_META_SSL_KEY: &str = "enable_meta_ssl";
pub const ENABLE_SSL_KEY: &str = "enable_ssl";

/// View of a cluster's storaged role
#[derive(Debug, Clone, Copy)]
pub struct StoragedComponent<'a> {
    cluster: &'a NebulaCluster,
}

impl<'a> StoragedComponent<'a> {
    pub(crate) fn new(cluster: &'a NebulaCluster) -> Self {
        Self { cluster }
    }
}

impl ClusterComponent for StoragedComponent<'_> {
    fn cluster(&self) -> &NebulaCluster {
        self.cluster
    }

    fn component_type(&self) -> ComponentType {
        ComponentType::Storaged
    }

    fn base_spec(&self) -> &ComponentSpec {
        &self.cluster.spec.storaged.base
    }

    fn component_status(&self) -> Option<&ComponentStatus> {
        self.cluster.status.as_ref().map(|status| &status.storaged)
    }

    fn is_ssl_enabled(&self) -> bool {
        let config = &self.cluster.spec.storaged.base.config;
        (config.get(ENABLE_META_SSL_KEY).map(String::as_str) == Some("true")
            || config.get(ENABLE_SSL_KEY).map(String::as_str) == Some("true"))
            && self.cluster.spec.ssl_certs.is_some()
    }

    fn update_status(&self, status: &mut NebulaClusterStatus, component: ComponentStatus) {
        status.storaged = component;
    }

    fn data_volume_claims(&self) -> &[StorageClaim] {
        &self.cluster.spec.storaged.data_volume_claims
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::tests::{storage_claim, test_cluster, test_ssl_certs};
    use crate::error::Error;
    use assert_matches::assert_matches;
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

    #[test]
    fn test_mounts_pair_with_claims_by_name_and_path() {
        let mut cluster = test_cluster();
        cluster.spec.storaged.data_volume_claims =
            vec![storage_claim("10Gi", None), storage_claim("20Gi", None)];

        let storaged = cluster.storaged_component();
        let mounts = storaged.generate_volume_mounts();
        let claims = storaged.generate_volume_claims().unwrap();

        assert_eq!(mounts.len(), 2);
        assert_eq!(claims.len(), 2);

        assert_eq!(mounts[0].name, "storaged-data");
        assert_eq!(mounts[0].mount_path, "/usr/local/nebula/data");
        assert_eq!(mounts[0].sub_path.as_deref(), Some("data"));

        assert_eq!(mounts[1].name, "storaged-data-1");
        assert_eq!(mounts[1].mount_path, "/usr/local/nebula/data1");
        assert_eq!(mounts[1].sub_path.as_deref(), Some("data1"));

        for (mount, claim) in mounts.iter().zip(claims.iter()) {
            assert_eq!(Some(&mount.name), claim.metadata.name.as_ref());
        }

        let sizes: Vec<_> = claims
            .iter()
            .map(|claim| {
                claim.spec.as_ref().unwrap().resources.as_ref().unwrap().requests.as_ref().unwrap()
                    ["storage"]
                    .clone()
            })
            .collect();
        assert_eq!(sizes, vec![Quantity("10Gi".into()), Quantity("20Gi".into())]);
    }

    #[test]
    fn test_data_storage_resources_aggregates() {
        let mut cluster = test_cluster();
        cluster.spec.storaged.data_volume_claims =
            vec![storage_claim("10Gi", None), storage_claim("10Gi", None)];

        let total = cluster
            .storaged_component()
            .data_storage_resources()
            .unwrap()
            .unwrap();
        assert_eq!(total.requests.unwrap()["storage"].0, "20Gi");
    }

    #[test]
    fn test_log_claim_adds_one_volume() {
        let mut cluster = test_cluster();
        cluster.spec.storaged.data_volume_claims = vec![storage_claim("10Gi", None)];
        cluster.spec.storaged.base.log_volume_claim =
            Some(storage_claim("5Gi", Some("local-ssd")));

        let storaged = cluster.storaged_component();
        let mounts = storaged.generate_volume_mounts();
        let volumes = storaged.generate_volumes();
        let claims = storaged.generate_volume_claims().unwrap();

        assert_eq!(mounts.len(), 2);
        assert_eq!(volumes.len(), 2);
        assert_eq!(claims.len(), 2);

        let log_mount = mounts.iter().find(|m| m.name == "storaged-log").unwrap();
        assert_eq!(log_mount.mount_path, "/usr/local/nebula/logs");
        assert_eq!(log_mount.sub_path.as_deref(), Some("logs"));

        let log_claim = claims
            .iter()
            .find(|c| c.metadata.name.as_deref() == Some("storaged-log"))
            .unwrap();
        assert_eq!(
            log_claim.spec.as_ref().unwrap().storage_class_name.as_deref(),
            Some("local-ssd")
        );
    }

    #[test]
    fn test_ssl_mounts_generated_as_a_unit() {
        let mut cluster = test_cluster();
        cluster.spec.storaged.data_volume_claims = vec![storage_claim("10Gi", None)];
        cluster
            .spec
            .storaged
            .base
            .config
            .insert(ENABLE_SSL_KEY.to_string(), "true".to_string());
        cluster.spec.ssl_certs = Some(test_ssl_certs());

        let storaged = cluster.storaged_component();
        let mounts = storaged.generate_volume_mounts();
        let volumes = storaged.generate_volumes();

        // one data mount plus the TLS triple
        assert_eq!(mounts.len(), 4);
        assert_eq!(volumes.len(), 4);
        for name in ["server-crt", "server-key", "ca-crt"] {
            assert!(mounts.iter().any(|m| m.name == name));
            assert!(volumes.iter().any(|v| v.name == name));
        }
    }

    #[test]
    fn test_ssl_disabled_without_cert_bundle() {
        let mut cluster = test_cluster();
        cluster.spec.storaged.data_volume_claims = vec![storage_claim("10Gi", None)];
        cluster
            .spec
            .storaged
            .base
            .config
            .insert(ENABLE_SSL_KEY.to_string(), "true".to_string());

        let storaged = cluster.storaged_component();
        assert!(!storaged.is_ssl_enabled());
        assert_eq!(storaged.generate_volume_mounts().len(), 1);
        assert_eq!(storaged.generate_volumes().len(), 1);
    }

    #[test]
    fn test_no_claims_generates_nothing() {
        let cluster = test_cluster();
        let storaged = cluster.storaged_component();
        assert!(storaged.generate_volume_mounts().is_empty());
        assert!(storaged.generate_volumes().is_empty());
        assert!(storaged.generate_volume_claims().unwrap().is_empty());
    }

    #[test]
    fn test_bad_claim_size_identifies_role_and_kind() {
        let mut cluster = test_cluster();
        cluster.spec.storaged.data_volume_claims = vec![storage_claim("ten-gigs", None)];

        let err = cluster
            .storaged_component()
            .generate_volume_claims()
            .unwrap_err();
        assert_matches!(
            err,
            Error::VolumeClaimInvalid { component, kind, .. }
                if component == "storaged" && kind == "data"
        );
    }
}
