//! Shared generation algorithms
//!
//! Each function maps one component view onto one platform object:
//! workload (kind-agnostic), service, config map, and persistent volume
//! claims. All of them are pure; generating twice from an unchanged
//! cluster yields structurally identical objects, which is what lets the
//! reconciler diff desired against live state.

use crate::cluster::component::ClusterComponent;
use crate::cluster::quantity;
use crate::error::{Error, Result};
use k8s_openapi::api::core::v1::{
    ConfigMap, ConfigMapVolumeSource, Container, KeyToPath, PersistentVolumeClaim,
    PersistentVolumeClaimSpec, PersistentVolumeClaimVolumeSource, PodSpec, PodTemplateSpec,
    SecretVolumeSource, Service, ServicePort, ServiceSpec, TopologySpreadConstraint, Volume,
    VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::debug;

// =============================================================================
// Layout Constants
// =============================================================================

pub const DATA_MOUNT_PATH: &str = "/usr/local/nebula/data";
pub const LOG_MOUNT_PATH: &str = "/usr/local/nebula/logs";
pub const CERT_MOUNT_PATH: &str = "/usr/local/nebula/certs";
pub const CONFIG_MOUNT_PATH: &str = "/usr/local/nebula/etc";

const ACCESS_MODE_SINGLE_WRITER: &str = "ReadWriteOnce";
const SPREAD_TOPOLOGY_KEY: &str = "kubernetes.io/hostname";

/// TLS volume names paired with the file each one projects
const CERT_FILES: &[(&str, &str)] = &[
    ("server-crt", "server.crt"),
    ("server-key", "server.key"),
    ("ca-crt", "ca.crt"),
];

// =============================================================================
// Volume Naming
// =============================================================================

/// Name shared by a data claim, its volume, and its mount
pub fn data_volume_name(component_type: &str, index: usize) -> String {
    if index > 0 {
        format!("{component_type}-data-{index}")
    } else {
        format!("{component_type}-data")
    }
}

/// Name shared by the log claim, its volume, and its mount
pub fn log_volume_name(component_type: &str) -> String {
    format!("{component_type}-log")
}

fn config_volume_name(component_type: &str) -> String {
    format!("{component_type}-config")
}

// =============================================================================
// Volume Generation
// =============================================================================

/// Mounts for the role's storage: one per data claim (first at the
/// canonical data path, the rest at indexed paths), the optional log
/// mount, and the TLS triple when SSL is enabled.
pub fn generate_volume_mounts(component: &(impl ClusterComponent + ?Sized)) -> Vec<VolumeMount> {
    let component_type = component.component_type();
    let mut mounts = Vec::new();

    for index in 0..component.data_volume_claims().len() {
        let (mount_path, sub_path) = if index > 0 {
            (format!("{DATA_MOUNT_PATH}{index}"), format!("data{index}"))
        } else {
            (DATA_MOUNT_PATH.to_string(), "data".to_string())
        };
        mounts.push(VolumeMount {
            name: data_volume_name(component_type.as_str(), index),
            mount_path,
            sub_path: Some(sub_path),
            ..Default::default()
        });
    }

    if component.log_volume_claim().is_some() {
        mounts.push(VolumeMount {
            name: log_volume_name(component_type.as_str()),
            mount_path: LOG_MOUNT_PATH.to_string(),
            sub_path: Some("logs".to_string()),
            ..Default::default()
        });
    }

    if component.is_ssl_enabled() {
        for (name, file) in CERT_FILES {
            mounts.push(VolumeMount {
                name: (*name).to_string(),
                read_only: Some(true),
                mount_path: format!("{CERT_MOUNT_PATH}/{file}"),
                sub_path: Some((*file).to_string()),
                ..Default::default()
            });
        }
    }

    mounts
}

/// Volumes backing [`generate_volume_mounts`]: claim-backed volumes for
/// data and logs, secret-backed volumes for the TLS triple.
pub fn generate_volumes(component: &(impl ClusterComponent + ?Sized)) -> Vec<Volume> {
    let component_type = component.component_type();
    let mut volumes = Vec::new();

    for index in 0..component.data_volume_claims().len() {
        let volume_name = data_volume_name(component_type.as_str(), index);
        volumes.push(claim_volume(&volume_name));
    }

    if component.log_volume_claim().is_some() {
        volumes.push(claim_volume(&log_volume_name(component_type.as_str())));
    }

    if component.is_ssl_enabled() {
        if let Some(certs) = component.cluster().spec.ssl_certs.as_ref() {
            volumes.push(secret_volume(
                "server-crt",
                &certs.server_secret,
                &certs.server_public_key,
                "server.crt",
            ));
            volumes.push(secret_volume(
                "server-key",
                &certs.server_secret,
                &certs.server_private_key,
                "server.key",
            ));
            volumes.push(secret_volume(
                "ca-crt",
                &certs.ca_secret,
                &certs.ca_public_key,
                "ca.crt",
            ));
        }
    }

    volumes
}

/// Persistent volume claims for the role: one per data claim plus the
/// optional log claim. Fails identifying the role and volume kind when a
/// requested size does not parse.
pub fn generate_volume_claims(
    component: &(impl ClusterComponent + ?Sized),
) -> Result<Vec<PersistentVolumeClaim>> {
    let component_type = component.component_type();
    let mut claims = Vec::new();

    for (index, claim) in component.data_volume_claims().iter().enumerate() {
        let storage =
            quantity::parse_storage_request(&claim.resources).map_err(|source| {
                Error::VolumeClaimInvalid {
                    component: component_type.to_string(),
                    kind: "data".to_string(),
                    source: Box::new(source),
                }
            })?;
        claims.push(PersistentVolumeClaim {
            metadata: ObjectMeta {
                name: Some(data_volume_name(component_type.as_str(), index)),
                ..Default::default()
            },
            spec: Some(PersistentVolumeClaimSpec {
                access_modes: Some(vec![ACCESS_MODE_SINGLE_WRITER.to_string()]),
                resources: Some(storage),
                storage_class_name: claim.storage_class_name.clone(),
                ..Default::default()
            }),
            ..Default::default()
        });
    }

    if let Some(log_claim) = component.log_volume_claim() {
        let storage =
            quantity::parse_storage_request(&log_claim.resources).map_err(|source| {
                Error::VolumeClaimInvalid {
                    component: component_type.to_string(),
                    kind: "log".to_string(),
                    source: Box::new(source),
                }
            })?;
        claims.push(PersistentVolumeClaim {
            metadata: ObjectMeta {
                name: Some(log_volume_name(component_type.as_str())),
                ..Default::default()
            },
            spec: Some(PersistentVolumeClaimSpec {
                access_modes: Some(vec![ACCESS_MODE_SINGLE_WRITER.to_string()]),
                resources: Some(storage),
                storage_class_name: component.log_storage_class(),
                ..Default::default()
            }),
            ..Default::default()
        });
    }

    Ok(claims)
}

// =============================================================================
// Workload Generation
// =============================================================================

/// Build the role's replicated workload as a kind-agnostic object stamped
/// with the caller-supplied group/version/kind, so the reconciler decides
/// which workload kind actually backs the role.
pub fn generate_workload(
    component: &(impl ClusterComponent + ?Sized),
    gvk: &GroupVersionKind,
    config_map: &ConfigMap,
    enable_even_pods_spread: bool,
) -> Result<DynamicObject> {
    let component_type = component.component_type();
    let name = component.name();
    let namespace = component.namespace();
    let labels = component.generate_labels();
    let config_key = component.config_map_key();

    let mut volume_mounts = component.generate_volume_mounts();
    volume_mounts.push(VolumeMount {
        name: config_volume_name(component_type.as_str()),
        mount_path: CONFIG_MOUNT_PATH.to_string(),
        read_only: Some(true),
        ..Default::default()
    });

    let container = Container {
        name: component_type.to_string(),
        image: Some(component.image()),
        ports: Some(component.container_ports()),
        env: optional(component.pod_env_vars().to_vec()),
        resources: Some(component.resources()),
        readiness_probe: component.readiness_probe().cloned(),
        volume_mounts: Some(volume_mounts),
        ..Default::default()
    };
    let mut containers = vec![container];
    containers.extend(component.sidecar_containers().iter().cloned());

    let mut volumes = component.generate_volumes();
    volumes.push(Volume {
        name: config_volume_name(component_type.as_str()),
        config_map: Some(ConfigMapVolumeSource {
            name: config_map.metadata.name.clone(),
            items: Some(vec![KeyToPath {
                key: config_key.clone(),
                path: config_key,
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    });
    volumes.extend(component.sidecar_volumes().iter().cloned());

    let mut pod_spec = PodSpec {
        containers,
        init_containers: optional(component.init_containers().to_vec()),
        volumes: Some(volumes),
        node_selector: optional_map(component.node_selector()),
        affinity: component.affinity().cloned(),
        tolerations: optional(component.tolerations().to_vec()),
        ..Default::default()
    };

    if enable_even_pods_spread {
        pod_spec.topology_spread_constraints = Some(vec![TopologySpreadConstraint {
            max_skew: 1,
            topology_key: SPREAD_TOPOLOGY_KEY.to_string(),
            when_unsatisfiable: "ScheduleAnyway".to_string(),
            label_selector: Some(LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            }),
            ..Default::default()
        }]);
    }

    let template = PodTemplateSpec {
        metadata: Some(ObjectMeta {
            labels: Some(merge_string_maps(&labels, component.pod_labels())),
            annotations: optional_map(component.pod_annotations().clone()),
            ..Default::default()
        }),
        spec: Some(pod_spec),
    };

    let api_resource = ApiResource::from_gvk(gvk);
    let mut workload = DynamicObject::new(&name, &api_resource).within(&namespace);
    workload.metadata.labels = Some(labels.clone());
    workload.metadata.owner_references = Some(component.cluster().generate_owner_references());
    workload.data = json!({
        "spec": {
            "replicas": component.replicas(),
            "serviceName": component.service_name(),
            "selector": { "matchLabels": labels },
            "template": serde_json::to_value(&template)?,
        }
    });

    debug!(
        component = %component_type,
        workload = %name,
        kind = %gvk.kind,
        "generated workload"
    );
    Ok(workload)
}

// =============================================================================
// Service Generation
// =============================================================================

/// One service per role, headless by default so each replica keeps a
/// stable DNS identity. A per-role service override may replace the type
/// and cluster IP, never the selector.
pub fn generate_service(component: &(impl ClusterComponent + ?Sized)) -> Service {
    let labels = component.generate_labels();
    let ports: Vec<ServicePort> = component
        .container_ports()
        .iter()
        .map(|port| ServicePort {
            name: port.name.clone(),
            port: port.container_port,
            ..Default::default()
        })
        .collect();

    let mut spec = ServiceSpec {
        selector: Some(labels.clone()),
        ports: Some(ports),
        ..Default::default()
    };
    if component.is_headless_service() {
        spec.cluster_ip = Some("None".to_string());
        spec.publish_not_ready_addresses = Some(true);
    }

    let mut annotations = BTreeMap::new();
    if let Some(service_override) = component.service_spec() {
        if let Some(type_) = service_override.type_.as_ref() {
            spec.type_ = Some(type_.clone());
        }
        if let Some(cluster_ip) = service_override.cluster_ip.as_ref() {
            spec.cluster_ip = Some(cluster_ip.clone());
        }
        annotations = service_override.annotations.clone();
    }

    debug!(
        component = %component.component_type(),
        service = %component.service_name(),
        "generated service"
    );

    Service {
        metadata: ObjectMeta {
            name: Some(component.service_name()),
            namespace: Some(component.namespace()),
            labels: Some(labels),
            annotations: optional_map(annotations),
            owner_references: Some(component.cluster().generate_owner_references()),
            ..Default::default()
        },
        spec: Some(spec),
        ..Default::default()
    }
}

// =============================================================================
// ConfigMap Generation
// =============================================================================

/// One key/value bundle per role: the role's built-in parameter table
/// merged with user-supplied config (user keys win), rendered as a
/// gflags-style file under the role-qualified key.
pub fn generate_config_map(component: &(impl ClusterComponent + ?Sized)) -> ConfigMap {
    let content = render_config(
        component.component_type().default_config(),
        component.config(),
    );
    let mut data = BTreeMap::new();
    data.insert(component.config_map_key(), content);

    ConfigMap {
        metadata: ObjectMeta {
            name: Some(component.name()),
            namespace: Some(component.namespace()),
            labels: Some(component.generate_labels()),
            owner_references: Some(component.cluster().generate_owner_references()),
            ..Default::default()
        },
        data: Some(data),
        ..Default::default()
    }
}

/// Merge two string maps; right-biased on key collision. Neither input
/// is mutated.
pub fn merge_string_maps(
    base: &BTreeMap<String, String>,
    overrides: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = base.clone();
    merged.extend(
        overrides
            .iter()
            .map(|(key, value)| (key.clone(), value.clone())),
    );
    merged
}

fn render_config(
    defaults: &[(&str, &str)],
    overrides: &BTreeMap<String, String>,
) -> String {
    let base: BTreeMap<String, String> = defaults
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    let merged = merge_string_maps(&base, overrides);

    let mut content = String::new();
    for (key, value) in &merged {
        content.push_str(&format!("--{key}={value}\n"));
    }
    content
}

// =============================================================================
// Helpers
// =============================================================================

fn claim_volume(volume_name: &str) -> Volume {
    Volume {
        name: volume_name.to_string(),
        persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
            claim_name: volume_name.to_string(),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn secret_volume(volume_name: &str, secret_name: &str, key: &str, path: &str) -> Volume {
    Volume {
        name: volume_name.to_string(),
        secret: Some(SecretVolumeSource {
            secret_name: Some(secret_name.to_string()),
            items: Some(vec![KeyToPath {
                key: key.to_string(),
                path: path.to_string(),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn optional<T>(values: Vec<T>) -> Option<Vec<T>> {
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

fn optional_map(map: BTreeMap<String, String>) -> Option<BTreeMap<String, String>> {
    if map.is_empty() {
        None
    } else {
        Some(map)
    }
}
