//! Naming and addressing helpers
//!
//! Pure functions deriving object names, per-replica pod names, and
//! DNS-style addresses from a base name, ordinal, and namespace. The
//! service and pod name shapes follow the stable-identity conventions the
//! platform enforces for headless services, so every address computed here
//! resolves against the objects the generation functions produce.

/// Suffix appended to a component name for its headless service
pub const HEADLESS_SERVICE_SUFFIX: &str = "-headless";

/// Canonical name of a role's objects: `{cluster}-{component}`
pub fn component_name(cluster_name: &str, component_type: &str) -> String {
    format!("{cluster_name}-{component_type}")
}

/// Name of a role's service; headless services carry a fixed suffix
pub fn service_name(component_name: &str, headless: bool) -> String {
    if headless {
        format!("{component_name}{HEADLESS_SERVICE_SUFFIX}")
    } else {
        component_name.to_string()
    }
}

/// Fully qualified in-cluster DNS name of a service
pub fn service_fqdn(service_name: &str, namespace: &str) -> String {
    format!("{service_name}.{namespace}.svc.cluster.local")
}

/// Name of the pod at `ordinal` within a replicated workload
pub fn pod_name(component_name: &str, ordinal: i32) -> String {
    format!("{component_name}-{ordinal}")
}

/// Fully qualified DNS name of a single pod. Behind a headless service each
/// replica is individually addressable; otherwise only the service is.
pub fn pod_fqdn(pod_name: &str, service_fqdn: &str, headless: bool) -> String {
    if headless {
        format!("{pod_name}.{service_fqdn}")
    } else {
        service_fqdn.to_string()
    }
}

/// `host:port` connection string
pub fn join_host_port(host: &str, port: i32) -> String {
    format!("{host}:{port}")
}

/// Per-replica connection addresses, ordinal-ascending.
///
/// `conn_address` is the service-level address (`{name}-headless.{ns}...`);
/// each entry substitutes the pod FQDN of one ordinal, yielding exactly
/// `replicas` addresses matching the platform-assigned pod identities.
pub fn conn_addresses(conn_address: &str, name: &str, replicas: i32) -> Vec<String> {
    (0..replicas)
        .map(|ordinal| conn_address.replacen(name, &format!("{name}-{ordinal}.{name}"), 1))
        .collect()
}
