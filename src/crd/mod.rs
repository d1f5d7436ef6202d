//! Custom Resource Definitions for the NebulaGraph cluster operator
//!
//! This module contains the NebulaCluster CRD and its sub-types:
//! - NebulaClusterSpec: desired state of the three cluster roles
//! - NebulaClusterStatus: observed per-role workload state

pub mod nebula_cluster;

pub use nebula_cluster::*;
