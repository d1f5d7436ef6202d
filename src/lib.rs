//! NebulaGraph Cluster Operator - Component Layer
//!
//! Maps a declarative NebulaCluster specification onto the runtime
//! objects the platform needs to run a NebulaGraph cluster: one
//! replicated workload, one headless service, and one config bundle per
//! role, plus the storage role's persistent volume claims.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        NebulaCluster CRD                        │
//! │        (graphd / metad / storaged desired state + status)       │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                        Cluster Facade                           │
//! │     role resolution · endpoints · SSL/feature predicates        │
//! ├───────────────────┬────────────────────┬────────────────────────┤
//! │  GraphdComponent  │   MetadComponent   │   StoragedComponent    │
//! │           (one polymorphic contract, three role views)          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                     Generation Functions                        │
//! │     workload · service · config map · volume claims/mounts      │
//! ├──────────────────────────────┬──────────────────────────────────┤
//! │      Naming / Addressing     │       Quantity Parsing           │
//! └──────────────────────────────┴──────────────────────────────────┘
//! ```
//!
//! Everything in this layer is pure computation over an in-memory
//! cluster snapshot: the reconciler that watches the cluster, applies
//! the generated objects, and writes status back lives outside this
//! crate.
//!
//! # Modules
//!
//! - [`crd`]: the NebulaCluster custom resource and its sub-types
//! - [`cluster`]: component contract, role views, generation functions
//! - [`error`]: error types and requeue policy

pub mod cluster;
pub mod crd;
pub mod error;

// Re-export commonly used types
pub use cluster::{
    ClusterComponent, ComponentType,
    GraphdComponent, MetadComponent, StoragedComponent,
};

pub use crd::{
    NebulaCluster, NebulaClusterSpec, NebulaClusterStatus,
    ComponentSpec, StoragedSpec, ComponentStatus, WorkloadStatus,
    PodOverrides, StorageClaim, SslCertsSpec, ServiceSpec, LogRotate,
};

pub use error::{Error, ErrorAction, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
