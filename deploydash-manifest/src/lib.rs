//! Manifest scanning for `deploydash-manifest`.
//!
//! Pure functions over file content and repository-relative paths:
//!
//! - [`overlay::extract_image_tag`]: image tag for a service in a kustomization overlay
//! - [`coordinates::OverlayCoordinates`]: (service, environment, region, namespace) from a path
//! - [`resources::parse_resource_manifests`]: generic Kubernetes objects in a YAML file
//! - [`describe::describe_service`]: one-line description from README / package.json
//! - [`local::scan_checkout`]: the same overlay scan over a local checkout

pub mod coordinates;
pub mod describe;
pub mod local;
pub mod overlay;
pub mod resources;

use thiserror::Error;

pub use coordinates::{LayoutMismatch, OverlayCoordinates};
pub use describe::describe_service;
pub use local::{scan_checkout, CheckoutScan};
pub use overlay::{extract_image_tag, read_overlay, OverlayTag};
pub use resources::{is_manifest_file, parse_resource_manifests};

/// File name every overlay manifest carries.
pub const KUSTOMIZATION_FILE: &str = "kustomization.yaml";

/// Directory that roots the overlay layout.
pub const SERVICES_DIR: &str = "services";

/// Errors from scanning a local checkout.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}
