//! Deployment coordinates encoded in an overlay's path.
//!
//! The layout is positional:
//!
//! ```text
//! [prefix/]services/<service>/overlays/<environment>/<region>/<namespace>/<file>
//! ```
//!
//! Exactly six segments must follow the first `services` segment, and the
//! second of them must be `overlays`. Nothing in the manifest content
//! restates these values; this module is their only source.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::SERVICES_DIR;

const OVERLAYS_DIR: &str = "overlays";
const SEGMENTS_AFTER_SERVICES: usize = 6;

/// The deployment target an overlay file describes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct OverlayCoordinates {
    pub service: String,
    pub environment: String,
    pub region: String,
    pub namespace: String,
}

/// Why a path does not follow the overlay layout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutMismatch {
    #[error("no 'services' segment in path")]
    MissingServices,

    #[error("expected 6 segments after 'services', found {found}")]
    SegmentCount { found: usize },

    #[error("expected 'overlays' after the service name, found '{found}'")]
    MissingOverlays { found: String },
}

impl OverlayCoordinates {
    /// Derive coordinates from a repository-relative path.
    ///
    /// Empty and `.` segments are ignored, so `./services//a/...` parses
    /// the same as `services/a/...`.
    pub fn from_path(path: &str) -> Result<Self, LayoutMismatch> {
        let segments: Vec<&str> = path
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .collect();

        let start = segments
            .iter()
            .position(|s| *s == SERVICES_DIR)
            .ok_or(LayoutMismatch::MissingServices)?;
        let rest = &segments[start + 1..];

        if rest.len() != SEGMENTS_AFTER_SERVICES {
            return Err(LayoutMismatch::SegmentCount { found: rest.len() });
        }
        if rest[1] != OVERLAYS_DIR {
            return Err(LayoutMismatch::MissingOverlays {
                found: rest[1].to_string(),
            });
        }

        Ok(Self {
            service: rest[0].to_string(),
            environment: rest[2].to_string(),
            region: rest[3].to_string(),
            namespace: rest[4].to_string(),
        })
    }
}

impl fmt::Display for OverlayCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}/{}/{}",
            self.service, self.environment, self.region, self.namespace
        )
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn canonical_path() {
        let coords = OverlayCoordinates::from_path(
            "services/payment-api/overlays/prod/us-west-2/billing/kustomization.yaml",
        )
        .expect("layout");
        assert_eq!(
            coords,
            OverlayCoordinates {
                service: "payment-api".into(),
                environment: "prod".into(),
                region: "us-west-2".into(),
                namespace: "billing".into(),
            }
        );
        assert_eq!(coords.to_string(), "payment-api@prod/us-west-2/billing");
    }

    #[test]
    fn prefix_and_dot_segments_are_tolerated() {
        let coords =
            OverlayCoordinates::from_path("./deploy/services/web/overlays/dev/local/default/kustomization.yaml")
                .expect("layout");
        assert_eq!(coords.service, "web");
        assert_eq!(coords.namespace, "default");
    }

    #[rstest]
    #[case("services/api/overlays/prod/kustomization.yaml", LayoutMismatch::SegmentCount { found: 4 })]
    #[case("services/kustomization.yaml", LayoutMismatch::SegmentCount { found: 1 })]
    #[case(
        "services/api/overlays/prod/us/ns/extra/kustomization.yaml",
        LayoutMismatch::SegmentCount { found: 7 }
    )]
    #[case(
        "services/api/base/prod/us/ns/kustomization.yaml",
        LayoutMismatch::MissingOverlays { found: "base".into() }
    )]
    #[case("apps/api/overlays/prod/us/ns/kustomization.yaml", LayoutMismatch::MissingServices)]
    fn malformed_paths(#[case] path: &str, #[case] expected: LayoutMismatch) {
        assert_eq!(OverlayCoordinates::from_path(path), Err(expected));
    }
}
