//! Generic Kubernetes object discovery in plain manifest files.

use deploydash_core::ResourceManifest;
use serde::Deserialize;

/// Kinds that configure the build rather than describe cluster objects.
const BUILD_KINDS: &[&str] = &["Kustomization", "Component"];

#[derive(Debug, Deserialize)]
struct ObjectHeader {
    kind: Option<String>,
    #[serde(default)]
    metadata: Option<ObjectMeta>,
}

#[derive(Debug, Deserialize)]
struct ObjectMeta {
    name: Option<String>,
    #[serde(default)]
    namespace: Option<String>,
}

/// Whether a file name looks like a Kubernetes manifest.
pub fn is_manifest_file(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".yaml") || lower.ends_with(".yml")
}

/// Parse every YAML document in `content` and keep the ones that name a
/// Kubernetes object (`kind` plus `metadata.name`).
///
/// Documents that fail to parse, or lack either field, are skipped.
pub fn parse_resource_manifests(content: &str, path: &str) -> Vec<ResourceManifest> {
    let mut found = Vec::new();
    for document in serde_yaml::Deserializer::from_str(content) {
        let header = match ObjectHeader::deserialize(document) {
            Ok(header) => header,
            Err(err) => {
                tracing::debug!(path, error = %err, "skipping unparseable manifest document");
                continue;
            }
        };
        let Some(kind) = header.kind.filter(|k| !k.is_empty()) else {
            continue;
        };
        if BUILD_KINDS.contains(&kind.as_str()) {
            continue;
        }
        let Some(meta) = header.metadata else {
            continue;
        };
        let Some(name) = meta.name.filter(|n| !n.is_empty()) else {
            continue;
        };
        found.push(ResourceManifest {
            name,
            path: path.to_string(),
            resource_kind: kind,
            namespace: meta.namespace.unwrap_or_default(),
        });
    }
    found
}
