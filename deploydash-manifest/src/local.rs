//! Overlay scan over a local checkout of a manifest repository.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::coordinates::LayoutMismatch;
use crate::overlay::{read_overlay, OverlayTag};
use crate::{ManifestError, KUSTOMIZATION_FILE, SERVICES_DIR};

/// Result of walking `<root>/services` for overlay files.
#[derive(Debug, Default, Serialize)]
pub struct CheckoutScan {
    /// Overlays that follow the layout, with or without a tag.
    pub overlays: Vec<OverlayTag>,
    /// Overlay files whose path does not follow the layout.
    #[serde(serialize_with = "serialize_skipped")]
    pub skipped: Vec<(String, LayoutMismatch)>,
}

/// Walk `<root>/services` depth-first and read every `kustomization.yaml`.
///
/// A checkout without a `services` directory scans to an empty result.
/// Unreadable subdirectories are skipped; an unreadable overlay file is an error.
pub fn scan_checkout(root: &Path) -> Result<CheckoutScan, ManifestError> {
    let mut scan = CheckoutScan::default();
    let services = root.join(SERVICES_DIR);
    if !services.is_dir() {
        return Ok(scan);
    }

    let mut files = Vec::new();
    collect_overlay_files(&services, &mut files);
    files.sort();

    for file in files {
        let relative = relative_path(root, &file);
        let content = fs::read_to_string(&file).map_err(|source| ManifestError::Io {
            path: file.clone(),
            source,
        })?;
        match read_overlay(&relative, &content) {
            Ok(overlay) => scan.overlays.push(overlay),
            Err(mismatch) => {
                tracing::warn!(path = %relative, reason = %mismatch, "overlay path does not follow layout");
                scan.skipped.push((relative, mismatch));
            }
        }
    }
    Ok(scan)
}

fn collect_overlay_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::debug!(path = %dir.display(), error = %err, "skipping unreadable directory");
            return;
        }
    };
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            collect_overlay_files(&path, out);
        } else if entry.file_name() == KUSTOMIZATION_FILE {
            out.push(path);
        }
    }
}

/// `/checkout/services/a/b` → `services/a/b`, always with `/` separators.
fn relative_path(root: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn serialize_skipped<S>(skipped: &[(String, LayoutMismatch)], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use serde::ser::SerializeSeq;

    let mut seq = serializer.serialize_seq(Some(skipped.len()))?;
    for (path, mismatch) in skipped {
        seq.serialize_element(&serde_json::json!({
            "path": path,
            "reason": mismatch.to_string(),
        }))?;
    }
    seq.end()
}
