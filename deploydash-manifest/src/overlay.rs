//! Image tag extraction from kustomization overlays.
//!
//! The scan is line based so that half-edited or templated files still
//! yield whatever tag is readable instead of failing to parse as YAML.

use serde::Serialize;

use crate::coordinates::{LayoutMismatch, OverlayCoordinates};

/// An overlay file resolved to its target and the tag it pins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverlayTag {
    pub path: String,
    pub coordinates: OverlayCoordinates,
    /// `None` when the overlay does not set an image for the service.
    pub tag: Option<String>,
}

/// Derive coordinates from `path` and extract the tag for the service they name.
pub fn read_overlay(path: &str, content: &str) -> Result<OverlayTag, LayoutMismatch> {
    let coordinates = OverlayCoordinates::from_path(path)?;
    let tag = extract_image_tag(content, &coordinates.service);
    Ok(OverlayTag {
        path: path.to_string(),
        coordinates,
        tag,
    })
}

/// Return the `newTag` of the first `images:` entry whose `name` or
/// `newName` contains `service` (case-sensitive).
///
/// The `images:` block ends at the first unindented line that is not a list
/// item or a `---` separator. Fields of an entry may come in any order, so an
/// entry is only judged once it closes.
pub fn extract_image_tag(content: &str, service: &str) -> Option<String> {
    if service.is_empty() {
        return None;
    }

    let mut in_images = false;
    let mut entry = ImageEntry::default();

    for raw in content.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line == "images:" {
            if let Some(tag) = entry.close() {
                return Some(tag);
            }
            in_images = true;
            continue;
        }
        if !in_images {
            continue;
        }

        let indented = raw.starts_with(char::is_whitespace);
        let list_item = line.starts_with('-');
        if !indented && !list_item && line != "---" {
            if let Some(tag) = entry.close() {
                return Some(tag);
            }
            in_images = false;
            continue;
        }

        if list_item {
            if let Some(tag) = entry.close() {
                return Some(tag);
            }
        }

        let Some((key, value)) = split_field(line) else {
            continue;
        };
        match key {
            "name" | "newName" => {
                if value.contains(service) {
                    entry.matched = true;
                }
            }
            "newTag" if entry.tag.is_none() => {
                let tag = unquote(value);
                if !tag.is_empty() {
                    entry.tag = Some(tag.to_string());
                }
            }
            _ => {}
        }
    }

    entry.close()
}

/// The `images:` list item currently being read.
#[derive(Default)]
struct ImageEntry {
    matched: bool,
    tag: Option<String>,
}

impl ImageEntry {
    /// End the entry, yielding its tag when it named the service.
    fn close(&mut self) -> Option<String> {
        let entry = std::mem::take(self);
        entry.tag.filter(|_| entry.matched)
    }
}

/// `- key: value` or `key: value` → `(key, value)`.
fn split_field(line: &str) -> Option<(&str, &str)> {
    let line = line.strip_prefix('-').unwrap_or(line).trim_start();
    let (key, value) = line.split_once(':')?;
    Some((key.trim(), value.trim()))
}

/// Drop a trailing ` # comment`, then surrounding quotes.
fn unquote(value: &str) -> &str {
    let value = match value.find(" #") {
        Some(at) => &value[..at],
        None => value,
    };
    value.trim().trim_matches(|c| c == '"' || c == '\'').trim()
}
