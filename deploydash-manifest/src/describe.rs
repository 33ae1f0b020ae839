//! One-line service descriptions from README and package descriptors.

/// First non-empty README line that is not a heading; otherwise the
/// `description` field of `package.json`; otherwise empty.
pub fn describe_service(readme: Option<&str>, package_json: Option<&str>) -> String {
    if let Some(line) = readme.and_then(readme_summary) {
        return line;
    }
    package_json
        .and_then(package_description)
        .unwrap_or_default()
}

fn readme_summary(readme: &str) -> Option<String> {
    readme
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
}

fn package_description(json: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(json).ok()?;
    value
        .get("description")
        .and_then(|d| d.as_str())
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readme_skips_headings_and_blank_lines() {
        let readme = "# Payments\n\n## Overview\nHandles card capture.\nMore text.";
        assert_eq!(describe_service(Some(readme), None), "Handles card capture.");
    }

    #[test]
    fn falls_back_to_package_json() {
        let readme = "# Title only\n";
        let pkg = r#"{"name": "web", "description": "Storefront UI"}"#;
        assert_eq!(describe_service(Some(readme), Some(pkg)), "Storefront UI");
    }

    #[test]
    fn invalid_package_json_yields_empty() {
        assert_eq!(describe_service(None, Some("{not json")), "");
        assert_eq!(describe_service(None, None), "");
    }
}
