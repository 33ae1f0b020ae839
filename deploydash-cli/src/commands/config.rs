//! `deploydash config show|set`

use anyhow::{bail, Context, Result};
use clap::Subcommand;

use deploydash_core::settings::{self, Settings, TrackerAuthMethod, TrackerSettings};

use super::{home, print_json};

const KEYS: &str = "github-token, github-api-url, sync-interval, http-timeout, \
                    tracker-url, tracker-token, tracker-username, tracker-auth";

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective settings with secrets masked.
    Show {
        #[arg(long)]
        json: bool,
    },

    /// Set one key. An empty value clears optional keys.
    Set { key: String, value: String },
}

pub fn run(cmd: ConfigCommand) -> Result<()> {
    let home = home()?;
    match cmd {
        ConfigCommand::Show { json } => {
            let settings = settings::load_at(&home).context("failed to load settings")?;
            let masked = masked(&settings);
            if json {
                return print_json(&masked);
            }
            let yaml = serde_yaml::to_string(&masked).context("failed to render settings")?;
            print!("{yaml}");
            println!("# file: {}", settings::settings_path_at(&home).display());
            println!("# database: {}", settings::database_path_at(&home).display());
        }
        ConfigCommand::Set { key, value } => {
            let mut settings = settings::load_at(&home).context("failed to load settings")?;
            apply(&mut settings, &key, &value)?;
            settings::save_at(&home, &settings).context("failed to save settings")?;
            println!("✓ Set {key}");
        }
    }
    Ok(())
}

fn masked(settings: &Settings) -> Settings {
    let mut out = settings.clone();
    out.github_token = out.github_token.as_deref().map(mask);
    if let Some(tracker) = out.tracker.as_mut() {
        tracker.token = tracker.token.as_deref().map(mask);
    }
    out
}

/// `****` plus the last four characters; short secrets are fully hidden.
fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn apply(settings: &mut Settings, key: &str, value: &str) -> Result<()> {
    match key {
        "github-token" => settings.github_token = optional(value),
        "github-api-url" => settings.github_api_url = optional(value),
        "sync-interval" => {
            let secs: u64 = value
                .trim()
                .parse()
                .with_context(|| format!("sync-interval must be seconds, got '{value}'"))?;
            if secs == 0 {
                bail!("sync-interval must be at least 1 second");
            }
            settings.sync_interval_secs = secs;
        }
        "http-timeout" => {
            settings.http_timeout_secs = value
                .trim()
                .parse()
                .with_context(|| format!("http-timeout must be seconds, got '{value}'"))?;
        }
        "tracker-url" => match optional(value) {
            Some(url) => settings.tracker.get_or_insert_with(TrackerSettings::default).url = url,
            None => settings.tracker = None,
        },
        "tracker-token" => tracker_mut(settings, key)?.token = optional(value),
        "tracker-username" => tracker_mut(settings, key)?.username = optional(value),
        "tracker-auth" => {
            let method = match value.trim().to_ascii_lowercase().as_str() {
                "" => None,
                "basic" => Some(TrackerAuthMethod::Basic),
                "bearer" => Some(TrackerAuthMethod::Bearer),
                "token" => Some(TrackerAuthMethod::Token),
                other => bail!("unknown tracker auth '{other}'; expected: basic, bearer, token"),
            };
            tracker_mut(settings, key)?.auth_method = method;
        }
        other => bail!("unknown key '{other}'; expected one of: {KEYS}"),
    }
    Ok(())
}

fn tracker_mut<'a>(settings: &'a mut Settings, key: &str) -> Result<&'a mut TrackerSettings> {
    match settings.tracker.as_mut() {
        Some(tracker) => Ok(tracker),
        None => bail!("set tracker-url before {key}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_keeps_only_the_tail_of_long_secrets() {
        assert_eq!(mask("ghp_abcdefghijkl"), "****ijkl");
        assert_eq!(mask("short"), "****");
    }

    #[test]
    fn tracker_keys_require_a_url_first() {
        let mut settings = Settings::default();
        let err = apply(&mut settings, "tracker-token", "t").expect_err("no tracker yet");
        assert!(err.to_string().contains("tracker-url"));

        apply(&mut settings, "tracker-url", "https://acme.atlassian.net").expect("url");
        apply(&mut settings, "tracker-auth", "Token").expect("auth");
        let tracker = settings.tracker.expect("tracker");
        assert_eq!(tracker.auth_method, Some(TrackerAuthMethod::Token));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let mut settings = Settings::default();
        assert!(apply(&mut settings, "sync-interval", "0").is_err());
        apply(&mut settings, "sync-interval", "120").expect("valid");
        assert_eq!(settings.sync_interval_secs, 120);
    }

    #[test]
    fn empty_value_clears_optional_keys() {
        let mut settings = Settings {
            github_api_url: Some("https://git.acme.corp".into()),
            ..Settings::default()
        };
        apply(&mut settings, "github-api-url", " ").expect("clear");
        assert_eq!(settings.github_api_url, None);
    }
}
