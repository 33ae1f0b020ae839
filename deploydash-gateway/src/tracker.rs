//! Ticket tracker client: issue titles and a connectivity check.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use deploydash_core::{TrackerAuthMethod, TrackerSettings};
use serde::Deserialize;

use crate::error::GatewayError;

/// REST API versions tried in order.
const API_VERSIONS: [&str; 2] = ["2", "3"];

#[derive(Clone)]
pub struct TrackerClient {
    agent: ureq::Agent,
    base_url: String,
    authorization: String,
    no_check: bool,
}

impl std::fmt::Debug for TrackerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackerClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Deserialize)]
struct IssueBody {
    fields: IssueFields,
}

#[derive(Deserialize)]
struct IssueFields {
    #[serde(default)]
    summary: String,
}

#[derive(Deserialize)]
struct MyselfBody {
    #[serde(default, rename = "displayName")]
    display_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "emailAddress")]
    email_address: Option<String>,
}

impl TrackerClient {
    pub fn from_settings(settings: &TrackerSettings, timeout: Duration) -> Result<Self, GatewayError> {
        if settings.url.trim().is_empty() {
            return Err(GatewayError::NotConfigured("tracker url"));
        }
        let token = settings
            .token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or(GatewayError::NotConfigured("tracker token"))?;

        let method = settings.effective_auth_method();
        let authorization = match method {
            TrackerAuthMethod::Basic => {
                let user = settings
                    .username
                    .as_deref()
                    .filter(|u| !u.is_empty())
                    .ok_or(GatewayError::NotConfigured("tracker username"))?;
                format!("Basic {}", STANDARD.encode(format!("{user}:{token}")))
            }
            TrackerAuthMethod::Bearer | TrackerAuthMethod::Token => format!("Bearer {token}"),
        };

        Ok(Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            base_url: trim_api_suffix(&settings.url),
            authorization,
            no_check: method == TrackerAuthMethod::Token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Summary line of issue `key`.
    pub fn issue_title(&self, key: &str) -> Result<String, GatewayError> {
        let body: IssueBody = self.get_versioned(&format!("issue/{key}"), &[("fields", "summary")])?;
        Ok(body.fields.summary)
    }

    /// Returns the authenticated user's display name.
    pub fn check_connection(&self) -> Result<String, GatewayError> {
        let me: MyselfBody = self.get_versioned("myself", &[])?;
        Ok(me
            .display_name
            .or(me.name)
            .or(me.email_address)
            .unwrap_or_default())
    }

    /// GET `rest/api/<v>/<endpoint>` for each version until one succeeds.
    /// A 401 ends the attempt immediately.
    fn get_versioned<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T, GatewayError> {
        let mut last_err = None;
        for version in API_VERSIONS {
            let url = format!("{}/rest/api/{version}/{endpoint}", self.base_url);
            let mut request = self
                .agent
                .get(&url)
                .set("Accept", "application/json")
                .set("Authorization", &self.authorization);
            if self.no_check {
                request = request.set("X-Atlassian-Token", "no-check");
            }
            for (key, value) in query {
                request = request.query(key, value);
            }

            match request.call() {
                Ok(response) => {
                    return response.into_json::<T>().map_err(|e| GatewayError::Decode {
                        url,
                        message: e.to_string(),
                    })
                }
                Err(e) => {
                    let err = GatewayError::from_ureq(&url, e);
                    if err.is_unauthorized() {
                        return Err(err);
                    }
                    tracing::debug!(%url, error = %err, "tracker request failed, trying next version");
                    last_err = Some(err);
                }
            }
        }
        Err(last_err.unwrap_or(GatewayError::NotConfigured("tracker API version")))
    }
}

/// Strip a trailing slash and any `/rest/api[/2|/3]` suffix.
fn trim_api_suffix(url: &str) -> String {
    let mut url = url.trim().trim_end_matches('/');
    for suffix in ["/rest/api/2", "/rest/api/3", "/rest/api"] {
        if let Some(stripped) = url.strip_suffix(suffix) {
            url = stripped.trim_end_matches('/');
            break;
        }
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("https://acme.atlassian.net", "https://acme.atlassian.net")]
    #[case("https://acme.atlassian.net/", "https://acme.atlassian.net")]
    #[case("https://acme.atlassian.net/rest/api/2", "https://acme.atlassian.net")]
    #[case("https://jira.acme.io/rest/api/3/", "https://jira.acme.io")]
    fn trims_api_suffix(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(trim_api_suffix(input), expected);
    }

    #[test]
    fn basic_auth_requires_username() {
        let settings = TrackerSettings {
            url: "https://acme.atlassian.net".into(),
            token: Some("t".into()),
            username: None,
            auth_method: Some(TrackerAuthMethod::Basic),
        };
        assert!(matches!(
            TrackerClient::from_settings(&settings, Duration::from_secs(5)),
            Err(GatewayError::NotConfigured("tracker username"))
        ));
    }

    #[test]
    fn missing_token_is_a_configuration_error() {
        let settings = TrackerSettings {
            url: "https://acme.atlassian.net".into(),
            ..TrackerSettings::default()
        };
        assert!(matches!(
            TrackerClient::from_settings(&settings, Duration::from_secs(5)),
            Err(GatewayError::NotConfigured("tracker token"))
        ));
    }
}
