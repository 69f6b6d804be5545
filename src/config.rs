use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::auth::ServiceAccountKey;

const DEFAULT_API_BASE_URL: &str = "https://analyticsdata.googleapis.com/v1beta";
const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 30;

pub(crate) fn setup_config_path(cli_override: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = cli_override {
        return Some(path);
    }
    if let Ok(path) = std::env::var("GA4_SETUP_CONFIG_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    None
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct SetupConfigOverrides {
    #[serde(default)]
    credentials_path: Option<String>,
    #[serde(default)]
    default_time_zone: Option<String>,
    #[serde(default)]
    api_base_url: Option<String>,
    #[serde(default)]
    oauth_scopes: Option<String>,
    #[serde(default)]
    http_timeout_seconds: Option<u64>,
}

fn load_setup_config_overrides(path: &Path) -> Option<SetupConfigOverrides> {
    if !path.exists() {
        return None;
    }
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "failed to read setup config; using env defaults"
            );
            return None;
        }
    };
    match serde_json::from_str(&contents) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "failed to parse setup config; using env defaults"
            );
            None
        }
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Clone)]
pub struct Ga4Config {
    pub credentials: ServiceAccountKey,
    pub oauth_scopes: Option<String>,
    pub default_time_zone: Tz,
    pub api_base_url: String,
    pub http_timeout_seconds: u64,
}

impl Ga4Config {
    /// Assemble configuration from the environment, with an optional JSON
    /// setup file whose fields take precedence over env values.
    pub fn from_env(setup_config: Option<PathBuf>) -> Result<Self> {
        let mut credentials_path = env_nonempty("GA4_CREDENTIALS_PATH");
        let credentials_json = env_nonempty("GA4_CREDENTIALS_JSON");
        let client_email = env_nonempty("GA4_CLIENT_EMAIL");
        let private_key = env_nonempty("GA4_PRIVATE_KEY");
        let mut default_time_zone = env_nonempty("GA4_DEFAULT_TIME_ZONE");
        let mut api_base_url =
            env_nonempty("GA4_API_BASE_URL").unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let mut oauth_scopes = env_nonempty("GA4_OAUTH_SCOPES");
        let mut http_timeout_seconds = env_nonempty("GA4_HTTP_TIMEOUT_SECONDS")
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECONDS);

        if let Some(path) = setup_config_path(setup_config) {
            if let Some(overrides) = load_setup_config_overrides(&path) {
                apply_setup_overrides(
                    &overrides,
                    &mut credentials_path,
                    &mut default_time_zone,
                    &mut api_base_url,
                    &mut oauth_scopes,
                    &mut http_timeout_seconds,
                );
            }
        }

        let credentials = if let Some(raw) = credentials_json {
            ServiceAccountKey::from_json(&raw)?
        } else if let Some(path) = credentials_path {
            let contents = std::fs::read_to_string(&path).with_context(|| {
                format!("failed to read service account credentials from {path}")
            })?;
            ServiceAccountKey::from_json(&contents)?
        } else if client_email.is_some() || private_key.is_some() {
            ServiceAccountKey::from_fields(
                client_email.as_deref().unwrap_or(""),
                private_key.as_deref().unwrap_or(""),
            )?
        } else {
            anyhow::bail!(
                "no service account configured; set GA4_CREDENTIALS_PATH, \
                 GA4_CREDENTIALS_JSON, or GA4_CLIENT_EMAIL/GA4_PRIVATE_KEY"
            );
        };

        Ok(Self {
            credentials,
            oauth_scopes,
            default_time_zone: resolve_default_time_zone(default_time_zone),
            api_base_url,
            http_timeout_seconds,
        })
    }
}

fn apply_setup_overrides(
    overrides: &SetupConfigOverrides,
    credentials_path: &mut Option<String>,
    default_time_zone: &mut Option<String>,
    api_base_url: &mut String,
    oauth_scopes: &mut Option<String>,
    http_timeout_seconds: &mut u64,
) {
    if let Some(path) = overrides
        .credentials_path
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        *credentials_path = Some(path.to_string());
    }
    if let Some(zone) = overrides
        .default_time_zone
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        *default_time_zone = Some(zone.to_string());
    }
    if let Some(url) = overrides
        .api_base_url
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        *api_base_url = url.to_string();
    }
    if let Some(scopes) = overrides
        .oauth_scopes
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        *oauth_scopes = Some(scopes.to_string());
    }
    if let Some(timeout) = overrides.http_timeout_seconds.filter(|v| *v != 0) {
        *http_timeout_seconds = timeout;
    }
}

/// Pick the zone used when neither the request nor the GA4 property supply
/// one: configured value, then the host's zone, then Europe/Berlin.
fn resolve_default_time_zone(configured: Option<String>) -> Tz {
    if let Some(name) = configured {
        match Tz::from_str(name.trim()) {
            Ok(tz) => return tz,
            Err(_) => {
                tracing::warn!(zone = %name, "configured default time zone is unknown; falling back")
            }
        }
    }
    if let Ok(name) = iana_time_zone::get_timezone() {
        if let Ok(tz) = Tz::from_str(&name) {
            return tz;
        }
    }
    chrono_tz::Europe::Berlin
}
