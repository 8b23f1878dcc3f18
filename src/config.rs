use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use serde::Serialize;
use zeroize::Zeroizing;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
pub const DEFAULT_API_BASE: &str = "https://api.powerbi.com/v1.0/myorg";
pub const DEFAULT_SCOPE: &str = "https://analysis.windows.net/powerbi/api/.default";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

/// Static client credentials for the identity provider.
#[derive(Clone)]
pub struct Credentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: Zeroizing<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Access level requested for the generated embed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum AccessLevel {
    #[default]
    View,
    Edit,
    Create,
}

impl FromStr for AccessLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "view" => Ok(AccessLevel::View),
            "edit" => Ok(AccessLevel::Edit),
            "create" => Ok(AccessLevel::Create),
            other => anyhow::bail!("unknown access level: {}. Must be View, Edit or Create", other),
        }
    }
}

/// The report the gateway issues embed info for.
#[derive(Debug, Clone)]
pub struct EmbedTarget {
    pub workspace_id: String,
    pub report_id: String,
    pub dataset_ids: Vec<String>,
    pub access_level: AccessLevel,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub credentials: Credentials,
    pub target: EmbedTarget,
    /// Identity provider host; the tenant path is appended per request.
    pub authority_host: String,
    /// Reporting API root, e.g. `https://api.powerbi.com/v1.0/myorg`.
    pub api_base: String,
    pub scope: String,
    pub http_timeout: Duration,
}

impl Config {
    /// Build a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> anyhow::Result<String> {
            let value = lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .with_context(|| format!("{} is not set", key))?;
            if is_placeholder(&value) {
                anyhow::bail!("{} is still the placeholder {}", key, value);
            }
            Ok(value)
        };
        let optional = |key: &str| -> anyhow::Result<Option<String>> {
            match lookup(key).map(|v| v.trim().to_string()) {
                Some(v) if v.is_empty() => Ok(None),
                Some(v) if is_placeholder(&v) => {
                    anyhow::bail!("{} is still the placeholder {}", key, v)
                }
                other => Ok(other),
            }
        };

        let dataset_ids: Vec<String> = required("EMBED_DATASET_IDS")?
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        if dataset_ids.is_empty() {
            anyhow::bail!("EMBED_DATASET_IDS must name at least one dataset");
        }
        if let Some(p) = dataset_ids.iter().find(|id| is_placeholder(id)) {
            anyhow::bail!("EMBED_DATASET_IDS contains the placeholder {}", p);
        }

        let access_level = match lookup("EMBED_ACCESS_LEVEL") {
            Some(v) if !v.trim().is_empty() => v.trim().parse::<AccessLevel>()?,
            _ => AccessLevel::default(),
        };

        let port = match lookup("EMBED_PORT") {
            Some(v) => v
                .trim()
                .parse::<u16>()
                .with_context(|| format!("invalid EMBED_PORT: {}", v))?,
            None => DEFAULT_PORT,
        };

        let http_timeout_secs = match lookup("EMBED_HTTP_TIMEOUT_SECS") {
            Some(v) => v
                .trim()
                .parse::<u64>()
                .with_context(|| format!("invalid EMBED_HTTP_TIMEOUT_SECS: {}", v))?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };
        if http_timeout_secs == 0 {
            anyhow::bail!("EMBED_HTTP_TIMEOUT_SECS must be at least 1");
        }

        let authority_host = base_url(
            "EMBED_AUTHORITY_HOST",
            lookup("EMBED_AUTHORITY_HOST"),
            DEFAULT_AUTHORITY_HOST,
        )?;
        let api_base = base_url("EMBED_API_BASE", lookup("EMBED_API_BASE"), DEFAULT_API_BASE)?;

        Ok(Config {
            port,
            credentials: Credentials {
                tenant_id: required("EMBED_TENANT_ID")?,
                client_id: required("EMBED_CLIENT_ID")?,
                client_secret: Zeroizing::new(required("EMBED_CLIENT_SECRET")?),
            },
            target: EmbedTarget {
                workspace_id: required("EMBED_WORKSPACE_ID")?,
                report_id: required("EMBED_REPORT_ID")?,
                dataset_ids,
                access_level,
            },
            authority_host,
            api_base,
            scope: optional("EMBED_SCOPE")?.unwrap_or_else(|| DEFAULT_SCOPE.into()),
            http_timeout: Duration::from_secs(http_timeout_secs),
        })
    }
}

/// Load configuration from `.env` (if present) and the process environment.
pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();
    Config::from_lookup(|key| std::env::var(key).ok())
}

fn is_placeholder(value: &str) -> bool {
    value.starts_with('<') && value.ends_with('>')
}

fn base_url(key: &str, value: Option<String>, default: &str) -> anyhow::Result<String> {
    let raw = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string());
    url::Url::parse(&raw).with_context(|| format!("{} is not a valid URL: {}", key, raw))?;
    Ok(raw.trim_end_matches('/').to_string())
}
