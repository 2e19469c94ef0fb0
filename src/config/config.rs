use super::{AppIdentity, AuthMethod};
use crate::Result;
use crate::auth::{AppKey, SecretToken};
use camino::{Utf8Path, Utf8PathBuf};
use core::time::Duration;
use ohno::{EnrichableExt, IntoAppError, app_err, bail};
use reqwest::Url;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::io;

/// The default configuration TOML content, embedded from `default_config.toml`
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../../default_config.toml");

/// File looked up in the working directory when no configuration path is given.
pub const DEFAULT_CONFIG_FILE: &str = "gh-rate-monitor.toml";

/// Name of the identity built from the environment when the configuration lists no apps.
const ENV_IDENTITY_NAME: &str = "default";

/// Installation tokens are valid for one hour; a buffer this large would refresh on every cycle.
const MAX_REFRESH_BUFFER: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Root of the GitHub REST API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Time between collection cycles in watch mode
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,

    /// Bound on a single HTTP request
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Bound on all work for one app within a cycle
    #[serde(default = "default_app_timeout", with = "humantime_serde")]
    pub app_timeout: Duration,

    /// Bound on a whole collection cycle
    #[serde(default = "default_cycle_timeout", with = "humantime_serde")]
    pub cycle_timeout: Duration,

    /// How close to expiry an installation token is refreshed
    #[serde(default = "default_refresh_buffer", with = "humantime_serde")]
    pub refresh_buffer: Duration,

    /// Maximum number of apps queried at the same time
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Identities to monitor, in report order
    #[serde(default)]
    pub apps: Vec<AppEntry>,

    /// Directory relative key paths are resolved against
    #[serde(skip)]
    base_dir: Utf8PathBuf,

    #[serde(skip)]
    overrides: CredentialOverrides,
}

/// Credentials given on the command line. Each one stands in for its `GITHUB_*` environment variable
/// when the configuration lists no apps.
#[derive(Debug, Clone, Default)]
pub struct CredentialOverrides {
    pub token: Option<SecretToken>,
    pub app_id: Option<u64>,
    pub installation_id: Option<u64>,
    pub private_key_path: Option<Utf8PathBuf>,
}

impl CredentialOverrides {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.token.is_none() && self.app_id.is_none() && self.installation_id.is_none() && self.private_key_path.is_none()
    }

    fn lookup(&self, key: &str) -> Option<String> {
        match key {
            "GITHUB_TOKEN" => self.token.as_ref().map(|token| token.expose().to_string()),
            "GITHUB_APP_ID" => self.app_id.map(|id| id.to_string()),
            "GITHUB_APP_INSTALLATION_ID" => self.installation_id.map(|id| id.to_string()),
            "GITHUB_APP_PRIVATE_KEY_PATH" => self.private_key_path.as_ref().map(ToString::to_string),
            _ => None,
        }
    }
}

/// One `[[apps]]` table as written in the file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppEntry {
    pub name: String,
    pub auth: AuthMethod,

    /// Personal token given inline
    #[serde(default)]
    pub token: Option<SecretToken>,

    /// Environment variable holding the personal token
    #[serde(default)]
    pub token_env: Option<String>,

    #[serde(default)]
    pub app_id: Option<u64>,

    #[serde(default)]
    pub installation_id: Option<u64>,

    /// App private key given inline, in PEM form
    #[serde(default)]
    pub private_key: Option<SecretToken>,

    /// App private key file, relative to the configuration file
    #[serde(default)]
    pub private_key_path: Option<Utf8PathBuf>,
}

fn default_api_url() -> String {
    crate::github::DEFAULT_API_URL.to_string()
}

const fn default_interval() -> Duration {
    Duration::from_secs(60)
}

const fn default_request_timeout() -> Duration {
    crate::github::DEFAULT_REQUEST_TIMEOUT
}

const fn default_app_timeout() -> Duration {
    crate::collect::DEFAULT_APP_TIMEOUT
}

const fn default_cycle_timeout() -> Duration {
    crate::collect::DEFAULT_CYCLE_TIMEOUT
}

const fn default_refresh_buffer() -> Duration {
    Duration::from_secs(5 * 60)
}

const fn default_max_concurrency() -> usize {
    crate::collect::DEFAULT_MAX_CONCURRENCY
}

impl Config {
    /// Load configuration from a file or use defaults
    ///
    /// Without an explicit path, `gh-rate-monitor.toml` in the working directory is used if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or holds invalid settings
    pub fn load(config_path: Option<&Utf8Path>) -> Result<Self> {
        let (final_path, text) = if let Some(path) = config_path {
            let text = fs::read_to_string(path).into_app_err_with(|| format!("reading gh-rate-monitor configuration file '{path}'"))?;
            (path.to_path_buf(), text)
        } else {
            let path = Utf8PathBuf::from(DEFAULT_CONFIG_FILE);
            match fs::read_to_string(&path) {
                Ok(text) => (path, text),
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
                Err(e) => return Err(e).into_app_err_with(|| format!("reading gh-rate-monitor configuration file '{path}'")),
            }
        };

        Self::parse(&text, &final_path)
    }

    /// Parse configuration text read from `path`
    ///
    /// # Errors
    ///
    /// Returns an error if the text does not parse or holds invalid settings
    pub fn parse(text: &str, path: &Utf8Path) -> Result<Self> {
        let mut config: Self = toml::from_str(text).into_app_err_with(|| format!("parsing configuration file '{path}'"))?;
        config.base_dir = path.parent().map(Utf8Path::to_path_buf).unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    /// Save the default configuration to a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    pub fn save_default(output_path: &Utf8Path) -> Result<()> {
        fs::write(output_path, DEFAULT_CONFIG_TOML).into_app_err_with(|| format!("writing default configuration to {output_path}"))?;
        Ok(())
    }

    /// Use `overrides` in place of the matching environment variables when building identities
    #[must_use]
    pub fn with_credential_overrides(mut self, overrides: CredentialOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Validate the global settings. App entries are checked by [`identities`](Self::identities).
    ///
    /// # Errors
    ///
    /// Returns an error if a setting is out of range
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.api_url).into_app_err_with(|| format!("api_url '{}' is not a valid URL", self.api_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("api_url '{}' must use http or https", self.api_url);
        }

        for (name, value) in [
            ("interval", self.interval),
            ("request_timeout", self.request_timeout),
            ("app_timeout", self.app_timeout),
            ("cycle_timeout", self.cycle_timeout),
        ] {
            if value.is_zero() {
                bail!("{name} must be greater than zero");
            }
        }

        if self.max_concurrency == 0 {
            bail!("max_concurrency must be at least 1");
        }

        if self.refresh_buffer >= MAX_REFRESH_BUFFER {
            bail!(
                "refresh_buffer ({:?}) must be shorter than the one-hour lifetime of installation tokens",
                self.refresh_buffer
            );
        }

        Ok(())
    }

    /// Build the identities to monitor, reading secrets from the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if any app entry is invalid, names repeat, or no identity can be built
    pub fn identities(&self) -> Result<Vec<AppIdentity>> {
        self.identities_with_env(|key| std::env::var(key).ok())
    }

    /// Build the identities to monitor, looking environment variables up through `env`
    ///
    /// # Errors
    ///
    /// Returns an error if any app entry is invalid, names repeat, or no identity can be built
    pub fn identities_with_env(&self, env: impl Fn(&str) -> Option<String>) -> Result<Vec<AppIdentity>> {
        if self.apps.is_empty() {
            let env = |key: &str| self.overrides.lookup(key).or_else(|| env(key));
            return match env_identity(&env)? {
                Some(identity) => Ok(vec![identity]),
                None => Err(app_err!(
                    "no apps configured: add [[apps]] entries to the configuration file, or set GITHUB_TOKEN, or set \
                     GITHUB_APP_ID, GITHUB_APP_INSTALLATION_ID and GITHUB_APP_PRIVATE_KEY_PATH"
                )),
            };
        }

        if !self.overrides.is_empty() {
            bail!("--token, --app-id, --installation-id and --private-key cannot be combined with [[apps]] entries");
        }

        let mut seen = HashSet::new();
        let mut identities = Vec::with_capacity(self.apps.len());

        for (index, entry) in self.apps.iter().enumerate() {
            let identity = self
                .build_identity(entry, &env)
                .map_err(|e| e.enrich_with(|| format!("invalid [[apps]] entry #{}", index + 1)))?;

            if !seen.insert(identity.name_arc().clone()) {
                bail!("app name '{}' is used more than once", identity.name());
            }

            identities.push(identity);
        }

        Ok(identities)
    }

    fn build_identity(&self, entry: &AppEntry, env: &impl Fn(&str) -> Option<String>) -> Result<AppIdentity> {
        let name = entry.name.as_str();

        match entry.auth {
            AuthMethod::PersonalToken => {
                for (field, present) in [
                    ("app_id", entry.app_id.is_some()),
                    ("installation_id", entry.installation_id.is_some()),
                    ("private_key", entry.private_key.is_some()),
                    ("private_key_path", entry.private_key_path.is_some()),
                ] {
                    if present {
                        bail!("app '{name}': {field} is only valid with auth = \"github_app\"");
                    }
                }

                let token = match (&entry.token, &entry.token_env) {
                    (Some(token), None) => token.clone(),
                    (None, Some(var)) => env(var)
                        .map(SecretToken::from)
                        .into_app_err_with(|| format!("app '{name}': environment variable '{var}' is not set"))?,
                    (Some(_), Some(_)) => bail!("app '{name}': set either token or token_env, not both"),
                    (None, None) => bail!("app '{name}': personal_token auth requires token or token_env"),
                };

                AppIdentity::personal_token(name, token)
            }

            AuthMethod::GitHubApp => {
                if entry.token.is_some() || entry.token_env.is_some() {
                    bail!("app '{name}': token and token_env are only valid with auth = \"personal_token\"");
                }

                let app_id = entry.app_id.into_app_err_with(|| format!("app '{name}': github_app auth requires app_id"))?;
                let installation_id = entry
                    .installation_id
                    .into_app_err_with(|| format!("app '{name}': github_app auth requires installation_id"))?;

                let key = match (&entry.private_key, &entry.private_key_path) {
                    (Some(pem), None) => AppKey::from_pem(pem.expose().as_bytes())?,
                    (None, Some(path)) => load_key(&self.base_dir.join(path))?,
                    (Some(_), Some(_)) => bail!("app '{name}': set either private_key or private_key_path, not both"),
                    (None, None) => bail!("app '{name}': github_app auth requires private_key or private_key_path"),
                };

                AppIdentity::github_app(name, app_id, installation_id, key)
            }
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG_TOML).expect("default_config.toml should be valid TOML that deserializes to Config")
    }
}

fn load_key(path: &Utf8Path) -> Result<AppKey> {
    let pem = fs::read(path).into_app_err_with(|| format!("reading private key file '{path}'"))?;
    AppKey::from_pem(&pem).map_err(|e| e.enrich_with(|| format!("loading private key file '{path}'")))
}

/// The identity described by the `GITHUB_*` environment variables, if any. App credentials take
/// precedence over a personal token.
fn env_identity(env: &impl Fn(&str) -> Option<String>) -> Result<Option<AppIdentity>> {
    let var = |key: &str| env(key).filter(|value| !value.trim().is_empty());

    if let Some(app_id) = var("GITHUB_APP_ID") {
        let app_id = app_id
            .trim()
            .parse::<u64>()
            .into_app_err_with(|| format!("GITHUB_APP_ID '{app_id}' is not a valid app id"))?;
        let installation_id = var("GITHUB_APP_INSTALLATION_ID")
            .into_app_err("GITHUB_APP_ID is set but GITHUB_APP_INSTALLATION_ID is not")?;
        let installation_id = installation_id
            .trim()
            .parse::<u64>()
            .into_app_err_with(|| format!("GITHUB_APP_INSTALLATION_ID '{installation_id}' is not a valid installation id"))?;
        let key_path = var("GITHUB_APP_PRIVATE_KEY_PATH")
            .into_app_err("GITHUB_APP_ID is set but GITHUB_APP_PRIVATE_KEY_PATH is not")?;

        let key = load_key(Utf8Path::new(&key_path))?;
        return AppIdentity::github_app(ENV_IDENTITY_NAME, app_id, installation_id, key).map(Some);
    }

    var("GITHUB_TOKEN")
        .map(|token| AppIdentity::personal_token(ENV_IDENTITY_NAME, SecretToken::from(token)))
        .transpose()
}
