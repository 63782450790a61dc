//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! Only non-secret settings live in the TOML; the signing secret is a
//! compiled-in constant of the auth crate.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use courier_auth::constants::{DEFAULT_APP_VERSION, DEFAULT_BASE_URL, SIGNATURE_SCHEME};
use courier_auth::version_to_number;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    pub store: StoreConfig,
}

/// Remote API settings. Every field has a production default, so an `[api]`
/// section is optional.
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_app_version")]
    pub app_version: String,
    #[serde(default = "default_signature_version")]
    pub signature_version: String,
}

/// Credential storage settings
#[derive(Debug, Deserialize)]
pub struct StoreConfig {
    pub credentials_path: PathBuf,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_app_version() -> String {
    DEFAULT_APP_VERSION.to_string()
}

fn default_signature_version() -> String {
    SIGNATURE_SCHEME.to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            app_version: default_app_version(),
            signature_version: default_signature_version(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// `COURIER_CREDENTIALS_PATH` overrides `store.credentials_path`.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if !config.api.base_url.starts_with("http://")
            && !config.api.base_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                config.api.base_url
            )));
        }

        // The signer needs a numeric dotted version for the version-code header
        if version_to_number(&config.api.app_version).is_err() {
            return Err(common::Error::Config(format!(
                "app_version must be a dotted numeric version, got: {}",
                config.api.app_version
            )));
        }

        if config.api.signature_version.is_empty() {
            return Err(common::Error::Config(
                "signature_version must not be empty".into(),
            ));
        }

        if let Ok(p) = std::env::var("COURIER_CREDENTIALS_PATH") {
            config.store.credentials_path = PathBuf::from(p);
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("courier.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mutex to serialize tests that mutate environment variables, preventing
    /// data races when tests run in parallel.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn minimal_config_fills_in_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("COURIER_CREDENTIALS_PATH") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[store]
credentials_path = "/var/lib/courier/credentials.json"
"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.api.base_url, "https://r-point.wb.ru");
        assert_eq!(config.api.app_version, "4.91.2");
        assert!(!config.api.signature_version.is_empty());
        assert_eq!(
            config.store.credentials_path,
            PathBuf::from("/var/lib/courier/credentials.json")
        );
    }

    #[test]
    fn explicit_api_section_wins_over_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("COURIER_CREDENTIALS_PATH") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[api]
base_url = "https://staging.example.test"
app_version = "5.0.1"
signature_version = "scheme-tag"

[store]
credentials_path = "creds.json"
"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.api.base_url, "https://staging.example.test");
        assert_eq!(config.api.app_version, "5.0.1");
        assert_eq!(config.api.signature_version, "scheme-tag");
    }

    #[test]
    fn credentials_path_env_overlay_wins() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[store]
credentials_path = "from-file.json"
"#,
        );

        unsafe { set_env("COURIER_CREDENTIALS_PATH", "/env/override.json") };
        let config = Config::load(&path).unwrap();
        unsafe { remove_env("COURIER_CREDENTIALS_PATH") };

        assert_eq!(config.store.credentials_path, PathBuf::from("/env/override.json"));
    }

    #[test]
    fn schemeless_base_url_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("COURIER_CREDENTIALS_PATH") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[api]
base_url = "r-point.wb.ru"

[store]
credentials_path = "creds.json"
"#,
        );

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("base_url"), "got: {err}");
    }

    #[test]
    fn non_numeric_app_version_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("COURIER_CREDENTIALS_PATH") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[api]
app_version = "4.beta.2"

[store]
credentials_path = "creds.json"
"#,
        );

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("app_version"), "got: {err}");
    }

    #[test]
    fn empty_signature_version_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("COURIER_CREDENTIALS_PATH") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[api]
signature_version = ""

[store]
credentials_path = "creds.json"
"#,
        );

        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn missing_file_errors() {
        let result = Config::load(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn invalid_toml_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "not valid {{{{ toml");
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn resolve_path_cli_arg() {
        let path = Config::resolve_path(Some("/custom/path.toml"));
        assert_eq!(path, PathBuf::from("/custom/path.toml"));
    }

    #[test]
    fn resolve_path_env_var() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("CONFIG_PATH", "/env/path.toml") };
        let path = Config::resolve_path(None);
        unsafe { remove_env("CONFIG_PATH") };
        assert_eq!(path, PathBuf::from("/env/path.toml"));
    }

    #[test]
    fn resolve_path_default() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("CONFIG_PATH") };
        let path = Config::resolve_path(None);
        assert_eq!(path, PathBuf::from("courier.toml"));
    }

    #[test]
    fn resolve_path_cli_overrides_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("CONFIG_PATH", "/env/should-lose.toml") };
        let path = Config::resolve_path(Some("/cli/wins.toml"));
        unsafe { remove_env("CONFIG_PATH") };
        assert_eq!(
            path,
            PathBuf::from("/cli/wins.toml"),
            "CLI arg must take precedence over CONFIG_PATH env var"
        );
    }
}
