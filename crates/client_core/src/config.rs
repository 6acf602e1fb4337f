use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use url::Url;

pub const SETTINGS_FILE: &str = "dokumed.toml";
const DEFAULT_API_URL: &str = "http://127.0.0.1:3000/api";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Always ends with `/` so endpoint paths join underneath it.
    pub api_base_url: Url,
    pub request_timeout: Duration,
    pub token_path: PathBuf,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: Url::parse("http://127.0.0.1:3000/api/").expect("default api url"),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            token_path: default_token_path(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_url: Option<String>,
    request_timeout_secs: Option<u64>,
    token_path: Option<PathBuf>,
}

/// Defaults, then `dokumed.toml` in the working directory, then the environment.
pub fn load_settings() -> Result<ClientSettings> {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

pub fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ClientSettings> {
    let mut settings = ClientSettings::default();

    let file_cfg = match fs::read_to_string(path) {
        Ok(raw) => toml::from_str::<FileSettings>(&raw)
            .with_context(|| format!("invalid settings file '{}'", path.display()))?,
        Err(err) if err.kind() == ErrorKind::NotFound => FileSettings::default(),
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read settings file '{}'", path.display()))
        }
    };

    if let Some(v) = file_cfg.api_url {
        settings.api_base_url = normalize_api_url(&v)?;
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout = Duration::from_secs(v);
    }
    if let Some(v) = file_cfg.token_path {
        settings.token_path = v;
    }

    if let Some(v) = env("DOKUMED_API_URL") {
        settings.api_base_url = normalize_api_url(&v)?;
    }
    if let Some(v) = env("APP__API_URL") {
        settings.api_base_url = normalize_api_url(&v)?;
    }

    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        let secs = v
            .trim()
            .parse::<u64>()
            .with_context(|| format!("APP__REQUEST_TIMEOUT_SECS must be an integer, got '{v}'"))?;
        settings.request_timeout = Duration::from_secs(secs);
    }

    if let Some(v) = env("APP__TOKEN_PATH") {
        settings.token_path = PathBuf::from(v);
    }

    if settings.request_timeout.is_zero() {
        settings.request_timeout = Duration::from_secs(DEFAULT_TIMEOUT_SECS);
    }

    Ok(settings)
}

pub fn normalize_api_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    let raw = if raw.is_empty() { DEFAULT_API_URL } else { raw };

    let mut url = Url::parse(raw).with_context(|| format!("invalid api url '{raw}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(anyhow!("api url must use http or https, got '{raw}'"));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn default_token_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dokumed")
        .join("token.json")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn normalizes_trailing_slash() {
        assert_eq!(
            normalize_api_url("https://be.example.app/api").expect("url").as_str(),
            "https://be.example.app/api/"
        );
        assert_eq!(
            normalize_api_url("").expect("default").as_str(),
            "http://127.0.0.1:3000/api/"
        );
        assert!(normalize_api_url("ftp://host/api").is_err());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings =
            load_settings_from(&dir.path().join("absent.toml"), env_from(&[])).expect("settings");
        assert_eq!(settings.api_base_url.as_str(), "http://127.0.0.1:3000/api/");
        assert_eq!(settings.request_timeout, Duration::from_secs(15));
        assert!(settings.token_path.ends_with("dokumed/token.json"));
    }

    #[test]
    fn env_overrides_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("dokumed.toml");
        fs::write(
            &path,
            "api_url = \"http://10.0.0.2:3000/api\"\nrequest_timeout_secs = 5\ntoken_path = \"/tmp/t.json\"\n",
        )
        .expect("write");

        let from_file = load_settings_from(&path, env_from(&[])).expect("file settings");
        assert_eq!(from_file.api_base_url.as_str(), "http://10.0.0.2:3000/api/");
        assert_eq!(from_file.request_timeout, Duration::from_secs(5));
        assert_eq!(from_file.token_path, PathBuf::from("/tmp/t.json"));

        let overridden = load_settings_from(
            &path,
            env_from(&[
                ("DOKUMED_API_URL", "https://be.example.app/api"),
                ("APP__REQUEST_TIMEOUT_SECS", "30"),
            ]),
        )
        .expect("env settings");
        assert_eq!(overridden.api_base_url.as_str(), "https://be.example.app/api/");
        assert_eq!(overridden.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn rejects_malformed_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("dokumed.toml");
        fs::write(&path, "api_url = [").expect("write");
        assert!(load_settings_from(&path, env_from(&[])).is_err());

        let absent = dir.path().join("absent.toml");
        assert!(
            load_settings_from(&absent, env_from(&[("APP__REQUEST_TIMEOUT_SECS", "soon")]))
                .is_err()
        );
    }
}
