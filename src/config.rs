use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use toml;

use crate::catalog::DeviceArchitecture;
use crate::store::stores::StoreIdentifier;

#[derive(Error, Debug)]
pub(crate) enum Error {
    #[error("failed to read config \"{}\": {}", .0.display(), .1)]
    Unreadable(PathBuf, #[source] io::Error),
    #[error("failed to parse config \"{}\": {}", .0.display(), .1)]
    Malformed(PathBuf, #[source] toml::de::Error),
}

/// Where the catalog is read from.
#[derive(Deserialize, Serialize, Default, Debug, Clone)]
pub(crate) struct StoreConfig {
    pub kind: Option<StoreIdentifier>,
    pub path: Option<PathBuf>,
    pub url: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Values used when a command line flag is omitted.
#[derive(Deserialize, Serialize, Default, Debug, Clone)]
pub(crate) struct Defaults {
    pub engine: Option<String>,
    pub device_architecture: Option<DeviceArchitecture>,
}

fn default_pattern_cache() -> bool {
    true
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub(crate) struct ResolverConfig {
    #[serde(default = "default_pattern_cache")]
    pub pattern_cache: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            pattern_cache: default_pattern_cache(),
        }
    }
}

#[derive(Deserialize, Serialize, Default, Debug, Clone)]
pub(crate) struct Config {
    pub log_level: Option<String>,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub resolver: ResolverConfig,
}

fn get_config_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME");

    if let Some(home) = home {
        let home = PathBuf::from(home);

        const USER_PATHS: [&str; 2] = [".config/enginecat/config.toml", ".enginecat.toml"];

        for &path in USER_PATHS.iter() {
            let fullpath = home.join(path);

            if fullpath.exists() {
                return Some(fullpath);
            }
        }
    }

    let system_config = PathBuf::from("/etc/enginecat.toml");

    if system_config.exists() {
        Some(system_config)
    } else {
        None
    }
}

fn extraneous_keys_helper<'a>(
    path: &mut Vec<&'a String>,
    user_config: &'a toml::Table,
    config: &'a toml::Table,
    found: &mut Vec<String>,
) {
    for (user_key, user_value) in user_config {
        path.push(user_key);

        if let Some(config_value) = config.get(user_key) {
            if let (toml::Value::Table(user_value), toml::Value::Table(config_value)) =
                (user_value, config_value)
            {
                extraneous_keys_helper(path, user_value, config_value, found)
            }
        } else {
            let path: Vec<&str> = path.iter().map(|&s| s.as_str()).collect();

            found.push(path.join("."));
        }

        path.pop();
    }
}

/// Keys present in the user's file that the parsed config has no field for.
fn extraneous_keys(config: &Config, raw_config: &str) -> Vec<String> {
    let user_config: toml::Table = match toml::de::from_str(raw_config) {
        Ok(table) => table,
        Err(_) => return Vec::new(),
    };

    let config: toml::Table = match toml::Value::try_from(config) {
        Ok(toml::Value::Table(table)) => table,
        Ok(_) => return Vec::new(),
        Err(err) => {
            tracing::debug!(error = %err, "could not reserialize config, skipping key check");
            return Vec::new();
        }
    };

    let mut path = Vec::new();
    let mut found = Vec::new();

    extraneous_keys_helper(&mut path, &user_config, &config, &mut found);

    found
}

fn parse_config(path: &Path, raw_config: &str) -> Result<Config, Error> {
    let config: Config =
        toml::de::from_str(raw_config).map_err(|e| Error::Malformed(path.to_path_buf(), e))?;

    for key in extraneous_keys(&config, raw_config) {
        crate::warning!("config contains extraneous key \"{}\", ignoring", key);
    }

    Ok(config)
}

/// Read the config at `config`, or the first one found on the search path.
/// No config at all yields the defaults.
pub(crate) fn read_config(config: Option<PathBuf>) -> Result<Config, Error> {
    let config_path = config.or_else(get_config_path);

    match config_path {
        Some(path) => {
            let raw_config =
                std::fs::read_to_string(&path).map_err(|e| Error::Unreadable(path.clone(), e))?;

            parse_config(&path, &raw_config)
        }
        None => Ok(Config::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
log_level = "debug"

[store]
kind = "http"
url = "https://catalog.example/catalog.json"
timeout_secs = 3

[defaults]
engine = "sglang"
device_architecture = "rocm"

[resolver]
pattern_cache = false
"#;

    #[test]
    fn full_config() {
        let config = parse_config(Path::new("config.toml"), CONFIG).unwrap();

        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.store.kind, Some(StoreIdentifier::Http));
        assert_eq!(
            config.store.url.as_deref(),
            Some("https://catalog.example/catalog.json")
        );
        assert_eq!(config.store.timeout_secs, Some(3));
        assert_eq!(config.defaults.engine.as_deref(), Some("sglang"));
        assert_eq!(
            config.defaults.device_architecture,
            Some(DeviceArchitecture::Rocm)
        );
        assert!(!config.resolver.pattern_cache);
        assert!(extraneous_keys(&config, CONFIG).is_empty());
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = parse_config(Path::new("config.toml"), "").unwrap();

        assert!(config.log_level.is_none());
        assert!(config.store.kind.is_none());
        assert!(config.defaults.engine.is_none());
        assert!(config.resolver.pattern_cache);

        let config = parse_config(Path::new("config.toml"), "[resolver]\n").unwrap();
        assert!(config.resolver.pattern_cache);
    }

    #[test]
    fn extraneous_keys_are_reported_with_their_path() {
        let raw = r#"
editor = "vim"

[store]
path = "catalog.toml"
kind = "file"
retries = 3

[providers.openai]
api_key = "secret"
"#;

        let config = parse_config(Path::new("config.toml"), raw).unwrap();
        let mut keys = extraneous_keys(&config, raw);
        keys.sort();

        assert_eq!(keys, vec!["editor", "providers", "store.retries"]);
        assert_eq!(config.store.path, Some(PathBuf::from("catalog.toml")));
    }

    #[test]
    fn malformed_config_is_an_error() {
        let err = parse_config(Path::new("config.toml"), "[store]\nkind = \"ftp\"\n")
            .err()
            .unwrap();

        assert!(matches!(err, Error::Malformed(_, _)));
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let err = read_config(Some(PathBuf::from("/nonexistent/enginecat.toml")))
            .err()
            .unwrap();

        assert!(matches!(err, Error::Unreadable(_, _)));
    }
}
