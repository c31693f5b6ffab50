use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use super::{stores::StoreIdentifier, CatalogStore, Error as StoreError, FileStore, HttpStore, MemoryStore};
use crate::config::StoreConfig;

const CATALOG_ENV_VAR: &'static str = "ENGINECAT_CATALOG";

#[derive(Error, Debug)]
pub(crate) enum Error {
    #[error("no catalog configured, pass --catalog, set ENGINECAT_CATALOG or add [store] to the config")]
    MissingLocation,
    #[error("the \"{0}\" store needs a {1}")]
    IncompleteConfig(StoreIdentifier, &'static str),
    #[error("invalid catalog URL \"{0}\": {1}")]
    InvalidUrl(String, #[source] url::ParseError),
    #[error("failed to open the {0} store: {1}")]
    Unavailable(StoreIdentifier, #[source] StoreError),
}

/// Where the catalog lives, after command line, environment and config have
/// been consulted.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    Path(PathBuf),
    Url(String),
}

impl Location {
    fn parse(raw: &str) -> Location {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            Location::Url(raw.to_string())
        } else {
            Location::Path(PathBuf::from(raw))
        }
    }
}

fn catalog_env_var() -> Option<String> {
    match std::env::var(CATALOG_ENV_VAR) {
        Ok(value) if !value.is_empty() => Some(value),
        Ok(_) => None,
        Err(std::env::VarError::NotPresent) => None,
        Err(std::env::VarError::NotUnicode(_)) => {
            crate::warning!("ignoring {} as it is not valid unicode", CATALOG_ENV_VAR);
            None
        }
    }
}

fn resolve_location(config: &StoreConfig, catalog: Option<&str>) -> Option<Location> {
    if let Some(raw) = catalog {
        return Some(Location::parse(raw));
    }

    if let Some(raw) = catalog_env_var() {
        return Some(Location::parse(&raw));
    }

    match config.kind {
        Some(StoreIdentifier::Http) => config.url.clone().map(Location::Url),
        Some(StoreIdentifier::File) | Some(StoreIdentifier::Memory) => {
            config.path.clone().map(Location::Path)
        }
        None => config
            .path
            .clone()
            .map(Location::Path)
            .or_else(|| config.url.clone().map(Location::Url)),
    }
}

fn http_store(raw: &str, timeout: Duration) -> Result<HttpStore, Error> {
    let url = Url::parse(raw).map_err(|e| Error::InvalidUrl(raw.to_string(), e))?;

    HttpStore::with_url(url, timeout).map_err(|e| Error::Unavailable(StoreIdentifier::Http, e))
}

/// Open the store described by the configuration.
///
/// `catalog` is the command line override; it is a path, or a URL when it
/// starts with `http://` or `https://`. The `memory` kind loads the catalog
/// once here and serves it for the rest of the process.
pub(crate) async fn open_store(
    config: &StoreConfig,
    catalog: Option<&str>,
) -> Result<Box<dyn CatalogStore>, Error> {
    let location = resolve_location(config, catalog).ok_or(Error::MissingLocation)?;

    let timeout = config
        .timeout_secs
        .map(Duration::from_secs)
        .unwrap_or(HttpStore::DEFAULT_TIMEOUT);

    let store: Box<dyn CatalogStore> = match (config.kind, location) {
        (Some(StoreIdentifier::Memory), location) => {
            let catalog = match location {
                Location::Path(path) => FileStore::new(path)
                    .load()
                    .await
                    .map_err(|e| Error::Unavailable(StoreIdentifier::File, e))?,
                Location::Url(url) => http_store(&url, timeout)?
                    .load()
                    .await
                    .map_err(|e| Error::Unavailable(StoreIdentifier::Http, e))?,
            };

            tracing::info!("catalog loaded into memory");

            Box::new(MemoryStore::new(catalog))
        }
        (Some(StoreIdentifier::Http), Location::Path(_)) => {
            return Err(Error::IncompleteConfig(StoreIdentifier::Http, "url"))
        }
        (_, Location::Url(url)) => {
            let store = http_store(&url, timeout)?;
            tracing::debug!(url = %store.url(), "using http catalog store");
            Box::new(store)
        }
        (_, Location::Path(path)) => {
            let store = FileStore::new(path);
            tracing::debug!(path = %store.path().display(), "using file catalog store");
            Box::new(store)
        }
    };

    Ok(store)
}
