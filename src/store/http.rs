use async_trait::async_trait;
use reqwest::{header, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::{stores::StoreIdentifier, CatalogSnapshot, CatalogStore, Error, ErrorKind, LoadedSnapshot};
use crate::catalog::{
    document::{self, Format},
    Catalog,
};

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ErrorKind::TimedOut
        } else if err.is_connect() || err.is_redirect() {
            ErrorKind::Connection
        } else if err.is_decode() || err.is_body() {
            ErrorKind::Corrupt
        } else {
            ErrorKind::Unspecified
        };

        Error::from_source(kind, Box::new(err))
    }
}

/// Picks the document format from the response, falling back to the URL path.
fn response_format(url: &Url, content_type: Option<&str>) -> Format {
    match content_type {
        Some(ct) if ct.contains("json") => Format::Json,
        Some(ct) if ct.contains("toml") => Format::Toml,
        _ => Format::from_path(url.path()),
    }
}

/// A catalog document served over HTTP. Every snapshot is a fresh GET.
#[derive(Debug, Clone)]
pub(crate) struct HttpStore {
    client: reqwest::Client,
    url: Url,
}

impl HttpStore {
    pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub(crate) fn with_url(url: Url, timeout: Duration) -> Result<HttpStore, Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(HttpStore { client, url })
    }

    pub(crate) fn url(&self) -> &Url {
        &self.url
    }

    /// Fetch and validate the document.
    pub(crate) async fn load(&self) -> Result<Catalog, Error> {
        let response = self.client.get(self.url.clone()).send().await?;

        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(Error::from_kind(ErrorKind::NotFound));
        }

        let response = response.error_for_status()?;

        let format = response_format(
            &self.url,
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
        );

        let raw = response.text().await?;

        let catalog = document::load(&raw, format)?;

        tracing::debug!(url = %self.url, %format, "fetched catalog document");

        Ok(catalog)
    }
}

#[async_trait]
impl CatalogStore for HttpStore {
    fn id(&self) -> StoreIdentifier {
        StoreIdentifier::Http
    }

    async fn begin(&self) -> Result<Box<dyn CatalogSnapshot>, Error> {
        let catalog = self.load().await?;

        Ok(Box::new(LoadedSnapshot::new(Arc::new(catalog))))
    }
}
