use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{stores::StoreIdentifier, CatalogSnapshot, CatalogStore, Error, ErrorKind, LoadedSnapshot};
use crate::catalog::{
    document::{self, Format},
    Catalog,
};

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::NotFound => ErrorKind::NotFound,
            io::ErrorKind::TimedOut => ErrorKind::TimedOut,
            io::ErrorKind::InvalidData => ErrorKind::Corrupt,
            _ => ErrorKind::Connection,
        };

        Error::from_source(kind, Box::new(err))
    }
}

/// A catalog document on disk. The file is read and validated again for
/// every snapshot, so edits are picked up without a restart.
#[derive(Debug, Clone)]
pub(crate) struct FileStore {
    path: PathBuf,
    format: Format,
}

impl FileStore {
    pub(crate) fn new<P: AsRef<Path>>(path: P) -> FileStore {
        let path = path.as_ref().to_path_buf();
        let format = Format::from_path(&path);

        FileStore { path, format }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Read and validate the document.
    pub(crate) async fn load(&self) -> Result<Catalog, Error> {
        let raw = tokio::fs::read_to_string(&self.path).await?;

        let catalog = document::load(&raw, self.format)?;

        tracing::debug!(path = %self.path.display(), format = %self.format, "loaded catalog file");

        Ok(catalog)
    }
}

#[async_trait]
impl CatalogStore for FileStore {
    fn id(&self) -> StoreIdentifier {
        StoreIdentifier::File
    }

    async fn begin(&self) -> Result<Box<dyn CatalogSnapshot>, Error> {
        let catalog = self.load().await?;

        Ok(Box::new(LoadedSnapshot::new(Arc::new(catalog))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::CATALOG;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("enginecat-{}-{}", std::process::id(), name))
    }

    #[tokio::test]
    async fn reads_catalog_for_every_snapshot() {
        let path = scratch_path("catalog.toml");
        tokio::fs::write(&path, CATALOG).await.unwrap();

        let store = FileStore::new(&path);
        let snapshot = store.begin().await.unwrap();
        assert!(snapshot.engine_by_name("vllm").await.unwrap().is_some());

        tokio::fs::write(&path, "").await.unwrap();
        let snapshot = store.begin().await.unwrap();
        assert!(snapshot.engine_by_name("vllm").await.unwrap().is_none());

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn missing_file_is_an_error_not_an_empty_catalog() {
        let store = FileStore::new(scratch_path("does-not-exist.toml"));

        let err = store.begin().await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn malformed_file_is_corrupt() {
        let path = scratch_path("corrupt.json");
        tokio::fs::write(&path, "{ \"engines\": [ { \"name\": 7 } ] }")
            .await
            .unwrap();

        let err = FileStore::new(&path).begin().await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Corrupt);

        tokio::fs::remove_file(&path).await.unwrap();
    }
}
