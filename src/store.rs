//! Traits and type definitions for the backing store of the catalog.
//!
//! The resolver only reads. Every read happens through a [`CatalogSnapshot`],
//! obtained from [`CatalogStore::begin`]. A snapshot is a consistent view: a
//! rule disabled while a resolution is in flight is either seen as disabled for
//! the whole resolution or not at all.
//!
//! ## Stores
//!
//! Each store implements [`CatalogStore`]:
//! - `memory`: holds a parsed catalog in process. Snapshots are shared `Arc`s and
//!   [`MemoryStore::replace`] swaps the whole catalog at once.
//! - `file`: re-reads a catalog document from disk for every snapshot.
//! - `http`: fetches a catalog document over HTTP for every snapshot.
//!
//! ## Error Handling
//!
//! "Not found" is never an error here: lookups return `Option` or an empty
//! `Vec`. An [`Error`] means the store could not answer at all, and the
//! [`ErrorKind`] says why. Callers must not treat it as an absent row.

mod file;
mod http;
mod memory;

pub(crate) mod open;
pub(crate) mod stores;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use std::error::Error as StdError;
use std::fmt;
use uuid::Uuid;

use self::stores::StoreIdentifier;
use crate::catalog::{
    ArchitectureClass, CompatibilityRecord, DeviceArchitecture, Engine, EngineVersion, ModelInfo,
    ParserRule, RuleType,
};

pub(crate) use self::file::FileStore;
pub(crate) use self::http::HttpStore;
pub(crate) use self::memory::{LoadedSnapshot, MemoryStore};

/// General categories of errors that can be returned by a [`CatalogStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorKind {
    /// Failed to reach the store, e.g. an unreadable file or a refused
    /// connection.
    Connection,
    /// A read timed out.
    TimedOut,
    /// The catalog itself does not exist (missing file, HTTP 404).
    NotFound,
    /// The catalog was reached but could not be parsed or failed validation.
    Corrupt,
    /// An error that does not fit into any of the other categories.
    Unspecified,
}

#[derive(Debug)]
pub(crate) struct Error {
    kind: ErrorKind,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub(crate) fn from_kind(kind: ErrorKind) -> Error {
        Error { kind, source: None }
    }

    pub(crate) fn from_source(kind: ErrorKind, source: Box<dyn StdError + Send + Sync>) -> Error {
        Error {
            kind,
            source: Some(source),
        }
    }

    pub(crate) fn kind(&self) -> ErrorKind {
        self.kind
    }

    fn message(&self) -> &'static str {
        match self.kind {
            ErrorKind::Connection => "failed to reach the catalog store",
            ErrorKind::TimedOut => "catalog read timed out",
            ErrorKind::NotFound => "the catalog does not exist",
            ErrorKind::Corrupt => "the catalog is malformed",
            ErrorKind::Unspecified => "an unspecified store error occurred",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}: {}", self.message(), source),
            None => write!(f, "{}", self.message()),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_ref().map(|e| &**e as _)
    }
}

impl From<crate::catalog::document::Error> for Error {
    fn from(err: crate::catalog::document::Error) -> Self {
        Error::from_source(ErrorKind::Corrupt, Box::new(err))
    }
}

/// A consistent, read-only view of the catalog.
#[async_trait]
pub(crate) trait CatalogSnapshot: Send + Sync {
    async fn engine_by_name(&self, name: &str) -> Result<Option<Engine>, Error>;

    /// All engines, ordered by name.
    async fn engines(&self) -> Result<Vec<Engine>, Error>;

    /// Versions of an engine built for `device_architecture`, optionally
    /// restricted to one version string. The order is unspecified.
    async fn engine_versions(
        &self,
        engine_id: Uuid,
        device_architecture: DeviceArchitecture,
        version: Option<&str>,
    ) -> Result<Vec<EngineVersion>, Error>;

    async fn compatibility_record(
        &self,
        engine_version_id: Uuid,
    ) -> Result<Option<CompatibilityRecord>, Error>;

    /// Parser rules of one type for an engine, in storage order.
    async fn parser_rules(
        &self,
        engine_id: Uuid,
        rule_type: RuleType,
    ) -> Result<Vec<ParserRule>, Error>;

    async fn model_info_by_uri(&self, uri: &str) -> Result<Option<ModelInfo>, Error>;

    async fn architecture_class_by_name(
        &self,
        class_name: &str,
    ) -> Result<Option<ArchitectureClass>, Error>;

    /// All architecture classes, ordered by class name.
    async fn architecture_classes(&self) -> Result<Vec<ArchitectureClass>, Error>;

    /// All models, ordered by URI.
    async fn models(&self) -> Result<Vec<ModelInfo>, Error>;
}

/// A trait implemented by all catalog stores.
#[async_trait]
pub(crate) trait CatalogStore: Send + Sync {
    /// Returns the store identifier.
    fn id(&self) -> StoreIdentifier;

    /// Opens a consistent snapshot. All reads of a single resolution go
    /// through the snapshot returned here.
    async fn begin(&self) -> Result<Box<dyn CatalogSnapshot>, Error>;
}
