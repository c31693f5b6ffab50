//! Finds the engine versions that can run a model architecture.
//!
//! A version is a candidate when it targets the requested device and its
//! compatibility record either lists the architecture by exact name or
//! supports one of the queried endpoints. Unknown engines, unknown versions
//! and versions without a record all produce an empty result.

use strum::IntoEnumIterator;

use crate::catalog::{CompatibilityRecord, DeviceArchitecture, Engine, EngineVersion, ModelEndpoint};
use crate::store::{CatalogSnapshot, Error};

/// How many versions per `(engine, device)` are considered when no version
/// is requested.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CandidateMode {
    /// Only the most recently created version.
    Latest,
    /// Every version, newest first.
    #[default]
    All,
}

#[derive(Debug, Clone)]
pub(crate) struct CompatibilityQuery<'q> {
    pub model_architecture: &'q str,
    pub engine_version: Option<&'q str>,
    pub mode: CandidateMode,
    /// Endpoints that make a version compatible regardless of its
    /// architecture list.
    pub endpoints: &'q [ModelEndpoint],
}

impl<'q> CompatibilityQuery<'q> {
    pub(crate) fn new(model_architecture: &'q str) -> CompatibilityQuery<'q> {
        CompatibilityQuery {
            model_architecture,
            engine_version: None,
            mode: CandidateMode::default(),
            endpoints: &[],
        }
    }
}

/// A compatible engine version together with its record.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub engine: Engine,
    pub version: EngineVersion,
    pub record: CompatibilityRecord,
}

/// Newest first; equal timestamps fall back to the id so "latest" is stable.
fn newest_first(versions: &mut [EngineVersion]) {
    versions.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

/// The most recently created version of `engine_name` for a device.
pub(crate) async fn latest_version(
    snapshot: &dyn CatalogSnapshot,
    engine_name: &str,
    device_architecture: DeviceArchitecture,
) -> Result<Option<(Engine, EngineVersion)>, Error> {
    let engine = match snapshot.engine_by_name(engine_name).await? {
        Some(engine) => engine,
        None => return Ok(None),
    };

    let mut versions = snapshot
        .engine_versions(engine.id, device_architecture, None)
        .await?;

    newest_first(&mut versions);

    Ok(versions.into_iter().next().map(|version| (engine, version)))
}

/// Candidates for one engine on one device.
pub(crate) async fn find(
    snapshot: &dyn CatalogSnapshot,
    query: &CompatibilityQuery<'_>,
    engine_name: &str,
    device_architecture: DeviceArchitecture,
) -> Result<Vec<Candidate>, Error> {
    let engine = match snapshot.engine_by_name(engine_name).await? {
        Some(engine) => engine,
        None => {
            tracing::debug!(engine = engine_name, "engine not in catalog");
            return Ok(Vec::new());
        }
    };

    let mut versions = snapshot
        .engine_versions(engine.id, device_architecture, query.engine_version)
        .await?;

    newest_first(&mut versions);

    if query.engine_version.is_none() && query.mode == CandidateMode::Latest {
        versions.truncate(1);
    }

    let mut candidates = Vec::new();

    for version in versions {
        let record = match snapshot.compatibility_record(version.id).await? {
            Some(record) => record,
            None => {
                tracing::debug!(
                    engine = engine_name,
                    version = %version.version,
                    device = %device_architecture,
                    "engine version has no compatibility record"
                );
                continue;
            }
        };

        if record.supports_architecture(query.model_architecture)
            || record.supports_any_endpoint(query.endpoints)
        {
            candidates.push(Candidate {
                engine: engine.clone(),
                version,
                record,
            });
        }
    }

    Ok(candidates)
}

/// Candidates across engines and devices. `None` means every engine in the
/// catalog (by name) or every device architecture.
pub(crate) async fn find_all(
    snapshot: &dyn CatalogSnapshot,
    query: &CompatibilityQuery<'_>,
    engine_name: Option<&str>,
    device_architecture: Option<DeviceArchitecture>,
) -> Result<Vec<Candidate>, Error> {
    let engines: Vec<String> = match engine_name {
        Some(name) => vec![name.to_string()],
        None => snapshot
            .engines()
            .await?
            .into_iter()
            .map(|engine| engine.name)
            .collect(),
    };

    let devices: Vec<DeviceArchitecture> = match device_architecture {
        Some(device) => vec![device],
        None => DeviceArchitecture::iter().collect(),
    };

    let mut candidates = Vec::new();

    for engine in &engines {
        for device in &devices {
            candidates.extend(find(snapshot, query, engine, *device).await?);
        }
    }

    Ok(candidates)
}
