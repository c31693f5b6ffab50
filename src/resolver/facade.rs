//! The entry point callers use to resolve compatibility.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::lookup::{self, CandidateMode, CompatibilityQuery};
use super::matcher::PatternCache;
use super::merge::{self, Layers};
use super::selector::{self, Evaluation};
use super::{Error, Resolution, ResolvedCompatibility};
use crate::catalog::{
    ArchitectureClass, CompatibilityRecord, DeviceArchitecture, ModelEndpoint, ModelInfo,
    ParserRule, RuleType,
};
use crate::store::{CatalogSnapshot, CatalogStore};

/// What a caller wants resolved. Only the architecture is required.
#[derive(Debug, Clone, Default)]
pub(crate) struct ResolveRequest {
    pub model_architecture: String,
    /// The model identifier parser rules are matched against.
    pub model_uri: Option<String>,
    /// `None` means every device architecture.
    pub device_architecture: Option<DeviceArchitecture>,
    /// `None` means every engine in the catalog.
    pub engine: Option<String>,
    pub engine_version: Option<String>,
    pub mode: CandidateMode,
    /// Endpoints the caller needs, in addition to those listed for the model.
    pub endpoints: Vec<ModelEndpoint>,
}

impl ResolveRequest {
    pub(crate) fn new(model_architecture: impl Into<String>) -> ResolveRequest {
        ResolveRequest {
            model_architecture: model_architecture.into(),
            ..ResolveRequest::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) struct CompatibilityCheck {
    pub compatible: bool,
}

/// The newest build of an engine for a device, with its compatibility record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct LatestEngineVersion {
    pub engine: String,
    pub device_architecture: DeviceArchitecture,
    pub version: String,
    pub container_image: String,
    pub created_at: DateTime<Utc>,
    pub compatibilities: Vec<CompatibilityRecord>,
}

/// Parser rules chosen for one engine.
#[derive(Default, Clone)]
struct MatchedRules {
    tool: Option<ParserRule>,
    reasoning: Option<ParserRule>,
}

/// A request field that is missing or blank.
fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

pub(crate) struct Resolver {
    store: Arc<dyn CatalogStore>,
    cache: Option<Arc<PatternCache>>,
}

impl Resolver {
    pub(crate) fn new(store: Arc<dyn CatalogStore>) -> Resolver {
        Resolver { store, cache: None }
    }

    /// Reuse compiled regex patterns across resolutions. The cache may be
    /// shared with other resolvers.
    pub(crate) fn with_pattern_cache(mut self, cache: Arc<PatternCache>) -> Resolver {
        self.cache = Some(cache);
        self
    }

    fn cache(&self) -> Option<&PatternCache> {
        self.cache.as_deref()
    }

    /// Resolve every compatible engine version for the request.
    pub(crate) async fn resolve(&self, request: &ResolveRequest) -> Result<Resolution, Error> {
        let snapshot = self.store.begin().await?;

        let resolved = self.resolve_in(snapshot.as_ref(), request).await?;

        tracing::info!(
            model_architecture = %request.model_architecture,
            model_uri = request.model_uri.as_deref().unwrap_or(""),
            compatible = resolved.len(),
            "resolution finished"
        );

        Ok(Resolution::from(resolved))
    }

    /// Like [`Resolver::resolve`], flattened to a list.
    pub(crate) async fn compatible_engines(
        &self,
        request: &ResolveRequest,
    ) -> Result<Vec<ResolvedCompatibility>, Error> {
        Ok(self.resolve(request).await?.into_vec())
    }

    /// Whether `engine` can run the architecture on a device. Without a
    /// version only the latest build is checked.
    pub(crate) async fn check_compatibility(
        &self,
        model_architecture: &str,
        device_architecture: DeviceArchitecture,
        engine: &str,
        engine_version: Option<&str>,
    ) -> Result<CompatibilityCheck, Error> {
        let snapshot = self.store.begin().await?;

        let query = CompatibilityQuery {
            model_architecture,
            engine_version,
            mode: CandidateMode::Latest,
            endpoints: &[],
        };

        let candidates = lookup::find(snapshot.as_ref(), &query, engine, device_architecture).await?;

        Ok(CompatibilityCheck {
            compatible: !candidates.is_empty(),
        })
    }

    pub(crate) async fn latest_engine_version(
        &self,
        device_architecture: DeviceArchitecture,
        engine: &str,
    ) -> Result<Option<LatestEngineVersion>, Error> {
        let snapshot = self.store.begin().await?;

        let (engine, version) =
            match lookup::latest_version(snapshot.as_ref(), engine, device_architecture).await? {
                Some(latest) => latest,
                None => return Ok(None),
            };

        let compatibilities = snapshot
            .compatibility_record(version.id)
            .await?
            .into_iter()
            .collect();

        Ok(Some(LatestEngineVersion {
            engine: engine.name,
            device_architecture: version.device_architecture,
            version: version.version,
            container_image: version.container_image,
            created_at: version.created_at,
            compatibilities,
        }))
    }

    /// How each of an engine's rules fared against `identifier`. `None` when
    /// the engine is not in the catalog.
    pub(crate) async fn explain_rules(
        &self,
        engine: &str,
        identifier: &str,
        rule_type: RuleType,
    ) -> Result<Option<Vec<Evaluation>>, Error> {
        let snapshot = self.store.begin().await?;

        let engine = match snapshot.engine_by_name(engine).await? {
            Some(engine) => engine,
            None => return Ok(None),
        };

        let rules = snapshot.parser_rules(engine.id, rule_type).await?;

        Ok(Some(selector::explain(identifier, &rules, self.cache())))
    }

    async fn resolve_in(
        &self,
        snapshot: &dyn CatalogSnapshot,
        request: &ResolveRequest,
    ) -> Result<Vec<ResolvedCompatibility>, Error> {
        let model_uri = present(request.model_uri.as_deref());

        let model_info = match model_uri {
            Some(uri) => snapshot.model_info_by_uri(uri).await?,
            None => None,
        };

        let arch_class =
            architecture_class(snapshot, model_info.as_ref(), &request.model_architecture).await?;

        let mut endpoints = request.endpoints.clone();
        for endpoint in model_info.iter().flat_map(|info| info.endpoints.iter()) {
            if !endpoints.contains(endpoint) {
                endpoints.push(*endpoint);
            }
        }

        let query = CompatibilityQuery {
            model_architecture: &request.model_architecture,
            engine_version: request.engine_version.as_deref(),
            mode: request.mode,
            endpoints: &endpoints,
        };

        let candidates = lookup::find_all(
            snapshot,
            &query,
            request.engine.as_deref(),
            request.device_architecture,
        )
        .await?;

        let mut matched: HashMap<Uuid, MatchedRules> = HashMap::new();
        let mut resolved = Vec::with_capacity(candidates.len());

        for candidate in &candidates {
            let rules = match matched.get(&candidate.engine.id) {
                Some(rules) => rules.clone(),
                None => {
                    let rules = self
                        .matched_rules(snapshot, candidate.engine.id, model_uri)
                        .await?;
                    matched.insert(candidate.engine.id, rules.clone());
                    rules
                }
            };

            resolved.push(merge::merge(
                candidate,
                &Layers {
                    model_info: model_info.as_ref(),
                    arch_class: arch_class.as_ref(),
                    tool_rule: rules.tool.as_ref(),
                    reasoning_rule: rules.reasoning.as_ref(),
                },
            ));
        }

        Ok(resolved)
    }

    async fn matched_rules(
        &self,
        snapshot: &dyn CatalogSnapshot,
        engine_id: Uuid,
        model_uri: Option<&str>,
    ) -> Result<MatchedRules, Error> {
        let uri = match model_uri {
            Some(uri) => uri,
            None => return Ok(MatchedRules::default()),
        };

        let tool_rules = snapshot.parser_rules(engine_id, RuleType::Tool).await?;
        let reasoning_rules = snapshot.parser_rules(engine_id, RuleType::Reasoning).await?;

        let matched = MatchedRules {
            tool: selector::select(uri, &tool_rules, self.cache()).cloned(),
            reasoning: selector::select(uri, &reasoning_rules, self.cache()).cloned(),
        };

        tracing::debug!(
            model_uri = uri,
            tool_rule = ?matched.tool.as_ref().map(|rule| rule.id),
            reasoning_rule = ?matched.reasoning.as_ref().map(|rule| rule.id),
            "parser rules selected"
        );

        Ok(matched)
    }
}

/// The class linked from the model info, falling back to a class named after
/// the requested architecture.
async fn architecture_class(
    snapshot: &dyn CatalogSnapshot,
    model_info: Option<&ModelInfo>,
    model_architecture: &str,
) -> Result<Option<ArchitectureClass>, Error> {
    let linked = model_info.and_then(|info| info.architecture_class.as_deref());

    if let Some(class_name) = linked {
        if let Some(class) = snapshot.architecture_class_by_name(class_name).await? {
            return Ok(Some(class));
        }

        tracing::debug!(
            class_name,
            "model links to an unknown architecture class, falling back to the requested architecture"
        );
    }

    Ok(snapshot.architecture_class_by_name(model_architecture).await?)
}
