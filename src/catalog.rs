//! Type definitions for the catalog entities read by the resolver.
//!
//! Everything here is owned by a backing store (see [`crate::store`]). The
//! resolver never mutates these values; it reads them from a consistent
//! snapshot and merges them into a [`crate::resolver::ResolvedCompatibility`].
//!
//! The on-disk/over-the-wire representation of a catalog lives in [`document`],
//! which also validates the data before a [`Catalog`] is handed to a store.

pub(crate) mod document;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use uuid::Uuid;

/// The hardware family an engine version was built for.
///
/// The `to_string` and `FromStr` forms are part of the CLI and should remain stable.
#[derive(
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::EnumIter,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub(crate) enum DeviceArchitecture {
    #[serde(alias = "CUDA")]
    Cuda,
    #[serde(alias = "ROCM")]
    Rocm,
    #[serde(alias = "CPU")]
    Cpu,
    #[serde(alias = "HPU")]
    Hpu,
}

/// An API surface a model can be served under.
///
/// Both the symbolic name (`EMBEDDING`) and the route (`/v1/embeddings`) parse.
#[derive(
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::EnumIter,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum ModelEndpoint {
    #[strum(to_string = "CHAT", serialize = "/v1/chat/completions")]
    #[serde(alias = "/v1/chat/completions")]
    Chat,
    #[strum(to_string = "COMPLETION", serialize = "/v1/completions")]
    #[serde(alias = "/v1/completions")]
    Completion,
    #[strum(to_string = "EMBEDDING", serialize = "/v1/embeddings")]
    #[serde(alias = "/v1/embeddings")]
    Embedding,
    #[strum(to_string = "IMAGE_GENERATION", serialize = "/v1/images/generations")]
    #[serde(alias = "/v1/images/generations")]
    ImageGeneration,
    #[strum(to_string = "IMAGE_EDIT", serialize = "/v1/images/edits")]
    #[serde(alias = "/v1/images/edits")]
    ImageEdit,
    #[strum(to_string = "IMAGE_VARIATION", serialize = "/v1/images/variations")]
    #[serde(alias = "/v1/images/variations")]
    ImageVariation,
    #[strum(to_string = "AUDIO_TRANSCRIPTION", serialize = "/v1/audio/transcriptions")]
    #[serde(alias = "/v1/audio/transcriptions")]
    AudioTranscription,
    #[strum(to_string = "AUDIO_TRANSLATION", serialize = "/v1/audio/translations")]
    #[serde(alias = "/v1/audio/translations")]
    AudioTranslation,
    #[strum(to_string = "AUDIO_SPEECH", serialize = "/v1/audio/speech")]
    #[serde(alias = "/v1/audio/speech")]
    AudioSpeech,
    #[strum(to_string = "BATCH", serialize = "/v1/batch")]
    #[serde(alias = "/v1/batch")]
    Batch,
    #[strum(to_string = "RESPONSE", serialize = "/v1/responses")]
    #[serde(alias = "/v1/responses")]
    Response,
    #[strum(to_string = "DOCUMENT", serialize = "/v1/documents")]
    #[serde(alias = "/v1/documents")]
    Document,
    #[strum(to_string = "RERANK", serialize = "/v1/rerank")]
    #[serde(alias = "/v1/rerank")]
    Rerank,
    #[strum(to_string = "MODERATION", serialize = "/v1/moderations")]
    #[serde(alias = "/v1/moderations")]
    Moderation,
}

impl ModelEndpoint {
    /// The HTTP route this endpoint is served under.
    pub(crate) fn route(&self) -> &'static str {
        match self {
            ModelEndpoint::Chat => "/v1/chat/completions",
            ModelEndpoint::Completion => "/v1/completions",
            ModelEndpoint::Embedding => "/v1/embeddings",
            ModelEndpoint::ImageGeneration => "/v1/images/generations",
            ModelEndpoint::ImageEdit => "/v1/images/edits",
            ModelEndpoint::ImageVariation => "/v1/images/variations",
            ModelEndpoint::AudioTranscription => "/v1/audio/transcriptions",
            ModelEndpoint::AudioTranslation => "/v1/audio/translations",
            ModelEndpoint::AudioSpeech => "/v1/audio/speech",
            ModelEndpoint::Batch => "/v1/batch",
            ModelEndpoint::Response => "/v1/responses",
            ModelEndpoint::Document => "/v1/documents",
            ModelEndpoint::Rerank => "/v1/rerank",
            ModelEndpoint::Moderation => "/v1/moderations",
        }
    }
}

/// Which output a parser rule configures.
#[derive(
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::EnumIter,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub(crate) enum RuleType {
    #[default]
    Tool,
    Reasoning,
}

/// How a parser rule's pattern is compared to a model identifier.
#[derive(
    Debug,
    PartialEq,
    Eq,
    Hash,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub(crate) enum MatchType {
    /// The identifier equals the pattern.
    Exact,
    /// The identifier starts with the pattern.
    Prefix,
    /// The pattern is a regular expression anchored at the start of the
    /// identifier (but not at the end).
    Regex,
}

/// A named inference runtime, such as `vllm`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct Engine {
    pub id: Uuid,
    pub name: String,
}

/// A specific build of an engine for one device architecture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct EngineVersion {
    pub id: Uuid,
    pub engine_id: Uuid,
    pub version: String,
    pub device_architecture: DeviceArchitecture,
    pub container_image: String,
    pub created_at: DateTime<Utc>,
}

/// An entry of a compatibility record's `architectures` or `features` list.
///
/// Catalog documents may spell an entry as a bare string or as `{ name = "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "NamedEntryRepr")]
pub(crate) struct NamedEntry {
    pub name: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NamedEntryRepr {
    Bare(String),
    Table { name: String },
}

impl From<NamedEntryRepr> for NamedEntry {
    fn from(value: NamedEntryRepr) -> Self {
        match value {
            NamedEntryRepr::Bare(name) | NamedEntryRepr::Table { name } => NamedEntry { name },
        }
    }
}

impl From<&str> for NamedEntry {
    fn from(value: &str) -> Self {
        NamedEntry {
            name: value.to_string(),
        }
    }
}

/// Declares which model architectures, features and endpoints an engine
/// version supports. There is at most one record per engine version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct CompatibilityRecord {
    pub id: Uuid,
    pub engine_version_id: Uuid,
    pub architectures: Vec<NamedEntry>,
    pub features: Vec<NamedEntry>,
    pub supported_endpoints: Option<BTreeSet<ModelEndpoint>>,
    /// Attributes without a typed home. Passed through untouched.
    pub extra: BTreeMap<String, String>,
}

impl CompatibilityRecord {
    /// Exact, case-sensitive containment. Duplicate entries are harmless.
    pub(crate) fn supports_architecture(&self, model_architecture: &str) -> bool {
        self.architectures
            .iter()
            .any(|entry| entry.name == model_architecture)
    }

    pub(crate) fn supports_any_endpoint(&self, endpoints: &[ModelEndpoint]) -> bool {
        match &self.supported_endpoints {
            Some(supported) => endpoints.iter().any(|ep| supported.contains(ep)),
            None => false,
        }
    }
}

/// A pattern-matched override selecting a parser and/or chat template for
/// models whose identifier matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct ParserRule {
    pub id: Uuid,
    pub engine_id: Uuid,
    pub rule_type: RuleType,
    pub match_type: MatchType,
    pub pattern: String,
    /// Lower values are evaluated first.
    pub priority: i32,
    pub enabled: bool,
    pub parser_type: Option<String>,
    pub chat_template: Option<String>,
    pub notes: Option<String>,
}

/// Engine-independent defaults for a model architecture (e.g. `LlamaForCausalLM`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ArchitectureClass {
    pub class_name: String,
    #[serde(default)]
    pub architecture_family: String,
    #[serde(default)]
    pub tool_calling_parser_type: Option<String>,
    #[serde(default)]
    pub reasoning_parser_type: Option<String>,
    #[serde(default)]
    pub supports_lora: bool,
    #[serde(default)]
    pub supports_pipeline_parallelism: bool,
}

/// Model-instance metadata, keyed by the model's URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ModelInfo {
    pub uri: String,
    #[serde(default)]
    pub tool_calling_parser_type: Option<String>,
    #[serde(default)]
    pub chat_template: Option<String>,
    /// Class name of the model's [`ArchitectureClass`], if linked.
    #[serde(default)]
    pub architecture_class: Option<String>,
    #[serde(default)]
    pub endpoints: Vec<ModelEndpoint>,
}

/// A validated, indexed catalog. Only [`document`] constructs one.
#[derive(Debug, Default)]
pub(crate) struct Catalog {
    engines: BTreeMap<String, Engine>,
    versions: Vec<EngineVersion>,
    records: HashMap<Uuid, CompatibilityRecord>,
    rules: Vec<ParserRule>,
    classes: HashMap<String, ArchitectureClass>,
    models: HashMap<String, ModelInfo>,
}

impl Catalog {
    pub(crate) fn engine_by_name(&self, name: &str) -> Option<&Engine> {
        self.engines.get(name)
    }

    /// Engines ordered by name.
    pub(crate) fn engines(&self) -> impl Iterator<Item = &Engine> {
        self.engines.values()
    }

    pub(crate) fn engine_versions<'c>(
        &'c self,
        engine_id: Uuid,
        device_architecture: DeviceArchitecture,
        version: Option<&'c str>,
    ) -> impl Iterator<Item = &'c EngineVersion> {
        self.versions.iter().filter(move |v| {
            v.engine_id == engine_id
                && v.device_architecture == device_architecture
                && version.map_or(true, |version| v.version == version)
        })
    }

    pub(crate) fn compatibility_record(&self, engine_version_id: Uuid) -> Option<&CompatibilityRecord> {
        self.records.get(&engine_version_id)
    }

    pub(crate) fn parser_rules(
        &self,
        engine_id: Uuid,
        rule_type: RuleType,
    ) -> impl Iterator<Item = &ParserRule> {
        self.rules
            .iter()
            .filter(move |r| r.engine_id == engine_id && r.rule_type == rule_type)
    }

    pub(crate) fn model_info_by_uri(&self, uri: &str) -> Option<&ModelInfo> {
        self.models.get(uri)
    }

    pub(crate) fn architecture_class_by_name(&self, class_name: &str) -> Option<&ArchitectureClass> {
        self.classes.get(class_name)
    }

    /// Architecture classes ordered by class name.
    pub(crate) fn architecture_classes(&self) -> Vec<&ArchitectureClass> {
        let mut classes: Vec<&ArchitectureClass> = self.classes.values().collect();
        classes.sort_by(|a, b| a.class_name.cmp(&b.class_name));
        classes
    }

    /// Models ordered by URI.
    pub(crate) fn models(&self) -> Vec<&ModelInfo> {
        let mut models: Vec<&ModelInfo> = self.models.values().collect();
        models.sort_by(|a, b| a.uri.cmp(&b.uri));
        models
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn endpoints_parse_from_name_or_route() {
        assert_eq!(
            ModelEndpoint::from_str("EMBEDDING").unwrap(),
            ModelEndpoint::Embedding
        );
        assert_eq!(
            ModelEndpoint::from_str("/v1/embeddings").unwrap(),
            ModelEndpoint::Embedding
        );
        assert_eq!(ModelEndpoint::Rerank.to_string(), "RERANK");
        assert_eq!(ModelEndpoint::Chat.route(), "/v1/chat/completions");
    }

    #[test]
    fn device_architecture_is_case_insensitive() {
        assert_eq!(
            DeviceArchitecture::from_str("CUDA").unwrap(),
            DeviceArchitecture::Cuda
        );
        assert_eq!(DeviceArchitecture::Rocm.to_string(), "rocm");
    }

    #[test]
    fn architecture_containment_is_exact() {
        let record = CompatibilityRecord {
            id: Uuid::nil(),
            engine_version_id: Uuid::nil(),
            architectures: vec!["LlamaForCausalLM".into(), "LlamaForCausalLM".into()],
            features: vec![],
            supported_endpoints: Some(BTreeSet::from([ModelEndpoint::Embedding])),
            extra: BTreeMap::new(),
        };

        assert!(record.supports_architecture("LlamaForCausalLM"));
        assert!(!record.supports_architecture("llamaforcausallm"));
        assert!(!record.supports_architecture("LlamaForCausal"));
        assert!(record.supports_any_endpoint(&[ModelEndpoint::Chat, ModelEndpoint::Embedding]));
        assert!(!record.supports_any_endpoint(&[]));
    }
}
