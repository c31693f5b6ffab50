//! The catalog document: the serialized form of a [`Catalog`].
//!
//! A document nests versions and parser rules under their engine, so it can be
//! written by hand:
//!
//! ```toml
//! [[engines]]
//! name = "vllm"
//!
//! [[engines.versions]]
//! version = "0.6.3"
//! device_architecture = "cuda"
//! container_image = "vllm/vllm-openai:v0.6.3"
//! created_at = "2024-10-14T00:00:00Z"
//! compatibility.architectures = ["LlamaForCausalLM", { name = "Qwen2ForCausalLM" }]
//!
//! [[engines.parser_rules]]
//! match_type = "prefix"
//! pattern = "meta-llama/Llama-3"
//! parser_type = "llama3_json"
//! ```
//!
//! IDs are optional. When omitted they are derived from the entity's natural
//! key with a v5 UUID, so they stay stable across loads and across reorderings
//! of the document. All validation happens here, before a [`Catalog`] reaches
//! a store; the resolver trusts what it reads. Blank optional strings are
//! loaded as absent.
//!
//! `created_at` may be a native TOML datetime or an RFC 3339 string.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::de::{Error as _, Unexpected};
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use uuid::Uuid;

use super::{
    ArchitectureClass, Catalog, CompatibilityRecord, DeviceArchitecture, Engine, EngineVersion,
    MatchType, ModelEndpoint, ModelInfo, NamedEntry, ParserRule, RuleType,
};

/// Namespace for ids derived from natural keys.
const ID_NAMESPACE: Uuid = Uuid::from_u128(0x6d1f_47a2_93c4_4b0e_8f25_1c7e_a9d3_5b60);

#[derive(Error, Debug)]
pub(crate) enum Error {
    #[error("failed to parse TOML catalog: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("failed to parse JSON catalog: {0}")]
    Json(#[from] serde_json::Error),
    #[error("engine \"{0}\" is defined twice")]
    DuplicateEngine(String),
    #[error("engine \"{engine}\" defines version \"{version}\" for {device} twice")]
    DuplicateVersion {
        engine: String,
        version: String,
        device: DeviceArchitecture,
    },
    #[error("architecture class \"{0}\" is defined twice")]
    DuplicateArchitectureClass(String),
    #[error("model \"{0}\" is defined twice")]
    DuplicateModel(String),
    #[error("id {0} is used by more than one entity")]
    DuplicateId(Uuid),
    #[error("a parser rule of engine \"{0}\" has an empty pattern")]
    EmptyPattern(String),
    #[error(
        "parser rule \"{pattern}\" of engine \"{engine}\" sets neither a parser type nor a chat template"
    )]
    RuleWithoutEffect { engine: String, pattern: String },
}

/// Serialization used by a catalog document.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum Format {
    #[default]
    Toml,
    Json,
}

impl Format {
    /// Guesses the format from a file name; anything but `.json` is TOML.
    pub(crate) fn from_path<P: AsRef<Path>>(path: P) -> Format {
        match path.as_ref().extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ => Format::Toml,
        }
    }
}

#[derive(Deserialize, Default, Debug)]
pub(crate) struct CatalogDocument {
    #[serde(default)]
    engines: Vec<EngineDocument>,
    #[serde(default)]
    architecture_classes: Vec<ArchitectureClass>,
    #[serde(default)]
    models: Vec<ModelInfo>,
}

#[derive(Deserialize, Debug)]
struct EngineDocument {
    id: Option<Uuid>,
    name: String,
    #[serde(default)]
    versions: Vec<VersionDocument>,
    #[serde(default)]
    parser_rules: Vec<RuleDocument>,
}

#[derive(Deserialize, Debug)]
struct VersionDocument {
    id: Option<Uuid>,
    version: String,
    device_architecture: DeviceArchitecture,
    container_image: String,
    #[serde(deserialize_with = "timestamp")]
    created_at: DateTime<Utc>,
    compatibility: Option<CompatibilityDocument>,
}

#[derive(Deserialize, Debug)]
struct CompatibilityDocument {
    id: Option<Uuid>,
    #[serde(default)]
    architectures: Vec<NamedEntry>,
    #[serde(default)]
    features: Vec<NamedEntry>,
    #[serde(default)]
    supported_endpoints: Option<BTreeSet<ModelEndpoint>>,
    #[serde(default)]
    extra: BTreeMap<String, String>,
}

fn enabled_by_default() -> bool {
    true
}

#[derive(Deserialize, Debug)]
struct RuleDocument {
    id: Option<Uuid>,
    #[serde(default)]
    rule_type: RuleType,
    match_type: MatchType,
    pattern: String,
    #[serde(default)]
    priority: i32,
    #[serde(default = "enabled_by_default")]
    enabled: bool,
    parser_type: Option<String>,
    chat_template: Option<String>,
    notes: Option<String>,
}

fn derived_id(key: &str) -> Uuid {
    Uuid::new_v5(&ID_NAMESPACE, key.as_bytes())
}

fn timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let text = match toml::Value::deserialize(deserializer)? {
        toml::Value::String(text) => text,
        toml::Value::Datetime(datetime) => datetime.to_string(),
        other => {
            return Err(D::Error::invalid_type(
                Unexpected::Other(other.type_str()),
                &"an RFC 3339 date and time",
            ))
        }
    };

    DateTime::parse_from_rfc3339(&text)
        .map(|datetime| datetime.with_timezone(&Utc))
        .map_err(|err| D::Error::custom(format!("invalid created_at \"{}\": {}", text, err)))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl CatalogDocument {
    pub(crate) fn parse(raw: &str, format: Format) -> Result<CatalogDocument, Error> {
        let document = match format {
            Format::Toml => toml::de::from_str(raw)?,
            Format::Json => serde_json::from_str(raw)?,
        };

        Ok(document)
    }
}

/// Parse and validate a catalog document.
pub(crate) fn load(raw: &str, format: Format) -> Result<Catalog, Error> {
    Catalog::try_from(CatalogDocument::parse(raw, format)?)
}

impl TryFrom<CatalogDocument> for Catalog {
    type Error = Error;

    fn try_from(document: CatalogDocument) -> Result<Self, Self::Error> {
        let mut catalog = Catalog::default();
        let mut ids = HashSet::new();

        let mut claim = |id: Uuid| -> Result<Uuid, Error> {
            if ids.insert(id) {
                Ok(id)
            } else {
                Err(Error::DuplicateId(id))
            }
        };

        for engine_doc in document.engines {
            if catalog.engines.contains_key(&engine_doc.name) {
                return Err(Error::DuplicateEngine(engine_doc.name));
            }

            let engine = Engine {
                id: claim(
                    engine_doc
                        .id
                        .unwrap_or_else(|| derived_id(&format!("engine/{}", engine_doc.name))),
                )?,
                name: engine_doc.name,
            };

            let mut seen_versions = HashSet::new();

            for version_doc in engine_doc.versions {
                let natural_key = format!(
                    "version/{}/{}/{}",
                    engine.name, version_doc.version, version_doc.device_architecture
                );

                if !seen_versions.insert(natural_key.clone()) {
                    return Err(Error::DuplicateVersion {
                        engine: engine.name.clone(),
                        version: version_doc.version,
                        device: version_doc.device_architecture,
                    });
                }

                let version_id = claim(version_doc.id.unwrap_or_else(|| derived_id(&natural_key)))?;

                if let Some(compat) = version_doc.compatibility {
                    let record = CompatibilityRecord {
                        id: claim(
                            compat
                                .id
                                .unwrap_or_else(|| derived_id(&format!("compatibility/{}", version_id))),
                        )?,
                        engine_version_id: version_id,
                        architectures: compat.architectures,
                        features: compat.features,
                        supported_endpoints: compat.supported_endpoints,
                        extra: compat.extra,
                    };

                    catalog.records.insert(version_id, record);
                }

                catalog.versions.push(EngineVersion {
                    id: version_id,
                    engine_id: engine.id,
                    version: version_doc.version,
                    device_architecture: version_doc.device_architecture,
                    container_image: version_doc.container_image,
                    created_at: version_doc.created_at,
                });
            }

            for rule_doc in engine_doc.parser_rules {
                if rule_doc.pattern.is_empty() {
                    return Err(Error::EmptyPattern(engine.name.clone()));
                }

                let parser_type = non_blank(rule_doc.parser_type);
                let chat_template = non_blank(rule_doc.chat_template);

                if parser_type.is_none() && chat_template.is_none() {
                    return Err(Error::RuleWithoutEffect {
                        engine: engine.name.clone(),
                        pattern: rule_doc.pattern,
                    });
                }

                let id = rule_doc.id.unwrap_or_else(|| {
                    derived_id(&format!(
                        "rule/{}/{}/{}/{}",
                        engine.name, rule_doc.rule_type, rule_doc.match_type, rule_doc.pattern
                    ))
                });

                catalog.rules.push(ParserRule {
                    id: claim(id)?,
                    engine_id: engine.id,
                    rule_type: rule_doc.rule_type,
                    match_type: rule_doc.match_type,
                    pattern: rule_doc.pattern,
                    priority: rule_doc.priority,
                    enabled: rule_doc.enabled,
                    parser_type,
                    chat_template,
                    notes: non_blank(rule_doc.notes),
                });
            }

            catalog.engines.insert(engine.name.clone(), engine);
        }

        for mut class in document.architecture_classes {
            class.tool_calling_parser_type = non_blank(class.tool_calling_parser_type);
            class.reasoning_parser_type = non_blank(class.reasoning_parser_type);

            if catalog.classes.contains_key(&class.class_name) {
                return Err(Error::DuplicateArchitectureClass(class.class_name));
            }

            catalog.classes.insert(class.class_name.clone(), class);
        }

        for mut model in document.models {
            model.tool_calling_parser_type = non_blank(model.tool_calling_parser_type);
            model.chat_template = non_blank(model.chat_template);
            model.architecture_class = non_blank(model.architecture_class);

            if catalog.models.contains_key(&model.uri) {
                return Err(Error::DuplicateModel(model.uri));
            }

            catalog.models.insert(model.uri.clone(), model);
        }

        Ok(catalog)
    }
}
