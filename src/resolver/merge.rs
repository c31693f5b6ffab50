//! Combines the override layers for one candidate engine version.
//!
//! Precedence, highest first:
//!
//! | field                      | layers                                   |
//! |----------------------------|------------------------------------------|
//! | `tool_calling_parser_type` | model info, architecture class, tool rule |
//! | `reasoning_parser_type`    | architecture class, reasoning rule        |
//! | `chat_template`            | tool rule, model info                     |
//! | `parser_notes`             | tool rule                                 |
//!
//! A layer counts whenever its value is present, whatever the value is. Blank
//! strings never get this far: the catalog loader drops them.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::lookup::Candidate;
use crate::catalog::{ArchitectureClass, DeviceArchitecture, ModelEndpoint, ModelInfo, ParserRule};

/// The layer a resolved parser type came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub(crate) enum ParserSource {
    ModelDefault,
    ArchitectureDefault,
    EngineParserRule,
}

/// The merged answer for one engine version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct ResolvedCompatibility {
    pub engine: String,
    pub device_architecture: DeviceArchitecture,
    pub version: String,
    pub container_image: String,
    pub created_at: DateTime<Utc>,
    pub tool_calling_parser_type: Option<String>,
    pub reasoning_parser_type: Option<String>,
    pub chat_template: Option<String>,
    pub parser_source: Option<ParserSource>,
    pub reasoning_parser_source: Option<ParserSource>,
    pub architecture_family: Option<String>,
    pub supports_lora: bool,
    pub supports_pipeline_parallelism: bool,
    pub parser_notes: Option<String>,
    pub features: Vec<String>,
    pub supported_endpoints: Vec<ModelEndpoint>,
}

/// The inputs of a merge besides the candidate itself. Every layer is
/// optional.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Layers<'l> {
    pub model_info: Option<&'l ModelInfo>,
    pub arch_class: Option<&'l ArchitectureClass>,
    pub tool_rule: Option<&'l ParserRule>,
    pub reasoning_rule: Option<&'l ParserRule>,
}

/// The first present value, tagged with its source.
fn first_present<'v>(layers: &[(Option<&'v String>, ParserSource)]) -> Option<(&'v str, ParserSource)> {
    layers
        .iter()
        .find_map(|(value, source)| value.map(|value| (value.as_str(), *source)))
}

pub(crate) fn merge(candidate: &Candidate, layers: &Layers<'_>) -> ResolvedCompatibility {
    let tool = first_present(&[
        (
            layers.model_info.and_then(|m| m.tool_calling_parser_type.as_ref()),
            ParserSource::ModelDefault,
        ),
        (
            layers.arch_class.and_then(|c| c.tool_calling_parser_type.as_ref()),
            ParserSource::ArchitectureDefault,
        ),
        (
            layers.tool_rule.and_then(|r| r.parser_type.as_ref()),
            ParserSource::EngineParserRule,
        ),
    ]);

    let reasoning = first_present(&[
        (
            layers.arch_class.and_then(|c| c.reasoning_parser_type.as_ref()),
            ParserSource::ArchitectureDefault,
        ),
        (
            layers.reasoning_rule.and_then(|r| r.parser_type.as_ref()),
            ParserSource::EngineParserRule,
        ),
    ]);

    let chat_template = layers
        .tool_rule
        .and_then(|r| r.chat_template.as_deref())
        .or_else(|| layers.model_info.and_then(|m| m.chat_template.as_deref()));

    let parser_notes = layers.tool_rule.and_then(|r| r.notes.as_deref());

    let architecture_family = layers
        .arch_class
        .map(|c| c.architecture_family.as_str())
        .filter(|family| !family.is_empty());

    let supported_endpoints = candidate
        .record
        .supported_endpoints
        .iter()
        .flat_map(|endpoints| endpoints.iter())
        .copied()
        .collect();

    ResolvedCompatibility {
        engine: candidate.engine.name.clone(),
        device_architecture: candidate.version.device_architecture,
        version: candidate.version.version.clone(),
        container_image: candidate.version.container_image.clone(),
        created_at: candidate.version.created_at,
        tool_calling_parser_type: tool.map(|(value, _)| value.to_string()),
        parser_source: tool.map(|(_, source)| source),
        reasoning_parser_type: reasoning.map(|(value, _)| value.to_string()),
        reasoning_parser_source: reasoning.map(|(_, source)| source),
        chat_template: chat_template.map(str::to_string),
        architecture_family: architecture_family.map(str::to_string),
        supports_lora: layers.arch_class.map_or(false, |c| c.supports_lora),
        supports_pipeline_parallelism: layers
            .arch_class
            .map_or(false, |c| c.supports_pipeline_parallelism),
        parser_notes: parser_notes.map(str::to_string),
        features: candidate
            .record
            .features
            .iter()
            .map(|feature| feature.name.clone())
            .collect(),
        supported_endpoints,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CompatibilityRecord, Engine, EngineVersion, MatchType};
    use crate::resolver::matcher::tests::rule;
    use std::collections::{BTreeMap, BTreeSet};
    use uuid::Uuid;

    fn candidate() -> Candidate {
        Candidate {
            engine: Engine {
                id: Uuid::from_u128(1),
                name: "vllm".to_string(),
            },
            version: EngineVersion {
                id: Uuid::from_u128(2),
                engine_id: Uuid::from_u128(1),
                version: "0.6.3".to_string(),
                device_architecture: DeviceArchitecture::Cuda,
                container_image: "vllm/vllm-openai:v0.6.3".to_string(),
                created_at: DateTime::parse_from_rfc3339("2024-10-14T00:00:00Z")
                    .unwrap()
                    .with_timezone(&Utc),
            },
            record: CompatibilityRecord {
                id: Uuid::from_u128(3),
                engine_version_id: Uuid::from_u128(2),
                architectures: vec!["Qwen2ForCausalLM".into()],
                features: vec!["lora".into()],
                supported_endpoints: Some(BTreeSet::from([ModelEndpoint::Chat])),
                extra: BTreeMap::new(),
            },
        }
    }

    fn model_info(tool: Option<&str>, template: Option<&str>) -> ModelInfo {
        ModelInfo {
            uri: "Qwen/Qwen2.5-7B-Instruct".to_string(),
            tool_calling_parser_type: tool.map(str::to_string),
            chat_template: template.map(str::to_string),
            architecture_class: Some("Qwen2ForCausalLM".to_string()),
            endpoints: vec![],
        }
    }

    fn arch_class(tool: Option<&str>, reasoning: Option<&str>) -> ArchitectureClass {
        ArchitectureClass {
            class_name: "Qwen2ForCausalLM".to_string(),
            architecture_family: "qwen2".to_string(),
            tool_calling_parser_type: tool.map(str::to_string),
            reasoning_parser_type: reasoning.map(str::to_string),
            supports_lora: true,
            supports_pipeline_parallelism: false,
        }
    }

    #[test]
    fn model_info_wins_over_class_and_rule() {
        let info = model_info(Some("hermes"), None);
        let class = arch_class(Some("qwen"), None);
        let rule = rule(1, 0, MatchType::Prefix, "Qwen/", "mistral");

        let resolved = merge(
            &candidate(),
            &Layers {
                model_info: Some(&info),
                arch_class: Some(&class),
                tool_rule: Some(&rule),
                reasoning_rule: None,
            },
        );

        assert_eq!(resolved.tool_calling_parser_type.as_deref(), Some("hermes"));
        assert_eq!(resolved.parser_source, Some(ParserSource::ModelDefault));
    }

    #[test]
    fn class_default_without_model_info_or_rule() {
        let class = arch_class(Some("qwen"), None);

        let resolved = merge(
            &candidate(),
            &Layers {
                arch_class: Some(&class),
                ..Layers::default()
            },
        );

        assert_eq!(resolved.tool_calling_parser_type.as_deref(), Some("qwen"));
        assert_eq!(resolved.parser_source, Some(ParserSource::ArchitectureDefault));
        assert_eq!(resolved.architecture_family.as_deref(), Some("qwen2"));
        assert!(resolved.supports_lora);
        assert!(!resolved.supports_pipeline_parallelism);
    }

    #[test]
    fn rule_is_the_last_tool_layer() {
        let mut rule = rule(1, 0, MatchType::Prefix, "Qwen/", "hermes");
        rule.notes = Some("Qwen 2.5 uses hermes tool calls".to_string());

        let resolved = merge(
            &candidate(),
            &Layers {
                tool_rule: Some(&rule),
                ..Layers::default()
            },
        );

        assert_eq!(resolved.tool_calling_parser_type.as_deref(), Some("hermes"));
        assert_eq!(resolved.parser_source, Some(ParserSource::EngineParserRule));
        assert_eq!(
            resolved.parser_notes.as_deref(),
            Some("Qwen 2.5 uses hermes tool calls")
        );
        assert_eq!(resolved.architecture_family, None);
        assert!(!resolved.supports_lora);
    }

    #[test]
    fn nothing_present() {
        let resolved = merge(&candidate(), &Layers::default());

        assert_eq!(resolved.tool_calling_parser_type, None);
        assert_eq!(resolved.parser_source, None);
        assert_eq!(resolved.reasoning_parser_type, None);
        assert_eq!(resolved.reasoning_parser_source, None);
        assert_eq!(resolved.chat_template, None);
        assert_eq!(resolved.engine, "vllm");
        assert_eq!(resolved.version, "0.6.3");
        assert_eq!(resolved.features, vec!["lora".to_string()]);
        assert_eq!(resolved.supported_endpoints, vec![ModelEndpoint::Chat]);
    }

    #[test]
    fn rule_template_wins_over_model_template() {
        let info = model_info(None, Some("model.jinja"));
        let mut with_template = rule(1, 0, MatchType::Prefix, "Qwen/", "hermes");
        with_template.chat_template = Some("rule.jinja".to_string());

        let resolved = merge(
            &candidate(),
            &Layers {
                model_info: Some(&info),
                tool_rule: Some(&with_template),
                ..Layers::default()
            },
        );
        assert_eq!(resolved.chat_template.as_deref(), Some("rule.jinja"));

        let without_template = rule(1, 0, MatchType::Prefix, "Qwen/", "hermes");
        let resolved = merge(
            &candidate(),
            &Layers {
                model_info: Some(&info),
                tool_rule: Some(&without_template),
                ..Layers::default()
            },
        );
        assert_eq!(resolved.chat_template.as_deref(), Some("model.jinja"));
    }

    #[test]
    fn presence_decides_not_value() {
        let info = model_info(Some(""), None);
        let class = arch_class(Some("qwen"), None);
        let rule = rule(1, 0, MatchType::Prefix, "Qwen/", "hermes");

        let resolved = merge(
            &candidate(),
            &Layers {
                model_info: Some(&info),
                arch_class: Some(&class),
                tool_rule: Some(&rule),
                reasoning_rule: None,
            },
        );

        assert_eq!(resolved.tool_calling_parser_type.as_deref(), Some(""));
        assert_eq!(resolved.parser_source, Some(ParserSource::ModelDefault));

        let info = model_info(None, None);
        let resolved = merge(
            &candidate(),
            &Layers {
                model_info: Some(&info),
                arch_class: Some(&class),
                tool_rule: Some(&rule),
                reasoning_rule: None,
            },
        );

        assert_eq!(resolved.tool_calling_parser_type.as_deref(), Some("qwen"));
        assert_eq!(resolved.parser_source, Some(ParserSource::ArchitectureDefault));
    }

    #[test]
    fn reasoning_prefers_class_default() {
        let class = arch_class(None, Some("deepseek_v3"));
        let mut reasoning = rule(1, 0, MatchType::Prefix, "deepseek-ai/", "deepseek_r1");
        reasoning.rule_type = crate::catalog::RuleType::Reasoning;

        let resolved = merge(
            &candidate(),
            &Layers {
                arch_class: Some(&class),
                reasoning_rule: Some(&reasoning),
                ..Layers::default()
            },
        );
        assert_eq!(resolved.reasoning_parser_type.as_deref(), Some("deepseek_v3"));
        assert_eq!(
            resolved.reasoning_parser_source,
            Some(ParserSource::ArchitectureDefault)
        );

        let resolved = merge(
            &candidate(),
            &Layers {
                reasoning_rule: Some(&reasoning),
                ..Layers::default()
            },
        );
        assert_eq!(resolved.reasoning_parser_type.as_deref(), Some("deepseek_r1"));
        assert_eq!(
            resolved.reasoning_parser_source,
            Some(ParserSource::EngineParserRule)
        );
        // Reasoning rules never supply a chat template.
        assert_eq!(resolved.chat_template, None);
    }
}
