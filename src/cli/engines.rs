use crate::cli::output::{
    format_output,
    table::{or_none, yes_no, Table},
};
use crate::cli::Session;
use crate::die;
use crate::resolver::{CandidateMode, ResolveRequest, ResolvedCompatibility};
use crate::EnginesArgs;

impl From<Vec<ResolvedCompatibility>> for Table {
    fn from(value: Vec<ResolvedCompatibility>) -> Self {
        let mut tab = Table::new(vec![
            "ENGINE",
            "VERSION",
            "DEVICE",
            "IMAGE",
            "TOOL_PARSER",
            "SOURCE",
            "REASONING_PARSER",
            "REASONING_SOURCE",
            "CHAT_TEMPLATE",
            "FAMILY",
            "LORA",
            "PP",
            "NOTES",
        ]);

        for resolved in value {
            tab.add_row(vec![
                resolved.engine,
                resolved.version,
                resolved.device_architecture.to_string(),
                resolved.container_image,
                or_none(resolved.tool_calling_parser_type.as_deref()),
                or_none(resolved.parser_source.map(|s| s.to_string()).as_deref()),
                or_none(resolved.reasoning_parser_type.as_deref()),
                or_none(resolved.reasoning_parser_source.map(|s| s.to_string()).as_deref()),
                or_none(resolved.chat_template.as_deref()),
                or_none(resolved.architecture_family.as_deref()),
                yes_no(resolved.supports_lora),
                yes_no(resolved.supports_pipeline_parallelism),
                or_none(resolved.parser_notes.as_deref()),
            ]);
        }

        tab
    }
}

pub(crate) async fn engines_cmd(session: &Session, args: &EnginesArgs) {
    let request = ResolveRequest {
        model_architecture: args.architecture.clone(),
        model_uri: args.model.clone(),
        device_architecture: args.device,
        engine: args.engine.clone(),
        engine_version: args.engine_version.clone(),
        mode: if args.latest_only {
            CandidateMode::Latest
        } else {
            CandidateMode::All
        },
        endpoints: args.endpoints.clone(),
    };

    let resolved = match session.resolver.compatible_engines(&request).await {
        Ok(resolved) => resolved,
        Err(err) => die!("failed to resolve compatible engines: {}", err),
    };

    format_output(resolved, args.format);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DeviceArchitecture, ModelEndpoint};
    use crate::resolver::ParserSource;
    use chrono::{TimeZone, Utc};

    fn resolved() -> ResolvedCompatibility {
        ResolvedCompatibility {
            engine: "vllm".to_string(),
            device_architecture: DeviceArchitecture::Cuda,
            version: "0.6.3".to_string(),
            container_image: "vllm/vllm-openai:v0.6.3".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 10, 14, 0, 0, 0).unwrap(),
            tool_calling_parser_type: Some("llama3_json".to_string()),
            reasoning_parser_type: Some("deepseek_r1".to_string()),
            chat_template: None,
            parser_source: Some(ParserSource::EngineParserRule),
            reasoning_parser_source: Some(ParserSource::ArchitectureDefault),
            architecture_family: Some("llama".to_string()),
            supports_lora: true,
            supports_pipeline_parallelism: false,
            parser_notes: Some("Llama 3.x emits JSON tool calls".to_string()),
            features: vec![],
            supported_endpoints: vec![ModelEndpoint::Chat],
        }
    }

    #[test]
    fn table_shows_reasoning_source_and_notes() {
        let mut tab = Table::from(vec![resolved()]);
        tab.print_header(false);

        let line = tab.to_string();
        let cells: Vec<&str> = line.split_whitespace().collect();

        assert_eq!(cells[5], "engine_parser_rule");
        assert_eq!(cells[6], "deepseek_r1");
        assert_eq!(cells[7], "architecture_default");
        assert_eq!(cells[8], "-");
        assert!(line.trim_end().ends_with("no  Llama 3.x emits JSON tool calls"));
    }
}
