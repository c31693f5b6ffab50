//! Shared fixtures for tests that need a populated catalog.

use async_trait::async_trait;
use std::sync::Arc;

use super::{stores::StoreIdentifier, CatalogSnapshot, CatalogStore, Error, ErrorKind, MemoryStore};
use crate::catalog::{
    document::{self, Format},
    Catalog,
};

pub(crate) const CATALOG: &'static str = r#"
[[engines]]
name = "vllm"

[[engines.versions]]
version = "0.6.0"
device_architecture = "cuda"
container_image = "vllm/vllm-openai:v0.6.0"
created_at = "2024-09-01T00:00:00Z"
compatibility.architectures = ["LlamaForCausalLM", "GPT2ForCausalLM", "Qwen2ForCausalLM"]

[[engines.versions]]
version = "0.6.3"
device_architecture = "cuda"
container_image = "vllm/vllm-openai:v0.6.3"
created_at = "2024-10-14T00:00:00Z"
compatibility.architectures = ["LlamaForCausalLM", "Qwen2ForCausalLM", "MistralForCausalLM"]
compatibility.features = ["lora", "pipeline_parallelism"]

[[engines.versions]]
version = "0.6.3"
device_architecture = "rocm"
container_image = "rocm/vllm:v0.6.3"
created_at = "2024-10-20T00:00:00Z"
compatibility.architectures = ["LlamaForCausalLM"]

[[engines.versions]]
version = "0.6.3"
device_architecture = "hpu"
container_image = "vllm/vllm-gaudi:v0.6.3"
created_at = "2024-10-21T00:00:00Z"

[[engines.parser_rules]]
match_type = "prefix"
pattern = "meta-llama/Llama-3"
priority = 10
parser_type = "llama3_json"
chat_template = "tool_chat_template_llama3.1_json.jinja"
notes = "Llama 3.x emits JSON tool calls"

[[engines.parser_rules]]
match_type = "regex"
pattern = "Qwen/Qwen2\\.5-.*"
priority = 10
parser_type = "hermes"

[[engines.parser_rules]]
match_type = "regex"
pattern = "mistralai/("
priority = 0
parser_type = "broken"

[[engines.parser_rules]]
match_type = "prefix"
pattern = "mistralai/"
priority = 5
parser_type = "mistral"
chat_template = "tool_chat_template_mistral.jinja"

[[engines.parser_rules]]
match_type = "exact"
pattern = "Qwen/Qwen2.5-7B-Instruct"
priority = 1
enabled = false
parser_type = "disabled_parser"

[[engines.parser_rules]]
rule_type = "reasoning"
match_type = "prefix"
pattern = "deepseek-ai/DeepSeek-R1"
parser_type = "deepseek_r1"

[[engines]]
name = "infinity"

[[engines.versions]]
version = "0.0.70"
device_architecture = "cpu"
container_image = "michaelf34/infinity:0.0.70-cpu"
created_at = "2024-11-02T00:00:00Z"
compatibility.supported_endpoints = ["EMBEDDING", "RERANK"]

[[engines]]
name = "sglang"

[[engines.versions]]
version = "0.4.0"
device_architecture = "cuda"
container_image = "lmsysorg/sglang:v0.4.0"
created_at = "2024-12-01T00:00:00Z"
compatibility.architectures = ["LlamaForCausalLM", "Qwen2ForCausalLM"]

[[engines.parser_rules]]
match_type = "prefix"
pattern = "Qwen/"
parser_type = "qwen25"

[[architecture_classes]]
class_name = "LlamaForCausalLM"
architecture_family = "llama"
supports_lora = true
supports_pipeline_parallelism = true

[[architecture_classes]]
class_name = "Qwen2ForCausalLM"
architecture_family = "qwen2"
tool_calling_parser_type = "qwen"
supports_lora = true
supports_pipeline_parallelism = true

[[architecture_classes]]
class_name = "DeepseekV3ForCausalLM"
architecture_family = "deepseek"
reasoning_parser_type = "deepseek_v3"

[[architecture_classes]]
class_name = "MistralForCausalLM"
architecture_family = "mistral"
supports_lora = true

[[models]]
uri = "meta-llama/Llama-3.1-8B-Instruct"
architecture_class = "LlamaForCausalLM"
chat_template = "llama-default.jinja"
endpoints = ["CHAT", "COMPLETION"]

[[models]]
uri = "Qwen/Qwen2.5-7B-Instruct"
architecture_class = "Qwen2ForCausalLM"
tool_calling_parser_type = "hermes"
endpoints = ["CHAT"]

[[models]]
uri = "mistralai/Mistral-7B-Instruct-v0.3"
architecture_class = "MistralForCausalLM"
tool_calling_parser_type = ""
chat_template = "mistral-default.jinja"

[[models]]
uri = "BAAI/bge-large-en-v1.5"
endpoints = ["EMBEDDING"]
"#;

pub(crate) fn catalog(raw: &str) -> Catalog {
    document::load(raw, Format::Toml).expect("fixture catalog must be valid")
}

pub(crate) fn store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new(catalog(CATALOG)))
}

/// A store that is never reachable.
pub(crate) struct UnreachableStore;

#[async_trait]
impl CatalogStore for UnreachableStore {
    fn id(&self) -> StoreIdentifier {
        StoreIdentifier::Http
    }

    async fn begin(&self) -> Result<Box<dyn CatalogSnapshot>, Error> {
        Err(Error::from_kind(ErrorKind::Connection))
    }
}
