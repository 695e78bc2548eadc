// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod backends;
pub mod parser;
pub mod pipeline;
pub mod prompt;
pub mod provider;
pub mod schema;

pub use backends::{
    ANTHROPIC_VERSION, AnthropicProvider, CustomProvider, OllamaProvider, OpenAiProvider,
    TransformFn, probe_text,
};
pub use parser::{
    AiQueryResult, ParsedFilter, ParsedResponse, ParsedSort, ResponseError, extract_json_object,
    parse_response, parse_structured,
};
pub use pipeline::{
    DEFAULT_CONFIDENCE_THRESHOLD, DispatchedResult, QueryDispatcher, QueryPhase, QueryPipeline,
    apply_to_engine, translate,
};
pub use prompt::{build_system_prompt, build_user_prompt};
pub use provider::{
    CustomBodyFormat, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT, InvokeOptions,
    LOCAL_TIMEOUT, Provider, ProviderConfig, ProviderKind, TransportError, build_provider,
    default_anthropic_url, default_ollama_url, default_openai_url,
};
pub use schema::{ColumnSchema, MAX_EXAMPLES, column_schema, find_schema, schema_with_examples};
