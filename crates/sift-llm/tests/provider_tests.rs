// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use serde_json::{Value, json};
use sift_grid::{ColumnFilter, FilterOperator, GridEngine};
use sift_llm::{
    AnthropicProvider, CustomBodyFormat, CustomProvider, DEFAULT_CONFIDENCE_THRESHOLD,
    InvokeOptions, OllamaProvider, OpenAiProvider, Provider, ProviderConfig, ProviderKind,
    QueryPipeline, TransportError, apply_to_engine, build_provider, schema_with_examples,
};
use sift_testkit::{RowFaker, employee_columns};
use std::collections::BTreeMap;
use std::io::Read;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tiny_http::{Header, Response, Server};

struct Captured {
    url: String,
    headers: BTreeMap<String, String>,
    body: Value,
}

impl Captured {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// Answers one request with `status` and `reply`, handing back what it saw.
fn serve_once(status: u16, reply: String) -> Result<(String, JoinHandle<Captured>)> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let mut request = server.recv().expect("request expected");
        let mut raw = String::new();
        request
            .as_reader()
            .read_to_string(&mut raw)
            .expect("request body should be readable");
        let captured = Captured {
            url: request.url().to_owned(),
            headers: request
                .headers()
                .iter()
                .map(|header| {
                    (
                        header.field.as_str().as_str().to_ascii_lowercase(),
                        header.value.as_str().to_owned(),
                    )
                })
                .collect(),
            body: serde_json::from_str(&raw).expect("request body should be JSON"),
        };
        let response = Response::from_string(reply)
            .with_status_code(status)
            .with_header(
                Header::from_bytes("Content-Type", "application/json")
                    .expect("valid content type header"),
            );
        request.respond(response).expect("response should succeed");
        captured
    });
    Ok((addr, handle))
}

fn join(handle: JoinHandle<Captured>) -> Captured {
    handle.join().expect("server thread should join")
}

const REPLY: &str = r#"{"filters":[],"sorting":[],"confidence":1}"#;

#[test]
fn openai_posts_chat_completions_with_bearer_auth() -> Result<()> {
    let reply = json!({"choices": [{"message": {"role": "assistant", "content": REPLY}}]});
    let (addr, handle) = serve_once(200, reply.to_string())?;

    let provider = OpenAiProvider::new(&format!("{addr}/v1"), "sk-test", "gpt-4o-mini")?;
    let text = provider.invoke("system text", "user text", &InvokeOptions::default())?;
    assert_eq!(text, REPLY);

    let seen = join(handle);
    assert_eq!(seen.url, "/v1/chat/completions");
    assert_eq!(seen.header("authorization"), Some("Bearer sk-test"));
    assert_eq!(seen.body["model"], "gpt-4o-mini");
    assert_eq!(seen.body["messages"][0]["role"], "system");
    assert_eq!(seen.body["messages"][1]["content"], "user text");
    assert_eq!(seen.body["max_tokens"], 1000);
    assert_eq!(seen.body["response_format"]["type"], "json_object");
    Ok(())
}

#[test]
fn anthropic_sends_top_level_system_and_joins_text_blocks() -> Result<()> {
    let reply = json!({
        "content": [
            {"type": "text", "text": "{\"filters\":[],"},
            {"type": "tool_use", "id": "x"},
            {"type": "text", "text": "\"sorting\":[],\"confidence\":1}"}
        ]
    });
    let (addr, handle) = serve_once(200, reply.to_string())?;

    let provider = AnthropicProvider::new(&addr, "ak-test", "claude-test")?;
    let text = provider.invoke("system text", "user text", &InvokeOptions::default())?;
    assert_eq!(text, REPLY);

    let seen = join(handle);
    assert_eq!(seen.url, "/v1/messages");
    assert_eq!(seen.header("x-api-key"), Some("ak-test"));
    assert_eq!(seen.header("anthropic-version"), Some("2023-06-01"));
    assert_eq!(seen.body["system"], "system text");
    assert_eq!(seen.body["messages"], json!([{"role": "user", "content": "user text"}]));
    Ok(())
}

#[test]
fn ollama_requests_json_without_streaming() -> Result<()> {
    let reply = json!({"message": {"role": "assistant", "content": REPLY}, "done": true});
    let (addr, handle) = serve_once(200, reply.to_string())?;

    let provider = OllamaProvider::new(&format!("{addr}/v1"), "qwen3")?;
    let options = InvokeOptions {
        temperature: 0.0,
        max_tokens: 64,
        ..InvokeOptions::default()
    };
    assert_eq!(provider.invoke("s", "u", &options)?, REPLY);

    let seen = join(handle);
    assert_eq!(seen.url, "/api/chat");
    assert_eq!(seen.header("authorization"), None);
    assert_eq!(seen.body["stream"], false);
    assert_eq!(seen.body["format"], "json");
    assert_eq!(seen.body["options"]["num_predict"], 64);
    Ok(())
}

#[test]
fn custom_prompt_body_with_transform_and_extra_headers() -> Result<()> {
    let (addr, handle) = serve_once(200, json!({"data": {"answer": REPLY}}).to_string())?;

    let provider = CustomProvider::new(&format!("{addr}/generate"))?
        .with_headers(BTreeMap::from([(
            "X-Team".to_owned(),
            "grid".to_owned(),
        )]))
        .with_body_format(CustomBodyFormat::Prompt)
        .with_transform(|payload| {
            payload
                .pointer("/data/answer")
                .and_then(Value::as_str)
                .map(str::to_owned)
        });
    let options = InvokeOptions {
        extra_headers: BTreeMap::from([("X-Trace".to_owned(), "abc".to_owned())]),
        ..InvokeOptions::default()
    };
    assert_eq!(provider.invoke("sys", "who?", &options)?, REPLY);

    let seen = join(handle);
    assert_eq!(seen.url, "/generate");
    assert_eq!(seen.header("x-team"), Some("grid"));
    assert_eq!(seen.header("x-trace"), Some("abc"));
    assert_eq!(seen.body["prompt"], "sys\n\nwho?");
    assert!(seen.body.get("model").is_none());
    assert!(seen.body.get("messages").is_none());
    Ok(())
}

#[test]
fn custom_falls_back_to_probing_then_whole_payload() -> Result<()> {
    let (addr, handle) = serve_once(200, json!({"output": REPLY}).to_string())?;
    let provider = CustomProvider::new(&addr)?.with_model(Some("m1".to_owned()));
    assert_eq!(provider.invoke("s", "u", &InvokeOptions::default())?, REPLY);
    let seen = join(handle);
    assert_eq!(seen.body["model"], "m1");
    assert_eq!(seen.body["messages"][1]["role"], "user");

    let (addr, handle) = serve_once(200, r#"{"weird":1}"#.to_owned())?;
    let provider = CustomProvider::new(&addr)?;
    assert_eq!(
        provider.invoke("s", "u", &InvokeOptions::default())?,
        r#"{"weird":1}"#
    );
    join(handle);
    Ok(())
}

#[test]
fn server_errors_surface_status_and_message() -> Result<()> {
    let (addr, handle) = serve_once(
        500,
        json!({"error": {"message": "model exploded"}}).to_string(),
    )?;
    let provider = OpenAiProvider::new(&addr, "", "gpt")?;
    let error = provider
        .invoke("s", "u", &InvokeOptions::default())
        .expect_err("500 should fail");
    assert_eq!(error.to_string(), "server error (500): model exploded");
    assert!(matches!(error, TransportError::Status { status: 500, .. }));

    let seen = join(handle);
    assert_eq!(seen.header("authorization"), None);
    Ok(())
}

#[test]
fn unreachable_endpoint_is_a_connect_or_timeout_error() -> Result<()> {
    let provider = OllamaProvider::new("http://127.0.0.1:1", "qwen3")?;
    let options = InvokeOptions {
        timeout: Some(Duration::from_millis(200)),
        ..InvokeOptions::default()
    };
    let error = provider
        .invoke("s", "u", &options)
        .expect_err("nothing listens on port 1");
    assert!(
        matches!(
            error,
            TransportError::Connect { .. } | TransportError::Timeout(_)
        ),
        "{error}"
    );
    Ok(())
}

#[test]
fn build_provider_validates_config() -> Result<()> {
    let config: ProviderConfig =
        serde_json::from_value(json!({"kind": "ollama", "model": "qwen3"}))?;
    let provider = build_provider(&config)?;
    assert_eq!(provider.kind(), ProviderKind::Ollama);

    let missing_model = ProviderConfig::OpenAi {
        base_url: "https://api.openai.com/v1".to_owned(),
        api_key: String::new(),
        model: " ".to_owned(),
    };
    let error = build_provider(&missing_model)
        .err()
        .map(|error| format!("{error:#}"))
        .unwrap_or_default();
    assert!(error.contains("ai.model must not be empty"), "{error}");

    let bad_url = ProviderConfig::Anthropic {
        base_url: "ftp://example.com".to_owned(),
        api_key: String::new(),
        model: "claude".to_owned(),
    };
    assert!(build_provider(&bad_url).is_err());
    Ok(())
}

#[test]
fn pipeline_filters_employees_end_to_end() -> Result<()> {
    let reply = json!({
        "choices": [{
            "message": {
                "content": "Here you go:\n{\"filters\":[{\"id\":\"state\",\"operator\":\"equals\",\"value\":\"CA\"}],\"sorting\":[{\"id\":\"salary\",\"desc\":true}],\"confidence\":0.95}"
            }
        }]
    });
    let (addr, handle) = serve_once(200, reply.to_string())?;

    let rows = RowFaker::new(7).employees(60);
    let columns = employee_columns();
    let schema = schema_with_examples(&columns, &rows, 3);
    let mut engine = GridEngine::new(rows, columns);

    let provider: Arc<dyn Provider> = Arc::from(build_provider(&ProviderConfig::OpenAi {
        base_url: addr,
        api_key: "sk".to_owned(),
        model: "gpt".to_owned(),
    })?);
    let mut pipeline = QueryPipeline::new(provider, InvokeOptions::default());
    let result = pipeline.run("best paid people in california", &schema);

    assert_eq!(result.error, None);
    assert!((result.confidence - 0.95).abs() < f64::EPSILON);
    assert_eq!(
        result.filters,
        vec![ColumnFilter::new("state", FilterOperator::Equals, "CA")]
    );
    assert!(apply_to_engine(
        &result,
        &mut engine,
        DEFAULT_CONFIDENCE_THRESHOLD
    )?);

    let sorted = engine.get_sorted_rows();
    assert!(sorted.iter().all(|row| row.row["state"] == "CA"));
    let salaries: Vec<i64> = sorted
        .iter()
        .filter_map(|row| row.row["salary"].as_i64())
        .collect();
    assert!(salaries.windows(2).all(|pair| pair[0] >= pair[1]));

    let seen = join(handle);
    let system = seen.body["messages"][0]["content"]
        .as_str()
        .unwrap_or_default();
    assert!(system.contains("- `salary` (currency): Salary"));
    assert_eq!(
        seen.body["messages"][1]["content"],
        "best paid people in california"
    );
    Ok(())
}
