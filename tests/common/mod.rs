//! Local stand-in for the Workers AI REST API.

use axum::extract::{ Path, State };
use axum::http::{ HeaderMap, StatusCode };
use axum::response::{ IntoResponse, Response };
use axum::routing::{ get, post };
use axum::{ Json, Router };
use clap::Parser;
use serde_json::{ json, Value };
use std::sync::{ Arc, Mutex };
use workers_ai_query::cli::Args;
use workers_ai_query::config::AppConfig;

pub const ACCOUNT: &str = "acc-123";
pub const TOKEN: &str = "secret-token";

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub account: String,
    pub model: String,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Clone, Default)]
pub struct FakeApi {
    pub calls: Arc<Mutex<Vec<RecordedCall>>>,
    pub models_fail: bool,
}

impl FakeApi {
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("calls lock").clone()
    }
}

fn ok(result: Value) -> Response {
    Json(json!({ "success": true, "errors": [], "messages": [], "result": result })).into_response()
}

async fn search(State(api): State<FakeApi>) -> Response {
    if api.models_fail {
        return (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response();
    }
    ok(
        json!([
        { "name": "@cf/meta/llama-3.1-8b-instruct", "task": { "name": "Text Generation" } },
        { "name": "@cf/openai/gpt-oss-20b", "task": { "name": "Text Generation" } },
        { "name": "@cf/baai/bge-base-en-v1.5", "task": { "name": "Text Embeddings" } }
    ])
    )
}

async fn run(
    State(api): State<FakeApi>,
    Path((account, model)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>
) -> Response {
    let model = model.trim_start_matches('/').to_string();
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    api.calls
        .lock()
        .expect("calls lock")
        .push(RecordedCall { account, model: model.clone(), authorization, body: body.clone() });

    match model.as_str() {
        "@cf/openai/gpt-oss-20b" =>
            ok(
                json!({
            "output": [{ "type": "message", "role": "assistant", "content": [
                { "type": "output_text", "text": "gpt-oss answer" }
            ]}]
        })
            ),
        "@cf/ibm-granite/granite-4.0-h-micro" =>
            ok(json!({ "choices": [{ "message": { "content": "granite answer" } }] })),
        "@cf/tiiuae/falcon-7b-instruct" => {
            let prompt = body["prompt"].as_str().unwrap_or_default().to_string();
            ok(json!([{ "generated_text": format!("echo: {}", prompt) }]))
        }
        "@cf/broken/model" =>
            Json(
                json!({ "success": false, "errors": [{ "message": "model unavailable" }], "result": null })
            ).into_response(),
        "@cf/missing/model" =>
            (
                StatusCode::NOT_FOUND,
                Json(
                    json!({ "success": false, "errors": [{ "code": 7000, "message": "No route for that URI" }] })
                ),
            ).into_response(),
        "@cf/garbage/model" => (StatusCode::OK, "<html>not json</html>").into_response(),
        _ => {
            let turns = body["messages"].as_array().map(Vec::len).unwrap_or(0);
            ok(json!({ "response": format!("llama answer after {} messages", turns) }))
        }
    }
}

/// Starts the fake API on an ephemeral port and returns its base URL.
pub async fn spawn(api: FakeApi) -> String {
    let router = Router::new()
        .route("/accounts/{account}/ai/models/search", get(search))
        .route("/accounts/{account}/ai/run/{*model}", post(run))
        .with_state(api);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    format!("http://{}", addr)
}

pub fn config(base_url: &str, extra: &[&str]) -> AppConfig {
    let mut argv = vec![
        "workers-ai-query",
        "--account-id",
        ACCOUNT,
        "--api-token",
        TOKEN,
        "--base-url",
        base_url,
        "--history-type",
        "memory"
    ];
    argv.extend_from_slice(extra);
    argv.push("list");
    AppConfig::from_args(&Args::parse_from(argv)).expect("config")
}
