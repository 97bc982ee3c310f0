//! Shared helpers for integration tests / 集成测试共享工具

#![allow(dead_code)]

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hf_gateway::codec::base64_to_bytes;

/// A request seen by the fake backend / 模拟后端收到的请求
#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Clone, Default)]
pub struct FakeBackend {
    pub seen: Arc<Mutex<Vec<Recorded>>>,
}

impl FakeBackend {
    pub fn requests(&self) -> Vec<Recorded> {
        self.seen.lock().unwrap().clone()
    }
}

pub const FAKE_AUDIO: [u8; 8] = [0x52, 0x49, 0x46, 0x46, 0x24, 0x00, 0x00, 0x00];

async fn handle_model(
    State(backend): State<FakeBackend>,
    Path(rest): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    backend.seen.lock().unwrap().push(Recorded {
        path: rest.clone(),
        authorization,
        body: body.clone(),
    });

    if let Some(model) = rest.strip_suffix("/v1/chat/completions") {
        let last = body["messages"]
            .as_array()
            .and_then(|m| m.last())
            .and_then(|m| m["content"].as_str())
            .unwrap_or("")
            .to_string();
        let first = json!({"role": "assistant", "content": format!("echo: {}", last)});
        let second = json!({"role": "assistant", "content": "second"});
        return Json(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "model": model,
            "choices": [
                {"index": 0, "message": first, "finish_reason": "stop"},
                {"index": 1, "message": second, "finish_reason": "stop"}
            ]
        }))
        .into_response();
    }

    match rest.as_str() {
        "tts/ok" => ([(header::CONTENT_TYPE, "audio/flac")], FAKE_AUDIO.to_vec()).into_response(),
        "img/ok" => {
            let src = body["inputs"].as_str().unwrap_or("");
            match base64_to_bytes(src) {
                Ok(mut bytes) => {
                    bytes.reverse();
                    ([(header::CONTENT_TYPE, "image/jpeg")], bytes).into_response()
                }
                Err(_) => (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": "inputs must be base64"})),
                )
                    .into_response(),
            }
        }
        "cls/nested" => Json(json!([[
            {"label": "sadness", "score": 0.77},
            {"label": "surprise", "score": 0.12},
            {"label": "joy", "score": 0.01}
        ]]))
        .into_response(),
        "cls/unsorted" => Json(json!([
            {"label": "b", "score": 0.1},
            {"label": "a", "score": 0.9}
        ]))
        .into_response(),
        "tr/ok" => Json(json!([{"translation_text": "translated"}])).into_response(),
        "tts/json" => Json(json!({"error": "Model facebook/mms-tts is currently loading"}))
            .into_response(),
        "fail/rate" => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({"error": "rate limited"})),
        )
            .into_response(),
        "fail/plain" => (StatusCode::SERVICE_UNAVAILABLE, "oops").into_response(),
        "bad/json" => ([(header::CONTENT_TYPE, "text/plain")], "not json").into_response(),
        "slow/model" => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            ([(header::CONTENT_TYPE, "audio/flac")], FAKE_AUDIO.to_vec()).into_response()
        }
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": format!("Model {} does not exist", rest)})),
        )
            .into_response(),
    }
}

/// Start a fake inference backend on an ephemeral port
/// 在临时端口上启动模拟推理后端
pub async fn spawn_fake_backend() -> (String, FakeBackend) {
    let backend = FakeBackend::default();
    let app = Router::new()
        .route("/models/{*rest}", post(handle_model))
        .with_state(backend.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), backend)
}
