//! HTTP handlers for the inference gateway
//! 推理网关的HTTP处理器
//!
//! Every task endpoint binds exactly one TaskKind and defers to the
//! dispatcher; the handlers only translate between HTTP and task shapes.
//! 每个任务端点绑定一个TaskKind并交由分发器处理，处理器只负责HTTP与任务结构的转换。

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::sync::Arc;

use crate::gateway::dispatcher::{Dispatcher, TaskBody, TaskOutput};
use crate::gateway::error::DispatchError;
use crate::inference::TaskKind;

/// Application state / 应用状态
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

impl IntoResponse for TaskOutput {
    fn into_response(self) -> Response {
        match self {
            TaskOutput::Binary(b) => {
                let len = b.bytes.len().to_string();
                (
                    [
                        (header::CONTENT_TYPE, b.content_type),
                        (header::CONTENT_LENGTH, len),
                    ],
                    b.bytes,
                )
                    .into_response()
            }
            TaskOutput::Structured(s) => Json(s).into_response(),
        }
    }
}

async fn run_task(
    state: AppState,
    task: TaskKind,
    payload: Result<Json<TaskBody>, JsonRejection>,
) -> Result<TaskOutput, DispatchError> {
    let Json(body) = payload.map_err(|rejection| {
        DispatchError::client_input(format!("invalid request body: {}", rejection.body_text()))
    })?;
    state.dispatcher.dispatch(body.into_request(task)).await
}

/// Synthesize speech / 语音合成
pub async fn text_to_speech(
    State(state): State<AppState>,
    payload: Result<Json<TaskBody>, JsonRejection>,
) -> Result<TaskOutput, DispatchError> {
    run_task(state, TaskKind::TextToSpeech, payload).await
}

/// Colorize the configured source photo / 为配置的源照片上色
pub async fn color_photo(
    State(state): State<AppState>,
    payload: Result<Json<TaskBody>, JsonRejection>,
) -> Result<TaskOutput, DispatchError> {
    run_task(state, TaskKind::ImageToImage, payload).await
}

pub async fn classify(
    State(state): State<AppState>,
    payload: Result<Json<TaskBody>, JsonRejection>,
) -> Result<TaskOutput, DispatchError> {
    run_task(state, TaskKind::Classify, payload).await
}

pub async fn translate(
    State(state): State<AppState>,
    payload: Result<Json<TaskBody>, JsonRejection>,
) -> Result<TaskOutput, DispatchError> {
    run_task(state, TaskKind::Translate, payload).await
}

pub async fn chat_completion(
    State(state): State<AppState>,
    payload: Result<Json<TaskBody>, JsonRejection>,
) -> Result<TaskOutput, DispatchError> {
    run_task(state, TaskKind::ChatCompletion, payload).await
}

/// Health check / 健康检查
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "backend": state.dispatcher.backend_name(),
    }))
}
