//! Task dispatcher / 任务分发器
//!
//! Owns the per-request contract shared by the HTTP endpoints and the
//! one-shot CLI: validate, call the adapter once, shape the result.
//! 负责HTTP端点与单次CLI共享的请求流程：校验、调用适配器一次、整理结果。

use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

use crate::codec::read_media;
use crate::gateway::config::{BackendKind, ColorPhotoConfig, GatewayConfig};
use crate::gateway::error::DispatchError;
use crate::inference::{
    AdapterError, BinaryResult, ChatMessage, HuggingFaceClient, InferenceClient,
    StructuredResult, StubInferenceClient, TaskKind, TranslationParams,
};

/// One unit of work for the backend / 一次后端任务请求
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRequest {
    pub task: TaskKind,
    pub model: String,
    pub text: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub parameters: Map<String, Value>,
}

impl TaskRequest {
    pub fn new(task: TaskKind, model: impl Into<String>) -> Self {
        Self {
            task,
            model: model.into(),
            text: None,
            messages: Vec::new(),
            parameters: Map::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    /// Check required fields and build the typed call
    /// 检查必填字段并构造类型化调用
    pub fn validate(self) -> Result<ValidTask, DispatchError> {
        let model = self.model.trim().to_string();
        // Blank text counts as missing; anything else is forwarded verbatim
        let text = self.text.filter(|t| !t.trim().is_empty());

        let needs_text = matches!(
            self.task,
            TaskKind::TextToSpeech | TaskKind::Classify | TaskKind::Translate
        );
        let mut missing: Vec<&str> = Vec::new();
        if needs_text && text.is_none() {
            missing.push("text");
        }
        if self.task == TaskKind::ChatCompletion && text.is_none() && self.messages.is_empty() {
            missing.push("text or messages");
        }
        if model.is_empty() {
            missing.push("model");
        }
        match missing.as_slice() {
            [] => {}
            [one] => return Err(DispatchError::client_input(format!("{} is required", one))),
            many => {
                return Err(DispatchError::client_input(format!(
                    "{} are required",
                    many.join(" and ")
                )))
            }
        }

        let text = text.unwrap_or_default();
        Ok(match self.task {
            TaskKind::TextToSpeech => ValidTask::Speech { text, model },
            TaskKind::ImageToImage => ValidTask::Image { model },
            TaskKind::Classify => ValidTask::Classify { text, model },
            TaskKind::Translate => {
                let params = TranslationParams {
                    src_lang: string_param(&self.parameters, "src_lang")?,
                    tgt_lang: string_param(&self.parameters, "tgt_lang")?,
                };
                ValidTask::Translate {
                    text,
                    model,
                    params,
                }
            }
            TaskKind::ChatCompletion => {
                let messages = if self.messages.is_empty() {
                    vec![ChatMessage::user(text)]
                } else {
                    self.messages
                };
                if messages.iter().any(|m| m.role.trim().is_empty()) {
                    return Err(DispatchError::client_input("messages[].role is required"));
                }
                ValidTask::Chat {
                    messages,
                    model,
                    extra: self.parameters,
                }
            }
        })
    }
}

fn string_param(params: &Map<String, Value>, key: &str) -> Result<Option<String>, DispatchError> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(_) => Err(DispatchError::client_input(format!(
            "parameters.{} must be a string",
            key
        ))),
    }
}

/// A request that passed validation / 已通过校验的请求
#[derive(Debug, Clone, PartialEq)]
pub enum ValidTask {
    Speech {
        text: String,
        model: String,
    },
    Image {
        model: String,
    },
    Classify {
        text: String,
        model: String,
    },
    Translate {
        text: String,
        model: String,
        params: TranslationParams,
    },
    Chat {
        messages: Vec<ChatMessage>,
        model: String,
        extra: Map<String, Value>,
    },
}

/// Successful task outcome / 任务成功结果
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutput {
    Binary(BinaryResult),
    Structured(StructuredResult),
}

/// Request body accepted by every task endpoint; the endpoint fixes the task
/// 所有任务端点接受的请求体，任务由端点决定
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TaskBody {
    pub model: Option<String>,
    pub text: Option<String>,
    pub messages: Option<Vec<ChatMessage>>,
    pub parameters: Option<Map<String, Value>>,
}

impl TaskBody {
    pub fn into_request(self, task: TaskKind) -> TaskRequest {
        TaskRequest {
            task,
            model: self.model.unwrap_or_default(),
            text: self.text,
            messages: self.messages.unwrap_or_default(),
            parameters: self.parameters.unwrap_or_default(),
        }
    }
}

/// Gateway dispatcher / 网关分发器
pub struct Dispatcher {
    client: Arc<dyn InferenceClient>,
    color_photo: ColorPhotoConfig,
}

impl Dispatcher {
    pub fn new(client: Arc<dyn InferenceClient>, color_photo: ColorPhotoConfig) -> Self {
        Self {
            client,
            color_photo,
        }
    }

    /// Build the configured adapter and wrap it / 根据配置构建适配器
    pub fn from_config(config: &GatewayConfig) -> Result<Self, AdapterError> {
        let client: Arc<dyn InferenceClient> = match config.backend.kind {
            BackendKind::Huggingface => Arc::new(HuggingFaceClient::new(
                config.backend.base_url.clone(),
                config.backend.token.clone().unwrap_or_default(),
                config.backend.timeout(),
            )?),
            BackendKind::Stub => Arc::new(StubInferenceClient::default()),
        };
        Ok(Self::new(client, config.color_photo.clone()))
    }

    pub fn backend_name(&self) -> &str {
        self.client.name()
    }

    /// Validate, call the backend once and shape the result.
    /// Backend and encoding failures are logged here, once.
    pub async fn dispatch(&self, req: TaskRequest) -> Result<TaskOutput, DispatchError> {
        let request_id = Uuid::new_v4();
        let span = info_span!(
            "dispatch",
            %request_id,
            task = %req.task,
            model = %req.model.trim()
        );
        async move {
            let task = match req.validate() {
                Ok(task) => task,
                Err(e) => {
                    debug!(error = %e, "rejected request");
                    return Err(e);
                }
            };

            let result = self.execute(task).await;
            match &result {
                Ok(TaskOutput::Binary(b)) => {
                    info!(content_type = %b.content_type, bytes = b.len(), "task completed")
                }
                Ok(TaskOutput::Structured(_)) => info!("task completed"),
                Err(DispatchError::Backend(e)) => {
                    error!(error = %e, cause = ?e.cause, "inference backend call failed")
                }
                Err(DispatchError::Encoding(e)) => error!(error = %e, "encoding failure"),
                Err(DispatchError::ClientInput(e)) => debug!(error = %e, "rejected request"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, task: ValidTask) -> Result<TaskOutput, DispatchError> {
        let output = match task {
            ValidTask::Speech { text, model } => {
                TaskOutput::Binary(self.client.synthesize_speech(&text, &model).await?)
            }
            ValidTask::Image { model } => {
                let source = read_media(&self.color_photo.source_image).await?;
                let mut image = self
                    .client
                    .transform_image(&source, &model, &self.color_photo.params())
                    .await?;
                image.content_type = self.color_photo.content_type.clone();
                TaskOutput::Binary(image)
            }
            ValidTask::Classify { text, model } => TaskOutput::Structured(
                StructuredResult::Labels(self.client.classify_text(&text, &model).await?),
            ),
            ValidTask::Translate {
                text,
                model,
                params,
            } => TaskOutput::Structured(StructuredResult::Translation(
                self.client.translate_text(&text, &model, &params).await?,
            )),
            ValidTask::Chat {
                messages,
                model,
                extra,
            } => TaskOutput::Structured(StructuredResult::Message(
                self.client.chat_complete(&messages, &model, &extra).await?,
            )),
        };
        Ok(output)
    }
}
