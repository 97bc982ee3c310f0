//! Inference client adapter
//! 推理客户端适配器
//!
//! Wraps the external inference provider behind one method per task family.
//! Inputs are typed request records, outputs are typed payloads: binary media
//! stays raw bytes plus a content type, text encodings are left to callers.
//! 将外部推理服务封装为每类任务一个方法。二进制媒体始终以原始字节和内容类型返回，
//! 文本编码交由调用方处理。

pub mod huggingface;
pub mod stub;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

pub use huggingface::HuggingFaceClient;
pub use stub::StubInferenceClient;

pub const AUDIO_WAV: &str = "audio/wav";
pub const IMAGE_JPEG: &str = "image/jpeg";

/// Closed set of supported tasks / 支持的任务集合
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskKind {
    ChatCompletion,
    Classify,
    Translate,
    TextToSpeech,
    #[serde(alias = "color-photo")]
    ImageToImage,
}

impl TaskKind {
    pub const ALL: [TaskKind; 5] = [
        TaskKind::ChatCompletion,
        TaskKind::Classify,
        TaskKind::Translate,
        TaskKind::TextToSpeech,
        TaskKind::ImageToImage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::ChatCompletion => "chat-completion",
            TaskKind::Classify => "classify",
            TaskKind::Translate => "translate",
            TaskKind::TextToSpeech => "text-to-speech",
            TaskKind::ImageToImage => "image-to-image",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for task names outside the supported set / 不支持的任务名称错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown task: {0}")]
pub struct UnknownTask(pub String);

impl FromStr for TaskKind {
    type Err = UnknownTask;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "chat-completion" => Ok(TaskKind::ChatCompletion),
            "classify" => Ok(TaskKind::Classify),
            "translate" => Ok(TaskKind::Translate),
            "text-to-speech" => Ok(TaskKind::TextToSpeech),
            "image-to-image" | "color-photo" => Ok(TaskKind::ImageToImage),
            other => Err(UnknownTask(other.to_string())),
        }
    }
}

/// Raw media produced by speech and image tasks / 语音和图像任务产生的原始媒体
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryResult {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl BinaryResult {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Chat message / 聊天消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationLabel {
    pub label: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub translation_text: String,
}

/// Text-oriented task output, serialized as plain JSON
/// 文本类任务输出，序列化为普通JSON
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StructuredResult {
    Labels(Vec<ClassificationLabel>),
    Translation(Translation),
    Message(ChatMessage),
}

/// Image-to-image transformation knobs / 图像转换参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageToImageParams {
    pub prompt: String,
    pub negative_prompt: String,
    /// Passed through unvalidated; the backend enforces [0, 1]
    pub strength: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_lang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tgt_lang: Option<String>,
}

/// Failure of a backend call / 后端调用失败
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct AdapterError {
    pub message: String,
    #[source]
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AdapterError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(
        message: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            cause: Some(Box::new(cause)),
        }
    }
}

pub(crate) fn require_non_empty(field: &str, value: &str) -> Result<(), AdapterError> {
    if value.trim().is_empty() {
        Err(AdapterError::new(format!("{} is required", field)))
    } else {
        Ok(())
    }
}

/// Uniform capability interface over the inference provider
/// 推理服务的统一能力接口
///
/// Every method is a single round trip: no retries, no caching.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    fn name(&self) -> &str;

    async fn synthesize_speech(&self, text: &str, model: &str)
        -> Result<BinaryResult, AdapterError>;

    async fn transform_image(
        &self,
        image: &[u8],
        model: &str,
        params: &ImageToImageParams,
    ) -> Result<BinaryResult, AdapterError>;

    /// Labels come back in backend order, never re-sorted
    async fn classify_text(
        &self,
        text: &str,
        model: &str,
    ) -> Result<Vec<ClassificationLabel>, AdapterError>;

    async fn translate_text(
        &self,
        text: &str,
        model: &str,
        params: &TranslationParams,
    ) -> Result<Translation, AdapterError>;

    /// Only the first choice is surfaced / 仅返回第一个候选
    async fn chat_complete(
        &self,
        messages: &[ChatMessage],
        model: &str,
        extra: &Map<String, Value>,
    ) -> Result<ChatMessage, AdapterError>;
}
