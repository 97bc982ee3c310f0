use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::inference::{
    require_non_empty, AdapterError, BinaryResult, ChatMessage, ClassificationLabel,
    ImageToImageParams, InferenceClient, Translation, TranslationParams, AUDIO_WAV, IMAGE_JPEG,
};

/// RIFF header; enough for a browser to recognize the blob as wav
const STUB_AUDIO: [u8; 4] = [0x52, 0x49, 0x46, 0x46];
/// JPEG SOI + EOI markers
const STUB_IMAGE: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xD9];

/// Offline inference client returning fixed results
/// 返回固定结果的离线推理客户端
///
/// Every call is counted, which makes it usable as a spy in tests.
pub struct StubInferenceClient {
    name: String,
    audio: BinaryResult,
    image: BinaryResult,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl StubInferenceClient {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            audio: BinaryResult::new(STUB_AUDIO.to_vec(), AUDIO_WAV),
            image: BinaryResult::new(STUB_IMAGE.to_vec(), IMAGE_JPEG),
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_audio(mut self, audio: BinaryResult) -> Self {
        self.audio = audio;
        self
    }

    pub fn with_image(mut self, image: BinaryResult) -> Self {
        self.image = image;
        self
    }

    /// Make every call fail with `message` / 使所有调用以`message`失败
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self, fields: &[(&str, &str)]) -> Result<(), AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        for (field, value) in fields {
            require_non_empty(field, value)?;
        }
        match &self.failure {
            Some(m) => Err(AdapterError::new(m.clone())),
            None => Ok(()),
        }
    }
}

impl Default for StubInferenceClient {
    fn default() -> Self {
        Self::new("stub")
    }
}

#[async_trait]
impl InferenceClient for StubInferenceClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn synthesize_speech(
        &self,
        text: &str,
        model: &str,
    ) -> Result<BinaryResult, AdapterError> {
        self.enter(&[("text", text), ("model", model)])?;
        Ok(self.audio.clone())
    }

    async fn transform_image(
        &self,
        _image: &[u8],
        model: &str,
        _params: &ImageToImageParams,
    ) -> Result<BinaryResult, AdapterError> {
        self.enter(&[("model", model)])?;
        Ok(self.image.clone())
    }

    async fn classify_text(
        &self,
        text: &str,
        model: &str,
    ) -> Result<Vec<ClassificationLabel>, AdapterError> {
        self.enter(&[("text", text), ("model", model)])?;
        Ok(vec![
            ClassificationLabel {
                label: "positive".to_string(),
                score: 0.9,
            },
            ClassificationLabel {
                label: "neutral".to_string(),
                score: 0.07,
            },
            ClassificationLabel {
                label: "negative".to_string(),
                score: 0.03,
            },
        ])
    }

    async fn translate_text(
        &self,
        text: &str,
        model: &str,
        params: &TranslationParams,
    ) -> Result<Translation, AdapterError> {
        self.enter(&[("text", text), ("model", model)])?;
        let tgt = params.tgt_lang.as_deref().unwrap_or("und");
        Ok(Translation {
            translation_text: format!("[{}] {}", tgt, text),
        })
    }

    async fn chat_complete(
        &self,
        messages: &[ChatMessage],
        model: &str,
        _extra: &Map<String, Value>,
    ) -> Result<ChatMessage, AdapterError> {
        self.enter(&[("model", model)])?;
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role.eq_ignore_ascii_case("user"))
            .map(|m| m.content.as_str())
            .unwrap_or("");
        let content = if last_user.is_empty() {
            "stub chat completion".to_string()
        } else {
            format!("stub chat completion: {}", last_user)
        };
        Ok(ChatMessage {
            role: "assistant".to_string(),
            content,
        })
    }
}
