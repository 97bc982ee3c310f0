use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::debug;

use crate::codec::bytes_to_base64;
use crate::inference::{
    require_non_empty, AdapterError, BinaryResult, ChatMessage, ClassificationLabel,
    ImageToImageParams, InferenceClient, Translation, TranslationParams, AUDIO_WAV, IMAGE_JPEG,
};

pub const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co";

/// Hugging Face Inference API client / Hugging Face推理API客户端
pub struct HuggingFaceClient {
    name: String,
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl HuggingFaceClient {
    /// `timeout` of `None` leaves backend calls unbounded
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, AdapterError> {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder
            .build()
            .map_err(|e| AdapterError::with_cause("failed to build http client", e))?;
        Ok(Self {
            name: "huggingface".to_string(),
            base_url: base_url.into(),
            token: token.into(),
            client,
        })
    }

    fn join_url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let p = path.trim_start_matches('/');
        format!("{}/{}", base, p)
    }

    fn model_url(&self, model: &str) -> String {
        self.join_url(&format!("models/{}", model.trim()))
    }

    fn chat_url(&self, model: &str) -> String {
        self.join_url(&format!("models/{}/v1/chat/completions", model.trim()))
    }

    /// Hugging Face reports `{"error": "..."}`, OpenAI-style routes report
    /// `{"error": {"message": "..."}}`.
    fn extract_error_message(json: &Value) -> Option<String> {
        let e = json.get("error")?;
        if let Some(s) = e.as_str() {
            return Some(s.to_string()).filter(|s| !s.is_empty());
        }
        e.get("message")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: String,
        body: &B,
    ) -> Result<(Option<String>, Vec<u8>), AdapterError> {
        debug!(url = %url, "calling inference backend");
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .map_err(|e| AdapterError::with_cause(format!("network error: {}", e), e))?;

        let status = resp.status();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| AdapterError::with_cause(format!("network error: {}", e), e))?;

        if !status.is_success() {
            let extra = serde_json::from_slice::<Value>(&bytes)
                .ok()
                .and_then(|v| Self::extract_error_message(&v));
            return Err(AdapterError::new(match extra {
                Some(m) => m,
                None => format!("upstream status: {}", status.as_u16()),
            }));
        }

        Ok((content_type, bytes.to_vec()))
    }

    async fn post_for_json<B: Serialize + ?Sized>(
        &self,
        url: String,
        body: &B,
    ) -> Result<Value, AdapterError> {
        let (_, bytes) = self.post_json(url, body).await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| AdapterError::with_cause(format!("invalid backend response: {}", e), e))
    }

    /// Media endpoints answer with the raw file; a JSON body on 2xx means the
    /// backend did not produce media.
    fn expect_media(
        content_type: Option<String>,
        bytes: Vec<u8>,
        tag: &str,
    ) -> Result<BinaryResult, AdapterError> {
        if content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("application/json"))
        {
            let msg = serde_json::from_slice::<Value>(&bytes)
                .ok()
                .and_then(|v| Self::extract_error_message(&v))
                .unwrap_or_else(|| "invalid backend response: expected binary media".to_string());
            return Err(AdapterError::new(msg));
        }
        if bytes.is_empty() {
            return Err(AdapterError::new("invalid backend response: empty body"));
        }
        Ok(BinaryResult::new(bytes, tag))
    }

    pub(crate) fn parse_labels(value: Value) -> Result<Vec<ClassificationLabel>, AdapterError> {
        // Some pipelines nest one list per input
        let list = match value {
            Value::Array(mut items) if items.first().is_some_and(|v| v.is_array()) => {
                items.swap_remove(0)
            }
            other => other,
        };
        serde_json::from_value(list)
            .map_err(|e| AdapterError::with_cause(format!("invalid backend response: {}", e), e))
    }

    pub(crate) fn parse_translation(value: Value) -> Result<Translation, AdapterError> {
        let first = match value {
            Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
            Value::Object(_) => value,
            _ => {
                return Err(AdapterError::new(
                    "invalid backend response: missing translation",
                ))
            }
        };
        serde_json::from_value(first)
            .map_err(|e| AdapterError::with_cause(format!("invalid backend response: {}", e), e))
    }

    pub(crate) fn build_chat_body(
        messages: &[ChatMessage],
        model: &str,
        extra: &Map<String, Value>,
    ) -> Value {
        let mut body = json!({
            "model": model,
            "messages": messages,
        });
        if let Some(obj) = body.as_object_mut() {
            for (k, v) in extra.iter() {
                if k == "model" || k == "messages" || k == "stream" {
                    continue;
                }
                obj.insert(k.clone(), v.clone());
            }
        }
        body
    }

    pub(crate) fn parse_first_choice(value: &Value) -> Result<ChatMessage, AdapterError> {
        let message = value
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .ok_or_else(|| AdapterError::new("invalid backend response: no choices"))?;
        let role = message
            .get("role")
            .and_then(|v| v.as_str())
            .unwrap_or("assistant")
            .to_string();
        let content = message
            .get("content")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        Ok(ChatMessage { role, content })
    }
}

#[async_trait]
impl InferenceClient for HuggingFaceClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn synthesize_speech(
        &self,
        text: &str,
        model: &str,
    ) -> Result<BinaryResult, AdapterError> {
        require_non_empty("text", text)?;
        require_non_empty("model", model)?;
        let (ct, bytes) = self
            .post_json(self.model_url(model), &json!({ "inputs": text }))
            .await?;
        Self::expect_media(ct, bytes, AUDIO_WAV)
    }

    async fn transform_image(
        &self,
        image: &[u8],
        model: &str,
        params: &ImageToImageParams,
    ) -> Result<BinaryResult, AdapterError> {
        require_non_empty("model", model)?;
        if image.is_empty() {
            return Err(AdapterError::new("image is required"));
        }
        // JSON transport needs the image as text
        let body = json!({
            "inputs": bytes_to_base64(image),
            "parameters": params,
        });
        let (ct, bytes) = self.post_json(self.model_url(model), &body).await?;
        Self::expect_media(ct, bytes, IMAGE_JPEG)
    }

    async fn classify_text(
        &self,
        text: &str,
        model: &str,
    ) -> Result<Vec<ClassificationLabel>, AdapterError> {
        require_non_empty("text", text)?;
        require_non_empty("model", model)?;
        let value = self
            .post_for_json(self.model_url(model), &json!({ "inputs": text }))
            .await?;
        Self::parse_labels(value)
    }

    async fn translate_text(
        &self,
        text: &str,
        model: &str,
        params: &TranslationParams,
    ) -> Result<Translation, AdapterError> {
        require_non_empty("text", text)?;
        require_non_empty("model", model)?;
        let body = json!({
            "inputs": text,
            "parameters": params,
        });
        let value = self.post_for_json(self.model_url(model), &body).await?;
        Self::parse_translation(value)
    }

    async fn chat_complete(
        &self,
        messages: &[ChatMessage],
        model: &str,
        extra: &Map<String, Value>,
    ) -> Result<ChatMessage, AdapterError> {
        require_non_empty("model", model)?;
        if messages.is_empty() {
            return Err(AdapterError::new("messages are required"));
        }
        let body = Self::build_chat_body(messages, model, extra);
        let value = self.post_for_json(self.chat_url(model), &body).await?;
        Self::parse_first_choice(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> HuggingFaceClient {
        HuggingFaceClient::new(base, "hf_test", None).unwrap()
    }

    #[test]
    fn test_urls() {
        let c = client("https://api-inference.huggingface.co/");
        assert_eq!(
            c.model_url("facebook/mms-tts"),
            "https://api-inference.huggingface.co/models/facebook/mms-tts"
        );
        assert_eq!(
            c.chat_url("HuggingFaceH4/zephyr-7b-beta"),
            concat!(
                "https://api-inference.huggingface.co/models/",
                "HuggingFaceH4/zephyr-7b-beta/v1/chat/completions"
            )
        );
    }

    #[test]
    fn test_extract_error_message_shapes() {
        assert_eq!(
            HuggingFaceClient::extract_error_message(&json!({"error": "rate limited"})),
            Some("rate limited".to_string())
        );
        assert_eq!(
            HuggingFaceClient::extract_error_message(
                &json!({"error": {"message": "bad token", "type": "auth"}})
            ),
            Some("bad token".to_string())
        );
        assert_eq!(
            HuggingFaceClient::extract_error_message(&json!({"detail": "x"})),
            None
        );
    }

    #[test]
    fn test_parse_labels_flat_and_nested_keep_order() {
        let flat = json!([
            {"label": "negative", "score": 0.9},
            {"label": "positive", "score": 0.1}
        ]);
        let nested = json!([[{"label": "fear", "score": 0.1}, {"label": "joy", "score": 0.6}]]);

        let labels = HuggingFaceClient::parse_labels(flat).unwrap();
        assert_eq!(labels[0].label, "negative");

        let labels = HuggingFaceClient::parse_labels(nested).unwrap();
        assert_eq!(
            labels.iter().map(|l| l.label.as_str()).collect::<Vec<_>>(),
            vec!["fear", "joy"]
        );
    }

    #[test]
    fn test_parse_translation_takes_first() {
        let t = HuggingFaceClient::parse_translation(
            json!([{"translation_text": "a"}, {"translation_text": "b"}]),
        )
        .unwrap();
        assert_eq!(t.translation_text, "a");
        assert!(HuggingFaceClient::parse_translation(json!([])).is_err());
    }

    #[test]
    fn test_chat_body_extra_cannot_override_model_or_messages() {
        let mut extra = Map::new();
        extra.insert("model".to_string(), json!("other"));
        extra.insert("messages".to_string(), json!([]));
        extra.insert("max_tokens".to_string(), json!(64));

        let body = HuggingFaceClient::build_chat_body(
            &[ChatMessage::user("hello")],
            "HuggingFaceH4/zephyr-7b-beta",
            &extra,
        );
        assert_eq!(body["model"], "HuggingFaceH4/zephyr-7b-beta");
        assert_eq!(body["messages"][0]["content"], "hello");
        assert_eq!(body["max_tokens"], 64);
    }

    #[test]
    fn test_parse_first_choice() {
        let resp = json!({
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "first"}},
                {"index": 1, "message": {"role": "assistant", "content": "second"}}
            ]
        });
        let msg = HuggingFaceClient::parse_first_choice(&resp).unwrap();
        assert_eq!(msg.content, "first");
        assert!(HuggingFaceClient::parse_first_choice(&json!({"choices": []})).is_err());
    }

    #[test]
    fn test_expect_media_rejects_json_payload() {
        let err = HuggingFaceClient::expect_media(
            Some("application/json".to_string()),
            br#"{"error":"Model is loading"}"#.to_vec(),
            AUDIO_WAV,
        )
        .unwrap_err();
        assert_eq!(err.message, "Model is loading");

        let ok = HuggingFaceClient::expect_media(
            Some("audio/flac".to_string()),
            vec![1, 2, 3],
            AUDIO_WAV,
        )
        .unwrap();
        assert_eq!(ok.content_type, AUDIO_WAV);
    }

    #[tokio::test]
    async fn test_empty_inputs_fail_without_network() {
        // Unroutable base url: any network attempt would error differently
        let c = client("http://127.0.0.1:9");
        let err = c.synthesize_speech("", "facebook/mms-tts").await.unwrap_err();
        assert_eq!(err.message, "text is required");
        let err = c.synthesize_speech("hello", " ").await.unwrap_err();
        assert_eq!(err.message, "model is required");
        let err = c.chat_complete(&[], "m", &Map::new()).await.unwrap_err();
        assert_eq!(err.message, "messages are required");
    }
}
