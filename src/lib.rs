//! HTTP gateway in front of a hosted inference provider
//! 托管推理服务前的HTTP网关
//!
//! Requests for speech synthesis, photo colorization, text classification,
//! translation and chat completion are validated, forwarded once to the
//! backend, and answered with raw media or JSON.
//! 语音合成、照片上色、文本分类、翻译和聊天补全请求经过校验后转发给后端一次，
//! 并以原始媒体或JSON响应。

pub mod codec;
pub mod config;
pub mod gateway;
pub mod inference;
pub mod oneshot;
