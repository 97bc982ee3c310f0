//! Dispatch errors and their HTTP mapping
//! 分发错误及其HTTP映射

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::codec::EncodingError;
use crate::inference::AdapterError;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Missing or malformed caller input; the backend is never called
    /// 调用方输入缺失或格式错误，不会调用后端
    #[error("{0}")]
    ClientInput(String),

    /// The inference backend call failed / 推理后端调用失败
    #[error(transparent)]
    Backend(#[from] AdapterError),

    /// Binary/text conversion or media file failure / 编码或媒体文件错误
    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

impl DispatchError {
    pub fn client_input(message: impl Into<String>) -> Self {
        DispatchError::ClientInput(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            DispatchError::ClientInput(_) => StatusCode::BAD_REQUEST,
            DispatchError::Backend(_) | DispatchError::Encoding(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// JSON error response body / JSON错误响应体
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut message = self.to_string();
        if message.trim().is_empty() {
            message = status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string();
        }
        (status, Json(ErrorBody { error: message })).into_response()
    }
}
