//! HTTP routes for the inference gateway
//! 推理网关的HTTP路由

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use super::handlers::{
    chat_completion, classify, color_photo, health_check, text_to_speech, translate, AppState,
};

/// Create HTTP routes / 创建HTTP路由
pub fn create_routes(state: AppState, cors_enabled: bool) -> Router {
    let app = Router::new()
        // Media endpoints used by the browser UI / 浏览器UI使用的媒体端点
        .route("/api/text-to-speech", post(text_to_speech))
        .route("/api/color-photo", post(color_photo))
        // Text endpoints / 文本端点
        .route("/api/chat-completion", post(chat_completion))
        .route("/api/classify", post(classify))
        .route("/api/translate", post(translate))
        // Health check endpoint / 健康检查端点
        .route("/health", get(health_check))
        .with_state(state);

    if cors_enabled {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}
