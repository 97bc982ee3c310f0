//! HTTP gateway server / HTTP网关服务器

use anyhow::Result;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

use super::config::GatewayConfig;
use super::dispatcher::Dispatcher;
use super::handlers::AppState;
use super::routes::create_routes;

/// Inference HTTP gateway / 推理HTTP网关
pub struct HttpGateway {
    config: Arc<GatewayConfig>,
    dispatcher: Arc<Dispatcher>,
}

impl HttpGateway {
    /// Create a new HTTP gateway / 创建新的HTTP网关
    pub fn new(config: Arc<GatewayConfig>, dispatcher: Arc<Dispatcher>) -> Self {
        Self { config, dispatcher }
    }

    /// Get the HTTP address / 获取HTTP地址
    pub fn addr(&self) -> SocketAddr {
        self.config.http.server.addr
    }

    /// Build the router without binding a socket / 构建路由但不绑定端口
    pub fn router(&self) -> Router {
        let state = AppState {
            dispatcher: self.dispatcher.clone(),
        };
        create_routes(state, self.config.http.cors_enabled)
    }

    /// Start the HTTP gateway / 启动HTTP网关
    pub async fn start(self) -> Result<()> {
        let (listener, app) = self.prepare().await?;
        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP gateway error: {}", e);
            return Err(e.into());
        }
        Ok(())
    }

    /// Start HTTP gateway with shutdown signal / 使用关闭信号启动HTTP网关
    pub async fn start_with_shutdown<F>(self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let (listener, app) = self.prepare().await?;
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
        {
            error!("HTTP gateway error: {}", e);
            return Err(e.into());
        }
        Ok(())
    }

    async fn prepare(self) -> Result<(tokio::net::TcpListener, Router)> {
        let addr = self.addr();
        info!("Starting HTTP gateway on {}", addr);
        info!("Inference backend: {}", self.dispatcher.backend_name());

        let app = self.router();
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!(
            "HTTP gateway listening on {}",
            listener.local_addr().unwrap_or(addr)
        );
        info!("CORS enabled: {}", self.config.http.cors_enabled);
        Ok((listener, app))
    }
}
