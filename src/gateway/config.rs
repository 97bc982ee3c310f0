//! Gateway configuration / 网关配置
//!
//! Precedence (highest to lowest) / 优先级（从高到低）：
//! 1. Command line arguments / 命令行参数
//! 2. `PORT` environment variable (port only) / `PORT`环境变量（仅端口）
//! 3. `HFGW_` environment variables, nested with `__` (e.g. `HFGW_HTTP__SERVER__ADDR`)
//!    / `HFGW_`前缀环境变量
//! 4. Configuration file (TOML) / 配置文件（TOML）
//! 5. Default values / 默认值
//!
//! The backend token is only ever read from `HF_TOKEN` and never serialized.
//! 后端令牌只从`HF_TOKEN`读取，且不会被序列化。

use anyhow::{bail, Context, Result};
use clap::Args;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::base::{LogConfig, ServerConfig};
use crate::inference::huggingface::DEFAULT_BASE_URL;
use crate::inference::ImageToImageParams;

pub const DEFAULT_CONFIG_FILE: &str = "hf-gateway.toml";
pub const ENV_PREFIX: &str = "HFGW_";
pub const TOKEN_ENV: &str = "HF_TOKEN";

/// Configuration flags shared by both binaries / 两个二进制共享的配置参数
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Configuration file path / 配置文件路径
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Configuration file path / 配置文件路径"
    )]
    pub config: Option<String>,

    /// HTTP listen address / HTTP监听地址
    #[arg(
        long,
        value_name = "ADDR",
        help = "HTTP listen address (e.g., 0.0.0.0:3000) / HTTP监听地址"
    )]
    pub http_addr: Option<String>,

    /// Inference backend kind / 推理后端类型
    #[arg(
        long,
        value_name = "KIND",
        help = "Inference backend (huggingface, stub) / 推理后端"
    )]
    pub backend: Option<BackendKind>,

    /// Inference backend base URL / 推理后端基础URL
    #[arg(long, value_name = "URL")]
    pub backend_url: Option<String>,

    /// Per-call backend timeout / 单次后端调用超时（毫秒）
    #[arg(
        long,
        value_name = "MS",
        help = "Backend call timeout in milliseconds, unset means none / 后端调用超时（毫秒）"
    )]
    pub backend_timeout_ms: Option<u64>,

    /// Log level / 日志级别
    #[arg(
        long,
        value_name = "LEVEL",
        help = "Log level (trace, debug, info, warn, error) / 日志级别"
    )]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Huggingface,
    Stub,
}

/// Gateway configuration / 网关配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP server configuration / HTTP服务器配置
    pub http: HttpConfig,
    /// Inference backend configuration / 推理后端配置
    pub backend: BackendConfig,
    /// Image colorization constants / 图像上色常量
    pub color_photo: ColorPhotoConfig,
    /// One-shot mode settings / 单次执行模式设置
    pub oneshot: OneShotConfig,
    /// Logging configuration / 日志配置
    pub log: LogConfig,
}

/// HTTP gateway configuration / HTTP网关配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// HTTP server settings / HTTP服务器设置
    pub server: ServerConfig,
    /// Enable CORS / 启用CORS
    pub cors_enabled: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            cors_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub base_url: String,
    /// Unset means backend calls may hang indefinitely
    pub timeout_ms: Option<u64>,
    #[serde(skip)]
    pub token: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Huggingface,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: None,
            token: None,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// The source image and transformation are owned by the gateway, not callers.
/// 源图像和转换参数由网关持有，而非调用方提供。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorPhotoConfig {
    pub source_image: PathBuf,
    pub prompt: String,
    pub negative_prompt: String,
    pub strength: f64,
    /// Content type written on the color-photo response / 响应内容类型
    pub content_type: String,
}

impl Default for ColorPhotoConfig {
    fn default() -> Self {
        Self {
            source_image: PathBuf::from("assets/old-photo.jpg"),
            prompt: "a naturally colored, sharp photograph".to_string(),
            negative_prompt: "black and white, grayscale, sepia, blurry".to_string(),
            strength: 0.5,
            content_type: "image/jpg".to_string(),
        }
    }
}

impl ColorPhotoConfig {
    pub fn params(&self) -> ImageToImageParams {
        ImageToImageParams {
            prompt: self.prompt.clone(),
            negative_prompt: self.negative_prompt.clone(),
            strength: self.strength,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OneShotConfig {
    /// Directory receiving the colored photo; must exist / 输出目录，必须已存在
    pub output_dir: PathBuf,
}

impl Default for OneShotConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
        }
    }
}

impl GatewayConfig {
    /// Load configuration with CLI arguments / 使用CLI参数加载配置
    pub fn load_with_cli(args: &ConfigArgs) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(GatewayConfig::default()));

        figment = match &args.config {
            Some(path) => {
                if !Path::new(path).exists() {
                    bail!("configuration file not found: {}", path);
                }
                figment.merge(Toml::file(path))
            }
            None => figment.merge(Toml::file(DEFAULT_CONFIG_FILE)),
        };

        let mut config: GatewayConfig = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to load configuration")?;

        if let Ok(port) = std::env::var("PORT") {
            if !port.trim().is_empty() {
                let port: u16 = port
                    .trim()
                    .parse()
                    .with_context(|| format!("invalid PORT: {}", port))?;
                config.http.server.addr.set_port(port);
            }
        }

        config.apply_cli(args)?;

        config.backend.token = std::env::var(TOKEN_ENV)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        Ok(config)
    }

    fn apply_cli(&mut self, args: &ConfigArgs) -> Result<()> {
        if let Some(addr) = &args.http_addr {
            self.http.server.addr = addr
                .parse()
                .with_context(|| format!("invalid --http-addr: {}", addr))?;
        }
        if let Some(kind) = args.backend {
            self.backend.kind = kind;
        }
        if let Some(url) = &args.backend_url {
            self.backend.base_url = url.clone();
        }
        if let Some(ms) = args.backend_timeout_ms {
            self.backend.timeout_ms = Some(ms);
        }
        if let Some(level) = &args.log_level {
            self.log.level = level.clone();
        }
        Ok(())
    }

    /// Startup validation / 启动时校验
    pub fn validate(&self) -> Result<()> {
        if self.backend.kind == BackendKind::Huggingface {
            if self.backend.token.is_none() {
                bail!(
                    "{} is not set; the inference provider requires an access token",
                    TOKEN_ENV
                );
            }
            if self.backend.base_url.trim().is_empty() {
                bail!("backend.base_url must not be empty");
            }
        }
        if self.backend.timeout_ms == Some(0) {
            bail!("backend.timeout_ms must be greater than zero when set");
        }
        if !(0.0..=1.0).contains(&self.color_photo.strength) {
            tracing::warn!(
                strength = self.color_photo.strength,
                "color_photo.strength is outside [0, 1]; the backend may reject it"
            );
        }
        Ok(())
    }
}
