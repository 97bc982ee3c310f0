//! Inference gateway main entry point
//! 推理网关主入口点

use clap::Parser;
use hf_gateway::config::init_tracing;
use hf_gateway::gateway::{ConfigArgs, Dispatcher, GatewayConfig, HttpGateway};
use std::sync::Arc;

/// Gateway command line arguments / 网关命令行参数
#[derive(Parser, Debug, Clone)]
#[command(
    name = "hf-gateway",
    version,
    about = "HTTP gateway for hosted inference tasks\n托管推理任务的HTTP网关"
)]
struct CliArgs {
    #[command(flatten)]
    config: ConfigArgs,
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = CliArgs::parse();
    let log_args = format!("{:?}", args);

    let config = GatewayConfig::load_with_cli(&args.config)?;
    init_tracing(&config.log.to_logging_config())?;
    config.validate()?;

    // One worker, interleaving requests at backend I/O waits
    // 单个工作线程，在后端I/O等待点交错处理请求
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run(log_args, config))
}

async fn run(
    log_args: String,
    config: GatewayConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = Arc::new(config);

    tracing::info!("Starting hf-gateway with args: {}", log_args);
    tracing::info!("hf-gateway starting with:");
    tracing::info!("  - HTTP gateway on: {}", config.http.server.addr);
    tracing::info!("  - Backend: {:?} at {}", config.backend.kind, config.backend.base_url);
    match config.backend.timeout_ms {
        Some(ms) => tracing::info!("  - Backend timeout: {}ms", ms),
        None => tracing::info!("  - Backend timeout: none"),
    }
    tracing::info!(
        "  - Color photo source: {}",
        config.color_photo.source_image.display()
    );

    let dispatcher = Arc::new(Dispatcher::from_config(&config)?);
    let http_gateway = HttpGateway::new(config.clone(), dispatcher);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let mut http_handle = tokio::spawn(async move {
        if let Err(e) = http_gateway
            .start_with_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
        {
            tracing::error!("HTTP gateway error: {}", e);
        }
    });

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res?;
            tracing::info!("hf-gateway shutting down");
            let _ = shutdown_tx.send(());
            let timeout = std::time::Duration::from_secs(5);
            if tokio::time::timeout(timeout, &mut http_handle).await.is_err() {
                tracing::warn!("Shutdown timeout reached, aborting HTTP gateway");
                http_handle.abort();
            }
        }
        _ = &mut http_handle => {
            return Err("HTTP gateway stopped unexpectedly".into());
        }
    }

    Ok(())
}
