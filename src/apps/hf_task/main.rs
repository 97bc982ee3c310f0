//! One-shot inference task entry point
//! 单次推理任务入口点

use clap::Parser;
use hf_gateway::config::init_tracing;
use hf_gateway::gateway::{Dispatcher, GatewayConfig};
use hf_gateway::oneshot::{demo_requests, normalize_args, OneShotRunner, TaskArgs};
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = TaskArgs::parse_from(normalize_args(std::env::args()));

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: TaskArgs) -> anyhow::Result<()> {
    let mut config = GatewayConfig::load_with_cli(&args.config)?;
    if let Some(dir) = &args.output_dir {
        config.oneshot.output_dir = dir.clone();
    }
    init_tracing(&config.log.to_logging_config())?;
    config.validate()?;

    tracing::info!(task = %args.task, backend = ?config.backend.kind, "running one-shot task");

    let dispatcher = Dispatcher::from_config(&config)?;
    let runner = OneShotRunner::new(dispatcher, config.oneshot.output_dir.clone());
    let requests = demo_requests(args.task, args.model.as_deref(), args.text.as_deref());

    runner.run(requests, |block| println!("{}", block)).await?;
    Ok(())
}
