use anyhow::Context;
use clap::Parser;
use std::{process::ExitCode, sync::Arc};

use pm25_predictor::{
    cli::{self, Cli, Command},
    config::AppConfig,
    http,
    service::PredictionService,
};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = AppConfig::from_env()?;
    let svc = PredictionService::from_config(&cfg).context("startup failed")?;

    let command = cli.command.unwrap_or(Command::Serve);
    match cli::run_once(command, &svc) {
        Some(outcome) if outcome.success => {
            print!("{}", outcome.text);
            Ok(ExitCode::SUCCESS)
        }
        Some(outcome) => {
            eprint!("{}", outcome.text);
            Ok(ExitCode::FAILURE)
        }
        None => {
            serve(svc, cfg.port).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn serve(svc: PredictionService, port: u16) -> anyhow::Result<()> {
    let app = http::router(Arc::new(svc));
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await?;
    Ok(())
}
