//! Stepwise planning service.

#![allow(clippy::print_stderr)] // start-up failures are reported before logging exists

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use stepwise::oracle::LlmOracle;
use stepwise::providers::{FromEnv, OpenAIClient};
use stepwise_server::{AppState, Args, logging, router};
use tokio::net::TcpListener;

fn main() -> ExitCode {
    // A missing .env file is not an error.
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let _guard = match logging::init_logging(args.verbose, &args.log_dir) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("stepwise-server: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("failed to create tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(run(args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let client = OpenAIClient::from_env().context("configuring model client")?;
    let mut oracle = LlmOracle::new(client.completion_model(args.model.clone()));
    if let Some(temperature) = args.temperature {
        oracle = oracle.with_temperature(temperature);
    }
    if let Some(max_tokens) = args.max_tokens {
        oracle = oracle.with_max_tokens(max_tokens);
    }

    let config = args.planner_config();
    let state = AppState::new(oracle, config);

    let listener = TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("binding {}", args.listen))?;
    tracing::info!(
        listen = %args.listen,
        model = %args.model,
        chain = %config.default_chain,
        oracle_timeout_secs = args.oracle_timeout_secs,
        "stepwise-server listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server terminated with error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {e}");
    }
    tracing::info!("shutting down");
}
