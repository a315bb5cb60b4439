use anyhow::Context;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hint_gate::{
    config::Config, metrics, telemetry, AppState, AttemptKey, EvaluateRequest, GateError,
    HintGateService,
};

/// One line of input from the chat layer.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Command {
    Evaluate(EvaluateRequest),
    Reset(AttemptKey),
    Stats(AttemptKey),
    Metrics,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (tracer_provider, tracer) = telemetry::init_telemetry().unzip();
    let otel_layer = tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));

    // Logs go to stderr; stdout carries one JSON result per input line.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hint_gate=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(otel_layer)
        .init();

    tracing::info!("Starting hint gate");

    let config = Config::load().context("Failed to load configuration")?;
    tracing::info!(
        "Configuration loaded for environment: {:?}",
        std::env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string())
    );

    let state = AppState::new(config)
        .await
        .context("Failed to initialize application state")?;
    let gate = state.hint_gate();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Command>(&line) {
            Ok(command) => handle(&gate, command).await,
            Err(e) => json!({ "error": "invalid_request", "message": e.to_string() }),
        };
        println!("{}", response);
    }

    tracing::info!("Input closed, shutting down");
    if let Some(provider) = tracer_provider {
        telemetry::shutdown_telemetry(&provider);
    }
    Ok(())
}

async fn handle(gate: &HintGateService, command: Command) -> Value {
    let result: Result<Value, GateError> = match command {
        Command::Evaluate(req) => gate
            .evaluate_now(&req)
            .await
            .map(|decision| json!(decision)),
        Command::Reset(key) => gate.reset(&key).await.map(|_| json!({ "reset": true })),
        Command::Stats(key) => gate.stats(&key).await.map(|stats| json!(stats)),
        Command::Metrics => {
            return match metrics::render_metrics() {
                Ok(text) => json!({ "metrics": text }),
                Err(e) => json!({ "error": "metrics_unavailable", "message": e.to_string() }),
            }
        }
    };

    result.unwrap_or_else(|e| {
        tracing::error!("Command failed: {}", e);
        json!({ "error": e.code(), "message": e.to_string() })
    })
}
