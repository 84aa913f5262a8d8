// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::{bail, Context};
use serde_json::{json, Value};
use std::env;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

use predictor_dag::backends::local::LocalInferenceClient;
use predictor_dag::config::{load_and_validate_config, RuntimeBuilder};
use predictor_dag::engine::{FeedbackRecord, PredictionRequest};
use predictor_dag::observability::metrics::RecordingMetricsSink;

/// Command line options for a single prediction run
#[derive(Debug)]
struct CliArgs {
    config_file: String,
    payload: Value,
    seed: Option<u64>,
    deadline: Option<Duration>,
    reward: Option<f64>,
}

fn usage(program: &str) -> String {
    format!(
        "Usage: {} <config.(yaml|toml)> <payload-json> [--seed N] [--deadline-ms N] [--reward R]\n\
         Example: {} configs/ensemble.yaml '{{\"age\": 42}}' --seed 7 --reward 1.0",
        program, program
    )
}

fn parse_args(args: &[String]) -> anyhow::Result<CliArgs> {
    let program = args.first().map(String::as_str).unwrap_or("predictor-dag");
    let (Some(config_file), Some(payload)) = (args.get(1), args.get(2)) else {
        bail!(usage(program));
    };

    let mut cli = CliArgs {
        config_file: config_file.clone(),
        payload: serde_json::from_str(payload)
            .with_context(|| format!("payload is not valid JSON: {}", payload))?,
        seed: None,
        deadline: None,
        reward: None,
    };

    let mut rest = args[3..].iter();
    while let Some(flag) = rest.next() {
        let value = rest
            .next()
            .with_context(|| format!("{} needs a value\n{}", flag, usage(program)))?;
        match flag.as_str() {
            "--seed" => cli.seed = Some(value.parse().context("--seed must be an integer")?),
            "--deadline-ms" => {
                cli.deadline = Some(Duration::from_millis(
                    value.parse().context("--deadline-ms must be an integer")?,
                ))
            }
            "--reward" => cli.reward = Some(value.parse().context("--reward must be a number")?),
            other => bail!("unknown option '{}'\n{}", other, usage(program)),
        }
    }
    Ok(cli)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    if let Err(e) = run(&args).await {
        eprintln!("❌ {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: &[String]) -> anyhow::Result<()> {
    let cli = parse_args(args)?;
    let start_time = Instant::now();

    let config = load_and_validate_config(&cli.config_file)
        .with_context(|| format!("failed to load {}", cli.config_file))?;
    let metrics = Arc::new(RecordingMetricsSink::new());
    let engine = RuntimeBuilder::from_config(
        &config,
        Arc::new(LocalInferenceClient::new()),
        metrics.clone(),
    )?;

    let mut request = PredictionRequest::new(cli.payload);
    if let Some(seed) = cli.seed {
        request = request.with_seed(seed);
    }
    if let Some(deadline) = cli.deadline {
        request = request.with_deadline(deadline);
    }

    let response = engine
        .predict(request)
        .await
        .with_context(|| format!("prediction against '{}' failed", config.name))?;

    let mut output = json!({
        "predictor": config.name,
        "result": &response.result,
        "context": &response.context,
        "elapsed_ms": start_time.elapsed().as_secs_f64() * 1000.0,
    });

    if let Some(reward) = cli.reward {
        let summary = engine
            .send_feedback(&response.context, &FeedbackRecord::new(reward))
            .await;
        output["feedback"] = serde_json::to_value(&summary)?;
        output["metrics"] = metrics
            .events()
            .iter()
            .map(|event| {
                json!({
                    "name": event.name,
                    "tags": event.tags.iter().cloned().collect::<std::collections::BTreeMap<_, _>>(),
                    "amount": event.amount,
                })
            })
            .collect();
    }

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
