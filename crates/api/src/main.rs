mod config;
mod handler;
mod lambda;
mod server;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use config::AppConfig;
use handler::StoryPipeline;

#[tokio::main]
async fn main() -> Result<()> {
    // Only present on developer machines; Lambda gets its variables from the function config
    dotenvy::dotenv().ok();

    let on_lambda = std::env::var_os("AWS_LAMBDA_RUNTIME_API").is_some();
    init_tracing(on_lambda);

    let config = AppConfig::from_env().context("Failed to load configuration")?;

    let mode = if on_lambda { "lambda" } else { "local" };
    tracing::info!(
        mode,
        catalog = %config.catalog.base_url,
        max_concurrency = config.catalog.max_concurrency,
        model = %config.completion.model,
        region = config.aws_region.as_deref().unwrap_or("-"),
        account = config.aws_account_id.as_deref().unwrap_or("-"),
        "Starting story service"
    );

    let pipeline = Arc::new(StoryPipeline::from_config(&config)?);

    if on_lambda {
        lambda::run(pipeline)
            .await
            .map_err(|e| anyhow::anyhow!(e))
    } else {
        server::serve(pipeline, &config.bind_addr).await
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        // CloudWatch stamps every line already
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .without_time()
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
