use anyhow::{Context, Result};
use catalog::{CatalogClient, Resolver};
use narrative::{CompletionClient, NarrativeGenerator, build_story_prompt};
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

use crate::config::AppConfig;

/// Inbound POST body. Every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct AggregationRequest {
    #[serde(default, rename = "personagens")]
    pub characters: Vec<String>,
    #[serde(default, rename = "naves")]
    pub starships: Vec<String>,
    #[serde(default, rename = "planetas")]
    pub planets: Vec<String>,
    #[serde(default, rename = "ideias_extras")]
    pub extra_ideas: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Parsing,
    Aggregating,
    Generating,
    Responding,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Parsing => "parsing",
            Stage::Aggregating => "aggregating",
            Stage::Generating => "generating",
            Stage::Responding => "responding",
        };
        f.write_str(name)
    }
}

/// Terminal state of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    Success { story: String },
    Failure { message: String },
}

impl HandlerOutcome {
    pub fn status_code(&self) -> u16 {
        match self {
            HandlerOutcome::Success { .. } => 200,
            HandlerOutcome::Failure { .. } => 500,
        }
    }

    /// Response envelope; non-ASCII text is written as UTF-8, not escaped
    pub fn to_json(&self) -> String {
        match self {
            HandlerOutcome::Success { story } => json!({ "historia": story }).to_string(),
            HandlerOutcome::Failure { message } => json!({ "erro": message }).to_string(),
        }
    }
}

/// Parse → aggregate → generate, for one request body.
pub struct StoryPipeline {
    resolver: Resolver,
    generator: NarrativeGenerator,
}

impl StoryPipeline {
    pub fn new(resolver: Resolver, generator: NarrativeGenerator) -> Self {
        Self {
            resolver,
            generator,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let catalog = CatalogClient::new(&config.catalog)?;
        let resolver = Resolver::new(Arc::new(catalog), config.catalog.max_concurrency);

        let completion = CompletionClient::new(&config.completion)?;
        let generator = NarrativeGenerator::new(Arc::new(completion));

        Ok(Self::new(resolver, generator))
    }

    /// Run one invocation. Every failure ends up as [`HandlerOutcome::Failure`].
    pub async fn handle(&self, body: &[u8]) -> HandlerOutcome {
        let span = info_span!("story_request", invocation = %Uuid::new_v4());

        async {
            let started = Instant::now();
            match self.run(body).await {
                Ok(story) => {
                    info!(
                        stage = %Stage::Responding,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Story request succeeded"
                    );
                    HandlerOutcome::Success { story }
                }
                Err(e) => {
                    let message = format!("{:#}", e);
                    error!(
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        error = %message,
                        "Story request failed"
                    );
                    HandlerOutcome::Failure { message }
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(&self, body: &[u8]) -> Result<String> {
        let request = parse_request(body).with_context(|| format!("{} failed", Stage::Parsing))?;

        info!(
            stage = %Stage::Aggregating,
            characters = request.characters.len(),
            starships = request.starships.len(),
            planets = request.planets.len(),
            "Resolving catalog names"
        );

        let resolved = self.resolver
            .resolve_all(&request.characters, &request.starships, &request.planets)
            .await;

        info!(stage = %Stage::Generating, resolved = resolved.total(), "Building story prompt");

        let prompt = build_story_prompt(
            &resolved.characters,
            &resolved.starships,
            &resolved.planets,
            &request.extra_ideas,
        );

        self.generator
            .generate(&prompt)
            .await
            .with_context(|| format!("{} failed", Stage::Generating))
    }
}

/// A missing or blank body counts as `{}`.
pub fn parse_request(body: &[u8]) -> Result<AggregationRequest> {
    let body = body.trim_ascii();
    if body.is_empty() {
        return Ok(AggregationRequest::default());
    }

    serde_json::from_slice(body).context("Invalid request body")
}
