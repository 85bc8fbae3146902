use anyhow::{Context, Result};
use catalog::CatalogConfig;
use narrative::CompletionConfig;
use std::fmt::Display;
use std::str::FromStr;

/// Process-wide settings, read once at startup and passed down by value.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub catalog: CatalogConfig,
    pub completion: CompletionConfig,
    pub bind_addr: String,
    // Only reported at startup; the handler never talks to AWS APIs itself
    pub aws_region: Option<String>,
    pub aws_account_id: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_key = get("OPENAI_API_KEY").context("OPENAI_API_KEY is not set")?;

        let catalog_defaults = CatalogConfig::default();
        let catalog = CatalogConfig {
            base_url: get("SWAPI_BASE_URL").unwrap_or(catalog_defaults.base_url),
            lookup_timeout_secs: parse_or(
                &get,
                "CATALOG_TIMEOUT_SECS",
                catalog_defaults.lookup_timeout_secs,
            )?,
            max_concurrency: parse_or(
                &get,
                "CATALOG_MAX_CONCURRENCY",
                catalog_defaults.max_concurrency,
            )?,
        };

        let completion_defaults = CompletionConfig::new(api_key);
        let completion = CompletionConfig {
            base_url: get("OPENAI_BASE_URL").unwrap_or(completion_defaults.base_url),
            model: get("OPENAI_MODEL").unwrap_or(completion_defaults.model),
            temperature: parse_or(&get, "OPENAI_TEMPERATURE", completion_defaults.temperature)?,
            request_timeout_secs: parse_or(
                &get,
                "COMPLETION_TIMEOUT_SECS",
                completion_defaults.request_timeout_secs,
            )?,
            api_key: completion_defaults.api_key,
        };

        Ok(Self {
            catalog,
            completion,
            bind_addr: get("LOCAL_BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            aws_region: get("AWS_DEFAULT_REGION"),
            aws_account_id: get("AWS_ACCOUNT_ID"),
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: {:?} ({})", key, raw, e)),
        None => Ok(default),
    }
}
