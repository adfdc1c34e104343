//! Provider adapters and registry assembly

pub mod openai_compat;
pub mod spark;

use crate::config::FileConfig;
use openai_compat::{OpenAiCompatClient, OpenAiCompatConfig};
use polyask_application::ChatProvider;
use polyask_domain::Provider;
use spark::{SparkClient, SparkConfig};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Errors assembling the provider registry
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Build the provider registry from configuration.
///
/// Providers with incomplete credentials are skipped with a warning, so a
/// partially configured gateway still serves the backends it can reach.
/// Registry order is the stable result order.
pub fn build_providers(
    config: &FileConfig,
) -> Result<Vec<Arc<dyn ChatProvider>>, RegistryError> {
    let mut providers: Vec<Arc<dyn ChatProvider>> = Vec::new();

    let spark = &config.providers.spark;
    if spark.is_configured() {
        providers.push(Arc::new(SparkClient::new(SparkConfig {
            app_id: spark.app_id.clone(),
            api_key: spark.api_key.clone(),
            api_secret: spark.api_secret.clone(),
            ws_url: spark.ws_url.clone(),
            domain: spark.domain.clone(),
            temperature: spark.temperature,
            max_tokens: spark.max_tokens,
        })));
    } else {
        warn!("Spark credentials missing, provider disabled");
    }

    // One shared HTTP client for both bearer-token backends. Its own
    // timeout backstops the orchestrator's per-call deadline.
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.dispatch.provider_timeout_secs))
        .build()
        .map_err(|e| RegistryError::HttpClient(e.to_string()))?;

    for (provider, bearer) in [
        (Provider::Qianfan, &config.providers.qianfan),
        (Provider::Doubao, &config.providers.doubao),
    ] {
        if bearer.is_configured() {
            providers.push(Arc::new(OpenAiCompatClient::new(
                provider,
                OpenAiCompatConfig {
                    api_key: bearer.api_key.clone(),
                    api_url: bearer.api_url.clone(),
                    model: bearer.model.clone(),
                },
                http.clone(),
            )));
        } else {
            warn!(%provider, "Credentials missing, provider disabled");
        }
    }

    info!(count = providers.len(), "Provider registry assembled");
    Ok(providers)
}
