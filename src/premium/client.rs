use {
    crate::{
        error::DashboardError,
        premium::types::{ApiConfig, EnhancedValidatorData, Provider, ProviderPayload},
    },
    log::{info, warn},
    reqwest::{Client, RequestBuilder},
    std::time::Duration,
    thiserror::Error,
};

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{provider} data unavailable: {reason}")]
pub struct ProviderUnavailable {
    pub provider: Provider,
    pub reason: String,
}

/// Fetches validator details from whichever premium provider is configured.
pub struct PremiumDataClient {
    http_client: Client,
    config: ApiConfig,
    base_url: Option<String>,
}

impl PremiumDataClient {
    pub fn new(config: ApiConfig, timeout: Duration) -> Result<Self, DashboardError> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            config,
            base_url: None,
        })
    }

    /// Sends every provider request to `base_url` instead of the provider host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn update_config(&mut self, config: ApiConfig) {
        info!(
            "Premium provider set to {} (key {})",
            config.provider,
            if config.has_api_key() { "configured" } else { "missing" }
        );
        self.config = config;
    }

    pub fn has_api_key(&self) -> bool {
        self.config.has_api_key()
    }

    /// `Ok(None)` when no key is configured.
    pub async fn enhanced_validator_data(
        &self,
        validator_key: &str,
    ) -> Result<Option<EnhancedValidatorData>, ProviderUnavailable> {
        let api_key = match self.config.api_key.as_deref() {
            Some(key) if !key.is_empty() => key,
            _ => return Ok(None),
        };
        let provider = self.config.provider;

        match self.fetch(provider, api_key, validator_key).await {
            Ok(data) => Ok(Some(data)),
            Err(e) => {
                warn!("{} lookup for {} failed: {}", provider, validator_key, e);
                Err(ProviderUnavailable {
                    provider,
                    reason: e.message().to_string(),
                })
            }
        }
    }

    async fn fetch(
        &self,
        provider: Provider,
        api_key: &str,
        validator_key: &str,
    ) -> Result<EnhancedValidatorData, DashboardError> {
        let base = self
            .base_url
            .as_deref()
            .unwrap_or_else(|| provider.default_base_url());
        let url = format!("{}{}", base, provider.validator_path(validator_key));

        let request = self.http_client.get(&url).header("accept", "application/json");
        let response = authorize(request, provider, api_key).send().await?;

        if !response.status().is_success() {
            return Err(DashboardError::Api(format!(
                "{} returned {}",
                provider,
                response.status()
            )));
        }

        let body = response.bytes().await?;
        ProviderPayload::parse(provider, &body)?.into_enhanced()
    }
}

fn authorize(request: RequestBuilder, provider: Provider, api_key: &str) -> RequestBuilder {
    match provider {
        Provider::Shyft => request.header("x-api-key", api_key),
        Provider::Helius | Provider::Jito | Provider::SolanaFm => request.bearer_auth(api_key),
    }
}
