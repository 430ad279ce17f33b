use {
    crate::{
        config::JitoConfig,
        error::DashboardError,
        jito::types::{BlockEngineResponse, MevReport},
    },
    log::{debug, info, warn},
    reqwest::Client,
    std::time::Duration,
};

/// Block engine client for per-validator MEV statistics.
#[derive(Clone)]
pub struct MevClient {
    http_client: Client,
    api_key: Option<String>,
    endpoint: String,
}

impl MevClient {
    pub fn new(config: &JitoConfig, timeout: Duration) -> Result<Self, DashboardError> {
        let http_client = Client::builder().timeout(timeout).build()?;
        info!("Block engine endpoint: {}", config.endpoint);
        Ok(Self {
            http_client,
            api_key: config.api_key.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Never fails; every outcome is a variant of the report.
    pub async fn fetch_report(&self, validator_key: Option<&str>) -> MevReport {
        let key = match validator_key {
            Some(key) => key,
            None => return MevReport::network_indicative(),
        };
        let api_key = match &self.api_key {
            Some(api_key) => api_key,
            None => {
                debug!("No block engine API key, MEV data for {} needs configuration", key);
                return MevReport::requires_configuration();
            }
        };

        match self.fetch_validator(key, api_key).await {
            Ok(body) => body.into_report(),
            Err(e) => {
                warn!("MEV data unavailable for {}: {}", key, e);
                MevReport::unavailable(e.display_message())
            }
        }
    }

    async fn fetch_validator(&self, key: &str, api_key: &str) -> Result<BlockEngineResponse, DashboardError> {
        let url = format!("{}/api/v1/validators/{}", self.endpoint, key);

        let response = self
            .http_client
            .get(&url)
            .header("accept", "application/json")
            .bearer_auth(api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DashboardError::Api(format!(
                "Block engine returned {}",
                response.status()
            )));
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::jito::types::MevStatus,
        warp::{http::StatusCode, Filter},
    };

    const KEY: &str = "Vote111111111111111111111111111111111111111";

    fn client(endpoint: String, api_key: Option<&str>) -> MevClient {
        MevClient::new(
            &JitoConfig {
                api_key: api_key.map(String::from),
                endpoint,
            },
            Duration::from_secs(2),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_without_validator_is_indicative() {
        let report = client("http://127.0.0.1:9".into(), Some("key")).fetch_report(None).await;
        assert!(matches!(report.mev, MevStatus::NetworkIndicative(_)));
        assert!(matches!(report.searchers, MevStatus::NetworkIndicative(_)));
    }

    #[tokio::test]
    async fn test_without_api_key_requires_configuration() {
        let report = client("http://127.0.0.1:9".into(), None).fetch_report(Some(KEY)).await;
        assert_eq!(report.mev, MevStatus::RequiresConfiguration);
        assert_eq!(report.searchers, MevStatus::RequiresConfiguration);
    }

    #[tokio::test]
    async fn test_non_success_status_is_unavailable() {
        let route = warp::path!("api" / "v1" / "validators" / String).map(|_key: String| {
            warp::reply::with_status("rate limited", StatusCode::TOO_MANY_REQUESTS)
        });
        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        let report = client(format!("http://{}", addr), Some("key"))
            .fetch_report(Some(KEY))
            .await;
        match report.mev {
            MevStatus::Unavailable(reason) => assert!(reason.contains("429")),
            other => panic!("expected unavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sends_bearer_and_parses_stats() {
        let route = warp::path!("api" / "v1" / "validators" / String)
            .and(warp::header::exact("authorization", "Bearer secret"))
            .map(|key: String| {
                warp::reply::json(&serde_json::json!({
                    "voteAccount": key,
                    "mevRewardsLamports": 3_000_000_000u64,
                    "totalBundles": 10,
                    "landedBundles": 6,
                    "mevApr": 0.9
                }))
            });
        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        let report = client(format!("http://{}/", addr), Some("secret"))
            .fetch_report(Some(KEY))
            .await;
        let mev = report.mev.data().unwrap();
        assert!(report.mev.is_personalized());
        assert_eq!(mev.mev_captured_sol, 3.0);
        assert_eq!(mev.bundle_success_rate, 60.0);
        assert!(matches!(report.searchers, MevStatus::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_unreachable_engine_is_unavailable() {
        let report = client("http://127.0.0.1:9".into(), Some("key"))
            .fetch_report(Some(KEY))
            .await;
        assert!(matches!(report.mev, MevStatus::Unavailable(_)));
    }
}
