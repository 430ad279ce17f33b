use {
    crate::{config::Network, error::DashboardError, rpc::types::LAMPORTS_PER_SOL, validation::validate_commission},
    serde::{Deserialize, Serialize},
    std::{fmt, str::FromStr},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Helius,
    Jito,
    SolanaFm,
    Shyft,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Helius => "helius",
            Provider::Jito => "jito",
            Provider::SolanaFm => "solanafm",
            Provider::Shyft => "shyft",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::Helius => "https://api.helius.xyz",
            Provider::Jito => "https://mainnet.block-engine.jito.wtf",
            Provider::SolanaFm => "https://api.solana.fm",
            Provider::Shyft => "https://api.shyft.to",
        }
    }

    pub fn validator_path(&self, key: &str) -> String {
        match self {
            Provider::Helius => format!("/v0/validators/{}", key),
            Provider::Jito => format!("/api/v1/validators/{}", key),
            Provider::SolanaFm => format!("/v1/validators/{}", key),
            Provider::Shyft => format!("/sol/v1/validator/{}", key),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "helius" => Ok(Provider::Helius),
            "jito" => Ok(Provider::Jito),
            "solanafm" => Ok(Provider::SolanaFm),
            "shyft" => Ok(Provider::Shyft),
            other => Err(DashboardError::Validation(format!("Unknown provider: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub provider: Provider,
    pub api_key: Option<String>,
    pub network: Network,
}

impl ApiConfig {
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().map_or(false, |key| !key.is_empty())
    }

    /// Keyed Helius gets its own RPC; everything else uses the public cluster endpoint.
    pub fn network_endpoint(&self) -> String {
        match (&self.provider, self.api_key.as_deref()) {
            (Provider::Helius, Some(key)) if !key.is_empty() => {
                format!("https://rpc.helius.xyz/?api-key={}", key)
            }
            _ => self.network.public_endpoint().to_string(),
        }
    }
}

/// Validator details from a premium provider, normalized across providers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnhancedValidatorData {
    pub provider: Option<Provider>,
    pub name: Option<String>,
    pub website: Option<String>,
    pub commission: Option<u8>,
    pub activated_stake_sol: Option<f64>,
    pub apy: Option<f64>,
    pub skip_rate: Option<f64>,
    pub version: Option<String>,
    pub data_center: Option<String>,
    pub mev_commission: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeliusValidator {
    pub name: Option<String>,
    pub website: Option<String>,
    pub commission: Option<f64>,
    pub activated_stake: Option<u64>,
    pub apy: Option<f64>,
    pub skip_rate: Option<f64>,
    pub version: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct JitoValidator {
    pub vote_account: String,
    #[serde(default)]
    pub running_jito: bool,
    pub mev_commission_bps: Option<u16>,
    pub active_stake: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct SolanaFmResponse {
    pub data: SolanaFmValidator,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolanaFmValidator {
    pub moniker: Option<String>,
    pub website: Option<String>,
    pub commission: Option<f64>,
    pub stake: Option<u64>,
    pub software_version: Option<String>,
    pub data_center: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ShyftResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub result: Option<ShyftValidator>,
}

#[derive(Debug, Deserialize)]
pub struct ShyftValidator {
    pub name: Option<String>,
    pub website: Option<String>,
    pub commission: Option<f64>,
    pub activated_stake: Option<f64>,
    pub apy: Option<f64>,
    pub version: Option<String>,
}

/// Response body, tagged by the provider it came from.
#[derive(Debug)]
pub enum ProviderPayload {
    Helius(HeliusValidator),
    Jito(JitoValidator),
    SolanaFm(SolanaFmResponse),
    Shyft(ShyftResponse),
}

fn lamports_to_sol(lamports: Option<u64>) -> Option<f64> {
    lamports.map(|l| l as f64 / LAMPORTS_PER_SOL)
}

fn check_commission(commission: Option<f64>) -> Result<Option<u8>, DashboardError> {
    commission
        .map(validate_commission)
        .transpose()
        .map_err(|e| DashboardError::Api(e.message().to_string()))
}

fn check_percent(label: &str, value: Option<f64>) -> Result<Option<f64>, DashboardError> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => {
            Err(DashboardError::Api(format!("Invalid {}: {}", label, v)))
        }
        other => Ok(other),
    }
}

impl ProviderPayload {
    pub fn parse(provider: Provider, body: &[u8]) -> Result<Self, DashboardError> {
        let decoded = match provider {
            Provider::Helius => serde_json::from_slice(body).map(ProviderPayload::Helius),
            Provider::Jito => serde_json::from_slice(body).map(ProviderPayload::Jito),
            Provider::SolanaFm => serde_json::from_slice(body).map(ProviderPayload::SolanaFm),
            Provider::Shyft => serde_json::from_slice(body).map(ProviderPayload::Shyft),
        };
        decoded.map_err(|e| DashboardError::Api(format!("Unexpected {} response: {}", provider, e)))
    }

    pub fn into_enhanced(self) -> Result<EnhancedValidatorData, DashboardError> {
        let data = match self {
            ProviderPayload::Helius(v) => EnhancedValidatorData {
                provider: Some(Provider::Helius),
                name: v.name,
                website: v.website,
                commission: check_commission(v.commission)?,
                activated_stake_sol: lamports_to_sol(v.activated_stake),
                apy: check_percent("apy", v.apy)?,
                skip_rate: check_percent("skip rate", v.skip_rate)?,
                version: v.version,
                ..Default::default()
            },
            ProviderPayload::Jito(v) => {
                let mev_commission = v.mev_commission_bps.map(|bps| bps as f64 / 100.0);
                if mev_commission.map_or(false, |c| c > 100.0) {
                    return Err(DashboardError::Api(format!(
                        "MEV commission out of range for {}",
                        v.vote_account
                    )));
                }
                EnhancedValidatorData {
                    provider: Some(Provider::Jito),
                    activated_stake_sol: lamports_to_sol(v.active_stake),
                    mev_commission: if v.running_jito { mev_commission } else { None },
                    ..Default::default()
                }
            }
            ProviderPayload::SolanaFm(SolanaFmResponse { data: v }) => EnhancedValidatorData {
                provider: Some(Provider::SolanaFm),
                name: v.moniker,
                website: v.website,
                commission: check_commission(v.commission)?,
                activated_stake_sol: lamports_to_sol(v.stake),
                version: v.software_version,
                data_center: v.data_center,
                ..Default::default()
            },
            ProviderPayload::Shyft(response) => {
                let v = match (response.success, response.result) {
                    (true, Some(v)) => v,
                    _ => {
                        return Err(DashboardError::Api(format!(
                            "Shyft request failed: {}",
                            response.message
                        )))
                    }
                };
                EnhancedValidatorData {
                    provider: Some(Provider::Shyft),
                    name: v.name,
                    website: v.website,
                    commission: check_commission(v.commission)?,
                    activated_stake_sol: check_percent("stake", v.activated_stake)?,
                    apy: check_percent("apy", v.apy)?,
                    version: v.version,
                    ..Default::default()
                }
            }
        };
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::error::ErrorKind};
    use super::*;

    fn config(provider: Provider, key: Option<&str>) -> ApiConfig {
        ApiConfig {
            provider,
            api_key: key.map(String::from),
            network: Network::MainnetBeta,
        }
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!("SolanaFM".parse::<Provider>().unwrap(), Provider::SolanaFm);
        assert_eq!("shyft".parse::<Provider>().unwrap(), Provider::Shyft);
        assert!("quicknode".parse::<Provider>().is_err());
        assert_eq!(serde_json::to_string(&Provider::SolanaFm).unwrap(), "\"solanafm\"");
    }

    #[test]
    fn test_network_endpoint_routing() {
        assert_eq!(
            config(Provider::Helius, Some("k1")).network_endpoint(),
            "https://rpc.helius.xyz/?api-key=k1"
        );
        assert_eq!(
            config(Provider::Helius, None).network_endpoint(),
            "https://api.mainnet-beta.solana.com"
        );
        assert_eq!(
            config(Provider::Shyft, Some("k1")).network_endpoint(),
            "https://api.mainnet-beta.solana.com"
        );
        assert!(!config(Provider::Helius, Some("")).has_api_key());
    }

    #[test]
    fn test_helius_payload() {
        let body = br#"{"name":"Example","commission":7,"activatedStake":5000000000,"apy":6.9}"#;
        let data = ProviderPayload::parse(Provider::Helius, body)
            .unwrap()
            .into_enhanced()
            .unwrap();
        assert_eq!(data.name.as_deref(), Some("Example"));
        assert_eq!(data.commission, Some(7));
        assert_eq!(data.activated_stake_sol, Some(5.0));
        assert_eq!(data.provider, Some(Provider::Helius));
    }

    #[test]
    fn test_rejects_out_of_range_commission() {
        let body = br#"{"data":{"moniker":"x","commission":140}}"#;
        let payload = ProviderPayload::parse(Provider::SolanaFm, body).unwrap();
        let err = payload.into_enhanced().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Api);
        assert!(err.message().contains("between 0% and 100%"));

        // fractional rates are accepted and rounded
        let body = br#"{"data":{"moniker":"x","commission":4.6}}"#;
        let data = ProviderPayload::parse(Provider::SolanaFm, body)
            .unwrap()
            .into_enhanced()
            .unwrap();
        assert_eq!(data.commission, Some(5));
    }

    #[test]
    fn test_shyft_failure_envelope() {
        let body = br#"{"success":false,"message":"Invalid api key","result":null}"#;
        let err = ProviderPayload::parse(Provider::Shyft, body)
            .unwrap()
            .into_enhanced()
            .unwrap_err();
        assert!(err.message().contains("Invalid api key"));
    }

    #[test]
    fn test_jito_mev_commission_only_when_running() {
        let body = br#"{"vote_account":"v","running_jito":true,"mev_commission_bps":800}"#;
        let data = ProviderPayload::parse(Provider::Jito, body)
            .unwrap()
            .into_enhanced()
            .unwrap();
        assert_eq!(data.mev_commission, Some(8.0));

        let body = br#"{"vote_account":"v","mev_commission_bps":800}"#;
        let data = ProviderPayload::parse(Provider::Jito, body)
            .unwrap()
            .into_enhanced()
            .unwrap();
        assert_eq!(data.mev_commission, None);
    }

    #[test]
    fn test_garbage_body_is_api_error() {
        let err = ProviderPayload::parse(Provider::Helius, b"<html>").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Api);
    }
}
