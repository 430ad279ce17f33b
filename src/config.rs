use {
    crate::{
        error::DashboardError,
        jito::types::DEFAULT_BLOCK_ENGINE_URL,
        premium::types::{ApiConfig, Provider},
        services::{PerformancePolicy, RewardsPolicy},
        storage::Preferences,
        validation::{validate_alert_threshold, validate_public_key, validate_url},
    },
    clap::Parser,
    log::{debug, warn},
    serde::{Deserialize, Serialize},
    std::{collections::HashMap, env, fmt, path::PathBuf, str::FromStr, time::Duration},
};

pub const DEFAULT_ALERT_THRESHOLD: f64 = 95.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Network {
    #[default]
    Devnet,
    Testnet,
    MainnetBeta,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Devnet => "devnet",
            Network::Testnet => "testnet",
            Network::MainnetBeta => "mainnet-beta",
        }
    }

    pub fn public_endpoint(&self) -> &'static str {
        match self {
            Network::Devnet => "https://api.devnet.solana.com",
            Network::Testnet => "https://api.testnet.solana.com",
            Network::MainnetBeta => "https://api.mainnet-beta.solana.com",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "devnet" => Ok(Network::Devnet),
            "testnet" => Ok(Network::Testnet),
            "mainnet" | "mainnet-beta" => Ok(Network::MainnetBeta),
            other => Err(DashboardError::Validation(format!("Unknown network: {}", other))),
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "validator-dashboard", version, about = "Polls a Solana cluster and reports validator health")]
pub struct Cli {
    /// Cluster to monitor (devnet, testnet, mainnet-beta)
    #[arg(long, env = "SOLANA_NETWORK")]
    pub network: Option<Network>,

    /// Explicit RPC URL, takes precedence over network and provider routing
    #[arg(long, env = "SOLANA_RPC_URL")]
    pub rpc_url: Option<String>,

    /// Validator identity or vote account to track
    #[arg(long = "validator", env = "VALIDATOR_PUBKEY")]
    pub validator: Option<String>,

    #[arg(long, env = "POLL_SECS", default_value_t = 30)]
    pub poll_secs: u64,

    #[arg(long, env = "MEV_POLL_SECS", default_value_t = 45)]
    pub mev_poll_secs: u64,

    #[arg(long, default_value_t = 10)]
    pub request_timeout_secs: u64,

    /// Number of recent performance samples requested per cycle
    #[arg(long, default_value_t = 5)]
    pub performance_samples: usize,

    /// Serve Prometheus metrics on this port
    #[arg(long, env = "METRICS_PORT")]
    pub metrics_port: Option<u16>,

    #[arg(long, env = "DASHBOARD_STATE_FILE", default_value = "validator-dashboard.json")]
    pub state_file: PathBuf,

    /// Uptime percentage below which an alert is raised
    #[arg(long, env = "ALERT_THRESHOLD")]
    pub alert_threshold: Option<f64>,

    #[arg(long, env = "JITO_API_KEY")]
    pub jito_api_key: Option<String>,

    #[arg(long, env = "JITO_API_ENDPOINT", default_value = DEFAULT_BLOCK_ENGINE_URL)]
    pub jito_api_endpoint: String,

    #[arg(long, env = "PREMIUM_PROVIDER", default_value = "helius")]
    pub premium_provider: Provider,

    #[arg(long, env = "PREMIUM_API_KEY")]
    pub premium_api_key: Option<String>,

    /// Send premium provider requests to this host instead of the provider's own
    #[arg(long, env = "PREMIUM_BASE_URL")]
    pub premium_base_url: Option<String>,

    /// Run a single aggregation cycle, print it and exit
    #[arg(long)]
    pub once: bool,
}

#[derive(Debug, Clone)]
pub struct JitoConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
}

/// Runtime configuration, resolved once at startup and passed to constructors.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub network: Network,
    pub rpc_url_override: Option<String>,
    pub validator_key: Option<String>,
    pub poll_interval: Duration,
    pub mev_poll_interval: Duration,
    pub request_timeout: Duration,
    pub performance_sample_limit: usize,
    pub metrics_port: Option<u16>,
    pub state_file: PathBuf,
    pub alert_threshold: f64,
    pub jito: JitoConfig,
    pub premium: ApiConfig,
    pub premium_base_url: Option<String>,
    pub performance_policy: PerformancePolicy,
    pub rewards_policy: RewardsPolicy,
    pub once: bool,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl DashboardConfig {
    /// Command line and environment win over persisted preferences, which win over defaults.
    pub fn from_cli(cli: Cli, prefs: &Preferences) -> Result<Self, DashboardError> {
        let network = cli
            .network
            .or(prefs.selected_network)
            .unwrap_or_default();

        let rpc_url_override = non_empty(cli.rpc_url)
            .map(|url| validate_url(&url).map(|_| url))
            .transpose()?;

        validate_url(&cli.jito_api_endpoint)?;
        let premium_base_url = non_empty(cli.premium_base_url)
            .map(|url| validate_url(&url).map(|_| url))
            .transpose()?;

        let alert_threshold = validate_alert_threshold(
            cli.alert_threshold
                .or(prefs.alert_threshold)
                .unwrap_or(DEFAULT_ALERT_THRESHOLD),
        )?;

        if cli.poll_secs == 0 || cli.mev_poll_secs == 0 {
            return Err(DashboardError::Validation(
                "Poll intervals must be at least one second".into(),
            ));
        }

        Ok(Self {
            network,
            rpc_url_override,
            validator_key: non_empty(cli.validator),
            poll_interval: Duration::from_secs(cli.poll_secs),
            mev_poll_interval: Duration::from_secs(cli.mev_poll_secs),
            request_timeout: Duration::from_secs(cli.request_timeout_secs.max(1)),
            performance_sample_limit: cli.performance_samples.max(1),
            metrics_port: cli.metrics_port,
            state_file: cli.state_file,
            alert_threshold,
            jito: JitoConfig {
                api_key: non_empty(cli.jito_api_key),
                endpoint: cli.jito_api_endpoint.trim_end_matches('/').to_string(),
            },
            premium: ApiConfig {
                provider: cli.premium_provider,
                api_key: non_empty(cli.premium_api_key),
                network,
            },
            premium_base_url,
            performance_policy: PerformancePolicy::default(),
            rewards_policy: RewardsPolicy::default(),
            once: cli.once,
        })
    }

    pub fn live_settings(&self) -> LiveSettings {
        LiveSettings {
            validator_key: self.validator_key.clone(),
            alert_threshold: self.alert_threshold,
            premium: self.premium.clone(),
        }
    }

    /// Explicit override, then a keyed premium provider, then the public endpoint.
    pub fn resolve_rpc_url(&self) -> String {
        if let Some(url) = &self.rpc_url_override {
            return url.clone();
        }
        self.premium.network_endpoint()
    }
}

/// Settings that may change while running. Published on a `watch` channel;
/// each task follows the fields it uses.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveSettings {
    pub validator_key: Option<String>,
    pub alert_threshold: f64,
    pub premium: ApiConfig,
}

impl LiveSettings {
    /// Applies reloadable variables on top of `self`. An absent variable
    /// keeps its current value, an empty one clears it.
    pub fn reload<F>(&self, lookup: F) -> Result<Self, DashboardError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut next = self.clone();

        if let Some(key) = lookup("VALIDATOR_PUBKEY") {
            next.validator_key = match non_empty(Some(key)) {
                Some(key) => Some(validate_public_key(&key)?.to_string()),
                None => None,
            };
        }

        if let Some(threshold) = non_empty(lookup("ALERT_THRESHOLD")) {
            let value = threshold.parse::<f64>().map_err(|_| {
                DashboardError::Validation(format!("Invalid alert threshold: {}", threshold))
            })?;
            next.alert_threshold = validate_alert_threshold(value)?;
        }

        if let Some(provider) = non_empty(lookup("PREMIUM_PROVIDER")) {
            next.premium.provider = provider.parse()?;
        }
        if let Some(api_key) = lookup("PREMIUM_API_KEY") {
            next.premium.api_key = non_empty(Some(api_key));
        }

        Ok(next)
    }
}

#[cfg(test)]
impl LiveSettings {
    pub fn tracking(validator_key: Option<String>) -> Self {
        Self {
            validator_key,
            alert_threshold: DEFAULT_ALERT_THRESHOLD,
            premium: ApiConfig {
                provider: Provider::Helius,
                api_key: None,
                network: Network::Devnet,
            },
        }
    }
}

/// Snapshot of `.env` for a reload, falling back to the process environment.
/// `.env` wins because the process environment still holds startup values.
pub fn reload_lookup() -> impl Fn(&str) -> Option<String> {
    let file: HashMap<String, String> = match dotenv::dotenv_iter() {
        Ok(iter) => iter
            .filter_map(|item| match item {
                Ok(pair) => Some(pair),
                Err(e) => {
                    warn!("Skipping unreadable .env entry: {}", e);
                    None
                }
            })
            .collect(),
        Err(e) => {
            debug!("No .env to reload: {}", e);
            HashMap::new()
        }
    };

    move |name: &str| file.get(name).cloned().or_else(|| env::var(name).ok())
}
