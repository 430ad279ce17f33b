use {
    crate::{
        aggregator::state::{DashboardSnapshot, ValidatorInfo, ValidatorLookup},
        error::DashboardError,
        rpc::{
            client::ClusterRpc,
            types::{
                BlockProduction, ClusterNode, EpochSnapshot, NodeVersion, PerformanceSample,
                StakeActivation, ValidatorRecord, VoteAccounts,
            },
        },
        services::{
            compute_network_stats, derive_performance, derive_rewards, derive_stake,
            PerformancePolicy, RewardsPolicy,
        },
        validation::validate_public_key,
    },
    chrono::Utc,
    log::{debug, warn},
    std::sync::Arc,
};

/// Results of the four calls every cycle depends on.
pub struct BaseData {
    pub epoch_info: EpochSnapshot,
    pub current_slot: u64,
    pub version: NodeVersion,
    pub vote_accounts: VoteAccounts,
}

/// Optional network calls; each one may fail on its own.
#[derive(Default)]
pub struct SupplementaryData {
    pub block_production: Option<BlockProduction>,
    pub performance_samples: Option<Vec<PerformanceSample>>,
    pub cluster_nodes: Option<Vec<ClusterNode>>,
}

#[derive(Debug)]
pub enum ValidatorFetchError {
    Invalid(String),
    NotFound,
    Unavailable(DashboardError),
}

pub struct ValidatorFetch {
    pub record: ValidatorRecord,
    pub stake_activation: Option<StakeActivation>,
}

/// Merges one cycle's RPC results into a `DashboardSnapshot`.
pub struct ValidatorAggregator {
    rpc: Arc<dyn ClusterRpc>,
    performance_policy: PerformancePolicy,
    rewards_policy: RewardsPolicy,
    sample_limit: usize,
}

impl ValidatorAggregator {
    pub fn new(
        rpc: Arc<dyn ClusterRpc>,
        performance_policy: PerformancePolicy,
        rewards_policy: RewardsPolicy,
        sample_limit: usize,
    ) -> Self {
        Self {
            rpc,
            performance_policy,
            rewards_policy,
            sample_limit,
        }
    }

    pub fn endpoint(&self) -> String {
        self.rpc.endpoint()
    }

    /// Runs one aggregation cycle. Only a failure of the base calls is an
    /// error; validator-specific and supplementary failures degrade.
    pub async fn fetch_cycle(&self, validator_key: Option<&str>) -> Result<DashboardSnapshot, DashboardError> {
        let base = self.fetch_base();
        let supplementary = self.fetch_supplementary();
        let validator = async {
            match validator_key {
                Some(key) => Some(self.fetch_validator_specific(key).await),
                None => None,
            }
        };

        let (base, supplementary, validator) = futures::join!(base, supplementary, validator);
        let base = base?;

        Ok(self.assemble(base, supplementary, validator_key, validator))
    }

    async fn fetch_base(&self) -> Result<BaseData, DashboardError> {
        let (epoch_info, current_slot, version, vote_accounts) = futures::try_join!(
            self.rpc.get_epoch_info(),
            self.rpc.get_slot(),
            self.rpc.get_version(),
            self.rpc.get_vote_accounts(),
        )?;

        if vote_accounts.is_empty() {
            warn!("{} returned no vote accounts", self.rpc.endpoint());
        }

        Ok(BaseData {
            epoch_info,
            current_slot,
            version,
            vote_accounts,
        })
    }

    async fn fetch_supplementary(&self) -> SupplementaryData {
        let (block_production, samples, nodes) = futures::join!(
            self.rpc.get_block_production(),
            self.rpc.get_recent_performance_samples(self.sample_limit),
            self.rpc.get_cluster_nodes(),
        );

        SupplementaryData {
            block_production: optional("getBlockProduction", block_production),
            performance_samples: optional("getRecentPerformanceSamples", samples),
            cluster_nodes: optional("getClusterNodes", nodes),
        }
    }

    /// Vote-account match and stake activation for one key, fetched in parallel.
    pub async fn fetch_validator_specific(&self, key: &str) -> Result<ValidatorFetch, ValidatorFetchError> {
        let pubkey = validate_public_key(key)
            .map_err(|e| ValidatorFetchError::Invalid(e.message().to_string()))?;
        let key = pubkey.to_string();

        let (vote_accounts, stake_activation) = futures::join!(
            self.rpc.get_vote_accounts(),
            self.rpc.get_stake_activation(&pubkey),
        );

        let vote_accounts = vote_accounts.map_err(ValidatorFetchError::Unavailable)?;
        let record = vote_accounts
            .find(&key)
            .cloned()
            .ok_or(ValidatorFetchError::NotFound)?;

        let stake_activation = match stake_activation {
            Ok(activation) => Some(activation),
            Err(e) => {
                debug!("Stake activation unavailable for {}: {}", key, e);
                None
            }
        };

        Ok(ValidatorFetch {
            record,
            stake_activation,
        })
    }

    pub async fn validator_exists(&self, key: &str) -> Result<bool, DashboardError> {
        let key = validate_public_key(key)?.to_string();
        let vote_accounts = self.rpc.get_vote_accounts().await?;
        Ok(vote_accounts.find(&key).is_some())
    }

    pub fn assemble(
        &self,
        base: BaseData,
        supplementary: SupplementaryData,
        validator_key: Option<&str>,
        validator: Option<Result<ValidatorFetch, ValidatorFetchError>>,
    ) -> DashboardSnapshot {
        let network_stats = compute_network_stats(
            &base.vote_accounts,
            supplementary.block_production.as_ref(),
            supplementary.performance_samples.as_deref(),
            supplementary.cluster_nodes.as_deref(),
        );

        let (validator, validator_lookup) = match validator {
            None => (None, ValidatorLookup::NotRequested),
            Some(Ok(fetch)) => (
                Some(self.derive_validator_info(fetch, &base.epoch_info, &supplementary)),
                ValidatorLookup::Found,
            ),
            Some(Err(ValidatorFetchError::NotFound)) => {
                warn!(
                    "Validator {} not found in current or delinquent vote accounts",
                    validator_key.unwrap_or_default()
                );
                (None, ValidatorLookup::NotFound)
            }
            Some(Err(ValidatorFetchError::Invalid(reason))) => {
                warn!("Ignoring invalid validator key: {}", reason);
                (None, ValidatorLookup::Invalid(reason))
            }
            Some(Err(ValidatorFetchError::Unavailable(e))) => {
                warn!("Failed to fetch validator-specific data: {}", e);
                (None, ValidatorLookup::Unavailable(e.display_message()))
            }
        };

        DashboardSnapshot {
            epoch_info: Some(base.epoch_info),
            current_slot: Some(base.current_slot),
            version: Some(base.version),
            validator,
            validator_lookup,
            network_stats: Some(network_stats),
            validator_key: validator_key.map(str::to_string),
            updated_at: Some(Utc::now()),
        }
    }

    fn derive_validator_info(
        &self,
        fetch: ValidatorFetch,
        epoch: &EpochSnapshot,
        supplementary: &SupplementaryData,
    ) -> ValidatorInfo {
        let record = fetch.record;

        let leader_slots = supplementary
            .block_production
            .as_ref()
            .and_then(|production| production.by_identity.get(&record.identity));
        let samples = supplementary.performance_samples.as_deref().unwrap_or(&[]);
        let node_version = supplementary.cluster_nodes.as_ref().and_then(|nodes| {
            nodes
                .iter()
                .find(|node| node.pubkey == record.identity)
                .and_then(|node| node.version.clone())
        });

        let performance = derive_performance(
            &record,
            epoch,
            leader_slots,
            samples,
            &self.performance_policy,
        );
        let stake = derive_stake(
            &record,
            fetch.stake_activation.as_ref(),
            &self.rewards_policy,
        );
        let rewards = derive_rewards(&stake, &self.rewards_policy);

        ValidatorInfo {
            record,
            stake_activation: fetch.stake_activation,
            node_version,
            performance,
            stake,
            rewards,
        }
    }
}

fn optional<T>(method: &str, result: Result<T, DashboardError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("{} unavailable this cycle: {}", method, e);
            None
        }
    }
}
