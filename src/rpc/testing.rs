//! Scripted `ClusterRpc` used by aggregator and poller tests.

use {
    crate::{
        error::DashboardError,
        rpc::{
            client::ClusterRpc,
            types::{
                BlockProduction, ClusterNode, EpochCredits, EpochSnapshot, LeaderSlots, NodeVersion,
                PerformanceSample, StakeActivation, ValidatorRecord, ValidatorStatus, VoteAccounts,
            },
        },
    },
    async_trait::async_trait,
    solana_sdk::pubkey::Pubkey,
    std::{
        collections::HashMap,
        sync::{
            atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
            Mutex,
        },
        time::Duration,
    },
};

pub const NODE_KEY: &str = "Vote111111111111111111111111111111111111111";
pub const VOTE_KEY: &str = "Stake11111111111111111111111111111111111111";
pub const DELINQUENT_NODE_KEY: &str = "Config1111111111111111111111111111111111111";
pub const UNKNOWN_KEY: &str = "11111111111111111111111111111111";

pub fn validator(identity: &str, vote: &str, credits: Vec<EpochCredits>, status: ValidatorStatus) -> ValidatorRecord {
    ValidatorRecord {
        identity: identity.into(),
        vote_account: vote.into(),
        activated_stake: 100_000 * 1_000_000_000,
        commission: 10,
        last_vote: 1_000,
        root_slot: 968,
        epoch_credits: credits,
        status,
    }
}

pub fn sample_vote_accounts() -> VoteAccounts {
    VoteAccounts {
        current: vec![validator(
            NODE_KEY,
            VOTE_KEY,
            vec![(100, 950, 0), (101, 960, 950), (102, 970, 960)],
            ValidatorStatus::Current,
        )],
        delinquent: vec![ValidatorRecord {
            activated_stake: 1_000_000_000,
            ..validator(
                DELINQUENT_NODE_KEY,
                "SysvarC1ock11111111111111111111111111111111",
                vec![],
                ValidatorStatus::Delinquent,
            )
        }],
    }
}

pub struct ScriptedRpc {
    pub epoch: Mutex<EpochSnapshot>,
    pub vote_accounts: Mutex<VoteAccounts>,
    pub fail_base: AtomicBool,
    pub fail_extras: AtomicBool,
    pub fail_stake_activation: AtomicBool,
    pub slot: AtomicU64,
    /// Stake-activation lookups for these keys stall, holding their cycle open.
    pub slow_keys: Mutex<Vec<String>>,
    pub base_calls: AtomicUsize,
}

impl Default for ScriptedRpc {
    fn default() -> Self {
        Self {
            epoch: Mutex::new(EpochSnapshot {
                epoch: 102,
                slot_index: 500,
                slots_in_epoch: 1_000,
                absolute_slot: 102_500,
                block_height: 100_000,
                transaction_count: None,
            }),
            vote_accounts: Mutex::new(sample_vote_accounts()),
            fail_base: AtomicBool::new(false),
            fail_extras: AtomicBool::new(false),
            fail_stake_activation: AtomicBool::new(false),
            slot: AtomicU64::new(102_500),
            slow_keys: Mutex::new(Vec::new()),
            base_calls: AtomicUsize::new(0),
        }
    }
}

impl ScriptedRpc {
    fn base_failure(&self) -> Result<(), DashboardError> {
        if self.fail_base.load(Ordering::SeqCst) {
            return Err(DashboardError::Network("Unable to connect to RPC endpoint".into()));
        }
        Ok(())
    }

    fn extras_failure(&self) -> Result<(), DashboardError> {
        if self.fail_extras.load(Ordering::SeqCst) {
            return Err(DashboardError::Api("method not supported".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterRpc for ScriptedRpc {
    fn endpoint(&self) -> String {
        "scripted://local".into()
    }

    async fn get_epoch_info(&self) -> Result<EpochSnapshot, DashboardError> {
        self.base_calls.fetch_add(1, Ordering::SeqCst);
        self.base_failure()?;
        Ok(self.epoch.lock().unwrap().clone())
    }

    async fn get_slot(&self) -> Result<u64, DashboardError> {
        self.base_failure()?;
        Ok(self.slot.load(Ordering::SeqCst))
    }

    async fn get_version(&self) -> Result<NodeVersion, DashboardError> {
        self.base_failure()?;
        Ok(NodeVersion {
            solana_core: "2.1.14".into(),
            feature_set: Some(1_725_507_508),
        })
    }

    async fn get_vote_accounts(&self) -> Result<VoteAccounts, DashboardError> {
        self.base_failure()?;
        Ok(self.vote_accounts.lock().unwrap().clone())
    }

    async fn get_stake_activation(&self, pubkey: &Pubkey) -> Result<StakeActivation, DashboardError> {
        let slow = self
            .slow_keys
            .lock()
            .unwrap()
            .contains(&pubkey.to_string());
        if slow {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        if self.fail_stake_activation.load(Ordering::SeqCst) {
            return Err(DashboardError::Api("Invalid param: not a stake account".into()));
        }
        Ok(StakeActivation {
            state: crate::rpc::types::StakeActivationState::Active,
            active: 90_000 * 1_000_000_000,
            inactive: 0,
        })
    }

    async fn get_cluster_nodes(&self) -> Result<Vec<ClusterNode>, DashboardError> {
        self.extras_failure()?;
        Ok(vec![ClusterNode {
            pubkey: NODE_KEY.into(),
            gossip: Some("10.0.0.1:8001".into()),
            rpc: None,
            version: Some("2.1.14".into()),
        }])
    }

    async fn get_recent_performance_samples(
        &self,
        _limit: usize,
    ) -> Result<Vec<PerformanceSample>, DashboardError> {
        self.extras_failure()?;
        Ok(vec![PerformanceSample {
            slot: 102_400,
            num_transactions: 240_000,
            num_slots: 150,
            sample_period_secs: 60,
        }])
    }

    async fn get_block_production(&self) -> Result<BlockProduction, DashboardError> {
        self.extras_failure()?;
        let mut by_identity = HashMap::new();
        by_identity.insert(
            NODE_KEY.to_string(),
            LeaderSlots {
                leader_slots: 40,
                blocks_produced: 39,
            },
        );
        by_identity.insert(
            DELINQUENT_NODE_KEY.to_string(),
            LeaderSlots {
                leader_slots: 10,
                blocks_produced: 7,
            },
        );
        Ok(BlockProduction {
            by_identity,
            first_slot: 102_000,
            last_slot: 102_500,
        })
    }
}
