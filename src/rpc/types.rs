use {
    serde::{Deserialize, Serialize},
    solana_client::rpc_response::{
        RpcBlockProduction, RpcContactInfo, RpcPerfSample, RpcVersionInfo, RpcVoteAccountInfo,
        RpcVoteAccountStatus,
    },
    solana_sdk::epoch_info::EpochInfo,
    std::collections::HashMap,
};

pub const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

/// (epoch, credits, previous_credits) as reported by getVoteAccounts.
pub type EpochCredits = (u64, u64, u64);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpochSnapshot {
    pub epoch: u64,
    pub slot_index: u64,
    pub slots_in_epoch: u64,
    pub absolute_slot: u64,
    pub block_height: u64,
    pub transaction_count: Option<u64>,
}

impl EpochSnapshot {
    pub fn progress_percent(&self) -> f64 {
        if self.slots_in_epoch == 0 {
            return 0.0;
        }
        (self.slot_index as f64 / self.slots_in_epoch as f64 * 100.0).clamp(0.0, 100.0)
    }

    pub fn slots_remaining(&self) -> u64 {
        self.slots_in_epoch.saturating_sub(self.slot_index)
    }
}

impl From<EpochInfo> for EpochSnapshot {
    fn from(info: EpochInfo) -> Self {
        Self {
            epoch: info.epoch,
            slot_index: info.slot_index,
            slots_in_epoch: info.slots_in_epoch,
            absolute_slot: info.absolute_slot,
            block_height: info.block_height,
            transaction_count: info.transaction_count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidatorStatus {
    Current,
    Delinquent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorRecord {
    pub identity: String,
    pub vote_account: String,
    pub activated_stake: u64,
    pub commission: u8,
    pub last_vote: u64,
    pub root_slot: u64,
    pub epoch_credits: Vec<EpochCredits>,
    pub status: ValidatorStatus,
}

impl ValidatorRecord {
    pub fn from_rpc(info: RpcVoteAccountInfo, status: ValidatorStatus) -> Self {
        Self {
            identity: info.node_pubkey,
            vote_account: info.vote_pubkey,
            activated_stake: info.activated_stake,
            commission: info.commission,
            last_vote: info.last_vote,
            root_slot: info.root_slot,
            epoch_credits: info.epoch_credits,
            status,
        }
    }

    pub fn matches(&self, key: &str) -> bool {
        self.identity == key || self.vote_account == key
    }

    pub fn total_credits(&self) -> u64 {
        self.epoch_credits
            .iter()
            .map(|(_, credits, _)| *credits)
            .fold(0u64, |acc, c| acc.saturating_add(c))
    }

    pub fn activated_stake_sol(&self) -> f64 {
        self.activated_stake as f64 / LAMPORTS_PER_SOL
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoteAccounts {
    pub current: Vec<ValidatorRecord>,
    pub delinquent: Vec<ValidatorRecord>,
}

impl VoteAccounts {
    /// Looks `key` up by identity or vote account, current set first.
    pub fn find(&self, key: &str) -> Option<&ValidatorRecord> {
        self.current
            .iter()
            .find(|v| v.matches(key))
            .or_else(|| self.delinquent.iter().find(|v| v.matches(key)))
    }

    pub fn len(&self) -> usize {
        self.current.len() + self.delinquent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<RpcVoteAccountStatus> for VoteAccounts {
    fn from(status: RpcVoteAccountStatus) -> Self {
        Self {
            current: status
                .current
                .into_iter()
                .map(|v| ValidatorRecord::from_rpc(v, ValidatorStatus::Current))
                .collect(),
            delinquent: status
                .delinquent
                .into_iter()
                .map(|v| ValidatorRecord::from_rpc(v, ValidatorStatus::Delinquent))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeVersion {
    pub solana_core: String,
    pub feature_set: Option<u32>,
}

impl From<RpcVersionInfo> for NodeVersion {
    fn from(info: RpcVersionInfo) -> Self {
        Self {
            solana_core: info.solana_core,
            feature_set: info.feature_set,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterNode {
    pub pubkey: String,
    pub gossip: Option<String>,
    pub rpc: Option<String>,
    pub version: Option<String>,
}

impl From<RpcContactInfo> for ClusterNode {
    fn from(info: RpcContactInfo) -> Self {
        Self {
            pubkey: info.pubkey,
            gossip: info.gossip.map(|addr| addr.to_string()),
            rpc: info.rpc.map(|addr| addr.to_string()),
            version: info.version,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSample {
    pub slot: u64,
    pub num_transactions: u64,
    pub num_slots: u64,
    pub sample_period_secs: u16,
}

impl From<RpcPerfSample> for PerformanceSample {
    fn from(sample: RpcPerfSample) -> Self {
        Self {
            slot: sample.slot,
            num_transactions: sample.num_transactions,
            num_slots: sample.num_slots,
            sample_period_secs: sample.sample_period_secs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StakeActivationState {
    Activating,
    Active,
    Deactivating,
    Inactive,
}

/// Payload of the getStakeActivation RPC method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakeActivation {
    pub state: StakeActivationState,
    pub active: u64,
    pub inactive: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderSlots {
    pub leader_slots: u64,
    pub blocks_produced: u64,
}

impl LeaderSlots {
    pub fn skipped(&self) -> u64 {
        self.leader_slots.saturating_sub(self.blocks_produced)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockProduction {
    pub by_identity: HashMap<String, LeaderSlots>,
    pub first_slot: u64,
    pub last_slot: u64,
}

impl From<RpcBlockProduction> for BlockProduction {
    fn from(production: RpcBlockProduction) -> Self {
        Self {
            by_identity: production
                .by_identity
                .into_iter()
                .map(|(identity, (leader_slots, blocks_produced))| {
                    (
                        identity,
                        LeaderSlots {
                            leader_slots: leader_slots as u64,
                            blocks_produced: blocks_produced as u64,
                        },
                    )
                })
                .collect(),
            first_slot: production.range.first_slot,
            last_slot: production.range.last_slot,
        }
    }
}
