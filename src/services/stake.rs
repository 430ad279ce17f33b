use {
    crate::rpc::types::{StakeActivation, StakeActivationState, ValidatorRecord, LAMPORTS_PER_SOL},
    serde::{Deserialize, Serialize},
};

/// Simplified staking economics. The APR is a commission-adjusted base rate,
/// not the protocol's inflation schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardsPolicy {
    /// Network base APR in percent.
    pub base_apr: f64,
    /// Epochs per year (an epoch lasts roughly 2.5 days).
    pub epochs_per_year: f64,
    /// Epochs accumulated into `total_rewards`.
    pub reward_horizon_epochs: u32,
}

impl Default for RewardsPolicy {
    fn default() -> Self {
        Self {
            base_apr: 7.2,
            epochs_per_year: 365.0 / 2.5,
            reward_horizon_epochs: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakeInfo {
    /// All amounts in SOL.
    pub total_stake: f64,
    pub activated_stake: f64,
    pub deactivating_stake: f64,
    pub commission: u8,
    pub apr: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardsInfo {
    pub epoch_rewards: f64,
    pub total_rewards: f64,
}

pub fn commission_adjusted_apr(commission: u8, base_apr: f64) -> f64 {
    let commission = commission.min(100) as f64;
    base_apr * (1.0 - commission / 100.0)
}

pub fn derive_stake(
    record: &ValidatorRecord,
    activation: Option<&StakeActivation>,
    policy: &RewardsPolicy,
) -> StakeInfo {
    let total_stake = record.activated_stake_sol();

    let activated_stake = activation
        .filter(|a| a.active > 0)
        .map(|a| a.active as f64 / LAMPORTS_PER_SOL)
        .unwrap_or(total_stake);

    let deactivating_stake = activation
        .filter(|a| a.state == StakeActivationState::Deactivating)
        .map(|a| a.inactive as f64 / LAMPORTS_PER_SOL)
        .unwrap_or(0.0);

    StakeInfo {
        total_stake,
        activated_stake,
        deactivating_stake,
        commission: record.commission.min(100),
        apr: commission_adjusted_apr(record.commission, policy.base_apr),
    }
}

pub fn derive_rewards(stake: &StakeInfo, policy: &RewardsPolicy) -> RewardsInfo {
    if policy.epochs_per_year <= 0.0 {
        return RewardsInfo {
            epoch_rewards: 0.0,
            total_rewards: 0.0,
        };
    }

    let epoch_rewards = stake.total_stake * stake.apr / 100.0 / policy.epochs_per_year;
    RewardsInfo {
        epoch_rewards,
        total_rewards: epoch_rewards * policy.reward_horizon_epochs as f64,
    }
}
