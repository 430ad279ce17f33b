use {
    crate::rpc::types::{EpochSnapshot, LeaderSlots, PerformanceSample, ValidatorRecord},
    serde::{Deserialize, Serialize},
};

/// Tunables for the credit-window approximation. Block production and vote
/// success are estimated from epoch credits, not verified against the chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformancePolicy {
    /// Number of trailing epoch-credit entries considered.
    pub credit_window: usize,
    pub default_slot_time_ms: f64,
}

impl Default for PerformancePolicy {
    fn default() -> Self {
        Self {
            credit_window: 3,
            default_slot_time_ms: 400.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub block_production_rate: f64,
    pub vote_success_rate: f64,
    pub skip_rate: f64,
    pub uptime: f64,
    pub average_slot_time_ms: f64,
    /// True when block production came from leader-slot data rather than credits.
    pub block_production_sampled: bool,
}

impl PerformanceMetrics {
    /// Neutral values for a validator with no history yet.
    pub fn neutral(policy: &PerformancePolicy) -> Self {
        Self {
            block_production_rate: 0.0,
            vote_success_rate: 0.0,
            skip_rate: 0.0,
            uptime: 0.0,
            average_slot_time_ms: policy.default_slot_time_ms,
            block_production_sampled: false,
        }
    }

    /// Values shown for a key missing from the vote-account sets.
    pub fn not_found(policy: &PerformancePolicy) -> Self {
        Self {
            skip_rate: 100.0,
            ..Self::neutral(policy)
        }
    }
}

pub fn clamp_percent(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Credits earned over the trailing window as a share of the slots in those epochs.
pub fn vote_success_rate(record: &ValidatorRecord, epoch: &EpochSnapshot, window: usize) -> Option<f64> {
    let start = record.epoch_credits.len().saturating_sub(window);
    let recent = &record.epoch_credits[start..];

    let expected = (recent.len() as u64).saturating_mul(epoch.slots_in_epoch);
    if expected == 0 {
        return None;
    }

    let earned: u64 = recent
        .iter()
        .fold(0u64, |acc, (_, credits, _)| acc.saturating_add(*credits));
    Some(clamp_percent(earned as f64 / expected as f64 * 100.0))
}

pub fn average_slot_time_ms(samples: &[PerformanceSample]) -> Option<f64> {
    let slots: u64 = samples.iter().map(|s| s.num_slots).sum();
    let secs: u64 = samples.iter().map(|s| s.sample_period_secs as u64).sum();
    if slots == 0 || secs == 0 {
        return None;
    }
    Some(secs as f64 * 1000.0 / slots as f64)
}

pub fn derive_performance(
    record: &ValidatorRecord,
    epoch: &EpochSnapshot,
    leader_slots: Option<&LeaderSlots>,
    samples: &[PerformanceSample],
    policy: &PerformancePolicy,
) -> PerformanceMetrics {
    let slot_time = average_slot_time_ms(samples).unwrap_or(policy.default_slot_time_ms);
    let vote_rate = vote_success_rate(record, epoch, policy.credit_window);

    let sampled = leader_slots
        .filter(|slots| slots.leader_slots > 0)
        .map(|slots| clamp_percent(slots.blocks_produced as f64 / slots.leader_slots as f64 * 100.0));

    let block_rate = sampled.or(vote_rate);
    let vote_success = vote_rate.unwrap_or(0.0);

    PerformanceMetrics {
        block_production_rate: block_rate.unwrap_or(0.0),
        vote_success_rate: vote_success,
        skip_rate: block_rate.map(|rate| clamp_percent(100.0 - rate)).unwrap_or(0.0),
        uptime: vote_success,
        average_slot_time_ms: slot_time,
        block_production_sampled: sampled.is_some(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Excellent,
    Good,
    Poor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceThresholds {
    pub excellent_uptime: f64,
    pub good_uptime: f64,
    pub excellent_vote_success: f64,
    pub good_vote_success: f64,
    pub low_skip_rate: f64,
    pub high_skip_rate: f64,
}

impl Default for PerformanceThresholds {
    fn default() -> Self {
        Self {
            excellent_uptime: 99.5,
            good_uptime: 98.0,
            excellent_vote_success: 99.0,
            good_vote_success: 95.0,
            low_skip_rate: 2.0,
            high_skip_rate: 5.0,
        }
    }
}

impl PerformanceThresholds {
    pub fn rate_uptime(&self, uptime: f64) -> Rating {
        rate_higher_is_better(uptime, self.excellent_uptime, self.good_uptime)
    }

    pub fn rate_vote_success(&self, rate: f64) -> Rating {
        rate_higher_is_better(rate, self.excellent_vote_success, self.good_vote_success)
    }

    pub fn rate_skip_rate(&self, skip_rate: f64) -> Rating {
        if skip_rate <= self.low_skip_rate {
            Rating::Excellent
        } else if skip_rate <= self.high_skip_rate {
            Rating::Good
        } else {
            Rating::Poor
        }
    }
}

fn rate_higher_is_better(value: f64, excellent: f64, good: f64) -> Rating {
    if value >= excellent {
        Rating::Excellent
    } else if value >= good {
        Rating::Good
    } else {
        Rating::Poor
    }
}
