pub mod network;
pub mod performance;
pub mod stake;

pub use network::{compute_network_stats, NetworkStats};
pub use performance::{
    clamp_percent, derive_performance, PerformanceMetrics, PerformancePolicy, PerformanceThresholds,
    Rating,
};
pub use stake::{commission_adjusted_apr, derive_rewards, derive_stake, RewardsInfo, RewardsPolicy, StakeInfo};
