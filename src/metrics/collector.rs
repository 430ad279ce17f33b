use {
    super::types::*,
    crate::{
        aggregator::{
            insights::InsightsPanel,
            state::{DashboardState, ValidatorLookup},
        },
        services::{PerformanceMetrics, PerformancePolicy},
    },
    log::debug,
    tokio::{sync::watch, task::JoinHandle},
    tokio_util::sync::CancellationToken,
};

/// Mirrors published dashboard state into the Prometheus gauges.
#[derive(Clone, Default)]
pub struct MetricsCollector;

impl MetricsCollector {
    pub fn new() -> Self {
        Self
    }

    pub fn record(&self, state: &DashboardState) {
        let snapshot = &state.snapshot;

        if let Some(epoch) = &snapshot.epoch_info {
            EPOCH.set(epoch.epoch as i64);
            EPOCH_PROGRESS.set(epoch.progress_percent());
        }

        if let Some(stats) = &snapshot.network_stats {
            NETWORK_VALIDATORS.set(stats.total_validators as i64);
            NETWORK_DELINQUENT.set(stats.delinquent_validators as i64);
            NETWORK_STAKE.set(stats.total_stake_sol());
            if let Some(tps) = stats.tps {
                NETWORK_TPS.set(tps);
            }
        }

        match &snapshot.validator {
            Some(validator) => {
                VALIDATOR_FOUND.set(1);
                VALIDATOR_UPTIME.set(validator.performance.uptime);
                VALIDATOR_VOTE_SUCCESS.set(validator.performance.vote_success_rate);
                VALIDATOR_SKIP_RATE.set(validator.performance.skip_rate);
                VALIDATOR_COMMISSION.set(validator.stake.commission as i64);
                VALIDATOR_APR.set(validator.stake.apr);
                VALIDATOR_ACTIVATED_STAKE.set(validator.stake.activated_stake);
            }
            None => {
                // Nothing from an earlier key or cycle may linger.
                let policy = PerformancePolicy::default();
                let reset = match snapshot.validator_lookup {
                    ValidatorLookup::NotFound => PerformanceMetrics::not_found(&policy),
                    _ => PerformanceMetrics::neutral(&policy),
                };
                VALIDATOR_FOUND.set(0);
                VALIDATOR_UPTIME.set(reset.uptime);
                VALIDATOR_VOTE_SUCCESS.set(reset.vote_success_rate);
                VALIDATOR_SKIP_RATE.set(reset.skip_rate);
                VALIDATOR_COMMISSION.set(0);
                VALIDATOR_APR.set(0.0);
                VALIDATOR_ACTIVATED_STAKE.set(0.0);
            }
        }
    }

    pub fn record_insights(&self, panel: &InsightsPanel) {
        MEV_AVAILABLE.set(panel.mev.is_personalized() as i64);
    }

    /// Updates gauges whenever either channel publishes, until `shutdown`.
    pub fn start_collection(
        self,
        mut state: watch::Receiver<DashboardState>,
        mut insights: watch::Receiver<InsightsPanel>,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    changed = state.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        self.record(&state.borrow_and_update());
                    }
                    changed = insights.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        self.record_insights(&insights.borrow_and_update());
                    }
                }
            }
            debug!("Metrics collection stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            aggregator::state::DashboardSnapshot,
            rpc::types::EpochSnapshot,
            services::NetworkStats,
        },
    };

    #[test]
    fn test_record_sets_network_gauges() {
        let state = DashboardState {
            snapshot: DashboardSnapshot {
                epoch_info: Some(EpochSnapshot {
                    epoch: 555,
                    slot_index: 100,
                    slots_in_epoch: 400,
                    ..Default::default()
                }),
                network_stats: Some(NetworkStats {
                    total_validators: 1_234,
                    delinquent_validators: 12,
                    total_stake_lamports: 2_000_000_000,
                    average_skip_rate: 0.0,
                    skip_rate_sampled: false,
                    tps: None,
                    cluster_nodes: None,
                    rpc_nodes: None,
                }),
                ..Default::default()
            },
            ..Default::default()
        };

        MetricsCollector::new().record(&state);
        assert_eq!(EPOCH.get(), 555);
        assert_eq!(EPOCH_PROGRESS.get(), 25.0);
        assert_eq!(NETWORK_VALIDATORS.get(), 1_234);
        assert_eq!(NETWORK_STAKE.get(), 2.0);
        assert_eq!(VALIDATOR_FOUND.get(), 0);
    }

    #[test]
    fn test_lookup_failure_clears_validator_gauges() {
        VALIDATOR_FOUND.set(1);
        VALIDATOR_UPTIME.set(99.0);
        VALIDATOR_COMMISSION.set(8);
        VALIDATOR_APR.set(6.6);
        VALIDATOR_ACTIVATED_STAKE.set(90_000.0);

        let state = DashboardState {
            snapshot: DashboardSnapshot {
                validator_lookup: ValidatorLookup::Unavailable("timeout".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        MetricsCollector::new().record(&state);

        assert_eq!(VALIDATOR_FOUND.get(), 0);
        assert_eq!(VALIDATOR_UPTIME.get(), 0.0);
        assert_eq!(VALIDATOR_COMMISSION.get(), 0);
        assert_eq!(VALIDATOR_APR.get(), 0.0);
        assert_eq!(VALIDATOR_ACTIVATED_STAKE.get(), 0.0);
    }
}
