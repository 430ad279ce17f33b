use {
    crate::{
        aggregator::{DashboardState, InsightsPanel},
        alerts::UptimeAlert,
        format::render_summary,
        services::PerformancePolicy,
        storage::PreferenceStore,
    },
    log::{info, warn},
};

pub fn slot_time_ms(state: &DashboardState, policy: &PerformancePolicy) -> f64 {
    state
        .snapshot
        .validator
        .as_ref()
        .map(|v| v.performance.average_slot_time_ms)
        .unwrap_or(policy.default_slot_time_ms)
}

/// Logs each committed cycle once, runs the uptime alert and persists
/// successful snapshots.
pub struct Reporter {
    store: PreferenceStore,
    alert: UptimeAlert,
    policy: PerformancePolicy,
    last_reported: u64,
}

impl Reporter {
    pub fn new(store: PreferenceStore, alert: UptimeAlert, policy: PerformancePolicy) -> Self {
        Self {
            store,
            alert,
            policy,
            last_reported: 0,
        }
    }

    pub fn set_threshold(&mut self, threshold: f64) {
        if threshold != self.alert.threshold() {
            info!("Uptime alert threshold set to {:.2}%", threshold);
            self.alert.set_threshold(threshold);
        }
    }

    /// Returns false when `state` carries no commit newer than the last one
    /// reported. The next cycle may already have flagged the state as
    /// loading; the commit is still reported.
    pub fn report(&mut self, state: &DashboardState, panel: Option<&InsightsPanel>) -> bool {
        if state.committed_sequence == self.last_reported {
            return false;
        }
        self.last_reported = state.committed_sequence;

        info!(
            "\n{}",
            render_summary(state, panel, slot_time_ms(state, &self.policy))
        );

        // `error` belongs to the commit; `status` may already read Loading.
        if state.error.is_none() {
            self.alert.observe(state);
            let snapshot = state.snapshot.clone();
            if let Err(e) = self.store.update(|prefs| prefs.validator_data = Some(snapshot)) {
                warn!("{}", e);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::aggregator::DashboardSnapshot,
        crate::error::DashboardError,
    };

    fn reporter(dir: &tempfile::TempDir) -> Reporter {
        Reporter::new(
            PreferenceStore::new(dir.path().join("prefs.json")),
            UptimeAlert::new(95.0),
            PerformancePolicy::default(),
        )
    }

    #[test]
    fn test_commit_overtaken_by_loading_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut reporter = reporter(&dir);

        let mut state = DashboardState::default();
        state.apply(
            1,
            Ok(DashboardSnapshot {
                current_slot: Some(42),
                ..Default::default()
            }),
        );
        // the next cycle starts before the reporter reads the channel
        state.begin_loading();

        assert!(reporter.report(&state, None));
        let saved = PreferenceStore::new(dir.path().join("prefs.json")).load();
        assert_eq!(saved.validator_data.and_then(|s| s.current_slot), Some(42));

        // same commit again: nothing new
        assert!(!reporter.report(&state, None));
    }

    #[test]
    fn test_failed_commit_is_logged_but_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let mut reporter = reporter(&dir);

        let mut state = DashboardState::default();
        state.apply(1, Err(DashboardError::Timeout("slow".into())));

        assert!(reporter.report(&state, None));
        assert!(!dir.path().join("prefs.json").exists());
    }

    #[test]
    fn test_initial_state_is_not_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut reporter = reporter(&dir);
        assert!(!reporter.report(&DashboardState::default(), None));
    }
}
