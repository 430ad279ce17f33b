use {
    crate::{
        aggregator::{
            cycle::ValidatorAggregator,
            state::{DashboardSnapshot, DashboardState},
        },
        config::LiveSettings,
        error::DashboardError,
        metrics::{POLL_CYCLES_TOTAL, POLL_ERRORS},
    },
    log::{debug, info, warn},
    std::{
        sync::{
            atomic::{AtomicU64, Ordering},
            Arc,
        },
        time::Duration,
    },
    tokio::{
        sync::{mpsc, watch},
        task::JoinHandle,
        time::{interval, MissedTickBehavior},
    },
    tokio_util::sync::CancellationToken,
};

/// Hands out cycle sequence numbers and only lets the latest one commit.
pub struct StateCommitter {
    latest: AtomicU64,
    state: watch::Sender<DashboardState>,
}

impl StateCommitter {
    pub fn new(state: watch::Sender<DashboardState>) -> Self {
        Self {
            latest: AtomicU64::new(0),
            state,
        }
    }

    /// Issues the next sequence number and flags the state as loading.
    pub fn begin(&self) -> u64 {
        let sequence = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|state| state.begin_loading());
        sequence
    }

    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    /// Returns false when a newer cycle has been issued since `sequence`.
    pub fn commit(&self, sequence: u64, result: Result<DashboardSnapshot, DashboardError>) -> bool {
        let outcome = match &result {
            Ok(_) => "success",
            Err(_) => "error",
        };
        let error_kind = result.as_ref().err().map(|e| e.kind());

        // The check runs under the channel lock so a newer commit cannot interleave.
        let committed = self.state.send_if_modified(|state| {
            if sequence != self.latest.load(Ordering::SeqCst) {
                return false;
            }
            state.apply(sequence, result);
            true
        });

        if committed {
            POLL_CYCLES_TOTAL.with_label_values(&[outcome]).inc();
            if let Some(kind) = error_kind {
                POLL_ERRORS.with_label_values(&[kind.as_str()]).inc();
            }
        } else {
            POLL_CYCLES_TOTAL.with_label_values(&["stale"]).inc();
            debug!("Discarding stale cycle {} (latest {})", sequence, self.latest());
        }
        committed
    }
}

enum PollCommand {
    Refetch,
}

/// Drives `ValidatorAggregator` on a fixed interval.
pub struct DashboardPoller {
    aggregator: Arc<ValidatorAggregator>,
    interval: Duration,
}

pub struct PollerHandle {
    commands: mpsc::Sender<PollCommand>,
    state: watch::Receiver<DashboardState>,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.state.clone()
    }

    /// Triggers an immediate cycle outside the interval.
    pub async fn refetch(&self) -> bool {
        self.commands.send(PollCommand::Refetch).await.is_ok()
    }

    pub async fn shutdown(self) {
        self.shutdown.cancel();
        if let Err(e) = self.task.await {
            warn!("Poller task ended abnormally: {}", e);
        }
    }
}

impl DashboardPoller {
    pub fn new(aggregator: Arc<ValidatorAggregator>, interval: Duration) -> Self {
        Self { aggregator, interval }
    }

    /// Polls the key published on `settings`. A new key drops in-flight
    /// cycles for the old one and restarts the interval.
    pub fn spawn(self, settings: watch::Receiver<LiveSettings>, shutdown: CancellationToken) -> PollerHandle {
        let (state_tx, state_rx) = watch::channel(DashboardState::default());
        let (command_tx, command_rx) = mpsc::channel(16);
        let committer = Arc::new(StateCommitter::new(state_tx));

        let task = tokio::spawn(self.run(settings, committer, command_rx, shutdown.clone()));

        PollerHandle {
            commands: command_tx,
            state: state_rx,
            shutdown,
            task,
        }
    }

    async fn run(
        self,
        mut settings: watch::Receiver<LiveSettings>,
        committer: Arc<StateCommitter>,
        mut commands: mpsc::Receiver<PollCommand>,
        shutdown: CancellationToken,
    ) {
        let mut validator_key = settings.borrow_and_update().validator_key.clone();
        let mut follow_settings = true;
        info!(
            "Polling {} every {}s (validator: {})",
            self.aggregator.endpoint(),
            self.interval.as_secs(),
            validator_key.as_deref().unwrap_or("none")
        );

        'session: loop {
            // One session per key; cancelling it drops that key's in-flight cycles.
            let session = shutdown.child_token();
            let mut ticker = interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => {
                        session.cancel();
                        info!("Poller stopped");
                        return;
                    }
                    changed = settings.changed(), if follow_settings => {
                        if changed.is_err() {
                            follow_settings = false;
                            continue;
                        }
                        let key = settings.borrow_and_update().validator_key.clone();
                        if key != validator_key {
                            info!("Tracking validator {}", key.as_deref().unwrap_or("none"));
                            session.cancel();
                            validator_key = key;
                            continue 'session;
                        }
                    }
                    _ = ticker.tick() => {
                        self.spawn_cycle(validator_key.clone(), &committer, session.clone());
                    }
                    command = commands.recv() => match command {
                        Some(PollCommand::Refetch) => {
                            debug!("Manual refetch requested");
                            self.spawn_cycle(validator_key.clone(), &committer, session.clone());
                        }
                        None => {
                            session.cancel();
                            return;
                        }
                    }
                }
            }
        }
    }

    fn spawn_cycle(
        &self,
        validator_key: Option<String>,
        committer: &Arc<StateCommitter>,
        session: CancellationToken,
    ) {
        let sequence = committer.begin();
        let aggregator = self.aggregator.clone();
        let committer = committer.clone();

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = session.cancelled() => {
                    POLL_CYCLES_TOTAL.with_label_values(&["cancelled"]).inc();
                    debug!("Cycle {} cancelled", sequence);
                }
                result = aggregator.fetch_cycle(validator_key.as_deref()) => {
                    if let Err(e) = &result {
                        warn!("Cycle {} failed: {}", sequence, e);
                    }
                    committer.commit(sequence, result);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        aggregator::state::{FetchStatus, ValidatorLookup},
        rpc::testing::{ScriptedRpc, NODE_KEY, UNKNOWN_KEY},
        services::{PerformancePolicy, RewardsPolicy},
    };

    fn snapshot(slot: u64) -> DashboardSnapshot {
        DashboardSnapshot {
            current_slot: Some(slot),
            ..Default::default()
        }
    }

    fn tracking(key: Option<&str>) -> (watch::Sender<LiveSettings>, watch::Receiver<LiveSettings>) {
        watch::channel(LiveSettings::tracking(key.map(String::from)))
    }

    fn poller(rpc: Arc<ScriptedRpc>, every: Duration) -> DashboardPoller {
        let aggregator = ValidatorAggregator::new(
            rpc,
            PerformancePolicy::default(),
            RewardsPolicy::default(),
            5,
        );
        DashboardPoller::new(Arc::new(aggregator), every)
    }

    async fn wait_for<F>(rx: &mut watch::Receiver<DashboardState>, done: F) -> DashboardState
    where
        F: Fn(&DashboardState) -> bool,
    {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                {
                    let state = rx.borrow_and_update();
                    if done(&state) {
                        return state.clone();
                    }
                }
                rx.changed().await.unwrap();
            }
        })
        .await
        .expect("state never reached expected condition")
    }

    #[test]
    fn test_stale_result_is_discarded() {
        let (tx, rx) = watch::channel(DashboardState::default());
        let committer = StateCommitter::new(tx);

        let older = committer.begin();
        let newer = committer.begin();

        assert!(committer.commit(newer, Ok(snapshot(200))));
        assert!(!committer.commit(older, Ok(snapshot(100))));

        let state = rx.borrow().clone();
        assert_eq!(state.snapshot.current_slot, Some(200));
        assert_eq!(state.committed_sequence, newer);
    }

    #[test]
    fn test_stale_error_does_not_override_success() {
        let (tx, rx) = watch::channel(DashboardState::default());
        let committer = StateCommitter::new(tx);

        let older = committer.begin();
        let newer = committer.begin();
        assert!(committer.commit(newer, Ok(snapshot(200))));
        assert!(!committer.commit(older, Err(DashboardError::Timeout("slow".into()))));

        let state = rx.borrow().clone();
        assert_eq!(state.status, FetchStatus::Success);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_fires_immediately_and_publishes_success() {
        let rpc = Arc::new(ScriptedRpc::default());
        let (_settings, settings_rx) = tracking(Some(NODE_KEY));
        let handle = poller(rpc, Duration::from_secs(3_600)).spawn(settings_rx, CancellationToken::new());

        let mut rx = handle.subscribe();
        let state = wait_for(&mut rx, |s| s.status == FetchStatus::Success).await;

        assert!(!state.is_loading);
        assert_eq!(state.snapshot.validator_lookup, ValidatorLookup::Found);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_base_failure_sets_error_and_keeps_snapshot() {
        let rpc = Arc::new(ScriptedRpc::default());
        let (_settings, settings_rx) = tracking(None);
        let handle = poller(rpc.clone(), Duration::from_secs(3_600)).spawn(settings_rx, CancellationToken::new());
        let mut rx = handle.subscribe();

        let first = wait_for(&mut rx, |s| s.status == FetchStatus::Success).await;
        assert_eq!(first.snapshot.current_slot, Some(102_500));

        rpc.fail_base.store(true, Ordering::SeqCst);
        assert!(handle.refetch().await);

        let state = wait_for(&mut rx, |s| s.status == FetchStatus::Error).await;
        assert!(!state.is_loading);
        let error = state.error.unwrap();
        assert!(!error.message.is_empty());
        assert!(error.retryable);
        // nothing fabricated: the last good snapshot is still what is shown
        assert_eq!(state.snapshot, first.snapshot);

        // the next cycle recovers
        rpc.fail_base.store(false, Ordering::SeqCst);
        assert!(handle.refetch().await);
        let recovered = wait_for(&mut rx, |s| s.status == FetchStatus::Success).await;
        assert!(recovered.error.is_none());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_rekey_cancels_in_flight_cycle() {
        let rpc = Arc::new(ScriptedRpc::default());
        // cycles for the first key hang long enough to be overtaken by the re-key
        rpc.slow_keys.lock().unwrap().push(NODE_KEY.to_string());

        let (settings, settings_rx) = tracking(Some(NODE_KEY));
        let handle = poller(rpc, Duration::from_secs(3_600)).spawn(settings_rx, CancellationToken::new());
        let mut rx = handle.subscribe();

        settings.send_modify(|s| s.validator_key = Some(UNKNOWN_KEY.to_string()));
        let state = wait_for(&mut rx, |s| s.status == FetchStatus::Success).await;

        assert_eq!(state.snapshot.validator_key.as_deref(), Some(UNKNOWN_KEY));
        assert_eq!(state.snapshot.validator_lookup, ValidatorLookup::NotFound);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_stops_polling() {
        let rpc = Arc::new(ScriptedRpc::default());
        let token = CancellationToken::new();
        let (_settings, settings_rx) = tracking(None);
        let handle = poller(rpc.clone(), Duration::from_millis(20)).spawn(settings_rx, token.clone());
        let mut rx = handle.subscribe();
        wait_for(&mut rx, |s| s.status == FetchStatus::Success).await;

        handle.shutdown().await;
        assert!(token.is_cancelled());

        let calls = rpc.base_calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(rpc.base_calls.load(Ordering::SeqCst), calls);
    }

    #[tokio::test]
    async fn test_unrelated_setting_change_keeps_session() {
        let rpc = Arc::new(ScriptedRpc::default());
        let (settings, settings_rx) = tracking(None);
        let handle = poller(rpc.clone(), Duration::from_secs(3_600)).spawn(settings_rx, CancellationToken::new());
        let mut rx = handle.subscribe();
        wait_for(&mut rx, |s| s.status == FetchStatus::Success).await;
        let calls = rpc.base_calls.load(Ordering::SeqCst);

        settings.send_modify(|s| s.alert_threshold = 80.0);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(rpc.base_calls.load(Ordering::SeqCst), calls);

        handle.shutdown().await;
    }
}
