use {
    anyhow::{anyhow, Result},
    clap::Parser,
    dotenv::dotenv,
    log::{error, info, warn},
    std::{env, io, sync::Arc},
    tokio::sync::watch,
    tokio_util::sync::CancellationToken,
};

use crate::{
    aggregator::{
        DashboardPoller, DashboardState, InsightsMonitor, InsightsPanel, ValidatorAggregator,
    },
    alerts::UptimeAlert,
    config::{reload_lookup, Cli, DashboardConfig, LiveSettings},
    error::{retry_with_backoff, RetryPolicy},
    format::render_summary,
    jito::MevClient,
    metrics::{register_metrics, MetricsCollector, MetricsExporter},
    premium::PremiumDataClient,
    report::{slot_time_ms, Reporter},
    rpc::{ClusterRpc, SolanaRpc},
    storage::PreferenceStore,
};

mod aggregator;
mod alerts;
mod config;
mod error;
mod format;
mod jito;
mod metrics;
mod premium;
mod report;
mod rpc;
mod services;
mod storage;
mod validation;

/// SIGHUP on unix; never fires elsewhere.
struct ReloadSignal {
    #[cfg(unix)]
    hangup: tokio::signal::unix::Signal,
}

impl ReloadSignal {
    #[cfg(unix)]
    fn new() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self {
            hangup: signal(SignalKind::hangup())?,
        })
    }

    #[cfg(not(unix))]
    fn new() -> io::Result<Self> {
        Ok(Self {})
    }

    #[cfg(unix)]
    async fn recv(&mut self) -> Option<()> {
        self.hangup.recv().await
    }

    #[cfg(not(unix))]
    async fn recv(&mut self) -> Option<()> {
        std::future::pending().await
    }
}

/// Re-reads the reloadable settings and publishes them. Returns true when
/// the tracked validator changed.
fn reload_settings(settings: &watch::Sender<LiveSettings>, store: &PreferenceStore) -> bool {
    let current = settings.borrow().clone();
    let next = match current.reload(reload_lookup()) {
        Ok(next) => next,
        Err(e) => {
            warn!("Ignoring reload: {}", e.display_message());
            return false;
        }
    };
    if next == current {
        info!("Settings unchanged");
        return false;
    }

    if next.alert_threshold != current.alert_threshold {
        let threshold = next.alert_threshold;
        if let Err(e) = store.update(|prefs| prefs.alert_threshold = Some(threshold)) {
            warn!("{}", e);
        }
    }
    let rekeyed = next.validator_key != current.validator_key;
    settings.send_replace(next);
    rekeyed
}

/// Feeds committed cycles and threshold changes to the `Reporter`.
async fn report_loop(
    mut state: watch::Receiver<DashboardState>,
    insights: watch::Receiver<InsightsPanel>,
    mut settings: watch::Receiver<LiveSettings>,
    mut reporter: Reporter,
    shutdown: CancellationToken,
) {
    let mut follow_settings = true;
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            changed = settings.changed(), if follow_settings => {
                follow_settings = changed.is_ok();
                reporter.set_threshold(settings.borrow_and_update().alert_threshold);
            }
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = state.borrow_and_update().clone();
                let panel = insights.borrow().clone();
                reporter.report(&current, Some(&panel));
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info,validator_dashboard=debug");
    }
    env_logger::init();

    let cli = Cli::parse();
    let store = PreferenceStore::new(&cli.state_file);
    let prefs = store.load();
    let config = DashboardConfig::from_cli(cli, &prefs)?;

    if prefs.selected_network != Some(config.network) || prefs.alert_threshold != Some(config.alert_threshold) {
        let saved = store.update(|prefs| {
            prefs.selected_network = Some(config.network);
            prefs.alert_threshold = Some(config.alert_threshold);
        });
        if let Err(e) = saved {
            warn!("Preferences not saved: {}", e);
        }
    }
    if let Some(updated) = prefs.validator_data.as_ref().and_then(|s| s.updated_at) {
        info!("Last saved snapshot is from {}", updated);
    }

    register_metrics()?;

    let rpc_url = config.resolve_rpc_url();
    info!(
        "Starting validator dashboard on {} ({})",
        config.network,
        config.rpc_url_override.as_deref().unwrap_or("provider routing")
    );
    let rpc: Arc<dyn ClusterRpc> = Arc::new(SolanaRpc::new(&rpc_url, config.request_timeout));
    let aggregator = Arc::new(ValidatorAggregator::new(
        rpc,
        config.performance_policy.clone(),
        config.rewards_policy.clone(),
        config.performance_sample_limit,
    ));

    let mut premium = PremiumDataClient::new(config.premium.clone(), config.request_timeout)?;
    if let Some(base_url) = &config.premium_base_url {
        premium = premium.with_base_url(base_url.as_str());
    }
    let insights = InsightsMonitor::new(
        MevClient::new(&config.jito, config.request_timeout)?,
        premium,
        config.mev_poll_interval,
    );

    if let Some(key) = config.validator_key.as_deref() {
        match retry_with_backoff(RetryPolicy::default(), || aggregator.validator_exists(key)).await {
            Ok(true) => info!("Tracking validator {}", key),
            Ok(false) => warn!("Validator {} is not in the current vote account set", key),
            Err(e) => warn!("Could not check validator {}: {}", key, e.display_message()),
        }
    }

    if config.once {
        let key = config.validator_key.as_deref();
        let (result, panel) = futures::join!(aggregator.fetch_cycle(key), insights.refresh(key));

        let mut state = DashboardState::default();
        state.apply(1, result);
        println!(
            "{}",
            render_summary(&state, Some(&panel), slot_time_ms(&state, &config.performance_policy))
        );

        if let Some(error) = state.error {
            return Err(anyhow!(error.message));
        }
        if let Err(e) = store.update(|prefs| prefs.validator_data = Some(state.snapshot)) {
            warn!("Preferences not saved: {}", e);
        }
        return Ok(());
    }

    let shutdown = CancellationToken::new();
    let (settings, settings_rx) = watch::channel(config.live_settings());

    let poller = DashboardPoller::new(aggregator, config.poll_interval).spawn(settings_rx.clone(), shutdown.clone());
    let (insights_rx, insights_task) = insights.spawn(settings_rx.clone(), shutdown.clone());

    let collector_task = MetricsCollector::new().start_collection(
        poller.subscribe(),
        insights_rx.clone(),
        shutdown.clone(),
    );

    let exporter_task = config.metrics_port.map(|port| {
        let token = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = MetricsExporter::new(port).start(token).await {
                error!("{}", e);
            }
        })
    });

    let report_task = tokio::spawn(report_loop(
        poller.subscribe(),
        insights_rx,
        settings_rx,
        Reporter::new(
            store.clone(),
            UptimeAlert::new(config.alert_threshold),
            config.performance_policy.clone(),
        ),
        shutdown.clone(),
    ));

    let mut reload = ReloadSignal::new()?;
    loop {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                res?;
                break;
            }
            _ = reload.recv() => {
                info!("Reload requested");
                // a new key restarts polling on its own
                if !reload_settings(&settings, &store) {
                    poller.refetch().await;
                }
            }
        }
    }

    info!("Shutting down");
    shutdown.cancel();
    poller.shutdown().await;

    let mut tasks = vec![insights_task, collector_task, report_task];
    tasks.extend(exporter_task);
    for task in tasks {
        if let Err(e) = task.await {
            warn!("Task ended abnormally: {}", e);
        }
    }

    Ok(())
}
