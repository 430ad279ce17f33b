use {
    lazy_static::lazy_static,
    log::debug,
    prometheus::{Gauge, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry},
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Poll metrics
    pub static ref POLL_CYCLES_TOTAL: IntCounterVec =
        IntCounterVec::new(
            Opts::new("dashboard_poll_cycles_total", "Poll cycles by outcome"),
            &["outcome"]
        ).unwrap();

    pub static ref POLL_ERRORS: IntCounterVec =
        IntCounterVec::new(
            Opts::new("dashboard_poll_errors_total", "Committed poll failures by error kind"),
            &["kind"]
        ).unwrap();

    pub static ref RPC_LATENCY: HistogramVec =
        HistogramVec::new(
            HistogramOpts::new("dashboard_rpc_latency_ms", "RPC request latency in milliseconds")
                .buckets(vec![5.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1_000.0, 2_500.0, 5_000.0, 10_000.0]),
            &["method"]
        ).unwrap();

    // Validator metrics
    pub static ref VALIDATOR_UPTIME: Gauge =
        Gauge::new("validator_uptime_percent", "Tracked validator uptime").unwrap();

    pub static ref VALIDATOR_VOTE_SUCCESS: Gauge =
        Gauge::new("validator_vote_success_percent", "Tracked validator vote success rate").unwrap();

    pub static ref VALIDATOR_SKIP_RATE: Gauge =
        Gauge::new("validator_skip_rate_percent", "Tracked validator skip rate").unwrap();

    pub static ref VALIDATOR_COMMISSION: IntGauge =
        IntGauge::new("validator_commission_percent", "Tracked validator commission").unwrap();

    pub static ref VALIDATOR_APR: Gauge =
        Gauge::new("validator_apr_percent", "Commission-adjusted staking APR").unwrap();

    pub static ref VALIDATOR_ACTIVATED_STAKE: Gauge =
        Gauge::new("validator_activated_stake_sol", "Tracked validator activated stake in SOL").unwrap();

    pub static ref VALIDATOR_FOUND: IntGauge =
        IntGauge::new("validator_found", "1 when the tracked validator is in the vote account set").unwrap();

    // Network metrics
    pub static ref NETWORK_VALIDATORS: IntGauge =
        IntGauge::new("network_validators", "Current plus delinquent validators").unwrap();

    pub static ref NETWORK_DELINQUENT: IntGauge =
        IntGauge::new("network_delinquent_validators", "Delinquent validators").unwrap();

    pub static ref NETWORK_STAKE: Gauge =
        Gauge::new("network_active_stake_sol", "Activated stake of current validators in SOL").unwrap();

    pub static ref NETWORK_TPS: Gauge =
        Gauge::new("network_tps", "Transactions per second from recent performance samples").unwrap();

    pub static ref EPOCH: IntGauge =
        IntGauge::new("epoch", "Current epoch").unwrap();

    pub static ref EPOCH_PROGRESS: Gauge =
        Gauge::new("epoch_progress_percent", "Progress through the current epoch").unwrap();

    // MEV metrics
    pub static ref MEV_AVAILABLE: IntGauge =
        IntGauge::new("mev_data_available", "1 when personalized MEV data was fetched").unwrap();
}

/// Registers every dashboard metric. Safe to call more than once.
pub fn register_metrics() -> Result<(), prometheus::Error> {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(POLL_CYCLES_TOTAL.clone()),
        Box::new(POLL_ERRORS.clone()),
        Box::new(RPC_LATENCY.clone()),
        Box::new(VALIDATOR_UPTIME.clone()),
        Box::new(VALIDATOR_VOTE_SUCCESS.clone()),
        Box::new(VALIDATOR_SKIP_RATE.clone()),
        Box::new(VALIDATOR_COMMISSION.clone()),
        Box::new(VALIDATOR_APR.clone()),
        Box::new(VALIDATOR_ACTIVATED_STAKE.clone()),
        Box::new(VALIDATOR_FOUND.clone()),
        Box::new(NETWORK_VALIDATORS.clone()),
        Box::new(NETWORK_DELINQUENT.clone()),
        Box::new(NETWORK_STAKE.clone()),
        Box::new(NETWORK_TPS.clone()),
        Box::new(EPOCH.clone()),
        Box::new(EPOCH_PROGRESS.clone()),
        Box::new(MEV_AVAILABLE.clone()),
    ];

    for collector in collectors {
        match REGISTRY.register(collector) {
            Ok(()) => {}
            Err(prometheus::Error::AlreadyReg) => debug!("Metric already registered"),
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
