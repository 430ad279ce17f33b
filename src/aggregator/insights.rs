use {
    crate::{
        config::LiveSettings,
        jito::{MevClient, MevData, MevReport, MevStatus, SearcherActivity},
        premium::{EnhancedValidatorData, PremiumDataClient, Provider},
    },
    chrono::{DateTime, Utc},
    log::{debug, info},
    serde::{Deserialize, Serialize},
    std::time::Duration,
    tokio::{
        sync::watch,
        task::JoinHandle,
        time::{interval, MissedTickBehavior},
    },
    tokio_util::sync::CancellationToken,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProviderData {
    #[default]
    Unconfigured,
    NotRequested,
    Available {
        data: EnhancedValidatorData,
    },
    Unavailable {
        provider: Provider,
        reason: String,
    },
}

/// MEV, searcher and premium panels. Refreshed separately from the
/// validator panel so slow providers never hold it up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightsPanel {
    pub validator_key: Option<String>,
    pub mev: MevStatus<MevData>,
    pub searchers: MevStatus<SearcherActivity>,
    pub premium: ProviderData,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for InsightsPanel {
    fn default() -> Self {
        Self {
            validator_key: None,
            mev: MevStatus::RequiresConfiguration,
            searchers: MevStatus::RequiresConfiguration,
            premium: ProviderData::Unconfigured,
            updated_at: None,
        }
    }
}

pub struct InsightsMonitor {
    mev: MevClient,
    premium: PremiumDataClient,
    interval: Duration,
}

impl InsightsMonitor {
    pub fn new(mev: MevClient, premium: PremiumDataClient, interval: Duration) -> Self {
        Self {
            mev,
            premium,
            interval,
        }
    }

    pub async fn refresh(&self, validator_key: Option<&str>) -> InsightsPanel {
        let (report, premium) = futures::join!(
            self.mev.fetch_report(validator_key),
            self.premium_data(validator_key)
        );
        let MevReport { mev, searchers } = report;

        InsightsPanel {
            validator_key: validator_key.map(String::from),
            mev,
            searchers,
            premium,
            updated_at: Some(Utc::now()),
        }
    }

    async fn premium_data(&self, validator_key: Option<&str>) -> ProviderData {
        if !self.premium.has_api_key() {
            return ProviderData::Unconfigured;
        }
        let key = match validator_key {
            Some(key) => key,
            None => return ProviderData::NotRequested,
        };
        match self.premium.enhanced_validator_data(key).await {
            Ok(Some(data)) => ProviderData::Available { data },
            Ok(None) => ProviderData::Unconfigured,
            Err(e) => ProviderData::Unavailable {
                provider: e.provider,
                reason: e.reason,
            },
        }
    }

    /// Takes the key and premium config from `settings`. Returns true when
    /// either changed, so the caller restarts its interval.
    fn apply_settings(&mut self, settings: &LiveSettings, validator_key: &mut Option<String>) -> bool {
        let mut changed = false;
        if self.premium.config() != &settings.premium {
            self.premium.update_config(settings.premium.clone());
            changed = true;
        }
        if *validator_key != settings.validator_key {
            *validator_key = settings.validator_key.clone();
            changed = true;
        }
        changed
    }

    /// Refreshes immediately, then on every interval tick until `shutdown`.
    /// A new key or premium config drops the refresh in flight and restarts
    /// the interval.
    pub fn spawn(
        mut self,
        mut settings: watch::Receiver<LiveSettings>,
        shutdown: CancellationToken,
    ) -> (watch::Receiver<InsightsPanel>, JoinHandle<()>) {
        let (tx, rx) = watch::channel(InsightsPanel::default());

        let task = tokio::spawn(async move {
            let mut validator_key = None;
            self.apply_settings(&settings.borrow_and_update(), &mut validator_key);
            let mut follow_settings = true;

            info!(
                "Refreshing MEV and provider data every {}s (block engine key {})",
                self.interval.as_secs(),
                if self.mev.has_api_key() { "configured" } else { "missing" }
            );

            'session: loop {
                let mut ticker = interval(self.interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

                loop {
                    tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => break 'session,
                        changed = settings.changed(), if follow_settings => {
                            follow_settings = changed.is_ok();
                            if follow_settings && self.apply_settings(&settings.borrow_and_update(), &mut validator_key) {
                                continue 'session;
                            }
                            continue;
                        }
                        _ = ticker.tick() => {}
                    }

                    let panel = tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => break 'session,
                        changed = settings.changed(), if follow_settings => {
                            follow_settings = changed.is_ok();
                            if follow_settings {
                                self.apply_settings(&settings.borrow_and_update(), &mut validator_key);
                            }
                            continue 'session;
                        }
                        panel = self.refresh(validator_key.as_deref()) => panel,
                    };
                    debug!("MEV panel: {}", panel.mev.label());
                    tx.send_replace(panel);
                }
            }
            debug!("Insights monitor stopped");
        });

        (rx, task)
    }
}
