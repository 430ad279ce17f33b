use {
    crate::{
        aggregator::{
            insights::{InsightsPanel, ProviderData},
            state::{DashboardState, FetchStatus, ValidatorLookup},
        },
        services::{PerformanceThresholds, Rating},
    },
    chrono::{DateTime, Utc},
    std::fmt::Write,
};

pub fn format_sol(amount: f64, decimals: usize) -> String {
    if amount >= 1_000_000.0 {
        format!("{:.*}M SOL", decimals, amount / 1_000_000.0)
    } else if amount >= 1_000.0 {
        format!("{:.*}K SOL", decimals, amount / 1_000.0)
    } else {
        format!("{:.*} SOL", decimals, amount)
    }
}

pub fn format_percentage(value: f64, decimals: usize) -> String {
    format!("{:.*}%", decimals, value)
}

/// `AbCdEfGh...WxYz1234` for keys longer than both ends combined.
pub fn format_public_key(key: &str, start_chars: usize, end_chars: usize) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= start_chars + end_chars {
        return key.to_string();
    }
    let head: String = chars[..start_chars].iter().collect();
    let tail: String = chars[chars.len() - end_chars..].iter().collect();
    format!("{}...{}", head, tail)
}

pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3_600;
    let minutes = (seconds % 3_600) / 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m", minutes)
    } else {
        format!("{}s", seconds)
    }
}

pub fn format_time_ago(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - at).num_seconds().max(0);
    match secs {
        s if s < 60 => format!("{}s ago", s),
        s if s < 3_600 => format!("{}m ago", s / 60),
        s if s < 86_400 => format!("{}h ago", s / 3_600),
        s => format!("{}d ago", s / 86_400),
    }
}

fn rating_label(rating: Rating) -> &'static str {
    match rating {
        Rating::Excellent => "excellent",
        Rating::Good => "good",
        Rating::Poor => "poor",
    }
}

/// Multi-line text rendering of the current state, used for logs and `--once`.
pub fn render_summary(
    state: &DashboardState,
    insights: Option<&InsightsPanel>,
    slot_time_ms: f64,
) -> String {
    let mut out = String::new();
    let snapshot = &state.snapshot;

    let _ = write!(out, "status: {:?}", state.status);
    if let Some(updated) = snapshot.updated_at {
        let _ = write!(out, " (updated {})", format_time_ago(updated, Utc::now()));
    }
    out.push('\n');
    if state.status == FetchStatus::Error {
        if let Some(error) = &state.error {
            let _ = writeln!(out, "error: {}", error.message);
        }
    }

    if let Some(epoch) = &snapshot.epoch_info {
        let remaining_secs = (epoch.slots_remaining() as f64 * slot_time_ms / 1_000.0) as u64;
        let _ = writeln!(
            out,
            "epoch {}: {} complete, ~{} left",
            epoch.epoch,
            format_percentage(epoch.progress_percent(), 1),
            format_duration(remaining_secs)
        );
    }
    if let Some(slot) = snapshot.current_slot {
        let _ = writeln!(out, "slot: {}", slot);
    }
    if let Some(version) = &snapshot.version {
        let _ = writeln!(out, "node version: {}", version.solana_core);
    }

    if let Some(stats) = &snapshot.network_stats {
        let _ = writeln!(
            out,
            "network: {} validators ({} delinquent), {} active stake, skip rate {}{}",
            stats.total_validators,
            stats.delinquent_validators,
            format_sol(stats.total_stake_sol(), 2),
            format_percentage(stats.average_skip_rate, 2),
            if stats.skip_rate_sampled { "" } else { " (no data)" }
        );
        if let Some(tps) = stats.tps {
            let _ = writeln!(out, "tps: {:.0}", tps);
        }
        if let Some(nodes) = stats.cluster_nodes {
            let _ = writeln!(out, "nodes: {} ({} rpc)", nodes, stats.rpc_nodes.unwrap_or(0));
        }
    }

    match &snapshot.validator_lookup {
        ValidatorLookup::NotRequested | ValidatorLookup::Found => {}
        ValidatorLookup::NotFound => {
            let key = snapshot.validator_key.as_deref().unwrap_or_default();
            let _ = writeln!(out, "validator {}: not found", format_public_key(key, 8, 8));
        }
        ValidatorLookup::Invalid(reason) => {
            let _ = writeln!(out, "validator: invalid key ({})", reason);
        }
        ValidatorLookup::Unavailable(reason) => {
            let _ = writeln!(out, "validator: unavailable ({})", reason);
        }
    }

    if let Some(validator) = &snapshot.validator {
        let thresholds = PerformanceThresholds::default();
        let perf = &validator.performance;
        let _ = writeln!(
            out,
            "validator {} ({:?})",
            format_public_key(&validator.record.identity, 8, 8),
            validator.record.status
        );
        let _ = writeln!(
            out,
            "  credits {} over {} epochs, last vote {}",
            validator.record.total_credits(),
            validator.record.epoch_credits.len(),
            validator.record.last_vote
        );
        let _ = writeln!(
            out,
            "  uptime {} [{}], vote success {} [{}], skip rate {} [{}]",
            format_percentage(perf.uptime, 2),
            rating_label(thresholds.rate_uptime(perf.uptime)),
            format_percentage(perf.vote_success_rate, 2),
            rating_label(thresholds.rate_vote_success(perf.vote_success_rate)),
            format_percentage(perf.skip_rate, 2),
            rating_label(thresholds.rate_skip_rate(perf.skip_rate)),
        );
        let _ = writeln!(
            out,
            "  stake {} (activated {}), commission {}%, apr {}",
            format_sol(validator.stake.total_stake, 2),
            format_sol(validator.stake.activated_stake, 2),
            validator.stake.commission,
            format_percentage(validator.stake.apr, 2)
        );
        let _ = writeln!(
            out,
            "  est. rewards {}/epoch, {} over horizon",
            format_sol(validator.rewards.epoch_rewards, 3),
            format_sol(validator.rewards.total_rewards, 2)
        );
    }

    if let Some(panel) = insights {
        match panel.mev.data() {
            Some(mev) => {
                let _ = writeln!(
                    out,
                    "mev ({}): {} captured, {} bundles landed, +{} apr",
                    panel.mev.label(),
                    format_sol(mev.mev_captured_sol, 2),
                    format_percentage(mev.bundle_success_rate, 1),
                    format_percentage(mev.additional_apr, 2)
                );
            }
            None => {
                let _ = writeln!(out, "mev: {}", panel.mev.label());
            }
        }
        if let Some(activity) = panel.searchers.data() {
            let _ = writeln!(
                out,
                "searchers ({}): {} opportunities, {} bots, {} liquidations",
                panel.searchers.label(),
                activity.opportunities_detected,
                activity.arbitrage_bots,
                activity.liquidation_events
            );
        }
        match &panel.premium {
            ProviderData::Available { data } => {
                let _ = writeln!(
                    out,
                    "provider: {}",
                    data.name.as_deref().unwrap_or("(unnamed validator)")
                );
            }
            ProviderData::Unavailable { provider, reason } => {
                let _ = writeln!(out, "provider: {} unavailable ({})", provider, reason);
            }
            ProviderData::Unconfigured | ProviderData::NotRequested => {}
        }
    }

    out
}
