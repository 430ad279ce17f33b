use {
    crate::rpc::types::{BlockProduction, ClusterNode, PerformanceSample, VoteAccounts, LAMPORTS_PER_SOL},
    serde::{Deserialize, Serialize},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkStats {
    pub total_validators: usize,
    pub delinquent_validators: usize,
    /// Sum of activated stake over the current (non-delinquent) set.
    pub total_stake_lamports: u64,
    pub average_skip_rate: f64,
    /// False when no block-production data was available this cycle.
    pub skip_rate_sampled: bool,
    pub tps: Option<f64>,
    pub cluster_nodes: Option<usize>,
    /// Nodes advertising a JSON-RPC address.
    pub rpc_nodes: Option<usize>,
}

impl NetworkStats {
    pub fn total_stake_sol(&self) -> f64 {
        self.total_stake_lamports as f64 / LAMPORTS_PER_SOL
    }
}

pub fn compute_network_stats(
    vote_accounts: &VoteAccounts,
    block_production: Option<&BlockProduction>,
    samples: Option<&[PerformanceSample]>,
    cluster_nodes: Option<&[ClusterNode]>,
) -> NetworkStats {
    let total_stake_lamports = vote_accounts
        .current
        .iter()
        .fold(0u64, |acc, v| acc.saturating_add(v.activated_stake));

    let (leader_slots, skipped) = block_production
        .map(|production| {
            production
                .by_identity
                .values()
                .fold((0u64, 0u64), |(leader, skipped), slots| {
                    (leader + slots.leader_slots, skipped + slots.skipped())
                })
        })
        .unwrap_or((0, 0));

    let skip_rate_sampled = leader_slots > 0;
    let average_skip_rate = if skip_rate_sampled {
        skipped as f64 / leader_slots as f64 * 100.0
    } else {
        0.0
    };

    NetworkStats {
        total_validators: vote_accounts.len(),
        delinquent_validators: vote_accounts.delinquent.len(),
        total_stake_lamports,
        average_skip_rate,
        skip_rate_sampled,
        tps: samples.and_then(transactions_per_second),
        cluster_nodes: cluster_nodes.map(|nodes| nodes.len()),
        rpc_nodes: cluster_nodes.map(|nodes| nodes.iter().filter(|node| node.rpc.is_some()).count()),
    }
}

fn transactions_per_second(samples: &[PerformanceSample]) -> Option<f64> {
    let transactions: u64 = samples.iter().map(|s| s.num_transactions).sum();
    let secs: u64 = samples.iter().map(|s| s.sample_period_secs as u64).sum();
    if secs == 0 {
        return None;
    }
    Some(transactions as f64 / secs as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::testing::{sample_vote_accounts, ScriptedRpc};
    use crate::rpc::ClusterRpc;

    #[test]
    fn test_stats_without_optional_sources() {
        let stats = compute_network_stats(&sample_vote_accounts(), None, None, None);

        assert_eq!(stats.total_validators, 2);
        assert_eq!(stats.delinquent_validators, 1);
        // delinquent stake is excluded
        assert_eq!(stats.total_stake_lamports, 100_000 * 1_000_000_000);
        assert_eq!(stats.total_stake_sol(), 100_000.0);
        assert_eq!(stats.average_skip_rate, 0.0);
        assert!(!stats.skip_rate_sampled);
        assert_eq!(stats.tps, None);
        assert_eq!(stats.cluster_nodes, None);
        assert_eq!(stats.rpc_nodes, None);
    }

    #[tokio::test]
    async fn test_stats_with_block_production_and_samples() {
        let rpc = ScriptedRpc::default();
        let production = rpc.get_block_production().await.unwrap();
        let samples = rpc.get_recent_performance_samples(5).await.unwrap();
        let nodes = rpc.get_cluster_nodes().await.unwrap();

        let stats = compute_network_stats(
            &sample_vote_accounts(),
            Some(&production),
            Some(&samples),
            Some(&nodes),
        );

        // (1 + 3) skipped of (40 + 10) leader slots
        assert!((stats.average_skip_rate - 8.0).abs() < 1e-9);
        assert!(stats.skip_rate_sampled);
        assert_eq!(stats.tps, Some(4_000.0));
        assert_eq!(stats.cluster_nodes, Some(1));
        assert_eq!(stats.rpc_nodes, Some(0));
    }

    #[test]
    fn test_counts_rpc_nodes() {
        let node = |key: &str, rpc: Option<&str>| ClusterNode {
            pubkey: key.into(),
            gossip: None,
            rpc: rpc.map(String::from),
            version: None,
        };
        let nodes = vec![
            node("a", Some("10.0.0.1:8899")),
            node("b", None),
            node("c", Some("10.0.0.3:8899")),
        ];

        let stats = compute_network_stats(&sample_vote_accounts(), None, None, Some(&nodes));
        assert_eq!(stats.cluster_nodes, Some(3));
        assert_eq!(stats.rpc_nodes, Some(2));
    }
}
