use {
    crate::{
        error::DashboardError,
        metrics::RPC_LATENCY,
        rpc::types::{
            BlockProduction, ClusterNode, EpochSnapshot, NodeVersion, PerformanceSample,
            StakeActivation, VoteAccounts,
        },
    },
    async_trait::async_trait,
    log::debug,
    serde_json::json,
    solana_client::{
        client_error::Result as ClientResult, nonblocking::rpc_client::RpcClient,
        rpc_request::RpcRequest,
    },
    solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey},
    std::{
        future::Future,
        sync::Arc,
        time::{Duration, Instant},
    },
};

/// Read-only view of a Solana cluster. Calls are single round-trips with no
/// retry; callers decide how to degrade.
#[async_trait]
pub trait ClusterRpc: Send + Sync {
    fn endpoint(&self) -> String;

    async fn get_epoch_info(&self) -> Result<EpochSnapshot, DashboardError>;

    async fn get_slot(&self) -> Result<u64, DashboardError>;

    async fn get_version(&self) -> Result<NodeVersion, DashboardError>;

    async fn get_vote_accounts(&self) -> Result<VoteAccounts, DashboardError>;

    async fn get_stake_activation(&self, pubkey: &Pubkey) -> Result<StakeActivation, DashboardError>;

    async fn get_cluster_nodes(&self) -> Result<Vec<ClusterNode>, DashboardError>;

    async fn get_recent_performance_samples(
        &self,
        limit: usize,
    ) -> Result<Vec<PerformanceSample>, DashboardError>;

    async fn get_block_production(&self) -> Result<BlockProduction, DashboardError>;
}

/// `ClusterRpc` backed by the nonblocking solana-client `RpcClient`.
#[derive(Clone)]
pub struct SolanaRpc {
    client: Arc<RpcClient>,
    endpoint: String,
}

impl SolanaRpc {
    pub fn new(endpoint: &str, timeout: Duration) -> Self {
        let client = RpcClient::new_with_timeout_and_commitment(
            endpoint.to_string(),
            timeout,
            CommitmentConfig::confirmed(),
        );
        Self {
            client: Arc::new(client),
            endpoint: endpoint.to_string(),
        }
    }

    async fn timed<T, F>(&self, method: &'static str, call: F) -> Result<T, DashboardError>
    where
        F: Future<Output = ClientResult<T>>,
    {
        let start = Instant::now();
        let result = call.await;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        RPC_LATENCY.with_label_values(&[method]).observe(elapsed_ms);

        match result {
            Ok(value) => {
                debug!("{} completed in {:.1} ms", method, elapsed_ms);
                Ok(value)
            }
            Err(e) => {
                debug!("{} failed after {:.1} ms: {}", method, elapsed_ms, e);
                Err(DashboardError::from(e))
            }
        }
    }
}

#[async_trait]
impl ClusterRpc for SolanaRpc {
    fn endpoint(&self) -> String {
        self.endpoint.clone()
    }

    async fn get_epoch_info(&self) -> Result<EpochSnapshot, DashboardError> {
        self.timed("getEpochInfo", self.client.get_epoch_info())
            .await
            .map(EpochSnapshot::from)
    }

    async fn get_slot(&self) -> Result<u64, DashboardError> {
        self.timed("getSlot", self.client.get_slot()).await
    }

    async fn get_version(&self) -> Result<NodeVersion, DashboardError> {
        self.timed("getVersion", self.client.get_version())
            .await
            .map(NodeVersion::from)
    }

    async fn get_vote_accounts(&self) -> Result<VoteAccounts, DashboardError> {
        self.timed("getVoteAccounts", self.client.get_vote_accounts())
            .await
            .map(VoteAccounts::from)
    }

    async fn get_stake_activation(&self, pubkey: &Pubkey) -> Result<StakeActivation, DashboardError> {
        // solana-client no longer wraps this method, so it goes out as a raw request
        let params = json!([pubkey.to_string(), { "commitment": "confirmed" }]);
        self.timed(
            "getStakeActivation",
            self.client.send::<StakeActivation>(
                RpcRequest::Custom {
                    method: "getStakeActivation",
                },
                params,
            ),
        )
        .await
    }

    async fn get_cluster_nodes(&self) -> Result<Vec<ClusterNode>, DashboardError> {
        self.timed("getClusterNodes", self.client.get_cluster_nodes())
            .await
            .map(|nodes| nodes.into_iter().map(ClusterNode::from).collect())
    }

    async fn get_recent_performance_samples(
        &self,
        limit: usize,
    ) -> Result<Vec<PerformanceSample>, DashboardError> {
        self.timed(
            "getRecentPerformanceSamples",
            self.client.get_recent_performance_samples(Some(limit)),
        )
        .await
        .map(|samples| samples.into_iter().map(PerformanceSample::from).collect())
    }

    async fn get_block_production(&self) -> Result<BlockProduction, DashboardError> {
        self.timed("getBlockProduction", self.client.get_block_production())
            .await
            .map(|response| BlockProduction::from(response.value))
    }
}
