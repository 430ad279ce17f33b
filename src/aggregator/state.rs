use {
    crate::{
        error::{DashboardError, ErrorKind},
        rpc::types::{EpochSnapshot, NodeVersion, StakeActivation, ValidatorRecord},
        services::{NetworkStats, PerformanceMetrics, RewardsInfo, StakeInfo},
    },
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

/// Outcome of the validator-specific part of a cycle. None of these are
/// top-level errors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum ValidatorLookup {
    #[default]
    NotRequested,
    Found,
    NotFound,
    Invalid(String),
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorInfo {
    pub record: ValidatorRecord,
    pub stake_activation: Option<StakeActivation>,
    pub node_version: Option<String>,
    pub performance: PerformanceMetrics,
    pub stake: StakeInfo,
    pub rewards: RewardsInfo,
}

/// One complete aggregation result. Always replaced as a whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub epoch_info: Option<EpochSnapshot>,
    pub current_slot: Option<u64>,
    pub version: Option<NodeVersion>,
    pub validator: Option<ValidatorInfo>,
    pub validator_lookup: ValidatorLookup,
    pub network_stats: Option<NetworkStats>,
    pub validator_key: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// What a panel shows when its fetch failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelError {
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl From<&DashboardError> for PanelError {
    fn from(err: &DashboardError) -> Self {
        Self {
            kind: err.kind(),
            message: err.display_message(),
            retryable: err.is_retryable(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    pub status: FetchStatus,
    pub is_loading: bool,
    pub error: Option<PanelError>,
    pub snapshot: DashboardSnapshot,
    /// Sequence number of the cycle that produced `snapshot` or `error`.
    pub committed_sequence: u64,
}

impl DashboardState {
    pub fn begin_loading(&mut self) {
        self.status = FetchStatus::Loading;
        self.is_loading = true;
    }

    /// Success replaces the snapshot wholesale; failure keeps the previous one.
    pub fn apply(&mut self, sequence: u64, result: Result<DashboardSnapshot, DashboardError>) {
        self.committed_sequence = sequence;
        self.is_loading = false;
        match result {
            Ok(snapshot) => {
                self.status = FetchStatus::Success;
                self.error = None;
                self.snapshot = snapshot;
            }
            Err(e) => {
                self.status = FetchStatus::Error;
                self.error = Some(PanelError::from(&e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(slot: u64) -> DashboardSnapshot {
        DashboardSnapshot {
            current_slot: Some(slot),
            ..Default::default()
        }
    }

    #[test]
    fn test_state_transitions() {
        let mut state = DashboardState::default();
        assert_eq!(state.status, FetchStatus::Idle);

        state.begin_loading();
        assert_eq!(state.status, FetchStatus::Loading);
        assert!(state.is_loading);

        state.apply(1, Ok(snapshot(10)));
        assert_eq!(state.status, FetchStatus::Success);
        assert!(!state.is_loading);
        assert_eq!(state.snapshot.current_slot, Some(10));

        state.begin_loading();
        state.apply(2, Err(DashboardError::Network("connection refused".into())));
        assert_eq!(state.status, FetchStatus::Error);
        assert!(!state.is_loading);
        let error = state.error.clone().unwrap();
        assert!(error.retryable);
        assert!(!error.message.is_empty());
        // previous snapshot stays visible next to the error
        assert_eq!(state.snapshot.current_slot, Some(10));

        state.begin_loading();
        state.apply(3, Ok(snapshot(11)));
        assert_eq!(state.status, FetchStatus::Success);
        assert!(state.error.is_none());
        assert_eq!(state.committed_sequence, 3);
    }

    #[test]
    fn test_lookup_serializes_tagged() {
        let json = serde_json::to_string(&ValidatorLookup::Invalid("bad key".into())).unwrap();
        assert_eq!(json, r#"{"status":"invalid","reason":"bad key"}"#);
        let json = serde_json::to_string(&ValidatorLookup::NotFound).unwrap();
        assert_eq!(json, r#"{"status":"not_found"}"#);
    }
}
