pub mod cycle;
pub mod insights;
pub mod poller;
pub mod state;

pub use cycle::ValidatorAggregator;
pub use insights::{InsightsMonitor, InsightsPanel, ProviderData};
pub use poller::{DashboardPoller, PollerHandle, StateCommitter};
pub use state::{DashboardSnapshot, DashboardState, FetchStatus, PanelError, ValidatorInfo, ValidatorLookup};
