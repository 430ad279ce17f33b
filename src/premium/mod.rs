pub mod client;
pub mod types;

pub use client::{PremiumDataClient, ProviderUnavailable};
pub use types::{ApiConfig, EnhancedValidatorData, Provider};
