pub mod client;
pub mod types;

pub use client::MevClient;
pub use types::{MevData, MevReport, MevStatus, SearcherActivity};
