pub mod client;
pub mod types;

#[cfg(test)]
pub mod testing;

pub use client::{ClusterRpc, SolanaRpc};
pub use types::*;
