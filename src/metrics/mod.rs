pub mod collector;
pub mod exporter;
pub mod types;

pub use collector::MetricsCollector;
pub use exporter::{render_metrics, MetricsExporter};
pub use types::*;
