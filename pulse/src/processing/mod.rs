pub mod filter;
mod pipeline;

pub use filter::{filter_mentions, merge_capped};
pub use pipeline::{CycleReport, MonitorPipeline};
