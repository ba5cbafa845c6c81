pub mod alerts;
pub mod metrics;
mod refresh;

pub use refresh::AutoRefreshManager;
