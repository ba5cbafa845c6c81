mod alert;
mod events;
mod mention;
mod metrics;
mod settings;

pub use alert::*;
pub use events::*;
pub use mention::*;
pub use metrics::*;
pub use settings::*;
