pub mod backends;
mod connection;
mod records;
pub(crate) mod schema;
pub mod traits;

pub use backends::libsql::LibSqlBackend;
pub use backends::memory::InMemoryStore;
pub use connection::Database;
pub use records::{StateRecordRepository, ALERTS_KEY, MENTIONS_KEY, SETTINGS_KEY};
pub use traits::StateStore;
