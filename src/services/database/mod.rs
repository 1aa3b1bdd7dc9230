// Backend execution layer
pub mod adapter;
pub mod mysql;

pub use adapter::{BackendResult, QueryExecutor};
pub use mysql::MySqlExecutor;
