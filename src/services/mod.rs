pub mod analyzer;
pub mod async_query;
pub mod connection_pool;
pub mod database; // Backend execution
pub mod instance_resolver;
pub mod metadata_helper;
pub mod query_registry;
pub mod query_task;
pub mod result_store;
pub mod rewriter;
pub mod statement;

pub use analyzer::*;
pub use async_query::*;
pub use connection_pool::*;
pub use instance_resolver::*;
pub use metadata_helper::*;
pub use query_registry::*;
pub use query_task::*;
pub use result_store::*;
pub use rewriter::*;
