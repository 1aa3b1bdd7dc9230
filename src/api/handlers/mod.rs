pub mod async_query;

pub use async_query::AppState;
