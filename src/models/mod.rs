pub mod catalog;
pub mod parsed;
pub mod query;

pub use catalog::*;
pub use parsed::*;
pub use query::*;
