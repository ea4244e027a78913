pub mod json_store;
pub mod memory_store;
pub mod observability;

pub use json_store::*;
pub use memory_store::*;
pub use observability::*;
