pub mod entities;
pub mod errors;
pub mod ports;
pub mod repositories;

pub use entities::*;
pub use errors::{QueueError, QueueResult};
pub use ports::*;
pub use repositories::*;
