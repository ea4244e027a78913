//! Shared test utilities for the jobq workspace
//!
//! Provides builders for test entities, canned job handlers and polling
//! helpers so integration tests stay free of setup boilerplate.

pub mod builders;
pub mod handlers;
pub mod helpers;
pub mod mocks;

pub use builders::*;
pub use handlers::*;
pub use helpers::*;
pub use mocks::*;
