//! CLI command implementations.

pub mod capture;
pub mod modules;
pub mod outbox;
