//! ritquiz-core: adaptive item selection, scoring, and the session state machine.
//!
//! This crate defines the item bank model, the selection and scoring rules,
//! and the session lifecycle that the rest of ritquiz builds on. Storage and
//! presentation are reached through the ports in [`traits`].

pub mod bank;
pub mod error;
pub mod model;
pub mod record;
pub mod runner;
pub mod scorer;
pub mod selector;
pub mod session;
pub mod simulate;
pub mod statistics;
pub mod traits;

#[cfg(test)]
mod testing;
