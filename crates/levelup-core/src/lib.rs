//! levelup-core — Quiz progression, scoring and controller core.
//!
//! This crate defines the data model, the scenario bank, scoring, the
//! progression engine and the controller that the rest of levelup builds on.
//! Persistence and rendering are injected through the traits in [`traits`].

pub mod bank;
pub mod controller;
pub mod engine;
pub mod error;
pub mod model;
pub mod report;
pub mod scoring;
pub mod traits;

#[cfg(test)]
mod fixtures;
