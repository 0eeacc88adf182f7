//! Domain types and pure logic for the guild XP / economy system.
//!
//! This crate has zero internal dependencies so it can be shared by the
//! database layer, the cache layer, the reward pipelines and any tooling.

pub mod catalog;
pub mod config;
pub mod error;
pub mod leveling;
pub mod merge;
pub mod profile;
pub mod tracked;
pub mod types;
