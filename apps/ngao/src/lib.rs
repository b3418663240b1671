//! # ngao
//!
//! The NGAO MIS service: the HTTP API, configuration and seeding around
//! the `ngao-core` workflow engine.

pub mod api;
pub mod config;
pub mod delivery;
pub mod seed;
