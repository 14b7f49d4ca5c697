//! Recurring HTTP uptime monitoring.
//!
//! A [`engine::Runner`] executes every [`models::Check`] concurrently, feeds
//! each result through the configured [`reporters::Reporter`]s and then
//! records it in a process-wide [`tracker::DownCounter`].

pub mod config;
pub mod engine;
pub mod models;
pub mod probe;
pub mod reporters;
pub mod tracker;
