//! Library exports for the rollcall attendance client.
/// Backend API client and wire types.
pub mod api;
/// Application directory helpers.
pub mod app_dirs;
/// Client configuration persisted as TOML.
pub mod config;
/// Role-gated navigation decisions.
pub mod guard;
/// History filters and query building.
pub mod history;
/// Shared HTTP agent and bounded response helpers.
pub mod http_client;
/// Identifier encoding normalization.
pub mod identity;
/// Logging setup.
pub mod logging;
/// Per-operation pending state.
pub mod ops;
/// Detection-to-roster reconciliation.
pub mod reconcile;
/// Screen state containers.
pub mod screens;
/// Session persistence and lifecycle.
pub mod session;
