//! Periodicity explorer
//!
//! Connects to a periodicity service over a WebSocket and shows, for every
//! candidate period of a temporal point dataset, how strongly the points
//! cluster in phase:
//! - Scented widget: per-period phase histograms around the selected period
//! - Time slider: logarithmic period axis with points of interest
//! - Suggestions: harmonics and subharmonics that cluster better
//!
//! `core` is platform-agnostic and needs no features. The socket client,
//! discovery and time helpers come with `cli`, the egui app with `gui`.

pub mod core;

#[cfg(feature = "cli")]
pub mod config;
#[cfg(feature = "cli")]
pub mod discovery;
#[cfg(feature = "cli")]
pub mod time;
#[cfg(feature = "cli")]
pub mod websocket_native;
#[cfg(feature = "cli")]
pub mod ws_state;

#[cfg(feature = "gui")]
pub mod app;
#[cfg(feature = "gui")]
pub mod theme;
