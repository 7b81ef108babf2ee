//! Core types and reconciliation logic for the Trackline shipment tracker.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.
//!
//! The hard part lives in [`history`] and [`selector`]: folding an
//! append-only, possibly out-of-order, possibly duplicated stream of carrier
//! status reports into a canonical timeline, and deciding which single status
//! change to push downstream next so the consumer never sees a duplicate or
//! stale notification.

pub mod error;
pub mod history;
pub mod notify;
pub mod scheduler;
pub mod selector;
pub mod status;
pub mod store;
pub mod track;

pub use error::{Error, Result};
