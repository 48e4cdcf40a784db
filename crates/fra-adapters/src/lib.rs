//! fra-adapters: the external-collaborator contracts (spec §6).
//!
//! Per spec §1, wire adapters to individual venues and the funding-rate/
//! historical-rate discovery service are explicitly OUT of scope for this
//! core — they are "external collaborators with contracts stated in §6".
//! This crate owns exactly those contracts (traits) plus the error
//! taxonomy (§7) that every fallible core operation classifies into. It
//! does not implement a single real venue.
//!
//! A `testkit`-feature-gated [`mock`] module provides in-memory
//! implementations for use by other crates' tests (mirrors the teacher's
//! `testkit` feature convention — never enabled in a production build).

pub mod error;
pub mod historical;
pub mod venue;

#[cfg(feature = "testkit")]
pub mod mock;

pub use error::{CoreError, CoreResult};
pub use historical::{HistoricalRateFeed, VolatilityMetrics};
pub use venue::VenueAdapter;
