//! Household vehicle compliance tracking.
//!
//! The crate is split into two domains: `accounts` (users, households,
//! sessions, reminder preferences) and `fleet` (cars, renewal records, and
//! the upcoming-renewal derivation engine that powers the compliance
//! report). Repository traits keep both service facades storage-agnostic.

pub mod accounts;
pub mod config;
pub mod error;
pub mod fleet;
pub mod storage;
pub mod telemetry;
