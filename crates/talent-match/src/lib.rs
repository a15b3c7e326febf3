//! Backend for a talent-matching marketplace.
//!
//! Talents and companies apply through public forms, admins review and move
//! them through status pipelines, and companies open hiring requests that get
//! matched to talents. Rows, files, and identity live in a hosted backend
//! reached through the traits in [`marketplace::repository`]; [`adapters`]
//! provides hosted and in-memory implementations.

pub mod adapters;
pub mod config;
pub mod error;
pub mod marketplace;
pub mod telemetry;
