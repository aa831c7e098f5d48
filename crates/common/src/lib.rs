//! Query parameter resolution for the Prebid Server user-sync frame.
//!
//! The frame is loaded with its configuration on the query string. This crate
//! turns those parameters into a typed [`params::SyncConfig`] and, for AMP
//! pages, resolves consent through an external consent source.
//!
//! # Modules
//!
//! - [`constants`]: Endpoint aliases, limits and parameter names
//! - [`consent`]: Consent fetch decision and merging
//! - [`error`]: Error types and error handling utilities
//! - [`logging`]: Debug-gated diagnostic sinks
//! - [`params`]: Parameter normalization into [`params::SyncConfig`]
//! - [`query`]: Query string access and lenient value coercion
//! - [`settings`]: Configuration management and validation
//! - [`test_support`]: Testing utilities and mocks
//! - [`url_check`]: Endpoint URL validation

pub mod consent;
pub mod constants;
pub mod error;
pub mod logging;
pub mod params;
pub mod query;
pub mod settings;
pub mod url_check;
