//! Error types for sync frame parameter resolution.

use derive_more::Display;

/// Errors surfaced by the user-sync parameter pipeline.
///
/// Used as the context type of [`error_stack::Report`]; lower level causes are
/// attached with `change_context` where they are meant to travel with the error.
#[derive(Debug, Display, derive_more::Error)]
pub enum UsersyncError {
    /// Settings could not be loaded or failed validation.
    #[display("Configuration error: {message}")]
    Configuration { message: String },

    /// The external consent source failed to deliver consent data.
    #[display("Consent fetch failed: {message}")]
    ConsentFetch { message: String },

    /// Consent could not be retrieved while it was required.
    ///
    /// The underlying fetch error is logged by the resolver, never attached.
    #[display("Error retrieving consent from AMP")]
    ConsentRetrieval,

    /// Consent data had an unexpected shape.
    #[display("Invalid consent data: {message}")]
    InvalidConsent { message: String },
}
