//! URL validity predicate used for the `endpoint` parameter.

use url::Url;

/// Decides whether a string is usable as an endpoint URL.
pub trait UrlValidator {
    fn is_valid_url(&self, candidate: &str) -> bool;
}

/// Accepts any absolute URL the WHATWG parser accepts.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParsedUrlValidator;

impl UrlValidator for ParsedUrlValidator {
    fn is_valid_url(&self, candidate: &str) -> bool {
        Url::parse(candidate).is_ok()
    }
}

impl<F> UrlValidator for F
where
    F: Fn(&str) -> bool,
{
    fn is_valid_url(&self, candidate: &str) -> bool {
        self(candidate)
    }
}
