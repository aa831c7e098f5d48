//! Read-only access to the frame's query string and the lenient scalar
//! coercions applied to its values.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static LEADING_INT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([+-]?[0-9]+)").expect("valid leading integer regex"));

static ALL_DIGITS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+$").expect("valid all-digits regex"));

/// Decoded key/value pairs of a query string.
///
/// Lookups return the first value of a repeated key, the way a browser's
/// `URLSearchParams::get` does.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Parses a raw query string, with or without the leading `?`.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let pairs = url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self { pairs }
    }

    /// Uses the query part of a full URL.
    pub fn from_url(url: &Url) -> Self {
        let pairs = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self { pairs }
    }

    /// First value for `name`, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// First non-empty value for `name`.
    ///
    /// An empty value is treated like a missing one.
    pub fn get_non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.is_empty())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Parses the leading integer of `value`.
///
/// Leading whitespace and a sign are accepted and anything after the digits is
/// ignored, so `"12abc"` yields 12. Returns `None` when no digits lead the
/// value or the number does not fit an `i64`.
pub fn to_int(value: &str) -> Option<i64> {
    LEADING_INT_PATTERN
        .captures(value)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// True when `value` is a non-empty run of ASCII digits.
pub fn is_all_digits(value: &str) -> bool {
    ALL_DIGITS_PATTERN.is_match(value)
}

/// Splits a comma separated list, dropping empty entries.
pub fn split_commas(value: Option<&str>) -> Vec<&str> {
    value
        .unwrap_or_default()
        .split(',')
        .filter(|token| !token.is_empty())
        .collect()
}

/// Explicit reading of a boolean-ish parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    /// Parameter missing or empty.
    Absent,
    /// Literal `"true"` or a nonzero integer.
    True,
    /// Anything else, including `"false"`, `"0"` and `"00"`.
    False,
}

impl Flag {
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            None | Some("") => Flag::Absent,
            Some("true") => Flag::True,
            Some(other) => match to_int(other) {
                Some(n) if n != 0 => Flag::True,
                _ => Flag::False,
            },
        }
    }

    /// Resolves the flag, using `default` when it is absent.
    pub fn or(self, default: bool) -> bool {
        match self {
            Flag::Absent => default,
            Flag::True => true,
            Flag::False => false,
        }
    }
}
