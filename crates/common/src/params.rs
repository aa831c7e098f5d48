//! Normalization of the sync frame's query parameters.
//!
//! [`ParamNormalizer::normalize`] turns the raw parameters into a [`SyncConfig`].
//! It never fails: every field has a default or a safe fallback, and the only
//! side effect is a diagnostic when the requested endpoint is not a valid URL.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::constants::{
    endpoint_for_alias, DEFAULT_ENDPOINT_ALIAS, DEFAULT_LIMIT, FALLBACK_ENDPOINT, NO_LIMIT,
    PARAM_ARGS, PARAM_BIDDERS, PARAM_COOP_SYNC, PARAM_DEBUG, PARAM_DEFAULT_GDPR_SCOPE,
    PARAM_ENDPOINT, PARAM_GDPR, PARAM_GDPR_CONSENT, PARAM_GPP, PARAM_GPP_SID,
    PARAM_MAX_SYNC_COUNT, PARAM_SOURCE, PARAM_TIMEOUT, SOURCE_AMP,
};
use crate::logging::{DebugLogFactory, DiagnosticLog, LogFactory};
use crate::query::{is_all_digits, split_commas, to_int, Flag, QueryParams};
use crate::url_check::{ParsedUrlValidator, UrlValidator};

/// Value of a single `args` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ArgValue {
    Int(i64),
    Str(String),
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        ArgValue::Int(value)
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::Str(value.to_string())
    }
}

/// Extra key/value arguments forwarded with the cookie-sync request.
///
/// Keeps first-insertion order; inserting an existing key replaces its value
/// in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncArgs {
    entries: Vec<(String, ArgValue)>,
}

impl SyncArgs {
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ArgValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ArgValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for SyncArgs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Fully normalized sync frame configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncConfig {
    pub debug: bool,
    /// Cookie-sync endpoint; always a valid URL.
    pub endpoint: String,
    pub args: SyncArgs,
    /// Bidder filter. `None` means no filter, never an empty list.
    pub bidders: Option<Vec<String>>,
    /// Maximum number of syncs, [`NO_LIMIT`] when uncapped.
    pub limit: i64,
    #[serde(rename = "isAmp")]
    pub is_amp: bool,
    #[serde(rename = "coopSync")]
    pub coop_sync: bool,
    /// GDPR applicability, 0 or 1.
    pub gdpr: Option<u8>,
    pub gdpr_consent: Option<String>,
    /// Scope assumed when consent can not be retrieved, 0 or 1.
    #[serde(rename = "defaultGdprScope")]
    pub default_gdpr_scope: Option<u8>,
    pub gpp_sid: Option<String>,
    pub gpp: Option<String>,
    /// Consent fetch timeout in milliseconds.
    pub timeout: Option<i64>,
    /// Consent keys merged by the resolver that have no dedicated field.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Builds a [`SyncConfig`] from raw query parameters.
///
/// The URL validator and the diagnostic sink are explicit dependencies;
/// [`ParamNormalizer::default`] wires the production implementations.
#[derive(Debug, Clone)]
pub struct ParamNormalizer<V = ParsedUrlValidator, L = DebugLogFactory> {
    validator: V,
    log_factory: L,
}

impl Default for ParamNormalizer {
    fn default() -> Self {
        Self::new(ParsedUrlValidator, DebugLogFactory)
    }
}

impl<V: UrlValidator, L: LogFactory> ParamNormalizer<V, L> {
    pub fn new(validator: V, log_factory: L) -> Self {
        Self {
            validator,
            log_factory,
        }
    }

    pub fn log_factory(&self) -> &L {
        &self.log_factory
    }

    /// Normalizes every field of the frame configuration.
    pub fn normalize(&self, params: &QueryParams) -> SyncConfig {
        let debug = params.get_non_empty(PARAM_DEBUG).is_some();
        let log = self.log_factory.logger(debug);

        SyncConfig {
            debug,
            endpoint: self.resolve_endpoint(params.get(PARAM_ENDPOINT), log.as_ref()),
            args: parse_args(params.get(PARAM_ARGS)),
            bidders: parse_bidders(params.get(PARAM_BIDDERS)),
            limit: parse_limit(params.get(PARAM_MAX_SYNC_COUNT)),
            is_amp: params
                .get(PARAM_SOURCE)
                .is_some_and(|source| source.to_lowercase() == SOURCE_AMP),
            coop_sync: Flag::parse(params.get(PARAM_COOP_SYNC)).or(true),
            gdpr: parse_boolean_int(params.get(PARAM_GDPR)),
            gdpr_consent: non_empty(params.get(PARAM_GDPR_CONSENT)),
            default_gdpr_scope: parse_boolean_int(params.get(PARAM_DEFAULT_GDPR_SCOPE)),
            gpp_sid: non_empty(params.get(PARAM_GPP_SID)),
            gpp: non_empty(params.get(PARAM_GPP)),
            timeout: parse_timeout(params.get(PARAM_TIMEOUT)),
            extra: Map::new(),
        }
    }

    /// Maps an alias to its URL, then validates the result.
    ///
    /// Unknown aliases are not rejected up front; they are validated as
    /// literal URLs.
    fn resolve_endpoint(&self, raw: Option<&str>, log: &dyn DiagnosticLog) -> String {
        let requested = raw
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_ENDPOINT_ALIAS);
        let endpoint = endpoint_for_alias(requested).unwrap_or(requested);

        if self.validator.is_valid_url(endpoint) {
            endpoint.to_string()
        } else {
            log.log(&format!(
                "Invalid endpoint: {endpoint}. Defaulting to {DEFAULT_ENDPOINT_ALIAS}."
            ));
            FALLBACK_ENDPOINT.to_string()
        }
    }
}

/// Parses `key:value` pairs separated by commas.
///
/// Tokens that do not split into exactly two non-empty parts are dropped.
pub fn parse_args(raw: Option<&str>) -> SyncArgs {
    let mut args = SyncArgs::default();
    for token in split_commas(raw) {
        let parts: Vec<&str> = token.split(':').collect();
        let [key, value] = parts.as_slice() else {
            continue;
        };
        if key.is_empty() || value.is_empty() {
            continue;
        }
        let value = if is_all_digits(value) {
            // Digit runs too long for i64 stay strings.
            value
                .parse::<i64>()
                .map_or_else(|_| ArgValue::from(*value), ArgValue::Int)
        } else {
            ArgValue::from(*value)
        };
        args.insert(*key, value);
    }
    args
}

pub fn parse_bidders(raw: Option<&str>) -> Option<Vec<String>> {
    let bidders: Vec<String> = split_commas(raw).into_iter().map(str::to_string).collect();
    (!bidders.is_empty()).then_some(bidders)
}

/// Sync count limit: [`DEFAULT_LIMIT`] when unset, [`NO_LIMIT`] when the value
/// is not an integer or is zero.
///
/// Values overflowing `i64` also map to [`NO_LIMIT`], since [`to_int`] reports
/// them as absent.
pub fn parse_limit(raw: Option<&str>) -> i64 {
    let limit = match raw.filter(|v| !v.is_empty()) {
        Some(value) => to_int(value),
        None => Some(DEFAULT_LIMIT),
    };
    match limit {
        Some(n) if n != 0 => n,
        _ => NO_LIMIT,
    }
}

/// Integer restricted to 0 or 1.
pub fn parse_boolean_int(raw: Option<&str>) -> Option<u8> {
    match raw.and_then(to_int) {
        Some(0) => Some(0),
        Some(1) => Some(1),
        _ => None,
    }
}

pub fn parse_timeout(raw: Option<&str>) -> Option<i64> {
    raw.and_then(to_int).filter(|t| *t != 0)
}

fn non_empty(raw: Option<&str>) -> Option<String> {
    raw.filter(|v| !v.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{ENDPOINT_APPNEXUS, ENDPOINT_RUBICON};
    use crate::test_support::tests::RecordingLogFactory;

    fn normalizer() -> (
        ParamNormalizer<ParsedUrlValidator, RecordingLogFactory>,
        RecordingLogFactory,
    ) {
        let logs = RecordingLogFactory::default();
        (ParamNormalizer::new(ParsedUrlValidator, logs.clone()), logs)
    }

    fn normalize(query: &str) -> SyncConfig {
        let (normalizer, _) = normalizer();
        normalizer.normalize(&QueryParams::parse(query))
    }

    #[test]
    fn test_defaults_for_empty_query() {
        let config = normalize("");

        assert!(!config.debug);
        assert_eq!(config.endpoint, ENDPOINT_APPNEXUS);
        assert!(config.args.is_empty());
        assert_eq!(config.bidders, None);
        assert_eq!(config.limit, DEFAULT_LIMIT);
        assert!(!config.is_amp);
        assert!(config.coop_sync);
        assert_eq!(config.gdpr, None);
        assert_eq!(config.gdpr_consent, None);
        assert_eq!(config.default_gdpr_scope, None);
        assert_eq!(config.gpp_sid, None);
        assert_eq!(config.gpp, None);
        assert_eq!(config.timeout, None);
        assert!(config.extra.is_empty());
    }

    #[test]
    fn test_debug_requires_value() {
        assert!(normalize("debug=1").debug);
        assert!(normalize("debug=false").debug);
        assert!(!normalize("debug=").debug);
        assert!(!normalize("debug").debug);
    }

    #[test]
    fn test_endpoint_aliases() {
        assert_eq!(normalize("endpoint=rubicon").endpoint, ENDPOINT_RUBICON);
        assert_eq!(normalize("endpoint=appnexus").endpoint, ENDPOINT_APPNEXUS);
        assert_eq!(normalize("endpoint=").endpoint, ENDPOINT_APPNEXUS);
    }

    #[test]
    fn test_endpoint_literal_url_kept() {
        let config = normalize("endpoint=https%3A%2F%2Fpbs.example.com%2Fcookie_sync");
        assert_eq!(config.endpoint, "https://pbs.example.com/cookie_sync");
    }

    #[test]
    fn test_invalid_endpoint_falls_back_and_logs() {
        let (normalizer, logs) = normalizer();
        let config = normalizer.normalize(&QueryParams::parse("debug=1&endpoint=openx"));

        assert_eq!(config.endpoint, ENDPOINT_APPNEXUS);
        assert_eq!(
            logs.messages(),
            vec!["Invalid endpoint: openx. Defaulting to appnexus.".to_string()]
        );
    }

    #[test]
    fn test_invalid_endpoint_log_gated_on_debug() {
        let (normalizer, logs) = normalizer();
        let config = normalizer.normalize(&QueryParams::parse("endpoint=not-a-url"));

        assert_eq!(config.endpoint, ENDPOINT_APPNEXUS);
        assert!(logs.messages().is_empty());
        assert_eq!(logs.requested(), vec![false]);
    }

    #[test]
    fn test_alias_is_validated_after_mapping() {
        // A validator rejecting everything proves aliases are still checked.
        let logs = RecordingLogFactory::default();
        let normalizer = ParamNormalizer::new(|_: &str| false, logs.clone());
        let config = normalizer.normalize(&QueryParams::parse("debug=1&endpoint=rubicon"));

        assert_eq!(config.endpoint, ENDPOINT_APPNEXUS);
        assert_eq!(
            logs.messages(),
            vec![format!(
                "Invalid endpoint: {ENDPOINT_RUBICON}. Defaulting to appnexus."
            )]
        );
    }

    #[test]
    fn test_parse_args_drops_malformed_tokens() {
        let args = parse_args(Some("a:1,b:foo,bad,:x,y:"));

        assert_eq!(args.len(), 2);
        assert_eq!(args.get("a"), Some(&ArgValue::Int(1)));
        assert_eq!(args.get("b"), Some(&ArgValue::Str("foo".to_string())));
        assert_eq!(args.get("bad"), None);
        assert_eq!(args.get("y"), None);
    }

    #[test]
    fn test_parse_args_rejects_extra_colons() {
        let args = parse_args(Some("a:b:c,d:2"));
        assert_eq!(args.get("a"), None);
        assert_eq!(args.get("d"), Some(&ArgValue::Int(2)));
    }

    #[test]
    fn test_parse_args_later_duplicates_win_in_place() {
        let args = parse_args(Some("a:1,b:2,a:x"));
        let entries: Vec<_> = args.iter().collect();
        assert_eq!(
            entries,
            vec![
                ("a", &ArgValue::Str("x".to_string())),
                ("b", &ArgValue::Int(2))
            ]
        );
    }

    #[test]
    fn test_parse_args_numeric_edge_cases() {
        let args = parse_args(Some("neg:-1,lead:007,huge:99999999999999999999"));
        assert_eq!(args.get("neg"), Some(&ArgValue::Str("-1".to_string())));
        assert_eq!(args.get("lead"), Some(&ArgValue::Int(7)));
        assert_eq!(
            args.get("huge"),
            Some(&ArgValue::Str("99999999999999999999".to_string()))
        );
    }

    #[test]
    fn test_parse_args_serializes_as_object() {
        let args = parse_args(Some("a:1,b:foo"));
        let json = serde_json::to_string(&args).expect("should serialize");
        assert_eq!(json, r#"{"a":1,"b":"foo"}"#);
    }

    #[test]
    fn test_parse_bidders() {
        assert_eq!(parse_bidders(Some("")), None);
        assert_eq!(parse_bidders(None), None);
        assert_eq!(parse_bidders(Some(",,")), None);
        assert_eq!(
            parse_bidders(Some("x,,y")),
            Some(vec!["x".to_string(), "y".to_string()])
        );
    }

    #[test]
    fn test_parse_limit() {
        assert_eq!(parse_limit(None), DEFAULT_LIMIT);
        assert_eq!(parse_limit(Some("")), DEFAULT_LIMIT);
        assert_eq!(parse_limit(Some("0")), NO_LIMIT);
        assert_eq!(parse_limit(Some("abc")), NO_LIMIT);
        assert_eq!(parse_limit(Some("5")), 5);
        assert_eq!(parse_limit(Some("25px")), 25);
        assert_eq!(parse_limit(Some("99999999999999999999")), NO_LIMIT);
    }

    #[test]
    fn test_is_amp_case_insensitive() {
        assert!(normalize("source=amp").is_amp);
        assert!(normalize("source=AMP").is_amp);
        assert!(!normalize("source=amp-story").is_amp);
        assert!(!normalize("source=").is_amp);
    }

    #[test]
    fn test_coop_sync() {
        assert!(normalize("").coop_sync);
        assert!(normalize("coop_sync=").coop_sync);
        assert!(normalize("coop_sync=true").coop_sync);
        assert!(normalize("coop_sync=1").coop_sync);
        assert!(!normalize("coop_sync=false").coop_sync);
        assert!(!normalize("coop_sync=0").coop_sync);
        assert!(!normalize("coop_sync=00").coop_sync);
        assert!(!normalize("coop_sync=nope").coop_sync);
    }

    #[test]
    fn test_parse_boolean_int() {
        assert_eq!(parse_boolean_int(Some("2")), None);
        assert_eq!(parse_boolean_int(Some("1")), Some(1));
        assert_eq!(parse_boolean_int(Some("0")), Some(0));
        assert_eq!(parse_boolean_int(Some("-1")), None);
        assert_eq!(parse_boolean_int(Some("yes")), None);
        assert_eq!(parse_boolean_int(None), None);
    }

    #[test]
    fn test_gdpr_fields() {
        let config = normalize("gdpr=1&gdpr_consent=CONSENT&defaultGdprScope=0");
        assert_eq!(config.gdpr, Some(1));
        assert_eq!(config.gdpr_consent.as_deref(), Some("CONSENT"));
        assert_eq!(config.default_gdpr_scope, Some(0));
    }

    #[test]
    fn test_passthrough_fields() {
        let config = normalize("gpp_sid=2,6&gpp=DBABMA~CPXxRfAPXxRfAAfKABENB&gdpr_consent=");
        assert_eq!(config.gpp_sid.as_deref(), Some("2,6"));
        assert_eq!(config.gpp.as_deref(), Some("DBABMA~CPXxRfAPXxRfAAfKABENB"));
        assert_eq!(config.gdpr_consent, None);
    }

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout(Some("500")), Some(500));
        assert_eq!(parse_timeout(Some("0")), None);
        assert_eq!(parse_timeout(Some("soon")), None);
        assert_eq!(parse_timeout(None), None);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let params = QueryParams::parse(
            "endpoint=rubicon&args=a:1,b:c&bidders=x,y&max_sync_count=3&source=amp&gdpr=0",
        );
        let (normalizer, _) = normalizer();
        assert_eq!(normalizer.normalize(&params), normalizer.normalize(&params));
    }

    #[test]
    fn test_serialized_field_names() {
        let config = normalize("source=amp&defaultGdprScope=1&args=k:v");
        let json = serde_json::to_value(&config).expect("should serialize");

        assert_eq!(json["isAmp"], Value::Bool(true));
        assert_eq!(json["coopSync"], Value::Bool(true));
        assert_eq!(json["defaultGdprScope"], Value::from(1));
        assert_eq!(json["args"]["k"], Value::from("v"));
        assert_eq!(json["bidders"], Value::Null);
        assert_eq!(json["limit"], Value::from(DEFAULT_LIMIT));
    }
}
