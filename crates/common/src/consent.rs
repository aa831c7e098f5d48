//! Consent resolution for AMP frames.
//!
//! Standard pages pass GDPR state on the query string. AMP pages may not, in
//! which case consent has to be requested from the AMP consent API before the
//! configuration is final. [`ConsentResolver`] decides which case applies and
//! performs at most one fetch.

use async_trait::async_trait;
use error_stack::Report;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::{
    PARAM_ARGS, PARAM_BIDDERS, PARAM_DEBUG, PARAM_DEFAULT_GDPR_SCOPE, PARAM_ENDPOINT, PARAM_GDPR,
    PARAM_GDPR_CONSENT, PARAM_GPP, PARAM_GPP_SID, PARAM_TIMEOUT,
};
use crate::error::UsersyncError;
use crate::logging::{DebugLogFactory, LogFactory};
use crate::params::{parse_boolean_int, ArgValue, ParamNormalizer, SyncArgs, SyncConfig};
use crate::query::{to_int, QueryParams};
use crate::url_check::UrlValidator;

// Serialized names of record fields that have no query parameter of the same name.
const FIELD_LIMIT: &str = "limit";
const FIELD_IS_AMP: &str = "isAmp";
const FIELD_COOP_SYNC: &str = "coopSync";

/// Open set of consent values returned by the consent source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConsentFields(Map<String, Value>);

impl ConsentFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, replacing an earlier value for the same key.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Parses consent fields from a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`UsersyncError::InvalidConsent`] when the input is not valid
    /// JSON or not an object.
    pub fn from_json_str(json: &str) -> Result<Self, Report<UsersyncError>> {
        match serde_json::from_str::<Value>(json) {
            Ok(Value::Object(map)) => Ok(Self(map)),
            Ok(other) => Err(Report::new(UsersyncError::InvalidConsent {
                message: format!("expected a JSON object, got {other}"),
            })),
            Err(e) => Err(Report::new(UsersyncError::InvalidConsent {
                message: e.to_string(),
            })),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for ConsentFields {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl IntoIterator for ConsentFields {
    type Item = (String, Value);
    type IntoIter = serde_json::map::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// External source of consent data, such as the AMP consent API.
///
/// Implementations own the timeout; the resolver only forwards it.
#[async_trait(?Send)]
pub trait ConsentFetcher {
    /// Retrieves consent, giving up after `timeout` milliseconds when set.
    async fn fetch_consent(
        &self,
        timeout: Option<i64>,
    ) -> Result<ConsentFields, Report<UsersyncError>>;
}

#[async_trait(?Send)]
impl<T: ConsentFetcher + ?Sized> ConsentFetcher for &T {
    async fn fetch_consent(
        &self,
        timeout: Option<i64>,
    ) -> Result<ConsentFields, Report<UsersyncError>> {
        (**self).fetch_consent(timeout).await
    }
}

/// How consent is obtained for a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionMode {
    /// Consent on the query string is used as is.
    Direct,
    /// Consent is fetched from the consent source.
    Polling,
}

impl ResolutionMode {
    pub fn for_config(config: &SyncConfig, force_poll: bool) -> Self {
        if force_poll || (config.is_amp && config.gdpr.is_none()) {
            ResolutionMode::Polling
        } else {
            ResolutionMode::Direct
        }
    }
}

impl SyncConfig {
    /// Applies fetched consent on top of the record; consent wins on collision.
    ///
    /// A value whose JSON type does not fit the record field is dropped with a
    /// warning. Keys that are not record fields land in `extra`.
    pub fn merge_consent(&mut self, consent: ConsentFields) {
        for (key, value) in consent {
            let merged = match key.as_str() {
                PARAM_GDPR => {
                    self.gdpr = boolean_int_value(&value);
                    true
                }
                PARAM_DEFAULT_GDPR_SCOPE => {
                    self.default_gdpr_scope = boolean_int_value(&value);
                    true
                }
                PARAM_GDPR_CONSENT => {
                    self.gdpr_consent = string_value(&value);
                    true
                }
                PARAM_GPP => {
                    self.gpp = string_value(&value);
                    true
                }
                PARAM_GPP_SID => {
                    self.gpp_sid = string_value(&value);
                    true
                }
                PARAM_TIMEOUT => {
                    self.timeout = int_value(&value).filter(|t| *t != 0);
                    true
                }
                PARAM_DEBUG => replace(&mut self.debug, value.as_bool()),
                PARAM_ENDPOINT => replace(&mut self.endpoint, value.as_str().map(str::to_string)),
                PARAM_ARGS => replace(&mut self.args, args_value(&value)),
                PARAM_BIDDERS => replace(&mut self.bidders, bidders_value(&value)),
                FIELD_LIMIT => replace(&mut self.limit, value.as_i64()),
                FIELD_IS_AMP => replace(&mut self.is_amp, value.as_bool()),
                FIELD_COOP_SYNC => replace(&mut self.coop_sync, value.as_bool()),
                _ => {
                    self.extra.insert(key.clone(), value);
                    true
                }
            };
            if !merged {
                log::warn!("Ignoring consent field '{}' with unexpected type", key);
            }
        }
    }
}

fn replace<T>(slot: &mut T, value: Option<T>) -> bool {
    match value {
        Some(value) => {
            *slot = value;
            true
        }
        None => false,
    }
}

fn boolean_int_value(value: &Value) -> Option<u8> {
    match value {
        Value::Bool(applies) => Some(u8::from(*applies)),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(0),
            Some(1) => Some(1),
            _ => None,
        },
        Value::String(s) => parse_boolean_int(Some(s.as_str())),
        _ => None,
    }
}

fn string_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Object of integer or string values; `None` if any value has another type.
fn args_value(value: &Value) -> Option<SyncArgs> {
    let mut args = SyncArgs::default();
    for (key, entry) in value.as_object()? {
        let entry = match entry {
            Value::Number(n) => ArgValue::Int(n.as_i64()?),
            Value::String(s) => ArgValue::Str(s.clone()),
            _ => return None,
        };
        args.insert(key.as_str(), entry);
    }
    Some(args)
}

/// Array of strings or null. An empty array means no filter, like on the query string.
fn bidders_value(value: &Value) -> Option<Option<Vec<String>>> {
    match value {
        Value::Null => Some(None),
        Value::Array(items) => {
            let bidders = items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()?;
            Some((!bidders.is_empty()).then_some(bidders))
        }
        _ => None,
    }
}

fn int_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => to_int(s),
        _ => None,
    }
}

/// Decides whether consent must be fetched and produces the final record.
pub struct ConsentResolver<F, L = DebugLogFactory> {
    fetcher: F,
    log_factory: L,
}

impl<F: ConsentFetcher> ConsentResolver<F> {
    pub fn new(fetcher: F) -> Self {
        Self::with_log_factory(fetcher, DebugLogFactory)
    }
}

impl<F: ConsentFetcher, L: LogFactory> ConsentResolver<F, L> {
    pub fn with_log_factory(fetcher: F, log_factory: L) -> Self {
        Self {
            fetcher,
            log_factory,
        }
    }

    /// Resolves consent for `config`.
    ///
    /// `force_poll` requests a fetch even when the query string carries GDPR
    /// state. When `config.default_gdpr_scope` is unset it also decides
    /// whether a failed fetch is fatal.
    ///
    /// # Errors
    ///
    /// Returns [`UsersyncError::ConsentRetrieval`] when the fetch fails and
    /// consent is required. The fetch error itself is only logged.
    pub async fn resolve(
        &self,
        config: SyncConfig,
        force_poll: bool,
    ) -> Result<SyncConfig, Report<UsersyncError>> {
        match ResolutionMode::for_config(&config, force_poll) {
            ResolutionMode::Direct => Ok(config),
            ResolutionMode::Polling => self.poll(config, force_poll).await,
        }
    }

    async fn poll(
        &self,
        mut config: SyncConfig,
        required: bool,
    ) -> Result<SyncConfig, Report<UsersyncError>> {
        log::debug!("Retrieving consent info from AMP...");
        match self.fetcher.fetch_consent(config.timeout).await {
            Ok(consent) => {
                config.merge_consent(consent);
                Ok(config)
            }
            Err(report) => {
                let retrieval_error = UsersyncError::ConsentRetrieval;
                self.log_factory
                    .logger(config.debug)
                    .log(&format!("{retrieval_error}: {report}"));

                // TODO: confirm with product whether force_poll should keep
                // deciding fatality when defaultGdprScope is unset.
                let in_scope = config
                    .default_gdpr_scope
                    .map_or(required, |scope| scope != 0);
                if in_scope {
                    Err(Report::new(retrieval_error))
                } else {
                    Ok(config)
                }
            }
        }
    }
}

/// Normalizes `params` and resolves consent in one pass.
///
/// # Errors
///
/// Propagates the resolver's [`UsersyncError::ConsentRetrieval`].
pub async fn resolve_sync_config<V, L, F>(
    params: &QueryParams,
    force_poll: bool,
    normalizer: &ParamNormalizer<V, L>,
    fetcher: F,
) -> Result<SyncConfig, Report<UsersyncError>>
where
    V: UrlValidator,
    L: LogFactory + Clone,
    F: ConsentFetcher,
{
    let config = normalizer.normalize(params);
    ConsentResolver::with_log_factory(fetcher, normalizer.log_factory().clone())
        .resolve(config, force_poll)
        .await
}
