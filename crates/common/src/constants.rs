//! Fixed values that are part of the sync frame's configuration contract.

/// Cookie-sync endpoint of the Rubicon Project Prebid Server cluster.
pub const ENDPOINT_RUBICON: &str = "https://prebid-server.rubiconproject.com/cookie_sync";
/// Cookie-sync endpoint of the AppNexus Prebid Server cluster.
pub const ENDPOINT_APPNEXUS: &str = "https://prebid.adnxs.com/pbs/v1/cookie_sync";

/// Alias used when no `endpoint` parameter is given.
pub const DEFAULT_ENDPOINT_ALIAS: &str = "appnexus";
/// Canonical URL substituted when the requested endpoint is not a valid URL.
pub const FALLBACK_ENDPOINT: &str = ENDPOINT_APPNEXUS;

/// Named endpoint aliases and their canonical URLs.
pub const ENDPOINT_ALIASES: &[(&str, &str)] = &[
    ("rubicon", ENDPOINT_RUBICON),
    ("appnexus", ENDPOINT_APPNEXUS),
];

/// Sync count used when `max_sync_count` is not supplied.
pub const DEFAULT_LIMIT: i64 = 10;
/// Sentinel meaning "do not cap the sync count".
pub const NO_LIMIT: i64 = 99999;

pub const PARAM_DEBUG: &str = "debug";
pub const PARAM_ENDPOINT: &str = "endpoint";
pub const PARAM_ARGS: &str = "args";
pub const PARAM_BIDDERS: &str = "bidders";
pub const PARAM_MAX_SYNC_COUNT: &str = "max_sync_count";
pub const PARAM_SOURCE: &str = "source";
pub const PARAM_COOP_SYNC: &str = "coop_sync";
pub const PARAM_GDPR: &str = "gdpr";
pub const PARAM_GDPR_CONSENT: &str = "gdpr_consent";
pub const PARAM_DEFAULT_GDPR_SCOPE: &str = "defaultGdprScope";
pub const PARAM_GPP_SID: &str = "gpp_sid";
pub const PARAM_GPP: &str = "gpp";
pub const PARAM_TIMEOUT: &str = "timeout";

/// Value of the `source` parameter identifying an AMP page.
pub const SOURCE_AMP: &str = "amp";

/// Looks up the canonical URL for a named endpoint alias.
pub fn endpoint_for_alias(alias: &str) -> Option<&'static str> {
    ENDPOINT_ALIASES
        .iter()
        .find(|(name, _)| *name == alias)
        .map(|(_, url)| *url)
}
