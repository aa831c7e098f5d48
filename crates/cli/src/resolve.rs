//! Runs the normalize + consent pipeline for a single frame URL.

use url::Url;
use usersync_common::consent::resolve_sync_config;
use usersync_common::params::{ParamNormalizer, SyncConfig};
use usersync_common::query::QueryParams;

use crate::consent::LocalConsent;
use crate::error::CliError;

/// Reads parameters from a full frame URL or a bare query string.
pub fn params_from_input(input: &str) -> Result<QueryParams, CliError> {
    let input = input.trim();
    if input.starts_with("http://") || input.starts_with("https://") {
        let url = Url::parse(input)
            .map_err(|e| CliError::Input(format!("Invalid frame URL '{}': {}", input, e)))?;
        return Ok(QueryParams::from_url(&url));
    }
    Ok(QueryParams::parse(input))
}

pub fn resolve(
    input: &str,
    force_poll: bool,
    consent: &LocalConsent,
) -> Result<SyncConfig, CliError> {
    let params = params_from_input(input)?;
    let normalizer: ParamNormalizer = ParamNormalizer::default();
    let config = futures::executor::block_on(resolve_sync_config(
        &params,
        force_poll,
        &normalizer,
        consent,
    ))?;
    Ok(config)
}

pub fn to_json(config: &SyncConfig, pretty: bool) -> Result<String, CliError> {
    let json = if pretty {
        serde_json::to_string_pretty(config)?
    } else {
        serde_json::to_string(config)?
    };
    Ok(json)
}
