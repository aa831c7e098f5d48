//! Local consent sources standing in for the AMP consent API.

use std::fs;
use std::path::PathBuf;

use async_trait::async_trait;
use clap::Args;
use error_stack::Report;
use usersync_common::consent::{ConsentFetcher, ConsentFields};
use usersync_common::error::UsersyncError;

use crate::error::CliError;

/// Where consent comes from when the resolver decides to poll.
#[derive(Args, Debug, Default)]
#[group(required = false, multiple = false)]
pub struct ConsentArgs {
    /// Consent fields as an inline JSON object
    #[arg(long)]
    pub consent: Option<String>,

    /// Path to a JSON file holding the consent fields
    #[arg(long)]
    pub consent_file: Option<PathBuf>,

    /// Simulate a failed consent fetch with this message
    #[arg(long)]
    pub consent_error: Option<String>,
}

/// Consent source answering from command line input.
#[derive(Debug)]
pub enum LocalConsent {
    Fixed(ConsentFields),
    Failing(String),
    Unavailable,
}

impl LocalConsent {
    pub fn from_args(args: &ConsentArgs) -> Result<Self, CliError> {
        if let Some(json) = &args.consent {
            return Ok(LocalConsent::Fixed(ConsentFields::from_json_str(json)?));
        }
        if let Some(path) = &args.consent_file {
            let content = fs::read_to_string(path)?;
            return Ok(LocalConsent::Fixed(ConsentFields::from_json_str(&content)?));
        }
        if let Some(message) = &args.consent_error {
            return Ok(LocalConsent::Failing(message.clone()));
        }
        Ok(LocalConsent::Unavailable)
    }
}

#[async_trait(?Send)]
impl ConsentFetcher for LocalConsent {
    async fn fetch_consent(
        &self,
        timeout: Option<i64>,
    ) -> Result<ConsentFields, Report<UsersyncError>> {
        log::debug!("Local consent requested (timeout: {:?})", timeout);
        match self {
            LocalConsent::Fixed(consent) => Ok(consent.clone()),
            LocalConsent::Failing(message) => Err(Report::new(UsersyncError::ConsentFetch {
                message: message.clone(),
            })),
            LocalConsent::Unavailable => Err(Report::new(UsersyncError::ConsentFetch {
                message: "no consent source configured".to_string(),
            })),
        }
    }
}
