//! Command line front end for the user-sync frame parameter pipeline.
//!
//! Takes the frame's URL (or just its query string), normalizes the
//! parameters, resolves consent against a locally supplied consent source and
//! prints the final configuration as JSON.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;
use usersync_common::settings::Settings;

mod consent;
mod error;
mod resolve;

use consent::{ConsentArgs, LocalConsent};
use error::CliError;

#[derive(Parser)]
#[command(name = "usersync")]
#[command(about = "Resolve Prebid Server user-sync frame parameters")]
#[command(version)]
struct Cli {
    /// Frame URL or query string, e.g. "endpoint=rubicon&source=amp"
    input: String,

    /// Path to a settings TOML file (defaults to the embedded settings)
    #[arg(long, short, env = "USERSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Always poll the consent source, even when gdpr is on the query string
    #[arg(long)]
    always_poll_amp: bool,

    #[command(flatten)]
    consent: ConsentArgs,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> Result<String, CliError> {
    let settings = load_settings(cli.config.as_ref())?;
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        settings.log_level()
    };
    init_logger(level)?;

    let force_poll = cli.always_poll_amp || settings.consent.always_poll_amp;
    let consent = LocalConsent::from_args(&cli.consent)?;
    let config = resolve::resolve(&cli.input, force_poll, &consent)?;
    log::debug!("Resolved sync config: {:?}", config);

    resolve::to_json(&config, cli.pretty)
}

fn load_settings(path: Option<&PathBuf>) -> Result<Settings, CliError> {
    let settings = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            Settings::from_toml(&content)?
        }
        None => Settings::new()?,
    };
    Ok(settings)
}

fn init_logger(level: LevelFilter) -> Result<(), CliError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}  {} {}",
                chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()
        .map_err(|e| CliError::Logger(e.to_string()))
}
