//! # prefsync-cli
//!
//! `prefctl`, a command-line client for remote user preferences.
//!
//! ## Usage
//!
//! ```bash
//! # ~/.config/prefsync/config.json
//! # {"base_url": "https://api.example.com/user/", "token": "s3cret"}
//!
//! prefctl list
//! prefctl set theme dark
//! prefctl get theme
//! prefctl set-long notes "$(cat notes.txt)"
//! prefctl --prefix editor- rm-long notes
//! ```
//!
//! Set `RUST_LOG=debug` to see every request.

pub mod commands;
pub mod config;
pub mod error;

use std::path::PathBuf;

use clap::Parser;

use prefsync::{PreferenceSync, Session};
use prefsync_http::PreferencesApi;

pub use commands::Command;
pub use config::SyncConfig;
pub use error::CliError;

/// prefctl - read and write remote user preferences
#[derive(Parser, Debug)]
#[command(name = "prefctl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: <config dir>/prefsync/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// API root, overriding the config file
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Bearer token, overriding the config file
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Key prefix, overriding the config file
    #[arg(long, global = true)]
    pub prefix: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log in with `config` and fetch every remote preference.
pub fn connect(config: &SyncConfig) -> Result<PreferenceSync, CliError> {
    let mut api = PreferencesApi::connect(config.base_url()?, config.timeout())?;
    if let Some(token) = &config.token {
        api = api.with_token(token.as_str());
    }

    let session = Session::new();
    session.log_in();

    let prefs = PreferenceSync::new(api, session, &config.prefix);
    prefs.sync()?;
    Ok(prefs)
}

pub fn run(cli: Cli) -> Result<(), CliError> {
    let config = SyncConfig::load(cli.config.as_deref())?.with_overrides(
        cli.base_url,
        cli.token,
        cli.prefix,
    );

    let prefs = connect(&config)?;
    if let Some(output) = commands::execute(&cli.command, &prefs)? {
        println!("{}", output);
    }
    Ok(())
}
