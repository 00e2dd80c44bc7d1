//! `prefctl` subcommands.
//!
//! Every command runs against a [`PreferenceSync`] that has already logged in
//! and synced:
//! - `list` - Print every remote preference
//! - `get <key>` / `set <key> <value>` / `rm <key>` - One preference
//! - `get-long <key>` / `set-long <key> <value>` / `rm-long <key>` - A
//!   preference spread over several slots

use clap::Subcommand;

use prefsync::PreferenceSync;

use crate::error::CliError;

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print every remote preference as `key<TAB>value`
    List,
    /// Print one preference
    Get { key: String },
    /// Store one preference
    Set { key: String, value: String },
    /// Remove one preference
    Rm { key: String },
    /// Print a preference of any length
    GetLong { key: String },
    /// Store a preference of any length
    SetLong { key: String, value: String },
    /// Remove a preference of any length and all of its slots
    RmLong { key: String },
}

/// Run `command`, returning the text to print, if any.
pub fn execute(command: &Command, prefs: &PreferenceSync) -> Result<Option<String>, CliError> {
    match command {
        Command::List => {
            let snapshot = prefs.store().snapshot();
            let lines: Vec<String> = snapshot
                .iter()
                .map(|(key, value)| format!("{}\t{}", key, value))
                .collect();
            Ok(Some(lines.join("\n")).filter(|s| !s.is_empty()))
        }

        Command::Get { key } => Ok(prefs.preference(key, None)?.get()),

        Command::Set { key, value } => {
            prefs.preference(key, None)?.try_set(value.as_str())?;
            Ok(None)
        }

        Command::Rm { key } => {
            prefs.delete(key)?;
            Ok(None)
        }

        Command::GetLong { key } => Ok(prefs.long_preference(key)?.get()),

        Command::SetLong { key, value } => {
            prefs.long_preference(key)?.set(value)?;
            Ok(None)
        }

        Command::RmLong { key } => {
            prefs.long_preference(key)?.delete()?;
            Ok(None)
        }
    }
}
