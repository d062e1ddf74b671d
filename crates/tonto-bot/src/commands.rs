//! Chat command parsing.
//!
//! Commands are recognised by a case-sensitive prefix of the line:
//! `!rtfm [section] cmd`, `ping` and `!juanito`.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::warn;

/// Reply to `ping`.
pub const PONG: &str = "pong";

/// Reply to `!juanito`.
pub const GREETING: &str = "Hola terricolas.";

static MAN_COMMAND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z_-]+$").expect("command pattern is valid"));

/// A recognised chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Describe `command` from its manual page, optionally in one section.
    Rtfm {
        section: Option<String>,
        command: String,
    },
    Ping,
    Greet,
}

/// Malformed command input. The message is sent to the channel as-is.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("format: !rtfm [section] cmd")]
    Usage,
    #[error("Funky commands not supported")]
    UnsupportedCommand(String),
    #[error("Funky sections not supported")]
    UnsupportedSection(String),
}

/// Recognise a command at the start of `line`.
///
/// Returns `Ok(None)` for ordinary chat.
pub fn parse_command(line: &str) -> Result<Option<Command>, CommandError> {
    if line.starts_with("!rtfm") {
        parse_rtfm(line).map(Some)
    } else if line.starts_with("ping") {
        Ok(Some(Command::Ping))
    } else if line.starts_with("!juanito") {
        Ok(Some(Command::Greet))
    } else {
        Ok(None)
    }
}

fn parse_rtfm(line: &str) -> Result<Command, CommandError> {
    let argv: Vec<&str> = line.split_whitespace().collect();
    let (section, command) = match argv.as_slice() {
        [_, section, command] => (Some(*section), *command),
        [_, command] => (None, *command),
        _ => return Err(CommandError::Usage),
    };

    if !MAN_COMMAND_RE.is_match(command) {
        warn!(command, "Rejected rtfm command");
        return Err(CommandError::UnsupportedCommand(command.to_string()));
    }
    // Sections are things like "3", "3p" or "n".
    if let Some(section) = section {
        if !section.chars().all(|c| c.is_ascii_alphanumeric()) {
            warn!(section, "Rejected rtfm section");
            return Err(CommandError::UnsupportedSection(section.to_string()));
        }
    }

    Ok(Command::Rtfm {
        section: section.map(str::to_string),
        command: command.to_string(),
    })
}
