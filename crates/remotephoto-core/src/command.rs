//! Master controller commands

use crate::error::{Error, Result};
use std::fmt;

/// One command posted by the master controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Jump to a photo index
    Set(u64),
    /// Rescan the photos and restart the show
    Reset,
    /// Step back one photo
    Prev,
    /// Step forward one photo
    Next,
}

impl Command {
    /// Parse the `cmd` and `id` form fields.
    ///
    /// `id` is only looked at for `set`, where it must be an unsigned
    /// decimal integer.
    pub fn parse(cmd: Option<&str>, id: Option<&str>) -> Result<Self> {
        match cmd.map(str::trim) {
            Some("set") => {
                let raw = id.map(str::trim).unwrap_or_default();
                raw.parse::<u64>()
                    .map(Command::Set)
                    .map_err(|e| Error::invalid_id(format!("{raw:?}: {e}")))
            }
            Some("reset") => Ok(Command::Reset),
            Some("prev") => Ok(Command::Prev),
            Some("next") => Ok(Command::Next),
            Some(other) => Err(Error::malformed_command(format!("unknown command {other:?}"))),
            None => Err(Error::malformed_command("missing cmd field")),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Set(id) => write!(f, "set {id}"),
            Command::Reset => f.write_str("reset"),
            Command::Prev => f.write_str("prev"),
            Command::Next => f.write_str("next"),
        }
    }
}
