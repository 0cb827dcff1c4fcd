//! Show events and their server-sent-events framing
//!
//! Every event goes out as a single frame:
//!
//! ```text
//! event: <name>
//! data: <payload>
//!
//! ```
//!
//! Payloads never contain a newline, so one `data:` line is always enough.

use bytes::Bytes;
use std::fmt;

/// Comment frame sent on idle streams; EventSource clients ignore it
const KEEP_ALIVE_FRAME: &[u8] = b": keep-alive\n\n";

/// A state change announced to every connected viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// The photo list was rescanned and the show restarted at index 0
    Reset,
    /// The current photo index changed
    Set(u64),
    /// Viewers should step back one photo
    Prev,
    /// Viewers should step forward one photo
    Next,
}

impl Event {
    /// Event type announced in the `event:` field
    pub fn name(&self) -> &'static str {
        match self {
            Event::Reset => "reset",
            Event::Set(_) => "set",
            Event::Prev => "prev",
            Event::Next => "next",
        }
    }

    /// Payload carried in the `data:` field
    pub fn payload(&self) -> String {
        match self {
            Event::Reset => String::new(),
            Event::Set(id) => id.to_string(),
            Event::Prev => "prev".to_string(),
            Event::Next => "next".to_string(),
        }
    }

    /// Encode as one wire frame
    pub fn to_frame(&self) -> Bytes {
        Bytes::from(format!("event: {}\ndata: {}\n\n", self.name(), self.payload()))
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Set(id) => write!(f, "set({id})"),
            other => f.write_str(other.name()),
        }
    }
}

/// Frame written to idle streams so dead peers surface as write failures
pub fn keep_alive_frame() -> Bytes {
    Bytes::from_static(KEEP_ALIVE_FRAME)
}
