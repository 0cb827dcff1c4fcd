//! Remote Photo Core
//!
//! Event broker and show state for a remote-controlled photo show.
//!
//! This crate provides:
//! - The event broker: one control loop fanning events out to viewers
//! - Server-sent-events framing for show events
//! - The show state controller and its photo source
//! - Master command parsing and the shared error type

pub mod broker;
pub mod command;
pub mod error;
pub mod event;
pub mod show;
pub mod source;

pub use broker::{Broker, BrokerConfig, ClientHandle, ClientId, QueuePolicy};
pub use command::Command;
pub use error::{Error, Result};
pub use event::{keep_alive_frame, Event};
pub use show::{Direction, Listing, ShowController, StepMode};
pub use source::{DirectorySource, PhotoSource};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::broker::{Broker, BrokerConfig, ClientHandle, QueuePolicy};
    pub use crate::error::{Error, Result};
    pub use crate::event::Event;
    pub use crate::show::{ShowController, StepMode};
}
