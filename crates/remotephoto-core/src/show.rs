//! Show state: current photo, photo list, and the events announcing changes

use crate::broker::Broker;
use crate::command::Command;
use crate::error::{Error, Result};
use crate::event::Event;
use crate::source::PhotoSource;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

const EMPTY_PHOTO_LIST: &str = "[]";

/// How `prev` / `next` commands are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepMode {
    /// Move the server-side index and announce it with a `set` event
    #[default]
    Authoritative,
    /// Relay `prev` / `next` to viewers and leave the index alone
    Relay,
}

/// Direction of a one-photo step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Prev,
    Next,
}

/// Photo list plus current index, as served to viewers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    /// JSON array of photo names
    pub photos_json: Arc<str>,
    /// Current photo index
    pub id: u64,
}

impl Listing {
    /// Render as `{"photos": [...], "id": N}`
    pub fn to_json(&self) -> String {
        format!(r#"{{"photos": {}, "id": {}}}"#, self.photos_json, self.id)
    }
}

struct ShowInner {
    current_index: u64,
    /// `None` while the show has no photos
    last_index: Option<u64>,
    photos_json: Arc<str>,
    photo_error: Option<Error>,
}

/// Owns the show state and announces every transition through the broker.
///
/// Mutations publish while still holding the write lock, so the order of
/// events on the wire matches the order of state changes.
pub struct ShowController {
    source: Arc<dyn PhotoSource>,
    broker: Broker,
    step_mode: StepMode,
    /// Serializes resets from scan through commit
    reset_gate: tokio::sync::Mutex<()>,
    inner: RwLock<ShowInner>,
}

impl ShowController {
    /// Create an empty show. Call [`reset`](Self::reset) to load photos.
    pub fn new(source: Arc<dyn PhotoSource>, broker: Broker, step_mode: StepMode) -> Self {
        Self {
            source,
            broker,
            step_mode,
            reset_gate: tokio::sync::Mutex::new(()),
            inner: RwLock::new(ShowInner {
                current_index: 0,
                last_index: None,
                photos_json: Arc::from(EMPTY_PHOTO_LIST),
                photo_error: None,
            }),
        }
    }

    /// Rescan the photos, restart at index 0 and publish `reset`.
    ///
    /// A failed rescan empties the show and is kept for the next
    /// [`listing`](Self::listing); the event is published either way.
    /// Resets run one at a time, so the last one to finish always
    /// reflects the latest scan. Returns the number of photos loaded.
    pub async fn reset(&self) -> usize {
        let _gate = self.reset_gate.lock().await;
        let scanned = self.source.scan().await.and_then(|names| {
            let json = serde_json::to_string(&names)?;
            Ok((names.len(), json))
        });

        let mut inner = self.inner.write();
        inner.current_index = 0;

        let count = match scanned {
            Ok((count, json)) => {
                info!("Loaded {} photos from {}", count, self.source.describe());
                inner.last_index = (count as u64).checked_sub(1);
                inner.photos_json = Arc::from(json);
                inner.photo_error = None;
                count
            }
            Err(e) => {
                warn!("Photo rescan failed: {}", e);
                inner.last_index = None;
                inner.photos_json = Arc::from(EMPTY_PHOTO_LIST);
                inner.photo_error = Some(e);
                0
            }
        };

        self.broker.publish(Event::Reset);
        count
    }

    /// Jump to photo `id` and publish `set(id)`
    pub fn set_index(&self, id: u64) -> Result<u64> {
        let mut inner = self.inner.write();
        match inner.last_index {
            Some(last) if id <= last => {
                inner.current_index = id;
                self.broker.publish(Event::Set(id));
                debug!("Show index set to {}", id);
                Ok(id)
            }
            last => Err(Error::OutOfRange { id, last }),
        }
    }

    /// Step one photo in `direction`, returning the resulting index
    pub fn step(&self, direction: Direction) -> Result<u64> {
        match self.step_mode {
            StepMode::Relay => {
                let inner = self.inner.read();
                self.broker.publish(match direction {
                    Direction::Prev => Event::Prev,
                    Direction::Next => Event::Next,
                });
                Ok(inner.current_index)
            }
            StepMode::Authoritative => {
                let mut inner = self.inner.write();
                let current = inner.current_index;
                let last = inner.last_index.ok_or(Error::OutOfRange {
                    id: current,
                    last: None,
                })?;

                let target = match direction {
                    Direction::Prev => current.saturating_sub(1),
                    Direction::Next => current.saturating_add(1).min(last),
                };

                // At either end of the show nothing moves and nothing is sent
                if target != current {
                    inner.current_index = target;
                    self.broker.publish(Event::Set(target));
                    debug!("Show index stepped to {}", target);
                }
                Ok(target)
            }
        }
    }

    /// Run a master command, returning the current index afterwards
    pub async fn execute(&self, command: Command) -> Result<u64> {
        match command {
            Command::Set(id) => self.set_index(id),
            Command::Reset => {
                self.reset().await;
                Ok(self.current_index())
            }
            Command::Prev => self.step(Direction::Prev),
            Command::Next => self.step(Direction::Next),
        }
    }

    /// Current photo list and index, or the error of the last rescan
    pub fn listing(&self) -> Result<Listing> {
        let inner = self.inner.read();
        if let Some(ref e) = inner.photo_error {
            return Err(e.duplicate());
        }
        Ok(Listing {
            photos_json: inner.photos_json.clone(),
            id: inner.current_index,
        })
    }

    /// Index of the photo viewers should show
    pub fn current_index(&self) -> u64 {
        self.inner.read().current_index
    }

    /// Index of the last photo, `None` for an empty show
    pub fn last_index(&self) -> Option<u64> {
        self.inner.read().last_index
    }

    /// How prev/next commands are handled
    pub fn step_mode(&self) -> StepMode {
        self.step_mode
    }
}
