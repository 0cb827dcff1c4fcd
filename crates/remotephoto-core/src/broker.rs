//! Event broker fanning show events out to connected viewers
//!
//! Provides:
//! - A single control loop that owns the client registry
//! - Register / deregister / publish funneled through one command channel
//! - Per-client outbound queues with an explicit overflow policy
//!
//! The command channel is unbounded, so `publish` and `deregister` never
//! block the caller. The loop handles one command at a time and fully fans
//! a publish out before looking at the next command: every client sees
//! events in publish order, and a client registered after a publish was
//! queued never receives it. A register racing a publish from another task
//! lands on either side of it; the listing endpoint covers the gap.

use crate::error::{Error, Result};
use crate::event::Event;
use std::collections::HashMap;
use std::fmt;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, trace, warn};

/// Identity of one registered client, assigned by the control loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

impl ClientId {
    /// Id of a handle that was never registered (the broker was gone)
    const DETACHED: ClientId = ClientId(0);

    /// Raw numeric id
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What happens to a client whose outbound queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueuePolicy {
    /// Never full; a slow client only grows its own queue
    #[default]
    Unbounded,
    /// Holds at most `capacity` events; on overflow the client is
    /// disconnected and the rest of the fan-out continues
    Bounded { capacity: usize },
}

/// Broker configuration
#[derive(Debug, Clone, Default)]
pub struct BrokerConfig {
    /// Per-client queue policy
    pub queue: QueuePolicy,
}

/// Commands processed by the control loop
enum BrokerCommand {
    /// Add a client and report its id
    Register {
        outbox: Outbox,
        reply: oneshot::Sender<ClientId>,
    },

    /// Remove a client if present
    Deregister(ClientId),

    /// Fan an event out to every registered client
    Publish(Event),

    /// Report the registry size
    Count(oneshot::Sender<usize>),

    /// Disconnect every client and stop the loop
    Shutdown,
}

/// Sending half of a client queue, owned by the registry
enum Outbox {
    Unbounded(mpsc::UnboundedSender<Event>),
    Bounded(mpsc::Sender<Event>),
}

impl Outbox {
    fn push(&self, event: Event) -> Result<()> {
        match self {
            Outbox::Unbounded(tx) => tx.send(event).map_err(|_| Error::TransportClosed),
            Outbox::Bounded(tx) => tx.try_send(event).map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => Error::QueueOverflow {
                    capacity: tx.max_capacity(),
                },
                mpsc::error::TrySendError::Closed(_) => Error::TransportClosed,
            }),
        }
    }
}

/// Receiving half of a client queue, owned by the streaming side
enum Inbox {
    Unbounded(mpsc::UnboundedReceiver<Event>),
    Bounded(mpsc::Receiver<Event>),
}

impl Inbox {
    async fn recv(&mut self) -> Option<Event> {
        match self {
            Inbox::Unbounded(rx) => rx.recv().await,
            Inbox::Bounded(rx) => rx.recv().await,
        }
    }
}

fn client_queue(policy: QueuePolicy) -> (Outbox, Inbox) {
    match policy {
        QueuePolicy::Unbounded => {
            let (tx, rx) = mpsc::unbounded_channel();
            (Outbox::Unbounded(tx), Inbox::Unbounded(rx))
        }
        QueuePolicy::Bounded { capacity } => {
            let (tx, rx) = mpsc::channel(capacity.max(1));
            (Outbox::Bounded(tx), Inbox::Bounded(rx))
        }
    }
}

/// Handle to the broker's control loop
///
/// Cloning is cheap; every clone talks to the same loop.
#[derive(Clone)]
pub struct Broker {
    sender: mpsc::UnboundedSender<BrokerCommand>,
    policy: QueuePolicy,
}

impl Broker {
    /// Create a broker and spawn its control loop.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: BrokerConfig) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(run_control_loop(receiver));

        info!("Event broker started with {:?} client queues", config.queue);

        Self {
            sender,
            policy: config.queue,
        }
    }

    /// Register a new client with an empty queue.
    ///
    /// Every event published after this returns is delivered to the handle.
    pub async fn register(&self) -> ClientHandle {
        let (outbox, inbox) = client_queue(self.policy);
        let (reply, registered) = oneshot::channel();

        let id = match self.sender.send(BrokerCommand::Register { outbox, reply }) {
            Ok(()) => registered.await.ok(),
            Err(_) => None,
        };

        // Without a loop the outbox is already dropped, so the handle's
        // queue reads as closed and its stream ends immediately.
        let id = id.unwrap_or_else(|| {
            error!("Event broker is not running, client left detached");
            ClientId::DETACHED
        });

        ClientHandle {
            id,
            inbox,
            broker: self.clone(),
        }
    }

    /// Remove a client from the registry; a no-op for unknown ids
    pub fn deregister(&self, id: ClientId) {
        if id == ClientId::DETACHED {
            return;
        }
        let _ = self.sender.send(BrokerCommand::Deregister(id));
    }

    /// Queue an event for every client registered at the moment the
    /// control loop handles it. Never blocks.
    pub fn publish(&self, event: Event) {
        if self.sender.send(BrokerCommand::Publish(event)).is_err() {
            warn!("Event broker is not running, dropped {}", event);
        }
    }

    /// Number of registered clients
    pub async fn client_count(&self) -> usize {
        let (reply, count) = oneshot::channel();
        if self.sender.send(BrokerCommand::Count(reply)).is_err() {
            return 0;
        }
        count.await.unwrap_or(0)
    }

    /// Disconnect every client and stop the control loop. Streams end once
    /// their queues drain; later registrations come back already closed.
    pub fn shutdown(&self) {
        let _ = self.sender.send(BrokerCommand::Shutdown);
    }
}

/// One registered viewer's end of the broker
///
/// Dropping the handle deregisters it, so a connection that both closes
/// and fails a write still deregisters exactly once.
pub struct ClientHandle {
    id: ClientId,
    inbox: Inbox,
    broker: Broker,
}

impl ClientHandle {
    /// Registry identity of this client
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Wait for the next event; `None` once the broker dropped the client
    pub async fn recv(&mut self) -> Option<Event> {
        self.inbox.recv().await
    }
}

impl Drop for ClientHandle {
    fn drop(&mut self) {
        self.broker.deregister(self.id);
    }
}

impl fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientHandle").field("id", &self.id).finish()
    }
}

/// Set of registered clients. Only the control loop touches it.
struct Registry {
    next_id: u64,
    clients: HashMap<ClientId, Outbox>,
}

impl Registry {
    fn new() -> Self {
        Self {
            next_id: 1,
            clients: HashMap::new(),
        }
    }

    fn len(&self) -> usize {
        self.clients.len()
    }

    fn insert(&mut self, outbox: Outbox) -> ClientId {
        let id = ClientId(self.next_id);
        self.next_id += 1;
        self.clients.insert(id, outbox);
        id
    }

    fn remove(&mut self, id: ClientId) -> bool {
        self.clients.remove(&id).is_some()
    }

    /// Enqueue onto every client, dropping the ones that cannot take it.
    /// Returns the number of clients that received the event.
    fn fan_out(&mut self, event: Event) -> usize {
        let mut failed = Vec::new();
        for (id, outbox) in &self.clients {
            if let Err(e) = outbox.push(event) {
                failed.push((*id, e));
            }
        }

        for (id, reason) in &failed {
            self.clients.remove(id);
            match reason {
                Error::QueueOverflow { .. } => {
                    warn!("Client {} disconnected: {}", id, reason);
                    metrics::counter!("remotephoto_clients_dropped_total").increment(1);
                }
                _ => debug!("Client {} removed during fan-out: {}", id, reason),
            }
        }

        self.clients.len()
    }
}

async fn run_control_loop(mut receiver: mpsc::UnboundedReceiver<BrokerCommand>) {
    let mut registry = Registry::new();

    while let Some(cmd) = receiver.recv().await {
        match cmd {
            BrokerCommand::Register { outbox, reply } => {
                let id = registry.insert(outbox);
                info!("Client {} connected ({} registered)", id, registry.len());
                if reply.send(id).is_err() {
                    // Registering task went away before learning its id
                    registry.remove(id);
                }
            }
            BrokerCommand::Deregister(id) => {
                if registry.remove(id) {
                    info!("Client {} disconnected ({} registered)", id, registry.len());
                }
            }
            BrokerCommand::Publish(event) => {
                metrics::counter!("remotephoto_events_published_total", "event" => event.name())
                    .increment(1);
                if registry.len() == 0 {
                    trace!("No clients registered, dropped {}", event);
                    continue;
                }
                let delivered = registry.fan_out(event);
                debug!("Published {} to {} clients", event, delivered);
            }
            BrokerCommand::Count(reply) => {
                let _ = reply.send(registry.len());
            }
            BrokerCommand::Shutdown => {
                info!("Event broker shutting down, disconnecting {} clients", registry.len());
                break;
            }
        }

        metrics::gauge!("remotephoto_clients_connected").set(registry.len() as f64);
    }

    debug!("Event broker control loop stopped");
}
