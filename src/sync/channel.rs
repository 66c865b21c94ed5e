//! Status sync channel: one push subscription per pipeline, merging
//! verification updates into a [`StatusCache`].
//!
//! State machine:
//!
//! ```text
//! Disconnected ──subscribe──▶ Connecting ──Opened──▶ Open
//!                                 │                   │
//!                                 └──failure/close────┴──▶ Closed ──subscribe──▶ Connecting
//! ```
//!
//! There is no automatic reconnect. Only a fresh `subscribe` leaves `Closed`.

use crossbeam_channel::{Receiver, TryRecvError};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::event::{ClientMessage, ServerEvent, StatusCache};
use super::transport::{Connection, Link, Transport, TransportEvent};
use crate::error::{InboxError, Result};

/// Lifecycle of the push connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Never subscribed.
    Disconnected,
    /// Connection requested, not yet established.
    Connecting,
    /// Established and subscribed.
    Open,
    /// Closed by failure or teardown; needs a new `subscribe`.
    Closed,
}

/// Counters for inbound frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    /// Verification updates merged into the cache.
    pub applied: u64,
    /// Frames dropped as malformed or received while not open.
    pub dropped: u64,
}

/// A push subscription for one address.
pub struct Subscription {
    address: String,
    state: ConnectionState,
    connection: Option<Box<dyn Connection>>,
    events: Option<Receiver<TransportEvent>>,
}

impl Subscription {
    fn connecting(address: String, link: Link) -> Self {
        Self {
            address,
            state: ConnectionState::Connecting,
            connection: Some(link.connection),
            events: Some(link.events),
        }
    }

    fn failed(address: String) -> Self {
        Self {
            address,
            state: ConnectionState::Closed,
            connection: None,
            events: None,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    fn is_live(&self) -> bool {
        matches!(self.state, ConnectionState::Connecting | ConnectionState::Open)
    }

    /// Next queued transport event, if any.
    ///
    /// A queue whose sender has gone away reads as `Closed`.
    fn next_event(&mut self) -> Option<TransportEvent> {
        let events = self.events.as_ref()?;
        match events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.events = None;
                Some(TransportEvent::Closed)
            }
        }
    }

    fn send(&mut self, message: &ClientMessage) -> Result<()> {
        let frame = serde_json::to_string(message)
            .map_err(|e| InboxError::Transport(format!("encoding frame: {e}")))?;
        match self.connection.as_mut() {
            Some(conn) => conn.send(&frame),
            None => Err(InboxError::Transport("connection is not available".into())),
        }
    }

    fn close(&mut self) {
        if let Some(mut conn) = self.connection.take() {
            conn.close();
        }
        self.events = None;
        self.state = ConnectionState::Closed;
    }
}

/// Owns the single push subscription and the verification status cache.
pub struct StatusSync<T: Transport> {
    transport: T,
    subscription: Option<Subscription>,
    statuses: StatusCache,
    stats: SyncStats,
    /// Maximum events handled per `pump` call (0 = unlimited).
    max_events_per_pump: usize,
}

impl<T: Transport> StatusSync<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            subscription: None,
            statuses: StatusCache::default(),
            stats: SyncStats::default(),
            max_events_per_pump: 0,
        }
    }

    /// Limit how many queued events one `pump` call handles.
    pub fn with_event_budget(mut self, max_events_per_pump: usize) -> Self {
        self.max_events_per_pump = max_events_per_pump;
        self
    }

    /// Subscribe to push events for `address`.
    ///
    /// Any live connection is closed first. On connect failure the channel
    /// ends up `Closed` and the error is returned.
    pub fn subscribe(&mut self, address: &str) -> Result<()> {
        self.close();

        info!(address, "Subscribing to verification updates");
        match self.transport.connect() {
            Ok(link) => {
                self.subscription = Some(Subscription::connecting(address.to_string(), link));
                Ok(())
            }
            Err(e) => {
                warn!(address, error = %e, "Push connection failed");
                self.subscription = Some(Subscription::failed(address.to_string()));
                Err(e)
            }
        }
    }

    /// Drain queued transport events in arrival order. Returns how many were handled.
    pub fn pump(&mut self) -> usize {
        let budget = match self.max_events_per_pump {
            0 => usize::MAX,
            n => n,
        };

        let mut handled = 0;
        while handled < budget {
            let Some(event) = self.subscription.as_mut().and_then(Subscription::next_event) else {
                break;
            };
            self.apply(event);
            handled += 1;
        }
        handled
    }

    /// Apply a single transport event to the state machine.
    pub fn apply(&mut self, event: TransportEvent) {
        let Some(sub) = self.subscription.as_mut() else {
            debug!(?event, "Event with no subscription, dropping");
            return;
        };

        match event {
            TransportEvent::Opened => {
                if sub.state != ConnectionState::Connecting {
                    debug!(state = ?sub.state, "Unexpected open notification");
                    return;
                }
                sub.state = ConnectionState::Open;
                let intent = ClientMessage::Subscribe {
                    address: sub.address.clone(),
                };
                if let Err(e) = sub.send(&intent) {
                    warn!(address = %sub.address, error = %e, "Could not send subscribe intent");
                    sub.close();
                    return;
                }
                info!(address = %sub.address, "Push channel open");
            }
            TransportEvent::Frame(frame) => {
                if sub.state != ConnectionState::Open {
                    debug!(state = ?sub.state, "Frame before channel open, dropping");
                    self.stats.dropped += 1;
                    return;
                }
                match ServerEvent::parse(&frame) {
                    Some(ServerEvent::VerificationUpdate { message_id, status }) => {
                        debug!(message_id = %message_id, status = %status, "Verification update");
                        self.statuses.upsert(message_id, status);
                        self.stats.applied += 1;
                    }
                    None => {
                        debug!(len = frame.len(), "Malformed push frame, dropping");
                        self.stats.dropped += 1;
                    }
                }
            }
            TransportEvent::Closed => {
                info!(address = %sub.address, "Push channel closed by server");
                sub.close();
            }
            TransportEvent::Failed(reason) => {
                warn!(address = %sub.address, reason = %reason, "Push channel failed");
                sub.close();
            }
        }
    }

    /// Close the live connection, if any.
    pub fn close(&mut self) {
        if let Some(sub) = self.subscription.as_mut() {
            if sub.is_live() {
                info!(address = %sub.address, "Closing push channel");
            }
            sub.close();
        }
    }

    /// Record a status delivered by a fetch response.
    ///
    /// Only the first status seen for a message id is kept; after that the
    /// entry changes through push events alone, so a stale fetch cannot
    /// roll back a pushed status.
    pub fn seed(&mut self, message_id: &str, status: &str) {
        if self.statuses.seed_if_absent(message_id, status) != status {
            debug!(message_id, status, "Status already known, keeping cached value");
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.subscription
            .as_ref()
            .map_or(ConnectionState::Disconnected, Subscription::state)
    }

    pub fn subscription(&self) -> Option<&Subscription> {
        self.subscription.as_ref()
    }

    pub fn status(&self, message_id: &str) -> Option<&str> {
        self.statuses.get(message_id)
    }

    pub fn statuses(&self) -> &StatusCache {
        &self.statuses
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }
}

impl<T: Transport> Drop for StatusSync<T> {
    fn drop(&mut self) {
        self.close();
    }
}
