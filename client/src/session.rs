//! Per-connection client session
//!
//! A `ClientSession` owns everything that lives for one connection: the
//! sequence counter and pending queue, the entity store, the reconciliation
//! watermark and the fire limiter. The host creates it on connect, drives it
//! through [`ClientSession::tick`] and [`ClientSession::handle_message`] from a
//! single execution context, and drops it (or calls
//! [`ClientSession::disconnect`]) when the connection ends.
//!
//! Movement inputs are only generated once the server has told us which player
//! is ours and a snapshot containing that player has arrived; before that there
//! is no position to predict from and the server has nothing to apply them to.

use crate::error::ClientError;
use crate::network::Transport;
use crate::prediction::LocalPredictor;
use crate::rate_limiter::RateLimiter;
use crate::reconcile::{ReconcileOutcome, Reconciler, Reconciliation, SkipReason};
use crate::store::EntityStore;
use log::{debug, info, warn};
use shared::{ArenaBounds, ClientMessage, FireRequest, MovementIntent, ServerMessage, Vector2};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Active,
    /// The server reported a fatal error. Nothing is predicted or sent anymore.
    Terminated { reason: String },
}

/// What handling one inbound message did.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Bootstrapped { id: String },
    Reconciled(Reconciliation),
    Skipped(SkipReason),
    Terminated { reason: String },
    /// The session was already terminated; the message was dropped.
    Ignored,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub inputs_sent: u64,
    pub fires_sent: u64,
    pub snapshots_applied: u64,
    pub stale_acks: u64,
    pub missing_local: u64,
    /// Inbound frames that failed to decode.
    pub frames_rejected: u64,
}

pub struct ClientSession {
    bounds: ArenaBounds,
    store: EntityStore,
    predictor: LocalPredictor,
    reconciler: Reconciler,
    fire_limiter: RateLimiter,
    state: SessionState,
    stats: SessionStats,
}

impl ClientSession {
    pub fn new(bounds: ArenaBounds, fire_interval: Duration) -> Self {
        Self {
            bounds,
            store: EntityStore::new(),
            predictor: LocalPredictor::new(),
            reconciler: Reconciler::new(),
            fire_limiter: RateLimiter::new(fire_interval),
            state: SessionState::Active,
            stats: SessionStats::default(),
        }
    }

    /// One prediction tick. Returns the sequence number sent, if any.
    pub fn tick(&mut self, intent: MovementIntent, transport: &mut impl Transport) -> Option<u64> {
        if self.is_terminated() {
            return None;
        }
        // The latest snapshot must still contain the local player. The retained
        // position outlives it for rendering but is not predicted from.
        self.store.local_player()?;
        let mut position = self.store.local_position()?;

        let sequence = self.predictor.next_sequence();
        let message = self.predictor.tick(intent, &mut position, &self.bounds)?;
        self.store.set_local_position(position);
        transport.send(message);
        self.stats.inputs_sent += 1;
        Some(sequence)
    }

    /// Fires toward `pointer` if the limiter window allows it.
    ///
    /// Suppressed without touching the limiter before bootstrap, while the local
    /// player is absent from the latest snapshot or respawning, and after
    /// termination.
    pub fn fire(&mut self, pointer: Vector2, now: Instant, transport: &mut impl Transport) -> bool {
        if self.is_terminated() {
            return false;
        }
        let (owner, origin) = match (self.store.local_id(), self.store.local_position()) {
            (Some(id), Some(position)) => (id.to_string(), position),
            _ => return false,
        };
        match self.store.local_player() {
            Some(player) if !player.is_respawning() => {}
            _ => return false,
        }
        if !self.fire_limiter.try_acquire(now) {
            return false;
        }

        let direction = Vector2::new(pointer.x - origin.x, pointer.y - origin.y).normalized();
        debug!("Firing toward ({:.2}, {:.2})", direction.x, direction.y);
        transport.send(ClientMessage::Fire {
            bullet: FireRequest { owner, direction },
        });
        self.stats.fires_sent += 1;
        true
    }

    /// Asks the server for a new hue.
    pub fn reskin(&mut self, transport: &mut impl Transport) -> bool {
        if self.is_terminated() || self.store.local_id().is_none() {
            return false;
        }
        transport.send(ClientMessage::Reskin);
        true
    }

    pub fn handle_message(&mut self, message: ServerMessage) -> SessionEvent {
        if self.is_terminated() {
            return SessionEvent::Ignored;
        }

        match message {
            ServerMessage::Bootstrap { id } => {
                info!("Bootstrapped as player {}", id);
                self.store.set_local_id(id.clone());
                SessionEvent::Bootstrapped { id }
            }

            ServerMessage::Update { players, bullets } => {
                let outcome = self.reconciler.apply(
                    &mut self.store,
                    self.predictor.pending_mut(),
                    players,
                    bullets,
                    &self.bounds,
                );
                match outcome {
                    ReconcileOutcome::Reconciled(reconciliation) => {
                        self.stats.snapshots_applied += 1;
                        SessionEvent::Reconciled(reconciliation)
                    }
                    ReconcileOutcome::Skipped(reason) => {
                        match reason {
                            SkipReason::MissingLocalPlayer => self.stats.missing_local += 1,
                            SkipReason::StaleAck { .. } => self.stats.stale_acks += 1,
                        }
                        SessionEvent::Skipped(reason)
                    }
                }
            }

            ServerMessage::Error { error } => {
                warn!("Server error, stopping session: {}", error);
                self.state = SessionState::Terminated {
                    reason: error.clone(),
                };
                SessionEvent::Terminated { reason: error }
            }
        }
    }

    /// Decodes a text frame and handles it. Undecodable frames leave the session
    /// untouched.
    pub fn handle_text(&mut self, text: &str) -> Result<SessionEvent, ClientError> {
        match ServerMessage::decode(text) {
            Ok(message) => Ok(self.handle_message(message)),
            Err(e) => {
                warn!("Dropping server message: {}", e);
                self.stats.frames_rejected += 1;
                Err(e.into())
            }
        }
    }

    /// Ends the session, discarding the pending queue and sequence counter
    /// together. Returns how many inputs were still unacknowledged.
    pub fn disconnect(self) -> usize {
        let discarded = self.predictor.pending().len();
        info!(
            "Disconnecting with {} unacknowledged inputs (next sequence {})",
            discarded,
            self.predictor.next_sequence()
        );
        discarded
    }

    /// `Err` once the server has terminated the session.
    pub fn status(&self) -> Result<(), ClientError> {
        match &self.state {
            SessionState::Active => Ok(()),
            SessionState::Terminated { reason } => Err(ClientError::Server(reason.clone())),
        }
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self.state, SessionState::Terminated { .. })
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn predictor(&self) -> &LocalPredictor {
        &self.predictor
    }

    pub fn bounds(&self) -> &ArenaBounds {
        &self.bounds
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Predicted position of the local player, if known.
    pub fn predicted_position(&self) -> Option<Vector2> {
        self.store.local_position()
    }
}
