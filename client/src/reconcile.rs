//! Server reconciliation: trim acknowledged inputs and replay the rest on top of
//! the authoritative position

use crate::prediction::PendingQueue;
use crate::store::EntityStore;
use log::debug;
use shared::{replay, ArenaBounds, Bullet, PlayerState, Vector2};

/// Why a snapshot did not move the local prediction. Neither stops the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No local id yet, or the snapshot does not contain the local player.
    MissingLocalPlayer,
    /// The snapshot acknowledges less than a snapshot already applied.
    StaleAck { last_seen: u64, received: u64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub acked: u64,
    pub drained: usize,
    pub replayed: usize,
    pub authoritative: Vector2,
    pub predicted: Vector2,
    /// Distance between the prediction before and after this snapshot.
    pub correction: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    Reconciled(Reconciliation),
    Skipped(SkipReason),
}

#[derive(Debug, Default, Clone)]
pub struct Reconciler {
    last_acked: Option<u64>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_acked(&self) -> Option<u64> {
        self.last_acked
    }

    /// Applies one authoritative snapshot.
    ///
    /// The store always takes the snapshot's players and bullets. The local
    /// player's entry is then overwritten with the replayed prediction, or with
    /// the retained prediction when the snapshot's acknowledgement is stale.
    pub fn apply(
        &mut self,
        store: &mut EntityStore,
        pending: &mut PendingQueue,
        players: Vec<PlayerState>,
        bullets: Vec<Bullet>,
        bounds: &ArenaBounds,
    ) -> ReconcileOutcome {
        let previous = store.local_position();
        store.replace(players, bullets);

        let (authoritative, acked) = match store.local_player() {
            Some(player) => (player.position, player.last_acked_sequence),
            None => {
                debug!("Snapshot has no local player, keeping prediction");
                return ReconcileOutcome::Skipped(SkipReason::MissingLocalPlayer);
            }
        };

        if let Some(last_seen) = self.last_acked.filter(|last| acked < *last) {
            debug!("Stale ack {} (already saw {}), keeping prediction", acked, last_seen);
            if let Some(position) = previous {
                store.set_local_position(position);
            }
            return ReconcileOutcome::Skipped(SkipReason::StaleAck {
                last_seen,
                received: acked,
            });
        }

        let drained = pending.drain_acknowledged(acked);
        let predicted = replay(authoritative, pending.intents(), bounds);
        store.set_local_position(predicted);
        self.last_acked = Some(acked);

        let correction = previous.map_or(0.0, |p| p.distance_to(predicted));
        if correction > 0.0 {
            debug!("Reconciliation corrected prediction by {:.2}", correction);
        }

        ReconcileOutcome::Reconciled(Reconciliation {
            acked,
            drained,
            replayed: pending.len(),
            authoritative,
            predicted,
            correction,
        })
    }
}
