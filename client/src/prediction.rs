//! Local prediction: sequence numbering, the pending-input queue, and the
//! speculative movement step

use log::debug;
use shared::{simulate, ArenaBounds, ClientMessage, MovementIntent, Vector2};
use std::collections::VecDeque;

/// An input that has been sent but not yet acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingInput {
    pub sequence: u64,
    pub movement: MovementIntent,
}

/// Inputs in send order. Only ever appended at the back and trimmed at the front.
#[derive(Debug, Default, Clone)]
pub struct PendingQueue {
    inputs: VecDeque<PendingInput>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, input: PendingInput) {
        debug_assert!(self
            .inputs
            .back()
            .map_or(true, |last| last.sequence < input.sequence));
        self.inputs.push_back(input);
    }

    /// Removes every input at the front with `sequence <= acked` and returns how
    /// many were removed. Stops at the first unacknowledged input.
    pub fn drain_acknowledged(&mut self, acked: u64) -> usize {
        let mut drained = 0;
        while let Some(front) = self.inputs.front() {
            if front.sequence > acked {
                break;
            }
            self.inputs.pop_front();
            drained += 1;
        }
        drained
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingInput> {
        self.inputs.iter()
    }

    pub fn intents(&self) -> impl Iterator<Item = &MovementIntent> {
        self.inputs.iter().map(|input| &input.movement)
    }

    pub fn front(&self) -> Option<&PendingInput> {
        self.inputs.front()
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

/// Assigns sequence numbers, records pending inputs, and applies them locally
/// without waiting for the server.
#[derive(Debug, Clone)]
pub struct LocalPredictor {
    next_sequence: u64,
    pending: PendingQueue,
}

impl Default for LocalPredictor {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalPredictor {
    pub fn new() -> Self {
        Self {
            next_sequence: 1,
            pending: PendingQueue::new(),
        }
    }

    /// Runs one prediction tick.
    ///
    /// An idle intent produces nothing and consumes no sequence number. Otherwise
    /// the input is queued, `position` is advanced in place with the shared
    /// simulator, and the movement message to send is returned.
    pub fn tick(
        &mut self,
        intent: MovementIntent,
        position: &mut Vector2,
        bounds: &ArenaBounds,
    ) -> Option<ClientMessage> {
        if intent.is_idle() {
            return None;
        }

        let sequence = self.next_sequence;
        self.pending.push(PendingInput {
            sequence,
            movement: intent,
        });

        let before = *position;
        *position = simulate(before, &intent, bounds);
        self.next_sequence += 1;

        debug!(
            "Predicted input {}: ({:.1}, {:.1}) -> ({:.1}, {:.1})",
            sequence, before.x, before.y, position.x, position.y
        );

        Some(ClientMessage::Movement {
            sequence,
            movement: intent,
        })
    }

    /// Sequence number the next non-idle input will carry.
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    pub fn pending(&self) -> &PendingQueue {
        &self.pending
    }

    pub(crate) fn pending_mut(&mut self) -> &mut PendingQueue {
        &mut self.pending
    }
}
