//! Transport seam and a loopback link for driving a session headlessly
//!
//! The session never talks to a socket: it hands finished messages to a
//! [`Transport`]. For local runs and tests this module provides a lossy,
//! latent [`DelayLine`] in each direction and a [`LoopbackAuthority`] that
//! applies movement with the same shared simulator the client predicts with.

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::input::{InputSampler, RandomWalk};
use crate::session::{ClientSession, SessionStats};
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{
    simulate, ArenaBounds, Bullet, ClientMessage, PlayerState, ServerMessage, Vector2,
    BULLET_MOVE_DELTA, BULLET_RADIUS,
};
use std::time::{Duration, Instant};
use tokio::time::{interval, sleep, MissedTickBehavior};

/// Outbound half of a connection. Sending is fire-and-forget: delivery is not
/// guaranteed and nothing is reported back.
pub trait Transport {
    fn send(&mut self, message: ClientMessage);
}

impl Transport for Vec<ClientMessage> {
    fn send(&mut self, message: ClientMessage) {
        self.push(message);
    }
}

/// Tick-based in-flight queue that delays, reorders and drops messages.
pub struct DelayLine<T> {
    latency: u64,
    jitter: u64,
    drop_rate: f64,
    rng: StdRng,
    now: u64,
    next_order: u64,
    in_flight: Vec<(u64, u64, T)>,
    dropped: u64,
}

impl<T> DelayLine<T> {
    /// `latency` and `jitter` are in ticks; each item is delivered after
    /// `latency + [0, jitter]` ticks unless dropped.
    pub fn new(latency: u64, jitter: u64, drop_rate: f64, seed: u64) -> Self {
        let drop_rate = if drop_rate.is_nan() {
            0.0
        } else {
            drop_rate.clamp(0.0, 1.0)
        };
        Self {
            latency,
            jitter,
            drop_rate,
            rng: StdRng::seed_from_u64(seed),
            now: 0,
            next_order: 0,
            in_flight: Vec::new(),
            dropped: 0,
        }
    }

    /// Zero-latency, lossless line.
    pub fn perfect() -> Self {
        Self::new(0, 0, 0.0, 0)
    }

    pub fn push(&mut self, item: T) {
        if self.drop_rate > 0.0 && self.rng.gen_bool(self.drop_rate) {
            self.dropped += 1;
            return;
        }
        let extra = if self.jitter > 0 {
            self.rng.gen_range(0..=self.jitter)
        } else {
            0
        };
        self.in_flight
            .push((self.now + self.latency + extra, self.next_order, item));
        self.next_order += 1;
    }

    /// Advances one tick and returns everything due, in arrival order.
    pub fn advance(&mut self) -> Vec<T> {
        self.now += 1;
        let now = self.now;
        self.take_where(|deliver_at| deliver_at <= now)
    }

    /// Delivers everything still in flight.
    pub fn flush(&mut self) -> Vec<T> {
        self.take_where(|_| true)
    }

    fn take_where(&mut self, due: impl Fn(u64) -> bool) -> Vec<T> {
        let (mut ready, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.in_flight)
            .into_iter()
            .partition(|(deliver_at, _, _)| due(*deliver_at));
        self.in_flight = waiting;
        ready.sort_by_key(|(deliver_at, order, _)| (*deliver_at, *order));
        ready.into_iter().map(|(_, _, item)| item).collect()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl Transport for DelayLine<String> {
    fn send(&mut self, message: ClientMessage) {
        match message.encode() {
            Ok(text) => self.push(text),
            Err(e) => error!("Failed to encode {} message: {}", message.kind(), e),
        }
    }
}

/// Stand-in for the room server: owns authoritative player and bullet state and
/// produces `update` snapshots.
///
/// Movement received during a step is applied in ascending sequence order per
/// player; inputs older than the player's last applied sequence are discarded.
pub struct LoopbackAuthority {
    bounds: ArenaBounds,
    players: Vec<PlayerState>,
    bullets: Vec<Bullet>,
    inbox: Vec<(String, ClientMessage)>,
    rng: StdRng,
    next_id: u32,
}

impl LoopbackAuthority {
    pub fn new(bounds: ArenaBounds, seed: u64) -> Self {
        Self {
            bounds,
            players: Vec::new(),
            bullets: Vec::new(),
            inbox: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
            next_id: 1,
        }
    }

    /// Adds a player at a random legal position and returns its bootstrap message.
    pub fn join(&mut self) -> ServerMessage {
        let position = Vector2::new(
            self.rng.gen_range(self.bounds.radius..=self.bounds.max_x()),
            self.rng.gen_range(self.bounds.radius..=self.bounds.max_y()),
        );
        self.join_at(position)
    }

    pub fn join_at(&mut self, position: Vector2) -> ServerMessage {
        let id = format!("player-{}", self.next_id);
        self.next_id += 1;
        let player = PlayerState {
            hue: self.rng.gen_range(0..360),
            ..PlayerState::new(id.clone(), position)
        };
        info!(
            "Player {} joined at ({:.1}, {:.1})",
            id, position.x, position.y
        );
        self.players.push(player);
        ServerMessage::Bootstrap { id }
    }

    pub fn leave(&mut self, id: &str) {
        self.players.retain(|p| p.id != id);
        self.bullets.retain(|b| b.owner_id != id);
    }

    pub fn receive(&mut self, from: &str, message: ClientMessage) {
        self.inbox.push((from.to_string(), message));
    }

    /// Applies everything received since the last step, moves bullets, and
    /// returns the resulting snapshot.
    pub fn step(&mut self) -> ServerMessage {
        let mut inbox = std::mem::take(&mut self.inbox);
        inbox.sort_by_key(|(id, message)| match message {
            ClientMessage::Movement { sequence, .. } => (id.clone(), *sequence),
            _ => (id.clone(), 0),
        });

        for (id, message) in inbox {
            let Some(index) = self.players.iter().position(|p| p.id == id) else {
                debug!("Message from unknown player {}", id);
                continue;
            };
            match message {
                ClientMessage::Movement { sequence, movement } => {
                    let player = &mut self.players[index];
                    if sequence <= player.last_acked_sequence {
                        debug!("Discarding late input {} from {}", sequence, id);
                        continue;
                    }
                    player.position = simulate(player.position, &movement, &self.bounds);
                    player.last_acked_sequence = sequence;
                }
                ClientMessage::Fire { bullet } => {
                    let player = &self.players[index];
                    if player.is_respawning() {
                        continue;
                    }
                    let direction = bullet.direction;
                    self.bullets.push(Bullet {
                        owner_id: player.id.clone(),
                        position: Vector2::new(
                            player.position.x + direction.x * BULLET_MOVE_DELTA,
                            player.position.y + direction.y * BULLET_MOVE_DELTA,
                        ),
                        direction,
                    });
                }
                ClientMessage::Reskin => {
                    self.players[index].hue = self.rng.gen_range(0..360);
                }
            }
        }

        for bullet in &mut self.bullets {
            bullet.position.x += bullet.direction.x * BULLET_MOVE_DELTA;
            bullet.position.y += bullet.direction.y * BULLET_MOVE_DELTA;
        }
        let (width, height) = (self.bounds.width, self.bounds.height);
        self.bullets.retain(|b| {
            b.position.x - BULLET_RADIUS >= 0.0
                && b.position.y - BULLET_RADIUS >= 0.0
                && b.position.x + BULLET_RADIUS <= width
                && b.position.y + BULLET_RADIUS <= height
        });

        self.snapshot()
    }

    pub fn snapshot(&self) -> ServerMessage {
        ServerMessage::Update {
            players: self.players.clone(),
            bullets: self.bullets.clone(),
        }
    }

    pub fn player(&self, id: &str) -> Option<&PlayerState> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn bullets(&self) -> &[Bullet] {
        &self.bullets
    }
}

/// Result of a headless run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    pub stats: SessionStats,
    pub uplink_dropped: u64,
    pub downlink_dropped: u64,
    /// Inputs still waiting for acknowledgement after the final snapshot.
    pub unacknowledged: usize,
    pub predicted: Option<Vector2>,
    pub authoritative: Option<Vector2>,
}

impl RunSummary {
    /// Distance between the client's prediction and the authority's position.
    pub fn divergence(&self) -> Option<f64> {
        match (self.predicted, self.authoritative) {
            (Some(p), Some(a)) => Some(p.distance_to(a)),
            _ => None,
        }
    }
}

/// Drives a [`ClientSession`] against a [`LoopbackAuthority`] over two
/// [`DelayLine`]s, with a [`RandomWalk`] standing in for the player.
pub struct Client {
    config: ClientConfig,
    session: ClientSession,
    sampler: InputSampler,
    script: RandomWalk,
    authority: LoopbackAuthority,
    uplink: DelayLine<String>,
    downlink: DelayLine<String>,
    player_id: Option<String>,
    ticks: u64,
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        let latency = config.one_way_latency_ticks();
        let jitter = config.jitter_ticks();
        Self {
            session: ClientSession::new(config.bounds, config.fire_interval),
            sampler: InputSampler::new(),
            script: RandomWalk::new(config.seed),
            authority: LoopbackAuthority::new(config.bounds, config.seed.wrapping_add(1)),
            uplink: DelayLine::new(latency, jitter, config.drop_rate, config.seed.wrapping_add(2)),
            downlink: DelayLine::new(latency, jitter, config.drop_rate, config.seed.wrapping_add(3)),
            player_id: None,
            ticks: 0,
            config,
        }
    }

    pub fn session(&self) -> &ClientSession {
        &self.session
    }

    pub fn authority(&self) -> &LoopbackAuthority {
        &self.authority
    }

    fn connect(&mut self) {
        if self.player_id.is_some() {
            return;
        }
        let bootstrap = self.authority.join();
        if let ServerMessage::Bootstrap { id } = &bootstrap {
            self.player_id = Some(id.clone());
        }
        // The handshake reply is written before the connection joins the room's
        // broadcast, so it is never lost. The update that follows it can be.
        match bootstrap.encode() {
            Ok(text) => self.deliver_down(vec![text]),
            Err(e) => error!("Failed to encode bootstrap: {}", e),
        }
        let snapshot = self.authority.snapshot();
        self.send_down(&snapshot);
    }

    fn send_down(&mut self, message: &ServerMessage) {
        match message.encode() {
            Ok(text) => self.downlink.push(text),
            Err(e) => error!("Failed to encode snapshot: {}", e),
        }
    }

    fn deliver_up(&mut self, frames: Vec<String>) {
        let Some(id) = self.player_id.clone() else {
            return;
        };
        for text in frames {
            match ClientMessage::decode(&text) {
                Ok(message) => self.authority.receive(&id, message),
                Err(e) => warn!("Authority dropped client frame: {}", e),
            }
        }
    }

    fn deliver_down(&mut self, frames: Vec<String>) {
        for text in frames {
            // The session counts rejected frames in its stats.
            if let Err(e) = self.session.handle_text(&text) {
                debug!("Downlink frame not applied: {}", e);
            }
        }
    }

    /// One prediction tick plus one tick of link time.
    fn step_tick(&mut self, now: Instant) {
        self.script.drive(&mut self.sampler, &self.config.bounds);

        self.session.tick(self.sampler.sample(), &mut self.uplink);
        if self.sampler.trigger_held() {
            self.session
                .fire(self.sampler.pointer(), now, &mut self.uplink);
        }

        let up = self.uplink.advance();
        self.deliver_up(up);
        let down = self.downlink.advance();
        self.deliver_down(down);
        self.ticks += 1;
    }

    fn broadcast(&mut self) {
        let snapshot = self.authority.step();
        self.send_down(&snapshot);
    }

    /// Stops input, lets everything in flight land, and delivers one final
    /// snapshot losslessly.
    fn settle(&mut self) {
        let up = self.uplink.flush();
        self.deliver_up(up);
        let snapshot = self.authority.step();
        let down = self.downlink.flush();
        self.deliver_down(down);
        if let Ok(text) = snapshot.encode() {
            self.deliver_down(vec![text]);
        }
    }

    fn summary(&self) -> RunSummary {
        RunSummary {
            ticks: self.ticks,
            stats: self.session.stats(),
            uplink_dropped: self.uplink.dropped(),
            downlink_dropped: self.downlink.dropped(),
            unacknowledged: self.session.predictor().pending().len(),
            predicted: self.session.predicted_position(),
            authoritative: self
                .player_id
                .as_deref()
                .and_then(|id| self.authority.player(id))
                .map(|p| p.position),
        }
    }

    /// Runs `ticks` prediction ticks without wall-clock pacing.
    pub fn run_ticks(&mut self, ticks: u64) -> Result<RunSummary, ClientError> {
        self.connect();
        let per_snapshot = (self.config.tick_rate / self.config.snapshot_rate.max(1)).max(1) as u64;
        let start = Instant::now();
        let tick = self.config.tick_interval();

        for n in 0..ticks {
            self.step_tick(start + tick * n as u32);
            if (n + 1) % per_snapshot == 0 {
                self.broadcast();
            }
            self.session.status()?;
        }

        self.settle();
        self.session.status()?;
        Ok(self.summary())
    }

    /// Runs in real time for `duration`, or until Ctrl+C.
    pub async fn run(&mut self, duration: Duration) -> Result<RunSummary, ClientError> {
        info!("Connecting to loopback authority...");
        self.connect();

        let mut tick_interval = interval(self.config.tick_interval());
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut snapshot_interval = interval(self.config.snapshot_interval());
        snapshot_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let deadline = sleep(duration);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = tick_interval.tick() => {
                    self.step_tick(Instant::now());
                },

                _ = snapshot_interval.tick() => {
                    self.broadcast();
                },

                _ = &mut deadline => {
                    break;
                },

                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl+C, stopping");
                    break;
                },
            }

            self.session.status()?;
        }

        self.settle();
        self.session.status()?;
        Ok(self.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::MovementIntent;

    #[test]
    fn test_vec_transport_collects() {
        let mut sent: Vec<ClientMessage> = Vec::new();
        sent.send(ClientMessage::Reskin);
        assert_eq!(sent, vec![ClientMessage::Reskin]);
    }

    #[test]
    fn test_delay_line_latency() {
        let mut line = DelayLine::new(2, 0, 0.0, 1);
        line.push(1);
        assert!(line.advance().is_empty());
        line.push(2);
        assert_eq!(line.advance(), vec![1]);
        assert_eq!(line.advance(), vec![2]);
        assert_eq!(line.in_flight(), 0);
    }

    #[test]
    fn test_delay_line_jitter_can_reorder() {
        let mut line = DelayLine::new(0, 10, 0.0, 42);
        let mut delivered = Vec::new();
        for i in 0..100 {
            line.push(i);
            delivered.extend(line.advance());
        }
        delivered.extend(line.flush());
        assert_eq!(delivered.len(), 100);
        assert!(delivered.windows(2).any(|w| w[0] > w[1]));
    }

    #[test]
    fn test_delay_line_drops() {
        let mut line = DelayLine::new(0, 0, 1.0, 7);
        line.push("lost");
        assert_eq!(line.dropped(), 1);
        assert!(line.flush().is_empty());

        let mut line: DelayLine<u8> = DelayLine::new(0, 0, f64::NAN, 7);
        line.push(1);
        assert_eq!(line.flush(), vec![1]);
    }

    #[test]
    fn test_authority_applies_inputs_in_sequence_order() {
        let mut authority = LoopbackAuthority::new(ArenaBounds::default(), 3);
        let id = match authority.join_at(Vector2::new(12.0, 100.0)) {
            ServerMessage::Bootstrap { id } => id,
            other => panic!("Expected bootstrap, got {:?}", other),
        };
        // Arrives out of order: 2 before 1. Left from 12 snaps to 10, then right.
        authority.receive(
            &id,
            ClientMessage::Movement {
                sequence: 2,
                movement: MovementIntent::RIGHT,
            },
        );
        authority.receive(
            &id,
            ClientMessage::Movement {
                sequence: 1,
                movement: MovementIntent::LEFT,
            },
        );
        authority.step();
        let player = authority.player(&id).unwrap();
        assert_eq!(player.position, Vector2::new(15.0, 100.0));
        assert_eq!(player.last_acked_sequence, 2);

        // A straggler older than the watermark is discarded.
        authority.receive(
            &id,
            ClientMessage::Movement {
                sequence: 1,
                movement: MovementIntent::DOWN,
            },
        );
        authority.step();
        assert_eq!(authority.player(&id).unwrap().position, Vector2::new(15.0, 100.0));
    }

    #[test]
    fn test_authority_spawns_and_culls_bullets() {
        let mut authority = LoopbackAuthority::new(ArenaBounds::default(), 3);
        let id = match authority.join_at(Vector2::new(10.0, 384.0)) {
            ServerMessage::Bootstrap { id } => id,
            other => panic!("Expected bootstrap, got {:?}", other),
        };
        authority.receive(
            &id,
            ClientMessage::Fire {
                bullet: shared::FireRequest {
                    owner: id.clone(),
                    direction: Vector2::new(-1.0, 0.0),
                },
            },
        );
        authority.step();
        // Spawned one step out and moved once more, which crosses the left edge.
        assert!(authority.bullets().is_empty());

        authority.receive(
            &id,
            ClientMessage::Fire {
                bullet: shared::FireRequest {
                    owner: id.clone(),
                    direction: Vector2::new(1.0, 0.0),
                },
            },
        );
        authority.step();
        assert_eq!(authority.bullets().len(), 1);
        assert_eq!(authority.bullets()[0].owner_id, id);

        authority.leave(&id);
        assert!(authority.bullets().is_empty());
        assert!(authority.player(&id).is_none());
    }

    #[test]
    fn test_run_ticks_on_perfect_link_converges() {
        let mut client = Client::new(ClientConfig {
            seed: 11,
            ..Default::default()
        });
        let summary = client.run_ticks(600).unwrap();
        assert_eq!(summary.ticks, 600);
        assert!(summary.stats.inputs_sent > 0);
        assert_eq!(summary.unacknowledged, 0);
        assert_eq!(summary.divergence(), Some(0.0));
    }
}
