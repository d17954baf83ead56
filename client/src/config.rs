use shared::{ArenaBounds, FIRE_INTERVAL_MS, REFRESH_RATE};
use std::{env, time::Duration};

/// Runtime settings for a client session and the loopback link it is driven over.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub bounds: ArenaBounds,
    /// Prediction ticks per second.
    pub tick_rate: u32,
    /// Authoritative snapshots per second from the loopback authority.
    pub snapshot_rate: u32,
    pub fire_interval: Duration,
    /// Simulated round-trip latency, split evenly between uplink and downlink.
    pub fake_ping_ms: u64,
    /// Maximum extra one-way delay added per message; enough jitter reorders.
    pub jitter_ms: u64,
    /// Probability in `[0, 1]` that a message is lost in either direction.
    pub drop_rate: f64,
    pub seed: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            bounds: ArenaBounds::default(),
            tick_rate: REFRESH_RATE,
            snapshot_rate: 20,
            fire_interval: Duration::from_millis(FIRE_INTERVAL_MS),
            fake_ping_ms: 0,
            jitter_ms: 0,
            drop_rate: 0.0,
            seed: 0,
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `ARENA_TICK_RATE`, `ARENA_SNAPSHOT_RATE` and
    /// `ARENA_FIRE_INTERVAL_MS` when they are set and parse.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            tick_rate: env_parse::<u32>("ARENA_TICK_RATE")
                .filter(|rate| *rate > 0)
                .unwrap_or(defaults.tick_rate),
            snapshot_rate: env_parse::<u32>("ARENA_SNAPSHOT_RATE")
                .filter(|rate| *rate > 0)
                .unwrap_or(defaults.snapshot_rate),
            fire_interval: env_parse::<u64>("ARENA_FIRE_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.fire_interval),
            ..defaults
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }

    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.snapshot_rate.max(1) as f64)
    }

    /// One-way latency expressed in prediction ticks.
    pub fn one_way_latency_ticks(&self) -> u64 {
        self.ms_to_ticks(self.fake_ping_ms / 2)
    }

    pub fn jitter_ticks(&self) -> u64 {
        self.ms_to_ticks(self.jitter_ms)
    }

    fn ms_to_ticks(&self, ms: u64) -> u64 {
        ms.saturating_mul(self.tick_rate.max(1) as u64) / 1000
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|value| value.parse().ok())
}
