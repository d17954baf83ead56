use serde::{Deserialize, Serialize};

pub mod protocol;

pub use protocol::{Bullet, ClientMessage, FireRequest, PlayerState, ProtocolError, ServerMessage};

pub const WIDTH: f64 = 768.0;
pub const HEIGHT: f64 = 768.0;
pub const PLAYER_RADIUS: f64 = 10.0;
pub const MOVE_DELTA: f64 = 5.0;
pub const BULLET_RADIUS: f64 = 5.0;
pub const REFRESH_RATE: u32 = 60;
pub const BULLET_MOVE_DELTA: f64 = 400.0 / REFRESH_RATE as f64;
pub const FIRE_INTERVAL_MS: u64 = 200;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

impl Vector2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Unit vector in the same direction, or `(0, 0)` for a zero-length vector.
    pub fn normalized(&self) -> Self {
        let magnitude = self.length();
        if magnitude > 0.0 {
            Self::new(self.x / magnitude, self.y / magnitude)
        } else {
            Self::default()
        }
    }

    pub fn distance_to(&self, other: Vector2) -> f64 {
        Vector2::new(other.x - self.x, other.y - self.y).length()
    }
}

/// Directional controls held during a tick.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct MovementIntent {
    #[serde(default)]
    pub up: bool,
    #[serde(default)]
    pub down: bool,
    #[serde(default)]
    pub left: bool,
    #[serde(default)]
    pub right: bool,
}

impl MovementIntent {
    pub const UP: Self = Self {
        up: true,
        down: false,
        left: false,
        right: false,
    };
    pub const DOWN: Self = Self {
        up: false,
        down: true,
        left: false,
        right: false,
    };
    pub const LEFT: Self = Self {
        up: false,
        down: false,
        left: true,
        right: false,
    };
    pub const RIGHT: Self = Self {
        up: false,
        down: false,
        left: false,
        right: true,
    };

    pub fn is_idle(&self) -> bool {
        !(self.up || self.down || self.left || self.right)
    }

    /// Unclamped per-tick displacement. Diagonals are not normalized.
    pub fn displacement(&self, move_delta: f64) -> Vector2 {
        let mut delta = Vector2::default();
        if self.up {
            delta.y -= move_delta;
        }
        if self.down {
            delta.y += move_delta;
        }
        if self.left {
            delta.x -= move_delta;
        }
        if self.right {
            delta.x += move_delta;
        }
        delta
    }
}

/// Playable area and the per-tick step. Legal coordinates on each axis are
/// `[radius, dimension - radius]`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct ArenaBounds {
    pub width: f64,
    pub height: f64,
    pub radius: f64,
    pub move_delta: f64,
}

impl Default for ArenaBounds {
    fn default() -> Self {
        Self {
            width: WIDTH,
            height: HEIGHT,
            radius: PLAYER_RADIUS,
            move_delta: MOVE_DELTA,
        }
    }
}

impl ArenaBounds {
    pub fn max_x(&self) -> f64 {
        self.width - self.radius
    }

    pub fn max_y(&self) -> f64 {
        self.height - self.radius
    }

    pub fn clamp_x(&self, x: f64) -> f64 {
        x.max(self.radius).min(self.max_x())
    }

    pub fn clamp_y(&self, y: f64) -> f64 {
        y.max(self.radius).min(self.max_y())
    }

    pub fn contains(&self, position: Vector2) -> bool {
        position.x >= self.radius
            && position.x <= self.max_x()
            && position.y >= self.radius
            && position.y <= self.max_y()
    }
}

/// Advances `position` by one tick of `intent`.
///
/// This is the only movement rule in the workspace: prediction, replay and the
/// loopback authority all call it, so they cannot disagree. Flags are applied in
/// the order up, down, left, right and each step snaps to the arena edge instead
/// of crossing it.
pub fn simulate(position: Vector2, intent: &MovementIntent, bounds: &ArenaBounds) -> Vector2 {
    let mut x = bounds.clamp_x(position.x);
    let mut y = bounds.clamp_y(position.y);

    if intent.up {
        y = bounds.clamp_y(y - bounds.move_delta);
    }
    if intent.down {
        y = bounds.clamp_y(y + bounds.move_delta);
    }
    if intent.left {
        x = bounds.clamp_x(x - bounds.move_delta);
    }
    if intent.right {
        x = bounds.clamp_x(x + bounds.move_delta);
    }

    Vector2 { x, y }
}

/// Folds `simulate` over a sequence of intents, starting at `base`.
pub fn replay<'a, I>(base: Vector2, intents: I, bounds: &ArenaBounds) -> Vector2
where
    I: IntoIterator<Item = &'a MovementIntent>,
{
    intents
        .into_iter()
        .fold(base, |position, intent| simulate(position, intent, bounds))
}
