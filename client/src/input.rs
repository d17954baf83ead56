//! Input sampling: held directional keys, pointer position and trigger state

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{ArenaBounds, MovementIntent, Vector2};

/// Keys the capture layer reports. Both WASD and arrow keys steer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    W,
    A,
    S,
    D,
    Up,
    Down,
    Left,
    Right,
}

/// Collects raw control state from the capture layer and turns it into the
/// intent for a tick.
///
/// The capture layer only calls the mutators; the session only reads samples.
#[derive(Debug, Default, Clone)]
pub struct InputSampler {
    w: bool,
    a: bool,
    s: bool,
    d: bool,
    arrow_up: bool,
    arrow_down: bool,
    arrow_left: bool,
    arrow_right: bool,
    pointer: Vector2,
    trigger_held: bool,
}

impl InputSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, key: Key) {
        self.set_key(key, true);
    }

    pub fn release(&mut self, key: Key) {
        self.set_key(key, false);
    }

    pub fn set_key(&mut self, key: Key, down: bool) {
        match key {
            Key::W => self.w = down,
            Key::A => self.a = down,
            Key::S => self.s = down,
            Key::D => self.d = down,
            Key::Up => self.arrow_up = down,
            Key::Down => self.arrow_down = down,
            Key::Left => self.arrow_left = down,
            Key::Right => self.arrow_right = down,
        }
    }

    /// Replaces the directional state wholesale, e.g. from a scripted source.
    pub fn set_intent(&mut self, intent: MovementIntent) {
        self.release_all();
        self.w = intent.up;
        self.s = intent.down;
        self.a = intent.left;
        self.d = intent.right;
    }

    pub fn release_all(&mut self) {
        for key in [
            Key::W,
            Key::A,
            Key::S,
            Key::D,
            Key::Up,
            Key::Down,
            Key::Left,
            Key::Right,
        ] {
            self.release(key);
        }
    }

    pub fn set_pointer(&mut self, position: Vector2) {
        self.pointer = position;
    }

    pub fn pointer(&self) -> Vector2 {
        self.pointer
    }

    pub fn set_trigger(&mut self, held: bool) {
        self.trigger_held = held;
    }

    pub fn trigger_held(&self) -> bool {
        self.trigger_held
    }

    pub fn sample(&self) -> MovementIntent {
        MovementIntent {
            up: self.w || self.arrow_up,
            down: self.s || self.arrow_down,
            left: self.a || self.arrow_left,
            right: self.d || self.arrow_right,
        }
    }

    /// Unclamped displacement this tick's intent would produce.
    pub fn movement_vector(&self, bounds: &ArenaBounds) -> Vector2 {
        self.sample().displacement(bounds.move_delta)
    }
}

/// Scripted input source for headless runs: holds a random direction for a
/// random number of ticks, sometimes idles, and sweeps the pointer around.
pub struct RandomWalk {
    rng: StdRng,
    current: MovementIntent,
    ticks_left: u32,
    idle_chance: f64,
}

impl RandomWalk {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            current: MovementIntent::default(),
            ticks_left: 0,
            idle_chance: 0.2,
        }
    }

    pub fn drive(&mut self, sampler: &mut InputSampler, bounds: &ArenaBounds) {
        if self.ticks_left == 0 {
            self.current = if self.rng.gen_bool(self.idle_chance) {
                MovementIntent::default()
            } else {
                MovementIntent {
                    up: self.rng.gen_bool(0.4),
                    down: self.rng.gen_bool(0.4),
                    left: self.rng.gen_bool(0.4),
                    right: self.rng.gen_bool(0.4),
                }
            };
            self.ticks_left = self.rng.gen_range(5..40);

            sampler.set_pointer(Vector2::new(
                self.rng.gen_range(0.0..bounds.width),
                self.rng.gen_range(0.0..bounds.height),
            ));
            sampler.set_trigger(self.rng.gen_bool(0.5));
        }
        self.ticks_left -= 1;
        sampler.set_intent(self.current);
    }
}
