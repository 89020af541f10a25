// movement.rs
//
// Stateful random-walk kinematics. Each 20 Hz tick nudges an internal
// heading, blends velocity toward it, applies friction, and emits a
// world-space displacement for that tick.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::events::Vec3;

pub const TICKS_PER_SEC: f64 = 20.0;
pub const DT: f64 = 1.0 / TICKS_PER_SEC;

/// First-order gain toward the target velocity. Bigger = snappier turns.
const ACCEL_GAIN: f64 = 0.6;

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct WanderOptions {
    /// Target max horizontal speed (blocks/sec). ~4.3 walks, ~5.6 sprints.
    pub max_speed_bps: f64,
    /// Heading jitter per tick (radians). 0.0 walks a straight line.
    pub wander_per_tick: f64,
    /// Velocity damping per tick (0..1).
    pub friction: f64,
    /// Chance per second of a micro-pause.
    pub pause_chance_per_second: f64,
    /// Seed heading in degrees; random when unset.
    pub initial_heading_deg: Option<f64>,
    pub allow_vertical: bool,
    /// Max vertical speed (blocks/sec) when vertical drift is allowed.
    pub max_vertical_bps: f64,
}

impl Default for WanderOptions {
    fn default() -> Self {
        Self {
            max_speed_bps: 4.3,
            wander_per_tick: 0.10,
            friction: 0.14,
            pause_chance_per_second: 0.15,
            initial_heading_deg: None,
            allow_vertical: false,
            max_vertical_bps: 0.0,
        }
    }
}

/// Wander generator. Holds heading and velocity between ticks; repeated
/// calls on one instance intentionally differ. Fix the random source
/// with [`Wander::with_seed`] for deterministic sequences.
#[derive(Debug)]
pub struct Wander {
    opts: WanderOptions,
    heading_rad: f64,
    vx: f64,
    vy: f64,
    vz: f64,
    rng: StdRng,
}

impl Wander {
    pub fn new(opts: WanderOptions) -> Self {
        Self::with_rng(opts, StdRng::from_entropy())
    }

    pub fn with_seed(opts: WanderOptions, seed: u64) -> Self {
        Self::with_rng(opts, StdRng::seed_from_u64(seed))
    }

    fn with_rng(opts: WanderOptions, mut rng: StdRng) -> Self {
        let heading_deg = opts
            .initial_heading_deg
            .unwrap_or_else(|| rng.gen::<f64>() * 360.0);
        Self {
            opts,
            heading_rad: heading_deg.to_radians(),
            vx: 0.0,
            vy: 0.0,
            vz: 0.0,
            rng,
        }
    }

    /// World-space displacement for one tick.
    pub fn next_vector(&mut self) -> Vec3 {
        let paused = self.rng.gen::<f64>() < self.opts.pause_chance_per_second * DT;
        if !paused {
            self.heading_rad += self.rng.gen_range(-1.0..=1.0) * self.opts.wander_per_tick;

            let target_vx = self.heading_rad.sin() * self.opts.max_speed_bps;
            let target_vz = self.heading_rad.cos() * self.opts.max_speed_bps;
            self.vx += (target_vx - self.vx) * ACCEL_GAIN * DT;
            self.vz += (target_vz - self.vz) * ACCEL_GAIN * DT;

            if self.opts.allow_vertical && self.opts.max_vertical_bps > 0.0 {
                // slow vertical meander
                let target_vy = self.rng.gen_range(-1.0..=1.0) * self.opts.max_vertical_bps * 0.2;
                self.vy += (target_vy - self.vy) * 0.4 * DT;
            } else {
                self.vy = 0.0;
            }

            self.vx *= 1.0 - self.opts.friction;
            self.vz *= 1.0 - self.opts.friction;
            self.vy *= 1.0 - self.opts.friction * 0.5;

            let speed = self.vx.hypot(self.vz);
            if speed > self.opts.max_speed_bps {
                let scale = self.opts.max_speed_bps / speed;
                self.vx *= scale;
                self.vz *= scale;
            }
        } else {
            // heavier damping while paused, heading untouched
            self.vx *= 1.0 - self.opts.friction * 1.2;
            self.vz *= 1.0 - self.opts.friction * 1.2;
            self.vy *= 1.0 - self.opts.friction * 0.8;
        }

        Vec3 {
            x: self.vx * DT,
            y: self.vy * DT,
            z: self.vz * DT,
        }
    }
}
