//! Slingshot drag handling and trajectory preview

use glam::Vec2;

use crate::settings::SlingSettings;
use crate::to_pixels;

/// Pulls shorter than this (px) cancel instead of launching
const MIN_PULL: f32 = 1.0;

/// Direction and force (px/s) of a release
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Launch {
    pub direction: Vec2,
    pub force: f32,
}

impl Launch {
    /// Initial velocity in m/s
    pub fn velocity(&self) -> Vec2 {
        crate::sim::projectile::launch_velocity(self.direction, self.force)
    }
}

/// Sling state
#[derive(Debug, Clone)]
pub struct Slingshot {
    /// Where a loaded projectile rests (px)
    pub rest: Vec2,
    pub max_pull: f32,
    pub scaling: f32,
    pub boost: f32,
    dragging: bool,
    /// Current (clamped) projectile position while dragging
    drag_position: Vec2,
}

impl Slingshot {
    pub fn new(settings: &SlingSettings, rest: Vec2) -> Self {
        Self {
            rest,
            max_pull: settings.max_pull,
            scaling: settings.scaling,
            boost: settings.boost,
            dragging: false,
            drag_position: rest,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn drag_position(&self) -> Vec2 {
        self.drag_position
    }

    /// Pull vector (rest - pointer) clamped to `max_pull`
    pub fn clamp_pull(&self, pointer: Vec2) -> Vec2 {
        (self.rest - pointer).clamp_length_max(self.max_pull)
    }

    /// Start dragging if `pointer` is within `grab_radius` of the loaded projectile
    pub fn begin(&mut self, pointer: Vec2, projectile: Vec2, grab_radius: f32) -> bool {
        if pointer.distance(projectile) > grab_radius {
            return false;
        }
        self.dragging = true;
        self.drag_position = self.rest - self.clamp_pull(pointer);
        true
    }

    /// Follow the pointer; returns the clamped projectile position
    pub fn drag(&mut self, pointer: Vec2) -> Option<Vec2> {
        if !self.dragging {
            return None;
        }
        self.drag_position = self.rest - self.clamp_pull(pointer);
        Some(self.drag_position)
    }

    /// Launch parameters for the current drag, without releasing
    pub fn pending_launch(&self) -> Option<Launch> {
        if !self.dragging {
            return None;
        }
        let pull = self.rest - self.drag_position;
        let length = pull.length();
        if length < MIN_PULL {
            return None;
        }
        Some(Launch {
            direction: pull / length,
            force: length * self.scaling * self.boost,
        })
    }

    /// Stop dragging. `None` when there was no drag or the pull was too
    /// short to count as a shot.
    pub fn release(&mut self) -> Option<Launch> {
        let launch = self.pending_launch();
        self.dragging = false;
        self.drag_position = self.rest;
        launch
    }

    /// Abandon a drag without launching
    pub fn cancel(&mut self) {
        self.dragging = false;
        self.drag_position = self.rest;
    }
}

/// Sample `points` positions (px) of a ballistic path from `start` (px)
/// with `velocity` (m/s) under `gravity` (m/s²), `step` seconds apart.
pub fn trajectory(start: Vec2, velocity: Vec2, gravity: Vec2, points: usize, step: f32) -> Vec<Vec2> {
    let v = Vec2::new(to_pixels(velocity.x), to_pixels(velocity.y));
    let g = Vec2::new(to_pixels(gravity.x), to_pixels(gravity.y));
    (0..points)
        .map(|i| {
            let t = i as f32 * step;
            start + v * t + 0.5 * g * t * t
        })
        .collect()
}
