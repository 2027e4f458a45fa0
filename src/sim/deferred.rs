//! Deferred world mutations
//!
//! Collision handlers run while the physics world is mid-update and must not
//! create bodies. They queue spawn requests here instead; the orchestrator
//! drains the queue after the step, in enqueue order.

use glam::Vec2;

use super::entity::EntityId;
use crate::error::SimError;

/// Two children fanned out around the parent's velocity at impact
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitSpawn {
    pub parent: EntityId,
    /// Parent position at contact (px)
    pub position: Vec2,
    /// Parent velocity at contact (m/s)
    pub velocity: Vec2,
    /// Radians either side of the parent heading
    pub half_angle: f32,
}

/// One projectile to create
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectileSpawn {
    /// px
    pub position: Vec2,
    /// m/s
    pub velocity: Vec2,
}

impl SplitSpawn {
    /// Children at θ−δ and θ+δ with the parent's speed
    pub fn children(&self) -> [ProjectileSpawn; 2] {
        let speed = self.velocity.length();
        let theta = crate::heading(self.velocity);
        [-self.half_angle, self.half_angle].map(|offset| ProjectileSpawn {
            position: self.position,
            velocity: crate::direction(theta + offset) * speed,
        })
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if !self.position.is_finite() || !self.velocity.is_finite() {
            return Err(SimError::InvalidSpawn(format!(
                "split of {} at {:?} with velocity {:?}",
                self.parent, self.position, self.velocity
            )));
        }
        Ok(())
    }
}

/// A queued world mutation
#[derive(Debug, Clone, PartialEq)]
pub enum DeferredAction {
    Split(SplitSpawn),
}

/// FIFO of deferred actions
#[derive(Debug, Default)]
pub struct DeferredQueue {
    actions: Vec<DeferredAction>,
}

impl DeferredQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: DeferredAction) {
        self.actions.push(action);
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }

    /// Run every queued action in order. The queue is emptied before the
    /// first action runs, so actions queued by `exec` wait for the next
    /// drain. Failures do not stop later actions and are returned.
    pub fn drain_with<F>(&mut self, mut exec: F) -> Vec<SimError>
    where
        F: FnMut(DeferredAction) -> Result<(), SimError>,
    {
        let actions = std::mem::take(&mut self.actions);
        actions
            .into_iter()
            .filter_map(|action| exec(action).err())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f32::consts::PI;

    fn split(id: u32, velocity: Vec2) -> DeferredAction {
        DeferredAction::Split(SplitSpawn {
            parent: EntityId(id),
            position: Vec2::new(10.0, 20.0),
            velocity,
            half_angle: 15.0_f32.to_radians(),
        })
    }

    #[test]
    fn test_split_geometry() {
        let spawn = SplitSpawn {
            parent: EntityId(1),
            position: Vec2::new(500.0, 300.0),
            velocity: Vec2::new(20.0, 0.0),
            half_angle: 15.0_f32.to_radians(),
        };
        let [a, b] = spawn.children();
        assert_eq!(a.position, spawn.position);
        assert_eq!(b.position, spawn.position);
        assert!((a.velocity.length() - 20.0).abs() < 1e-4);
        assert!((b.velocity.length() - 20.0).abs() < 1e-4);
        assert!((crate::heading(a.velocity).to_degrees() + 15.0).abs() < 1e-3);
        assert!((crate::heading(b.velocity).to_degrees() - 15.0).abs() < 1e-3);
    }

    #[test]
    fn test_drain_runs_in_order_and_clears() {
        let mut queue = DeferredQueue::new();
        for id in 1..=3 {
            queue.push(split(id, Vec2::X));
        }
        let mut seen = Vec::new();
        let failures = queue.drain_with(|action| {
            let DeferredAction::Split(s) = action;
            seen.push(s.parent.0);
            Ok(())
        });
        assert!(failures.is_empty());
        assert_eq!(seen, vec![1, 2, 3]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_failure_does_not_stop_later_actions() {
        let mut queue = DeferredQueue::new();
        for id in 1..=3 {
            queue.push(split(id, Vec2::X));
        }
        let mut seen = Vec::new();
        let failures = queue.drain_with(|action| {
            let DeferredAction::Split(s) = action;
            seen.push(s.parent.0);
            if s.parent.0 == 2 {
                Err(SimError::InvalidSpawn("boom".into()))
            } else {
                Ok(())
            }
        });
        assert_eq!(failures.len(), 1);
        assert_eq!(seen, vec![1, 2, 3]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_validate_rejects_nan() {
        let DeferredAction::Split(bad) = split(4, Vec2::new(f32::NAN, 0.0));
        assert!(matches!(bad.validate(), Err(SimError::InvalidSpawn(_))));
        let DeferredAction::Split(good) = split(5, Vec2::new(3.0, -1.0));
        assert!(good.validate().is_ok());
    }

    proptest! {
        #[test]
        fn prop_children_keep_speed_and_straddle_heading(
            angle in -PI..PI,
            speed in 0.5f32..40.0,
            half in 0.01f32..0.7,
        ) {
            let spawn = SplitSpawn {
                parent: EntityId(1),
                position: Vec2::ZERO,
                velocity: crate::direction(angle) * speed,
                half_angle: half,
            };
            let [a, b] = spawn.children();
            prop_assert!((a.velocity.length() - speed).abs() < 1e-3 * speed.max(1.0));
            prop_assert!((b.velocity.length() - speed).abs() < 1e-3 * speed.max(1.0));
            let between = a.velocity.angle_to(b.velocity);
            prop_assert!((between - 2.0 * half).abs() < 1e-3);
        }
    }
}
