//! Backend-neutral drawing
//!
//! The presentation layer implements `Canvas`; `draw_level` walks the level
//! back to front and issues sprite and debug-shape calls.

pub mod shapes;

use glam::Vec2;

use crate::sim::{DebugShape, EntityKind, GameState, ProjectileKind, Transform};
use crate::sim::projectile::EXPLOSION_RADIUS;

/// Texture slots the presentation layer provides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpriteKey {
    Background,
    Ground,
    Slingshot,
    Block,
    Enemy,
    Projectile(ProjectileKind),
}

/// Colors for overlays
pub mod colors {
    pub const COLLIDER: [f32; 4] = [0.2, 1.0, 0.4, 1.0];
    pub const TRAJECTORY: [f32; 4] = [1.0, 1.0, 1.0, 0.8];
    pub const EXPLOSION: [f32; 4] = [1.0, 0.55, 0.1, 0.6];
    pub const SLING_BAND: [f32; 4] = [0.35, 0.2, 0.1, 1.0];
}

/// Drawing surface
pub trait Canvas {
    /// Textured quad placed by `transform`
    fn draw_sprite(&mut self, sprite: SpriteKey, transform: &Transform);
    fn draw_circle(&mut self, center: Vec2, radius: f32, color: [f32; 4], filled: bool);
    fn draw_polygon(&mut self, points: &[Vec2], color: [f32; 4]);
    fn draw_line_strip(&mut self, points: &[Vec2], color: [f32; 4]);
}

/// Draw the whole level
pub fn draw_level(state: &GameState, canvas: &mut impl Canvas) {
    let settings = &state.settings;
    let field = settings.playfield;

    canvas.draw_sprite(SpriteKey::Background, &Transform::new(field / 2.0, field));
    let ground_h = settings.ground_height;
    canvas.draw_sprite(
        SpriteKey::Ground,
        &Transform::new(
            Vec2::new(field.x / 2.0, settings.ground_y() + ground_h / 2.0),
            Vec2::new(field.x, ground_h),
        ),
    );
    let anchor = settings.sling_anchor();
    canvas.draw_sprite(
        SpriteKey::Slingshot,
        &Transform::new(
            Vec2::new(anchor.x, anchor.y + settings.sling.height / 2.0),
            Vec2::new(40.0, settings.sling.height),
        ),
    );

    for entity in state.physics.entities() {
        match &entity.kind {
            EntityKind::Block(_) => canvas.draw_sprite(SpriteKey::Block, &entity.transform),
            EntityKind::Enemy(_) => canvas.draw_sprite(SpriteKey::Enemy, &entity.transform),
            EntityKind::Projectile(projectile) => {
                if projectile.explosion_visible() {
                    canvas.draw_circle(
                        entity.transform.position,
                        EXPLOSION_RADIUS,
                        colors::EXPLOSION,
                        true,
                    );
                } else if !entity.is_marked() {
                    canvas.draw_sprite(SpriteKey::Projectile(projectile.kind), &entity.transform);
                }
            }
        }
    }

    if state.slingshot.is_dragging() {
        let held = state.slingshot.drag_position();
        canvas.draw_line_strip(&[anchor, held], colors::SLING_BAND);
        for (point, radius) in shapes::trajectory_dots(&state.trajectory, 5.0) {
            canvas.draw_circle(point, radius, colors::TRAJECTORY, true);
        }
    }

    if state.debug_draw {
        draw_debug(state, canvas);
    }
}

/// Collider outlines and health bars
fn draw_debug(state: &GameState, canvas: &mut impl Canvas) {
    for shape in state.physics.debug_shapes() {
        match shape {
            DebugShape::Circle { center, radius } => {
                canvas.draw_line_strip(&shapes::circle_outline(center, radius, 24), colors::COLLIDER);
            }
            DebugShape::Polygon { points } => canvas.draw_polygon(&points, colors::COLLIDER),
        }
    }
    for entity in state.physics.entities() {
        let (EntityKind::Block(health) | EntityKind::Enemy(health)) = &entity.kind else {
            continue;
        };
        let t = &entity.transform;
        let top = t.position - Vec2::new(t.size.x / 2.0, t.size.y / 2.0 + 8.0);
        let width = t.size.x * health.fraction();
        let bar = shapes::rect_corners(top + Vec2::new(width / 2.0, 0.0), Vec2::new(width, 4.0), 0.0);
        canvas.draw_polygon(&bar, shapes::health_color(health.fraction(), 1.0));
    }
}
