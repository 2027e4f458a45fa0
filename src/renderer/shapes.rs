//! Geometry helpers for 2D primitives

use glam::Vec2;
use std::f32::consts::PI;

/// Interpolate color from health fraction (full=green, half=yellow, empty=red)
pub fn health_color(fraction: f32, alpha: f32) -> [f32; 4] {
    let t = fraction.clamp(0.0, 1.0);
    let (r, g) = if t > 0.5 {
        // Yellow to green
        let u = (t - 0.5) / 0.5;
        (1.0 - u * 0.8, 0.85)
    } else {
        // Red to yellow
        let u = t / 0.5;
        (1.0, 0.2 + 0.65 * u)
    };
    [r, g, 0.2, alpha]
}

/// Points on a circle outline
pub fn circle_outline(center: Vec2, radius: f32, segments: u32) -> Vec<Vec2> {
    let segments = segments.max(3);
    (0..segments)
        .map(|i| {
            let theta = (i as f32 / segments as f32) * 2.0 * PI;
            center + Vec2::new(radius * theta.cos(), radius * theta.sin())
        })
        .collect()
}

/// Corners of a rotated rectangle, clockwise from top-left
pub fn rect_corners(center: Vec2, size: Vec2, rotation: f32) -> [Vec2; 4] {
    let half = size / 2.0;
    let rot = Vec2::from_angle(rotation);
    [
        Vec2::new(-half.x, -half.y),
        Vec2::new(half.x, -half.y),
        Vec2::new(half.x, half.y),
        Vec2::new(-half.x, half.y),
    ]
    .map(|corner| center + rot.rotate(corner))
}

/// Dot radii along a trajectory preview, shrinking toward the end
pub fn trajectory_dots(points: &[Vec2], start_radius: f32) -> Vec<(Vec2, f32)> {
    let len = points.len().max(1) as f32;
    points
        .iter()
        .enumerate()
        .map(|(i, p)| (*p, start_radius * (1.0 - 0.7 * i as f32 / len)))
        .collect()
}
