//! Level layouts
//!
//! Layouts are assembled from a few structural helpers (towers, lintels,
//! platforms) standing on the ground line. Positions are box centers in
//! pixels. An optional seeded jitter nudges free-standing pieces sideways.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::consts::BLOCK_SIZE;
use crate::error::{SimError, SimResult};

/// Side length of an enemy box (px)
pub const ENEMY_SIZE: f32 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PieceKind {
    Block,
    Enemy,
}

/// One box in a layout
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Piece {
    pub kind: PieceKind,
    pub center: Vec2,
    pub size: Vec2,
}

/// Revolute hinge between two pieces at a world point (px)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hinge {
    pub first: usize,
    pub second: usize,
    pub anchor: Vec2,
}

#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub pieces: Vec<Piece>,
    pub hinges: Vec<Hinge>,
}

impl Layout {
    fn push(&mut self, kind: PieceKind, center: Vec2, size: Vec2) -> usize {
        self.pieces.push(Piece { kind, center, size });
        self.pieces.len() - 1
    }

    fn block(&mut self, center: Vec2, size: Vec2) -> usize {
        self.push(PieceKind::Block, center, size)
    }

    /// Enemy standing on the surface at `top`
    fn enemy_on(&mut self, x: f32, top: f32) -> usize {
        self.push(
            PieceKind::Enemy,
            Vec2::new(x, top - ENEMY_SIZE / 2.0),
            Vec2::splat(ENEMY_SIZE),
        )
    }

    /// Stack `count` square blocks on `base`; returns the new top surface
    fn tower(&mut self, x: f32, base: f32, count: usize) -> f32 {
        for i in 0..count {
            let center_y = base - BLOCK_SIZE * (i as f32 + 0.5);
            self.block(Vec2::new(x, center_y), Vec2::splat(BLOCK_SIZE));
        }
        base - BLOCK_SIZE * count as f32
    }

    /// Flat slab resting on `base`; returns its index and top surface
    fn slab(&mut self, x: f32, base: f32, width: f32, thickness: f32) -> (usize, f32) {
        let index = self.block(
            Vec2::new(x, base - thickness / 2.0),
            Vec2::new(width, thickness),
        );
        (index, base - thickness)
    }

    pub fn enemy_count(&self) -> usize {
        self.pieces
            .iter()
            .filter(|p| p.kind == PieceKind::Enemy)
            .count()
    }

    pub fn block_count(&self) -> usize {
        self.pieces
            .iter()
            .filter(|p| p.kind == PieceKind::Block)
            .count()
    }

    /// Shift every unhinged piece by up to `amount` px horizontally
    pub fn jitter(&mut self, seed: u64, amount: f32) {
        if amount <= 0.0 {
            return;
        }
        let mut rng = Pcg32::seed_from_u64(seed);
        let hinged: Vec<usize> = self
            .hinges
            .iter()
            .flat_map(|h| [h.first, h.second])
            .collect();
        for (i, piece) in self.pieces.iter_mut().enumerate() {
            let dx = rng.random_range(-amount..=amount);
            if !hinged.contains(&i) {
                piece.center.x += dx;
            }
        }
    }
}

/// Build the layout for `level` with the ground surface at `ground_y`
pub fn build_layout(level: u32, ground_y: f32) -> SimResult<Layout> {
    let mut layout = Layout::default();
    match level {
        1 => {
            // Lone tower
            let top = layout.tower(800.0, ground_y, 4);
            layout.enemy_on(800.0, top);

            // Arch: two pillars and a lintel
            layout.tower(1100.0, ground_y, 3);
            let pillar_top = layout.tower(1260.0, ground_y, 3);
            let (_, lintel_top) = layout.slab(1180.0, pillar_top, 240.0, 40.0);
            layout.enemy_on(1180.0, lintel_top);

            // Short wall
            let top = layout.tower(1520.0, ground_y, 3);
            layout.enemy_on(1520.0, top);
        }
        2 => {
            // Seesaw: plank hinged on a tall pivot
            let (pivot, pivot_top) = layout.slab(1600.0, ground_y, BLOCK_SIZE, 240.0);
            let (plank, plank_top) = layout.slab(1600.0, pivot_top, 560.0, 40.0);
            layout.hinges.push(Hinge {
                first: pivot,
                second: plank,
                anchor: Vec2::new(1600.0, pivot_top),
            });

            // Weight on the left arm, stack on the right arm
            let (_, weight_top) = layout.slab(1400.0, plank_top, 120.0, 120.0);
            layout.enemy_on(1400.0, weight_top);
            let stack_top = layout.tower(1800.0, plank_top, 2);
            layout.enemy_on(1800.0, stack_top);
            layout.enemy_on(1600.0, plank_top);
        }
        3 => {
            // Fortress on a base row
            let base_top = ground_y - BLOCK_SIZE;
            for i in 0..7 {
                layout.tower(1400.0 + i as f32 * BLOCK_SIZE, ground_y, 1);
            }

            let left_top = layout.tower(1400.0, base_top, 4);
            layout.enemy_on(1400.0, left_top);

            let column_top = layout.tower(1640.0, base_top, 2);
            let (_, platform_top) = layout.slab(1640.0, column_top, 240.0, 40.0);
            layout.enemy_on(1640.0, platform_top);

            let right_top = layout.tower(1880.0, base_top, 5);
            let (_, summit) = layout.slab(1860.0, right_top, 120.0, 40.0);
            layout.enemy_on(1860.0, summit);

            layout.enemy_on(1760.0, base_top);
        }
        _ => return Err(SimError::InvalidLevel(level)),
    }
    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GROUND: f32 = 980.0;

    #[test]
    fn test_designed_levels() {
        let one = build_layout(1, GROUND).unwrap();
        assert_eq!(one.enemy_count(), 3);
        assert_eq!(one.block_count(), 4 + 3 + 3 + 1 + 3);

        let two = build_layout(2, GROUND).unwrap();
        assert_eq!(two.enemy_count(), 3);
        assert_eq!(two.hinges.len(), 1);

        let three = build_layout(3, GROUND).unwrap();
        assert_eq!(three.enemy_count(), 4);
    }

    #[test]
    fn test_invalid_level() {
        assert!(matches!(build_layout(0, GROUND), Err(SimError::InvalidLevel(0))));
        assert!(matches!(build_layout(4, GROUND), Err(SimError::InvalidLevel(4))));
    }

    #[test]
    fn test_pieces_rest_above_ground() {
        for level in 1..=3 {
            let layout = build_layout(level, GROUND).unwrap();
            for piece in &layout.pieces {
                let bottom = piece.center.y + piece.size.y / 2.0;
                assert!(bottom <= GROUND + 1e-3, "level {level}: {piece:?}");
                assert!(piece.center.x > 0.0 && piece.center.x < 1920.0);
            }
        }
    }

    #[test]
    fn test_hinge_anchor_touches_both_pieces() {
        let layout = build_layout(2, GROUND).unwrap();
        let hinge = layout.hinges[0];
        for index in [hinge.first, hinge.second] {
            let piece = layout.pieces[index];
            let half = piece.size / 2.0;
            let local = hinge.anchor - piece.center;
            assert!(local.x.abs() <= half.x + 1e-3 && local.y.abs() <= half.y + 1e-3);
        }
    }

    #[test]
    fn test_jitter_is_seeded_and_bounded() {
        let exact = build_layout(1, GROUND).unwrap();
        let mut a = exact.clone();
        let mut b = exact.clone();
        a.jitter(42, 6.0);
        b.jitter(42, 6.0);
        for ((pa, pb), pe) in a.pieces.iter().zip(&b.pieces).zip(&exact.pieces) {
            assert_eq!(pa.center, pb.center);
            assert!((pa.center.x - pe.center.x).abs() <= 6.0);
            assert_eq!(pa.center.y, pe.center.y);
        }
    }

    #[test]
    fn test_jitter_keeps_hinged_pieces() {
        let exact = build_layout(2, GROUND).unwrap();
        let mut jittered = exact.clone();
        jittered.jitter(7, 10.0);
        let hinge = exact.hinges[0];
        assert_eq!(jittered.pieces[hinge.first].center, exact.pieces[hinge.first].center);
        assert_eq!(jittered.pieces[hinge.second].center, exact.pieces[hinge.second].center);
    }
}
