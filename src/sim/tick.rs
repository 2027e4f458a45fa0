//! Fixed timestep level tick
//!
//! Order within one tick:
//! 1. input (selection, drag, release)
//! 2. physics update (step, contact routing, sweep of marked bodies)
//! 3. deferred actions, in enqueue order
//! 4. trajectory preview
//! 5. projectile timers and pruning
//! 6. reload the sling
//! 7. enemy count and win/loss
//! 8. prune destroyed or off-field blocks and enemies

use glam::Vec2;

use super::entity::EntityId;
use super::projectile::ProjectileKind;
use super::slingshot::trajectory;
use super::state::{GameEvent, GameState, LevelPhase};

/// Input commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Pointer position in playfield pixels
    pub pointer: Option<Vec2>,
    /// Pointer went down this tick
    pub press: bool,
    /// Pointer went up this tick
    pub release: bool,
    /// Projectile kind picked from the HUD
    pub select: Option<ProjectileKind>,
    /// Rebuild the current level
    pub restart: bool,
    /// Flip the collider overlay
    pub toggle_debug: bool,
}

/// Advance the level by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    if input.toggle_debug {
        state.debug_draw = !state.debug_draw;
    }
    if input.restart {
        state.restart_level();
    }
    if state.phase == LevelPhase::Building {
        return;
    }
    if state.phase == LevelPhase::Active {
        handle_input(state, input);
    }
    state.time_ticks += 1;

    state.physics.update(dt, &mut state.deferred);
    state.collect_world_events();

    run_deferred(state);
    update_trajectory(state);
    update_projectiles(state, dt);
    reload(state);
    evaluate_outcome(state);
    prune_objects(state);
    state.collect_world_events();
}

fn handle_input(state: &mut GameState, input: &TickInput) {
    if let Some(kind) = input.select {
        state.select_projectile(kind);
    }
    if let Some(pointer) = input.pointer {
        if input.press {
            state.begin_drag(pointer);
        } else if state.slingshot.is_dragging() {
            state.drag_to(pointer);
        }
    }
    if input.release {
        if let Err(err) = state.release() {
            log::warn!("Launch failed: {err}");
        }
    }
}

/// Execute every queued action; failures are logged and skipped
fn run_deferred(state: &mut GameState) {
    if state.deferred.is_empty() {
        return;
    }
    let mut queue = std::mem::take(&mut state.deferred);
    let failures = queue.drain_with(|action| state.execute(action));
    for err in failures {
        log::warn!("Deferred action failed: {err}");
        state.events.push(GameEvent::Fault {
            message: format!("deferred action: {err}"),
        });
    }
}

fn update_trajectory(state: &mut GameState) {
    let Some(launch) = state.slingshot.pending_launch() else {
        state.trajectory.clear();
        return;
    };
    state.trajectory = trajectory(
        state.slingshot.drag_position(),
        launch.velocity(),
        state.physics.gravity(),
        state.settings.sling.trajectory_points,
        state.settings.sling.trajectory_step,
    );
}

/// Tick projectile timers and remove spent, expired or escaped ones
fn update_projectiles(state: &mut GameState, dt: f32) {
    let field = state.settings.playfield;
    let buffer = state.settings.offscreen_buffer;

    let mut doomed: Vec<EntityId> = Vec::new();
    for id in state.projectile_ids() {
        let Some(entity) = state.physics.entity_mut(id) else {
            continue;
        };
        let marked = entity.is_marked();
        let pos = entity.transform.position;
        let Some(projectile) = entity.as_projectile_mut() else {
            continue;
        };
        projectile.tick(dt);

        let escaped = projectile.is_launched()
            && (pos.x < -buffer || pos.x > field.x + buffer || pos.y > field.y + buffer);
        let spent = marked && !projectile.is_effect_active();
        if projectile.is_expired() || escaped || spent {
            doomed.push(id);
        }
    }

    for id in doomed {
        match state.physics.despawn(id) {
            Ok(entity) => state.events.push(GameEvent::EntityDestroyed {
                id,
                tag: entity.tag(),
            }),
            Err(err) => log::warn!("Failed to remove projectile {id}: {err}"),
        }
        if state.loaded == Some(id) {
            state.loaded = None;
        }
    }
}

/// Load the next shot once the field is clear of projectiles
fn reload(state: &mut GameState) {
    if state.phase != LevelPhase::Active
        || state.loaded.is_some()
        || state.projectiles_left == 0
        || !state.projectile_ids().is_empty()
    {
        return;
    }
    if let Err(err) = state.load_projectile() {
        log::warn!("Failed to load projectile: {err}");
    }
}

fn evaluate_outcome(state: &mut GameState) {
    state.enemies_left = state.count_enemies();
    if state.phase != LevelPhase::Active {
        return;
    }
    if state.enemies_left == 0 {
        state.phase = LevelPhase::Completed;
        log::info!("Level {} completed", state.level);
        state.events.push(GameEvent::LevelCompleted { level: state.level });
    } else if state.projectiles_left == 0
        && state.final_launched
        && state.projectile_ids().is_empty()
    {
        state.phase = LevelPhase::Failed;
        log::info!(
            "Level {} failed with {} enemies left",
            state.level,
            state.enemies_left
        );
        state.events.push(GameEvent::LevelFailed { level: state.level });
    }
}

/// Remove marked blocks and enemies, and any that left the playfield
fn prune_objects(state: &mut GameState) {
    let field = state.settings.playfield;
    let doomed: Vec<EntityId> = state
        .physics
        .entities()
        .filter(|e| !e.is_projectile())
        .filter(|e| {
            let p = e.transform.position;
            e.is_marked() || p.x < 0.0 || p.x > field.x || p.y < 0.0 || p.y > field.y
        })
        .map(|e| e.id)
        .collect();

    for id in doomed {
        match state.physics.despawn(id) {
            Ok(entity) => state.events.push(GameEvent::EntityDestroyed {
                id,
                tag: entity.tag(),
            }),
            Err(err) => log::warn!("Failed to remove {id}: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{PROJECTILE_RADIUS, SIM_DT};
    use crate::settings::Settings;
    use crate::sim::deferred::{DeferredAction, SplitSpawn};
    use crate::sim::entity::EntityTag;
    use crate::sim::physics::BodyKind;
    use crate::sim::projectile::EXPLOSION_EFFECT_DURATION;

    fn state(level: u32) -> GameState {
        let mut s = GameState::new(Settings::default()).unwrap();
        s.set_level(level);
        s.drain_events();
        s
    }

    fn idle(s: &mut GameState, ticks: usize) {
        for _ in 0..ticks {
            tick(s, &TickInput::default(), SIM_DT);
        }
    }

    fn select(s: &mut GameState, kind: ProjectileKind) {
        tick(
            s,
            &TickInput {
                select: Some(kind),
                ..Default::default()
            },
            SIM_DT,
        );
    }

    /// Pull the loaded projectile by `pull` and let go over three ticks
    fn shoot(s: &mut GameState, pull: Vec2) {
        let rest = s.settings.sling_rest();
        tick(
            s,
            &TickInput {
                pointer: Some(rest),
                press: true,
                ..Default::default()
            },
            SIM_DT,
        );
        tick(
            s,
            &TickInput {
                pointer: Some(rest + pull),
                ..Default::default()
            },
            SIM_DT,
        );
        tick(
            s,
            &TickInput {
                pointer: Some(rest + pull),
                release: true,
                ..Default::default()
            },
            SIM_DT,
        );
    }

    fn enemy_ids(s: &GameState) -> Vec<EntityId> {
        s.physics.entities().filter(|e| e.is_enemy()).map(|e| e.id).collect()
    }

    #[test]
    fn test_tick_without_level_is_noop() {
        let mut s = GameState::new(Settings::default()).unwrap();
        tick(&mut s, &TickInput::default(), SIM_DT);
        assert_eq!(s.time_ticks, 0);
        assert_eq!(s.phase, LevelPhase::Building);
    }

    #[test]
    fn test_level_settles_without_completion() {
        let mut s = state(1);
        idle(&mut s, 60);
        assert_eq!(s.phase, LevelPhase::Active);
        assert_eq!(s.enemies_left, 3);
        assert!(s.loaded_projectile().is_some());
    }

    #[test]
    fn test_trajectory_only_while_dragging() {
        let mut s = state(1);
        let rest = s.settings.sling_rest();
        tick(
            &mut s,
            &TickInput {
                pointer: Some(rest),
                press: true,
                ..Default::default()
            },
            SIM_DT,
        );
        tick(
            &mut s,
            &TickInput {
                pointer: Some(rest + Vec2::new(-100.0, 50.0)),
                ..Default::default()
            },
            SIM_DT,
        );
        assert_eq!(s.trajectory.len(), s.settings.sling.trajectory_points);
        assert_eq!(s.trajectory[0], s.slingshot.drag_position());
        let bodies = s.physics.body_count();

        tick(
            &mut s,
            &TickInput {
                release: true,
                ..Default::default()
            },
            SIM_DT,
        );
        assert!(s.trajectory.is_empty());
        assert_eq!(s.physics.body_count(), bodies);
    }

    #[test]
    fn test_standard_projectile_kills_enemies_on_successive_ticks() {
        let mut s = state(1);
        let enemies = enemy_ids(&s);
        assert_eq!(enemies.len(), 3);
        let shot = s.loaded_projectile().unwrap();
        shoot(&mut s, Vec2::new(140.0, 10.0));

        for (i, enemy) in enemies.iter().enumerate() {
            // Drop the shot onto the enemy at 30 m/s (300 damage)
            let target = &s.physics.entity(*enemy).unwrap().transform;
            let above = target.position
                - Vec2::new(0.0, target.size.y / 2.0 + PROJECTILE_RADIUS + 2.0);
            s.physics.set_entity_position(shot, above).unwrap();
            let body = s.physics.entity(shot).unwrap().body().unwrap();
            s.physics.set_velocity(body, Vec2::new(0.0, 30.0));

            let mut guard = 0;
            while s.physics.entity(*enemy).is_some() {
                idle(&mut s, 1);
                guard += 1;
                assert!(guard < 20, "enemy {enemy} survived the hit");
            }
            assert_eq!(s.enemies_left, (enemies.len() - i - 1) as u32);
            assert!(s.physics.entity(shot).is_some(), "standard shot outlives its hits");
        }
        assert!(s.is_level_completed());
        assert!(!s.is_level_failed());
        assert!(s.drain_events().contains(&GameEvent::LevelCompleted { level: 1 }));

        // Completion is final even once the sling runs dry
        s.projectiles_left = 0;
        s.final_launched = true;
        idle(&mut s, 10);
        assert!(s.is_level_completed());
        assert!(!s.is_level_failed());
    }

    #[test]
    fn test_explosion_lingers_without_body_until_effect_ends() {
        let mut s = state(1);
        select(&mut s, ProjectileKind::Explosive);
        let shot = s.loaded_projectile().unwrap();
        // Pull up so it drops onto the ground under the sling
        shoot(&mut s, Vec2::new(0.0, -120.0));

        let mut guard = 0;
        while !s.physics.entity(shot).unwrap().is_marked() {
            idle(&mut s, 1);
            guard += 1;
            assert!(guard < 300, "explosive never hit the ground");
        }
        let entity = s.physics.entity(shot).unwrap();
        assert!(entity.body().is_none());
        assert!(entity.as_projectile().unwrap().has_exploded());
        assert!(entity.as_projectile().unwrap().explosion_visible());
        assert!(s.loaded_projectile().is_none());

        let mut lingered = 0;
        while let Some(entity) = s.physics.entity(shot) {
            assert!(entity.is_marked());
            assert!(entity.body().is_none());
            idle(&mut s, 1);
            lingered += 1;
            assert!(lingered < 120, "explosion effect never ended");
        }
        let expected = (EXPLOSION_EFFECT_DURATION / SIM_DT).round() as usize;
        assert!(
            lingered + 2 >= expected && lingered <= expected + 1,
            "lingered {lingered} ticks, expected about {expected}"
        );
        // Field is clear, so the next shot is loaded on the removal tick
        assert!(s.loaded_projectile().is_some());
    }

    #[test]
    fn test_split_on_block_contact_spawns_children_same_tick() {
        let mut s = state(1);
        select(&mut s, ProjectileKind::Split);
        let shot = s.loaded_projectile().unwrap();
        shoot(&mut s, Vec2::new(140.0, 10.0));

        // Bottom block of the lone tower
        let block = s
            .physics
            .entities()
            .filter(|e| e.tag() == EntityTag::Block && e.transform.position.x < 900.0)
            .max_by(|a, b| a.transform.position.y.total_cmp(&b.transform.position.y))
            .map(|e| e.transform)
            .unwrap();
        let start = Vec2::new(
            block.position.x - block.size.x / 2.0 - PROJECTILE_RADIUS - 2.0,
            block.position.y,
        );
        s.physics.set_entity_position(shot, start).unwrap();
        let body = s.physics.entity(shot).unwrap().body().unwrap();
        s.physics.set_velocity(body, Vec2::new(20.0, 0.0));
        s.drain_events();

        let mut guard = 0;
        while !s
            .drain_events()
            .contains(&GameEvent::ProjectileSplit { parent: shot })
        {
            idle(&mut s, 1);
            guard += 1;
            assert!(guard < 20, "split never triggered");
        }

        // Children were spawned after the step and before pruning
        assert!(s.deferred.is_empty());
        assert!(s.physics.entity(shot).is_none());
        let children = s.projectile_ids();
        assert_eq!(children.len(), 2);

        let mut velocities = Vec::new();
        for id in children {
            let entity = s.physics.entity(id).unwrap();
            let projectile = entity.as_projectile().unwrap();
            assert_eq!(projectile.kind, ProjectileKind::Standard);
            assert!(projectile.is_launched());
            assert!(projectile.split_hook().is_none());
            let body = entity.body().unwrap();
            assert_eq!(s.physics.body_kind(body), Some(BodyKind::Dynamic));
            velocities.push(s.physics.velocity(body).unwrap());
        }
        velocities.sort_by(|a, b| a.y.total_cmp(&b.y));
        let (sin, cos) = 15.0_f32.to_radians().sin_cos();
        let expected = [Vec2::new(20.0 * cos, -20.0 * sin), Vec2::new(20.0 * cos, 20.0 * sin)];
        for (v, e) in velocities.iter().zip(expected) {
            assert!((*v - e).length() < 0.25, "child velocity {v}, expected {e}");
        }
    }

    #[test]
    fn test_failure_after_last_projectile_leaves() {
        let mut s = state(1);
        for shot in 0..5 {
            assert!(s.loaded_projectile().is_some(), "shot {shot} loaded");
            // Pull right so the projectile flies left off the field
            shoot(&mut s, Vec2::new(140.0, 10.0));
            assert!(!s.is_level_failed());
            let mut guard = 0;
            while !s.projectile_ids().is_empty() && s.loaded_projectile().is_none() {
                idle(&mut s, 1);
                guard += 1;
                assert!(guard < 600, "projectile never left the field");
            }
        }
        assert_eq!(s.projectiles_left, 0);
        assert!(s.final_launched);
        assert!(s.is_level_failed());
        assert!(!s.is_level_completed());
        assert_eq!(s.enemies_left, 3);
        assert!(s.projectile_ids().is_empty());
    }

    #[test]
    fn test_launch_spends_kind_and_reloads_selection_fallback() {
        let mut s = state(1);
        tick(
            &mut s,
            &TickInput {
                select: Some(ProjectileKind::Heavy),
                ..Default::default()
            },
            SIM_DT,
        );
        let held = s.loaded_projectile().unwrap();
        assert_eq!(
            s.physics.entity(held).unwrap().as_projectile().unwrap().kind,
            ProjectileKind::Heavy
        );
        let body = s.physics.entity(held).unwrap().body().unwrap();
        assert_eq!(s.physics.gravity_scale(body), Some(1.5));

        shoot(&mut s, Vec2::new(140.0, 10.0));
        assert!(!s.arsenal.is_available(ProjectileKind::Heavy));
        assert_eq!(s.arsenal.selected(), ProjectileKind::Standard);

        let mut guard = 0;
        while s.loaded_projectile().is_none() {
            idle(&mut s, 1);
            guard += 1;
            assert!(guard < 600);
        }
        let next = s.loaded_projectile().unwrap();
        assert_eq!(
            s.physics.entity(next).unwrap().as_projectile().unwrap().kind,
            ProjectileKind::Standard
        );
    }

    #[test]
    fn test_deferred_split_runs_after_step_and_clears() {
        let mut s = state(1);
        s.deferred.push(DeferredAction::Split(SplitSpawn {
            parent: EntityId(999),
            position: Vec2::new(600.0, 200.0),
            velocity: Vec2::new(20.0, 0.0),
            half_angle: 15.0_f32.to_radians(),
        }));
        s.deferred.push(DeferredAction::Split(SplitSpawn {
            parent: EntityId(998),
            position: Vec2::new(f32::NAN, 0.0),
            velocity: Vec2::ZERO,
            half_angle: 0.1,
        }));
        let before = s.projectile_ids().len();
        tick(&mut s, &TickInput::default(), SIM_DT);
        assert!(s.deferred.is_empty());
        assert_eq!(s.projectile_ids().len(), before + 2);
        let events = s.drain_events();
        assert!(events.contains(&GameEvent::ProjectileSplit { parent: EntityId(999) }));
        assert!(events.iter().any(|e| matches!(e, GameEvent::Fault { .. })));
    }

    #[test]
    fn test_offfield_block_is_pruned() {
        let mut s = state(1);
        let block = s
            .physics
            .entities()
            .find(|e| e.tag() == EntityTag::Block)
            .map(|e| e.id)
            .unwrap();
        s.physics
            .set_entity_position(block, Vec2::new(-500.0, 300.0))
            .unwrap();
        tick(&mut s, &TickInput::default(), SIM_DT);
        assert!(s.physics.entity(block).is_none());
    }

    #[test]
    fn test_restart_input_rebuilds() {
        let mut s = state(2);
        shoot(&mut s, Vec2::new(140.0, 10.0));
        assert_eq!(s.projectiles_left, 4);
        tick(
            &mut s,
            &TickInput {
                restart: true,
                ..Default::default()
            },
            SIM_DT,
        );
        assert_eq!(s.projectiles_left, 5);
        assert_eq!(s.level, 2);
        assert_eq!(s.phase, LevelPhase::Active);
    }

    #[test]
    fn test_toggle_debug() {
        let mut s = state(1);
        assert!(!s.debug_draw);
        tick(
            &mut s,
            &TickInput {
                toggle_debug: true,
                ..Default::default()
            },
            SIM_DT,
        );
        assert!(s.debug_draw);
    }
}
