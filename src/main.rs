//! Sling Siege headless runner
//!
//! Plays level 1 with a scripted set of shots and logs the outcome.
//! Usage: `sling-siege [settings.json]`

use glam::Vec2;

use sling_siege::Settings;
use sling_siege::consts::MAX_SUBSTEPS;
use sling_siege::sim::{GameState, LevelPhase, ProjectileKind, TickInput, tick};

/// Scripted shots: kind and pointer offset from the sling rest position
const SCRIPT: [(ProjectileKind, (f32, f32)); 5] = [
    (ProjectileKind::Standard, (-140.0, 60.0)),
    (ProjectileKind::Explosive, (-145.0, 45.0)),
    (ProjectileKind::Split, (-140.0, 70.0)),
    (ProjectileKind::Heavy, (-150.0, 50.0)),
    (ProjectileKind::Bouncy, (-130.0, 80.0)),
];

/// Give up on a shot after this many seconds of simulated time
const SHOT_TIMEOUT: f32 = 15.0;

/// Frame-accumulator loop: runs fixed ticks of the configured timestep to
/// cover `frame_time` seconds
struct Runner {
    state: GameState,
    accumulator: f32,
}

impl Runner {
    fn frame(&mut self, frame_time: f32, input: &TickInput) {
        let dt = self.state.settings.physics.timestep;
        self.accumulator += frame_time;
        let mut steps = 0;
        let mut input = input.clone();
        while self.accumulator >= dt && steps < MAX_SUBSTEPS {
            tick(&mut self.state, &input, dt);
            self.accumulator -= dt;
            steps += 1;
            // One-shot inputs only apply to the first tick
            input.press = false;
            input.release = false;
            input.select = None;
            input.restart = false;
            input.toggle_debug = false;
        }
        if steps == MAX_SUBSTEPS {
            self.accumulator = 0.0;
        }
    }

    fn fire(&mut self, kind: ProjectileKind, pull: Vec2) {
        let rest = self.state.settings.sling_rest();
        let frame = 1.0 / 60.0;
        self.frame(
            frame,
            &TickInput {
                select: Some(kind),
                ..Default::default()
            },
        );
        self.frame(
            frame,
            &TickInput {
                pointer: Some(rest),
                press: true,
                ..Default::default()
            },
        );
        self.frame(
            frame,
            &TickInput {
                pointer: Some(rest + pull),
                ..Default::default()
            },
        );
        self.frame(
            frame,
            &TickInput {
                pointer: Some(rest + pull),
                release: true,
                ..Default::default()
            },
        );

        let mut elapsed = 0.0;
        while self.state.loaded_projectile().is_none()
            && self.state.phase == LevelPhase::Active
            && elapsed < SHOT_TIMEOUT
        {
            self.frame(frame, &TickInput::default());
            elapsed += frame;
        }
    }
}

fn main() {
    #[cfg(not(target_arch = "wasm32"))]
    env_logger::init();
    log::info!("Sling Siege (headless) starting...");

    let settings = match std::env::args().nth(1) {
        Some(path) => match Settings::load(&path) {
            Ok(settings) => settings,
            Err(err) => {
                log::error!("{err}");
                std::process::exit(1);
            }
        },
        None => Settings::default(),
    };

    let state = match GameState::new(settings) {
        Ok(state) => state,
        Err(err) => {
            log::error!("{err}");
            std::process::exit(1);
        }
    };
    let mut runner = Runner {
        state,
        accumulator: 0.0,
    };
    runner.state.set_level(1);

    for (kind, (dx, dy)) in SCRIPT {
        if runner.state.phase != LevelPhase::Active {
            break;
        }
        runner.fire(kind, Vec2::new(dx, dy));
        for event in runner.state.drain_events() {
            log::debug!("{event:?}");
        }
    }

    match serde_json::to_string(&runner.state.hud()) {
        Ok(json) => println!("{json}"),
        Err(err) => log::error!("{err}"),
    }
}
