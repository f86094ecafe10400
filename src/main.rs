//! Merge Drop headless driver
//!
//! Runs a scripted session against the in-memory collaborators: drops a row
//! of previews across the container, lets them settle and merge, and logs what
//! is left. Usage: `merge-drop [config.json]` (`RUST_LOG=debug` for merges).

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use merge_drop::GameConfig;
    use merge_drop::consts::SIM_DT;
    use merge_drop::platform::{HeadlessAssets, HeadlessPhysics, HeadlessScene};
    use merge_drop::sim::{FrameInput, GameEvent, MergeGame, PointerEvent, tick};

    /// Preview drop positions (world x)
    const DROPS: [f32; 12] = [-2.5, -1.0, 0.5, 2.0, 3.3, -3.3, 0.0, 1.2, -0.6, 2.6, -1.8, 0.9];
    /// Ticks to wait for a preview before giving up on a drop
    const PREVIEW_WAIT_TICKS: u32 = 240;
    /// Ticks between drops (0.75 s)
    const DROP_GAP_TICKS: u32 = 90;
    /// Ticks to let the pile settle at the end (5 s)
    const SETTLE_TICKS: u32 = 600;

    env_logger::init();
    log::info!("Merge Drop (headless) starting...");

    let config = match std::env::args().nth(1) {
        Some(path) => GameConfig::load_or_default(path),
        None => GameConfig::default(),
    };
    let physics = HeadlessPhysics::new(config.gravity);
    let mut game = match MergeGame::new(config, physics, HeadlessScene::default(), HeadlessAssets::with_latency(2)) {
        Ok(game) => game,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let run = |game: &mut MergeGame<HeadlessPhysics, HeadlessScene, HeadlessAssets>, input: &FrameInput| {
        for event in tick(game, input, SIM_DT) {
            match event {
                GameEvent::Merged { consumed, into, position } => log::info!(
                    "{} + {} -> {} at ({:.2}, {:.2}, {:.2})",
                    consumed[0].kind,
                    consumed[1].kind,
                    into,
                    position.x,
                    position.y,
                    position.z
                ),
                GameEvent::MergeLost { consumed, into } => log::info!(
                    "{} + {} consumed, {} lost (spawn slot busy)",
                    consumed[0].kind,
                    consumed[1].kind,
                    into
                ),
                GameEvent::SpawnFailed { kind, error } => log::warn!("{} not spawned: {}", kind, error),
                _ => {}
            }
        }
    };

    for x in DROPS {
        let mut waited = 0;
        while game.held_preview().is_none() && waited < PREVIEW_WAIT_TICKS {
            run(&mut game, &FrameInput::default());
            waited += 1;
        }
        let Some(preview) = game.held_preview().copied() else {
            log::warn!("No preview after {} ticks, skipping drop at x = {}", waited, x);
            continue;
        };
        log::info!("Dropping {} at x = {}", preview.kind, x);
        let release = FrameInput {
            pointer: vec![
                PointerEvent::Down { x: 0.0, inside: true },
                PointerEvent::Move { x },
                PointerEvent::Up,
            ],
            turn: None,
        };
        run(&mut game, &release);
        for _ in 0..DROP_GAP_TICKS {
            run(&mut game, &FrameInput::default());
        }
    }
    for _ in 0..SETTLE_TICKS {
        run(&mut game, &FrameInput::default());
    }

    log::info!(
        "Finished after {} ticks: {} items, {:?}",
        game.time_ticks,
        game.registry.len(),
        game.stats
    );
    for obj in game.objects() {
        if let Some(pos) = game.position_of(&obj) {
            log::info!(
                "  #{:<3} {:<11} ({:.2}, {:.2}, {:.2})",
                obj.id.0,
                obj.kind.as_str(),
                pos.x,
                pos.y,
                pos.z
            );
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Browser hosts drive `merge_drop::sim::tick` directly
}
