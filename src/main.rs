/// Entry point and game loop.

mod ui;

use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags};
use crossterm::{execute, terminal};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sloperunner::config::GameConfig;
use sloperunner::sim::event::GameEvent;
use sloperunner::sim::level;
use sloperunner::sim::step;
use sloperunner::sim::world::WorldState;
use sloperunner::InputIntent;
use ui::input::InputState;
use ui::renderer::Renderer;
use ui::sound::SoundEngine;

const FRAME_SLEEP: Duration = Duration::from_millis(5);

/// Environment variable naming a log file. Without it, only warnings go
/// to stderr.
const LOG_ENV: &str = "SLOPERUNNER_LOG";

fn main() {
    init_logging();

    let config = GameConfig::load();
    let mut world = match level::load_world(&config) {
        Ok(world) => world,
        Err(e) => {
            eprintln!("Could not load a level: {e}");
            std::process::exit(1);
        }
    };

    let mut renderer = Renderer::new();

    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let enhanced = enable_release_events();
    let sound = SoundEngine::new();

    let result = game_loop(&mut world, &mut renderer, sound.as_ref(), &config, enhanced);

    if enhanced {
        let _ = execute!(io::stdout(), PopKeyboardEnhancementFlags);
    }
    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Slope Runner!");
}

fn init_logging() {
    match std::env::var_os(LOG_ENV) {
        Some(path) => {
            let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
            match std::fs::File::create(&path) {
                Ok(file) => tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_writer(std::sync::Mutex::new(file))
                    .with_ansi(false)
                    .init(),
                Err(e) => eprintln!("Could not open log file {}: {e}", path.to_string_lossy()),
            }
        }
        None => {
            let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .init();
        }
    }
}

/// Ask the terminal for key Release events. Without them, releases are
/// inferred from a hold timeout.
fn enable_release_events() -> bool {
    let supported = matches!(terminal::supports_keyboard_enhancement(), Ok(true));
    let enabled = supported
        && execute!(
            io::stdout(),
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )
        .is_ok();
    info!(enabled, "key release events");
    enabled
}

fn game_loop(
    world: &mut WorldState,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
    enhanced: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    kb.honor_release = enhanced;
    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(config.tick_rate_ms);

    // Jump edges seen between ticks, delivered with the next tick.
    let mut pending = InputIntent::default();
    let mut was_blocked = false;

    loop {
        kb.drain_events();

        if kb.ctrl_c_pressed() {
            break;
        }
        if handle_meta(world, &kb, config) {
            break;
        }

        let frame = kb.intent();
        pending.jump_pressed |= frame.jump_pressed;
        pending.jump_released |= frame.jump_released;

        if last_tick.elapsed() >= tick_rate {
            if world.paused {
                world.tick_message();
            } else {
                let input = InputIntent {
                    move_left: frame.move_left,
                    move_right: frame.move_right,
                    ..pending
                };
                let events = step::step(world, input);
                process_sound_events(sound, &events, &mut was_blocked);
            }
            pending = InputIntent::default();
            last_tick = Instant::now();
        }

        renderer.render(world)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    info!(level = %world.level_name, ticks = world.tick, "quit");
    Ok(())
}

fn process_sound_events(sound: Option<&SoundEngine>, events: &[GameEvent], was_blocked: &mut bool) {
    let blocked = events.iter().any(|e| matches!(e, GameEvent::WallBlocked { .. }));
    let first_bump = blocked && !*was_blocked;
    *was_blocked = blocked;

    let sfx = match sound {
        Some(s) => s,
        None => return,
    };
    for event in events {
        match event {
            GameEvent::Jumped => sfx.play_jump(),
            GameEvent::Landed { .. } => sfx.play_land(),
            GameEvent::WallBlocked { .. } if first_bump => sfx.play_bump(),
            _ => {}
        }
    }
}

/// Handle pause, restart, overlay, level switch and quit keys.
/// Returns true when the game should exit.
fn handle_meta(world: &mut WorldState, kb: &InputState, config: &GameConfig) -> bool {
    if kb.was_pressed(KeyCode::Esc) {
        return true;
    }

    if kb.was_pressed(KeyCode::F(1)) {
        world.paused = !world.paused;
    }

    if kb.was_pressed(KeyCode::F(2)) {
        world.restart_level();
        world.paused = false;
        world.set_message("Restarted", 60);
    }

    if kb.was_pressed(KeyCode::F(3)) {
        world.show_detectors = !world.show_detectors;
        let msg = if world.show_detectors { "Detectors on" } else { "Detectors off" };
        world.set_message(msg, 60);
    }

    if kb.was_pressed(KeyCode::Tab) {
        let next = world.current_level + 1;
        match level::load_level(world, next, config) {
            Ok(()) => world.paused = false,
            Err(e) => {
                warn!("could not load level {next}: {e}");
                world.set_message(&format!("Level error: {e}"), 180);
            }
        }
    }

    false
}
