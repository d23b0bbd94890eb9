/// The step function: advances the actor by one tick.
///
/// Processing order (fixed):
///   1. Input:    horizontal intent sets x velocity
///   2. Wall:     penetration-corrected horizontal move
///   3. Vertical: ground snap when grounded, landing probe when airborne
///   4. Gravity:  integrate while airborne, zero while grounded
///   5. Jump:     jump / jump-cut from this tick's edges
///
/// Jump events run last so a jump leaves the ground immediately and its
/// impulse is visible in the snapshot; the upward move happens next tick.
///
/// `tick` is the whole core contract. `step` wraps it for the host: it
/// turns the tick report into events, respawns a lost actor, and moves
/// the camera.

use tracing::debug;

use crate::domain::entity::{Actor, ActorSnapshot, InputIntent, PhysicsState};
use crate::domain::ground;
use crate::domain::physics;
use crate::domain::tilemap::TileMap;
use super::event::GameEvent;
use super::world::WorldState;

/// What happened during one tick.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct TickReport {
    pub snapshot: ActorSnapshot,
    /// Horizontal displacement asked for by the input.
    pub requested_dx: i32,
    /// Horizontal displacement actually applied.
    pub moved_dx: i32,
    pub jumped: bool,
    pub jump_cut: bool,
    pub landed: bool,
    pub left_ground: bool,
}

// ══════════════════════════════════════════════════════════════
// Core entry point
// ══════════════════════════════════════════════════════════════

/// Advance the actor one tick against `map` and return its new state.
pub fn tick<M: TileMap + ?Sized>(actor: &mut Actor, map: &M, input: InputIntent) -> ActorSnapshot {
    advance(actor, map, input).snapshot
}

/// `tick`, with a report of the transitions it made.
pub fn advance<M: TileMap + ?Sized>(actor: &mut Actor, map: &M, input: InputIntent) -> TickReport {
    let requested_dx = resolve_input(actor, input);
    let moved_dx = resolve_wall(actor, map);
    let (landed, left_ground) = resolve_vertical(actor, map);
    resolve_gravity(actor);
    let (jumped, jump_cut) = resolve_jump(actor, input);

    TickReport {
        snapshot: actor.snapshot(),
        requested_dx,
        moved_dx,
        jumped,
        jump_cut,
        landed,
        left_ground,
    }
}

// ══════════════════════════════════════════════════════════════
// Phases
// ══════════════════════════════════════════════════════════════

fn resolve_input(actor: &mut Actor, input: InputIntent) -> i32 {
    actor.vel.x = input.direction() as f32 * actor.tunables.speed;
    actor.vel.x as i32
}

fn resolve_wall<M: TileMap + ?Sized>(actor: &mut Actor, map: &M) -> i32 {
    let dx = physics::resolve_wall(map, actor);
    if dx != actor.vel.x as i32 {
        actor.vel.x = dx as f32;
    }
    actor.rect.x += dx;
    dx
}

/// Returns `(landed, left_ground)`.
fn resolve_vertical<M: TileMap + ?Sized>(actor: &mut Actor, map: &M) -> (bool, bool) {
    match actor.state {
        PhysicsState::Grounded => match ground::resolve_ground(map, actor) {
            Some(floor_y) => {
                actor.set_bottom(floor_y);
                (false, false)
            }
            None => {
                actor.state = PhysicsState::Airborne;
                debug!(x = actor.rect.x, y = actor.rect.y, "left ground");
                (false, true)
            }
        },
        PhysicsState::Airborne => {
            let out = physics::resolve_airborne(map, actor);
            if out.landed {
                actor.vel.y = out.dy as f32;
            }
            actor.rect.y += out.dy;
            if out.landed {
                actor.state = PhysicsState::Grounded;
                debug!(x = actor.rect.x, feet = actor.rect.bottom(), "landed");
            }
            (out.landed, false)
        }
    }
}

fn resolve_gravity(actor: &mut Actor) {
    match actor.state {
        PhysicsState::Airborne => {
            let t = &actor.tunables;
            actor.vel.y = (actor.vel.y + t.gravity).min(t.max_fall_speed);
        }
        PhysicsState::Grounded => actor.vel.y = 0.0,
    }
}

/// Returns `(jumped, jump_cut)`.
fn resolve_jump(actor: &mut Actor, input: InputIntent) -> (bool, bool) {
    let jumped = input.jump_pressed && actor.jump();
    let cut = input.jump_released && actor.jump_cut();
    if jumped {
        debug!(x = actor.rect.x, y = actor.rect.y, "jump");
    }
    (jumped, cut)
}

// ══════════════════════════════════════════════════════════════
// Host step
// ══════════════════════════════════════════════════════════════

/// Advance the world one tick. Returns events for sound and HUD.
pub fn step(world: &mut WorldState, input: InputIntent) -> Vec<GameEvent> {
    let mut events = Vec::new();
    world.tick += 1;
    world.tick_message();

    let report = advance(&mut world.actor, &world.map, input);
    collect_events(&report, &mut events);

    if world.actor_out_of_map() {
        debug!(tick = world.tick, "actor fell out of the map");
        world.restart_level();
        events.push(GameEvent::Respawned);
    }

    let (cx, cy) = world.actor_center();
    let (w, h) = world.map.pixel_size();
    world.camera.follow(cx, cy, w, h);

    events
}

fn collect_events(report: &TickReport, events: &mut Vec<GameEvent>) {
    if report.moved_dx != report.requested_dx {
        events.push(GameEvent::WallBlocked {
            requested: report.requested_dx,
            moved: report.moved_dx,
        });
    }
    if report.left_ground {
        events.push(GameEvent::LeftGround);
    }
    if report.landed {
        events.push(GameEvent::Landed { y: report.snapshot.rect.bottom() });
    }
    if report.jumped {
        events.push(GameEvent::Jumped);
    }
    if report.jump_cut {
        events.push(GameEvent::JumpCut);
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
