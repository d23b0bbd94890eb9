/// WorldState: the complete snapshot of a running game.
///
/// ## Ownership
///
///   - `map`  : level geometry. **Never mutated** after load; replaced
///     wholesale when another level is loaded.
///   - `actor`: the only mutable simulation state. Written by `step`.
///
/// ## Camera / Viewport
///
/// World coordinates are map pixels. The camera is a pixel viewport:
///   - `camera`: top-left corner + size, in map pixels
///   - Renderer maps: `screen block (sx, sy) = world(camera.x + sx*bw, camera.y + sy*bh)`
///   - Camera follows the actor with a dead-zone approach
///   - Maps smaller than the viewport are centered

use crate::domain::entity::{Actor, ActorTunables};
use crate::domain::geom::Rect;
use crate::domain::tilemap::{LevelMap, TileMap};

/// Camera: a pixel viewport into the map.
#[derive(Clone, Debug)]
pub struct Camera {
    /// Map X of the top-left visible pixel (can be negative for centering)
    pub x: i32,
    /// Map Y of the top-left visible pixel
    pub y: i32,
    /// Visible width in map pixels
    pub view_w: i32,
    /// Visible height in map pixels
    pub view_h: i32,
}

impl Camera {
    pub fn new() -> Self {
        Camera { x: 0, y: 0, view_w: 0, view_h: 0 }
    }

    /// Follow a target point within the given map bounds.
    /// Dead zone: the inner 60% of the viewport; scroll only outside it.
    pub fn follow(&mut self, target_x: i32, target_y: i32, world_w: i32, world_h: i32) {
        if self.view_w <= 0 || self.view_h <= 0 { return; }
        self.x = follow_axis(self.x, self.view_w, target_x, world_w);
        self.y = follow_axis(self.y, self.view_h, target_y, world_h);
    }

    /// Snap camera directly to center on a point (no dead zone).
    /// Used on level load / restart.
    pub fn center_on(&mut self, target_x: i32, target_y: i32, world_w: i32, world_h: i32) {
        if self.view_w <= 0 || self.view_h <= 0 { return; }
        self.x = clamp_axis(target_x - self.view_w / 2, self.view_w, world_w);
        self.y = clamp_axis(target_y - self.view_h / 2, self.view_h, world_h);
    }
}

impl Default for Camera {
    fn default() -> Self {
        Camera::new()
    }
}

fn follow_axis(pos: i32, view: i32, target: i32, world: i32) -> i32 {
    let margin = view / 5; // 20% margin on each side
    let low = pos + margin;
    let high = pos + view - margin - 1;
    let moved = if target < low {
        target - margin
    } else if target > high {
        target - view + margin + 1
    } else {
        pos
    };
    clamp_axis(moved, view, world)
}

/// Clamp to map bounds, or center when the map fits in the view.
fn clamp_axis(pos: i32, view: i32, world: i32) -> i32 {
    if world <= view {
        -((view - world) / 2)
    } else {
        pos.clamp(0, world - view)
    }
}

pub struct WorldState {
    // ── Level ──
    pub map: LevelMap,
    pub level_name: String,
    pub current_level: usize,
    pub total_levels: usize,
    /// Top-left pixel the actor (re)spawns at.
    pub spawn: (i32, i32),

    // ── Actor ──
    pub actor: Actor,
    pub tunables: ActorTunables,
    pub actor_size: (i32, i32),

    // ── Meta ──
    pub tick: u64,
    pub paused: bool,
    pub show_detectors: bool,

    // ── UI ──
    pub message: String,
    pub message_timer: u32,

    // ── Camera / Viewport ──
    pub camera: Camera,
}

// ── Construction ──

impl WorldState {
    pub fn new(
        map: LevelMap,
        spawn: (i32, i32),
        tunables: ActorTunables,
        actor_size: (i32, i32),
    ) -> Self {
        let actor = spawn_actor(spawn, tunables, actor_size);
        WorldState {
            map,
            level_name: String::new(),
            current_level: 0,
            total_levels: 1,
            spawn,
            actor,
            tunables,
            actor_size,
            tick: 0,
            paused: false,
            show_detectors: false,
            message: String::new(),
            message_timer: 0,
            camera: Camera::new(),
        }
    }

    /// Swap in a new level and put the actor at its spawn.
    pub fn replace_level(&mut self, map: LevelMap, spawn: (i32, i32)) {
        self.map = map;
        self.spawn = spawn;
        self.restart_level();
    }

    /// Reset the actor to the spawn and recenter the camera.
    pub fn restart_level(&mut self) {
        self.actor = spawn_actor(self.spawn, self.tunables, self.actor_size);
        self.tick = 0;
        let (cx, cy) = self.actor_center();
        let (w, h) = self.map.pixel_size();
        self.camera.center_on(cx, cy, w, h);
    }

    pub fn set_message(&mut self, msg: &str, duration: u32) {
        self.message = msg.to_string();
        self.message_timer = duration;
    }

    /// Count down the HUD message; clears it on expiry.
    pub fn tick_message(&mut self) {
        if self.message_timer > 0 {
            self.message_timer -= 1;
            if self.message_timer == 0 { self.message.clear(); }
        }
    }

    pub fn actor_center(&self) -> (i32, i32) {
        let r = self.actor.rect;
        (r.x + r.w / 2, r.y + r.h / 2)
    }

    /// Has the actor dropped a full cell below the map?
    pub fn actor_out_of_map(&self) -> bool {
        let (_, map_h) = self.map.pixel_size();
        let (_, cell_h) = self.map.cell_size();
        self.actor.rect.y > map_h + cell_h
    }
}

/// Actors spawn airborne at rest; the first ticks settle them.
fn spawn_actor(spawn: (i32, i32), tunables: ActorTunables, size: (i32, i32)) -> Actor {
    let mut actor = Actor::new(Rect::new(spawn.0, spawn.1, size.0, size.1), tunables);
    actor.reset_at(spawn.0, spawn.1);
    actor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::PhysicsState;
    use crate::domain::tilemap::ascii_map;

    #[test]
    fn camera_centers_small_maps() {
        let mut cam = Camera { x: 0, y: 0, view_w: 200, view_h: 100 };
        cam.center_on(10, 10, 100, 60);
        assert_eq!((cam.x, cam.y), (-50, -20));
    }

    #[test]
    fn camera_dead_zone_and_clamp() {
        let mut cam = Camera { x: 0, y: 0, view_w: 100, view_h: 100 };
        cam.follow(50, 50, 1000, 1000);
        assert_eq!((cam.x, cam.y), (0, 0), "inside the dead zone");

        cam.follow(300, 50, 1000, 1000);
        assert_eq!(cam.x, 300 - 100 + 20 + 1);

        cam.follow(990, 990, 1000, 1000);
        assert_eq!((cam.x, cam.y), (900, 900), "clamped to the map edge");
    }

    #[test]
    fn restart_puts_actor_back_airborne() {
        let map = ascii_map(&["...", "###"]);
        let mut world = WorldState::new(map, (40, 2), ActorTunables::default(), (21, 15));
        world.actor.rect.x = 70;
        world.actor.vel.x = 3.0;
        world.restart_level();
        assert_eq!(world.actor.rect, Rect::new(40, 2, 21, 15));
        assert_eq!(world.actor.vel.x, 0.0);
        assert_eq!(world.actor.state, PhysicsState::Airborne);
    }

    #[test]
    fn out_of_map_after_one_cell_below_bottom() {
        let map = ascii_map(&["...", "###"]);
        let mut world = WorldState::new(map, (40, 2), ActorTunables::default(), (21, 15));
        world.actor.rect.y = 96;
        assert!(!world.actor_out_of_map());
        world.actor.rect.y = 97;
        assert!(world.actor_out_of_map());
    }
}
