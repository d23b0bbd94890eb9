/// The actor: its rectangle, velocity, physics state and tunables.
///
/// One state machine with two states. Exactly one holds at every tick
/// boundary; only `sim::step` and the jump methods change it.

use super::geom::Rect;
use super::mask::SolidityMask;

/// How far below the feet the floor probes reach.
pub const FLOOR_PROBE_REACH: i32 = 16;
/// Height of the wall probe above the feet. Steps lower than this are
/// climbed by ground snapping instead of blocking.
pub const WALL_PROBE_RISE: i32 = 10;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PhysicsState {
    Grounded,
    Airborne,
}

/// Per-actor-kind constants. Velocities are pixels per tick.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct ActorTunables {
    pub speed: f32,
    /// Initial vertical velocity of a jump (negative = up).
    pub jump_power: f32,
    /// Upward velocity a released jump is clamped to.
    pub jump_cut: f32,
    pub gravity: f32,
    pub max_fall_speed: f32,
}

impl Default for ActorTunables {
    fn default() -> Self {
        ActorTunables {
            speed: 3.0,
            jump_power: -6.5,
            jump_cut: -3.0,
            gravity: 0.22,
            max_fall_speed: 16.0,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
}

/// Host input for one tick: held direction plus two edge events.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct InputIntent {
    pub move_left: bool,
    pub move_right: bool,
    pub jump_pressed: bool,
    pub jump_released: bool,
}

impl InputIntent {
    /// -1, 0 or +1. Opposite directions cancel.
    pub fn direction(&self) -> i32 {
        self.move_right as i32 - self.move_left as i32
    }
}

/// Per-tick probe rectangles, derived from the actor rect.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Detectors {
    /// Left and right floor bars: 1px wide, from the head to
    /// `FLOOR_PROBE_REACH` below the feet.
    pub floor: [Rect; 2],
    /// Full-width 1px bar `WALL_PROBE_RISE` above the feet.
    pub wall: Rect,
}

impl Detectors {
    pub fn for_rect(rect: Rect) -> Self {
        let reach = rect.h + FLOOR_PROBE_REACH;
        Detectors {
            floor: [
                Rect::new(rect.x + 1, rect.y, 1, reach),
                Rect::new(rect.right() - 2, rect.y, 1, reach),
            ],
            wall: Rect::new(rect.x, rect.bottom() - WALL_PROBE_RISE, rect.w, 1),
        }
    }
}

/// Solid masks matching the actor's probes. Built once per actor.
#[derive(Clone, Debug)]
pub struct ProbeMasks {
    /// Whole body, used against walls while airborne.
    pub body: SolidityMask,
    /// Wall bar.
    pub wall: SolidityMask,
    /// Landing bars, inset one pixel on each side.
    pub feet: SolidityMask,
}

/// What the host sees after a tick.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct ActorSnapshot {
    pub rect: Rect,
    pub vel: Velocity,
    pub state: PhysicsState,
}

#[derive(Clone, Debug)]
pub struct Actor {
    pub rect: Rect,
    pub vel: Velocity,
    pub state: PhysicsState,
    pub tunables: ActorTunables,
    masks: ProbeMasks,
}

impl Actor {
    /// Smallest width that keeps the two floor probes distinct.
    pub const MIN_WIDTH: i32 = 4;

    /// New actor at rest. Starts grounded; the first tick decides.
    ///
    /// Panics if the size cannot host the probes.
    pub fn new(rect: Rect, tunables: ActorTunables) -> Self {
        assert!(
            rect.w >= Self::MIN_WIDTH && rect.h >= 1,
            "actor size {}x{} is too small for its detectors",
            rect.w,
            rect.h
        );
        let (w, h) = (rect.w as usize, rect.h as usize);
        Actor {
            rect,
            vel: Velocity::default(),
            state: PhysicsState::Grounded,
            tunables,
            masks: ProbeMasks {
                body: SolidityMask::filled(w, h),
                wall: SolidityMask::filled(w, 1),
                feet: SolidityMask::filled(w - 2, 1),
            },
        }
    }

    pub fn masks(&self) -> &ProbeMasks {
        &self.masks
    }

    pub fn detectors(&self) -> Detectors {
        Detectors::for_rect(self.rect)
    }

    /// Start a jump. Only from the ground; leaves the ground immediately.
    /// Returns whether the jump happened.
    pub fn jump(&mut self) -> bool {
        if self.state != PhysicsState::Grounded {
            return false;
        }
        self.vel.y = self.tunables.jump_power;
        self.state = PhysicsState::Airborne;
        true
    }

    /// Shorten a rising jump. Only while airborne and still rising faster
    /// than the cut threshold. Returns whether the velocity was clamped.
    pub fn jump_cut(&mut self) -> bool {
        if self.state != PhysicsState::Airborne || self.vel.y >= self.tunables.jump_cut {
            return false;
        }
        self.vel.y = self.tunables.jump_cut;
        true
    }

    /// Place the actor with its feet at `bottom`, keeping the velocity.
    pub fn set_bottom(&mut self, bottom: i32) {
        self.rect.y = bottom - self.rect.h;
    }

    /// Put the actor back at `(x, y)` at rest and airborne.
    pub fn reset_at(&mut self, x: i32, y: i32) {
        self.rect.x = x;
        self.rect.y = y;
        self.vel = Velocity::default();
        self.state = PhysicsState::Airborne;
    }

    pub fn snapshot(&self) -> ActorSnapshot {
        ActorSnapshot { rect: self.rect, vel: self.vel, state: self.state }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor() -> Actor {
        Actor::new(Rect::new(35, 25, 21, 15), ActorTunables::default())
    }

    #[test]
    fn detectors_flank_the_body() {
        let d = Detectors::for_rect(Rect::new(35, 25, 21, 15));
        assert_eq!(d.floor[0], Rect::new(36, 25, 1, 31));
        assert_eq!(d.floor[1], Rect::new(54, 25, 1, 31));
        assert_eq!(d.wall, Rect::new(35, 30, 21, 1));
    }

    #[test]
    fn probe_masks_match_actor_size() {
        let a = actor();
        assert_eq!((a.masks().body.width(), a.masks().body.height()), (21, 15));
        assert_eq!((a.masks().wall.width(), a.masks().wall.height()), (21, 1));
        assert_eq!((a.masks().feet.width(), a.masks().feet.height()), (19, 1));
    }

    #[test]
    fn jump_only_from_ground() {
        let mut a = actor();
        assert!(a.jump());
        assert_eq!(a.vel.y, -6.5);
        assert_eq!(a.state, PhysicsState::Airborne);

        a.vel.y = 1.0;
        assert!(!a.jump());
        assert_eq!(a.vel.y, 1.0);
        assert_eq!(a.state, PhysicsState::Airborne);
    }

    #[test]
    fn jump_cut_clamps_only_fast_rise() {
        let mut a = actor();
        assert!(!a.jump_cut(), "no cut while grounded");

        a.jump();
        assert!(a.jump_cut());
        assert_eq!(a.vel.y, -3.0);

        a.vel.y = -2.0;
        assert!(!a.jump_cut());
        assert_eq!(a.vel.y, -2.0);
    }

    #[test]
    fn opposite_directions_cancel() {
        let both = InputIntent { move_left: true, move_right: true, ..Default::default() };
        assert_eq!(both.direction(), 0);
        let left = InputIntent { move_left: true, ..Default::default() };
        assert_eq!(left.direction(), -1);
    }

    #[test]
    #[should_panic(expected = "too small")]
    fn degenerate_size_is_an_invariant_violation() {
        Actor::new(Rect::new(0, 0, 3, 10), ActorTunables::default());
    }
}
