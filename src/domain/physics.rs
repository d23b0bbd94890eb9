/// Mask-level collision: overlap testing, penetration correction, and the
/// wall and airborne resolvers built on them.
///
/// ## Two-phase overlap
///
///   1. RECT : which occupied cells does the displaced probe rect touch?
///   2. MASK : for those only, do solid probe pixels meet solid tile pixels?
///
/// Height profiles are not used here: walls and landings need the exact
/// image, not the surface line.
///
/// ## Penetration correction
///
/// A displacement known to collide is shortened one pixel at a time toward
/// zero until it stops colliding. Offsets are bounded by per-tick velocity,
/// so the linear walk is short and deterministic. Reaching zero means the
/// axis is fully blocked this tick.

use tracing::trace;

use super::entity::{Actor, PhysicsState};
use super::geom::{GridCoord, Rect};
use super::mask::SolidityMask;
use super::tilemap::TileMap;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    #[inline]
    fn component(self, offset: (i32, i32)) -> i32 {
        match self {
            Axis::Horizontal => offset.0,
            Axis::Vertical => offset.1,
        }
    }

    #[inline]
    fn with_component(self, offset: (i32, i32), value: i32) -> (i32, i32) {
        match self {
            Axis::Horizontal => (value, offset.1),
            Axis::Vertical => (offset.0, value),
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Per-pixel overlap tester
// ══════════════════════════════════════════════════════════════

/// Cells whose tile pixels overlap the probe displaced by `offset`.
/// Empty result = no collision. Row-major order.
pub fn colliding_cells<M: TileMap + ?Sized>(
    map: &M,
    probe: Rect,
    mask: &SolidityMask,
    offset: (i32, i32),
) -> Vec<GridCoord> {
    let test = probe.translate(offset.0, offset.1);
    map.cells_intersecting(test)
        .into_iter()
        .filter(|&coord| {
            let Some(variant) = map.cell_at(coord) else { return false };
            let cell = map.rect_of(coord);
            map.solidity_mask(variant)
                .overlap_area(mask, (test.x - cell.x, test.y - cell.y))
                > 0
        })
        .collect()
}

/// Does the displaced probe overlap any solid tile pixel?
pub fn collides<M: TileMap + ?Sized>(
    map: &M,
    probe: Rect,
    mask: &SolidityMask,
    offset: (i32, i32),
) -> bool {
    let test = probe.translate(offset.0, offset.1);
    map.cells_intersecting(test).into_iter().any(|coord| {
        map.cell_at(coord).is_some_and(|variant| {
            let cell = map.rect_of(coord);
            map.solidity_mask(variant).overlaps(mask, (test.x - cell.x, test.y - cell.y))
        })
    })
}

// ══════════════════════════════════════════════════════════════
// Penetration correction
// ══════════════════════════════════════════════════════════════

/// Shorten `offset` along `axis` toward zero until the probe no longer
/// overlaps. Returns the corrected component; zero means fully blocked.
///
/// The caller has already established that `offset` collides, so the
/// first candidate tried is one pixel shorter.
pub fn correct_penetration<M: TileMap + ?Sized>(
    map: &M,
    probe: Rect,
    mask: &SolidityMask,
    offset: (i32, i32),
    axis: Axis,
) -> i32 {
    let requested = axis.component(offset);
    let step = -requested.signum();
    let mut candidate = requested;
    while candidate != 0 {
        candidate += step;
        if candidate == 0 {
            break;
        }
        if !collides(map, probe, mask, axis.with_component(offset, candidate)) {
            trace!(?axis, requested, corrected = candidate, "penetration corrected");
            return candidate;
        }
    }
    trace!(?axis, requested, "fully blocked");
    0
}

// ══════════════════════════════════════════════════════════════
// Wall resolver
// ══════════════════════════════════════════════════════════════

/// Horizontal displacement the actor can make this tick.
///
/// Grounded actors test only the wall bar above their feet, so low steps
/// and slopes pass underneath and are handled by ground snapping.
/// Airborne actors test their whole body.
pub fn resolve_wall<M: TileMap + ?Sized>(map: &M, actor: &Actor) -> i32 {
    let dx = actor.vel.x as i32;
    let (probe, mask) = match actor.state {
        PhysicsState::Grounded => (actor.detectors().wall, &actor.masks().wall),
        PhysicsState::Airborne => (actor.rect, &actor.masks().body),
    };
    if collides(map, probe, mask, (dx, 0)) {
        correct_penetration(map, probe, mask, (dx, 0), Axis::Horizontal)
    } else {
        dx
    }
}

// ══════════════════════════════════════════════════════════════
// Airborne resolver
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct AirborneOutcome {
    /// Vertical displacement to apply this tick.
    pub dy: i32,
    /// A surface was met; the actor is now supported.
    pub landed: bool,
}

/// Landing bars: one just above the bottom edge, one on it. Inset one
/// pixel from each side so grazing a wall is not a landing.
pub fn landing_probes(rect: Rect) -> [Rect; 2] {
    [
        Rect::new(rect.x + 1, rect.bottom() - 2, rect.w - 2, 1),
        Rect::new(rect.x + 1, rect.bottom() - 1, rect.w - 2, 1),
    ]
}

/// Probe ahead along the pending vertical delta. Each colliding probe
/// shortens the delta in turn, so the bottom bar has the final say.
///
/// Every pixel row the probe passes through is tested, so surfaces
/// thinner than the delta still catch the actor.
pub fn resolve_airborne<M: TileMap + ?Sized>(map: &M, actor: &Actor) -> AirborneOutcome {
    let mask = &actor.masks().feet;
    let mut dy = actor.vel.y as i32;
    let mut landed = false;

    for probe in landing_probes(actor.rect) {
        if let Some(hit) = first_colliding_step(map, probe, mask, dy) {
            dy = correct_penetration(map, probe, mask, (0, hit), Axis::Vertical);
            landed = true;
        }
    }

    AirborneOutcome { dy, landed }
}

/// First vertical offset between one pixel and `dy` (inclusive) at which
/// the probe overlaps a tile.
fn first_colliding_step<M: TileMap + ?Sized>(
    map: &M,
    probe: Rect,
    mask: &SolidityMask,
    dy: i32,
) -> Option<i32> {
    let dir = dy.signum();
    (1..=dy.abs())
        .map(|n| n * dir)
        .find(|&step| collides(map, probe, mask, (0, step)))
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::ActorTunables;
    use crate::domain::tilemap::ascii_map as map_from;
    use proptest::prelude::*;

    fn actor_at(x: i32, y: i32, state: PhysicsState) -> Actor {
        let mut a = Actor::new(Rect::new(x, y, 21, 15), ActorTunables::default());
        a.state = state;
        a
    }

    // ── Overlap tester ──

    #[test]
    fn rect_hit_without_pixel_hit_is_not_a_collision() {
        // Half block: top 16 rows of the cell are clear.
        let map = map_from(&["=."]);
        let bar = SolidityMask::filled(10, 1);
        assert!(colliding_cells(&map, Rect::new(4, 10, 10, 1), &bar, (0, 0)).is_empty());
        assert_eq!(
            colliding_cells(&map, Rect::new(4, 10, 10, 1), &bar, (0, 6)),
            vec![GridCoord::new(0, 0)]
        );
    }

    #[test]
    fn reports_every_overlapping_cell() {
        let map = map_from(&["##"]);
        let bar = SolidityMask::filled(10, 1);
        let hits = colliding_cells(&map, Rect::new(27, 5, 10, 1), &bar, (0, 0));
        assert_eq!(hits, vec![GridCoord::new(0, 0), GridCoord::new(1, 0)]);
    }

    #[test]
    fn offset_moves_the_probe() {
        let map = map_from(&[".#"]);
        let bar = SolidityMask::filled(4, 1);
        assert!(!collides(&map, Rect::new(26, 0, 4, 1), &bar, (0, 0)));
        assert!(collides(&map, Rect::new(26, 0, 4, 1), &bar, (3, 0)));
    }

    // ── Penetration correction ──

    #[test]
    fn correction_returns_first_free_offset() {
        let map = map_from(&[".#"]);
        let bar = SolidityMask::filled(4, 1);
        // Probe spans 24..28; the wall starts at 32.
        assert_eq!(
            correct_penetration(&map, Rect::new(24, 0, 4, 1), &bar, (7, 0), Axis::Horizontal),
            4
        );
    }

    #[test]
    fn correction_reaches_zero_when_blocked() {
        let map = map_from(&[".#"]);
        let bar = SolidityMask::filled(4, 1);
        assert_eq!(
            correct_penetration(&map, Rect::new(28, 0, 4, 1), &bar, (3, 0), Axis::Horizontal),
            0
        );
        assert_eq!(
            correct_penetration(&map, Rect::new(28, 0, 4, 1), &bar, (1, 0), Axis::Horizontal),
            0
        );
    }

    #[test]
    fn correction_works_toward_zero_from_negative() {
        let map = map_from(&["#."]);
        let bar = SolidityMask::filled(4, 1);
        assert_eq!(
            correct_penetration(&map, Rect::new(34, 0, 4, 1), &bar, (-5, 0), Axis::Horizontal),
            -2
        );
    }

    // ── Wall resolver ──

    #[test]
    fn wall_cuts_three_pixel_step_to_one() {
        let map = map_from(&["...", "...#", "####"]);
        // Right edge at 95, wall face at 96.
        let mut a = actor_at(74, 49, PhysicsState::Grounded);
        a.vel.x = 3.0;
        assert_eq!(resolve_wall(&map, &a), 1);
    }

    #[test]
    fn grounded_wall_probe_passes_over_slopes() {
        let map = map_from(&["...", "./."]);
        // Standing on the slope with the right foot on the surface at y=41.
        let mut a = actor_at(35, 26, PhysicsState::Grounded);
        a.vel.x = 3.0;
        assert!(collides(&map, a.rect, &a.masks().body, (3, 0)), "body clips the slope");
        assert_eq!(resolve_wall(&map, &a), 3);
    }

    #[test]
    fn airborne_wall_uses_whole_body() {
        let map = map_from(&["...#", "...."]);
        // Wall bar at y=33 clears the wall; the body top at y=28 does not.
        let mut a = actor_at(72, 28, PhysicsState::Airborne);
        a.vel.x = 5.0;
        assert_eq!(resolve_wall(&map, &a), 3);

        a.state = PhysicsState::Grounded;
        assert_eq!(resolve_wall(&map, &a), 5);
    }

    #[test]
    fn free_movement_is_untouched() {
        let map = map_from(&["....", "####"]);
        let mut a = actor_at(10, 17, PhysicsState::Grounded);
        a.vel.x = -3.0;
        assert_eq!(resolve_wall(&map, &a), -3);
    }

    // ── Airborne resolver ──

    #[test]
    fn lands_on_surface_two_pixels_below() {
        let map = map_from(&["...", "...", "###"]);
        // Feet at 62, floor at 64, falling 5px.
        let mut a = actor_at(40, 47, PhysicsState::Airborne);
        a.vel.y = 5.0;
        assert_eq!(resolve_airborne(&map, &a), AirborneOutcome { dy: 2, landed: true });
    }

    #[test]
    fn free_fall_applies_full_delta() {
        let map = map_from(&["...", "...", "###"]);
        let mut a = actor_at(40, 10, PhysicsState::Airborne);
        a.vel.y = 5.9;
        assert_eq!(resolve_airborne(&map, &a), AirborneOutcome { dy: 5, landed: false });
    }

    #[test]
    fn landing_on_slope_uses_mask() {
        let map = map_from(&["..", "./"]);
        // Feet span x 41..=59 over a slope rising right; the highest column
        // under them is x=59 (offset 27, height 28, surface y = 36).
        let mut a = actor_at(40, 10, PhysicsState::Airborne);
        a.vel.y = 12.0;
        let out = resolve_airborne(&map, &a);
        assert!(out.landed);
        assert_eq!(a.rect.bottom() + out.dy, 36);
    }

    #[test]
    fn fall_longer_than_the_surface_is_thick_still_lands() {
        // Gentle tile: the highest column under the feet (x=19) is 10px
        // tall, surface at y=22. A 16px fall from feet at 18 would end at
        // 34, below the whole tile.
        let map = map_from(&["a"]);
        let mut a = actor_at(0, 3, PhysicsState::Airborne);
        a.vel.y = 16.0;
        assert!(!collides(&map, landing_probes(a.rect)[1], &a.masks().feet, (0, 16)));

        let out = resolve_airborne(&map, &a);
        assert!(out.landed);
        assert_eq!(a.rect.bottom() + out.dy, 22);
    }

    #[test]
    fn zero_delta_just_above_surface_does_not_land() {
        let map = map_from(&["...", "...", "###"]);
        let a = actor_at(40, 49, PhysicsState::Airborne);
        assert_eq!(resolve_airborne(&map, &a), AirborneOutcome { dy: 0, landed: false });
    }

    proptest! {
        #[test]
        fn correction_never_grows_and_clears_overlap(
            x in 0i32..96,
            y in 0i32..64,
            dx in -12i32..12,
            dy in -12i32..12,
            vertical in any::<bool>(),
        ) {
            let map = map_from(&["./#.", "#\\=/", "####"]);
            let bar = SolidityMask::filled(7, 3);
            let probe = Rect::new(x, y, 7, 3);
            let axis = if vertical { Axis::Vertical } else { Axis::Horizontal };
            let offset = if vertical { (0, dy) } else { (dx, 0) };
            prop_assume!(collides(&map, probe, &bar, offset));

            let out = correct_penetration(&map, probe, &bar, offset, axis);
            prop_assert!(out.abs() <= axis.component(offset).abs());
            prop_assert!(out == 0 || out.signum() == axis.component(offset).signum());
            prop_assert!(out == 0 || !collides(&map, probe, &bar, axis.with_component(offset, out)));
        }
    }
}
