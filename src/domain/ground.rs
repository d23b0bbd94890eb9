/// Ground resolver for grounded actors.
///
/// ## Algorithm
///
/// Two 1px floor probes run from the actor's head to just below its feet.
/// Every occupied cell a probe touches (rect test only) offers a resting
/// surface from its height profile at the probe's column:
///
/// ```text
///   resting_y = (row + 1) * cell_h - profile[probe.x - col * cell_w]
/// ```
///
/// The smallest `resting_y` over both probes wins (highest surface).
///
/// ## One-sided support
///
/// On the crest of an up-slope one probe can hang over an empty cell while
/// the other is still on the slope. The missing probe is then swept toward
/// the supported one, one pixel at a time, and the first strictly higher
/// surface found replaces the result. The sweep never goes past the other
/// probe, so it always terminates.

use tracing::trace;

use super::entity::Actor;
use super::geom::{GridCoord, Rect};
use super::tilemap::TileMap;

/// Feet position for a grounded actor, or `None` when nothing is beneath
/// it (the actor becomes airborne).
pub fn resolve_ground<M: TileMap + ?Sized>(map: &M, actor: &Actor) -> Option<i32> {
    ground_beneath(map, actor.detectors().floor)
}

/// Resting Y under a pair of floor probes.
pub fn ground_beneath<M: TileMap + ?Sized>(map: &M, floor: [Rect; 2]) -> Option<i32> {
    let mut ground = None;
    let mut pads_on = [false; 2];

    for (i, probe) in floor.iter().enumerate() {
        let hits = map.cells_intersecting(*probe);
        pads_on[i] = !hits.is_empty();
        ground = resting_y(map, *probe, &hits, ground);
    }

    match ground {
        Some(y) if pads_on[0] != pads_on[1] => Some(sweep_missing_probe(map, floor, pads_on, y)),
        other => other,
    }
}

/// Fold the probe's hits into the running minimum.
fn resting_y<M: TileMap + ?Sized>(
    map: &M,
    probe: Rect,
    hits: &[GridCoord],
    current: Option<i32>,
) -> Option<i32> {
    let (cell_w, cell_h) = map.cell_size();
    hits.iter().fold(current, |best, &coord| {
        let Some(variant) = map.cell_at(coord) else { return best };
        let column = probe.x - coord.col * cell_w;
        let y = (coord.row + 1) * cell_h - map.height_profile(variant).at(column) as i32;
        Some(best.map_or(y, |b| b.min(y)))
    })
}

fn sweep_missing_probe<M: TileMap + ?Sized>(
    map: &M,
    floor: [Rect; 2],
    pads_on: [bool; 2],
    ground: i32,
) -> i32 {
    let (missing, present) = if pads_on[0] { (1, 0) } else { (0, 1) };
    let target_x = floor[present].x;
    let step = (target_x - floor[missing].x).signum();

    let mut probe = floor[missing];
    let mut swept = Some(ground);
    while probe.x != target_x {
        probe.x += step;
        let hits = map.cells_intersecting(probe);
        swept = resting_y(map, probe, &hits, swept);
        if let Some(y) = swept.filter(|&y| y < ground) {
            trace!(from = ground, to = y, at = probe.x, "one-sided support swept");
            return y;
        }
    }
    ground
}
