/// Events emitted during a simulation step.
/// The presentation layer consumes these for sound and HUD messages.

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    Jumped,
    JumpCut,
    /// Airborne → Grounded, feet at `y`.
    Landed { y: i32 },
    /// Grounded → Airborne without a jump (walked off a ledge).
    LeftGround,
    /// Horizontal movement shortened by a wall.
    WallBlocked { requested: i32, moved: i32 },
    /// Fell out of the map and was put back at the spawn.
    Respawned,
}
