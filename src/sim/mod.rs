//! Simulation: the per-tick state machine, levels and world state.

pub mod event;
pub mod level;
pub mod step;
pub mod world;
