//! Slope Runner: a tile platformer runtime with slope-aware collision.
//!
//! `domain` holds the collision core (height profiles, overlap testing,
//! ground/wall/airborne resolvers). `sim` drives it one tick at a time and
//! owns levels and world state. `config` reads `config.toml`.

pub mod config;
pub mod domain;
pub mod sim;

pub use domain::entity::{Actor, ActorSnapshot, ActorTunables, InputIntent, PhysicsState};
pub use domain::tilemap::{LevelMap, TileMap};
pub use sim::step::tick;
