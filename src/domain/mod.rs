//! Collision and physics core: map geometry, resolvers and the actor.

pub mod entity;
pub mod error;
pub mod geom;
pub mod ground;
pub mod mask;
pub mod physics;
pub mod tile;
pub mod tilemap;
