//! Maze Race rules: move resolution, wall validation, path search, the pure
//! snapshot engine, and the heuristic agent.

pub mod bot;
pub mod engine;
pub mod moves;
pub mod pathfinding;
pub mod setup;
pub mod walls;

pub use engine::GameEngine;
