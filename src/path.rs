//! Weighted grid pathfinding: an A* over per-cell weights derived from the world.

mod astar;
mod build;
mod graph;
mod heap;

pub use astar::{DEFAULT_MAX_ITERATIONS, Heuristic, SearchOptions, search};
pub use build::{PathGraphs, PathMode, agent_radius, cell_weight, extrude, weight_grid};
pub use graph::{DYNAMIC_BODY, FREE, Graph, GridNode, STATIC_BODY, WALL};
pub use heap::BinaryHeap;
