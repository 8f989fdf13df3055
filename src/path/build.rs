use glam::IVec2;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::body::Body;
use crate::cell::Cell;
use crate::types::BodyId;
use crate::world::World;

use super::astar::{Heuristic, SearchOptions, search};
use super::graph::{DYNAMIC_BODY, FREE, Graph, GridNode, STATIC_BODY, WALL};

/// How blocking transparent cells (glass, grates) are weighted.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PathMode {
    /// Treated as open floor.
    SeeThrough,
    /// Passable but avoided, like a static body.
    Cautious,
}

impl PathMode {
    pub const ALL: [PathMode; 2] = [PathMode::SeeThrough, PathMode::Cautious];
}

/// Path weight of a single cell, ignoring bodies.
pub fn cell_weight(cell: &Cell, mode: PathMode) -> u32 {
    if !cell.blocking || cell.is_sliding() {
        // Doors are opened by whoever walks into them
        return FREE;
    }
    if cell.transparency.is_transparent() {
        match mode {
            PathMode::SeeThrough => FREE,
            PathMode::Cautious => STATIC_BODY,
        }
    } else {
        WALL
    }
}

/// Weight rows (`rows[y][x]`) for the world's grid and static bodies.
pub fn weight_grid(world: &World, mode: PathMode) -> Vec<Vec<u32>> {
    let mut rows = vec![vec![WALL; world.width()]; world.length()];
    for cell in world.cells() {
        let c = cell.coord();
        let mut w = cell_weight(cell, mode);
        let has_static = cell
            .bodies()
            .iter()
            .filter_map(|id| world.body(*id))
            .any(|b| b.blocking && !b.is_dynamic());
        if w == FREE && has_static {
            w = STATIC_BODY;
        }
        rows[c.y as usize][c.x as usize] = w;
    }
    rows
}

/// Grow walls by `radius` cells (Chebyshev), so an agent that wide stays clear.
pub fn extrude(rows: &[Vec<u32>], radius: i32) -> Vec<Vec<u32>> {
    if radius <= 0 {
        return rows.to_vec();
    }
    let height = rows.len() as i32;
    let mut out = rows.to_vec();
    for (y, row) in rows.iter().enumerate() {
        for (x, &w) in row.iter().enumerate() {
            if w != WALL {
                continue;
            }
            let (x, y) = (x as i32, y as i32);
            for ny in (y - radius).max(0)..=(y + radius).min(height - 1) {
                let out_row = &mut out[ny as usize];
                let width = out_row.len() as i32;
                for nx in (x - radius).max(0)..=(x + radius).min(width - 1) {
                    out_row[nx as usize] = WALL;
                }
            }
        }
    }
    out
}

/// Clearance in cells a body needs beyond its own cell.
pub fn agent_radius(body: &Body, cell_size: f32) -> i32 {
    let half = body.half_extents().max_element();
    ((half - cell_size * 0.5) / cell_size).ceil().max(0.0) as i32
}

/// Prebuilt path graphs, one per (agent radius, mode) pair.
///
/// Built from a snapshot of the world; rebuild after changing the level.
#[derive(Clone, Debug)]
pub struct PathGraphs {
    graphs: FxHashMap<(i32, PathMode), Graph>,
    diagonal: bool,
    max_iterations: usize,
}

impl PathGraphs {
    /// Build graphs for radius 0 plus every radius needed by the world's dynamic bodies.
    pub fn build(world: &World, diagonal: bool) -> Self {
        let cs = world.cell_size();
        let mut radii: Vec<i32> = world
            .dynamic_ids()
            .iter()
            .filter_map(|id| world.body(*id))
            .map(|b| agent_radius(b, cs))
            .collect();
        radii.push(0);
        radii.sort_unstable();
        radii.dedup();

        let mut graphs = FxHashMap::default();
        for mode in PathMode::ALL {
            let base = weight_grid(world, mode);
            for &r in &radii {
                graphs.insert((r, mode), Graph::new(&extrude(&base, r), diagonal));
            }
        }
        debug!(radii = ?radii, diagonal, "path graphs built");
        Self {
            graphs,
            diagonal,
            max_iterations: world.cfg().max_search_iterations,
        }
    }

    /// Radii with a prebuilt graph, ascending.
    pub fn radii(&self) -> Vec<i32> {
        let mut r: Vec<i32> = self.graphs.keys().map(|(r, _)| *r).collect();
        r.sort_unstable();
        r.dedup();
        r
    }

    pub fn graph(&self, radius: i32, mode: PathMode) -> Option<&Graph> {
        self.graphs.get(&(radius, mode))
    }

    pub fn graph_mut(&mut self, radius: i32, mode: PathMode) -> Option<&mut Graph> {
        self.graphs.get_mut(&(radius, mode))
    }

    pub fn options(&self, closest: bool) -> SearchOptions {
        SearchOptions {
            heuristic: if self.diagonal { Heuristic::Diagonal } else { Heuristic::Manhattan },
            closest,
            max_iterations: self.max_iterations,
        }
    }

    /// Search the graph for `radius`; empty when no such graph was built.
    pub fn search(
        &mut self,
        radius: i32,
        mode: PathMode,
        start: IVec2,
        end: IVec2,
        closest: bool,
    ) -> Vec<GridNode> {
        let opts = self.options(closest);
        match self.graph_mut(radius, mode) {
            Some(g) => search(g, start, end, opts),
            None => Vec::new(),
        }
    }

    /// Search on behalf of `searcher`, steering around the cells occupied by
    /// every other dynamic body. The penalties last for this call only.
    pub fn search_avoiding_bodies(
        &mut self,
        world: &World,
        searcher: BodyId,
        mode: PathMode,
        end: IVec2,
        closest: bool,
    ) -> Vec<GridNode> {
        let cs = world.cell_size();
        let Some(body) = world.body(searcher) else {
            return Vec::new();
        };
        let start = body.grid_coord(cs);
        let radius = agent_radius(body, cs);
        let opts = self.options(closest);
        let Some(graph) = self.graph_mut(radius, mode) else {
            return Vec::new();
        };

        let overrides: Vec<(IVec2, u32)> = world
            .dynamic_ids()
            .iter()
            .filter(|id| **id != searcher)
            .filter_map(|id| world.body(*id))
            .map(|b| b.grid_coord(cs))
            .filter_map(|c| {
                let w = graph.weight(c);
                (w != WALL).then_some((c, w.max(DYNAMIC_BODY)))
            })
            .collect();

        graph.with_temporary_weights(&overrides, |g| search(g, start, end, opts))
    }
}
