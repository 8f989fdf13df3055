use glam::IVec2;
use tracing::warn;

use std::f32::consts::SQRT_2;

use super::graph::{Graph, GridNode};
use super::heap::BinaryHeap;

/// Default cap on node expansions per search.
pub const DEFAULT_MAX_ITERATIONS: usize = 100_000;

/// Distance estimate toward the goal.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Heuristic {
    /// `|dx| + |dy|`, for 4-way graphs.
    #[default]
    Manhattan,
    /// Octile distance, for 8-way graphs.
    Diagonal,
}

impl Heuristic {
    pub fn distance(self, a: IVec2, b: IVec2) -> f32 {
        let d = (a - b).abs().as_vec2();
        match self {
            Heuristic::Manhattan => d.x + d.y,
            Heuristic::Diagonal => (d.x + d.y) + (SQRT_2 - 2.0) * d.x.min(d.y),
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct SearchOptions {
    pub heuristic: Heuristic,
    /// Return the route to the node nearest the goal when the goal is unreachable.
    pub closest: bool,
    pub max_iterations: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            heuristic: Heuristic::Manhattan,
            closest: false,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// Open-set entry; equality is by node so the heap can find it again.
#[derive(Copy, Clone, Debug)]
struct Open {
    node: usize,
    f: f32,
}

impl PartialEq for Open {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

/// A* from `start` to `end`.
///
/// Returns the route excluding `start` and ending at `end`, or an empty list
/// when there is none. With `closest` set, an unreachable goal yields the
/// route to the visited node with the smallest heuristic instead.
pub fn search(graph: &mut Graph, start: IVec2, end: IVec2, opts: SearchOptions) -> Vec<GridNode> {
    graph.clean_dirty();
    let (Some(start_idx), Some(end_idx)) = (graph.index(start), graph.index(end)) else {
        return Vec::new();
    };

    let h = opts.heuristic.distance(start, end);
    {
        let s = &mut graph.nodes[start_idx];
        s.h = h;
        s.g = 0.0;
        s.f = h;
        s.visited = true;
    }
    graph.mark_dirty(start_idx);

    let mut open = BinaryHeap::new(|o: &Open| o.f);
    open.push(Open { node: start_idx, f: h });
    let mut closest = start_idx;
    let mut iterations = 0usize;

    while let Some(Open { node: current, .. }) = open.pop() {
        if current == end_idx {
            return path_to(graph, current);
        }
        iterations += 1;
        if iterations > opts.max_iterations {
            warn!(
                "A* gave up after {} iterations from {:?} to {:?}",
                opts.max_iterations, start, end
            );
            break;
        }

        graph.nodes[current].closed = true;
        let current_node = graph.nodes[current];

        for n in graph.neighbors(current) {
            let neighbor = graph.nodes[n];
            if neighbor.closed || neighbor.is_wall() {
                continue;
            }
            let g = current_node.g + neighbor.get_cost(&current_node);
            let been_visited = neighbor.visited;
            if been_visited && g >= neighbor.g {
                continue;
            }

            let h = if been_visited {
                neighbor.h
            } else {
                opts.heuristic.distance(neighbor.pos(), end)
            };
            let node = &mut graph.nodes[n];
            node.visited = true;
            node.parent = Some(current);
            node.g = g;
            node.h = h;
            node.f = g + h;
            let entry = Open { node: n, f: node.f };

            if opts.closest {
                let best = &graph.nodes[closest];
                if h < best.h || (h == best.h && g < best.g) {
                    closest = n;
                }
            }

            if been_visited {
                open.rescore_element(entry);
            } else {
                graph.mark_dirty(n);
                open.push(entry);
            }
        }
    }

    if opts.closest {
        path_to(graph, closest)
    } else {
        Vec::new()
    }
}

/// Follow parent links back to the start, which is left out.
fn path_to(graph: &Graph, mut index: usize) -> Vec<GridNode> {
    let mut path = Vec::new();
    while let Some(parent) = graph.nodes[index].parent {
        path.push(graph.nodes[index]);
        index = parent;
    }
    path.reverse();
    path
}
