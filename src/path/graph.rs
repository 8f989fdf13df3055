use glam::IVec2;
use smallvec::SmallVec;

use std::f32::consts::SQRT_2;

/// Impassable.
pub const WALL: u32 = 0;
pub const FREE: u32 = 1;
/// Passable but strongly avoided (furniture, glass when cautious).
pub const STATIC_BODY: u32 = 100;
/// Penalty applied around moving bodies for the duration of one search.
pub const DYNAMIC_BODY: u32 = 20;

/// Weighted grid node plus per-search scratch state.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GridNode {
    pub x: i32,
    pub y: i32,
    pub weight: u32,
    pub f: f32,
    pub g: f32,
    pub h: f32,
    pub visited: bool,
    pub closed: bool,
    /// Arena index of the node this one was reached from.
    pub parent: Option<usize>,
}

impl GridNode {
    fn new(x: i32, y: i32, weight: u32) -> Self {
        Self {
            x,
            y,
            weight,
            f: 0.0,
            g: 0.0,
            h: 0.0,
            visited: false,
            closed: false,
            parent: None,
        }
    }

    pub fn pos(&self) -> IVec2 {
        IVec2::new(self.x, self.y)
    }

    pub fn is_wall(&self) -> bool {
        self.weight == WALL
    }

    /// Cost of entering this node from `from`.
    pub fn get_cost(&self, from: &GridNode) -> f32 {
        let w = self.weight as f32;
        if from.x != self.x && from.y != self.y {
            w * SQRT_2
        } else {
            w
        }
    }

    fn reset(&mut self) {
        self.f = 0.0;
        self.g = 0.0;
        self.h = 0.0;
        self.visited = false;
        self.closed = false;
        self.parent = None;
    }
}

/// Grid of nodes searched by A*.
///
/// Nodes live in a row-major arena. Searches record every node they touch in
/// a dirty list so the next search only resets those.
#[derive(Clone, Debug)]
pub struct Graph {
    width: usize,
    height: usize,
    pub diagonal: bool,
    pub(super) nodes: Vec<GridNode>,
    dirty: Vec<usize>,
}

impl Graph {
    /// Build from rows of weights, `rows[y][x]`. Short rows are padded with walls.
    pub fn new(rows: &[Vec<u32>], diagonal: bool) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        Self::from_fn(width, rows.len(), diagonal, |p| {
            rows[p.y as usize].get(p.x as usize).copied().unwrap_or(WALL)
        })
    }

    pub fn from_fn(
        width: usize,
        height: usize,
        diagonal: bool,
        mut weight: impl FnMut(IVec2) -> u32,
    ) -> Self {
        let mut nodes = Vec::with_capacity(width * height);
        for y in 0..height as i32 {
            for x in 0..width as i32 {
                nodes.push(GridNode::new(x, y, weight(IVec2::new(x, y))));
            }
        }
        Self {
            width,
            height,
            diagonal,
            nodes,
            dirty: Vec::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn nodes(&self) -> &[GridNode] {
        &self.nodes
    }

    pub fn index(&self, p: IVec2) -> Option<usize> {
        if p.x < 0 || p.y < 0 || p.x as usize >= self.width || p.y as usize >= self.height {
            return None;
        }
        Some(p.y as usize * self.width + p.x as usize)
    }

    pub fn node(&self, p: IVec2) -> Option<&GridNode> {
        self.index(p).map(|i| &self.nodes[i])
    }

    /// Weight at `p`; outside the grid counts as a wall.
    pub fn weight(&self, p: IVec2) -> u32 {
        self.node(p).map_or(WALL, |n| n.weight)
    }

    /// Overwrite a weight, returning the previous one.
    pub fn set_weight(&mut self, p: IVec2, weight: u32) -> Option<u32> {
        let i = self.index(p)?;
        Some(std::mem::replace(&mut self.nodes[i].weight, weight))
    }

    /// Reset scratch state of every node touched since the last clean.
    pub fn clean_dirty(&mut self) {
        for i in self.dirty.drain(..) {
            self.nodes[i].reset();
        }
    }

    pub fn mark_dirty(&mut self, index: usize) {
        self.dirty.push(index);
    }

    /// In-bounds neighbours of a node: west, east, south, north, then the
    /// four diagonals when `diagonal` is set.
    pub fn neighbors(&self, index: usize) -> SmallVec<[usize; 8]> {
        let p = self.nodes[index].pos();
        let mut out = SmallVec::new();
        let mut offsets: SmallVec<[IVec2; 8]> =
            SmallVec::from_slice(&[IVec2::NEG_X, IVec2::X, IVec2::NEG_Y, IVec2::Y]);
        if self.diagonal {
            offsets.extend_from_slice(&[
                IVec2::new(-1, -1),
                IVec2::new(1, -1),
                IVec2::new(-1, 1),
                IVec2::new(1, 1),
            ]);
        }
        for o in offsets {
            if let Some(i) = self.index(p + o) {
                out.push(i);
            }
        }
        out
    }

    /// Run `f` with some weights overridden, restoring the originals afterwards
    /// even if `f` panics. Out-of-bounds overrides are ignored.
    pub fn with_temporary_weights<R>(
        &mut self,
        overrides: &[(IVec2, u32)],
        f: impl FnOnce(&mut Graph) -> R,
    ) -> R {
        let mut guard = RestoreWeights {
            graph: self,
            saved: Vec::with_capacity(overrides.len()),
        };
        for &(p, w) in overrides {
            if let Some(i) = guard.graph.index(p) {
                let old = std::mem::replace(&mut guard.graph.nodes[i].weight, w);
                guard.saved.push((i, old));
            }
        }
        f(&mut *guard.graph)
    }
}

struct RestoreWeights<'g> {
    graph: &'g mut Graph,
    saved: Vec<(usize, u32)>,
}

impl Drop for RestoreWeights<'_> {
    fn drop(&mut self) {
        // Reverse order so repeated overrides of one node restore the first value
        for (i, w) in self.saved.drain(..).rev() {
            self.graph.nodes[i].weight = w;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    fn open(w: usize, h: usize, diagonal: bool) -> Graph {
        Graph::from_fn(w, h, diagonal, |_| FREE)
    }

    #[test]
    fn test_new_from_rows() {
        let g = Graph::new(&[vec![1, 0, 1], vec![1, 1]], false);
        assert_eq!((g.width(), g.height()), (3, 2));
        assert_eq!(g.weight(IVec2::new(1, 0)), WALL);
        assert_eq!(g.weight(IVec2::new(2, 1)), WALL);
        assert_eq!(g.weight(IVec2::new(0, 1)), FREE);
        assert_eq!(g.weight(IVec2::new(-1, 0)), WALL);
    }

    #[test]
    fn test_get_cost_scales_diagonals() {
        let g = Graph::from_fn(2, 2, true, |_| 10);
        let a = g.node(IVec2::ZERO).unwrap();
        let b = g.node(IVec2::new(1, 0)).unwrap();
        let c = g.node(IVec2::new(1, 1)).unwrap();
        assert_eq!(b.get_cost(a), 10.0);
        assert!((c.get_cost(a) - 10.0 * SQRT_2).abs() < 1e-5);
    }

    #[test]
    fn test_neighbors() {
        let g = open(3, 3, false);
        let corner = g.index(IVec2::ZERO).unwrap();
        assert_eq!(g.neighbors(corner).len(), 2);
        let center = g.index(IVec2::ONE).unwrap();
        assert_eq!(g.neighbors(center).len(), 4);

        let d = open(3, 3, true);
        assert_eq!(d.neighbors(corner).len(), 3);
        assert_eq!(d.neighbors(center).len(), 8);
    }

    #[test]
    fn test_clean_dirty_resets_only_marked() {
        let mut g = open(3, 3, false);
        g.nodes[0].visited = true;
        g.nodes[0].g = 5.0;
        g.nodes[4].closed = true;
        g.mark_dirty(0);
        g.clean_dirty();
        assert!(!g.nodes[0].visited);
        assert_eq!(g.nodes[0].g, 0.0);
        // Not on the list, so left alone
        assert!(g.nodes[4].closed);
    }

    #[test]
    fn test_temporary_weights_restored() {
        let mut g = open(3, 3, false);
        let p = IVec2::new(1, 1);
        let overrides = [(p, DYNAMIC_BODY), (p, WALL), (IVec2::new(9, 9), WALL)];
        let seen = g.with_temporary_weights(&overrides, |g| g.weight(p));
        assert_eq!(seen, WALL);
        assert_eq!(g.weight(p), FREE);
    }

    #[test]
    fn test_temporary_weights_restored_on_panic() {
        let mut g = open(3, 3, false);
        let p = IVec2::new(2, 0);
        let result = catch_unwind(AssertUnwindSafe(|| {
            g.with_temporary_weights(&[(p, STATIC_BODY)], |_| panic!("search blew up"))
        }));
        assert!(result.is_err());
        assert_eq!(g.weight(p), FREE);
    }
}
