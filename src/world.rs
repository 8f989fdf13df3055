use glam::{IVec2, Vec2, Vec3};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use crate::api::NarrowphaseApi;
use crate::body::Body;
use crate::cell::Cell;
use crate::error::{Result, WorldError};
use crate::narrowphase::Narrowphase;
use crate::types::*;

/// Entry returned by neighbourhood queries.
#[derive(Copy, Clone, Debug)]
pub enum Neighbour<'a> {
    Cell(&'a Cell),
    Body(&'a Body),
}

/// Grid of cells plus the bodies living on it. Sole spatial index of the simulation.
#[derive(Debug)]
pub struct World {
    // Cell size is baked into the grid and every registration; only the
    // tuning fields may change after construction
    cfg: WorldConfig,
    width: usize,
    length: usize,
    height: f32,
    max_map: Vec2,

    // Row-major: index = y * width + x
    cells: Vec<Cell>,
    bodies: FxHashMap<BodyId, Body>,
    // Bodies receiving per-frame updates, in insertion order
    dynamic: Vec<BodyId>,
    // Largest half extent seen, widens rect queries past the center cell
    max_body_half: f32,
    tick: u64,
}

impl World {
    /// Build a `width` × `length` grid, asking `make` for each cell.
    pub fn from_fn(
        cfg: WorldConfig,
        width: usize,
        length: usize,
        mut make: impl FnMut(IVec2) -> Cell,
    ) -> Result<Self> {
        cfg.validate()?;
        if width == 0 || length == 0 {
            return Err(WorldError::EmptyGrid);
        }
        let mut cells = Vec::with_capacity(width * length);
        for y in 0..length as i32 {
            for x in 0..width as i32 {
                let coord = IVec2::new(x, y);
                // The grid is authoritative over coordinates
                cells.push(make(coord).with_coord(coord));
            }
        }
        let height = cells.iter().map(|c| c.height).fold(0.0f32, f32::max);
        let max_map = Vec2::new(width as f32, length as f32) * cfg.cell_size - Vec2::ONE;
        debug!(width, length, height, cell_size = cfg.cell_size, "world grid built");
        Ok(Self {
            cfg,
            width,
            length,
            height,
            max_map,
            cells,
            bodies: FxHashMap::default(),
            dynamic: Vec::new(),
            max_body_half: 0.0,
            tick: 0,
        })
    }

    // --- Dimensions ---------------------------------------------------------

    /// Grid extent along x, in cells.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid extent along y, in cells.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Tallest cell at construction time.
    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn cell_size(&self) -> f32 {
        self.cfg.cell_size
    }

    pub fn cfg(&self) -> &WorldConfig {
        &self.cfg
    }

    pub fn set_wall_layers(&mut self, layers: usize) {
        self.cfg.wall_layers = layers;
    }

    /// Negative limits are treated as zero.
    pub fn set_velocity_limit(&mut self, limit: f32) {
        self.cfg.velocity_limit = limit.max(0.0);
    }

    pub fn set_max_search_iterations(&mut self, iterations: usize) {
        self.cfg.max_search_iterations = iterations;
    }

    /// Cells a body's rectangle can reach past its own center cell.
    pub fn body_reach(&self) -> i32 {
        (self.max_body_half / self.cfg.cell_size).ceil() as i32
    }

    /// Largest valid pixel coordinate on each axis.
    pub fn max_map(&self) -> Vec2 {
        self.max_map
    }

    /// Pixel-space area body centers are confined to.
    pub fn bounds(&self) -> Rect {
        Rect::new(Vec2::ZERO, self.max_map)
    }

    /// Number of completed update ticks.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    // --- Cells --------------------------------------------------------------

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.length {
            return None;
        }
        Some(y as usize * self.width + x as usize)
    }

    /// Cell at grid coordinates; `None` outside the grid.
    pub fn cell(&self, x: i32, y: i32) -> Option<&Cell> {
        self.index(x, y).map(|i| &self.cells[i])
    }

    /// Mutable cell access for door controllers and level scripting.
    pub fn cell_mut(&mut self, x: i32, y: i32) -> Option<&mut Cell> {
        self.index(x, y).map(move |i| &mut self.cells[i])
    }

    /// Grid coordinates containing a pixel-space point.
    pub fn grid_coord(&self, p: Vec2) -> IVec2 {
        (p / self.cfg.cell_size).floor().as_ivec2()
    }

    /// Cell containing a pixel-space point.
    pub fn cell_at(&self, p: Vec2) -> Option<&Cell> {
        let c = self.grid_coord(p);
        self.cell(c.x, c.y)
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    /// Inclusive square of `2 * radius + 1` cells around `center`, clipped to the grid.
    pub fn neighbour_cells(&self, center: IVec2, radius: i32) -> Vec<&Cell> {
        let mut out = Vec::new();
        for y in (center.y - radius)..=(center.y + radius) {
            for x in (center.x - radius)..=(center.x + radius) {
                if let Some(cell) = self.cell(x, y) {
                    out.push(cell);
                }
            }
        }
        out
    }

    // --- Bodies -------------------------------------------------------------

    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.get(&id)
    }

    /// Mutable access to non-positional state (motion, flags, tag).
    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.bodies.get_mut(&id)
    }

    pub fn bodies(&self) -> impl Iterator<Item = &Body> {
        self.bodies.values()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Ids receiving per-frame updates, in update order.
    pub fn dynamic_ids(&self) -> &[BodyId] {
        &self.dynamic
    }

    fn in_bounds(&self, p: Vec2) -> bool {
        p.x >= 0.0 && p.y >= 0.0 && p.x <= self.max_map.x && p.y <= self.max_map.y
    }

    /// Register a body in the id map, its cell and (if dynamic) the update list.
    pub fn add(&mut self, body: Body) -> Result<BodyId> {
        let id = body.id();
        if self.bodies.contains_key(&id) {
            return Err(WorldError::DuplicateBody(id));
        }
        let p = body.position().truncate();
        if !self.in_bounds(p) {
            return Err(WorldError::BodyOutOfBounds { id, x: p.x, y: p.y });
        }
        let coord = body.grid_coord(self.cfg.cell_size);
        if let Some(cell) = self.cell_mut(coord.x, coord.y) {
            cell.insert_body(id);
        }
        if body.is_dynamic() {
            self.dynamic.push(id);
        }
        self.max_body_half = self.max_body_half.max(body.half_extents().max_element());
        trace!(?id, x = p.x, y = p.y, dynamic = body.is_dynamic(), "body added");
        self.bodies.insert(id, body);
        Ok(id)
    }

    /// Unregister a body everywhere and hand it back.
    pub fn remove(&mut self, id: BodyId) -> Option<Body> {
        let body = self.bodies.remove(&id)?;
        let coord = body.grid_coord(self.cfg.cell_size);
        if let Some(cell) = self.cell_mut(coord.x, coord.y) {
            cell.remove_body(id);
        }
        self.dynamic.retain(|&d| d != id);
        trace!(?id, "body removed");
        Some(body)
    }

    /// Move a body instantly, keeping cell membership in sync.
    pub fn teleport(&mut self, id: BodyId, position: Vec3) -> Result<()> {
        if !self.in_bounds(position.truncate()) {
            return Err(WorldError::BodyOutOfBounds {
                id,
                x: position.x,
                y: position.y,
            });
        }
        let cs = self.cfg.cell_size;
        let body = self.bodies.get_mut(&id).ok_or(WorldError::UnknownBody(id))?;
        let from = body.grid_coord(cs);
        body.set_position(position);
        let to = body.grid_coord(cs);
        self.reregister(id, from, to);
        Ok(())
    }

    fn reregister(&mut self, id: BodyId, from: IVec2, to: IVec2) {
        if from == to {
            return;
        }
        if let Some(cell) = self.cell_mut(from.x, from.y) {
            cell.remove_body(id);
        }
        if let Some(cell) = self.cell_mut(to.x, to.y) {
            cell.insert_body(id);
        }
    }

    /// Occupants and blocking cells within `radius` cells of a body's cell.
    ///
    /// The querying body itself is excluded. Unknown ids yield an empty list.
    pub fn neighbour_bodies(&self, id: BodyId, radius: i32) -> Vec<Neighbour<'_>> {
        let Some(body) = self.bodies.get(&id) else {
            return Vec::new();
        };
        let center = body.grid_coord(self.cfg.cell_size);
        let mut out = Vec::new();
        for cell in self.neighbour_cells(center, radius) {
            for other in cell.bodies() {
                if *other == id {
                    continue;
                }
                if let Some(b) = self.bodies.get(other) {
                    out.push(Neighbour::Body(b));
                }
            }
            if cell.blocking {
                out.push(Neighbour::Cell(cell));
            }
        }
        out
    }

    /// Collision snapshot of the neighbourhood, with live slide geometry.
    pub(crate) fn neighbour_obstacles(&self, id: BodyId, radius: i32) -> Vec<Obstacle> {
        let cs = self.cfg.cell_size;
        let mut out = Vec::new();
        for n in self.neighbour_bodies(id, radius) {
            match n {
                Neighbour::Body(b) => out.push(b.obstacle()),
                Neighbour::Cell(c) => {
                    for rect in c.solid_rects(cs) {
                        out.push(Obstacle {
                            key: ObstacleKey::Cell(c.coord()),
                            rect,
                            blocking: true,
                            transparency: c.transparency,
                            tag: None,
                        });
                    }
                }
            }
        }
        out
    }

    // --- Queries ------------------------------------------------------------

    /// Bodies whose rectangle contains `p`.
    pub fn query_point(&self, p: Vec2) -> Vec<BodyId> {
        let probe = Rect::new(p, p);
        self.bodies_near(probe)
            .filter(|b| Narrowphase::overlap_point_rect(p, b.rect()))
            .map(|b| b.id())
            .collect()
    }

    /// Bodies whose rectangle overlaps `rect`.
    pub fn query_rect(&self, rect: Rect) -> Vec<BodyId> {
        self.bodies_near(rect)
            .filter(|b| Narrowphase::overlap_rect_rect(rect, b.rect()).is_some())
            .map(|b| b.id())
            .collect()
    }

    // Bodies registered in any cell that could hold a body overlapping `rect`
    fn bodies_near(&self, rect: Rect) -> impl Iterator<Item = &Body> {
        let pad = Vec2::splat(self.max_body_half);
        let c0 = self.grid_coord(rect.min - pad);
        let c1 = self.grid_coord(rect.max + pad);
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        for y in c0.y..=c1.y {
            for x in c0.x..=c1.x {
                let Some(cell) = self.cell(x, y) else { continue };
                for id in cell.bodies() {
                    if seen.insert(*id) {
                        if let Some(b) = self.bodies.get(id) {
                            out.push(b);
                        }
                    }
                }
            }
        }
        out.into_iter()
    }

    // --- Tick ---------------------------------------------------------------

    /// Advance every dynamic body once, in insertion order.
    ///
    /// Returns the non-empty tracked-contact diffs produced this tick.
    pub fn update(&mut self, delta: f32, elapsed_ms: f64) -> Vec<FrameContacts> {
        let cs = self.cfg.cell_size;
        let limit = self.cfg.velocity_limit;
        let bounds = self.bounds();
        // Bodies are indexed by center, so wide ones can overlap from further out
        let reach = self.body_reach();
        let mut frame = Vec::new();

        for i in 0..self.dynamic.len() {
            let id = self.dynamic[i];
            let Some(body) = self.bodies.get(&id) else { continue };
            let radius = body.collision_radius(cs, limit) + reach;
            let from = body.grid_coord(cs);
            let neighbours = self.neighbour_obstacles(id, radius);

            let Some(body) = self.bodies.get_mut(&id) else { continue };
            let diff = body.step(delta, elapsed_ms, &neighbours, limit, bounds);
            let to = body.grid_coord(cs);
            self.reregister(id, from, to);

            if !diff.is_empty() {
                frame.push(FrameContacts { body: id, diff });
            }
        }
        self.tick += 1;
        frame
    }
}
