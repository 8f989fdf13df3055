//! Level descriptors: plain serde data that builds a [`World`].

use glam::{IVec2, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::body::{Body, Motion};
use crate::cell::{Cell, Slide};
use crate::error::{Result, WorldError};
use crate::types::*;
use crate::world::World;

/// Height given to full walls by [`LevelDesc::from_ascii`].
pub const WALL_HEIGHT: f32 = 64.0;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellDesc {
    pub blocking: bool,
    pub height: f32,
    /// Present for doors and push-walls.
    pub axis: Option<SlideAxis>,
    /// Initial slide as a fraction of the cell size.
    pub offset_fraction: Option<f32>,
    pub double: bool,
    pub sides: Sides,
    pub transparency: Transparency,
    pub overlay: Option<TextureId>,
}

impl CellDesc {
    pub fn wall(height: f32, texture: TextureId) -> Self {
        Self {
            blocking: true,
            height,
            sides: Sides::walls(texture),
            ..Self::default()
        }
    }

    pub fn door(axis: SlideAxis, texture: TextureId) -> Self {
        Self {
            axis: Some(axis),
            ..Self::wall(WALL_HEIGHT, texture)
        }
    }

    fn to_cell(&self, coord: IVec2, cell_size: f32) -> Cell {
        let mut cell = Cell::new(coord);
        cell.blocking = self.blocking;
        cell.height = self.height;
        cell.transparency = self.transparency;
        cell.sides = self.sides;
        cell.overlay = self.overlay;
        if let Some(axis) = self.axis {
            let mut slide = Slide::new(axis);
            slide.double = self.double;
            slide.set_amount(self.offset_fraction.unwrap_or(0.0) * cell_size);
            cell.slide = Some(slide);
        }
        cell
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyKind {
    #[default]
    Static,
    Dynamic,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyDesc {
    pub kind: BodyKind,
    pub tag: u32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub width: f32,
    pub length: f32,
    pub height: f32,
    pub blocking: bool,
    pub anchor: f32,
    pub transparency: Transparency,
    /// Heading in radians (dynamic bodies only).
    pub angle: f32,
    pub weight: f32,
    /// Pixels per unit of update delta (dynamic bodies only).
    pub velocity: f32,
}

impl Default for BodyDesc {
    fn default() -> Self {
        Self {
            kind: BodyKind::Static,
            tag: 0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
            width: 32.0,
            length: 32.0,
            height: 64.0,
            blocking: true,
            anchor: 0.0,
            transparency: Transparency::None,
            angle: 0.0,
            weight: 1.0,
            velocity: 0.0,
        }
    }
}

impl BodyDesc {
    pub fn to_body(&self) -> Body {
        let position = Vec3::new(self.x, self.y, self.z);
        let size = Vec3::new(self.width, self.length, self.height);
        let body = match self.kind {
            BodyKind::Static => Body::new(position, size),
            BodyKind::Dynamic => {
                let motion = Motion::new(self.velocity, self.angle, self.weight);
                Body::dynamic(position, size, motion)
            }
        };
        body.with_blocking(self.blocking)
            .with_tag(self.tag)
            .with_transparency(self.transparency)
            .with_anchor(self.anchor)
    }
}

/// Grid rows (`cells[y][x]`) plus the initial bodies.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelDesc {
    pub cells: Vec<Vec<CellDesc>>,
    pub bodies: Vec<BodyDesc>,
}

impl LevelDesc {
    pub fn from_ron(src: &str) -> Result<Self> {
        Ok(ron::from_str(src)?)
    }

    /// Quick levels from text, one string per row.
    ///
    /// `#` wall, `G` glass, `D`/`d` door sliding along x/y, `=` floor with an
    /// overlay, `h` half-height wall, `o` pillar body, `@` walker body.
    /// Anything else is floor. Bodies are placed at the center of their cell.
    pub fn from_ascii(rows: &[&str], cell_size: f32) -> Self {
        let mut level = LevelDesc::default();
        for (y, row) in rows.iter().enumerate() {
            let mut cells = Vec::with_capacity(row.len());
            for (x, ch) in row.chars().enumerate() {
                let cell = match ch {
                    '#' => CellDesc::wall(WALL_HEIGHT, 1),
                    'G' => CellDesc {
                        transparency: Transparency::Full,
                        ..CellDesc::wall(WALL_HEIGHT, 2)
                    },
                    'D' => CellDesc::door(SlideAxis::X, 3),
                    'd' => CellDesc::door(SlideAxis::Y, 3),
                    '=' => CellDesc {
                        overlay: Some(4),
                        ..CellDesc::default()
                    },
                    'h' => CellDesc::wall(WALL_HEIGHT * 0.5, 1),
                    _ => CellDesc::default(),
                };
                cells.push(cell);

                let center = (Vec2::new(x as f32, y as f32) + 0.5) * cell_size;
                let kind = match ch {
                    'o' => Some(BodyKind::Static),
                    '@' => Some(BodyKind::Dynamic),
                    _ => None,
                };
                if let Some(kind) = kind {
                    level.bodies.push(BodyDesc {
                        kind,
                        x: center.x,
                        y: center.y,
                        width: cell_size * 0.5,
                        length: cell_size * 0.5,
                        ..BodyDesc::default()
                    });
                }
            }
            level.cells.push(cells);
        }
        level
    }

    /// Grid extents as (width, length); rejects empty and ragged grids.
    pub fn dimensions(&self) -> Result<(usize, usize)> {
        let width = self.cells.first().map_or(0, Vec::len);
        if width == 0 {
            return Err(WorldError::EmptyGrid);
        }
        for (row, cells) in self.cells.iter().enumerate() {
            if cells.len() != width {
                return Err(WorldError::RaggedGrid {
                    row,
                    expected: width,
                    actual: cells.len(),
                });
            }
        }
        Ok((width, self.cells.len()))
    }
}

impl World {
    /// Build a world from a level descriptor, registering its bodies in order.
    pub fn from_level(cfg: WorldConfig, level: &LevelDesc) -> Result<World> {
        let (width, length) = level.dimensions()?;
        let cell_size = cfg.cell_size;
        let mut world = World::from_fn(cfg, width, length, |c| {
            level.cells[c.y as usize][c.x as usize].to_cell(c, cell_size)
        })?;
        for desc in &level.bodies {
            world.add(desc.to_body())?;
        }
        debug!(bodies = level.bodies.len(), "level loaded");
        Ok(world)
    }
}
