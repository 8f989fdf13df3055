use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Result, WorldError};

/// Opaque texture reference owned by the renderer. The core only checks presence.
pub type TextureId = u32;

/// Process-unique body handle.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyId(pub u64);

static NEXT_BODY_ID: AtomicU64 = AtomicU64::new(1);

impl BodyId {
    /// Allocate a fresh id. Ids are never reused within a process.
    pub fn next() -> Self {
        BodyId(NEXT_BODY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Transparency tier of a cell or body.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transparency {
    #[default]
    None,
    Partial,
    Full,
}

impl Transparency {
    pub fn is_transparent(self) -> bool {
        !matches!(self, Transparency::None)
    }
}

/// Axis a sliding cell moves along.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlideAxis {
    X,
    Y,
}

/// Face of a cell struck by a ray.
///
/// `Front` faces -Y (low y edge), `Back` faces +Y, `Left` faces -X, `Right` faces +X.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Front,
    Left,
    Back,
    Right,
}

impl Side {
    /// Side whose outward normal matches the given axis-aligned normal.
    pub fn from_normal(normal: Vec2) -> Option<Side> {
        if normal.x < 0.0 {
            Some(Side::Left)
        } else if normal.x > 0.0 {
            Some(Side::Right)
        } else if normal.y < 0.0 {
            Some(Side::Front)
        } else if normal.y > 0.0 {
            Some(Side::Back)
        } else {
            None
        }
    }

    /// True for faces lying on a horizontal grid line (constant y).
    pub fn is_horizontal(self) -> bool {
        matches!(self, Side::Front | Side::Back)
    }
}

/// Per-side texture references.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sides {
    pub front: Option<TextureId>,
    pub left: Option<TextureId>,
    pub back: Option<TextureId>,
    pub right: Option<TextureId>,
    pub top: Option<TextureId>,
    pub bottom: Option<TextureId>,
}

impl Sides {
    /// Same texture on the four vertical faces.
    pub fn walls(tex: TextureId) -> Self {
        Self {
            front: Some(tex),
            left: Some(tex),
            back: Some(tex),
            right: Some(tex),
            top: None,
            bottom: None,
        }
    }

    pub fn get(&self, side: Side) -> Option<TextureId> {
        match side {
            Side::Front => self.front,
            Side::Left => self.left,
            Side::Back => self.back,
            Side::Right => self.right,
        }
    }

    pub fn has(&self, side: Side) -> bool {
        self.get(side).is_some()
    }
}

/// Axis-aligned rectangle in pixel space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Centered rectangle with the given half extents.
    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec2 {
        (self.max - self.min) * 0.5
    }

    /// Zero-area rectangles never collide and are skipped by the ray caster.
    pub fn is_empty(&self) -> bool {
        self.max.x <= self.min.x || self.max.y <= self.min.y
    }
}

/// Identity of something a body can collide with.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ObstacleKey {
    Cell(IVec2),
    Body(BodyId),
}

/// Snapshot of a neighbour used during collision resolution.
#[derive(Copy, Clone, Debug)]
pub struct Obstacle {
    pub key: ObstacleKey,
    pub rect: Rect,
    pub blocking: bool,
    pub transparency: Transparency,
    /// Body tag, `None` for cells.
    pub tag: Option<u32>,
}

/// Category of contact a dynamic body wants start/end notifications for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContactKind {
    /// Any blocking cell.
    Cell,
    /// Bodies carrying this tag.
    Tag(u32),
}

impl ContactKind {
    pub fn matches(self, obstacle: &Obstacle) -> bool {
        match self {
            ContactKind::Cell => matches!(obstacle.key, ObstacleKey::Cell(_)),
            ContactKind::Tag(t) => obstacle.tag == Some(t),
        }
    }
}

/// Tracked contacts that started and ended during one update.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContactDiff {
    pub entered: Vec<ObstacleKey>,
    pub exited: Vec<ObstacleKey>,
}

impl ContactDiff {
    pub fn is_empty(&self) -> bool {
        self.entered.is_empty() && self.exited.is_empty()
    }
}

/// Non-empty contact diff produced for one body by `World::update`.
#[derive(Clone, Debug)]
pub struct FrameContacts {
    pub body: BodyId,
    pub diff: ContactDiff,
}

/// World-level configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Edge length of one grid cell in pixel units.
    pub cell_size: f32,
    /// Maximum number of chained transparent sections per ray.
    pub wall_layers: usize,
    /// Cap on the distance a body may travel in one update.
    pub velocity_limit: f32,
    /// A* gives up (returning no path) after this many node expansions.
    pub max_search_iterations: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            cell_size: 64.0,
            wall_layers: 4,
            velocity_limit: 32.0,
            max_search_iterations: 100_000,
        }
    }
}

impl WorldConfig {
    /// Parse a RON document; missing fields take their defaults.
    pub fn from_ron(src: &str) -> Result<Self> {
        let cfg: WorldConfig = ron::from_str(src)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        // Pixel space: the last valid coordinate is `extent * cell_size - 1`
        if !(self.cell_size >= 1.0) || !self.cell_size.is_finite() {
            return Err(WorldError::InvalidConfig(format!(
                "cell_size must be at least one pixel, got {}",
                self.cell_size
            )));
        }
        if !(self.velocity_limit >= 0.0) {
            return Err(WorldError::InvalidConfig(format!(
                "velocity_limit must be non-negative, got {}",
                self.velocity_limit
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_ron_fills_defaults() {
        let cfg = WorldConfig::from_ron("(cell_size: 32.0)").unwrap();
        assert_eq!(cfg.cell_size, 32.0);
        assert_eq!(cfg.wall_layers, WorldConfig::default().wall_layers);
    }

    #[test]
    fn test_config_rejects_zero_cell_size() {
        assert!(matches!(
            WorldConfig::from_ron("(cell_size: 0.0)"),
            Err(WorldError::InvalidConfig(_))
        ));
        assert!(matches!(WorldConfig::from_ron("(cell_size: "), Err(WorldError::Ron(_))));
    }

    #[test]
    fn test_body_ids_are_unique() {
        let a = BodyId::next();
        let b = BodyId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn test_side_from_normal() {
        assert_eq!(Side::from_normal(Vec2::new(-1.0, 0.0)), Some(Side::Left));
        assert_eq!(Side::from_normal(Vec2::new(0.0, 1.0)), Some(Side::Back));
        assert_eq!(Side::from_normal(Vec2::ZERO), None);
        assert!(Side::Front.is_horizontal());
        assert!(!Side::Right.is_horizontal());
    }
}
