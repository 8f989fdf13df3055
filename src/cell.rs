use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::types::*;

/// Sliding state of a door or push-wall.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    pub axis: SlideAxis,
    /// Distance slid so far; only the component on `axis` is read.
    pub offset: Vec2,
    /// Double doors split at the cell center and retract toward both edges.
    pub double: bool,
}

impl Slide {
    pub fn new(axis: SlideAxis) -> Self {
        Self {
            axis,
            offset: Vec2::ZERO,
            double: false,
        }
    }

    /// Offset along the slide axis.
    pub fn amount(&self) -> f32 {
        match self.axis {
            SlideAxis::X => self.offset.x,
            SlideAxis::Y => self.offset.y,
        }
    }

    pub fn set_amount(&mut self, amount: f32) {
        match self.axis {
            SlideAxis::X => self.offset.x = amount,
            SlideAxis::Y => self.offset.y = amount,
        }
    }
}

/// Static grid unit.
#[derive(Clone, Debug)]
pub struct Cell {
    coord: IVec2,
    pub blocking: bool,
    /// Wall height; 0 is open floor.
    pub height: f32,
    pub transparency: Transparency,
    pub slide: Option<Slide>,
    pub sides: Sides,
    /// Secondary surface drawn over the cell (e.g. a grate).
    pub overlay: Option<TextureId>,
    pub(crate) bodies: Vec<BodyId>,
}

impl Cell {
    /// Open floor at `coord`.
    pub fn new(coord: IVec2) -> Self {
        Self {
            coord,
            blocking: false,
            height: 0.0,
            transparency: Transparency::None,
            slide: None,
            sides: Sides::default(),
            overlay: None,
            bodies: Vec::new(),
        }
    }

    /// Solid wall of the given height.
    pub fn wall(coord: IVec2, height: f32) -> Self {
        Self {
            blocking: true,
            height,
            ..Self::new(coord)
        }
    }

    pub fn coord(&self) -> IVec2 {
        self.coord
    }

    /// Pixel-space corner with the smallest coordinates.
    pub fn origin(&self, cell_size: f32) -> Vec2 {
        self.coord.as_vec2() * cell_size
    }

    /// Full footprint regardless of slide state.
    pub fn bounds(&self, cell_size: f32) -> Rect {
        let origin = self.origin(cell_size);
        Rect::new(origin, origin + Vec2::splat(cell_size))
    }

    /// Bodies currently registered here.
    pub fn bodies(&self) -> &[BodyId] {
        &self.bodies
    }

    pub fn is_sliding(&self) -> bool {
        self.slide.is_some()
    }

    /// Set how far a sliding cell has opened. No-op for static cells.
    pub fn set_slide_amount(&mut self, amount: f32) {
        if let Some(slide) = self.slide.as_mut() {
            slide.set_amount(amount);
        }
    }

    /// Whether this cell can stop a ray cast at `elevation`.
    pub fn reaches(&self, elevation: Option<f32>) -> bool {
        match elevation {
            Some(e) => self.height > e,
            None => true,
        }
    }

    /// Collidable rectangles, computed from the current slide offset.
    ///
    /// Empty for non-blocking cells and for fully opened sliding cells.
    pub fn solid_rects(&self, cell_size: f32) -> SmallVec<[Rect; 2]> {
        let mut out = SmallVec::new();
        if !self.blocking {
            return out;
        }
        let full = self.bounds(cell_size);
        let Some(slide) = self.slide else {
            out.push(full);
            return out;
        };

        let amount = slide.amount().clamp(0.0, cell_size);
        // Work in (along, across) space, then swap back for the Y axis
        let (lo, hi) = match slide.axis {
            SlideAxis::X => (full.min.x, full.max.x),
            SlideAxis::Y => (full.min.y, full.max.y),
        };
        let spans: SmallVec<[(f32, f32); 2]> = if slide.double {
            let mid = lo + cell_size * 0.5;
            let half = amount * 0.5;
            [(lo, mid - half), (mid + half, hi)].into_iter().collect()
        } else {
            [(lo + amount, hi)].into_iter().collect()
        };
        for (a, b) in spans {
            let rect = match slide.axis {
                SlideAxis::X => Rect::new(Vec2::new(a, full.min.y), Vec2::new(b, full.max.y)),
                SlideAxis::Y => Rect::new(Vec2::new(full.min.x, a), Vec2::new(full.max.x, b)),
            };
            if !rect.is_empty() {
                out.push(rect);
            }
        }
        out
    }

    pub(crate) fn with_coord(mut self, coord: IVec2) -> Self {
        self.coord = coord;
        self.bodies.clear();
        self
    }

    pub(crate) fn insert_body(&mut self, id: BodyId) {
        if !self.bodies.contains(&id) {
            self.bodies.push(id);
        }
    }

    pub(crate) fn remove_body(&mut self, id: BodyId) {
        self.bodies.retain(|&b| b != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CS: f32 = 64.0;

    fn door(axis: SlideAxis, double: bool, amount: f32) -> Cell {
        let mut cell = Cell::wall(IVec2::new(2, 3), 64.0);
        cell.slide = Some(Slide {
            axis,
            offset: Vec2::ZERO,
            double,
        });
        cell.set_slide_amount(amount);
        cell
    }

    #[test]
    fn test_static_wall_is_full_footprint() {
        let cell = Cell::wall(IVec2::new(1, 1), 64.0);
        let rects = cell.solid_rects(CS);
        assert_eq!(rects.len(), 1);
        assert_eq!(rects[0], Rect::new(Vec2::splat(64.0), Vec2::splat(128.0)));
        assert!(Cell::new(IVec2::ZERO).solid_rects(CS).is_empty());
    }

    #[test]
    fn test_closed_door_covers_cell() {
        let cell = door(SlideAxis::X, false, 0.0);
        let rects = cell.solid_rects(CS);
        assert_eq!(rects.as_slice(), &[cell.bounds(CS)]);
    }

    #[test]
    fn test_single_door_shrinks_along_axis() {
        let cell = door(SlideAxis::X, false, 16.0);
        let rects = cell.solid_rects(CS);
        assert_eq!(rects.len(), 1);
        assert_eq!(rects[0].min, Vec2::new(128.0 + 16.0, 192.0));
        assert_eq!(rects[0].max, Vec2::new(192.0, 256.0));

        let open = door(SlideAxis::Y, false, CS);
        assert!(open.solid_rects(CS).is_empty());
    }

    #[test]
    fn test_double_door_splits_around_center() {
        let cell = door(SlideAxis::Y, true, 32.0);
        let rects = cell.solid_rects(CS);
        assert_eq!(rects.len(), 2);
        // Cell spans y in [192, 256]; center 224, each half retracts by 16
        assert_eq!(rects[0].min.y, 192.0);
        assert_eq!(rects[0].max.y, 208.0);
        assert_eq!(rects[1].min.y, 240.0);
        assert_eq!(rects[1].max.y, 256.0);
        assert_eq!(rects[0].min.x, 128.0);

        let open = door(SlideAxis::Y, true, CS);
        assert!(open.solid_rects(CS).is_empty());
    }

    #[test]
    fn test_reaches_elevation() {
        let low = Cell::wall(IVec2::ZERO, 32.0);
        assert!(low.reaches(None));
        assert!(low.reaches(Some(16.0)));
        assert!(!low.reaches(Some(32.0)));
    }

    #[test]
    fn test_body_membership_is_a_set() {
        let mut cell = Cell::new(IVec2::ZERO);
        let id = BodyId::next();
        cell.insert_body(id);
        cell.insert_body(id);
        assert_eq!(cell.bodies(), &[id]);
        cell.remove_body(id);
        assert!(cell.bodies().is_empty());
    }
}
