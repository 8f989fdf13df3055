use glam::{Vec2, Vec3};

use std::fmt;

use crate::body::Motion;
use crate::narrowphase::{Overlap, SegmentHit};
use crate::types::*;

/// Rectangle primitives shared by collision resolution and the ray caster.
pub trait NarrowphaseApi {
    // Segments --------------------------------------------------------------

    /// First crossing of segment `a..b` into `rect`, with `toi` in [0,1].
    fn line_segment_rect(a: Vec2, b: Vec2, rect: Rect) -> Option<SegmentHit>;

    // Overlaps --------------------------------------------------------------

    /// Strict overlap: rectangles that merely touch do not overlap.
    fn overlap_rect_rect(a: Rect, b: Rect) -> Option<Overlap>;
    fn overlap_point_rect(p: Vec2, rect: Rect) -> bool;
}

/// Per-kind hooks for dynamic bodies (projectiles, actors, items).
///
/// The world calls these around its generic movement and collision code so that
/// body kinds never need a type switch inside `World`.
pub trait BodyBehaviour: fmt::Debug {
    /// Runs before the body moves. May steer `motion`.
    fn think(&mut self, _position: Vec3, _motion: &mut Motion, _delta: f32, _elapsed_ms: f64) {}

    /// Whether `other` stops this body. Defaults to [`default_collides`].
    fn collides_with(&self, motion: &Motion, other: &Obstacle) -> bool {
        default_collides(motion, other)
    }

    /// Receives the tracked contacts that started or ended this update.
    fn on_contacts(&mut self, _diff: &ContactDiff) {}
}

/// Blocking obstacles stop a body, except that weightless bodies pass through
/// anything with a non-zero transparency tier.
pub fn default_collides(motion: &Motion, other: &Obstacle) -> bool {
    if !other.blocking {
        return false;
    }
    !(motion.weight == 0.0 && other.transparency.is_transparent())
}
