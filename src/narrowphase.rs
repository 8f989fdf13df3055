use glam::Vec2;

use crate::api::NarrowphaseApi;
use crate::types::*;

/// Segment-parameter slack for hits that start exactly on a rectangle edge.
const EDGE_EPS: f32 = 1e-5;

/// Overlap result for two rectangles.
#[derive(Copy, Clone, Debug)]
pub struct Overlap {
    /// Axis of minimum penetration, pointing from B into A.
    pub normal: Vec2,
    /// Penetration depth along `normal` (> 0).
    pub depth: f32,
}

/// Segment-vs-rectangle crossing.
#[derive(Copy, Clone, Debug)]
pub struct SegmentHit {
    /// Fraction in [0,1] along the segment.
    pub toi: f32,
    /// Outward normal of the face crossed. Zero when the segment starts inside.
    pub normal: Vec2,
    pub point: Vec2,
}

/// Rectangle primitive tests.
pub struct Narrowphase;

impl NarrowphaseApi for Narrowphase {
    fn line_segment_rect(a: Vec2, b: Vec2, rect: Rect) -> Option<SegmentHit> {
        let d = b - a;
        // Slab method; track the entering face across both axes
        let mut tmin = f32::NEG_INFINITY;
        let mut tmax = f32::INFINITY;
        let mut n_enter = Vec2::ZERO;

        // X axis
        if d.x.abs() < f32::EPSILON {
            if a.x < rect.min.x || a.x > rect.max.x {
                return None;
            }
        } else {
            let inv = 1.0 / d.x;
            let mut t1 = (rect.min.x - a.x) * inv;
            let mut t2 = (rect.max.x - a.x) * inv;
            let mut nx = -1.0;
            if t1 > t2 {
                core::mem::swap(&mut t1, &mut t2);
                nx = 1.0;
            }
            if t1 > tmin {
                tmin = t1;
                n_enter = Vec2::new(nx, 0.0);
            }
            if t2 < tmax {
                tmax = t2;
            }
        }

        // Y axis
        if d.y.abs() < f32::EPSILON {
            if a.y < rect.min.y || a.y > rect.max.y {
                return None;
            }
        } else {
            let inv = 1.0 / d.y;
            let mut t1 = (rect.min.y - a.y) * inv;
            let mut t2 = (rect.max.y - a.y) * inv;
            let mut ny = -1.0;
            if t1 > t2 {
                core::mem::swap(&mut t1, &mut t2);
                ny = 1.0;
            }
            if t1 > tmin {
                tmin = t1;
                n_enter = Vec2::new(0.0, ny);
            }
            if t2 < tmax {
                tmax = t2;
            }
        }

        if tmin > tmax || tmax < 0.0 || tmin > 1.0 {
            return None;
        }

        if tmin < -EDGE_EPS {
            // Segment starts inside the rectangle
            return Some(SegmentHit {
                toi: 0.0,
                normal: Vec2::ZERO,
                point: a,
            });
        }
        let toi = tmin.clamp(0.0, 1.0);
        Some(SegmentHit {
            toi,
            normal: n_enter,
            point: a + d * toi,
        })
    }

    fn overlap_rect_rect(a: Rect, b: Rect) -> Option<Overlap> {
        let ca = a.center();
        let cb = b.center();
        let ha = a.half_extents();
        let hb = b.half_extents();
        let d = cb - ca;
        let ox = (ha.x + hb.x) - d.x.abs();
        let oy = (ha.y + hb.y) - d.y.abs();
        if ox <= 0.0 || oy <= 0.0 {
            return None;
        }

        // Choose axis of minimum penetration
        let (depth, normal) = if ox <= oy {
            let nx = if d.x >= 0.0 { -1.0 } else { 1.0 };
            (ox, Vec2::new(nx, 0.0))
        } else {
            let ny = if d.y >= 0.0 { -1.0 } else { 1.0 };
            (oy, Vec2::new(0.0, ny))
        };
        Some(Overlap { normal, depth })
    }

    fn overlap_point_rect(p: Vec2, rect: Rect) -> bool {
        p.x >= rect.min.x && p.x <= rect.max.x && p.y >= rect.min.y && p.y <= rect.max.y
    }
}
