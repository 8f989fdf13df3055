//! Grid ray caster.
//!
//! Rays walk the cell grid with a two-pass DDA (next vertical grid line vs next
//! horizontal grid line, whichever is nearer). Sliding cells are tested against
//! their live solid rectangles, transparent cells are recorded and passed
//! through, and bodies sitting in crossed cells are tested against the exact
//! ray segment.

use glam::{IVec2, Vec2};
use rustc_hash::FxHashSet;

use std::f32::consts::FRAC_PI_2;

use crate::api::NarrowphaseApi;
use crate::cell::Cell;
use crate::narrowphase::Narrowphase;
use crate::types::*;
use crate::world::World;

/// Angles this close to a multiple of 90° are pushed off the axis by the same amount.
pub const ANGLE_EPSILON: f32 = 1e-4;

/// Parameters of one cast.
#[derive(Clone, Debug)]
pub struct RayRequest {
    pub origin: Vec2,
    /// Radians, measured from +X toward +Y.
    pub angle: f32,
    /// Cells no taller than this do not stop the ray.
    pub elevation: Option<f32>,
    /// Skip overlay surfaces (grates) instead of stopping on them.
    pub ignore_overlay: bool,
    /// Give up after this distance.
    pub max_distance: Option<f32>,
    /// Never report this body (usually the caster).
    pub ignore_body: Option<BodyId>,
}

impl RayRequest {
    pub fn new(origin: Vec2, angle: f32) -> Self {
        Self {
            origin,
            angle,
            elevation: None,
            ignore_overlay: false,
            max_distance: None,
            ignore_body: None,
        }
    }

    pub fn elevation(mut self, elevation: f32) -> Self {
        self.elevation = Some(elevation);
        self
    }

    pub fn ignore_overlay(mut self, ignore: bool) -> Self {
        self.ignore_overlay = ignore;
        self
    }

    pub fn max_distance(mut self, distance: f32) -> Self {
        self.max_distance = Some(distance);
        self
    }

    pub fn ignore_body(mut self, id: BodyId) -> Self {
        self.ignore_body = Some(id);
        self
    }
}

/// Body crossed by a ray segment.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BodyHit {
    pub id: BodyId,
    /// Distance from the ray origin to the entry point.
    pub distance: f32,
    pub point: Vec2,
}

/// One stretch of a ray, ending on a surface or on a terminal miss.
#[derive(Clone, Debug)]
pub struct RaySection {
    pub start_point: Vec2,
    pub end_point: Vec2,
    /// Distance from the ray origin to `end_point`; infinite when the ray left the grid.
    pub distance: f32,
    /// Struck cell; `None` when the ray left the grid or ran out of range.
    pub cell: Option<IVec2>,
    pub side: Option<Side>,
    /// Hit lies on a horizontal grid line (constant y).
    pub is_horizontal: bool,
    /// Hit is an overlay surface rather than the cell's walls.
    pub is_overlay: bool,
    /// Bodies the segment crosses, nearest first.
    pub encountered_bodies: Vec<BodyHit>,
}

impl RaySection {
    /// True for the closing section of a ray that struck nothing.
    pub fn is_miss(&self) -> bool {
        self.cell.is_none()
    }
}

#[derive(Copy, Clone, Debug)]
struct SurfaceHit {
    t: f32,
    side: Option<Side>,
    is_overlay: bool,
}

/// Stateless grid ray caster.
pub struct RayCaster;

impl RayCaster {
    /// Push an angle off the axes so the DDA never divides by zero.
    pub fn nudge_angle(angle: f32) -> f32 {
        let quarters = angle / FRAC_PI_2;
        let nearest = quarters.round();
        if ((quarters - nearest) * FRAC_PI_2).abs() < ANGLE_EPSILON {
            nearest * FRAC_PI_2 + ANGLE_EPSILON
        } else {
            angle
        }
    }

    /// Cast a ray and return its sections in order of increasing distance.
    ///
    /// The last section is either an opaque hit or a miss (`cell == None`).
    /// Up to `cfg.wall_layers` transparent hits are chained in front of it.
    pub fn cast_ray(world: &World, req: &RayRequest) -> Vec<RaySection> {
        let cs = world.cell_size();
        let dir = Vec2::from_angle(Self::nudge_angle(req.angle));
        let origin = req.origin;
        let max_t = req.max_distance.unwrap_or(f32::INFINITY);
        let mut trace = Trace::new(world, req, dir);

        let mut cell = world.grid_coord(origin);
        if world.cell(cell.x, cell.y).is_none() {
            trace.close(origin, f32::INFINITY, None, None, false, false);
            return trace.sections;
        }

        let step = IVec2::new(
            if dir.x > 0.0 { 1 } else { -1 },
            if dir.y > 0.0 { 1 } else { -1 },
        );
        let next_boundary = |c: i32, s: i32| -> f32 {
            if s > 0 { (c as f32 + 1.0) * cs } else { c as f32 * cs }
        };
        let mut t_max_x = (next_boundary(cell.x, step.x) - origin.x) / dir.x;
        let mut t_max_y = (next_boundary(cell.y, step.y) - origin.y) / dir.y;
        let t_delta_x = cs / dir.x.abs();
        let t_delta_y = cs / dir.y.abs();

        let mut t_enter = 0.0f32;
        let mut entry_side: Option<Side> = None;
        let mut layers = 0usize;
        // A straight line crosses at most width + length cells
        let max_steps = world.width() + world.length() + 2;

        for _ in 0..max_steps {
            let Some(c) = world.cell(cell.x, cell.y) else { break };
            trace.collect(cell);
            let t_exit = t_max_x.min(t_max_y);

            if let Some(hit) = trace.surface_hit(c, t_enter, t_exit, entry_side) {
                if hit.t > max_t {
                    break;
                }
                let horizontal = hit.side.is_some_and(Side::is_horizontal);
                let point = origin + dir * hit.t;
                trace.close(point, hit.t, Some(cell), hit.side, horizontal, hit.is_overlay);
                let chain = !hit.is_overlay
                    && c.transparency.is_transparent()
                    && layers < world.cfg().wall_layers;
                if !chain {
                    return trace.sections;
                }
                layers += 1;
            }

            // Step to the next cell
            if t_max_x < t_max_y {
                cell.x += step.x;
                t_enter = t_max_x;
                t_max_x += t_delta_x;
                entry_side = Some(if step.x > 0 { Side::Left } else { Side::Right });
            } else {
                cell.y += step.y;
                t_enter = t_max_y;
                t_max_y += t_delta_y;
                entry_side = Some(if step.y > 0 { Side::Front } else { Side::Back });
            }

            if t_enter > max_t {
                break;
            }
            if world.cell(cell.x, cell.y).is_none() {
                trace.close(origin + dir * t_enter, f32::INFINITY, None, None, false, false);
                return trace.sections;
            }
        }

        let t = if max_t.is_finite() { max_t } else { t_enter };
        let distance = if max_t.is_finite() { max_t } else { f32::INFINITY };
        trace.close(origin + dir * t, distance, None, None, false, false);
        trace.sections
    }

    /// Distance to the first opaque surface, or `None` if the ray escapes.
    pub fn first_hit(world: &World, req: &RayRequest) -> Option<RaySection> {
        Self::cast_ray(world, req).pop().filter(|s| !s.is_miss())
    }
}

/// Per-cast working state.
struct Trace<'w> {
    world: &'w World,
    req: &'w RayRequest,
    dir: Vec2,
    start: Vec2,
    candidates: Vec<BodyId>,
    reported: FxHashSet<BodyId>,
    sections: Vec<RaySection>,
    first_cell: bool,
    /// Cells around each visited cell whose bodies can still reach the ray.
    reach: i32,
}

impl<'w> Trace<'w> {
    fn new(world: &'w World, req: &'w RayRequest, dir: Vec2) -> Self {
        Self {
            world,
            req,
            dir,
            start: req.origin,
            candidates: Vec::new(),
            reported: FxHashSet::default(),
            sections: Vec::new(),
            first_cell: true,
            reach: world.body_reach(),
        }
    }

    /// Gather bodies registered around a visited cell.
    fn collect(&mut self, coord: IVec2) {
        for dy in -self.reach..=self.reach {
            for dx in -self.reach..=self.reach {
                let Some(cell) = self.world.cell(coord.x + dx, coord.y + dy) else { continue };
                for id in cell.bodies() {
                    if Some(*id) == self.req.ignore_body || self.reported.contains(id) {
                        continue;
                    }
                    if !self.candidates.contains(id) {
                        self.candidates.push(*id);
                    }
                }
            }
        }
    }

    /// Where, if anywhere, the ray stops inside `cell` between `t_enter` and `t_exit`.
    fn surface_hit(
        &mut self,
        cell: &Cell,
        t_enter: f32,
        t_exit: f32,
        entry_side: Option<Side>,
    ) -> Option<SurfaceHit> {
        let first = std::mem::replace(&mut self.first_cell, false);
        let cs = self.world.cell_size();
        let origin = self.req.origin;

        if cell.blocking && cell.reaches(self.req.elevation) {
            if cell.is_sliding() {
                let a = origin + self.dir * t_enter;
                let b = origin + self.dir * t_exit;
                let span = t_exit - t_enter;
                let mut best: Option<SurfaceHit> = None;
                for rect in cell.solid_rects(cs) {
                    let Some(h) = Narrowphase::line_segment_rect(a, b, rect) else { continue };
                    let side = Side::from_normal(h.normal);
                    if side.is_none() && first {
                        // Cast from inside the panel itself
                        continue;
                    }
                    let t = t_enter + h.toi * span;
                    if best.is_none_or(|cur| t < cur.t) {
                        best = Some(SurfaceHit {
                            t,
                            side: side.or(entry_side),
                            is_overlay: false,
                        });
                    }
                }
                if best.is_some() {
                    return best;
                }
            } else if !first {
                return Some(SurfaceHit {
                    t: t_enter,
                    side: entry_side,
                    is_overlay: false,
                });
            }
        }

        let overlay = cell.overlay.is_some() && cell.reaches(self.req.elevation);
        if overlay && !self.req.ignore_overlay && !first {
            return Some(SurfaceHit {
                t: t_enter,
                side: entry_side,
                is_overlay: true,
            });
        }
        None
    }

    /// Finish the current section at `end`, attaching bodies crossed on the way.
    fn close(
        &mut self,
        end: Vec2,
        distance: f32,
        cell: Option<IVec2>,
        side: Option<Side>,
        is_horizontal: bool,
        is_overlay: bool,
    ) {
        let origin = self.req.origin;
        let mut hits = Vec::new();
        for id in &self.candidates {
            if self.reported.contains(id) {
                continue;
            }
            let Some(body) = self.world.body(*id) else { continue };
            if let Some(e) = self.req.elevation {
                if body.top() <= e {
                    continue;
                }
            }
            if let Some(h) = Narrowphase::line_segment_rect(self.start, end, body.rect()) {
                hits.push(BodyHit {
                    id: *id,
                    distance: origin.distance(h.point),
                    point: h.point,
                });
            }
        }
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        for h in &hits {
            self.reported.insert(h.id);
        }
        self.candidates.retain(|id| !self.reported.contains(id));

        self.sections.push(RaySection {
            start_point: self.start,
            end_point: end,
            distance,
            cell,
            side,
            is_horizontal,
            is_overlay,
            encountered_bodies: hits,
        });
        self.start = end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Body;
    use crate::cell::Slide;
    use glam::Vec3;
    use std::f32::consts::{FRAC_PI_2, PI};

    /// 8×3 corridor: outer wall ring, interior row y = 1, `edit` customizes cells.
    fn corridor(cfg: WorldConfig, mut edit: impl FnMut(&mut Cell)) -> World {
        World::from_fn(cfg, 8, 3, |c| {
            let edge = c.x == 0 || c.y == 0 || c.x == 7 || c.y == 2;
            let mut cell = if edge { Cell::wall(c, 64.0) } else { Cell::new(c) };
            edit(&mut cell);
            cell
        })
        .unwrap()
    }

    fn at(x: i32, y: i32) -> impl Fn(&Cell) -> bool {
        move |c| c.coord() == IVec2::new(x, y)
    }

    fn east(origin: Vec2) -> RayRequest {
        RayRequest::new(origin, 0.0)
    }

    #[test]
    fn test_nudge_angle() {
        assert_eq!(RayCaster::nudge_angle(0.0), ANGLE_EPSILON);
        assert!((RayCaster::nudge_angle(FRAC_PI_2) - (FRAC_PI_2 + ANGLE_EPSILON)).abs() < 1e-6);
        assert!((RayCaster::nudge_angle(-PI) - (-PI + ANGLE_EPSILON)).abs() < 1e-6);
        assert_eq!(RayCaster::nudge_angle(0.3), 0.3);
    }

    #[test]
    fn test_hits_wall_east() {
        let w = corridor(WorldConfig::default(), |_| {});
        let sections = RayCaster::cast_ray(&w, &east(Vec2::new(96.0, 96.0)));
        assert_eq!(sections.len(), 1);
        let s = &sections[0];
        assert_eq!(s.cell, Some(IVec2::new(7, 1)));
        assert_eq!(s.side, Some(Side::Left));
        assert!(!s.is_horizontal);
        assert!((s.distance - 352.0).abs() < 0.01);
        assert!((s.end_point.x - 448.0).abs() < 0.01);
        assert_eq!(s.start_point, Vec2::new(96.0, 96.0));
    }

    #[test]
    fn test_hits_wall_north_and_south() {
        let w = corridor(WorldConfig::default(), |_| {});
        let north = RayRequest::new(Vec2::new(96.0, 96.0), FRAC_PI_2);
        let up = RayCaster::first_hit(&w, &north).unwrap();
        assert_eq!(up.cell, Some(IVec2::new(1, 2)));
        assert_eq!(up.side, Some(Side::Front));
        assert!(up.is_horizontal);
        assert!((up.distance - 32.0).abs() < 0.01);

        let south = RayRequest::new(Vec2::new(96.0, 100.0), -FRAC_PI_2);
        let down = RayCaster::first_hit(&w, &south).unwrap();
        assert_eq!(down.cell, Some(IVec2::new(1, 0)));
        assert_eq!(down.side, Some(Side::Back));
        assert!((down.distance - 36.0).abs() < 0.01);
    }

    #[test]
    fn test_hits_wall_west() {
        let w = corridor(WorldConfig::default(), |_| {});
        let s = RayCaster::first_hit(&w, &RayRequest::new(Vec2::new(300.0, 96.0), PI)).unwrap();
        assert_eq!(s.cell, Some(IVec2::new(0, 1)));
        assert_eq!(s.side, Some(Side::Right));
        assert!((s.distance - 236.0).abs() < 0.01);
    }

    #[test]
    fn test_transparent_cells_chain_sections() {
        let glass = at(3, 1);
        let w = corridor(WorldConfig::default(), |c| {
            if glass(c) {
                *c = Cell::wall(c.coord(), 64.0);
                c.transparency = Transparency::Full;
            }
        });
        let sections = RayCaster::cast_ray(&w, &east(Vec2::new(96.0, 96.0)));
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].cell, Some(IVec2::new(3, 1)));
        assert!((sections[0].distance - 96.0).abs() < 0.01);
        assert_eq!(sections[1].cell, Some(IVec2::new(7, 1)));
        assert_eq!(sections[1].start_point, sections[0].end_point);
        // Distance is measured from the true origin, not the previous section
        assert!((sections[1].distance - 352.0).abs() < 0.01);
    }

    #[test]
    fn test_wall_layers_bound_chaining() {
        let cfg = WorldConfig {
            wall_layers: 1,
            ..WorldConfig::default()
        };
        let w = corridor(cfg, |c| {
            let p = c.coord();
            if p.y == 1 && (2..=4).contains(&p.x) {
                *c = Cell::wall(p, 64.0);
                c.transparency = Transparency::Partial;
            }
        });
        let sections = RayCaster::cast_ray(&w, &east(Vec2::new(96.0, 96.0)));
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].cell, Some(IVec2::new(2, 1)));
        assert_eq!(sections[1].cell, Some(IVec2::new(3, 1)));
    }

    fn door_world(axis: SlideAxis, amount: f32, double: bool) -> World {
        let door = at(3, 1);
        corridor(WorldConfig::default(), |c| {
            if door(c) {
                *c = Cell::wall(c.coord(), 64.0);
                c.slide = Some(Slide {
                    axis,
                    offset: Vec2::ZERO,
                    double,
                });
                c.set_slide_amount(amount);
            }
        })
    }

    #[test]
    fn test_closed_door_hit_on_cell_face() {
        let w = door_world(SlideAxis::X, 0.0, false);
        let s = RayCaster::first_hit(&w, &east(Vec2::new(96.0, 96.0))).unwrap();
        assert_eq!(s.cell, Some(IVec2::new(3, 1)));
        assert_eq!(s.side, Some(Side::Left));
        assert!((s.distance - 96.0).abs() < 0.01);
    }

    #[test]
    fn test_door_sliding_along_ray_hit_inside_cell() {
        // Solid part spans x in [224, 256]
        let w = door_world(SlideAxis::X, 32.0, false);
        let s = RayCaster::first_hit(&w, &east(Vec2::new(96.0, 96.0))).unwrap();
        assert_eq!(s.cell, Some(IVec2::new(3, 1)));
        assert_eq!(s.side, Some(Side::Left));
        assert!((s.end_point.x - 224.0).abs() < 0.01);
        assert!((s.distance - 128.0).abs() < 0.01);
    }

    #[test]
    fn test_door_sliding_across_ray_gap() {
        // Solid part spans y in [96, 128]
        let w = door_world(SlideAxis::Y, 32.0, false);
        let through = RayCaster::first_hit(&w, &east(Vec2::new(96.0, 80.0))).unwrap();
        assert_eq!(through.cell, Some(IVec2::new(7, 1)));
        let blocked = RayCaster::first_hit(&w, &east(Vec2::new(96.0, 110.0))).unwrap();
        assert_eq!(blocked.cell, Some(IVec2::new(3, 1)));
        assert_eq!(blocked.side, Some(Side::Left));
    }

    #[test]
    fn test_double_door_center_gap() {
        // Halves span y in [64, 80] and [112, 128]
        let w = door_world(SlideAxis::Y, 32.0, true);
        let center = RayCaster::first_hit(&w, &east(Vec2::new(96.0, 96.0))).unwrap();
        assert_eq!(center.cell, Some(IVec2::new(7, 1)));
        let edge = RayCaster::first_hit(&w, &east(Vec2::new(96.0, 70.0))).unwrap();
        assert_eq!(edge.cell, Some(IVec2::new(3, 1)));
    }

    #[test]
    fn test_ray_starting_in_doorway_passes_own_panel() {
        // Origin sits inside the closed panel; the panel is ignored
        let w = door_world(SlideAxis::X, 0.0, false);
        let s = RayCaster::first_hit(&w, &east(Vec2::new(200.0, 96.0))).unwrap();
        assert_eq!(s.cell, Some(IVec2::new(7, 1)));
    }

    #[test]
    fn test_elevation_skips_short_walls() {
        let low = at(3, 1);
        let w = corridor(WorldConfig::default(), |c| {
            if low(c) {
                *c = Cell::wall(c.coord(), 32.0);
            }
        });
        let ground = RayCaster::first_hit(&w, &east(Vec2::new(96.0, 96.0))).unwrap();
        assert_eq!(ground.cell, Some(IVec2::new(3, 1)));
        let raised = east(Vec2::new(96.0, 96.0)).elevation(40.0);
        let raised = RayCaster::first_hit(&w, &raised).unwrap();
        assert_eq!(raised.cell, Some(IVec2::new(7, 1)));
    }

    #[test]
    fn test_overlay_toggle() {
        let grate = at(3, 1);
        let w = corridor(WorldConfig::default(), |c| {
            if grate(c) {
                c.overlay = Some(9);
            }
        });
        let sections = RayCaster::cast_ray(&w, &east(Vec2::new(96.0, 96.0)));
        assert_eq!(sections.len(), 1);
        assert!(sections[0].is_overlay);
        assert_eq!(sections[0].cell, Some(IVec2::new(3, 1)));

        let through = RayCaster::cast_ray(&w, &east(Vec2::new(96.0, 96.0)).ignore_overlay(true));
        assert_eq!(through.len(), 1);
        assert!(!through[0].is_overlay);
        assert_eq!(through[0].cell, Some(IVec2::new(7, 1)));
    }

    #[test]
    fn test_overlay_respects_elevation() {
        let grate = at(3, 1);
        let w = corridor(WorldConfig::default(), |c| {
            if grate(c) {
                c.overlay = Some(9);
                c.height = 32.0;
            }
        });
        let low = RayCaster::first_hit(&w, &east(Vec2::new(96.0, 96.0)).elevation(10.0)).unwrap();
        assert!(low.is_overlay);
        assert_eq!(low.cell, Some(IVec2::new(3, 1)));

        let high = RayCaster::cast_ray(&w, &east(Vec2::new(96.0, 96.0)).elevation(40.0));
        assert_eq!(high.len(), 1);
        assert!(!high[0].is_overlay);
        assert_eq!(high[0].cell, Some(IVec2::new(7, 1)));
    }

    #[test]
    fn test_bodies_on_the_line_are_encountered() {
        let mut w = corridor(WorldConfig::default(), |_| {});
        let caster = w.add(Body::new(Vec3::new(96.0, 96.0, 0.0), Vec3::splat(20.0))).unwrap();
        let on_line = w.add(Body::new(Vec3::new(250.0, 96.0, 0.0), Vec3::splat(20.0))).unwrap();
        let off_line = w.add(Body::new(Vec3::new(250.0, 120.0, 0.0), Vec3::splat(10.0))).unwrap();
        let nearer = w.add(Body::new(Vec3::new(170.0, 98.0, 0.0), Vec3::splat(10.0))).unwrap();

        let req = east(Vec2::new(96.0, 96.0)).ignore_body(caster);
        let s = RayCaster::first_hit(&w, &req).unwrap();
        let ids: Vec<BodyId> = s.encountered_bodies.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![nearer, on_line]);
        assert!(!ids.contains(&off_line));
        assert!((s.encountered_bodies[1].distance - 144.0).abs() < 0.01);

        // Without the ignore the caster is reported at distance zero
        let all = RayCaster::first_hit(&w, &east(Vec2::new(96.0, 96.0))).unwrap();
        assert_eq!(all.encountered_bodies[0].id, caster);
        assert_eq!(all.encountered_bodies[0].distance, 0.0);
    }

    #[test]
    fn test_tall_body_from_unvisited_row_is_encountered() {
        let mut w = World::from_fn(WorldConfig::default(), 8, 8, Cell::new).unwrap();
        // Registered in row 0 but spans down into row 1, where the ray runs
        let tall = Body::new(Vec3::new(250.0, 60.0, 0.0), Vec3::new(20.0, 80.0, 64.0));
        let tall = w.add(tall).unwrap();
        let sections = RayCaster::cast_ray(&w, &east(Vec2::new(40.0, 96.0)));
        let last = sections.last().unwrap();
        assert!(last.is_miss());
        assert_eq!(last.encountered_bodies.len(), 1);
        assert_eq!(last.encountered_bodies[0].id, tall);
        assert!((last.encountered_bodies[0].distance - 200.0).abs() < 0.01);
    }

    #[test]
    fn test_bodies_behind_wall_not_encountered() {
        let glass = at(3, 1);
        let mut w = corridor(WorldConfig::default(), |c| {
            if glass(c) {
                *c = Cell::wall(c.coord(), 64.0);
                c.transparency = Transparency::Full;
            }
        });
        let front = w.add(Body::new(Vec3::new(160.0, 96.0, 0.0), Vec3::splat(10.0))).unwrap();
        let behind = w.add(Body::new(Vec3::new(300.0, 96.0, 0.0), Vec3::splat(10.0))).unwrap();
        let sections = RayCaster::cast_ray(&w, &east(Vec2::new(96.0, 96.0)));
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].encountered_bodies.len(), 1);
        assert_eq!(sections[0].encountered_bodies[0].id, front);
        assert_eq!(sections[1].encountered_bodies.len(), 1);
        assert_eq!(sections[1].encountered_bodies[0].id, behind);
    }

    #[test]
    fn test_elevation_filters_short_bodies() {
        let mut w = corridor(WorldConfig::default(), |_| {});
        w.add(Body::new(Vec3::new(200.0, 96.0, 0.0), Vec3::new(10.0, 10.0, 20.0))).unwrap();
        let s = RayCaster::first_hit(&w, &east(Vec2::new(96.0, 96.0)).elevation(30.0)).unwrap();
        assert!(s.encountered_bodies.is_empty());
    }

    #[test]
    fn test_leaving_grid_is_terminal_miss() {
        let w = World::from_fn(WorldConfig::default(), 4, 4, Cell::new).unwrap();
        let sections = RayCaster::cast_ray(&w, &east(Vec2::new(32.0, 32.0)));
        assert_eq!(sections.len(), 1);
        assert!(sections[0].is_miss());
        assert_eq!(sections[0].distance, f32::INFINITY);
        assert!((sections[0].end_point.x - 256.0).abs() < 0.01);
        assert!(RayCaster::first_hit(&w, &east(Vec2::new(32.0, 32.0))).is_none());

        let outside = RayCaster::cast_ray(&w, &east(Vec2::new(-10.0, 32.0)));
        assert!(outside[0].is_miss());
    }

    #[test]
    fn test_max_distance_is_terminal_miss() {
        let w = corridor(WorldConfig::default(), |_| {});
        let sections = RayCaster::cast_ray(&w, &east(Vec2::new(96.0, 96.0)).max_distance(100.0));
        assert_eq!(sections.len(), 1);
        assert!(sections[0].is_miss());
        assert_eq!(sections[0].distance, 100.0);
    }

    #[test]
    fn test_random_rays_monotonic() {
        let mut rng = fastrand::Rng::with_seed(42);
        let w = World::from_fn(WorldConfig::default(), 12, 12, |c| {
            let edge = c.x == 0 || c.y == 0 || c.x == 11 || c.y == 11;
            if edge {
                Cell::wall(c, 64.0)
            } else if (c.x + c.y) % 5 == 0 {
                let mut cell = Cell::wall(c, 48.0);
                cell.transparency = Transparency::Full;
                cell
            } else if (c.x * 3 + c.y) % 7 == 0 {
                let mut cell = Cell::wall(c, 64.0);
                cell.slide = Some(Slide {
                    axis: if c.x % 2 == 0 { SlideAxis::X } else { SlideAxis::Y },
                    offset: Vec2::splat(20.0),
                    double: c.y % 2 == 0,
                });
                cell
            } else {
                Cell::new(c)
            }
        })
        .unwrap();
        for _ in 0..500 {
            let origin = Vec2::new(64.0 + rng.f32() * 640.0, 64.0 + rng.f32() * 640.0);
            let req = RayRequest::new(origin, rng.f32() * std::f32::consts::TAU);
            let sections = RayCaster::cast_ray(&w, &req);
            assert!(!sections.is_empty());
            let mut last = 0.0f32;
            let mut start = origin;
            for s in &sections {
                assert!(s.distance >= last, "distance went backwards: {} < {}", s.distance, last);
                assert_eq!(s.start_point, start);
                last = s.distance;
                start = s.end_point;
            }
            // Enclosed map: the ray always stops on a surface
            assert!(!sections.last().unwrap().is_miss());
        }
    }
}
