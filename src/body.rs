use glam::{IVec2, Vec2, Vec3};
use rustc_hash::FxHashSet;

use crate::api::{BodyBehaviour, NarrowphaseApi, default_collides};
use crate::narrowphase::Narrowphase;
use crate::types::*;

/// Gap left between a resolved body and the obstacle it was pushed out of.
const SKIN: f32 = 1e-3;

/// Movement state that turns a body into a dynamic body.
#[derive(Clone, Debug, Default)]
pub struct Motion {
    /// Speed in pixels per unit of `delta`.
    pub velocity: f32,
    /// Heading in radians.
    pub angle: f32,
    /// 0 marks an ethereal body that passes through transparent obstacles.
    pub weight: f32,
    tracked: Vec<ContactKind>,
    collisions: Vec<ObstacleKey>,
    contacts: FxHashSet<ObstacleKey>,
    last_diff: ContactDiff,
}

impl Motion {
    pub fn new(velocity: f32, angle: f32, weight: f32) -> Self {
        Self {
            velocity,
            angle,
            weight,
            ..Default::default()
        }
    }

    /// Ask for entered/exited reports about contacts of this kind.
    pub fn track(&mut self, kind: ContactKind) {
        if !self.tracked.contains(&kind) {
            self.tracked.push(kind);
        }
    }

    pub fn untrack(&mut self, kind: ContactKind) {
        self.tracked.retain(|&k| k != kind);
    }

    pub fn tracked(&self) -> &[ContactKind] {
        &self.tracked
    }

    /// Obstacles the body was pushed out of during the last update.
    pub fn collisions(&self) -> &[ObstacleKey] {
        &self.collisions
    }

    /// Tracked contacts active after the last update.
    pub fn contacts(&self) -> &FxHashSet<ObstacleKey> {
        &self.contacts
    }

    /// Diff produced by the last update.
    pub fn last_diff(&self) -> &ContactDiff {
        &self.last_diff
    }

    /// Unit heading vector.
    pub fn direction(&self) -> Vec2 {
        Vec2::from_angle(self.angle)
    }
}

/// Free-floating entity with a rectangular footprint.
///
/// Position is read-only from outside the crate; move bodies through
/// [`World::teleport`](crate::World::teleport) or the update tick so cell
/// membership stays in sync.
#[derive(Debug)]
pub struct Body {
    id: BodyId,
    position: Vec3,
    /// Width (x), length (y) and height (z).
    pub size: Vec3,
    pub blocking: bool,
    /// Vertical pivot used by the renderer.
    pub anchor: f32,
    pub transparency: Transparency,
    /// Caller-defined kind tag, matched by [`ContactKind::Tag`].
    pub tag: u32,
    motion: Option<Motion>,
    behaviour: Option<Box<dyn BodyBehaviour>>,
}

impl Body {
    /// Static blocking body.
    pub fn new(position: Vec3, size: Vec3) -> Self {
        Self {
            id: BodyId::next(),
            position,
            size,
            blocking: true,
            anchor: 0.0,
            transparency: Transparency::None,
            tag: 0,
            motion: None,
            behaviour: None,
        }
    }

    /// Body that receives per-frame updates.
    pub fn dynamic(position: Vec3, size: Vec3, motion: Motion) -> Self {
        Self {
            motion: Some(motion),
            ..Self::new(position, size)
        }
    }

    pub fn with_blocking(mut self, blocking: bool) -> Self {
        self.blocking = blocking;
        self
    }

    pub fn with_tag(mut self, tag: u32) -> Self {
        self.tag = tag;
        self
    }

    pub fn with_transparency(mut self, transparency: Transparency) -> Self {
        self.transparency = transparency;
        self
    }

    pub fn with_anchor(mut self, anchor: f32) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn with_behaviour(mut self, behaviour: Box<dyn BodyBehaviour>) -> Self {
        self.behaviour = Some(behaviour);
        self
    }

    pub fn id(&self) -> BodyId {
        self.id
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn x(&self) -> f32 {
        self.position.x
    }

    pub fn y(&self) -> f32 {
        self.position.y
    }

    pub fn z(&self) -> f32 {
        self.position.z
    }

    pub fn width(&self) -> f32 {
        self.size.x
    }

    pub fn length(&self) -> f32 {
        self.size.y
    }

    pub fn height(&self) -> f32 {
        self.size.z
    }

    pub fn half_extents(&self) -> Vec2 {
        self.size.truncate() * 0.5
    }

    /// Collision and ray-intersection shape.
    pub fn rect(&self) -> Rect {
        Rect::from_center(self.position.truncate(), self.half_extents())
    }

    /// Top of the body in world z.
    pub fn top(&self) -> f32 {
        self.position.z + self.size.z
    }

    pub fn is_dynamic(&self) -> bool {
        self.motion.is_some()
    }

    pub fn motion(&self) -> Option<&Motion> {
        self.motion.as_ref()
    }

    pub fn motion_mut(&mut self) -> Option<&mut Motion> {
        self.motion.as_mut()
    }

    /// Grid cell containing the body's center.
    pub fn grid_coord(&self, cell_size: f32) -> IVec2 {
        (self.position.truncate() / cell_size).floor().as_ivec2()
    }

    /// Neighbourhood radius (in cells) that can hold anything this body may
    /// touch after moving up to `velocity_limit`.
    pub fn collision_radius(&self, cell_size: f32, velocity_limit: f32) -> i32 {
        let reach = self.half_extents().max_element() + velocity_limit;
        ((reach / cell_size).ceil() as i32).max(1)
    }

    pub(crate) fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Snapshot used when this body is someone else's neighbour.
    pub(crate) fn obstacle(&self) -> Obstacle {
        Obstacle {
            key: ObstacleKey::Body(self.id),
            rect: self.rect(),
            blocking: self.blocking,
            transparency: self.transparency,
            tag: Some(self.tag),
        }
    }

    /// Advance a dynamic body by one tick against a snapshot of its neighbours.
    ///
    /// X is moved and resolved fully before Y. The center is clamped into
    /// `bounds` afterwards. Static bodies are left untouched.
    pub(crate) fn step(
        &mut self,
        delta: f32,
        elapsed_ms: f64,
        neighbours: &[Obstacle],
        velocity_limit: f32,
        bounds: Rect,
    ) -> ContactDiff {
        let Some(mut motion) = self.motion.take() else {
            return ContactDiff::default();
        };
        let mut behaviour = self.behaviour.take();
        if let Some(b) = behaviour.as_mut() {
            b.think(self.position, &mut motion, delta, elapsed_ms);
        }

        let half = self.half_extents();
        let distance = (motion.velocity * delta).min(velocity_limit);
        let dir = motion.direction();
        let mut hits = Vec::new();

        let start = self.position.truncate();
        {
            let collides = |o: &Obstacle| match behaviour.as_ref() {
                Some(b) => b.collides_with(&motion, o),
                None => default_collides(&motion, o),
            };

            let mut moved = Vec2::new(start.x + dir.x * distance, start.y);
            moved.x = resolve_axis(Axis::X, start, moved, half, neighbours, &collides, &mut hits);
            let after_x = moved;
            moved.y += dir.y * distance;
            moved.y = resolve_axis(Axis::Y, after_x, moved, half, neighbours, &collides, &mut hits);

            let clamped = moved.clamp(bounds.min, bounds.max);
            self.position.x = clamped.x;
            self.position.y = clamped.y;
        }
        motion.collisions = hits;

        let diff = self.diff_contacts(&mut motion, neighbours);
        if let Some(b) = behaviour.as_mut() {
            b.on_contacts(&diff);
        }
        self.motion = Some(motion);
        self.behaviour = behaviour;
        diff
    }

    fn diff_contacts(&self, motion: &mut Motion, neighbours: &[Obstacle]) -> ContactDiff {
        if motion.tracked.is_empty() && motion.contacts.is_empty() {
            motion.last_diff = ContactDiff::default();
            return ContactDiff::default();
        }
        let me = self.rect();
        let mut current = FxHashSet::default();
        let mut diff = ContactDiff::default();
        for o in neighbours {
            if !motion.tracked.iter().any(|k| k.matches(o)) {
                continue;
            }
            let touching = motion.collisions.contains(&o.key)
                || Narrowphase::overlap_rect_rect(me, o.rect).is_some();
            if touching && current.insert(o.key) && !motion.contacts.contains(&o.key) {
                diff.entered.push(o.key);
            }
        }
        for key in &motion.contacts {
            if !current.contains(key) {
                diff.exited.push(*key);
            }
        }
        motion.contacts = current;
        motion.last_diff = diff.clone();
        diff
    }
}

#[derive(Copy, Clone, Debug)]
enum Axis {
    X,
    Y,
}

/// Push `center` out of every colliding obstacle along one axis.
///
/// `prev` is the center before this axis moved; it decides which side of the
/// obstacle the body came from.
fn resolve_axis(
    axis: Axis,
    prev: Vec2,
    center: Vec2,
    half: Vec2,
    neighbours: &[Obstacle],
    collides: &dyn Fn(&Obstacle) -> bool,
    hits: &mut Vec<ObstacleKey>,
) -> f32 {
    let mut c = center;
    let prev_rect = Rect::from_center(prev, half);
    for o in neighbours {
        if !collides(o) {
            continue;
        }
        if Narrowphase::overlap_rect_rect(Rect::from_center(c, half), o.rect).is_none() {
            continue;
        }
        let (prev_lo, prev_hi, prev_c, o_lo, o_hi, o_c, h) = match axis {
            Axis::X => (
                prev_rect.min.x,
                prev_rect.max.x,
                prev.x,
                o.rect.min.x,
                o.rect.max.x,
                o.rect.center().x,
                half.x,
            ),
            Axis::Y => (
                prev_rect.min.y,
                prev_rect.max.y,
                prev.y,
                o.rect.min.y,
                o.rect.max.y,
                o.rect.center().y,
                half.y,
            ),
        };
        let from_low = if prev_hi <= o_lo + SKIN {
            true
        } else if prev_lo >= o_hi - SKIN {
            false
        } else {
            prev_c < o_c
        };
        let resolved = if from_low { o_lo - h - SKIN } else { o_hi + h + SKIN };
        match axis {
            Axis::X => c.x = resolved,
            Axis::Y => c.y = resolved,
        }
        if !hits.contains(&o.key) {
            hits.push(o.key);
        }
    }
    match axis {
        Axis::X => c.x,
        Axis::Y => c.y,
    }
}
