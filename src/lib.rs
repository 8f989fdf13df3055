//! gridcast: tile-grid spatial core for raycast-rendered games
//! (cell world, body collision, DDA ray casting, A* over cell weights)

pub mod types;
pub mod error;
pub mod api;
pub mod narrowphase;
pub mod cell;
pub mod body;
pub mod world;
pub mod raycast;
pub mod level;
pub mod path;

pub use crate::types::*;
pub use crate::api::*;
pub use crate::error::{Result, WorldError};
pub use crate::narrowphase::{Narrowphase, Overlap, SegmentHit};
pub use crate::cell::{Cell, Slide};
pub use crate::body::{Body, Motion};
pub use crate::world::{Neighbour, World};
pub use crate::raycast::{ANGLE_EPSILON, BodyHit, RayCaster, RayRequest, RaySection};
pub use crate::level::{BodyDesc, BodyKind, CellDesc, LevelDesc};
pub use crate::path::{Graph, GridNode, PathGraphs, PathMode, SearchOptions, Heuristic};
