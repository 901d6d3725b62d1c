//! Formation - a planet-like body whose surface the node tree subdivides.
//!
//! The surface shape is delegated to a [`Shader`], which decides where new
//! vertices go when a node is split. Shaders work in formation-local double
//! precision (relative to the formation's centre).

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use glam::DVec3;

/// Atomic counter for generating unique FormationIds.
static FORMATION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Opaque formation identifier, unique within the process lifetime.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct FormationId(u64);

impl FormationId {
  pub fn new() -> Self {
    Self(FORMATION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
  }

  pub fn raw(&self) -> u64 {
    self.0
  }
}

impl Default for FormationId {
  fn default() -> Self {
    Self::new()
  }
}

/// Places surface geometry for a formation.
pub trait Shader: Send + Sync {
  /// The four corners of the initial tetrahedron, formation-local.
  ///
  /// Corner order matters: see [`ROOT_FACES`].
  fn root_points(&self, formation: &Formation) -> [DVec3; 4];

  /// Where the vertex splitting edge `a`-`b` goes, formation-local.
  ///
  /// Must be symmetric in `a` and `b` so neighbouring nodes agree.
  fn mid_point(&self, formation: &Formation, a: DVec3, b: DVec3) -> DVec3;
}

/// Corner indices of the four root faces.
///
/// Each face is wound counter-clockwise from outside, and an edge shared by
/// two faces sits opposite the same corner slot in both. Child nodes inherit
/// that property, which is what lets cousins be found by edge index alone.
pub const ROOT_FACES: [[usize; 3]; 4] = [[2, 1, 0], [3, 0, 1], [0, 3, 2], [1, 2, 3]];

/// Tetrahedron directions matching [`ROOT_FACES`] winding.
pub const ROOT_DIRECTIONS: [DVec3; 4] = [
  DVec3::new(-1.0, -1.0, -1.0),
  DVec3::new(-1.0, 1.0, 1.0),
  DVec3::new(1.0, -1.0, 1.0),
  DVec3::new(1.0, 1.0, -1.0),
];

/// A perfectly round body.
#[derive(Clone, Copy, Debug, Default)]
pub struct SphereShader;

impl Shader for SphereShader {
  fn root_points(&self, formation: &Formation) -> [DVec3; 4] {
    ROOT_DIRECTIONS.map(|direction| direction.normalize() * formation.radius)
  }

  fn mid_point(&self, formation: &Formation, a: DVec3, b: DVec3) -> DVec3 {
    let mid = (a + b) * 0.5;
    mid.normalize_or_zero() * formation.radius
  }
}

/// A body the surface generator should represent.
#[derive(Clone)]
pub struct Formation {
  pub id: FormationId,

  /// Absolute centre.
  pub position: DVec3,

  /// Nominal radius, in world units.
  pub radius: f64,

  /// Seed handed to the shader.
  pub seed: u32,

  pub shader: Arc<dyn Shader>,
}

impl Formation {
  /// Sphere of `radius` centred on `position`.
  pub fn sphere(position: DVec3, radius: f64) -> Self {
    Self::new(position, radius, 0, Arc::new(SphereShader))
  }

  pub fn new(position: DVec3, radius: f64, seed: u32, shader: Arc<dyn Shader>) -> Self {
    Self {
      id: FormationId::new(),
      position,
      radius,
      seed,
      shader,
    }
  }
}

impl fmt::Debug for Formation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Formation")
      .field("id", &self.id)
      .field("position", &self.position)
      .field("radius", &self.radius)
      .field("seed", &self.seed)
      .finish_non_exhaustive()
  }
}
