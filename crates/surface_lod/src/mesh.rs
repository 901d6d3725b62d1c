//! Mesh snapshots handed from the scene to the consumer.
//!
//! A snapshot is an indexed triangle list built from every leaf of a surface.
//! Leaves bordering finer neighbours are fanned so the mesh is watertight,
//! and vertices shared between faces are welded by exact position.

use std::collections::HashMap;

use glam::{DVec3, Vec3};

use crate::tree::{for_each_node_face, NodeStore, ScoreStats};

/// Output vertex, relative to [`MeshProperties::origin`].
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vertex {
  pub position: [f32; 3],

  /// Unit normal averaged over the faces sharing this vertex.
  pub normal: [f32; 3],
}

impl Default for Vertex {
  fn default() -> Self {
    Self {
      position: [0.0; 3],
      normal: [0.0, 1.0, 0.0],
    }
  }
}

/// Axis-aligned bounding box.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MinMaxAABB {
  pub min: [f32; 3],
  pub max: [f32; 3],
}

impl MinMaxAABB {
  /// Inverted extents, ready for encapsulation.
  pub fn empty() -> Self {
    Self {
      min: [f32::INFINITY; 3],
      max: [f32::NEG_INFINITY; 3],
    }
  }

  #[inline]
  pub fn encapsulate(&mut self, point: [f32; 3]) {
    for i in 0..3 {
      self.min[i] = self.min[i].min(point[i]);
      self.max[i] = self.max[i].max(point[i]);
    }
  }

  /// min <= max on all axes.
  pub fn is_valid(&self) -> bool {
    self.min[0] <= self.max[0] && self.min[1] <= self.max[1] && self.min[2] <= self.max[2]
  }
}

impl Default for MinMaxAABB {
  fn default() -> Self {
    Self::empty()
  }
}

/// Scene state the mesh was generated from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshProperties {
  /// Absolute position vertex coordinates are relative to.
  pub origin: DVec3,

  /// Quaterna in use when the mesh was built.
  pub num_quaterna: usize,

  pub leaf_score_range: [f32; 2],

  pub min_leaf_distance_squared: f32,

  /// Increments with every snapshot the scene produces.
  pub generation: u64,
}

impl MeshProperties {
  pub fn new(origin: DVec3, num_quaterna: usize, stats: &ScoreStats, generation: u64) -> Self {
    Self {
      origin,
      num_quaterna,
      leaf_score_range: stats.leaf_score_range,
      min_leaf_distance_squared: stats.min_leaf_distance_squared,
      generation,
    }
  }
}

impl Default for MeshProperties {
  fn default() -> Self {
    Self::new(DVec3::ZERO, 0, &ScoreStats::EMPTY, 0)
  }
}

/// A complete, self-contained mesh.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshSnapshot {
  pub vertices: Vec<Vertex>,

  /// Triangle indices (3 per triangle), counter-clockwise from outside.
  pub indices: Vec<u32>,

  pub bounds: MinMaxAABB,

  pub properties: MeshProperties,
}

impl MeshSnapshot {
  pub fn is_empty(&self) -> bool {
    self.vertices.is_empty()
  }

  pub fn triangle_count(&self) -> usize {
    self.indices.len() / 3
  }
}

/// Build a welded mesh from every leaf of `store`.
#[tracing::instrument(skip_all, name = "mesh::generate")]
pub fn generate_mesh(store: &NodeStore, properties: MeshProperties) -> MeshSnapshot {
  let mut positions: Vec<Vec3> = Vec::new();
  let mut normals: Vec<Vec3> = Vec::new();
  let mut indices: Vec<u32> = Vec::new();
  let mut lookup: HashMap<[u32; 3], u32> = HashMap::new();

  for leaf in store.leaves() {
    for_each_node_face(store, leaf, |face| {
      // Area-weighted: the raw cross product's length is twice the area.
      let face_normal = face.normal();
      for point in face.points {
        let key = point.to_array().map(f32::to_bits);
        let index = *lookup.entry(key).or_insert_with(|| {
          positions.push(point);
          normals.push(Vec3::ZERO);
          (positions.len() - 1) as u32
        });
        normals[index as usize] += face_normal;
        indices.push(index);
      }
    });
  }

  let mut bounds = MinMaxAABB::empty();
  let vertices = positions
    .iter()
    .zip(&normals)
    .map(|(position, normal)| {
      bounds.encapsulate(position.to_array());
      Vertex {
        position: position.to_array(),
        normal: normal.normalize_or(Vec3::Y).to_array(),
      }
    })
    .collect();

  MeshSnapshot {
    vertices,
    indices,
    bounds,
    properties,
  }
}

#[cfg(test)]
#[path = "mesh_test.rs"]
mod mesh_test;
