//! Surface - one origin-relative tree covering every formation.
//!
//! Geometry is stored in `f32` relative to the surface origin. Shaders see
//! formation-local `f64` positions; the surface converts both ways.

use std::collections::BTreeMap;

use glam::{DVec3, Vec3};

use crate::config::SurfaceConfig;
use crate::constants::NUM_CORNERS_PER_NODE;
use crate::error::SurfaceError;
use crate::formation::{Formation, FormationId};
use crate::geom::{CameraRay, Triangle3};
use crate::mesh::{generate_mesh, MeshProperties, MeshSnapshot};
use crate::tree::{
  for_each_face_in_shape, rebalance, BalanceOptions, Node, NodeGeometry, NodeIndex, NodeStore,
  QuaternaIndex, QueryShape, RebalanceStats, ScoreFunctor, ScoreStats,
};

#[derive(Clone, Debug)]
struct FormationEntry {
  formation: Formation,
  root: QuaternaIndex,
}

#[derive(Clone, Debug)]
pub struct Surface {
  config: SurfaceConfig,
  store: NodeStore,
  origin: DVec3,
  camera: CameraRay,
  formations: BTreeMap<FormationId, FormationEntry>,
  target_num_quaterna: usize,
  score_stats: ScoreStats,
}

impl Surface {
  pub fn new(config: SurfaceConfig) -> Self {
    Self {
      store: NodeStore::with_capacity(config.max_num_quaterna),
      origin: DVec3::ZERO,
      camera: CameraRay::INVALID,
      formations: BTreeMap::new(),
      target_num_quaterna: config.min_num_quaterna.min(config.max_num_quaterna),
      score_stats: ScoreStats::EMPTY,
      config,
    }
  }

  #[inline]
  pub fn config(&self) -> &SurfaceConfig {
    &self.config
  }

  #[inline]
  pub fn store(&self) -> &NodeStore {
    &self.store
  }

  #[inline]
  pub fn origin(&self) -> DVec3 {
    self.origin
  }

  /// Camera used for the most recent scores.
  #[inline]
  pub fn camera_ray(&self) -> &CameraRay {
    &self.camera
  }

  #[inline]
  pub fn score_stats(&self) -> &ScoreStats {
    &self.score_stats
  }

  #[inline]
  pub fn num_quaterna_used(&self) -> usize {
    self.store.num_quaterna_used()
  }

  #[inline]
  pub fn num_nodes_used(&self) -> usize {
    self.store.num_nodes_used()
  }

  #[inline]
  pub fn target_num_quaterna(&self) -> usize {
    self.target_num_quaterna
  }

  /// Capped at the store's capacity; range clamping is the caller's job.
  pub fn set_target_num_quaterna(&mut self, target: usize) {
    self.target_num_quaterna = target.min(self.store.capacity());
  }

  /// Still short of the target quaterna count.
  #[inline]
  pub fn is_growing(&self) -> bool {
    self.store.num_quaterna_used() < self.target_num_quaterna
  }

  pub fn formations(&self) -> impl Iterator<Item = &Formation> + '_ {
    self.formations.values().map(|entry| &entry.formation)
  }

  pub fn contains_formation(&self, id: FormationId) -> bool {
    self.formations.contains_key(&id)
  }

  /// Registering the same formation twice is a caller bug: fatal in debug
  /// builds, an error in release builds.
  pub fn add_formation(&mut self, formation: Formation) -> Result<(), SurfaceError> {
    let duplicate = self.formations.contains_key(&formation.id);
    debug_assert!(!duplicate, "formation {:?} registered twice", formation.id);
    if duplicate {
      return Err(SurfaceError::DuplicateFormation(formation.id));
    }
    let root = self.alloc_root(&formation)?;
    self.formations.insert(formation.id, FormationEntry { formation, root });
    Ok(())
  }

  pub fn remove_formation(&mut self, id: FormationId) -> Result<Formation, SurfaceError> {
    let entry = self
      .formations
      .remove(&id)
      .ok_or(SurfaceError::UnknownFormation(id))?;
    self.store.release_root(entry.root);
    Ok(entry.formation)
  }

  /// Re-base onto `origin`. Every formation restarts from its root faces.
  pub fn set_origin(&mut self, origin: DVec3) {
    for entry in self.formations.values() {
      self.store.release_root(entry.root);
    }
    self.origin = origin;
    self.score_stats = ScoreStats::EMPTY;

    let ids: Vec<FormationId> = self.formations.keys().copied().collect();
    for id in ids {
      let Some(formation) = self.formations.get(&id).map(|entry| entry.formation.clone()) else {
        continue;
      };
      match self.alloc_root(&formation) {
        Ok(root) => {
          if let Some(entry) = self.formations.get_mut(&id) {
            entry.root = root;
          }
        }
        Err(err) => {
          tracing::warn!(?id, "dropping formation on re-base: {}", err);
          self.formations.remove(&id);
        }
      }
    }
  }

  /// Re-score every node against `camera`.
  ///
  /// A non-finite ray leaves the previous scores and camera in place.
  pub fn update_scores(&mut self, camera: CameraRay) -> Result<(), SurfaceError> {
    if !camera.is_finite() {
      return Err(SurfaceError::NonFiniteCameraRay);
    }
    self.camera = camera;
    let scorer = self.scorer();
    self.store.update_scores(|node| scorer.score(node));
    Ok(())
  }

  /// Move the tree toward the target using the current scores.
  pub fn rebalance(&mut self) -> RebalanceStats {
    let geometry = SurfaceGeometry {
      formations: &self.formations,
      origin: self.origin,
      scorer: self.scorer(),
    };
    let options = BalanceOptions::from(&self.config);
    let stats = rebalance(&mut self.store, self.target_num_quaterna, &geometry, &options);
    self.score_stats = ScoreStats::from_leaves(&self.store, &self.camera);
    stats
  }

  /// Score against `camera` (if it is usable) and rebalance.
  #[tracing::instrument(skip_all, name = "surface::tick")]
  pub fn tick(&mut self, camera: CameraRay) -> RebalanceStats {
    if let Err(err) = self.update_scores(camera) {
      tracing::warn!("{}", err);
    }
    self.rebalance()
  }

  /// Snapshot of the current leaves.
  pub fn generate_mesh(&self, generation: u64) -> MeshSnapshot {
    let properties = MeshProperties::new(
      self.origin,
      self.store.num_quaterna_used(),
      &self.score_stats,
      generation,
    );
    generate_mesh(&self.store, properties)
  }

  /// Call `f` with every face (origin-relative) that intersects `shape`.
  pub fn for_each_intersection<S, F>(&self, shape: &S, mut f: F)
  where
    S: QueryShape + ?Sized,
    F: FnMut(&Triangle3),
  {
    for entry in self.formations.values() {
      let tip = (entry.formation.position - self.origin).as_vec3();
      for_each_face_in_shape(
        &self.store,
        entry.root,
        tip,
        shape,
        self.config.min_split_edge_length,
        &mut f,
      );
    }
  }

  #[inline]
  fn scorer(&self) -> ScoreFunctor {
    ScoreFunctor::new(self.camera, self.config.min_score_distance)
  }

  fn alloc_root(&mut self, formation: &Formation) -> Result<QuaternaIndex, SurfaceError> {
    let center = formation.position - self.origin;
    let points = formation
      .shader
      .root_points(formation)
      .map(|point| (center + point).as_vec3());
    let root = self.store.alloc_root(formation.id, points)?;

    let scorer = self.scorer();
    for node in root.nodes() {
      let score = scorer.score(self.store.node(node));
      self.store.set_score(node, score);
    }
    Ok(root)
  }
}

/// Splits nodes with their formation's shader.
struct SurfaceGeometry<'a> {
  formations: &'a BTreeMap<FormationId, FormationEntry>,
  origin: DVec3,
  scorer: ScoreFunctor,
}

impl NodeGeometry for SurfaceGeometry<'_> {
  fn mid_points(&self, store: &NodeStore, node: NodeIndex) -> Option<[Vec3; NUM_CORNERS_PER_NODE]> {
    let formation = &self.formations.get(&store.formation_of(node)?)?.formation;
    let n = store.node(node);
    let center = formation.position - self.origin;

    let mut mid_points = [Vec3::ZERO; NUM_CORNERS_PER_NODE];
    for (edge, mid_point) in mid_points.iter_mut().enumerate() {
      let (a, b) = n.edge(edge);
      let local = formation
        .shader
        .mid_point(formation, a.as_dvec3() - center, b.as_dvec3() - center);
      let point = (center + local).as_vec3();

      // Too small to represent: the new vertex landed on an end point.
      if !point.is_finite() || point == a || point == b {
        return None;
      }
      *mid_point = point;
    }
    Some(mid_points)
  }

  #[inline]
  fn score(&self, node: &Node) -> f32 {
    self.scorer.score(node)
  }
}

#[cfg(test)]
#[path = "surface_test.rs"]
mod surface_test;
