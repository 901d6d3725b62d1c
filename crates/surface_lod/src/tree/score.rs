//! View-dependent node priority.
//!
//! Higher scores mean the node matters more to the observer: it is big, close
//! and facing the camera. The balancer splits high scores and collapses low
//! ones.

use glam::Vec3;
use rayon::prelude::*;

use crate::geom::CameraRay;
use crate::tree::node::{Node, NodeIndex};
use crate::tree::store::NodeStore;

/// Scores nodes against one camera position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoreFunctor {
  camera: CameraRay,
  min_distance_squared: f32,
}

impl ScoreFunctor {
  pub fn new(camera: CameraRay, min_score_distance: f32) -> Self {
    Self {
      camera,
      min_distance_squared: min_score_distance * min_score_distance,
    }
  }

  #[inline]
  pub fn camera(&self) -> &CameraRay {
    &self.camera
  }

  /// `area * e^(facing) / distance²`, with the distance clamped from below.
  ///
  /// `facing` is the cosine between the node normal and the direction to the
  /// camera, so nodes seen edge-on or from behind score lower. Only the
  /// camera position is used, not its direction.
  #[inline]
  pub fn score(&self, node: &Node) -> f32 {
    let to_camera = self.camera.position - node.center;
    let distance_squared = to_camera.length_squared();
    let direction = if distance_squared > 0.0 {
      to_camera / distance_squared.sqrt()
    } else {
      Vec3::X
    };
    let facing = direction.dot(node.normal).exp();
    node.area * facing / distance_squared.max(self.min_distance_squared)
  }
}

/// Summary of leaf scores after a tick, for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoreStats {
  /// Lowest and highest leaf score. Inverted (`[inf, -inf]`) with no leaves.
  pub leaf_score_range: [f32; 2],

  /// Squared distance from the camera to the nearest leaf centre.
  pub min_leaf_distance_squared: f32,
}

impl ScoreStats {
  pub const EMPTY: Self = Self {
    leaf_score_range: [f32::INFINITY, f32::NEG_INFINITY],
    min_leaf_distance_squared: f32::INFINITY,
  };

  /// Gather stats over every leaf of `store`.
  pub fn from_leaves(store: &NodeStore, camera: &CameraRay) -> Self {
    let leaves: Vec<NodeIndex> = store.leaves().collect();
    leaves
      .par_iter()
      .map(|leaf| {
        let node = store.node(*leaf);
        Self {
          leaf_score_range: [node.score, node.score],
          min_leaf_distance_squared: node.center.distance_squared(camera.position),
        }
      })
      .reduce(|| Self::EMPTY, Self::merge)
  }

  fn merge(self, other: Self) -> Self {
    Self {
      leaf_score_range: [
        self.leaf_score_range[0].min(other.leaf_score_range[0]),
        self.leaf_score_range[1].max(other.leaf_score_range[1]),
      ],
      min_leaf_distance_squared: self.min_leaf_distance_squared.min(other.min_leaf_distance_squared),
    }
  }
}

impl Default for ScoreStats {
  fn default() -> Self {
    Self::EMPTY
  }
}

#[cfg(test)]
#[path = "score_test.rs"]
mod score_test;
