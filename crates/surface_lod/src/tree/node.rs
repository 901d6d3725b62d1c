//! Node - one triangle of the subdivided surface.

use glam::Vec3;

use crate::constants::{tri_mod, CENTER_CHILD, NUM_CORNERS_PER_NODE, NUM_NODES_PER_QUATERNA};
use crate::geom::Triangle3;
use crate::tree::quaterna::QuaternaIndex;

/// Position of a node in the store. Node `n` lives in quaterna `n / 4`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NodeIndex(pub(crate) u32);

impl NodeIndex {
  #[inline]
  pub fn new(index: usize) -> Self {
    Self(index as u32)
  }

  #[inline]
  pub fn index(self) -> usize {
    self.0 as usize
  }

  /// The quaterna this node belongs to.
  #[inline]
  pub fn quaterna(self) -> QuaternaIndex {
    QuaternaIndex::new(self.index() / NUM_NODES_PER_QUATERNA)
  }

  /// Slot within its quaterna (3 = centre child).
  #[inline]
  pub fn slot(self) -> usize {
    self.index() % NUM_NODES_PER_QUATERNA
  }
}

/// A triangle of the surface.
///
/// Corners are counter-clockwise seen from outside. Edge `i` is the edge
/// opposite corner `i`, and `cousins[i]` is the node across that edge at the
/// same depth, if one exists.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Node {
  pub corners: [Vec3; NUM_CORNERS_PER_NODE],
  pub center: Vec3,
  pub normal: Vec3,
  pub area: f32,
  pub score: f32,
  pub cousins: [Option<NodeIndex>; NUM_CORNERS_PER_NODE],
  pub children: Option<QuaternaIndex>,
}

impl Node {
  /// A slot that holds no triangle.
  pub const UNUSED: Self = Self {
    corners: [Vec3::ZERO; NUM_CORNERS_PER_NODE],
    center: Vec3::ZERO,
    normal: Vec3::ZERO,
    area: 0.0,
    score: 0.0,
    cousins: [None; NUM_CORNERS_PER_NODE],
    children: None,
  };

  /// Node spanning `corners` with no links yet.
  pub fn from_corners(corners: [Vec3; NUM_CORNERS_PER_NODE]) -> Self {
    let triangle = Triangle3 { points: corners };
    Self {
      corners,
      center: triangle.center(),
      normal: triangle.unit_normal(),
      area: triangle.area(),
      ..Self::UNUSED
    }
  }

  #[inline]
  pub fn is_leaf(&self) -> bool {
    self.children.is_none()
  }

  #[inline]
  pub fn has_all_cousins(&self) -> bool {
    self.cousins.iter().all(Option::is_some)
  }

  #[inline]
  pub fn triangle(&self) -> Triangle3 {
    Triangle3 { points: self.corners }
  }

  /// End points of edge `edge` (the edge opposite corner `edge`).
  #[inline]
  pub fn edge(&self, edge: usize) -> (Vec3, Vec3) {
    (self.corners[tri_mod(edge + 1)], self.corners[tri_mod(edge + 2)])
  }

  /// Squared length of the shortest edge.
  pub fn min_edge_length_squared(&self) -> f32 {
    (0..NUM_CORNERS_PER_NODE)
      .map(|edge| {
        let (a, b) = self.edge(edge);
        a.distance_squared(b)
      })
      .fold(f32::INFINITY, f32::min)
  }

  /// Corners of the four children given the three edge mid-points.
  ///
  /// `mid_points[i]` splits edge `i`. Child `i` keeps corner `i`, the centre
  /// child is made of the mid-points alone.
  pub fn child_corners(
    &self,
    mid_points: [Vec3; NUM_CORNERS_PER_NODE],
  ) -> [[Vec3; NUM_CORNERS_PER_NODE]; NUM_NODES_PER_QUATERNA] {
    let mut children = [[Vec3::ZERO; NUM_CORNERS_PER_NODE]; NUM_NODES_PER_QUATERNA];
    for i in 0..NUM_CORNERS_PER_NODE {
      let j = tri_mod(i + 1);
      let k = tri_mod(i + 2);
      children[i][i] = self.corners[i];
      children[i][j] = mid_points[k];
      children[i][k] = mid_points[j];
      children[CENTER_CHILD][i] = mid_points[i];
    }
    children
  }
}

impl Default for Node {
  fn default() -> Self {
    Self::UNUSED
  }
}

#[cfg(test)]
#[path = "node_test.rs"]
mod node_test;
