//! Spatial queries against the faces of a formation's tree.
//!
//! Descends from the root faces, pruning any node whose pyramid (apex at the
//! formation centre, sides through the node's edges) misses the shape. Every
//! descendant of a node lies inside its pyramid for star-shaped formations,
//! so pruning never drops a face that touches the shape.

use glam::Vec3;
use smallvec::SmallVec;

use crate::geom::{touches_projection, Sphere3, Triangle3};
use crate::tree::faces::for_each_node_face;
use crate::tree::node::NodeIndex;
use crate::tree::quaterna::QuaternaIndex;
use crate::tree::store::NodeStore;

/// A volume faces can be tested against.
pub trait QueryShape {
  /// Coarse test: might the shape reach into the pyramid from `tip` through
  /// `base`? False positives are fine, false negatives are not.
  fn touches_projection(&self, tip: Vec3, base: &Triangle3) -> bool;

  /// Exact test against one face.
  fn intersects(&self, face: &Triangle3) -> bool;
}

impl QueryShape for Sphere3 {
  #[inline]
  fn touches_projection(&self, tip: Vec3, base: &Triangle3) -> bool {
    touches_projection(tip, base, self)
  }

  #[inline]
  fn intersects(&self, face: &Triangle3) -> bool {
    face.intersects_sphere(self)
  }
}

/// Call `f` with every face under `root` that intersects `shape`.
///
/// `tip` is the formation centre relative to the surface origin. Nodes whose
/// edges are no longer than `min_edge_length` are treated as leaves.
pub fn for_each_face_in_shape<S, F>(
  store: &NodeStore,
  root: QuaternaIndex,
  tip: Vec3,
  shape: &S,
  min_edge_length: f32,
  mut f: F,
) where
  S: QueryShape + ?Sized,
  F: FnMut(&Triangle3),
{
  let min_edge_length_squared = min_edge_length * min_edge_length;
  let mut stack: SmallVec<[NodeIndex; 64]> = SmallVec::new();
  stack.extend(root.nodes());

  while let Some(node) = stack.pop() {
    let n = store.node(node);
    if !shape.touches_projection(tip, &n.triangle()) {
      continue;
    }
    match n.children {
      Some(children) if n.min_edge_length_squared() > min_edge_length_squared => {
        stack.extend(children.nodes());
      }
      _ => for_each_node_face(store, node, |face| {
        if shape.intersects(&face) {
          f(&face);
        }
      }),
    }
  }
}

#[cfg(test)]
#[path = "query_test.rs"]
mod query_test;
