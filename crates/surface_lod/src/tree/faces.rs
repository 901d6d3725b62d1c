//! Crack-free triangulation of a node.
//!
//! A leaf next to a split cousin has an extra vertex in the middle of the
//! shared edge. Emitting the leaf as a single triangle would leave a
//! T-junction, so the leaf is fanned into 2, 3 or 4 faces that use every
//! mid-point present on its edges.

use glam::Vec3;

use crate::constants::{tri_mod, CENTER_CHILD, NUM_CORNERS_PER_NODE};
use crate::geom::Triangle3;
use crate::tree::node::NodeIndex;
use crate::tree::store::NodeStore;

/// Vertex splitting edge `edge` of `node`, if either side of it is split.
pub fn edge_mid_point(store: &NodeStore, node: NodeIndex, edge: usize) -> Option<Vec3> {
  let n = store.node(node);
  let split = match n.children {
    Some(children) => children,
    None => store.node(n.cousins[edge]?).children?,
  };
  Some(store.node(split.node(CENTER_CHILD)).corners[edge])
}

/// Call `f` with every face of `node`, wound like the node itself.
pub fn for_each_node_face<F>(store: &NodeStore, node: NodeIndex, mut f: F)
where
  F: FnMut(Triangle3),
{
  let corners = store.node(node).corners;
  let mid_points: [Option<Vec3>; NUM_CORNERS_PER_NODE] =
    [0, 1, 2].map(|edge| edge_mid_point(store, node, edge));

  match mid_points {
    [None, None, None] => f(Triangle3 { points: corners }),

    [Some(m0), Some(m1), Some(m2)] => {
      f(Triangle3::new(corners[0], m2, m1));
      f(Triangle3::new(corners[1], m0, m2));
      f(Triangle3::new(corners[2], m1, m0));
      f(Triangle3::new(m0, m1, m2));
    }

    _ => {
      let num_split = mid_points.iter().flatten().count();
      if num_split == 1 {
        // Fan from the corner opposite the split edge.
        let e = (0..NUM_CORNERS_PER_NODE).find(|&e| mid_points[e].is_some()).unwrap_or(0);
        let Some(m) = mid_points[e] else { return };
        let (a, b, c) = (corners[e], corners[tri_mod(e + 1)], corners[tri_mod(e + 2)]);
        f(Triangle3::new(a, b, m));
        f(Triangle3::new(a, m, c));
      } else {
        // Two split edges: cut off the corner between them, then the quad.
        let o = (0..NUM_CORNERS_PER_NODE).find(|&e| mid_points[e].is_none()).unwrap_or(0);
        let (Some(m1), Some(m2)) = (mid_points[tri_mod(o + 1)], mid_points[tri_mod(o + 2)]) else {
          return;
        };
        let (a, b, c) = (corners[o], corners[tri_mod(o + 1)], corners[tri_mod(o + 2)]);
        f(Triangle3::new(a, m2, m1));
        f(Triangle3::new(m2, b, c));
        f(Triangle3::new(m2, c, m1));
      }
    }
  }
}

#[cfg(test)]
#[path = "faces_test.rs"]
mod faces_test;
