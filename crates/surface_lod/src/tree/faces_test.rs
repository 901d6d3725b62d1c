use super::*;

use crate::formation::{FormationId, ROOT_DIRECTIONS};
use crate::tree::quaterna::QuaternaIndex;

fn store_with_root() -> (NodeStore, QuaternaIndex) {
  let mut store = NodeStore::with_capacity(16);
  let points = ROOT_DIRECTIONS.map(|direction| direction.as_vec3() * 10.0);
  let root = store.alloc_root(FormationId::new(), points).unwrap();
  (store, root)
}

fn split(store: &mut NodeStore, node: NodeIndex) {
  let n = *store.node(node);
  let mid_points = [0, 1, 2].map(|edge| {
    let (a, b) = n.edge(edge);
    (a + b) * 0.5
  });
  store.expand(node, mid_points).unwrap();
}

fn faces(store: &NodeStore, node: NodeIndex) -> Vec<Triangle3> {
  let mut faces = Vec::new();
  for_each_node_face(store, node, |face| faces.push(face));
  faces
}

fn assert_tiles(store: &NodeStore, node: NodeIndex, expected: usize) {
  let n = store.node(node);
  let faces = faces(store, node);
  assert_eq!(faces.len(), expected);

  let area: f32 = faces.iter().map(Triangle3::area).sum();
  assert!((area - n.area).abs() < 1e-3 * n.area, "faces do not cover the node");
  for face in &faces {
    assert!(face.unit_normal().dot(n.normal) > 0.999, "face winding flipped");
  }
}

#[test]
fn test_unsplit_neighbourhood_is_one_face() {
  let (store, root) = store_with_root();
  assert_tiles(&store, root.node(0), 1);
}

#[test]
fn test_face_count_follows_split_cousins() {
  let (mut store, root) = store_with_root();
  let target = root.node(0);
  let cousins = store.node(target).cousins.map(Option::unwrap);

  split(&mut store, cousins[0]);
  assert_tiles(&store, target, 2);

  split(&mut store, cousins[1]);
  assert_tiles(&store, target, 3);

  split(&mut store, cousins[2]);
  assert_tiles(&store, target, 4);
}

#[test]
fn test_mid_point_shared_across_edge() {
  let (mut store, root) = store_with_root();
  let target = root.node(1);
  split(&mut store, target);

  for edge in 0..3 {
    let cousin = store.node(target).cousins[edge].unwrap();
    assert_eq!(
      edge_mid_point(&store, target, edge),
      edge_mid_point(&store, cousin, edge),
    );
  }
}

#[test]
fn test_split_node_faces_match_children() {
  let (mut store, root) = store_with_root();
  split(&mut store, root.node(2));
  assert_tiles(&store, root.node(2), 4);
}
