use super::*;

use crate::formation::{FormationId, ROOT_DIRECTIONS};

const RADIUS: f32 = 100.0;

/// Sphere-shaped tree refined around `focus`, plus its root.
fn refined_store(focus: Vec3, target: usize) -> (NodeStore, QuaternaIndex) {
  let mut store = NodeStore::with_capacity(target);
  let points = ROOT_DIRECTIONS.map(|direction| direction.as_vec3().normalize() * RADIUS);
  let root = store.alloc_root(FormationId::new(), points).unwrap();

  // Split the leaf nearest the focus until the store is full.
  while store.has_free_capacity() {
    let Some(leaf) = store
      .leaves()
      .filter(|leaf| store.is_expandable(*leaf, 0.0))
      .min_by(|a, b| {
        let da = store.node(*a).center.distance_squared(focus);
        let db = store.node(*b).center.distance_squared(focus);
        da.total_cmp(&db)
      })
    else {
      break;
    };
    let n = *store.node(leaf);
    let mid_points = [0, 1, 2].map(|edge| {
      let (a, b) = n.edge(edge);
      ((a + b) * 0.5).normalize() * RADIUS
    });
    store.expand(leaf, mid_points).unwrap();
  }
  (store, root)
}

fn brute_force(store: &NodeStore, sphere: &Sphere3) -> usize {
  let mut count = 0;
  for leaf in store.leaves() {
    for_each_node_face(store, leaf, |face| {
      if face.intersects_sphere(sphere) {
        count += 1;
      }
    });
  }
  count
}

fn query(store: &NodeStore, root: QuaternaIndex, sphere: &Sphere3, min_edge_length: f32) -> Vec<Triangle3> {
  let mut faces = Vec::new();
  for_each_face_in_shape(store, root, Vec3::ZERO, sphere, min_edge_length, |face| {
    faces.push(*face)
  });
  faces
}

#[test]
fn test_query_matches_brute_force() {
  let focus = Vec3::new(0.0, 0.0, RADIUS);
  let (store, root) = refined_store(focus, 96);

  for sphere in [
    Sphere3::new(focus, 5.0),
    Sphere3::new(Vec3::new(60.0, 0.0, 80.0), 20.0),
    Sphere3::new(Vec3::new(0.0, -RADIUS, 0.0), 30.0),
  ] {
    let faces = query(&store, root, &sphere, 0.0);
    assert!(!faces.is_empty());
    assert_eq!(faces.len(), brute_force(&store, &sphere));
    assert!(faces.iter().all(|face| face.intersects_sphere(&sphere)));
  }
}

#[test]
fn test_distant_sphere_finds_nothing() {
  let (store, root) = refined_store(Vec3::new(0.0, 0.0, RADIUS), 32);
  let faces = query(&store, root, &Sphere3::new(Vec3::new(0.0, 0.0, 10.0 * RADIUS), 1.0), 0.0);
  assert!(faces.is_empty());

  // Deep inside the body is also clear of the surface.
  let faces = query(&store, root, &Sphere3::new(Vec3::ZERO, 1.0), 0.0);
  assert!(faces.is_empty());
}

#[test]
fn test_depth_cutoff_uses_coarse_faces() {
  let focus = Vec3::new(0.0, 0.0, RADIUS);
  let (store, root) = refined_store(focus, 64);
  let sphere = Sphere3::new(focus, 2.0);

  let fine = query(&store, root, &sphere, 0.0);
  let coarse = query(&store, root, &sphere, 10.0 * RADIUS);
  assert!(!coarse.is_empty());

  let smallest = |faces: &[Triangle3]| faces.iter().map(Triangle3::area).fold(f32::INFINITY, f32::min);
  assert!(smallest(&coarse) > smallest(&fine));
}
