use std::collections::HashMap;

use super::*;

use crate::formation::{FormationId, ROOT_DIRECTIONS};
use crate::tree::NodeIndex;

const RADIUS: f32 = 50.0;

/// Sphere tree with uneven detail: splits accumulate near `focus`.
fn uneven_store(focus: Vec3, capacity: usize) -> NodeStore {
  let mut store = NodeStore::with_capacity(capacity);
  let points = ROOT_DIRECTIONS.map(|direction| direction.as_vec3().normalize() * RADIUS);
  store.alloc_root(FormationId::new(), points).unwrap();

  while store.has_free_capacity() {
    let nearest = store
      .leaves()
      .filter(|leaf| store.is_expandable(*leaf, 0.0))
      .min_by(|a, b| {
        let da = store.node(*a).center.distance_squared(focus);
        let db = store.node(*b).center.distance_squared(focus);
        da.total_cmp(&db)
      });
    let Some(leaf): Option<NodeIndex> = nearest else {
      break;
    };
    let n = *store.node(leaf);
    let mid_points = [0, 1, 2].map(|edge| {
      let (a, b) = n.edge(edge);
      ((a + b) * 0.5).normalize() * RADIUS
    });
    store.expand(leaf, mid_points).unwrap();
  }
  store
}

#[test]
fn test_mesh_is_watertight() {
  let store = uneven_store(Vec3::new(0.0, RADIUS, 0.0), 48);
  let mesh = generate_mesh(&store, MeshProperties::default());
  assert!(!mesh.is_empty());

  // Every directed edge must appear once, with its reverse used once by the
  // neighbouring face. A T-junction breaks this.
  let mut edges: HashMap<(u32, u32), usize> = HashMap::new();
  for triangle in mesh.indices.chunks_exact(3) {
    for i in 0..3 {
      *edges.entry((triangle[i], triangle[(i + 1) % 3])).or_default() += 1;
    }
  }
  for (&(a, b), &count) in &edges {
    assert_eq!(count, 1, "edge {}-{} used {} times", a, b, count);
    assert_eq!(edges.get(&(b, a)), Some(&1), "edge {}-{} has no twin", a, b);
  }

  // Closed genus-0 surface.
  let v = mesh.vertices.len() as i64;
  let e = edges.len() as i64 / 2;
  let f = mesh.triangle_count() as i64;
  assert_eq!(v - e + f, 2);
}

#[test]
fn test_normals_point_outward() {
  let store = uneven_store(Vec3::new(RADIUS, 0.0, 0.0), 32);
  let mesh = generate_mesh(&store, MeshProperties::default());

  for vertex in &mesh.vertices {
    let position = Vec3::from_array(vertex.position);
    let normal = Vec3::from_array(vertex.normal);
    assert!((normal.length() - 1.0).abs() < 1e-4);
    assert!(normal.dot(position) > 0.0);
  }
}

#[test]
fn test_bounds_and_properties() {
  let store = uneven_store(Vec3::new(0.0, 0.0, RADIUS), 16);
  let properties = MeshProperties {
    origin: DVec3::new(1.0, 2.0, 3.0),
    num_quaterna: store.num_quaterna_used(),
    generation: 7,
    ..MeshProperties::default()
  };
  let mesh = generate_mesh(&store, properties);

  assert!(mesh.bounds.is_valid());
  assert!(mesh.bounds.max.iter().all(|&c| c <= RADIUS + 1e-3));
  assert!(mesh.bounds.min.iter().all(|&c| c >= -RADIUS - 1e-3));
  assert_eq!(mesh.properties, properties);
}

#[test]
fn test_empty_store_gives_empty_mesh() {
  let mesh = generate_mesh(&NodeStore::with_capacity(4), MeshProperties::default());
  assert!(mesh.is_empty());
  assert_eq!(mesh.triangle_count(), 0);
  assert!(!mesh.bounds.is_valid());
}
