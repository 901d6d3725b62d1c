use super::*;

fn flat_node() -> Node {
  Node::from_corners([
    Vec3::new(0.0, 0.0, 0.0),
    Vec3::new(2.0, 0.0, 0.0),
    Vec3::new(0.0, 2.0, 0.0),
  ])
}

fn mid_points(node: &Node) -> [Vec3; 3] {
  [0, 1, 2].map(|edge| {
    let (a, b) = node.edge(edge);
    (a + b) * 0.5
  })
}

#[test]
fn test_from_corners() {
  let node = flat_node();
  assert_eq!(node.normal, Vec3::Z);
  assert!((node.area - 2.0).abs() < 1e-6);
  assert!(node.is_leaf());
  assert!(!node.has_all_cousins());
}

#[test]
fn test_node_index_layout() {
  let index = NodeIndex::new(13);
  assert_eq!(index.quaterna(), QuaternaIndex::new(3));
  assert_eq!(index.slot(), 1);
}

#[test]
fn test_children_tile_parent() {
  let node = flat_node();
  let children = node.child_corners(mid_points(&node));

  let total: f32 = children
    .iter()
    .map(|corners| Node::from_corners(*corners).area)
    .sum();
  assert!((total - node.area).abs() < 1e-5);

  // All children keep the parent's winding.
  for corners in children {
    assert_eq!(Node::from_corners(corners).normal, Vec3::Z);
  }
}

#[test]
fn test_children_share_edges_with_centre() {
  let node = flat_node();
  let children = node.child_corners(mid_points(&node));
  let centre = Node::from_corners(children[CENTER_CHILD]);

  // Child i and the centre meet along their edge i.
  for i in 0..3 {
    let child = Node::from_corners(children[i]);
    let (a, b) = child.edge(i);
    let (c, d) = centre.edge(i);
    assert_eq!((a, b), (d, c));
  }
}

#[test]
fn test_min_edge_length() {
  let node = flat_node();
  assert!((node.min_edge_length_squared() - 4.0).abs() < 1e-6);
}
