use super::*;

use crate::formation::ROOT_DIRECTIONS;

fn tetrahedron() -> [Vec3; 4] {
  ROOT_DIRECTIONS.map(|direction| direction.as_vec3() * 100.0)
}

fn flat_mid_points(store: &NodeStore, node: NodeIndex) -> [Vec3; 3] {
  let n = store.node(node);
  [0, 1, 2].map(|edge| {
    let (a, b) = n.edge(edge);
    (a + b) * 0.5
  })
}

fn expand_flat(store: &mut NodeStore, node: NodeIndex) -> QuaternaIndex {
  let mid_points = flat_mid_points(store, node);
  store.expand(node, mid_points).unwrap()
}

fn store_with_root(capacity: usize) -> (NodeStore, QuaternaIndex) {
  let mut store = NodeStore::with_capacity(capacity);
  let root = store.alloc_root(FormationId::new(), tetrahedron()).unwrap();
  (store, root)
}

#[test]
fn test_root_faces_are_fully_linked() {
  let (store, root) = store_with_root(8);

  assert_eq!(store.num_quaterna_used(), 1);
  assert!(store.quaterna(root).is_root());
  assert_eq!(store.quaterna(root).parent_score, f32::INFINITY);
  for node in root.nodes() {
    assert!(store.node(node).has_all_cousins(), "{:?} is missing a cousin", node);
  }
  store.check_invariants().unwrap();
}

#[test]
fn test_expand_links_children() {
  let (mut store, root) = store_with_root(8);
  let children = expand_flat(&mut store, root.node(0));

  assert_eq!(store.num_quaterna_used(), 2);
  assert_eq!(store.parent_of(children.node(0)), Some(root.node(0)));
  assert!(!store.is_collapsible(root));
  assert!(store.is_collapsible(children));

  // Only the centre child has all of its neighbours yet.
  let center = store.node(children.node(CENTER_CHILD));
  assert!(center.has_all_cousins());
  for slot in 0..3 {
    assert!(!store.node(children.node(slot)).has_all_cousins());
  }
  store.check_invariants().unwrap();
}

#[test]
fn test_expanding_neighbour_connects_cousins() {
  let (mut store, root) = store_with_root(8);
  let first = expand_flat(&mut store, root.node(0));

  let neighbour = store.node(root.node(0)).cousins[0].unwrap();
  let second = expand_flat(&mut store, neighbour);

  let linked = first
    .nodes()
    .iter()
    .flat_map(|node| store.node(*node).cousins)
    .flatten()
    .filter(|cousin| cousin.quaterna() == second)
    .count();
  assert_eq!(linked, 2, "two children meet along the shared edge");
  store.check_invariants().unwrap();
}

#[test]
fn test_split_then_collapse_restores_state() {
  let (mut store, root) = store_with_root(8);
  let before = *store.node(root.node(1));

  let children = expand_flat(&mut store, root.node(1));
  assert!(store.collapse(children));

  assert_eq!(store.num_quaterna_used(), 1);
  assert_eq!(*store.node(root.node(1)), before);
  for node in root.nodes() {
    assert!(store.node(node).has_all_cousins());
  }
  store.check_invariants().unwrap();
}

#[test]
fn test_collapse_clears_cousin_links() {
  let (mut store, root) = store_with_root(8);
  let first = expand_flat(&mut store, root.node(0));
  let neighbour = store.node(root.node(0)).cousins[0].unwrap();
  let second = expand_flat(&mut store, neighbour);

  assert!(store.collapse(second));
  for node in first.nodes() {
    for cousin in store.node(node).cousins.iter().flatten() {
      assert_ne!(cousin.quaterna(), second);
    }
  }
  store.check_invariants().unwrap();
}

#[test]
fn test_roots_never_collapse() {
  let (mut store, root) = store_with_root(8);
  assert!(!store.is_collapsible(root));
  assert!(!store.collapse(root));
  assert_eq!(store.num_quaterna_used(), 1);
}

#[test]
fn test_store_exhaustion() {
  let (mut store, root) = store_with_root(1);
  assert!(!store.has_free_capacity());
  assert!(!store.is_expandable(root.node(0), 0.0));

  let mid_points = flat_mid_points(&store, root.node(0));
  assert_eq!(store.expand(root.node(0), mid_points), Err(SurfaceError::StoreExhausted));
  store.check_invariants().unwrap();
}

#[test]
fn test_release_root_frees_subtree() {
  let (mut store, root) = store_with_root(16);
  let children = expand_flat(&mut store, root.node(2));
  expand_flat(&mut store, children.node(CENTER_CHILD));
  assert_eq!(store.num_quaterna_used(), 3);

  store.release_root(root);
  assert_eq!(store.num_quaterna_used(), 0);
  assert_eq!(store.leaves().count(), 0);
  store.check_invariants().unwrap();
}

#[test]
fn test_leaves_and_scores() {
  let (mut store, root) = store_with_root(8);
  let children = expand_flat(&mut store, root.node(3));

  // Three untouched root faces plus four children.
  assert_eq!(store.leaves().count(), 7);

  store.update_scores(|node| node.area);
  let parent_area = store.node(root.node(3)).area;
  assert_eq!(store.quaterna(children).parent_score, parent_area);
  assert_eq!(store.quaterna(root).parent_score, f32::INFINITY);
}

#[test]
fn test_min_edge_length_blocks_expansion() {
  let (store, root) = store_with_root(8);
  let shortest = store.node(root.node(0)).min_edge_length_squared();
  assert!(store.is_expandable(root.node(0), 0.0));
  assert!(!store.is_expandable(root.node(0), shortest));
}

#[test]
fn test_collapse_waits_for_split_cousins() {
  let (mut store, root) = store_with_root(16);
  let first = expand_flat(&mut store, root.node(0));
  let neighbour = store.node(root.node(0)).cousins[0].unwrap();
  let second = expand_flat(&mut store, neighbour);

  // Split a child of `second` that borders `first`.
  let bordering = second
    .nodes()
    .into_iter()
    .find(|node| {
      store
        .node(*node)
        .cousins
        .iter()
        .flatten()
        .any(|cousin| cousin.quaterna() == first)
    })
    .unwrap();
  let grandchildren = expand_flat(&mut store, bordering);

  assert!(!store.is_collapsible(first));
  assert!(store.collapse(grandchildren));
  assert!(store.is_collapsible(first));
  store.check_invariants().unwrap();
}
