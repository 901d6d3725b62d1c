//! NodeStore - fixed-capacity arena of quaterna.
//!
//! Quaterna are handed out from a free list and returned on collapse, so the
//! store never reallocates after construction. Cousin links are kept mutual:
//! whenever one side of an edge gains or loses a neighbour, so does the other.

use glam::Vec3;
use rayon::prelude::*;

use crate::constants::{tri_mod, CENTER_CHILD, NUM_CORNERS_PER_NODE, NUM_NODES_PER_QUATERNA};
use crate::error::SurfaceError;
use crate::formation::{FormationId, ROOT_FACES};
use crate::tree::node::{Node, NodeIndex};
use crate::tree::quaterna::{Quaterna, QuaternaIndex, QuaternaParent};

#[derive(Clone, Debug)]
pub struct NodeStore {
  nodes: Vec<Node>,
  quaterna: Vec<Quaterna>,
  free: Vec<QuaternaIndex>,
  num_used: usize,
  next_seq: u64,
}

impl NodeStore {
  /// Store holding at most `capacity` quaterna.
  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      nodes: vec![Node::UNUSED; capacity * NUM_NODES_PER_QUATERNA],
      quaterna: vec![Quaterna::UNUSED; capacity],
      // Reversed so the lowest slots are handed out first.
      free: (0..capacity).rev().map(QuaternaIndex::new).collect(),
      num_used: 0,
      next_seq: 0,
    }
  }

  #[inline]
  pub fn capacity(&self) -> usize {
    self.quaterna.len()
  }

  /// Quaterna in use, roots included.
  #[inline]
  pub fn num_quaterna_used(&self) -> usize {
    self.num_used
  }

  #[inline]
  pub fn num_nodes_used(&self) -> usize {
    self.num_used * NUM_NODES_PER_QUATERNA
  }

  #[inline]
  pub fn has_free_capacity(&self) -> bool {
    !self.free.is_empty()
  }

  #[inline]
  pub fn node(&self, node: NodeIndex) -> &Node {
    &self.nodes[node.index()]
  }

  #[inline]
  pub fn quaterna(&self, quaterna: QuaternaIndex) -> &Quaterna {
    &self.quaterna[quaterna.index()]
  }

  /// Formation a node's surface belongs to.
  #[inline]
  pub fn formation_of(&self, node: NodeIndex) -> Option<FormationId> {
    self.quaterna(node.quaterna()).formation
  }

  /// Parent of `node`, or `None` for root faces.
  #[inline]
  pub fn parent_of(&self, node: NodeIndex) -> Option<NodeIndex> {
    self.quaterna(node.quaterna()).parent_node()
  }

  pub fn used_quaterna(&self) -> impl Iterator<Item = QuaternaIndex> + '_ {
    self
      .quaterna
      .iter()
      .enumerate()
      .filter(|(_, quaterna)| quaterna.is_in_use())
      .map(|(index, _)| QuaternaIndex::new(index))
  }

  pub fn leaves(&self) -> impl Iterator<Item = NodeIndex> + '_ {
    self
      .used_quaterna()
      .flat_map(QuaternaIndex::nodes)
      .filter(move |node| self.node(*node).is_leaf())
  }

  /// A leaf may split if it has a neighbour on every edge and is not too
  /// small. Capacity is not considered.
  pub fn can_split(&self, node: NodeIndex, min_edge_length_squared: f32) -> bool {
    let n = self.node(node);
    self.quaterna(node.quaterna()).is_in_use()
      && n.is_leaf()
      && n.has_all_cousins()
      && n.min_edge_length_squared() > min_edge_length_squared
  }

  /// [`can_split`](Self::can_split), and there is room for the children.
  #[inline]
  pub fn is_expandable(&self, node: NodeIndex, min_edge_length_squared: f32) -> bool {
    self.has_free_capacity() && self.can_split(node, min_edge_length_squared)
  }

  /// A quaterna may be removed if it is not a root and neither its nodes nor
  /// their cousins have children. The cousin rule keeps neighbouring leaves
  /// within one level of each other, which the face fan relies on.
  pub fn is_collapsible(&self, quaterna: QuaternaIndex) -> bool {
    let q = self.quaterna(quaterna);
    q.is_in_use()
      && !q.is_root()
      && quaterna.nodes().iter().all(|node| {
        let n = self.node(*node);
        n.is_leaf() && n.cousins.iter().flatten().all(|cousin| self.node(*cousin).is_leaf())
      })
  }

  /// Allocate the four root faces of a formation from its tetrahedron.
  pub fn alloc_root(
    &mut self,
    formation: FormationId,
    points: [Vec3; 4],
  ) -> Result<QuaternaIndex, SurfaceError> {
    let root = self.alloc(QuaternaParent::Root, Some(formation), f32::INFINITY)?;
    for (slot, face) in ROOT_FACES.iter().enumerate() {
      self.nodes[root.node(slot).index()] = Node::from_corners(face.map(|corner| points[corner]));
    }

    let edge_of = |face: [usize; 3], edge: usize| {
      let (a, b) = (face[tri_mod(edge + 1)], face[tri_mod(edge + 2)]);
      (a.min(b), a.max(b))
    };
    for a in 0..NUM_NODES_PER_QUATERNA {
      for b in (a + 1)..NUM_NODES_PER_QUATERNA {
        for edge in 0..NUM_CORNERS_PER_NODE {
          if edge_of(ROOT_FACES[a], edge) == edge_of(ROOT_FACES[b], edge) {
            self.set_cousins(root.node(a), root.node(b), edge);
          }
        }
      }
    }
    Ok(root)
  }

  /// Free a root quaterna along with everything below it.
  pub fn release_root(&mut self, root: QuaternaIndex) {
    debug_assert!(self.quaterna(root).is_root());
    for node in root.nodes() {
      self.collapse_subtree(node);
    }
    for node in root.nodes() {
      self.unlink(node);
      self.nodes[node.index()] = Node::UNUSED;
    }
    self.release(root);
  }

  /// Split a leaf into four children.
  ///
  /// `mid_points[i]` is the new vertex on edge `i`. Children start with the
  /// parent's score; the caller re-scores them.
  pub fn expand(
    &mut self,
    node: NodeIndex,
    mid_points: [Vec3; NUM_CORNERS_PER_NODE],
  ) -> Result<QuaternaIndex, SurfaceError> {
    let parent = *self.node(node);
    debug_assert!(parent.is_leaf(), "expanding a node that already has children");
    if let Some(children) = parent.children {
      return Ok(children);
    }

    let formation = self.formation_of(node);
    let children = self.alloc(QuaternaParent::Node(node), formation, parent.score)?;
    for (slot, corners) in parent.child_corners(mid_points).into_iter().enumerate() {
      self.nodes[children.node(slot).index()] = Node {
        score: parent.score,
        ..Node::from_corners(corners)
      };
    }
    self.nodes[node.index()].children = Some(children);
    self.link_children(&parent, children);
    Ok(children)
  }

  /// Remove a collapsible quaterna, turning its parent back into a leaf.
  ///
  /// Returns false (and does nothing) for roots, or if a node below has children.
  pub fn collapse(&mut self, quaterna: QuaternaIndex) -> bool {
    let all_leaves = quaterna.nodes().iter().all(|node| self.node(*node).is_leaf());
    debug_assert!(all_leaves, "collapsing a quaterna with grandchildren");
    if !all_leaves {
      return false;
    }
    let Some(parent) = self.quaterna(quaterna).parent_node() else {
      return false;
    };

    for child in quaterna.nodes() {
      self.unlink(child);
      self.nodes[child.index()] = Node::UNUSED;
    }
    self.nodes[parent.index()].children = None;
    self.release(quaterna);
    true
  }

  /// Re-score every node in use and refresh each quaterna's parent score.
  pub fn update_scores<F>(&mut self, score: F)
  where
    F: Fn(&Node) -> f32 + Sync,
  {
    self
      .nodes
      .par_chunks_mut(NUM_NODES_PER_QUATERNA)
      .zip(self.quaterna.par_iter())
      .filter(|(_, quaterna)| quaterna.is_in_use())
      .for_each(|(nodes, _)| {
        for node in nodes {
          node.score = score(node);
        }
      });

    for quaterna in &mut self.quaterna {
      if let QuaternaParent::Node(parent) = quaterna.parent {
        quaterna.parent_score = self.nodes[parent.index()].score;
      }
    }
  }

  /// Score a single node in place (used on freshly split children).
  #[inline]
  pub fn set_score(&mut self, node: NodeIndex, score: f32) {
    self.nodes[node.index()].score = score;
  }

  /// Check structural invariants. Intended for tests and debug builds.
  pub fn check_invariants(&self) -> Result<(), String> {
    let in_use = self.quaterna.iter().filter(|q| q.is_in_use()).count();
    if in_use != self.num_used {
      return Err(format!("{} quaterna in use but count says {}", in_use, self.num_used));
    }
    if in_use + self.free.len() != self.capacity() {
      return Err(format!("{} used + {} free != {}", in_use, self.free.len(), self.capacity()));
    }

    for quaterna in self.used_quaterna() {
      if let Some(parent) = self.quaterna(quaterna).parent_node() {
        if !self.quaterna(parent.quaterna()).is_in_use() {
          return Err(format!("{:?} hangs off an unused quaterna", quaterna));
        }
        if self.node(parent).children != Some(quaterna) {
          return Err(format!("{:?} parent {:?} does not point back", quaterna, parent));
        }
      }

      for node in quaterna.nodes() {
        let n = self.node(node);
        if let Some(children) = n.children {
          if self.quaterna(children).parent != QuaternaParent::Node(node) {
            return Err(format!("{:?} children {:?} disown it", node, children));
          }
        }
        for (edge, cousin) in n.cousins.iter().enumerate() {
          let Some(cousin) = *cousin else { continue };
          if !self.quaterna(cousin.quaterna()).is_in_use() {
            return Err(format!("{:?} edge {} links to a free slot", node, edge));
          }
          if self.node(cousin).cousins[edge] != Some(node) {
            return Err(format!("{:?} edge {} cousin link is one-sided", node, edge));
          }
        }
      }
    }
    Ok(())
  }

  fn alloc(
    &mut self,
    parent: QuaternaParent,
    formation: Option<FormationId>,
    parent_score: f32,
  ) -> Result<QuaternaIndex, SurfaceError> {
    let quaterna = self.free.pop().ok_or(SurfaceError::StoreExhausted)?;
    self.quaterna[quaterna.index()] = Quaterna {
      parent,
      formation,
      parent_score,
      seq: self.next_seq,
    };
    self.next_seq += 1;
    self.num_used += 1;
    Ok(quaterna)
  }

  fn release(&mut self, quaterna: QuaternaIndex) {
    self.quaterna[quaterna.index()] = Quaterna::UNUSED;
    self.free.push(quaterna);
    self.num_used -= 1;
  }

  fn collapse_subtree(&mut self, node: NodeIndex) {
    if let Some(children) = self.node(node).children {
      for child in children.nodes() {
        self.collapse_subtree(child);
      }
      self.collapse(children);
    }
  }

  #[inline]
  fn set_cousins(&mut self, a: NodeIndex, b: NodeIndex, edge: usize) {
    self.nodes[a.index()].cousins[edge] = Some(b);
    self.nodes[b.index()].cousins[edge] = Some(a);
  }

  /// Drop every link pointing at `node`.
  fn unlink(&mut self, node: NodeIndex) {
    for edge in 0..NUM_CORNERS_PER_NODE {
      if let Some(cousin) = self.nodes[node.index()].cousins[edge].take() {
        self.nodes[cousin.index()].cousins[edge] = None;
      }
    }
  }

  /// Wire up cousins for freshly created children.
  ///
  /// Child `i` meets the centre child across edge `i`. Its other two edges
  /// lie on the parent's edges `i+1` and `i+2`, where the neighbour is a
  /// child of the parent's cousin, if that cousin is split.
  fn link_children(&mut self, parent: &Node, children: QuaternaIndex) {
    let center = children.node(CENTER_CHILD);
    for i in 0..NUM_CORNERS_PER_NODE {
      let child = children.node(i);
      let j = tri_mod(i + 1);
      let k = tri_mod(i + 2);

      self.set_cousins(child, center, i);

      if let Some(cousin_children) = parent.cousins[j].and_then(|cousin| self.node(cousin).children) {
        self.set_cousins(child, cousin_children.node(k), j);
      }
      if let Some(cousin_children) = parent.cousins[k].and_then(|cousin| self.node(cousin).children) {
        self.set_cousins(child, cousin_children.node(j), k);
      }
    }
  }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;
