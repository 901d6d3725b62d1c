//! Quaterna - the four siblings created by one split.

use crate::constants::NUM_NODES_PER_QUATERNA;
use crate::formation::FormationId;
use crate::tree::node::NodeIndex;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct QuaternaIndex(pub(crate) u32);

impl QuaternaIndex {
  #[inline]
  pub fn new(index: usize) -> Self {
    Self(index as u32)
  }

  #[inline]
  pub fn index(self) -> usize {
    self.0 as usize
  }

  /// Node in `slot` (0..4) of this quaterna.
  #[inline]
  pub fn node(self, slot: usize) -> NodeIndex {
    debug_assert!(slot < NUM_NODES_PER_QUATERNA);
    NodeIndex::new(self.index() * NUM_NODES_PER_QUATERNA + slot)
  }

  /// All four nodes, in slot order.
  #[inline]
  pub fn nodes(self) -> [NodeIndex; NUM_NODES_PER_QUATERNA] {
    [0, 1, 2, 3].map(|slot| self.node(slot))
  }
}

/// What a quaterna hangs off.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum QuaternaParent {
  /// Slot is on the free list.
  Unused,
  /// The four faces of a formation's tetrahedron.
  Root,
  /// Children of a split node.
  Node(NodeIndex),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quaterna {
  pub parent: QuaternaParent,

  /// Formation whose surface these nodes belong to.
  pub formation: Option<FormationId>,

  /// Score of the parent node; roots score `f32::INFINITY`.
  pub parent_score: f32,

  /// Allocation order, used to break score ties and to spot reused slots.
  pub seq: u64,
}

impl Quaterna {
  pub const UNUSED: Self = Self {
    parent: QuaternaParent::Unused,
    formation: None,
    parent_score: 0.0,
    seq: 0,
  };

  #[inline]
  pub fn is_in_use(&self) -> bool {
    self.parent != QuaternaParent::Unused
  }

  #[inline]
  pub fn is_root(&self) -> bool {
    self.parent == QuaternaParent::Root
  }

  /// Parent node, if this is not a root.
  #[inline]
  pub fn parent_node(&self) -> Option<NodeIndex> {
    match self.parent {
      QuaternaParent::Node(node) => Some(node),
      _ => None,
    }
  }
}

impl Default for Quaterna {
  fn default() -> Self {
    Self::UNUSED
  }
}
