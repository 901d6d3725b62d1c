//! Tree balancer - moves the quaterna count toward a target.
//!
//! Each call does one of three things:
//!
//! - **Grow**: split the highest-scoring expandable leaf until the target is
//!   met or nothing can split.
//! - **Shrink**: collapse the lowest-scoring collapsible quaterna until the
//!   target is met or only roots remain.
//! - **Churn**: at the target, swap a low-scoring quaterna for a high-scoring
//!   leaf while that improves the tree, up to a per-call limit.
//!
//! Candidates live in binary heaps and are validated lazily when they reach
//! the top, so stale entries left behind by earlier operations are skipped
//! rather than searched for. Equal scores are resolved by allocation order,
//! which keeps the result deterministic for a given input.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use glam::Vec3;

use crate::config::SurfaceConfig;
use crate::constants::{NUM_CORNERS_PER_NODE, NUM_NODES_PER_QUATERNA};
use crate::tree::node::{Node, NodeIndex};
use crate::tree::quaterna::QuaternaIndex;
use crate::tree::store::NodeStore;

/// Where new vertices go and how new nodes score.
pub trait NodeGeometry {
  /// Vertices splitting each edge of `node`, or `None` if it cannot be split.
  fn mid_points(&self, store: &NodeStore, node: NodeIndex) -> Option<[Vec3; NUM_CORNERS_PER_NODE]>;

  fn score(&self, node: &Node) -> f32;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BalanceOptions {
  /// Leaves whose shortest edge is at most this long never split.
  pub min_split_edge_length: f32,

  /// Swaps allowed per call once the target is reached.
  pub max_churn: usize,
}

impl BalanceOptions {
  pub const DEFAULT: Self = Self {
    min_split_edge_length: SurfaceConfig::DEFAULT.min_split_edge_length,
    max_churn: SurfaceConfig::DEFAULT.max_churn_per_tick,
  };
}

impl Default for BalanceOptions {
  fn default() -> Self {
    Self::DEFAULT
  }
}

impl From<&SurfaceConfig> for BalanceOptions {
  fn from(config: &SurfaceConfig) -> Self {
    Self {
      min_split_edge_length: config.min_split_edge_length,
      max_churn: config.max_churn_per_tick,
    }
  }
}

/// What one rebalance did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RebalanceStats {
  /// Splits, including those made as the second half of a swap.
  pub expanded: usize,
  pub collapsed: usize,
  /// Collapse/expand swaps made at the target.
  pub churned: usize,
  /// Splits refused by the geometry.
  pub rejected: usize,
}

/// Move `store` toward `target` quaterna (roots included).
///
/// Stops early, without error, when no candidate is left. `target` is capped
/// at the store's capacity.
#[tracing::instrument(skip_all, name = "tree::rebalance")]
pub fn rebalance<G: NodeGeometry>(
  store: &mut NodeStore,
  target: usize,
  geometry: &G,
  options: &BalanceOptions,
) -> RebalanceStats {
  debug_assert!(target <= store.capacity(), "target exceeds store capacity");
  let target = target.min(store.capacity());

  let mut balancer = Balancer::new(store, geometry, options);
  balancer.run(target);

  let stats = balancer.stats;
  tracing::trace!(
    expanded = stats.expanded,
    collapsed = stats.collapsed,
    churned = stats.churned,
    used = store.num_quaterna_used(),
    "rebalanced"
  );
  stats
}

#[derive(Clone, Copy, Debug)]
struct ExpandCandidate {
  score: f32,
  order: u64,
  node: NodeIndex,
}

impl PartialEq for ExpandCandidate {
  fn eq(&self, other: &Self) -> bool {
    self.cmp(other) == Ordering::Equal
  }
}

impl Eq for ExpandCandidate {}

impl PartialOrd for ExpandCandidate {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for ExpandCandidate {
  /// Highest score first, then oldest.
  fn cmp(&self, other: &Self) -> Ordering {
    self
      .score
      .total_cmp(&other.score)
      .then_with(|| other.order.cmp(&self.order))
  }
}

#[derive(Clone, Copy, Debug)]
struct CollapseCandidate {
  score: f32,
  order: u64,
  quaterna: QuaternaIndex,
}

impl PartialEq for CollapseCandidate {
  fn eq(&self, other: &Self) -> bool {
    self.cmp(other) == Ordering::Equal
  }
}

impl Eq for CollapseCandidate {}

impl PartialOrd for CollapseCandidate {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for CollapseCandidate {
  /// Lowest score first, then oldest.
  fn cmp(&self, other: &Self) -> Ordering {
    other
      .score
      .total_cmp(&self.score)
      .then_with(|| other.order.cmp(&self.order))
  }
}

struct Balancer<'a, G> {
  store: &'a mut NodeStore,
  geometry: &'a G,
  max_churn: usize,
  min_edge_length_squared: f32,
  expand: BinaryHeap<ExpandCandidate>,
  collapse: BinaryHeap<CollapseCandidate>,
  stats: RebalanceStats,
}

impl<'a, G: NodeGeometry> Balancer<'a, G> {
  fn new(store: &'a mut NodeStore, geometry: &'a G, options: &BalanceOptions) -> Self {
    let mut balancer = Self {
      store,
      geometry,
      max_churn: options.max_churn,
      min_edge_length_squared: options.min_split_edge_length * options.min_split_edge_length,
      expand: BinaryHeap::new(),
      collapse: BinaryHeap::new(),
      stats: RebalanceStats::default(),
    };

    let _span = tracing::info_span!("gather_candidates").entered();
    let used: Vec<QuaternaIndex> = balancer.store.used_quaterna().collect();
    for quaterna in used {
      for node in quaterna.nodes() {
        balancer.push_expand(node);
      }
      balancer.push_collapse(quaterna);
    }
    balancer
  }

  fn run(&mut self, target: usize) {
    loop {
      let used = self.store.num_quaterna_used();
      if used < target {
        let Some(candidate) = self.pop_expandable() else {
          break;
        };
        if self.expand_node(candidate.node) {
          self.stats.expanded += 1;
        }
      } else if used > target {
        let Some(candidate) = self.pop_collapsible(|_, _| true) else {
          break;
        };
        self.collapse_quaterna(candidate.quaterna);
        self.stats.collapsed += 1;
      } else if !self.churn_once() {
        break;
      }
    }
  }

  /// Collapse the worst quaterna if the best leaf outscores it. The grow
  /// branch then splits that leaf on the next pass.
  fn churn_once(&mut self) -> bool {
    if self.stats.churned >= self.max_churn {
      return false;
    }
    let Some(best) = self.best_expandable() else {
      return false;
    };

    // Skip quaterna whose collapse would remove the leaf or one of its
    // neighbours, which would leave it unable to split.
    let leaf = *self.store.node(best.node);
    let Some(worst) = self.pop_collapsible(|_, quaterna| {
      best.node.quaterna() != quaterna
        && leaf.cousins.iter().flatten().all(|cousin| cousin.quaterna() != quaterna)
    }) else {
      return false;
    };

    if best.score <= worst.score {
      self.collapse.push(worst);
      return false;
    }

    self.collapse_quaterna(worst.quaterna);
    self.stats.churned += 1;
    true
  }

  fn expand_node(&mut self, node: NodeIndex) -> bool {
    let Some(mid_points) = self.geometry.mid_points(&*self.store, node) else {
      self.stats.rejected += 1;
      return false;
    };
    let children = match self.store.expand(node, mid_points) {
      Ok(children) => children,
      Err(err) => {
        tracing::warn!("split refused: {}", err);
        return false;
      }
    };

    for child in children.nodes() {
      let score = self.geometry.score(self.store.node(child));
      self.store.set_score(child, score);
    }
    for child in children.nodes() {
      self.push_expand(child);
      // Neighbours that just gained a cousin may have become splittable.
      let cousins = self.store.node(child).cousins;
      for cousin in cousins.into_iter().flatten() {
        if cousin.quaterna() != children {
          self.push_expand(cousin);
        }
      }
    }
    self.push_collapse(children);
    true
  }

  fn collapse_quaterna(&mut self, quaterna: QuaternaIndex) {
    let parent = self.store.quaterna(quaterna).parent_node();
    self.store.collapse(quaterna);
    if let Some(parent) = parent {
      self.push_expand(parent);
      // The parent and its cousins may have been held back by these nodes.
      self.push_collapse(parent.quaterna());
      let cousins = self.store.node(parent).cousins;
      for cousin in cousins.into_iter().flatten() {
        self.push_collapse(cousin.quaterna());
      }
    }
  }

  #[inline]
  fn node_order(&self, node: NodeIndex) -> u64 {
    self.store.quaterna(node.quaterna()).seq * NUM_NODES_PER_QUATERNA as u64 + node.slot() as u64
  }

  fn push_expand(&mut self, node: NodeIndex) {
    if self.store.can_split(node, self.min_edge_length_squared) {
      self.expand.push(ExpandCandidate {
        score: self.store.node(node).score,
        order: self.node_order(node),
        node,
      });
    }
  }

  fn push_collapse(&mut self, quaterna: QuaternaIndex) {
    if self.store.is_collapsible(quaterna) {
      let q = self.store.quaterna(quaterna);
      self.collapse.push(CollapseCandidate {
        score: q.parent_score,
        order: q.seq,
        quaterna,
      });
    }
  }

  fn is_current_expand(&self, candidate: &ExpandCandidate) -> bool {
    self.store.quaterna(candidate.node.quaterna()).is_in_use()
      && self.node_order(candidate.node) == candidate.order
      && self.store.can_split(candidate.node, self.min_edge_length_squared)
  }

  fn is_current_collapse(&self, candidate: &CollapseCandidate) -> bool {
    self.store.quaterna(candidate.quaterna).seq == candidate.order
      && self.store.is_collapsible(candidate.quaterna)
  }

  /// Top expand candidate that is still valid, left in the heap.
  fn best_expandable(&mut self) -> Option<ExpandCandidate> {
    while let Some(top) = self.expand.peek().copied() {
      if self.is_current_expand(&top) {
        return Some(top);
      }
      self.expand.pop();
    }
    None
  }

  fn pop_expandable(&mut self) -> Option<ExpandCandidate> {
    let best = self.best_expandable()?;
    self.expand.pop();
    Some(best)
  }

  /// Pop the lowest valid collapse candidate that `accept` agrees to.
  /// Valid candidates it refuses go back into the heap.
  fn pop_collapsible<P>(&mut self, accept: P) -> Option<CollapseCandidate>
  where
    P: Fn(&NodeStore, QuaternaIndex) -> bool,
  {
    let mut skipped = Vec::new();
    let found = loop {
      let Some(candidate) = self.collapse.pop() else {
        break None;
      };
      if !self.is_current_collapse(&candidate) {
        continue;
      }
      if accept(&*self.store, candidate.quaterna) {
        break Some(candidate);
      }
      skipped.push(candidate);
    };
    self.collapse.extend(skipped);
    found
  }
}

#[cfg(test)]
#[path = "balancer_test.rs"]
mod balancer_test;
