//! Triangle quad-tree over the faces of each formation.
//!
//! Every node is a triangle. Splitting a node creates a quaterna: four child
//! triangles that share the parent's corners and the three edge mid-points.
//! Storage is a fixed-capacity arena so the balancer never allocates while
//! it works.
//!
//! # Module Structure
//!
//! - [`node`]: `Node`, `NodeIndex` - one triangle and its neighbour links
//! - [`quaterna`]: `Quaterna`, `QuaternaIndex` - a group of four siblings
//! - [`store`]: `NodeStore` - arena, free list and cousin bookkeeping
//! - [`faces`]: crack-free face generation for leaves
//! - [`score`]: `ScoreFunctor` - view-dependent node priority
//! - [`balancer`]: `rebalance` - grows, shrinks and churns toward a target
//! - [`query`]: spatial queries against the leaf faces

pub mod balancer;
pub mod faces;
pub mod node;
pub mod quaterna;
pub mod query;
pub mod score;
pub mod store;

// Re-exports
pub use balancer::{rebalance, BalanceOptions, NodeGeometry, RebalanceStats};
pub use faces::{edge_mid_point, for_each_node_face};
pub use node::{Node, NodeIndex};
pub use quaterna::{Quaterna, QuaternaIndex, QuaternaParent};
pub use query::{for_each_face_in_shape, QueryShape};
pub use score::{ScoreFunctor, ScoreStats};
pub use store::NodeStore;
