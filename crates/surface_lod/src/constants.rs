//! Buffer layout constants for the quaterna-based node store.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                     NODE STORE LAYOUT                         │
//! ├───────────────────────────────────────────────────────────────┤
//! │                                                               │
//! │  quaterna:   [   0   ][   1   ][   2   ] ...  [ max - 1 ]     │
//! │  nodes:      [0 1 2 3][4 5 6 7][8 ...  ] ...                  │
//! │                                                               │
//! │  Quaterna q owns nodes 4q..4q+4. Slot 3 is always the         │
//! │  centre child (the upside-down triangle of the four).         │
//! │                                                               │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Limits are derived from a vertex budget the same way a renderer would size
//! its index buffers: two triangles per node, two vertices per triangle.

/// Sibling nodes produced by a single split.
pub const NUM_NODES_PER_QUATERNA: usize = 4;

/// Corners per node (nodes are triangles).
pub const NUM_CORNERS_PER_NODE: usize = 3;

/// Index of the centre child within a quaterna.
pub const CENTER_CHILD: usize = 3;

/// Upper bound on vertices a surface may emit per mesh.
pub const MAX_NUM_VERTS: usize = 0x10_0000;

/// Upper bound on triangles per mesh.
pub const MAX_NUM_TRIS: usize = MAX_NUM_VERTS >> 1;

/// Upper bound on nodes per surface.
pub const MAX_NUM_NODES: usize = MAX_NUM_TRIS >> 1;

/// Default capacity of a node store, in quaterna.
pub const MAX_NUM_QUATERNA: usize = MAX_NUM_NODES / NUM_NODES_PER_QUATERNA;

/// Default floor for the regulated quaterna count.
pub const MIN_NUM_QUATERNA: usize = if MAX_NUM_QUATERNA < 1024 {
  MAX_NUM_QUATERNA
} else {
  1024
};

/// Next corner index, wrapping at three.
#[inline(always)]
pub const fn tri_mod(i: usize) -> usize {
  i % NUM_CORNERS_PER_NODE
}

#[cfg(test)]
#[path = "constants_test.rs"]
mod constants_test;
