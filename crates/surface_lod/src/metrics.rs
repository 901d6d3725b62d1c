//! Per-tick scene statistics for profiling overlays.
//!
//! The scene records into a [`SceneMetrics`] after every tick when the crate
//! is built with the `metrics` feature; the scheduler keeps a copy the
//! consumer can read. Without the feature nothing is recorded.
//!
//! ```ignore
//! // Scene side, once per tick:
//! metrics.record_tick(scene.stats(), mesh.vertices.len(), mesh.indices.len());
//!
//! // Consumer side:
//! let metrics = scheduler.metrics();
//! overlay.text(format!(
//!   "tick {:.0} us, mesh {:.0} us, {} quaterna",
//!   metrics.avg_tick_timing_us(),
//!   metrics.avg_mesh_timing_us(),
//!   metrics.visible_quaterna.latest().unwrap_or(0),
//! ));
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::mesh::Vertex;
use crate::scene::{SceneMode, SceneStats};

/// Pauses recording while false, without rebuilding.
pub static COLLECT_METRICS: AtomicBool = AtomicBool::new(true);

#[inline]
fn collecting() -> bool {
  cfg!(feature = "metrics") && COLLECT_METRICS.load(Ordering::Relaxed)
}

/// Samples kept per window; a few seconds of ticks.
const WINDOW_LEN: usize = 128;

/// The most recent `WINDOW_LEN` samples of one quantity.
#[derive(Clone, Debug)]
pub struct SampleWindow {
  samples: VecDeque<u64>,
}

impl SampleWindow {
  pub fn new() -> Self {
    Self {
      samples: VecDeque::with_capacity(WINDOW_LEN),
    }
  }

  pub fn record(&mut self, sample: u64) {
    if self.samples.len() == WINDOW_LEN {
      self.samples.pop_front();
    }
    self.samples.push_back(sample);
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.samples.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.samples.is_empty()
  }

  pub fn clear(&mut self) {
    self.samples.clear();
  }

  pub fn latest(&self) -> Option<u64> {
    self.samples.back().copied()
  }

  /// Zero when empty.
  pub fn mean(&self) -> f64 {
    if self.samples.is_empty() {
      return 0.0;
    }
    self.samples.iter().sum::<u64>() as f64 / self.samples.len() as f64
  }

  /// Smallest and largest sample.
  pub fn range(&self) -> Option<(u64, u64)> {
    let min = self.samples.iter().min()?;
    let max = self.samples.iter().max()?;
    Some((*min, *max))
  }
}

impl Default for SampleWindow {
  fn default() -> Self {
    Self::new()
  }
}

/// What the scene did over its last few ticks.
#[derive(Clone, Debug, Default)]
pub struct SceneMetrics {
  /// Whole-tick times, microseconds.
  pub tick_timings: SampleWindow,

  /// Mesh generation times, microseconds.
  pub mesh_timings: SampleWindow,

  pub visible_quaterna: SampleWindow,

  pub target_quaterna: usize,

  pub mesh_triangles: u64,

  /// Vertex and index buffer size of the last mesh.
  pub mesh_memory_bytes: u64,

  /// Ticks spent growing a re-based back surface.
  pub resetting_ticks: u64,

  pub total_meshes_generated: u64,
}

impl SceneMetrics {
  pub fn new() -> Self {
    Self::default()
  }

  /// Clear the windows and last-mesh figures. Session totals are kept.
  pub fn reset(&mut self) {
    self.tick_timings.clear();
    self.mesh_timings.clear();
    self.visible_quaterna.clear();
    self.target_quaterna = 0;
    self.mesh_triangles = 0;
    self.mesh_memory_bytes = 0;
  }

  /// Record one scene tick and the mesh it produced.
  pub fn record_tick(&mut self, stats: &SceneStats, vertex_count: usize, index_count: usize) {
    if !collecting() {
      return;
    }

    self.tick_timings.record(stats.last_tick.as_micros() as u64);
    self.mesh_timings.record(stats.last_mesh_generation.as_micros() as u64);
    self.visible_quaterna.record(stats.visible_num_quaterna as u64);
    self.target_quaterna = stats.target_num_quaterna;

    let vertex_bytes = vertex_count * std::mem::size_of::<Vertex>();
    let index_bytes = index_count * std::mem::size_of::<u32>();
    self.mesh_memory_bytes = (vertex_bytes + index_bytes) as u64;
    self.mesh_triangles = (index_count / 3) as u64;
    self.total_meshes_generated += 1;

    if stats.mode == SceneMode::Resetting {
      self.resetting_ticks += 1;
    }
  }

  pub fn avg_tick_timing_us(&self) -> f64 {
    self.tick_timings.mean()
  }

  pub fn avg_mesh_timing_us(&self) -> f64 {
    self.mesh_timings.mean()
  }

  pub fn mesh_memory_mb(&self) -> f64 {
    self.mesh_memory_bytes as f64 / (1024.0 * 1024.0)
  }
}
