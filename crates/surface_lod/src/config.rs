//! Tunables for surfaces, the regulator and the scene scheduler.
//!
//! All values are plain numbers with documented defaults. Loading them from a
//! file is the host application's concern.

use std::time::Duration;

use crate::constants::{MAX_NUM_QUATERNA, MIN_NUM_QUATERNA};

/// Node store and balancer limits for one surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceConfig {
  /// Floor for the regulated quaterna count.
  pub min_num_quaterna: usize,

  /// Capacity of the node store.
  pub max_num_quaterna: usize,

  /// Below this distance from the camera, node scores stop growing.
  pub min_score_distance: f32,

  /// Leaves with an edge shorter than this are never split.
  pub min_split_edge_length: f32,

  /// Maximum collapse/expand swaps per tick once the target is reached.
  pub max_churn_per_tick: usize,
}

impl SurfaceConfig {
  pub const DEFAULT: Self = Self {
    min_num_quaterna: MIN_NUM_QUATERNA,
    max_num_quaterna: MAX_NUM_QUATERNA,
    min_score_distance: 1.5,
    min_split_edge_length: 1.0e-3,
    max_churn_per_tick: 1024,
  };

  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_quaterna_range(mut self, min: usize, max: usize) -> Self {
    debug_assert!(min <= max, "min_num_quaterna must be <= max_num_quaterna");
    self.min_num_quaterna = min;
    self.max_num_quaterna = max;
    self
  }

  pub fn with_min_score_distance(mut self, distance: f32) -> Self {
    self.min_score_distance = distance;
    self
  }

  pub fn with_min_split_edge_length(mut self, length: f32) -> Self {
    self.min_split_edge_length = length;
    self
  }

  pub fn with_max_churn_per_tick(mut self, churn: usize) -> Self {
    self.max_churn_per_tick = churn;
    self
  }

  /// Clamp a requested quaterna count to the configured range.
  #[inline]
  pub fn clamp_num_quaterna(&self, num_quaterna: usize) -> usize {
    num_quaterna.clamp(self.min_num_quaterna, self.max_num_quaterna)
  }
}

impl Default for SurfaceConfig {
  fn default() -> Self {
    Self::DEFAULT
  }
}

/// Reaction constants for the load regulator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RegulatorConfig {
  /// Steady-state frame reaction gain.
  pub frame_reaction_coefficient_base: f32,

  /// Extra gain applied at startup, halving every `boost_half_life` seconds.
  pub frame_reaction_coefficient_boost: f32,

  /// Half life of the startup boost, in seconds.
  pub frame_reaction_coefficient_boost_half_life: f32,

  /// Mesh generation periods above this (seconds) trigger a back-off.
  pub max_mesh_generation_period: f32,

  /// Multiplier applied to the load when mesh generation is too slow.
  pub mesh_generation_reaction_coefficient: f32,
}

impl RegulatorConfig {
  pub const DEFAULT: Self = Self {
    frame_reaction_coefficient_base: 0.015,
    frame_reaction_coefficient_boost: 0.05,
    frame_reaction_coefficient_boost_half_life: 3.0,
    max_mesh_generation_period: 1.35,
    mesh_generation_reaction_coefficient: 0.9975,
  };

  /// Reaction gain after `seconds` of regulator uptime.
  #[inline]
  pub fn frame_reaction_coefficient(&self, seconds: f32) -> f32 {
    let boost_factor = 0.5f32.powf(seconds / self.frame_reaction_coefficient_boost_half_life);
    self.frame_reaction_coefficient_base + self.frame_reaction_coefficient_boost * boost_factor
  }
}

impl Default for RegulatorConfig {
  fn default() -> Self {
    Self::DEFAULT
  }
}

/// Configuration for the double-buffered scene and its scheduler.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneConfig {
  pub surface: SurfaceConfig,

  pub regulator: RegulatorConfig,

  /// Observer distance from the visible origin that triggers a reset.
  pub max_observer_distance: f64,

  /// Minimum time between the end of one origin reset and the next.
  pub post_reset_freeze: Duration,

  /// Run ticks on a dedicated thread. When false, the consumer drives ticks.
  pub threaded: bool,

  /// Let the regulator steer the quaterna count.
  pub regulator_enabled: bool,
}

impl SceneConfig {
  pub const DEFAULT: Self = Self {
    surface: SurfaceConfig::DEFAULT,
    regulator: RegulatorConfig::DEFAULT,
    max_observer_distance: 2500.0,
    post_reset_freeze: Duration::from_secs(1),
    threaded: true,
    regulator_enabled: true,
  };

  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_surface(mut self, surface: SurfaceConfig) -> Self {
    self.surface = surface;
    self
  }

  pub fn with_regulator(mut self, regulator: RegulatorConfig) -> Self {
    self.regulator = regulator;
    self
  }

  pub fn with_max_observer_distance(mut self, distance: f64) -> Self {
    self.max_observer_distance = distance;
    self
  }

  pub fn with_post_reset_freeze(mut self, freeze: Duration) -> Self {
    self.post_reset_freeze = freeze;
    self
  }

  pub fn with_threaded(mut self, threaded: bool) -> Self {
    self.threaded = threaded;
    self
  }

  pub fn with_regulator_enabled(mut self, enabled: bool) -> Self {
    self.regulator_enabled = enabled;
    self
  }
}

impl Default for SceneConfig {
  fn default() -> Self {
    Self::DEFAULT
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
