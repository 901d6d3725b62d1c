//! Load regulator - turns timing feedback into a target quaterna count.
//!
//! Two signals are accumulated between consults, each as a running maximum:
//! how far the consumer's frames overran their budget, and how long mesh
//! generation took. The lower of the two resulting targets wins, so a signal
//! that says "too slow" is never outvoted.

use std::time::Duration;

use web_time::Instant;

use crate::config::RegulatorConfig;

#[derive(Clone, Debug)]
pub struct Regulator {
  config: RegulatorConfig,
  reset_time: Instant,

  /// Worst observed / target frame time since the last consult.
  frame_ratio: Option<f32>,

  /// Slowest mesh generation since the last consult, in seconds.
  mesh_generation_period: Option<f32>,
}

impl Regulator {
  pub fn new(config: RegulatorConfig) -> Self {
    Self {
      config,
      reset_time: Instant::now(),
      frame_ratio: None,
      mesh_generation_period: None,
    }
  }

  #[inline]
  pub fn config(&self) -> &RegulatorConfig {
    &self.config
  }

  /// Restart the startup boost and drop pending samples.
  pub fn reset(&mut self) {
    self.reset_time = Instant::now();
    self.frame_ratio = None;
    self.mesh_generation_period = None;
  }

  /// Record `observed / target` frame time. Ratios above 1 mean too slow.
  pub fn sample_frame_ratio(&mut self, ratio: f32) {
    if !ratio.is_finite() || ratio < 0.0 {
      tracing::warn!(ratio, "ignoring invalid frame ratio");
      return;
    }
    self.frame_ratio = Some(self.frame_ratio.map_or(ratio, |worst| worst.max(ratio)));
  }

  pub fn sample_frame_duration(&mut self, observed: Duration, target: Duration) {
    if target.is_zero() {
      tracing::warn!("ignoring frame sample with a zero target duration");
      return;
    }
    self.sample_frame_ratio(observed.as_secs_f32() / target.as_secs_f32());
  }

  pub fn sample_mesh_generation_period(&mut self, period: Duration) {
    let seconds = period.as_secs_f32();
    self.mesh_generation_period = Some(
      self
        .mesh_generation_period
        .map_or(seconds, |slowest| slowest.max(seconds)),
    );
  }

  /// Recommended quaterna count given `current`. Consumes pending samples.
  ///
  /// The result is not clamped; callers clamp it to their configured range.
  pub fn get_adjusted_load(&mut self, current: usize) -> usize {
    let elapsed = self.reset_time.elapsed();
    self.get_adjusted_load_at(current, elapsed)
  }

  /// [`get_adjusted_load`](Self::get_adjusted_load) with an explicit time
  /// since reset.
  pub fn get_adjusted_load_at(&mut self, current: usize, since_reset: Duration) -> usize {
    let frame_directed = self.frame_directed_load(current, since_reset.as_secs_f32());
    let mesh_directed = self.mesh_directed_load(current);
    let adjusted = frame_directed.min(mesh_directed);

    tracing::trace!(current, frame_directed, mesh_directed, adjusted, "regulated load");

    self.frame_ratio = None;
    self.mesh_generation_period = None;
    adjusted
  }

  fn frame_directed_load(&self, current: usize, seconds: f32) -> usize {
    let Some(frame_ratio) = self.frame_ratio else {
      return current;
    };
    if frame_ratio <= 0.0 {
      return current.saturating_add(1);
    }

    let coefficient = self.config.frame_reaction_coefficient(seconds);
    let multiplier = (-(coefficient as f64) * (frame_ratio as f64).ln()).exp();
    let target = (current as f64 * multiplier) as usize;

    // Never stall on a count that rounds back to itself.
    if target == current {
      current.saturating_add(1)
    } else {
      target
    }
  }

  fn mesh_directed_load(&self, current: usize) -> usize {
    match self.mesh_generation_period {
      Some(period) if period >= self.config.max_mesh_generation_period => {
        let backed_off = current as f64 * self.config.mesh_generation_reaction_coefficient as f64;
        (backed_off as usize).saturating_sub(1)
      }
      _ => usize::MAX,
    }
  }
}

impl Default for Regulator {
  fn default() -> Self {
    Self::new(RegulatorConfig::default())
  }
}

#[cfg(test)]
#[path = "regulator_test.rs"]
mod regulator_test;
