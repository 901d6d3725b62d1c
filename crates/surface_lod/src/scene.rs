//! Scene - a pair of surfaces with a floating origin.
//!
//! ```text
//!            observer drifts past max_observer_distance
//!   Normal ─────────────────────────────────────────────► Resetting
//!     ▲     (front not growing, freeze window elapsed)        │
//!     │                                                      │
//!     ├────────── back caught up: swap front and back ◄──────┤
//!     │                                                      │
//!     └────────── back stalled: keep front, refreeze ◄───────┘
//! ```
//!
//! The front surface is the one meshed and queried. During a reset the back
//! surface is re-based onto the observer and grown to the front's detail
//! level; only then do the two swap, so the consumer never sees a surface
//! that is still catching up.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use web_time::Instant;

use crate::config::SceneConfig;
use crate::error::SurfaceError;
use crate::formation::{Formation, FormationId};
use crate::geom::{Observer, Triangle3};
use crate::mesh::MeshSnapshot;
#[cfg(feature = "metrics")]
use crate::metrics::SceneMetrics;
use crate::regulator::Regulator;
use crate::surface::Surface;
use crate::tree::QueryShape;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SceneMode {
  Normal,
  Resetting,
}

/// Counters readable from the consumer side.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneStats {
  pub mode: SceneMode,

  /// Quaterna in the front surface.
  pub visible_num_quaterna: usize,

  /// Quaterna in the surface ticked last (the back one while resetting).
  pub active_num_quaterna: usize,

  pub target_num_quaterna: usize,

  /// Generation of the last mesh produced.
  pub mesh_generation: u64,

  pub num_resets: u64,

  /// Resets given up because the back surface stopped growing.
  pub num_abandoned_resets: u64,

  pub last_tick: Duration,

  pub last_mesh_generation: Duration,
}

impl Default for SceneStats {
  fn default() -> Self {
    Self {
      mode: SceneMode::Normal,
      visible_num_quaterna: 0,
      active_num_quaterna: 0,
      target_num_quaterna: 0,
      mesh_generation: 0,
      num_resets: 0,
      num_abandoned_resets: 0,
      last_tick: Duration::ZERO,
      last_mesh_generation: Duration::ZERO,
    }
  }
}

type SurfacePair = [RwLock<Surface>; 2];

fn read_surface(lock: &RwLock<Surface>) -> RwLockReadGuard<'_, Surface> {
  lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_surface(lock: &RwLock<Surface>) -> RwLockWriteGuard<'_, Surface> {
  lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Shared read access to whichever surface is currently visible.
#[derive(Clone)]
pub struct SceneView {
  surfaces: Arc<SurfacePair>,
  front: Arc<AtomicUsize>,
}

impl SceneView {
  /// Lock the visible surface for reading. Ticks that need to write it wait
  /// until the guard is dropped, so keep it short.
  pub fn read(&self) -> RwLockReadGuard<'_, Surface> {
    read_surface(&self.surfaces[self.front.load(Ordering::Acquire)])
  }

  /// Run a spatial query against the visible surface under its read lock.
  pub fn for_each_intersection<S, F>(&self, shape: &S, f: F)
  where
    S: QueryShape + ?Sized,
    F: FnMut(&Triangle3),
  {
    self.read().for_each_intersection(shape, f);
  }
}

pub struct Scene {
  config: SceneConfig,
  surfaces: Arc<SurfacePair>,
  front: Arc<AtomicUsize>,
  mode: SceneMode,
  regulator: Regulator,
  regulator_enabled: bool,
  fixed_target: Option<usize>,
  observer: Observer,
  front_growing: bool,
  reset_finished: Option<Instant>,
  stats: SceneStats,
  #[cfg(feature = "metrics")]
  metrics: SceneMetrics,
}

impl Scene {
  pub fn new(config: SceneConfig) -> Self {
    let surfaces = [
      RwLock::new(Surface::new(config.surface)),
      RwLock::new(Surface::new(config.surface)),
    ];
    Self {
      surfaces: Arc::new(surfaces),
      front: Arc::new(AtomicUsize::new(0)),
      mode: SceneMode::Normal,
      regulator: Regulator::new(config.regulator),
      regulator_enabled: config.regulator_enabled,
      fixed_target: None,
      observer: Observer::default(),
      front_growing: false,
      reset_finished: None,
      stats: SceneStats::default(),
      #[cfg(feature = "metrics")]
      metrics: SceneMetrics::new(),
      config,
    }
  }

  pub fn view(&self) -> SceneView {
    SceneView {
      surfaces: Arc::clone(&self.surfaces),
      front: Arc::clone(&self.front),
    }
  }

  #[inline]
  pub fn config(&self) -> &SceneConfig {
    &self.config
  }

  #[inline]
  pub fn mode(&self) -> SceneMode {
    self.mode
  }

  #[inline]
  pub fn observer(&self) -> &Observer {
    &self.observer
  }

  #[inline]
  pub fn stats(&self) -> &SceneStats {
    &self.stats
  }

  #[cfg(feature = "metrics")]
  pub fn metrics(&self) -> &SceneMetrics {
    &self.metrics
  }

  #[inline]
  fn front_index(&self) -> usize {
    self.front.load(Ordering::Acquire)
  }

  #[inline]
  fn back_index(&self) -> usize {
    1 - self.front_index()
  }

  /// Non-finite observers are rejected and the previous one kept.
  pub fn set_observer(&mut self, observer: Observer) -> Result<(), SurfaceError> {
    if !observer.is_finite() {
      return Err(SurfaceError::NonFiniteObserver);
    }
    self.observer = observer;
    Ok(())
  }

  /// Add to both surfaces, or to neither.
  pub fn add_formation(&mut self, formation: Formation) -> Result<(), SurfaceError> {
    let [first, second] = &*self.surfaces;
    write_surface(first).add_formation(formation.clone())?;
    if let Err(err) = write_surface(second).add_formation(formation.clone()) {
      // Undo so the pair stays in step.
      let _ = write_surface(first).remove_formation(formation.id);
      return Err(err);
    }
    Ok(())
  }

  pub fn remove_formation(&mut self, id: FormationId) -> Result<(), SurfaceError> {
    let [first, second] = &*self.surfaces;
    let removed = write_surface(first).remove_formation(id);
    // Both surfaces hold the same set, so the first answer covers both.
    let _ = write_surface(second).remove_formation(id);
    removed.map(drop)
  }

  pub fn sample_frame_ratio(&mut self, ratio: f32) {
    self.regulator.sample_frame_ratio(ratio);
  }

  pub fn sample_frame_duration(&mut self, observed: Duration, target: Duration) {
    self.regulator.sample_frame_duration(observed, target);
  }

  pub fn set_regulator_enabled(&mut self, enabled: bool) {
    self.regulator_enabled = enabled;
  }

  /// Pin the quaterna target, bypassing the regulator. `None` hands control
  /// back.
  pub fn set_fixed_target(&mut self, target: Option<usize>) {
    self.fixed_target = target;
  }

  pub fn reset_regulator(&mut self) {
    self.regulator.reset();
  }

  /// Advance one step and mesh the visible surface.
  #[tracing::instrument(skip_all, name = "scene::tick")]
  pub fn tick(&mut self) -> MeshSnapshot {
    let tick_started = Instant::now();
    let surfaces = Arc::clone(&self.surfaces);

    if self.mode == SceneMode::Normal && self.should_begin_reset() {
      self.begin_reset();
    }

    match self.mode {
      SceneMode::Normal => {
        let mut front = write_surface(&surfaces[self.front_index()]);
        self.adjust_target(&mut front);
        let camera = self.observer.camera_ray(front.origin());
        let stats = front.tick(camera);
        self.front_growing = front.is_growing() && stats.expanded > stats.churned;
        self.stats.active_num_quaterna = front.num_quaterna_used();
        self.stats.target_num_quaterna = front.target_num_quaterna();
      }
      SceneMode::Resetting => {
        let mut back = write_surface(&surfaces[self.back_index()]);
        let camera = self.observer.camera_ray(back.origin());
        let stats = back.tick(camera);
        self.stats.active_num_quaterna = back.num_quaterna_used();
        self.stats.target_num_quaterna = back.target_num_quaterna();

        let caught_up = !back.is_growing();
        let stalled = !caught_up && stats.expanded == 0;
        if stalled {
          tracing::debug!(
            used = back.num_quaterna_used(),
            target = back.target_num_quaterna(),
            "reset stalled short of its target"
          );
        }
        drop(back);
        if caught_up {
          self.end_reset();
        } else if stalled {
          self.abandon_reset();
        }
      }
    }

    let mesh_started = Instant::now();
    let generation = self.stats.mesh_generation + 1;
    let (mesh, visible) = {
      let front = read_surface(&surfaces[self.front_index()]);
      (front.generate_mesh(generation), front.num_quaterna_used())
    };
    let mesh_period = mesh_started.elapsed();
    self.regulator.sample_mesh_generation_period(mesh_period);

    self.stats.mode = self.mode;
    self.stats.visible_num_quaterna = visible;
    self.stats.mesh_generation = generation;
    self.stats.last_mesh_generation = mesh_period;
    self.stats.last_tick = tick_started.elapsed();

    #[cfg(feature = "metrics")]
    self.metrics.record_tick(&self.stats, mesh.vertices.len(), mesh.indices.len());

    mesh
  }

  fn adjust_target(&mut self, surface: &mut Surface) {
    let target = match self.fixed_target {
      Some(target) => target,
      None if self.regulator_enabled => self.regulator.get_adjusted_load(surface.num_quaterna_used()),
      None => return,
    };
    surface.set_target_num_quaterna(self.config.surface.clamp_num_quaterna(target));
  }

  fn should_begin_reset(&self) -> bool {
    if self.front_growing {
      return false;
    }
    if let Some(finished) = self.reset_finished {
      if finished.elapsed() < self.config.post_reset_freeze {
        return false;
      }
    }
    let front = read_surface(&self.surfaces[self.front_index()]);
    self.observer.position.distance(front.origin()) > self.config.max_observer_distance
  }

  fn begin_reset(&mut self) {
    let target = read_surface(&self.surfaces[self.front_index()]).num_quaterna_used();
    let mut back = write_surface(&self.surfaces[self.back_index()]);
    back.set_origin(self.observer.position);
    back.set_target_num_quaterna(target);
    drop(back);

    self.mode = SceneMode::Resetting;
    tracing::debug!(origin = ?self.observer.position, target, "origin reset started");
  }

  fn end_reset(&mut self) {
    let back = self.back_index();
    self.front.store(back, Ordering::Release);
    self.mode = SceneMode::Normal;
    self.front_growing = false;
    self.reset_finished = Some(Instant::now());
    self.stats.num_resets += 1;
    tracing::debug!(front = back, "origin reset finished");
  }

  /// Give up on a back surface that cannot reach its target. The front
  /// stays visible and the freeze window restarts before the next attempt.
  fn abandon_reset(&mut self) {
    self.mode = SceneMode::Normal;
    self.front_growing = false;
    self.reset_finished = Some(Instant::now());
    self.stats.num_abandoned_resets += 1;
    tracing::debug!(front = self.front_index(), "origin reset abandoned");
  }
}

#[cfg(test)]
#[path = "scene_test.rs"]
mod scene_test;
