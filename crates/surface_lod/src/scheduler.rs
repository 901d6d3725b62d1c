//! Scheduler - runs the scene on its own thread, or inline on request.
//!
//! The consumer talks to the scene through a command channel and reads
//! results from a single-slot mailbox. Commands are applied between ticks,
//! never during one, so each tick sees a consistent set of inputs.
//!
//! ```text
//!  consumer                          scene loop
//!  ────────                          ──────────
//!  set_observer ──┐
//!  add_formation ─┼─► Command ─► drain ─► tick ─► try_publish ─┐
//!  sample_frame ──┘                                            │
//!  poll_mesh ◄──────────────── MeshSlot ◄──────────────────────┘
//! ```
//!
//! Publishing never blocks: if the consumer is holding the slot the mesh is
//! dropped and the next tick tries again.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};

use crate::config::SceneConfig;
use crate::formation::{Formation, FormationId};
use crate::geom::{Observer, Triangle3};
use crate::mesh::MeshSnapshot;
#[cfg(feature = "metrics")]
use crate::metrics::SceneMetrics;
use crate::scene::{Scene, SceneStats, SceneView};
use crate::tree::QueryShape;

/// Messages from the consumer to the scene loop.
#[derive(Debug)]
pub enum Command {
  SetObserver(Observer),
  AddFormation(Formation),
  RemoveFormation(FormationId),
  SampleFrameRatio { observed: Duration, target: Duration },
  SetSuspended(bool),
  ToggleSuspended,
  SetRegulatorEnabled(bool),
  SetFixedTarget(Option<usize>),
  ResetRegulator,
  Quit,
}

/// Single-slot mailbox for the latest mesh.
#[derive(Debug, Default)]
pub struct MeshSlot {
  slot: Mutex<Option<Arc<MeshSnapshot>>>,
}

impl MeshSlot {
  pub fn new() -> Self {
    Self::default()
  }

  /// Replace the pending mesh unless the consumer holds the slot.
  ///
  /// Returns false if the mesh was dropped.
  pub fn try_publish(&self, mesh: Arc<MeshSnapshot>) -> bool {
    match self.slot.try_lock() {
      Ok(mut slot) => {
        *slot = Some(mesh);
        true
      }
      Err(TryLockError::Poisoned(poisoned)) => {
        *poisoned.into_inner() = Some(mesh);
        true
      }
      Err(TryLockError::WouldBlock) => false,
    }
  }

  /// Take the pending mesh, if one arrived since the last poll.
  pub fn poll(&self) -> Option<Arc<MeshSnapshot>> {
    self.lock().take()
  }

  /// Hold the slot. Publishes are skipped until the guard is dropped.
  pub fn lock(&self) -> MutexGuard<'_, Option<Arc<MeshSnapshot>>> {
    self.slot.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

/// The scene plus everything it needs to run unattended.
struct SceneLoop {
  scene: Scene,
  commands: Receiver<Command>,
  mesh_slot: Arc<MeshSlot>,
  stats: Arc<Mutex<SceneStats>>,
  #[cfg(feature = "metrics")]
  metrics: Arc<Mutex<SceneMetrics>>,
  /// Outstanding suspensions; the loop ticks only at zero.
  suspend_depth: u32,
  quit: bool,
}

impl SceneLoop {
  fn apply(&mut self, command: Command) {
    match command {
      Command::SetObserver(observer) => {
        if let Err(err) = self.scene.set_observer(observer) {
          tracing::warn!("{}", err);
        }
      }
      Command::AddFormation(formation) => {
        if let Err(err) = self.scene.add_formation(formation) {
          tracing::warn!("{}", err);
        }
      }
      Command::RemoveFormation(id) => {
        if let Err(err) = self.scene.remove_formation(id) {
          tracing::warn!("{}", err);
        }
      }
      Command::SampleFrameRatio { observed, target } => {
        self.scene.sample_frame_duration(observed, target);
      }
      Command::SetSuspended(true) => self.set_suspend_depth(self.suspend_depth.saturating_add(1)),
      Command::SetSuspended(false) => self.set_suspend_depth(self.suspend_depth.saturating_sub(1)),
      Command::ToggleSuspended => self.set_suspend_depth(u32::from(!self.is_suspended())),
      Command::SetRegulatorEnabled(enabled) => self.scene.set_regulator_enabled(enabled),
      Command::SetFixedTarget(target) => self.scene.set_fixed_target(target),
      Command::ResetRegulator => self.scene.reset_regulator(),
      Command::Quit => {
        tracing::debug!("scene loop quitting");
        self.quit = true;
      }
    }
  }

  #[inline]
  fn is_suspended(&self) -> bool {
    self.suspend_depth > 0
  }

  fn set_suspend_depth(&mut self, depth: u32) {
    let was_suspended = self.is_suspended();
    self.suspend_depth = depth;
    if was_suspended != self.is_suspended() {
      tracing::debug!(suspended = self.is_suspended(), "scene loop suspension changed");
    }
  }

  /// Apply everything queued so far.
  fn drain(&mut self) {
    loop {
      match self.commands.try_recv() {
        Ok(command) => self.apply(command),
        Err(TryRecvError::Empty) => break,
        Err(TryRecvError::Disconnected) => {
          self.quit = true;
          break;
        }
      }
    }
  }

  /// One iteration: commands, then a tick unless paused or quitting.
  fn step(&mut self) {
    self.drain();
    if self.quit || self.is_suspended() {
      return;
    }

    let mesh = Arc::new(self.scene.tick());
    if !self.mesh_slot.try_publish(mesh) {
      tracing::trace!("mesh slot busy, publish skipped");
    }

    *self.stats.lock().unwrap_or_else(PoisonError::into_inner) = *self.scene.stats();
    #[cfg(feature = "metrics")]
    {
      *self.metrics.lock().unwrap_or_else(PoisonError::into_inner) = self.scene.metrics().clone();
    }
  }

  fn run(mut self) {
    while !self.quit {
      if self.is_suspended() {
        // Nothing to do until told otherwise.
        match self.commands.recv() {
          Ok(command) => self.apply(command),
          Err(_) => self.quit = true,
        }
        continue;
      }
      self.step();
    }
    tracing::debug!("scene loop stopped");
  }
}

enum Driver {
  Threaded(Option<JoinHandle<()>>),
  Inline(Box<SceneLoop>),
}

/// Consumer-side handle to a running scene.
pub struct Scheduler {
  commands: Sender<Command>,
  mesh_slot: Arc<MeshSlot>,
  view: SceneView,
  stats: Arc<Mutex<SceneStats>>,
  #[cfg(feature = "metrics")]
  metrics: Arc<Mutex<SceneMetrics>>,
  driver: Driver,
}

impl Scheduler {
  pub fn new(config: SceneConfig) -> Self {
    Self::from_scene(Scene::new(config))
  }

  /// Take over a scene that may already hold formations and an observer.
  ///
  /// Runs on a dedicated thread if the scene's config asks for it and the
  /// thread can be spawned; otherwise the consumer drives it with
  /// [`tick`](Self::tick).
  pub fn from_scene(scene: Scene) -> Self {
    let (commands, receiver) = unbounded();
    let mesh_slot = Arc::new(MeshSlot::new());
    let stats = Arc::new(Mutex::new(*scene.stats()));
    #[cfg(feature = "metrics")]
    let metrics = Arc::new(Mutex::new(scene.metrics().clone()));
    let view = scene.view();
    let threaded = scene.config().threaded;

    let scene_loop = SceneLoop {
      scene,
      commands: receiver,
      mesh_slot: Arc::clone(&mesh_slot),
      stats: Arc::clone(&stats),
      #[cfg(feature = "metrics")]
      metrics: Arc::clone(&metrics),
      suspend_depth: 0,
      quit: false,
    };

    let driver = if threaded {
      spawn_scene_thread(scene_loop)
    } else {
      Driver::Inline(Box::new(scene_loop))
    };

    Self {
      commands,
      mesh_slot,
      view,
      stats,
      #[cfg(feature = "metrics")]
      metrics,
      driver,
    }
  }

  pub fn is_threaded(&self) -> bool {
    matches!(self.driver, Driver::Threaded(_))
  }

  fn send(&self, command: Command) {
    // The loop only goes away after Quit or a panic; either way there is
    // no one left to tell.
    if self.commands.send(command).is_err() {
      tracing::warn!("scene loop is gone, command dropped");
    }
  }

  pub fn set_observer(&self, observer: Observer) {
    self.send(Command::SetObserver(observer));
  }

  pub fn add_formation(&self, formation: Formation) -> FormationId {
    let id = formation.id;
    self.send(Command::AddFormation(formation));
    id
  }

  pub fn remove_formation(&self, id: FormationId) {
    self.send(Command::RemoveFormation(id));
  }

  /// Report how long the consumer's last frame took against its budget.
  pub fn sample_frame_ratio(&self, observed: Duration, target: Duration) {
    self.send(Command::SampleFrameRatio { observed, target });
  }

  /// Suspensions nest: each `true` needs a matching `false` before the
  /// scene ticks again.
  pub fn set_suspended(&self, suspended: bool) {
    self.send(Command::SetSuspended(suspended));
  }

  pub fn toggle_suspended(&self) {
    self.send(Command::ToggleSuspended);
  }

  pub fn set_regulator_enabled(&self, enabled: bool) {
    self.send(Command::SetRegulatorEnabled(enabled));
  }

  pub fn set_fixed_target(&self, target: Option<usize>) {
    self.send(Command::SetFixedTarget(target));
  }

  pub fn reset_regulator(&self) {
    self.send(Command::ResetRegulator);
  }

  /// Run one loop iteration on the calling thread. Does nothing when the
  /// scene has its own thread.
  pub fn tick(&mut self) {
    if let Driver::Inline(scene_loop) = &mut self.driver {
      scene_loop.step();
    }
  }

  /// Newest mesh since the last poll. Never waits on the scene.
  pub fn poll_mesh(&self) -> Option<Arc<MeshSnapshot>> {
    self.mesh_slot.poll()
  }

  #[inline]
  pub fn mesh_slot(&self) -> &MeshSlot {
    &self.mesh_slot
  }

  #[inline]
  pub fn view(&self) -> &SceneView {
    &self.view
  }

  /// Spatial query against the visible surface. Holds its read lock for the
  /// duration of the call.
  pub fn for_each_intersection<S, F>(&self, shape: &S, f: F)
  where
    S: QueryShape + ?Sized,
    F: FnMut(&Triangle3),
  {
    self.view.for_each_intersection(shape, f);
  }

  /// Stats as of the last completed tick.
  pub fn stats(&self) -> SceneStats {
    *self.stats.lock().unwrap_or_else(PoisonError::into_inner)
  }

  #[cfg(feature = "metrics")]
  pub fn metrics(&self) -> SceneMetrics {
    self.metrics.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }

  /// Stop the scene loop and wait for it to finish its current tick.
  pub fn quit(mut self) {
    self.shutdown();
  }

  fn shutdown(&mut self) {
    self.send(Command::Quit);
    if let Driver::Threaded(handle) = &mut self.driver {
      if let Some(handle) = handle.take() {
        if handle.join().is_err() {
          tracing::warn!("scene thread panicked");
        }
      }
    }
  }
}

impl Drop for Scheduler {
  fn drop(&mut self) {
    if let Driver::Threaded(Some(_)) = self.driver {
      self.shutdown();
    }
  }
}

fn spawn_scene_thread(scene_loop: SceneLoop) -> Driver {
  // Keep a way back to inline mode if the thread cannot start.
  let (handoff, fallback) = crossbeam_channel::bounded::<SceneLoop>(1);
  let spawned = std::thread::Builder::new()
    .name("surface-scene".into())
    .spawn(move || {
      let Ok(scene_loop) = fallback.recv() else {
        return;
      };
      scene_loop.run();
    });

  match spawned {
    Ok(handle) => match handoff.send(scene_loop) {
      Ok(()) => Driver::Threaded(Some(handle)),
      Err(returned) => Driver::Inline(Box::new(returned.into_inner())),
    },
    Err(err) => {
      tracing::warn!("could not spawn scene thread, running inline: {}", err);
      Driver::Inline(Box::new(scene_loop))
    }
  }
}

#[cfg(test)]
#[path = "scheduler_test.rs"]
mod scheduler_test;
