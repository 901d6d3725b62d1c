//! Recoverable conditions raised by surfaces and the scene.
//!
//! None of these cross the public scheduler boundary: the scheduler logs them
//! and carries on with the next tick.

use thiserror::Error;

use crate::formation::FormationId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SurfaceError {
  #[error("camera ray is not finite; scores left unchanged this tick")]
  NonFiniteCameraRay,

  #[error("observer position is not finite")]
  NonFiniteObserver,

  #[error("formation {0:?} is already registered")]
  DuplicateFormation(FormationId),

  #[error("formation {0:?} is not registered")]
  UnknownFormation(FormationId),

  #[error("node store has no free quaterna")]
  StoreExhausted,
}
