//! surface_lod - adaptive level-of-detail planet surfaces
//!
//! Each formation (a planet-like body) starts as a tetrahedron whose faces
//! are split into ever finer triangles where the observer is looking. A
//! balancer keeps the number of splits at a target the regulator derives
//! from frame timing, and a scene keeps two surfaces so the floating origin
//! can be moved without the consumer ever seeing a half-built mesh.
//!
//! # Example
//!
//! ```ignore
//! use glam::DVec3;
//! use surface_lod::{Formation, Observer, SceneConfig, Scheduler};
//!
//! let scheduler = Scheduler::new(SceneConfig::default());
//! scheduler.add_formation(Formation::sphere(DVec3::ZERO, 6.4e6));
//!
//! loop {
//!   scheduler.set_observer(Observer::new(camera_position, camera_forward));
//!   if let Some(mesh) = scheduler.poll_mesh() {
//!     upload(&mesh.vertices, &mesh.indices, mesh.properties.origin);
//!   }
//!   scheduler.sample_frame_ratio(frame_time, frame_budget);
//! }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod formation;
pub mod geom;
pub mod mesh;
pub mod regulator;
pub mod scene;
pub mod scheduler;
pub mod surface;

// Triangle quad-tree: node store, balancer, scoring and queries
pub mod tree;

// Engine-agnostic timing metrics
pub mod metrics;

// Re-export commonly used items
pub use config::{RegulatorConfig, SceneConfig, SurfaceConfig};
pub use error::SurfaceError;
pub use formation::{Formation, FormationId, Shader, SphereShader};
pub use geom::{CameraRay, Observer, Sphere3, Triangle3};
pub use mesh::{MeshProperties, MeshSnapshot, MinMaxAABB, Vertex};
pub use regulator::Regulator;
pub use scene::{Scene, SceneMode, SceneStats, SceneView};
pub use scheduler::{Command, MeshSlot, Scheduler};
pub use surface::Surface;
pub use tree::{NodeStore, QueryShape, RebalanceStats, ScoreStats};
