//! # morph-tree
//!
//! A dual-state particle formation that morphs between a scattered cloud and
//! a tree silhouette, driven by one binary toggle.
//!
//! ## Quick Start
//!
//! ```ignore
//! use morph_tree::prelude::*;
//!
//! fn main() -> Result<(), RunError> {
//!     env_logger::init();
//!     morph_tree::run(SceneConfig::default())
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Datasets
//!
//! Every group (foliage, sphere ornaments, box ornaments, dust, stars) builds
//! its records once from a caller-supplied RNG. Each record holds a scatter
//! position, a formation position and a stable random seed. Records are
//! never mutated; animation only interpolates between them.
//!
//! ### Morphing
//!
//! A [`MorphSwitch`] carries the single [`MorphState`] input. Each morphing
//! group owns a [`MorphController`] that chases the target with a damped
//! first-order approach, then eases the result:
//!
//! ```text
//! progress += (target - progress) * k * dt
//! blend     = ease_in_out_cubic(progress)
//! ```
//!
//! Reversing the target mid-flight continues from wherever progress is.
//!
//! ### Evaluation
//!
//! Ornaments are evaluated on the host into instance transforms by
//! [`evaluate_ornament`](evaluate::evaluate_ornament). Foliage, dust and stars
//! are evaluated in their vertex shaders from static attributes and two
//! per-frame scalars; [`evaluate`] holds host mirrors of that math.
//!
//! ## Feature Overview
//!
//! | Group | Count | Damping | Evaluated on |
//! |-------|-------|---------|--------------|
//! | Foliage | 14 000 | 1.5 | GPU |
//! | Sphere ornaments | 250 | 1.8 | host |
//! | Box ornaments | 100 | 1.2 | host |
//! | Dust | 300 | static | GPU |
//! | Stars | 1 500 | static | GPU |

mod app;
pub mod config;
pub mod dataset;
pub mod distribution;
pub mod error;
pub mod evaluate;
pub mod gpu;
pub mod morph;
pub mod palette;
pub mod scene;
pub mod time;

pub use app::{load_config, run, run_from_path};
pub use config::SceneConfig;
pub use dataset::{Dataset, ShapeType};
pub use error::{ConfigError, GpuError, RunError};
pub use glam::{Vec3, Vec4};
pub use gpu::FrameSink;
pub use morph::{MorphController, MorphState, MorphSwitch};
pub use scene::{FrameUniforms, Scene};

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use morph_tree::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::SceneConfig;
    pub use crate::dataset::ShapeType;
    pub use crate::distribution::{RandomSource, SequenceSource};
    pub use crate::error::RunError;
    pub use crate::gpu::FrameSink;
    pub use crate::morph::{MorphState, MorphSwitch};
    pub use crate::palette::{PaletteEntry, WeightedPalette};
    pub use crate::scene::{FrameUniforms, Scene};
    pub use crate::time::Time;
    pub use glam::Vec3;
}
