//! GPU memory layouts.
//!
//! Every struct here is `#[repr(C)]` and mirrors a WGSL struct or vertex
//! layout field-for-field. vec3 fields are padded to 16 bytes with a scalar
//! that carries real data where one is available.

use crate::dataset::{DustRecord, ParticleRecord};
use crate::evaluate::InstanceTransform;
use bytemuck::{Pod, Zeroable};

/// Static foliage attributes, uploaded once.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct FoliageVertex {
    pub scatter: [f32; 3],
    pub seed: f32,
    pub formation: [f32; 3],
    pub _pad: f32,
}

impl From<&ParticleRecord> for FoliageVertex {
    fn from(r: &ParticleRecord) -> Self {
        Self {
            scatter: r.scatter_position.to_array(),
            seed: r.random_seed,
            formation: r.formation_position.to_array(),
            _pad: 0.0,
        }
    }
}

/// Static dust attributes, uploaded once.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct DustVertex {
    pub position: [f32; 3],
    pub seed: f32,
    /// speed, phase, noise, unused.
    pub drift: [f32; 4],
}

impl From<&DustRecord> for DustVertex {
    fn from(r: &DustRecord) -> Self {
        Self {
            position: r.particle.scatter_position.to_array(),
            seed: r.particle.random_seed,
            drift: [r.speed, r.phase, r.noise, 0.0],
        }
    }
}

/// Static star attributes, uploaded once.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct StarVertex {
    pub position: [f32; 3],
    pub seed: f32,
}

impl From<&ParticleRecord> for StarVertex {
    fn from(r: &ParticleRecord) -> Self {
        Self {
            position: r.scatter_position.to_array(),
            seed: r.random_seed,
        }
    }
}

/// Per-instance ornament data, rewritten every frame.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct OrnamentInstance {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
}

impl From<InstanceTransform> for OrnamentInstance {
    fn from(t: InstanceTransform) -> Self {
        Self {
            model: t.matrix().to_cols_array_2d(),
            color: t.color.extend(1.0).to_array(),
        }
    }
}

/// Mesh vertex for ornament shapes.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// Scene-wide uniform block shared by every pipeline.
///
/// The `w` lanes of the colour vectors carry a related scalar.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct SceneUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub camera_right: [f32; 4],
    pub camera_up: [f32; 4],
    /// rgb + foliage point size.
    pub foliage_color: [f32; 4],
    /// rgb + accent fraction.
    pub accent_color: [f32; 4],
    /// rgb + dust point size.
    pub dust_color: [f32; 4],
    pub time: f32,
    /// Un-eased foliage progress; the shader applies the ease.
    pub foliage_progress: f32,
    pub float_amplitude: f32,
    pub dust_half_height: f32,
    pub star_size: f32,
    pub _padding: [f32; 3],
}
