//! Low-poly ornament meshes.

use super::layout::MeshVertex;
use crate::dataset::ShapeType;
use glam::Vec3;
use std::f32::consts::{PI, TAU};

/// Indexed triangle mesh.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u16>,
}

impl Mesh {
    /// Mesh for an ornament shape at the given unit size.
    pub fn for_shape(shape: ShapeType, size: f32) -> Self {
        match shape {
            ShapeType::Sphere => Self::uv_sphere(size, 12, 16),
            ShapeType::Box => Self::cube(size),
        }
    }

    /// UV sphere of `radius` with `rings` latitude bands and `segments` longitude slices.
    pub fn uv_sphere(radius: f32, rings: u16, segments: u16) -> Self {
        let rings = rings.max(2);
        let segments = segments.max(3);
        let mut vertices = Vec::with_capacity(((rings + 1) * (segments + 1)) as usize);
        let mut indices = Vec::with_capacity((rings * segments * 6) as usize);

        for ring in 0..=rings {
            let phi = PI * ring as f32 / rings as f32;
            for seg in 0..=segments {
                let theta = TAU * seg as f32 / segments as f32;
                let normal = Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
                vertices.push(MeshVertex {
                    position: (normal * radius).to_array(),
                    normal: normal.to_array(),
                });
            }
        }

        let stride = segments + 1;
        for ring in 0..rings {
            for seg in 0..segments {
                let a = ring * stride + seg;
                let b = a + stride;
                indices.extend_from_slice(&[a, a + 1, b, b, a + 1, b + 1]);
            }
        }

        Self { vertices, indices }
    }

    /// Axis-aligned cube with edge length `size`, flat-shaded.
    pub fn cube(size: f32) -> Self {
        let h = size * 0.5;
        let faces = [
            (Vec3::X, Vec3::Y, Vec3::Z),
            (Vec3::NEG_X, Vec3::Y, Vec3::NEG_Z),
            (Vec3::Y, Vec3::Z, Vec3::X),
            (Vec3::NEG_Y, Vec3::NEG_Z, Vec3::X),
            (Vec3::Z, Vec3::Y, Vec3::NEG_X),
            (Vec3::NEG_Z, Vec3::Y, Vec3::X),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, up, side) in faces {
            let base = vertices.len() as u16;
            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                let p = (normal + side * su + up * sv) * h;
                vertices.push(MeshVertex {
                    position: p.to_array(),
                    normal: normal.to_array(),
                });
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self { vertices, indices }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_vertices_on_radius() {
        let mesh = Mesh::uv_sphere(0.5, 8, 12);
        assert_eq!(mesh.vertices.len(), 9 * 13);
        assert_eq!(mesh.indices.len(), 8 * 12 * 6);
        for v in &mesh.vertices {
            assert!((Vec3::from_array(v.position).length() - 0.5).abs() < 1e-5);
        }
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
    }

    #[test]
    fn test_cube_extent() {
        let mesh = Mesh::cube(2.0);
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
        for v in &mesh.vertices {
            let p = Vec3::from_array(v.position);
            assert!((p.abs().max_element() - 1.0).abs() < 1e-6);
        }
    }
}
