//! WGSL sources for every pipeline.
//!
//! The point shaders are assembled from a shared uniform block, the
//! billboard helpers and a per-group vertex stage. Their math mirrors
//! [`foliage_point`](crate::evaluate::foliage_point),
//! [`dust_point`](crate::evaluate::dust_point) and
//! [`star_point`](crate::evaluate::star_point) term for term.

/// Uniform block, constants and the cubic ease.
pub const UNIFORMS: &str = include_str!("shaders/uniforms.wgsl");

/// Foliage: blends scatter and formation on the GPU from the raw progress.
pub const FOLIAGE: &str = concat!(
    include_str!("shaders/uniforms.wgsl"),
    include_str!("shaders/points.wgsl"),
    include_str!("shaders/foliage.wgsl"),
);

/// Dust: looping vertical drift inside the band.
pub const DUST: &str = concat!(
    include_str!("shaders/uniforms.wgsl"),
    include_str!("shaders/points.wgsl"),
    include_str!("shaders/dust.wgsl"),
);

/// Stars: static positions, twinkling brightness.
pub const STARS: &str = concat!(
    include_str!("shaders/uniforms.wgsl"),
    include_str!("shaders/points.wgsl"),
    include_str!("shaders/stars.wgsl"),
);

/// Ornaments: instanced meshes with host-computed model matrices.
pub const ORNAMENT: &str = concat!(
    include_str!("shaders/uniforms.wgsl"),
    include_str!("shaders/ornament.wgsl"),
);

/// Every shader with a label, in pipeline creation order.
pub const ALL: [(&str, &str); 4] = [
    ("foliage", FOLIAGE),
    ("dust", DUST),
    ("stars", STARS),
    ("ornament", ORNAMENT),
];

/// Fragment entry point of the point shaders.
pub const POINT_FRAGMENT: &str = "fs_point";
/// Fragment entry point of the ornament shader.
pub const MESH_FRAGMENT: &str = "fs_main";
/// Vertex entry point of every shader.
pub const VERTEX: &str = "vs_main";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sources_share_one_uniform_block() {
        for (name, src) in ALL {
            assert!(src.starts_with(UNIFORMS), "{name} does not start with the uniform block");
            assert_eq!(src.matches("struct SceneUniforms").count(), 1, "{name}");
            assert!(src.contains(&format!("fn {VERTEX}")), "{name}");
        }
    }

    #[test]
    fn test_point_shaders_use_shared_fragment() {
        for src in [FOLIAGE, DUST, STARS] {
            assert!(src.contains(&format!("fn {POINT_FRAGMENT}")));
        }
        assert!(ORNAMENT.contains(&format!("fn {MESH_FRAGMENT}")));
    }
}
