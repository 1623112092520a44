//! Per-frame transform and attribute evaluation.
//!
//! Every function here is pure: its output depends only on the record, the
//! eased blend factor and the elapsed time. Ornaments are evaluated on the
//! host into instance transforms. Point clouds are evaluated on the GPU by the
//! shaders in [`crate::gpu::shaders`]; the `*_point` functions below are the
//! host mirrors of that shader math, used by tests and benchmarks.
//!
//! | Term | Formula |
//! |------|---------|
//! | position | `mix(scatter, formation, ease)` |
//! | float | `sin(time * speed + phase) * amplitude * (1 - ease)` on Y |
//! | spin | `rotation_base + time * speed * (1 - ease)` on X (half rate) and Y |
//! | pulse | `0.8 + 0.2 * sin(time + phase)` |

use crate::config::{DustConfig, FoliageConfig, StarConfig};
use crate::dataset::{DustRecord, OrnamentRecord, ParticleRecord};
use glam::{EulerRot, Mat4, Quat, Vec3};
use std::f32::consts::{PI, TAU};

/// Final rigid transform and colour of one ornament instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceTransform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub color: Vec3,
}

impl InstanceTransform {
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

/// Linear blend between the two stored positions.
#[inline]
pub fn blend_position(record: &ParticleRecord, ease: f32) -> Vec3 {
    record
        .scatter_position
        .lerp(record.formation_position, ease.clamp(0.0, 1.0))
}

/// Vertical idle float, faded out as the formation converges.
#[inline]
pub fn float_offset(time: f32, speed: f32, phase: f32, amplitude: f32, ease: f32) -> f32 {
    (time * speed + phase).sin() * amplitude * (1.0 - ease.clamp(0.0, 1.0))
}

/// Breathing scale multiplier in `[0.6, 1.0]`.
#[inline]
pub fn pulse(time: f32, phase: f32) -> f32 {
    0.8 + 0.2 * (time + phase).sin()
}

/// Evaluate one ornament for this frame.
pub fn evaluate_ornament(
    record: &OrnamentRecord,
    ease: f32,
    time: f32,
    float_amplitude: f32,
) -> InstanceTransform {
    let ease = ease.clamp(0.0, 1.0);
    let fade = 1.0 - ease;

    let mut position = blend_position(&record.particle, ease);
    position.y += float_offset(time, record.float_speed, record.float_phase, float_amplitude, ease);

    let spin = time * record.float_speed * fade;
    let euler = record.rotation_base + Vec3::new(spin * 0.5, spin, 0.0);
    let rotation = Quat::from_euler(EulerRot::XYZ, euler.x, euler.y, euler.z);

    let scale = record.anisotropic_scale * record.base_scale * pulse(time, record.float_phase);

    InstanceTransform {
        position,
        rotation,
        scale,
        color: record.color,
    }
}

/// Evaluated point of a point-cloud group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointSample {
    pub position: Vec3,
    pub size: f32,
    pub color: Vec3,
    /// Brightness multiplier in `[0, 1]`.
    pub intensity: f32,
}

/// Foliage appearance constants shared by the host mirror and the shader.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FoliageStyle {
    pub color: Vec3,
    pub accent_color: Vec3,
    pub accent_fraction: f32,
    pub point_size: f32,
    pub float_amplitude: f32,
}

impl FoliageStyle {
    pub fn new(config: &FoliageConfig, float_amplitude: f32) -> Self {
        Self {
            color: config.color,
            accent_color: config.accent_color,
            accent_fraction: config.accent_fraction,
            point_size: config.point_size,
            float_amplitude,
        }
    }

    /// Accent points are the top `accent_fraction` of seeds.
    #[inline]
    pub fn is_accent(&self, seed: f32) -> bool {
        seed > 1.0 - self.accent_fraction
    }
}

/// Host mirror of the foliage vertex shader.
pub fn foliage_point(record: &ParticleRecord, ease: f32, time: f32, style: &FoliageStyle) -> PointSample {
    let seed = record.random_seed;
    let mut position = blend_position(record, ease);
    position.y += float_offset(time, 0.8 + 0.6 * seed, seed * TAU, style.float_amplitude, ease);

    let (color, size) = if style.is_accent(seed) {
        (style.accent_color, style.point_size * 1.6)
    } else {
        (style.color * (0.8 + 0.4 * seed), style.point_size * (0.7 + 0.6 * seed))
    };

    PointSample {
        position,
        size,
        color,
        intensity: 1.0,
    }
}

/// Host mirror of the dust vertex shader.
///
/// Motes rise at their own speed and wrap inside `[-half_height, half_height)`;
/// brightness fades towards both ends of the band.
pub fn dust_point(record: &DustRecord, time: f32, style: &DustConfig) -> PointSample {
    let half = style.half_height.max(1e-4);
    let band = 2.0 * half;
    let base = record.particle.scatter_position;
    let seed = record.particle.random_seed;

    let climb = base.y + half + record.phase + time * record.speed;
    let wrapped = climb - band * (climb / band).floor();
    let sway = record.noise * 0.5;

    let position = Vec3::new(
        base.x + (time * 0.7 + seed * TAU).sin() * sway,
        wrapped - half,
        base.z + (time * 0.6 + seed * TAU).cos() * sway,
    );

    PointSample {
        position,
        size: style.point_size * (0.6 + 0.8 * record.noise),
        color: style.color,
        intensity: (PI * wrapped / band).sin().max(0.0),
    }
}

/// Host mirror of the star vertex shader. Only brightness animates.
pub fn star_point(record: &ParticleRecord, time: f32, style: &StarConfig) -> PointSample {
    let seed = record.random_seed;
    let speed = 0.5 + 2.5 * seed;
    let phase = seed * TAU * 7.0;

    PointSample {
        position: record.scatter_position,
        size: style.point_size * (0.5 + seed),
        color: Vec3::ONE,
        intensity: 0.5 + 0.5 * (time * speed + phase).sin(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::ShapeType;

    fn ornament() -> OrnamentRecord {
        OrnamentRecord {
            particle: ParticleRecord {
                scatter_position: Vec3::new(10.0, -4.0, 2.0),
                formation_position: Vec3::new(1.0, 3.0, 0.5),
                random_seed: 0.3,
            },
            shape: ShapeType::Box,
            base_scale: 1.1,
            anisotropic_scale: Vec3::new(1.0, 0.7, 0.9),
            rotation_base: Vec3::new(0.3, 1.2, 0.0),
            color: Vec3::new(0.9, 0.1, 0.1),
            float_speed: 1.2,
            float_phase: 0.4,
        }
    }

    #[test]
    fn test_endpoints_hit_stored_positions() {
        let r = ornament();
        assert_eq!(blend_position(&r.particle, 0.0), r.particle.scatter_position);
        assert_eq!(blend_position(&r.particle, 1.0), r.particle.formation_position);
    }

    #[test]
    fn test_formed_ornament_is_settled() {
        let r = ornament();
        let a = evaluate_ornament(&r, 1.0, 3.0, 0.5);
        let b = evaluate_ornament(&r, 1.0, 9.0, 0.5);
        assert_eq!(a.position, r.particle.formation_position);
        assert_eq!(a.position, b.position);
        assert!(a.rotation.abs_diff_eq(b.rotation, 1e-6));
    }

    #[test]
    fn test_scattered_ornament_floats_and_spins() {
        let r = ornament();
        let a = evaluate_ornament(&r, 0.0, 0.0, 0.5);
        let b = evaluate_ornament(&r, 0.0, 1.0, 0.5);
        assert!((a.position.y - b.position.y).abs() > 1e-3);
        assert!(!a.rotation.abs_diff_eq(b.rotation, 1e-4));
        let drift = (b.position.y - r.particle.scatter_position.y).abs();
        assert!(drift <= 0.5 + 1e-6);
    }

    #[test]
    fn test_scale_pulses_within_bounds() {
        let r = ornament();
        for i in 0..200 {
            let t = evaluate_ornament(&r, 0.5, i as f32 * 0.1, 0.5);
            let expected = r.anisotropic_scale * r.base_scale;
            let ratio = t.scale / expected;
            assert!(ratio.x >= 0.6 - 1e-5 && ratio.x <= 1.0 + 1e-5);
            assert!((ratio.x - ratio.y).abs() < 1e-5);
        }
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let r = ornament();
        assert_eq!(evaluate_ornament(&r, 0.37, 12.5, 0.5), evaluate_ornament(&r, 0.37, 12.5, 0.5));
    }

    #[test]
    fn test_foliage_accent_split() {
        let style = FoliageStyle::new(&FoliageConfig::default(), 0.5);
        let mut record = ParticleRecord::stationary(Vec3::ZERO, 0.97);
        assert_eq!(foliage_point(&record, 1.0, 0.0, &style).color, style.accent_color);
        record.random_seed = 0.5;
        assert_ne!(foliage_point(&record, 1.0, 0.0, &style).color, style.accent_color);
    }

    #[test]
    fn test_dust_wraps_inside_band() {
        let style = DustConfig::default();
        let record = DustRecord {
            particle: ParticleRecord::stationary(Vec3::new(3.0, 9.5, 0.0), 0.2),
            speed: 0.5,
            phase: 0.0,
            noise: 0.4,
        };
        for i in 0..500 {
            let p = dust_point(&record, i as f32 * 0.25, &style);
            assert!(p.position.y >= -10.0 - 1e-4 && p.position.y < 10.0 + 1e-4);
            assert!((0.0..=1.0 + 1e-6).contains(&p.intensity));
        }
    }

    #[test]
    fn test_star_twinkle_range() {
        let style = StarConfig::default();
        let record = ParticleRecord::stationary(Vec3::new(0.0, 80.0, 0.0), 0.6);
        for i in 0..100 {
            let p = star_point(&record, i as f32 * 0.37, &style);
            assert!((0.0..=1.0).contains(&p.intensity));
            assert_eq!(p.position, record.scatter_position);
        }
    }
}
