//! One-time construction of per-element records.
//!
//! Each group builds its [`Dataset`] exactly once, when the scene is created.
//! Records are never mutated afterwards; animation only ever reads them. The
//! RNG is passed in, so a seeded generator reproduces the same scene.
//!
//! | Group | Count | Formation | Notes |
//! |-------|-------|-----------|-------|
//! | Foliage | 14 000 | [`sample_tree_volume`] | seed drives accent colour and float phase |
//! | Sphere ornaments | 250 | [`sample_tree_spiral`], radius × 0.9 | stratified size tiers |
//! | Box ornaments | 100 | [`sample_tree_spiral`], radius × 0.8 | per-axis scale |
//! | Dust | 300 | cylinder shell, static | looping vertical drift |
//! | Stars | 1 500 | spherical shell 60-100, static | twinkle only |

use crate::config::{DustConfig, OrnamentConfig, StarConfig, TreeShape};
use crate::distribution::{
    sample_cylinder, sample_scatter_sphere, sample_spherical_shell, sample_tree_spiral,
    sample_tree_volume, RandomSource,
};
use glam::Vec3;
use std::f32::consts::TAU;
use std::ops::{Deref, Range};
use std::time::Instant;

/// One point of a point-cloud group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleRecord {
    pub scatter_position: Vec3,
    pub formation_position: Vec3,
    /// Stable per-record value in `[0, 1)`.
    pub random_seed: f32,
}

impl ParticleRecord {
    /// Record that sits at the same place in both states.
    pub fn stationary(position: Vec3, random_seed: f32) -> Self {
        Self {
            scatter_position: position,
            formation_position: position,
            random_seed,
        }
    }
}

/// Ornament mesh kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeType {
    Sphere,
    Box,
}

/// One discrete ornament instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrnamentRecord {
    pub particle: ParticleRecord,
    pub shape: ShapeType,
    pub base_scale: f32,
    /// Per-axis multiplier. `Vec3::ONE` for spheres.
    pub anisotropic_scale: Vec3,
    /// Euler angles (XYZ) in radians.
    pub rotation_base: Vec3,
    pub color: Vec3,
    pub float_speed: f32,
    pub float_phase: f32,
}

/// One mote of the ambient dust field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DustRecord {
    pub particle: ParticleRecord,
    /// Upward drift in units per second.
    pub speed: f32,
    /// Vertical offset into the drift loop.
    pub phase: f32,
    /// Horizontal sway strength in `[0, 1)`.
    pub noise: f32,
}

/// Immutable, build-once collection of records.
///
/// Derefs to a slice; there is no mutable access.
#[derive(Debug, Clone)]
pub struct Dataset<R> {
    records: Vec<R>,
}

impl<R> Dataset<R> {
    /// Build `count` records, calling `make(index, rng)` for each.
    pub fn build<S, F>(count: u32, rng: &mut S, mut make: F) -> Self
    where
        S: RandomSource + ?Sized,
        F: FnMut(u32, &mut S) -> R,
    {
        let records = (0..count).map(|i| make(i, rng)).collect();
        Self { records }
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }
}

impl<R> Deref for Dataset<R> {
    type Target = [R];

    fn deref(&self) -> &[R] {
        &self.records
    }
}

/// Size stratum for sphere ornaments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeTier {
    /// Rare, very large anchor (4%).
    Anchor,
    /// Uncommon large filler (16%).
    Large,
    /// Everything else.
    Base,
}

impl SizeTier {
    /// Chance of an [`Anchor`](Self::Anchor).
    pub const ANCHOR_CHANCE: f32 = 0.04;
    /// Chance of a [`Large`](Self::Large).
    pub const LARGE_CHANCE: f32 = 0.16;

    /// Tier for a uniform roll. Never-enlarged colours are always `Base`.
    pub fn roll(roll: f32, never_enlarged: bool) -> Self {
        if never_enlarged {
            SizeTier::Base
        } else if roll < Self::ANCHOR_CHANCE {
            SizeTier::Anchor
        } else if roll < Self::ANCHOR_CHANCE + Self::LARGE_CHANCE {
            SizeTier::Large
        } else {
            SizeTier::Base
        }
    }

    /// Scale multiplier range of this tier.
    pub fn scale_range(self) -> Range<f32> {
        match self {
            SizeTier::Anchor => 2.2..2.4,
            SizeTier::Large => 1.4..1.8,
            SizeTier::Base => 0.8..1.2,
        }
    }

    /// Draw a scale from this tier's range.
    pub fn sample<S: RandomSource + ?Sized>(self, rng: &mut S) -> f32 {
        let range = self.scale_range();
        rng.range(range.start, range.end)
    }
}

/// Foliage: scatter sphere to tree volume, independent seed per point.
pub fn build_foliage<S: RandomSource + ?Sized>(
    count: u32,
    tree: &TreeShape,
    scatter_radius: f32,
    rng: &mut S,
) -> Dataset<ParticleRecord> {
    let started = Instant::now();
    let dataset = Dataset::build(count, rng, |_, rng| ParticleRecord {
        scatter_position: sample_scatter_sphere(scatter_radius, rng),
        formation_position: sample_tree_volume(tree.height, tree.base_radius, tree.y_offset, rng),
        random_seed: rng.next_unit(),
    });
    log::info!("built {} foliage points in {:?}", dataset.len(), started.elapsed());
    dataset
}

/// Ornaments of one shape, placed on a golden-angle spiral around the tree.
///
/// Draw order per record: size-tier roll (spheres only), scatter position,
/// colour roll, size draws, rotation, float speed, float phase, seed. The
/// tier roll comes first so a record's tier follows the first roll it sees.
pub fn build_ornaments<S: RandomSource + ?Sized>(
    shape: ShapeType,
    config: &OrnamentConfig,
    tree: &TreeShape,
    scatter_radius: f32,
    rng: &mut S,
) -> Dataset<OrnamentRecord> {
    let started = Instant::now();
    let radius = tree.base_radius * config.radius_scale;

    let dataset = Dataset::build(config.count, rng, |index, rng| {
        let tier_roll = match shape {
            ShapeType::Sphere => rng.next_unit(),
            ShapeType::Box => 1.0,
        };
        let scatter_position = sample_scatter_sphere(scatter_radius, rng);
        let formation_position =
            sample_tree_spiral(index, config.count, tree.height, radius, tree.y_offset);

        let entry = config.palette.pick(rng.next_unit());

        let (base_scale, anisotropic_scale) = match shape {
            ShapeType::Sphere => {
                let tier = SizeTier::roll(tier_roll, entry.never_enlarged);
                (tier.sample(rng), Vec3::ONE)
            }
            ShapeType::Box => {
                let base = rng.range(0.8, 1.2);
                let axes = Vec3::new(rng.range(0.8, 1.2), rng.range(0.6, 1.2), rng.range(0.8, 1.2));
                (base, axes)
            }
        };

        let rotation_base = Vec3::new(rng.next_unit(), rng.next_unit(), rng.next_unit()) * TAU;
        let float_speed = rng.range(0.5, 1.5);
        let float_phase = rng.range(0.0, TAU);
        let random_seed = rng.next_unit();

        OrnamentRecord {
            particle: ParticleRecord {
                scatter_position,
                formation_position,
                random_seed,
            },
            shape,
            base_scale,
            anisotropic_scale,
            rotation_base,
            color: entry.color,
            float_speed,
            float_phase,
        }
    });

    log::info!("built {} {:?} ornaments in {:?}", dataset.len(), shape, started.elapsed());
    dataset
}

/// Dust: static cylinder band, each mote with its own drift parameters.
pub fn build_dust<S: RandomSource + ?Sized>(config: &DustConfig, rng: &mut S) -> Dataset<DustRecord> {
    let band = 2.0 * config.half_height.max(0.0);
    let dataset = Dataset::build(config.count, rng, |_, rng| DustRecord {
        particle: ParticleRecord::stationary(
            sample_cylinder(config.radius, config.half_height, rng),
            rng.next_unit(),
        ),
        speed: rng.range(0.2, 0.6),
        phase: rng.range(0.0, band),
        noise: rng.next_unit(),
    });
    log::info!("built {} dust motes", dataset.len());
    dataset
}

/// Stars: static shell, twinkle derived from the seed.
pub fn build_stars<S: RandomSource + ?Sized>(config: &StarConfig, rng: &mut S) -> Dataset<ParticleRecord> {
    let dataset = Dataset::build(config.count, rng, |_, rng| {
        ParticleRecord::stationary(
            sample_spherical_shell(config.inner_radius, config.outer_radius, rng),
            rng.next_unit(),
        )
    });
    log::info!("built {} stars", dataset.len());
    dataset
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SceneConfig;
    use crate::distribution::SequenceSource;
    use crate::palette::{parse_hex_color, PaletteEntry, WeightedPalette};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn tier_of(scale: f32) -> SizeTier {
        if (2.2..2.4).contains(&scale) {
            SizeTier::Anchor
        } else if (1.4..1.8).contains(&scale) {
            SizeTier::Large
        } else {
            assert!((0.8..1.2).contains(&scale), "scale {scale} outside every tier");
            SizeTier::Base
        }
    }

    #[test]
    fn test_tier_thresholds() {
        assert_eq!(SizeTier::roll(0.01, false), SizeTier::Anchor);
        assert_eq!(SizeTier::roll(0.039, false), SizeTier::Anchor);
        assert_eq!(SizeTier::roll(0.04, false), SizeTier::Large);
        assert_eq!(SizeTier::roll(0.19, false), SizeTier::Large);
        assert_eq!(SizeTier::roll(0.5, false), SizeTier::Base);
        assert_eq!(SizeTier::roll(0.99, false), SizeTier::Base);
        assert_eq!(SizeTier::roll(0.01, true), SizeTier::Base);
    }

    #[test]
    fn test_foliage_counts_and_bounds() {
        let config = SceneConfig::default();
        let mut rng = SmallRng::seed_from_u64(11);
        let foliage = build_foliage(2_000, &config.tree, config.scatter_radius, &mut rng);
        assert_eq!(foliage.len(), 2_000);
        for r in foliage.iter() {
            assert!(r.scatter_position.length() <= config.scatter_radius + 1e-3);
            assert!(r.formation_position.y >= config.tree.y_offset);
            assert!((0.0..1.0).contains(&r.random_seed));
        }
        let accents = foliage.iter().filter(|r| r.random_seed > 0.95).count();
        assert!(accents > 50 && accents < 160, "{accents}");
    }

    #[test]
    fn test_sphere_first_roll_is_anchor() {
        let config = SceneConfig::default();
        let mut rolls = SequenceSource::new(vec![0.01]);
        let spheres = build_ornaments(
            ShapeType::Sphere,
            &OrnamentConfig { count: 100, ..config.spheres.clone() },
            &config.tree,
            config.scatter_radius,
            &mut rolls,
        );
        assert_eq!(spheres.len(), 100);
        let first = spheres[0];
        assert_eq!(tier_of(first.base_scale), SizeTier::Anchor);
        assert_eq!(first.anisotropic_scale, Vec3::ONE);
    }

    #[test]
    fn test_mixed_roll_sequence_gives_record_zero_the_anchor_tier() {
        let config = SceneConfig::default();
        let red = parse_hex_color("#8a0000").unwrap();
        let mut rolls = SequenceSource::new(vec![0.01, 0.5, 0.99]);
        let spheres = build_ornaments(
            ShapeType::Sphere,
            &OrnamentConfig { count: 100, ..config.spheres.clone() },
            &config.tree,
            config.scatter_radius,
            &mut rolls,
        );
        assert_eq!(spheres.len(), 100);
        assert_ne!(spheres[0].color, red);
        assert_eq!(tier_of(spheres[0].base_scale), SizeTier::Anchor);
        for s in spheres.iter().filter(|s| s.color == red) {
            assert_eq!(tier_of(s.base_scale), SizeTier::Base);
        }
    }

    #[test]
    fn test_never_enlarged_colour_keeps_base_tier() {
        let config = SceneConfig::default();
        let red = parse_hex_color("#8a0000").unwrap();
        let palette = WeightedPalette::new(vec![PaletteEntry::new(red, 1).never_enlarged()]);
        let spheres_config = OrnamentConfig { count: 100, palette, ..config.spheres.clone() };

        for values in [vec![0.01], vec![0.01, 0.5, 0.99], vec![0.03, 0.1, 0.15]] {
            let mut rolls = SequenceSource::new(values);
            let spheres = build_ornaments(
                ShapeType::Sphere,
                &spheres_config,
                &config.tree,
                config.scatter_radius,
                &mut rolls,
            );
            for s in spheres.iter() {
                assert_eq!(s.color, red);
                assert_eq!(tier_of(s.base_scale), SizeTier::Base);
            }
        }
    }

    #[test]
    fn test_sphere_tiers_are_stratified() {
        let config = SceneConfig::default();
        let mut rng = SmallRng::seed_from_u64(12);
        let spheres_config = OrnamentConfig { count: 5_000, ..config.spheres.clone() };
        let spheres = build_ornaments(
            ShapeType::Sphere,
            &spheres_config,
            &config.tree,
            config.scatter_radius,
            &mut rng,
        );
        let mut counts = [0usize; 3];
        for s in spheres.iter() {
            let tier = tier_of(s.base_scale);
            if s.color == parse_hex_color("#8a0000").unwrap() {
                assert_eq!(tier, SizeTier::Base);
            }
            counts[tier as usize] += 1;
        }
        // 80% of draws are eligible: ~3.2% anchors, ~12.8% large.
        assert!(counts[0] > 80 && counts[0] < 250, "{counts:?}");
        assert!(counts[1] > 450 && counts[1] < 850, "{counts:?}");
    }

    #[test]
    fn test_boxes_get_per_axis_scale() {
        let config = SceneConfig::default();
        let mut rng = SmallRng::seed_from_u64(13);
        let boxes = build_ornaments(
            ShapeType::Box,
            &config.boxes,
            &config.tree,
            config.scatter_radius,
            &mut rng,
        );
        assert_eq!(boxes.len(), 100);
        let radius = config.tree.base_radius * 0.8;
        for b in boxes.iter() {
            assert_eq!(b.shape, ShapeType::Box);
            assert!((0.8..1.2).contains(&b.base_scale));
            assert!((0.8..1.2).contains(&b.anisotropic_scale.x));
            assert!((0.6..1.2).contains(&b.anisotropic_scale.y));
            assert!((0.8..1.2).contains(&b.anisotropic_scale.z));
            let f = b.particle.formation_position;
            assert!(Vec3::new(f.x, 0.0, f.z).length() <= radius + 1e-4);
        }
        assert!(boxes.iter().any(|b| b.anisotropic_scale.x != b.anisotropic_scale.y));
    }

    #[test]
    fn test_same_seed_same_dataset() {
        let config = SceneConfig::default();
        let a = build_ornaments(
            ShapeType::Sphere,
            &config.spheres,
            &config.tree,
            config.scatter_radius,
            &mut SmallRng::seed_from_u64(99),
        );
        let b = build_ornaments(
            ShapeType::Sphere,
            &config.spheres,
            &config.tree,
            config.scatter_radius,
            &mut SmallRng::seed_from_u64(99),
        );
        assert_eq!(a.records(), b.records());
    }

    #[test]
    fn test_dust_and_stars_are_stationary() {
        let config = SceneConfig::default();
        let mut rng = SmallRng::seed_from_u64(14);
        let dust = build_dust(&config.dust, &mut rng);
        assert_eq!(dust.len(), 300);
        for d in dust.iter() {
            assert_eq!(d.particle.scatter_position, d.particle.formation_position);
            assert!(d.particle.scatter_position.y.abs() <= 10.0);
            assert!((0.0..20.0).contains(&d.phase));
        }
        let stars = build_stars(&config.stars, &mut rng);
        assert_eq!(stars.len(), 1_500);
        for s in stars.iter() {
            let r = s.scatter_position.length();
            assert!(r >= 60.0 - 1e-3 && r <= 100.0 + 1e-3);
        }
    }

    #[test]
    fn test_zero_count_is_empty() {
        let config = SceneConfig::default();
        let mut rng = SmallRng::seed_from_u64(15);
        assert!(build_foliage(0, &config.tree, 25.0, &mut rng).is_empty());
    }
}
