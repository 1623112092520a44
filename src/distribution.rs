//! Sampling rules for the two formation states.
//!
//! Every function here returns a single point and has no side effects. The
//! randomized samplers draw from a [`RandomSource`] supplied by the caller, so
//! tests can replay fixed rolls while the scene uses a seeded [`rand`] RNG.
//!
//! # Example
//!
//! ```ignore
//! use morph_tree::distribution::*;
//! use rand::{rngs::SmallRng, SeedableRng};
//!
//! let mut rng = SmallRng::seed_from_u64(7);
//! let scattered = sample_scatter_sphere(25.0, &mut rng);
//! let in_tree = sample_tree_volume(13.0, 5.5, -6.5, &mut rng);
//! let ornament = sample_tree_spiral(3, 250, 13.0, 5.5 * 0.9, -6.5);
//! ```

use glam::Vec3;
use rand::{Rng, RngCore};
use std::f32::consts::TAU;

/// Golden angle in radians. Successive spiral indices advance by this much.
pub const GOLDEN_ANGLE: f32 = 2.39996;

/// Smallest radius/height the samplers will work with.
///
/// Zero, negative and non-finite inputs are clamped up to this value so the
/// output stays finite instead of collapsing into NaN geometry.
pub const MIN_EXTENT: f32 = 1e-4;

/// Source of uniform random values in `[0, 1)`.
///
/// Implemented for every [`RngCore`], so `SmallRng`, `StdRng` and
/// `thread_rng()` all work directly. [`SequenceSource`] replays a fixed list.
pub trait RandomSource {
    /// Next uniform value in `[0, 1)`.
    fn next_unit(&mut self) -> f32;

    /// Uniform value in `[min, max)`.
    #[inline]
    fn range(&mut self, min: f32, max: f32) -> f32 {
        min + (max - min) * self.next_unit()
    }
}

impl<R: RngCore> RandomSource for R {
    #[inline]
    fn next_unit(&mut self) -> f32 {
        self.gen::<f32>()
    }
}

/// Replays a fixed list of rolls, wrapping around at the end.
///
/// Values are clamped into `[0, 1)`. An empty list always yields `0.0`.
#[derive(Debug, Clone)]
pub struct SequenceSource {
    values: Vec<f32>,
    cursor: usize,
}

impl SequenceSource {
    pub fn new(values: impl Into<Vec<f32>>) -> Self {
        Self {
            values: values.into(),
            cursor: 0,
        }
    }

    /// Number of values drawn so far.
    pub fn drawn(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for SequenceSource {
    fn next_unit(&mut self) -> f32 {
        if self.values.is_empty() {
            return 0.0;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        clamp_unit(value)
    }
}

/// Clamp into `[0, 1)`; NaN becomes 0.
#[inline]
fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0 - f32::EPSILON)
    }
}

#[inline]
pub(crate) fn sanitize_extent(value: f32) -> f32 {
    if value.is_finite() && value > MIN_EXTENT {
        value
    } else {
        log::debug!("clamping degenerate extent {value} to {MIN_EXTENT}");
        MIN_EXTENT
    }
}

#[inline]
fn sanitize_offset(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Uniform-volume point inside a sphere centered at the origin.
///
/// Radius uses the inverse CDF `cbrt(u) * radius`; direction uses
/// `theta = 2π·u`, `phi = acos(2v - 1)`.
pub fn sample_scatter_sphere<R: RandomSource + ?Sized>(radius: f32, rng: &mut R) -> Vec3 {
    let radius = sanitize_extent(radius);
    let theta = TAU * rng.next_unit();
    let phi = (2.0 * rng.next_unit() - 1.0).clamp(-1.0, 1.0).acos();
    let r = rng.next_unit().cbrt() * radius;

    Vec3::new(
        r * phi.sin() * theta.cos(),
        r * phi.sin() * theta.sin(),
        r * phi.cos(),
    )
}

/// Point inside an upright cone whose base sits at `y_offset`.
///
/// The height fraction is uniform, the radius tapers linearly to the apex and
/// the in-plane offset is area-uniform within the disk at that height.
pub fn sample_tree_volume<R: RandomSource + ?Sized>(
    height: f32,
    base_radius: f32,
    y_offset: f32,
    rng: &mut R,
) -> Vec3 {
    let height = sanitize_extent(height);
    let base_radius = sanitize_extent(base_radius);
    let y_offset = sanitize_offset(y_offset);

    let h = rng.next_unit();
    let radius_at_height = (1.0 - h) * base_radius;
    let angle = TAU * rng.next_unit();
    let r = rng.next_unit().sqrt() * radius_at_height;

    Vec3::new(r * angle.cos(), y_offset + h * height, r * angle.sin())
}

/// Deterministic point on the cone surface for ornament `index` of `total`.
///
/// Height fraction is `index / total`; the angle advances by
/// [`GOLDEN_ANGLE`] per index.
pub fn sample_tree_spiral(
    index: u32,
    total: u32,
    height: f32,
    base_radius: f32,
    y_offset: f32,
) -> Vec3 {
    let height = sanitize_extent(height);
    let base_radius = sanitize_extent(base_radius);
    let y_offset = sanitize_offset(y_offset);
    let total = total.max(1);

    let h = (index.min(total) as f32) / total as f32;
    let angle = index as f32 * GOLDEN_ANGLE;
    let r = (1.0 - h) * base_radius;

    Vec3::new(r * angle.cos(), y_offset + h * height, r * angle.sin())
}

/// Point on a vertical cylinder band around the tree axis.
///
/// Used for the ambient dust field: disk-uniform in XZ up to `radius`,
/// uniform in `[-half_height, half_height)` on Y.
pub fn sample_cylinder<R: RandomSource + ?Sized>(
    radius: f32,
    half_height: f32,
    rng: &mut R,
) -> Vec3 {
    let radius = sanitize_extent(radius);
    let half_height = sanitize_extent(half_height);
    let theta = TAU * rng.next_unit();
    let r = radius * rng.next_unit().sqrt();

    Vec3::new(
        r * theta.cos(),
        rng.range(-half_height, half_height),
        r * theta.sin(),
    )
}

/// Point in a thick spherical shell between `inner` and `outer` radius.
///
/// Uniform in direction and in radius. If the bounds arrive swapped they are
/// reordered.
pub fn sample_spherical_shell<R: RandomSource + ?Sized>(
    inner: f32,
    outer: f32,
    rng: &mut R,
) -> Vec3 {
    let a = sanitize_extent(inner);
    let b = sanitize_extent(outer);
    let (inner, outer) = if a <= b { (a, b) } else { (b, a) };

    let theta = TAU * rng.next_unit();
    let phi = (2.0 * rng.next_unit() - 1.0).clamp(-1.0, 1.0).acos();
    let r = rng.range(inner, outer);

    Vec3::new(
        r * phi.sin() * theta.cos(),
        r * phi.sin() * theta.sin(),
        r * phi.cos(),
    )
}
