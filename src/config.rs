//! Tunable scene parameters.
//!
//! Every constant that shapes the scene lives in [`SceneConfig`]. The
//! defaults reproduce the reference look; a JSON file can override any subset
//! of fields:
//!
//! ```json
//! {
//!   "tree": { "height": 15.0 },
//!   "foliage": { "count": 20000 },
//!   "spheres": {
//!     "palette": [
//!       { "color": "#ffd700", "weight": 3 },
//!       { "color": "#8a0000", "weight": 1, "never_enlarged": true }
//!     ]
//!   },
//!   "initial_state": "formed"
//! }
//! ```

use crate::error::ConfigError;
use crate::morph::MorphState;
use crate::palette::{hex_color, rgb8, WeightedPalette};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Cone the formation state fills.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeShape {
    pub height: f32,
    pub base_radius: f32,
    /// Y coordinate of the cone base.
    pub y_offset: f32,
}

impl Default for TreeShape {
    fn default() -> Self {
        Self {
            height: 13.0,
            base_radius: 5.5,
            y_offset: -6.5,
        }
    }
}

/// The morphing foliage point cloud.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FoliageConfig {
    pub count: u32,
    pub damping: f32,
    /// Share of points drawn in the accent colour (by random seed).
    pub accent_fraction: f32,
    #[serde(with = "hex_color")]
    pub color: Vec3,
    #[serde(with = "hex_color")]
    pub accent_color: Vec3,
    /// Base point size in world units.
    pub point_size: f32,
}

impl Default for FoliageConfig {
    fn default() -> Self {
        Self {
            count: 14_000,
            damping: 1.5,
            accent_fraction: 0.05,
            color: rgb8(0x0f, 0x6b, 0x3a),
            accent_color: rgb8(0xff, 0xd7, 0x00),
            point_size: 0.12,
        }
    }
}

/// One instanced ornament group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrnamentConfig {
    pub count: u32,
    pub damping: f32,
    /// Multiplier on the tree base radius for the spiral placement.
    pub radius_scale: f32,
    /// Uniform size of one instance at scale 1.
    pub size: f32,
    pub palette: WeightedPalette,
}

impl OrnamentConfig {
    pub fn spheres() -> Self {
        Self {
            count: 250,
            damping: 1.8,
            radius_scale: 0.9,
            size: 0.22,
            palette: WeightedPalette::sphere_default(),
        }
    }

    pub fn boxes() -> Self {
        Self {
            count: 100,
            damping: 1.2,
            radius_scale: 0.8,
            size: 0.35,
            palette: WeightedPalette::box_default(),
        }
    }
}

impl Default for OrnamentConfig {
    fn default() -> Self {
        Self::spheres()
    }
}

/// Ambient golden dust drifting around the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DustConfig {
    pub count: u32,
    pub radius: f32,
    pub half_height: f32,
    #[serde(with = "hex_color")]
    pub color: Vec3,
    pub point_size: f32,
}

impl Default for DustConfig {
    fn default() -> Self {
        Self {
            count: 300,
            radius: 12.0,
            half_height: 10.0,
            color: rgb8(0xff, 0xd7, 0x00),
            point_size: 0.08,
        }
    }
}

/// Background star shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarConfig {
    pub count: u32,
    pub inner_radius: f32,
    pub outer_radius: f32,
    pub point_size: f32,
}

impl Default for StarConfig {
    fn default() -> Self {
        Self {
            count: 1_500,
            inner_radius: 60.0,
            outer_radius: 100.0,
            point_size: 0.35,
        }
    }
}

/// Complete scene configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub tree: TreeShape,
    pub scatter_radius: f32,
    /// Vertical amplitude of the idle float while scattered.
    pub float_amplitude: f32,
    pub initial_state: MorphState,
    /// Fixed RNG seed. `None` draws one from the OS.
    pub seed: Option<u64>,
    pub foliage: FoliageConfig,
    pub spheres: OrnamentConfig,
    pub boxes: OrnamentConfig,
    pub dust: DustConfig,
    pub stars: StarConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            tree: TreeShape::default(),
            scatter_radius: 25.0,
            float_amplitude: 0.5,
            initial_state: MorphState::Scattered,
            seed: None,
            foliage: FoliageConfig::default(),
            spheres: OrnamentConfig::spheres(),
            boxes: OrnamentConfig::boxes(),
            dust: DustConfig::default(),
            stars: StarConfig::default(),
        }
    }
}

impl SceneConfig {
    /// Parse and validate a JSON document. Missing fields keep their defaults.
    ///
    /// The document is layered over the serialized defaults, so a partial
    /// `boxes` object still inherits the box defaults rather than the sphere
    /// ones. Arrays (palettes) replace the default wholesale.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let overrides: Value = serde_json::from_str(text)?;
        let mut merged = serde_json::to_value(SceneConfig::default())?;
        merge_json(&mut merged, overrides);
        let config: SceneConfig = serde_json::from_value(merged)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;
        log::info!("loaded scene config from {}", path.display());
        Ok(config)
    }

    /// Reject values the builders cannot sensibly clamp.
    ///
    /// Zero or negative geometry is left to the samplers, which clamp it.
    /// Non-finite numbers and out-of-range fractions are errors here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let scalars = [
            ("tree.height", self.tree.height),
            ("tree.base_radius", self.tree.base_radius),
            ("tree.y_offset", self.tree.y_offset),
            ("scatter_radius", self.scatter_radius),
            ("float_amplitude", self.float_amplitude),
            ("foliage.damping", self.foliage.damping),
            ("foliage.point_size", self.foliage.point_size),
            ("spheres.damping", self.spheres.damping),
            ("spheres.radius_scale", self.spheres.radius_scale),
            ("spheres.size", self.spheres.size),
            ("boxes.damping", self.boxes.damping),
            ("boxes.radius_scale", self.boxes.radius_scale),
            ("boxes.size", self.boxes.size),
            ("dust.radius", self.dust.radius),
            ("dust.half_height", self.dust.half_height),
            ("stars.inner_radius", self.stars.inner_radius),
            ("stars.outer_radius", self.stars.outer_radius),
        ];
        for (name, value) in scalars {
            if !value.is_finite() {
                return Err(ConfigError::Invalid(format!("{name} must be finite, got {value}")));
            }
        }

        for (name, damping) in [
            ("foliage.damping", self.foliage.damping),
            ("spheres.damping", self.spheres.damping),
            ("boxes.damping", self.boxes.damping),
        ] {
            if damping < 0.0 {
                return Err(ConfigError::Invalid(format!("{name} must not be negative")));
            }
        }

        if !(0.0..=1.0).contains(&self.foliage.accent_fraction) {
            return Err(ConfigError::Invalid(format!(
                "foliage.accent_fraction must be within [0, 1], got {}",
                self.foliage.accent_fraction
            )));
        }

        for (name, palette) in [("spheres", &self.spheres.palette), ("boxes", &self.boxes.palette)] {
            if palette.is_empty() {
                log::warn!("{name}.palette is empty, ornaments fall back to white");
            }
        }

        Ok(())
    }
}

fn merge_json(base: &mut Value, overrides: Value) {
    match (base, overrides) {
        (Value::Object(base), Value::Object(overrides)) => {
            for (key, value) in overrides {
                match base.get_mut(&key) {
                    Some(slot) => merge_json(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
