//! Weighted colour palettes for ornaments.
//!
//! A palette is an ordered list of entries, each with a relative weight. A
//! single uniform roll picks an entry by walking the cumulative weights, so
//! an entry listed with weight 3 out of a total of 5 is drawn 60% of the time.
//!
//! Entries can be flagged `never_enlarged`: ornaments painted with such a
//! colour always get the base size tier (see [`crate::dataset::SizeTier`]).
//!
//! # Example
//!
//! ```ignore
//! let palette = WeightedPalette::new(vec![
//!     PaletteEntry::new(parse_hex_color("#ffd700").unwrap(), 3),
//!     PaletteEntry::new(parse_hex_color("#8a0000").unwrap(), 1).never_enlarged(),
//!     PaletteEntry::new(parse_hex_color("#f7e7ce").unwrap(), 1),
//! ]);
//! let entry = palette.pick(0.42);
//! ```

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Colour used when a palette has nothing to offer.
pub const FALLBACK_COLOR: Vec3 = Vec3::ONE;

const FALLBACK_ENTRY: PaletteEntry = PaletteEntry {
    color: FALLBACK_COLOR,
    weight: 1,
    never_enlarged: false,
};

/// One weighted palette colour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaletteEntry {
    /// Linear RGB, each channel 0.0-1.0. Serialized as `"#rrggbb"`.
    #[serde(with = "hex_color")]
    pub color: Vec3,
    /// Relative draw weight. Zero-weight entries are never picked.
    #[serde(default = "default_weight")]
    pub weight: u32,
    /// Ornaments with this colour skip the enlarged size tiers.
    #[serde(default)]
    pub never_enlarged: bool,
}

fn default_weight() -> u32 {
    1
}

impl PaletteEntry {
    pub const fn new(color: Vec3, weight: u32) -> Self {
        Self {
            color,
            weight,
            never_enlarged: false,
        }
    }

    /// Mark this entry as excluded from bonus size rolls.
    pub fn never_enlarged(mut self) -> Self {
        self.never_enlarged = true;
        self
    }
}

/// Ordered, weighted list of palette entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightedPalette {
    entries: Vec<PaletteEntry>,
}

impl WeightedPalette {
    pub fn new(entries: Vec<PaletteEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[PaletteEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.total_weight() == 0
    }

    /// Sum of all entry weights.
    pub fn total_weight(&self) -> u64 {
        self.entries.iter().map(|e| e.weight as u64).sum()
    }

    /// Pick an entry for a uniform `roll` in `[0, 1)`.
    ///
    /// Rolls outside the range are clamped. An empty or all-zero palette
    /// returns a white entry that is not flagged `never_enlarged`.
    pub fn pick(&self, roll: f32) -> &PaletteEntry {
        let total = self.total_weight();
        if total == 0 {
            return &FALLBACK_ENTRY;
        }

        let roll = if roll.is_nan() { 0.0 } else { roll.clamp(0.0, 1.0) };
        let target = ((roll as f64 * total as f64) as u64).min(total - 1);

        let mut cumulative = 0u64;
        for entry in &self.entries {
            cumulative += entry.weight as u64;
            if target < cumulative {
                return entry;
            }
        }
        // target < total, so the loop always returns.
        &FALLBACK_ENTRY
    }

    /// Sphere ornament palette: gold dominates, deep red is the rare accent
    /// that never gets enlarged.
    pub fn sphere_default() -> Self {
        Self::new(vec![
            PaletteEntry::new(rgb8(0xff, 0xd7, 0x00), 3),
            PaletteEntry::new(rgb8(0x8a, 0x00, 0x00), 1).never_enlarged(),
            PaletteEntry::new(rgb8(0xf7, 0xe7, 0xce), 1),
        ])
    }

    /// Gift box palette.
    pub fn box_default() -> Self {
        Self::new(vec![
            PaletteEntry::new(rgb8(0x8a, 0x00, 0x00), 2),
            PaletteEntry::new(rgb8(0xff, 0xd7, 0x00), 1),
            PaletteEntry::new(rgb8(0x0b, 0x5d, 0x1e), 1),
            PaletteEntry::new(rgb8(0xff, 0xff, 0xf0), 1),
        ])
    }
}

/// Colour from 8-bit channels.
pub fn rgb8(r: u8, g: u8, b: u8) -> Vec3 {
    Vec3::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
}

/// Parse `#rrggbb` or `rrggbb` into an RGB vector.
pub fn parse_hex_color(text: &str) -> Option<Vec3> {
    let hex = text.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(rgb8(channel(0)?, channel(2)?, channel(4)?))
}

/// Format an RGB vector as `#rrggbb`.
pub fn format_hex_color(color: Vec3) -> String {
    let c = (color.clamp(Vec3::ZERO, Vec3::ONE) * 255.0).round();
    format!("#{:02x}{:02x}{:02x}", c.x as u8, c.y as u8, c.z as u8)
}

pub(crate) mod hex_color {
    use glam::Vec3;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(color: &Vec3, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_hex_color(*color))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec3, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_hex_color(&text)
            .ok_or_else(|| de::Error::custom(format!("invalid colour {text:?}, expected #rrggbb")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        let red = parse_hex_color("#8a0000").unwrap();
        assert_eq!(red, rgb8(0x8a, 0, 0));
        assert_eq!(parse_hex_color("ffffff"), Some(Vec3::ONE));
        assert_eq!(parse_hex_color("#fff"), None);
        assert_eq!(parse_hex_color("#gg0000"), None);
        assert_eq!(format_hex_color(red), "#8a0000");
    }

    #[test]
    fn test_pick_follows_weights() {
        let palette = WeightedPalette::sphere_default();
        // Gold covers [0, 0.6), red [0.6, 0.8), champagne [0.8, 1.0).
        assert_eq!(palette.pick(0.0).color, rgb8(0xff, 0xd7, 0x00));
        assert_eq!(palette.pick(0.59).color, rgb8(0xff, 0xd7, 0x00));
        assert!(palette.pick(0.61).never_enlarged);
        assert_eq!(palette.pick(0.99).color, rgb8(0xf7, 0xe7, 0xce));
        assert_eq!(palette.pick(1.5).color, rgb8(0xf7, 0xe7, 0xce));
    }

    #[test]
    fn test_empty_palette_falls_back() {
        let empty = WeightedPalette::default();
        assert!(empty.is_empty());
        assert_eq!(empty.pick(0.3).color, FALLBACK_COLOR);

        let zero = WeightedPalette::new(vec![PaletteEntry::new(Vec3::ZERO, 0)]);
        assert_eq!(zero.pick(0.7).color, FALLBACK_COLOR);
        assert!(!zero.pick(0.7).never_enlarged);
    }

    #[test]
    fn test_zero_weight_entry_is_skipped() {
        let palette = WeightedPalette::new(vec![
            PaletteEntry::new(Vec3::X, 0),
            PaletteEntry::new(Vec3::Y, 1),
        ]);
        assert_eq!(palette.pick(0.0).color, Vec3::Y);
    }

    #[test]
    fn test_serde_roundtrip_uses_hex() {
        let palette = WeightedPalette::sphere_default();
        let json = serde_json::to_string(&palette).unwrap();
        assert!(json.contains("\"#8a0000\""));
        let back: WeightedPalette = serde_json::from_str(&json).unwrap();
        assert_eq!(back.entries().len(), 3);
        assert!(back.entries()[1].never_enlarged);
    }
}
