use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::RegistryError;

/// Light levels run from 0 to 15.
pub const LIGHT_LEVELS: usize = 16;

/// An opaque RGB color.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const MAGENTA: Self = Self::new(0xff, 0, 0xff);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Scales every channel by `factor`, clamping to the valid range.
    pub fn scaled(self, factor: f64) -> Self {
        let channel = |c: u8| (factor * f64::from(c)).clamp(0.0, 255.0) as u8;

        Self::new(channel(self.r), channel(self.g), channel(self.b))
    }

    /// Multiplies two colors channel by channel, as used for biome tinting.
    pub fn mix(self, other: Self) -> Self {
        let channel = |a: u8, b: u8| (u16::from(a) * u16::from(b) / 255) as u8;

        Self::new(
            channel(self.r, other.r),
            channel(self.g, other.g),
            channel(self.b, other.b),
        )
    }

    /// Light factor applied to a block lit at `light`: `0.9^(15 - light)`.
    pub fn light_factor(light: i32) -> f64 {
        0.9_f64.powi(15 - light)
    }

    /// Precomputes this color for every light level.
    pub fn light_levels(self) -> [Self; LIGHT_LEVELS] {
        std::array::from_fn(|light| self.scaled(Self::light_factor(light as i32)))
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = RegistryError;

    /// Parses `rrggbb`, optionally prefixed with `#`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);

        if hex.len() != 6 || !hex.is_ascii() {
            return Err(RegistryError::InvalidColor(s.to_owned()));
        }

        let rgb = u32::from_str_radix(hex, 16)
            .map_err(|_| RegistryError::InvalidColor(s.to_owned()))?;

        Ok(Self::new((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8))
    }
}

impl TryFrom<String> for Color {
    type Error = RegistryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
