//! Allele descriptors.

use anyhow::{Context, Error, Result, bail};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Display color of an allele, parsed from `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    /// Parse a `#rrggbb` hex string.
    pub fn from_hex(hex: &str) -> Result<Self> {
        let Some(digits) = hex.strip_prefix('#') else {
            bail!("hex color must start with '#', but is {hex:?}");
        };
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            bail!("hex color must have 6 hex digits, but is {hex:?}");
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .with_context(|| format!("invalid hex digits in color {hex:?}"))
        };
        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }
}

impl TryFrom<String> for Rgb {
    type Error = Error;

    fn try_from(hex: String) -> Result<Self> {
        Self::from_hex(&hex)
    }
}

impl From<Rgb> for String {
    fn from(rgb: Rgb) -> Self {
        rgb.to_string()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Trait an allele contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlleleKind {
    Coat,
}

/// Heritable coat-color variant.
///
/// Weeks are weeks of the year (`0..52`) and rates are whiteness change per
/// week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allele {
    pub id: u32,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AlleleKind,
    pub brown_week: f64,
    pub brown_rate: f64,
    pub white_week: f64,
    pub white_rate: f64,
    pub color: Rgb,
}

impl Allele {
    pub fn is_coat(&self) -> bool {
        self.kind == AlleleKind::Coat
    }
}
