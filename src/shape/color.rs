//! Packed RGB colors and the named palette

use std::fmt;

use crate::core::error::Error;
use crate::core::types::Result;

/// 24-bit RGB color
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(0xFF, 0xFF, 0xFF);
    pub const SILVER: Rgb = Rgb::new(0xC0, 0xC0, 0xC0);
    pub const GRAY: Rgb = Rgb::new(0x80, 0x80, 0x80);
    pub const BLACK: Rgb = Rgb::new(0x00, 0x00, 0x00);
    pub const RED: Rgb = Rgb::new(0xFF, 0x00, 0x00);
    pub const MAROON: Rgb = Rgb::new(0x80, 0x00, 0x00);
    pub const YELLOW: Rgb = Rgb::new(0xFF, 0xFF, 0x00);
    pub const OLIVE: Rgb = Rgb::new(0x80, 0x80, 0x00);
    pub const LIME: Rgb = Rgb::new(0x00, 0xFF, 0x00);
    pub const GREEN: Rgb = Rgb::new(0x00, 0x80, 0x00);
    pub const AQUA: Rgb = Rgb::new(0x00, 0xFF, 0xFF);
    pub const TEAL: Rgb = Rgb::new(0x00, 0x80, 0x80);
    pub const BLUE: Rgb = Rgb::new(0x00, 0x00, 0xFF);
    pub const NAVY: Rgb = Rgb::new(0x00, 0x00, 0x80);
    pub const FUCHSIA: Rgb = Rgb::new(0xFF, 0x00, 0xFF);
    pub const PURPLE: Rgb = Rgb::new(0x80, 0x00, 0x80);
    pub const ORANGE: Rgb = Rgb::new(0xFF, 0xA5, 0x00);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Color from a packed `0xRRGGBB` value
    pub fn from_packed(packed: u32) -> Result<Self> {
        if packed > 0xFF_FFFF {
            return Err(Error::InvalidColor(format!("{packed:#x} does not fit in 24 bits")));
        }
        Ok(Self::new((packed >> 16) as u8, (packed >> 8) as u8, packed as u8))
    }

    /// Packed `0xRRGGBB` value
    pub fn packed(self) -> u32 {
        (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b)
    }

    /// Look up a palette name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_lowercase();
        PALETTE.iter().find(|(n, _)| *n == name).map(|&(_, c)| c)
    }

    /// Palette name or `#rrggbb`
    pub fn parse(s: &str) -> Result<Self> {
        if let Some(hex) = s.strip_prefix('#') {
            if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(Error::InvalidColor(s.to_string()));
            }
            let packed = u32::from_str_radix(hex, 16)
                .map_err(|_| Error::InvalidColor(s.to_string()))?;
            return Self::from_packed(packed);
        }
        Self::from_name(s).ok_or_else(|| Error::InvalidColor(s.to_string()))
    }

    /// Every accepted palette name
    pub fn names() -> impl Iterator<Item = &'static str> {
        PALETTE.iter().map(|&(n, _)| n)
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Rgb::LIME
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.packed())
    }
}

const PALETTE: &[(&str, Rgb)] = &[
    ("white", Rgb::WHITE),
    ("silver", Rgb::SILVER),
    ("gray", Rgb::GRAY),
    ("black", Rgb::BLACK),
    ("red", Rgb::RED),
    ("maroon", Rgb::MAROON),
    ("yellow", Rgb::YELLOW),
    ("olive", Rgb::OLIVE),
    ("lime", Rgb::LIME),
    ("green", Rgb::GREEN),
    ("aqua", Rgb::AQUA),
    ("teal", Rgb::TEAL),
    ("blue", Rgb::BLUE),
    ("navy", Rgb::NAVY),
    ("fuchsia", Rgb::FUCHSIA),
    ("purple", Rgb::PURPLE),
    ("orange", Rgb::ORANGE),
    // German aliases
    ("rot", Rgb::RED),
    ("grün", Rgb::GREEN),
    ("blau", Rgb::BLUE),
    ("gelb", Rgb::YELLOW),
    ("lila", Rgb::PURPLE),
    ("weiss", Rgb::WHITE),
    ("weiß", Rgb::WHITE),
];
