//! Per-file color assignment and hex conversion

use std::collections::HashMap;

use nom::{
    bytes::complete::take_while_m_n,
    combinator::{all_consuming, map_res, opt},
    character::complete::char,
    sequence::{preceded, tuple},
    IResult,
};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Normalized color, each channel in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

/// Color as three 0-255 channel integers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::new(rng.gen(), rng.gen(), rng.gen())
    }

    pub fn to_rgb8(self) -> Rgb8 {
        let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        Rgb8::new(channel(self.r), channel(self.g), channel(self.b))
    }

    pub fn to_hex(self) -> String {
        self.to_rgb8().to_hex()
    }

    /// Scale every channel, e.g. by a shading factor
    pub fn scaled(self, factor: f32) -> Self {
        Self::new(self.r * factor, self.g * factor, self.b * factor)
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Self::WHITE
    }
}

impl Rgb8 {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `#rrggbb`, lower case
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl From<Rgb8> for Rgb {
    fn from(c: Rgb8) -> Self {
        Rgb::new(
            c.r as f32 / 255.0,
            c.g as f32 / 255.0,
            c.b as f32 / 255.0,
        )
    }
}

/// Parse `#rrggbb` or `rrggbb`, case-insensitive. Anything else is `None`.
pub fn parse_hex(input: &str) -> Option<Rgb8> {
    all_consuming(hex_color)(input).ok().map(|(_, c)| c)
}

fn hex_channel(input: &str) -> IResult<&str, u8> {
    map_res(
        take_while_m_n(2, 2, |c: char| c.is_ascii_hexdigit()),
        |digits| u8::from_str_radix(digits, 16),
    )(input)
}

fn hex_color(input: &str) -> IResult<&str, Rgb8> {
    let (input, (r, g, b)) = preceded(
        opt(char('#')),
        tuple((hex_channel, hex_channel, hex_channel)),
    )(input)?;
    Ok((input, Rgb8::new(r, g, b)))
}

/// Mapping from file name to its assigned color
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorScheme {
    colors: HashMap<String, Rgb>,
}

impl ColorScheme {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh scheme with a uniformly random color per name
    pub fn random_for<'a, I, R>(names: I, rng: &mut R) -> Self
    where
        I: IntoIterator<Item = &'a str>,
        R: Rng + ?Sized,
    {
        let mut scheme = Self::new();
        for name in names {
            scheme.set(name, Rgb::random(rng));
        }
        scheme
    }

    /// Assign a random color to each name that has none yet
    pub fn fill_missing<'a, I, R>(&mut self, names: I, rng: &mut R)
    where
        I: IntoIterator<Item = &'a str>,
        R: Rng + ?Sized,
    {
        for name in names {
            if !self.colors.contains_key(name) {
                self.set(name, Rgb::random(rng));
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Rgb> {
        self.colors.get(name).copied()
    }

    /// The assigned color, or opaque white
    pub fn color_or_default(&self, name: &str) -> Rgb {
        self.get(name).unwrap_or(Rgb::WHITE)
    }

    /// Update one entry; all others are kept
    pub fn set(&mut self, name: &str, color: Rgb) {
        self.colors.insert(name.to_string(), color);
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Rgb)> {
        self.colors.iter().map(|(k, v)| (k.as_str(), *v))
    }
}
