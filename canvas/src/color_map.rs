//! Pseudocolor lookup tables for scalar imagery.
//!
//! A [`ColorMap`] maps a scalar sample to a display color. The scalar's domain is mapped linearly
//! onto the table, `index = clamp((value - min) / (max - min)) * (len - 1)`, and the entry is then
//! picked by rounding the index or by blending the two neighbouring entries.
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::ImageError;
use crate::math;

/// The built-in palettes.
///
/// This is a closed set on purpose. Each palette is a pure function of the normalized index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PaletteKind {
    /// Black to white.
    #[default]
    Grayscale,
    /// Black, red, yellow, white.
    Hot,
    /// Cyan to magenta.
    Cool,
    /// Dark blue, cyan, yellow, dark red.
    Jet,
    /// Purple, blue, green, yellow. Perceptually uniform.
    Viridis,
    /// Black, purple, red, yellow. Perceptually uniform.
    Inferno,
}

/// How a fractional table position is resolved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Interpolation {
    /// Round to the closest entry, an exact midpoint rounds towards the upper entry.
    #[default]
    Nearest,
    /// Blend the two bracketing entries.
    Linear,
}

/// An immutable lookup table from scalars to RGB colors.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorMap {
    entries: Box<[[u8; 3]]>,
    domain_min: f64,
    domain_max: f64,
    interpolation: Interpolation,
}

/// The palette selection, as configured by a user.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PaletteConfig {
    pub kind: PaletteKind,
    /// The number of table entries.
    pub size: usize,
    pub domain_min: f64,
    pub domain_max: f64,
    pub interpolation: Interpolation,
}

/// A color map that is replaced as a whole while conversions keep reading it.
///
/// Readers get an `Arc` to the table that was current at the time, which is never modified. A
/// palette change builds the complete new table first and then swaps the reference, so every
/// reader sees either the old or the new table in its entirety, never a mixture.
#[derive(Debug)]
pub struct SharedColorMap {
    current: RwLock<Arc<ColorMap>>,
}

impl PaletteKind {
    pub const ALL: [Self; 6] = [
        PaletteKind::Grayscale,
        PaletteKind::Hot,
        PaletteKind::Cool,
        PaletteKind::Jet,
        PaletteKind::Viridis,
        PaletteKind::Inferno,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PaletteKind::Grayscale => "Grayscale",
            PaletteKind::Hot => "Hot",
            PaletteKind::Cool => "Cool",
            PaletteKind::Jet => "Jet",
            PaletteKind::Viridis => "Viridis",
            PaletteKind::Inferno => "Inferno",
        }
    }

    /// The color at a normalized position in `[0, 1]`, with channels in `[0, 1]`.
    fn sample(self, t: f32) -> [f32; 3] {
        let ramp = |v: f32| v.clamp(0.0, 1.0);
        match self {
            PaletteKind::Grayscale => [t, t, t],
            PaletteKind::Hot => [ramp(3.0 * t), ramp(3.0 * t - 1.0), ramp(3.0 * t - 2.0)],
            PaletteKind::Cool => [t, 1.0 - t, 1.0],
            PaletteKind::Jet => [
                ramp(1.5 - math::abs(4.0 * t - 3.0)),
                ramp(1.5 - math::abs(4.0 * t - 2.0)),
                ramp(1.5 - math::abs(4.0 * t - 1.0)),
            ],
            PaletteKind::Viridis => polynomial(t, &VIRIDIS),
            PaletteKind::Inferno => polynomial(t, &INFERNO),
        }
    }
}

/// Sixth-degree fits of the matplotlib palettes, coefficients by increasing power.
const VIRIDIS: [[f32; 3]; 7] = [
    [0.277_727_33, 0.005_407_344_5, 0.334_099_8],
    [0.105_093_04, 1.404_613_5, 1.384_590_2],
    [-0.330_861_83, 0.214_847_56, 0.095_095_16],
    [-4.634_230_6, -5.799_101, -19.332_441],
    [6.228_27, 14.179_933, 56.690_55],
    [4.776_385, -13.745_145, -65.353_03],
    [-5.435_456, 4.645_852_6, 26.312_435],
];

const INFERNO: [[f32; 3]; 7] = [
    [0.000_218_940_37, 0.001_651_004_6, -0.019_480_898],
    [0.106_513_42, 0.563_956_44, 3.932_712_3],
    [11.602_493, -3.972_854, -15.942_394],
    [-41.703_995, 17.436_399, 44.354_145],
    [77.162_94, -33.402_36, -81.807_31],
    [-71.319_43, 32.626_064, 73.209_52],
    [25.131_126, -12.242_669, -23.070_326],
];

fn polynomial(t: f32, coefficients: &[[f32; 3]; 7]) -> [f32; 3] {
    let mut color = [0.0; 3];
    for (channel, value) in color.iter_mut().enumerate() {
        // Horner's scheme, from the highest power down.
        let sum = coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, c| acc * t + c[channel]);
        *value = sum.clamp(0.0, 1.0);
    }
    color
}

impl ColorMap {
    /// The largest table, one entry for every 16-bit value.
    pub const MAX_ENTRIES: usize = 1 << 16;

    /// Build the table of a palette, with nearest-entry lookup.
    ///
    /// Fails with `InvalidDomain` if `domain_min >= domain_max`, if either is not finite, or if
    /// `size` is zero or larger than [`Self::MAX_ENTRIES`].
    ///
    /// # Usage
    ///
    /// ```
    /// use image_view::{ColorMap, PaletteKind};
    ///
    /// // A 12-bit sensor, shown with the hot palette.
    /// let map = ColorMap::build(PaletteKind::Hot, 256, 0.0, 4095.0)?;
    ///
    /// assert_eq!(map.lookup(0.0), Some([0, 0, 0]));
    /// assert_eq!(map.lookup(4095.0), Some([255, 255, 255]));
    /// // Outside of the domain we clamp to the end of the table.
    /// assert_eq!(map.lookup(1e9), Some([255, 255, 255]));
    /// assert_eq!(map.lookup(f64::NAN), None);
    /// # Ok::<_, image_view::ImageError>(())
    /// ```
    pub fn build(
        kind: PaletteKind,
        size: usize,
        domain_min: f64,
        domain_max: f64,
    ) -> Result<Self, ImageError> {
        Self::check_domain(domain_min, domain_max, size)?;
        if size > Self::MAX_ENTRIES {
            return Err(Self::domain_error(domain_min, domain_max, size));
        }

        let last = (size - 1).max(1) as f32;
        let entries: Vec<[u8; 3]> = (0..size)
            .map(|idx| kind.sample(idx as f32 / last).map(quantize))
            .collect();

        Self::from_entries(entries, domain_min, domain_max)
    }

    /// Create a map from custom table entries, with nearest-entry lookup.
    pub fn from_entries(
        entries: Vec<[u8; 3]>,
        domain_min: f64,
        domain_max: f64,
    ) -> Result<Self, ImageError> {
        Self::check_domain(domain_min, domain_max, entries.len())?;

        Ok(ColorMap {
            entries: entries.into_boxed_slice(),
            domain_min,
            domain_max,
            interpolation: Interpolation::default(),
        })
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn entries(&self) -> &[[u8; 3]] {
        &self.entries
    }

    /// The scalar values mapped onto the first and the last entry.
    pub fn domain(&self) -> [f64; 2] {
        [self.domain_min, self.domain_max]
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    /// Whether a value is finite and within the domain, inclusive.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.domain_min && value <= self.domain_max
    }

    /// The fractional table position of a value, clamped to the table.
    ///
    /// Returns `None` for values that are not finite.
    pub fn position(&self, value: f64) -> Option<f64> {
        if !value.is_finite() {
            return None;
        }

        let (min, max) = (self.domain_min, self.domain_max);
        let t = if (max - min).is_finite() {
            (value - min) / (max - min)
        } else {
            // The span overflows for domains wider than `f64::MAX`, halving first keeps it finite.
            (value * 0.5 - min * 0.5) / (max * 0.5 - min * 0.5)
        };
        Some(t.clamp(0.0, 1.0) * (self.entries.len() - 1) as f64)
    }

    /// The color of a scalar value.
    ///
    /// Returns `None` for values that are not finite, which have no place in the table.
    pub fn lookup(&self, value: f64) -> Option<[u8; 3]> {
        let pos = self.position(value)?;
        let last = self.entries.len() - 1;

        Some(match self.interpolation {
            Interpolation::Nearest => self.entries[(math::round64(pos) as usize).min(last)],
            Interpolation::Linear => {
                let lower = math::floor64(pos);
                let frac = (pos - lower) as f32;
                let lower = (lower as usize).min(last);
                let upper = (lower + 1).min(last);
                let [a, b] = [self.entries[lower], self.entries[upper]];
                std::array::from_fn(|ch| {
                    let (a, b) = (f32::from(a[ch]), f32::from(b[ch]));
                    math::round(a + (b - a) * frac) as u8
                })
            }
        })
    }

    fn check_domain(domain_min: f64, domain_max: f64, size: usize) -> Result<(), ImageError> {
        let finite = domain_min.is_finite() && domain_max.is_finite();
        if !finite || domain_min >= domain_max || size == 0 {
            return Err(Self::domain_error(domain_min, domain_max, size));
        }

        Ok(())
    }

    fn domain_error(min: f64, max: f64, size: usize) -> ImageError {
        ImageError::InvalidDomain { min, max, size }
    }
}

fn quantize(channel: f32) -> u8 {
    math::round(channel * 255.0) as u8
}

impl PaletteConfig {
    pub fn build(&self) -> Result<ColorMap, ImageError> {
        Ok(
            ColorMap::build(self.kind, self.size, self.domain_min, self.domain_max)?
                .with_interpolation(self.interpolation),
        )
    }
}

impl Default for PaletteConfig {
    /// A grayscale table covering 8-bit samples.
    fn default() -> Self {
        PaletteConfig {
            kind: PaletteKind::Grayscale,
            size: 256,
            domain_min: 0.0,
            domain_max: 255.0,
            interpolation: Interpolation::Nearest,
        }
    }
}

impl SharedColorMap {
    pub fn new(map: ColorMap) -> Self {
        SharedColorMap {
            current: RwLock::new(Arc::new(map)),
        }
    }

    /// The table that is current right now.
    ///
    /// The table stays valid, and unchanged, for as long as the `Arc` is held.
    pub fn load(&self) -> Arc<ColorMap> {
        // The lock only guards a pointer swap, a poisoned lock still holds a complete table.
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&current)
    }

    /// Make a new table current, returning the previous one.
    pub fn replace(&self, map: ColorMap) -> Arc<ColorMap> {
        let map = Arc::new(map);
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        log::debug!(
            "replacing color map: {} entries, domain {:?}",
            map.entries.len(),
            map.domain()
        );
        std::mem::replace(&mut *current, map)
    }

    /// Build a table from a configuration and make it current.
    ///
    /// On failure the current table stays in place.
    pub fn rebuild(&self, config: &PaletteConfig) -> Result<(), ImageError> {
        let map = config.build()?;
        log::debug!("rebuilt {} palette", config.kind.label());
        self.replace(map);
        Ok(())
    }
}

impl From<ColorMap> for SharedColorMap {
    fn from(map: ColorMap) -> Self {
        SharedColorMap::new(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_entries_nearest() -> Result<(), ImageError> {
        let map = ColorMap::from_entries(vec![[0; 3], [255; 3]], 0.0, 255.0)?;

        assert_eq!(map.lookup(0.0), Some([0; 3]));
        assert_eq!(map.lookup(255.0), Some([255; 3]));
        // 128/255 is just past the middle of the table.
        assert_eq!(map.lookup(128.0), Some([255; 3]));
        assert_eq!(map.lookup(127.0), Some([0; 3]));
        // An exact midpoint rounds up.
        assert_eq!(map.lookup(127.5), Some([255; 3]));
        Ok(())
    }

    #[test]
    fn two_entries_linear() -> Result<(), ImageError> {
        let map = ColorMap::from_entries(vec![[0; 3], [255; 3]], 0.0, 255.0)?
            .with_interpolation(Interpolation::Linear);

        assert_eq!(map.lookup(0.0), Some([0; 3]));
        assert_eq!(map.lookup(255.0), Some([255; 3]));
        assert_eq!(map.lookup(128.0), Some([128; 3]));
        assert_eq!(map.lookup(127.5), Some([128; 3]));
        assert_eq!(map.lookup(-10.0), Some([0; 3]));
        assert_eq!(map.lookup(f64::INFINITY), None);
        Ok(())
    }

    #[test]
    fn rejects_bad_domains() {
        let bad = [
            (PaletteKind::Hot, 256, 1.0, 1.0),
            (PaletteKind::Hot, 256, 2.0, 1.0),
            (PaletteKind::Hot, 0, 0.0, 1.0),
            (PaletteKind::Hot, ColorMap::MAX_ENTRIES + 1, 0.0, 1.0),
            (PaletteKind::Hot, 16, f64::NAN, 1.0),
            (PaletteKind::Hot, 16, 0.0, f64::INFINITY),
        ];

        for (kind, size, min, max) in bad {
            let err = ColorMap::build(kind, size, min, max).unwrap_err();
            assert!(
                matches!(err, ImageError::InvalidDomain { .. }),
                "{:?}",
                (size, min, max)
            );
        }

        assert!(ColorMap::from_entries(vec![], 0.0, 1.0).is_err());
    }

    #[test]
    fn palettes_are_well_formed() -> Result<(), ImageError> {
        for kind in PaletteKind::ALL {
            let map = ColorMap::build(kind, 256, 0.0, 1.0)?;
            assert_eq!(map.entries().len(), 256, "{}", kind.label());
        }

        let gray = ColorMap::build(PaletteKind::Grayscale, 256, 0.0, 255.0)?;
        for (idx, entry) in gray.entries().iter().enumerate() {
            assert_eq!(*entry, [idx as u8; 3]);
        }

        let hot = ColorMap::build(PaletteKind::Hot, 4, 0.0, 1.0)?;
        assert_eq!(hot.entries()[0], [0, 0, 0]);
        assert_eq!(hot.entries()[3], [255, 255, 255]);

        // A single entry covers the whole domain.
        let single = ColorMap::build(PaletteKind::Cool, 1, 0.0, 1.0)?;
        assert_eq!(single.lookup(0.7), Some([0, 255, 255]));
        Ok(())
    }

    #[test]
    fn domain_wider_than_f64_range() -> Result<(), ImageError> {
        let map = ColorMap::build(PaletteKind::Grayscale, 256, -f64::MAX, f64::MAX)?;

        assert_eq!(map.lookup(f64::MAX), Some([255; 3]));
        assert_eq!(map.lookup(0.0), Some([128; 3]));
        assert_eq!(map.lookup(-f64::MAX), Some([0; 3]));

        let linear = map.with_interpolation(Interpolation::Linear);
        assert_eq!(linear.lookup(0.0), Some([128; 3]));
        Ok(())
    }

    #[test]
    fn shared_map_swaps_whole_tables() -> Result<(), ImageError> {
        let shared = SharedColorMap::new(ColorMap::build(PaletteKind::Grayscale, 16, 0.0, 1.0)?);
        let before = shared.load();

        let err = shared.rebuild(&PaletteConfig {
            size: 0,
            ..PaletteConfig::default()
        });
        assert!(err.is_err());
        assert!(Arc::ptr_eq(&before, &shared.load()));

        shared.rebuild(&PaletteConfig {
            kind: PaletteKind::Jet,
            ..PaletteConfig::default()
        })?;

        let after = shared.load();
        assert_eq!(after.entries().len(), 256);
        // The old table is still intact for whoever holds it.
        assert_eq!(before.entries().len(), 16);
        Ok(())
    }
}
