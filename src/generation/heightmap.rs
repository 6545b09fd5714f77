//! Layered value-noise heightmaps
//!
//! Each octave is a coarse grid of uniform random values, upsampled to full
//! resolution with a fixed bilinear kernel and blended by weight. The kernel
//! uses half-pixel centres: output pixel `p` of an upsample by integer factor
//! `s` reads the coarse grid at `u = (p + 0.5) / s - 0.5`, clamped to
//! `[0, coarse - 1]`, and interpolates between `floor(u)` and the next cell
//! (clamped at the edge).

use std::path::Path;

use rand::Rng;

use crate::generation::GenerationError;
use crate::generation::config::Octave;

/// Square grid of column heights in `[0, 1]`, indexed `y * size + x`
#[derive(Clone, Debug, PartialEq)]
pub struct HeightMap {
    size: usize,
    values: Vec<f64>,
}

impl HeightMap {
    /// Flat heightmap of zeros
    pub fn new(size: usize) -> Self {
        Self {
            size,
            values: vec![0.0; size * size],
        }
    }

    /// Blend `octaves` of random noise drawn from `rng` into a `size`×`size` map.
    ///
    /// Octaves are drawn in table order, each row-major. The result is divided by
    /// the total weight so values stay in `[0, 1]`.
    pub fn layered<R: Rng>(size: usize, octaves: &[Octave], rng: &mut R) -> Result<Self, GenerationError> {
        let total_weight: f64 = octaves.iter().map(|o| o.weight).sum();
        if octaves.is_empty() || total_weight <= 0.0 {
            return Err(GenerationError::InvalidParams("no weighted octaves".to_string()));
        }

        let mut map = Self::new(size);
        for octave in octaves {
            if octave.size == 0 {
                return Err(GenerationError::InvalidParams("octave size is zero".to_string()));
            }
            let coarse_size = size / octave.size;
            let coarse: Vec<f64> = (0..coarse_size * coarse_size)
                .map(|_| rng.random::<f64>())
                .collect();

            let upsampled = upsample_bilinear(&coarse, coarse_size, octave.size);
            if upsampled.size != size {
                return Err(GenerationError::ResolutionMismatch {
                    octave: octave.size,
                    expected: size,
                    found: upsampled.size,
                });
            }

            for (h, v) in map.values.iter_mut().zip(&upsampled.values) {
                *h += v * octave.weight;
            }
        }

        for h in &mut map.values {
            *h = (*h / total_weight).clamp(0.0, 1.0);
        }
        Ok(map)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Value at column `(x, y)`; panics when out of range
    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.values[y * self.size + x]
    }

    /// Value at column `(x, y)` or `None` outside the map
    pub fn try_get(&self, x: i64, y: i64) -> Option<f64> {
        let n = self.size as i64;
        if (0..n).contains(&x) && (0..n).contains(&y) {
            Some(self.get(x as usize, y as usize))
        } else {
            None
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Column height for heightmap value `h`: `floor((h - 0.5) * magnitude + level)`
    pub fn column_height(h: f64, level: i64, magnitude: f64) -> i64 {
        ((h - 0.5) * magnitude + level as f64).floor() as i64
    }

    /// Write the map as an 8-bit grayscale PNG
    pub fn save_png(&self, path: &Path) -> image::ImageResult<()> {
        let side = self.size as u32;
        let image = image::GrayImage::from_fn(side, side, |x, y| {
            image::Luma([(self.get(x as usize, y as usize) * 255.0) as u8])
        });
        image.save(path)
    }
}

/// Upsample a square `coarse_size` grid by integer `factor` with the bilinear kernel above.
pub fn upsample_bilinear(coarse: &[f64], coarse_size: usize, factor: usize) -> HeightMap {
    let size = coarse_size * factor;
    let mut out = HeightMap::new(size);
    if coarse_size == 0 {
        return out;
    }

    let last = (coarse_size - 1) as f64;
    // Per-axis sample positions are identical for x and y
    let taps: Vec<(usize, usize, f64)> = (0..size)
        .map(|p| {
            let u = ((p as f64 + 0.5) / factor as f64 - 0.5).clamp(0.0, last);
            let i0 = u.floor() as usize;
            let i1 = (i0 + 1).min(coarse_size - 1);
            (i0, i1, u - i0 as f64)
        })
        .collect();

    for (y, &(y0, y1, fy)) in taps.iter().enumerate() {
        for (x, &(x0, x1, fx)) in taps.iter().enumerate() {
            let top = coarse[y0 * coarse_size + x0] * (1.0 - fx) + coarse[y0 * coarse_size + x1] * fx;
            let bottom = coarse[y1 * coarse_size + x0] * (1.0 - fx) + coarse[y1 * coarse_size + x1] * fx;
            out.values[y * size + x] = top * (1.0 - fy) + bottom * fy;
        }
    }
    out
}
