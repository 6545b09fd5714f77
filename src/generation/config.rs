//! Generation configuration: seed, column mapping and the octave table.

use serde::{Deserialize, Serialize};

use crate::generation::GenerationError;
use crate::voxel::world::DEFAULT_WORLD_SIZE;

/// One noise layer: coarse grids are `world_size / size` cells wide and contribute `weight`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Octave {
    /// Downscale factor of the coarse grid relative to the heightmap
    pub size: usize,
    /// Influence of this layer on the blended heightmap
    pub weight: f64,
}

impl Octave {
    pub const fn new(size: usize, weight: f64) -> Self {
        Self { size, weight }
    }
}

/// Octave table used when none is configured
pub const DEFAULT_OCTAVES: [Octave; 5] = [
    Octave::new(2, 0.05),
    Octave::new(4, 0.05),
    Octave::new(8, 0.2),
    Octave::new(16, 0.2),
    Octave::new(32, 0.5),
];

/// Which generator fills the world
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// Solid below `level`
    Flat,
    /// Independent random cells at `infill` density
    Debug,
    /// Layered noise heightmap
    #[default]
    Landscape,
}

impl std::str::FromStr for GenerationMode {
    type Err = GenerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flat" => Ok(Self::Flat),
            "debug" => Ok(Self::Debug),
            "landscape" => Ok(Self::Landscape),
            other => Err(GenerationError::InvalidParams(format!("unknown generation mode '{}'", other))),
        }
    }
}

/// Configuration for the terrain generation pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Seed for every random draw made during generation
    pub seed: u64,
    /// Generator used by [`GenerationPipeline`](super::GenerationPipeline)
    pub mode: GenerationMode,
    /// Base column height (flat fill height; landscape height at h = 0.5)
    pub level: i64,
    /// Height swing across the full heightmap range
    pub magnitude: f64,
    /// Noise layers, blended in table order
    pub octaves: Vec<Octave>,
    /// Fill probability for debug generation, in `[0, 1]`
    pub infill: f64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::for_world_size(DEFAULT_WORLD_SIZE)
    }
}

impl GenerationConfig {
    /// Defaults scaled to a world of side `world_size`
    pub fn for_world_size(world_size: usize) -> Self {
        Self {
            seed: 12345,
            mode: GenerationMode::default(),
            level: (world_size / 2) as i64,
            magnitude: (world_size / 2) as f64,
            octaves: DEFAULT_OCTAVES.to_vec(),
            infill: 0.1,
        }
    }

    /// Check the parameters that do not depend on the target resolution
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.octaves.is_empty() {
            return Err(GenerationError::InvalidParams("octave table is empty".to_string()));
        }
        if let Some(octave) = self.octaves.iter().find(|o| o.size == 0) {
            return Err(GenerationError::InvalidParams(format!("octave {:?} has zero size", octave)));
        }
        if self.octaves.iter().any(|o| !(o.weight >= 0.0 && o.weight.is_finite())) {
            return Err(GenerationError::InvalidParams("octave weights must be finite and non-negative".to_string()));
        }
        if self.total_weight() <= 0.0 {
            return Err(GenerationError::InvalidParams("octave weights sum to zero".to_string()));
        }
        if !(0.0..=1.0).contains(&self.infill) {
            return Err(GenerationError::InvalidParams(format!("infill {} outside [0, 1]", self.infill)));
        }
        if !self.magnitude.is_finite() {
            return Err(GenerationError::InvalidParams("magnitude must be finite".to_string()));
        }
        Ok(())
    }

    /// Sum of octave weights
    pub fn total_weight(&self) -> f64 {
        self.octaves.iter().map(|o| o.weight).sum()
    }
}
