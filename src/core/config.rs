//! Engine configuration: world dimensions, save location and generation parameters.
//!
//! Stored as JSON so it can be edited by hand next to the save files.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};
use crate::generation::GenerationConfig;
use crate::voxel::chunk::DEFAULT_CHUNK_SIZE;
use crate::voxel::world::{DEFAULT_WORLD_SIZE, MAX_WORLD_SIZE};

/// File extension for monolithic world saves
pub const WORLD_FILE_EXTENSION: &str = "cbw";

/// Top-level configuration consumed by the core.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Side length of the monolithic world grid (voxels)
    pub world_size: usize,
    /// Side length of a chunk (voxels)
    pub chunk_size: usize,
    /// Directory holding world saves
    pub saves_dir: PathBuf,
    /// World name, used as the save file stem
    pub world_name: String,
    /// Terrain generation parameters
    pub generation: GenerationConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            world_size: DEFAULT_WORLD_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            saves_dir: PathBuf::from("saves"),
            world_name: "world".to_string(),
            generation: GenerationConfig::for_world_size(DEFAULT_WORLD_SIZE),
        }
    }
}

impl EngineConfig {
    /// Read and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Write this config as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(e.to_string()))?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Check the size relationships the grid, chunk and octave code rely on.
    pub fn validate(&self) -> Result<()> {
        if self.world_size == 0 || self.world_size > MAX_WORLD_SIZE {
            return Err(Error::Config(format!(
                "world_size {} must be in 1..={}",
                self.world_size, MAX_WORLD_SIZE
            )));
        }
        if self.chunk_size == 0 {
            return Err(Error::Config("chunk_size must be non-zero".to_string()));
        }
        if self.world_size % self.chunk_size != 0 {
            return Err(Error::Config(format!(
                "world_size {} is not a multiple of chunk_size {}",
                self.world_size, self.chunk_size
            )));
        }
        if self.generation.octaves.is_empty() {
            return Err(Error::Config("octave table is empty".to_string()));
        }
        for octave in &self.generation.octaves {
            if octave.size == 0 || self.world_size % octave.size != 0 {
                return Err(Error::Config(format!(
                    "octave size {} does not divide world_size {}",
                    octave.size, self.world_size
                )));
            }
        }
        Ok(())
    }

    /// Path of the monolithic save file: `<saves_dir>/<world_name>.cbw`
    pub fn save_path(&self) -> PathBuf {
        self.saves_dir
            .join(format!("{}.{}", self.world_name, WORLD_FILE_EXTENSION))
    }

    /// Directory for per-chunk files of this world
    pub fn chunk_dir(&self) -> PathBuf {
        self.saves_dir.join(format!("{}_chunks", self.world_name))
    }

    /// Number of chunks along one world axis
    pub fn chunks_per_axis(&self) -> usize {
        self.world_size / self.chunk_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::Octave;
    use tempfile::TempDir;

    #[test]
    fn test_default_is_valid() {
        let config = EngineConfig::default();
        config.validate().expect("default config should validate");
        assert_eq!(config.world_size, 256);
        assert_eq!(config.chunk_size, 128);
        assert_eq!(config.chunks_per_axis(), 2);
    }

    #[test]
    fn test_save_path() {
        let config = EngineConfig {
            saves_dir: PathBuf::from("/tmp/saves"),
            world_name: "alpha".to_string(),
            ..Default::default()
        };
        assert_eq!(config.save_path(), PathBuf::from("/tmp/saves/alpha.cbw"));
        assert_eq!(config.chunk_dir(), PathBuf::from("/tmp/saves/alpha_chunks"));
    }

    #[test]
    fn test_rejects_oversized_world() {
        let config = EngineConfig {
            world_size: 1024,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_chunk_not_dividing_world() {
        let config = EngineConfig {
            world_size: 256,
            chunk_size: 100,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_incompatible_octave() {
        let mut config = EngineConfig::default();
        config.generation.octaves.push(Octave { size: 3, weight: 0.1 });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("config").join("engine.json");

        let mut config = EngineConfig::default();
        config.world_name = "roundtrip".to_string();
        config.generation.seed = 99;
        config.save(&path).expect("save failed");

        let loaded = EngineConfig::load(&path).expect("load failed");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("engine.json");
        fs::write(&path, r#"{ "world_size": 64, "chunk_size": 16 }"#).unwrap();

        let loaded = EngineConfig::load(&path).expect("load failed");
        assert_eq!(loaded.world_size, 64);
        assert_eq!(loaded.chunk_size, 16);
        assert_eq!(loaded.world_name, "world");
    }
}
