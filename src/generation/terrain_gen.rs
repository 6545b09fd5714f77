//! Column fills for the three terrain modes.
//!
//! Every function takes a voxel origin so the same code fills a whole world
//! (origin zero) or one chunk of a larger world.

use rand::Rng;

use crate::generation::GenerationError;
use crate::generation::heightmap::HeightMap;
use crate::voxel::grid::{BlockId, VoxelGrid, AIR};

/// Block written by every generator
pub const SOLID: BlockId = 1;

/// Fill every column with [`SOLID`] for world `z in 0..level`, air above.
pub fn generate_flat(grid: &mut VoxelGrid, level: i64) {
    fill_flat(grid, 0, level);
}

/// [`generate_flat`] for a grid whose lowest voxel sits at world height `origin_z`
pub fn fill_flat(grid: &mut VoxelGrid, origin_z: i64, level: i64) {
    grid.fill(AIR);
    let n = grid.size();
    for x in 0..n {
        for y in 0..n {
            grid.fill_column(x, y, -origin_z..level - origin_z, SOLID);
        }
    }
}

/// Set each cell to [`SOLID`] with probability `infill`, drawing one value per cell
/// in linear index order.
pub fn generate_debug<R: Rng>(grid: &mut VoxelGrid, infill: f64, rng: &mut R) -> Result<(), GenerationError> {
    if !(0.0..=1.0).contains(&infill) {
        return Err(GenerationError::InvalidParams(format!("infill {} outside [0, 1]", infill)));
    }
    grid.fill_with(|_| if rng.random::<f64>() < infill { SOLID } else { AIR });
    Ok(())
}

/// Fill columns from a heightmap.
///
/// `origin` is the world voxel position of the grid's `(0, 0, 0)` cell. World
/// column `(x, y)` is solid for `z in 0..floor((h - 0.5) * magnitude + level)`;
/// columns outside the heightmap stay empty.
pub fn fill_from_heightmap(
    grid: &mut VoxelGrid,
    heightmap: &HeightMap,
    origin: (i64, i64, i64),
    level: i64,
    magnitude: f64,
) {
    grid.fill(AIR);
    let (ox, oy, oz) = origin;
    let n = grid.size();
    for x in 0..n {
        for y in 0..n {
            let Some(h) = heightmap.try_get(ox + x as i64, oy + y as i64) else {
                continue;
            };
            let height = HeightMap::column_height(h, level, magnitude);
            grid.fill_column(x, y, -oz..height - oz, SOLID);
        }
    }
}
