//! Fixed-size cubic grid of block identifiers
//!
//! Every read, write and bulk copy goes through [`VoxelGrid::index`], which
//! lays cells out as `x * N² + y * N + z`. With `z` as the vertical axis a
//! column `(x, y)` is one contiguous run of `N` cells.

use std::ops::Range;

/// Block identifier. `0` is empty space (air).
pub type BlockId = u8;

/// Identifier of empty space
pub const AIR: BlockId = 0;

/// Sentinel returned by [`VoxelGrid::get`] for coordinates outside the grid
pub const OUT_OF_BOUNDS: i16 = -1;

/// Cubic array of `size³` block identifiers. The size never changes after construction.
#[derive(Clone, PartialEq, Eq)]
pub struct VoxelGrid {
    size: usize,
    voxels: Vec<BlockId>,
}

impl std::fmt::Debug for VoxelGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoxelGrid")
            .field("size", &self.size)
            .field("solid", &self.count_solid())
            .finish()
    }
}

impl VoxelGrid {
    /// Create a grid of side `size` filled with air
    pub fn new(size: usize) -> Self {
        Self {
            size,
            voxels: vec![AIR; size * size * size],
        }
    }

    /// Wrap an existing buffer. Returns `None` unless `voxels.len() == size³`.
    pub fn from_voxels(size: usize, voxels: Vec<BlockId>) -> Option<Self> {
        if voxels.len() != size * size * size {
            return None;
        }
        Some(Self { size, voxels })
    }

    /// Side length
    pub fn size(&self) -> usize {
        self.size
    }

    /// Total number of cells (`size³`)
    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    /// Linear index of an in-range cell. The only place the axis order lives.
    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        (x * self.size + y) * self.size + z
    }

    /// Inverse of [`index`](Self::index)
    #[inline]
    pub fn position(&self, index: usize) -> (usize, usize, usize) {
        let z = index % self.size;
        let y = (index / self.size) % self.size;
        let x = index / (self.size * self.size);
        (x, y, z)
    }

    /// Convert signed coordinates to an index if all three lie in `[0, size)`
    #[inline]
    fn checked_index(&self, x: i32, y: i32, z: i32) -> Option<usize> {
        let n = self.size as i64;
        let (x, y, z) = (x as i64, y as i64, z as i64);
        if (0..n).contains(&x) && (0..n).contains(&y) && (0..n).contains(&z) {
            Some(self.index(x as usize, y as usize, z as usize))
        } else {
            None
        }
    }

    /// Whether `(x, y, z)` lies inside the grid
    pub fn contains(&self, x: i32, y: i32, z: i32) -> bool {
        self.checked_index(x, y, z).is_some()
    }

    /// Bounds-checked read
    pub fn try_get(&self, x: i32, y: i32, z: i32) -> Option<BlockId> {
        self.checked_index(x, y, z).map(|i| self.voxels[i])
    }

    /// Bounds-checked read returning [`OUT_OF_BOUNDS`] outside the grid
    pub fn get(&self, x: i32, y: i32, z: i32) -> i16 {
        self.try_get(x, y, z).map_or(OUT_OF_BOUNDS, i16::from)
    }

    /// Bounds-checked write. Returns `false` and leaves the grid untouched when out of range.
    pub fn set(&mut self, x: i32, y: i32, z: i32, id: BlockId) -> bool {
        match self.checked_index(x, y, z) {
            Some(i) => {
                self.voxels[i] = id;
                true
            }
            None => false,
        }
    }

    /// Read without a bounds check.
    ///
    /// # Safety
    /// Each coordinate must be `< size`.
    #[inline]
    pub unsafe fn get_unchecked(&self, x: usize, y: usize, z: usize) -> BlockId {
        debug_assert!(x < self.size && y < self.size && z < self.size);
        let i = self.index(x, y, z);
        // SAFETY: caller guarantees each axis < size, so i < size³ == len.
        unsafe { *self.voxels.get_unchecked(i) }
    }

    /// Write without a bounds check.
    ///
    /// # Safety
    /// Each coordinate must be `< size`.
    #[inline]
    pub unsafe fn set_unchecked(&mut self, x: usize, y: usize, z: usize, id: BlockId) {
        debug_assert!(x < self.size && y < self.size && z < self.size);
        let i = self.index(x, y, z);
        // SAFETY: caller guarantees each axis < size, so i < size³ == len.
        unsafe { *self.voxels.get_unchecked_mut(i) = id };
    }

    /// Vertical column at `(x, y)` as a contiguous slice indexed by `z`.
    ///
    /// Panics if `x` or `y` is out of range.
    pub fn column(&self, x: usize, y: usize) -> &[BlockId] {
        let start = self.index(x, y, 0);
        &self.voxels[start..start + self.size]
    }

    /// Mutable vertical column at `(x, y)`.
    ///
    /// Panics if `x` or `y` is out of range.
    pub fn column_mut(&mut self, x: usize, y: usize) -> &mut [BlockId] {
        let start = self.index(x, y, 0);
        &mut self.voxels[start..start + self.size]
    }

    /// Set cells `z in range` of column `(x, y)` to `id`, clipping the range to the grid.
    pub fn fill_column(&mut self, x: usize, y: usize, range: Range<i64>, id: BlockId) {
        let n = self.size as i64;
        let start = range.start.clamp(0, n) as usize;
        let end = range.end.clamp(0, n) as usize;
        if start < end {
            self.column_mut(x, y)[start..end].fill(id);
        }
    }

    /// Set every cell to `id`
    pub fn fill(&mut self, id: BlockId) {
        self.voxels.fill(id);
    }

    /// Overwrite every cell with `f(index)` in linear index order
    pub fn fill_with(&mut self, mut f: impl FnMut(usize) -> BlockId) {
        for (i, v) in self.voxels.iter_mut().enumerate() {
            *v = f(i);
        }
    }

    /// Number of non-air cells
    pub fn count_solid(&self) -> usize {
        self.voxels.iter().filter(|&&v| v != AIR).count()
    }

    /// Raw buffer in index order
    pub fn as_slice(&self) -> &[BlockId] {
        &self.voxels
    }

    /// Raw buffer as bytes, ready for upload
    pub fn as_bytes(&self) -> &[u8] {
        &self.voxels
    }

    /// Give up the buffer
    pub fn into_voxels(self) -> Vec<BlockId> {
        self.voxels
    }

    /// Copy a `size`-sided sub-cube starting at `origin` out of this grid.
    /// Cells falling outside this grid are left as air.
    pub fn extract(&self, origin: (usize, usize, usize), size: usize) -> VoxelGrid {
        let mut out = VoxelGrid::new(size);
        let (ox, oy, oz) = origin;
        if oz >= self.size {
            return out;
        }
        let depth = size.min(self.size - oz);
        for lx in 0..size {
            let x = ox + lx;
            if x >= self.size {
                break;
            }
            for ly in 0..size {
                let y = oy + ly;
                if y >= self.size {
                    break;
                }
                let src = &self.column(x, y)[oz..oz + depth];
                out.column_mut(lx, ly)[..depth].copy_from_slice(src);
            }
        }
        out
    }
}
