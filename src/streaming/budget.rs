//! Residency budget for streamed chunks
//!
//! Bounds how many chunks stay resident, how far from the viewer they may sit,
//! and how many bytes of voxel data may be uploaded to the renderer. Each limit
//! is optional; an unset limit never triggers eviction.

/// Limits applied by [`ChunkStreamer::evict`](crate::streaming::ChunkStreamer::evict)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ResidencyBudget {
    /// Maximum number of resident chunks
    pub max_chunks: Option<usize>,
    /// Chunks whose centre is farther than this from the viewer are evicted
    pub max_distance: Option<f32>,
    /// Maximum uploaded GPU bytes
    pub gpu_budget_bytes: Option<usize>,
}

impl ResidencyBudget {
    /// A budget with no limits
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_max_chunks(mut self, max_chunks: usize) -> Self {
        self.max_chunks = Some(max_chunks);
        self
    }

    pub fn with_max_distance(mut self, max_distance: f32) -> Self {
        self.max_distance = Some(max_distance);
        self
    }

    /// Set the GPU budget in megabytes
    pub fn with_gpu_budget_mb(mut self, gpu_budget_mb: usize) -> Self {
        self.gpu_budget_bytes = Some(gpu_budget_mb.saturating_mul(1024 * 1024));
        self
    }

    pub fn with_gpu_budget_bytes(mut self, bytes: usize) -> Self {
        self.gpu_budget_bytes = Some(bytes);
        self
    }

    /// Whether a chunk at `distance` from the viewer may stay resident
    pub fn within_distance(&self, distance: f32) -> bool {
        self.max_distance.is_none_or(|max| distance <= max)
    }

    /// Whether `chunks` resident chunks using `gpu_bytes` exceed the budget
    pub fn is_over(&self, chunks: usize, gpu_bytes: usize) -> bool {
        self.max_chunks.is_some_and(|max| chunks > max)
            || self.gpu_budget_bytes.is_some_and(|max| gpu_bytes > max)
    }

    /// GPU memory pressure (0.0 to 1.0+); zero without a GPU limit
    ///
    /// Values above 1.0 indicate over-budget.
    pub fn gpu_pressure(&self, gpu_bytes: usize) -> f32 {
        match self.gpu_budget_bytes {
            Some(0) | None => 0.0,
            Some(max) => gpu_bytes as f32 / max as f32,
        }
    }
}
