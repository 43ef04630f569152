//! Construction-time configuration for the meshing subsystem.
//!
//! All knobs are supplied once, when the scheduler is built. Nothing here is
//! hot-reloaded mid-build; a compile pass always sees a consistent set of
//! capacities.

use serde::{Deserialize, Serialize};

/// Configuration for the mesh compiler, worker pool and scheduler.
///
/// The defaults match a desktop target: a vertex budget large enough for
/// ordinary terrain, a denser fallback budget for pathological chunks, and
/// one worker per available core beyond the render thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshingConfig {
    /// Maximum number of vertices a single background build may emit before
    /// the compiler truncates and flags overflow.
    pub vertex_capacity: usize,
    /// Enlarged vertex budget used when a build overflowed at
    /// `vertex_capacity` and is retried once.
    pub dense_vertex_capacity: usize,
    /// Number of background worker threads in the pool.
    pub worker_count: usize,
    /// Maximum number of cached GPU meshes before the least recently
    /// requested one is evicted.
    pub cache_capacity: usize,
    /// Distance in chunk widths within which a rebuild runs synchronously on
    /// the calling thread instead of going through the pool.
    pub important_radius: f32,
    /// Number of border voxels copied around the chunk into the neighborhood
    /// view. One is enough for face culling and ambient occlusion.
    pub neighborhood_padding: usize,
}

impl Default for MeshingConfig {
    fn default() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get().saturating_sub(1).max(1))
            .unwrap_or(1);

        MeshingConfig {
            vertex_capacity: 16 * 1024,
            dense_vertex_capacity: 128 * 1024,
            worker_count: workers,
            cache_capacity: 10_000,
            important_radius: 1.5,
            neighborhood_padding: 1,
        }
    }
}
