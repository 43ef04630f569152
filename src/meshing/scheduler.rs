//! The chunk mesh scheduler: decides which chunks get remeshed, where, and
//! when results reach the GPU.
//!
//! The scheduler owns the authoritative mesh cache (chunk coordinate to GPU
//! mesh handle), the in-flight bookkeeping that guarantees at most one
//! outstanding background build per coordinate, and the upload step that
//! worker threads must never perform. It is driven by exactly one thread,
//! the render thread, and that thread is the only one that ever calls the
//! injected uploader.
//!
//! # Paths through `get_or_render`
//!
//! - cache hit and the chunk unmodified: the cached handle, nothing else
//! - important (near-camera): compile inline on the calling thread and
//!   upload immediately, so close chunks never pop in a frame late
//! - background: clear the modified flag, enqueue a job (unless one is
//!   already in flight for that coordinate), and return the previous cached
//!   handle so the old mesh keeps drawing until the new one lands
//!
//! # Overflow policy
//!
//! A build that exhausts the normal vertex budget is retried once with the
//! dense budget: inline immediately on the important path, as a re-enqueued
//! dense job on the background path. A build that overflows the dense budget
//! is accepted truncated, with a warning; one frame of missing geometry
//! beats unbounded buffers.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use web_time::Instant;

use crate::content::ContentIndex;
use crate::core::config::MeshingConfig;
use crate::core::mt_resource::MtResource;
use crate::lighting::LightSampler;
use crate::voxels::chunk::{Chunk, CHUNK_DEPTH, CHUNK_WIDTH};
use crate::voxels::neighborhood::VoxelSampler;
use crate::workers::WorkerPool;

use super::compiler::MeshCompiler;
use super::vertex::MeshData;

/// Chunk coordinates, the cache and in-flight key.
pub type ChunkCoord = (i32, i32);

/// GPU upload contract, implemented by the host engine.
///
/// Callable only from the thread driving the scheduler (the render thread);
/// the scheduler upholds that by never handing the uploader to a worker.
/// Handles returned here live in the mesh cache; when a cache entry is
/// replaced or evicted the old handle is dropped, so `Handle`'s `Drop` is
/// the place to release GPU resources.
pub trait MeshUploader {
    /// Opaque handle to an uploaded mesh.
    type Handle;

    /// Realizes mesh buffers on the GPU and returns a handle to the result.
    fn upload(&mut self, mesh: &MeshData) -> Self::Handle;
}

/// Uploader that discards every mesh. Useful for headless hosts and tests
/// that only exercise scheduling behavior.
pub struct NullUploader;

impl MeshUploader for NullUploader {
    type Handle = ();

    fn upload(&mut self, _mesh: &MeshData) -> Self::Handle {}
}

/// A background build request, carrying a shared snapshot reference to the
/// chunk. The worker takes a read guard for the duration of the compile.
struct MeshJob {
    coord: ChunkCoord,
    chunk: MtResource<Chunk>,
    dense: bool,
}

/// A completed background build, queued back to the render thread.
struct MeshResult {
    coord: ChunkCoord,
    chunk: MtResource<Chunk>,
    mesh: MeshData,
    dense: bool,
}

/// Owner of the mesh cache and the synchronous/asynchronous build decision.
pub struct ChunkMeshScheduler<U: MeshUploader> {
    config: MeshingConfig,
    voxels: Arc<dyn VoxelSampler>,
    lights: Arc<dyn LightSampler>,
    uploader: U,
    cache: LruCache<ChunkCoord, U::Handle>,
    in_flight: HashSet<ChunkCoord>,
    discarded: HashSet<ChunkCoord>,
    pool: WorkerPool<MeshJob, MeshResult>,
    inline_compiler: MeshCompiler,
}

impl<U: MeshUploader> ChunkMeshScheduler<U> {
    /// Creates a scheduler and spins up its worker pool. Each worker owns
    /// one long-lived compiler instance; the content index and world
    /// samplers are shared read-only across all of them.
    ///
    /// # Arguments
    /// * `config` - Capacities, pool size and policy knobs
    /// * `content` - Read-only block definition table
    /// * `voxels` - World accessor used for neighborhood border cells
    /// * `lights` - World accessor for precomputed light
    /// * `uploader` - GPU upload implementation, used only by this thread
    pub fn new(
        config: MeshingConfig,
        content: Arc<ContentIndex>,
        voxels: Arc<dyn VoxelSampler>,
        lights: Arc<dyn LightSampler>,
        uploader: U,
    ) -> Self {
        let worker_config = config.clone();
        let worker_content = Arc::clone(&content);
        let worker_voxels = Arc::clone(&voxels);
        let worker_lights = Arc::clone(&lights);

        let pool = WorkerPool::new(config.worker_count, move |_index| {
            let mut compiler = MeshCompiler::new(
                Arc::clone(&worker_content),
                worker_config.vertex_capacity,
                worker_config.neighborhood_padding,
            );
            let voxels = Arc::clone(&worker_voxels);
            let lights = Arc::clone(&worker_lights);
            let normal_capacity = worker_config.vertex_capacity;
            let dense_capacity = worker_config.dense_vertex_capacity;

            move |job: MeshJob| {
                compiler.set_vertex_capacity(if job.dense {
                    dense_capacity
                } else {
                    normal_capacity
                });
                let mesh = {
                    let chunk = job.chunk.get();
                    compiler.build(&chunk, voxels.as_ref(), lights.as_ref())
                };
                MeshResult {
                    coord: job.coord,
                    chunk: job.chunk,
                    mesh,
                    dense: job.dense,
                }
            }
        });

        let inline_compiler = MeshCompiler::new(
            content,
            config.vertex_capacity,
            config.neighborhood_padding,
        );

        ChunkMeshScheduler {
            cache: LruCache::new(NonZeroUsize::new(config.cache_capacity.max(1)).unwrap()),
            in_flight: HashSet::new(),
            discarded: HashSet::new(),
            pool,
            inline_compiler,
            voxels,
            lights,
            uploader,
            config,
        }
    }

    /// Returns the mesh for a chunk, scheduling a (re)build when needed.
    ///
    /// Never blocks the calling thread beyond the synchronous important
    /// path. On the background path the previous cached handle (or `None`)
    /// comes back immediately; the rebuilt mesh lands in a later
    /// [`ChunkMeshScheduler::update`].
    ///
    /// # Arguments
    /// * `chunk` - The chunk to mesh
    /// * `important` - Synchronous rebuild, for chunks near the viewer
    pub fn get_or_render(
        &mut self,
        chunk: &MtResource<Chunk>,
        important: bool,
    ) -> Option<&U::Handle> {
        let (coord, modified) = {
            let guard = chunk.get();
            ((guard.x, guard.z), guard.is_modified())
        };

        if !modified && self.cache.contains(&coord) {
            return self.cache.get(&coord);
        }

        if important {
            let mesh = self.build_inline(chunk);
            let handle = self.uploader.upload(&mesh);
            self.cache.put(coord, handle);
            return self.cache.get(&coord);
        }

        if !self.in_flight.contains(&coord) {
            // Clearing the flag now (not at completion) means an edit that
            // lands mid-build re-flags the chunk and is re-queued on its
            // next access instead of being lost.
            chunk.get().clear_modified();
            self.in_flight.insert(coord);
            self.discarded.remove(&coord);
            self.pool.submit(MeshJob {
                coord,
                chunk: chunk.clone(),
                dense: false,
            });
        }

        self.cache.get(&coord)
    }

    /// Compiles on the calling thread, retrying once with the dense budget
    /// if the normal budget overflows.
    fn build_inline(&mut self, chunk: &MtResource<Chunk>) -> MeshData {
        let started = Instant::now();
        let guard = chunk.get();
        guard.clear_modified();

        let mut mesh =
            self.inline_compiler
                .build(&guard, self.voxels.as_ref(), self.lights.as_ref());
        if mesh.overflow {
            self.inline_compiler
                .set_vertex_capacity(self.config.dense_vertex_capacity);
            mesh = self
                .inline_compiler
                .build(&guard, self.voxels.as_ref(), self.lights.as_ref());
            self.inline_compiler
                .set_vertex_capacity(self.config.vertex_capacity);
            if mesh.overflow {
                log::warn!(
                    "chunk ({}, {}) overflowed the dense vertex budget, accepting truncated mesh",
                    guard.x,
                    guard.z
                );
            }
        }

        log::debug!(
            "meshed chunk ({}, {}) inline in {:?}",
            guard.x,
            guard.z,
            started.elapsed()
        );
        mesh
    }

    /// Drains completed background builds, uploads them, and stores the
    /// handles. Call once per frame from the render thread.
    pub fn update(&mut self) {
        let mut results = Vec::new();
        self.pool.update(|result| results.push(result));

        for result in results {
            self.in_flight.remove(&result.coord);

            if self.discarded.remove(&result.coord) {
                // Unloaded while the build was in flight; mesh data is cheap
                // enough that finishing and dropping beats cancellation.
                continue;
            }

            if result.mesh.overflow && !result.dense {
                log::debug!(
                    "chunk {:?} overflowed the vertex budget, retrying dense",
                    result.coord
                );
                self.in_flight.insert(result.coord);
                self.pool.submit(MeshJob {
                    coord: result.coord,
                    chunk: result.chunk,
                    dense: true,
                });
                continue;
            }
            if result.mesh.overflow {
                log::warn!(
                    "chunk {:?} overflowed the dense vertex budget, accepting truncated mesh",
                    result.coord
                );
            }

            let handle = self.uploader.upload(&result.mesh);
            self.cache.put(result.coord, handle);
        }

        self.pool.pump_queued();
    }

    /// Removes the cache entry for a chunk coordinate. An in-flight build
    /// for the coordinate is not cancelled; its result is discarded when it
    /// arrives.
    pub fn unload(&mut self, x: i32, z: i32) {
        self.cache.pop(&(x, z));
        if self.in_flight.contains(&(x, z)) {
            self.discarded.insert((x, z));
        }
    }

    /// Distance predicate for the synchronous path: true when the chunk
    /// center is within `important_radius` chunk widths of the camera.
    pub fn is_important(&self, chunk: &Chunk, camera_x: f32, camera_z: f32) -> bool {
        let center_x = chunk.world_x() as f32 + CHUNK_WIDTH as f32 * 0.5;
        let center_z = chunk.world_z() as f32 + CHUNK_DEPTH as f32 * 0.5;
        let dx = (center_x - camera_x) / CHUNK_WIDTH as f32;
        let dz = (center_z - camera_z) / CHUNK_DEPTH as f32;
        dx * dx + dz * dz <= self.config.important_radius * self.config.important_radius
    }

    /// The injected uploader, for host-side inspection or frame bookkeeping.
    pub fn uploader(&self) -> &U {
        &self.uploader
    }

    /// Number of cached mesh handles.
    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    /// Number of coordinates with an outstanding background build.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Whether any background work is outstanding: dispatched, queued, or
    /// awaiting its dense retry.
    pub fn has_pending_work(&self) -> bool {
        !self.in_flight.is_empty() || self.pool.queued_len() > 0 || self.pool.has_jobs_in_flight()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{BlockDefinition, ContentIndex, UVRegion};
    use crate::lighting::PackedLight;
    use crate::voxels::chunk::CHUNK_HEIGHT;
    use crate::voxels::voxel::Voxel;
    use std::time::Duration;

    struct OpenWorld;

    impl VoxelSampler for OpenWorld {
        fn voxel_at(&self, _wx: i32, wy: i32, _wz: i32) -> Option<Voxel> {
            (0..CHUNK_HEIGHT as i32).contains(&wy).then_some(Voxel::AIR)
        }
    }

    impl LightSampler for OpenWorld {
        fn light_at(&self, _wx: i32, _wy: i32, _wz: i32) -> PackedLight {
            PackedLight::FULL
        }
    }

    /// Records every upload: handles are sequence numbers.
    struct CountingUploader {
        uploads: u32,
        last_vertex_count: usize,
    }

    impl CountingUploader {
        fn new() -> Self {
            CountingUploader {
                uploads: 0,
                last_vertex_count: 0,
            }
        }
    }

    impl MeshUploader for CountingUploader {
        type Handle = u32;

        fn upload(&mut self, mesh: &MeshData) -> u32 {
            self.uploads += 1;
            self.last_vertex_count = mesh.vertices.len();
            self.uploads
        }
    }

    fn content() -> Arc<ContentIndex> {
        Arc::new(ContentIndex::new(vec![
            BlockDefinition::air(),
            BlockDefinition::cube("stone", UVRegion::FULL),
        ]))
    }

    fn config() -> MeshingConfig {
        MeshingConfig {
            vertex_capacity: 16 * 1024,
            dense_vertex_capacity: 128 * 1024,
            worker_count: 1,
            cache_capacity: 64,
            important_radius: 1.5,
            neighborhood_padding: 1,
        }
    }

    fn scheduler_with(
        config: MeshingConfig,
    ) -> ChunkMeshScheduler<CountingUploader> {
        ChunkMeshScheduler::new(
            config,
            content(),
            Arc::new(OpenWorld),
            Arc::new(OpenWorld),
            CountingUploader::new(),
        )
    }

    fn single_block_chunk() -> MtResource<Chunk> {
        let mut chunk = Chunk::new(0, 0);
        chunk.set_voxel(8, 8, 8, Voxel::new(1));
        MtResource::new(chunk)
    }

    fn drain(scheduler: &mut ChunkMeshScheduler<CountingUploader>) {
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while scheduler.has_pending_work() {
            assert!(
                std::time::Instant::now() < deadline,
                "timed out draining the scheduler"
            );
            scheduler.update();
            std::thread::yield_now();
        }
        scheduler.update();
    }

    #[test]
    fn important_path_builds_and_caches_synchronously() {
        let mut scheduler = scheduler_with(config());
        let chunk = single_block_chunk();

        let handle = scheduler.get_or_render(&chunk, true).copied();
        assert_eq!(handle, Some(1));
        assert_eq!(scheduler.uploader.uploads, 1);
        assert_eq!(scheduler.uploader.last_vertex_count, 24);
        assert!(!chunk.get().is_modified());

        // Unmodified chunk: idempotent cached read, no new upload.
        let again = scheduler.get_or_render(&chunk, true).copied();
        assert_eq!(again, Some(1));
        assert_eq!(scheduler.uploader.uploads, 1);
    }

    #[test]
    fn background_path_enqueues_once_and_lands_on_update() {
        let mut scheduler = scheduler_with(config());
        let chunk = single_block_chunk();

        // Repeated calls without an update enqueue exactly one job.
        assert!(scheduler.get_or_render(&chunk, false).is_none());
        assert!(scheduler.get_or_render(&chunk, false).is_none());
        assert!(scheduler.get_or_render(&chunk, false).is_none());
        assert_eq!(scheduler.in_flight_count(), 1);

        drain(&mut scheduler);
        assert_eq!(scheduler.uploader.uploads, 1);
        assert_eq!(scheduler.get_or_render(&chunk, false).copied(), Some(1));
    }

    #[test]
    fn modified_chunk_returns_stale_handle_and_requeues() {
        let mut scheduler = scheduler_with(config());
        let chunk = single_block_chunk();

        scheduler.get_or_render(&chunk, true);
        chunk.get_mut().set_voxel(2, 8, 8, Voxel::new(1));

        // Stale handle comes back immediately while the rebuild queues.
        assert_eq!(scheduler.get_or_render(&chunk, false).copied(), Some(1));
        drain(&mut scheduler);
        assert_eq!(scheduler.get_or_render(&chunk, false).copied(), Some(2));
        assert_eq!(scheduler.uploader.uploads, 2);
    }

    #[test]
    fn unload_discards_in_flight_results() {
        let mut scheduler = scheduler_with(config());
        let chunk = single_block_chunk();

        scheduler.get_or_render(&chunk, false);
        scheduler.unload(0, 0);
        drain(&mut scheduler);

        assert_eq!(scheduler.uploader.uploads, 0);
        assert_eq!(scheduler.cached_count(), 0);
    }

    #[test]
    fn unload_clears_the_cache_entry() {
        let mut scheduler = scheduler_with(config());
        let chunk = single_block_chunk();

        scheduler.get_or_render(&chunk, true);
        assert_eq!(scheduler.cached_count(), 1);
        scheduler.unload(0, 0);
        assert_eq!(scheduler.cached_count(), 0);
        assert!(scheduler.get_or_render(&chunk, false).is_none());
    }

    #[test]
    fn inline_overflow_retries_with_dense_budget() {
        let mut tiny = config();
        tiny.vertex_capacity = 4;
        let mut scheduler = scheduler_with(tiny);
        let chunk = single_block_chunk();

        scheduler.get_or_render(&chunk, true);
        // One quad fits the normal budget; the dense retry emits all six.
        assert_eq!(scheduler.uploader.uploads, 1);
        assert_eq!(scheduler.uploader.last_vertex_count, 24);
    }

    #[test]
    fn background_overflow_retries_with_dense_budget() {
        let mut tiny = config();
        tiny.vertex_capacity = 4;
        let mut scheduler = scheduler_with(tiny);
        let chunk = single_block_chunk();

        scheduler.get_or_render(&chunk, false);
        drain(&mut scheduler);

        // Only the dense result is uploaded, complete.
        assert_eq!(scheduler.uploader.uploads, 1);
        assert_eq!(scheduler.uploader.last_vertex_count, 24);
    }

    #[test]
    fn importance_predicate_uses_chunk_distance() {
        let scheduler = scheduler_with(config());
        let near = Chunk::new(0, 0);
        let far = Chunk::new(4, 4);
        // Camera at the center of chunk (0, 0).
        assert!(scheduler.is_important(&near, 8.0, 8.0));
        assert!(!scheduler.is_important(&far, 8.0, 8.0));
    }
}
