//! # Meshing Module
//!
//! Conversion of voxel data into renderable triangle geometry, and the
//! scheduling machinery that keeps it off the render thread.
//!
//! # Architecture
//! - `vertex`: the GPU-facing vertex format and mesh buffers
//! - `compiler`: the pure per-chunk geometry generator
//! - `scheduler`: the render-thread owner of the mesh cache, the
//!   synchronous/background build decision, and the upload step
//!
//! The compiler is deliberately ignorant of the scheduler and the pool; it
//! can be run standalone against any chunk snapshot, which is also how the
//! tests exercise it.

pub mod compiler;
pub mod scheduler;
pub mod vertex;

pub use compiler::MeshCompiler;
pub use scheduler::{ChunkCoord, ChunkMeshScheduler, MeshUploader, NullUploader};
pub use vertex::{ChunkVertex, MeshData, VERTEX_STRIDE};
