//! # Voxels Module
//!
//! Voxel and chunk storage, plus the padded neighborhood view that gives the
//! mesh compiler cross-chunk reads without pointer chasing mid-build.

pub mod chunk;
pub mod neighborhood;
pub mod voxel;

pub use chunk::{Chunk, CHUNK_DEPTH, CHUNK_HEIGHT, CHUNK_PLANE_SIZE, CHUNK_VOLUME, CHUNK_WIDTH};
pub use neighborhood::{VoxelNeighborhoodView, VoxelSampler};
pub use voxel::{BlockId, Voxel, VoxelState, AIR_BLOCK, VOID_BLOCK};
