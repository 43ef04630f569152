//! # Chunk Module
//!
//! This module provides the `Chunk` struct: a fixed-size cuboid of voxels,
//! the unit of meshing and loading.
//!
//! ## Storage
//!
//! A chunk owns a flat voxel array in x-then-z-then-y order plus a bit vector
//! (`non_air`, one bit per cell) mirroring which cells hold a non-air voxel.
//! The bit vector keeps the occupied vertical range `[bottom, top)` cheap to
//! maintain, and the compiler uses that range to skip empty volumes without
//! touching the voxel array at all.
//!
//! ## The modified flag
//!
//! Gameplay and editing code set `modified` through [`Chunk::set_voxel`]; the
//! scheduler clears it the moment a rebuild is scheduled, not when the build
//! completes. A mutation landing mid-build re-flags the chunk and is picked
//! up on its next access. The flag is an atomic so the scheduler can clear it
//! through a read guard while workers share the chunk.

use std::sync::atomic::{AtomicBool, Ordering};

use bitvec::prelude::BitVec;

use super::voxel::Voxel;

/// Chunk extent along the world X axis, in voxels.
pub const CHUNK_WIDTH: usize = 16;
/// Chunk extent along the world Y axis, in voxels.
pub const CHUNK_HEIGHT: usize = 16;
/// Chunk extent along the world Z axis, in voxels.
pub const CHUNK_DEPTH: usize = 16;
/// Number of voxels in one horizontal chunk plane.
pub const CHUNK_PLANE_SIZE: usize = CHUNK_WIDTH * CHUNK_DEPTH;
/// Total number of voxels in a chunk.
pub const CHUNK_VOLUME: usize = CHUNK_PLANE_SIZE * CHUNK_HEIGHT;

/// A fixed-size cuboid of voxels at integer chunk coordinates `(x, z)`.
///
/// The compiler never mutates a chunk; the scheduler owns the lifecycle of
/// the `modified` flag; gameplay code owns the voxels through
/// [`Chunk::set_voxel`].
pub struct Chunk {
    /// Chunk coordinate along world X (world x = `x * CHUNK_WIDTH`).
    pub x: i32,
    /// Chunk coordinate along world Z (world z = `z * CHUNK_DEPTH`).
    pub z: i32,
    voxels: Vec<Voxel>,
    non_air: BitVec,
    bottom: usize,
    top: usize,
    modified: AtomicBool,
}

impl Chunk {
    /// Creates an empty (all-air) chunk at the given chunk coordinates.
    ///
    /// New chunks start flagged modified so their first `get_or_render`
    /// schedules a build.
    pub fn new(x: i32, z: i32) -> Self {
        Chunk {
            x,
            z,
            voxels: vec![Voxel::AIR; CHUNK_VOLUME],
            non_air: BitVec::repeat(false, CHUNK_VOLUME),
            bottom: 0,
            top: 0,
            modified: AtomicBool::new(true),
        }
    }

    /// Creates a chunk uniformly filled with one voxel (test worlds, regression
    /// scenarios).
    pub fn solid(x: i32, z: i32, voxel: Voxel) -> Self {
        let mut chunk = Chunk::new(x, z);
        if !voxel.is_air() {
            chunk.voxels.fill(voxel);
            chunk.non_air.fill(true);
            chunk.bottom = 0;
            chunk.top = CHUNK_HEIGHT;
        }
        chunk
    }

    fn index(x: usize, y: usize, z: usize) -> usize {
        debug_assert!(x < CHUNK_WIDTH && y < CHUNK_HEIGHT && z < CHUNK_DEPTH);
        x + CHUNK_WIDTH * (z + CHUNK_DEPTH * y)
    }

    /// The voxel at chunk-local coordinates.
    ///
    /// # Panics
    /// Panics if the coordinates are out of bounds.
    pub fn voxel(&self, x: usize, y: usize, z: usize) -> Voxel {
        self.voxels[Self::index(x, y, z)]
    }

    /// Whether the cell at chunk-local coordinates holds a non-air voxel.
    pub fn is_occupied(&self, x: usize, y: usize, z: usize) -> bool {
        self.non_air[Self::index(x, y, z)]
    }

    /// Replaces the voxel at chunk-local coordinates, maintaining the
    /// occupancy bits, the vertical range, and the modified flag.
    pub fn set_voxel(&mut self, x: usize, y: usize, z: usize, voxel: Voxel) {
        let index = Self::index(x, y, z);
        self.voxels[index] = voxel;

        if voxel.is_air() {
            if self.non_air[index] {
                self.non_air.set(index, false);
                self.recalculate_range();
            }
        } else {
            self.non_air.set(index, true);
            if self.bottom == self.top {
                self.bottom = y;
                self.top = y + 1;
            } else {
                self.bottom = self.bottom.min(y);
                self.top = self.top.max(y + 1);
            }
        }

        self.modified.store(true, Ordering::Release);
    }

    /// Rescans the occupancy bits for the tightest vertical range. Plane
    /// slices are contiguous in the bit vector, so this is 16 `any()` scans.
    fn recalculate_range(&mut self) {
        let mut bottom = CHUNK_HEIGHT;
        let mut top = 0;
        for y in 0..CHUNK_HEIGHT {
            let plane = &self.non_air[y * CHUNK_PLANE_SIZE..(y + 1) * CHUNK_PLANE_SIZE];
            if plane.any() {
                if bottom == CHUNK_HEIGHT {
                    bottom = y;
                }
                top = y + 1;
            }
        }
        if bottom == CHUNK_HEIGHT {
            self.bottom = 0;
            self.top = 0;
        } else {
            self.bottom = bottom;
            self.top = top;
        }
    }

    /// First occupied vertical layer (inclusive).
    pub fn bottom(&self) -> usize {
        self.bottom
    }

    /// One past the last occupied vertical layer.
    pub fn top(&self) -> usize {
        self.top
    }

    /// Whether the chunk holds no non-air voxels at all.
    pub fn is_empty(&self) -> bool {
        self.bottom == self.top
    }

    /// World coordinate of the chunk's x = 0 column.
    pub fn world_x(&self) -> i32 {
        self.x * CHUNK_WIDTH as i32
    }

    /// World coordinate of the chunk's z = 0 column.
    pub fn world_z(&self) -> i32 {
        self.z * CHUNK_DEPTH as i32
    }

    /// Whether the chunk has been edited since the last scheduled rebuild.
    pub fn is_modified(&self) -> bool {
        self.modified.load(Ordering::Acquire)
    }

    /// Flags the chunk for rebuild on its next `get_or_render`.
    pub fn mark_modified(&self) {
        self.modified.store(true, Ordering::Release);
    }

    /// Clears the modified flag. Called by the scheduler at schedule time,
    /// never by gameplay code.
    pub fn clear_modified(&self) {
        self.modified.store(false, Ordering::Release);
    }
}
