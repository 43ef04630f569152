//! Padded neighborhood snapshot consumed by the mesh compiler.
//!
//! Face culling and ambient occlusion both need reads just across the chunk
//! boundary. Rather than chasing neighbor-chunk pointers per voxel in the
//! middle of a build, the view copies the chunk plus a configurable border
//! into one flat buffer (voxels and light together) before geometry emission
//! starts. Each compiler owns exactly one view and repositions it per build,
//! so builds on different workers never share the buffer.

use cgmath::Point3;

use crate::lighting::{LightSampler, PackedLight};

use super::chunk::{Chunk, CHUNK_DEPTH, CHUNK_HEIGHT, CHUNK_WIDTH};
use super::voxel::{BlockId, Voxel, VOID_BLOCK};

/// Read-only accessor for voxels anywhere in the loaded world.
///
/// Implementations must be safe to call concurrently from multiple compiler
/// instances. `None` means the cell lies outside the loaded world; the view
/// records it as [`VOID_BLOCK`], which the compiler treats as closed.
pub trait VoxelSampler: Send + Sync {
    /// Returns the voxel at the given world coordinates, or `None` when the
    /// coordinates fall outside the loaded world.
    fn voxel_at(&self, wx: i32, wy: i32, wz: i32) -> Option<Voxel>;
}

/// A padded 3-D snapshot of one chunk plus a border of its neighbors.
pub struct VoxelNeighborhoodView {
    padding: usize,
    dim_x: usize,
    dim_y: usize,
    dim_z: usize,
    origin: Point3<i32>,
    voxels: Vec<Voxel>,
    lights: Vec<PackedLight>,
}

impl VoxelNeighborhoodView {
    /// Creates a view with the given border width. A border of one voxel is
    /// enough for both face culling and ambient occlusion sampling.
    pub fn new(padding: usize) -> Self {
        let dim_x = CHUNK_WIDTH + 2 * padding;
        let dim_y = CHUNK_HEIGHT + 2 * padding;
        let dim_z = CHUNK_DEPTH + 2 * padding;
        let volume = dim_x * dim_y * dim_z;
        VoxelNeighborhoodView {
            padding,
            dim_x,
            dim_y,
            dim_z,
            origin: Point3::new(0, 0, 0),
            voxels: vec![
                Voxel {
                    id: VOID_BLOCK,
                    ..Voxel::AIR
                };
                volume
            ],
            lights: vec![PackedLight::ZERO; volume],
        }
    }

    /// The configured border width.
    pub fn padding(&self) -> usize {
        self.padding
    }

    /// World coordinates of local cell `(0, 0, 0)` after the last fill.
    pub fn origin(&self) -> Point3<i32> {
        self.origin
    }

    /// Repositions the view over `chunk` and snapshots voxels and light for
    /// the padded cuboid.
    ///
    /// Interior cells come straight from the chunk (the authoritative
    /// snapshot for this build); border cells go through the world samplers.
    /// Cells outside the loaded world read as [`VOID_BLOCK`] under zero
    /// light.
    pub fn fill(&mut self, chunk: &Chunk, voxels: &dyn VoxelSampler, lights: &dyn LightSampler) {
        self.origin = Point3::new(chunk.world_x(), 0, chunk.world_z());
        let p = self.padding as i32;

        for ly in -p..(CHUNK_HEIGHT as i32 + p) {
            for lz in -p..(CHUNK_DEPTH as i32 + p) {
                for lx in -p..(CHUNK_WIDTH as i32 + p) {
                    let index = self.index(lx, ly, lz);
                    let interior = lx >= 0
                        && ly >= 0
                        && lz >= 0
                        && lx < CHUNK_WIDTH as i32
                        && ly < CHUNK_HEIGHT as i32
                        && lz < CHUNK_DEPTH as i32;

                    let wx = self.origin.x + lx;
                    let wy = ly;
                    let wz = self.origin.z + lz;

                    self.voxels[index] = if interior {
                        chunk.voxel(lx as usize, ly as usize, lz as usize)
                    } else {
                        voxels.voxel_at(wx, wy, wz).unwrap_or(Voxel {
                            id: VOID_BLOCK,
                            ..Voxel::AIR
                        })
                    };
                    self.lights[index] = lights.light_at(wx, wy, wz);
                }
            }
        }
    }

    fn index(&self, lx: i32, ly: i32, lz: i32) -> usize {
        let x = (lx + self.padding as i32) as usize;
        let y = (ly + self.padding as i32) as usize;
        let z = (lz + self.padding as i32) as usize;
        debug_assert!(x < self.dim_x && y < self.dim_y && z < self.dim_z);
        x + self.dim_x * (z + self.dim_z * y)
    }

    /// Whether chunk-local coordinates fall inside the padded view.
    pub fn contains(&self, lx: i32, ly: i32, lz: i32) -> bool {
        let p = self.padding as i32;
        lx >= -p
            && ly >= -p
            && lz >= -p
            && lx < CHUNK_WIDTH as i32 + p
            && ly < CHUNK_HEIGHT as i32 + p
            && lz < CHUNK_DEPTH as i32 + p
    }

    /// The voxel at chunk-local coordinates; [`VOID_BLOCK`] outside the view.
    pub fn voxel(&self, lx: i32, ly: i32, lz: i32) -> Voxel {
        if !self.contains(lx, ly, lz) {
            return Voxel {
                id: VOID_BLOCK,
                ..Voxel::AIR
            };
        }
        self.voxels[self.index(lx, ly, lz)]
    }

    /// The block id at chunk-local coordinates; [`VOID_BLOCK`] outside the view.
    pub fn block_id(&self, lx: i32, ly: i32, lz: i32) -> BlockId {
        self.voxel(lx, ly, lz).id
    }

    /// The packed light at chunk-local coordinates; darkness outside the view.
    pub fn light(&self, lx: i32, ly: i32, lz: i32) -> PackedLight {
        if !self.contains(lx, ly, lz) {
            return PackedLight::ZERO;
        }
        self.lights[self.index(lx, ly, lz)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxels::voxel::AIR_BLOCK;

    struct FlatWorld;

    impl VoxelSampler for FlatWorld {
        fn voxel_at(&self, _wx: i32, wy: i32, _wz: i32) -> Option<Voxel> {
            if !(0..CHUNK_HEIGHT as i32).contains(&wy) {
                return None;
            }
            if wy == 0 {
                Some(Voxel::new(1))
            } else {
                Some(Voxel::AIR)
            }
        }
    }

    struct GradientLight;

    impl LightSampler for GradientLight {
        fn light_at(&self, _wx: i32, wy: i32, _wz: i32) -> PackedLight {
            PackedLight::new(0, 0, 0, wy.clamp(0, 15) as u8)
        }
    }

    #[test]
    fn interior_reads_come_from_the_chunk() {
        let mut chunk = Chunk::new(0, 0);
        chunk.set_voxel(5, 5, 5, Voxel::new(9));

        let mut view = VoxelNeighborhoodView::new(1);
        view.fill(&chunk, &FlatWorld, &GradientLight);

        // The sampler has no block 9 anywhere; only the chunk does.
        assert_eq!(view.block_id(5, 5, 5), 9);
        assert_eq!(view.block_id(6, 5, 5), AIR_BLOCK);
    }

    #[test]
    fn border_reads_come_from_the_sampler() {
        let chunk = Chunk::new(0, 0);
        let mut view = VoxelNeighborhoodView::new(1);
        view.fill(&chunk, &FlatWorld, &GradientLight);

        assert_eq!(view.block_id(-1, 0, 0), 1);
        assert_eq!(view.block_id(16, 0, 7), 1);
        assert_eq!(view.block_id(-1, 3, 0), AIR_BLOCK);
    }

    #[test]
    fn out_of_world_reads_are_void_and_dark() {
        let chunk = Chunk::new(0, 0);
        let mut view = VoxelNeighborhoodView::new(1);
        view.fill(&chunk, &FlatWorld, &GradientLight);

        assert_eq!(view.block_id(0, -1, 0), VOID_BLOCK);
        assert_eq!(view.block_id(0, CHUNK_HEIGHT as i32, 0), VOID_BLOCK);
        // Queries beyond the padded view are void as well.
        assert_eq!(view.block_id(0, 40, 0), VOID_BLOCK);
        assert_eq!(view.light(0, 40, 0), PackedLight::ZERO);
    }

    #[test]
    fn light_snapshot_matches_sampler() {
        let chunk = Chunk::new(3, -2);
        let mut view = VoxelNeighborhoodView::new(1);
        view.fill(&chunk, &FlatWorld, &GradientLight);

        assert_eq!(view.origin(), Point3::new(48, 0, -32));
        assert_eq!(view.light(4, 7, 4).sun(), 7);
        assert_eq!(view.light(0, -1, 0).sun(), 0);
    }
}
