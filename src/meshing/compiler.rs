//! The mesh compiler: voxels in, triangles out.
//!
//! `MeshCompiler` is a pure, single-threaded, reentrant function object. It
//! consumes a chunk snapshot, a padded neighborhood view and the read-only
//! content index, and produces a [`MeshData`]. It knows nothing about the
//! GPU or the worker pool; the same instance is reused build after build by
//! whichever thread owns it, and two instances never share state.
//!
//! # Algorithm
//!
//! Visible voxels are walked once per draw group, in ascending group order
//! and stable linear order within a group, which keeps translucency ordering
//! deterministic and same-material faces contiguous. Each voxel dispatches
//! on its block's model kind:
//! - cube: up to 6 axis-aligned quads, neighbor-culled per the open-face
//!   rule, with the face basis pushed through the block's rotation profile
//! - aabb / custom boxes: always-emitted sub-boxes plus extra quadrilaterals
//! - cross-sprite: two crossed quads with deterministic per-voxel jitter
//!
//! Every face append checks the remaining vertex budget. Running out is a
//! soft condition: the compiler stops emitting, flags `overflow`, and
//! returns the truncated but internally consistent mesh.

use std::collections::BTreeSet;
use std::sync::Arc;

use cgmath::{InnerSpace, Point3, Vector3};

use crate::content::{
    BlockDefinition, BlockModel, Box3, ContentIndex, CubeSide, CullingMode, Tetragon, UVRegion,
};
use crate::lighting::LightSampler;
use crate::voxels::chunk::{Chunk, CHUNK_DEPTH, CHUNK_WIDTH};
use crate::voxels::neighborhood::{VoxelNeighborhoodView, VoxelSampler};
use crate::voxels::voxel::{BlockId, Voxel, VOID_BLOCK};

use super::vertex::{ChunkVertex, MeshData};

/// Approximately unit direction of sunlight, used for the directional factor
/// on flat-shaded faces.
const SUN_DIRECTION: Vector3<f32> = Vector3 {
    x: 0.411,
    y: 0.863,
    z: 0.279,
};

/// Canonical cube faces: texture side, outward normal, and the two in-plane
/// half-axes, all in the block-local basis. `w cross h` equals the normal,
/// so winding stays consistent after rotation.
const CUBE_FACES: [(CubeSide, Vector3<i32>, Vector3<i32>, Vector3<i32>); 6] = [
    (
        CubeSide::Front,
        Vector3 { x: 0, y: 0, z: 1 },
        Vector3 { x: 1, y: 0, z: 0 },
        Vector3 { x: 0, y: 1, z: 0 },
    ),
    (
        CubeSide::Back,
        Vector3 { x: 0, y: 0, z: -1 },
        Vector3 { x: -1, y: 0, z: 0 },
        Vector3 { x: 0, y: 1, z: 0 },
    ),
    (
        CubeSide::Bottom,
        Vector3 { x: 0, y: -1, z: 0 },
        Vector3 { x: 1, y: 0, z: 0 },
        Vector3 { x: 0, y: 0, z: 1 },
    ),
    (
        CubeSide::Top,
        Vector3 { x: 0, y: 1, z: 0 },
        Vector3 { x: 0, y: 0, z: 1 },
        Vector3 { x: 1, y: 0, z: 0 },
    ),
    (
        CubeSide::Left,
        Vector3 { x: -1, y: 0, z: 0 },
        Vector3 { x: 0, y: 0, z: 1 },
        Vector3 { x: 0, y: 1, z: 0 },
    ),
    (
        CubeSide::Right,
        Vector3 { x: 1, y: 0, z: 0 },
        Vector3 { x: 0, y: 0, z: -1 },
        Vector3 { x: 0, y: 1, z: 0 },
    ),
];

const IDENTITY_AXES: (Vector3<i32>, Vector3<i32>, Vector3<i32>) = (
    Vector3 { x: 1, y: 0, z: 0 },
    Vector3 { x: 0, y: 1, z: 0 },
    Vector3 { x: 0, y: 0, z: 1 },
);

/// Pure mesh builder reused across builds by a single owning thread.
pub struct MeshCompiler {
    content: Arc<ContentIndex>,
    view: VoxelNeighborhoodView,
    vertices: Vec<ChunkVertex>,
    indices: Vec<u32>,
    vertex_capacity: usize,
    overflow: bool,
}

impl MeshCompiler {
    /// Creates a compiler bound to a content index.
    ///
    /// # Arguments
    /// * `content` - Shared read-only block definition table
    /// * `vertex_capacity` - Vertex budget per build
    /// * `padding` - Border width of the neighborhood snapshot
    pub fn new(content: Arc<ContentIndex>, vertex_capacity: usize, padding: usize) -> Self {
        MeshCompiler {
            content,
            view: VoxelNeighborhoodView::new(padding),
            vertices: Vec::new(),
            indices: Vec::new(),
            vertex_capacity,
            overflow: false,
        }
    }

    /// The current per-build vertex budget.
    pub fn vertex_capacity(&self) -> usize {
        self.vertex_capacity
    }

    /// Replaces the vertex budget for subsequent builds. Used by the
    /// scheduler to retry an overflowed chunk with the dense budget.
    pub fn set_vertex_capacity(&mut self, vertex_capacity: usize) {
        self.vertex_capacity = vertex_capacity;
    }

    /// Compiles one chunk into mesh buffers.
    ///
    /// Deterministic: identical chunk contents, neighborhood and definitions
    /// produce bit-identical buffers, no matter which thread runs the build.
    ///
    /// # Arguments
    /// * `chunk` - The chunk snapshot, immutable for the duration of the call
    /// * `voxels` - World accessor for border cells
    /// * `lights` - World accessor for precomputed light
    pub fn build(
        &mut self,
        chunk: &Chunk,
        voxels: &dyn VoxelSampler,
        lights: &dyn LightSampler,
    ) -> MeshData {
        self.vertices = Vec::new();
        self.indices = Vec::new();
        self.overflow = false;

        if chunk.is_empty() {
            return MeshData::default();
        }

        self.view.fill(chunk, voxels, lights);

        let content = Arc::clone(&self.content);
        for group in self.collect_draw_groups(chunk, &content) {
            self.emit_group(chunk, &content, group);
            if self.overflow {
                log::debug!(
                    "vertex budget ({}) exhausted meshing chunk ({}, {})",
                    self.vertex_capacity,
                    chunk.x,
                    chunk.z
                );
                break;
            }
        }

        MeshData {
            vertices: std::mem::take(&mut self.vertices),
            indices: std::mem::take(&mut self.indices),
            overflow: self.overflow,
        }
    }

    /// Draw groups present in the chunk, ascending.
    fn collect_draw_groups(&self, chunk: &Chunk, content: &ContentIndex) -> Vec<u8> {
        let mut groups = BTreeSet::new();
        for y in chunk.bottom()..chunk.top() {
            for z in 0..CHUNK_DEPTH {
                for x in 0..CHUNK_WIDTH {
                    if !chunk.is_occupied(x, y, z) {
                        continue;
                    }
                    if let Some(definition) = content.block(chunk.voxel(x, y, z).id) {
                        groups.insert(definition.draw_group);
                    }
                }
            }
        }
        groups.into_iter().collect()
    }

    /// One pass over the chunk emitting only blocks of `group`.
    fn emit_group(&mut self, chunk: &Chunk, content: &ContentIndex, group: u8) {
        for y in chunk.bottom()..chunk.top() {
            for z in 0..CHUNK_DEPTH {
                for x in 0..CHUNK_WIDTH {
                    if !chunk.is_occupied(x, y, z) {
                        continue;
                    }
                    let voxel = chunk.voxel(x, y, z);
                    let Some(definition) = content.block(voxel.id) else {
                        debug_assert!(false, "voxel holds unregistered block id {}", voxel.id);
                        log::error!(
                            "skipping voxel with unregistered block id {} in chunk ({}, {})",
                            voxel.id,
                            chunk.x,
                            chunk.z
                        );
                        continue;
                    };
                    if definition.draw_group != group {
                        continue;
                    }

                    let cell = Point3::new(x as i32, y as i32, z as i32);
                    match &definition.model {
                        BlockModel::None => {}
                        BlockModel::Cube => self.block_cube(cell, voxel, definition),
                        BlockModel::Aabb(sub_box) => {
                            let uv = definition.uv_faces;
                            self.block_boxes(cell, voxel, definition, &[(*sub_box, uv)], &[]);
                        }
                        BlockModel::Custom { boxes, tetragons } => {
                            self.block_boxes(cell, voxel, definition, boxes, tetragons);
                        }
                        BlockModel::XSprite => self.block_xsprite(chunk, cell, definition),
                    }

                    if self.overflow {
                        return;
                    }
                }
            }
        }
    }

    /// The block-local basis for a voxel, honoring rotation when enabled.
    fn voxel_axes(
        voxel: Voxel,
        definition: &BlockDefinition,
    ) -> (Vector3<i32>, Vector3<i32>, Vector3<i32>) {
        if definition.rotatable {
            definition
                .rotation_profile
                .rotation(voxel.state.rotation())
                .axes_i32()
        } else {
            IDENTITY_AXES
        }
    }

    /// Maps a canonical axis-aligned vector through the block basis.
    fn basis(
        canonical: Vector3<i32>,
        axes: &(Vector3<i32>, Vector3<i32>, Vector3<i32>),
    ) -> Vector3<i32> {
        axes.0 * canonical.x + axes.1 * canonical.y + axes.2 * canonical.z
    }

    /// Like `basis`, but scaled by the half extent along the canonical axis.
    fn basis_scaled(
        canonical: Vector3<i32>,
        axes: &(Vector3<i32>, Vector3<i32>, Vector3<i32>),
        half: Vector3<f32>,
    ) -> Vector3<f32> {
        if canonical.x != 0 {
            to_f32(axes.0) * (half.x * canonical.x as f32)
        } else if canonical.y != 0 {
            to_f32(axes.1) * (half.y * canonical.y as f32)
        } else {
            to_f32(axes.2) * (half.z * canonical.z as f32)
        }
    }

    /// Emits a full cube with per-face neighbor culling.
    fn block_cube(&mut self, cell: Point3<i32>, voxel: Voxel, definition: &BlockDefinition) {
        let axes = Self::voxel_axes(voxel, definition);
        let center = Point3::new(
            cell.x as f32 + 0.5,
            cell.y as f32 + 0.5,
            cell.z as f32 + 0.5,
        );
        let half = Vector3::new(0.5, 0.5, 0.5);

        for (side, canonical_n, canonical_w, canonical_h) in CUBE_FACES {
            let normal = Self::basis(canonical_n, &axes);
            if !self.is_open(cell + normal, voxel.id, definition) {
                continue;
            }

            let w = Self::basis_scaled(canonical_w, &axes, half);
            let h = Self::basis_scaled(canonical_h, &axes, half);
            let face_center = center + to_f32(normal) * 0.5;
            let region = definition.uv_faces[side as usize];

            if definition.ambient_occlusion {
                let w_step = Self::basis(canonical_w, &axes);
                let h_step = Self::basis(canonical_h, &axes);
                self.face_ao(face_center, w, h, cell + normal, w_step, h_step, region);
            } else {
                let factor = Self::sun_factor(to_f32(normal), definition.shadeless);
                let front = cell + normal;
                let light = self.scaled_light(front, factor);
                self.face_flat(face_center, w, h, region, light);
            }
            if self.overflow {
                return;
            }
        }
    }

    /// Emits sub-boxes and extra quadrilaterals, never neighbor-culled:
    /// boxes need not fill the voxel cell, so there is nothing to cull
    /// against.
    fn block_boxes(
        &mut self,
        cell: Point3<i32>,
        voxel: Voxel,
        definition: &BlockDefinition,
        boxes: &[(Box3, [UVRegion; 6])],
        tetragons: &[Tetragon],
    ) {
        let axes = Self::voxel_axes(voxel, definition);
        let cell_center = Point3::new(
            cell.x as f32 + 0.5,
            cell.y as f32 + 0.5,
            cell.z as f32 + 0.5,
        );

        for (sub_box, uv) in boxes {
            let size = sub_box.size();
            let half = Vector3::new(size[0] * 0.5, size[1] * 0.5, size[2] * 0.5);
            let local_center = sub_box.center() - Point3::new(0.5, 0.5, 0.5);
            let rotated_center = to_f32(axes.0) * local_center.x
                + to_f32(axes.1) * local_center.y
                + to_f32(axes.2) * local_center.z;
            let box_center = cell_center + rotated_center;

            for (side, canonical_n, canonical_w, canonical_h) in CUBE_FACES {
                let normal = Self::basis(canonical_n, &axes);
                let w = Self::basis_scaled(canonical_w, &axes, half);
                let h = Self::basis_scaled(canonical_h, &axes, half);
                let offset = Self::basis_scaled(canonical_n, &axes, half);
                let factor = Self::sun_factor(to_f32(normal), definition.shadeless);
                let light = self.scaled_light(cell, factor);
                self.face_flat(box_center + offset, w, h, uv[side as usize], light);
                if self.overflow {
                    return;
                }
            }
        }

        for tetragon in tetragons {
            let positions = tetragon.points.map(|p| {
                let local = p - Point3::new(0.5, 0.5, 0.5);
                cell_center
                    + to_f32(axes.0) * local.x
                    + to_f32(axes.1) * local.y
                    + to_f32(axes.2) * local.z
            });
            let edge_a = positions[1] - positions[0];
            let edge_b = positions[3] - positions[0];
            let normal = edge_a.cross(edge_b);
            let factor = Self::sun_factor(normal, definition.shadeless);
            let light = self.scaled_light(cell, factor);
            let r = tetragon.region;
            self.quad(
                positions,
                [[r.u1, r.v1], [r.u2, r.v1], [r.u2, r.v2], [r.u1, r.v2]],
                [light; 4],
            );
            if self.overflow {
                return;
            }
        }
    }

    /// Emits two crossed vertical quads with deterministic positional jitter.
    fn block_xsprite(&mut self, chunk: &Chunk, cell: Point3<i32>, definition: &BlockDefinition) {
        let wx = chunk.world_x() + cell.x;
        let wz = chunk.world_z() + cell.z;

        // Seeded from world coordinates, never global state, so two builds
        // of the same chunk jitter identically on any thread.
        let seed = (wx as i64 as u64)
            .wrapping_mul(0x9E37_79B9_7F4A_7C15)
            .wrapping_add(cell.y as i64 as u64)
            .wrapping_mul(0xC2B2_AE3D_27D4_EB4F)
            .wrapping_add(wz as i64 as u64);
        let mut rng = fastrand::Rng::with_seed(seed);
        let jitter_x = (rng.f32() - 0.5) * 0.25;
        let jitter_z = (rng.f32() - 0.5) * 0.25;

        let base_x = cell.x as f32 + jitter_x;
        let base_y = cell.y as f32;
        let base_z = cell.z as f32 + jitter_z;

        // Sprites skip directional shading; they read as unlit foliage.
        let light = self.scaled_light(cell, 1.0);
        let region = definition.uv_faces[CubeSide::Front as usize];
        let uvs = [
            [region.u1, region.v1],
            [region.u2, region.v1],
            [region.u2, region.v2],
            [region.u1, region.v2],
        ];

        const INSET: f32 = 0.146;
        let lo = INSET;
        let hi = 1.0 - INSET;

        let diagonals = [(lo, lo, hi, hi), (lo, hi, hi, lo)];
        for (x1, z1, x2, z2) in diagonals {
            self.quad(
                [
                    Point3::new(base_x + x1, base_y, base_z + z1),
                    Point3::new(base_x + x2, base_y, base_z + z2),
                    Point3::new(base_x + x2, base_y + 1.0, base_z + z2),
                    Point3::new(base_x + x1, base_y + 1.0, base_z + z1),
                ],
                uvs,
                [light; 4],
            );
            if self.overflow {
                return;
            }
        }
    }

    /// The open-face rule: can a cube face looking at `cell` be seen?
    ///
    /// Out-of-world cells count as closed (unloaded neighbors are assumed
    /// solid; the face appears once the neighbor chunk loads and this chunk
    /// remeshes). Air, different draw groups and non-filling models are
    /// open. Same-group filled neighbors follow the culling modes.
    fn is_open(&self, cell: Point3<i32>, own_id: BlockId, own: &BlockDefinition) -> bool {
        let neighbor = self.view.voxel(cell.x, cell.y, cell.z);
        if neighbor.id == VOID_BLOCK {
            return false;
        }
        let Some(other) = self.content.block(neighbor.id) else {
            return true;
        };
        if matches!(other.model, BlockModel::None) {
            return true;
        }
        if other.draw_group != own.draw_group {
            return true;
        }
        if !other.model.fills_cell() {
            return true;
        }
        match (own.culling, other.culling) {
            (CullingMode::Never, _) | (_, CullingMode::Never) => true,
            (CullingMode::Optional, _) | (_, CullingMode::Optional) => neighbor.id != own_id,
            (CullingMode::Always, CullingMode::Always) => false,
        }
    }

    /// Directional brightness for flat-shaded faces: sun-facing faces are
    /// brighter, floors at 0.8 so nothing goes black from direction alone.
    fn sun_factor(normal: Vector3<f32>, shadeless: bool) -> f32 {
        if shadeless {
            return 1.0;
        }
        0.8 + 0.2 * normal.normalize().dot(SUN_DIRECTION).max(0.0)
    }

    /// One light sample scaled by a brightness factor, as vertex channels.
    fn scaled_light(&self, cell: Point3<i32>, factor: f32) -> [u8; 4] {
        self.view
            .light(cell.x, cell.y, cell.z)
            .channels()
            .map(|channel| (channel as f32 * factor).round() as u8)
    }

    /// Emits a flat-shaded quad: same light on all four vertices.
    fn face_flat(
        &mut self,
        center: Point3<f32>,
        w: Vector3<f32>,
        h: Vector3<f32>,
        region: UVRegion,
        light: [u8; 4],
    ) {
        self.quad(
            [
                center - w - h,
                center + w - h,
                center + w + h,
                center - w + h,
            ],
            [
                [region.u1, region.v1],
                [region.u2, region.v1],
                [region.u2, region.v2],
                [region.u1, region.v2],
            ],
            [light; 4],
        );
    }

    /// Emits an ambient-occlusion quad: each vertex averages the four light
    /// samples straddling its corner, one cell in front of the face.
    fn face_ao(
        &mut self,
        center: Point3<f32>,
        w: Vector3<f32>,
        h: Vector3<f32>,
        front: Point3<i32>,
        w_step: Vector3<i32>,
        h_step: Vector3<i32>,
        region: UVRegion,
    ) {
        let corner_light = |sw: i32, sh: i32| -> [u8; 4] {
            let cells = [
                front,
                front + w_step * sw,
                front + h_step * sh,
                front + w_step * sw + h_step * sh,
            ];
            let mut sum = [0u32; 4];
            for cell in cells {
                let channels = self.view.light(cell.x, cell.y, cell.z).channels();
                for (accumulator, channel) in sum.iter_mut().zip(channels) {
                    *accumulator += channel as u32;
                }
            }
            sum.map(|total| ((total as f32) / 4.0).round() as u8)
        };

        let lights = [
            corner_light(-1, -1),
            corner_light(1, -1),
            corner_light(1, 1),
            corner_light(-1, 1),
        ];

        self.quad(
            [
                center - w - h,
                center + w - h,
                center + w + h,
                center - w + h,
            ],
            [
                [region.u1, region.v1],
                [region.u2, region.v1],
                [region.u2, region.v2],
                [region.u1, region.v2],
            ],
            lights,
        );
    }

    /// Appends one quad (4 vertices, 2 triangles), or flags overflow if the
    /// vertex budget cannot take 4 more.
    fn quad(&mut self, positions: [Point3<f32>; 4], uvs: [[f32; 2]; 4], lights: [[u8; 4]; 4]) {
        if self.vertices.len() + 4 > self.vertex_capacity {
            self.overflow = true;
            return;
        }
        let base = self.vertices.len() as u32;
        for i in 0..4 {
            self.vertices.push(ChunkVertex::new(
                [positions[i].x, positions[i].y, positions[i].z],
                uvs[i],
                lights[i],
            ));
        }
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
}

fn to_f32(v: Vector3<i32>) -> Vector3<f32> {
    Vector3::new(v.x as f32, v.y as f32, v.z as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lighting::PackedLight;
    use crate::voxels::chunk::CHUNK_HEIGHT;
    use crate::voxels::voxel::VoxelState;

    const STONE: BlockId = 1;
    const GLASS: BlockId = 2;
    const TUFT: BlockId = 3;
    const SLAB: BlockId = 4;
    const LEAVES: BlockId = 5;
    const FLAT_STONE: BlockId = 6;

    fn face_region(index: usize) -> UVRegion {
        let u = index as f32 * 0.1;
        UVRegion::new(u, 0.5, u + 0.1, 0.6)
    }

    fn test_content() -> Arc<ContentIndex> {
        let mut stone = BlockDefinition::cube("stone", UVRegion::FULL);
        for (index, region) in stone.uv_faces.iter_mut().enumerate() {
            *region = face_region(index);
        }

        let glass = BlockDefinition::cube("glass", UVRegion::new(0.0, 0.0, 0.1, 0.1))
            .with_draw_group(1)
            .with_culling(CullingMode::Optional)
            .with_ambient_occlusion(false);

        let mut tuft = BlockDefinition::cube("tuft", UVRegion::new(0.2, 0.2, 0.3, 0.3));
        tuft.model = BlockModel::XSprite;

        let mut slab = BlockDefinition::cube("slab", UVRegion::new(0.4, 0.4, 0.5, 0.5));
        slab.model = BlockModel::Aabb(Box3::from_min_size([0.0, 0.0, 0.0], [1.0, 0.5, 1.0]));
        slab.ambient_occlusion = false;

        let leaves = BlockDefinition::cube("leaves", UVRegion::new(0.6, 0.6, 0.7, 0.7))
            .with_culling(CullingMode::Never)
            .with_ambient_occlusion(false);

        let flat_stone = BlockDefinition::cube("flat-stone", UVRegion::FULL)
            .with_ambient_occlusion(false);

        Arc::new(ContentIndex::new(vec![
            BlockDefinition::air(),
            stone,
            glass,
            tuft,
            slab,
            leaves,
            flat_stone,
        ]))
    }

    /// Air everywhere, uniform full light.
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

    /// One block id everywhere, darkness.
    struct SolidWorld(BlockId);

    impl VoxelSampler for SolidWorld {
        fn voxel_at(&self, _wx: i32, _wy: i32, _wz: i32) -> Option<Voxel> {
            Some(Voxel::new(self.0))
        }
    }

    impl LightSampler for SolidWorld {
        fn light_at(&self, _wx: i32, _wy: i32, _wz: i32) -> PackedLight {
            PackedLight::ZERO
        }
    }

    /// Light rises with height so ambient occlusion has a gradient to read.
    struct GradientWorld;

    impl VoxelSampler for GradientWorld {
        fn voxel_at(&self, _wx: i32, wy: i32, _wz: i32) -> Option<Voxel> {
            (0..CHUNK_HEIGHT as i32).contains(&wy).then_some(Voxel::AIR)
        }
    }

    impl LightSampler for GradientWorld {
        fn light_at(&self, _wx: i32, wy: i32, _wz: i32) -> PackedLight {
            let sun = wy.clamp(0, 15) as u8;
            PackedLight::new(sun, sun, sun, sun)
        }
    }

    fn compiler(capacity: usize) -> MeshCompiler {
        MeshCompiler::new(test_content(), capacity, 1)
    }

    #[test]
    fn single_cube_surrounded_by_air_emits_six_quads() {
        let mut chunk = Chunk::new(0, 0);
        chunk.set_voxel(8, 8, 8, Voxel::new(STONE));

        let mesh = compiler(1024).build(&chunk, &OpenWorld, &OpenWorld);
        assert!(!mesh.overflow);
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);

        // Every face carries the UV region configured for its side, in
        // canonical emission order.
        for (face, (side, ..)) in CUBE_FACES.iter().enumerate() {
            let region = face_region(*side as usize);
            let quad = &mesh.vertices[face * 4..face * 4 + 4];
            assert_eq!(quad[0].uv, [region.u1, region.v1]);
            assert_eq!(quad[2].uv, [region.u2, region.v2]);
        }
    }

    #[test]
    fn buried_chunk_emits_nothing() {
        let chunk = Chunk::solid(0, 0, Voxel::new(STONE));
        let world = SolidWorld(STONE);
        let mesh = compiler(65536).build(&chunk, &world, &world);
        assert!(mesh.is_empty());
        assert!(!mesh.overflow);
    }

    #[test]
    fn empty_chunk_emits_nothing() {
        let chunk = Chunk::new(0, 0);
        let mesh = compiler(1024).build(&chunk, &OpenWorld, &OpenWorld);
        assert!(mesh.is_empty());
    }

    #[test]
    fn compiles_are_bit_identical() {
        let mut chunk = Chunk::new(0, 0);
        for x in 0..CHUNK_WIDTH {
            for z in 0..CHUNK_DEPTH {
                if (x + z) % 3 == 0 {
                    chunk.set_voxel(x, 2, z, Voxel::new(STONE));
                }
                if (x * z) % 5 == 1 {
                    chunk.set_voxel(x, 3, z, Voxel::new(TUFT));
                }
            }
        }

        let first = compiler(65536).build(&chunk, &GradientWorld, &GradientWorld);
        let second = compiler(65536).build(&chunk, &GradientWorld, &GradientWorld);
        assert_eq!(first.vertex_bytes(), second.vertex_bytes());
        assert_eq!(first.index_bytes(), second.index_bytes());
    }

    #[test]
    fn overflow_truncates_without_corruption() {
        let chunk = Chunk::solid(0, 0, Voxel::new(STONE));

        let full = compiler(1 << 20).build(&chunk, &OpenWorld, &OpenWorld);
        assert!(!full.overflow);
        let full_count = full.vertices.len();
        assert!(full_count > 64);

        for capacity in 1..64 {
            let mesh = compiler(capacity).build(&chunk, &OpenWorld, &OpenWorld);
            assert!(mesh.overflow, "capacity {capacity} should overflow");
            assert!(mesh.vertices.len() <= capacity);
            // Quads are emitted atomically: index data always matches.
            assert_eq!(mesh.indices.len(), mesh.vertices.len() / 4 * 6);
            assert_eq!(mesh.vertices.len() % 4, 0);
        }
    }

    #[test]
    fn draw_groups_are_emitted_in_ascending_order() {
        let mut chunk = Chunk::new(0, 0);
        // Glass (group 1) placed before stone (group 0) in memory order.
        chunk.set_voxel(0, 1, 0, Voxel::new(GLASS));
        chunk.set_voxel(10, 1, 10, Voxel::new(STONE));

        let mesh = compiler(1024).build(&chunk, &OpenWorld, &OpenWorld);
        assert_eq!(mesh.vertices.len(), 48);

        // Stone's 24 vertices come first despite its later linear position.
        for vertex in &mesh.vertices[..24] {
            assert!(vertex.position[0] >= 9.0);
        }
        for vertex in &mesh.vertices[24..] {
            assert!(vertex.position[0] <= 2.0);
        }
    }

    #[test]
    fn optional_culling_hides_faces_between_identical_blocks_only() {
        let mut chunk = Chunk::new(0, 0);
        chunk.set_voxel(4, 4, 4, Voxel::new(GLASS));
        chunk.set_voxel(5, 4, 4, Voxel::new(GLASS));
        let mesh = compiler(1024).build(&chunk, &OpenWorld, &OpenWorld);
        // Two cubes share one interior face pair: 10 quads remain.
        assert_eq!(mesh.vertices.len(), 40);

        // A same-group, different-id neighbor keeps the boundary visible:
        // stone is group 0, glass group 1, so both sides stay too.
        let mut boundary = Chunk::new(0, 0);
        boundary.set_voxel(4, 4, 4, Voxel::new(GLASS));
        boundary.set_voxel(5, 4, 4, Voxel::new(STONE));
        let mesh = compiler(1024).build(&boundary, &OpenWorld, &OpenWorld);
        assert_eq!(mesh.vertices.len(), 48);
    }

    #[test]
    fn never_culling_keeps_every_face() {
        let mut chunk = Chunk::new(0, 0);
        chunk.set_voxel(4, 4, 4, Voxel::new(LEAVES));
        chunk.set_voxel(5, 4, 4, Voxel::new(LEAVES));
        let mesh = compiler(1024).build(&chunk, &OpenWorld, &OpenWorld);
        assert_eq!(mesh.vertices.len(), 48);
    }

    #[test]
    fn solid_neighbors_cull_against_each_other() {
        let mut chunk = Chunk::new(0, 0);
        chunk.set_voxel(4, 4, 4, Voxel::new(STONE));
        chunk.set_voxel(5, 4, 4, Voxel::new(STONE));
        let mesh = compiler(1024).build(&chunk, &OpenWorld, &OpenWorld);
        assert_eq!(mesh.vertices.len(), 40);
    }

    #[test]
    fn ambient_occlusion_varies_light_across_a_face() {
        let mut chunk = Chunk::new(0, 0);
        chunk.set_voxel(8, 4, 8, Voxel::new(STONE));

        let mesh = compiler(1024).build(&chunk, &GradientWorld, &GradientWorld);

        // Front face vertices straddle two light layers, so AO must produce
        // at least two distinct per-vertex values.
        let mut distinct: Vec<[u8; 4]> = mesh.vertices[..4].iter().map(|v| v.light).collect();
        distinct.dedup();
        assert!(
            distinct.len() > 1,
            "ambient occlusion should vary per vertex"
        );
    }

    #[test]
    fn flat_shading_is_uniform_per_face() {
        let mut chunk = Chunk::new(0, 0);
        chunk.set_voxel(8, 4, 8, Voxel::new(FLAT_STONE));

        let mesh = compiler(1024).build(&chunk, &GradientWorld, &GradientWorld);
        for quad in mesh.vertices.chunks(4) {
            let first = quad[0].light;
            assert!(quad.iter().all(|v| v.light == first));
        }
    }

    #[test]
    fn flat_shading_brightens_sun_facing_faces() {
        let mut chunk = Chunk::new(0, 0);
        chunk.set_voxel(8, 4, 8, Voxel::new(FLAT_STONE));

        let mesh = compiler(1024).build(&chunk, &OpenWorld, &OpenWorld);
        let quads: Vec<&[ChunkVertex]> = mesh.vertices.chunks(4).collect();
        let top_index = CUBE_FACES
            .iter()
            .position(|(side, ..)| *side == CubeSide::Top)
            .unwrap();
        let bottom_index = CUBE_FACES
            .iter()
            .position(|(side, ..)| *side == CubeSide::Bottom)
            .unwrap();
        assert!(quads[top_index][0].light[3] > quads[bottom_index][0].light[3]);
    }

    #[test]
    fn xsprite_jitter_is_deterministic_per_position() {
        let mut chunk = Chunk::new(0, 0);
        chunk.set_voxel(3, 1, 3, Voxel::new(TUFT));
        chunk.set_voxel(9, 1, 9, Voxel::new(TUFT));

        let first = compiler(1024).build(&chunk, &OpenWorld, &OpenWorld);
        let second = compiler(1024).build(&chunk, &OpenWorld, &OpenWorld);
        assert_eq!(first.vertex_bytes(), second.vertex_bytes());

        // Two sprites, two crossed quads each.
        assert_eq!(first.vertices.len(), 16);

        // Different positions jitter differently.
        let offset_a = first.vertices[0].position[0] - 3.0;
        let offset_b = first.vertices[8].position[0] - 9.0;
        assert!((offset_a - offset_b).abs() > f32::EPSILON);
    }

    #[test]
    fn aabb_model_ignores_neighbors() {
        let mut chunk = Chunk::new(0, 0);
        chunk.set_voxel(4, 4, 4, Voxel::new(SLAB));
        chunk.set_voxel(5, 4, 4, Voxel::new(STONE));

        let mesh = compiler(1024).build(&chunk, &OpenWorld, &OpenWorld);
        // Slab always emits all 6 faces; stone culls nothing against a
        // non-filling neighbor: 6 + 6 quads.
        assert_eq!(mesh.vertices.len(), 48);

        // Slab geometry spans half a cell vertically.
        let slab_vertices = &mesh.vertices[..24];
        let max_y = slab_vertices
            .iter()
            .map(|v| v.position[1])
            .fold(f32::MIN, f32::max);
        assert!((max_y - 4.5).abs() < 1e-6);
    }

    #[test]
    fn rotated_pane_swaps_face_axes() {
        let mut content_blocks = vec![
            BlockDefinition::air(),
            BlockDefinition::cube("pane", UVRegion::FULL),
        ];
        content_blocks[1].model =
            BlockModel::Aabb(Box3::from_min_size([0.0, 0.0, 0.4], [1.0, 1.0, 0.2]));
        content_blocks[1].ambient_occlusion = false;
        content_blocks[1].rotatable = true;
        content_blocks[1].rotation_profile = crate::content::profile("pane").unwrap();
        let content = Arc::new(ContentIndex::new(content_blocks));

        let mut chunk = Chunk::new(0, 0);
        chunk.set_voxel(4, 4, 4, Voxel::with_state(1, VoxelState::with_rotation(0)));
        let mut unrotated_compiler = MeshCompiler::new(content.clone(), 1024, 1);
        let unrotated = unrotated_compiler.build(&chunk, &OpenWorld, &OpenWorld);

        let mut rotated_chunk = Chunk::new(0, 0);
        rotated_chunk.set_voxel(4, 4, 4, Voxel::with_state(1, VoxelState::with_rotation(1)));
        let mut rotated_compiler = MeshCompiler::new(content, 1024, 1);
        let rotated = rotated_compiler.build(&rotated_chunk, &OpenWorld, &OpenWorld);

        let extent = |mesh: &MeshData, axis: usize| {
            let min = mesh
                .vertices
                .iter()
                .map(|v| v.position[axis])
                .fold(f32::MAX, f32::min);
            let max = mesh
                .vertices
                .iter()
                .map(|v| v.position[axis])
                .fold(f32::MIN, f32::max);
            max - min
        };

        // The thin axis flips from Z to X under a quarter turn.
        assert!((extent(&unrotated, 2) - 0.2).abs() < 1e-5);
        assert!((extent(&unrotated, 0) - 1.0).abs() < 1e-5);
        assert!((extent(&rotated, 0) - 0.2).abs() < 1e-5);
        assert!((extent(&rotated, 2) - 1.0).abs() < 1e-5);
    }
}
