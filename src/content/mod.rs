//! # Content Module
//!
//! Read-only block definitions and everything the compiler looks up per
//! voxel: model kind, atlas UV regions, culling mode, draw group, shading
//! flags and rotation profile.
//!
//! Definitions are loaded once, from serde-deserializable descriptors, into a
//! [`ContentIndex`] that is then shared immutably (`Arc`) with every compiler
//! instance. Nothing in here is mutated after construction; the compiler
//! relies on that for its thread safety.

use std::fmt;

use cgmath::Point3;
use num_derive::FromPrimitive;
use serde::{Deserialize, Serialize};

use crate::voxels::voxel::BlockId;

pub mod rotation;

pub use rotation::{profile, Rotation, RotationProfile, ROTATION_PROFILES};

/// The six faces of a cube model, in the order block textures are listed.
///
/// The order is: [Front, Back, Bottom, Top, Left, Right], matching the
/// `texture-faces` array in block descriptors.
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug, FromPrimitive)]
pub enum CubeSide {
    /// The front face (facing positive Z).
    Front = 0,
    /// The back face (facing negative Z).
    Back = 1,
    /// The bottom face (facing negative Y).
    Bottom = 2,
    /// The top face (facing positive Y).
    Top = 3,
    /// The left face (facing negative X).
    Left = 4,
    /// The right face (facing positive X).
    Right = 5,
}

impl CubeSide {
    /// All six faces in texture order.
    pub fn all() -> [CubeSide; 6] {
        [
            CubeSide::Front,
            CubeSide::Back,
            CubeSide::Bottom,
            CubeSide::Top,
            CubeSide::Left,
            CubeSide::Right,
        ]
    }

    /// The face for a texture-order index.
    ///
    /// # Panics
    /// Panics if `index` is not in 0..6.
    pub fn from_index(index: usize) -> CubeSide {
        num::FromPrimitive::from_usize(index).unwrap()
    }
}

/// A sub-rectangle of the shared texture atlas assigned to one block face.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct UVRegion {
    /// Left edge.
    pub u1: f32,
    /// Bottom edge.
    pub v1: f32,
    /// Right edge.
    pub u2: f32,
    /// Top edge.
    pub v2: f32,
}

impl UVRegion {
    /// A region spanning the entire atlas.
    pub const FULL: UVRegion = UVRegion {
        u1: 0.0,
        v1: 0.0,
        u2: 1.0,
        v2: 1.0,
    };

    /// Builds a region from its corner coordinates.
    pub fn new(u1: f32, v1: f32, u2: f32, v2: f32) -> Self {
        UVRegion { u1, v1, u2, v2 }
    }
}

/// Resolves texture names to atlas UV regions at content build time.
///
/// The atlas itself (image loading, packing) lives outside this crate; the
/// compiler only ever sees resolved regions.
pub trait TextureAtlas {
    /// The UV region for a texture name. Unknown names should resolve to a
    /// recognizable placeholder region rather than failing the whole load.
    fn region(&self, name: &str) -> UVRegion;
}

/// How a block participates in hiding the faces it shares with neighbors.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CullingMode {
    /// The block hides shared faces of same-draw-group neighbors.
    #[default]
    Always,
    /// The block never hides neighbor faces (and its own faces are never
    /// hidden by same-group neighbors either).
    Never,
    /// The block hides shared faces only between voxels of the same block
    /// id. Used for glass-like blocks: interior faces between identical
    /// panes disappear, boundaries against other blocks stay visible.
    Optional,
}

/// An axis-aligned sub-box of the voxel cell, in block-local 0..=1 space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Box3 {
    /// Minimum corner.
    pub min: Point3<f32>,
    /// Maximum corner.
    pub max: Point3<f32>,
}

impl Box3 {
    /// The unit box filling the whole voxel cell.
    pub const UNIT: Box3 = Box3 {
        min: Point3 {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        },
        max: Point3 {
            x: 1.0,
            y: 1.0,
            z: 1.0,
        },
    };

    /// Builds a box from its minimum corner and size.
    pub fn from_min_size(min: [f32; 3], size: [f32; 3]) -> Self {
        Box3 {
            min: Point3::new(min[0], min[1], min[2]),
            max: Point3::new(min[0] + size[0], min[1] + size[1], min[2] + size[2]),
        }
    }

    /// Center point of the box.
    pub fn center(&self) -> Point3<f32> {
        Point3::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
            (self.min.z + self.max.z) * 0.5,
        )
    }

    /// Size along each axis.
    pub fn size(&self) -> [f32; 3] {
        [
            self.max.x - self.min.x,
            self.max.y - self.min.y,
            self.max.z - self.min.z,
        ]
    }
}

/// An arbitrary quadrilateral in block-local space, for geometry a box list
/// cannot express (stair cuts, diagonal braces).
#[derive(Clone, Debug, PartialEq)]
pub struct Tetragon {
    /// The four corners, in fan order.
    pub points: [Point3<f32>; 4],
    /// Atlas region mapped across the quad.
    pub region: UVRegion,
}

/// The closed set of block geometry kinds.
///
/// The set is fixed and exhaustively matched in the compiler; new geometry
/// kinds are a content-format change, not a plugin point.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum BlockModel {
    /// No geometry at all (air).
    #[default]
    None,
    /// A full unit cube with per-face neighbor culling.
    Cube,
    /// A single axis-aligned sub-box, always emitted (no neighbor culling).
    Aabb(Box3),
    /// Several sub-boxes plus extra quadrilaterals, always emitted.
    Custom {
        /// Sub-boxes with their own face regions.
        boxes: Vec<(Box3, [UVRegion; 6])>,
        /// Extra non-box quadrilaterals.
        tetragons: Vec<Tetragon>,
    },
    /// Two crossed vertical quads with per-voxel positional jitter.
    XSprite,
}

impl BlockModel {
    /// Whether this model completely fills the voxel cell. Only models that
    /// fill their cell can hide neighbor faces.
    pub fn fills_cell(&self) -> bool {
        matches!(self, BlockModel::Cube)
    }
}

/// Static, per-block-id descriptor the compiler reads for every voxel.
#[derive(Clone, Debug)]
pub struct BlockDefinition {
    /// Human-readable block name (diagnostics only).
    pub name: String,
    /// Geometry kind.
    pub model: BlockModel,
    /// Atlas region per face, in [`CubeSide`] order.
    pub uv_faces: [UVRegion; 6],
    /// Face-hiding behavior against neighbors.
    pub culling: CullingMode,
    /// Blocks in the same draw group hide each other's shared faces and are
    /// emitted contiguously for batched rendering.
    pub draw_group: u8,
    /// Whether cube faces get per-vertex ambient-occlusion shading instead
    /// of flat shading.
    pub ambient_occlusion: bool,
    /// Skip the directional sun factor entirely (glowing blocks).
    pub shadeless: bool,
    /// Whether the voxel's rotation bits are honored.
    pub rotatable: bool,
    /// Basis lookup for rotatable blocks.
    pub rotation_profile: &'static RotationProfile,
}

impl BlockDefinition {
    /// The air definition (id 0 by convention).
    pub fn air() -> Self {
        BlockDefinition {
            name: "air".to_string(),
            model: BlockModel::None,
            uv_faces: [UVRegion::FULL; 6],
            culling: CullingMode::Always,
            draw_group: 0,
            ambient_occlusion: false,
            shadeless: false,
            rotatable: false,
            rotation_profile: &rotation::PROFILE_NONE,
        }
    }

    /// A plain opaque cube with one region on every face.
    pub fn cube(name: &str, region: UVRegion) -> Self {
        BlockDefinition {
            name: name.to_string(),
            model: BlockModel::Cube,
            uv_faces: [region; 6],
            culling: CullingMode::Always,
            draw_group: 0,
            ambient_occlusion: true,
            shadeless: false,
            rotatable: false,
            rotation_profile: &rotation::PROFILE_NONE,
        }
    }

    /// Same definition with a different draw group.
    pub fn with_draw_group(mut self, group: u8) -> Self {
        self.draw_group = group;
        self
    }

    /// Same definition with a different culling mode.
    pub fn with_culling(mut self, culling: CullingMode) -> Self {
        self.culling = culling;
        self
    }

    /// Same definition with ambient occlusion toggled.
    pub fn with_ambient_occlusion(mut self, ambient_occlusion: bool) -> Self {
        self.ambient_occlusion = ambient_occlusion;
        self
    }
}

/// Read-only lookup table `BlockId -> BlockDefinition`.
///
/// Built once by the content system, then shared as `Arc<ContentIndex>`
/// with every compiler instance. Must not change structurally for the
/// duration of any compile; immutability makes that free.
#[derive(Debug)]
pub struct ContentIndex {
    blocks: Vec<BlockDefinition>,
}

impl ContentIndex {
    /// Wraps an already-resolved definition table. Index 0 is expected to be
    /// the air definition.
    pub fn new(blocks: Vec<BlockDefinition>) -> Self {
        debug_assert!(
            matches!(blocks.first().map(|b| &b.model), Some(BlockModel::None)),
            "block id 0 must be air"
        );
        ContentIndex { blocks }
    }

    /// The definition for a block id, or `None` for ids outside the table.
    pub fn block(&self, id: BlockId) -> Option<&BlockDefinition> {
        self.blocks.get(id as usize)
    }

    /// Number of registered definitions.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Resolves loaded descriptors into a definition table, mapping texture
    /// names through the atlas and profile names through the rotation
    /// registry.
    ///
    /// # Arguments
    /// * `descriptors` - Descriptors in block-id order (index 0 is air)
    /// * `atlas` - Resolves texture names to UV regions
    ///
    /// # Errors
    /// Fails on an unknown model kind or rotation profile name.
    pub fn from_descriptors(
        descriptors: &[BlockDescriptor],
        atlas: &dyn TextureAtlas,
    ) -> Result<Self, ContentError> {
        let mut blocks = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            blocks.push(descriptor.resolve(atlas)?);
        }
        Ok(ContentIndex::new(blocks))
    }
}

/// Loading-time form of a block definition, as stored in content packs.
///
/// Everything except the name has a default, so packs only spell out what
/// differs from a plain opaque cube.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockDescriptor {
    /// Block name.
    pub name: String,
    /// Model kind: `none`, `cube`, `aabb`, `custom` or `x-sprite`.
    #[serde(default = "default_model_kind")]
    pub model: String,
    /// One texture name applied to all six faces.
    #[serde(default)]
    pub texture: Option<String>,
    /// Per-face texture names in [`CubeSide`] order; overrides `texture`.
    #[serde(rename = "texture-faces", default)]
    pub texture_faces: Option<Vec<String>>,
    /// Draw group id.
    #[serde(rename = "draw-group", default)]
    pub draw_group: u8,
    /// Ambient-occlusion shading flag.
    #[serde(rename = "ambient-occlusion", default = "default_true")]
    pub ambient_occlusion: bool,
    /// Shadeless flag.
    #[serde(default)]
    pub shadeless: bool,
    /// Whether rotation bits are honored.
    #[serde(default)]
    pub rotatable: bool,
    /// Rotation profile name; defaults to the identity profile.
    #[serde(rename = "rotation-profile", default)]
    pub rotation_profile: Option<String>,
    /// Culling mode; defaults to `always`.
    #[serde(default)]
    pub culling: Option<CullingMode>,
    /// Sub-boxes as `[min_x, min_y, min_z, size_x, size_y, size_z]`, for the
    /// `aabb` and `custom` models.
    #[serde(rename = "model-boxes", default)]
    pub model_boxes: Vec<[f32; 6]>,
    /// Extra quadrilaterals as four points each, for the `custom` model.
    #[serde(rename = "model-tetragons", default)]
    pub model_tetragons: Vec<[[f32; 3]; 4]>,
}

fn default_model_kind() -> String {
    "cube".to_string()
}

fn default_true() -> bool {
    true
}

impl BlockDescriptor {
    fn resolve(&self, atlas: &dyn TextureAtlas) -> Result<BlockDefinition, ContentError> {
        let uv_faces = self.resolve_faces(atlas);

        let model = match self.model.as_str() {
            "none" => BlockModel::None,
            "cube" => BlockModel::Cube,
            "aabb" => BlockModel::Aabb(
                self.model_boxes
                    .first()
                    .map(|b| box_from_descriptor(*b))
                    .unwrap_or(Box3::UNIT),
            ),
            "custom" => BlockModel::Custom {
                boxes: self
                    .model_boxes
                    .iter()
                    .map(|b| (box_from_descriptor(*b), uv_faces))
                    .collect(),
                tetragons: self
                    .model_tetragons
                    .iter()
                    .map(|points| Tetragon {
                        points: points.map(|p| Point3::new(p[0], p[1], p[2])),
                        region: uv_faces[CubeSide::Front as usize],
                    })
                    .collect(),
            },
            "x-sprite" => BlockModel::XSprite,
            other => return Err(ContentError::UnknownModel(other.to_string())),
        };

        let rotation_profile = match &self.rotation_profile {
            None => &rotation::PROFILE_NONE,
            Some(name) => rotation::profile(name)
                .ok_or_else(|| ContentError::UnknownRotationProfile(name.clone()))?,
        };

        Ok(BlockDefinition {
            name: self.name.clone(),
            model,
            uv_faces,
            culling: self.culling.unwrap_or_default(),
            draw_group: self.draw_group,
            ambient_occlusion: self.ambient_occlusion,
            shadeless: self.shadeless,
            rotatable: self.rotatable,
            rotation_profile,
        })
    }

    fn resolve_faces(&self, atlas: &dyn TextureAtlas) -> [UVRegion; 6] {
        if let Some(names) = &self.texture_faces {
            let mut faces = [UVRegion::FULL; 6];
            for side in CubeSide::all() {
                if let Some(name) = names.get(side as usize) {
                    faces[side as usize] = atlas.region(name);
                }
            }
            return faces;
        }
        match &self.texture {
            Some(name) => [atlas.region(name); 6],
            None => [UVRegion::FULL; 6],
        }
    }
}

fn box_from_descriptor(b: [f32; 6]) -> Box3 {
    Box3::from_min_size([b[0], b[1], b[2]], [b[3], b[4], b[5]])
}

/// Parses a JSON array of block descriptors.
pub fn load_descriptors(json: &str) -> Result<Vec<BlockDescriptor>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Errors raised while resolving block descriptors into definitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentError {
    /// Descriptor named a model kind the compiler does not know.
    UnknownModel(String),
    /// Descriptor named a rotation profile missing from the registry.
    UnknownRotationProfile(String),
}

impl fmt::Display for ContentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentError::UnknownModel(name) => write!(f, "unknown block model kind: {name}"),
            ContentError::UnknownRotationProfile(name) => {
                write!(f, "unknown rotation profile: {name}")
            }
        }
    }
}

impl std::error::Error for ContentError {}
