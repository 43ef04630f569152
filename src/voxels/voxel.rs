//! # Voxel Module
//!
//! The smallest unit of world data: a block id plus a packed state bitfield.
//! Voxels are immutable for the duration of a compile pass and owned by their
//! chunk's flat array.

/// The integer type identifying a block definition in the content index.
pub type BlockId = u16;

/// The id of the air block. Air is a real definition (model `None`) so the
/// compiler never special-cases id zero beyond its model kind.
pub const AIR_BLOCK: BlockId = 0;

/// Sentinel id for cells outside the loaded world. Only ever produced by the
/// neighborhood view; it never appears inside a chunk.
pub const VOID_BLOCK: BlockId = BlockId::MAX;

/// Packed per-voxel state: rotation (2 bits), segment (1 bit), and 5 user
/// bits left to gameplay code.
///
/// The compiler only reads the rotation; the segment and user bits travel
/// through meshing untouched.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct VoxelState(u8);

const ROTATION_MASK: u8 = 0b0000_0011;
const SEGMENT_BIT: u8 = 0b0000_0100;
const USER_SHIFT: u32 = 3;

impl VoxelState {
    /// State with rotation 0, no segment bit, empty user bits.
    pub fn new() -> Self {
        VoxelState(0)
    }

    /// State carrying only a rotation index.
    ///
    /// # Arguments
    /// * `rotation` - Rotation index, masked to 0..=3
    pub fn with_rotation(rotation: u8) -> Self {
        VoxelState(rotation & ROTATION_MASK)
    }

    /// The rotation index (0..=3) into the block's rotation profile.
    pub fn rotation(self) -> u8 {
        self.0 & ROTATION_MASK
    }

    /// Replaces the rotation index, leaving the other bits alone.
    pub fn set_rotation(&mut self, rotation: u8) {
        self.0 = (self.0 & !ROTATION_MASK) | (rotation & ROTATION_MASK);
    }

    /// Whether the segment bit is set (used by multi-voxel blocks).
    pub fn segment(self) -> bool {
        self.0 & SEGMENT_BIT != 0
    }

    /// Sets or clears the segment bit.
    pub fn set_segment(&mut self, segment: bool) {
        if segment {
            self.0 |= SEGMENT_BIT;
        } else {
            self.0 &= !SEGMENT_BIT;
        }
    }

    /// The 5 free user bits.
    pub fn user_bits(self) -> u8 {
        self.0 >> USER_SHIFT
    }

    /// Replaces the user bits.
    pub fn set_user_bits(&mut self, bits: u8) {
        self.0 = (self.0 & (ROTATION_MASK | SEGMENT_BIT)) | (bits << USER_SHIFT);
    }

    /// The raw byte.
    pub fn raw(self) -> u8 {
        self.0
    }

    /// Reconstructs a state from its raw byte.
    pub fn from_raw(raw: u8) -> Self {
        VoxelState(raw)
    }
}

/// A single voxel: block id plus state bits.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Voxel {
    /// Index into the content index's block definition table.
    pub id: BlockId,
    /// Packed rotation/segment/user state.
    pub state: VoxelState,
}

impl Voxel {
    /// The air voxel.
    pub const AIR: Voxel = Voxel {
        id: AIR_BLOCK,
        state: VoxelState(0),
    };

    /// A voxel of the given block with default state.
    pub fn new(id: BlockId) -> Self {
        Voxel {
            id,
            state: VoxelState::new(),
        }
    }

    /// A voxel of the given block with explicit state bits.
    pub fn with_state(id: BlockId, state: VoxelState) -> Self {
        Voxel { id, state }
    }

    /// Whether this voxel is air.
    pub fn is_air(self) -> bool {
        self.id == AIR_BLOCK
    }
}
