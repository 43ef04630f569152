//! Named rotation profiles for rotatable blocks.
//!
//! A profile maps the voxel's 2-bit rotation index to a full block-local
//! basis. The compiler pushes cube faces through this basis, so a rotated
//! block reuses the exact same face-emission path as an unrotated one.

use cgmath::Vector3;
use phf::phf_map;

/// One orientation: the block-local X/Y/Z axes expressed in world axes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Rotation {
    /// Where the block-local +X axis points.
    pub axis_x: [i32; 3],
    /// Where the block-local +Y axis points.
    pub axis_y: [i32; 3],
    /// Where the block-local +Z axis points.
    pub axis_z: [i32; 3],
}

impl Rotation {
    /// The block-local basis as integer vectors, for neighbor stepping and
    /// face placement.
    pub fn axes_i32(&self) -> (Vector3<i32>, Vector3<i32>, Vector3<i32>) {
        (
            Vector3::from(self.axis_x),
            Vector3::from(self.axis_y),
            Vector3::from(self.axis_z),
        )
    }
}

/// A named set of four orientations indexed by a voxel's rotation bits.
#[derive(Debug)]
pub struct RotationProfile {
    /// Registry name of the profile.
    pub name: &'static str,
    /// Orientation per rotation index.
    pub rotations: [Rotation; 4],
}

impl RotationProfile {
    /// The orientation for a voxel's rotation index (masked to 0..=3).
    pub fn rotation(&self, index: u8) -> &Rotation {
        &self.rotations[(index & 0b11) as usize]
    }
}

const IDENTITY: Rotation = Rotation {
    axis_x: [1, 0, 0],
    axis_y: [0, 1, 0],
    axis_z: [0, 0, 1],
};

/// Profile for blocks that do not actually rotate: all four indices map to
/// the identity orientation.
pub static PROFILE_NONE: RotationProfile = RotationProfile {
    name: "none",
    rotations: [IDENTITY, IDENTITY, IDENTITY, IDENTITY],
};

/// Profile for horizontally-oriented blocks (panes, ladders, furnaces):
/// four quarter turns around the world Y axis.
pub static PROFILE_PANE: RotationProfile = RotationProfile {
    name: "pane",
    rotations: [
        IDENTITY,
        Rotation {
            axis_x: [0, 0, -1],
            axis_y: [0, 1, 0],
            axis_z: [1, 0, 0],
        },
        Rotation {
            axis_x: [-1, 0, 0],
            axis_y: [0, 1, 0],
            axis_z: [0, 0, -1],
        },
        Rotation {
            axis_x: [0, 0, 1],
            axis_y: [0, 1, 0],
            axis_z: [-1, 0, 0],
        },
    ],
};

/// Registry of rotation profiles by name, resolved at descriptor load time.
pub static ROTATION_PROFILES: phf::Map<&'static str, &'static RotationProfile> = phf_map! {
    "none" => &PROFILE_NONE,
    "pane" => &PROFILE_PANE,
};

/// Looks up a rotation profile by registry name.
pub fn profile(name: &str) -> Option<&'static RotationProfile> {
    ROTATION_PROFILES.get(name).copied()
}
