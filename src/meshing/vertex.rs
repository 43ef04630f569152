//! Vertex format and mesh buffers produced by the compiler.
//!
//! This module defines the GPU-friendly output of a compile pass: a dense
//! interleaved vertex buffer, a triangle index buffer, and the soft overflow
//! flag set when the vertex budget ran out mid-build.

use crate::lighting::MAX_LIGHT;

/// A single mesh vertex.
///
/// # Memory Layout
/// - Position: 3x f32 (12 bytes)
/// - Texture coordinates: 2x f32 (8 bytes)
/// - Light: 4x u8 normalized (4 bytes)
///
/// Total size: 24 bytes, no padding.
///
/// The light attribute carries the four 0..=15 light channels scaled to
/// 0..=255, to be read as a normalized `u8x4` vertex attribute. An explicit
/// fixed-width integer field replaces the old trick of reinterpreting packed
/// bytes as a float, which only ever worked by accident of platform.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ChunkVertex {
    /// Position in chunk-local space.
    pub position: [f32; 3],
    /// Atlas texture coordinates.
    pub uv: [f32; 2],
    /// Normalized light, `[red, green, blue, sun]`.
    pub light: [u8; 4],
}

/// Bytes between consecutive vertices in the buffer.
pub const VERTEX_STRIDE: usize = std::mem::size_of::<ChunkVertex>();

impl ChunkVertex {
    /// Builds a vertex, scaling 0..=15 light channels to normalized bytes.
    pub fn new(position: [f32; 3], uv: [f32; 2], light: [u8; 4]) -> Self {
        ChunkVertex {
            position,
            uv,
            light: light.map(|channel| channel.min(MAX_LIGHT) * 17),
        }
    }
}

/// The output of one compile pass.
///
/// Owned exclusively by whichever thread produced it until it is handed
/// off through the pool's result queue; nothing here is shared.
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    /// Interleaved vertex buffer.
    pub vertices: Vec<ChunkVertex>,
    /// Triangle indices into `vertices`.
    pub indices: Vec<u32>,
    /// True when the vertex budget ran out and faces were dropped. A soft
    /// condition: the mesh is still valid, just incomplete.
    pub overflow: bool,
}

impl MeshData {
    /// An empty mesh with buffers preallocated for `vertex_capacity`.
    pub fn with_capacity(vertex_capacity: usize) -> Self {
        MeshData {
            vertices: Vec::with_capacity(vertex_capacity),
            // Quads dominate: 6 indices per 4 vertices.
            indices: Vec::with_capacity(vertex_capacity / 4 * 6),
            overflow: false,
        }
    }

    /// Whether the mesh holds no geometry.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// The raw vertex bytes, for upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// The raw index bytes, for upload.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_has_expected_stride() {
        assert_eq!(VERTEX_STRIDE, 24);
    }

    #[test]
    fn light_channels_are_normalized() {
        let vertex = ChunkVertex::new([0.0; 3], [0.0; 2], [0, 7, 15, 20]);
        assert_eq!(vertex.light, [0, 119, 255, 255]);
    }

    #[test]
    fn byte_views_cover_the_buffers() {
        let mut mesh = MeshData::with_capacity(8);
        mesh.vertices.push(ChunkVertex::new(
            [1.0, 2.0, 3.0],
            [0.5, 0.5],
            [15, 15, 15, 15],
        ));
        mesh.indices.extend_from_slice(&[0, 0, 0]);
        assert_eq!(mesh.vertex_bytes().len(), VERTEX_STRIDE);
        assert_eq!(mesh.index_bytes().len(), 12);
        assert!(!mesh.is_empty());
    }
}
