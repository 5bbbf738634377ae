//! Render state keys shared by batches and commands.

use crate::texture::TextureId;

/// Primitive assembly mode. Quads are emitted as two triangles each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Topology {
    #[default]
    TriangleList,
}

/// Vertex format a batch is packed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexLayout {
    /// `x, y, z, u, v`
    Textured,
    /// `x, y, z, color`
    Colored,
}

impl VertexLayout {
    /// Floats (or float-sized words) per vertex.
    pub const fn stride(self) -> usize {
        match self {
            VertexLayout::Textured => 5,
            VertexLayout::Colored => 4,
        }
    }

    /// Bytes per vertex.
    pub const fn stride_bytes(self) -> usize {
        self.stride() * std::mem::size_of::<f32>()
    }
}

/// Blend and depth configuration derived from translucency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendDepthMode {
    /// Depth writes on, blending off.
    Opaque,
    /// Depth writes off, source-alpha blending on.
    Translucent,
}

impl BlendDepthMode {
    pub const fn from_translucent(translucent: bool) -> Self {
        if translucent {
            BlendDepthMode::Translucent
        } else {
            BlendDepthMode::Opaque
        }
    }

    pub const fn depth_write(self) -> bool {
        matches!(self, BlendDepthMode::Opaque)
    }

    pub const fn blending(self) -> bool {
        matches!(self, BlendDepthMode::Translucent)
    }
}

/// The state two primitives must share to be drawn by one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderState {
    pub topology: Topology,
    pub translucent: bool,
    /// `None` for flat-colored geometry.
    pub texture: Option<TextureId>,
}

impl RenderState {
    pub fn textured(texture: TextureId, translucent: bool) -> Self {
        Self {
            topology: Topology::TriangleList,
            translucent,
            texture: Some(texture),
        }
    }

    pub fn colored(translucent: bool) -> Self {
        Self {
            topology: Topology::TriangleList,
            translucent,
            texture: None,
        }
    }

    pub fn vertex_layout(&self) -> VertexLayout {
        match self.texture {
            Some(_) => VertexLayout::Textured,
            None => VertexLayout::Colored,
        }
    }

    pub fn blend_depth_mode(&self) -> BlendDepthMode {
        BlendDepthMode::from_translucent(self.translucent)
    }
}
