//! Draw batches: runs of quads sharing one render state.

use bytemuck::{Pod, Zeroable};
use quadbatch_core::profiling::profile_function;

use crate::error::{CompileError, CompileResult};
use crate::primitive::{FilledQuad, QuadRef, TexturedQuad};
use crate::sequencer::MergePolicy;
use crate::state::{RenderState, VertexLayout};
use crate::texture::TextureRegistry;

/// Vertices per quad.
pub const QUAD_VERTICES: u32 = 4;
/// Triangles per quad.
pub const QUAD_TRIANGLES: u32 = 2;

/// Textured vertex: position then texture coordinate. 20 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TexturedVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
}

/// Flat-colored vertex: position then packed RGBA8. 16 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ColoredVertex {
    pub position: [f32; 3],
    pub color: u32,
}

/// Per-batch vertex data in the batch's layout.
#[derive(Debug, Clone, PartialEq)]
pub enum ScratchVertices {
    Textured(Vec<TexturedVertex>),
    Colored(Vec<ColoredVertex>),
}

impl ScratchVertices {
    pub fn layout(&self) -> VertexLayout {
        match self {
            ScratchVertices::Textured(_) => VertexLayout::Textured,
            ScratchVertices::Colored(_) => VertexLayout::Colored,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ScratchVertices::Textured(v) => v.len(),
            ScratchVertices::Colored(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn textured_vertices(quad: &TexturedQuad) -> Vec<TexturedVertex> {
    quad.position
        .corners()
        .into_iter()
        .zip(quad.tex_coords.corners())
        .map(|(p, uv)| TexturedVertex {
            position: [p.x, p.y, quad.z],
            tex_coords: [uv.x, uv.y],
        })
        .collect()
}

fn colored_vertices(quad: &FilledQuad) -> Vec<ColoredVertex> {
    let color = quad.color.to_packed();
    quad.position
        .corners()
        .into_iter()
        .map(|p| ColoredVertex {
            position: [p.x, p.y, quad.z],
            color,
        })
        .collect()
}

/// One or more quads drawn with a single call.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawBatch {
    pub state: RenderState,
    pub z: f32,
    pub vertex_count: u32,
    /// Triangle count.
    pub primitive_count: u32,
    pub vertices: ScratchVertices,
}

impl DrawBatch {
    /// Builds a single-quad batch, or `None` for an invisible quad.
    pub fn from_quad(
        quad: QuadRef<'_>,
        textures: &TextureRegistry,
    ) -> CompileResult<Option<Self>> {
        if !quad.is_visible() {
            return Ok(None);
        }

        let (state, vertices) = match quad {
            QuadRef::Textured(q) => {
                let translucent = textures.is_translucent(q.texture)?;
                (
                    RenderState::textured(q.texture, translucent),
                    ScratchVertices::Textured(textured_vertices(q)),
                )
            }
            QuadRef::Filled(q) => (
                RenderState::colored(q.is_translucent()),
                ScratchVertices::Colored(colored_vertices(q)),
            ),
        };

        Ok(Some(Self {
            state,
            z: quad.z(),
            vertex_count: QUAD_VERTICES,
            primitive_count: QUAD_TRIANGLES,
            vertices,
        }))
    }

    pub fn layout(&self) -> VertexLayout {
        self.state.vertex_layout()
    }

    /// Number of quads held.
    pub fn quad_count(&self) -> u32 {
        self.vertex_count / QUAD_VERTICES
    }

    /// Whether `other` may be appended to this batch.
    ///
    /// Translucent batches always need equal depth: their submission order
    /// is the blend order.
    pub fn can_combine_with(&self, other: &DrawBatch, policy: MergePolicy) -> bool {
        if self.state != other.state {
            return false;
        }
        // Same depth relation as the sort, so NaN matches NaN and -0.0 differs from 0.0.
        let same_depth = self.z.total_cmp(&other.z).is_eq();
        match policy {
            MergePolicy::ExactDepth => same_depth,
            MergePolicy::RelaxOpaqueDepth => !self.state.translucent || same_depth,
        }
    }

    /// Appends `other`'s vertices and counts. The caller checks combinability.
    ///
    /// On error neither batch has changed.
    pub fn combine_with(&mut self, other: DrawBatch) -> CompileResult<()> {
        self.reserve_vertices(other.vertices.len())?;
        self.append(other);
        Ok(())
    }

    /// Grows scratch storage for `additional` more vertices.
    pub(crate) fn reserve_vertices(&mut self, additional: usize) -> CompileResult<()> {
        match &mut self.vertices {
            ScratchVertices::Textured(v) => v.try_reserve(additional),
            ScratchVertices::Colored(v) => v.try_reserve(additional),
        }
        .map_err(CompileError::out_of_memory(additional))
    }

    /// Moves `other` into this batch. Allocates only if
    /// [`reserve_vertices`](Self::reserve_vertices) was not called first.
    pub(crate) fn append(&mut self, other: DrawBatch) {
        debug_assert_eq!(self.state, other.state);

        match (&mut self.vertices, other.vertices) {
            (ScratchVertices::Textured(dst), ScratchVertices::Textured(src)) => {
                dst.extend_from_slice(&src);
            }
            (ScratchVertices::Colored(dst), ScratchVertices::Colored(src)) => {
                dst.extend_from_slice(&src);
            }
            _ => unreachable!("batches with equal render state share a vertex layout"),
        }

        self.vertex_count += other.vertex_count;
        self.primitive_count += other.primitive_count;
    }
}

/// Converts every visible quad into its own batch.
pub fn build_batches(
    quads: &[QuadRef<'_>],
    textures: &TextureRegistry,
) -> CompileResult<Vec<DrawBatch>> {
    profile_function!();

    let mut batches = Vec::new();
    batches
        .try_reserve(quads.len())
        .map_err(CompileError::out_of_memory(quads.len()))?;

    for quad in quads {
        if let Some(batch) = DrawBatch::from_quad(*quad, textures)? {
            batches.push(batch);
        }
    }

    tracing::trace!(
        "Built {} batches ({} invisible quads skipped)",
        batches.len(),
        quads.len() - batches.len()
    );
    Ok(batches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::{Color, Quad};
    use crate::texture::{TextureId, TextureMetadata};

    fn registry() -> (TextureRegistry, TextureId, TextureId) {
        let mut registry = TextureRegistry::new();
        let opaque = registry.register(TextureMetadata::new(8, 8, false));
        let translucent = registry.register(TextureMetadata::new(8, 8, true));
        (registry, opaque, translucent)
    }

    #[test]
    fn test_vertex_sizes() {
        assert_eq!(std::mem::size_of::<TexturedVertex>(), 20);
        assert_eq!(std::mem::size_of::<ColoredVertex>(), 16);
    }

    #[test]
    fn test_from_textured_quad() {
        let (registry, _, translucent) = registry();
        let quad = TexturedQuad::new(Quad::from_rect(0.0, 2.0, 3.0, 0.0), 0.4, translucent);
        let batch = DrawBatch::from_quad(QuadRef::Textured(&quad), &registry)
            .unwrap()
            .unwrap();

        assert_eq!(batch.state, RenderState::textured(translucent, true));
        assert_eq!(batch.z, 0.4);
        assert_eq!(batch.vertex_count, 4);
        assert_eq!(batch.primitive_count, 2);

        let ScratchVertices::Textured(vertices) = &batch.vertices else {
            panic!("expected textured vertices");
        };
        assert_eq!(vertices[0].position, [0.0, 0.0, 0.4]);
        assert_eq!(vertices[2].position, [3.0, 2.0, 0.4]);
        assert_eq!(vertices[1].tex_coords, [0.0, 1.0]);
        assert_eq!(vertices[3].tex_coords, [1.0, 0.0]);
    }

    #[test]
    fn test_from_filled_quad() {
        let (registry, _, _) = registry();
        let color = Color::rgba(255, 0, 0, 100);
        let quad = FilledQuad::new(Quad::from_rect(0.0, 1.0, 1.0, 0.0), 0.1, color);
        let batch = DrawBatch::from_quad(QuadRef::Filled(&quad), &registry)
            .unwrap()
            .unwrap();
        assert_eq!(batch.state, RenderState::colored(true));
        assert_eq!(batch.layout(), VertexLayout::Colored);
    }

    #[test]
    fn test_invisible_quad_skipped() {
        let (registry, opaque, _) = registry();
        let quad =
            TexturedQuad::new(Quad::from_rect(0.0, 1.0, 1.0, 0.0), 0.0, opaque).with_visible(false);
        assert!(DrawBatch::from_quad(QuadRef::Textured(&quad), &registry).unwrap().is_none());
    }

    #[test]
    fn test_unknown_texture() {
        let (registry, _, _) = registry();
        let missing = TextureId::from_raw(9);
        let quad = TexturedQuad::new(Quad::from_rect(0.0, 1.0, 1.0, 0.0), 0.0, missing);
        let err = build_batches(&[QuadRef::Textured(&quad)], &registry).unwrap_err();
        assert_eq!(err, CompileError::UnknownTextureReference { texture: missing });
    }

    #[test]
    fn test_combine() {
        let (registry, opaque, _) = registry();
        let a = TexturedQuad::new(Quad::from_rect(0.0, 1.0, 1.0, 0.0), 0.3, opaque);
        let b = TexturedQuad::new(Quad::from_rect(2.0, 1.0, 3.0, 0.0), 0.3, opaque);
        let c = TexturedQuad::new(Quad::from_rect(2.0, 1.0, 3.0, 0.0), 0.6, opaque);
        let refs = [QuadRef::Textured(&a), QuadRef::Textured(&b), QuadRef::Textured(&c)];
        let mut batches = build_batches(&refs, &registry).unwrap();

        let third = batches.pop().unwrap();
        let second = batches.pop().unwrap();
        let mut first = batches.pop().unwrap();

        assert!(first.can_combine_with(&second, MergePolicy::ExactDepth));
        assert!(!first.can_combine_with(&third, MergePolicy::ExactDepth));
        assert!(first.can_combine_with(&third, MergePolicy::RelaxOpaqueDepth));

        first.combine_with(second).unwrap();
        assert_eq!(first.vertex_count, 8);
        assert_eq!(first.primitive_count, 4);
        assert_eq!(first.vertices.len(), 8);
        assert_eq!(first.quad_count(), 2);
    }

    #[test]
    fn test_relaxed_policy_keeps_translucent_exact() {
        let (registry, _, translucent) = registry();
        let a = TexturedQuad::new(Quad::from_rect(0.0, 1.0, 1.0, 0.0), 0.3, translucent);
        let b = TexturedQuad::new(Quad::from_rect(0.0, 1.0, 1.0, 0.0), 0.2, translucent);
        let refs = [QuadRef::Textured(&a), QuadRef::Textured(&b)];
        let batches = build_batches(&refs, &registry).unwrap();
        assert!(!batches[0].can_combine_with(&batches[1], MergePolicy::RelaxOpaqueDepth));
    }
}
