//! Packs ordered batches into linear vertex and index arrays.
//!
//! Indices are relative to each batch's first vertex rather than offset by a
//! running vertex counter across the frame. Every draw carries its
//! `base_vertex`, which the device adds back, so the rendered result is the
//! same. Textured and colored vertices live in separate arrays, so a single
//! running counter would address the wrong buffer for one of them, and
//! restarting per batch keeps each batch within 16-bit index range.

use quadbatch_core::profiling::{profile_function, profile_scope};

use crate::batch::{ColoredVertex, DrawBatch, QUAD_VERTICES, ScratchVertices, TexturedVertex};
use crate::error::{BufferKind, CompileError, CompileResult};
use crate::state::{RenderState, VertexLayout};

/// Indices per quad.
pub const QUAD_INDICES: u32 = 6;

/// Two triangles over a quad's corners in winding order.
const QUAD_INDEX_TEMPLATE: [u16; 6] = [0, 1, 2, 2, 3, 0];

/// Largest vertex count one batch may address with 16-bit relative indices.
pub const MAX_BATCH_VERTICES: usize = u16::MAX as usize + 1;

/// Quads the default capacity holds in every buffer.
pub const DEFAULT_QUAD_CAPACITY: usize = 1000;

/// Fixed byte capacity of each device buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferCapacity {
    pub textured_vertex_bytes: usize,
    pub colored_vertex_bytes: usize,
    pub index_bytes: usize,
}

impl BufferCapacity {
    /// Capacity for `quads` quads of either layout.
    pub const fn for_quads(quads: usize) -> Self {
        let vertices = quads * QUAD_VERTICES as usize;
        Self {
            textured_vertex_bytes: vertices * VertexLayout::Textured.stride_bytes(),
            colored_vertex_bytes: vertices * VertexLayout::Colored.stride_bytes(),
            index_bytes: quads * QUAD_INDICES as usize * std::mem::size_of::<u16>(),
        }
    }

    fn check(&self, buffer: BufferKind, required: usize) -> CompileResult<()> {
        let capacity = match buffer {
            BufferKind::TexturedVertex => self.textured_vertex_bytes,
            BufferKind::ColoredVertex => self.colored_vertex_bytes,
            BufferKind::Index => self.index_bytes,
        };
        if required > capacity {
            tracing::warn!(
                "Frame needs {} bytes of the {} but only {} are available",
                required,
                buffer,
                capacity
            );
            return Err(CompileError::BufferCapacityExceeded {
                buffer,
                required,
                capacity,
            });
        }
        Ok(())
    }
}

impl Default for BufferCapacity {
    fn default() -> Self {
        Self::for_quads(DEFAULT_QUAD_CAPACITY)
    }
}

/// A batch's location in the packed arrays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackedBatch {
    pub state: RenderState,
    pub z: f32,
    /// First vertex in the layout's vertex array.
    pub base_vertex: u32,
    /// First index in the index array.
    pub base_index: u32,
    pub vertex_count: u32,
    pub primitive_count: u32,
}

impl PackedBatch {
    pub fn layout(&self) -> VertexLayout {
        self.state.vertex_layout()
    }

    pub fn index_count(&self) -> u32 {
        self.primitive_count * 3
    }
}

/// Immutable packed output of one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackedFrame {
    textured_vertices: Vec<TexturedVertex>,
    colored_vertices: Vec<ColoredVertex>,
    indices: Vec<u16>,
    batches: Vec<PackedBatch>,
}

impl PackedFrame {
    pub fn textured_vertices(&self) -> &[TexturedVertex] {
        &self.textured_vertices
    }

    pub fn colored_vertices(&self) -> &[ColoredVertex] {
        &self.colored_vertices
    }

    /// Textured vertices as `x, y, z, u, v` floats.
    pub fn textured_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.textured_vertices)
    }

    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    pub fn batches(&self) -> &[PackedBatch] {
        &self.batches
    }

    pub fn textured_vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.textured_vertices)
    }

    pub fn colored_vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.colored_vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn vertex_count(&self) -> usize {
        self.textured_vertices.len() + self.colored_vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

/// Consumes ordered batches into a [`PackedFrame`].
///
/// Capacity is checked for the whole frame before anything is written, so a
/// failure leaves no partial output.
pub fn pack_batches(
    batches: Vec<DrawBatch>,
    capacity: &BufferCapacity,
) -> CompileResult<PackedFrame> {
    profile_function!();

    let mut textured_count = 0usize;
    let mut colored_count = 0usize;
    let mut index_count = 0usize;
    for batch in &batches {
        let vertices = batch.vertices.len();
        if vertices > MAX_BATCH_VERTICES {
            tracing::warn!("Batch of {} vertices exceeds 16-bit indexing", vertices);
            return Err(CompileError::BufferCapacityExceeded {
                buffer: BufferKind::Index,
                required: vertices,
                capacity: MAX_BATCH_VERTICES,
            });
        }
        match batch.layout() {
            VertexLayout::Textured => textured_count += vertices,
            VertexLayout::Colored => colored_count += vertices,
        }
        index_count += batch.quad_count() as usize * QUAD_INDICES as usize;
    }

    capacity.check(
        BufferKind::TexturedVertex,
        textured_count * VertexLayout::Textured.stride_bytes(),
    )?;
    capacity.check(
        BufferKind::ColoredVertex,
        colored_count * VertexLayout::Colored.stride_bytes(),
    )?;
    capacity.check(BufferKind::Index, index_count * std::mem::size_of::<u16>())?;

    let mut frame = PackedFrame::default();
    frame
        .textured_vertices
        .try_reserve_exact(textured_count)
        .map_err(CompileError::out_of_memory(textured_count))?;
    frame
        .colored_vertices
        .try_reserve_exact(colored_count)
        .map_err(CompileError::out_of_memory(colored_count))?;
    frame
        .indices
        .try_reserve_exact(index_count)
        .map_err(CompileError::out_of_memory(index_count))?;
    frame
        .batches
        .try_reserve_exact(batches.len())
        .map_err(CompileError::out_of_memory(batches.len()))?;

    {
        profile_scope!("append");
        for batch in batches {
            let base_index = frame.indices.len() as u32;
            let base_vertex = match batch.vertices {
                ScratchVertices::Textured(mut vertices) => {
                    let base = frame.textured_vertices.len();
                    frame.textured_vertices.append(&mut vertices);
                    base
                }
                ScratchVertices::Colored(mut vertices) => {
                    let base = frame.colored_vertices.len();
                    frame.colored_vertices.append(&mut vertices);
                    base
                }
            } as u32;

            for quad in 0..batch.vertex_count / QUAD_VERTICES {
                let offset = (quad * QUAD_VERTICES) as u16;
                frame
                    .indices
                    .extend(QUAD_INDEX_TEMPLATE.iter().map(|i| i + offset));
            }

            frame.batches.push(PackedBatch {
                state: batch.state,
                z: batch.z,
                base_vertex,
                base_index,
                vertex_count: batch.vertex_count,
                primitive_count: batch.primitive_count,
            });
        }
    }

    tracing::trace!(
        "Packed {} batches: {} textured vertices, {} colored vertices, {} indices",
        frame.batches.len(),
        frame.textured_vertices.len(),
        frame.colored_vertices.len(),
        frame.indices.len()
    );
    Ok(frame)
}
