//! Device boundary: wgpu state translation, buffer upload and command replay.
//!
//! Device and pipeline creation belong to the caller. This module only maps
//! compiled output onto wgpu objects the caller already owns.

use quadbatch_core::alloc::HashMap;
use quadbatch_core::profiling::profile_function;

use crate::command::DrawCall;
#[cfg(any(test, feature = "mock"))]
use crate::command::Command;
use crate::compiler::CompiledFrame;
use crate::error::{BufferKind, CompileError, CompileResult};
use crate::packer::BufferCapacity;
use crate::state::{BlendDepthMode, Topology, VertexLayout};
use crate::texture::TextureId;

/// Receives a frame's commands in order.
///
/// An error stops replay; the remaining commands are not issued.
pub trait CommandSink {
    fn bind_index_buffer(&mut self) -> CompileResult<()>;
    fn set_texture(&mut self, texture: TextureId) -> CompileResult<()>;
    fn set_vertex_layout(&mut self, layout: VertexLayout) -> CompileResult<()>;
    fn set_blend_depth_mode(&mut self, mode: BlendDepthMode) -> CompileResult<()>;
    fn draw(&mut self, draw: &DrawCall) -> CompileResult<()>;
}

impl Topology {
    pub fn to_wgpu(self) -> wgpu::PrimitiveTopology {
        match self {
            Topology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
        }
    }
}

impl VertexLayout {
    /// Returns the wgpu vertex buffer layout for this format.
    pub fn buffer_layout(self) -> wgpu::VertexBufferLayout<'static> {
        const TEXTURED: &[wgpu::VertexAttribute] = &wgpu::vertex_attr_array![
            // location 0: position (vec3)
            0 => Float32x3,
            // location 1: tex_coords (vec2)
            1 => Float32x2,
        ];
        const COLORED: &[wgpu::VertexAttribute] = &wgpu::vertex_attr_array![
            // location 0: position (vec3)
            0 => Float32x3,
            // location 1: color (rgba8 unorm)
            1 => Unorm8x4,
        ];

        wgpu::VertexBufferLayout {
            array_stride: self.stride_bytes() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: match self {
                VertexLayout::Textured => TEXTURED,
                VertexLayout::Colored => COLORED,
            },
        }
    }
}

impl BlendDepthMode {
    pub fn blend_state(self) -> Option<wgpu::BlendState> {
        match self {
            BlendDepthMode::Opaque => None,
            BlendDepthMode::Translucent => Some(wgpu::BlendState::ALPHA_BLENDING),
        }
    }

    /// Smaller z is nearer the viewer.
    pub fn depth_stencil_state(self, format: wgpu::TextureFormat) -> wgpu::DepthStencilState {
        wgpu::DepthStencilState {
            format,
            depth_write_enabled: self.depth_write(),
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }
    }
}

/// Fixed-size device buffers a compiled frame is uploaded into.
pub struct FrameBuffers {
    pub textured_vertices: wgpu::Buffer,
    pub colored_vertices: wgpu::Buffer,
    pub indices: wgpu::Buffer,
    capacity: BufferCapacity,
}

impl FrameBuffers {
    pub fn new(device: &wgpu::Device, capacity: BufferCapacity) -> Self {
        let create = |label: &str, size: usize, usage: wgpu::BufferUsages| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                // Zero-sized buffers cannot be bound.
                size: (size as wgpu::BufferAddress).max(wgpu::COPY_BUFFER_ALIGNMENT),
                usage: usage | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };

        Self {
            textured_vertices: create(
                "Quadbatch Textured Vertices",
                capacity.textured_vertex_bytes,
                wgpu::BufferUsages::VERTEX,
            ),
            colored_vertices: create(
                "Quadbatch Colored Vertices",
                capacity.colored_vertex_bytes,
                wgpu::BufferUsages::VERTEX,
            ),
            indices: create(
                "Quadbatch Indices",
                capacity.index_bytes,
                wgpu::BufferUsages::INDEX,
            ),
            capacity,
        }
    }

    pub fn capacity(&self) -> BufferCapacity {
        self.capacity
    }

    pub fn vertex_buffer(&self, layout: VertexLayout) -> &wgpu::Buffer {
        match layout {
            VertexLayout::Textured => &self.textured_vertices,
            VertexLayout::Colored => &self.colored_vertices,
        }
    }

    /// Writes a frame's buffers. Nothing is written if any part does not fit.
    pub fn upload(&self, queue: &wgpu::Queue, frame: &CompiledFrame) -> CompileResult<()> {
        profile_function!();

        let parts = [
            (
                BufferKind::TexturedVertex,
                &self.textured_vertices,
                frame.textured_vertex_bytes(),
                self.capacity.textured_vertex_bytes,
            ),
            (
                BufferKind::ColoredVertex,
                &self.colored_vertices,
                frame.colored_vertex_bytes(),
                self.capacity.colored_vertex_bytes,
            ),
            (
                BufferKind::Index,
                &self.indices,
                frame.index_bytes(),
                self.capacity.index_bytes,
            ),
        ];

        for (buffer, _, bytes, capacity) in &parts {
            if bytes.len() > *capacity {
                tracing::warn!(
                    "Skipping upload: {} needs {} bytes, buffer holds {}",
                    buffer,
                    bytes.len(),
                    capacity
                );
                return Err(CompileError::BufferCapacityExceeded {
                    buffer: *buffer,
                    required: bytes.len(),
                    capacity: *capacity,
                });
            }
        }

        for (_, target, bytes, _) in parts {
            if !bytes.is_empty() {
                queue.write_buffer(target, 0, bytes);
            }
        }
        Ok(())
    }
}

/// Pipelines for every layout and blend/depth mode combination.
pub struct PipelineSet {
    pub textured_opaque: wgpu::RenderPipeline,
    pub textured_translucent: wgpu::RenderPipeline,
    pub colored_opaque: wgpu::RenderPipeline,
    pub colored_translucent: wgpu::RenderPipeline,
}

impl PipelineSet {
    pub fn get(&self, layout: VertexLayout, mode: BlendDepthMode) -> &wgpu::RenderPipeline {
        match (layout, mode) {
            (VertexLayout::Textured, BlendDepthMode::Opaque) => &self.textured_opaque,
            (VertexLayout::Textured, BlendDepthMode::Translucent) => &self.textured_translucent,
            (VertexLayout::Colored, BlendDepthMode::Opaque) => &self.colored_opaque,
            (VertexLayout::Colored, BlendDepthMode::Translucent) => &self.colored_translucent,
        }
    }
}

/// Bind group slot texture bind groups are set at.
pub const TEXTURE_BIND_GROUP: u32 = 0;

/// Looks up the bind group for `texture`, failing if none was created.
pub fn texture_bind_group(
    bind_groups: &HashMap<TextureId, wgpu::BindGroup>,
    texture: TextureId,
) -> CompileResult<&wgpu::BindGroup> {
    bind_groups.get(&texture).ok_or_else(|| {
        tracing::warn!("No bind group for texture {}", texture);
        CompileError::UnknownTextureReference { texture }
    })
}

/// Replays commands into a wgpu render pass.
///
/// Layout and mode changes are folded into one pipeline switch applied at
/// the next draw.
pub struct RenderPassSink<'a, 'p> {
    pass: &'a mut wgpu::RenderPass<'p>,
    buffers: &'a FrameBuffers,
    pipelines: &'a PipelineSet,
    textures: &'a HashMap<TextureId, wgpu::BindGroup>,
    layout: VertexLayout,
    mode: BlendDepthMode,
    pipeline_dirty: bool,
}

impl<'a, 'p> RenderPassSink<'a, 'p> {
    pub fn new(
        pass: &'a mut wgpu::RenderPass<'p>,
        buffers: &'a FrameBuffers,
        pipelines: &'a PipelineSet,
        textures: &'a HashMap<TextureId, wgpu::BindGroup>,
    ) -> Self {
        Self {
            pass,
            buffers,
            pipelines,
            textures,
            layout: VertexLayout::Textured,
            mode: BlendDepthMode::Opaque,
            pipeline_dirty: true,
        }
    }
}

impl CommandSink for RenderPassSink<'_, '_> {
    fn bind_index_buffer(&mut self) -> CompileResult<()> {
        self.pass
            .set_index_buffer(self.buffers.indices.slice(..), wgpu::IndexFormat::Uint16);
        Ok(())
    }

    fn set_texture(&mut self, texture: TextureId) -> CompileResult<()> {
        let bind_group = texture_bind_group(self.textures, texture)?;
        self.pass.set_bind_group(TEXTURE_BIND_GROUP, bind_group, &[]);
        Ok(())
    }

    fn set_vertex_layout(&mut self, layout: VertexLayout) -> CompileResult<()> {
        self.layout = layout;
        self.pipeline_dirty = true;
        self.pass
            .set_vertex_buffer(0, self.buffers.vertex_buffer(layout).slice(..));
        Ok(())
    }

    fn set_blend_depth_mode(&mut self, mode: BlendDepthMode) -> CompileResult<()> {
        self.mode = mode;
        self.pipeline_dirty = true;
        Ok(())
    }

    fn draw(&mut self, draw: &DrawCall) -> CompileResult<()> {
        if self.pipeline_dirty {
            self.pass.set_pipeline(self.pipelines.get(self.layout, self.mode));
            self.pipeline_dirty = false;
        }
        self.pass
            .draw_indexed(draw.index_range(), draw.base_vertex as i32, 0..1);
        Ok(())
    }
}

/// Sink that records commands for inspection in tests.
#[cfg(any(test, feature = "mock"))]
#[derive(Debug, Default)]
pub struct RecordingSink {
    commands: Vec<Command>,
}

#[cfg(any(test, feature = "mock"))]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

#[cfg(any(test, feature = "mock"))]
impl CommandSink for RecordingSink {
    fn bind_index_buffer(&mut self) -> CompileResult<()> {
        self.commands.push(Command::BindIndexBuffer);
        Ok(())
    }

    fn set_texture(&mut self, texture: TextureId) -> CompileResult<()> {
        self.commands.push(Command::SetTexture(texture));
        Ok(())
    }

    fn set_vertex_layout(&mut self, layout: VertexLayout) -> CompileResult<()> {
        self.commands.push(Command::SetVertexLayout(layout));
        Ok(())
    }

    fn set_blend_depth_mode(&mut self, mode: BlendDepthMode) -> CompileResult<()> {
        self.commands.push(Command::SetBlendDepthMode(mode));
        Ok(())
    }

    fn draw(&mut self, draw: &DrawCall) -> CompileResult<()> {
        self.commands.push(Command::Draw(*draw));
        Ok(())
    }
}
