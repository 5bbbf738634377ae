//! Per-frame orchestration of the batch pipeline.

use quadbatch_core::profiling::{profile_function, profile_scope};

use crate::batch::build_batches;
use crate::command::CommandSequence;
use crate::error::CompileResult;
use crate::packer::{BufferCapacity, PackedBatch, PackedFrame, pack_batches};
use crate::primitive::{Renderable, extract_primitives};
use crate::sequencer::{MergePolicy, merge_batches, sort_batches};
use crate::texture::TextureRegistry;

/// Descriptor for configuring a [`BatchCompiler`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BatchCompilerDescriptor {
    /// Byte capacity of the device buffers a frame must fit in.
    pub capacity: BufferCapacity,
    /// Merge rule for adjacent batches.
    pub merge_policy: MergePolicy,
}

impl BatchCompilerDescriptor {
    /// Create a new descriptor with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(mut self, capacity: BufferCapacity) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_merge_policy(mut self, merge_policy: MergePolicy) -> Self {
        self.merge_policy = merge_policy;
        self
    }
}

/// Compile statistics from one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Quads extracted, including invisible ones.
    pub quad_count: u32,
    /// Quads skipped as invisible.
    pub invisible_count: u32,
    /// Batches after merging.
    pub batch_count: u32,
    /// Number of batches folded into a predecessor.
    pub merged_count: u32,
    pub opaque_batches: u32,
    pub translucent_batches: u32,
    pub draw_calls: u32,
    pub texture_binds: u32,
    pub layout_switches: u32,
    pub mode_switches: u32,
    pub textured_vertices: u32,
    pub colored_vertices: u32,
    pub indices: u32,
}

/// Everything a frame needs on the device side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledFrame {
    packed: PackedFrame,
    commands: CommandSequence,
    stats: FrameStats,
}

impl CompiledFrame {
    pub fn textured_vertex_bytes(&self) -> &[u8] {
        self.packed.textured_vertex_bytes()
    }

    pub fn colored_vertex_bytes(&self) -> &[u8] {
        self.packed.colored_vertex_bytes()
    }

    pub fn index_bytes(&self) -> &[u8] {
        self.packed.index_bytes()
    }

    pub fn packed(&self) -> &PackedFrame {
        &self.packed
    }

    pub fn batches(&self) -> &[PackedBatch] {
        self.packed.batches()
    }

    pub fn commands(&self) -> &CommandSequence {
        &self.commands
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// True when there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Compiles renderables into a [`CompiledFrame`].
///
/// Holds configuration and the previous frame's stats; every buffer it
/// produces is owned by the returned frame.
///
/// ```
/// use quadbatch_render::{
///     BatchCompiler, BatchCompilerDescriptor, Quad, Sprite, TextureMetadata, TextureRegistry,
/// };
///
/// let mut textures = TextureRegistry::new();
/// let tex = textures.register(TextureMetadata::new(16, 16, false));
/// let sprites = vec![Sprite::new(tex, Quad::from_rect(0.0, 16.0, 16.0, 0.0), 0.5)];
///
/// let mut compiler = BatchCompiler::new(BatchCompilerDescriptor::default());
/// let frame = compiler.compile(&sprites, &textures).unwrap();
/// assert_eq!(frame.commands().draw_calls(), 1);
/// ```
#[derive(Debug, Default)]
pub struct BatchCompiler {
    descriptor: BatchCompilerDescriptor,
    stats: FrameStats,
}

impl BatchCompiler {
    pub fn new(descriptor: BatchCompilerDescriptor) -> Self {
        tracing::debug!(
            "Creating batch compiler (capacity: {:?}, merge policy: {:?})",
            descriptor.capacity,
            descriptor.merge_policy
        );
        Self {
            descriptor,
            stats: FrameStats::default(),
        }
    }

    pub fn descriptor(&self) -> &BatchCompilerDescriptor {
        &self.descriptor
    }

    pub fn set_merge_policy(&mut self, merge_policy: MergePolicy) {
        self.descriptor.merge_policy = merge_policy;
    }

    pub fn set_capacity(&mut self, capacity: BufferCapacity) {
        self.descriptor.capacity = capacity;
    }

    /// Stats of the last successful compile.
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Runs extract, batch, sort, merge, pack and command emission.
    ///
    /// Any error aborts the whole frame. `textures` is only read.
    pub fn compile<'a, I, R>(
        &mut self,
        renderables: I,
        textures: &TextureRegistry,
    ) -> CompileResult<CompiledFrame>
    where
        I: IntoIterator<Item = &'a R>,
        R: Renderable + ?Sized + 'a,
    {
        profile_function!();

        let quads = extract_primitives(renderables)?;
        let mut batches = build_batches(&quads, textures)?;
        let visible = batches.len();

        {
            profile_scope!("sequence");
            sort_batches(&mut batches);
        }
        let merged = merge_batches(&mut batches, self.descriptor.merge_policy)?;

        let opaque_batches = batches.iter().filter(|b| !b.state.translucent).count();
        let translucent_batches = batches.len() - opaque_batches;

        let packed = pack_batches(batches, &self.descriptor.capacity)?;
        let commands = CommandSequence::build(packed.batches());

        let stats = FrameStats {
            quad_count: quads.len() as u32,
            invisible_count: (quads.len() - visible) as u32,
            batch_count: packed.batches().len() as u32,
            merged_count: merged as u32,
            opaque_batches: opaque_batches as u32,
            translucent_batches: translucent_batches as u32,
            draw_calls: commands.draw_calls() as u32,
            texture_binds: commands.texture_binds() as u32,
            layout_switches: commands.layout_switches() as u32,
            mode_switches: commands.mode_switches() as u32,
            textured_vertices: packed.textured_vertices().len() as u32,
            colored_vertices: packed.colored_vertices().len() as u32,
            indices: packed.indices().len() as u32,
        };

        tracing::debug!(
            "Compiled frame: {} quads -> {} batches, {} draw calls, {} texture binds",
            stats.quad_count,
            stats.batch_count,
            stats.draw_calls,
            stats.texture_binds
        );

        self.stats = stats;
        Ok(CompiledFrame {
            packed,
            commands,
            stats,
        })
    }
}
