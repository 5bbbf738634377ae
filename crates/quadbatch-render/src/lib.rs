//! quadbatch render
//!
//! Compiles an unordered set of 2D quads into an ordered, merged list of draw
//! batches, packed vertex/index buffers and a minimal command sequence.
//!
//! ```text
//! renderables -> primitives -> batches -> sorted/merged -> packed buffers + commands
//! ```
//!
//! The compiler is pure CPU work. The [`device`] module holds the thin wgpu
//! boundary used to upload a [`CompiledFrame`] and replay its commands.

pub mod batch;
pub mod command;
pub mod compiler;
pub mod device;
pub mod error;
pub mod packer;
pub mod primitive;
pub mod sequencer;
pub mod sprite;
pub mod state;
pub mod texture;

pub use batch::{ColoredVertex, DrawBatch, ScratchVertices, TexturedVertex, build_batches};
pub use command::{Command, CommandSequence, DrawCall};
pub use compiler::{BatchCompiler, BatchCompilerDescriptor, CompiledFrame, FrameStats};
pub use device::{CommandSink, FrameBuffers, PipelineSet, RenderPassSink};
pub use error::{BufferKind, CompileError, CompileResult};
pub use packer::{BufferCapacity, PackedBatch, PackedFrame, pack_batches};
pub use primitive::{
    Color, FilledCircle, FilledQuad, LineSegment, Primitive, PrimitiveKind, Quad, QuadRef,
    Renderable, TexturedQuad, extract_primitives,
};
pub use sequencer::{MergePolicy, compare_batches, merge_batches, sort_batches};
pub use sprite::Sprite;
pub use state::{BlendDepthMode, RenderState, Topology, VertexLayout};
pub use texture::{TextureId, TextureIdAllocator, TextureMetadata, TextureRegistry};

#[cfg(any(test, feature = "mock"))]
pub use device::RecordingSink;
