//! quadbatch - sprite batching for wgpu
//!
//! Turns a frame's worth of textured and flat-colored quads into:
//!
//! - **Ordered batches**: opaque near-to-far, then translucent far-to-near
//! - **Packed buffers**: textured and colored vertex arrays plus 16-bit indices
//! - **Commands**: the fewest texture, layout and blend/depth transitions
//!
//! # Quick Start
//!
//! ```
//! use quadbatch::prelude::*;
//!
//! let mut textures = TextureRegistry::new();
//! let ship = textures.register(TextureMetadata::new(32, 32, false));
//!
//! let mut sprite = Sprite::new(ship, Quad::from_rect(0.0, 32.0, 32.0, 0.0), 0.5);
//! sprite.rotate(30.0);
//!
//! let mut compiler = BatchCompiler::new(BatchCompilerDescriptor::default());
//! let frame = compiler.compile([&sprite], &textures).unwrap();
//! assert_eq!(frame.commands().draw_calls(), 1);
//! ```

pub use quadbatch_core as core;
pub use quadbatch_core::{logging, math, profiling};
pub use quadbatch_render as render;

pub use quadbatch_render::{
    BatchCompiler, BatchCompilerDescriptor, CompileError, CompileResult, CompiledFrame,
    FrameStats,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use quadbatch_core::math::{Vec2, vec2};

    pub use quadbatch_render::{
        BatchCompiler, BatchCompilerDescriptor, BlendDepthMode, BufferCapacity, Color, Command,
        CommandSequence, CommandSink, CompileError, CompileResult, CompiledFrame, DrawCall,
        FilledQuad, FrameStats, MergePolicy, Primitive, Quad, Renderable, Sprite, TextureId,
        TextureMetadata, TextureRegistry, TexturedQuad, VertexLayout,
    };

    pub use quadbatch_render::device::FrameBuffers;
}
