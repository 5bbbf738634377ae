//! Compiles a field of sprites and colored panels, then replays the commands
//! into a sink that logs every device call.
//!
//! Run with `RUST_LOG=debug cargo run --example sprite_field`.

use quadbatch::prelude::*;
use quadbatch::{logging, profiling};

/// Logs device calls instead of issuing them.
#[derive(Default)]
struct LogSink {
    calls: usize,
}

impl CommandSink for LogSink {
    fn bind_index_buffer(&mut self) -> CompileResult<()> {
        self.calls += 1;
        tracing::info!("bind index buffer");
        Ok(())
    }

    fn set_texture(&mut self, texture: TextureId) -> CompileResult<()> {
        self.calls += 1;
        tracing::info!("set texture {}", texture);
        Ok(())
    }

    fn set_vertex_layout(&mut self, layout: VertexLayout) -> CompileResult<()> {
        self.calls += 1;
        tracing::info!("set vertex layout {:?}", layout);
        Ok(())
    }

    fn set_blend_depth_mode(&mut self, mode: BlendDepthMode) -> CompileResult<()> {
        self.calls += 1;
        tracing::info!("set blend/depth mode {:?}", mode);
        Ok(())
    }

    fn draw(&mut self, draw: &DrawCall) -> CompileResult<()> {
        self.calls += 1;
        tracing::info!(
            "draw {:?}: base vertex {}, indices {:?}, {} triangles",
            draw.layout,
            draw.base_vertex,
            draw.index_range(),
            draw.primitive_count
        );
        Ok(())
    }
}

fn checkerboard(size: u32, alpha: u8) -> Vec<u8> {
    (0..size * size)
        .flat_map(|i| {
            let on = ((i % size) + (i / size)) % 2 == 0;
            let v = if on { 255 } else { 40 };
            [v, v, v, alpha]
        })
        .collect()
}

fn main() -> Result<(), CompileError> {
    logging::init();
    profiling::set_enabled(true);

    let mut textures = TextureRegistry::new();
    let solid = textures.register_rgba8(8, 8, &checkerboard(8, 255))?;
    let glass = textures.register_rgba8(8, 8, &checkerboard(8, 160))?;

    let mut sprites = Vec::new();
    for i in 0..24 {
        let texture = if i % 3 == 0 { glass } else { solid };
        let x = (i % 6) as f32 * 40.0;
        let y = (i / 6) as f32 * 40.0;
        let z = (i % 2) as f32 * 0.5;
        let mut sprite = Sprite::new(texture, Quad::from_rect(x, y + 32.0, x + 32.0, y), z);
        sprite.rotate(i as f32 * 15.0);
        if i == 7 {
            sprite.set_visible(false);
        }
        sprites.push(sprite);
    }

    let panels: Vec<Primitive> = vec![
        FilledQuad::new(
            Quad::from_rect(0.0, 200.0, 240.0, 160.0),
            0.9,
            Color::rgb(20, 20, 60),
        )
        .into(),
        FilledQuad::new(
            Quad::from_rect(10.0, 190.0, 120.0, 170.0),
            0.1,
            Color::rgba(255, 255, 255, 96),
        )
        .into(),
    ];

    let mut renderables: Vec<&dyn Renderable> =
        sprites.iter().map(|s| s as &dyn Renderable).collect();
    renderables.push(&panels);

    let mut compiler = BatchCompiler::new(
        BatchCompilerDescriptor::new().with_merge_policy(MergePolicy::RelaxOpaqueDepth),
    );

    profiling::new_frame();
    let frame = compiler.compile(renderables.iter().copied(), &textures)?;

    let mut sink = LogSink::default();
    frame.commands().replay(&mut sink)?;

    let stats = frame.stats();
    tracing::info!(
        "{} quads ({} hidden) -> {} batches, {} draw calls, {} texture binds, {} device calls",
        stats.quad_count,
        stats.invisible_count,
        stats.batch_count,
        stats.draw_calls,
        stats.texture_binds,
        sink.calls
    );
    tracing::info!(
        "buffers: {} textured bytes, {} colored bytes, {} index bytes",
        frame.textured_vertex_bytes().len(),
        frame.colored_vertex_bytes().len(),
        frame.index_bytes().len()
    );

    Ok(())
}
