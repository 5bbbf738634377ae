//! Command sequence construction from packed batches.
//!
//! Each batch is compared against the state last applied to the device and
//! only the fields that changed produce a transition. Transitions are always
//! emitted texture first, then vertex layout, then blend/depth mode, followed
//! by exactly one draw.

use quadbatch_core::profiling::profile_function;

use crate::device::CommandSink;
use crate::error::CompileResult;
use crate::packer::PackedBatch;
use crate::state::{BlendDepthMode, VertexLayout};
use crate::texture::TextureId;

/// Parameters of one indexed draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DrawCall {
    /// Vertex array the draw reads from.
    pub layout: VertexLayout,
    /// Added to every index of the draw.
    pub base_vertex: u32,
    pub base_index: u32,
    pub vertex_count: u32,
    /// Triangle count.
    pub primitive_count: u32,
}

impl DrawCall {
    pub fn index_count(&self) -> u32 {
        self.primitive_count * 3
    }

    /// Index range for `draw_indexed`.
    pub fn index_range(&self) -> std::ops::Range<u32> {
        self.base_index..self.base_index + self.index_count()
    }
}

/// One step of a frame's device work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Bind the frame's shared index buffer.
    BindIndexBuffer,
    SetTexture(TextureId),
    SetVertexLayout(VertexLayout),
    SetBlendDepthMode(BlendDepthMode),
    Draw(DrawCall),
}

impl Command {
    pub fn is_transition(&self) -> bool {
        !matches!(self, Command::Draw(_))
    }
}

/// State as last applied to the device. All `None` before the first batch,
/// which therefore always gets a full setup.
#[derive(Debug, Default)]
struct AppliedState {
    texture: Option<TextureId>,
    layout: Option<VertexLayout>,
    mode: Option<BlendDepthMode>,
}

/// Ordered commands for one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSequence {
    commands: Vec<Command>,
}

impl CommandSequence {
    /// Builds the minimal command list for `batches` in order.
    ///
    /// Flat-colored batches do not unbind the current texture, so a texture
    /// is rebound only when a textured batch needs a different one.
    pub fn build(batches: &[PackedBatch]) -> Self {
        profile_function!();

        if batches.is_empty() {
            return Self::default();
        }

        // Worst case: index bind plus three transitions and a draw per batch.
        let mut commands = Vec::with_capacity(1 + batches.len() * 4);
        commands.push(Command::BindIndexBuffer);

        let mut applied = AppliedState::default();
        for batch in batches {
            if let Some(texture) = batch.state.texture
                && applied.texture != Some(texture)
            {
                commands.push(Command::SetTexture(texture));
                applied.texture = Some(texture);
            }

            let layout = batch.layout();
            if applied.layout != Some(layout) {
                commands.push(Command::SetVertexLayout(layout));
                applied.layout = Some(layout);
            }

            let mode = batch.state.blend_depth_mode();
            if applied.mode != Some(mode) {
                commands.push(Command::SetBlendDepthMode(mode));
                applied.mode = Some(mode);
            }

            commands.push(Command::Draw(DrawCall {
                layout,
                base_vertex: batch.base_vertex,
                base_index: batch.base_index,
                vertex_count: batch.vertex_count,
                primitive_count: batch.primitive_count,
            }));
        }

        tracing::trace!(
            "Built {} commands for {} batches",
            commands.len(),
            batches.len()
        );
        Self { commands }
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Command> {
        self.commands.iter()
    }

    pub fn draws(&self) -> impl Iterator<Item = &DrawCall> {
        self.commands.iter().filter_map(|c| match c {
            Command::Draw(draw) => Some(draw),
            _ => None,
        })
    }

    pub fn texture_binds(&self) -> usize {
        self.count(|c| matches!(c, Command::SetTexture(_)))
    }

    pub fn layout_switches(&self) -> usize {
        self.count(|c| matches!(c, Command::SetVertexLayout(_)))
    }

    pub fn mode_switches(&self) -> usize {
        self.count(|c| matches!(c, Command::SetBlendDepthMode(_)))
    }

    pub fn draw_calls(&self) -> usize {
        self.count(|c| matches!(c, Command::Draw(_)))
    }

    fn count(&self, pred: impl Fn(&Command) -> bool) -> usize {
        self.commands.iter().filter(|c| pred(c)).count()
    }

    /// Drives `sink` with every command in order, stopping at the first error.
    pub fn replay<S: CommandSink + ?Sized>(&self, sink: &mut S) -> CompileResult<()> {
        profile_function!();

        for command in &self.commands {
            match *command {
                Command::BindIndexBuffer => sink.bind_index_buffer()?,
                Command::SetTexture(texture) => sink.set_texture(texture)?,
                Command::SetVertexLayout(layout) => sink.set_vertex_layout(layout)?,
                Command::SetBlendDepthMode(mode) => sink.set_blend_depth_mode(mode)?,
                Command::Draw(draw) => sink.draw(&draw)?,
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a CommandSequence {
    type Item = &'a Command;
    type IntoIter = std::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::RecordingSink;
    use crate::state::RenderState;

    fn packed(state: RenderState, base_vertex: u32, base_index: u32) -> PackedBatch {
        PackedBatch {
            state,
            z: 0.0,
            base_vertex,
            base_index,
            vertex_count: 4,
            primitive_count: 2,
        }
    }

    #[test]
    fn test_empty_sequence() {
        let seq = CommandSequence::build(&[]);
        assert!(seq.is_empty());
    }

    #[test]
    fn test_single_batch_full_setup() {
        let t = TextureId::from_raw(0);
        let seq = CommandSequence::build(&[packed(RenderState::textured(t, false), 0, 0)]);
        assert_eq!(
            seq.commands(),
            &[
                Command::BindIndexBuffer,
                Command::SetTexture(t),
                Command::SetVertexLayout(VertexLayout::Textured),
                Command::SetBlendDepthMode(BlendDepthMode::Opaque),
                Command::Draw(DrawCall {
                    layout: VertexLayout::Textured,
                    base_vertex: 0,
                    base_index: 0,
                    vertex_count: 4,
                    primitive_count: 2,
                }),
            ]
        );
    }

    #[test]
    fn test_only_changed_fields_emitted() {
        let t1 = TextureId::from_raw(1);
        let t2 = TextureId::from_raw(2);
        let batches = [
            packed(RenderState::textured(t1, false), 0, 0),
            packed(RenderState::textured(t2, false), 4, 6),
            packed(RenderState::textured(t2, true), 8, 12),
        ];
        let seq = CommandSequence::build(&batches);

        assert_eq!(seq.texture_binds(), 2);
        assert_eq!(seq.layout_switches(), 1);
        assert_eq!(seq.mode_switches(), 2);
        assert_eq!(seq.draw_calls(), 3);
        assert_eq!(seq.commands()[5], Command::SetTexture(t2));
        assert_eq!(
            seq.commands()[7],
            Command::SetBlendDepthMode(BlendDepthMode::Translucent)
        );
    }

    #[test]
    fn test_colored_batch_keeps_texture_bound() {
        let t = TextureId::from_raw(0);
        let batches = [
            packed(RenderState::textured(t, false), 0, 0),
            packed(RenderState::colored(false), 0, 6),
            packed(RenderState::textured(t, false), 4, 12),
        ];
        let seq = CommandSequence::build(&batches);
        assert_eq!(seq.texture_binds(), 1);
        assert_eq!(seq.layout_switches(), 3);
        assert_eq!(seq.mode_switches(), 1);
    }

    #[test]
    fn test_draw_index_range() {
        let draw = DrawCall {
            layout: VertexLayout::Colored,
            base_vertex: 4,
            base_index: 12,
            vertex_count: 8,
            primitive_count: 4,
        };
        assert_eq!(draw.index_range(), 12..24);
    }

    #[test]
    fn test_replay_matches_sequence() {
        let t = TextureId::from_raw(0);
        let batches = [
            packed(RenderState::textured(t, false), 0, 0),
            packed(RenderState::colored(true), 0, 6),
        ];
        let seq = CommandSequence::build(&batches);
        let mut sink = RecordingSink::new();
        seq.replay(&mut sink).unwrap();
        assert_eq!(sink.commands(), seq.commands());
    }

    /// Accepts everything except binding one texture.
    struct RejectingSink {
        rejected: TextureId,
        recorded: RecordingSink,
    }

    impl CommandSink for RejectingSink {
        fn bind_index_buffer(&mut self) -> CompileResult<()> {
            self.recorded.bind_index_buffer()
        }

        fn set_texture(&mut self, texture: TextureId) -> CompileResult<()> {
            if texture == self.rejected {
                return Err(crate::error::CompileError::UnknownTextureReference { texture });
            }
            self.recorded.set_texture(texture)
        }

        fn set_vertex_layout(&mut self, layout: VertexLayout) -> CompileResult<()> {
            self.recorded.set_vertex_layout(layout)
        }

        fn set_blend_depth_mode(&mut self, mode: BlendDepthMode) -> CompileResult<()> {
            self.recorded.set_blend_depth_mode(mode)
        }

        fn draw(&mut self, draw: &DrawCall) -> CompileResult<()> {
            self.recorded.draw(draw)
        }
    }

    #[test]
    fn test_replay_stops_at_sink_error() {
        let t1 = TextureId::from_raw(1);
        let t2 = TextureId::from_raw(2);
        let batches = [
            packed(RenderState::textured(t1, false), 0, 0),
            packed(RenderState::textured(t2, false), 4, 6),
        ];
        let seq = CommandSequence::build(&batches);

        let mut sink = RejectingSink {
            rejected: t2,
            recorded: RecordingSink::new(),
        };
        let err = seq.replay(&mut sink).unwrap_err();
        assert_eq!(
            err,
            crate::error::CompileError::UnknownTextureReference { texture: t2 }
        );
        // Nothing after the failed bind reached the device, including the draw.
        assert_eq!(sink.recorded.commands(), &seq.commands()[..5]);
    }
}
