//! Batch ordering and adjacent-batch merging.

use std::cmp::Ordering;

use quadbatch_core::profiling::profile_function;

use crate::batch::DrawBatch;
use crate::error::{CompileError, CompileResult};

/// Rule for merging adjacent batches with equal render state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MergePolicy {
    /// Merge only batches at identical depth.
    #[default]
    ExactDepth,
    /// Opaque batches merge at any depth, since every vertex carries its own
    /// z and the depth test resolves overlap. Translucent batches still
    /// require identical depth.
    RelaxOpaqueDepth,
}

/// Draw order of two batches.
///
/// Opaque sorts before translucent. Opaque batches go near to far (ascending
/// z) for early depth rejection; translucent batches go far to near
/// (descending z) so blending composites correctly. Equal depths fall back to
/// texture order, with colored batches first.
pub fn compare_batches(a: &DrawBatch, b: &DrawBatch) -> Ordering {
    a.state
        .translucent
        .cmp(&b.state.translucent)
        .then_with(|| {
            if a.state.translucent {
                b.z.total_cmp(&a.z)
            } else {
                a.z.total_cmp(&b.z)
            }
        })
        .then_with(|| a.state.texture.cmp(&b.state.texture))
}

/// Stable sort into draw order.
pub fn sort_batches(batches: &mut [DrawBatch]) {
    profile_function!();
    batches.sort_by(compare_batches);
}

/// Folds each batch into its predecessor when combinable, in one left to
/// right pass. Returns the number of merges.
///
/// A merged batch stays current, so a run of combinable batches collapses
/// into its first element. Running this again on its own output merges
/// nothing. On error `batches` is left as it was.
pub fn merge_batches(batches: &mut Vec<DrawBatch>, policy: MergePolicy) -> CompileResult<usize> {
    profile_function!();
    merge_with(batches, policy, DrawBatch::reserve_vertices)
}

/// Storage for every run is reserved through `reserve` before any batch
/// moves, so only the reservation step can fail.
fn merge_with(
    batches: &mut Vec<DrawBatch>,
    policy: MergePolicy,
    mut reserve: impl FnMut(&mut DrawBatch, usize) -> CompileResult<()>,
) -> CompileResult<usize> {
    let before = batches.len();

    // A merged batch keeps its first member's state and depth, so each batch
    // is tested against the head of its run.
    let mut heads: Vec<usize> = Vec::new();
    heads
        .try_reserve_exact(before)
        .map_err(CompileError::out_of_memory(before))?;
    for (i, batch) in batches.iter().enumerate() {
        match heads.last() {
            Some(&head) if batches[head].can_combine_with(batch, policy) => {}
            _ => heads.push(i),
        }
    }

    let merges = before - heads.len();
    if merges == 0 {
        return Ok(0);
    }

    for (run, &head) in heads.iter().enumerate() {
        let end = heads.get(run + 1).copied().unwrap_or(before);
        let additional: usize = batches[head + 1..end]
            .iter()
            .map(|b| b.vertices.len())
            .sum();
        if additional > 0 {
            reserve(&mut batches[head], additional)?;
        }
    }

    let mut merged = Vec::new();
    merged
        .try_reserve_exact(heads.len())
        .map_err(CompileError::out_of_memory(heads.len()))?;

    let mut next_head = heads.iter().peekable();
    for (i, batch) in std::mem::take(batches).into_iter().enumerate() {
        if next_head.next_if(|&&head| head == i).is_some() {
            merged.push(batch);
        } else if let Some(current) = merged.last_mut() {
            current.append(batch);
        }
    }
    *batches = merged;

    tracing::trace!("Merged {} batches into {}", before, batches.len());
    Ok(merges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::build_batches;
    use crate::primitive::{Color, FilledQuad, Quad, QuadRef, TexturedQuad};
    use crate::texture::{TextureId, TextureMetadata, TextureRegistry};

    struct Fixture {
        registry: TextureRegistry,
        opaque: Vec<TextureId>,
        translucent: Vec<TextureId>,
    }

    fn fixture() -> Fixture {
        let mut registry = TextureRegistry::new();
        let opaque = (0..2)
            .map(|_| registry.register(TextureMetadata::new(4, 4, false)))
            .collect();
        let translucent = (0..2)
            .map(|_| registry.register(TextureMetadata::new(4, 4, true)))
            .collect();
        Fixture {
            registry,
            opaque,
            translucent,
        }
    }

    fn quad(texture: TextureId, z: f32) -> TexturedQuad {
        TexturedQuad::new(Quad::from_rect(0.0, 1.0, 1.0, 0.0), z, texture)
    }

    fn batches(fx: &Fixture, quads: &[TexturedQuad]) -> Vec<DrawBatch> {
        let refs: Vec<QuadRef<'_>> = quads.iter().map(QuadRef::Textured).collect();
        build_batches(&refs, &fx.registry).unwrap()
    }

    #[test]
    fn test_sort_order() {
        let fx = fixture();
        let quads = [
            quad(fx.translucent[0], 0.2),
            quad(fx.opaque[0], 0.5),
            quad(fx.translucent[1], 0.9),
            quad(fx.opaque[1], 0.1),
        ];
        let mut list = batches(&fx, &quads);
        sort_batches(&mut list);

        let order: Vec<(bool, f32)> = list.iter().map(|b| (b.state.translucent, b.z)).collect();
        assert_eq!(order, vec![(false, 0.1), (false, 0.5), (true, 0.9), (true, 0.2)]);
    }

    #[test]
    fn test_texture_tie_break() {
        let fx = fixture();
        let quads = [
            quad(fx.opaque[1], 0.3),
            quad(fx.opaque[0], 0.3),
            quad(fx.opaque[1], 0.3),
        ];
        let mut list = batches(&fx, &quads);
        sort_batches(&mut list);
        let textures: Vec<_> = list.iter().map(|b| b.state.texture).collect();
        assert_eq!(
            textures,
            vec![Some(fx.opaque[0]), Some(fx.opaque[1]), Some(fx.opaque[1])]
        );
    }

    #[test]
    fn test_colored_sorts_before_textured_at_equal_depth() {
        let fx = fixture();
        let textured = quad(fx.opaque[0], 0.5);
        let filled = FilledQuad::new(Quad::from_rect(0.0, 1.0, 1.0, 0.0), 0.5, Color::BLUE);
        let mut list = build_batches(
            &[QuadRef::Textured(&textured), QuadRef::Filled(&filled)],
            &fx.registry,
        )
        .unwrap();
        sort_batches(&mut list);
        assert_eq!(list[0].state.texture, None);
    }

    #[test]
    fn test_nan_depth_is_ordered() {
        let fx = fixture();
        let quads = [quad(fx.opaque[0], f32::NAN), quad(fx.opaque[0], 0.5)];
        let mut list = batches(&fx, &quads);
        sort_batches(&mut list);
        assert_eq!(list[0].z, 0.5);
        assert!(list[1].z.is_nan());
    }

    #[test]
    fn test_merge_runs() {
        let fx = fixture();
        let quads = [
            quad(fx.opaque[0], 0.3),
            quad(fx.opaque[0], 0.3),
            quad(fx.opaque[0], 0.3),
            quad(fx.opaque[0], 0.4),
            quad(fx.translucent[0], 0.4),
            quad(fx.translucent[0], 0.4),
        ];
        let mut list = batches(&fx, &quads);
        sort_batches(&mut list);

        let merges = merge_batches(&mut list, MergePolicy::ExactDepth).unwrap();
        assert_eq!(merges, 3);
        assert_eq!(list.len(), 3);
        assert_eq!(list[0].vertex_count, 12);
        assert_eq!(list[0].primitive_count, 6);
        assert_eq!(list[2].vertex_count, 8);
    }

    #[test]
    fn test_merge_idempotent() {
        let fx = fixture();
        let quads = [
            quad(fx.opaque[0], 0.3),
            quad(fx.opaque[1], 0.3),
            quad(fx.opaque[0], 0.3),
            quad(fx.translucent[1], 0.7),
            quad(fx.translucent[1], 0.7),
        ];
        let mut list = batches(&fx, &quads);
        sort_batches(&mut list);
        merge_batches(&mut list, MergePolicy::ExactDepth).unwrap();
        let once = list.clone();

        assert_eq!(merge_batches(&mut list, MergePolicy::ExactDepth).unwrap(), 0);
        assert_eq!(list, once);
    }

    #[test]
    fn test_nan_depths_merge() {
        let fx = fixture();
        let quads = [quad(fx.opaque[0], f32::NAN), quad(fx.opaque[0], f32::NAN)];
        let mut list = batches(&fx, &quads);
        sort_batches(&mut list);
        assert_eq!(merge_batches(&mut list, MergePolicy::ExactDepth).unwrap(), 1);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_signed_zero_depths_stay_apart() {
        let fx = fixture();
        let quads = [quad(fx.opaque[0], 0.0), quad(fx.opaque[0], -0.0)];
        let mut list = batches(&fx, &quads);
        sort_batches(&mut list);
        assert_eq!(merge_batches(&mut list, MergePolicy::ExactDepth).unwrap(), 0);
        assert!(list[0].z.is_sign_negative());
    }

    #[test]
    fn test_failed_merge_leaves_batches_untouched() {
        let fx = fixture();
        let quads = [
            quad(fx.opaque[0], 0.3),
            quad(fx.opaque[0], 0.3),
            quad(fx.opaque[1], 0.5),
            quad(fx.opaque[1], 0.5),
            quad(fx.opaque[1], 0.5),
        ];
        let mut list = batches(&fx, &quads);
        sort_batches(&mut list);
        let original = list.clone();

        let mut calls = 0;
        let err = merge_with(&mut list, MergePolicy::ExactDepth, |batch, additional| {
            calls += 1;
            if calls == 2 {
                return Err(CompileError::OutOfMemory {
                    requested: additional,
                });
            }
            batch.reserve_vertices(additional)
        })
        .unwrap_err();

        assert_eq!(err, CompileError::OutOfMemory { requested: 8 });
        assert_eq!(list, original);
    }

    #[test]
    fn test_relaxed_merge() {
        let fx = fixture();
        let quads = [
            quad(fx.opaque[0], 0.1),
            quad(fx.opaque[0], 0.2),
            quad(fx.translucent[0], 0.8),
            quad(fx.translucent[0], 0.6),
        ];
        let mut list = batches(&fx, &quads);
        sort_batches(&mut list);

        let merges = merge_batches(&mut list, MergePolicy::RelaxOpaqueDepth).unwrap();
        assert_eq!(merges, 1);
        assert_eq!(list.len(), 3);
        assert_eq!(list[0].vertex_count, 8);
        assert_eq!(list[0].z, 0.1);
        assert_eq!(merge_batches(&mut list, MergePolicy::RelaxOpaqueDepth).unwrap(), 0);
    }
}
