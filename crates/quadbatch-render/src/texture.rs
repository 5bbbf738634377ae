//! Texture handles and the per-texture metadata the compiler reads.
//!
//! Texture pixels never reach the compiler. What it needs is decided once at
//! registration: whether the texture has any partially transparent pixel.

use quadbatch_core::alloc::{HashMap, map_with_capacity};

use crate::error::{CompileError, CompileResult};

/// Stable ordinal identifying a texture.
///
/// Ids are totally ordered; that order is the tie-break used when sorting
/// batches at equal depth, so same-texture draws end up adjacent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextureId(u32);

impl TextureId {
    /// Wraps an ordinal issued elsewhere (e.g. by an asset system).
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for TextureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// Issues increasing [`TextureId`]s.
#[derive(Debug, Default)]
pub struct TextureIdAllocator {
    next: u32,
}

impl TextureIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next unused id.
    pub fn allocate(&mut self) -> TextureId {
        let id = TextureId(self.next);
        self.next += 1;
        id
    }

    /// Id that the next call to [`allocate`](Self::allocate) will return.
    pub fn peek(&self) -> TextureId {
        TextureId(self.next)
    }

    /// Restart issuance from the first id.
    ///
    /// Only valid once every previously issued id has been dropped.
    pub fn reset(&mut self) {
        self.next = 0;
    }
}

/// Per-texture data computed once at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureMetadata {
    /// Any pixel has alpha strictly between 0 and 255.
    pub translucent: bool,
    pub width: u32,
    pub height: u32,
}

impl TextureMetadata {
    pub fn new(width: u32, height: u32, translucent: bool) -> Self {
        Self {
            translucent,
            width,
            height,
        }
    }

    /// Scans tightly packed RGBA8 pixels for partial transparency.
    ///
    /// Fully transparent pixels (alpha 0) are discarded by alpha testing and do
    /// not force blending.
    pub fn from_rgba8(width: u32, height: u32, pixels: &[u8]) -> CompileResult<Self> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(CompileError::InvalidTextureData {
                expected,
                actual: pixels.len(),
            });
        }

        let translucent = pixels
            .chunks_exact(4)
            .any(|px| px[3] != 0 && px[3] != u8::MAX);

        Ok(Self::new(width, height, translucent))
    }
}

/// Owns texture ids and their metadata.
///
/// Mutated only between frames; a compile borrows it immutably.
#[derive(Debug, Default)]
pub struct TextureRegistry {
    allocator: TextureIdAllocator,
    entries: HashMap<TextureId, TextureMetadata>,
}

impl TextureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            allocator: TextureIdAllocator::new(),
            entries: map_with_capacity(capacity),
        }
    }

    /// Registers metadata under a freshly allocated id.
    pub fn register(&mut self, metadata: TextureMetadata) -> TextureId {
        let id = self.allocator.allocate();
        self.entries.insert(id, metadata);
        tracing::trace!(
            "Registered texture {} ({}x{}, translucent: {})",
            id,
            metadata.width,
            metadata.height,
            metadata.translucent
        );
        id
    }

    /// Computes metadata from RGBA8 pixels and registers it.
    pub fn register_rgba8(
        &mut self,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> CompileResult<TextureId> {
        let metadata = TextureMetadata::from_rgba8(width, height, pixels)?;
        Ok(self.register(metadata))
    }

    /// Records metadata for an id issued outside this registry.
    ///
    /// Returns the previous metadata if the id was already present.
    pub fn insert(&mut self, id: TextureId, metadata: TextureMetadata) -> Option<TextureMetadata> {
        self.entries.insert(id, metadata)
    }

    pub fn remove(&mut self, id: TextureId) -> Option<TextureMetadata> {
        self.entries.remove(&id)
    }

    pub fn get(&self, id: TextureId) -> Option<&TextureMetadata> {
        self.entries.get(&id)
    }

    /// Looks up metadata, failing on an unregistered id.
    pub fn metadata(&self, id: TextureId) -> CompileResult<&TextureMetadata> {
        self.entries
            .get(&id)
            .ok_or(CompileError::UnknownTextureReference { texture: id })
    }

    pub fn is_translucent(&self, id: TextureId) -> CompileResult<bool> {
        self.metadata(id).map(|m| m.translucent)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry and restarts id issuance.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.allocator.reset();
    }
}
