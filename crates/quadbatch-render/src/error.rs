//! Errors raised while compiling a frame or registering textures.
//!
//! Every compile error is fatal for the frame it occurred in: no partial
//! buffers or commands are returned alongside it.

use std::collections::TryReserveError;

use crate::primitive::PrimitiveKind;
use crate::texture::TextureId;

/// Which packed buffer a capacity check applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// Textured vertices (`x, y, z, u, v`).
    TexturedVertex,
    /// Flat-colored vertices (`x, y, z, color`).
    ColoredVertex,
    /// 16-bit indices.
    Index,
}

impl std::fmt::Display for BufferKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BufferKind::TexturedVertex => write!(f, "textured vertex buffer"),
            BufferKind::ColoredVertex => write!(f, "colored vertex buffer"),
            BufferKind::Index => write!(f, "index buffer"),
        }
    }
}

/// Batch compile error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// A primitive kind the compiler cannot rasterize.
    UnsupportedPrimitiveType { kind: PrimitiveKind },
    /// A primitive referenced a texture with no registered metadata.
    UnknownTextureReference { texture: TextureId },
    /// Packed data would not fit in a fixed-capacity buffer.
    BufferCapacityExceeded {
        buffer: BufferKind,
        /// Bytes (or, for the per-batch index range, vertices) required.
        required: usize,
        capacity: usize,
    },
    /// Scratch storage could not be grown.
    OutOfMemory { requested: usize },
    /// Pixel data did not match the declared texture dimensions.
    InvalidTextureData { expected: usize, actual: usize },
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedPrimitiveType { kind } => {
                write!(f, "Unsupported primitive type: {:?}", kind)
            }
            Self::UnknownTextureReference { texture } => {
                write!(f, "Texture {} has no registered metadata", texture)
            }
            Self::BufferCapacityExceeded {
                buffer,
                required,
                capacity,
            } => write!(
                f,
                "Capacity of {} exceeded: {} required, {} available",
                buffer, required, capacity
            ),
            Self::OutOfMemory { requested } => {
                write!(f, "Out of memory reserving {} elements", requested)
            }
            Self::InvalidTextureData { expected, actual } => write!(
                f,
                "Invalid texture data: expected {} bytes, got {}",
                expected, actual
            ),
        }
    }
}

impl std::error::Error for CompileError {}

impl CompileError {
    pub(crate) fn out_of_memory(requested: usize) -> impl FnOnce(TryReserveError) -> Self {
        move |_| Self::OutOfMemory { requested }
    }
}

/// Result alias for compile operations.
pub type CompileResult<T> = Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CompileError::UnsupportedPrimitiveType {
            kind: PrimitiveKind::LineSegment,
        };
        assert!(format!("{}", err).contains("LineSegment"));

        let err = CompileError::BufferCapacityExceeded {
            buffer: BufferKind::Index,
            required: 24,
            capacity: 12,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("index buffer"));
        assert!(msg.contains("24"));
        assert!(msg.contains("12"));
    }

    #[test]
    fn test_out_of_memory_mapping() {
        let mut v: Vec<u8> = Vec::new();
        let err = v
            .try_reserve(usize::MAX)
            .map_err(CompileError::out_of_memory(usize::MAX))
            .unwrap_err();
        assert_eq!(err, CompileError::OutOfMemory { requested: usize::MAX });
    }
}
