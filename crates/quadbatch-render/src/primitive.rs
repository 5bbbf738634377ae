//! Drawable primitives and their extraction from renderables.

use quadbatch_core::math::{Vec2, rotate_about, scale_about};
use quadbatch_core::profiling::profile_function;

use crate::error::{CompileError, CompileResult};
use crate::texture::TextureId;

/// Four corners in a fixed winding order.
///
/// Built from a rectangle, the corners are bottom-left, top-left, top-right,
/// bottom-right. The packer's index template relies on this order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub p1: Vec2,
    pub p2: Vec2,
    pub p3: Vec2,
    pub p4: Vec2,
}

impl Quad {
    /// Texture coordinates covering a whole texture.
    pub const UNIT_UV: Quad = Quad::new(
        Vec2::new(0.0, 0.0),
        Vec2::new(0.0, 1.0),
        Vec2::new(1.0, 1.0),
        Vec2::new(1.0, 0.0),
    );

    pub const fn new(p1: Vec2, p2: Vec2, p3: Vec2, p4: Vec2) -> Self {
        Self { p1, p2, p3, p4 }
    }

    /// Axis-aligned quad from its edges.
    pub const fn from_rect(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self::new(
            Vec2::new(left, bottom),
            Vec2::new(left, top),
            Vec2::new(right, top),
            Vec2::new(right, bottom),
        )
    }

    /// Corners in winding order.
    pub fn corners(&self) -> [Vec2; 4] {
        [self.p1, self.p2, self.p3, self.p4]
    }

    /// Centroid of the four corners.
    pub fn center(&self) -> Vec2 {
        (self.p1 + self.p2 + self.p3 + self.p4) * 0.25
    }

    pub fn translate(&mut self, offset: Vec2) {
        self.map(|p| p + offset);
    }

    pub fn set_center(&mut self, center: Vec2) {
        let offset = center - self.center();
        self.translate(offset);
    }

    /// Rotate counter-clockwise about the center.
    pub fn rotate(&mut self, degrees: f32) {
        let pivot = self.center();
        self.map(|p| rotate_about(p, pivot, degrees));
    }

    /// Scale about the center.
    pub fn scale(&mut self, factor: f32) {
        let pivot = self.center();
        self.map(|p| scale_about(p, pivot, factor));
    }

    fn map(&mut self, f: impl Fn(Vec2) -> Vec2) {
        self.p1 = f(self.p1);
        self.p2 = f(self.p2);
        self.p3 = f(self.p3);
        self.p4 = f(self.p4);
    }
}

/// 8-bit RGBA color, packed into one `u32` per colored vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create a color from a 32-bit RGBA hex value (e.g. `0xFF880080`).
    pub const fn from_hex_alpha(hex: u32) -> Self {
        let [r, g, b, a] = hex.to_be_bytes();
        Self { r, g, b, a }
    }

    /// Packs as `Unorm8x4` vertex data: red in the lowest byte.
    pub const fn to_packed(self) -> u32 {
        u32::from_le_bytes([self.r, self.g, self.b, self.a])
    }

    pub const fn is_opaque(self) -> bool {
        self.a == u8::MAX
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// A quad sampling a texture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TexturedQuad {
    pub position: Quad,
    pub tex_coords: Quad,
    pub z: f32,
    pub texture: TextureId,
    pub visible: bool,
}

impl TexturedQuad {
    /// Visible quad showing the whole texture.
    pub fn new(position: Quad, z: f32, texture: TextureId) -> Self {
        Self {
            position,
            tex_coords: Quad::UNIT_UV,
            z,
            texture,
            visible: true,
        }
    }

    pub fn with_tex_coords(mut self, tex_coords: Quad) -> Self {
        self.tex_coords = tex_coords;
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }
}

/// An untextured quad filled with one color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilledQuad {
    pub position: Quad,
    pub z: f32,
    pub color: Color,
    pub visible: bool,
}

impl FilledQuad {
    pub fn new(position: Quad, z: f32, color: Color) -> Self {
        Self {
            position,
            z,
            color,
            visible: true,
        }
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn is_translucent(&self) -> bool {
        !self.color.is_opaque()
    }
}

/// A filled circle. Declared for renderables but not rasterized by the compiler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilledCircle {
    pub center: Vec2,
    pub radius: f32,
    pub z: f32,
    pub color: Color,
}

/// A line segment. Declared for renderables but not rasterized by the compiler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    pub start: Vec2,
    pub end: Vec2,
    pub z: f32,
    pub color: Color,
}

/// Discriminant of [`Primitive`], used in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    TexturedQuad,
    FilledQuad,
    FilledCircle,
    LineSegment,
}

/// Every primitive kind a renderable may expose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    TexturedQuad(TexturedQuad),
    FilledQuad(FilledQuad),
    FilledCircle(FilledCircle),
    LineSegment(LineSegment),
}

impl Primitive {
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Primitive::TexturedQuad(_) => PrimitiveKind::TexturedQuad,
            Primitive::FilledQuad(_) => PrimitiveKind::FilledQuad,
            Primitive::FilledCircle(_) => PrimitiveKind::FilledCircle,
            Primitive::LineSegment(_) => PrimitiveKind::LineSegment,
        }
    }

    /// Narrows to a quad the compiler can batch.
    pub fn as_quad(&self) -> CompileResult<QuadRef<'_>> {
        match self {
            Primitive::TexturedQuad(quad) => Ok(QuadRef::Textured(quad)),
            Primitive::FilledQuad(quad) => Ok(QuadRef::Filled(quad)),
            Primitive::FilledCircle(_) | Primitive::LineSegment(_) => {
                Err(CompileError::UnsupportedPrimitiveType { kind: self.kind() })
            }
        }
    }
}

impl From<TexturedQuad> for Primitive {
    fn from(quad: TexturedQuad) -> Self {
        Primitive::TexturedQuad(quad)
    }
}

impl From<FilledQuad> for Primitive {
    fn from(quad: FilledQuad) -> Self {
        Primitive::FilledQuad(quad)
    }
}

/// Borrowed view of a batchable quad.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QuadRef<'a> {
    Textured(&'a TexturedQuad),
    Filled(&'a FilledQuad),
}

impl QuadRef<'_> {
    pub fn z(&self) -> f32 {
        match self {
            QuadRef::Textured(q) => q.z,
            QuadRef::Filled(q) => q.z,
        }
    }

    pub fn is_visible(&self) -> bool {
        match self {
            QuadRef::Textured(q) => q.visible,
            QuadRef::Filled(q) => q.visible,
        }
    }

    pub fn position(&self) -> &Quad {
        match self {
            QuadRef::Textured(q) => &q.position,
            QuadRef::Filled(q) => &q.position,
        }
    }
}

/// Anything that exposes primitives for a frame.
pub trait Renderable {
    fn primitives(&self) -> &[Primitive];
}

impl Renderable for [Primitive] {
    fn primitives(&self) -> &[Primitive] {
        self
    }
}

impl Renderable for Vec<Primitive> {
    fn primitives(&self) -> &[Primitive] {
        self
    }
}

impl<T: Renderable + ?Sized> Renderable for &T {
    fn primitives(&self) -> &[Primitive] {
        (**self).primitives()
    }
}

impl<T: Renderable + ?Sized> Renderable for Box<T> {
    fn primitives(&self) -> &[Primitive] {
        (**self).primitives()
    }
}

/// Flattens renderables into quads, in renderable order.
///
/// Invisible quads are kept; batch construction skips them.
pub fn extract_primitives<'a, I, R>(renderables: I) -> CompileResult<Vec<QuadRef<'a>>>
where
    I: IntoIterator<Item = &'a R>,
    R: Renderable + ?Sized + 'a,
{
    profile_function!();

    let mut quads = Vec::new();
    for renderable in renderables {
        let primitives = renderable.primitives();
        if primitives.is_empty() {
            continue;
        }
        quads
            .try_reserve(primitives.len())
            .map_err(CompileError::out_of_memory(primitives.len()))?;
        for primitive in primitives {
            quads.push(primitive.as_quad()?);
        }
    }

    tracing::trace!("Extracted {} quads", quads.len());
    Ok(quads)
}
