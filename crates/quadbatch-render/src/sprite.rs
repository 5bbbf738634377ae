//! A single textured quad exposed as a renderable.

use quadbatch_core::math::Vec2;

use crate::primitive::{Primitive, Quad, Renderable, TexturedQuad};
use crate::texture::TextureId;

/// A movable, rotatable textured quad.
///
/// ```
/// use quadbatch_render::{Quad, Renderable, Sprite, TextureId};
/// use quadbatch_core::math::Vec2;
///
/// let quad = Quad::from_rect(0.0, 32.0, 32.0, 0.0);
/// let mut sprite = Sprite::new(TextureId::from_raw(0), quad, 0.5);
/// sprite.set_center(Vec2::new(100.0, 100.0));
/// sprite.rotate(45.0);
/// assert_eq!(sprite.primitives().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    quad: TexturedQuad,
    /// `quad` as handed to the compiler. Rebuilt after every change.
    primitive: Primitive,
}

impl Sprite {
    pub fn new(texture: TextureId, position: Quad, z: f32) -> Self {
        let quad = TexturedQuad::new(position, z, texture);
        Self {
            quad,
            primitive: Primitive::TexturedQuad(quad),
        }
    }

    pub fn quad(&self) -> &TexturedQuad {
        &self.quad
    }

    fn update(&mut self, f: impl FnOnce(&mut TexturedQuad)) {
        f(&mut self.quad);
        self.primitive = Primitive::TexturedQuad(self.quad);
    }

    pub fn texture(&self) -> TextureId {
        self.quad().texture
    }

    pub fn set_texture(&mut self, texture: TextureId) {
        self.update(|quad| quad.texture = texture);
    }

    /// Region of the texture shown, as texture-space corners.
    pub fn set_tex_coords(&mut self, tex_coords: Quad) {
        self.update(|quad| quad.tex_coords = tex_coords);
    }

    pub fn z(&self) -> f32 {
        self.quad().z
    }

    pub fn set_z(&mut self, z: f32) {
        self.update(|quad| quad.z = z);
    }

    pub fn is_visible(&self) -> bool {
        self.quad().visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.update(|quad| quad.visible = visible);
    }

    pub fn center(&self) -> Vec2 {
        self.quad().position.center()
    }

    pub fn set_center(&mut self, center: Vec2) {
        self.update(|quad| quad.position.set_center(center));
    }

    pub fn translate(&mut self, offset: Vec2) {
        self.update(|quad| quad.position.translate(offset));
    }

    /// Rotate counter-clockwise about the sprite's center.
    pub fn rotate(&mut self, degrees: f32) {
        self.update(|quad| quad.position.rotate(degrees));
    }

    pub fn scale(&mut self, factor: f32) {
        self.update(|quad| quad.position.scale(factor));
    }
}

impl Renderable for Sprite {
    fn primitives(&self) -> &[Primitive] {
        std::slice::from_ref(&self.primitive)
    }
}
