//! Math types backed by `glam`.
//!
//! Sprite corners, texture coordinates and rotation pivots are all [`Vec2`].
//!
//! # Examples
//!
//! ```
//! use quadbatch_core::math::Vec2;
//!
//! let corner = Vec2::new(10.0, 20.0);
//! let moved = corner + Vec2::new(1.0, 0.5);
//! assert_eq!(moved, Vec2::new(11.0, 20.5));
//! ```

pub use glam::{Mat2, Vec2, vec2};

/// Rotate `point` counter-clockwise about `pivot` by `degrees`.
#[inline]
pub fn rotate_about(point: Vec2, pivot: Vec2, degrees: f32) -> Vec2 {
    let rotation = Mat2::from_angle(degrees.to_radians());
    pivot + rotation * (point - pivot)
}

/// Scale `point` away from (or toward) `pivot` by `factor`.
#[inline]
pub fn scale_about(point: Vec2, pivot: Vec2, factor: f32) -> Vec2 {
    pivot + (point - pivot) * factor
}
