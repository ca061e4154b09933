//! Device space output.
//!
//! The pipeline ends at the [`Rasterizer`] trait. Everything behind it (scan conversion, depth
//! buffer, texture sampling, the framebuffer itself) belongs to the backend.

use alloc::boxed::Box;

use crate::Vector4;

/// Bits of integer depth precision.
pub const ZB_Z_BITS: u32 = 16;
/// Fractional bits below the integer depth.
pub const ZB_POINT_Z_FRAC_BITS: u32 = 14;
/// Largest device depth value. Depth `0` is the near plane.
pub const ZB_POINT_Z_MAX: i32 = ((1 << ZB_Z_BITS) - 1) << ZB_POINT_Z_FRAC_BITS;

pub const ZB_POINT_COLOR_MIN: i32 = 1 << 10;
pub const ZB_POINT_COLOR_MAX: i32 = (1 << 16) - (1 << 9);

pub const ZB_POINT_ST_MIN: i32 = 1 << 13;
pub const ZB_POINT_ST_MAX: i32 = (1 << 22) - (1 << 13);

/// A vertex in device space, as handed to the rasterizer.
///
/// Coordinates are integer pixels with `y` growing downwards. Depth, color and texture coordinates
/// are fixed point, see the `ZB_POINT_*` constants for their ranges.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ZBufferPoint {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub s: i32,
    pub t: i32,
    pub r: i32,
    pub g: i32,
    pub b: i32,
    pub a: i32,
}

/// Maps `[0; 1]` onto `[min; max]`. Values outside the unit range map outside `[min; max]` and
/// saturate at the `i32` bounds.
fn to_fixed(v: f32, min: i32, max: i32) -> i32 {
    (v * (max - min) as f32 + min as f32) as i32
}

fn from_fixed(v: i32, min: i32, max: i32) -> f32 {
    (v - min) as f32 / (max - min) as f32
}

impl ZBufferPoint {
    /// Stores a `[0; 1]` color in fixed point.
    pub fn set_color(&mut self, c: &Vector4) {
        let f = |v: f32| to_fixed(v.max(0.0).min(1.0), ZB_POINT_COLOR_MIN, ZB_POINT_COLOR_MAX);
        self.r = f(c.x);
        self.g = f(c.y);
        self.b = f(c.z);
        self.a = f(c.w);
    }

    /// Color as floats in `[0; 1]`.
    pub fn color(&self) -> Vector4 {
        let f = |v: i32| from_fixed(v, ZB_POINT_COLOR_MIN, ZB_POINT_COLOR_MAX);
        Vector4::new(f(self.r), f(self.g), f(self.b), f(self.a))
    }

    pub fn set_tex_coord(&mut self, s: f32, t: f32) {
        self.s = to_fixed(s, ZB_POINT_ST_MIN, ZB_POINT_ST_MAX);
        self.t = to_fixed(t, ZB_POINT_ST_MIN, ZB_POINT_ST_MAX);
    }

    /// Depth mapped back to `[0; 1]`.
    pub fn depth(&self) -> f32 {
        self.z as f32 / ZB_POINT_Z_MAX as f32
    }
}

/// How a filled triangle should be shaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shading {
    /// All three vertices carry the provoking vertex color.
    Flat,
    /// Interpolate vertex colors.
    Smooth,
    /// Sample the given texture, modulated by the interpolated color.
    Textured(u32),
}

/// Backend that turns device space primitives into pixels.
///
/// Primitives arrive clipped to the viewport, already culled, and with polygon offset applied.
pub trait Rasterizer {
    fn plot(&mut self, p: &ZBufferPoint);

    /// Draws a line. `depth_test` tells whether the depth buffer should be consulted.
    fn line(&mut self, a: &ZBufferPoint, b: &ZBufferPoint, depth_test: bool);

    fn fill_triangle(&mut self, tri: [&ZBufferPoint; 3], shading: Shading);
}

impl<R: Rasterizer + ?Sized> Rasterizer for &mut R {
    fn plot(&mut self, p: &ZBufferPoint) {
        (**self).plot(p)
    }

    fn line(&mut self, a: &ZBufferPoint, b: &ZBufferPoint, depth_test: bool) {
        (**self).line(a, b, depth_test)
    }

    fn fill_triangle(&mut self, tri: [&ZBufferPoint; 3], shading: Shading) {
        (**self).fill_triangle(tri, shading)
    }
}

impl<R: Rasterizer + ?Sized> Rasterizer for Box<R> {
    fn plot(&mut self, p: &ZBufferPoint) {
        (**self).plot(p)
    }

    fn line(&mut self, a: &ZBufferPoint, b: &ZBufferPoint, depth_test: bool) {
        (**self).line(a, b, depth_test)
    }

    fn fill_triangle(&mut self, tri: [&ZBufferPoint; 3], shading: Shading) {
        (**self).fill_triangle(tri, shading)
    }
}
