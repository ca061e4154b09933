//! # fixpipe
//!
//! ```text
//!        +------+        +-------+        +------+        +----------+
//!  v --> | xfrm | -----> | light | -----> | clip | -----> | dispatch | --> rasterizer
//!        +------+        +-------+        +------+        +----------+
//! ```
//!
//! ## Fixed-function vertex pipeline
//!
//! `fixpipe` is a `no_std` compatible implementation of an immediate mode, fixed-function 3D
//! pipeline. Vertices are processed in several stages:
//!
//! - Transformation through the modelview and projection matrix stacks.
//! - Per-vertex ambient/diffuse/specular lighting.
//! - Homogeneous clipping against the six planes of the view volume.
//! - Facing, culling and polygon mode dispatch to a [`Rasterizer`] backend.
//!
//! The rasterizer itself (scanline conversion, depth buffer, texturing) is not part of this crate,
//! it is a trait the user implements. [`extra::ascii::AsciiRasterizer`] is a small reference
//! implementation that draws into a character grid.
//!
//! Entrypoint is the [`Context`] struct. One context is owned per rendering surface and is passed
//! around explicitly, there is no hidden global state (see [`extra::global_state`] with the
//! `global-state` feature if you really want one).
//!
//! ## Example
//!
//! ```
//! use fixpipe::*;
//!
//! #[derive(Default)]
//! struct Count(usize);
//!
//! impl Rasterizer for Count {
//!     fn plot(&mut self, _: &ZBufferPoint) {}
//!     fn line(&mut self, _: &ZBufferPoint, _: &ZBufferPoint, _: bool) {}
//!     fn fill_triangle(&mut self, _: [&ZBufferPoint; 3], _: Shading) {
//!         self.0 += 1;
//!     }
//! }
//!
//! let mut ctx = Context::new(Count::default());
//! ctx.viewport(0, 0, 64, 64).unwrap();
//! ctx.begin(PrimitiveType::Triangles).unwrap();
//! ctx.vertex3(-0.5, -0.5, 0.0).unwrap();
//! ctx.vertex3(0.5, -0.5, 0.0).unwrap();
//! ctx.vertex3(0.0, 0.5, 0.0).unwrap();
//! ctx.end().unwrap();
//!
//! assert_eq!(ctx.rasterizer().0, 1);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use nalgebra as na;

pub mod clip;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod enums;
pub mod error;
pub mod extra;
pub mod light;
pub mod material;
pub mod matrix;
pub mod raster;
pub mod specular;
pub mod vertex;
pub mod viewport;

pub use config::Config;
pub use context::{Cap, Context, ShadeModel};
pub use dispatch::{DrawMode, FrontFace, PolygonOffset, RasterState};
pub use error::{Error, Result};
pub use light::{Light, LightId, LightModel, LightModelParam, LightParam};
pub use material::{ColorMaterialMode, Face, Material, MaterialParam};
pub use matrix::{MatrixMode, MatrixSet};
pub use raster::{Rasterizer, Shading, ZBufferPoint};
pub use specular::SpecularCache;
pub use vertex::{PrimitiveType, Vertex};
pub use viewport::Viewport;

pub type Vector2 = na::Vector2<f32>;
pub type Vector3 = na::Vector3<f32>;
pub type Vector4 = na::Vector4<f32>;
pub type Matrix3 = na::Matrix3<f32>;
pub type Matrix4 = na::Matrix4<f32>;

/// Normalizes a vector in place, leaving (near) zero vectors untouched.
fn normalize_or_keep(v: &mut Vector3) {
    let len = libm::sqrtf(v.dot(v));
    if len > 1e-6 {
        *v /= len;
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;

    pub fn approx(a: f32, b: f32) -> bool {
        libm::fabsf(a - b) <= 1e-5 * (1.0 + libm::fabsf(a).max(libm::fabsf(b)))
    }

    pub fn approx_mat(a: &Matrix4, b: &Matrix4) -> bool {
        a.iter().zip(b.iter()).all(|(a, b)| approx(*a, *b))
    }
}
