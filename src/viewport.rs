//! Clip space to device space mapping.

use crate::{
    error::{Error, Result},
    raster::ZB_POINT_Z_MAX,
    vertex::Vertex,
    Vector3,
};

/// Screen rectangle the view volume maps onto.
///
/// Device `y` points down, so the top of the view volume lands on `ymin`. The scale and offset
/// used by [`Viewport::transform`] are only refreshed by [`Viewport::eval`], which the context
/// calls when a primitive is started.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    xmin: i32,
    ymin: i32,
    xsize: i32,
    ysize: i32,
    scale: Vector3,
    trans: Vector3,
    updated: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(0, 0, 1, 1)
    }
}

impl Viewport {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        let mut ret = Self {
            xmin: x,
            ymin: y,
            xsize: w.max(1),
            ysize: h.max(1),
            scale: Vector3::zeros(),
            trans: Vector3::zeros(),
            updated: true,
        };
        ret.eval();
        ret
    }

    /// Returns `(x, y, width, height)`.
    pub fn rect(&self) -> (i32, i32, i32, i32) {
        (self.xmin, self.ymin, self.xsize, self.ysize)
    }

    /// Whether the rectangle changed since the last [`Viewport::eval`].
    pub fn is_updated(&self) -> bool {
        self.updated
    }

    pub fn set(&mut self, x: i32, y: i32, w: i32, h: i32) -> Result<()> {
        if w <= 0 || h <= 0 {
            return Err(Error::InvalidValue("viewport"));
        }

        if (x, y, w, h) != self.rect() {
            self.xmin = x;
            self.ymin = y;
            self.xsize = w;
            self.ysize = h;
            self.updated = true;
        }

        Ok(())
    }

    /// Recomputes the mapping if the rectangle changed.
    pub fn eval(&mut self) {
        if !self.updated {
            return;
        }

        let half_w = (self.xsize as f32 - 0.5) / 2.0;
        let half_h = (self.ysize as f32 - 0.5) / 2.0;
        let half_z = ZB_POINT_Z_MAX as f32 / 2.0;

        self.scale = Vector3::new(half_w, -half_h, half_z);
        self.trans = Vector3::new(
            half_w + self.xmin as f32,
            half_h + self.ymin as f32,
            half_z,
        );
        self.updated = false;

        log::debug!(
            "viewport {}x{} at ({}, {})",
            self.xsize,
            self.ysize,
            self.xmin,
            self.ymin
        );
    }

    /// Fills the device space point of a vertex that lies inside the view volume.
    pub fn transform(&self, v: &mut Vertex) {
        let winv = if v.pc.w != 0.0 { 1.0 / v.pc.w } else { 1.0 };

        let x = v.pc.x * winv * self.scale.x + self.trans.x;
        let y = v.pc.y * winv * self.scale.y + self.trans.y;
        let z = v.pc.z * winv * self.scale.z + self.trans.z;

        v.zp.x = x as i32;
        v.zp.y = y as i32;
        v.zp.z = (z as i32).max(0).min(ZB_POINT_Z_MAX);
        v.zp.set_color(&v.color);
        v.zp.set_tex_coord(v.tex_coord.x, v.tex_coord.y);
    }
}
