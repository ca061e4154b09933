//! Clipping, facing and polygon mode dispatch.
//!
//! Assembled primitives enter here in clip space and leave as device space calls on the
//! [`Rasterizer`].

use crate::{
    clip::{clip_line, clip_point, Clipper},
    context::ShadeModel,
    material::Face,
    raster::{Rasterizer, Shading, ZB_POINT_Z_FRAC_BITS, ZB_POINT_Z_MAX},
    vertex::{Assembled, PrimitiveType, Vertex},
    viewport::Viewport,
};

/// How polygons of a face are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DrawMode {
    /// Plot the vertices that start a boundary edge.
    Point,
    /// Outline boundary edges.
    Line,
    Fill,
}

/// Winding of front facing polygons, as seen on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FrontFace {
    Cw,
    Ccw,
}

/// Depth bias for polygons.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PolygonOffset {
    pub factor: f32,
    /// Multiples of the smallest resolvable depth difference.
    pub units: f32,
    pub point: bool,
    pub line: bool,
    pub fill: bool,
}

impl Default for PolygonOffset {
    fn default() -> Self {
        Self {
            factor: 0.0,
            units: 0.0,
            point: false,
            line: false,
            fill: false,
        }
    }
}

impl PolygonOffset {
    pub fn enabled(&self, mode: DrawMode) -> bool {
        match mode {
            DrawMode::Point => self.point,
            DrawMode::Line => self.line,
            DrawMode::Fill => self.fill,
        }
    }

    pub(crate) fn set_enabled(&mut self, mode: DrawMode, enabled: bool) {
        match mode {
            DrawMode::Point => self.point = enabled,
            DrawMode::Line => self.line = enabled,
            DrawMode::Fill => self.fill = enabled,
        }
    }

    /// Depth bias in device depth units for a polygon with the given maximum depth slope.
    fn bias(&self, max_slope: f32) -> i32 {
        (self.factor * max_slope + self.units * (1 << ZB_POINT_Z_FRAC_BITS) as f32) as i32
    }
}

/// State consulted when rasterizing.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RasterState {
    /// Front and back polygon modes.
    pub polygon_mode: [DrawMode; 2],
    pub front_face: FrontFace,
    pub cull_face: Face,
    pub cull_enabled: bool,
    pub shade_model: ShadeModel,
    pub depth_test: bool,
    pub offset: PolygonOffset,
    pub texture_2d: bool,
    /// Bound texture, `0` for none.
    pub bound_texture: u32,
}

impl Default for RasterState {
    fn default() -> Self {
        Self {
            polygon_mode: [DrawMode::Fill; 2],
            front_face: FrontFace::Ccw,
            cull_face: Face::Back,
            cull_enabled: false,
            shade_model: ShadeModel::Smooth,
            depth_test: false,
            offset: PolygonOffset::default(),
            texture_2d: false,
            bound_texture: 0,
        }
    }
}

impl RasterState {
    fn shading(&self) -> Shading {
        if self.texture_2d && self.bound_texture != 0 {
            Shading::Textured(self.bound_texture)
        } else if self.shade_model == ShadeModel::Flat {
            Shading::Flat
        } else {
            Shading::Smooth
        }
    }

    /// Whether a polygon with the given facing is dropped.
    fn culls(&self, front: bool) -> bool {
        self.cull_enabled
            && match self.cull_face {
                Face::FrontAndBack => true,
                Face::Front => front,
                Face::Back => !front,
            }
    }
}

/// Twice the signed area of a device space polygon.
///
/// Device `y` grows downwards, so a polygon that winds counterclockwise on screen is negative.
fn signed_area(verts: &[Vertex]) -> i64 {
    let n = verts.len();
    (0..n)
        .map(|i| {
            let a = &verts[i].zp;
            let b = &verts[(i + 1) % n].zp;
            a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64
        })
        .sum()
}

/// Largest of `|dz/dx|` and `|dz/dy|` over the plane of the first three vertices.
fn max_depth_slope(verts: &[Vertex]) -> f32 {
    let [a, b, c] = [&verts[0].zp, &verts[1].zp, &verts[2].zp];

    let (x1, y1, z1) = ((b.x - a.x) as f32, (b.y - a.y) as f32, (b.z - a.z) as f32);
    let (x2, y2, z2) = ((c.x - a.x) as f32, (c.y - a.y) as f32, (c.z - a.z) as f32);

    let area = x1 * y2 - x2 * y1;
    if area == 0.0 {
        return 0.0;
    }

    let dzdx = (z1 * y2 - z2 * y1) / area;
    let dzdy = (x1 * z2 - x2 * z1) / area;

    libm::fabsf(dzdx).max(libm::fabsf(dzdy))
}

/// Index of the vertex whose color a flat shaded polygon takes.
fn provoking_index(ty: PrimitiveType, len: usize) -> usize {
    match ty {
        PrimitiveType::Polygon => 0,
        // Quad strip quads arrive as (v0, v1, v3, v2), the last submitted vertex is at 2.
        PrimitiveType::QuadStrip => 2,
        _ => len - 1,
    }
}

/// Owns the rasterizer and routes primitives to it.
pub(crate) struct Dispatcher<R> {
    pub rasterizer: R,
    pub state: RasterState,
    clipper: Clipper,
}

impl<R: Rasterizer> Dispatcher<R> {
    pub fn new(rasterizer: R) -> Self {
        Self {
            rasterizer,
            state: RasterState::default(),
            clipper: Clipper::new(),
        }
    }

    pub fn submit(&mut self, ty: PrimitiveType, prim: Assembled<'_>, viewport: &Viewport) {
        match prim {
            Assembled::Point(v) => self.point(v, viewport),
            Assembled::Line(a, b) => self.line(a, b, viewport),
            Assembled::Polygon(p) => self.polygon(ty, p, viewport),
        }
    }

    fn point(&mut self, v: &Vertex, viewport: &Viewport) {
        if !clip_point(v) {
            log::trace!("point clipped");
            return;
        }

        let mut v = *v;
        viewport.transform(&mut v);
        self.rasterizer.plot(&v.zp);
    }

    fn line(&mut self, a: &Vertex, b: &Vertex, viewport: &Viewport) {
        let Some([mut a, mut b]) = clip_line(a, b) else {
            log::trace!("line clipped");
            return;
        };

        if self.state.shade_model == ShadeModel::Flat {
            a.color = b.color;
        }

        viewport.transform(&mut a);
        viewport.transform(&mut b);
        self.rasterizer.line(&a.zp, &b.zp, self.state.depth_test);
    }

    fn polygon(&mut self, ty: PrimitiveType, poly: &[Vertex], viewport: &Viewport) {
        if poly.len() < 3 {
            return;
        }

        let provoking = poly[provoking_index(ty, poly.len())].color;

        if self.clipper.clip_polygon(poly).is_empty() {
            log::trace!("polygon clipped");
            return;
        }

        let state = &self.state;
        let verts = self.clipper.output_mut();

        for v in verts.iter_mut() {
            if state.shade_model == ShadeModel::Flat {
                v.color = provoking;
            }
            viewport.transform(v);
        }

        let area = signed_area(verts);
        if area == 0 {
            log::trace!("degenerate polygon");
            return;
        }

        let ccw = area < 0;
        let front = ccw == (state.front_face == FrontFace::Ccw);

        if state.culls(front) {
            log::trace!("polygon culled");
            return;
        }

        let mode = state.polygon_mode[if front { 0 } else { 1 }];

        if state.offset.enabled(mode) {
            let bias = state.offset.bias(max_depth_slope(verts));
            for v in verts.iter_mut() {
                v.zp.z = v.zp.z.saturating_add(bias).max(0).min(ZB_POINT_Z_MAX);
            }
        }

        let r = &mut self.rasterizer;

        match mode {
            DrawMode::Point => {
                for v in verts.iter().filter(|v| v.edge_flag) {
                    r.plot(&v.zp);
                }
            }
            DrawMode::Line => {
                let n = verts.len();
                for i in 0..n {
                    if verts[i].edge_flag {
                        r.line(&verts[i].zp, &verts[(i + 1) % n].zp, state.depth_test);
                    }
                }
            }
            DrawMode::Fill => {
                let shading = state.shading();
                for w in verts[1..].windows(2) {
                    r.fill_triangle([&verts[0].zp, &w[0].zp, &w[1].zp], shading);
                }
            }
        }
    }
}
