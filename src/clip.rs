//! Homogeneous clipping against the view volume.
//!
//! Clipping happens in clip space, before the perspective divide. A vertex is inside when
//! `-w <= x, y, z <= w`. Tests use a slightly enlarged `w`, so that a vertex placed exactly on a
//! plane by an earlier clipping stage is not considered outside again due to rounding.

use alloc::vec::Vec;

use crate::{vertex::Vertex, Vector4};

/// Relative guard band added to `w` in clip tests.
pub const CLIP_EPSILON: f32 = 1e-5;

pub const CLIP_XMIN: u8 = 1 << 0;
pub const CLIP_XMAX: u8 = 1 << 1;
pub const CLIP_YMIN: u8 = 1 << 2;
pub const CLIP_YMAX: u8 = 1 << 3;
pub const CLIP_ZMIN: u8 = 1 << 4;
pub const CLIP_ZMAX: u8 = 1 << 5;

const NUM_PLANES: usize = 6;

/// Computes the bitmask of view volume planes the point is outside of.
pub fn clip_code(x: f32, y: f32, z: f32, w: f32) -> u8 {
    let w = w * (1.0 + CLIP_EPSILON);

    (x < -w) as u8
        | ((x > w) as u8) << 1
        | ((y < -w) as u8) << 2
        | ((y > w) as u8) << 3
        | ((z < -w) as u8) << 4
        | ((z > w) as u8) << 5
}

pub fn clip_code_v(p: &Vector4) -> u8 {
    clip_code(p.x, p.y, p.z, p.w)
}

/// Signed distance-like value of `p` to a plane. Non-negative means inside.
fn plane_dist(p: &Vector4, plane: usize) -> f32 {
    let axis = plane / 2;
    if plane % 2 == 0 {
        p[axis] + p.w
    } else {
        p.w - p[axis]
    }
}

/// Linearly interpolates every attribute of two vertices.
///
/// The clip code is recomputed. The edge flag is taken from `a`, callers adjust it as needed.
pub fn interpolate(a: &Vertex, b: &Vertex, t: f32) -> Vertex {
    let pc = a.pc.lerp(&b.pc, t);

    Vertex {
        coord: a.coord.lerp(&b.coord, t),
        normal: a.normal.lerp(&b.normal, t),
        color: a.color.lerp(&b.color, t),
        tex_coord: a.tex_coord.lerp(&b.tex_coord, t),
        edge_flag: a.edge_flag,
        ec: a.ec.lerp(&b.ec, t),
        pc,
        clip_code: clip_code_v(&pc),
        zp: Default::default(),
    }
}

/// Finds where the edge from `inside` to `outside` crosses `plane`.
///
/// The crossing coordinate is snapped onto the plane exactly.
fn intersect(inside: &Vertex, outside: &Vertex, plane: usize) -> Vertex {
    let d_in = plane_dist(&inside.pc, plane);
    let d_out = plane_dist(&outside.pc, plane);
    let den = d_in - d_out;

    let t = if den != 0.0 {
        (d_in / den).max(0.0).min(1.0)
    } else {
        0.0
    };

    let mut v = interpolate(inside, outside, t);

    let axis = plane / 2;
    v.pc[axis] = if plane % 2 == 0 { -v.pc.w } else { v.pc.w };
    v.clip_code = clip_code_v(&v.pc);

    v
}

fn outside(v: &Vertex, plane: usize) -> bool {
    v.clip_code & (1 << plane) != 0
}

/// Whether a point survives clipping.
pub fn clip_point(v: &Vertex) -> bool {
    v.clip_code == 0
}

/// Clips a line segment, preserving its direction.
pub fn clip_line(a: &Vertex, b: &Vertex) -> Option<[Vertex; 2]> {
    if a.clip_code | b.clip_code == 0 {
        return Some([*a, *b]);
    }
    if a.clip_code & b.clip_code != 0 {
        return None;
    }

    let (mut a, mut b) = (*a, *b);

    for plane in 0..NUM_PLANES {
        match (outside(&a, plane), outside(&b, plane)) {
            (false, false) => (),
            (true, true) => return None,
            (false, true) => b = intersect(&a, &b, plane),
            (true, false) => a = intersect(&b, &a, plane),
        }
    }

    Some([a, b])
}

/// Reusable polygon clipper.
///
/// Keeps two scratch lists around, so clipping does not allocate once they have grown to the
/// largest polygon seen.
#[derive(Debug, Default)]
pub struct Clipper {
    out: Vec<Vertex>,
    tmp: Vec<Vertex>,
}

impl Clipper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clips a convex polygon against all six planes.
    ///
    /// Returns the clipped polygon in the same winding order. The result is empty if the polygon
    /// is entirely outside or degenerates to fewer than three vertices. A polygon that is entirely
    /// inside comes back unchanged.
    ///
    /// Edge flags are kept consistent: edges created along a clip plane are not boundary edges.
    pub fn clip_polygon(&mut self, poly: &[Vertex]) -> &[Vertex] {
        self.out.clear();

        if poly.len() < 3 {
            return &self.out;
        }

        let (or, and) = poly
            .iter()
            .fold((0, !0), |(o, a), v| (o | v.clip_code, a & v.clip_code));

        if and != 0 {
            return &self.out;
        }

        self.out.extend_from_slice(poly);

        if or == 0 {
            return &self.out;
        }

        for plane in 0..NUM_PLANES {
            if !self.out.iter().any(|v| outside(v, plane)) {
                continue;
            }

            self.tmp.clear();
            let n = self.out.len();

            for i in 0..n {
                let cur = &self.out[i];
                let next = &self.out[(i + 1) % n];

                match (outside(cur, plane), outside(next, plane)) {
                    (false, false) => self.tmp.push(*cur),
                    (false, true) => {
                        self.tmp.push(*cur);
                        let mut p = intersect(cur, next, plane);
                        p.edge_flag = false;
                        self.tmp.push(p);
                    }
                    (true, false) => {
                        let mut p = intersect(next, cur, plane);
                        p.edge_flag = cur.edge_flag;
                        self.tmp.push(p);
                    }
                    (true, true) => (),
                }
            }

            core::mem::swap(&mut self.out, &mut self.tmp);

            if self.out.len() < 3 {
                self.out.clear();
                break;
            }
        }

        &self.out
    }

    /// Mutable access to the last clipping result.
    pub(crate) fn output_mut(&mut self) -> &mut [Vertex] {
        &mut self.out
    }
}
