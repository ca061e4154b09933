//! Vertex records and begin/end primitive assembly.

use alloc::vec::Vec;

use crate::{raster::ZBufferPoint, Vector3, Vector4};

/// Primitive types accepted by [`Context::begin`](crate::Context::begin).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PrimitiveType {
    Points,
    Lines,
    LineStrip,
    LineLoop,
    Triangles,
    TriangleStrip,
    TriangleFan,
    Quads,
    QuadStrip,
    Polygon,
}

/// A vertex as it travels through the pipeline.
///
/// Input attributes are a snapshot of the context's current state at the time the vertex was
/// submitted. The remaining fields are filled in by the transform stage, and `zp` only holds
/// meaningful values once the vertex is known to be inside the view volume.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vertex {
    pub coord: Vector4,
    pub normal: Vector3,
    pub color: Vector4,
    pub tex_coord: Vector4,
    /// Whether the edge starting at this vertex is a boundary edge.
    pub edge_flag: bool,

    /// Eye coordinates.
    pub ec: Vector4,
    /// Clip coordinates.
    pub pc: Vector4,
    pub clip_code: u8,
    /// Device coordinates handed to the rasterizer.
    pub zp: ZBufferPoint,
}

/// Attribute values picked up by the next submitted vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrentAttribs {
    pub color: Vector4,
    pub normal: Vector3,
    pub tex_coord: Vector4,
    pub edge_flag: bool,
}

impl Default for CurrentAttribs {
    fn default() -> Self {
        Self {
            color: Vector4::new(1.0, 1.0, 1.0, 1.0),
            normal: Vector3::new(0.0, 0.0, 1.0),
            tex_coord: Vector4::new(0.0, 0.0, 0.0, 1.0),
            edge_flag: true,
        }
    }
}

/// A complete primitive produced by the assembler.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Assembled<'a> {
    Point(&'a Vertex),
    Line(&'a Vertex, &'a Vertex),
    /// Closed polygon, in submission winding order.
    Polygon(&'a [Vertex]),
}

/// Accumulates vertices of an open begin/end bracket.
///
/// Primitives are handed out as soon as their vertex quota is met, except for `Polygon` and the
/// closing edge of `LineLoop`, which are only known at `end`. The buffer grows as needed and keeps
/// its capacity between brackets.
#[derive(Debug)]
pub(crate) struct Assembler {
    ty: Option<PrimitiveType>,
    verts: Vec<Vertex>,
    /// Vertices submitted in the current bracket.
    cnt: usize,
    first: Vertex,
    scratch: [Vertex; 4],
}

impl Assembler {
    pub fn new(capacity: usize) -> Self {
        Self {
            ty: None,
            verts: Vec::with_capacity(capacity),
            cnt: 0,
            first: Vertex::default(),
            scratch: [Vertex::default(); 4],
        }
    }

    pub fn primitive(&self) -> Option<PrimitiveType> {
        self.ty
    }

    pub fn capacity(&self) -> usize {
        self.verts.capacity()
    }

    pub fn begin(&mut self, ty: PrimitiveType) {
        self.ty = Some(ty);
        self.verts.clear();
        self.cnt = 0;
    }

    /// Takes a vertex and returns the primitive it completes, if any.
    ///
    /// Must only be called inside a bracket.
    pub fn push(&mut self, v: Vertex) -> Option<Assembled<'_>> {
        let ty = self.ty?;

        if self.cnt == 0 {
            self.first = v;
        }
        self.cnt += 1;
        self.verts.push(v);

        let s = &mut self.scratch;

        match ty {
            PrimitiveType::Points => {
                s[0] = v;
                self.verts.clear();
                Some(Assembled::Point(&s[0]))
            }
            PrimitiveType::Lines => {
                if self.verts.len() < 2 {
                    return None;
                }
                s[..2].copy_from_slice(&self.verts);
                self.verts.clear();
                Some(Assembled::Line(&s[0], &s[1]))
            }
            PrimitiveType::LineStrip | PrimitiveType::LineLoop => {
                if self.verts.len() < 2 {
                    return None;
                }
                s[..2].copy_from_slice(&self.verts);
                self.verts.remove(0);
                Some(Assembled::Line(&s[0], &s[1]))
            }
            PrimitiveType::Triangles => {
                if self.verts.len() < 3 {
                    return None;
                }
                s[..3].copy_from_slice(&self.verts);
                self.verts.clear();
                Some(Assembled::Polygon(&s[..3]))
            }
            PrimitiveType::TriangleStrip => {
                if self.verts.len() < 3 {
                    return None;
                }
                // Every other triangle swaps its first two vertices to keep a consistent winding.
                let [a, b, c] = [self.verts[0], self.verts[1], self.verts[2]];
                if (self.cnt - 3) % 2 == 0 {
                    s[..3].copy_from_slice(&[a, b, c]);
                } else {
                    s[..3].copy_from_slice(&[b, a, c]);
                }
                self.verts.remove(0);
                Some(Assembled::Polygon(&s[..3]))
            }
            PrimitiveType::TriangleFan => {
                if self.verts.len() < 3 {
                    return None;
                }
                s[..3].copy_from_slice(&self.verts);
                self.verts.remove(1);
                Some(Assembled::Polygon(&s[..3]))
            }
            PrimitiveType::Quads => {
                if self.verts.len() < 4 {
                    return None;
                }
                s.copy_from_slice(&self.verts);
                self.verts.clear();
                Some(Assembled::Polygon(&s[..]))
            }
            PrimitiveType::QuadStrip => {
                if self.verts.len() < 4 {
                    return None;
                }
                let v = &self.verts;
                *s = [v[0], v[1], v[3], v[2]];
                self.verts.remove(0);
                self.verts.remove(0);
                Some(Assembled::Polygon(&s[..]))
            }
            PrimitiveType::Polygon => None,
        }
    }

    /// Closes the bracket, returning the primitive that only completes at the end.
    pub fn end(&mut self) -> Option<Assembled<'_>> {
        let ty = self.ty.take()?;

        match ty {
            PrimitiveType::LineLoop if self.cnt >= 3 => {
                let last = *self.verts.last()?;
                self.scratch[0] = last;
                self.scratch[1] = self.first;
                Some(Assembled::Line(&self.scratch[0], &self.scratch[1]))
            }
            PrimitiveType::Polygon if self.verts.len() >= 3 => Some(Assembled::Polygon(&self.verts)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vtx(i: usize) -> Vertex {
        Vertex {
            coord: Vector4::new(i as f32, 0.0, 0.0, 1.0),
            ..Default::default()
        }
    }

    fn ids(p: &[Vertex]) -> Vec<usize> {
        p.iter().map(|v| v.coord.x as usize).collect()
    }

    fn run(ty: PrimitiveType, n: usize) -> Vec<Vec<usize>> {
        let mut asm = Assembler::new(4);
        let mut out = vec![];
        asm.begin(ty);

        let mut collect = |p: Option<Assembled<'_>>| match p {
            Some(Assembled::Point(a)) => out.push(ids(&[*a])),
            Some(Assembled::Line(a, b)) => out.push(ids(&[*a, *b])),
            Some(Assembled::Polygon(p)) => out.push(ids(p)),
            None => (),
        };

        for i in 0..n {
            collect(asm.push(vtx(i)));
        }
        collect(asm.end());

        out
    }

    #[test]
    fn triangles_and_points() {
        assert_eq!(run(PrimitiveType::Triangles, 7), [vec![0, 1, 2], vec![3, 4, 5]]);
        assert_eq!(run(PrimitiveType::Points, 2), [vec![0], vec![1]]);
        assert_eq!(run(PrimitiveType::Lines, 3), [vec![0, 1]]);
    }

    #[test]
    fn strip_alternates_winding() {
        assert_eq!(
            run(PrimitiveType::TriangleStrip, 5),
            [vec![0, 1, 2], vec![2, 1, 3], vec![2, 3, 4]]
        );
    }

    #[test]
    fn fan_pivots_on_first() {
        assert_eq!(
            run(PrimitiveType::TriangleFan, 5),
            [vec![0, 1, 2], vec![0, 2, 3], vec![0, 3, 4]]
        );
    }

    #[test]
    fn quads_and_quad_strip() {
        assert_eq!(run(PrimitiveType::Quads, 8), [vec![0, 1, 2, 3], vec![4, 5, 6, 7]]);
        assert_eq!(
            run(PrimitiveType::QuadStrip, 6),
            [vec![0, 1, 3, 2], vec![2, 3, 5, 4]]
        );
    }

    #[test]
    fn line_loop_closes_at_end() {
        assert_eq!(
            run(PrimitiveType::LineLoop, 3),
            [vec![0, 1], vec![1, 2], vec![2, 0]]
        );
        assert_eq!(run(PrimitiveType::LineStrip, 3), [vec![0, 1], vec![1, 2]]);
    }

    #[test]
    fn polygon_is_emitted_at_end_and_buffer_grows() {
        let mut asm = Assembler::new(4);
        asm.begin(PrimitiveType::Polygon);
        for i in 0..40 {
            assert!(asm.push(vtx(i)).is_none());
        }
        assert!(asm.capacity() >= 40);
        match asm.end() {
            Some(Assembled::Polygon(p)) => assert_eq!(p.len(), 40),
            _ => panic!("expected polygon"),
        }
        assert!(asm.primitive().is_none());
    }

    #[test]
    fn degenerate_polygon_is_dropped() {
        assert!(run(PrimitiveType::Polygon, 2).is_empty());
    }
}
