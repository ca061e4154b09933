//! Character grid rasterizer.
//!
//! A small, depth-buffered [`Rasterizer`] that writes into a grid of cells. Each cell stores a
//! character picked from a luminance ramp and the RGB color it was shaded with. Good enough to
//! see what the pipeline produces in a terminal or in a test.

use alloc::{string::String, vec::Vec};

use crate::{
    raster::{Rasterizer, Shading, ZBufferPoint, ZB_POINT_ST_MAX, ZB_POINT_ST_MIN},
    Vector2, Vector3, Vector4,
};

const PALETTE: [u8; 10] = *b" .:-=+*%#@";

/// Returns the assumed aspect ratio of terminal characters.
///
/// Currently returns (1, 2), indicating that characters are twice as tall, compared to their
/// width.
pub fn term_char_aspect() -> (usize, usize) {
    (1, 2)
}

fn luminance(c: &Vector3) -> f32 {
    0.2126 * c.x + 0.7152 * c.y + 0.0722 * c.z
}

fn to_palette(c: &Vector3) -> u8 {
    let l = luminance(c).max(0.0).min(1.0);
    let idx = libm::roundf(l * (PALETTE.len() - 1) as f32) as usize;
    PALETTE[idx.min(PALETTE.len() - 1)]
}

fn edge_function(a: Vector2, b: Vector2, c: Vector2) -> f32 {
    (c.x - a.x) * (b.y - a.y) - (c.y - a.y) * (b.x - a.x)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub ch: u8,
    pub color: Vector3,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: PALETTE[0],
            color: Vector3::zeros(),
        }
    }
}

impl Cell {
    /// Nearest ANSI 256-color palette index of the cell color.
    pub fn ansi256(&self) -> u8 {
        let c = self.color.map(|v| libm::roundf(v.max(0.0).min(1.0) * 255.0) as u8);
        let rgb = colorsys::Rgb::from([c.x, c.y, c.z]);
        colorsys::Ansi256::from(rgb).code()
    }
}

#[derive(Debug, Clone, Default)]
pub struct AsciiRasterizer {
    w: usize,
    h: usize,
    /// Device depth per cell. Smaller is nearer.
    depth: Vec<i32>,
    cells: Vec<Cell>,
    /// Count of fragments written, handy in tests.
    fragments: usize,
}

impl AsciiRasterizer {
    pub fn new(w: usize, h: usize) -> Self {
        let mut ret = Self::default();
        ret.resize(w, h);
        ret
    }

    pub fn width(&self) -> usize {
        self.w
    }

    pub fn height(&self) -> usize {
        self.h
    }

    pub fn fragments(&self) -> usize {
        self.fragments
    }

    /// Resizes the grid. Contents are cleared.
    pub fn resize(&mut self, w: usize, h: usize) {
        self.w = w;
        self.h = h;
        self.clear();
    }

    pub fn clear(&mut self) {
        let len = self.w * self.h;
        self.depth.clear();
        self.depth.resize(len, i32::MAX);
        self.cells.clear();
        self.cells.resize(len, Cell::default());
        self.fragments = 0;
    }

    pub fn cell(&self, x: usize, y: usize) -> Option<&Cell> {
        if x < self.w && y < self.h {
            self.cells.get(y * self.w + x)
        } else {
            None
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> + '_ {
        self.cells.chunks(self.w.max(1))
    }

    /// Renders the grid as plain text, one line per row.
    pub fn to_text(&self) -> String {
        let mut s = String::with_capacity((self.w + 1) * self.h);
        for row in self.rows() {
            s.extend(row.iter().map(|c| c.ch as char));
            s.push('\n');
        }
        s
    }

    fn shade(&mut self, x: i32, y: i32, z: i32, color: Vector4, depth_test: bool) {
        if x < 0 || y < 0 || x as usize >= self.w || y as usize >= self.h {
            return;
        }

        let idx = y as usize * self.w + x as usize;

        if depth_test && z > self.depth[idx] {
            return;
        }

        self.depth[idx] = z;
        let color = color.xyz();
        self.cells[idx] = Cell {
            ch: to_palette(&color),
            color,
        };
        self.fragments += 1;
    }
}

fn checker(s: f32, t: f32) -> f32 {
    let norm = |v: f32| (v - ZB_POINT_ST_MIN as f32) / (ZB_POINT_ST_MAX - ZB_POINT_ST_MIN) as f32;
    let (s, t) = (norm(s) * 8.0, norm(t) * 8.0);
    if (libm::floorf(s) as i32 + libm::floorf(t) as i32) % 2 == 0 {
        1.0
    } else {
        0.5
    }
}

fn plot_line(x0: i32, y0: i32, x1: i32, y1: i32, mut plot: impl FnMut(i32, i32, f32)) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let steps = dx.max(-dy).max(1) as f32;

    let (mut x, mut y) = (x0, y0);
    let mut err = dx + dy;
    let mut i = 0;

    loop {
        plot(x, y, i as f32 / steps);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
        i += 1;
    }
}

impl Rasterizer for AsciiRasterizer {
    fn plot(&mut self, p: &ZBufferPoint) {
        self.shade(p.x, p.y, p.z, p.color(), true);
    }

    fn line(&mut self, a: &ZBufferPoint, b: &ZBufferPoint, depth_test: bool) {
        let (ca, cb) = (a.color(), b.color());
        plot_line(a.x, a.y, b.x, b.y, |x, y, t| {
            let z = a.z as f32 + (b.z - a.z) as f32 * t;
            self.shade(x, y, z as i32, ca.lerp(&cb, t), depth_test);
        });
    }

    fn fill_triangle(&mut self, [a, b, c]: [&ZBufferPoint; 3], shading: Shading) {
        let pa = Vector2::new(a.x as f32, a.y as f32);
        let pb = Vector2::new(b.x as f32, b.y as f32);
        let pc = Vector2::new(c.x as f32, c.y as f32);

        let area = edge_function(pa, pb, pc);
        if area == 0.0 {
            return;
        }

        let min_x = a.x.min(b.x).min(c.x).max(0);
        let min_y = a.y.min(b.y).min(c.y).max(0);
        let max_x = a.x.max(b.x).max(c.x).min(self.w as i32 - 1);
        let max_y = a.y.max(b.y).max(c.y).min(self.h as i32 - 1);

        let cols = [a.color(), b.color(), c.color()];

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let p = Vector2::new(x as f32, y as f32);

                let wa = edge_function(pb, pc, p) / area;
                let wb = edge_function(pc, pa, p) / area;
                let wc = edge_function(pa, pb, p) / area;

                if wa < 0.0 || wb < 0.0 || wc < 0.0 {
                    continue;
                }

                let z = wa * a.z as f32 + wb * b.z as f32 + wc * c.z as f32;

                let color = match shading {
                    Shading::Flat => cols[0],
                    Shading::Smooth => cols[0] * wa + cols[1] * wb + cols[2] * wc,
                    Shading::Textured(_) => {
                        let s = wa * a.s as f32 + wb * b.s as f32 + wc * c.s as f32;
                        let t = wa * a.t as f32 + wb * b.t as f32 + wc * c.t as f32;
                        let k = checker(s, t);
                        let c = cols[0] * wa + cols[1] * wb + cols[2] * wc;
                        Vector4::new(c.x * k, c.y * k, c.z * k, c.w)
                    }
                };

                self.shade(x, y, z as i32, color, true);
            }
        }
    }
}
