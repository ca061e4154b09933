//! Matrix stacks and the matrices derived from them.

use alloc::vec::Vec;

use crate::{config::Config, error::*, Matrix3, Matrix4, Vector3};
use nalgebra as na;

/// Selects which stack matrix operations apply to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MatrixMode {
    ModelView,
    Projection,
    Texture,
}

/// A bounded stack of matrices.
///
/// The stack is never empty: the top lives outside of the saved entries, so there is always a
/// current matrix to read.
#[derive(Debug, Clone)]
pub struct MatrixStack {
    mode: MatrixMode,
    top: Matrix4,
    saved: Vec<Matrix4>,
    max_depth: usize,
}

impl MatrixStack {
    pub fn new(mode: MatrixMode, max_depth: usize) -> Self {
        Self {
            mode,
            top: Matrix4::identity(),
            saved: Vec::new(),
            max_depth: max_depth.max(1),
        }
    }

    pub fn top(&self) -> &Matrix4 {
        &self.top
    }

    /// Number of matrices on the stack, including the top one.
    pub fn depth(&self) -> usize {
        self.saved.len() + 1
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    fn push(&mut self) -> Result<()> {
        if self.depth() >= self.max_depth {
            return Err(Error::StackOverflow(self.mode));
        }
        self.saved.push(self.top);
        Ok(())
    }

    /// Pops the top matrix. Returns whether the current matrix actually changed.
    fn pop(&mut self) -> Result<bool> {
        let prev = self.saved.pop().ok_or(Error::StackUnderflow(self.mode))?;
        let changed = prev != self.top;
        self.top = prev;
        Ok(changed)
    }
}

#[derive(Debug, Clone)]
struct Derived {
    model_projection: Matrix4,
    model_view_inv: Matrix4,
    texture_identity: bool,
}

/// The modelview, projection and texture stacks, plus lazily computed products.
///
/// Any operation that changes the top of a stack marks the derived matrices dirty. They are only
/// recomputed the next time one of them is queried.
#[derive(Debug, Clone)]
pub struct MatrixSet {
    mode: MatrixMode,
    model_view: MatrixStack,
    projection: MatrixStack,
    texture: MatrixStack,
    derived: Derived,
    dirty: bool,
}

impl Default for MatrixSet {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl MatrixSet {
    pub fn new(cfg: &Config) -> Self {
        Self {
            mode: MatrixMode::ModelView,
            model_view: MatrixStack::new(MatrixMode::ModelView, cfg.modelview_stack_depth),
            projection: MatrixStack::new(MatrixMode::Projection, cfg.projection_stack_depth),
            texture: MatrixStack::new(MatrixMode::Texture, cfg.texture_stack_depth),
            derived: Derived {
                model_projection: Matrix4::identity(),
                model_view_inv: Matrix4::identity(),
                texture_identity: true,
            },
            dirty: false,
        }
    }

    pub fn mode(&self) -> MatrixMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: MatrixMode) {
        self.mode = mode;
    }

    pub fn stack(&self, mode: MatrixMode) -> &MatrixStack {
        match mode {
            MatrixMode::ModelView => &self.model_view,
            MatrixMode::Projection => &self.projection,
            MatrixMode::Texture => &self.texture,
        }
    }

    fn active_mut(&mut self) -> &mut MatrixStack {
        match self.mode {
            MatrixMode::ModelView => &mut self.model_view,
            MatrixMode::Projection => &mut self.projection,
            MatrixMode::Texture => &mut self.texture,
        }
    }

    pub fn model_view(&self) -> &Matrix4 {
        self.model_view.top()
    }

    pub fn projection(&self) -> &Matrix4 {
        self.projection.top()
    }

    pub fn texture(&self) -> &Matrix4 {
        self.texture.top()
    }

    /// Whether the derived matrices are stale.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn load(&mut self, m: Matrix4) {
        self.active_mut().top = m;
        self.dirty = true;
    }

    pub fn load_identity(&mut self) {
        self.load(Matrix4::identity());
    }

    /// Post-multiplies the current matrix: `top = top * m`.
    pub fn multiply(&mut self, m: &Matrix4) {
        let top = &mut self.active_mut().top;
        *top *= m;
        self.dirty = true;
    }

    /// Duplicates the top of the active stack.
    ///
    /// The current matrix does not change, so the dirty flag is left alone.
    pub fn push(&mut self) -> Result<()> {
        self.active_mut().push()
    }

    pub fn pop(&mut self) -> Result<()> {
        if self.active_mut().pop()? {
            self.dirty = true;
        }
        Ok(())
    }

    pub fn translate(&mut self, x: f32, y: f32, z: f32) {
        self.multiply(&Matrix4::new_translation(&Vector3::new(x, y, z)));
    }

    pub fn scale(&mut self, x: f32, y: f32, z: f32) {
        self.multiply(&Matrix4::new_nonuniform_scaling(&Vector3::new(x, y, z)));
    }

    /// Rotates by `angle` degrees around the given axis. A zero axis is a no-op.
    pub fn rotate(&mut self, angle: f32, x: f32, y: f32, z: f32) {
        let Some(axis) = na::Unit::try_new(Vector3::new(x, y, z), f32::EPSILON) else {
            return;
        };
        let rot = na::Rotation3::from_axis_angle(&axis, angle.to_radians());
        self.multiply(&rot.to_homogeneous());
    }

    pub fn frustum(
        &mut self,
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    ) -> Result<()> {
        if near <= 0.0 || far <= 0.0 || left == right || bottom == top || near == far {
            return Err(Error::InvalidValue("frustum"));
        }

        let x = (2.0 * near) / (right - left);
        let y = (2.0 * near) / (top - bottom);
        let a = (right + left) / (right - left);
        let b = (top + bottom) / (top - bottom);
        let c = -(far + near) / (far - near);
        let d = -(2.0 * far * near) / (far - near);

        #[rustfmt::skip]
        let m = na::matrix![
            x,   0.0, a,    0.0;
            0.0, y,   b,    0.0;
            0.0, 0.0, c,    d;
            0.0, 0.0, -1.0, 0.0
        ];

        self.multiply(&m);
        Ok(())
    }

    pub fn ortho(
        &mut self,
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    ) -> Result<()> {
        if left == right || bottom == top || near == far {
            return Err(Error::InvalidValue("ortho"));
        }

        let rl = right - left;
        let tb = top - bottom;
        let fnr = far - near;

        #[rustfmt::skip]
        let m = na::matrix![
            2.0 / rl, 0.0,      0.0,        -(right + left) / rl;
            0.0,      2.0 / tb, 0.0,        -(top + bottom) / tb;
            0.0,      0.0,      -2.0 / fnr, -(far + near) / fnr;
            0.0,      0.0,      0.0,        1.0
        ];

        self.multiply(&m);
        Ok(())
    }

    fn refresh(&mut self) {
        if !self.dirty {
            return;
        }

        let mv = *self.model_view.top();
        self.derived.model_projection = self.projection.top() * mv;
        self.derived.model_view_inv = mv.try_inverse().unwrap_or_else(|| {
            log::debug!("singular modelview matrix, normals will not be transformed");
            Matrix4::identity()
        });
        self.derived.texture_identity = *self.texture.top() == Matrix4::identity();
        self.dirty = false;
    }

    /// `projection * modelview`, recomputed if stale.
    pub fn model_projection(&mut self) -> &Matrix4 {
        self.refresh();
        &self.derived.model_projection
    }

    /// Inverse of the modelview matrix, recomputed if stale.
    pub fn model_view_inverse(&mut self) -> &Matrix4 {
        self.refresh();
        &self.derived.model_view_inv
    }

    /// Matrix that takes object space normals into eye space.
    pub fn normal_matrix(&mut self) -> Matrix3 {
        self.model_view_inverse()
            .fixed_view::<3, 3>(0, 0)
            .transpose()
    }

    /// Whether texture coordinates can skip the texture matrix.
    pub fn texture_is_identity(&mut self) -> bool {
        self.refresh();
        self.derived.texture_identity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::*;
    use crate::Vector4;

    #[test]
    fn push_pop_restores_matrix_and_flag() {
        let mut set = MatrixSet::default();
        set.translate(1.0, 2.0, 3.0);
        set.model_projection();
        assert!(!set.is_dirty());

        let before = *set.model_view();
        set.push().unwrap();
        set.pop().unwrap();
        assert!(approx_mat(&before, set.model_view()));
        assert!(!set.is_dirty());

        set.scale(2.0, 2.0, 2.0);
        assert!(set.is_dirty());
        set.push().unwrap();
        set.pop().unwrap();
        assert!(set.is_dirty());
    }

    #[test]
    fn push_pop_restores_every_stack() {
        let mut set = MatrixSet::default();

        for mode in [MatrixMode::ModelView, MatrixMode::Projection, MatrixMode::Texture] {
            set.set_mode(mode);
            set.translate(1.0, 2.0, 3.0);
            let before = *set.stack(mode).top();

            set.push().unwrap();
            set.scale(2.0, 2.0, 2.0);
            set.rotate(30.0, 0.0, 0.0, 1.0);
            assert!(!approx_mat(&before, set.stack(mode).top()));
            assert_eq!(set.stack(mode).depth(), 2);

            set.pop().unwrap();
            assert!(approx_mat(&before, set.stack(mode).top()));
            assert_eq!(set.stack(mode).depth(), 1);
        }

        // Each stack only saw its own operations.
        let t = Matrix4::new_translation(&Vector3::new(1.0, 2.0, 3.0));
        assert!(approx_mat(set.model_view(), &t));
        assert!(approx_mat(set.projection(), &t));
        assert!(approx_mat(set.texture(), &t));
        assert!(!set.texture_is_identity());
    }

    #[test]
    fn pop_after_modification_restores_and_dirties() {
        let mut set = MatrixSet::default();
        set.push().unwrap();
        set.rotate(90.0, 0.0, 0.0, 1.0);
        set.model_projection();
        set.pop().unwrap();
        assert!(set.is_dirty());
        assert!(approx_mat(set.model_view(), &Matrix4::identity()));
    }

    #[test]
    fn overflow_and_underflow_have_no_effect() {
        let cfg = Config {
            projection_stack_depth: 2,
            ..Default::default()
        };
        let mut set = MatrixSet::new(&cfg);
        set.set_mode(MatrixMode::Projection);

        assert_eq!(set.pop(), Err(Error::StackUnderflow(MatrixMode::Projection)));
        set.push().unwrap();
        assert_eq!(set.push(), Err(Error::StackOverflow(MatrixMode::Projection)));
        assert_eq!(set.stack(MatrixMode::Projection).depth(), 2);
        assert_eq!(set.stack(MatrixMode::ModelView).depth(), 1);
    }

    #[test]
    fn model_projection_is_lazy() {
        let mut set = MatrixSet::default();
        set.set_mode(MatrixMode::Projection);
        set.scale(2.0, 2.0, 2.0);
        set.set_mode(MatrixMode::ModelView);
        set.translate(1.0, 0.0, 0.0);
        assert!(set.is_dirty());

        let p = set.model_projection() * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert!(!set.is_dirty());
        assert!(approx(p.x, 2.0));
        assert!(approx(p.w, 1.0));
    }

    #[test]
    fn rotate_follows_right_hand_rule() {
        let mut set = MatrixSet::default();
        set.rotate(90.0, 0.0, 0.0, 1.0);
        let v = set.model_view() * Vector4::new(1.0, 0.0, 0.0, 1.0);
        assert!(approx(v.x, 0.0));
        assert!(approx(v.y, 1.0));

        let before = *set.model_view();
        set.rotate(45.0, 0.0, 0.0, 0.0);
        assert_eq!(before, *set.model_view());
    }

    #[test]
    fn frustum_maps_near_plane_to_minus_one() {
        let mut set = MatrixSet::default();
        set.set_mode(MatrixMode::Projection);
        set.frustum(-1.0, 1.0, -1.0, 1.0, 1.0, 10.0).unwrap();

        let near = set.projection() * Vector4::new(1.0, 1.0, -1.0, 1.0);
        assert!(approx(near.x / near.w, 1.0));
        assert!(approx(near.z / near.w, -1.0));

        let far = set.projection() * Vector4::new(0.0, 0.0, -10.0, 1.0);
        assert!(approx(far.z / far.w, 1.0));

        assert_eq!(
            set.frustum(-1.0, 1.0, -1.0, 1.0, 0.0, 10.0),
            Err(Error::InvalidValue("frustum"))
        );
    }

    #[test]
    fn ortho_maps_box_to_unit_cube() {
        let mut set = MatrixSet::default();
        set.ortho(0.0, 10.0, 0.0, 20.0, -1.0, 1.0).unwrap();
        let v = set.model_view() * Vector4::new(10.0, 0.0, 1.0, 1.0);
        assert!(approx(v.x, 1.0));
        assert!(approx(v.y, -1.0));
        assert!(approx(v.z, -1.0));
        assert!(set.ortho(1.0, 1.0, 0.0, 1.0, 0.0, 1.0).is_err());
    }

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let mut set = MatrixSet::default();
        set.scale(2.0, 1.0, 1.0);
        let n = set.normal_matrix() * Vector3::new(1.0, 1.0, 0.0);
        assert!(approx(n.x, 0.5));
        assert!(approx(n.y, 1.0));
    }

    #[test]
    fn texture_identity_tracking() {
        let mut set = MatrixSet::default();
        assert!(set.texture_is_identity());
        set.set_mode(MatrixMode::Texture);
        set.translate(0.5, 0.0, 0.0);
        assert!(!set.texture_is_identity());
        set.load_identity();
        assert!(set.texture_is_identity());
    }
}
