//! The render state root and the immediate mode entry points.

use alloc::boxed::Box;

use crate::{
    clip::clip_code_v,
    config::Config,
    dispatch::{Dispatcher, DrawMode, FrontFace, RasterState},
    error::{Error, Result},
    light::{shade_vertex, Light, LightId, LightModel, LightModelParam, LightParam, Lights},
    material::{ColorMaterialMode, Face, Material, MaterialParam},
    matrix::{MatrixMode, MatrixSet},
    normalize_or_keep,
    raster::Rasterizer,
    specular::SpecularCache,
    vertex::{Assembler, CurrentAttribs, PrimitiveType, Vertex},
    viewport::Viewport,
    Matrix4, Vector3, Vector4,
};

/// Toggleable pipeline features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Cap {
    CullFace,
    Lighting,
    ColorMaterial,
    DepthTest,
    Normalize,
    Texture2d,
    PolygonOffset(DrawMode),
    Light(LightId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ShadeModel {
    Flat,
    Smooth,
}

/// Called with the requested viewport size. Returns the size actually provided, or `None` if the
/// backend cannot be resized.
pub type ResizeCallback<R> = Box<dyn FnMut(&mut R, i32, i32) -> Option<(i32, i32)>>;

#[derive(Debug, Clone, Copy)]
struct ColorMaterial {
    enabled: bool,
    face: Face,
    mode: ColorMaterialMode,
}

/// Immediate mode rendering context.
///
/// Owns every piece of render state and the [`Rasterizer`] it draws into. Calls that fail leave
/// the state untouched, return the error, and also record it so that it can be polled later with
/// [`Context::take_error`].
pub struct Context<R> {
    cfg: Config,

    viewport: Viewport,
    resize: Option<ResizeCallback<R>>,

    matrices: MatrixSet,

    lighting: bool,
    lights: Lights,
    light_model: LightModel,
    materials: [Material; 2],
    color_material: ColorMaterial,
    specular: SpecularCache,
    normalize: bool,

    current: CurrentAttribs,
    assembler: Assembler,
    dispatcher: Dispatcher<R>,

    last_error: Option<Error>,
}

impl<R: Rasterizer> Context<R> {
    pub fn new(rasterizer: R) -> Self {
        Self::with_config(rasterizer, Config::default())
    }

    pub fn with_config(rasterizer: R, cfg: Config) -> Self {
        let cfg = cfg.sanitized();

        Self {
            viewport: Viewport::default(),
            resize: None,
            matrices: MatrixSet::new(&cfg),
            lighting: false,
            lights: Lights::new(cfg.max_lights),
            light_model: LightModel::default(),
            materials: [Material::default(), Material::default()],
            color_material: ColorMaterial {
                enabled: false,
                face: Face::FrontAndBack,
                mode: ColorMaterialMode::AmbientAndDiffuse,
            },
            specular: SpecularCache::new(cfg.specular_buffers),
            normalize: false,
            current: CurrentAttribs::default(),
            assembler: Assembler::new(cfg.initial_vertex_capacity),
            dispatcher: Dispatcher::new(rasterizer),
            last_error: None,
            cfg,
        }
    }

    fn report<T>(&mut self, res: Result<T>) -> Result<T> {
        if let Err(e) = &res {
            log::warn!("{e}");
            self.last_error = Some(*e);
        }
        res
    }

    /// Returns and clears the last recorded error.
    pub fn take_error(&mut self) -> Option<Error> {
        self.last_error.take()
    }

    pub fn last_error(&self) -> Option<Error> {
        self.last_error
    }

    /// Converts a raw identifier into its typed form.
    ///
    /// Unknown identifiers are recorded like any other error, so callers forwarding numeric
    /// streams see them through [`Context::take_error`].
    pub fn decode<T: TryFrom<u32, Error = Error>>(&mut self, raw: u32) -> Result<T> {
        self.report(T::try_from(raw))
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn rasterizer(&self) -> &R {
        &self.dispatcher.rasterizer
    }

    pub fn rasterizer_mut(&mut self) -> &mut R {
        &mut self.dispatcher.rasterizer
    }

    pub fn into_rasterizer(self) -> R {
        self.dispatcher.rasterizer
    }

    pub fn matrices(&self) -> &MatrixSet {
        &self.matrices
    }

    pub fn lights(&self) -> &Lights {
        &self.lights
    }

    pub fn light_state(&self, id: LightId) -> Option<&Light> {
        self.lights.get(id)
    }

    pub fn light_model_state(&self) -> &LightModel {
        &self.light_model
    }

    /// Material of a face. `FrontAndBack` returns the front material.
    pub fn material_state(&self, face: Face) -> &Material {
        match face {
            Face::Back => &self.materials[1],
            _ => &self.materials[0],
        }
    }

    pub fn specular_cache(&self) -> &SpecularCache {
        &self.specular
    }

    pub fn viewport_state(&self) -> &Viewport {
        &self.viewport
    }

    pub fn raster_state(&self) -> &RasterState {
        &self.dispatcher.state
    }

    pub fn current(&self) -> &CurrentAttribs {
        &self.current
    }

    /// Primitive type of the open bracket.
    pub fn primitive(&self) -> Option<PrimitiveType> {
        self.assembler.primitive()
    }

    /* Matrices */

    pub fn matrix_mode(&mut self, mode: MatrixMode) {
        self.matrices.set_mode(mode);
    }

    pub fn load_matrix(&mut self, m: Matrix4) {
        self.matrices.load(m);
    }

    pub fn load_identity(&mut self) {
        self.matrices.load_identity();
    }

    pub fn mult_matrix(&mut self, m: &Matrix4) {
        self.matrices.multiply(m);
    }

    pub fn push_matrix(&mut self) -> Result<()> {
        let res = self.matrices.push();
        self.report(res)
    }

    pub fn pop_matrix(&mut self) -> Result<()> {
        let res = self.matrices.pop();
        self.report(res)
    }

    /// Rotates by `angle` degrees around `(x, y, z)`.
    pub fn rotate(&mut self, angle: f32, x: f32, y: f32, z: f32) {
        self.matrices.rotate(angle, x, y, z);
    }

    pub fn scale(&mut self, x: f32, y: f32, z: f32) {
        self.matrices.scale(x, y, z);
    }

    pub fn translate(&mut self, x: f32, y: f32, z: f32) {
        self.matrices.translate(x, y, z);
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
        let res = self.matrices.frustum(left, right, bottom, top, near, far);
        self.report(res)
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
        let res = self.matrices.ortho(left, right, bottom, top, near, far);
        self.report(res)
    }

    /* Lighting and materials */

    /// Sets a light parameter. Positions and directions are taken through the current modelview
    /// matrix.
    pub fn light(&mut self, id: LightId, param: LightParam) -> Result<()> {
        let mv = *self.matrices.model_view();
        let res = self.lights.set(id, param, &mv);
        self.report(res)
    }

    pub fn light_model(&mut self, param: LightModelParam) {
        self.light_model.set(param);
    }

    pub fn material(&mut self, face: Face, param: MaterialParam) -> Result<()> {
        let res = face
            .indices()
            .iter()
            .try_for_each(|i| self.materials[*i].set(param));
        self.report(res)
    }

    /// Selects which material components follow [`Context::color`] while
    /// [`Cap::ColorMaterial`] is enabled.
    pub fn color_material(&mut self, face: Face, mode: ColorMaterialMode) {
        self.color_material.face = face;
        self.color_material.mode = mode;
    }

    /* Capabilities and raster state */

    pub fn enable(&mut self, cap: Cap) -> Result<()> {
        self.set_cap(cap, true)
    }

    pub fn disable(&mut self, cap: Cap) -> Result<()> {
        self.set_cap(cap, false)
    }

    fn set_cap(&mut self, cap: Cap, on: bool) -> Result<()> {
        let state = &mut self.dispatcher.state;

        match cap {
            Cap::CullFace => state.cull_enabled = on,
            Cap::Lighting => self.lighting = on,
            Cap::ColorMaterial => self.color_material.enabled = on,
            Cap::DepthTest => state.depth_test = on,
            Cap::Normalize => self.normalize = on,
            Cap::Texture2d => state.texture_2d = on,
            Cap::PolygonOffset(mode) => state.offset.set_enabled(mode, on),
            Cap::Light(id) => {
                let res = self.lights.set_enabled(id, on);
                return self.report(res);
            }
        }

        Ok(())
    }

    pub fn is_enabled(&self, cap: Cap) -> bool {
        let state = &self.dispatcher.state;

        match cap {
            Cap::CullFace => state.cull_enabled,
            Cap::Lighting => self.lighting,
            Cap::ColorMaterial => self.color_material.enabled,
            Cap::DepthTest => state.depth_test,
            Cap::Normalize => self.normalize,
            Cap::Texture2d => state.texture_2d,
            Cap::PolygonOffset(mode) => state.offset.enabled(mode),
            Cap::Light(id) => self.lights.get(id).map_or(false, Light::is_enabled),
        }
    }

    pub fn cull_face(&mut self, face: Face) {
        self.dispatcher.state.cull_face = face;
    }

    pub fn front_face(&mut self, front: FrontFace) {
        self.dispatcher.state.front_face = front;
    }

    pub fn polygon_mode(&mut self, face: Face, mode: DrawMode) {
        for i in face.indices() {
            self.dispatcher.state.polygon_mode[*i] = mode;
        }
    }

    pub fn shade_model(&mut self, model: ShadeModel) {
        self.dispatcher.state.shade_model = model;
    }

    pub fn polygon_offset(&mut self, factor: f32, units: f32) {
        let offset = &mut self.dispatcher.state.offset;
        offset.factor = factor;
        offset.units = units;
    }

    /// Binds a texture name for textured fills. `0` unbinds.
    pub fn bind_texture(&mut self, texture: u32) {
        self.dispatcher.state.bound_texture = texture;
    }

    /* Viewport */

    /// Sets the device rectangle. With a resize callback installed, the callback gets to adjust
    /// (or refuse) the size first.
    pub fn viewport(&mut self, x: i32, y: i32, w: i32, h: i32) -> Result<()> {
        let res = self.try_viewport(x, y, w, h);
        self.report(res)
    }

    fn try_viewport(&mut self, x: i32, y: i32, w: i32, h: i32) -> Result<()> {
        if w <= 0 || h <= 0 {
            return Err(Error::InvalidValue("viewport"));
        }

        let (_, _, cur_w, cur_h) = self.viewport.rect();

        let (w, h) = match &mut self.resize {
            Some(resize) if (w, h) != (cur_w, cur_h) => {
                resize(&mut self.dispatcher.rasterizer, w, h)
                    .ok_or(Error::ResizeFailed { width: w, height: h })?
            }
            _ => (w, h),
        };

        self.viewport.set(x, y, w, h)
    }

    pub fn set_resize_callback(
        &mut self,
        cb: impl FnMut(&mut R, i32, i32) -> Option<(i32, i32)> + 'static,
    ) {
        self.resize = Some(Box::new(cb));
    }

    pub fn clear_resize_callback(&mut self) {
        self.resize = None;
    }

    /* Vertex attributes */

    pub fn normal(&mut self, x: f32, y: f32, z: f32) {
        self.current.normal = Vector3::new(x, y, z);
    }

    pub fn tex_coord(&mut self, s: f32, t: f32, r: f32, q: f32) {
        self.current.tex_coord = Vector4::new(s, t, r, q);
    }

    /// Sets the current color, and the tracked material components if color material is on.
    pub fn color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        let c = Vector4::new(r, g, b, a);
        self.current.color = c;

        if self.color_material.enabled {
            let mode = self.color_material.mode;
            for i in self.color_material.face.indices() {
                self.materials[*i].set_color(mode, c);
            }
        }
    }

    pub fn edge_flag(&mut self, flag: bool) {
        self.current.edge_flag = flag;
    }

    /* Primitives */

    pub fn begin(&mut self, ty: PrimitiveType) -> Result<()> {
        if self.assembler.primitive().is_some() {
            return self.report(Err(Error::BracketMisuse("begin")));
        }

        self.viewport.eval();
        self.assembler.begin(ty);

        Ok(())
    }

    pub fn end(&mut self) -> Result<()> {
        let Some(ty) = self.assembler.primitive() else {
            return self.report(Err(Error::BracketMisuse("end")));
        };

        if let Some(prim) = self.assembler.end() {
            self.dispatcher.submit(ty, prim, &self.viewport);
        }

        Ok(())
    }

    pub fn vertex(&mut self, x: f32, y: f32, z: f32, w: f32) -> Result<()> {
        let Some(ty) = self.assembler.primitive() else {
            return self.report(Err(Error::BracketMisuse("vertex")));
        };

        let v = self.transform(Vector4::new(x, y, z, w));

        if let Some(prim) = self.assembler.push(v) {
            self.dispatcher.submit(ty, prim, &self.viewport);
        }

        Ok(())
    }

    pub fn vertex3(&mut self, x: f32, y: f32, z: f32) -> Result<()> {
        self.vertex(x, y, z, 1.0)
    }

    /// Runs a vertex through the transform and lighting stage.
    fn transform(&mut self, coord: Vector4) -> Vertex {
        let cur = &self.current;

        let mut v = Vertex {
            coord,
            normal: cur.normal,
            color: cur.color,
            tex_coord: cur.tex_coord,
            edge_flag: cur.edge_flag,
            ..Default::default()
        };

        if self.lighting {
            v.ec = self.matrices.model_view() * coord;
            v.pc = self.matrices.projection() * v.ec;

            let mut n = self.matrices.normal_matrix() * v.normal;
            if self.normalize {
                normalize_or_keep(&mut n);
            }
            v.normal = n;

            v.color = shade_vertex(
                &self.lights,
                &self.light_model,
                &self.materials,
                &mut self.specular,
                &v.ec,
                &n,
            );
        } else {
            v.pc = self.matrices.model_projection() * coord;
        }

        if self.dispatcher.state.texture_2d && !self.matrices.texture_is_identity() {
            v.tex_coord = self.matrices.texture() * v.tex_coord;
        }

        v.clip_code = clip_code_v(&v.pc);

        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        raster::{Shading, ZBufferPoint},
        test_util::*,
    };
    use alloc::vec::Vec;

    #[derive(Default)]
    struct Tris(Vec<[ZBufferPoint; 3]>);

    impl Rasterizer for Tris {
        fn plot(&mut self, _: &ZBufferPoint) {}
        fn line(&mut self, _: &ZBufferPoint, _: &ZBufferPoint, _: bool) {}
        fn fill_triangle(&mut self, [a, b, c]: [&ZBufferPoint; 3], _: Shading) {
            self.0.push([*a, *b, *c]);
        }
    }

    fn ctx() -> Context<Tris> {
        let mut ctx = Context::new(Tris::default());
        ctx.viewport(0, 0, 32, 32).unwrap();
        ctx
    }

    #[test]
    fn bracket_misuse_is_reported_and_ignored() {
        let mut ctx = ctx();

        assert_eq!(ctx.end(), Err(Error::BracketMisuse("end")));
        assert_eq!(ctx.vertex3(0.0, 0.0, 0.0), Err(Error::BracketMisuse("vertex")));
        assert_eq!(ctx.take_error(), Some(Error::BracketMisuse("vertex")));
        assert_eq!(ctx.take_error(), None);

        ctx.begin(PrimitiveType::Triangles).unwrap();
        assert_eq!(
            ctx.begin(PrimitiveType::Points),
            Err(Error::BracketMisuse("begin"))
        );
        assert_eq!(ctx.primitive(), Some(PrimitiveType::Triangles));
        ctx.end().unwrap();
        assert_eq!(ctx.primitive(), None);
    }

    #[test]
    fn stack_errors_are_recorded() {
        let cfg = Config {
            projection_stack_depth: 2,
            ..Default::default()
        };
        let mut ctx = Context::with_config(Tris::default(), cfg);
        ctx.matrix_mode(MatrixMode::Projection);

        assert_eq!(
            ctx.pop_matrix(),
            Err(Error::StackUnderflow(MatrixMode::Projection))
        );
        ctx.push_matrix().unwrap();
        assert_eq!(
            ctx.push_matrix(),
            Err(Error::StackOverflow(MatrixMode::Projection))
        );
        assert_eq!(
            ctx.take_error(),
            Some(Error::StackOverflow(MatrixMode::Projection))
        );
    }

    #[test]
    fn vertex_snapshots_current_attributes() {
        let mut ctx = ctx();
        ctx.begin(PrimitiveType::Triangles).unwrap();
        ctx.color(1.0, 0.0, 0.0, 1.0);
        ctx.vertex3(-0.5, -0.5, 0.0).unwrap();
        ctx.color(0.0, 1.0, 0.0, 1.0);
        ctx.vertex3(0.5, -0.5, 0.0).unwrap();
        ctx.vertex3(0.0, 0.5, 0.0).unwrap();
        ctx.end().unwrap();

        let [a, b, c] = ctx.rasterizer().0[0];
        assert!(a.r > a.g);
        assert!(b.g > b.r);
        assert_eq!((b.r, b.g), (c.r, c.g));
    }

    #[test]
    fn color_material_tracks_color() {
        let mut ctx = ctx();
        ctx.enable(Cap::ColorMaterial).unwrap();
        ctx.color_material(Face::Front, ColorMaterialMode::Diffuse);
        ctx.color(0.1, 0.2, 0.3, 1.0);

        assert_eq!(
            ctx.material_state(Face::Front).diffuse(),
            Vector4::new(0.1, 0.2, 0.3, 1.0)
        );
        assert_eq!(
            ctx.material_state(Face::Back).diffuse(),
            Material::default().diffuse()
        );
    }

    #[test]
    fn material_validation_applies_to_both_faces() {
        let mut ctx = ctx();
        assert!(ctx
            .material(Face::FrontAndBack, MaterialParam::Shininess(500.0))
            .is_err());
        ctx.material(Face::FrontAndBack, MaterialParam::Shininess(10.0))
            .unwrap();
        assert_eq!(ctx.material_state(Face::Back).shininess(), 10.0);
    }

    #[test]
    fn light_enable_goes_through_caps() {
        let mut ctx = ctx();
        ctx.enable(Cap::Light(LightId(2))).unwrap();
        assert!(ctx.is_enabled(Cap::Light(LightId(2))));
        assert_eq!(ctx.lights().enabled_ids().count(), 1);

        assert!(ctx.enable(Cap::Light(LightId(100))).is_err());
        assert!(!ctx.is_enabled(Cap::Light(LightId(100))));
    }

    #[test]
    fn resize_callback_adjusts_viewport() {
        let mut ctx = Context::new(Tris::default());
        ctx.set_resize_callback(|_, w, h| if w > 100 { None } else { Some((w & !3, h)) });

        ctx.viewport(0, 0, 33, 20).unwrap();
        assert_eq!(ctx.viewport_state().rect(), (0, 0, 32, 20));

        assert_eq!(
            ctx.viewport(0, 0, 200, 20),
            Err(Error::ResizeFailed {
                width: 200,
                height: 20
            })
        );
        assert_eq!(ctx.viewport_state().rect(), (0, 0, 32, 20));
        assert!(ctx.viewport(0, 0, 0, 20).is_err());
    }

    #[test]
    fn light_position_uses_current_modelview() {
        let mut ctx = ctx();
        ctx.translate(1.0, 2.0, 3.0);
        ctx.light(LightId(0), LightParam::Position(Vector4::new(0.0, 0.0, 0.0, 1.0)))
            .unwrap();
        let p = ctx.light_state(LightId(0)).unwrap().position();
        assert!(approx(p.x, 1.0) && approx(p.y, 2.0) && approx(p.z, 3.0));
    }

    #[test]
    fn outside_triangle_draws_nothing() {
        let mut ctx = ctx();
        ctx.begin(PrimitiveType::Triangles).unwrap();
        ctx.vertex3(2.0, 2.0, 0.0).unwrap();
        ctx.vertex3(3.0, 2.0, 0.0).unwrap();
        ctx.vertex3(2.5, 3.0, 0.0).unwrap();
        ctx.end().unwrap();
        assert!(ctx.rasterizer().0.is_empty());
        assert_eq!(ctx.take_error(), None);
    }
}
