//! Lights and per-vertex lighting.

use alloc::vec::Vec;

use crate::{
    enums,
    error::{Error, Result},
    material::Material,
    normalize_or_keep,
    specular::SpecularCache,
    Matrix4, Vector3, Vector4,
};

/// Index of a light, `0..max_lights`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LightId(pub usize);

/// A single light parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LightParam {
    Ambient(Vector4),
    Diffuse(Vector4),
    Specular(Vector4),
    /// Object space position, transformed by the modelview matrix current at the time of the
    /// call. `w == 0` makes a directional light.
    Position(Vector4),
    /// Object space direction, transformed by the current modelview matrix.
    SpotDirection(Vector3),
    /// `[0; 128]`.
    SpotExponent(f32),
    /// `[0; 90]` degrees, or `180` to disable the cone.
    SpotCutoff(f32),
    ConstantAttenuation(f32),
    LinearAttenuation(f32),
    QuadraticAttenuation(f32),
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Light {
    pub ambient: Vector4,
    pub diffuse: Vector4,
    pub specular: Vector4,
    position: Vector4,
    spot_direction: Vector3,
    spot_exponent: f32,
    spot_cutoff: f32,
    attenuation: [f32; 3],
    /* precomputed */
    cos_spot_cutoff: f32,
    norm_spot_direction: Vector3,
    norm_position: Vector3,
    enabled: bool,
}

impl Light {
    fn new(idx: usize) -> Self {
        let white = Vector4::new(1.0, 1.0, 1.0, 1.0);
        let black = Vector4::new(0.0, 0.0, 0.0, 1.0);
        let (diffuse, specular) = if idx == 0 {
            (white, white)
        } else {
            (black, black)
        };

        Self {
            ambient: black,
            diffuse,
            specular,
            position: Vector4::new(0.0, 0.0, 1.0, 0.0),
            spot_direction: Vector3::new(0.0, 0.0, -1.0),
            spot_exponent: 0.0,
            spot_cutoff: 180.0,
            attenuation: [1.0, 0.0, 0.0],
            cos_spot_cutoff: -1.0,
            norm_spot_direction: Vector3::new(0.0, 0.0, -1.0),
            norm_position: Vector3::new(0.0, 0.0, 1.0),
            enabled: false,
        }
    }

    /// Eye space position.
    pub fn position(&self) -> Vector4 {
        self.position
    }

    /// Eye space spot direction.
    pub fn spot_direction(&self) -> Vector3 {
        self.spot_direction
    }

    pub fn spot_exponent(&self) -> f32 {
        self.spot_exponent
    }

    pub fn spot_cutoff(&self) -> f32 {
        self.spot_cutoff
    }

    pub fn attenuation(&self) -> [f32; 3] {
        self.attenuation
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_directional(&self) -> bool {
        self.position.w == 0.0
    }

    fn set(&mut self, param: LightParam, model_view: &Matrix4) -> Result<()> {
        fn non_negative(v: f32, what: &'static str) -> Result<f32> {
            if v >= 0.0 {
                Ok(v)
            } else {
                Err(Error::InvalidValue(what))
            }
        }

        match param {
            LightParam::Ambient(v) => self.ambient = v,
            LightParam::Diffuse(v) => self.diffuse = v,
            LightParam::Specular(v) => self.specular = v,
            LightParam::Position(v) => {
                self.position = model_view * v;
                if self.position.w == 0.0 {
                    self.norm_position = self.position.xyz();
                    normalize_or_keep(&mut self.norm_position);
                }
            }
            LightParam::SpotDirection(v) => {
                self.spot_direction = model_view.fixed_view::<3, 3>(0, 0) * v;
                self.norm_spot_direction = self.spot_direction;
                normalize_or_keep(&mut self.norm_spot_direction);
            }
            LightParam::SpotExponent(v) => {
                if !(0.0..=128.0).contains(&v) {
                    return Err(Error::InvalidValue("spot exponent"));
                }
                self.spot_exponent = v;
            }
            LightParam::SpotCutoff(v) => {
                if v != 180.0 && !(0.0..=90.0).contains(&v) {
                    return Err(Error::InvalidValue("spot cutoff"));
                }
                self.spot_cutoff = v;
                self.cos_spot_cutoff = libm::cosf(v.to_radians());
            }
            LightParam::ConstantAttenuation(v) => {
                self.attenuation[0] = non_negative(v, "constant attenuation")?
            }
            LightParam::LinearAttenuation(v) => {
                self.attenuation[1] = non_negative(v, "linear attenuation")?
            }
            LightParam::QuadraticAttenuation(v) => {
                self.attenuation[2] = non_negative(v, "quadratic attenuation")?
            }
        }

        Ok(())
    }
}

/// The fixed light array, and the ordered list of enabled lights.
///
/// The enabled list always holds exactly the lights with their flag set, each once.
#[derive(Debug, Clone)]
pub struct Lights {
    lights: Vec<Light>,
    enabled: Vec<usize>,
}

impl Lights {
    pub fn new(count: usize) -> Self {
        Self {
            lights: (0..count).map(Light::new).collect(),
            enabled: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    fn index(&self, id: LightId) -> Result<usize> {
        if id.0 < self.lights.len() {
            Ok(id.0)
        } else {
            Err(Error::InvalidEnum(enums::LIGHT0 + id.0 as u32))
        }
    }

    pub fn get(&self, id: LightId) -> Option<&Light> {
        self.lights.get(id.0)
    }

    pub fn set(&mut self, id: LightId, param: LightParam, model_view: &Matrix4) -> Result<()> {
        let idx = self.index(id)?;
        self.lights[idx].set(param, model_view)
    }

    pub fn set_enabled(&mut self, id: LightId, enabled: bool) -> Result<()> {
        let idx = self.index(id)?;
        let light = &mut self.lights[idx];

        if enabled && !light.enabled {
            light.enabled = true;
            self.enabled.push(idx);
        } else if !enabled && light.enabled {
            light.enabled = false;
            self.enabled.retain(|i| *i != idx);
        }

        Ok(())
    }

    /// Ids of enabled lights, in traversal order.
    pub fn enabled_ids(&self) -> impl Iterator<Item = LightId> + '_ {
        self.enabled.iter().map(|i| LightId(*i))
    }

    pub fn enabled(&self) -> impl Iterator<Item = &Light> + '_ {
        self.enabled.iter().map(|i| &self.lights[*i])
    }
}

/// Global lighting parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LightModel {
    pub ambient: Vector4,
    /// Compute specular highlights relative to the actual eye position rather than along `-Z`.
    pub local_viewer: bool,
    /// Light back faces with the back material.
    pub two_side: bool,
}

impl Default for LightModel {
    fn default() -> Self {
        Self {
            ambient: Vector4::new(0.2, 0.2, 0.2, 1.0),
            local_viewer: false,
            two_side: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LightModelParam {
    Ambient(Vector4),
    LocalViewer(bool),
    TwoSide(bool),
}

impl LightModel {
    pub fn set(&mut self, param: LightModelParam) {
        match param {
            LightModelParam::Ambient(v) => self.ambient = v,
            LightModelParam::LocalViewer(v) => self.local_viewer = v,
            LightModelParam::TwoSide(v) => self.two_side = v,
        }
    }
}

/// Computes the lit color of a vertex.
///
/// `eye` is the eye space position and `normal` the eye space normal. `materials` holds the front
/// and back material. The result is clamped to `[0; 1]`.
///
/// With two-sided lighting the side is decided per vertex, from the normal against the view
/// direction (`+Z`, or the direction to the eye with a local viewer). Vertices whose normal faces
/// away use the back material and the negated normal. The screen space winding of the primitive
/// is not known at this stage and plays no part.
pub fn shade_vertex(
    lights: &Lights,
    model: &LightModel,
    materials: &[Material; 2],
    cache: &mut SpecularCache,
    eye: &Vector4,
    normal: &Vector3,
) -> Vector4 {
    let eye = if eye.w != 0.0 && eye.w != 1.0 {
        eye.xyz() / eye.w
    } else {
        eye.xyz()
    };

    let mut to_eye = -eye;
    normalize_or_keep(&mut to_eye);

    let mut n = *normal;
    let mut m = &materials[0];

    if model.two_side {
        let view = if model.local_viewer {
            to_eye
        } else {
            Vector3::new(0.0, 0.0, 1.0)
        };
        if n.dot(&view) < 0.0 {
            n = -n;
            m = &materials[1];
        }
    }

    let mut color = m.emission().xyz() + m.ambient().xyz().component_mul(&model.ambient.xyz());

    for l in lights.enabled() {
        let mut lc = l.ambient.xyz().component_mul(&m.ambient().xyz());

        let (d, mut att) = if l.is_directional() {
            (l.norm_position, 1.0)
        } else {
            let mut d = l.position.xyz() - eye;
            let dist = libm::sqrtf(d.dot(&d));
            if dist > 1e-3 {
                d /= dist;
            }
            let [k0, k1, k2] = l.attenuation;
            let denom = k0 + dist * (k1 + dist * k2);
            (d, if denom > 0.0 { 1.0 / denom } else { 1.0 })
        };

        if l.spot_cutoff != 180.0 {
            let dot_spot = -d.dot(&l.norm_spot_direction);
            if dot_spot < l.cos_spot_cutoff {
                continue;
            }
            if l.spot_exponent > 0.0 {
                att *= libm::powf(dot_spot, l.spot_exponent);
            }
        }

        let dot = n.dot(&d);
        if dot > 0.0 {
            lc += l.diffuse.xyz().component_mul(&m.diffuse().xyz()) * dot;

            if m.do_specular() {
                let s = if model.local_viewer {
                    d + to_eye
                } else {
                    d + Vector3::new(0.0, 0.0, 1.0)
                };

                let mut dot_spec = n.dot(&s);
                if dot_spec > 0.0 {
                    let len = libm::sqrtf(s.dot(&s));
                    if len > 1e-3 {
                        dot_spec /= len;
                    }

                    let falloff = if m.shininess_key() == 0 {
                        1.0
                    } else {
                        cache.get_buffer(m.shininess()).lookup(dot_spec)
                    };

                    lc += l.specular.xyz().component_mul(&m.specular().xyz()) * falloff;
                }
            }
        }

        color += lc * att;
    }

    let clamp = |v: f32| v.max(0.0).min(1.0);

    Vector4::new(
        clamp(color.x),
        clamp(color.y),
        clamp(color.z),
        clamp(m.diffuse().w),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{material::MaterialParam, test_util::approx};

    fn mats() -> [Material; 2] {
        [Material::default(), Material::default()]
    }

    #[test]
    fn enable_disable_keeps_list_consistent() {
        let mut lights = Lights::new(4);
        lights.set_enabled(LightId(1), true).unwrap();
        lights.set_enabled(LightId(2), true).unwrap();
        lights.set_enabled(LightId(1), true).unwrap();
        assert_eq!(lights.enabled().count(), 2);

        lights.set_enabled(LightId(1), false).unwrap();
        assert_eq!(lights.enabled_ids().collect::<Vec<_>>(), [LightId(2)]);

        lights.set_enabled(LightId(1), true).unwrap();
        assert_eq!(lights.enabled().count(), 2);
        assert_eq!(
            lights.enabled_ids().filter(|id| *id == LightId(1)).count(),
            1
        );

        for l in lights.enabled() {
            assert!(l.is_enabled());
        }
    }

    #[test]
    fn out_of_range_light_is_invalid_enum() {
        let mut lights = Lights::new(2);
        assert_eq!(
            lights.set_enabled(LightId(5), true),
            Err(Error::InvalidEnum(enums::LIGHT0 + 5))
        );
    }

    #[test]
    fn position_is_transformed_by_modelview() {
        let mut lights = Lights::new(1);
        let mv = Matrix4::new_translation(&Vector3::new(0.0, 0.0, -5.0));
        lights
            .set(LightId(0), LightParam::Position(Vector4::new(1.0, 0.0, 0.0, 1.0)), &mv)
            .unwrap();
        let p = lights.get(LightId(0)).unwrap().position();
        assert!(approx(p.x, 1.0));
        assert!(approx(p.z, -5.0));
    }

    #[test]
    fn bad_spot_cutoff_is_rejected() {
        let mut lights = Lights::new(1);
        let mv = Matrix4::identity();
        assert!(lights.set(LightId(0), LightParam::SpotCutoff(120.0), &mv).is_err());
        assert!(lights.set(LightId(0), LightParam::SpotCutoff(45.0), &mv).is_ok());
        assert!(lights.set(LightId(0), LightParam::SpotCutoff(180.0), &mv).is_ok());
    }

    #[test]
    fn directional_diffuse_matches_analytic() {
        let mut lights = Lights::new(1);
        lights.set_enabled(LightId(0), true).unwrap();
        let mut cache = SpecularCache::new(2);

        let color = shade_vertex(
            &lights,
            &LightModel::default(),
            &mats(),
            &mut cache,
            &Vector4::new(0.0, 0.0, -1.0, 1.0),
            &Vector3::new(0.0, 0.0, 1.0),
        );

        // 0.2 * 0.2 (model ambient) + 1.0 * 0.8 (diffuse, N.L = 1)
        assert!(approx(color.x, 0.84));
        assert!(approx(color.w, 1.0));
        assert_eq!(cache.computations(), 0);
    }

    #[test]
    fn spotlight_outside_cone_contributes_nothing() {
        let mut lights = Lights::new(1);
        let mv = Matrix4::identity();
        lights.set_enabled(LightId(0), true).unwrap();
        lights
            .set(LightId(0), LightParam::Position(Vector4::new(0.0, 0.0, 0.0, 1.0)), &mv)
            .unwrap();
        lights
            .set(LightId(0), LightParam::SpotDirection(Vector3::new(0.0, 0.0, -1.0)), &mv)
            .unwrap();
        lights.set(LightId(0), LightParam::SpotCutoff(10.0), &mv).unwrap();

        let mut cache = SpecularCache::new(1);
        let normal = Vector3::new(0.0, 0.0, 1.0);

        let inside = shade_vertex(
            &lights,
            &LightModel::default(),
            &mats(),
            &mut cache,
            &Vector4::new(0.0, 0.0, -2.0, 1.0),
            &normal,
        );
        let outside = shade_vertex(
            &lights,
            &LightModel::default(),
            &mats(),
            &mut cache,
            &Vector4::new(2.0, 0.0, -1.0, 1.0),
            &normal,
        );

        assert!(approx(inside.x, 0.84));
        assert!(approx(outside.x, 0.04));
    }

    #[test]
    fn spot_exponent_scales_with_angle() {
        let mut lights = Lights::new(1);
        let mv = Matrix4::identity();
        lights.set_enabled(LightId(0), true).unwrap();
        lights
            .set(LightId(0), LightParam::Position(Vector4::new(0.0, 0.0, 0.0, 1.0)), &mv)
            .unwrap();
        lights
            .set(LightId(0), LightParam::SpotDirection(Vector3::new(0.0, 0.0, -1.0)), &mv)
            .unwrap();
        lights.set(LightId(0), LightParam::SpotCutoff(90.0), &mv).unwrap();

        let mut cache = SpecularCache::new(1);
        // 45 degrees off the spot axis, normal facing the light.
        let eye = Vector4::new(1.0, 0.0, -1.0, 1.0);
        let normal = Vector3::new(-1.0, 0.0, 1.0).normalize();

        let shade = |lights: &Lights, cache: &mut SpecularCache| {
            shade_vertex(lights, &LightModel::default(), &mats(), cache, &eye, &normal)
        };

        assert!(approx(shade(&lights, &mut cache).x, 0.84));

        // cos(45)^2 = 0.5 on the diffuse term.
        lights.set(LightId(0), LightParam::SpotExponent(2.0), &mv).unwrap();
        assert!(approx(shade(&lights, &mut cache).x, 0.04 + 0.4));
    }

    #[test]
    fn attenuation_applies_to_positional_lights() {
        let mut lights = Lights::new(1);
        let mv = Matrix4::identity();
        lights.set_enabled(LightId(0), true).unwrap();
        lights
            .set(LightId(0), LightParam::Position(Vector4::new(0.0, 0.0, 0.0, 1.0)), &mv)
            .unwrap();
        lights
            .set(LightId(0), LightParam::QuadraticAttenuation(1.0), &mv)
            .unwrap();

        let mut cache = SpecularCache::new(1);
        let color = shade_vertex(
            &lights,
            &LightModel::default(),
            &mats(),
            &mut cache,
            &Vector4::new(0.0, 0.0, -1.0, 1.0),
            &Vector3::new(0.0, 0.0, 1.0),
        );

        // 1 / (1 + 0 + 1) = 0.5 attenuation on the 0.8 diffuse term.
        assert!(approx(color.x, 0.04 + 0.4));
    }

    #[test]
    fn specular_goes_through_cache() {
        let mut lights = Lights::new(1);
        lights.set_enabled(LightId(0), true).unwrap();
        let mut m = mats();
        m[0].set(MaterialParam::Specular(Vector4::new(1.0, 1.0, 1.0, 1.0)))
            .unwrap();
        m[0].set(MaterialParam::Shininess(16.0)).unwrap();

        let mut cache = SpecularCache::new(2);
        let eye = Vector4::new(0.0, 0.0, -1.0, 1.0);
        let normal = Vector3::new(0.0, 0.0, 1.0);

        let c = shade_vertex(&lights, &LightModel::default(), &m, &mut cache, &eye, &normal);
        assert_eq!(cache.computations(), 1);
        // Saturated: ambient + diffuse + full specular.
        assert!(approx(c.x, 1.0));

        shade_vertex(&lights, &LightModel::default(), &m, &mut cache, &eye, &normal);
        assert_eq!(cache.computations(), 1);
    }

    #[test]
    fn local_viewer_moves_the_highlight() {
        let mut lights = Lights::new(1);
        lights.set_enabled(LightId(0), true).unwrap();
        let mut m = mats();
        m[0].set(MaterialParam::Diffuse(Vector4::new(0.0, 0.0, 0.0, 1.0)))
            .unwrap();
        m[0].set(MaterialParam::Specular(Vector4::new(1.0, 1.0, 1.0, 1.0)))
            .unwrap();
        m[0].set(MaterialParam::Shininess(64.0)).unwrap();

        let mut cache = SpecularCache::new(2);
        // Off axis, so the direction to the eye is not +Z.
        let eye = Vector4::new(1.0, 0.0, -1.0, 1.0);
        let normal = Vector3::new(0.0, 0.0, 1.0);

        // Infinite viewer: half vector is +Z, full highlight.
        let far = shade_vertex(&lights, &LightModel::default(), &m, &mut cache, &eye, &normal);
        assert!(approx(far.x, 1.0));

        // Local viewer: N.H = cos(22.5), and cos(22.5)^64 is tiny.
        let model = LightModel {
            local_viewer: true,
            ..Default::default()
        };
        let near = shade_vertex(&lights, &model, &m, &mut cache, &eye, &normal);
        assert!(near.x > 0.04 - 1e-4 && near.x < 0.06, "{near:?}");
    }

    #[test]
    fn two_side_uses_back_material() {
        let mut lights = Lights::new(1);
        lights.set_enabled(LightId(0), true).unwrap();
        let mut m = mats();
        m[1].set(MaterialParam::Diffuse(Vector4::new(0.0, 0.5, 0.0, 1.0)))
            .unwrap();

        let model = LightModel {
            two_side: true,
            ..Default::default()
        };
        let mut cache = SpecularCache::new(1);

        let c = shade_vertex(
            &lights,
            &model,
            &m,
            &mut cache,
            &Vector4::new(0.0, 0.0, -1.0, 1.0),
            &Vector3::new(0.0, 0.0, -1.0),
        );

        assert!(approx(c.x, 0.04));
        assert!(approx(c.y, 0.04 + 0.5));
    }
}
