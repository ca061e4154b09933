use super::*;
use crate::{
    error::{Error, Result},
    specular::{quantize_shininess, MAX_SHININESS},
};

/// Polygon face selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Face {
    Front,
    Back,
    FrontAndBack,
}

impl Face {
    /// Index into front/back pairs of state. `FrontAndBack` yields both.
    pub(crate) fn indices(self) -> &'static [usize] {
        match self {
            Self::Front => &[0],
            Self::Back => &[1],
            Self::FrontAndBack => &[0, 1],
        }
    }
}

/// A single material parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MaterialParam {
    Emission(Vector4),
    Ambient(Vector4),
    Diffuse(Vector4),
    Specular(Vector4),
    AmbientAndDiffuse(Vector4),
    /// Specular exponent in `[0; 128]`.
    Shininess(f32),
}

/// Which material components track the current color when color material is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ColorMaterialMode {
    Emission,
    Ambient,
    Diffuse,
    Specular,
    AmbientAndDiffuse,
}

/// Surface reflectance properties.
///
/// Fields are read-only from the outside, because the material caches values derived from them.
/// Use [`Material::set`] to modify.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "MaterialDesc", into = "MaterialDesc"))]
pub struct Material {
    emission: Vector4,
    ambient: Vector4,
    diffuse: Vector4,
    specular: Vector4,
    shininess: f32,
    shininess_i: i32,
    do_specular: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self::from(MaterialDesc::default())
    }
}

impl Material {
    pub fn emission(&self) -> Vector4 {
        self.emission
    }

    pub fn ambient(&self) -> Vector4 {
        self.ambient
    }

    pub fn diffuse(&self) -> Vector4 {
        self.diffuse
    }

    pub fn specular(&self) -> Vector4 {
        self.specular
    }

    pub fn shininess(&self) -> f32 {
        self.shininess
    }

    /// Quantized shininess, used as the specular cache key.
    pub fn shininess_key(&self) -> i32 {
        self.shininess_i
    }

    /// Whether the specular term contributes anything at all.
    pub fn do_specular(&self) -> bool {
        self.do_specular
    }

    pub fn set(&mut self, param: MaterialParam) -> Result<()> {
        match param {
            MaterialParam::Emission(v) => self.set_color(ColorMaterialMode::Emission, v),
            MaterialParam::Ambient(v) => self.set_color(ColorMaterialMode::Ambient, v),
            MaterialParam::Diffuse(v) => self.set_color(ColorMaterialMode::Diffuse, v),
            MaterialParam::Specular(v) => self.set_color(ColorMaterialMode::Specular, v),
            MaterialParam::AmbientAndDiffuse(v) => {
                self.set_color(ColorMaterialMode::AmbientAndDiffuse, v)
            }
            MaterialParam::Shininess(s) => {
                if !(0.0..=MAX_SHININESS).contains(&s) {
                    return Err(Error::InvalidValue("material shininess"));
                }
                self.shininess = s;
                self.shininess_i = quantize_shininess(s);
            }
        }
        Ok(())
    }

    /// Sets the color components selected by `mode`. Any color is accepted.
    pub fn set_color(&mut self, mode: ColorMaterialMode, c: Vector4) {
        match mode {
            ColorMaterialMode::Emission => self.emission = c,
            ColorMaterialMode::Ambient => self.ambient = c,
            ColorMaterialMode::Diffuse => self.diffuse = c,
            ColorMaterialMode::Specular => {
                self.specular = c;
                self.update_specular();
            }
            ColorMaterialMode::AmbientAndDiffuse => {
                self.ambient = c;
                self.diffuse = c;
            }
        }
    }

    fn update_specular(&mut self) {
        self.do_specular = self.specular.xyz().iter().any(|v| libm::fabsf(*v) > 1e-6);
    }
}

/// Plain data form of [`Material`], used for (de)serialization.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MaterialDesc {
    pub emission: Vector4,
    pub ambient: Vector4,
    pub diffuse: Vector4,
    pub specular: Vector4,
    pub shininess: f32,
}

impl Default for MaterialDesc {
    fn default() -> Self {
        Self {
            emission: Vector4::new(0.0, 0.0, 0.0, 1.0),
            ambient: Vector4::new(0.2, 0.2, 0.2, 1.0),
            diffuse: Vector4::new(0.8, 0.8, 0.8, 1.0),
            specular: Vector4::new(0.0, 0.0, 0.0, 1.0),
            shininess: 0.0,
        }
    }
}

impl From<MaterialDesc> for Material {
    fn from(d: MaterialDesc) -> Self {
        let shininess = d.shininess.max(0.0).min(MAX_SHININESS);
        let mut ret = Self {
            emission: d.emission,
            ambient: d.ambient,
            diffuse: d.diffuse,
            specular: d.specular,
            shininess,
            shininess_i: quantize_shininess(shininess),
            do_specular: false,
        };
        ret.update_specular();
        ret
    }
}

impl From<Material> for MaterialDesc {
    fn from(m: Material) -> Self {
        Self {
            emission: m.emission,
            ambient: m.ambient,
            diffuse: m.diffuse,
            specular: m.specular,
            shininess: m.shininess,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_no_specular() {
        let m = Material::default();
        assert!(!m.do_specular());
        assert_eq!(m.shininess_key(), 0);
    }

    #[test]
    fn specular_flag_tracks_color() {
        let mut m = Material::default();
        m.set(MaterialParam::Specular(Vector4::new(0.5, 0.5, 0.5, 1.0)))
            .unwrap();
        assert!(m.do_specular());
        m.set(MaterialParam::Specular(Vector4::new(0.0, 0.0, 0.0, 1.0)))
            .unwrap();
        assert!(!m.do_specular());
    }

    #[test]
    fn shininess_out_of_range_is_rejected() {
        let mut m = Material::default();
        m.set(MaterialParam::Shininess(64.0)).unwrap();
        assert_eq!(m.shininess_key(), quantize_shininess(64.0));
        assert!(m.set(MaterialParam::Shininess(200.0)).is_err());
        assert!(m.set(MaterialParam::Shininess(-1.0)).is_err());
        assert_eq!(m.shininess(), 64.0);
    }

    #[test]
    fn ambient_and_diffuse_sets_both() {
        let mut m = Material::default();
        let c = Vector4::new(0.1, 0.2, 0.3, 1.0);
        m.set(MaterialParam::AmbientAndDiffuse(c)).unwrap();
        assert_eq!(m.ambient(), c);
        assert_eq!(m.diffuse(), c);
    }

    #[test]
    fn color_setter_only_touches_tracked_components() {
        let mut m = Material::default();
        let c = Vector4::new(0.9, 0.1, 0.1, 1.0);

        m.set_color(ColorMaterialMode::Emission, c);
        assert_eq!(m.emission(), c);
        assert_eq!(m.diffuse(), MaterialDesc::default().diffuse);

        m.set_color(ColorMaterialMode::Specular, c);
        assert!(m.do_specular());
        m.set_color(ColorMaterialMode::Specular, Vector4::zeros());
        assert!(!m.do_specular());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_recomputes_derived_fields() {
        let json = r#"{ "specular": [1.0, 1.0, 1.0, 1.0], "shininess": 32.0 }"#;
        let m: Material = serde_json::from_str(json).unwrap();
        assert!(m.do_specular());
        assert_eq!(m.shininess_key(), quantize_shininess(32.0));
        assert_eq!(m.ambient(), MaterialDesc::default().ambient);
    }
}
