//! Raw GL-style identifiers.
//!
//! The typed API does not need these, but callers that forward numeric identifiers (bindings,
//! recorded streams) can convert them with `TryFrom<u32>`. Unknown values produce
//! [`Error::InvalidEnum`]. Plain `TryFrom` does not touch any context; go through
//! [`Context::decode`](crate::Context::decode) to have the error recorded as well.

use crate::{
    context::{Cap, ShadeModel},
    dispatch::{DrawMode, FrontFace},
    error::Error,
    light::LightId,
    material::{ColorMaterialMode, Face},
    matrix::MatrixMode,
    vertex::PrimitiveType,
};

pub const POINTS: u32 = 0x0000;
pub const LINES: u32 = 0x0001;
pub const LINE_LOOP: u32 = 0x0002;
pub const LINE_STRIP: u32 = 0x0003;
pub const TRIANGLES: u32 = 0x0004;
pub const TRIANGLE_STRIP: u32 = 0x0005;
pub const TRIANGLE_FAN: u32 = 0x0006;
pub const QUADS: u32 = 0x0007;
pub const QUAD_STRIP: u32 = 0x0008;
pub const POLYGON: u32 = 0x0009;

pub const CW: u32 = 0x0900;
pub const CCW: u32 = 0x0901;

pub const FRONT: u32 = 0x0404;
pub const BACK: u32 = 0x0405;
pub const FRONT_AND_BACK: u32 = 0x0408;

pub const CULL_FACE: u32 = 0x0B44;
pub const LIGHTING: u32 = 0x0B50;
pub const COLOR_MATERIAL: u32 = 0x0B57;
pub const DEPTH_TEST: u32 = 0x0B71;
pub const NORMALIZE: u32 = 0x0BA1;
pub const TEXTURE_2D: u32 = 0x0DE1;
pub const POLYGON_OFFSET_POINT: u32 = 0x2A01;
pub const POLYGON_OFFSET_LINE: u32 = 0x2A02;
pub const POLYGON_OFFSET_FILL: u32 = 0x8037;

pub const AMBIENT: u32 = 0x1200;
pub const DIFFUSE: u32 = 0x1201;
pub const SPECULAR: u32 = 0x1202;
pub const EMISSION: u32 = 0x1600;
pub const AMBIENT_AND_DIFFUSE: u32 = 0x1602;

pub const MODELVIEW: u32 = 0x1700;
pub const PROJECTION: u32 = 0x1701;
pub const TEXTURE: u32 = 0x1702;

pub const POINT: u32 = 0x1B00;
pub const LINE: u32 = 0x1B01;
pub const FILL: u32 = 0x1B02;

pub const FLAT: u32 = 0x1D00;
pub const SMOOTH: u32 = 0x1D01;

pub const LIGHT0: u32 = 0x4000;
/// Highest light identifier accepted by the raw conversion. The context may support fewer.
pub const LIGHT_MAX: u32 = LIGHT0 + 0x0FFF;

macro_rules! raw_enum {
    ($ty:ty { $($raw:ident => $val:expr,)* }) => {
        impl TryFrom<u32> for $ty {
            type Error = Error;

            fn try_from(v: u32) -> Result<Self, Error> {
                match v {
                    $($raw => Ok($val),)*
                    _ => Err(Error::InvalidEnum(v)),
                }
            }
        }
    };
}

raw_enum!(PrimitiveType {
    POINTS => PrimitiveType::Points,
    LINES => PrimitiveType::Lines,
    LINE_LOOP => PrimitiveType::LineLoop,
    LINE_STRIP => PrimitiveType::LineStrip,
    TRIANGLES => PrimitiveType::Triangles,
    TRIANGLE_STRIP => PrimitiveType::TriangleStrip,
    TRIANGLE_FAN => PrimitiveType::TriangleFan,
    QUADS => PrimitiveType::Quads,
    QUAD_STRIP => PrimitiveType::QuadStrip,
    POLYGON => PrimitiveType::Polygon,
});

raw_enum!(MatrixMode {
    MODELVIEW => MatrixMode::ModelView,
    PROJECTION => MatrixMode::Projection,
    TEXTURE => MatrixMode::Texture,
});

raw_enum!(Face {
    FRONT => Face::Front,
    BACK => Face::Back,
    FRONT_AND_BACK => Face::FrontAndBack,
});

raw_enum!(DrawMode {
    POINT => DrawMode::Point,
    LINE => DrawMode::Line,
    FILL => DrawMode::Fill,
});

raw_enum!(FrontFace {
    CW => FrontFace::Cw,
    CCW => FrontFace::Ccw,
});

raw_enum!(ShadeModel {
    FLAT => ShadeModel::Flat,
    SMOOTH => ShadeModel::Smooth,
});

raw_enum!(ColorMaterialMode {
    EMISSION => ColorMaterialMode::Emission,
    AMBIENT => ColorMaterialMode::Ambient,
    DIFFUSE => ColorMaterialMode::Diffuse,
    SPECULAR => ColorMaterialMode::Specular,
    AMBIENT_AND_DIFFUSE => ColorMaterialMode::AmbientAndDiffuse,
});

impl TryFrom<u32> for LightId {
    type Error = Error;

    fn try_from(v: u32) -> Result<Self, Error> {
        if (LIGHT0..=LIGHT_MAX).contains(&v) {
            Ok(LightId((v - LIGHT0) as usize))
        } else {
            Err(Error::InvalidEnum(v))
        }
    }
}

impl TryFrom<u32> for Cap {
    type Error = Error;

    fn try_from(v: u32) -> Result<Self, Error> {
        Ok(match v {
            CULL_FACE => Cap::CullFace,
            LIGHTING => Cap::Lighting,
            COLOR_MATERIAL => Cap::ColorMaterial,
            DEPTH_TEST => Cap::DepthTest,
            NORMALIZE => Cap::Normalize,
            TEXTURE_2D => Cap::Texture2d,
            POLYGON_OFFSET_POINT => Cap::PolygonOffset(DrawMode::Point),
            POLYGON_OFFSET_LINE => Cap::PolygonOffset(DrawMode::Line),
            POLYGON_OFFSET_FILL => Cap::PolygonOffset(DrawMode::Fill),
            _ => Cap::Light(LightId::try_from(v)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_values_convert() {
        assert_eq!(PrimitiveType::try_from(QUAD_STRIP), Ok(PrimitiveType::QuadStrip));
        assert_eq!(MatrixMode::try_from(TEXTURE), Ok(MatrixMode::Texture));
        assert_eq!(Cap::try_from(LIGHT0 + 3), Ok(Cap::Light(LightId(3))));
        assert_eq!(
            Cap::try_from(POLYGON_OFFSET_LINE),
            Ok(Cap::PolygonOffset(DrawMode::Line))
        );
    }

    #[test]
    fn unknown_values_are_invalid_enum() {
        assert_eq!(MatrixMode::try_from(0x1234), Err(Error::InvalidEnum(0x1234)));
        assert_eq!(Face::try_from(0), Err(Error::InvalidEnum(0)));
        assert_eq!(Cap::try_from(0xFFFF_FFFF), Err(Error::InvalidEnum(0xFFFF_FFFF)));
    }
}
