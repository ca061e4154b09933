//! Context construction parameters.

/// Initial number of vertices the begin/end accumulation buffer holds.
pub const POLYGON_MAX_VERTEX: usize = 16;

pub const MAX_MODELVIEW_STACK_DEPTH: usize = 64;
pub const MAX_PROJECTION_STACK_DEPTH: usize = 32;
pub const MAX_TEXTURE_STACK_DEPTH: usize = 32;

pub const MAX_LIGHTS: usize = 16;

/// Maximum number of specular tables kept alive at once.
pub const MAX_SPECULAR_BUFFERS: usize = 8;

/// Sizing and limits of a [`Context`](crate::Context).
///
/// Everything here is fixed for the lifetime of the context. The defaults match what the classic
/// fixed-function API guarantees, so most users never need to touch this.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    pub modelview_stack_depth: usize,
    pub projection_stack_depth: usize,
    pub texture_stack_depth: usize,
    pub max_lights: usize,
    pub specular_buffers: usize,
    pub initial_vertex_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            modelview_stack_depth: MAX_MODELVIEW_STACK_DEPTH,
            projection_stack_depth: MAX_PROJECTION_STACK_DEPTH,
            texture_stack_depth: MAX_TEXTURE_STACK_DEPTH,
            max_lights: MAX_LIGHTS,
            specular_buffers: MAX_SPECULAR_BUFFERS,
            initial_vertex_capacity: POLYGON_MAX_VERTEX,
        }
    }
}

impl Config {
    /// Parses a configuration from JSON. Missing fields take their default values.
    #[cfg(feature = "json")]
    pub fn from_json(s: &str) -> core::result::Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Returns the configuration with every limit raised to at least one.
    ///
    /// A stack needs room for its bottom matrix, and the cache needs one slot to evict into.
    pub(crate) fn sanitized(mut self) -> Self {
        self.modelview_stack_depth = self.modelview_stack_depth.max(1);
        self.projection_stack_depth = self.projection_stack_depth.max(1);
        self.texture_stack_depth = self.texture_stack_depth.max(1);
        self.specular_buffers = self.specular_buffers.max(1);
        self.initial_vertex_capacity = self.initial_vertex_capacity.max(4);
        self
    }
}
