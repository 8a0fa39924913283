//! Resource module
//!
//! Plain-data resources consumed by the renderer: geometry (already-decoded
//! vertex/index buffers), materials (shading model + render flags), textures
//! (already-decoded pixel buffers), and lights. The core never parses file
//! formats — providers hand over decoded data.

mod geometry;
mod light;
mod material;
mod texture;

pub use geometry::{
    Aabb, BoundingSphere, Geometry, GeometryDesc, GeometryGroup, GeometryKey,
};
pub use light::{
    DirectionalLight, HemisphereLight, LightCounts, LightList, PointLight, SpotLight,
};
pub use material::{
    BasicParams, Blending, GlossyParams, Material, MaterialId, MaterialKey, MatteParams,
    RenderFlags, ShadingModel, ShadingTag, Side, StandardParams, ToonParams,
};
pub use texture::{PixelFormat, Texture, TextureDesc, TextureKey};
