/// Material — a closed tagged variant over the supported shading models.
///
/// The shading model tag is fixed at construction (the variant never
/// changes shape post-construction); parameters and render flags are
/// freely mutable. Every mutable accessor bumps a version counter so the
/// renderer knows to re-project the program descriptor and re-upload
/// uniforms for that material.
///
/// The set of shading models is closed on purpose: exhaustive matching
/// over the tag is what keeps the shader templates and uniform uploads
/// in sync at compile time.

use std::sync::atomic::{AtomicU32, Ordering};
use glam::Vec3;
use slotmap::new_key_type;
use crate::resource::texture::TextureKey;

new_key_type! {
    /// Stable key for a Material stored in the SceneGraph's arena.
    pub struct MaterialKey;
}

/// Monotonic per-process material identity, used as a sort key for
/// grouping draws by material.
pub type MaterialId = u32;

static NEXT_MATERIAL_ID: AtomicU32 = AtomicU32::new(1);

/// Blending mode applied when the material is transparent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Blending {
    /// Source replaces destination (blending disabled)
    Opaque,
    /// Standard alpha blending: src_alpha, one_minus_src_alpha
    Normal,
    /// Additive: src_alpha, one
    Additive,
    /// Multiplicative: zero, src_color
    Multiply,
}

/// Which triangle faces are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Cull back faces (default)
    Front,
    /// Cull front faces
    Back,
    /// No culling
    Double,
}

/// Cross-model render flags shared by every shading model.
///
/// The fixed checklist the state diff engine walks per draw: everything
/// here maps one-to-one onto a global GPU state slot.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFlags {
    pub blending: Blending,
    pub depth_test: bool,
    pub depth_write: bool,
    pub side: Side,
    pub wireframe: bool,
    /// Sorted into the transparent bucket and blended back-to-front
    pub transparent: bool,
    /// Fragments below this alpha are discarded (compiled-in alpha test)
    pub alpha_cutoff: Option<f32>,
    /// Stencil configuration; None disables the stencil test
    pub stencil: Option<crate::gpu::StencilState>,
    /// Polygon offset (factor, units); None disables the fill offset
    pub polygon_offset: Option<(f32, f32)>,
    pub color_mask: crate::gpu::ColorMask,
    pub alpha_to_coverage: bool,
}

impl Default for RenderFlags {
    fn default() -> Self {
        Self {
            blending: Blending::Opaque,
            depth_test: true,
            depth_write: true,
            side: Side::Front,
            wireframe: false,
            transparent: false,
            alpha_cutoff: None,
            stencil: None,
            polygon_offset: None,
            color_mask: crate::gpu::ColorMask::ALL,
            alpha_to_coverage: false,
        }
    }
}

// ===== SHADING MODEL PARAMETERS =====

/// Unlit: flat color / texture, no lighting.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicParams {
    pub color: Vec3,
    pub opacity: f32,
    pub color_map: Option<TextureKey>,
    pub vertex_colors: bool,
}

impl Default for BasicParams {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            opacity: 1.0,
            color_map: None,
            vertex_colors: false,
        }
    }
}

/// Matte: diffuse-only (Lambertian) shading.
#[derive(Debug, Clone, PartialEq)]
pub struct MatteParams {
    pub color: Vec3,
    pub opacity: f32,
    pub emissive: Vec3,
    pub color_map: Option<TextureKey>,
}

impl Default for MatteParams {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            opacity: 1.0,
            emissive: Vec3::ZERO,
            color_map: None,
        }
    }
}

/// Glossy: diffuse + specular highlight (Blinn-Phong).
#[derive(Debug, Clone, PartialEq)]
pub struct GlossyParams {
    pub color: Vec3,
    pub opacity: f32,
    pub specular: Vec3,
    pub shininess: f32,
    pub color_map: Option<TextureKey>,
    pub normal_map: Option<TextureKey>,
}

impl Default for GlossyParams {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            opacity: 1.0,
            specular: Vec3::splat(0.5),
            shininess: 30.0,
            color_map: None,
            normal_map: None,
        }
    }
}

/// Standard: physically based metalness/roughness shading.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardParams {
    pub color: Vec3,
    pub opacity: f32,
    pub metalness: f32,
    pub roughness: f32,
    pub emissive: Vec3,
    /// 0.0 = opaque surface; > 0.0 sorts into the transmissive bucket
    pub transmission: f32,
    pub color_map: Option<TextureKey>,
    pub normal_map: Option<TextureKey>,
    pub emissive_map: Option<TextureKey>,
}

impl Default for StandardParams {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            opacity: 1.0,
            metalness: 0.0,
            roughness: 1.0,
            emissive: Vec3::ZERO,
            transmission: 0.0,
            color_map: None,
            normal_map: None,
            emissive_map: None,
        }
    }
}

/// Toon: quantized diffuse bands.
#[derive(Debug, Clone, PartialEq)]
pub struct ToonParams {
    pub color: Vec3,
    pub opacity: f32,
    /// Number of shading bands
    pub steps: u32,
    pub color_map: Option<TextureKey>,
}

impl Default for ToonParams {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            opacity: 1.0,
            steps: 3,
            color_map: None,
        }
    }
}

/// The closed set of shading models.
#[derive(Debug, Clone, PartialEq)]
pub enum ShadingModel {
    Basic(BasicParams),
    Matte(MatteParams),
    Glossy(GlossyParams),
    Standard(StandardParams),
    Toon(ToonParams),
}

/// Payload-free shading model tag, used in program descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShadingTag {
    Basic,
    Matte,
    Glossy,
    Standard,
    Toon,
}

impl ShadingModel {
    /// The payload-free tag for this model.
    pub fn tag(&self) -> ShadingTag {
        match self {
            ShadingModel::Basic(_) => ShadingTag::Basic,
            ShadingModel::Matte(_) => ShadingTag::Matte,
            ShadingModel::Glossy(_) => ShadingTag::Glossy,
            ShadingModel::Standard(_) => ShadingTag::Standard,
            ShadingModel::Toon(_) => ShadingTag::Toon,
        }
    }
}

// ===== MATERIAL =====

/// Material resource: shading model + shared render flags.
///
/// Immutable in shape (the shading tag never changes), mutable in
/// parameters. Mutation goes through `shading_mut` / `flags_mut`, which
/// bump the version counter consumed by dependent caches.
pub struct Material {
    id: MaterialId,
    name: String,
    shading: ShadingModel,
    flags: RenderFlags,
    version: u64,
}

impl Material {
    /// Create a material with default render flags.
    pub fn new(name: impl Into<String>, shading: ShadingModel) -> Self {
        Self {
            id: NEXT_MATERIAL_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            shading,
            flags: RenderFlags::default(),
            version: 0,
        }
    }

    /// Create a material with explicit render flags.
    pub fn with_flags(name: impl Into<String>, shading: ShadingModel, flags: RenderFlags) -> Self {
        let mut material = Self::new(name, shading);
        material.flags = flags;
        material
    }

    // ===== ACCESSORS =====

    /// Process-unique id, used as a material-major sort key.
    pub fn id(&self) -> MaterialId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shading(&self) -> &ShadingModel {
        &self.shading
    }

    pub fn flags(&self) -> &RenderFlags {
        &self.flags
    }

    /// Mutation version; dependent caches refresh when this changes.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// True if draws with this material belong in the transmissive bucket.
    pub fn is_transmissive(&self) -> bool {
        matches!(&self.shading, ShadingModel::Standard(p) if p.transmission > 0.0)
    }

    // ===== MUTATION (version-bumping) =====

    /// Mutable access to shading parameters. Bumps the version.
    ///
    /// The tag itself cannot change: callers can only mutate the payload
    /// of the existing variant.
    pub fn shading_mut(&mut self) -> &mut ShadingModel {
        self.version += 1;
        &mut self.shading
    }

    /// Mutable access to render flags. Bumps the version.
    pub fn flags_mut(&mut self) -> &mut RenderFlags {
        self.version += 1;
        &mut self.flags
    }
}

#[cfg(test)]
#[path = "material_tests.rs"]
mod tests;
