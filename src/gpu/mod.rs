//! GPU boundary module
//!
//! An OpenGL-style immediate-state device abstraction: bind-before-use
//! semantics, global (not per-draw) blend/depth/stencil flags, program
//! objects with named uniform locations obtained by reflection after
//! link, and draw calls parameterized by vertex or index ranges.
//!
//! The state diff engine and program cache are the sole callers of this
//! boundary. Backend crates implement [`GpuDevice`]; tests use the
//! built-in [`mock_device::MockDevice`].

#[cfg(test)]
pub mod mock_device;

use crate::error::ShaderStage;
use crate::resource::PixelFormat;

// ===== HANDLES =====

/// Driver-side shader object id
pub type ShaderId = u32;
/// Driver-side linked program id
pub type ProgramId = u32;
/// Driver-side buffer id
pub type BufferId = u32;
/// Driver-side texture id
pub type TextureId = u32;

// ===== STATE VALUE TYPES =====

/// Toggleable fixed-function capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Blend,
    DepthTest,
    StencilTest,
    CullFace,
    PolygonOffsetFill,
    SampleAlphaToCoverage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendEquation {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstColor,
    OneMinusDstColor,
    DstAlpha,
    OneMinusDstAlpha,
}

/// Comparison function for depth and stencil tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareFunc {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StencilOp {
    Keep,
    Zero,
    Replace,
    Increment,
    IncrementWrap,
    Decrement,
    DecrementWrap,
    Invert,
}

/// Full stencil configuration as carried on render flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StencilState {
    pub func: CompareFunc,
    pub reference: i32,
    pub read_mask: u32,
    pub write_mask: u32,
    pub fail_op: StencilOp,
    pub zfail_op: StencilOp,
    pub zpass_op: StencilOp,
}

/// Which faces are discarded by culling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullFace {
    Front,
    Back,
}

/// Triangle winding considered front-facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrontFace {
    CounterClockwise,
    Clockwise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolygonMode {
    Fill,
    Line,
}

/// Per-channel color write mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorMask {
    pub r: bool,
    pub g: bool,
    pub b: bool,
    pub a: bool,
}

impl ColorMask {
    pub const ALL: ColorMask = ColorMask { r: true, g: true, b: true, a: true };
}

/// Description of one vertex attribute slot inside an interleaved buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributePointer {
    /// Attribute location in the program
    pub location: u32,
    /// Number of float components (1-4)
    pub components: u32,
    /// Byte stride between consecutive vertices
    pub stride: u32,
    /// Byte offset of this attribute within a vertex
    pub offset: u32,
}

// ===== UNIFORM VALUES =====

/// A value uploaded into a named uniform slot of the bound program.
///
/// Matrix and array payloads are flat `f32` in column-major order.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Int(i32),
    Mat3([f32; 9]),
    Mat4([f32; 16]),
    /// Flattened array payload (light arrays, bone matrices)
    FloatArray(Vec<f32>),
}

/// One uniform discovered by post-link reflection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveUniform {
    pub name: String,
    pub location: i32,
}

// ===== DEVICE TRAIT =====

/// OpenGL-style immediate-state GPU device.
///
/// Compile/link return the raw driver log on failure; the program cache
/// wraps it into a structured diagnostic. All state-changing calls are
/// fire-and-forget: the driver executes asynchronously and the engine
/// never waits mid-frame.
pub trait GpuDevice {
    // ----- shaders / programs -----

    /// Compile one shader stage. Err carries the driver's compile log.
    fn compile_shader(
        &mut self,
        stage: ShaderStage,
        source: &str,
    ) -> std::result::Result<ShaderId, String>;

    /// Link a vertex+fragment pair. Err carries the driver's link log.
    fn link_program(
        &mut self,
        vertex: ShaderId,
        fragment: ShaderId,
    ) -> std::result::Result<ProgramId, String>;

    fn delete_shader(&mut self, shader: ShaderId);
    fn delete_program(&mut self, program: ProgramId);

    /// Reflection query: every active uniform of a linked program.
    fn active_uniforms(&mut self, program: ProgramId) -> Vec<ActiveUniform>;

    fn use_program(&mut self, program: ProgramId);

    /// Upload a uniform value to a location of the bound program.
    fn uniform(&mut self, location: i32, value: &UniformValue);

    // ----- buffers / attributes -----

    fn create_buffer(&mut self, data: &[u8]) -> BufferId;
    fn delete_buffer(&mut self, buffer: BufferId);
    fn bind_array_buffer(&mut self, buffer: BufferId);
    fn bind_element_buffer(&mut self, buffer: BufferId);

    /// Configure one attribute slot against the bound array buffer.
    fn attribute_pointer(&mut self, pointer: AttributePointer);

    // ----- textures -----

    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: &[u8],
    ) -> TextureId;
    fn delete_texture(&mut self, texture: TextureId);

    /// Bind a texture to a texture unit.
    fn bind_texture(&mut self, unit: u32, texture: TextureId);

    // ----- fixed-function state -----

    fn set_capability(&mut self, capability: Capability, enabled: bool);
    fn blend_equation(&mut self, equation: BlendEquation);
    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor);
    fn depth_func(&mut self, func: CompareFunc);
    fn depth_mask(&mut self, write: bool);
    fn stencil_func(&mut self, func: CompareFunc, reference: i32, mask: u32);
    fn stencil_op(&mut self, fail: StencilOp, zfail: StencilOp, zpass: StencilOp);
    fn stencil_mask(&mut self, mask: u32);
    fn cull_face(&mut self, face: CullFace);
    fn front_face(&mut self, winding: FrontFace);
    fn polygon_offset(&mut self, factor: f32, units: f32);
    fn polygon_mode(&mut self, mode: PolygonMode);
    fn color_mask(&mut self, mask: ColorMask);

    // ----- draws -----

    /// Draw from the bound array buffer.
    fn draw_arrays(&mut self, first: u32, count: u32);

    /// Draw from the bound element buffer. `first` is an index offset.
    fn draw_elements(&mut self, count: u32, first: u32);
}
