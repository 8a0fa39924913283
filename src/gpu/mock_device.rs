/// Mock GPU device for unit tests (no GPU required).
///
/// Records every call by name, counts state-change calls separately, and
/// reflects uniforms by scanning shader sources for `uniform` declarations,
/// so the program cache and uniform uploader can be tested end to end
/// without a driver.

use rustc_hash::FxHashMap;
use crate::error::ShaderStage;
use crate::resource::PixelFormat;
use super::{
    ActiveUniform, AttributePointer, BlendEquation, BlendFactor, BufferId, Capability,
    ColorMask, CompareFunc, CullFace, FrontFace, GpuDevice, PolygonMode, ProgramId,
    ShaderId, StencilOp, TextureId, UniformValue,
};

/// Mock device that tracks every driver call without a GPU.
pub struct MockDevice {
    /// Every call, by name and formatted arguments, in order
    pub calls: Vec<String>,
    /// Fixed-function state-change calls (the diff engine's output)
    pub state_calls: u32,
    /// Uniform uploads issued
    pub uniform_calls: u32,
    pub draw_calls: u32,
    pub compiles: u32,
    pub links: u32,
    pub program_deletes: u32,
    pub buffer_deletes: u32,
    pub texture_deletes: u32,
    /// When set, compiling this stage fails with the given log
    pub fail_compile: Option<(ShaderStage, String)>,
    /// When set, linking fails with the given log
    pub fail_link: Option<String>,
    next_id: u32,
    /// Uniform names scanned from each compiled shader source
    shader_uniforms: FxHashMap<ShaderId, Vec<String>>,
    /// Reflection table per linked program
    program_uniforms: FxHashMap<ProgramId, Vec<ActiveUniform>>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            state_calls: 0,
            uniform_calls: 0,
            draw_calls: 0,
            compiles: 0,
            links: 0,
            program_deletes: 0,
            buffer_deletes: 0,
            texture_deletes: 0,
            fail_compile: None,
            fail_link: None,
            next_id: 1,
            shader_uniforms: FxHashMap::default(),
            program_uniforms: FxHashMap::default(),
        }
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn record(&mut self, call: String) {
        self.calls.push(call);
    }

    fn record_state(&mut self, call: String) {
        self.state_calls += 1;
        self.calls.push(call);
    }

    /// Scan a GLSL source for `uniform <type> <name>;` declarations.
    fn scan_uniforms(source: &str) -> Vec<String> {
        let mut names = Vec::new();
        for line in source.lines() {
            let line = line.trim();
            if let Some(rest) = line.strip_prefix("uniform ") {
                // "uniform vec3 diffuse;" / "uniform vec3 colors[NUM];"
                let mut words = rest.split_whitespace();
                let _ty = words.next();
                if let Some(name) = words.next() {
                    let name = name
                        .trim_end_matches(';')
                        .split('[')
                        .next()
                        .unwrap_or("")
                        .to_string();
                    if !name.is_empty() && !names.contains(&name) {
                        names.push(name);
                    }
                }
            }
        }
        names
    }
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuDevice for MockDevice {
    fn compile_shader(
        &mut self,
        stage: ShaderStage,
        source: &str,
    ) -> std::result::Result<ShaderId, String> {
        self.compiles += 1;
        self.record(format!("compile_shader({})", stage));
        if let Some((fail_stage, log)) = &self.fail_compile {
            if *fail_stage == stage {
                return Err(log.clone());
            }
        }
        let id = self.next_id();
        self.shader_uniforms.insert(id, Self::scan_uniforms(source));
        Ok(id)
    }

    fn link_program(
        &mut self,
        vertex: ShaderId,
        fragment: ShaderId,
    ) -> std::result::Result<ProgramId, String> {
        self.links += 1;
        self.record(format!("link_program({}, {})", vertex, fragment));
        if let Some(log) = &self.fail_link {
            return Err(log.clone());
        }
        let id = self.next_id();
        let mut uniforms: Vec<ActiveUniform> = Vec::new();
        for shader in [vertex, fragment] {
            if let Some(names) = self.shader_uniforms.get(&shader) {
                for name in names {
                    if !uniforms.iter().any(|u| &u.name == name) {
                        uniforms.push(ActiveUniform {
                            name: name.clone(),
                            location: uniforms.len() as i32,
                        });
                    }
                }
            }
        }
        self.program_uniforms.insert(id, uniforms);
        Ok(id)
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        self.record(format!("delete_shader({})", shader));
        self.shader_uniforms.remove(&shader);
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.program_deletes += 1;
        self.record(format!("delete_program({})", program));
        self.program_uniforms.remove(&program);
    }

    fn active_uniforms(&mut self, program: ProgramId) -> Vec<ActiveUniform> {
        self.record(format!("active_uniforms({})", program));
        self.program_uniforms.get(&program).cloned().unwrap_or_default()
    }

    fn use_program(&mut self, program: ProgramId) {
        self.record_state(format!("use_program({})", program));
    }

    fn uniform(&mut self, location: i32, value: &UniformValue) {
        self.uniform_calls += 1;
        self.record(format!("uniform({}, {:?})", location, value));
    }

    fn create_buffer(&mut self, data: &[u8]) -> BufferId {
        let id = self.next_id();
        self.record(format!("create_buffer({} bytes) -> {}", data.len(), id));
        id
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.buffer_deletes += 1;
        self.record(format!("delete_buffer({})", buffer));
    }

    fn bind_array_buffer(&mut self, buffer: BufferId) {
        self.record_state(format!("bind_array_buffer({})", buffer));
    }

    fn bind_element_buffer(&mut self, buffer: BufferId) {
        self.record_state(format!("bind_element_buffer({})", buffer));
    }

    fn attribute_pointer(&mut self, pointer: AttributePointer) {
        self.record_state(format!(
            "attribute_pointer(loc={}, comp={}, stride={}, offset={})",
            pointer.location, pointer.components, pointer.stride, pointer.offset
        ));
    }

    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        format: PixelFormat,
        _pixels: &[u8],
    ) -> TextureId {
        let id = self.next_id();
        self.record(format!("create_texture({}x{} {:?}) -> {}", width, height, format, id));
        id
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.texture_deletes += 1;
        self.record(format!("delete_texture({})", texture));
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        self.record_state(format!("bind_texture({}, {})", unit, texture));
    }

    fn set_capability(&mut self, capability: Capability, enabled: bool) {
        self.record_state(format!("set_capability({:?}, {})", capability, enabled));
    }

    fn blend_equation(&mut self, equation: BlendEquation) {
        self.record_state(format!("blend_equation({:?})", equation));
    }

    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor) {
        self.record_state(format!("blend_func({:?}, {:?})", src, dst));
    }

    fn depth_func(&mut self, func: CompareFunc) {
        self.record_state(format!("depth_func({:?})", func));
    }

    fn depth_mask(&mut self, write: bool) {
        self.record_state(format!("depth_mask({})", write));
    }

    fn stencil_func(&mut self, func: CompareFunc, reference: i32, mask: u32) {
        self.record_state(format!("stencil_func({:?}, {}, {:#x})", func, reference, mask));
    }

    fn stencil_op(&mut self, fail: StencilOp, zfail: StencilOp, zpass: StencilOp) {
        self.record_state(format!("stencil_op({:?}, {:?}, {:?})", fail, zfail, zpass));
    }

    fn stencil_mask(&mut self, mask: u32) {
        self.record_state(format!("stencil_mask({:#x})", mask));
    }

    fn cull_face(&mut self, face: CullFace) {
        self.record_state(format!("cull_face({:?})", face));
    }

    fn front_face(&mut self, winding: FrontFace) {
        self.record_state(format!("front_face({:?})", winding));
    }

    fn polygon_offset(&mut self, factor: f32, units: f32) {
        self.record_state(format!("polygon_offset({}, {})", factor, units));
    }

    fn polygon_mode(&mut self, mode: PolygonMode) {
        self.record_state(format!("polygon_mode({:?})", mode));
    }

    fn color_mask(&mut self, mask: ColorMask) {
        self.record_state(format!("color_mask({:?})", mask));
    }

    fn draw_arrays(&mut self, first: u32, count: u32) {
        self.draw_calls += 1;
        self.record(format!("draw_arrays({}, {})", first, count));
    }

    fn draw_elements(&mut self, count: u32, first: u32) {
        self.draw_calls += 1;
        self.record(format!("draw_elements({}, {})", count, first));
    }
}

#[cfg(test)]
#[path = "mock_device_tests.rs"]
mod tests;
