/// State diff engine — shadow copy of the GPU's global state.
///
/// Every mutation goes through a compare-then-set: the requested value is
/// checked against the shadow copy and the backend call is issued only on
/// an actual change. Rendering N objects with identical state costs O(1)
/// state calls, not O(N).
///
/// `None` in a shadow slot means "unknown": the next request always
/// issues the call. `reset` returns every slot to unknown, which is
/// required after external code touches the GPU behind the cache's back.

use crate::gpu::{
    BlendEquation, BlendFactor, BufferId, Capability, ColorMask, CompareFunc, CullFace, FrontFace,
    GpuDevice, PolygonMode, ProgramId, StencilState, TextureId,
};
use crate::resource::{Blending, RenderFlags, Side};

/// Shadow copy of bind points and fixed-function toggles.
#[derive(Debug, Default)]
pub struct StateCache {
    program: Option<ProgramId>,
    array_buffer: Option<BufferId>,
    element_buffer: Option<BufferId>,
    /// One slot per texture unit
    textures: Vec<Option<TextureId>>,

    blend_enabled: Option<bool>,
    blend_equation: Option<BlendEquation>,
    blend_func: Option<(BlendFactor, BlendFactor)>,
    depth_test: Option<bool>,
    depth_write: Option<bool>,
    depth_func: Option<CompareFunc>,
    stencil_test: Option<bool>,
    stencil: Option<StencilState>,
    cull_enabled: Option<bool>,
    cull_face: Option<CullFace>,
    front_face: Option<FrontFace>,
    polygon_offset_enabled: Option<bool>,
    polygon_offset: Option<(f32, f32)>,
    polygon_mode: Option<PolygonMode>,
    color_mask: Option<ColorMask>,
    alpha_to_coverage: Option<bool>,
}

impl StateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget every shadowed value. The next request on each slot will
    /// unconditionally issue the backend call.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    // A deleted object's id can be recycled by the backend for a new
    // object. The matching shadow slot must be forgotten on delete or
    // the compare-then-set would wrongly skip the next bind.

    pub fn forget_program(&mut self, program: ProgramId) {
        if self.program == Some(program) {
            self.program = None;
        }
    }

    pub fn forget_buffer(&mut self, buffer: BufferId) {
        if self.array_buffer == Some(buffer) {
            self.array_buffer = None;
        }
        if self.element_buffer == Some(buffer) {
            self.element_buffer = None;
        }
    }

    pub fn forget_texture(&mut self, texture: TextureId) {
        for slot in &mut self.textures {
            if *slot == Some(texture) {
                *slot = None;
            }
        }
    }

    // ----- bind points -----

    pub fn use_program(&mut self, device: &mut dyn GpuDevice, program: ProgramId) {
        if self.program != Some(program) {
            device.use_program(program);
            self.program = Some(program);
        }
    }

    pub fn bind_array_buffer(&mut self, device: &mut dyn GpuDevice, buffer: BufferId) {
        if self.array_buffer != Some(buffer) {
            device.bind_array_buffer(buffer);
            self.array_buffer = Some(buffer);
        }
    }

    pub fn bind_element_buffer(&mut self, device: &mut dyn GpuDevice, buffer: BufferId) {
        if self.element_buffer != Some(buffer) {
            device.bind_element_buffer(buffer);
            self.element_buffer = Some(buffer);
        }
    }

    pub fn bind_texture(&mut self, device: &mut dyn GpuDevice, unit: u32, texture: TextureId) {
        let unit_ix = unit as usize;
        if self.textures.len() <= unit_ix {
            self.textures.resize(unit_ix + 1, None);
        }
        if self.textures[unit_ix] != Some(texture) {
            device.bind_texture(unit, texture);
            self.textures[unit_ix] = Some(texture);
        }
    }

    // ----- fixed-function slots -----

    fn set_capability(
        &mut self,
        device: &mut dyn GpuDevice,
        capability: Capability,
        slot: fn(&mut Self) -> &mut Option<bool>,
        enabled: bool,
    ) {
        if *slot(self) != Some(enabled) {
            device.set_capability(capability, enabled);
            *slot(self) = Some(enabled);
        }
    }

    pub fn set_blend_enabled(&mut self, device: &mut dyn GpuDevice, enabled: bool) {
        self.set_capability(device, Capability::Blend, |s| &mut s.blend_enabled, enabled);
    }

    pub fn set_blend(
        &mut self,
        device: &mut dyn GpuDevice,
        equation: BlendEquation,
        src: BlendFactor,
        dst: BlendFactor,
    ) {
        if self.blend_equation != Some(equation) {
            device.blend_equation(equation);
            self.blend_equation = Some(equation);
        }
        if self.blend_func != Some((src, dst)) {
            device.blend_func(src, dst);
            self.blend_func = Some((src, dst));
        }
    }

    pub fn set_depth_test(&mut self, device: &mut dyn GpuDevice, enabled: bool) {
        self.set_capability(device, Capability::DepthTest, |s| &mut s.depth_test, enabled);
    }

    pub fn set_depth_write(&mut self, device: &mut dyn GpuDevice, write: bool) {
        if self.depth_write != Some(write) {
            device.depth_mask(write);
            self.depth_write = Some(write);
        }
    }

    pub fn set_depth_func(&mut self, device: &mut dyn GpuDevice, func: CompareFunc) {
        if self.depth_func != Some(func) {
            device.depth_func(func);
            self.depth_func = Some(func);
        }
    }

    pub fn set_stencil(&mut self, device: &mut dyn GpuDevice, stencil: Option<StencilState>) {
        match stencil {
            Some(state) => {
                self.set_capability(
                    device,
                    Capability::StencilTest,
                    |s| &mut s.stencil_test,
                    true,
                );
                if self.stencil != Some(state) {
                    device.stencil_func(state.func, state.reference, state.read_mask);
                    device.stencil_op(state.fail_op, state.zfail_op, state.zpass_op);
                    device.stencil_mask(state.write_mask);
                    self.stencil = Some(state);
                }
            }
            None => {
                self.set_capability(
                    device,
                    Capability::StencilTest,
                    |s| &mut s.stencil_test,
                    false,
                );
            }
        }
    }

    pub fn set_side(&mut self, device: &mut dyn GpuDevice, side: Side) {
        let (cull, face) = match side {
            Side::Front => (true, CullFace::Back),
            Side::Back => (true, CullFace::Front),
            Side::Double => (false, CullFace::Back),
        };
        self.set_capability(device, Capability::CullFace, |s| &mut s.cull_enabled, cull);
        if cull && self.cull_face != Some(face) {
            device.cull_face(face);
            self.cull_face = Some(face);
        }
    }

    pub fn set_front_face(&mut self, device: &mut dyn GpuDevice, winding: FrontFace) {
        if self.front_face != Some(winding) {
            device.front_face(winding);
            self.front_face = Some(winding);
        }
    }

    pub fn set_polygon_offset(
        &mut self,
        device: &mut dyn GpuDevice,
        offset: Option<(f32, f32)>,
    ) {
        match offset {
            Some((factor, units)) => {
                self.set_capability(
                    device,
                    Capability::PolygonOffsetFill,
                    |s| &mut s.polygon_offset_enabled,
                    true,
                );
                if self.polygon_offset != Some((factor, units)) {
                    device.polygon_offset(factor, units);
                    self.polygon_offset = Some((factor, units));
                }
            }
            None => {
                self.set_capability(
                    device,
                    Capability::PolygonOffsetFill,
                    |s| &mut s.polygon_offset_enabled,
                    false,
                );
            }
        }
    }

    pub fn set_polygon_mode(&mut self, device: &mut dyn GpuDevice, mode: PolygonMode) {
        if self.polygon_mode != Some(mode) {
            device.polygon_mode(mode);
            self.polygon_mode = Some(mode);
        }
    }

    pub fn set_color_mask(&mut self, device: &mut dyn GpuDevice, mask: ColorMask) {
        if self.color_mask != Some(mask) {
            device.color_mask(mask);
            self.color_mask = Some(mask);
        }
    }

    pub fn set_alpha_to_coverage(&mut self, device: &mut dyn GpuDevice, enabled: bool) {
        self.set_capability(
            device,
            Capability::SampleAlphaToCoverage,
            |s| &mut s.alpha_to_coverage,
            enabled,
        );
    }

    /// Walk the full render-flags checklist for one material. Every slot
    /// is requested; the compare-then-set layer turns repeats into no-ops.
    pub fn apply_material(&mut self, device: &mut dyn GpuDevice, flags: &RenderFlags) {
        match flags.blending {
            Blending::Opaque => self.set_blend_enabled(device, false),
            Blending::Normal => {
                self.set_blend_enabled(device, true);
                self.set_blend(
                    device,
                    BlendEquation::Add,
                    BlendFactor::SrcAlpha,
                    BlendFactor::OneMinusSrcAlpha,
                );
            }
            Blending::Additive => {
                self.set_blend_enabled(device, true);
                self.set_blend(
                    device,
                    BlendEquation::Add,
                    BlendFactor::SrcAlpha,
                    BlendFactor::One,
                );
            }
            Blending::Multiply => {
                self.set_blend_enabled(device, true);
                self.set_blend(
                    device,
                    BlendEquation::Add,
                    BlendFactor::Zero,
                    BlendFactor::SrcColor,
                );
            }
        }

        self.set_depth_test(device, flags.depth_test);
        if flags.depth_test {
            self.set_depth_func(device, CompareFunc::LessEqual);
        }
        self.set_depth_write(device, flags.depth_write);
        self.set_stencil(device, flags.stencil);
        self.set_side(device, flags.side);
        // Counter-clockwise winding throughout; issued once, then shadowed
        self.set_front_face(device, FrontFace::CounterClockwise);
        self.set_polygon_offset(device, flags.polygon_offset);
        self.set_polygon_mode(
            device,
            if flags.wireframe { PolygonMode::Line } else { PolygonMode::Fill },
        );
        self.set_color_mask(device, flags.color_mask);
        self.set_alpha_to_coverage(device, flags.alpha_to_coverage);
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
