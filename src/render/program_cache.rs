/// Program cache — compiled GPU programs keyed by feature descriptor.
///
/// A ProgramDescriptor is a deterministic projection of everything that
/// changes the compiled shader text: the shading-model tag, every boolean
/// feature flag relevant to the model, the per-kind light counts (they
/// set compiled-in loop bounds), clip-plane count, tone mapping mode and
/// output color space. Two materials with the same projection share one
/// compiled program regardless of their parameter values.
///
/// Entries are reference-counted; `release` at zero deletes the GPU
/// program and evicts the entry. Compile/link failures surface a
/// structured diagnostic — there is no silent fallback shader, because
/// masking a broken shader produces worse symptoms than failing loudly.

use std::fmt::Write;
use bitflags::bitflags;
use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use crate::error::{Error, Result, ShaderStage};
use crate::engine_debug;
use crate::gpu::{GpuDevice, ProgramId, UniformValue};
use crate::resource::{LightCounts, Material, ShadingModel, ShadingTag};
use super::shader_chunks;

new_key_type! {
    /// Stable handle to a cached compiled program.
    pub struct ProgramKey;
}

bitflags! {
    /// Boolean features compiled into a program via `#define`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ProgramFeatures: u32 {
        const COLOR_MAP      = 1 << 0;
        const NORMAL_MAP     = 1 << 1;
        const EMISSIVE_MAP   = 1 << 2;
        const ALPHA_TEST     = 1 << 3;
        const VERTEX_COLORS  = 1 << 4;
        const SKINNING       = 1 << 5;
        const INSTANCING     = 1 << 6;
        const FOG            = 1 << 7;
        const SHADOWS        = 1 << 8;
        const DOUBLE_SIDED   = 1 << 9;
        const TRANSMISSION   = 1 << 10;
        const HAS_NORMALS    = 1 << 11;
        const HAS_UVS        = 1 << 12;
    }
}

/// Tone mapping applied at the end of the fragment stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToneMapping {
    None,
    Reinhard,
    Aces,
}

/// Output color space conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    Linear,
    Srgb,
}

/// Deterministic projection of a material into a program cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgramDescriptor {
    pub shading: ShadingTag,
    pub features: ProgramFeatures,
    pub lights: LightCounts,
    pub clip_planes: u32,
    pub tone_mapping: ToneMapping,
    pub output_color_space: ColorSpace,
}

impl ProgramDescriptor {
    /// Project a material (plus frame-level inputs) into a descriptor.
    ///
    /// Exhaustive over the shading models so a new model cannot forget
    /// its feature projection.
    pub fn project(
        material: &Material,
        lights: LightCounts,
        fog: bool,
        clip_planes: u32,
        tone_mapping: ToneMapping,
        output_color_space: ColorSpace,
    ) -> Self {
        let mut features = ProgramFeatures::empty();

        match material.shading() {
            ShadingModel::Basic(p) => {
                features.set(ProgramFeatures::COLOR_MAP, p.color_map.is_some());
                features.set(ProgramFeatures::VERTEX_COLORS, p.vertex_colors);
            }
            ShadingModel::Matte(p) => {
                features.set(ProgramFeatures::COLOR_MAP, p.color_map.is_some());
            }
            ShadingModel::Glossy(p) => {
                features.set(ProgramFeatures::COLOR_MAP, p.color_map.is_some());
                features.set(ProgramFeatures::NORMAL_MAP, p.normal_map.is_some());
            }
            ShadingModel::Standard(p) => {
                features.set(ProgramFeatures::COLOR_MAP, p.color_map.is_some());
                features.set(ProgramFeatures::NORMAL_MAP, p.normal_map.is_some());
                features.set(ProgramFeatures::EMISSIVE_MAP, p.emissive_map.is_some());
                features.set(ProgramFeatures::TRANSMISSION, p.transmission > 0.0);
            }
            ShadingModel::Toon(p) => {
                features.set(ProgramFeatures::COLOR_MAP, p.color_map.is_some());
            }
        }

        let flags = material.flags();
        features.set(ProgramFeatures::ALPHA_TEST, flags.alpha_cutoff.is_some());
        features.set(
            ProgramFeatures::DOUBLE_SIDED,
            flags.side == crate::resource::Side::Double,
        );
        features.set(ProgramFeatures::FOG, fog);

        // Lit models always consume normals; Basic never does
        let lit = material.shading().tag() != ShadingTag::Basic;
        features.set(ProgramFeatures::HAS_NORMALS, lit);
        features.set(
            ProgramFeatures::HAS_UVS,
            features.intersects(
                ProgramFeatures::COLOR_MAP
                    | ProgramFeatures::NORMAL_MAP
                    | ProgramFeatures::EMISSIVE_MAP,
            ),
        );

        let lights = if lit { lights } else { LightCounts::default() };

        Self {
            shading: material.shading().tag(),
            features,
            lights,
            clip_planes,
            tone_mapping,
            output_color_space,
        }
    }

    /// Synthesize the `#define` header compiled into both stages.
    pub fn defines(&self) -> String {
        let mut out = String::new();
        let flag_names = [
            (ProgramFeatures::COLOR_MAP, "COLOR_MAP"),
            (ProgramFeatures::NORMAL_MAP, "NORMAL_MAP"),
            (ProgramFeatures::EMISSIVE_MAP, "EMISSIVE_MAP"),
            (ProgramFeatures::ALPHA_TEST, "ALPHA_TEST"),
            (ProgramFeatures::VERTEX_COLORS, "VERTEX_COLORS"),
            (ProgramFeatures::SKINNING, "SKINNING"),
            (ProgramFeatures::INSTANCING, "INSTANCING"),
            (ProgramFeatures::FOG, "FOG"),
            (ProgramFeatures::SHADOWS, "SHADOWS"),
            (ProgramFeatures::DOUBLE_SIDED, "DOUBLE_SIDED"),
            (ProgramFeatures::TRANSMISSION, "TRANSMISSION"),
            (ProgramFeatures::HAS_NORMALS, "HAS_NORMALS"),
            (ProgramFeatures::HAS_UVS, "HAS_UVS"),
        ];
        for (flag, name) in flag_names {
            if self.features.contains(flag) {
                let _ = writeln!(out, "#define {}", name);
            }
        }
        let _ = writeln!(out, "#define NUM_DIR_LIGHTS {}", self.lights.directional);
        let _ = writeln!(out, "#define NUM_POINT_LIGHTS {}", self.lights.point);
        let _ = writeln!(out, "#define NUM_SPOT_LIGHTS {}", self.lights.spot);
        let _ = writeln!(out, "#define NUM_HEMI_LIGHTS {}", self.lights.hemisphere);
        let _ = writeln!(out, "#define NUM_SHADOW_MAPS {}", self.lights.shadow);
        let _ = writeln!(out, "#define NUM_CLIP_PLANES {}", self.clip_planes);
        let tone = match self.tone_mapping {
            ToneMapping::None => 0,
            ToneMapping::Reinhard => 1,
            ToneMapping::Aces => 2,
        };
        let _ = writeln!(out, "#define TONE_MAPPING {}", tone);
        if self.output_color_space == ColorSpace::Srgb {
            let _ = writeln!(out, "#define OUTPUT_SRGB");
        }
        if self.features.contains(ProgramFeatures::SKINNING) {
            let _ = writeln!(out, "#define MAX_BONES 64");
        }
        out
    }
}

/// A compiled GPU program plus its reflection and per-program caches.
pub struct CachedProgram {
    descriptor: ProgramDescriptor,
    gpu_program: ProgramId,
    /// Reflection: uniform name → GPU-side location
    uniforms: FxHashMap<String, i32>,
    /// Last-uploaded value per uniform, for upload skipping
    pub(crate) uniform_cache: FxHashMap<String, UniformValue>,
    /// Texture unit allocated per sampler uniform, stable for the
    /// program's lifetime
    texture_units: FxHashMap<String, u32>,
    next_texture_unit: u32,
    refs: u32,
}

impl CachedProgram {
    pub fn descriptor(&self) -> &ProgramDescriptor {
        &self.descriptor
    }

    pub fn gpu_program(&self) -> ProgramId {
        self.gpu_program
    }

    /// GPU-side location of a named uniform, if the program has it.
    pub fn uniform_location(&self, name: &str) -> Option<i32> {
        self.uniforms.get(name).copied()
    }

    /// Current reference count.
    pub fn refs(&self) -> u32 {
        self.refs
    }

    /// Texture unit for a sampler uniform, allocated on first use.
    pub fn texture_unit(&mut self, name: &str) -> u32 {
        if let Some(&unit) = self.texture_units.get(name) {
            return unit;
        }
        let unit = self.next_texture_unit;
        self.next_texture_unit += 1;
        self.texture_units.insert(name.to_string(), unit);
        unit
    }
}

/// Cache of compiled programs keyed by descriptor.
pub struct ProgramCache {
    programs: SlotMap<ProgramKey, CachedProgram>,
    by_descriptor: FxHashMap<ProgramDescriptor, ProgramKey>,
    /// Total compiles over the cache lifetime (diagnostics)
    compiled: u32,
}

impl ProgramCache {
    pub fn new() -> Self {
        Self {
            programs: SlotMap::with_key(),
            by_descriptor: FxHashMap::default(),
            compiled: 0,
        }
    }

    /// Return a compiled program for the descriptor, compiling on first
    /// use. Bumps the reference count on every call; pair with
    /// [`release`](Self::release).
    pub fn acquire(
        &mut self,
        device: &mut dyn GpuDevice,
        descriptor: &ProgramDescriptor,
    ) -> Result<ProgramKey> {
        if let Some(&key) = self.by_descriptor.get(descriptor) {
            self.programs[key].refs += 1;
            return Ok(key);
        }

        let defines = descriptor.defines();
        let vertex_source = format!(
            "{}{}",
            defines,
            shader_chunks::expand_includes(shader_chunks::vertex_template(descriptor.shading))?
        );
        let fragment_source = format!(
            "{}{}",
            defines,
            shader_chunks::expand_includes(shader_chunks::fragment_template(descriptor.shading))?
        );

        let vertex = device
            .compile_shader(ShaderStage::Vertex, &vertex_source)
            .map_err(|log| compile_error(ShaderStage::Vertex, &log, &vertex_source))?;
        let fragment = match device.compile_shader(ShaderStage::Fragment, &fragment_source) {
            Ok(id) => id,
            Err(log) => {
                device.delete_shader(vertex);
                return Err(compile_error(ShaderStage::Fragment, &log, &fragment_source));
            }
        };

        let program = match device.link_program(vertex, fragment) {
            Ok(id) => id,
            Err(log) => {
                device.delete_shader(vertex);
                device.delete_shader(fragment);
                return Err(compile_error(ShaderStage::Link, &log, &fragment_source));
            }
        };
        // Shader objects are no longer needed once linked
        device.delete_shader(vertex);
        device.delete_shader(fragment);

        let uniforms: FxHashMap<String, i32> = device
            .active_uniforms(program)
            .into_iter()
            .map(|u| (u.name, u.location))
            .collect();

        self.compiled += 1;
        engine_debug!("aurora3d::ProgramCache",
            "compiled {:?} program ({} uniforms)", descriptor.shading, uniforms.len());

        let key = self.programs.insert(CachedProgram {
            descriptor: descriptor.clone(),
            gpu_program: program,
            uniforms,
            uniform_cache: FxHashMap::default(),
            texture_units: FxHashMap::default(),
            next_texture_unit: 0,
            refs: 1,
        });
        self.by_descriptor.insert(descriptor.clone(), key);
        Ok(key)
    }

    /// Decrement a program's reference count; at zero the GPU program is
    /// deleted and the entry evicted. Returns true if the entry was
    /// evicted. Invalid keys are ignored (already evicted).
    pub fn release(&mut self, device: &mut dyn GpuDevice, key: ProgramKey) -> bool {
        let Some(entry) = self.programs.get_mut(key) else {
            return false;
        };
        entry.refs -= 1;
        if entry.refs > 0 {
            return false;
        }
        if let Some(entry) = self.programs.remove(key) {
            self.by_descriptor.remove(&entry.descriptor);
            device.delete_program(entry.gpu_program);
        }
        true
    }

    pub fn get(&self, key: ProgramKey) -> Option<&CachedProgram> {
        self.programs.get(key)
    }

    pub fn get_mut(&mut self, key: ProgramKey) -> Option<&mut CachedProgram> {
        self.programs.get_mut(key)
    }

    /// Number of live cached programs.
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Total compiles over the cache lifetime.
    pub fn compiled_count(&self) -> u32 {
        self.compiled
    }

    /// Delete every cached program from the GPU regardless of refcounts.
    /// Used by renderer teardown.
    pub fn dispose_all(&mut self, device: &mut dyn GpuDevice) {
        for (_, entry) in self.programs.drain() {
            device.delete_program(entry.gpu_program);
        }
        self.by_descriptor.clear();
    }
}

impl Default for ProgramCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a structured compile diagnostic with a line-windowed excerpt.
fn compile_error(stage: ShaderStage, log: &str, source: &str) -> Error {
    Error::ShaderCompile {
        stage,
        log: log.to_string(),
        excerpt: excerpt_around(source, failing_line(log)),
    }
}

/// Pull the first line number out of a driver log ("ERROR: 0:17: ...").
fn failing_line(log: &str) -> Option<usize> {
    let mut chars = log.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c == ':' {
            let digits: String = log[i + 1..]
                .chars()
                .skip_while(|c| c.is_whitespace())
                .take_while(|c| c.is_ascii_digit())
                .collect();
            if !digits.is_empty() {
                // Skip the "0:" column prefix; take the next number group
                if let Some(next_colon) = log[i + 1..].find(':') {
                    let second: String = log[i + 1 + next_colon + 1..]
                        .chars()
                        .skip_while(|c| c.is_whitespace())
                        .take_while(|c| c.is_ascii_digit())
                        .collect();
                    if !second.is_empty() {
                        return second.parse().ok();
                    }
                }
                return digits.parse().ok();
            }
        }
    }
    None
}

/// A ±3 line window around the failing line, with line numbers. Falls
/// back to the first lines of the source when the log has no line info.
/// Driver line numbers can exceed the source length (they count
/// post-preprocessed lines), so the window is clamped to the source.
fn excerpt_around(source: &str, line: Option<usize>) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let (start, end) = match line {
        Some(line) if line >= 1 && !lines.is_empty() => {
            let center = (line - 1).min(lines.len() - 1);
            (center.saturating_sub(3), (center + 4).min(lines.len()))
        }
        _ => (0, lines.len().min(8)),
    };
    let mut out = String::new();
    for (i, text) in lines[start..end].iter().enumerate() {
        let _ = writeln!(out, "{:>4} | {}", start + i + 1, text);
    }
    out
}

#[cfg(test)]
#[path = "program_cache_tests.rs"]
mod tests;
