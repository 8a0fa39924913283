/// Renderer — per-frame orchestration.
///
/// A frame runs the fixed pipeline: propagate world transforms, extract
/// the camera frustum, cull, flatten visible nodes into sorted draw
/// records, then submit opaque, transmissive and transparent buckets in
/// that order through the state diff engine and uniform uploader.
///
/// A material whose program fails to compile is logged once, remembered
/// by id and version, and skipped on subsequent frames until the material
/// changes; the frame itself always completes. There is no fallback
/// shader.

use glam::{Mat3, Vec3};
use rustc_hash::FxHashMap;
use slotmap::Key;
use crate::engine_error;
use crate::camera::{Camera, Frustum};
use crate::error::Result;
use crate::gpu::{AttributePointer, BufferId, GpuDevice, TextureId, UniformValue};
use crate::resource::{
    Geometry, GeometryKey, LightList, Material, MaterialId, MaterialKey, ShadingModel, TextureKey,
};
use crate::scene::{NodeKey, SceneGraph};
use super::program_cache::{
    ColorSpace, ProgramCache, ProgramDescriptor, ProgramKey, ToneMapping,
};
use super::render_list::{RenderItem, RenderList};
use super::state::StateCache;
use super::uniforms::UniformUploader;

/// Linear distance fog.
#[derive(Debug, Clone, PartialEq)]
pub struct Fog {
    pub color: Vec3,
    pub near: f32,
    pub far: f32,
}

/// Frame-level settings applied to every material.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererSettings {
    pub tone_mapping: ToneMapping,
    pub output_color_space: ColorSpace,
    pub fog: Option<Fog>,
    /// Number of user clip planes compiled into programs
    pub clip_planes: u32,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            tone_mapping: ToneMapping::None,
            output_color_space: ColorSpace::Srgb,
            fog: None,
            clip_planes: 0,
        }
    }
}

/// Counters for the last completed frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Nodes that survived visibility filtering
    pub visible_nodes: usize,
    /// Draw records submitted across all buckets
    pub draw_calls: usize,
    /// Programs compiled during this frame
    pub programs_compiled: u32,
    /// Draw records skipped due to a failed material
    pub skipped: usize,
}

/// Uploaded vertex/index buffers for one geometry version.
struct GpuGeometry {
    vertex_buffer: BufferId,
    index_buffer: Option<BufferId>,
    attributes: Vec<AttributePointer>,
    version: u64,
}

/// Uploaded texture for one texture version.
struct GpuTexture {
    texture: TextureId,
    version: u64,
}

/// Program bound to a material at a specific version and frame setup.
struct MaterialBinding {
    descriptor: ProgramDescriptor,
    program: ProgramKey,
}

pub struct Renderer {
    settings: RendererSettings,
    programs: ProgramCache,
    state: StateCache,
    uniforms: UniformUploader,
    list: RenderList,
    visible: Vec<NodeKey>,
    geometries: FxHashMap<GeometryKey, GpuGeometry>,
    textures: FxHashMap<TextureKey, GpuTexture>,
    bindings: FxHashMap<MaterialKey, MaterialBinding>,
    /// Materials whose program failed to build, by id and version.
    /// A version bump retries (and re-logs on repeat failure).
    failed: FxHashMap<MaterialId, u64>,
    /// Re-issue attribute pointers only when the bound geometry changes
    bound_geometry: Option<GeometryKey>,
    stats: RenderStats,
}

impl Renderer {
    pub fn new(settings: RendererSettings) -> Self {
        Self {
            settings,
            programs: ProgramCache::new(),
            state: StateCache::new(),
            uniforms: UniformUploader::new(),
            list: RenderList::new(),
            visible: Vec::new(),
            geometries: FxHashMap::default(),
            textures: FxHashMap::default(),
            bindings: FxHashMap::default(),
            failed: FxHashMap::default(),
            bound_geometry: None,
            stats: RenderStats::default(),
        }
    }

    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut RendererSettings {
        &mut self.settings
    }

    /// Counters for the most recently rendered frame.
    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    /// The sorted draw records of the most recently rendered frame.
    pub fn render_list(&self) -> &RenderList {
        &self.list
    }

    pub fn program_cache(&self) -> &ProgramCache {
        &self.programs
    }

    /// Replace the opaque-bucket ordering.
    pub fn set_opaque_comparator(&mut self, cmp: super::render_list::OpaqueComparator) {
        self.list.set_opaque_comparator(cmp);
    }

    /// Render one frame of the scene through the device.
    pub fn render_frame(
        &mut self,
        device: &mut dyn GpuDevice,
        scene: &mut SceneGraph,
        camera: &Camera,
        lights: &LightList,
    ) -> Result<RenderStats> {
        let compiled_before = self.programs.compiled_count();
        self.stats = RenderStats::default();

        scene.update_world_transforms();

        let frustum = Frustum::from_view_projection(&camera.view_projection_matrix());
        let mut visible = std::mem::take(&mut self.visible);
        visible.clear();
        scene.frustum_cull(&frustum, &mut visible);
        self.stats.visible_nodes = visible.len();

        self.build_list(scene, camera, &visible);
        self.visible = visible;
        self.list.sort();

        // External code may have touched the GPU between frames
        self.bound_geometry = None;

        self.draw_bucket(device, scene, camera, lights, Bucket::Opaque)?;
        self.draw_bucket(device, scene, camera, lights, Bucket::Transmissive)?;
        self.draw_bucket(device, scene, camera, lights, Bucket::Transparent)?;

        self.stats.programs_compiled = self.programs.compiled_count() - compiled_before;
        Ok(self.stats)
    }

    /// Flatten visible nodes into per-group draw records.
    fn build_list(&mut self, scene: &SceneGraph, camera: &Camera, visible: &[NodeKey]) {
        self.list.clear();
        for &key in visible {
            let Some(node) = scene.node(key) else { continue };
            let Some(renderable) = node.renderable() else { continue };
            let Some(geometry) = scene.geometry(renderable.geometry) else { continue };

            let depth = camera.depth_of(node.world_matrix().w_axis.truncate());
            let object_id = key.data().as_ffi();

            let push_group = |list: &mut RenderList, start: u32, count: u32, slot: u32| {
                let Some(&material_key) = renderable.materials.get(slot as usize) else {
                    return;
                };
                let Some(material) = scene.material(material_key) else { return };
                list.push(
                    RenderItem {
                        node: key,
                        geometry: renderable.geometry,
                        material: material_key,
                        material_id: material.id(),
                        group_start: start,
                        group_count: count,
                        render_order: node.render_order(),
                        depth,
                        object_id,
                    },
                    material.flags().transparent,
                    material.is_transmissive(),
                );
            };

            if geometry.groups().is_empty() {
                push_group(&mut self.list, 0, geometry.draw_count(), 0);
            } else {
                for group in geometry.groups() {
                    push_group(&mut self.list, group.start, group.count, group.material_slot);
                }
            }
        }
    }

    fn draw_bucket(
        &mut self,
        device: &mut dyn GpuDevice,
        scene: &SceneGraph,
        camera: &Camera,
        lights: &LightList,
        bucket: Bucket,
    ) -> Result<()> {
        // Items are cloned out so the list is not borrowed across the
        // mutable cache accesses below; records are small.
        let items: Vec<RenderItem> = match bucket {
            Bucket::Opaque => self.list.opaque().to_vec(),
            Bucket::Transmissive => self.list.transmissive().to_vec(),
            Bucket::Transparent => self.list.transparent().to_vec(),
        };

        for item in &items {
            let Some(material) = scene.material(item.material) else { continue };
            let Some(node) = scene.node(item.node) else { continue };

            if self.failed.get(&material.id()) == Some(&material.version()) {
                self.stats.skipped += 1;
                continue;
            }

            let descriptor = ProgramDescriptor::project(
                material,
                lights.counts(),
                self.settings.fog.is_some(),
                self.settings.clip_planes,
                self.settings.tone_mapping,
                self.settings.output_color_space,
            );

            let program_key = match self.bind_program(device, item.material, &descriptor) {
                Ok(key) => key,
                Err(err) => {
                    engine_error!("aurora3d::Renderer",
                        "material '{}' failed to build, skipping: {}", material.name(), err);
                    self.failed.insert(material.id(), material.version());
                    self.stats.skipped += 1;
                    continue;
                }
            };

            let Some(geometry) = scene.geometry(item.geometry) else { continue };
            ensure_geometry(&mut self.geometries, &mut self.state, device, item.geometry, geometry);

            self.state.apply_material(device, material.flags());

            let Some(program) = self.programs.get_mut(program_key) else { continue };
            self.state.use_program(device, program.gpu_program());

            let world = *node.world_matrix();
            self.uniforms
                .set_mat4(device, program, "projectionMatrix", *camera.projection_matrix());
            self.uniforms.set_mat4(device, program, "viewMatrix", *camera.view_matrix());
            self.uniforms.set_mat4(device, program, "modelMatrix", world);
            self.uniforms.set_mat3(
                device,
                program,
                "normalMatrix",
                Mat3::from_mat4(world).inverse().transpose(),
            );

            if let Some(fog) = &self.settings.fog {
                self.uniforms.set_vec3(device, program, "fogColor", fog.color);
                self.uniforms.set_float(device, program, "fogNear", fog.near);
                self.uniforms.set_float(device, program, "fogFar", fog.far);
            }
            self.uniforms.upload_lights(device, program, lights);

            upload_material(
                &mut self.uniforms,
                &mut self.state,
                &mut self.textures,
                device,
                program,
                scene,
                material,
            );

            if self.bound_geometry != Some(item.geometry) {
                if let Some(gpu) = self.geometries.get(&item.geometry) {
                    self.state.bind_array_buffer(device, gpu.vertex_buffer);
                    for pointer in &gpu.attributes {
                        device.attribute_pointer(*pointer);
                    }
                    if let Some(index_buffer) = gpu.index_buffer {
                        self.state.bind_element_buffer(device, index_buffer);
                    }
                    self.bound_geometry = Some(item.geometry);
                }
            }

            if geometry.indices().is_some() {
                device.draw_elements(item.group_count, item.group_start);
            } else {
                device.draw_arrays(item.group_start, item.group_count);
            }
            self.stats.draw_calls += 1;
        }
        Ok(())
    }

    /// Return the program bound to a material, (re)acquiring when the
    /// material's descriptor projection changed.
    fn bind_program(
        &mut self,
        device: &mut dyn GpuDevice,
        key: MaterialKey,
        descriptor: &ProgramDescriptor,
    ) -> Result<ProgramKey> {
        if let Some(binding) = self.bindings.get(&key) {
            if &binding.descriptor == descriptor {
                return Ok(binding.program);
            }
        }
        let program = self.programs.acquire(device, descriptor)?;
        if let Some(old) = self.bindings.insert(
            key,
            MaterialBinding { descriptor: descriptor.clone(), program },
        ) {
            self.release_program(device, old.program);
        }
        Ok(program)
    }

    // ----- disposal -----

    /// Drop GPU buffers uploaded for a geometry.
    pub fn dispose_geometry(&mut self, device: &mut dyn GpuDevice, key: GeometryKey) {
        if let Some(gpu) = self.geometries.remove(&key) {
            self.state.forget_buffer(gpu.vertex_buffer);
            device.delete_buffer(gpu.vertex_buffer);
            if let Some(index_buffer) = gpu.index_buffer {
                self.state.forget_buffer(index_buffer);
                device.delete_buffer(index_buffer);
            }
            if self.bound_geometry == Some(key) {
                self.bound_geometry = None;
            }
        }
    }

    /// Drop the GPU texture uploaded for a texture resource.
    pub fn dispose_texture(&mut self, device: &mut dyn GpuDevice, key: TextureKey) {
        if let Some(gpu) = self.textures.remove(&key) {
            self.state.forget_texture(gpu.texture);
            device.delete_texture(gpu.texture);
        }
    }

    /// Release the program a material holds; the program is deleted once
    /// no other material references it.
    pub fn dispose_material(&mut self, device: &mut dyn GpuDevice, key: MaterialKey) {
        if let Some(binding) = self.bindings.remove(&key) {
            self.release_program(device, binding.program);
        }
    }

    /// Release one reference and forget the shadowed use_program slot when
    /// this was the last reference (the GPU program is deleted then).
    fn release_program(&mut self, device: &mut dyn GpuDevice, key: ProgramKey) {
        let gpu_program = self.programs.get(key).map(|p| p.gpu_program());
        if self.programs.release(device, key) {
            if let Some(id) = gpu_program {
                self.state.forget_program(id);
            }
        }
    }

    /// Delete every GPU resource this renderer uploaded.
    pub fn dispose_all(&mut self, device: &mut dyn GpuDevice) {
        for (_, gpu) in self.geometries.drain() {
            device.delete_buffer(gpu.vertex_buffer);
            if let Some(index_buffer) = gpu.index_buffer {
                device.delete_buffer(index_buffer);
            }
        }
        for (_, gpu) in self.textures.drain() {
            device.delete_texture(gpu.texture);
        }
        self.bindings.clear();
        self.programs.dispose_all(device);
        self.state.reset();
        self.bound_geometry = None;
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(RendererSettings::default())
    }
}

#[derive(Clone, Copy)]
enum Bucket {
    Opaque,
    Transmissive,
    Transparent,
}

/// Upload (or re-upload after a version bump) one geometry's interleaved
/// vertex buffer and optional index buffer.
fn ensure_geometry(
    geometries: &mut FxHashMap<GeometryKey, GpuGeometry>,
    state: &mut StateCache,
    device: &mut dyn GpuDevice,
    key: GeometryKey,
    geometry: &Geometry,
) {
    if let Some(gpu) = geometries.get(&key) {
        if gpu.version == geometry.version() {
            return;
        }
        let gpu = geometries.remove(&key);
        if let Some(gpu) = gpu {
            state.forget_buffer(gpu.vertex_buffer);
            device.delete_buffer(gpu.vertex_buffer);
            if let Some(index_buffer) = gpu.index_buffer {
                state.forget_buffer(index_buffer);
                device.delete_buffer(index_buffer);
            }
        }
    }

    // Interleave present attributes: position(0), normal(1), uv(2),
    // tangent(3), color(4)
    let mut floats_per_vertex = 3;
    if geometry.normals().is_some() {
        floats_per_vertex += 3;
    }
    if geometry.uvs().is_some() {
        floats_per_vertex += 2;
    }
    if geometry.tangents().is_some() {
        floats_per_vertex += 4;
    }
    if geometry.colors().is_some() {
        floats_per_vertex += 4;
    }
    let stride = (floats_per_vertex * 4) as u32;

    let mut attributes = Vec::new();
    let mut offset = 0u32;
    attributes.push(AttributePointer { location: 0, components: 3, stride, offset });
    offset += 12;
    if geometry.normals().is_some() {
        attributes.push(AttributePointer { location: 1, components: 3, stride, offset });
        offset += 12;
    }
    if geometry.uvs().is_some() {
        attributes.push(AttributePointer { location: 2, components: 2, stride, offset });
        offset += 8;
    }
    if geometry.tangents().is_some() {
        attributes.push(AttributePointer { location: 3, components: 4, stride, offset });
        offset += 16;
    }
    if geometry.colors().is_some() {
        attributes.push(AttributePointer { location: 4, components: 4, stride, offset });
    }

    let vertex_count = geometry.vertex_count();
    let mut data: Vec<f32> = Vec::with_capacity(vertex_count * floats_per_vertex);
    for i in 0..vertex_count {
        data.extend_from_slice(&geometry.positions()[i].to_array());
        if let Some(normals) = geometry.normals() {
            data.extend_from_slice(&normals[i].to_array());
        }
        if let Some(uvs) = geometry.uvs() {
            data.extend_from_slice(&uvs[i].to_array());
        }
        if let Some(tangents) = geometry.tangents() {
            data.extend_from_slice(&tangents[i].to_array());
        }
        if let Some(colors) = geometry.colors() {
            data.extend_from_slice(&colors[i].to_array());
        }
    }

    let vertex_buffer = device.create_buffer(bytemuck::cast_slice(&data));
    let index_buffer = geometry
        .indices()
        .map(|indices| device.create_buffer(bytemuck::cast_slice(indices)));

    geometries.insert(
        key,
        GpuGeometry { vertex_buffer, index_buffer, attributes, version: geometry.version() },
    );
}

/// Upload (or re-upload after a version bump) one texture resource.
fn ensure_texture(
    textures: &mut FxHashMap<TextureKey, GpuTexture>,
    state: &mut StateCache,
    device: &mut dyn GpuDevice,
    scene: &SceneGraph,
    key: TextureKey,
) -> Option<TextureId> {
    let texture = scene.texture(key)?;
    if let Some(gpu) = textures.get(&key) {
        if gpu.version == texture.version() {
            return Some(gpu.texture);
        }
        let gpu = textures.remove(&key);
        if let Some(gpu) = gpu {
            state.forget_texture(gpu.texture);
            device.delete_texture(gpu.texture);
        }
    }
    let id = device.create_texture(
        texture.width(),
        texture.height(),
        texture.format(),
        texture.pixels(),
    );
    textures.insert(key, GpuTexture { texture: id, version: texture.version() });
    Some(id)
}

/// Bind one sampler: resolve the texture, claim the program's unit for
/// the sampler name, bind, and point the sampler uniform at the unit.
fn bind_sampler(
    uniforms: &mut UniformUploader,
    state: &mut StateCache,
    textures: &mut FxHashMap<TextureKey, GpuTexture>,
    device: &mut dyn GpuDevice,
    program: &mut super::program_cache::CachedProgram,
    scene: &SceneGraph,
    name: &str,
    key: TextureKey,
) {
    let Some(id) = ensure_texture(textures, state, device, scene, key) else {
        return;
    };
    let unit = program.texture_unit(name);
    state.bind_texture(device, unit, id);
    uniforms.set(device, program, name, UniformValue::Int(unit as i32));
}

/// Submit the per-material parameter uniforms and sampler bindings.
fn upload_material(
    uniforms: &mut UniformUploader,
    state: &mut StateCache,
    textures: &mut FxHashMap<TextureKey, GpuTexture>,
    device: &mut dyn GpuDevice,
    program: &mut super::program_cache::CachedProgram,
    scene: &SceneGraph,
    material: &Material,
) {
    if let Some(cutoff) = material.flags().alpha_cutoff {
        uniforms.set_float(device, program, "alphaCutoff", cutoff);
    }

    match material.shading() {
        ShadingModel::Basic(p) => {
            uniforms.set_vec3(device, program, "diffuse", p.color);
            uniforms.set_float(device, program, "opacity", p.opacity);
            if let Some(map) = p.color_map {
                bind_sampler(uniforms, state, textures, device, program, scene, "map", map);
            }
        }
        ShadingModel::Matte(p) => {
            uniforms.set_vec3(device, program, "diffuse", p.color);
            uniforms.set_float(device, program, "opacity", p.opacity);
            uniforms.set_vec3(device, program, "emissive", p.emissive);
            if let Some(map) = p.color_map {
                bind_sampler(uniforms, state, textures, device, program, scene, "map", map);
            }
        }
        ShadingModel::Glossy(p) => {
            uniforms.set_vec3(device, program, "diffuse", p.color);
            uniforms.set_float(device, program, "opacity", p.opacity);
            uniforms.set_vec3(device, program, "specular", p.specular);
            uniforms.set_float(device, program, "shininess", p.shininess);
            if let Some(map) = p.color_map {
                bind_sampler(uniforms, state, textures, device, program, scene, "map", map);
            }
            if let Some(map) = p.normal_map {
                bind_sampler(
                    uniforms, state, textures, device, program, scene, "normalMap", map,
                );
            }
        }
        ShadingModel::Standard(p) => {
            uniforms.set_vec3(device, program, "diffuse", p.color);
            uniforms.set_float(device, program, "opacity", p.opacity);
            uniforms.set_float(device, program, "metalness", p.metalness);
            uniforms.set_float(device, program, "roughness", p.roughness);
            uniforms.set_vec3(device, program, "emissive", p.emissive);
            if p.transmission > 0.0 {
                uniforms.set_float(device, program, "transmission", p.transmission);
            }
            if let Some(map) = p.color_map {
                bind_sampler(uniforms, state, textures, device, program, scene, "map", map);
            }
            if let Some(map) = p.normal_map {
                bind_sampler(
                    uniforms, state, textures, device, program, scene, "normalMap", map,
                );
            }
            if let Some(map) = p.emissive_map {
                bind_sampler(
                    uniforms, state, textures, device, program, scene, "emissiveMap", map,
                );
            }
        }
        ShadingModel::Toon(p) => {
            uniforms.set_vec3(device, program, "diffuse", p.color);
            uniforms.set_float(device, program, "opacity", p.opacity);
            uniforms.set_float(device, program, "toonSteps", p.steps as f32);
            if let Some(map) = p.color_map {
                bind_sampler(uniforms, state, textures, device, program, scene, "map", map);
            }
        }
    }
}

#[cfg(test)]
#[path = "renderer_tests.rs"]
mod tests;
