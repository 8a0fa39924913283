/// Uniform uploader — submits values into the bound program, skipping
/// redundant uploads.
///
/// Each cached program carries its own last-uploaded-value map, so
/// switching programs never causes a false skip: a value is only skipped
/// when THIS program already holds it. Uniforms the program does not
/// declare (reflection returned no location) are silently ignored, which
/// lets callers submit a superset without per-feature branching.

use glam::{Mat3, Mat4, Vec3};
use crate::gpu::{GpuDevice, UniformValue};
use crate::resource::LightList;
use super::program_cache::CachedProgram;

/// Stateless submit layer over [`CachedProgram`] value caches.
///
/// Holds a scratch buffer reused for flattened array payloads so per-frame
/// light uploads do not allocate.
#[derive(Default)]
pub struct UniformUploader {
    scratch: Vec<f32>,
}

impl UniformUploader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Submit one named value into the bound program. No-op if the
    /// program lacks the uniform or already holds the value.
    pub fn set(
        &mut self,
        device: &mut dyn GpuDevice,
        program: &mut CachedProgram,
        name: &str,
        value: UniformValue,
    ) {
        let Some(location) = program.uniform_location(name) else {
            return;
        };
        if program.uniform_cache.get(name) == Some(&value) {
            return;
        }
        device.uniform(location, &value);
        program.uniform_cache.insert(name.to_string(), value);
    }

    pub fn set_float(
        &mut self,
        device: &mut dyn GpuDevice,
        program: &mut CachedProgram,
        name: &str,
        value: f32,
    ) {
        self.set(device, program, name, UniformValue::Float(value));
    }

    pub fn set_int(
        &mut self,
        device: &mut dyn GpuDevice,
        program: &mut CachedProgram,
        name: &str,
        value: i32,
    ) {
        self.set(device, program, name, UniformValue::Int(value));
    }

    pub fn set_vec3(
        &mut self,
        device: &mut dyn GpuDevice,
        program: &mut CachedProgram,
        name: &str,
        value: Vec3,
    ) {
        self.set(device, program, name, UniformValue::Vec3(value.to_array()));
    }

    pub fn set_mat3(
        &mut self,
        device: &mut dyn GpuDevice,
        program: &mut CachedProgram,
        name: &str,
        value: Mat3,
    ) {
        self.set(device, program, name, UniformValue::Mat3(value.to_cols_array()));
    }

    pub fn set_mat4(
        &mut self,
        device: &mut dyn GpuDevice,
        program: &mut CachedProgram,
        name: &str,
        value: Mat4,
    ) {
        self.set(device, program, name, UniformValue::Mat4(value.to_cols_array()));
    }

    /// Submit the scratch buffer as a float array. The cached value is
    /// compared against the scratch slice first, so an unchanged array
    /// is skipped without cloning.
    fn set_scratch_array(
        &mut self,
        device: &mut dyn GpuDevice,
        program: &mut CachedProgram,
        name: &str,
    ) {
        let Some(location) = program.uniform_location(name) else {
            return;
        };
        if let Some(UniformValue::FloatArray(cached)) = program.uniform_cache.get(name) {
            if cached.as_slice() == self.scratch.as_slice() {
                return;
            }
        }
        let value = UniformValue::FloatArray(self.scratch.clone());
        device.uniform(location, &value);
        program.uniform_cache.insert(name.to_string(), value);
    }

    /// Flatten the light list into the fixed uniform arrays the lit
    /// templates declare. Colors are premultiplied by intensity so the
    /// shader never sees a separate intensity scalar.
    pub fn upload_lights(
        &mut self,
        device: &mut dyn GpuDevice,
        program: &mut CachedProgram,
        lights: &LightList,
    ) {
        if !lights.directional.is_empty() {
            self.scratch.clear();
            for light in &lights.directional {
                self.scratch.extend_from_slice(&light.direction.to_array());
            }
            self.set_scratch_array(device, program, "dirLightDirections");
            self.scratch.clear();
            for light in &lights.directional {
                self.scratch.extend_from_slice(&(light.color * light.intensity).to_array());
            }
            self.set_scratch_array(device, program, "dirLightColors");
        }

        if !lights.point.is_empty() {
            self.scratch.clear();
            for light in &lights.point {
                self.scratch.extend_from_slice(&light.position.to_array());
            }
            self.set_scratch_array(device, program, "pointLightPositions");
            self.scratch.clear();
            for light in &lights.point {
                self.scratch.extend_from_slice(&(light.color * light.intensity).to_array());
            }
            self.set_scratch_array(device, program, "pointLightColors");
        }

        if !lights.spot.is_empty() {
            self.scratch.clear();
            for light in &lights.spot {
                self.scratch.extend_from_slice(&light.position.to_array());
            }
            self.set_scratch_array(device, program, "spotLightPositions");
            self.scratch.clear();
            for light in &lights.spot {
                self.scratch.extend_from_slice(&light.direction.to_array());
            }
            self.set_scratch_array(device, program, "spotLightDirections");
            self.scratch.clear();
            for light in &lights.spot {
                self.scratch.extend_from_slice(&(light.color * light.intensity).to_array());
            }
            self.set_scratch_array(device, program, "spotLightColors");
        }

        if !lights.hemisphere.is_empty() {
            self.scratch.clear();
            for light in &lights.hemisphere {
                self.scratch.extend_from_slice(&(light.sky_color * light.intensity).to_array());
            }
            self.set_scratch_array(device, program, "hemiSkyColors");
            self.scratch.clear();
            for light in &lights.hemisphere {
                self.scratch
                    .extend_from_slice(&(light.ground_color * light.intensity).to_array());
            }
            self.set_scratch_array(device, program, "hemiGroundColors");
        }
    }
}

#[cfg(test)]
#[path = "uniforms_tests.rs"]
mod tests;
