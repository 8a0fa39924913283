//! Unit tests for mock_device.rs
//!
//! Validates the mock's recording and reflection behavior that the
//! program cache and state cache tests rely on.

use super::*;
use crate::error::ShaderStage;

// ============================================================================
// RECORDING
// ============================================================================

#[test]
fn test_ids_are_unique_and_sequential() {
    let mut device = MockDevice::new();
    let a = device.create_buffer(&[0u8; 4]);
    let b = device.create_buffer(&[0u8; 4]);
    let c = device.create_texture(1, 1, PixelFormat::Rgba8, &[0u8; 4]);
    assert!(a < b && b < c);
}

#[test]
fn test_calls_are_recorded_in_order() {
    let mut device = MockDevice::new();
    device.use_program(1);
    device.depth_mask(false);
    device.draw_arrays(0, 3);

    assert_eq!(
        device.calls,
        vec![
            "use_program(1)".to_string(),
            "depth_mask(false)".to_string(),
            "draw_arrays(0, 3)".to_string(),
        ]
    );
}

#[test]
fn test_counters() {
    let mut device = MockDevice::new();
    device.use_program(1);
    device.set_capability(Capability::Blend, true);
    device.uniform(0, &UniformValue::Float(1.0));
    device.draw_elements(3, 0);
    device.delete_buffer(9);
    device.delete_texture(9);

    assert_eq!(device.state_calls, 2);
    assert_eq!(device.uniform_calls, 1);
    assert_eq!(device.draw_calls, 1);
    assert_eq!(device.buffer_deletes, 1);
    assert_eq!(device.texture_deletes, 1);
}

// ============================================================================
// SHADER REFLECTION
// ============================================================================

#[test]
fn test_scan_uniforms_from_source() {
    let mut device = MockDevice::new();
    let vertex = device
        .compile_shader(ShaderStage::Vertex, "uniform mat4 modelMatrix;\nvoid main() {}\n")
        .unwrap();
    let fragment = device
        .compile_shader(
            ShaderStage::Fragment,
            "uniform vec3 diffuse;\nuniform float opacity;\nvoid main() {}\n",
        )
        .unwrap();
    let program = device.link_program(vertex, fragment).unwrap();

    let uniforms = device.active_uniforms(program);
    let names: Vec<&str> = uniforms.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, vec!["modelMatrix", "diffuse", "opacity"]);
    // Locations are distinct
    let mut locations: Vec<i32> = uniforms.iter().map(|u| u.location).collect();
    locations.dedup();
    assert_eq!(locations.len(), 3);
}

#[test]
fn test_scan_strips_array_suffix() {
    let mut device = MockDevice::new();
    let shader = device
        .compile_shader(
            ShaderStage::Fragment,
            "uniform vec3 dirLightColors[NUM_DIR_LIGHTS];\nvoid main() {}\n",
        )
        .unwrap();
    let other = device.compile_shader(ShaderStage::Vertex, "void main() {}\n").unwrap();
    let program = device.link_program(other, shader).unwrap();

    let uniforms = device.active_uniforms(program);
    assert_eq!(uniforms.len(), 1);
    assert_eq!(uniforms[0].name, "dirLightColors");
}

#[test]
fn test_duplicate_uniforms_across_stages_merge() {
    let mut device = MockDevice::new();
    let vertex = device
        .compile_shader(ShaderStage::Vertex, "uniform mat4 viewMatrix;\n")
        .unwrap();
    let fragment = device
        .compile_shader(ShaderStage::Fragment, "uniform mat4 viewMatrix;\nuniform vec3 diffuse;\n")
        .unwrap();
    let program = device.link_program(vertex, fragment).unwrap();

    assert_eq!(device.active_uniforms(program).len(), 2);
}

// ============================================================================
// INJECTED FAILURES
// ============================================================================

#[test]
fn test_fail_compile_hits_only_the_configured_stage() {
    let mut device = MockDevice::new();
    device.fail_compile = Some((ShaderStage::Fragment, "bad fragment".to_string()));

    assert!(device.compile_shader(ShaderStage::Vertex, "void main() {}").is_ok());
    let err = device.compile_shader(ShaderStage::Fragment, "void main() {}").unwrap_err();
    assert_eq!(err, "bad fragment");
}

#[test]
fn test_fail_link() {
    let mut device = MockDevice::new();
    let v = device.compile_shader(ShaderStage::Vertex, "").unwrap();
    let f = device.compile_shader(ShaderStage::Fragment, "").unwrap();
    device.fail_link = Some("mismatch".to_string());
    assert_eq!(device.link_program(v, f).unwrap_err(), "mismatch");
}
