//! Unit tests for program_cache.rs
//!
//! Tests descriptor projection, define-header synthesis, program sharing
//! across equal descriptors, refcounted release, and structured compile
//! diagnostics (no fallback shader).

use super::*;
use crate::gpu::mock_device::MockDevice;
use crate::resource::{
    BasicParams, LightCounts, Material, MatteParams, ShadingModel, Side, StandardParams,
};

fn descriptor(shading: ShadingTag) -> ProgramDescriptor {
    ProgramDescriptor {
        shading,
        features: ProgramFeatures::empty(),
        lights: LightCounts::default(),
        clip_planes: 0,
        tone_mapping: ToneMapping::None,
        output_color_space: ColorSpace::Linear,
    }
}

fn some_lights() -> LightCounts {
    LightCounts { directional: 2, point: 1, spot: 0, hemisphere: 1, shadow: 0 }
}

// ============================================================================
// DESCRIPTOR PROJECTION
// ============================================================================

#[test]
fn test_two_materials_same_features_project_equal() {
    let mut a_params = MatteParams::default();
    a_params.color = glam::Vec3::new(1.0, 0.0, 0.0);
    let mut b_params = MatteParams::default();
    b_params.color = glam::Vec3::new(0.0, 0.0, 1.0);

    let a = Material::new("red", ShadingModel::Matte(a_params));
    let b = Material::new("blue", ShadingModel::Matte(b_params));

    let lights = some_lights();
    let da = ProgramDescriptor::project(&a, lights, false, 0, ToneMapping::None, ColorSpace::Srgb);
    let db = ProgramDescriptor::project(&b, lights, false, 0, ToneMapping::None, ColorSpace::Srgb);

    // Parameter values differ; the compiled shader text does not
    assert_eq!(da, db);
}

#[test]
fn test_one_flag_difference_projects_unequal() {
    let plain = Material::new("plain", ShadingModel::Basic(BasicParams::default()));
    let mut params = BasicParams::default();
    params.vertex_colors = true;
    let tinted = Material::new("tinted", ShadingModel::Basic(params));

    let lights = LightCounts::default();
    let dp =
        ProgramDescriptor::project(&plain, lights, false, 0, ToneMapping::None, ColorSpace::Srgb);
    let dt =
        ProgramDescriptor::project(&tinted, lights, false, 0, ToneMapping::None, ColorSpace::Srgb);
    assert_ne!(dp, dt);
}

#[test]
fn test_light_counts_change_descriptor() {
    let material = Material::new("m", ShadingModel::Matte(MatteParams::default()));
    let a = ProgramDescriptor::project(
        &material,
        LightCounts { directional: 1, ..LightCounts::default() },
        false,
        0,
        ToneMapping::None,
        ColorSpace::Srgb,
    );
    let b = ProgramDescriptor::project(
        &material,
        LightCounts { directional: 2, ..LightCounts::default() },
        false,
        0,
        ToneMapping::None,
        ColorSpace::Srgb,
    );
    assert_ne!(a, b);
}

#[test]
fn test_unlit_model_ignores_light_counts() {
    let material = Material::new("b", ShadingModel::Basic(BasicParams::default()));
    let a = ProgramDescriptor::project(
        &material,
        some_lights(),
        false,
        0,
        ToneMapping::None,
        ColorSpace::Srgb,
    );
    let b = ProgramDescriptor::project(
        &material,
        LightCounts::default(),
        false,
        0,
        ToneMapping::None,
        ColorSpace::Srgb,
    );
    assert_eq!(a, b);
}

#[test]
fn test_projection_reads_material_features() {
    let mut params = StandardParams::default();
    params.transmission = 0.5;
    let mut material = Material::new("glass", ShadingModel::Standard(params));
    material.flags_mut().alpha_cutoff = Some(0.5);
    material.flags_mut().side = Side::Double;

    let descriptor = ProgramDescriptor::project(
        &material,
        LightCounts::default(),
        true,
        0,
        ToneMapping::Aces,
        ColorSpace::Srgb,
    );
    assert!(descriptor.features.contains(ProgramFeatures::TRANSMISSION));
    assert!(descriptor.features.contains(ProgramFeatures::ALPHA_TEST));
    assert!(descriptor.features.contains(ProgramFeatures::DOUBLE_SIDED));
    assert!(descriptor.features.contains(ProgramFeatures::FOG));
    assert_eq!(descriptor.tone_mapping, ToneMapping::Aces);
}

// ============================================================================
// DEFINE HEADER
// ============================================================================

#[test]
fn test_defines_list_features_and_counts() {
    let mut descriptor = descriptor(ShadingTag::Glossy);
    descriptor.features = ProgramFeatures::COLOR_MAP | ProgramFeatures::FOG;
    descriptor.lights = some_lights();
    descriptor.tone_mapping = ToneMapping::Reinhard;
    descriptor.output_color_space = ColorSpace::Srgb;

    let defines = descriptor.defines();
    assert!(defines.contains("#define COLOR_MAP\n"));
    assert!(defines.contains("#define FOG\n"));
    assert!(!defines.contains("#define NORMAL_MAP\n"));
    assert!(defines.contains("#define NUM_DIR_LIGHTS 2\n"));
    assert!(defines.contains("#define NUM_POINT_LIGHTS 1\n"));
    assert!(defines.contains("#define NUM_HEMI_LIGHTS 1\n"));
    assert!(defines.contains("#define TONE_MAPPING 1\n"));
    assert!(defines.contains("#define OUTPUT_SRGB\n"));
}

#[test]
fn test_defines_linear_output_has_no_srgb_define() {
    let descriptor = descriptor(ShadingTag::Basic);
    assert!(!descriptor.defines().contains("OUTPUT_SRGB"));
    assert!(descriptor.defines().contains("#define TONE_MAPPING 0\n"));
}

// ============================================================================
// CACHE SHARING / REFCOUNTS
// ============================================================================

#[test]
fn test_equal_descriptors_share_one_program() {
    let mut device = MockDevice::new();
    let mut cache = ProgramCache::new();
    let descriptor = descriptor(ShadingTag::Matte);

    let a = cache.acquire(&mut device, &descriptor).unwrap();
    let b = cache.acquire(&mut device, &descriptor).unwrap();

    assert_eq!(a, b);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.compiled_count(), 1);
    // One vertex + one fragment compile, one link
    assert_eq!(device.compiles, 2);
    assert_eq!(device.links, 1);
    assert_eq!(cache.get(a).unwrap().refs(), 2);
}

#[test]
fn test_different_descriptors_compile_separately() {
    let mut device = MockDevice::new();
    let mut cache = ProgramCache::new();

    let a = cache.acquire(&mut device, &descriptor(ShadingTag::Matte)).unwrap();
    let mut with_map = descriptor(ShadingTag::Matte);
    with_map.features = ProgramFeatures::COLOR_MAP | ProgramFeatures::HAS_UVS;
    let b = cache.acquire(&mut device, &with_map).unwrap();

    assert_ne!(a, b);
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.compiled_count(), 2);
}

#[test]
fn test_release_deletes_at_zero() {
    for n in [1u32, 2, 10] {
        let mut device = MockDevice::new();
        let mut cache = ProgramCache::new();
        let descriptor = descriptor(ShadingTag::Basic);

        let mut key = None;
        for _ in 0..n {
            key = Some(cache.acquire(&mut device, &descriptor).unwrap());
        }
        let key = key.unwrap();
        assert_eq!(cache.compiled_count(), 1, "n={}", n);

        for i in 0..n {
            let evicted = cache.release(&mut device, key);
            assert_eq!(evicted, i == n - 1, "n={} i={}", n, i);
        }
        assert_eq!(device.program_deletes, 1, "n={}", n);
        assert!(cache.is_empty());
        assert!(cache.get(key).is_none());
    }
}

#[test]
fn test_reacquire_after_eviction_recompiles() {
    let mut device = MockDevice::new();
    let mut cache = ProgramCache::new();
    let descriptor = descriptor(ShadingTag::Basic);

    let key = cache.acquire(&mut device, &descriptor).unwrap();
    cache.release(&mut device, key);
    let again = cache.acquire(&mut device, &descriptor).unwrap();

    assert!(cache.get(again).is_some());
    assert_eq!(cache.compiled_count(), 2);
}

#[test]
fn test_release_stale_key_is_ignored() {
    let mut device = MockDevice::new();
    let mut cache = ProgramCache::new();
    let key = cache.acquire(&mut device, &descriptor(ShadingTag::Basic)).unwrap();
    cache.release(&mut device, key);
    assert!(!cache.release(&mut device, key));
}

#[test]
fn test_dispose_all_deletes_everything() {
    let mut device = MockDevice::new();
    let mut cache = ProgramCache::new();
    cache.acquire(&mut device, &descriptor(ShadingTag::Basic)).unwrap();
    cache.acquire(&mut device, &descriptor(ShadingTag::Matte)).unwrap();

    cache.dispose_all(&mut device);
    assert!(cache.is_empty());
    assert_eq!(device.program_deletes, 2);
}

// ============================================================================
// REFLECTION / UNIFORMS
// ============================================================================

#[test]
fn test_reflection_exposes_uniform_locations() {
    let mut device = MockDevice::new();
    let mut cache = ProgramCache::new();
    let key = cache.acquire(&mut device, &descriptor(ShadingTag::Glossy)).unwrap();

    let program = cache.get(key).unwrap();
    assert!(program.uniform_location("diffuse").is_some());
    assert!(program.uniform_location("shininess").is_some());
    assert!(program.uniform_location("modelMatrix").is_some());
    assert!(program.uniform_location("bogus").is_none());
}

#[test]
fn test_texture_units_are_stable_per_name() {
    let mut device = MockDevice::new();
    let mut cache = ProgramCache::new();
    let mut with_maps = descriptor(ShadingTag::Glossy);
    with_maps.features =
        ProgramFeatures::COLOR_MAP | ProgramFeatures::NORMAL_MAP | ProgramFeatures::HAS_UVS;
    let key = cache.acquire(&mut device, &with_maps).unwrap();

    let program = cache.get_mut(key).unwrap();
    let map_unit = program.texture_unit("map");
    let normal_unit = program.texture_unit("normalMap");
    assert_ne!(map_unit, normal_unit);
    // Repeat lookups return the same unit
    assert_eq!(program.texture_unit("map"), map_unit);
    assert_eq!(program.texture_unit("normalMap"), normal_unit);
}

// ============================================================================
// COMPILE FAILURE DIAGNOSTICS
// ============================================================================

#[test]
fn test_vertex_compile_failure_is_structured() {
    let mut device = MockDevice::new();
    device.fail_compile = Some((
        crate::aurora3d::ShaderStage::Vertex,
        "ERROR: 0:3: 'foo' : undeclared identifier".to_string(),
    ));
    let mut cache = ProgramCache::new();

    let err = cache.acquire(&mut device, &descriptor(ShadingTag::Basic)).unwrap_err();
    match err {
        crate::aurora3d::Error::ShaderCompile { stage, log, excerpt } => {
            assert_eq!(stage, crate::aurora3d::ShaderStage::Vertex);
            assert!(log.contains("undeclared identifier"));
            // Excerpt windows around the reported line with line numbers
            assert!(excerpt.contains("   3 | "));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(cache.is_empty());
}

#[test]
fn test_fragment_failure_cleans_up_vertex_shader() {
    let mut device = MockDevice::new();
    device.fail_compile = Some((
        crate::aurora3d::ShaderStage::Fragment,
        "ERROR: 0:1: bad".to_string(),
    ));
    let mut cache = ProgramCache::new();

    assert!(cache.acquire(&mut device, &descriptor(ShadingTag::Basic)).is_err());
    // The already-compiled vertex shader must be deleted
    assert!(device.calls.iter().any(|c| c.starts_with("delete_shader")));
    assert_eq!(device.links, 0);
}

#[test]
fn test_link_failure_is_structured() {
    let mut device = MockDevice::new();
    device.fail_link = Some("link failed: varying mismatch".to_string());
    let mut cache = ProgramCache::new();

    let err = cache.acquire(&mut device, &descriptor(ShadingTag::Basic)).unwrap_err();
    match err {
        crate::aurora3d::Error::ShaderCompile { stage, log, .. } => {
            assert_eq!(stage, crate::aurora3d::ShaderStage::Link);
            assert!(log.contains("varying mismatch"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_failure_leaves_no_cached_entry() {
    let mut device = MockDevice::new();
    device.fail_link = Some("boom".to_string());
    let mut cache = ProgramCache::new();
    let descriptor = descriptor(ShadingTag::Basic);

    assert!(cache.acquire(&mut device, &descriptor).is_err());

    // A later acquire with a fixed device succeeds from scratch
    device.fail_link = None;
    assert!(cache.acquire(&mut device, &descriptor).is_ok());
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_excerpt_clamps_out_of_range_line_number() {
    // Drivers report post-preprocessed line numbers, which can exceed the
    // submitted source length; the excerpt must clamp, not panic
    let mut device = MockDevice::new();
    device.fail_compile = Some((
        crate::aurora3d::ShaderStage::Fragment,
        "ERROR: 0:9999: syntax error".to_string(),
    ));
    let mut cache = ProgramCache::new();

    let err = cache.acquire(&mut device, &descriptor(ShadingTag::Basic)).unwrap_err();
    match err {
        crate::aurora3d::Error::ShaderCompile { stage, excerpt, .. } => {
            assert_eq!(stage, crate::aurora3d::ShaderStage::Fragment);
            // Window falls back to the tail of the actual source
            assert!(!excerpt.is_empty());
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_excerpt_without_line_info_shows_source_head() {
    let mut device = MockDevice::new();
    device.fail_compile =
        Some((crate::aurora3d::ShaderStage::Vertex, "no line info here".to_string()));
    let mut cache = ProgramCache::new();

    let err = cache.acquire(&mut device, &descriptor(ShadingTag::Basic)).unwrap_err();
    if let crate::aurora3d::Error::ShaderCompile { excerpt, .. } = err {
        assert!(excerpt.contains("   1 | "));
    } else {
        panic!("unexpected error variant");
    }
}
