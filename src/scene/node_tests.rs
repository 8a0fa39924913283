//! Unit tests for node.rs
//!
//! Tests NodeFlags defaults, the TRS compose order, MATRIX_AUTO_UPDATE
//! behavior, and renderable payload handling.

use super::*;
use glam::{Mat4, Quat, Vec3, Vec4};
use slotmap::SlotMap;
use crate::resource::{GeometryKey, MaterialKey};

fn make_node(name: &str) -> Node {
    Node::new(name.to_string())
}

fn approx_eq(a: &Mat4, b: &Mat4) -> bool {
    (0..4).all(|i| {
        let diff: Vec4 = a.col(i) - b.col(i);
        diff.abs().max_element() < 1e-5
    })
}

// ============================================================================
// DEFAULTS
// ============================================================================

#[test]
fn test_default_flags_all_set() {
    let flags = NodeFlags::default();
    assert!(flags.contains(NodeFlags::VISIBLE));
    assert!(flags.contains(NodeFlags::FRUSTUM_CULLED));
    assert!(flags.contains(NodeFlags::MATRIX_AUTO_UPDATE));
}

#[test]
fn test_new_node_identity_transform() {
    let node = make_node("n");
    assert_eq!(node.name(), "n");
    assert_eq!(node.position(), Vec3::ZERO);
    assert_eq!(node.rotation(), Quat::IDENTITY);
    assert_eq!(node.scale(), Vec3::ONE);
    assert_eq!(node.local_matrix(), &Mat4::IDENTITY);
    assert_eq!(node.world_matrix(), &Mat4::IDENTITY);
    assert_eq!(node.render_order(), 0);
    assert!(node.parent().is_none());
    assert!(node.children().is_empty());
    assert!(node.renderable().is_none());
}

// ============================================================================
// TRANSFORM COMPOSE
// ============================================================================

#[test]
fn test_update_matrices_composes_trs() {
    let mut node = make_node("n");
    node.set_position(Vec3::new(1.0, 2.0, 3.0));
    node.set_rotation(Quat::from_rotation_y(0.5));
    node.set_scale(Vec3::splat(2.0));

    node.update_matrices(&Mat4::IDENTITY);

    let expected = Mat4::from_scale_rotation_translation(
        Vec3::splat(2.0),
        Quat::from_rotation_y(0.5),
        Vec3::new(1.0, 2.0, 3.0),
    );
    assert!(approx_eq(node.local_matrix(), &expected));
    assert!(approx_eq(node.world_matrix(), &expected));
}

#[test]
fn test_update_matrices_multiplies_parent_world() {
    let mut node = make_node("n");
    node.set_position(Vec3::new(1.0, 0.0, 0.0));

    let parent_world = Mat4::from_translation(Vec3::new(0.0, 5.0, 0.0));
    node.update_matrices(&parent_world);

    let world_pos = node.world_matrix().w_axis.truncate();
    assert!((world_pos - Vec3::new(1.0, 5.0, 0.0)).length() < 1e-6);
}

#[test]
fn test_setters_take_effect_only_at_update() {
    let mut node = make_node("n");
    node.set_position(Vec3::new(9.0, 0.0, 0.0));
    // Cached matrices are untouched until the transform pass runs
    assert_eq!(node.local_matrix(), &Mat4::IDENTITY);
    node.update_matrices(&Mat4::IDENTITY);
    assert_eq!(node.local_matrix().w_axis.truncate(), Vec3::new(9.0, 0.0, 0.0));
}

#[test]
fn test_manual_local_matrix_without_auto_update() {
    let mut node = make_node("n");
    node.flags_mut().remove(NodeFlags::MATRIX_AUTO_UPDATE);

    let manual = Mat4::from_translation(Vec3::new(7.0, 7.0, 7.0));
    node.set_local_matrix(manual);
    node.set_position(Vec3::new(100.0, 0.0, 0.0)); // must be ignored

    node.update_matrices(&Mat4::IDENTITY);
    assert!(approx_eq(node.world_matrix(), &manual));
}

#[test]
fn test_auto_update_overwrites_manual_matrix() {
    let mut node = make_node("n");
    node.set_local_matrix(Mat4::from_translation(Vec3::new(7.0, 0.0, 0.0)));
    node.set_position(Vec3::new(1.0, 0.0, 0.0));

    node.update_matrices(&Mat4::IDENTITY);
    // MATRIX_AUTO_UPDATE set: local recomposed from TRS, manual value lost
    assert_eq!(node.local_matrix().w_axis.truncate(), Vec3::new(1.0, 0.0, 0.0));
}

#[test]
fn test_nan_transform_propagates() {
    let mut node = make_node("n");
    node.set_position(Vec3::new(f32::NAN, 0.0, 0.0));
    node.update_matrices(&Mat4::IDENTITY);
    assert!(node.world_matrix().w_axis.x.is_nan());
}

// ============================================================================
// RENDERABLE PAYLOAD
// ============================================================================

#[test]
fn test_set_renderable() {
    let mut geometries: SlotMap<GeometryKey, ()> = SlotMap::with_key();
    let mut materials: SlotMap<MaterialKey, ()> = SlotMap::with_key();
    let geometry = geometries.insert(());
    let material = materials.insert(());

    let mut node = make_node("mesh");
    node.set_renderable(Some(Renderable { geometry, materials: vec![material] }));

    let renderable = node.renderable().unwrap();
    assert_eq!(renderable.geometry, geometry);
    assert_eq!(renderable.materials, vec![material]);

    node.set_renderable(None);
    assert!(node.renderable().is_none());
}

#[test]
fn test_render_order() {
    let mut node = make_node("n");
    node.set_render_order(-5);
    assert_eq!(node.render_order(), -5);
}
