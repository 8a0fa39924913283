/// Node — one transformable object in the scene graph.
///
/// A Node carries a local TRS transform, cached local and world matrices,
/// weak (key-based) parent/child links, and an optional renderable payload.
/// Nodes live in the SceneGraph's slot map and are addressed by stable
/// keys; parent links are lookups, never ownership, so detachment and
/// reattachment cannot create dangling or cyclic ownership.

use bitflags::bitflags;
use glam::{Mat4, Quat, Vec3};
use slotmap::new_key_type;
use crate::resource::{BoundingSphere, GeometryKey, MaterialKey};

new_key_type! {
    /// Stable key for a Node stored in the SceneGraph's arena.
    pub struct NodeKey;
}

bitflags! {
    /// Per-node behavior flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct NodeFlags: u32 {
        /// Node participates in rendering
        const VISIBLE = 1 << 0;
        /// Node is tested against the frustum; clear for always-visible
        /// objects such as skyboxes
        const FRUSTUM_CULLED = 1 << 1;
        /// Local matrix is recomposed from position/rotation/scale each
        /// frame; clear to drive the local matrix directly
        const MATRIX_AUTO_UPDATE = 1 << 2;
    }
}

impl Default for NodeFlags {
    fn default() -> Self {
        NodeFlags::VISIBLE | NodeFlags::FRUSTUM_CULLED | NodeFlags::MATRIX_AUTO_UPDATE
    }
}

/// Renderable payload: a geometry plus one material per material slot.
///
/// Geometry groups reference material slots by index; a geometry without
/// groups draws its whole range with slot 0.
#[derive(Debug, Clone)]
pub struct Renderable {
    pub geometry: GeometryKey,
    pub materials: Vec<MaterialKey>,
}

/// One transformable object in the scene graph.
pub struct Node {
    name: String,
    position: Vec3,
    rotation: Quat,
    scale: Vec3,
    local_matrix: Mat4,
    world_matrix: Mat4,
    flags: NodeFlags,
    render_order: i32,
    pub(crate) parent: Option<NodeKey>,
    pub(crate) children: Vec<NodeKey>,
    renderable: Option<Renderable>,
    /// World-space bounding sphere cache, tagged with the geometry version
    /// it was computed from. Cleared whenever the world matrix is re-derived.
    pub(crate) world_sphere: Option<(u64, BoundingSphere)>,
}

impl Node {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            local_matrix: Mat4::IDENTITY,
            world_matrix: Mat4::IDENTITY,
            flags: NodeFlags::default(),
            render_order: 0,
            parent: None,
            children: Vec::new(),
            renderable: None,
            world_sphere: None,
        }
    }

    // ===== IDENTITY / HIERARCHY =====

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    // ===== LOCAL TRANSFORM =====

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    /// Set the local position. Takes effect at the next transform pass.
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Set the local rotation. Takes effect at the next transform pass.
    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
    }

    /// Set the local scale. Takes effect at the next transform pass.
    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
    }

    /// Cached local matrix (compose order: scale, then rotate, then translate).
    pub fn local_matrix(&self) -> &Mat4 {
        &self.local_matrix
    }

    /// Drive the local matrix directly. Only meaningful with
    /// `MATRIX_AUTO_UPDATE` cleared, otherwise the next transform pass
    /// recomposes it from position/rotation/scale.
    pub fn set_local_matrix(&mut self, matrix: Mat4) {
        self.local_matrix = matrix;
    }

    /// Cached world matrix: parent.world × local.
    ///
    /// Never stale when read after `SceneGraph::update_world_transforms`;
    /// the update pass re-derives every traversed subtree unconditionally.
    pub fn world_matrix(&self) -> &Mat4 {
        &self.world_matrix
    }

    // ===== FLAGS / RENDER STATE =====

    pub fn flags(&self) -> NodeFlags {
        self.flags
    }

    pub fn flags_mut(&mut self) -> &mut NodeFlags {
        &mut self.flags
    }

    /// Explicit draw-order bias; sorted ascending before any other key.
    pub fn render_order(&self) -> i32 {
        self.render_order
    }

    pub fn set_render_order(&mut self, order: i32) {
        self.render_order = order;
    }

    // ===== RENDERABLE PAYLOAD =====

    pub fn renderable(&self) -> Option<&Renderable> {
        self.renderable.as_ref()
    }

    /// Attach or replace the renderable payload. Invalidates the cached
    /// world bounding sphere.
    pub fn set_renderable(&mut self, renderable: Option<Renderable>) {
        self.renderable = renderable;
        self.world_sphere = None;
    }

    // ===== INTERNAL: transform pass =====

    /// Recompute cached matrices for this node given the parent's world
    /// matrix. Called only by `SceneGraph::update_world_transforms`.
    pub(crate) fn update_matrices(&mut self, parent_world: &Mat4) {
        if self.flags.contains(NodeFlags::MATRIX_AUTO_UPDATE) {
            self.local_matrix = Mat4::from_scale_rotation_translation(
                self.scale,
                self.rotation,
                self.position,
            );
        }
        self.world_matrix = *parent_world * self.local_matrix;
        // World-space bounds are derived from the world matrix
        self.world_sphere = None;
    }
}

#[cfg(test)]
#[path = "node_tests.rs"]
mod tests;
