/// SceneGraph — arena of Nodes plus the resource arenas they reference.
///
/// Uses a SlotMap for O(1) insert/remove with stable keys. Nodes address
/// each other by key (weak back-references), so the hierarchy cannot form
/// owning cycles; an explicit ancestor check rejects attachment cycles.
///
/// The per-frame contract (spec order is structural, not scheduled):
/// `update_world_transforms` completes before `frustum_cull`, which
/// completes before the render list is built and drawn.

use glam::Mat4;
use slotmap::SlotMap;
use crate::error::Result;
use crate::engine_bail;
use crate::camera::Frustum;
use crate::resource::{
    BoundingSphere, Geometry, GeometryKey, Material, MaterialKey, Texture, TextureKey,
};
use super::node::{Node, NodeFlags, NodeKey};

/// A hierarchical scene of transformable nodes.
///
/// Owns the nodes and the geometry/material/texture resources they
/// reference. All mutation happens between frames (single-threaded,
/// frame-synchronous model); nothing here locks.
pub struct SceneGraph {
    nodes: SlotMap<NodeKey, Node>,
    /// Nodes without a parent, traversal entry points
    roots: Vec<NodeKey>,
    geometries: SlotMap<GeometryKey, Geometry>,
    materials: SlotMap<MaterialKey, Material>,
    textures: SlotMap<TextureKey, Texture>,
    /// Scratch stack reused by the transform pass
    traversal_stack: Vec<(NodeKey, Mat4)>,
}

impl SceneGraph {
    /// Create a new empty scene graph.
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            roots: Vec::new(),
            geometries: SlotMap::with_key(),
            materials: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            traversal_stack: Vec::new(),
        }
    }

    // ===== NODE LIFECYCLE =====

    /// Create a node at the root level. Returns a stable key that remains
    /// valid until the node is removed.
    pub fn create_node(&mut self, name: impl Into<String>) -> NodeKey {
        let key = self.nodes.insert(Node::new(name.into()));
        self.roots.push(key);
        key
    }

    /// Attach `child` under `parent`, detaching it from its current parent
    /// first. Fails if either key is invalid or the attachment would form
    /// a cycle (`parent` is `child` itself or one of its descendants).
    pub fn attach(&mut self, child: NodeKey, parent: NodeKey) -> Result<()> {
        if !self.nodes.contains_key(child) {
            engine_bail!("aurora3d::SceneGraph", "attach: invalid child key");
        }
        if !self.nodes.contains_key(parent) {
            engine_bail!("aurora3d::SceneGraph", "attach: invalid parent key");
        }

        // Reject cycles: walk up from the prospective parent
        let mut ancestor = Some(parent);
        while let Some(key) = ancestor {
            if key == child {
                engine_bail!("aurora3d::SceneGraph",
                    "attach: node '{}' cannot be its own ancestor",
                    self.nodes[child].name());
            }
            ancestor = self.nodes[key].parent;
        }

        self.unlink(child);
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
        Ok(())
    }

    /// Detach a node from its parent, making it a root. Returns false if
    /// the key is invalid.
    pub fn detach(&mut self, key: NodeKey) -> bool {
        if !self.nodes.contains_key(key) {
            return false;
        }
        self.unlink(key);
        self.roots.push(key);
        self.nodes[key].parent = None;
        true
    }

    /// Remove a node and its entire subtree. All removed nodes drop out of
    /// the render list immediately (their keys become invalid). Returns
    /// false if the key is invalid.
    pub fn remove_node(&mut self, key: NodeKey) -> bool {
        if !self.nodes.contains_key(key) {
            return false;
        }
        self.unlink(key);

        let mut pending = vec![key];
        while let Some(current) = pending.pop() {
            if let Some(node) = self.nodes.remove(current) {
                pending.extend(node.children);
            }
        }
        true
    }

    /// Remove `key` from its parent's child list or from the root list.
    fn unlink(&mut self, key: NodeKey) {
        match self.nodes[key].parent {
            Some(parent) => {
                let children = &mut self.nodes[parent].children;
                if let Some(pos) = children.iter().position(|&c| c == key) {
                    children.remove(pos);
                }
            }
            None => {
                if let Some(pos) = self.roots.iter().position(|&r| r == key) {
                    self.roots.remove(pos);
                }
            }
        }
    }

    // ===== NODE ACCESS =====

    pub fn node(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    pub fn node_mut(&mut self, key: NodeKey) -> Option<&mut Node> {
        self.nodes.get_mut(key)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Root node keys (traversal entry points).
    pub fn roots(&self) -> &[NodeKey] {
        &self.roots
    }

    /// Iterate over all node keys.
    pub fn node_keys(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.nodes.keys()
    }

    // ===== RESOURCE ARENAS =====

    pub fn add_geometry(&mut self, geometry: Geometry) -> GeometryKey {
        self.geometries.insert(geometry)
    }

    pub fn geometry(&self, key: GeometryKey) -> Option<&Geometry> {
        self.geometries.get(key)
    }

    pub fn geometry_mut(&mut self, key: GeometryKey) -> Option<&mut Geometry> {
        self.geometries.get_mut(key)
    }

    pub fn remove_geometry(&mut self, key: GeometryKey) -> Option<Geometry> {
        self.geometries.remove(key)
    }

    pub fn add_material(&mut self, material: Material) -> MaterialKey {
        self.materials.insert(material)
    }

    pub fn material(&self, key: MaterialKey) -> Option<&Material> {
        self.materials.get(key)
    }

    pub fn material_mut(&mut self, key: MaterialKey) -> Option<&mut Material> {
        self.materials.get_mut(key)
    }

    pub fn remove_material(&mut self, key: MaterialKey) -> Option<Material> {
        self.materials.remove(key)
    }

    pub fn add_texture(&mut self, texture: Texture) -> TextureKey {
        self.textures.insert(texture)
    }

    pub fn texture(&self, key: TextureKey) -> Option<&Texture> {
        self.textures.get(key)
    }

    pub fn texture_mut(&mut self, key: TextureKey) -> Option<&mut Texture> {
        self.textures.get_mut(key)
    }

    pub fn remove_texture(&mut self, key: TextureKey) -> Option<Texture> {
        self.textures.remove(key)
    }

    // ===== TRANSFORM PROPAGATION =====

    /// One depth-first pass refreshing every node's cached matrices.
    ///
    /// For each node: if `MATRIX_AUTO_UPDATE` is set, recompose the local
    /// matrix from position/rotation/scale; then world = parent.world ×
    /// local. The whole subtree under any traversed node is re-derived
    /// unconditionally — frame-to-frame skipping of "clean" subtrees is a
    /// non-goal (it caused visible popping when an ancestor moved).
    ///
    /// Malformed transforms (NaN) are not rejected; they propagate.
    pub fn update_world_transforms(&mut self) {
        let mut stack = std::mem::take(&mut self.traversal_stack);
        stack.clear();

        for &root in &self.roots {
            stack.push((root, Mat4::IDENTITY));
        }

        while let Some((key, parent_world)) = stack.pop() {
            let node = match self.nodes.get_mut(key) {
                Some(node) => node,
                None => continue,
            };
            node.update_matrices(&parent_world);
            let world = *node.world_matrix();
            for i in 0..node.children.len() {
                let child = self.nodes[key].children[i];
                stack.push((child, world));
            }
        }

        self.traversal_stack = stack;
    }

    // ===== VISIBILITY FILTER =====

    /// World-space bounding sphere of a node's renderable.
    ///
    /// Lazily computed from the geometry's local bounding sphere and the
    /// node's world matrix, cached until the world matrix or geometry
    /// changes. Returns None for nodes without geometry.
    pub fn world_bounding_sphere(&mut self, key: NodeKey) -> Option<BoundingSphere> {
        let geometry_key = self.nodes.get(key)?.renderable()?.geometry;
        let geometry_version = self.geometries.get(geometry_key)?.version();

        if let Some((version, sphere)) = self.nodes[key].world_sphere {
            if version == geometry_version {
                return Some(sphere);
            }
        }

        let local_sphere = self.geometries.get_mut(geometry_key)?.bounding_sphere();
        let node = &mut self.nodes[key];
        let sphere = local_sphere.transformed(node.world_matrix());
        node.world_sphere = Some((geometry_version, sphere));
        Some(sphere)
    }

    /// Collect the keys of renderable nodes visible from the frustum.
    ///
    /// A node survives iff it is VISIBLE, has a renderable payload, and
    /// either opted out of culling (`FRUSTUM_CULLED` cleared) or its world
    /// bounding sphere is not fully outside any frustum plane. Appends
    /// into `out` (reused across frames by the renderer).
    pub fn frustum_cull(&mut self, frustum: &Frustum, out: &mut Vec<NodeKey>) {
        for (key, node) in self.nodes.iter_mut() {
            if !node.flags().contains(NodeFlags::VISIBLE) {
                continue;
            }
            let Some(renderable) = node.renderable() else { continue };
            let geometry_key = renderable.geometry;
            if !node.flags().contains(NodeFlags::FRUSTUM_CULLED) {
                out.push(key);
                continue;
            }
            let Some(geometry) = self.geometries.get_mut(geometry_key) else {
                continue;
            };
            let geometry_version = geometry.version();
            let sphere = match node.world_sphere {
                Some((version, sphere)) if version == geometry_version => sphere,
                _ => {
                    let sphere =
                        geometry.bounding_sphere().transformed(node.world_matrix());
                    node.world_sphere = Some((geometry_version, sphere));
                    sphere
                }
            };
            if frustum.intersects_sphere(&sphere) {
                out.push(key);
            }
        }
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "scene_graph_tests.rs"]
mod tests;
