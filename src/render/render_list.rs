/// Render list — the per-frame flattened, sorted draw records.
///
/// Visible nodes are flattened into one record per material-group and
/// bucketed into opaque / transmissive / transparent lists. The opaque
/// list sorts material-major to minimize GPU state changes (depth-test
/// discards occluded fragments either way, so this ordering only affects
/// performance); the blended lists sort back-to-front because blending
/// requires farthest-first composition.
///
/// Ephemeral contents: rebuilt and re-sorted every frame. The backing
/// allocations are reused.

use std::cmp::Ordering;
use crate::resource::{GeometryKey, MaterialId, MaterialKey};
use crate::scene::NodeKey;

/// One draw record: (object, geometry, material, sub-range, depth).
#[derive(Debug, Clone)]
pub struct RenderItem {
    pub node: NodeKey,
    pub geometry: GeometryKey,
    pub material: MaterialKey,
    /// Material identity used as the material-major sort key
    pub material_id: MaterialId,
    /// First index (or vertex) of the group's sub-range
    pub group_start: u32,
    /// Index (or vertex) count of the group's sub-range
    pub group_count: u32,
    /// Explicit draw-order bias from the node; sorted before any other key
    pub render_order: i32,
    /// Camera-space depth, positive in front of the camera
    pub depth: f32,
    /// Deterministic tie-break for equal depths
    pub object_id: u64,
}

/// Comparator for the opaque bucket, replaceable by the caller.
pub type OpaqueComparator = fn(&RenderItem, &RenderItem) -> Ordering;

/// Default opaque ordering: ascending `(render_order, material_id, depth)`.
///
/// Grouping by material before depth trades perfect front-to-back
/// ordering for fewer state changes.
pub fn material_major_comparator(a: &RenderItem, b: &RenderItem) -> Ordering {
    a.render_order
        .cmp(&b.render_order)
        .then(a.material_id.cmp(&b.material_id))
        .then(a.depth.total_cmp(&b.depth))
}

/// Alternative opaque ordering: strict front-to-back, material as a
/// tie-break. For GPU architectures where early-z wins over batching.
pub fn depth_major_comparator(a: &RenderItem, b: &RenderItem) -> Ordering {
    a.render_order
        .cmp(&b.render_order)
        .then(a.depth.total_cmp(&b.depth))
        .then(a.material_id.cmp(&b.material_id))
}

/// Blended ordering: ascending `render_order`, then descending depth
/// (farthest first), ties broken by object id for determinism.
pub fn transparent_comparator(a: &RenderItem, b: &RenderItem) -> Ordering {
    a.render_order
        .cmp(&b.render_order)
        .then(b.depth.total_cmp(&a.depth))
        .then(a.object_id.cmp(&b.object_id))
}

/// The three per-frame draw buckets.
pub struct RenderList {
    opaque: Vec<RenderItem>,
    transmissive: Vec<RenderItem>,
    transparent: Vec<RenderItem>,
    opaque_cmp: OpaqueComparator,
}

impl RenderList {
    pub fn new() -> Self {
        Self {
            opaque: Vec::new(),
            transmissive: Vec::new(),
            transparent: Vec::new(),
            opaque_cmp: material_major_comparator,
        }
    }

    /// Drop all records, keeping the allocations for the next frame.
    pub fn clear(&mut self) {
        self.opaque.clear();
        self.transmissive.clear();
        self.transparent.clear();
    }

    /// Bucket one record by its material's transparency/transmission flags.
    pub fn push(&mut self, item: RenderItem, transparent: bool, transmissive: bool) {
        if transmissive {
            self.transmissive.push(item);
        } else if transparent {
            self.transparent.push(item);
        } else {
            self.opaque.push(item);
        }
    }

    /// Sort all three buckets. Stable within the opaque bucket: records
    /// with equal `(render_order, material_id, depth)` keep their input
    /// order.
    pub fn sort(&mut self) {
        self.opaque.sort_by(self.opaque_cmp);
        self.transmissive.sort_by(transparent_comparator);
        self.transparent.sort_by(transparent_comparator);
    }

    /// Replace the opaque comparator (default:
    /// [`material_major_comparator`]).
    pub fn set_opaque_comparator(&mut self, cmp: OpaqueComparator) {
        self.opaque_cmp = cmp;
    }

    pub fn opaque(&self) -> &[RenderItem] {
        &self.opaque
    }

    pub fn transmissive(&self) -> &[RenderItem] {
        &self.transmissive
    }

    pub fn transparent(&self) -> &[RenderItem] {
        &self.transparent
    }

    /// Total records across all buckets.
    pub fn len(&self) -> usize {
        self.opaque.len() + self.transmissive.len() + self.transparent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RenderList {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "render_list_tests.rs"]
mod tests;
