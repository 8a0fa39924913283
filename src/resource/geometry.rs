/// Geometry — already-decoded vertex attribute buffers.
///
/// A Geometry owns position/normal/UV (and optionally tangent/color)
/// attribute buffers, an optional index buffer, and zero or more named
/// sub-ranges ("groups") each bound to a distinct material slot.
///
/// Bounding volumes (AABB and sphere) are computed once, cached, and
/// invalidated whenever an attribute buffer is edited. Geometry is shared
/// between nodes; the renderer reference-counts the GPU-side buffers.

use glam::{Vec2, Vec3, Vec4};
use slotmap::new_key_type;
use crate::error::Result;
use crate::engine_bail;

new_key_type! {
    /// Stable key for a Geometry stored in the SceneGraph's arena.
    pub struct GeometryKey;
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Empty box: min = +inf, max = -inf. Growing it with any point fixes it.
    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    /// Expand the box to contain `point`.
    pub fn grow(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Center of the box.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Transform all eight corners and rebuild an axis-aligned box.
    pub fn transformed(&self, matrix: &glam::Mat4) -> Aabb {
        let mut out = Aabb::empty();
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 != 0 { self.max.x } else { self.min.x },
                if i & 2 != 0 { self.max.y } else { self.min.y },
                if i & 4 != 0 { self.max.z } else { self.min.z },
            );
            out.grow(matrix.transform_point3(corner));
        }
        out
    }
}

/// Bounding sphere (center + radius).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    /// Transform by a matrix. The radius is scaled by the largest axis
    /// scale so the result stays conservative under non-uniform scaling.
    pub fn transformed(&self, matrix: &glam::Mat4) -> BoundingSphere {
        let center = matrix.transform_point3(self.center);
        let sx = matrix.x_axis.truncate().length();
        let sy = matrix.y_axis.truncate().length();
        let sz = matrix.z_axis.truncate().length();
        BoundingSphere {
            center,
            radius: self.radius * sx.max(sy).max(sz),
        }
    }
}

/// A sub-range of the geometry bound to one material slot.
#[derive(Debug, Clone)]
pub struct GeometryGroup {
    /// First index (indexed geometry) or first vertex (non-indexed)
    pub start: u32,
    /// Number of indices or vertices
    pub count: u32,
    /// Material slot on the owning node this group draws with
    pub material_slot: u32,
}

/// Geometry creation descriptor.
///
/// `positions` is required; every other attribute buffer, when present,
/// must have the same length. `groups` may be empty, in which case the
/// whole range draws with material slot 0.
pub struct GeometryDesc {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub normals: Option<Vec<Vec3>>,
    pub uvs: Option<Vec<Vec2>>,
    pub tangents: Option<Vec<Vec4>>,
    pub colors: Option<Vec<Vec4>>,
    pub indices: Option<Vec<u32>>,
    pub groups: Vec<GeometryGroup>,
}

/// Geometry resource: decoded vertex attribute buffers plus groups.
pub struct Geometry {
    name: String,
    positions: Vec<Vec3>,
    normals: Option<Vec<Vec3>>,
    uvs: Option<Vec<Vec2>>,
    tangents: Option<Vec<Vec4>>,
    colors: Option<Vec<Vec4>>,
    indices: Option<Vec<u32>>,
    groups: Vec<GeometryGroup>,
    /// Cached local-space bounds; rebuilt on demand after edits
    bounds: Option<(Aabb, BoundingSphere)>,
    /// Bumped on every attribute edit; the renderer re-uploads on change
    version: u64,
}

impl Geometry {
    /// Create a geometry from a descriptor, validating attribute lengths
    /// and group/index ranges.
    pub fn from_desc(desc: GeometryDesc) -> Result<Self> {
        let vertex_count = desc.positions.len();
        if vertex_count == 0 {
            engine_bail!("aurora3d::Geometry",
                "Geometry '{}' has no positions", desc.name);
        }

        if let Some(ref normals) = desc.normals {
            if normals.len() != vertex_count {
                engine_bail!("aurora3d::Geometry",
                    "Geometry '{}': normal count {} != position count {}",
                    desc.name, normals.len(), vertex_count);
            }
        }
        if let Some(ref uvs) = desc.uvs {
            if uvs.len() != vertex_count {
                engine_bail!("aurora3d::Geometry",
                    "Geometry '{}': uv count {} != position count {}",
                    desc.name, uvs.len(), vertex_count);
            }
        }
        if let Some(ref tangents) = desc.tangents {
            if tangents.len() != vertex_count {
                engine_bail!("aurora3d::Geometry",
                    "Geometry '{}': tangent count {} != position count {}",
                    desc.name, tangents.len(), vertex_count);
            }
        }
        if let Some(ref colors) = desc.colors {
            if colors.len() != vertex_count {
                engine_bail!("aurora3d::Geometry",
                    "Geometry '{}': color count {} != position count {}",
                    desc.name, colors.len(), vertex_count);
            }
        }

        if let Some(ref indices) = desc.indices {
            if let Some(&max) = indices.iter().max() {
                if max as usize >= vertex_count {
                    engine_bail!("aurora3d::Geometry",
                        "Geometry '{}': index {} out of range ({} vertices)",
                        desc.name, max, vertex_count);
                }
            }
        }

        let range_len = desc.indices.as_ref()
            .map(|i| i.len())
            .unwrap_or(vertex_count) as u64;
        for (i, group) in desc.groups.iter().enumerate() {
            if group.start as u64 + group.count as u64 > range_len {
                engine_bail!("aurora3d::Geometry",
                    "Geometry '{}': group {} range {}..{} exceeds draw range {}",
                    desc.name, i, group.start, group.start + group.count, range_len);
            }
        }

        Ok(Self {
            name: desc.name,
            positions: desc.positions,
            normals: desc.normals,
            uvs: desc.uvs,
            tangents: desc.tangents,
            colors: desc.colors,
            indices: desc.indices,
            groups: desc.groups,
            bounds: None,
            version: 0,
        })
    }

    // ===== ACCESSORS =====

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn normals(&self) -> Option<&[Vec3]> {
        self.normals.as_deref()
    }

    pub fn uvs(&self) -> Option<&[Vec2]> {
        self.uvs.as_deref()
    }

    pub fn tangents(&self) -> Option<&[Vec4]> {
        self.tangents.as_deref()
    }

    pub fn colors(&self) -> Option<&[Vec4]> {
        self.colors.as_deref()
    }

    pub fn indices(&self) -> Option<&[u32]> {
        self.indices.as_deref()
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of indices (indexed geometry) or vertices (non-indexed)
    /// in the draw range.
    pub fn draw_count(&self) -> u32 {
        self.indices.as_ref()
            .map(|i| i.len())
            .unwrap_or(self.positions.len()) as u32
    }

    /// Material groups. Empty means one implicit group over the whole range
    /// with material slot 0.
    pub fn groups(&self) -> &[GeometryGroup] {
        &self.groups
    }

    /// Attribute edit version (bumped by `positions_mut`).
    pub fn version(&self) -> u64 {
        self.version
    }

    // ===== EDITS =====

    /// Mutable access to positions. Invalidates cached bounds and bumps
    /// the version so the renderer re-uploads the GPU buffers.
    pub fn positions_mut(&mut self) -> &mut Vec<Vec3> {
        self.bounds = None;
        self.version += 1;
        &mut self.positions
    }

    /// Replace the material groups.
    pub fn set_groups(&mut self, groups: Vec<GeometryGroup>) {
        self.groups = groups;
    }

    // ===== BOUNDS =====

    /// Local-space AABB, computed on first use and cached.
    pub fn aabb(&mut self) -> Aabb {
        self.ensure_bounds();
        self.bounds.unwrap().0
    }

    /// Local-space bounding sphere, computed on first use and cached.
    ///
    /// Center is the AABB center; radius is the largest distance from that
    /// center to any vertex (tighter than the AABB half-diagonal).
    pub fn bounding_sphere(&mut self) -> BoundingSphere {
        self.ensure_bounds();
        self.bounds.unwrap().1
    }

    fn ensure_bounds(&mut self) {
        if self.bounds.is_some() {
            return;
        }
        let mut aabb = Aabb::empty();
        for &p in &self.positions {
            aabb.grow(p);
        }
        let center = aabb.center();
        let mut radius_sq = 0.0f32;
        for &p in &self.positions {
            radius_sq = radius_sq.max(center.distance_squared(p));
        }
        let sphere = BoundingSphere {
            center,
            radius: radius_sq.sqrt(),
        };
        self.bounds = Some((aabb, sphere));
    }
}

#[cfg(test)]
#[path = "geometry_tests.rs"]
mod tests;
