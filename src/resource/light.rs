/// Lights — plain-data light descriptions consumed once per frame.
///
/// The light counts feed the program descriptor (they change compiled-in
/// GPU loop bounds), and the light parameters are flattened into uniform
/// arrays by the uniform uploader.

use glam::Vec3;

/// Infinitely distant light with a direction.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalLight {
    /// Direction the light travels (world space, normalized by the caller)
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub cast_shadow: bool,
}

/// Omnidirectional point light with distance falloff.
#[derive(Debug, Clone, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    /// Influence radius; 0.0 = unbounded
    pub range: f32,
    pub cast_shadow: bool,
}

/// Cone-shaped spot light.
#[derive(Debug, Clone, PartialEq)]
pub struct SpotLight {
    pub position: Vec3,
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    /// Half-angle of the cone in radians
    pub angle: f32,
    /// 0.0 = hard edge, 1.0 = fully soft
    pub penumbra: f32,
    pub range: f32,
    pub cast_shadow: bool,
}

/// Sky/ground gradient ambient light.
#[derive(Debug, Clone, PartialEq)]
pub struct HemisphereLight {
    pub sky_color: Vec3,
    pub ground_color: Vec3,
    pub intensity: f32,
}

/// Per-kind light counts, part of the program cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LightCounts {
    pub directional: u32,
    pub point: u32,
    pub spot: u32,
    pub hemisphere: u32,
    /// Shadow-casting lights across all kinds
    pub shadow: u32,
}

/// All lights affecting the frame.
#[derive(Debug, Clone, Default)]
pub struct LightList {
    pub directional: Vec<DirectionalLight>,
    pub point: Vec<PointLight>,
    pub spot: Vec<SpotLight>,
    pub hemisphere: Vec<HemisphereLight>,
}

impl LightList {
    /// Empty light list (unlit scene).
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts for the program descriptor.
    pub fn counts(&self) -> LightCounts {
        let shadow = self.directional.iter().filter(|l| l.cast_shadow).count()
            + self.point.iter().filter(|l| l.cast_shadow).count()
            + self.spot.iter().filter(|l| l.cast_shadow).count();
        LightCounts {
            directional: self.directional.len() as u32,
            point: self.point.len() as u32,
            spot: self.spot.len() as u32,
            hemisphere: self.hemisphere.len() as u32,
            shadow: shadow as u32,
        }
    }

    /// True if no lights are present.
    pub fn is_empty(&self) -> bool {
        self.directional.is_empty()
            && self.point.is_empty()
            && self.spot.is_empty()
            && self.hemisphere.is_empty()
    }
}

#[cfg(test)]
#[path = "light_tests.rs"]
mod tests;
