//! Axis-aligned bounding volumes for spatial queries and culling

use crate::foundation::math::Vec3;

/// Axis-Aligned Bounding Box with cached corner points
///
/// Holds min/max per axis plus the eight derived corner points and the
/// center, all in the same space (world space on scene nodes). A freshly
/// reset volume sits at the +inf/-inf sentinels so that any expansion wins;
/// numeric input is never validated (NaN/inf propagate - the per-frame hot
/// path deliberately trades validation for speed).
///
/// # Corner ordering
///
/// Corner index bits select per axis: bit 0 -> x, bit 1 -> y, bit 2 -> z,
/// with a set bit taking the max on that axis:
///
/// ```text
/// 0: (min.x, min.y, min.z)    4: (min.x, min.y, max.z)
/// 1: (max.x, min.y, min.z)    5: (max.x, min.y, max.z)
/// 2: (min.x, max.y, min.z)    6: (min.x, max.y, max.z)
/// 3: (max.x, max.y, min.z)    7: (max.x, max.y, max.z)
/// ```
///
/// The frustum culler indexes corners with per-plane offsets precomputed
/// against this ordering; do not reorder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingVolume {
    /// Minimum corner of the bounding box
    pub min: Vec3,

    /// Maximum corner of the bounding box
    pub max: Vec3,

    corners: [Vec3; 8],
    center: Vec3,
}

impl Default for BoundingVolume {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundingVolume {
    /// Create an unexpanded volume (identity under expansion)
    pub fn new() -> Self {
        Self {
            min: Vec3::from_element(f32::INFINITY),
            max: Vec3::from_element(f32::NEG_INFINITY),
            corners: [Vec3::zeros(); 8],
            center: Vec3::zeros(),
        }
    }

    /// Create a volume from explicit min and max points
    pub fn from_min_max(min: Vec3, max: Vec3) -> Self {
        let mut volume = Self::new();
        volume.min = min;
        volume.max = max;
        volume.compute_corners();
        volume
    }

    /// Create a volume centered at a point with given half-extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self::from_min_max(center - extents, center + extents)
    }

    /// Reset to the unexpanded sentinel state
    pub fn reset(&mut self) {
        self.min = Vec3::from_element(f32::INFINITY);
        self.max = Vec3::from_element(f32::NEG_INFINITY);
    }

    /// True while no expansion has happened since the last reset
    pub fn is_unset(&self) -> bool {
        self.min.x > self.max.x
    }

    /// Fold a flat point buffer into the running min/max
    pub fn expand_from_points(&mut self, points: &[Vec3]) {
        for point in points {
            self.min = self.min.inf(point);
            self.max = self.max.sup(point);
        }
    }

    /// Fold another volume's min/max into this one
    ///
    /// Used to aggregate child volumes into a parent volume; cheaper than
    /// re-deriving from raw points. An unset `other` is the identity.
    pub fn expand_from_box(&mut self, other: &Self) {
        self.min = self.min.inf(&other.min);
        self.max = self.max.sup(&other.max);
    }

    /// Derive the eight corner points and the center from min/max
    ///
    /// Must be called after the last expansion before corners are read.
    pub fn compute_corners(&mut self) {
        for (i, corner) in self.corners.iter_mut().enumerate() {
            *corner = Vec3::new(
                if i & 1 != 0 { self.max.x } else { self.min.x },
                if i & 2 != 0 { self.max.y } else { self.min.y },
                if i & 4 != 0 { self.max.z } else { self.min.z },
            );
        }
        self.center = (self.min + self.max) * 0.5;
    }

    /// Get a cached corner point by index (see the type docs for ordering)
    pub fn corner(&self, index: usize) -> Vec3 {
        self.corners[index]
    }

    /// Get all eight cached corner points
    pub fn corners(&self) -> [Vec3; 8] {
        self.corners
    }

    /// Get the cached center point
    pub fn center(&self) -> Vec3 {
        self.center
    }

    /// Get the extents (half-size) of the volume
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Check if this volume intersects another (separating-axis AABB test)
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Check if this volume contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }
}
