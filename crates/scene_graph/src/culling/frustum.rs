//! Frustum plane extraction and coherent box classification
//!
//! Planes are extracted from a combined projection*view matrix with the
//! Gribb-Hartmann row method and face inward: a point is inside a plane
//! when its signed distance is non-negative. Box tests use only the two
//! extremal corners per plane (n-vertex/p-vertex), selected by offsets
//! precomputed from the plane's normal sign pattern.

use bitflags::bitflags;

use crate::foundation::math::{Mat4, Vec3, Vec4};
use crate::scene::bounds::BoundingVolume;

bitflags! {
    /// One bit per frustum plane, carried down the tree during culling.
    ///
    /// A set bit means the plane was not trivially satisfied by an ancestor
    /// and must still be tested. An ancestor fully inside a plane clears
    /// that plane's bit for its whole subtree.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PlaneMask: u8 {
        /// Left clip plane
        const LEFT = 1 << 0;
        /// Right clip plane
        const RIGHT = 1 << 1;
        /// Bottom clip plane
        const BOTTOM = 1 << 2;
        /// Top clip plane
        const TOP = 1 << 3;
        /// Near clip plane
        const NEAR = 1 << 4;
        /// Far clip plane
        const FAR = 1 << 5;
    }
}

/// Result of classifying a bounding volume against the frustum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Entirely outside at least one plane; the whole subtree is invisible
    Outside,
    /// Straddles at least one plane; children must be tested individually
    Intersect,
    /// Inside every remaining plane; the whole subtree is visible
    Inside,
}

/// Outcome of one classification, including the narrowed mask for children
#[derive(Debug, Clone, Copy)]
pub struct Classification {
    /// Overall visibility of the tested volume
    pub visibility: Visibility,

    /// Plane mask to hand to children (bits cleared for planes the volume
    /// is entirely inside of)
    pub out_mask: PlaneMask,

    /// The plane that rejected the volume, when `visibility` is `Outside`;
    /// cached per node to exploit temporal coherence on the next frame
    pub failed_plane: Option<u8>,
}

/// Plane equation a*x + b*y + c*z + d = 0 with inward-facing normal
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    /// Plane normal (a, b, c)
    pub normal: Vec3,

    /// Distance term d
    pub d: f32,
}

impl Plane {
    fn from_coefficients(coefficients: Vec4) -> Self {
        let normal = Vec3::new(coefficients.x, coefficients.y, coefficients.z);
        let length = normal.magnitude();
        if length > 0.0 {
            Self {
                normal: normal / length,
                d: coefficients.w / length,
            }
        } else {
            Self {
                normal,
                d: coefficients.w,
            }
        }
    }

    /// Signed distance from the plane to a point (negative = outside)
    pub fn distance_to(&self, point: Vec3) -> f32 {
        self.normal.dot(&point) + self.d
    }
}

/// Six view-frustum planes with precomputed extremal-corner offsets
#[derive(Debug, Clone)]
pub struct Frustum {
    /// Planes in mask order: left, right, bottom, top, near, far
    planes: [Plane; 6],

    /// Per plane: corner index most positive along the plane normal
    p_vertex: [usize; 6],

    /// Per plane: corner index most negative along the plane normal
    /// (diagonally opposite the p-vertex)
    n_vertex: [usize; 6],
}

impl Frustum {
    /// Extract the six planes from a combined projection*view matrix
    ///
    /// Each plane is a row combination of the matrix (Gribb-Hartmann):
    /// left = r3 + r0, right = r3 - r0, bottom = r3 + r1, top = r3 - r1,
    /// near = r3 + r2, far = r3 - r2.
    pub fn from_matrix(matrix: &Mat4) -> Self {
        let row = |r: usize| {
            Vec4::new(
                matrix[(r, 0)],
                matrix[(r, 1)],
                matrix[(r, 2)],
                matrix[(r, 3)],
            )
        };
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));

        let planes = [
            Plane::from_coefficients(r3 + r0),
            Plane::from_coefficients(r3 - r0),
            Plane::from_coefficients(r3 + r1),
            Plane::from_coefficients(r3 - r1),
            Plane::from_coefficients(r3 + r2),
            Plane::from_coefficients(r3 - r2),
        ];

        // The p-vertex takes the max corner on every axis where the normal
        // is positive; one comparison per axis replaces an 8-corner scan.
        let mut p_vertex = [0usize; 6];
        let mut n_vertex = [0usize; 6];
        for (i, plane) in planes.iter().enumerate() {
            let p = usize::from(plane.normal.x > 0.0)
                | usize::from(plane.normal.y > 0.0) << 1
                | usize::from(plane.normal.z > 0.0) << 2;
            p_vertex[i] = p;
            n_vertex[i] = p ^ 7;
        }

        Self {
            planes,
            p_vertex,
            n_vertex,
        }
    }

    /// Access the planes in mask order
    pub fn planes(&self) -> &[Plane; 6] {
        &self.planes
    }

    fn test_plane(&self, index: usize, bounds: &BoundingVolume) -> Visibility {
        let plane = &self.planes[index];
        if plane.distance_to(bounds.corner(self.p_vertex[index])) < 0.0 {
            // even the most-inside corner is out
            Visibility::Outside
        } else if plane.distance_to(bounds.corner(self.n_vertex[index])) < 0.0 {
            Visibility::Intersect
        } else {
            Visibility::Inside
        }
    }

    /// Classify a bounding volume against the planes still set in `in_mask`
    ///
    /// `last_failed` is the plane that rejected this volume on a previous
    /// frame; it is retested first since a moving camera or object tends to
    /// fail the same plane again.
    pub fn classify(
        &self,
        bounds: &BoundingVolume,
        in_mask: PlaneMask,
        last_failed: Option<u8>,
    ) -> Classification {
        let mut out_mask = in_mask;

        if let Some(cached) = last_failed {
            let index = cached as usize;
            let bit = PlaneMask::from_bits_truncate(1 << index);
            if in_mask.contains(bit) {
                match self.test_plane(index, bounds) {
                    Visibility::Outside => {
                        return Classification {
                            visibility: Visibility::Outside,
                            out_mask,
                            failed_plane: Some(cached),
                        };
                    }
                    Visibility::Inside => out_mask.remove(bit),
                    Visibility::Intersect => {}
                }
            }
        }

        for index in 0..6 {
            if last_failed == Some(index as u8) {
                continue;
            }
            let bit = PlaneMask::from_bits_truncate(1 << index);
            if !in_mask.contains(bit) {
                continue;
            }
            match self.test_plane(index, bounds) {
                Visibility::Outside => {
                    return Classification {
                        visibility: Visibility::Outside,
                        out_mask,
                        failed_plane: Some(index as u8),
                    };
                }
                Visibility::Inside => out_mask.remove(bit),
                Visibility::Intersect => {}
            }
        }

        let visibility = if out_mask.is_empty() {
            Visibility::Inside
        } else {
            Visibility::Intersect
        };
        Classification {
            visibility,
            out_mask,
            failed_plane: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Symmetric frustum for a camera at the origin looking down -Z
    fn test_frustum() -> Frustum {
        let projection = Mat4::new_perspective(1.0, std::f32::consts::FRAC_PI_2, 0.1, 100.0);
        Frustum::from_matrix(&projection)
    }

    fn classify_box(frustum: &Frustum, min: Vec3, max: Vec3) -> Classification {
        let bounds = BoundingVolume::from_min_max(min, max);
        frustum.classify(&bounds, PlaneMask::all(), None)
    }

    #[test]
    fn test_box_behind_near_plane_is_outside() {
        let frustum = test_frustum();
        // positive z is behind the camera
        let result = classify_box(&frustum, Vec3::new(-1.0, -1.0, 1.0), Vec3::new(1.0, 1.0, 2.0));
        assert_eq!(result.visibility, Visibility::Outside);
        assert!(result.failed_plane.is_some());
    }

    #[test]
    fn test_contained_box_is_inside_with_empty_mask() {
        let frustum = test_frustum();
        let result = classify_box(
            &frustum,
            Vec3::new(-1.0, -1.0, -12.0),
            Vec3::new(1.0, 1.0, -10.0),
        );
        assert_eq!(result.visibility, Visibility::Inside);
        assert!(result.out_mask.is_empty());
    }

    #[test]
    fn test_straddling_box_is_intersect_and_keeps_plane_bit() {
        let frustum = test_frustum();
        // with fov 90 and aspect 1, the left boundary at z = -10 is x = -10
        let result = classify_box(
            &frustum,
            Vec3::new(-12.0, -1.0, -11.0),
            Vec3::new(-8.0, 1.0, -10.0),
        );
        assert_eq!(result.visibility, Visibility::Intersect);
        assert!(result.out_mask.contains(PlaneMask::LEFT));
        assert!(!result.out_mask.contains(PlaneMask::RIGHT));
    }

    #[test]
    fn test_cached_failing_plane_short_circuits() {
        let frustum = test_frustum();
        let bounds = BoundingVolume::from_min_max(
            Vec3::new(-1.0, -1.0, 1.0),
            Vec3::new(1.0, 1.0, 2.0),
        );

        let first = frustum.classify(&bounds, PlaneMask::all(), None);
        assert_eq!(first.visibility, Visibility::Outside);

        // retesting with the cached plane must fail on the same plane
        let second = frustum.classify(&bounds, PlaneMask::all(), first.failed_plane);
        assert_eq!(second.visibility, Visibility::Outside);
        assert_eq!(second.failed_plane, first.failed_plane);
    }

    #[test]
    fn test_cleared_mask_bits_are_not_retested() {
        let frustum = test_frustum();
        // box outside the left plane, but the left bit is already cleared
        // by an ancestor: the plane must not reject it here
        let bounds = BoundingVolume::from_min_max(
            Vec3::new(-30.0, -1.0, -11.0),
            Vec3::new(-25.0, 1.0, -10.0),
        );
        let mask = PlaneMask::all() - PlaneMask::LEFT;
        let result = frustum.classify(&bounds, mask, None);
        assert_ne!(result.visibility, Visibility::Outside);
    }
}
