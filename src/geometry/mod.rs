//! Cuboid construction and pinhole projection in the camera-centric box convention.
//!
//! Camera-frame boxes are anchored at the centre of their bottom face, with y
//! pointing down, so the cuboid extends from `y = 0` to `y = -height` in the
//! object's local frame. Heading rotates the box about the vertical (y) axis.

use nalgebra::{Matrix2xX, Matrix3, Matrix3x4, Matrix3xX, Vector3, Vector4};
use serde::{Deserialize, Serialize};

use crate::camera::Resolution;
use crate::matrix::Dimensions;

pub mod angle;

pub use angle::{observation_angle, wrap_angle};

/// Corners closer to the camera plane than this are considered behind the camera.
pub const MIN_DEPTH: f64 = 0.1;

/// Integer pixel box `(left, top, right, bottom)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelBox {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl PixelBox {
    /// Marks a box whose cuboid could not be projected. Not a real coordinate.
    pub const SENTINEL: PixelBox = PixelBox {
        left: -10,
        top: -10,
        right: -10,
        bottom: -10,
    };

    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        PixelBox {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        *self == PixelBox::SENTINEL
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Pixel count with both edges included: `(w + 1) * (h + 1)`.
    pub fn inclusive_area(&self) -> i64 {
        (self.width() as i64 + 1) * (self.height() as i64 + 1)
    }

    /// Inclusive pixel count of the intersection with `other`, zero when disjoint.
    pub fn inclusive_overlap(&self, other: &PixelBox) -> i64 {
        let left = self.left.max(other.left) as i64;
        let top = self.top.max(other.top) as i64;
        let right = self.right.min(other.right) as i64;
        let bottom = self.bottom.min(other.bottom) as i64;

        (right - left + 1).max(0) * (bottom - top + 1).max(0)
    }
}

/// A cuboid in camera coordinates and, when it lies in front of the camera, its projection.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedBox {
    pub corners_3d: Matrix3xX<f64>,
    /// `None` when any corner is behind the camera; projection is not attempted then.
    pub corners_2d: Option<Matrix2xX<f64>>,
}

impl ProjectedBox {
    pub fn is_behind_camera(&self) -> bool {
        self.corners_2d.is_none()
    }
}

/// Right-handed rotation about the camera's vertical (y) axis.
pub fn rotation_about_vertical(theta: f64) -> Matrix3<f64> {
    let (s, c) = theta.sin_cos();
    Matrix3::new(
        c, 0.0, s, //
        0.0, 1.0, 0.0, //
        -s, 0.0, c,
    )
}

/// The 8 corners of an oriented box, one per column.
///
/// Corner order is fixed because drawing code connects corners by index:
/// columns 0..4 are the bottom face and 4..8 the top face, each walking
/// `(+l/2, +w/2)`, `(+l/2, -w/2)`, `(-l/2, -w/2)`, `(-l/2, +w/2)` in the
/// object's local x/z before rotation by `heading` and translation to `location`.
pub fn cuboid_corners(
    dimensions: &Dimensions,
    location: &Vector3<f64>,
    heading: f64,
) -> Matrix3xX<f64> {
    let Dimensions {
        width,
        height,
        length,
    } = *dimensions;
    let (hl, hw) = (length / 2.0, width / 2.0);

    let x_corners = [hl, hl, -hl, -hl, hl, hl, -hl, -hl];
    let y_corners = [0.0, 0.0, 0.0, 0.0, -height, -height, -height, -height];
    let z_corners = [hw, -hw, -hw, hw, hw, -hw, -hw, hw];

    let rotation = rotation_about_vertical(heading);
    let mut corners = Matrix3xX::zeros(8);
    for idx in 0..8 {
        let local = Vector3::new(x_corners[idx], y_corners[idx], z_corners[idx]);
        corners.set_column(idx, &(rotation * local + location));
    }
    corners
}

/// Pinhole projection of each column of `points` through a 3x4 matrix.
pub fn project_points(points: &Matrix3xX<f64>, projection: &Matrix3x4<f64>) -> Matrix2xX<f64> {
    let mut projected = Matrix2xX::zeros(points.ncols());
    for (idx, point) in points.column_iter().enumerate() {
        let image = projection * Vector4::new(point[0], point[1], point[2], 1.0);
        projected[(0, idx)] = image.x / image.z;
        projected[(1, idx)] = image.y / image.z;
    }
    projected
}

/// Builds the cuboid of a camera-frame box and projects it into the image.
///
/// If any corner has depth below [`MIN_DEPTH`] the box is reported as behind the
/// camera and only the 3D corners are returned.
pub fn compute_box_3d(
    dimensions: &Dimensions,
    location: &Vector3<f64>,
    heading: f64,
    projection: &Matrix3x4<f64>,
) -> ProjectedBox {
    let corners_3d = cuboid_corners(dimensions, location, heading);

    if corners_3d.row(2).iter().any(|&depth| depth < MIN_DEPTH) {
        return ProjectedBox {
            corners_3d,
            corners_2d: None,
        };
    }

    let corners_2d = project_points(&corners_3d, projection);
    ProjectedBox {
        corners_3d,
        corners_2d: Some(corners_2d),
    }
}

/// Axis-aligned pixel box around projected corners.
///
/// Extremes are rounded half-to-even, then the left/top edges are clamped at 0 and
/// the right/bottom edges at the image width/height.
pub fn image_box_from_corners(corners_2d: &Matrix2xX<f64>, image_size: &Resolution) -> PixelBox {
    let xs = corners_2d.row(0);
    let ys = corners_2d.row(1);

    let round = |value: f64| value.round_ties_even() as i32;

    PixelBox {
        left: round(xs.min()).max(0),
        top: round(ys.min()).max(0),
        right: round(xs.max()).min(image_size.width as i32),
        bottom: round(ys.max()).min(image_size.height as i32),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn projection() -> Matrix3x4<f64> {
        Matrix3x4::new(
            700.0, 0.0, 640.0, 0.0, //
            0.0, 700.0, 360.0, 0.0, //
            0.0, 0.0, 1.0, 0.0,
        )
    }

    fn car() -> Dimensions {
        Dimensions {
            width: 1.8,
            height: 1.5,
            length: 4.0,
        }
    }

    #[test]
    fn test_rotation_about_vertical() {
        let rotation = rotation_about_vertical(std::f64::consts::FRAC_PI_2);
        let rotated = rotation * Vector3::new(1.0, 0.0, 0.0);
        assert_relative_eq!(rotated, Vector3::new(0.0, 0.0, -1.0), epsilon = 1e-12);
        assert_relative_eq!(rotation.determinant(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_cuboid_corner_order() {
        let corners = cuboid_corners(&car(), &Vector3::new(1.0, 2.0, 10.0), 0.0);
        assert_eq!(corners.ncols(), 8);

        assert_relative_eq!(
            corners.column(0).into_owned(),
            Vector3::new(3.0, 2.0, 10.9),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            corners.column(2).into_owned(),
            Vector3::new(-1.0, 2.0, 9.1),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            corners.column(5).into_owned(),
            Vector3::new(3.0, 0.5, 9.1),
            epsilon = 1e-12
        );
        // bottom face sits on the anchor, top face one height above
        for idx in 0..4 {
            assert_relative_eq!(corners[(1, idx)], 2.0);
            assert_relative_eq!(corners[(1, idx + 4)], 0.5);
        }
    }

    #[test]
    fn test_project_points_center_hits_principal_point() {
        let points = Matrix3xX::from_columns(&[
            Vector3::new(0.0, 0.0, 5.0),
            Vector3::new(1.0, -1.0, 2.0),
        ]);
        let projected = project_points(&points, &projection());
        assert_relative_eq!(projected[(0, 0)], 640.0);
        assert_relative_eq!(projected[(1, 0)], 360.0);
        assert_relative_eq!(projected[(0, 1)], 990.0);
        assert_relative_eq!(projected[(1, 1)], 10.0);
    }

    #[test]
    fn test_compute_box_3d_in_front() {
        let projected = compute_box_3d(&car(), &Vector3::new(0.0, 1.5, 15.0), 0.3, &projection());
        assert!(!projected.is_behind_camera());
        let corners_2d = projected.corners_2d.unwrap();
        assert_eq!(corners_2d.ncols(), 8);
        assert!(corners_2d.iter().all(|value| value.is_finite()));
    }

    #[test]
    fn test_compute_box_3d_behind_camera() {
        let projected =
            compute_box_3d(&car(), &Vector3::new(0.0, 1.5, -15.0), 0.0, &projection());
        assert!(projected.is_behind_camera());
        assert_eq!(projected.corners_3d.ncols(), 8);

        // straddling the camera plane also counts as not visible
        let straddling = compute_box_3d(&car(), &Vector3::new(0.0, 1.5, 0.5), 0.0, &projection());
        assert!(straddling.is_behind_camera());
    }

    #[test]
    fn test_image_box_from_corners_clips_and_rounds() {
        let corners = Matrix2xX::from_row_slice(&[
            -20.4, 100.5, 101.5, 50.0, //
            10.2, 30.7, 900.0, 20.0,
        ]);
        let image_size = Resolution {
            width: 640,
            height: 480,
        };
        let bbox = image_box_from_corners(&corners, &image_size);
        assert_eq!(bbox, PixelBox::new(0, 10, 102, 480));

        let corners = Matrix2xX::from_row_slice(&[2.5, 3.5, 4.0, 4.0]);
        let bbox = image_box_from_corners(&corners, &image_size);
        // 2.5 -> 2 and 3.5 -> 4 under half-to-even
        assert_eq!(bbox, PixelBox::new(2, 4, 4, 4));
    }

    #[test]
    fn test_pixel_box_overlap_is_inclusive() {
        let a = PixelBox::new(0, 0, 100, 100);
        let b = PixelBox::new(10, 10, 90, 90);
        assert_eq!(a.inclusive_area(), 101 * 101);
        assert_eq!(a.inclusive_overlap(&b), 81 * 81);
        assert_eq!(b.inclusive_overlap(&a), 81 * 81);

        let far = PixelBox::new(200, 200, 210, 210);
        assert_eq!(a.inclusive_overlap(&far), 0);
        assert!(PixelBox::SENTINEL.is_sentinel());
    }
}
