//! Per-sequence calibration derivation.
//!
//! A rig file gives the LiDAR-to-camera pose in whatever rotation convention the
//! sensor vendor uses. The camera-centric output format instead assumes the fixed
//! KITTI basis (camera x right, y down, z forward, LiDAR x forward, z up). This
//! module builds that fixed-basis extrinsic, keeps the physical translation, and
//! derives the transform that re-bases raw point clouds so boxes converted with
//! the raw extrinsic line up with points written in the fixed basis.

use std::f64::consts::FRAC_PI_2;

use log::{debug, info};
use nalgebra::{DMatrix, Matrix3, Matrix3x4, Matrix3xX, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

use crate::camera::{validation, CameraError, ResizeScale, Resolution};
use crate::instance::{lidar_to_camera, CameraBox, ConversionError, LidarBox};
use crate::matrix::{
    invert_homogeneous, pad_to_projection, to_fixed, to_homogeneous, transform_points, truncate,
    MatrixError,
};

/// Number of per-point features kept when re-basing a point cloud (x, y, z, intensity).
pub const DEFAULT_POINT_FEATURES: usize = 4;

#[derive(thiserror::Error, Debug)]
pub enum CalibrationError {
    #[error("Matrix error: {0}")]
    Matrix(MatrixError),
    #[error("Camera error: {0}")]
    Camera(CameraError),
}

impl From<MatrixError> for CalibrationError {
    fn from(err: MatrixError) -> Self {
        CalibrationError::Matrix(err)
    }
}

impl From<CameraError> for CalibrationError {
    fn from(err: CameraError) -> Self {
        CalibrationError::Camera(err)
    }
}

/// The fixed LiDAR-to-camera rotation: intrinsic ZYX Euler angles `(π/2, -π/2, 0)`.
pub fn camera_convention_rotation() -> Matrix3<f64> {
    Rotation3::from_euler_angles(0.0, -FRAC_PI_2, FRAC_PI_2).into_inner()
}

/// Replaces the rotation of `extrinsic` with [`camera_convention_rotation`],
/// keeping its translation column.
pub fn camera_convention_extrinsic(extrinsic: &Matrix3x4<f64>) -> Matrix3x4<f64> {
    let mut converted = Matrix3x4::zeros();
    converted
        .fixed_view_mut::<3, 3>(0, 0)
        .copy_from(&camera_convention_rotation());
    converted.set_column(3, &extrinsic.column(3));
    converted
}

/// `inverse(camera-convention extrinsic) * extrinsic`, truncated to 3x4.
///
/// Raw LiDAR points passed through this transform and then through the
/// camera-convention extrinsic land where the raw extrinsic would put them.
pub fn point_cloud_transform(extrinsic: &Matrix3x4<f64>) -> Result<Matrix3x4<f64>, MatrixError> {
    let converted = camera_convention_extrinsic(extrinsic);
    let rebase = invert_homogeneous(&converted)? * to_homogeneous(extrinsic)?;
    Ok(truncate(&rebase))
}

/// Order in which a rig file lists the three Euler angles of a sensor pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EulerOrder {
    /// Angles are applied about Z, Y, X in the order they are stored.
    AsListed,
    /// Angles are stored back to front and are reversed before use.
    Reversed,
}

/// Sensor-to-camera pose as found in a rig description.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorPose {
    pub roll_pitch_yaw: [f64; 3],
    pub translation: [f64; 3],
}

impl SensorPose {
    /// Builds the raw 3x4 extrinsic `[Rz(a0) Ry(a1) Rx(a2) | t]`.
    pub fn to_extrinsic(&self, order: EulerOrder) -> Matrix3x4<f64> {
        let [a0, a1, a2] = match order {
            EulerOrder::AsListed => self.roll_pitch_yaw,
            EulerOrder::Reversed => {
                let [r, p, y] = self.roll_pitch_yaw;
                [y, p, r]
            }
        };
        let rotation = Rotation3::from_euler_angles(a2, a1, a0);

        let mut extrinsic = Matrix3x4::zeros();
        extrinsic
            .fixed_view_mut::<3, 3>(0, 0)
            .copy_from(rotation.matrix());
        extrinsic.set_column(3, &Vector3::from(self.translation));
        extrinsic
    }
}

/// Re-bases a point cloud stored one point per row.
///
/// Only the first `n_features` columns are kept; the leading three (x, y, z) are
/// transformed in `f64` and stored back as `f32`.
///
/// # Errors
///
/// [`MatrixError::InvalidShape`] if `n_features < 3` or the cloud has fewer columns.
pub fn rebase_point_cloud(
    cloud: &DMatrix<f32>,
    n_features: usize,
    transform: &Matrix3x4<f64>,
) -> Result<DMatrix<f32>, MatrixError> {
    let (rows, cols) = cloud.shape();
    if n_features < 3 || cols < n_features {
        return Err(MatrixError::InvalidShape { rows, cols });
    }

    let mut rebased = cloud.columns(0, n_features).into_owned();
    let xyz = Matrix3xX::from_fn(rows, |axis, point| cloud[(point, axis)] as f64);
    let moved = transform_points(&xyz, transform)?;

    for point in 0..rows {
        for axis in 0..3 {
            rebased[(point, axis)] = moved[(axis, point)] as f32;
        }
    }

    Ok(rebased)
}

/// Immutable calibration shared by every conversion in one recording sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceCalibration {
    sensor_to_camera: Matrix3x4<f64>,
    camera_convention: Matrix3x4<f64>,
    intrinsic: Matrix3<f64>,
    point_cloud_transform: Matrix3x4<f64>,
    image_size: Resolution,
    /// Part of `image_size` covered by real image content; 2D boxes are clipped to it.
    content_size: Resolution,
}

impl SequenceCalibration {
    /// Derives the calibration context of a sequence from its raw rig pose.
    ///
    /// # Errors
    ///
    /// * [`CalibrationError::Camera`] for a zero image size.
    /// * [`CalibrationError::Matrix`] if the camera-convention extrinsic is singular.
    pub fn derive(
        extrinsic: &Matrix3x4<f64>,
        intrinsic: &Matrix3<f64>,
        image_size: Resolution,
    ) -> Result<Self, CalibrationError> {
        validation::validate_resolution(&image_size)?;

        let camera_convention = camera_convention_extrinsic(extrinsic);
        let point_cloud_transform = point_cloud_transform(extrinsic)?;

        info!(
            "Derived sequence calibration for {}x{} images",
            image_size.width, image_size.height
        );
        debug!("Point cloud transform: {point_cloud_transform}");

        Ok(SequenceCalibration {
            sensor_to_camera: *extrinsic,
            camera_convention,
            intrinsic: *intrinsic,
            point_cloud_transform,
            image_size,
            content_size: image_size,
        })
    }

    /// Like [`SequenceCalibration::derive`], for images resized to `target` before output.
    ///
    /// The intrinsic is rescaled so boxes are projected straight into the resized
    /// image. With padding, boxes are clipped to the scaled content, never to the
    /// filler beyond it.
    pub fn derive_resized(
        extrinsic: &Matrix3x4<f64>,
        intrinsic: &Matrix3<f64>,
        image_size: Resolution,
        target: Resolution,
        padding: bool,
    ) -> Result<Self, CalibrationError> {
        let scale = ResizeScale::new(&image_size, &target, padding)?;
        debug!(
            "Resizing {}x{} -> {}x{} with scale ({}, {})",
            image_size.width,
            image_size.height,
            target.width,
            target.height,
            scale.scale_x,
            scale.scale_y
        );
        let content_size = scale.content_size(&image_size);
        let calibration =
            SequenceCalibration::derive(extrinsic, &scale.apply_to_intrinsic(intrinsic), target)?;
        Ok(SequenceCalibration {
            content_size,
            ..calibration
        })
    }

    /// Shape-checked entry point for matrices read at runtime.
    ///
    /// # Errors
    ///
    /// [`MatrixError::InvalidShape`] unless the extrinsic is 3x4 and the intrinsic 3x3.
    pub fn from_dynamic(
        extrinsic: &DMatrix<f64>,
        intrinsic: &DMatrix<f64>,
        image_size: Resolution,
    ) -> Result<Self, CalibrationError> {
        let extrinsic: Matrix3x4<f64> = to_fixed(extrinsic)?;
        let intrinsic: Matrix3<f64> = to_fixed(intrinsic)?;
        SequenceCalibration::derive(&extrinsic, &intrinsic, image_size)
    }

    /// Raw sensor-to-camera extrinsic, used for converting labels.
    pub fn sensor_to_camera(&self) -> &Matrix3x4<f64> {
        &self.sensor_to_camera
    }

    /// Fixed-basis extrinsic written out as the camera-centric `Tr_velo_to_cam`.
    pub fn camera_convention(&self) -> &Matrix3x4<f64> {
        &self.camera_convention
    }

    pub fn intrinsic(&self) -> &Matrix3<f64> {
        &self.intrinsic
    }

    pub fn point_cloud_transform(&self) -> &Matrix3x4<f64> {
        &self.point_cloud_transform
    }

    pub fn image_size(&self) -> Resolution {
        self.image_size
    }

    pub fn content_size(&self) -> Resolution {
        self.content_size
    }

    /// `[K | 0]`, the camera-centric `P2` entry.
    pub fn projection_matrix(&self) -> Matrix3x4<f64> {
        pad_to_projection(&self.intrinsic)
    }

    /// Converts a LiDAR-frame record into the camera-centric record of this sequence.
    pub fn convert(&self, instance: &LidarBox) -> Result<CameraBox, ConversionError> {
        lidar_to_camera(
            instance,
            &self.sensor_to_camera,
            &self.intrinsic,
            &self.content_size,
        )
    }

    pub fn rebase_point_cloud(
        &self,
        cloud: &DMatrix<f32>,
        n_features: usize,
    ) -> Result<DMatrix<f32>, MatrixError> {
        rebase_point_cloud(cloud, n_features, &self.point_cloud_transform)
    }
}
