//! Pinhole camera parameters shared by the projection and calibration stages.
//!
//! [`Intrinsics`] and [`Resolution`] describe the camera a sequence was recorded
//! with; [`ResizeScale`] re-targets an intrinsic matrix when the images of a
//! sequence are resized (optionally letterboxed) before being written out.

use nalgebra::{Matrix3, Matrix3x4};
use serde::{Deserialize, Serialize};

pub mod pinhole;

pub use pinhole::PinholeModel;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Intrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl Intrinsics {
    /// Reads `fx, fy, cx, cy` from a 3x3 pinhole matrix. Skew is ignored.
    pub fn from_matrix(matrix: &Matrix3<f64>) -> Self {
        Intrinsics {
            fx: matrix[(0, 0)],
            fy: matrix[(1, 1)],
            cx: matrix[(0, 2)],
            cy: matrix[(1, 2)],
        }
    }

    pub fn to_matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.fx, 0.0, self.cx, //
            0.0, self.fy, self.cy, //
            0.0, 0.0, 1.0,
        )
    }

    /// The 3x4 projection matrix `[K | 0]` used when projecting camera-frame points.
    pub fn projection_matrix(&self) -> Matrix3x4<f64> {
        crate::matrix::pad_to_projection(&self.to_matrix())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

#[derive(thiserror::Error, Debug)]
pub enum CameraError {
    #[error("Focal length must be positive")]
    FocalLengthMustBePositive,
    #[error("Principal point must be finite")]
    PrincipalPointMustBeFinite,
    #[error("Image resolution must be non-zero, got {width}x{height}")]
    InvalidResolution { width: u32, height: u32 },
    #[error("Invalid camera parameters: {0}")]
    InvalidParams(String),
    #[error("Failed to load YAML: {0}")]
    YamlError(String),
    #[error("IO Error: {0}")]
    IOError(String),
}

impl From<std::io::Error> for CameraError {
    fn from(err: std::io::Error) -> Self {
        CameraError::IOError(err.to_string())
    }
}

impl From<yaml_rust::ScanError> for CameraError {
    fn from(err: yaml_rust::ScanError) -> Self {
        CameraError::YamlError(err.to_string())
    }
}

/// Per-axis scale factors taking an image of one size to another.
///
/// With `padding` the image keeps its aspect ratio (both axes use the smaller
/// factor) and the remainder of the target canvas is padded on the right and
/// bottom. Without it, each axis is stretched independently.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResizeScale {
    pub scale_x: f64,
    pub scale_y: f64,
}

impl ResizeScale {
    pub fn new(
        original: &Resolution,
        target: &Resolution,
        padding: bool,
    ) -> Result<Self, CameraError> {
        validation::validate_resolution(original)?;
        validation::validate_resolution(target)?;

        let scale_x = target.width as f64 / original.width as f64;
        let scale_y = target.height as f64 / original.height as f64;

        if padding {
            let scale = scale_x.min(scale_y);
            Ok(ResizeScale {
                scale_x: scale,
                scale_y: scale,
            })
        } else {
            Ok(ResizeScale { scale_x, scale_y })
        }
    }

    /// Size of the resized image content inside the target canvas.
    ///
    /// Equals the target without padding; with padding the remainder of the
    /// canvas to the right or bottom is filler.
    pub fn content_size(&self, original: &Resolution) -> Resolution {
        Resolution {
            width: (original.width as f64 * self.scale_x).round() as u32,
            height: (original.height as f64 * self.scale_y).round() as u32,
        }
    }

    /// Returns `diag(scale_x, scale_y, 1) * intrinsic`.
    pub fn apply_to_intrinsic(&self, intrinsic: &Matrix3<f64>) -> Matrix3<f64> {
        let scale = Matrix3::new(
            self.scale_x, 0.0, 0.0, //
            0.0, self.scale_y, 0.0, //
            0.0, 0.0, 1.0,
        );
        scale * intrinsic
    }
}

/// Common validation functions for camera parameters
pub mod validation {
    use super::*;

    pub fn validate_intrinsics(intrinsics: &Intrinsics) -> Result<(), CameraError> {
        if intrinsics.fx <= 0.0 || intrinsics.fy <= 0.0 {
            return Err(CameraError::FocalLengthMustBePositive);
        }
        if !intrinsics.cx.is_finite() || !intrinsics.cy.is_finite() {
            return Err(CameraError::PrincipalPointMustBeFinite);
        }
        Ok(())
    }

    pub fn validate_resolution(resolution: &Resolution) -> Result<(), CameraError> {
        if resolution.width == 0 || resolution.height == 0 {
            return Err(CameraError::InvalidResolution {
                width: resolution.width,
                height: resolution.height,
            });
        }
        Ok(())
    }
}
