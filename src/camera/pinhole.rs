//! Implements the Pinhole camera model used by the annotation converters.
//!
//! This module provides the [`PinholeModel`] struct, which pairs the intrinsic
//! parameters of a sequence's camera with the resolution of its images. It is the
//! file-backed way of supplying the intrinsic half of a
//! [`crate::calib::SequenceCalibration`].

use crate::camera::{validation, CameraError, Intrinsics, ResizeScale, Resolution};
use nalgebra::{DVector, Matrix3, Matrix3x4};
use serde::{Deserialize, Serialize};
use std::fs;
use yaml_rust::YamlLoader;

/// On-disk layout written by [`PinholeModel::save_to_yaml`].
#[derive(Serialize)]
struct CameraFile {
    cam0: CameraEntry,
}

#[derive(Serialize)]
struct CameraEntry {
    camera_model: String,
    intrinsics: [f64; 4],
    resolution: [u32; 2],
}

/// Represents a Pinhole camera model.
///
/// This struct holds the intrinsic parameters (focal length, principal point)
/// and image resolution for a pinhole camera. It assumes no lens distortion,
/// which matches the rectified images the camera-centric label format refers to.
///
/// # Examples
///
/// ```rust
/// use nalgebra::DVector;
/// use annotation_tools::camera::pinhole::PinholeModel;
/// use annotation_tools::camera::Resolution;
///
/// let params = DVector::from_vec(vec![500.0, 500.0, 320.0, 240.0]); // fx, fy, cx, cy
/// let mut pinhole_model = PinholeModel::new(&params).unwrap();
/// pinhole_model.resolution = Resolution { width: 640, height: 480 };
///
/// assert_eq!(pinhole_model.intrinsics.fx, 500.0);
/// assert_eq!(pinhole_model.resolution.width, 640);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinholeModel {
    /// The intrinsic parameters of the camera, [`Intrinsics`] (fx, fy, cx, cy).
    pub intrinsics: Intrinsics,
    /// The resolution of the camera image, [`Resolution`] (width, height).
    pub resolution: Resolution,
}

impl PinholeModel {
    /// Creates a new [`PinholeModel`] from a vector of parameters.
    ///
    /// The resolution is initialized to 0x0 and should be set manually or by loading from YAML.
    ///
    /// # Arguments
    ///
    /// * `parameters` - `fx`, `fy`, `cx`, `cy` in that order.
    ///
    /// # Errors
    ///
    /// * [`CameraError::InvalidParams`] if fewer than four parameters are given.
    /// * [`CameraError::FocalLengthMustBePositive`] / [`CameraError::PrincipalPointMustBeFinite`]
    ///   from `validate_params`.
    pub fn new(parameters: &DVector<f64>) -> Result<Self, CameraError> {
        if parameters.len() < 4 {
            return Err(CameraError::InvalidParams(format!(
                "Pinhole model requires 4 parameters, got {}",
                parameters.len()
            )));
        }

        let model = PinholeModel {
            intrinsics: Intrinsics {
                fx: parameters[0],
                fy: parameters[1],
                cx: parameters[2],
                cy: parameters[3],
            },
            resolution: Resolution {
                width: 0,
                height: 0,
            },
        };

        model.validate_params()?;

        Ok(model)
    }

    /// Builds a model from a 3x3 intrinsic matrix and the image size it applies to.
    pub fn from_matrix(intrinsic: &Matrix3<f64>, resolution: Resolution) -> Result<Self, CameraError> {
        let model = PinholeModel {
            intrinsics: Intrinsics::from_matrix(intrinsic),
            resolution,
        };
        model.validate_params()?;
        Ok(model)
    }

    pub fn intrinsic_matrix(&self) -> Matrix3<f64> {
        self.intrinsics.to_matrix()
    }

    pub fn projection_matrix(&self) -> Matrix3x4<f64> {
        self.intrinsics.projection_matrix()
    }

    /// Returns the model describing the same camera after its images were resized to `target`.
    ///
    /// # Errors
    ///
    /// [`CameraError::InvalidResolution`] if either resolution has a zero side.
    pub fn resized(&self, target: Resolution, padding: bool) -> Result<Self, CameraError> {
        let scale = ResizeScale::new(&self.resolution, &target, padding)?;
        let intrinsic = scale.apply_to_intrinsic(&self.intrinsic_matrix());
        PinholeModel::from_matrix(&intrinsic, target)
    }

    /// Loads camera parameters from a YAML file.
    ///
    /// The YAML file is expected to contain a `cam0` entry with an `intrinsics`
    /// array (`fx, fy, cx, cy`) and a `resolution` array (`width, height`).
    ///
    /// # Errors
    ///
    /// * [`CameraError::IOError`]: If there's an issue reading the file.
    /// * [`CameraError::YamlError`]: If the YAML content is malformed.
    /// * [`CameraError::InvalidParams`]: If expected fields are missing or of the wrong type.
    /// * Errors from `validate_params` if the loaded parameters are invalid.
    pub fn load_from_yaml(path: &str) -> Result<Self, CameraError> {
        let contents = fs::read_to_string(path)?;
        let docs = YamlLoader::load_from_str(&contents)?;
        let doc = docs
            .first()
            .ok_or_else(|| CameraError::YamlError(format!("{path} is empty")))?;

        let intrinsics_yaml = doc["cam0"]["intrinsics"].as_vec().ok_or_else(|| {
            CameraError::InvalidParams("YAML missing 'intrinsics' or not an array".to_string())
        })?;
        let resolution_yaml = doc["cam0"]["resolution"].as_vec().ok_or_else(|| {
            CameraError::InvalidParams("YAML missing 'resolution' or not an array".to_string())
        })?;

        if intrinsics_yaml.len() < 4 || resolution_yaml.len() < 2 {
            return Err(CameraError::InvalidParams(
                "'intrinsics' needs 4 values and 'resolution' needs 2".to_string(),
            ));
        }

        let float_at = |idx: usize, name: &str| {
            intrinsics_yaml[idx].as_f64().ok_or_else(|| {
                CameraError::InvalidParams(format!("Invalid {name}: not a float"))
            })
        };
        let intrinsics = Intrinsics {
            fx: float_at(0, "fx")?,
            fy: float_at(1, "fy")?,
            cx: float_at(2, "cx")?,
            cy: float_at(3, "cy")?,
        };

        let resolution = Resolution {
            width: resolution_yaml[0].as_i64().ok_or_else(|| {
                CameraError::InvalidParams("Invalid width: not an integer".to_string())
            })? as u32,
            height: resolution_yaml[1].as_i64().ok_or_else(|| {
                CameraError::InvalidParams("Invalid height: not an integer".to_string())
            })? as u32,
        };

        let model = PinholeModel {
            intrinsics,
            resolution,
        };

        // Validate parameters
        model.validate_params()?;

        Ok(model)
    }

    /// Saves the camera model's parameters to a YAML file readable by [`PinholeModel::load_from_yaml`].
    pub fn save_to_yaml(&self, path: &str) -> Result<(), CameraError> {
        let file = CameraFile {
            cam0: CameraEntry {
                camera_model: "pinhole".to_string(),
                intrinsics: [
                    self.intrinsics.fx,
                    self.intrinsics.fy,
                    self.intrinsics.cx,
                    self.intrinsics.cy,
                ],
                resolution: [self.resolution.width, self.resolution.height],
            },
        };
        let yaml_string =
            serde_yaml::to_string(&file).map_err(|e| CameraError::YamlError(e.to_string()))?;

        fs::write(path, yaml_string)?;
        Ok(())
    }

    /// Checks that focal lengths are positive, the principal point is finite and,
    /// once set, the resolution is non-zero.
    pub fn validate_params(&self) -> Result<(), CameraError> {
        validation::validate_intrinsics(&self.intrinsics)?;
        if self.resolution.width != 0 || self.resolution.height != 0 {
            validation::validate_resolution(&self.resolution)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pinhole_load_from_yaml() {
        let path = "samples/pinhole.yaml";
        let model = PinholeModel::load_from_yaml(path).unwrap();

        assert_eq!(model.intrinsics.fx, 1266.417);
        assert_eq!(model.intrinsics.fy, 1266.417);
        assert_eq!(model.intrinsics.cx, 816.267);
        assert_eq!(model.intrinsics.cy, 491.507);
        assert_eq!(model.resolution.width, 1600);
        assert_eq!(model.resolution.height, 900);
    }

    #[test]
    fn test_pinhole_save_and_reload() {
        let model = PinholeModel::load_from_yaml("samples/pinhole.yaml").unwrap();
        let path = std::env::temp_dir().join("annotation_tools_pinhole_roundtrip.yaml");
        let path = path.to_str().unwrap();

        model.save_to_yaml(path).unwrap();
        let written = fs::read_to_string(path).unwrap();
        assert!(written.starts_with("cam0:"));
        assert!(written.contains("camera_model: pinhole"));

        let reloaded = PinholeModel::load_from_yaml(path).unwrap();

        assert_eq!(reloaded.intrinsics, model.intrinsics);
        assert_eq!(reloaded.resolution, model.resolution);
    }

    #[test]
    fn test_pinhole_new_rejects_bad_focal_length() {
        let params = DVector::from_vec(vec![-1.0, 500.0, 320.0, 240.0]);
        assert!(matches!(
            PinholeModel::new(&params),
            Err(CameraError::FocalLengthMustBePositive)
        ));

        let short = DVector::from_vec(vec![500.0, 500.0]);
        assert!(matches!(
            PinholeModel::new(&short),
            Err(CameraError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_pinhole_resized_scales_intrinsics() {
        let model = PinholeModel::from_matrix(
            &Matrix3::new(1000.0, 0.0, 800.0, 0.0, 1000.0, 450.0, 0.0, 0.0, 1.0),
            Resolution {
                width: 1600,
                height: 900,
            },
        )
        .unwrap();

        let target = Resolution {
            width: 800,
            height: 800,
        };
        let resized = model.resized(target, true).unwrap();

        assert_eq!(resized.resolution, target);
        assert_relative_eq!(resized.intrinsics.fx, 500.0);
        assert_relative_eq!(resized.intrinsics.fy, 500.0);
        assert_relative_eq!(resized.intrinsics.cx, 400.0);
        assert_relative_eq!(resized.intrinsics.cy, 225.0);
    }
}
