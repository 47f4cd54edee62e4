//! Annotation records and the conversions between them.
//!
//! Three 3D representations meet here:
//! - [`LidarBox`]: the LiDAR-centric labelling-tool record (geometric centre,
//!   extents along sensor x/y/z, yaw about sensor z).
//! - [`PredictedBox`]: detector output in the LiDAR frame.
//! - [`CameraBox`]: the KITTI-style camera record (bottom-centre location,
//!   height/width/length, `rotation_y`, observation angle and a 2D box).
//!
//! Vendor schemas are reduced to [`LidarBox`] by [`vendor::Normalize`] before
//! any geometry is applied.

use std::fmt;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::dedup::{Box2d, DepthBox};
use crate::geometry::PixelBox;
use crate::matrix::{Dimensions, MatrixError};

pub mod convert;
pub mod vendor;

pub use convert::{
    lidar_to_camera, predicted_frame_to_lidar, predicted_to_camera, predicted_to_lidar,
};

/// Ignore class as spelled by the LiDAR labelling tool.
pub const LIDAR_IGNORE_CLASS: &str = "Others";
/// Ignore class as spelled by the camera-centric format.
pub const CAMERA_IGNORE_CLASS: &str = "DontCare";

#[derive(thiserror::Error, Debug)]
pub enum ConversionError {
    #[error("Matrix error: {0}")]
    Matrix(MatrixError),
    #[error("Instance cannot be converted to a 3D box: {0}")]
    UnsupportedInstance(String),
}

impl From<MatrixError> for ConversionError {
    fn from(err: MatrixError) -> Self {
        ConversionError::Matrix(err)
    }
}

/// Class name in camera-centric spelling: multi-word names joined by `_`.
///
/// Unknown names pass through so allow-list filtering stays with the caller.
pub fn camera_class_name(lidar_class: &str) -> String {
    if lidar_class == LIDAR_IGNORE_CLASS {
        CAMERA_IGNORE_CLASS.to_string()
    } else {
        lidar_class.replace(' ', "_")
    }
}

/// Class name in LiDAR-tool spelling: words separated by spaces.
pub fn lidar_class_name(camera_class: &str) -> String {
    if camera_class == CAMERA_IGNORE_CLASS {
        LIDAR_IGNORE_CLASS.to_string()
    } else {
        camera_class.replace('_', " ")
    }
}

/// LiDAR-centric 3D box as exchanged with the labelling tool.
///
/// `width`, `length` and `height` are the extents along sensor x, y and z;
/// `(x, y, z)` is the geometric centre and `rotation_y` the yaw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LidarBox {
    pub class: String,
    pub width: f64,
    pub length: f64,
    pub height: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub rotation_y: f64,
    pub track_id: u32,
    pub frame_idx: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prelabel: Option<bool>,
}

impl LidarBox {
    pub fn center(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }
}

/// Detector output in the LiDAR frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictedBox {
    #[serde(rename = "type")]
    pub class: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub x_size: f64,
    pub y_size: f64,
    pub z_size: f64,
    pub rotation_y: f64,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub track_id: Option<u32>,
}

/// Camera-centric (KITTI-style) 3D box with its image-plane footprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraBox {
    #[serde(rename = "type")]
    pub class: String,
    pub truncated: f64,
    pub occluded: u8,
    pub alpha: f64,
    /// [`PixelBox::SENTINEL`] when the cuboid is behind the camera.
    pub bbox: PixelBox,
    pub dimensions: Dimensions,
    /// Bottom-centre of the box in camera coordinates.
    pub location: Vector3<f64>,
    pub rotation_y: f64,
    pub score: Option<f64>,
    pub track_id: Option<u32>,
}

impl CameraBox {
    /// Distance along the optical axis, used to order boxes before deduplication.
    pub fn depth(&self) -> f64 {
        self.location.z
    }

    pub fn is_projected(&self) -> bool {
        !self.bbox.is_sentinel()
    }

    pub fn to_box2d(&self) -> Box2d {
        Box2d {
            bbox: self.bbox,
            label: self.class.clone(),
            track_id: self.track_id,
        }
    }

    pub fn to_depth_box(&self) -> DepthBox {
        DepthBox {
            box2d: self.to_box2d(),
            depth: self.depth(),
        }
    }
}

/// One line of a KITTI label file: type, truncation, occlusion, alpha, bbox,
/// dimensions (h, w, l), location, rotation_y and an optional score.
impl fmt::Display for CameraBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} {} {} {} {} {} {} {} {} {}",
            self.class,
            self.truncated,
            self.occluded,
            self.alpha,
            self.bbox.left,
            self.bbox.top,
            self.bbox.right,
            self.bbox.bottom,
            self.dimensions.height,
            self.dimensions.width,
            self.dimensions.length,
            self.location.x,
            self.location.y,
            self.location.z,
            self.rotation_y,
        )?;
        if let Some(score) = self.score {
            write!(f, " {score}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_names() {
        assert_eq!(camera_class_name("Others"), "DontCare");
        assert_eq!(camera_class_name("Person sitting"), "Person_sitting");
        assert_eq!(camera_class_name("Car"), "Car");
        assert_eq!(lidar_class_name("DontCare"), "Others");
        assert_eq!(lidar_class_name("Person_sitting"), "Person sitting");
        assert_eq!(lidar_class_name("Unknown_thing"), "Unknown thing");
    }

    #[test]
    fn test_lidar_box_json_field_names() {
        let json = r#"{
            "class": "Car", "width": 4.2, "length": 1.8, "height": 1.5,
            "x": 10.0, "y": -2.0, "z": -0.8, "rotationY": 0.1,
            "trackId": 3, "frameIdx": 12
        }"#;
        let instance: LidarBox = serde_json::from_str(json).unwrap();
        assert_eq!(instance.class, "Car");
        assert_eq!(instance.track_id, 3);
        assert_eq!(instance.frame_idx, 12);
        assert_eq!(instance.score, None);

        let value = serde_json::to_value(&instance).unwrap();
        assert_eq!(value["rotationY"], 0.1);
        assert!(value.get("prelabel").is_none());
    }

    #[test]
    fn test_camera_box_label_line() {
        let camera_box = CameraBox {
            class: "Car".to_string(),
            truncated: 0.0,
            occluded: 0,
            alpha: -1.5,
            bbox: PixelBox::new(10, 20, 110, 90),
            dimensions: Dimensions {
                width: 1.8,
                height: 1.5,
                length: 4.0,
            },
            location: Vector3::new(1.0, 1.5, 20.0),
            rotation_y: -1.25,
            score: Some(0.9),
            track_id: Some(4),
        };
        assert_eq!(
            camera_box.to_string(),
            "Car 0 0 -1.5 10 20 110 90 1.5 1.8 4 1 1.5 20 -1.25 0.9"
        );
        assert_eq!(camera_box.to_depth_box().depth, 20.0);
        assert!(camera_box.is_projected());
    }
}
