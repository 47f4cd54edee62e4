//! Normalisation of vendor annotation schemas into [`LidarBox`] records.
//!
//! Vendor exports mix 3D cuboids and 2D image annotations in one list. Each
//! shape is its own variant of [`VendorInstance`], and every variant that
//! carries 3D geometry implements [`Normalize`]. Normalisation only renames
//! fields; no transform is applied.
//!
//! 2D annotations have no 3D record to become. [`VendorAnnotation2d::to_box2d`]
//! turns them straight into [`Box2d`] values for
//! [`crate::dedup::BoxFilter::apply_by_area`].

use serde::{Deserialize, Serialize};

use super::{ConversionError, LidarBox};
use crate::camera::Resolution;
use crate::dedup::Box2d;
use crate::geometry::{image_box_from_corners, PixelBox};
use nalgebra::Matrix2xX;

/// Reduces a vendor record to the LiDAR-centric record.
pub trait Normalize {
    fn normalize(&self, track_id: u32, frame_idx: u32) -> Result<LidarBox, ConversionError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord2 {
    pub x: f64,
    pub y: f64,
}

/// A vendor 3D cuboid in the LiDAR frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorCuboid {
    pub uuid: String,
    pub label: String,
    pub position: Coord3,
    /// Extents along sensor x, y, z.
    pub dimensions: Coord3,
    pub yaw: f64,
    #[serde(default)]
    pub stationary: bool,
    #[serde(default)]
    pub camera_used: Option<i64>,
    #[serde(rename = "numberOfPoints", default)]
    pub number_of_points: u32,
}

/// A vendor 2D annotation: a label and its projected cuboid points in one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorAnnotation2d {
    pub label: String,
    pub points_2d: Vec<Coord2>,
    #[serde(default)]
    pub track_id: Option<u32>,
    #[serde(default)]
    pub camera_used: Option<i64>,
}

impl VendorAnnotation2d {
    /// Axis-aligned box around the annotated points, clipped to the image.
    ///
    /// `None` when the annotation has no points.
    pub fn image_box(&self, image_size: &Resolution) -> Option<PixelBox> {
        if self.points_2d.is_empty() {
            return None;
        }
        let corners = Matrix2xX::from_fn(self.points_2d.len(), |row, col| {
            let point = &self.points_2d[col];
            if row == 0 {
                point.x
            } else {
                point.y
            }
        });
        Some(image_box_from_corners(&corners, image_size))
    }

    pub fn to_box2d(&self, image_size: &Resolution) -> Option<Box2d> {
        self.image_box(image_size).map(|bbox| Box2d {
            bbox,
            label: self.label.clone(),
            track_id: self.track_id,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VendorInstance {
    Cuboid(VendorCuboid),
    Annotation2d(VendorAnnotation2d),
}

impl Normalize for VendorCuboid {
    fn normalize(&self, track_id: u32, frame_idx: u32) -> Result<LidarBox, ConversionError> {
        Ok(LidarBox {
            class: self.label.clone(),
            width: self.dimensions.x,
            length: self.dimensions.y,
            height: self.dimensions.z,
            x: self.position.x,
            y: self.position.y,
            z: self.position.z,
            rotation_y: self.yaw,
            track_id,
            frame_idx,
            score: None,
            prelabel: None,
        })
    }
}

impl Normalize for VendorInstance {
    fn normalize(&self, track_id: u32, frame_idx: u32) -> Result<LidarBox, ConversionError> {
        match self {
            VendorInstance::Cuboid(cuboid) => cuboid.normalize(track_id, frame_idx),
            VendorInstance::Annotation2d(annotation) => Err(ConversionError::UnsupportedInstance(
                format!("2D annotation '{}' has no 3D geometry", annotation.label),
            )),
        }
    }
}

/// Normalises every instance of a frame, using its index in the frame as track id.
pub fn normalize_frame<T: Normalize>(
    instances: &[T],
    frame_idx: u32,
) -> Result<Vec<LidarBox>, ConversionError> {
    instances
        .iter()
        .enumerate()
        .map(|(idx, instance)| instance.normalize(idx as u32, frame_idx))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cuboid(label: &str) -> VendorCuboid {
        VendorCuboid {
            uuid: "c0ffee".to_string(),
            label: label.to_string(),
            position: Coord3 {
                x: 12.0,
                y: -1.0,
                z: 0.3,
            },
            dimensions: Coord3 {
                x: 4.5,
                y: 1.9,
                z: 1.6,
            },
            yaw: 0.25,
            stationary: false,
            camera_used: None,
            number_of_points: 120,
        }
    }

    #[test]
    fn test_cuboid_normalization_renames_fields() {
        let lidar_box = cuboid("Car").normalize(4, 9).unwrap();
        assert_eq!(lidar_box.class, "Car");
        assert_eq!(lidar_box.width, 4.5);
        assert_eq!(lidar_box.length, 1.9);
        assert_eq!(lidar_box.height, 1.6);
        assert_eq!((lidar_box.x, lidar_box.y, lidar_box.z), (12.0, -1.0, 0.3));
        assert_eq!(lidar_box.rotation_y, 0.25);
        assert_eq!(lidar_box.track_id, 4);
        assert_eq!(lidar_box.frame_idx, 9);
    }

    #[test]
    fn test_frame_normalization_numbers_tracks() {
        let frame = vec![
            VendorInstance::Cuboid(cuboid("Car")),
            VendorInstance::Cuboid(cuboid("Truck")),
        ];
        let boxes = normalize_frame(&frame, 2).unwrap();
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[1].class, "Truck");
        assert_eq!(boxes[1].track_id, 1);
    }

    #[test]
    fn test_2d_annotation_is_not_normalized() {
        let frame = vec![
            VendorInstance::Cuboid(cuboid("Car")),
            VendorInstance::Annotation2d(VendorAnnotation2d {
                label: "Car".to_string(),
                points_2d: vec![],
                track_id: None,
                camera_used: Some(0),
            }),
        ];
        assert!(matches!(
            normalize_frame(&frame, 0),
            Err(ConversionError::UnsupportedInstance(_))
        ));
    }

    #[test]
    fn test_annotation_image_box() {
        let annotation = VendorAnnotation2d {
            label: "Pedestrian".to_string(),
            points_2d: vec![
                Coord2 { x: 100.2, y: 50.0 },
                Coord2 { x: 140.7, y: 48.4 },
                Coord2 { x: 120.0, y: 160.6 },
                Coord2 { x: -3.0, y: 500.0 },
            ],
            track_id: Some(1),
            camera_used: Some(0),
        };
        let image_size = Resolution {
            width: 640,
            height: 480,
        };
        assert_eq!(
            annotation.image_box(&image_size),
            Some(PixelBox::new(0, 48, 141, 480))
        );

        let box2d = annotation.to_box2d(&image_size).unwrap();
        assert_eq!(box2d.label, "Pedestrian");
        assert_eq!(box2d.track_id, Some(1));
    }

    #[test]
    fn test_vendor_instance_is_tagged() {
        let json = r#"{
            "kind": "cuboid", "uuid": "a1", "label": "Bus",
            "position": {"x": 1.0, "y": 2.0, "z": 3.0},
            "dimensions": {"x": 11.0, "y": 2.5, "z": 3.2},
            "yaw": -0.4, "numberOfPoints": 800
        }"#;
        let instance: VendorInstance = serde_json::from_str(json).unwrap();
        let lidar_box = instance.normalize(0, 0).unwrap();
        assert_eq!(lidar_box.class, "Bus");
        assert_eq!(lidar_box.width, 11.0);
    }
}
