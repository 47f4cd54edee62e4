use std::f64::consts::FRAC_PI_2;

use log::debug;
use nalgebra::{Matrix3, Matrix3x4};

use super::{camera_class_name, lidar_class_name, CameraBox, ConversionError, LidarBox, PredictedBox};
use crate::camera::Resolution;
use crate::geometry::{
    compute_box_3d, image_box_from_corners, observation_angle, wrap_angle, PixelBox,
};
use crate::matrix::{map_dimension, pad_to_projection, transform_point, AxisValues, DimensionAxes};

/// Converts a LiDAR-centric record into the camera-centric record.
///
/// Sizes are re-assigned to width/height/length by probing `extrinsic`, the
/// centre is moved into the camera frame and lowered to the bottom face, and
/// the 2D box is recomputed by projecting the cuboid through `intrinsic`.
/// A cuboid reaching behind the camera gets [`PixelBox::SENTINEL`].
///
/// # Errors
///
/// [`ConversionError::Matrix`] if `extrinsic` is singular along an axis or
/// collapses two axes together.
pub fn lidar_to_camera(
    instance: &LidarBox,
    extrinsic: &Matrix3x4<f64>,
    intrinsic: &Matrix3<f64>,
    image_size: &Resolution,
) -> Result<CameraBox, ConversionError> {
    let class = camera_class_name(&instance.class);

    let extents = AxisValues {
        x: instance.width,
        y: instance.length,
        z: instance.height,
    };
    let dimensions = map_dimension(extrinsic, &extents, &DimensionAxes::CAMERA)?;

    let mut location = transform_point(&instance.center(), extrinsic)?;
    location.y += dimensions.height / 2.0;

    let rotation_y = wrap_angle(-instance.rotation_y - FRAC_PI_2);

    let projected = compute_box_3d(
        &dimensions,
        &location,
        rotation_y,
        &pad_to_projection(intrinsic),
    );
    let bbox = match &projected.corners_2d {
        Some(corners_2d) => image_box_from_corners(corners_2d, image_size),
        None => {
            debug!(
                "{} (track {}) reaches behind the camera, no 2D box",
                class, instance.track_id
            );
            PixelBox::SENTINEL
        }
    };

    let alpha = observation_angle(&location, rotation_y);

    Ok(CameraBox {
        class,
        truncated: 0.0,
        occluded: 0,
        alpha,
        bbox,
        dimensions,
        location,
        rotation_y,
        score: instance.score,
        track_id: Some(instance.track_id),
    })
}

/// Turns a detector box into a labelling-tool record for the given track and frame.
pub fn predicted_to_lidar(
    predicted: &PredictedBox,
    track_id: u32,
    frame_idx: u32,
    prelabel: Option<bool>,
) -> LidarBox {
    LidarBox {
        class: lidar_class_name(&predicted.class),
        width: predicted.x_size,
        length: predicted.y_size,
        height: predicted.z_size,
        x: predicted.x,
        y: predicted.y,
        z: predicted.z,
        rotation_y: predicted.rotation_y,
        track_id,
        frame_idx,
        score: predicted.score,
        prelabel,
    }
}

/// Converts one frame of detections, numbering boxes without a track id by their index.
pub fn predicted_frame_to_lidar(
    frame: &[PredictedBox],
    frame_idx: u32,
    prelabel: Option<bool>,
) -> Vec<LidarBox> {
    frame
        .iter()
        .enumerate()
        .map(|(idx, predicted)| {
            let track_id = predicted.track_id.unwrap_or(idx as u32);
            predicted_to_lidar(predicted, track_id, frame_idx, prelabel)
        })
        .collect()
}

/// Detector box straight to the camera-centric record.
pub fn predicted_to_camera(
    predicted: &PredictedBox,
    extrinsic: &Matrix3x4<f64>,
    intrinsic: &Matrix3<f64>,
    image_size: &Resolution,
) -> Result<CameraBox, ConversionError> {
    let track_id = predicted.track_id.unwrap_or(0);
    let lidar_box = predicted_to_lidar(predicted, track_id, 0, None);
    lidar_to_camera(&lidar_box, extrinsic, intrinsic, image_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calib::camera_convention_extrinsic;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn intrinsic() -> Matrix3<f64> {
        Matrix3::new(1000.0, 0.0, 960.0, 0.0, 1000.0, 540.0, 0.0, 0.0, 1.0)
    }

    fn image_size() -> Resolution {
        Resolution {
            width: 1920,
            height: 1080,
        }
    }

    fn pedestrian() -> LidarBox {
        LidarBox {
            class: "Pedestrian".to_string(),
            width: 0.5,
            length: 0.5,
            height: 1.7,
            x: 5.0,
            y: 0.0,
            z: 0.0,
            rotation_y: 0.0,
            track_id: 7,
            frame_idx: 0,
            score: Some(0.8),
            prelabel: None,
        }
    }

    fn lidar_to_camera_extrinsic() -> Matrix3x4<f64> {
        camera_convention_extrinsic(&Matrix3x4::zeros())
    }

    #[test]
    fn test_pedestrian_in_front_of_camera() {
        let camera_box = lidar_to_camera(
            &pedestrian(),
            &lidar_to_camera_extrinsic(),
            &intrinsic(),
            &image_size(),
        )
        .unwrap();

        assert_eq!(camera_box.class, "Pedestrian");
        assert_relative_eq!(camera_box.dimensions.height, 1.7);
        assert_relative_eq!(camera_box.dimensions.width, 0.5);
        assert_relative_eq!(camera_box.dimensions.length, 0.5);
        assert_relative_eq!(
            camera_box.location,
            Vector3::new(0.0, 0.0 + 1.7 / 2.0, 5.0),
            epsilon = 1e-12
        );
        assert_relative_eq!(camera_box.rotation_y, -FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(camera_box.alpha, -FRAC_PI_2, epsilon = 1e-9);
        assert_eq!(camera_box.bbox, PixelBox::new(907, 361, 1013, 719));
        assert_eq!(camera_box.score, Some(0.8));
        assert_eq!(camera_box.track_id, Some(7));
    }

    #[test]
    fn test_identity_extrinsic_keeps_axes_and_marks_behind_camera() {
        let mut instance = pedestrian();
        instance.length = 0.9;

        let camera_box = lidar_to_camera(
            &instance,
            &Matrix3x4::identity(),
            &intrinsic(),
            &image_size(),
        )
        .unwrap();

        // identity keeps sensor y as the vertical axis
        assert_relative_eq!(camera_box.dimensions.height, 0.9);
        assert_relative_eq!(camera_box.location.y, 0.0 + 0.9 / 2.0);
        assert_relative_eq!(camera_box.rotation_y, -FRAC_PI_2, epsilon = 1e-12);
        // centre sits on the camera plane, so the cuboid cannot be projected
        assert_eq!(camera_box.bbox, PixelBox::SENTINEL);
        assert!(!camera_box.is_projected());
    }

    #[test]
    fn test_ignore_class_and_spaces_are_renamed() {
        let mut instance = pedestrian();
        instance.class = "Others".to_string();
        let camera_box = lidar_to_camera(
            &instance,
            &lidar_to_camera_extrinsic(),
            &intrinsic(),
            &image_size(),
        )
        .unwrap();
        assert_eq!(camera_box.class, "DontCare");

        instance.class = "Person sitting".to_string();
        let camera_box = lidar_to_camera(
            &instance,
            &lidar_to_camera_extrinsic(),
            &intrinsic(),
            &image_size(),
        )
        .unwrap();
        assert_eq!(camera_box.class, "Person_sitting");
    }

    #[test]
    fn test_heading_is_wrapped() {
        let mut instance = pedestrian();
        instance.rotation_y = 3.0;
        let camera_box = lidar_to_camera(
            &instance,
            &lidar_to_camera_extrinsic(),
            &intrinsic(),
            &image_size(),
        )
        .unwrap();
        assert_relative_eq!(
            camera_box.rotation_y,
            wrap_angle(-3.0 - FRAC_PI_2),
            epsilon = 1e-12
        );
        assert!(camera_box.rotation_y > -std::f64::consts::PI);
    }

    #[test]
    fn test_predicted_to_lidar_and_camera() {
        let predicted = PredictedBox {
            class: "DontCare".to_string(),
            x: 20.0,
            y: 1.0,
            z: -0.5,
            x_size: 4.2,
            y_size: 1.9,
            z_size: 1.6,
            rotation_y: 0.2,
            score: Some(0.55),
            track_id: None,
        };

        let lidar_box = predicted_to_lidar(&predicted, 3, 11, Some(true));
        assert_eq!(lidar_box.class, "Others");
        assert_eq!(lidar_box.width, 4.2);
        assert_eq!(lidar_box.length, 1.9);
        assert_eq!(lidar_box.height, 1.6);
        assert_eq!(lidar_box.track_id, 3);
        assert_eq!(lidar_box.frame_idx, 11);
        assert_eq!(lidar_box.prelabel, Some(true));

        let camera_box = predicted_to_camera(
            &predicted,
            &lidar_to_camera_extrinsic(),
            &intrinsic(),
            &image_size(),
        )
        .unwrap();
        assert_eq!(camera_box.class, "DontCare");
        assert_relative_eq!(camera_box.dimensions.length, 4.2);
        assert_relative_eq!(camera_box.dimensions.width, 1.9);
        assert_relative_eq!(camera_box.location.z, 20.0, epsilon = 1e-12);
        assert_relative_eq!(camera_box.location.y, 0.5 + 0.8, epsilon = 1e-12);
        assert!(camera_box.is_projected());
    }

    #[test]
    fn test_predicted_frame_assigns_missing_track_ids() {
        let template = PredictedBox {
            class: "Car".to_string(),
            x: 10.0,
            y: 0.0,
            z: 0.0,
            x_size: 4.0,
            y_size: 1.8,
            z_size: 1.5,
            rotation_y: 0.0,
            score: None,
            track_id: None,
        };
        let mut tracked = template.clone();
        tracked.track_id = Some(42);

        let frame = predicted_frame_to_lidar(&[template.clone(), tracked, template], 5, None);
        let ids: Vec<u32> = frame.iter().map(|b| b.track_id).collect();
        assert_eq!(ids, vec![0, 42, 2]);
        assert!(frame.iter().all(|b| b.frame_idx == 5));
    }
}
