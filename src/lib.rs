//! Annotation Tools Library
//!
//! Geometric conversion engine for driving-perception annotations. It turns
//! LiDAR-frame 3D boxes into KITTI-style camera boxes and back, and derives
//! the per-sequence calibration that makes the two agree:
//! - Rigid transforms and axis mapping between sensor frames
//! - Cuboid construction, projection and 2D box extraction
//! - Heading conversion and observation angle
//! - Normalisation of vendor annotation schemas
//! - Depth- and area-ordered 2D box deduplication
//!
//! File formats, image I/O and directory layout are left to the caller.

pub mod calib;
pub mod camera;
pub mod config;
pub mod counter;
pub mod dedup;
pub mod geometry;
pub mod instance;
pub mod matrix;

// Re-export commonly used types
pub use calib::{CalibrationError, EulerOrder, SensorPose, SequenceCalibration};
pub use camera::{CameraError, Intrinsics, PinholeModel, ResizeScale, Resolution};
pub use config::{ConfigError, ConversionConfig};
pub use counter::InstanceCounter;
pub use dedup::{Box2d, BoxFilter, DepthBox};
pub use geometry::{PixelBox, ProjectedBox};
pub use instance::{
    lidar_to_camera, predicted_to_camera, predicted_to_lidar, CameraBox, ConversionError,
    LidarBox, PredictedBox,
};
pub use matrix::{Dimensions, MatrixError};
