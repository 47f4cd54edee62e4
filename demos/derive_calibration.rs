//! Calibration Derivation Example
//!
//! Derives the per-sequence calibration from a rig pose and a pinhole camera
//! and prints it in KITTI calib file layout.
//!
//! Usage:
//! ```bash
//! RUST_LOG=debug cargo run --example derive_calibration -- \
//!   --camera samples/pinhole.yaml \
//!   --rpy 1.55 -1.60 0.02 \
//!   --translation 0.1 1.6 -0.4
//! ```

use annotation_tools::calib::{EulerOrder, SensorPose};
use annotation_tools::{PinholeModel, Resolution, SequenceCalibration};
use clap::Parser;
use log::info;
use nalgebra::{Matrix3, Matrix3x4};
use std::path::PathBuf;

/// KITTI calibration derivation tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Pinhole camera YAML
    #[arg(short = 'c', long)]
    camera: PathBuf,

    /// Roll, pitch and yaw of the rig pose
    #[arg(long, num_args = 3, allow_hyphen_values = true)]
    rpy: Vec<f64>,

    /// Angles in --rpy are stored back to front
    #[arg(long)]
    reversed_euler: bool,

    /// LiDAR-to-camera translation
    #[arg(long, num_args = 3, allow_hyphen_values = true)]
    translation: Vec<f64>,

    /// Resize target as WIDTH HEIGHT
    #[arg(long, num_args = 2)]
    resize: Option<Vec<u32>>,

    /// Stretch instead of pad when resizing
    #[arg(long)]
    no_padding: bool,

    /// Write the (possibly resized) camera to this YAML file
    #[arg(long)]
    output_camera: Option<PathBuf>,
}

fn calib_line(name: &str, values: impl Iterator<Item = f64>) -> String {
    let values: Vec<String> = values.map(|v| format!("{v:.12e}")).collect();
    format!("{name}: {}", values.join(" "))
}

/// Row-major rendering, as KITTI stores matrices.
fn row_major_3x4(matrix: &Matrix3x4<f64>) -> impl Iterator<Item = f64> + '_ {
    (0..3).flat_map(move |row| (0..4).map(move |col| matrix[(row, col)]))
}

fn row_major_3x3(matrix: &Matrix3<f64>) -> impl Iterator<Item = f64> + '_ {
    (0..3).flat_map(move |row| (0..3).map(move |col| matrix[(row, col)]))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let cli = Cli::parse();

    let camera_path = cli.camera.to_str().ok_or("Invalid camera path string")?;
    let camera = PinholeModel::load_from_yaml(camera_path)?;
    info!("Loaded camera: {:?}", camera.intrinsics);

    let pose = SensorPose {
        roll_pitch_yaw: [cli.rpy[0], cli.rpy[1], cli.rpy[2]],
        translation: [cli.translation[0], cli.translation[1], cli.translation[2]],
    };
    let order = if cli.reversed_euler {
        EulerOrder::Reversed
    } else {
        EulerOrder::AsListed
    };
    let extrinsic = pose.to_extrinsic(order);

    let calibration = match &cli.resize {
        Some(size) => SequenceCalibration::derive_resized(
            &extrinsic,
            &camera.intrinsic_matrix(),
            camera.resolution,
            Resolution {
                width: size[0],
                height: size[1],
            },
            !cli.no_padding,
        )?,
        None => SequenceCalibration::derive(
            &extrinsic,
            &camera.intrinsic_matrix(),
            camera.resolution,
        )?,
    };

    let identity = Matrix3x4::identity();
    let projection = calibration.projection_matrix();

    println!("{}", calib_line("P0", row_major_3x4(&identity)));
    println!("{}", calib_line("P1", row_major_3x4(&identity)));
    println!("{}", calib_line("P2", row_major_3x4(&projection)));
    println!("{}", calib_line("P3", row_major_3x4(&identity)));
    println!("{}", calib_line("R0_rect", row_major_3x3(&Matrix3::identity())));
    println!(
        "{}",
        calib_line("Tr_velo_to_cam", row_major_3x4(calibration.camera_convention()))
    );
    println!("{}", calib_line("Tr_imu_to_velo", row_major_3x4(&identity)));

    info!(
        "Point cloud transform:{}",
        calibration.point_cloud_transform()
    );

    if let Some(path) = &cli.output_camera {
        let path = path.to_str().ok_or("Invalid output camera path string")?;
        let output = PinholeModel::from_matrix(calibration.intrinsic(), calibration.image_size())?;
        output.save_to_yaml(path)?;
        info!("Saved camera to {path}");
    }

    Ok(())
}
