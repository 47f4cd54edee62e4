//! Sequence Conversion Example
//!
//! Converts LiDAR-frame boxes of one sequence into KITTI-style camera boxes,
//! then filters the resulting 2D boxes the way an image-level export would.
//!
//! Usage:
//! ```bash
//! cargo run --example convert_sequence -- \
//!   --boxes samples/lidar_boxes.json \
//!   --camera samples/pinhole.yaml \
//!   --config samples/conversion.yaml \
//!   --translation 0.0 -0.08 -0.27
//! ```

use annotation_tools::calib::{camera_convention_extrinsic, EulerOrder, SensorPose};
use annotation_tools::{
    BoxFilter, ConversionConfig, InstanceCounter, LidarBox, PinholeModel, SequenceCalibration,
};
use clap::Parser;
use flexi_logger::{colored_detailed_format, detailed_format, Duplicate, FileSpec, Logger};
use log::{info, warn};
use nalgebra::{Matrix3x4, Vector3};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

/// LiDAR box to camera box conversion tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON list of LiDAR-frame boxes
    #[arg(short = 'b', long)]
    boxes: PathBuf,

    /// Pinhole camera YAML
    #[arg(short = 'c', long)]
    camera: PathBuf,

    /// Conversion settings YAML
    #[arg(long)]
    config: Option<PathBuf>,

    /// Roll, pitch and yaw of the rig pose; the fixed camera basis is used when omitted
    #[arg(long, num_args = 3, allow_hyphen_values = true)]
    rpy: Option<Vec<f64>>,

    /// Angles in --rpy are stored back to front
    #[arg(long)]
    reversed_euler: bool,

    /// LiDAR-to-camera translation
    #[arg(long, num_args = 3, allow_hyphen_values = true, default_values_t = [0.0, 0.0, 0.0])]
    translation: Vec<f64>,

    /// Split the exported instances are numbered in
    #[arg(long, default_value = "train")]
    split: String,
}

fn sensor_extrinsic(cli: &Cli) -> Matrix3x4<f64> {
    let translation = [cli.translation[0], cli.translation[1], cli.translation[2]];
    match &cli.rpy {
        Some(rpy) => {
            let order = if cli.reversed_euler {
                EulerOrder::Reversed
            } else {
                EulerOrder::AsListed
            };
            SensorPose {
                roll_pitch_yaw: [rpy[0], rpy[1], rpy[2]],
                translation,
            }
            .to_extrinsic(order)
        }
        None => {
            let mut extrinsic = Matrix3x4::zeros();
            extrinsic.set_column(3, &Vector3::from(translation));
            camera_convention_extrinsic(&extrinsic)
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    Logger::try_with_str("info")?
        .log_to_file(
            FileSpec::default()
                .directory("logs")
                .suppress_timestamp()
                .suffix("log"),
        )
        .duplicate_to_stdout(Duplicate::All)
        .format_for_files(detailed_format)
        .format_for_stdout(colored_detailed_format)
        .set_palette("196;208;76;39;178".to_string())
        .start()?;

    let cli = Cli::parse();
    info!("Boxes: {:?}", cli.boxes);
    info!("Camera: {:?}", cli.camera);

    let camera_path = cli.camera.to_str().ok_or("Invalid camera path string")?;
    let camera = PinholeModel::load_from_yaml(camera_path)?;

    let config = match &cli.config {
        Some(path) => {
            let path = path.to_str().ok_or("Invalid config path string")?;
            ConversionConfig::load_from_yaml(path)?
        }
        None => ConversionConfig::default(),
    };
    info!("Conversion settings: {:?}", config);

    let extrinsic = sensor_extrinsic(&cli);
    let calibration = match config.target_image_size {
        Some(target) => SequenceCalibration::derive_resized(
            &extrinsic,
            &camera.intrinsic_matrix(),
            camera.resolution,
            target,
            config.padding,
        )?,
        None => SequenceCalibration::derive(
            &extrinsic,
            &camera.intrinsic_matrix(),
            camera.resolution,
        )?,
    };

    let lidar_boxes: Vec<LidarBox> = serde_json::from_str(&fs::read_to_string(&cli.boxes)?)?;
    let mut frames: BTreeMap<u32, Vec<LidarBox>> = BTreeMap::new();
    for instance in lidar_boxes {
        frames.entry(instance.frame_idx).or_default().push(instance);
    }

    let filter = BoxFilter::from_config(&config);
    let mut counter = InstanceCounter::new();

    for (frame_idx, instances) in &frames {
        println!("Frame {frame_idx:06}");
        let mut depth_boxes = Vec::with_capacity(instances.len());
        for instance in instances {
            let camera_box = match calibration.convert(instance) {
                Ok(camera_box) => camera_box,
                Err(err) => {
                    warn!("Skipping track {}: {}", instance.track_id, err);
                    continue;
                }
            };
            println!("  {camera_box}");
            depth_boxes.push(camera_box.to_depth_box());
        }

        for kept in filter.apply(depth_boxes) {
            let id = counter.next_id(&cli.split);
            println!(
                "  {}_{} {} [{}, {}, {}, {}]",
                cli.split,
                InstanceCounter::format_id(id),
                kept.label,
                kept.bbox.left,
                kept.bbox.top,
                kept.bbox.right,
                kept.bbox.bottom
            );
        }
    }

    info!(
        "Converted {} frames, exported {} image boxes",
        frames.len(),
        counter.count(&cli.split)
    );

    Ok(())
}
