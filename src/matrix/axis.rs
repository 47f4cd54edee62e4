//! Re-deriving which physical axis a size label refers to after a frame change.
//!
//! A LiDAR record stores its extent along the sensor's x/y/z axes while the
//! camera-centric record names them width/height/length along camera x/y/z.
//! Rather than hard-coding a permutation, each source axis is pushed through the
//! transform and the destination axis it lands on is read off.

use log::warn;
use nalgebra::{Matrix3x4, Vector3};
use serde::{Deserialize, Serialize};

use super::{transform_point, MatrixError};

/// Distance along each source axis used to probe a transform.
const PROBE_MAGNITUDE: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    fn from_index(index: usize) -> Axis {
        match index {
            0 => Axis::X,
            1 => Axis::Y,
            _ => Axis::Z,
        }
    }
}

/// One value per source-frame axis, e.g. a box's extent along x, y and z.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisValues {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl AxisValues {
    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }
}

/// The destination-frame axis each semantic dimension lies along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionAxes {
    pub width: Axis,
    pub height: Axis,
    pub length: Axis,
}

impl DimensionAxes {
    /// Camera convention: width along x (right), height along y (down), length along z (forward).
    pub const CAMERA: DimensionAxes = DimensionAxes {
        width: Axis::X,
        height: Axis::Y,
        length: Axis::Z,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
    pub length: f64,
}

/// For every destination axis, the source axis that `transform` carries onto it.
///
/// The entry at `Axis::index()` of a destination axis names its source axis.
/// Ties between probe components resolve to the first axis (x before y before z).
///
/// # Errors
///
/// [`MatrixError::DegenerateAxisMapping`] when two source axes land on the same
/// destination axis, leaving another one unmapped.
pub fn find_axis_map(transform: &Matrix3x4<f64>) -> Result<[Axis; 3], MatrixError> {
    let mut sources: [Option<Axis>; 3] = [None; 3];

    for source in Axis::ALL {
        let mut probe = Vector3::zeros();
        probe[source.index()] = PROBE_MAGNITUDE;
        let landed = transform_point(&probe, transform)?;
        let destination = dominant_axis(&landed);
        sources[destination.index()] = Some(source);
    }

    match sources {
        [Some(x), Some(y), Some(z)] => Ok([x, y, z]),
        _ => Err(MatrixError::DegenerateAxisMapping(format!("{sources:?}"))),
    }
}

fn dominant_axis(point: &Vector3<f64>) -> Axis {
    let magnitudes = point.abs();
    let mut best = 0;
    for idx in 1..3 {
        if magnitudes[idx] > magnitudes[best] {
            best = idx;
        }
    }

    let ties = magnitudes
        .iter()
        .filter(|&&value| value == magnitudes[best])
        .count();
    if ties > 1 {
        warn!(
            "Axis probe {:?} has no single dominant component, using {:?}",
            point,
            Axis::from_index(best)
        );
    }

    Axis::from_index(best)
}

/// Reorders per-axis source sizes into destination width/height/length.
///
/// `source` holds the extent along each source axis and `destination` names the
/// destination axis each label lies on. The identity transform leaves every
/// label on the axis it started on.
pub fn map_dimension(
    transform: &Matrix3x4<f64>,
    source: &AxisValues,
    destination: &DimensionAxes,
) -> Result<Dimensions, MatrixError> {
    let axis_map = find_axis_map(transform)?;
    let value_on = |axis: Axis| source.get(axis_map[axis.index()]);

    Ok(Dimensions {
        width: value_on(destination.width),
        height: value_on(destination.height),
        length: value_on(destination.length),
    })
}
